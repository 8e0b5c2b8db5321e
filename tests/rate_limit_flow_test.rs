// Behavior of the config-built limiter set: login is limited per IP and
// per email with the per-IP check running first, and the contact form has
// its own independent budget.

mod common;

use m404_backend_core::services::RateLimitService;

fn service() -> RateLimitService {
    common::init_test_env();
    RateLimitService::from_config()
}

#[test]
fn login_blocks_after_per_ip_budget() {
    let svc = service();

    for _ in 0..5 {
        assert!(svc.check_login("10.0.0.1", "victim@example.com").allowed);
    }

    let denied = svc.check_login("10.0.0.1", "victim@example.com");
    assert!(!denied.allowed);
    assert!(denied.retry_after >= 1);
}

#[test]
fn blocked_ip_does_not_consume_email_budget() {
    let svc = service();

    // Exhaust the IP budget against one email
    for _ in 0..5 {
        svc.check_login("10.0.0.2", "target@example.com");
    }
    assert!(!svc.check_login("10.0.0.2", "target@example.com").allowed);

    // The per-email window only saw the 5 allowed attempts, so the same
    // email from a different IP still has budget left.
    let from_elsewhere = svc.check_login("10.0.0.3", "target@example.com");
    assert!(from_elsewhere.allowed);
}

#[test]
fn login_email_matching_is_case_insensitive() {
    let svc = service();

    // 10 per email per hour; spread across IPs so the IP limit never trips
    for i in 0..10 {
        let ip = format!("10.1.0.{}", i);
        assert!(svc.check_login(&ip, "Mixed.Case@Example.com").allowed);
    }

    let denied = svc.check_login("10.1.0.99", "mixed.case@example.com");
    assert!(!denied.allowed);
}

#[test]
fn contact_form_has_independent_budget() {
    let svc = service();

    for _ in 0..3 {
        assert!(svc.check_contact("10.0.0.4").allowed);
    }
    assert!(!svc.check_contact("10.0.0.4").allowed);

    // The same IP can still attempt logins
    assert!(svc.check_login("10.0.0.4", "someone@example.com").allowed);
}

#[test]
fn different_ips_do_not_interfere() {
    let svc = service();

    for _ in 0..3 {
        svc.check_contact("10.0.0.5");
    }
    assert!(!svc.check_contact("10.0.0.5").allowed);
    assert!(svc.check_contact("10.0.0.6").allowed);
}
