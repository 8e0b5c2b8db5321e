// The plan lifecycle as a whole: what a checkout grants, how renewals
// stack, and what happens to page accessibility when a pro plan lapses.
// Everything here is the pure rule layer; no database involved.

use chrono::{Duration, Utc};

use m404_backend_core::models::user::Plan;
use m404_backend_core::services::payment::extend_expiry;
use m404_backend_core::services::plan::{
    effective_plan, is_page_accessible, page_limit, FREE_PAGE_LIMIT, PRO_PAGE_LIMIT,
};

#[test]
fn upgrade_grants_pro_quota_immediately() {
    let now = Utc::now();

    // Fresh free user completes checkout for a 30-day plan
    let expiry = extend_expiry(None, now, 30);
    assert_eq!(effective_plan(Plan::Pro, Some(expiry), now), Plan::Pro);

    // All 50 slots are usable, the 51st is not
    for index in 0..PRO_PAGE_LIMIT {
        assert!(is_page_accessible(index, Plan::Pro, Some(expiry), now));
    }
    assert!(!is_page_accessible(
        PRO_PAGE_LIMIT,
        Plan::Pro,
        Some(expiry),
        now
    ));
}

#[test]
fn renewal_stacks_onto_remaining_time() {
    let now = Utc::now();
    let first = extend_expiry(None, now, 30);

    // Renewing 10 days in keeps the unused 20 days
    let renewed = extend_expiry(Some(first), now + Duration::days(10), 30);
    assert_eq!(renewed, first + Duration::days(30));
}

#[test]
fn renewal_after_lapse_restarts_from_now() {
    let now = Utc::now();
    let lapsed = now - Duration::days(45);

    let renewed = extend_expiry(Some(lapsed), now, 30);
    assert_eq!(renewed, now + Duration::days(30));
}

#[test]
fn lapsed_pro_keeps_only_the_oldest_page() {
    let now = Utc::now();
    let expired = Some(now - Duration::hours(1));

    assert_eq!(effective_plan(Plan::Pro, expired, now), Plan::Free);
    assert_eq!(page_limit(effective_plan(Plan::Pro, expired, now)), FREE_PAGE_LIMIT);

    // A pro user who made 5 pages and then lapsed: only the first-created
    // page stays servable, the rest go dark until renewal.
    assert!(is_page_accessible(0, Plan::Pro, expired, now));
    for index in 1..5 {
        assert!(!is_page_accessible(index, Plan::Pro, expired, now));
    }

    // Renewal lights them all back up
    let renewed = extend_expiry(expired, now, 30);
    for index in 0..5 {
        assert!(is_page_accessible(index, Plan::Pro, Some(renewed), now));
    }
}

#[test]
fn accessibility_follows_creation_order_not_count() {
    let now = Utc::now();

    // A free user with several pages: accessibility depends on each page's
    // position in creation order, not on how many pages exist in total.
    assert!(is_page_accessible(0, Plan::Free, None, now));
    assert!(!is_page_accessible(1, Plan::Free, None, now));
    assert!(!is_page_accessible(10, Plan::Free, None, now));
}
