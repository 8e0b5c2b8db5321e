// Checkout callback verification through the service layer: the frontend
// posts back (order_id, payment_id, signature) and the service must accept
// exactly the HMAC-SHA256 hex signature computed over "order|payment" with
// the configured key secret.

use m404_backend_core::app_config::PaymentConfig;
use m404_backend_core::services::payment::{sign_order, PaymentService};

fn test_config() -> PaymentConfig {
    PaymentConfig {
        api_url: "https://api.razorpay.com/v1".to_string(),
        key_id: "rzp_test_key".to_string(),
        key_secret: "rzp_test_secret".to_string(),
        pro_price_cents: 900,
        currency: "USD".to_string(),
        pro_duration_days: 30,
    }
}

#[test]
fn accepts_signature_from_configured_secret() {
    let svc = PaymentService::new(test_config());
    let sig = sign_order("rzp_test_secret", "order_abc", "pay_def");
    assert!(svc.verify_signature("order_abc", "pay_def", &sig));
}

#[test]
fn rejects_signature_from_other_secret() {
    let svc = PaymentService::new(test_config());
    let sig = sign_order("some-other-secret", "order_abc", "pay_def");
    assert!(!svc.verify_signature("order_abc", "pay_def", &sig));
}

#[test]
fn rejects_replay_against_different_order() {
    let svc = PaymentService::new(test_config());
    let sig = sign_order("rzp_test_secret", "order_abc", "pay_def");

    // A valid signature for one pair must not verify any other pair
    assert!(!svc.verify_signature("order_xyz", "pay_def", &sig));
    assert!(!svc.verify_signature("order_abc", "pay_xyz", &sig));
    assert!(!svc.verify_signature("pay_def", "order_abc", &sig));
}

#[test]
fn tolerates_whitespace_and_hex_case_in_callback() {
    let svc = PaymentService::new(test_config());
    let sig = sign_order("rzp_test_secret", "order_abc", "pay_def");

    assert!(svc.verify_signature("order_abc", "pay_def", &format!("  {}  ", sig)));
    assert!(svc.verify_signature("order_abc", "pay_def", &sig.to_uppercase()));
}

#[test]
fn rejects_truncated_and_padded_signatures() {
    let svc = PaymentService::new(test_config());
    let sig = sign_order("rzp_test_secret", "order_abc", "pay_def");

    assert!(!svc.verify_signature("order_abc", "pay_def", &sig[..sig.len() - 2]));
    assert!(!svc.verify_signature("order_abc", "pay_def", &format!("{}00", sig)));
    assert!(!svc.verify_signature("order_abc", "pay_def", ""));
}
