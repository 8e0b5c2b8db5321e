// End-to-end token behavior for the two issuance modes: a session token
// minted after OAuth login and a bearer token minted after password login
// must each validate only against their own key, and resolve_token must
// report which mode a presented token came from.

mod common;

use m404_backend_core::services::{JwtError, JwtService, TokenMode};

fn service() -> JwtService {
    common::init_test_env();
    JwtService::from_env()
}

#[test]
fn session_and_bearer_tokens_roundtrip_independently() {
    let svc = service();

    let session = svc
        .generate_token(TokenMode::Session, "user-42", "a@example.com", "pro")
        .unwrap();
    let bearer = svc
        .generate_token(TokenMode::Bearer, "user-42", "a@example.com", "pro")
        .unwrap();

    let session_claims = svc.validate_token(TokenMode::Session, &session).unwrap();
    assert_eq!(session_claims.sub, "user-42");
    assert_eq!(session_claims.plan, "pro");

    let bearer_claims = svc.validate_token(TokenMode::Bearer, &bearer).unwrap();
    assert_eq!(bearer_claims.email, "a@example.com");

    // Cross-mode validation must fail: the keys are distinct
    assert!(svc.validate_token(TokenMode::Bearer, &session).is_err());
    assert!(svc.validate_token(TokenMode::Session, &bearer).is_err());
}

#[test]
fn resolve_token_reports_the_issuing_mode() {
    let svc = service();

    let session = svc
        .generate_token(TokenMode::Session, "u", "u@example.com", "free")
        .unwrap();
    let bearer = svc
        .generate_token(TokenMode::Bearer, "u", "u@example.com", "free")
        .unwrap();

    let (claims, mode) = svc.resolve_token(&session).unwrap();
    assert_eq!(mode, TokenMode::Session);
    assert_eq!(claims.sub, "u");

    let (_, mode) = svc.resolve_token(&bearer).unwrap();
    assert_eq!(mode, TokenMode::Bearer);
}

#[test]
fn tampered_token_is_rejected() {
    let svc = service();

    let token = svc
        .generate_token(TokenMode::Bearer, "user-1", "a@example.com", "free")
        .unwrap();

    // Flip a character in the signature segment
    let mut tampered = token.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    assert!(svc.resolve_token(&tampered).is_err());
}

#[test]
fn malformed_tokens_are_rejected() {
    let svc = service();

    for junk in ["", "not-a-token", "a.b", "a.b.c.d"] {
        assert!(
            matches!(
                svc.resolve_token(junk),
                Err(JwtError::InvalidToken) | Err(JwtError::EncodingError(_))
            ),
            "expected rejection for {:?}",
            junk
        );
    }
}

#[test]
fn each_token_gets_a_unique_jti() {
    let svc = service();

    let a = svc
        .generate_token(TokenMode::Bearer, "u", "u@example.com", "free")
        .unwrap();
    let b = svc
        .generate_token(TokenMode::Bearer, "u", "u@example.com", "free")
        .unwrap();

    let ca = svc.validate_token(TokenMode::Bearer, &a).unwrap();
    let cb = svc.validate_token(TokenMode::Bearer, &b).unwrap();
    assert_ne!(ca.jti, cb.jti);
}
