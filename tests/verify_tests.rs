//! End-to-end signing and verification tests
//!
//! Exercises the full key lifecycle: sign with a local key, publish the
//! public half through a mock key-set endpoint, verify through the
//! KeyStore cache, and check the miss/refetch/unknown-key behavior.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oidc_apitoken::Error;
use oidc_apitoken::claims::{ClaimsAggregator, ClaimsMap};
use oidc_apitoken::keys::{KeyStore, SigningKey};
use oidc_apitoken::model::User;
use oidc_apitoken::token::{TokenIssuer, TokenVerifier};

const TEST_PRIVATE_KEY_PEM: &str = include_str!("data/test_rsa.pem");

/// Public modulus of the test key, base64url without padding.
const TEST_KEY_N: &str = "utC8sIY2vkwW-i0HFuVG7aaMx8nl4RanGbMmYrpmhjN1wNoL7ut8_9lW9JJMbnYZeWFqpmfO41oQMicvRIx23jZ1ULaeK01Uqh94FuU7IKAD1yEdFPAMT47hkDpkpYOyBkXduIt418McyN-vIgH7jQosBOvpwkHevMB8meMjOZyo74YCuDwK4r2l0utvlaNjlJALVPGerkoFnqUYSa9Y-KYDdf1QrFB3mAEY_FVUbvYmucFv8UepCSMASUDKbrkGH5CXNvR8tEpJRGFmR-mA8eluIHmRsjiqtU6SZPHBoqvNhXcZHqVw1d3YMFwoRM0QuKi6yt-9-n4sV9JBCLvbbw";

fn jwk_for(kid: &str) -> Value {
    serde_json::json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": TEST_KEY_N,
        "e": "AQAB",
    })
}

async fn mock_jwks_server(kids: &[&str], expected_hits: u64) -> MockServer {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "keys": kids.iter().map(|kid| jwk_for(kid)).collect::<Vec<_>>(),
    });
    Mock::given(method("GET"))
        .and(path("/openid/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_hits)
        .mount(&server)
        .await;
    server
}

fn keystore_for(kid: &str, jwks_url: Option<String>) -> Arc<KeyStore> {
    let key = SigningKey::from_rsa_pem(kid, TEST_PRIVATE_KEY_PEM.as_bytes()).unwrap();
    Arc::new(KeyStore::new(
        vec![key],
        jwks_url,
        Duration::from_secs(5),
    ))
}

fn user() -> User {
    User {
        sub: uuid::Uuid::new_v4(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        given_name: None,
        family_name: None,
    }
}

#[tokio::test]
async fn verify_recovers_exactly_the_signed_claims() {
    // GIVEN: a signing key whose public half the key-set endpoint serves
    let server = mock_jwks_server(&["test-key-1"], 1).await;
    let keystore = keystore_for("test-key-1", Some(format!("{}/openid/jwks", server.uri())));

    let issuer = TokenIssuer::new(
        Arc::clone(&keystore),
        Arc::new(ClaimsAggregator::new()),
        "https://sso.example.com/openid",
        Duration::from_secs(600),
    );
    let user = user();
    let perms = vec!["ns/userbase.read".to_string()];

    // WHEN: a token is issued and then verified
    let token = issuer
        .issue(
            &user,
            "https://userbase.example.com",
            &perms,
            &["email".to_string()],
        )
        .unwrap();
    let claims = TokenVerifier::new(keystore).verify(&token).await.unwrap();

    // THEN: the claims round-trip
    assert_eq!(claims["sub"], user.sub.to_string());
    assert_eq!(claims["aud"], "https://userbase.example.com");
    assert_eq!(claims["iss"], "https://sso.example.com/openid");
    assert_eq!(claims["email"], "alice@example.com");
    assert_eq!(claims["perms"], serde_json::json!(["ns/userbase.read"]));
}

#[tokio::test]
async fn second_verification_is_served_from_the_cache() {
    // GIVEN: a key-set endpoint that tolerates exactly one fetch
    let server = mock_jwks_server(&["test-key-1"], 1).await;
    let keystore = keystore_for("test-key-1", Some(format!("{}/openid/jwks", server.uri())));
    let verifier = TokenVerifier::new(Arc::clone(&keystore));

    let mut payload = ClaimsMap::new();
    payload.insert("sub".to_string(), Value::String("user-1".to_string()));
    payload.insert("exp".to_string(), Value::from(4_102_444_800u64));
    let token = keystore.sign(&payload).unwrap();

    // WHEN: the same token is verified twice
    verifier.verify(&token).await.unwrap();
    verifier.verify(&token).await.unwrap();

    // THEN: the mock's expect(1) guards the cache hit on drop
    assert_eq!(keystore.cached_key_count(), 1);
}

#[tokio::test]
async fn one_fetch_populates_every_published_key() {
    // GIVEN: a key set publishing two keys, fetched at most once
    let server = mock_jwks_server(&["test-key-1", "test-key-2"], 1).await;
    let signer = keystore_for("test-key-2", None);
    let verifying =
        keystore_for("unused", Some(format!("{}/openid/jwks", server.uri())));

    let mut payload = ClaimsMap::new();
    payload.insert("sub".to_string(), Value::String("user-1".to_string()));
    payload.insert("exp".to_string(), Value::from(4_102_444_800u64));
    let token = signer.sign(&payload).unwrap();

    // WHEN: a token under the *second* kid is verified
    TokenVerifier::new(Arc::clone(&verifying))
        .verify(&token)
        .await
        .unwrap();

    // THEN: the single fetch cached both keys
    assert_eq!(verifying.cached_key_count(), 2);
}

#[tokio::test]
async fn unknown_kid_fails_after_one_refetch() {
    // GIVEN: a key set that never contains the token's kid
    let server = mock_jwks_server(&["test-key-1"], 1).await;
    let signer = keystore_for("rogue-key", None);
    let verifying =
        keystore_for("unused", Some(format!("{}/openid/jwks", server.uri())));

    let mut payload = ClaimsMap::new();
    payload.insert("sub".to_string(), Value::String("user-1".to_string()));
    payload.insert("exp".to_string(), Value::from(4_102_444_800u64));
    let token = signer.sign(&payload).unwrap();

    // WHEN: verification is attempted
    let result = TokenVerifier::new(Arc::clone(&verifying)).verify(&token).await;

    // THEN: unknown key, after exactly one upstream fetch
    assert!(matches!(result, Err(Error::UnknownKey(kid)) if kid == "rogue-key"));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    // GIVEN: a hand-built payload long past expiry
    let server = mock_jwks_server(&["test-key-1"], 1).await;
    let keystore = keystore_for("test-key-1", Some(format!("{}/openid/jwks", server.uri())));

    let mut payload = ClaimsMap::new();
    payload.insert("sub".to_string(), Value::String("user-1".to_string()));
    payload.insert("exp".to_string(), Value::from(1_000u64));
    let token = keystore.sign(&payload).unwrap();

    // THEN: signature is fine, expiry is not
    let result = TokenVerifier::new(keystore).verify(&token).await;
    assert!(matches!(result, Err(Error::Jwt(_))));
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    // GIVEN: a valid token with a flipped payload
    let server = mock_jwks_server(&["test-key-1"], 1).await;
    let keystore = keystore_for("test-key-1", Some(format!("{}/openid/jwks", server.uri())));

    let mut payload = ClaimsMap::new();
    payload.insert("sub".to_string(), Value::String("user-1".to_string()));
    payload.insert("exp".to_string(), Value::from(4_102_444_800u64));
    let token = keystore.sign(&payload).unwrap();

    // WHEN: the payload segment is replaced wholesale
    let mut parts: Vec<&str> = token.split('.').collect();
    let forged = "eyJzdWIiOiJ1c2VyLTIiLCJleHAiOjQxMDI0NDQ4MDB9";
    parts[1] = forged;
    let tampered = parts.join(".");

    // THEN: the signature no longer matches
    let result = TokenVerifier::new(keystore).verify(&tampered).await;
    assert!(matches!(result, Err(Error::Jwt(_))));
}
