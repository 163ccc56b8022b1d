use std::{collections::HashMap, path::PathBuf};

use chrono::Duration;
use shop_admin_api::config::AppConfig;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

const REQUIRED: [(&str, &str); 2] = [
    ("DATABASE_URL", "postgres://localhost/shop"),
    ("JWT_SECRET", "secret"),
];

#[test]
fn defaults_apply_when_optional_keys_are_missing() {
    let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 3000);
    assert_eq!(config.access_token_ttl, Duration::minutes(60));
    assert_eq!(config.refresh_token_ttl, Duration::days(30));
    assert_eq!(config.otp.ttl, Duration::minutes(2));
    assert_eq!(config.otp.max_attempts, 5);
    assert_eq!(config.otp.block, Duration::minutes(15));
    assert_eq!(config.upload_dir, PathBuf::from("uploads"));
}

#[test]
fn overrides_are_parsed() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend([
        ("APP_PORT", "8080"),
        ("ACCESS_TOKEN_TTL_MINUTES", "5"),
        ("OTP_MAX_ATTEMPTS", "2"),
        ("UPLOAD_DIR", "/var/shop"),
    ]);
    let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.access_token_ttl, Duration::minutes(5));
    assert_eq!(config.otp.max_attempts, 2);
    assert_eq!(config.upload_dir, PathBuf::from("/var/shop"));
}

#[test]
fn missing_secrets_and_bad_numbers_fail() {
    let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
    assert!(err.to_string().contains("JWT_SECRET"));

    let mut pairs = REQUIRED.to_vec();
    pairs.push(("APP_PORT", "eighty"));
    let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
    assert!(err.to_string().contains("APP_PORT"));

    let mut pairs = REQUIRED.to_vec();
    pairs.push(("OTP_MAX_ATTEMPTS", "0"));
    assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
}

#[test]
fn durations_must_be_positive() {
    for key in [
        "ACCESS_TOKEN_TTL_MINUTES",
        "REFRESH_TOKEN_TTL_DAYS",
        "OTP_TTL_MINUTES",
        "OTP_BLOCK_MINUTES",
    ] {
        for raw in ["0", "-5"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, raw));
            let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(err.to_string().contains(key), "{key}={raw}: {err}");
        }
    }
}

#[test]
fn oversized_durations_are_errors() {
    for (key, raw) in [
        ("ACCESS_TOKEN_TTL_MINUTES", "9223372036854775807"),
        ("REFRESH_TOKEN_TTL_DAYS", "9223372036854775807"),
        ("OTP_BLOCK_MINUTES", "200000000000"),
    ] {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((key, raw));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{key}={raw}: {err}");
    }
}
