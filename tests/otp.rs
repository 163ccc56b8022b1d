use chrono::{Duration, Utc};
use shop_admin_api::{
    config::OtpPolicy,
    services::otp::{CodeError, CodeState, generate_code},
};

fn policy() -> OtpPolicy {
    OtpPolicy {
        ttl: Duration::minutes(2),
        max_attempts: 3,
        block: Duration::minutes(15),
    }
}

fn issued(now: chrono::DateTime<Utc>) -> CodeState {
    let mut state = CodeState::default();
    state
        .issue("123456".into(), now, &policy())
        .expect("fresh state is not blocked");
    state
}

#[test]
fn generated_codes_are_six_digits() {
    for _ in 0..50 {
        let code = generate_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}

#[test]
fn matching_code_clears_state() {
    let now = Utc::now();
    let mut state = issued(now);
    state
        .check(|stored| stored == "123456", now, &policy())
        .expect("code matches");
    assert_eq!(state.code_hash, None);
    assert_eq!(state.attempts, 0);

    // A used code cannot be replayed.
    assert_eq!(
        state.check(|stored| stored == "123456", now, &policy()),
        Err(CodeError::Missing)
    );
}

#[test]
fn expired_code_is_rejected_and_cleared() {
    let now = Utc::now();
    let mut state = issued(now);
    let later = now + Duration::minutes(3);
    assert_eq!(
        state.check(|_| true, later, &policy()),
        Err(CodeError::Expired)
    );
    assert_eq!(state.code_hash, None);
}

#[test]
fn repeated_mismatches_block_for_the_window() {
    let now = Utc::now();
    let mut state = issued(now);

    assert_eq!(state.check(|_| false, now, &policy()), Err(CodeError::Mismatch(2)));
    assert_eq!(state.check(|_| false, now, &policy()), Err(CodeError::Mismatch(1)));

    let until = now + Duration::minutes(15);
    assert_eq!(state.check(|_| false, now, &policy()), Err(CodeError::Exhausted(until)));
    assert_eq!(state.attempts, 0);
    assert_eq!(state.code_hash, None);
    assert_eq!(state.blocked_until, Some(until));

    // Blocked: neither checking nor reissuing is allowed until the window passes.
    assert_eq!(state.check(|_| true, now, &policy()), Err(CodeError::Blocked(until)));
    assert_eq!(
        state.issue("654321".into(), now + Duration::minutes(1), &policy()),
        Err(CodeError::Blocked(until))
    );

    let after = until + Duration::seconds(1);
    state
        .issue("654321".into(), after, &policy())
        .expect("block lifted");
    assert_eq!(state.blocked_until, None);
    assert!(state.check(|stored| stored == "654321", after, &policy()).is_ok());
}

#[test]
fn reissuing_resets_attempts() {
    let now = Utc::now();
    let mut state = issued(now);
    let _ = state.check(|_| false, now, &policy());
    assert_eq!(state.attempts, 1);

    state.issue("999999".into(), now, &policy()).unwrap();
    assert_eq!(state.attempts, 0);
    assert_eq!(state.expires_at, Some(now + Duration::minutes(2)));
}
