//! One-time code bookkeeping for sign-up verification and password reset.
//!
//! A [`CodeState`] is a plain value; the auth service loads it from a row,
//! runs `issue` or `check`, and writes the fields back.

use chrono::{DateTime, Utc};
use password_hash::rand_core::{OsRng, RngCore};
use thiserror::Error;

use crate::{config::OtpPolicy, error::AppError};

pub const CODE_DIGITS: usize = 6;

pub fn generate_code() -> String {
    let value = OsRng.next_u32() % 1_000_000;
    format!("{value:0width$}", width = CODE_DIGITS)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("Too many attempts, try again after {0}")]
    Blocked(DateTime<Utc>),

    #[error("No active code, request a new one")]
    Missing,

    #[error("Code has expired, request a new one")]
    Expired,

    #[error("Invalid code, {0} attempts left")]
    Mismatch(i32),

    #[error("Invalid code, too many attempts, try again after {0}")]
    Exhausted(DateTime<Utc>),
}

impl From<CodeError> for AppError {
    fn from(err: CodeError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeState {
    pub code_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl CodeState {
    pub fn ensure_not_blocked(&self, now: DateTime<Utc>) -> Result<(), CodeError> {
        match self.blocked_until {
            Some(until) if until > now => Err(CodeError::Blocked(until)),
            _ => Ok(()),
        }
    }

    /// Stores a fresh code and returns its expiry. Refused while blocked.
    pub fn issue(
        &mut self,
        code_hash: String,
        now: DateTime<Utc>,
        policy: &OtpPolicy,
    ) -> Result<DateTime<Utc>, CodeError> {
        self.ensure_not_blocked(now)?;
        let expires_at = now + policy.ttl;
        self.code_hash = Some(code_hash);
        self.expires_at = Some(expires_at);
        self.attempts = 0;
        self.blocked_until = None;
        Ok(expires_at)
    }

    /// `matches` compares the submitted code against the stored hash.
    pub fn check<F>(
        &mut self,
        matches: F,
        now: DateTime<Utc>,
        policy: &OtpPolicy,
    ) -> Result<(), CodeError>
    where
        F: FnOnce(&str) -> bool,
    {
        self.ensure_not_blocked(now)?;
        let Some(hash) = self.code_hash.as_deref() else {
            return Err(CodeError::Missing);
        };
        if self.expires_at.is_none_or(|expires_at| expires_at <= now) {
            self.clear();
            return Err(CodeError::Expired);
        }

        if matches(hash) {
            self.clear();
            self.attempts = 0;
            self.blocked_until = None;
            return Ok(());
        }

        self.attempts += 1;
        if self.attempts >= policy.max_attempts {
            let until = now + policy.block;
            self.clear();
            self.attempts = 0;
            self.blocked_until = Some(until);
            return Err(CodeError::Exhausted(until));
        }
        Err(CodeError::Mismatch(policy.max_attempts - self.attempts))
    }

    fn clear(&mut self) {
        self.code_hash = None;
        self.expires_at = None;
    }
}
