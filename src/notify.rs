use std::fmt;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    Verification,
    PasswordReset,
}

impl fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePurpose::Verification => f.write_str("verification"),
            CodePurpose::PasswordReset => f.write_str("password_reset"),
        }
    }
}

/// Delivers one-time codes to the account holder.
pub trait CodeSender: Send + Sync {
    fn send(&self, mobile: &str, code: &str, purpose: CodePurpose) -> AppResult<()>;
}

/// Writes codes to the log instead of a real SMS gateway.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCodeSender;

impl CodeSender for LogCodeSender {
    fn send(&self, mobile: &str, code: &str, purpose: CodePurpose) -> AppResult<()> {
        tracing::info!(%mobile, %purpose, "one-time code issued");
        tracing::debug!(%mobile, %purpose, %code, "one-time code value");
        Ok(())
    }
}
