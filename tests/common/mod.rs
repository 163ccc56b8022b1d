#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use shop_admin_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    error::AppResult,
    notify::{CodePurpose, CodeSender},
    state::AppState,
};

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some(database_url.to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "OTP_MAX_ATTEMPTS" => Some("3".to_string()),
        "UPLOAD_DIR" => Some(std::env::temp_dir().join("shop-admin-uploads").display().to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Keeps every code handed out so tests can complete verification and reset flows.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String, CodePurpose)>>,
}

impl RecordingSender {
    pub fn last_code(&self, mobile: &str, purpose: CodePurpose) -> Option<String> {
        self.sent
            .lock()
            .expect("sender lock")
            .iter()
            .rev()
            .find(|(to, _, p)| to == mobile && *p == purpose)
            .map(|(_, code, _)| code.clone())
    }
}

impl CodeSender for RecordingSender {
    fn send(&self, mobile: &str, code: &str, purpose: CodePurpose) -> AppResult<()> {
        self.sent
            .lock()
            .expect("sender lock")
            .push((mobile.to_string(), code.to_string(), purpose));
        Ok(())
    }
}

/// State backed by no database, for router tests that never reach a query.
pub fn offline_state() -> AppState {
    AppState::new(
        DatabaseConnection::Disconnected,
        test_config("postgres://unused"),
        Arc::new(RecordingSender::default()),
    )
}

pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<(AppState, Arc<RecordingSender>)> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE transactions, payments, order_items, orders, baskets, answers, questions, \
         comments, products, brands, categories, coupons, banners, website_informations, \
         admin_logs, auth_histories, forgot_passwords, refresh_tokens, users, roles \
         RESTART IDENTITY CASCADE",
    ))
    .await?;

    let sender = Arc::new(RecordingSender::default());
    let state = AppState::new(orm, test_config(database_url), sender.clone());
    Ok((state, sender))
}
