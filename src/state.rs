use std::sync::Arc;

use crate::{config::AppConfig, db::OrmConn, notify::CodeSender};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub codes: Arc<dyn CodeSender>,
}

impl AppState {
    pub fn new(orm: OrmConn, config: AppConfig, codes: Arc<dyn CodeSender>) -> Self {
        Self {
            orm,
            config: Arc::new(config),
            codes,
        }
    }
}
