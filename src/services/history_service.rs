use uuid::Uuid;

use crate::{
    entity::{AdminLogs, AuthHistories, admin_logs, auth_histories},
    services::resource::Resource,
};

pub struct AdminLogResource;

impl Resource for AdminLogResource {
    type Entity = AdminLogs;
    const NAME: &'static str = "admin-logs";
    const LABEL: &'static str = "Admin log";

    fn id(model: &admin_logs::Model) -> Uuid {
        model.id
    }
}

pub struct AuthHistoryResource;

impl Resource for AuthHistoryResource {
    type Entity = AuthHistories;
    const NAME: &'static str = "auth-histories";
    const LABEL: &'static str = "Auth history";

    fn id(model: &auth_histories::Model) -> Uuid {
        model.id
    }
}
