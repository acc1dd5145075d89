use std::sync::Arc;

use crate::{
    config::Config,
    services::{AuthService, FileService, SessionCache},
};

pub mod auth;
pub mod health;
pub mod user;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionCache>,
    pub auth: Arc<AuthService>,
    pub files: Arc<FileService>,
}
