use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub session_file: String,
    pub auth_server_url: String,
    pub auth_app_id: String,
    pub auth_app_secret: String,
    pub auth_redirect_uri: String,
    pub default_quota_bytes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./files".to_string()),
            session_file: env::var("SESSION_FILE")
                .unwrap_or_else(|_| "./data/user.json".to_string()),
            auth_server_url: env::var("AUTH_SERVER_URL")
                .unwrap_or_else(|_| "https://auth.example.com".to_string()),
            auth_app_id: env::var("AUTH_APP_ID").unwrap_or_default(),
            auth_app_secret: env::var("AUTH_APP_SECRET").unwrap_or_default(),
            auth_redirect_uri: env::var("AUTH_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/auth/callback".to_string()),
            default_quota_bytes: env::var("DEFAULT_QUOTA_BYTES")
                .unwrap_or_else(|_| "524288000".to_string()) // 500 MiB
                .parse()?,
        };

        std::fs::create_dir_all(&config.upload_dir)?;

        Ok(config)
    }
}
