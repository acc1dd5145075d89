use std::sync::Arc;

use chrono::Utc;

use crate::{config::Config, models::UserRecord, services::session_cache::SessionCache};

/// Orchestrates identity-provider lookups and quota admission over an
/// injected session cache. The provider is only contacted on the login
/// callback; every later request is answered from the cache alone, so a
/// provider-side revocation goes unnoticed until restart.
pub struct AuthService {
    http: reqwest::Client,
    auth_server_url: String,
    app_secret: String,
    default_quota_bytes: i64,
    sessions: Arc<SessionCache>,
}

impl AuthService {
    pub fn new(config: &Config, sessions: Arc<SessionCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_server_url: config.auth_server_url.clone(),
            app_secret: config.auth_app_secret.clone(),
            default_quota_bytes: config.default_quota_bytes,
            sessions,
        }
    }

    /// Exchanges an authorization code for a user profile, caches the
    /// resulting record and persists it. Every provider failure mode
    /// (network, non-200, malformed body, missing `user_id`) collapses to
    /// `None` so the caller renders one generic login failure without
    /// leaking provider internals.
    pub async fn resolve_callback(&self, code: &str) -> Option<UserRecord> {
        let profile = self.fetch_profile(code).await?;

        let record = UserRecord {
            user_id: profile.user_id,
            display_name: profile
                .nickname
                .unwrap_or_else(|| "Unknown".to_string()),
            access_token: code.to_string(),
            login_time: Utc::now(),
            storage_limit_bytes: self.default_quota_bytes,
            used_storage_bytes: 0,
        };

        self.sessions.insert(record.clone()).await;
        tracing::info!("User {} logged in", record.user_id);
        Some(record)
    }

    /// Pure cache lookup; never re-contacts the provider.
    pub async fn authenticate(&self, token: &str) -> Option<UserRecord> {
        self.sessions.get(token).await
    }

    /// Check-only optimistic admission: reads the cached counters and
    /// decides, without mutating or persisting anything. Equality admits.
    /// The admit-then-update pair is not atomic; callers that need the
    /// race closed use `SessionCache::try_reserve` instead.
    pub async fn admit_upload(&self, user_id: &str, incoming_bytes: i64) -> bool {
        match self.sessions.get_by_user_id(user_id).await {
            Some(user) => {
                user.used_storage_bytes + incoming_bytes <= user.storage_limit_bytes
            }
            None => false,
        }
    }

    async fn fetch_profile(&self, code: &str) -> Option<ProviderProfile> {
        let url = format!("{}/auth/app/user", self.auth_server_url);
        let response = self
            .http
            .get(&url)
            .query(&[("app_secret", self.app_secret.as_str()), ("user_code", code)])
            .send()
            .await
            .map_err(|e| tracing::warn!("Identity provider request failed: {}", e))
            .ok()?;

        if !response.status().is_success() {
            tracing::warn!(
                "Identity provider returned status {}",
                response.status()
            );
            return None;
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| tracing::warn!("Malformed identity provider response: {}", e))
            .ok()?;

        let user_id = match body.get("user_id").and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => {
                tracing::warn!("Identity provider response missing user_id");
                return None;
            }
        };

        let nickname = body
            .get("nickname")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Some(ProviderProfile { user_id, nickname })
    }
}

struct ProviderProfile {
    user_id: String,
    nickname: Option<String>,
}
