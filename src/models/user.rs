use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated principal as returned by the identity provider.
///
/// Serialized field names match the persisted `user.json` layout; every
/// field added after the initial schema must carry a default so records
/// written by older builds still deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    #[serde(rename = "username", default = "default_display_name")]
    pub display_name: String,
    pub access_token: String,
    #[serde(default = "Utc::now")]
    pub login_time: DateTime<Utc>,
    #[serde(rename = "storageLimit", default)]
    pub storage_limit_bytes: i64,
    #[serde(rename = "usedStorage", default)]
    pub used_storage_bytes: i64,
}

fn default_display_name() -> String {
    "Unknown".to_string()
}
