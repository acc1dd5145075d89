use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::models::UserRecord;

/// Disk-persisted access-token -> user mapping.
///
/// The lock is the only synchronization primitive in the core: lookups take
/// the shared side and run in parallel, while every mutation holds the
/// exclusive side across both the in-memory change and the file rewrite.
/// That serializes all writers against the disk, which keeps the persisted
/// file self-consistent at every save at the cost of write latency growing
/// with the record count.
pub struct SessionCache {
    path: PathBuf,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl SessionCache {
    /// Loads the cache from a JSON-array file. An absent file is created
    /// empty; a malformed or empty file leaves the cache empty without
    /// touching the file. Corruption never prevents startup, the records
    /// are simply lost until the next save overwrites them.
    pub async fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut users = HashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => {}
            Ok(bytes) => match serde_json::from_slice::<Vec<UserRecord>>(&bytes) {
                Ok(records) => {
                    for record in records {
                        users.insert(record.access_token.clone(), record);
                    }
                }
                Err(e) => {
                    tracing::warn!("Malformed session file {}: {}", path.display(), e);
                }
            },
            Err(_) => {
                if let Some(parent) = path.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        tracing::warn!("Failed to create session directory: {}", e);
                    }
                }
                if let Err(e) = tokio::fs::write(&path, b"").await {
                    tracing::warn!("Failed to create session file: {}", e);
                }
            }
        }

        tracing::info!(
            "Loaded {} session record(s) from {}",
            users.len(),
            path.display()
        );

        Self {
            path,
            users: RwLock::new(users),
        }
    }

    /// Lookup by access token. No TTL: records live until restart or until
    /// the identity provider rejects the token on its side.
    pub async fn get(&self, token: &str) -> Option<UserRecord> {
        self.users.read().await.get(token).cloned()
    }

    /// Lookup by user id. Linear scan; the cache holds at most the set of
    /// concurrently logged-in users, which is small at this service's scale.
    pub async fn get_by_user_id(&self, user_id: &str) -> Option<UserRecord> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.user_id == user_id)
            .cloned()
    }

    /// Inserts (or replaces) a record keyed by its access token and
    /// persists the whole cache.
    pub async fn insert(&self, record: UserRecord) {
        let mut users = self.users.write().await;
        users.insert(record.access_token.clone(), record);
        self.save(&users).await;
    }

    /// Adds `delta_bytes` to a user's usage counter and persists. A missing
    /// user is a silent no-op: the caller is an already-admitted upload that
    /// cannot roll back the file it just wrote.
    pub async fn update_usage(&self, user_id: &str, delta_bytes: i64) {
        let mut users = self.users.write().await;
        if let Some(user) = users.values_mut().find(|u| u.user_id == user_id) {
            user.used_storage_bytes += delta_bytes;
            self.save(&users).await;
        }
    }

    /// Atomic admit-and-reserve: checks the quota and commits the usage
    /// increment in one exclusive critical section, so two in-flight uploads
    /// for the same user cannot both slip under the limit. Returns false for
    /// an unknown user or an over-quota request, leaving state untouched.
    pub async fn try_reserve(&self, user_id: &str, bytes: i64) -> bool {
        let mut users = self.users.write().await;
        let user = match users.values_mut().find(|u| u.user_id == user_id) {
            Some(user) => user,
            None => return false,
        };

        if user.used_storage_bytes + bytes > user.storage_limit_bytes {
            return false;
        }

        user.used_storage_bytes += bytes;
        self.save(&users).await;
        true
    }

    /// Returns a reservation made by `try_reserve`, for the case where the
    /// subsequent file write failed. Floored at zero so a double release can
    /// never drive the counter negative.
    pub async fn release(&self, user_id: &str, bytes: i64) {
        let mut users = self.users.write().await;
        if let Some(user) = users.values_mut().find(|u| u.user_id == user_id) {
            user.used_storage_bytes = (user.used_storage_bytes - bytes).max(0);
            self.save(&users).await;
        }
    }

    /// Overwrites the session file with the full current mapping. Called
    /// with the write lock held. A failed write is logged and swallowed:
    /// the in-memory state stays good and the next save retries the full
    /// picture anyway.
    async fn save(&self, users: &HashMap<String, UserRecord>) {
        let records: Vec<&UserRecord> = users.values().collect();
        let bytes = match serde_json::to_vec(&records) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to serialize session cache: {}", e);
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Failed to create session directory: {}", e);
                return;
            }
        }

        if let Err(e) = tokio::fs::write(&self.path, bytes).await {
            tracing::warn!(
                "Failed to write session file {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
