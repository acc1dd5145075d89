use serde::{Deserialize, Serialize};

/// A single regular file in a user's subtree. Computed from the filesystem
/// on every request, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size_bytes: i64,
    /// Path relative to the user's root, always `/`-joined.
    pub relative_path: String,
}
