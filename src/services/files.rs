use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::FileEntry;

/// Walks a user's isolated subtree. The filesystem is the sole source of
/// truth here; nothing is cached between calls.
pub struct FileService {
    upload_dir: PathBuf,
}

impl FileService {
    pub fn new<P: AsRef<Path>>(upload_dir: P) -> Self {
        Self {
            upload_dir: upload_dir.as_ref().to_path_buf(),
        }
    }

    /// Root of a user's subtree: `<upload_dir>/users/<user_id>`.
    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.upload_dir.join("users").join(user_id)
    }

    /// Every regular file under `root`, recursively. A missing or
    /// non-directory root means the user simply has no files yet, so the
    /// result is an empty list rather than an error. Relative paths are
    /// `/`-joined regardless of the host separator.
    pub fn list_user_files(&self, root: &Path) -> Vec<FileEntry> {
        let mut files = Vec::new();
        if root.is_dir() {
            collect_files(root, "", &mut files);
        }
        files
    }

    /// Total size of all regular files under `root`. Missing root, or any
    /// I/O error that prevents the walk from completing, yields 0: storage
    /// pages must always render something, so the policy is a best-effort
    /// total that fails silently to zero.
    pub fn folder_size(&self, root: &Path) -> i64 {
        if !root.is_dir() {
            return 0;
        }
        walk_size(root).unwrap_or(0)
    }
}

fn collect_files(dir: &Path, base: &str, files: &mut Vec<FileEntry>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        if path.is_dir() {
            let sub_base = if base.is_empty() {
                name
            } else {
                format!("{}/{}", base, name)
            };
            collect_files(&path, &sub_base, files);
        } else {
            let size = match entry.metadata() {
                Ok(meta) => meta.len() as i64,
                Err(_) => continue,
            };
            let relative_path = if base.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", base, name)
            };
            files.push(FileEntry {
                name,
                size_bytes: size,
                relative_path,
            });
        }
    }
}

fn walk_size(dir: &Path) -> io::Result<i64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            total += walk_size(&path)?;
        } else {
            total += entry.metadata()?.len() as i64;
        }
    }
    Ok(total)
}
