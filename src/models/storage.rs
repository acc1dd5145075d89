use serde::{Deserialize, Serialize};

/// Per-request storage usage view. `used` is recomputed from a fresh walk of
/// the user's subtree, not from the admission counter, so the two can
/// disagree after out-of-band deletions.
#[derive(Debug, Serialize, Deserialize)]
pub struct StorageSummary {
    pub limit: i64,
    pub used: i64,
    pub remaining: i64,
    pub percentage_used: f64,
    pub limit_formatted: String,
    pub used_formatted: String,
    pub remaining_formatted: String,
}

impl StorageSummary {
    pub fn new(limit: i64, used: i64) -> Self {
        let remaining = (limit - used).max(0);
        let percentage_used = if limit > 0 {
            used as f64 / limit as f64 * 100.0
        } else {
            0.0
        };

        Self {
            limit,
            used,
            remaining,
            percentage_used,
            limit_formatted: format_size(limit),
            used_formatted: format_size(used),
            remaining_formatted: format_size(remaining),
        }
    }
}

const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human-readable byte count, 1024 grouping, one decimal place, clamped at TB.
pub fn format_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 Bytes".to_string();
    }

    let group = (((bytes as f64).log10() / 1024f64.log10()) as usize).min(UNITS.len() - 1);
    format!(
        "{:.1} {}",
        bytes as f64 / 1024f64.powi(group as i32),
        UNITS[group]
    )
}
