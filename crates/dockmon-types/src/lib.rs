//! Shared types for dockmon
//!
//! Value snapshots copied from the container runtime on each poll cycle,
//! plus the display formatting helpers used by the list rows.

use chrono::Utc;

// ============================================================================
// Runtime Snapshot Types
// ============================================================================

/// One-shot memory usage numbers for a container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub usage: u64,
    pub limit: u64,
}

/// Container state snapshot, immutable once published
#[derive(Clone, Debug, Default)]
pub struct ContainerSummary {
    /// Full container ID
    pub id: String,
    /// Image reference the container was created from
    pub image: String,
    /// Command line the container is running
    pub command: String,
    /// Human-readable status text ("Up 3 hours", "Exited (0) ...")
    pub status: String,
    /// Lowercase state keyword ("running", "exited", ...)
    pub state: String,
    /// Memory usage from the latest stats fetch (zero if unavailable)
    pub memory: MemoryStats,
    /// Resident disk usage in bytes (size of the writable layer)
    pub disk_usage: i64,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// First 12 characters of the ID, the usual short form
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// Image snapshot, immutable once published
#[derive(Clone, Debug, Default)]
pub struct ImageSummary {
    /// Full image ID, usually "sha256:..."
    pub id: String,
    /// Repository part of the most recent tag, empty for dangling images
    pub repo: String,
    /// Tag part of the most recent tag
    pub tag: String,
    /// Creation time as a unix timestamp
    pub created: i64,
}

impl ImageSummary {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// Age of the image relative to now, e.g. "3 days, 4 hs"
    pub fn age(&self) -> String {
        format_age(Utc::now().timestamp() - self.created)
    }
}

/// Strip a "sha256:" prefix and truncate to the 12-character short form
pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    if id.len() > 12 { &id[..12] } else { id }
}

// ============================================================================
// Display Formatting
// ============================================================================

/// Format a byte count with a binary unit, two decimals above bytes
pub fn format_bytes(amount: u64) -> String {
    if amount < 1024 {
        return format!("{} B", amount);
    }
    let mut value = amount as f64 / 1024.0;
    for unit in ["KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} TB", value)
}

/// Format an age in seconds as days and hours
pub fn format_age(seconds: i64) -> String {
    let mut hours = seconds.max(0) / 3600;
    let mut out = String::new();
    if hours > 24 {
        out.push_str(&format!("{} days, ", hours / 24));
        hours %= 24;
    }
    out.push_str(&format!("{} hs", hours));
    out
}

/// Truncate a string to `width` characters, keeping the tail with a "..." prefix
pub fn truncate_left(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return text.to_string();
    }
    let tail: String = chars[chars.len() - (width - 3)..].iter().collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(3600), "1 hs");
        assert_eq!(format_age(26 * 3600), "1 days, 2 hs");
        assert_eq!(format_age(-5), "0 hs");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("sha256:0123456789abcdef0123"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_truncate_left_keeps_tail() {
        assert_eq!(truncate_left("short", 10), "short");
        assert_eq!(truncate_left("abcdefghij", 8), "...fghij");
    }
}
