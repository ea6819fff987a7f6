//! Utility functions for the submission client
//!
//! Includes the wait primitive, wall-clock helpers and display formatting

/// Clock and delay helpers shared by every pipeline stage
pub mod clock {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    /// Suspend the calling task for `milliseconds` without blocking others
    pub async fn wait(milliseconds: u64) {
        tokio::time::sleep(Duration::from_millis(milliseconds)).await;
    }

    /// Wall-clock seconds since the unix epoch, with sub-second precision
    pub fn unix_ts() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default()
    }

    /// Elapsed time in seconds, rounded to millisecond precision
    pub fn round_latency(elapsed: Duration) -> f64 {
        elapsed.as_millis() as f64 / 1000.0
    }
}

/// Display helpers used by callers rendering addresses and links
pub mod common {
    /// Shorten `value` to `head...tail` when it is longer than `max_len` characters
    pub fn truncate_middle(value: &str, max_len: usize) -> String {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= max_len {
            return value.to_string();
        }

        let half = max_len / 2;
        let head: String = chars[..half].iter().collect();
        let tail: String = chars[chars.len() - half..].iter().collect();
        format!("{}...{}", head, tail)
    }

    /// Build a block explorer link for a transaction signature
    pub fn explorer_url(base_url: &str, signature: &str, cluster: &str) -> String {
        format!(
            "{}/tx/{}?cluster={}",
            base_url.trim_end_matches('/'),
            signature,
            cluster
        )
    }
}

pub use clock::{round_latency, unix_ts, wait};
