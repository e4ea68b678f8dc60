use std::time::Duration;

use claimloop_shared::Owner;
use claimloop_shared::travel::DEFAULT_WALKING_SPEED_KMH;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_PLAYER: Owner = Owner::Green;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const FEED_RETRY_BASE_MS: u64 = 500;
pub const FEED_RETRY_MAX_MS: u64 = 10_000;
/// Playback speed multiplier applied to walking speed; the loop replay is a display effect.
pub const DEFAULT_PLAYBACK_SPEEDUP: f64 = 60.0;

pub fn server_url() -> String {
    std::env::var("CLAIMLOOP_SERVER_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
}

/// Player color from `PLAYER_COLOR`. Unknown colors fall back to the default with a warning.
pub fn player() -> Owner {
    match std::env::var("PLAYER_COLOR") {
        Ok(value) => value.parse::<Owner>().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring PLAYER_COLOR; using {DEFAULT_PLAYER}");
            DEFAULT_PLAYER
        }),
        Err(_) => DEFAULT_PLAYER,
    }
}

pub fn walking_speed_kmh() -> f64 {
    std::env::var("WALKING_SPEED_KMH")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(DEFAULT_WALKING_SPEED_KMH)
}

pub fn playback_enabled() -> bool {
    std::env::var("CLAIMLOOP_PLAYBACK")
        .map(|value| {
            !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            )
        })
        .unwrap_or(true)
}

pub fn playback_speedup() -> f64 {
    std::env::var("CLAIMLOOP_PLAYBACK_SPEEDUP")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(DEFAULT_PLAYBACK_SPEEDUP)
}

pub fn http_timeout() -> Duration {
    std::env::var("CLAIMLOOP_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
}

pub fn connect_timeout() -> Duration {
    std::env::var("CLAIMLOOP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
}
