use std::{env, time::Duration};

// Runtime/server constants (not referee rules).

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn http_port() -> u16 {
    env_or("MATCH_SERVER_PORT", 5000)
}

/// Bounds both the strategy connect and every strategy call.
pub fn strategy_timeout() -> Duration {
    Duration::from_millis(env_or("STRATEGY_TIMEOUT_MS", 3000))
}

pub fn blue_strategy_port() -> u16 {
    env_or("BLUE_STRATEGY_PORT", 20000)
}

pub fn yellow_strategy_port() -> u16 {
    env_or("YELLOW_STRATEGY_PORT", 20001)
}

pub fn convert_yellow_data() -> bool {
    match env::var("CONVERT_YELLOW_DATA") {
        Ok(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        Err(_) => true,
    }
}

pub fn placement_pause() -> Duration {
    Duration::from_millis(env_or("PLACEMENT_PAUSE_MS", 2000))
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const EVENT_BROADCAST_CAPACITY: usize = 256;
pub const FIELD_COMMAND_CAPACITY: usize = 256;
