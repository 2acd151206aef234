//! Environment variable utilities
//!
//! Typed readers for `COTHREAD_*` overrides with defaults.
//!
//! # Usage
//!
//! ```ignore
//! use cothread_core::env::{env_get, env_get_bool, env_get_size};
//!
//! let spins: u32 = env_get("COTHREAD_SPINS", 10);
//! let guard: bool = env_get_bool("COTHREAD_GUARD_PAGE", true);
//! let stack: usize = env_get_size("COTHREAD_STACK_SIZE", 64 * 1024); // "256K", "2M"
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Unset variables and values that fail to parse both yield `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true and
/// "0", "false", "no", "off" as false. Anything else returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as a byte size
///
/// Accepts plain byte counts and `K`/`M`/`G` suffixes (binary units,
/// case-insensitive, optional trailing `B`): `65536`, `64K`, `2MB`.
pub fn env_get_size(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_size(&v))
        .unwrap_or(default)
}

/// Parse a human-readable byte size
pub fn parse_size(text: &str) -> Option<usize> {
    let text = text.trim().to_ascii_uppercase();
    let text = text.strip_suffix('B').unwrap_or(text.as_str());
    let (digits, shift) = match text.chars().last()? {
        'K' => (&text[..text.len() - 1], 10),
        'M' => (&text[..text.len() - 1], 20),
        'G' => (&text[..text.len() - 1], 30),
        _ => (text, 0),
    };
    let digits: String = digits.trim().chars().filter(|c| *c != '_').collect();
    let value: usize = digits.parse().ok()?;
    value.checked_mul(1usize.checked_shl(shift)?)
}

// ============================================================================
// Tests
// ============================================================================
