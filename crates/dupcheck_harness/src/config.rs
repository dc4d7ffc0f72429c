#![forbid(unsafe_code)]

use std::env;
use std::ops::RangeInclusive;

pub const REQUEST_TIMEOUT_MS_DEFAULT: u64 = 15_000;
pub const CONNECT_TIMEOUT_MS_DEFAULT: u64 = 3_000;
pub const RAPID_INTERVAL_MS_DEFAULT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub target_url: Option<String>,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub rapid_interval_ms: u64,
}

impl HarnessConfig {
    pub fn from_env() -> Self {
        let target_url = env::var("DUPCHECK_TARGET_URL").ok().and_then(|v| {
            let s = v.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        });
        Self {
            target_url,
            request_timeout_ms: bounded_ms(
                env::var("DUPCHECK_REQUEST_TIMEOUT_MS").ok(),
                100..=120_000,
                REQUEST_TIMEOUT_MS_DEFAULT,
            ),
            connect_timeout_ms: bounded_ms(
                env::var("DUPCHECK_CONNECT_TIMEOUT_MS").ok(),
                100..=60_000,
                CONNECT_TIMEOUT_MS_DEFAULT,
            ),
            rapid_interval_ms: bounded_ms(
                env::var("DUPCHECK_RAPID_INTERVAL_MS").ok(),
                10..=5_000,
                RAPID_INTERVAL_MS_DEFAULT,
            ),
        }
    }

    pub fn loopback_defaults() -> Self {
        Self {
            target_url: None,
            request_timeout_ms: REQUEST_TIMEOUT_MS_DEFAULT,
            connect_timeout_ms: CONNECT_TIMEOUT_MS_DEFAULT,
            rapid_interval_ms: RAPID_INTERVAL_MS_DEFAULT,
        }
    }
}

fn bounded_ms(raw: Option<String>, range: RangeInclusive<u64>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| range.contains(v))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_config_01_bounded_ms_falls_back_out_of_range() {
        assert_eq!(bounded_ms(Some("5000".to_string()), 100..=120_000, 15_000), 5_000);
        assert_eq!(bounded_ms(Some("5".to_string()), 100..=120_000, 15_000), 15_000);
        assert_eq!(
            bounded_ms(Some("999999999".to_string()), 100..=120_000, 15_000),
            15_000
        );
        assert_eq!(bounded_ms(Some("abc".to_string()), 100..=120_000, 15_000), 15_000);
        assert_eq!(bounded_ms(None, 100..=120_000, 15_000), 15_000);
    }

    #[test]
    fn at_config_02_loopback_defaults_carry_documented_values() {
        let config = HarnessConfig::loopback_defaults();
        assert_eq!(config.target_url, None);
        assert_eq!(config.request_timeout_ms, 15_000);
        assert_eq!(config.connect_timeout_ms, 3_000);
        assert_eq!(config.rapid_interval_ms, 100);
    }
}
