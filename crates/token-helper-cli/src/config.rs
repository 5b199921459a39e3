use std::{env, path::PathBuf, time::Duration};

use thiserror::Error;

pub const KEY_ID_ENV: &str = "VAULT_GCP_KMS_CRYPTO_KEY_ID";
pub const TIMEOUT_ENV: &str = "VAULT_GCP_KMS_TIMEOUT";
pub const TOKEN_PATH_ENV: &str = "VAULT_GCP_KMS_ENCRYPTED_TOKEN_PATH";
pub const ENDPOINT_ENV: &str = "VAULT_GCP_KMS_ENDPOINT";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TOKEN_FILE: &str = ".vault-gcp-kms-encrypted-token";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("failed to parse timeout {value:?}: {reason}")]
    InvalidTimeout { value: String, reason: String },
    #[error("failed to get home directory")]
    NoHomeDir,
}

/// Settings resolved once from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Full Cloud KMS crypto key resource id.
    pub key_id: String,
    /// Upper bound for each encrypt/decrypt call.
    pub timeout: Duration,
    pub token_path: PathBuf,
    /// KMS base URL override.
    pub endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok(), dirs::home_dir())
    }

    /// Build a config from `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F, home: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let key_id = get(KEY_ID_ENV).ok_or(ConfigError::Missing(KEY_ID_ENV))?;

        let timeout = match get(TIMEOUT_ENV) {
            Some(raw) => {
                let invalid = |reason: String| ConfigError::InvalidTimeout {
                    value: raw.clone(),
                    reason,
                };
                let timeout = parse_duration(&raw).map_err(&invalid)?;
                if timeout.is_zero() {
                    return Err(invalid("timeout must be greater than zero".to_string()));
                }
                timeout
            }
            None => DEFAULT_TIMEOUT,
        };

        let token_path = match get(TOKEN_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => home.ok_or(ConfigError::NoHomeDir)?.join(DEFAULT_TOKEN_FILE),
        };

        Ok(Self {
            key_id,
            timeout,
            token_path,
            endpoint: get(ENDPOINT_ENV),
        })
    }
}

/// Parse a Go-style duration such as `10s`, `1m30s`, `1.5h` or `250ms`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let mut rest = value.trim();
    rest = rest.strip_prefix('+').unwrap_or(rest);
    if rest.is_empty() {
        return Err("duration is empty".to_string());
    }
    if rest.starts_with('-') {
        return Err("duration must not be negative".to_string());
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("expected a number, found {number:?}"));
        }

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3600 * 1_000_000_000,
            "" => return Err(format!("missing unit after {number:?}")),
            other => return Err(format!("unknown unit {other:?}")),
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| format!("number {whole:?} is too large"))?
        };
        let mut nanos = whole
            .checked_mul(unit_nanos)
            .ok_or_else(|| "duration overflows".to_string())?;
        if !frac.is_empty() {
            // Digits past 18 are below nanosecond resolution for every unit.
            let frac = &frac[..frac.len().min(18)];
            let scale = 10u128.pow(frac.len() as u32);
            let frac: u128 = frac.parse().map_err(|_| format!("bad fraction {frac:?}"))?;
            nanos += frac * unit_nanos / scale;
        }

        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| "duration overflows".to_string())?;
        rest = tail;
    }

    u64::try_from(total_nanos)
        .map(Duration::from_nanos)
        .map_err(|_| "duration overflows".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const KEY: &str = "projects/p/locations/global/keyRings/r/cryptoKeys/k";

    #[test]
    fn applies_defaults() {
        let cfg = Config::from_lookup(lookup(&[(KEY_ID_ENV, KEY)]), Some("/home/vault".into()))
            .expect("config");
        assert_eq!(
            cfg,
            Config {
                key_id: KEY.into(),
                timeout: DEFAULT_TIMEOUT,
                token_path: PathBuf::from("/home/vault/.vault-gcp-kms-encrypted-token"),
                endpoint: None,
            }
        );
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(
            lookup(&[
                (KEY_ID_ENV, KEY),
                (TIMEOUT_ENV, "1m30s"),
                (TOKEN_PATH_ENV, "/tmp/token"),
                (ENDPOINT_ENV, "http://localhost:9011"),
            ]),
            None,
        )
        .expect("config");
        assert_eq!(cfg.timeout, Duration::from_secs(90));
        assert_eq!(cfg.token_path, PathBuf::from("/tmp/token"));
        assert_eq!(cfg.endpoint.as_deref(), Some("http://localhost:9011"));
    }

    #[test]
    fn missing_key_id_is_fatal() {
        let err = Config::from_lookup(lookup(&[(TIMEOUT_ENV, "5s")]), Some("/home".into()))
            .expect_err("should fail");
        assert_eq!(err, ConfigError::Missing(KEY_ID_ENV));

        let err = Config::from_lookup(lookup(&[(KEY_ID_ENV, "")]), Some("/home".into()))
            .expect_err("empty counts as missing");
        assert_eq!(err, ConfigError::Missing(KEY_ID_ENV));
    }

    #[test]
    fn empty_timeout_uses_default() {
        let cfg = Config::from_lookup(
            lookup(&[(KEY_ID_ENV, KEY), (TIMEOUT_ENV, "")]),
            Some("/home".into()),
        )
        .expect("config");
        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn rejects_bad_and_zero_timeouts() {
        for raw in ["ten seconds", "10", "0", "0s", "-5s", "5d"] {
            let err = Config::from_lookup(
                lookup(&[(KEY_ID_ENV, KEY), (TIMEOUT_ENV, raw)]),
                Some("/home".into()),
            )
            .expect_err(raw);
            assert!(matches!(err, ConfigError::InvalidTimeout { .. }), "{raw}");
        }
    }

    #[test]
    fn default_path_needs_a_home_directory() {
        let err = Config::from_lookup(lookup(&[(KEY_ID_ENV, KEY)]), None).expect_err("no home");
        assert_eq!(err, ConfigError::NoHomeDir);
    }

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1h2m3s"), Ok(Duration::from_secs(3723)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("+2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("1.2.3s").is_err());
    }
}
