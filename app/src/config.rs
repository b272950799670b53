use crate::error::ConfigError;
use std::{env, str::FromStr, time::Duration};

const DEFAULT_STATUS_URL: &str = "https://autoncorp.com/biodome/get_status.php";
const DEFAULT_WEBCAM_URL: &str = "https://autoncorp.com/biodome/get_webcam.php";
const DEFAULT_TOKEN_URL: &str =
    "https://frontend-api-v3.pump.fun/coins/jk1T35eWK41MBMM8AWoYVaNbjHEEQzMDetTsfnqpump";

/// Settings of one fixed-interval poll loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub single_flight: bool,
    /// A flight older than this is abandoned by the next tick
    pub max_in_flight: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Config {
    database_url: String,
    server_port: u16,
    static_dir: String,
    status_url: String,
    webcam_url: String,
    token_url: String,
    upstream_timeout: Duration,
    db_max_connections: u32,
    db_idle_timeout: Duration,
    db_acquire_timeout: Duration,
    cache_ttl: Duration,
    sensor_poll: PollConfig,
    token_poll: PollConfig,
    shutdown_timeout: Duration,
}

impl Config {
    /// Reads the process environment, after merging an optional `.env` file
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let max_in_flight = match parse_or(&var, "POLL_MAX_IN_FLIGHT_SECS", 600u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Config {
            database_url,
            server_port: parse_or(&var, "PORT", 3000)?,
            static_dir: var("STATIC_DIR").unwrap_or_else(|| "public".to_owned()),
            status_url: var("STATUS_URL").unwrap_or_else(|| DEFAULT_STATUS_URL.to_owned()),
            webcam_url: var("WEBCAM_URL").unwrap_or_else(|| DEFAULT_WEBCAM_URL.to_owned()),
            token_url: var("TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_owned()),
            upstream_timeout: secs_or(&var, "UPSTREAM_TIMEOUT_SECS", 10)?,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            db_idle_timeout: secs_or(&var, "DB_IDLE_TIMEOUT_SECS", 30)?,
            db_acquire_timeout: secs_or(&var, "DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            cache_ttl: secs_or(&var, "STATUS_CACHE_TTL_SECS", 30)?,
            sensor_poll: PollConfig {
                interval: secs_or(&var, "SENSOR_POLL_INTERVAL_SECS", 120)?,
                single_flight: parse_or(&var, "SENSOR_POLL_SINGLE_FLIGHT", true)?,
                max_in_flight,
            },
            token_poll: PollConfig {
                interval: secs_or(&var, "TOKEN_POLL_INTERVAL_SECS", 60)?,
                single_flight: parse_or(&var, "TOKEN_POLL_SINGLE_FLIGHT", false)?,
                max_in_flight,
            },
            shutdown_timeout: secs_or(&var, "SHUTDOWN_TIMEOUT_SECS", 10)?,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn static_dir(&self) -> &str {
        &self.static_dir
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    pub fn webcam_url(&self) -> &str {
        &self.webcam_url
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_idle_timeout(&self) -> Duration {
        self.db_idle_timeout
    }

    pub fn db_acquire_timeout(&self) -> Duration {
        self.db_acquire_timeout
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn sensor_poll(&self) -> PollConfig {
        self.sensor_poll
    }

    pub fn token_poll(&self) -> PollConfig {
        self.token_poll
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn secs_or<F>(var: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(var, key, default).map(Duration::from_secs)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_database_url() {
        let res = Config::from_lookup(lookup(&[("PORT", "8080")]));
        assert!(matches!(res, Err(ConfigError::Missing("DATABASE_URL"))));

        let res = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")]));
        assert!(matches!(res, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/biodome")]))
                .unwrap();

        assert_eq!("postgres://localhost/biodome", config.database_url());
        assert_eq!(3000, config.server_port());
        assert_eq!("public", config.static_dir());
        assert_eq!(DEFAULT_STATUS_URL, config.status_url());
        assert_eq!(DEFAULT_TOKEN_URL, config.token_url());
        assert_eq!(Duration::from_secs(30), config.cache_ttl());
        assert_eq!(10, config.db_max_connections());
        assert_eq!(Duration::from_secs(30), config.db_idle_timeout());

        let sensor = config.sensor_poll();
        assert_eq!(Duration::from_secs(120), sensor.interval);
        assert!(sensor.single_flight);
        assert_eq!(Some(Duration::from_secs(600)), sensor.max_in_flight);

        let token = config.token_poll();
        assert_eq!(Duration::from_secs(60), token.interval);
        assert!(!token.single_flight);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/biodome"),
            ("PORT", "8080"),
            ("TOKEN_POLL_SINGLE_FLIGHT", "true"),
            ("POLL_MAX_IN_FLIGHT_SECS", "0"),
            ("STATUS_CACHE_TTL_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(8080, config.server_port());
        assert!(config.token_poll().single_flight);
        assert_eq!(None, config.token_poll().max_in_flight);
        assert_eq!(None, config.sensor_poll().max_in_flight);
        assert_eq!(Duration::from_secs(5), config.cache_ttl());
    }

    #[test]
    fn test_invalid_value() {
        let res = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/biodome"),
            ("PORT", "eighty"),
        ]));
        match res {
            Err(ConfigError::Invalid { key, value }) => {
                assert_eq!("PORT", key);
                assert_eq!("eighty", value);
            }
            _ => panic!("expected invalid PORT"),
        }
    }
}
