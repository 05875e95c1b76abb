//! Server configuration
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file is loaded first).

use crate::middleware::RateLimitConfig;
use crate::settlement::NumberRules;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// One year
const MAX_TOKEN_MINUTES: i64 = 365 * 24 * 60;
/// Longest rate-limit window or ban: 30 days
const MAX_LIMITER_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "blackjack-tracker")]
#[command(about = "Ticket tracker backend - settles ticket batches and keeps player wallets")]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    /// SQLite database path (relative paths resolve against the crate directory)
    #[arg(long, env = "DB_PATH", default_value = "blackjack_tracker.db")]
    pub db_path: String,

    /// HS256 signing secret for access tokens
    #[arg(
        long,
        env = "JWT_SECRET",
        default_value = "dev-secret-change-in-production-minimum-32-characters",
        hide_env_values = true
    )]
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    #[arg(
        long,
        env = "ACCESS_TOKEN_EXPIRE_MINUTES",
        default_value = "30",
        value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_MINUTES)
    )]
    pub token_expire_minutes: i64,

    /// bcrypt cost for new password hashes
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub bcrypt_cost: u32,

    /// Allowed CORS origin(s), comma-separated, or `*`
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://blackjack-tracker:80")]
    pub cors_origin: String,

    /// Requests allowed per IP per window
    #[arg(
        long,
        env = "RATE_LIMIT_MAX_REQUESTS",
        default_value = "100",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rate_limit_max_requests: u32,

    /// Rate limit window in seconds
    #[arg(
        long,
        env = "RATE_LIMIT_WINDOW_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..=MAX_LIMITER_SECS)
    )]
    pub rate_limit_window_secs: u64,

    /// Extra requests tolerated above the limit before the IP is banned
    #[arg(long, env = "RATE_LIMIT_BURST", default_value = "20")]
    pub rate_limit_burst: u32,

    /// How long a banned IP stays banned, in seconds
    #[arg(
        long,
        env = "RATE_LIMIT_BAN_SECS",
        default_value = "900",
        value_parser = clap::value_parser!(u64).range(1..=MAX_LIMITER_SECS)
    )]
    pub rate_limit_ban_secs: u64,

    /// Bound every guess slot to [1, 21] (by default slot two accepts up to 31)
    #[arg(long, env = "UNIFORM_GUESS_RANGE")]
    pub uniform_guess_range: bool,
}

impl Config {
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window_secs),
            burst: self.rate_limit_burst,
            ban_duration: Duration::from_secs(self.rate_limit_ban_secs),
        }
    }

    pub fn number_rules(&self) -> NumberRules {
        if self.uniform_guess_range {
            NumberRules::uniform()
        } else {
            NumberRules::default()
        }
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_expire_minutes)
    }

    pub fn resolved_db_path(&self) -> String {
        resolve_data_path(&self.db_path)
    }
}

/// Relative paths are anchored to the crate directory, not the caller's cwd.
pub fn resolve_data_path(raw: &str) -> String {
    let p = PathBuf::from(raw.trim());
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(p)
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["blackjack-tracker"]);
        assert_eq!(config.token_expire_minutes, 30);
        assert_eq!(config.rate_limit().ban_duration, Duration::from_secs(900));
        assert_eq!(config.number_rules(), NumberRules::default());
        assert_eq!(config.token_lifetime(), chrono::Duration::minutes(30));
    }

    #[test]
    fn test_rejects_values_that_would_panic_at_runtime() {
        for args in [
            ["--rate-limit-window-secs", "0"],
            ["--rate-limit-window-secs", "18446744073709551615"],
            ["--rate-limit-ban-secs", "0"],
            ["--token-expire-minutes", "0"],
            ["--token-expire-minutes", "9223372036854775807"],
            ["--bcrypt-cost", "3"],
            ["--bcrypt-cost", "32"],
            ["--rate-limit-max-requests", "0"],
        ] {
            let result = Config::try_parse_from(["blackjack-tracker", args[0], args[1]]);
            assert!(result.is_err(), "{} {} should be rejected", args[0], args[1]);
        }

        let config = Config::try_parse_from([
            "blackjack-tracker",
            "--token-expire-minutes",
            "525600",
            "--rate-limit-window-secs",
            "1",
        ])
        .unwrap();
        assert_eq!(config.token_lifetime(), chrono::Duration::days(365));
    }

    #[test]
    fn test_uniform_guess_range_flag() {
        let config = Config::parse_from(["blackjack-tracker", "--uniform-guess-range"]);
        assert_eq!(config.number_rules(), NumberRules::uniform());
    }

    #[test]
    fn test_resolve_data_path() {
        assert_eq!(resolve_data_path("/tmp/games.db"), "/tmp/games.db");
        assert!(resolve_data_path("games.db").ends_with("games.db"));
        assert!(PathBuf::from(resolve_data_path("games.db")).is_absolute());
    }
}
