use backoffice_events::TelegramConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret and database URL.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Outbound Telegram delivery. Disabled when no bot token is set.
    pub telegram: TelegramConfig,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` on webhook calls.
    pub telegram_webhook_secret: Option<String>,
    /// Cadence of the subscription sweep (default: 6 hours).
    pub sweep_interval_secs: u64,
    /// Warn about subscriptions ending within this many days (default: `7`).
    pub expiry_warning_days: i64,
    /// Record every routed request in `access_logs` (default: `true`).
    pub access_log_enabled: bool,
    /// Access log entries older than this many days are purged (default: `90`).
    pub access_log_retention_days: i64,
    /// First admin account, created at startup when no admin exists.
    pub admin_bootstrap: Option<AdminBootstrap>,
}

/// Credentials for the initial admin account.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default                    |
    /// |------------------------------------|----------------------------|
    /// | `HOST`                             | `0.0.0.0`                  |
    /// | `PORT`                             | `3000`                     |
    /// | `CORS_ORIGINS`                     | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`             | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`            | `30`                       |
    /// | `TELEGRAM_BOT_TOKEN`               | unset                      |
    /// | `TELEGRAM_API_BASE`                | `https://api.telegram.org` |
    /// | `TELEGRAM_WEBHOOK_SECRET`          | unset                      |
    /// | `SUBSCRIPTION_SWEEP_INTERVAL_SECS` | `21600`                    |
    /// | `EXPIRY_WARNING_DAYS`              | `7`                        |
    /// | `ACCESS_LOG_ENABLED`               | `true`                     |
    /// | `ACCESS_LOG_RETENTION_DAYS`        | `90`                       |
    /// | `ADMIN_USERNAME` / `ADMIN_EMAIL` / `ADMIN_PASSWORD` | unset     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let telegram = TelegramConfig {
            bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            api_base: non_empty_var("TELEGRAM_API_BASE")
                .unwrap_or_else(|| TelegramConfig::default().api_base),
        };

        let sweep_interval_secs: u64 = std::env::var("SUBSCRIPTION_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "21600".into())
            .parse()
            .expect("SUBSCRIPTION_SWEEP_INTERVAL_SECS must be a valid u64");

        let expiry_warning_days: i64 = std::env::var("EXPIRY_WARNING_DAYS")
            .unwrap_or_else(|_| "7".into())
            .parse()
            .expect("EXPIRY_WARNING_DAYS must be a valid i64");

        let access_log_enabled: bool = std::env::var("ACCESS_LOG_ENABLED")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("ACCESS_LOG_ENABLED must be true or false");

        let access_log_retention_days: i64 = std::env::var("ACCESS_LOG_RETENTION_DAYS")
            .unwrap_or_else(|_| "90".into())
            .parse()
            .expect("ACCESS_LOG_RETENTION_DAYS must be a valid i64");

        let admin_bootstrap = match (
            non_empty_var("ADMIN_USERNAME"),
            non_empty_var("ADMIN_EMAIL"),
            non_empty_var("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminBootstrap {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            telegram,
            telegram_webhook_secret: non_empty_var("TELEGRAM_WEBHOOK_SECRET"),
            sweep_interval_secs,
            expiry_warning_days,
            access_log_enabled,
            access_log_retention_days,
            admin_bootstrap,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
