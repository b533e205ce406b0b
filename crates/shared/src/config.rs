//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger engine configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Per-statement timeout applied inside ledger transactions, in milliseconds.
    /// Zero disables the timeout.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_statement_timeout_ms() -> u64 {
    5_000
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Prefix for generated journal entry numbers.
    #[serde(default = "default_entry_prefix")]
    pub entry_number_prefix: String,
    /// Prefix for generated invoice numbers.
    #[serde(default = "default_invoice_prefix")]
    pub invoice_number_prefix: String,
    /// Prefix for generated payment numbers.
    #[serde(default = "default_payment_prefix")]
    pub payment_number_prefix: String,
    /// Capacity of the domain event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// How long an operation waits for the in-memory store before timing out, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_entry_prefix() -> String {
    "JE".to_string()
}

fn default_invoice_prefix() -> String {
    "INV".to_string()
}

fn default_payment_prefix() -> String {
    "PAY".to_string()
}

fn default_event_buffer() -> usize {
    1024
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            entry_number_prefix: default_entry_prefix(),
            invoice_number_prefix: default_invoice_prefix(),
            payment_number_prefix: default_payment_prefix(),
            event_buffer: default_event_buffer(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON log lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "folio=debug".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FOLIO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("FOLIO__DATABASE__URL", Some("postgres://localhost/folio_test")),
                ("FOLIO__DATABASE__MAX_CONNECTIONS", Some("4")),
                ("FOLIO__LEDGER__ENTRY_NUMBER_PREFIX", Some("GL")),
                ("FOLIO__TELEMETRY__JSON", Some("true")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/folio_test");
                assert_eq!(config.database.max_connections, 4);
                assert_eq!(config.database.min_connections, 1);
                assert_eq!(config.ledger.entry_number_prefix, "GL");
                assert_eq!(config.ledger.payment_number_prefix, "PAY");
                assert!(config.telemetry.json);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars_unset(["FOLIO__DATABASE__URL"], || {
            assert!(AppConfig::load().is_err());
        });
    }

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.entry_number_prefix, "JE");
        assert_eq!(ledger.invoice_number_prefix, "INV");
        assert_eq!(ledger.event_buffer, 1024);
        assert_eq!(TelemetryConfig::default().filter, "folio=debug");
    }
}
