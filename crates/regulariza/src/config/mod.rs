use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub import: ImportConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(&env_or("APP_ENV", "development"));
        let port = env_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let header_row = env_or("APP_RECEIPT_HEADER_ROW", "0")
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidHeaderRow)?;
        let max_upload_mb = env_or("APP_MAX_UPLOAD_MB", "25")
            .parse::<usize>()
            .ok()
            .filter(|mb| *mb > 0)
            .ok_or(ConfigError::InvalidUploadLimit)?;

        Ok(Self {
            environment,
            server: ServerConfig {
                host: env_or("APP_HOST", "127.0.0.1"),
                port,
            },
            telemetry: TelemetryConfig {
                log_level: env_or("APP_LOG_LEVEL", "info"),
            },
            storage: StorageConfig {
                media_root: PathBuf::from(env_or("APP_MEDIA_ROOT", "media")),
                max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            },
            import: ImportConfig {
                sheet_name: env_or("APP_RECEIPT_SHEET", ImportConfig::DEFAULT_SHEET),
                header_row,
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where uploaded expediente files and scanned contracts are written.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub media_root: PathBuf,
    /// Request body ceiling for uploads and imports.
    pub max_upload_bytes: usize,
}

/// Spreadsheet layout expected by the receipt importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub sheet_name: String,
    /// Zero-based row holding the column titles; data starts on the next row.
    pub header_row: usize,
}

impl ImportConfig {
    pub const DEFAULT_SHEET: &'static str = "Recibos";
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            sheet_name: Self::DEFAULT_SHEET.to_string(),
            header_row: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("APP_RECEIPT_HEADER_ROW must be a non-negative integer")]
    InvalidHeaderRow,
    #[error("APP_MAX_UPLOAD_MB must be a positive integer")]
    InvalidUploadLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_MEDIA_ROOT",
            "APP_RECEIPT_SHEET",
            "APP_RECEIPT_HEADER_ROW",
            "APP_MAX_UPLOAD_MB",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage.media_root, PathBuf::from("media"));
        assert_eq!(config.storage.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.import, ImportConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_header_row() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RECEIPT_HEADER_ROW", "tercera");
        let err = AppConfig::load().expect_err("header row must be numeric");
        assert!(matches!(err, ConfigError::InvalidHeaderRow));
        reset_env();
    }

    #[test]
    fn reads_import_layout_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RECEIPT_SHEET", "Hoja1");
        env::set_var("APP_RECEIPT_HEADER_ROW", "3");
        env::set_var("APP_ENV", "prod");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.import.sheet_name, "Hoja1");
        assert_eq!(config.import.header_row, 3);
        assert_eq!(config.environment, AppEnvironment::Production);
        reset_env();
    }

    #[test]
    fn upload_limit_is_read_in_megabytes() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAX_UPLOAD_MB", "4");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.storage.max_upload_bytes, 4 * 1024 * 1024);

        env::set_var("APP_MAX_UPLOAD_MB", "0");
        let err = AppConfig::load().expect_err("zero is not a limit");
        assert!(matches!(err, ConfigError::InvalidUploadLimit));
        reset_env();
    }
}
