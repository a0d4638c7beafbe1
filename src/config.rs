use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub fcm: FcmConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// How long in-flight requests may keep running after a shutdown signal
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Args)]
pub struct FcmConfig {
    /// Path to the Firebase service account JSON file
    #[arg(long = "fcm-credentials-file", env = "FCM_CREDENTIALS_FILE")]
    pub credentials_file: PathBuf,

    /// Android package name that pushes are restricted to
    #[arg(long = "fcm-package-name", env = "FCM_PACKAGE_NAME")]
    pub package_name: Option<String>,

    /// Base URL of the FCM HTTP v1 API
    #[arg(long = "fcm-api-url", env = "FCM_API_URL", default_value = "https://fcm.googleapis.com")]
    pub api_url: String,

    /// Timeout for a single call to FCM, including the OAuth token exchange
    #[arg(long = "fcm-timeout-secs", env = "FCM_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Format of the logs written to stdout
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Additional file that receives JSON formatted logs
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// OTLP collector endpoint; traces and metrics are only exported when set
    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }
}
