//! Command-line interface for the `medgate` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use medgate_auth::Role;
use medgate_observability::LogFormat;
use medgate_session::{Registration, SessionConfig};

/// Sign in to the hospital admin API and inspect what the session allows.
#[derive(Parser, Debug)]
#[command(name = "medgate", version, propagate_version = true)]
pub struct Cli {
    /// Base URL of the REST API (overrides MEDGATE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Credential store file (overrides MEDGATE_CREDENTIALS_PATH)
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// HTTP timeout in seconds (overrides MEDGATE_HTTP_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log format
    #[arg(long, value_enum, default_value = "text", env = "MEDGATE_LOG_FORMAT", global = true)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in and store the issued credentials
    Login(LoginArgs),

    /// Sign out and clear stored credentials
    Logout,

    /// Confirm the stored session against the server and print the identity
    Whoami,

    /// Create an account (does not sign in)
    Register(RegisterArgs),

    /// Show where a navigation to PATH would end up for the current session
    Route(RouteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(short, long, env = "MEDGATE_USERNAME")]
    pub username: String,

    #[arg(short, long, env = "MEDGATE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub username: String,

    #[arg(short, long, env = "MEDGATE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// admin, doctor or receptionist
    #[arg(short, long)]
    pub role: Role,

    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,

    #[arg(long, default_value = "")]
    pub email: String,
}

impl RegisterArgs {
    pub fn registration(&self) -> Registration {
        Registration {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role,
            password: self.password.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    /// Path to resolve, e.g. /patients
    pub path: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    /// Environment-derived config with command-line overrides applied.
    pub fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = SessionConfig::from_env()?;
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(path) = &self.credentials {
            config.credentials_path = path.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = std::time::Duration::from_secs(secs);
        }
        Ok(config)
    }
}
