/*
 * Responsibility
 * - Read process configuration from flags / env (.env is loaded first)
 * - Validate required values (startup fails when one is missing)
 * - Config is built once and never mutated afterwards
 */
use std::ffi::OsString;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
    Args(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Parameter {} is required", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::Args(msg) => write!(f, "invalid arguments: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Command line surface. Every flag can also come from the environment.
#[derive(Parser, Debug)]
#[command(name = "illiad-upload", version, about = "ILLiad file upload service")]
struct Args {
    /// API service port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Upload directory
    #[arg(long, env = "UPLOAD_DIR", default_value = "")]
    dir: String,

    /// V4 JWT signing key
    #[arg(long, env = "JWT_KEY", default_value = "", hide_env_values = true)]
    jwtkey: String,

    /// Largest accepted upload body, in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 512 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Comma separated CORS allowlist (only used in production)
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", default_value = "")]
    cors_allowed_origins: String,

    /// development | production
    #[arg(long, env = "APP_ENV", default_value = "development")]
    app_env: String,
}

const LONG_FLAGS: [&str; 6] = [
    "port",
    "dir",
    "jwtkey",
    "max-upload-bytes",
    "cors-allowed-origins",
    "app-env",
];

/// Existing deployments pass `-dir /x -jwtkey=k` (single dash); rewrite
/// those to the `--dir` form clap expects. Anything else passes through.
fn normalize_single_dash<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(flag) = arg.to_str().and_then(|s| s.strip_prefix('-')) else {
                return arg;
            };
            if flag.starts_with('-') {
                return arg;
            }
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if LONG_FLAGS.contains(&name) {
                OsString::from(format!("--{flag}"))
            } else {
                arg
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub jwt_key: String,
    pub max_upload_bytes: usize,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("app_env", &self.app_env)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl Config {
    /// Load `.env` (if any), then parse the real process arguments.
    pub fn from_args() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let args = match Args::try_parse_from(normalize_single_dash(std::env::args_os())) {
            Ok(args) => args,
            // --help / --version print and exit 0
            Err(e) if !e.use_stderr() => e.exit(),
            Err(e) => return Err(ConfigError::Args(e.to_string())),
        };
        Self::from_parsed(args)
    }

    #[cfg(test)]
    pub fn try_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args = Args::try_parse_from(normalize_single_dash(args))
            .map_err(|e| ConfigError::Args(e.to_string()))?;
        Self::from_parsed(args)
    }

    fn from_parsed(args: Args) -> Result<Self, ConfigError> {
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", args.port))
            .map_err(|_| ConfigError::Invalid("port"))?;

        if args.dir.trim().is_empty() {
            return Err(ConfigError::Missing("dir"));
        }
        if args.jwtkey.is_empty() {
            return Err(ConfigError::Missing("jwtkey"));
        }
        if args.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max-upload-bytes"));
        }

        let cors_allowed_origins = args
            .cors_allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        Ok(Self {
            addr,
            upload_dir: PathBuf::from(args.dir),
            jwt_key: args.jwtkey,
            max_upload_bytes: args.max_upload_bytes,
            app_env: AppEnv::parse(&args.app_env),
            cors_allowed_origins,
        })
    }
}
