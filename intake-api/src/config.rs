//! Configuration resolution for intake-api
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! clap covers the first two tiers; the TOML file and defaults are layered
//! on afterwards.

use std::path::{Path, PathBuf};

use clap::Parser;
use intake_common::{Error, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::upload::DEFAULT_UPLOAD_FOLDER;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5000;

/// Default CORS origin: mirror whatever origin the request carries
pub const ANY_ORIGIN: &str = "*";

/// Command-line arguments for intake-api
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "intake-api")]
#[command(about = "Franchise application intake service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// SQLite database URL (e.g. sqlite://intake.db?mode=rwc)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Allowed CORS origin(s), comma separated; "*" mirrors the request origin
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Cloudinary cloud name
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: Option<String>,

    /// Cloudinary API key
    #[arg(long, env = "CLOUDINARY_API_KEY", hide_env_values = true)]
    pub cloudinary_api_key: Option<String>,

    /// Cloudinary API secret
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub cloudinary_api_secret: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "INTAKE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// `[cloudinary]` table of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudinaryToml {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

/// Config file contents; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub cors_origin: Option<String>,
    pub upload_folder: Option<String>,
    #[serde(default)]
    pub cloudinary: CloudinaryToml,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub database_url: String,
    pub cors_origin: String,
    pub upload_folder: String,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
}

impl ServiceConfig {
    /// Resolve from parsed arguments plus the config file they point at
    pub fn resolve(args: Args) -> Result<Self> {
        let toml_config = match &args.config {
            Some(path) => load_toml_config(path),
            None => default_config_path()
                .filter(|path| path.exists())
                .map(|path| load_toml_config(&path))
                .unwrap_or_default(),
        };
        Self::resolve_with(args, toml_config)
    }

    /// Resolve against an already loaded config file
    pub fn resolve_with(args: Args, toml_config: TomlConfig) -> Result<Self> {
        let database_url = args
            .database_url
            .or(toml_config.database_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "Database URL not configured. Set one of:\n\
                     1. Command line: --database-url sqlite://intake.db?mode=rwc\n\
                     2. Environment: DATABASE_URL=sqlite://intake.db?mode=rwc\n\
                     3. TOML config: database_url = \"sqlite://intake.db?mode=rwc\""
                        .to_string(),
                )
            })?;

        let cloudinary = toml_config.cloudinary;
        Ok(Self {
            port: args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            database_url,
            cors_origin: args
                .cors_origin
                .or(toml_config.cors_origin)
                .unwrap_or_else(|| ANY_ORIGIN.to_string()),
            upload_folder: toml_config
                .upload_folder
                .unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string()),
            cloudinary_cloud_name: args.cloudinary_cloud_name.or(cloudinary.cloud_name),
            cloudinary_api_key: args.cloudinary_api_key.or(cloudinary.api_key),
            cloudinary_api_secret: args.cloudinary_api_secret.or(cloudinary.api_secret),
        })
    }
}

/// Read a TOML config file; an unreadable or invalid file is only a warning
pub fn load_toml_config(path: &Path) -> TomlConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Config file {} not readable ({}), using defaults", path.display(), e);
            return TomlConfig::default();
        }
    };

    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => {
            info!("Loaded config file {}", path.display());
            config
        }
        Err(e) => {
            warn!("Config file {} is invalid ({}), using defaults", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// `<config dir>/franchise-intake/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir().map(|dir| dir.join("franchise-intake").join("config.toml"));
    debug!("Default config path: {:?}", path);
    path
}
