use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

use crate::services::blob_store::{BlobConfig, Provider};

/// Key discovery endpoint used when `JWKS_URL` is not set.
const DEFAULT_JWKS_URL: &str = "https://login.microsoft.com/common/discovery/keys";

/// Database name the metadata table lives in.
const DB_NAME: &str = "inventoriadb";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, validated fail-fast at
/// startup; a missing required variable is an error, not a wait loop.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub blob: BlobConfig,
    pub backend_url: String,
    /// None disables classification entirely.
    pub custom_vision: Option<CustomVisionConfig>,
    pub jwks_url: String,
    /// Expected token audience. None falls back to the token's own claim.
    pub token_audience: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomVisionConfig {
    pub url: String,
    pub key: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image inventory API")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

fn required_env(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("required environment variable {name} is not set"))
}

fn optional_env(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let mut cfg = Self::from_env()?;
        if let Some(host) = args.host {
            cfg.host = host;
        }
        if let Some(port) = args.port {
            cfg.port = port;
        }
        Ok((cfg, args.migrate))
    }

    /// Environment-only parsing, shared by the CLI path and tests.
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8000,
            Err(err) => return Err(err).context("reading PORT"),
        };

        let database_url = database_url_from_env()?;

        let provider: Provider = optional_env("STORAGE_PROVIDER")
            .parse()
            .map_err(|reason: String| anyhow::anyhow!("parsing STORAGE_PROVIDER: {reason}"))?;
        let blob = BlobConfig {
            provider,
            account_name: required_env("STORAGE_ACCOUNT_NAME")?,
            access_key: required_env("STORAGE_ACCESS_KEY")?,
            container: required_env("STORAGE_CONTAINER")?,
            aws_region: match provider {
                Provider::S3 => required_env("AWS_REGION")?,
                Provider::Azure => optional_env("AWS_REGION"),
            },
        };

        let backend_url = required_env("BACKEND_URL")?
            .trim_end_matches('/')
            .to_string();

        // An absent or empty URL disables classification.
        let custom_vision = match optional_env("CUSTOM_VISION_URL") {
            url if url.is_empty() => None,
            url => Some(CustomVisionConfig {
                url,
                key: optional_env("CUSTOM_VISION_KEY"),
            }),
        };

        let jwks_url = match optional_env("JWKS_URL") {
            url if url.is_empty() => DEFAULT_JWKS_URL.to_string(),
            url => url,
        };
        let token_audience = match optional_env("TOKEN_AUDIENCE") {
            aud if aud.is_empty() => None,
            aud => Some(aud),
        };

        Ok(Self {
            host,
            port,
            database_url,
            blob,
            backend_url,
            custom_vision,
            jwks_url,
            token_audience,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the database URL from the enumerated `DB_*` variables.
///
/// An endpoint that already carries a scheme (`sqlite://...`,
/// `mysql://...`) is used verbatim for local development; a bare host is
/// treated as the MySQL endpoint.
fn database_url_from_env() -> Result<String> {
    let endpoint = required_env("DB_ENDPOINT")?;
    if endpoint.contains("://") {
        return Ok(endpoint);
    }

    let user = required_env("DB_USER")?;
    let passwd = required_env("DB_PASSWD")?;
    if user.is_empty() {
        bail!("DB_USER must not be empty for endpoint `{endpoint}`");
    }
    Ok(format!("mysql://{user}:{passwd}@{endpoint}/{DB_NAME}"))
}
