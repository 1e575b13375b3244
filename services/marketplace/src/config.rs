use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

/// Longest session lifetime accepted from configuration (30 days).
pub const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// Marketplace configuration sourced from environment variables, optionally
// overridden by a YAML file named in DUKA_CONFIG.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub images: ImageBackend,
    pub images_dir: String,
    pub auth: AuthConfig,
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBackend {
    Memory,
    Local,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_secs: u64,
    pub token_leeway_secs: u64,
    pub header_name: String,
    /// Empty means the header carries the raw token.
    pub scheme: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("token_leeway_secs", &self.token_leeway_secs)
            .field("header_name", &self.header_name)
            .field("scheme", &self.scheme)
            .finish()
    }
}

#[derive(Clone)]
pub struct BootstrapAdminConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for BootstrapAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdminConfig")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct MarketplaceConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
    images: Option<String>,
    images_dir: Option<String>,
    token_secret: Option<String>,
    token_ttl_secs: Option<u64>,
    token_leeway_secs: Option<u64>,
    auth_header: Option<String>,
    auth_scheme: Option<String>,
}

impl MarketplaceConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("DUKA_BIND", "0.0.0.0:8443")
            .parse()
            .with_context(|| "parse DUKA_BIND")?;
        let metrics_bind = env_or("DUKA_METRICS_BIND", "0.0.0.0:8080")
            .parse()
            .with_context(|| "parse DUKA_METRICS_BIND")?;
        let storage = parse_storage(&env_or("DUKA_STORAGE", "memory"))?;
        let postgres = match std::env::var("DUKA_PG_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse("DUKA_PG_MAX_CONNECTIONS", 10)?,
                connect_timeout_ms: env_parse("DUKA_PG_CONNECT_TIMEOUT_MS", 5000)?,
                acquire_timeout_ms: env_parse("DUKA_PG_ACQUIRE_TIMEOUT_MS", 5000)?,
            }),
            Err(_) => None,
        };
        let images = parse_images(&env_or("DUKA_IMAGES", "memory"))?;
        let images_dir = env_or("DUKA_IMAGES_DIR", "assets");
        let auth = AuthConfig {
            token_secret: std::env::var("DUKA_TOKEN_SECRET").unwrap_or_default(),
            token_ttl_secs: env_parse("DUKA_TOKEN_TTL_SECS", 86_400)?,
            token_leeway_secs: env_parse("DUKA_TOKEN_LEEWAY_SECS", 0)?,
            header_name: env_or("DUKA_AUTH_HEADER", "authorization").to_ascii_lowercase(),
            scheme: env_or("DUKA_AUTH_SCHEME", "Bearer"),
        };
        let bootstrap_admin = match (
            std::env::var("DUKA_BOOTSTRAP_ADMIN_EMAIL"),
            std::env::var("DUKA_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapAdminConfig {
                email,
                password,
                name: env_or("DUKA_BOOTSTRAP_ADMIN_NAME", "admin"),
            }),
            _ => None,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            images,
            images_dir,
            auth,
            bootstrap_admin,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("DUKA_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read DUKA_CONFIG: {path}"))?;
            let override_cfg: MarketplaceConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse marketplace config yaml")?;
            config.apply_override(override_cfg)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_override(&mut self, override_cfg: MarketplaceConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = parse_storage(&value)?;
        }
        if let Some(url) = override_cfg.postgres_url {
            let pg = self.postgres.get_or_insert_with(|| PostgresConfig {
                url: String::new(),
                max_connections: 10,
                connect_timeout_ms: 5000,
                acquire_timeout_ms: 5000,
            });
            pg.url = url;
        }
        if let Some(value) = override_cfg.postgres_max_connections
            && let Some(pg) = self.postgres.as_mut()
        {
            pg.max_connections = value;
        }
        if let Some(value) = override_cfg.images {
            self.images = parse_images(&value)?;
        }
        if let Some(value) = override_cfg.images_dir {
            self.images_dir = value;
        }
        if let Some(value) = override_cfg.token_secret {
            self.auth.token_secret = value;
        }
        if let Some(value) = override_cfg.token_ttl_secs {
            self.auth.token_ttl_secs = value;
        }
        if let Some(value) = override_cfg.token_leeway_secs {
            self.auth.token_leeway_secs = value;
        }
        if let Some(value) = override_cfg.auth_header {
            self.auth.header_name = value.to_ascii_lowercase();
        }
        if let Some(value) = override_cfg.auth_scheme {
            self.auth.scheme = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.token_secret.is_empty() {
            bail!("DUKA_TOKEN_SECRET must be set");
        }
        if self.auth.token_ttl_secs == 0 {
            bail!("token ttl must be positive");
        }
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "token ttl of {}s exceeds the {MAX_TOKEN_TTL_SECS}s maximum",
                self.auth.token_ttl_secs
            );
        }
        if self.auth.header_name.is_empty() {
            bail!("auth header name must not be empty");
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}

fn parse_storage(value: &str) -> Result<StorageBackend> {
    match value.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" | "pg" => Ok(StorageBackend::Postgres),
        other => bail!("unknown storage backend: {other}"),
    }
}

fn parse_images(value: &str) -> Result<ImageBackend> {
    match value.to_ascii_lowercase().as_str() {
        "memory" => Ok(ImageBackend::Memory),
        "local" => Ok(ImageBackend::Local),
        other => bail!("unknown image backend: {other}"),
    }
}
