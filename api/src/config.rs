use std::str::FromStr;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_IDENTITY_HEADER: &str = "x-username";
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: usize = 10;
pub const DEFAULT_MAX_COMMENT_DEPTH: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub env: Env,
    pub listen_addr: String,
    pub store: StoreKind,
    pub database: Option<DatabaseConfig>,
    /// Header the gateway puts the authenticated username in. Lowercase.
    pub identity_header: String,
    pub max_page_size: u32,
    /// Levels a thread may nest to, a top-level comment being level 1.
    pub max_comment_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            env: Env::Dev,
            listen_addr: DEFAULT_LISTEN_ADDR.into(),
            store: StoreKind::Memory,
            database: None,
            identity_header: DEFAULT_IDENTITY_HEADER.into(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_comment_depth: DEFAULT_MAX_COMMENT_DEPTH,
        }
    }
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => {
                tracing::debug!("Missing environment variable `{key}`");
                Ok(None)
            }
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Parses the variable, falling back to `default` when it is absent or
/// malformed.
fn parsed_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Ok(Some(raw)) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Invalid value `{raw}` for `{key}`, using the default: {e}");
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            tracing::warn!("{e}, using the default");
            default
        }
    }
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let env = match var("ENVIRONMENT") {
            Ok(Some(env)) => match env.as_str() {
                "dev" => Env::Dev,
                "staging" => Env::Staging,
                "production" => Env::Production,
                _ => Env::Dev,
            },
            _ => Env::Dev,
        };

        let database_url = var("DATABASE_URL").ok().flatten();
        let store = match var("STORE") {
            Ok(Some(store)) => match store.as_str() {
                "memory" => StoreKind::Memory,
                "postgres" => StoreKind::Postgres,
                other => {
                    tracing::warn!("Unknown store `{other}`, inferring from `DATABASE_URL`");
                    infer_store(database_url.as_deref())
                }
            },
            _ => infer_store(database_url.as_deref()),
        };

        let database = match store {
            StoreKind::Postgres => Some(DatabaseConfig {
                url: database_url.unwrap_or_else(|| required_var("DATABASE_URL")),
                max_connections: parsed_var(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
            }),
            StoreKind::Memory => None,
        };

        let max_page_size = match parsed_var("MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE) {
            0 => {
                tracing::warn!("`MAX_PAGE_SIZE` must be positive, using the default");
                DEFAULT_MAX_PAGE_SIZE
            }
            size => size,
        };

        let max_comment_depth = match parsed_var("MAX_COMMENT_DEPTH", DEFAULT_MAX_COMMENT_DEPTH) {
            0 => {
                tracing::warn!("`MAX_COMMENT_DEPTH` must be positive, using the default");
                DEFAULT_MAX_COMMENT_DEPTH
            }
            depth => depth,
        };

        ServerConfig {
            env,
            listen_addr: var("LISTEN_ADDR")
                .ok()
                .flatten()
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into()),
            store,
            database,
            identity_header: var("IDENTITY_HEADER")
                .ok()
                .flatten()
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.into()),
            max_page_size,
            max_comment_depth,
        }
    }
}

fn infer_store(database_url: Option<&str>) -> StoreKind {
    match database_url {
        Some(_) => StoreKind::Postgres,
        None => StoreKind::Memory,
    }
}
