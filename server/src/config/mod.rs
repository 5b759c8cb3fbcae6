use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::auth_token::MIN_SECRET_LEN;
use crate::error::{Result, TodoApiError};

/// Signing secret used when none is configured outside production.
pub const DEV_JWT_SECRET: &str = "todo-dev-secret-change-me-0123456789";

pub const DEFAULT_CONFIG_PATH: &str = "server/config/server.toml";

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(TodoApiError::Config(format!(
                "Unknown environment '{}'",
                other
            ))),
        }
    }

    pub fn from_env() -> Result<Self> {
        match std::env::var("APP_ENV") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Ok(Environment::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongodb,
    Memory,
}

impl StoreBackend {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreBackend::Mongodb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(TodoApiError::Config(format!(
                "Unknown store backend '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Mongodb => "mongodb",
            StoreBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,
    pub server: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Built-in defaults per environment.
    pub fn for_environment(environment: Environment) -> Self {
        let (port, backend, database_name) = match environment {
            Environment::Development => (2019, StoreBackend::Mongodb, "TodoIt"),
            Environment::Test => (2000, StoreBackend::Memory, "TodoItTest"),
            Environment::Production => (8080, StoreBackend::Mongodb, "TodoIt"),
        };

        Self {
            environment,
            server: HttpConfig {
                host: "0.0.0.0".to_string(),
                port,
            },
            database: DatabaseConfig {
                backend,
                uri: "mongodb://localhost:27017".to_string(),
                name: database_name.to_string(),
            },
            auth: AuthConfig {
                jwt_secret: match environment {
                    Environment::Production => String::new(),
                    _ => DEV_JWT_SECRET.to_string(),
                },
                bcrypt_cost: match environment {
                    Environment::Test => MIN_BCRYPT_COST,
                    _ => bcrypt::DEFAULT_COST,
                },
            },
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| TodoApiError::Config(format!("Failed to read config file: {}", e)))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| TodoApiError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Resolves the process configuration: the TOML file when one exists,
    /// otherwise the `APP_ENV` defaults, then environment variable overrides.
    pub fn load() -> Result<Self> {
        let explicit_path = std::env::var("CONFIG_PATH").ok();
        let path = explicit_path
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if explicit_path.is_some() || Path::new(&path).exists() {
            Self::load_from_file(&path)?
        } else {
            Self::for_environment(Environment::from_env()?)
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = lookup("APP_ENV") {
            self.environment = Environment::parse(&environment)?;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| TodoApiError::Config(format!("Invalid PORT '{}'", port)))?;
        }
        if let Some(backend) = lookup("STORE_BACKEND") {
            self.database.backend = StoreBackend::parse(&backend)?;
        }
        if let Some(uri) = lookup("MONGODB_URI") {
            self.database.uri = uri;
        }
        if let Some(name) = lookup("DATABASE_NAME") {
            self.database.name = name;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(cost) = lookup("BCRYPT_COST") {
            self.auth.bcrypt_cost = cost
                .trim()
                .parse()
                .map_err(|_| TodoApiError::Config(format!("Invalid BCRYPT_COST '{}'", cost)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(TodoApiError::Config("Server port must not be 0".to_string()));
        }

        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(TodoApiError::Config(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        if self.environment == Environment::Production && self.auth.jwt_secret == DEV_JWT_SECRET {
            return Err(TodoApiError::Config(
                "JWT_SECRET must be set in production".to_string(),
            ));
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.auth.bcrypt_cost) {
            return Err(TodoApiError::Config(format!(
                "bcrypt cost must be between {} and {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }

        if self.database.backend == StoreBackend::Mongodb && self.database.uri.trim().is_empty() {
            return Err(TodoApiError::Config("MONGODB_URI must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}
