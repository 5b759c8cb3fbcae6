pub mod memory;
pub mod models;
pub mod repository;
pub mod store;

pub use memory::MemoryStore;
pub use models::{AuthToken, Todo, TodoUpdate, User, UserProfile};
pub use repository::{MongoDbContext, TodoRepository, UserRepository};
pub use store::{TodoStore, UserStore};

use mongodb::{options::ClientOptions, Client};
use std::sync::Arc;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::error::Result;

/// Store handles for the configured backend.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub todos: Arc<dyn TodoStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = MemoryStore::new();
        Self {
            users: Arc::new(store.clone()),
            todos: Arc::new(store),
        }
    }

    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        match config.backend {
            StoreBackend::Memory => {
                log::warn!("Using the in-memory store; data is lost on shutdown");
                Ok(Self::memory())
            }
            StoreBackend::Mongodb => {
                log::info!("Connecting to MongoDB at {}...", config.uri);
                let options = ClientOptions::parse(&config.uri).await?;
                let database_name =
                    resolve_database_name(options.default_database.as_deref(), &config.name);
                log::info!("Using database {}", database_name);

                let client = Client::with_options(options)?;
                let context = MongoDbContext::new(client, &database_name);

                log::info!("Initializing database indexes...");
                context.init_indexes().await?;

                Ok(Self {
                    users: Arc::new(context.users()),
                    todos: Arc::new(context.todos()),
                })
            }
        }
    }
}

/// A database named in the connection URI wins over the configured name.
fn resolve_database_name(uri_database: Option<&str>, configured: &str) -> String {
    match uri_database {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => configured.to_string(),
    }
}
