use actix_web::{middleware as actix_middleware, web, App, HttpServer};

use todo_server::config::{AppConfig, Environment};
use todo_server::db::{Stores, TodoStore};
use todo_server::handlers;
use todo_server::session::SessionAuthority;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if it exists (for development)
    // Try loading from current directory first, then from server/ directory
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting Todo API server...");

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Hint: Set CONFIG_PATH or the overriding environment variables");
        std::process::exit(1);
    });
    log::info!(
        "Loaded {:?} configuration (store backend: {})",
        config.environment,
        config.database.backend.as_str()
    );

    if config.uses_dev_secret() && config.environment != Environment::Test {
        log::warn!("Using the built-in development JWT secret; set JWT_SECRET outside development");
    }

    let stores = Stores::open(&config.database).await.unwrap_or_else(|e| {
        log::error!("Failed to open the document store: {}", e);
        std::process::exit(1);
    });

    let authority = SessionAuthority::new(stores.users.clone(), &config.auth).unwrap_or_else(|e| {
        log::error!("Failed to build the session authority: {}", e);
        std::process::exit(1);
    });

    let authority = web::Data::new(authority);
    let todos: web::Data<dyn TodoStore> = web::Data::from(stores.todos.clone());

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    log::info!("Starting HTTP server at {}:{}...", server_host, server_port);

    HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(authority.clone())
            .app_data(todos.clone())
            // Middleware
            .wrap(actix_middleware::Logger::default())
            .wrap(actix_middleware::Compress::default())
            .configure(handlers::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
