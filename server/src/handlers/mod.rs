pub mod health;
pub mod todos;
pub mod users;

use actix_web::{middleware::from_fn, web};

use crate::error::TodoApiError;
use crate::middleware::auth_middleware;

pub use health::health_check;
pub use todos::{create_todo, delete_todo, get_todo, list_todos, update_todo};
pub use users::{login, logout, me, register};

/// Registers every route. Shared state (`SessionAuthority` and the
/// `TodoStore`) is expected as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        // Public routes (no authentication required)
        .service(health_check)
        .service(register)
        .service(login)
        // Protected routes (authentication required)
        .service(
            web::scope("/users/me")
                .wrap(from_fn(auth_middleware))
                .service(me)
                .service(logout),
        )
        .service(
            web::scope("/todos")
                .wrap(from_fn(auth_middleware))
                .service(create_todo)
                .service(list_todos)
                .service(get_todo)
                .service(update_todo)
                .service(delete_todo),
        );
}

// Malformed bodies get the same JSON error shape as every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        TodoApiError::Validation(format!("Invalid request body: {}", err)).into()
    })
}
