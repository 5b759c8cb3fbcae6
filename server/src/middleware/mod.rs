pub mod auth;

pub use auth::{auth_middleware, AUTH_HEADER};
