#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{http::header::ContentType, test, web};
use todo_server::config::AuthConfig;
use todo_server::db::{MemoryStore, TodoStore};
use todo_server::session::SessionAuthority;

pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        bcrypt_cost: 4,
    }
}

pub fn test_authority() -> (SessionAuthority, MemoryStore) {
    let store = MemoryStore::new();
    let authority = SessionAuthority::new(Arc::new(store.clone()), &test_auth_config())
        .expect("valid authority");
    (authority, store)
}

/// App data for the HTTP tests, both backed by one in-memory store.
pub fn test_state() -> (web::Data<SessionAuthority>, web::Data<dyn TodoStore>) {
    let (authority, store) = test_authority();
    let todos: Arc<dyn TodoStore> = Arc::new(store);
    (web::Data::new(authority), web::Data::from(todos))
}

pub fn json_post(uri: &str, body: serde_json::Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header(ContentType::json())
        .set_payload(body.to_string())
}
