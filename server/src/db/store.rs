//! Persistence contracts shared by the MongoDB repositories and the in-memory store.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::models::{AuthToken, Todo, TodoUpdate, User};
use crate::error::Result;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. A taken email is a validation error.
    async fn insert_user(&self, user: User) -> Result<User>;

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Finds the user only if `token` is one of its active auth tokens.
    async fn find_user_by_token(&self, id: &ObjectId, token: &str) -> Result<Option<User>>;

    /// Appends a token atomically. Fails with a persistence error when no user matched.
    async fn push_token(&self, id: &ObjectId, token: AuthToken) -> Result<()>;

    /// Removes one token atomically. Fails with a persistence error when no user matched.
    async fn pull_token(&self, id: &ObjectId, token: &str) -> Result<()>;
}

/// Todo persistence. Every lookup is scoped to the creator.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert_todo(&self, todo: Todo) -> Result<Todo>;

    async fn find_todos(&self, creator: &ObjectId) -> Result<Vec<Todo>>;

    async fn find_todo(&self, id: &ObjectId, creator: &ObjectId) -> Result<Option<Todo>>;

    /// Returns the updated document, or `None` when nothing matched.
    async fn update_todo(
        &self,
        id: &ObjectId,
        creator: &ObjectId,
        update: TodoUpdate,
    ) -> Result<Option<Todo>>;

    /// Returns the removed document, or `None` when nothing matched.
    async fn remove_todo(&self, id: &ObjectId, creator: &ObjectId) -> Result<Option<Todo>>;
}
