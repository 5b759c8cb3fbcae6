use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use super::models::{AuthToken, Todo, TodoUpdate, User};
use super::store::{TodoStore, UserStore};
use crate::error::{Result, TodoApiError};

/// Document store kept in process memory.
///
/// Each document sits behind its own `DashMap` entry lock, which gives the
/// same single-document atomicity the MongoDB repositories rely on.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<ObjectId, User>>,
    // email -> user id
    emails: Arc<DashMap<String, ObjectId>>,
    todos: Arc<DashMap<ObjectId, Todo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn todo_count(&self) -> usize {
        self.todos.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(TodoApiError::Validation(format!(
                    "email {} is already registered",
                    user.email
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|user| user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn find_user_by_token(&self, id: &ObjectId, token: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .get(id)
            .filter(|user| user.has_token(token))
            .map(|user| user.clone()))
    }

    async fn push_token(&self, id: &ObjectId, token: AuthToken) -> Result<()> {
        let mut user = self.users.get_mut(id).ok_or_else(|| {
            TodoApiError::Persistence(format!(
                "user {} not found while saving token",
                id.to_hex()
            ))
        })?;
        user.tokens.push(token);
        Ok(())
    }

    async fn pull_token(&self, id: &ObjectId, token: &str) -> Result<()> {
        let mut user = self.users.get_mut(id).ok_or_else(|| {
            TodoApiError::Persistence(format!(
                "user {} not found while removing token",
                id.to_hex()
            ))
        })?;
        user.tokens.retain(|entry| entry.token != token);
        Ok(())
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn insert_todo(&self, todo: Todo) -> Result<Todo> {
        self.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn find_todos(&self, creator: &ObjectId) -> Result<Vec<Todo>> {
        let mut todos: Vec<Todo> = self
            .todos
            .iter()
            .filter(|entry| entry.creator == *creator)
            .map(|entry| entry.value().clone())
            .collect();
        todos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(todos)
    }

    async fn find_todo(&self, id: &ObjectId, creator: &ObjectId) -> Result<Option<Todo>> {
        Ok(self
            .todos
            .get(id)
            .filter(|todo| todo.creator == *creator)
            .map(|todo| todo.clone()))
    }

    async fn update_todo(
        &self,
        id: &ObjectId,
        creator: &ObjectId,
        update: TodoUpdate,
    ) -> Result<Option<Todo>> {
        let Some(mut todo) = self.todos.get_mut(id) else {
            return Ok(None);
        };
        if todo.creator != *creator {
            return Ok(None);
        }
        update.apply(&mut todo);
        Ok(Some(todo.clone()))
    }

    async fn remove_todo(&self, id: &ObjectId, creator: &ObjectId) -> Result<Option<Todo>> {
        Ok(self
            .todos
            .remove_if(id, |_, todo| todo.creator == *creator)
            .map(|(_, todo)| todo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    fn user(email: &str) -> User {
        User::new(email, "secret123", TEST_COST).unwrap()
    }

    #[actix_web::test]
    async fn test_insert_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.insert_user(user("a@example.com")).await.unwrap();

        let result = store.insert_user(user("a@example.com")).await;
        assert!(matches!(result, Err(TodoApiError::Validation(_))));
        assert_eq!(store.user_count(), 1);
    }

    #[actix_web::test]
    async fn test_push_and_pull_token() {
        let store = MemoryStore::new();
        let stored = store.insert_user(user("a@example.com")).await.unwrap();

        store
            .push_token(&stored.id, AuthToken::auth("t1".to_string()))
            .await
            .unwrap();
        store
            .push_token(&stored.id, AuthToken::auth("t2".to_string()))
            .await
            .unwrap();
        assert!(store.find_user_by_token(&stored.id, "t1").await.unwrap().is_some());

        store.pull_token(&stored.id, "t1").await.unwrap();
        assert!(store.find_user_by_token(&stored.id, "t1").await.unwrap().is_none());
        assert!(store.find_user_by_token(&stored.id, "t2").await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn test_token_ops_on_missing_user_fail() {
        let store = MemoryStore::new();
        let missing = ObjectId::new();

        let pushed = store
            .push_token(&missing, AuthToken::auth("t1".to_string()))
            .await;
        assert!(matches!(pushed, Err(TodoApiError::Persistence(_))));

        let pulled = store.pull_token(&missing, "t1").await;
        assert!(matches!(pulled, Err(TodoApiError::Persistence(_))));
    }

    #[actix_web::test]
    async fn test_todos_are_scoped_to_creator() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        let stranger = ObjectId::new();
        let todo = store
            .insert_todo(Todo::new("first", owner).unwrap())
            .await
            .unwrap();
        store
            .insert_todo(Todo::new("second", owner).unwrap())
            .await
            .unwrap();

        assert_eq!(store.find_todos(&owner).await.unwrap().len(), 2);
        assert!(store.find_todos(&stranger).await.unwrap().is_empty());
        assert!(store.find_todo(&todo.id, &stranger).await.unwrap().is_none());

        let update = TodoUpdate::new(None, Some(true), 1).unwrap();
        assert!(store
            .update_todo(&todo.id, &stranger, update)
            .await
            .unwrap()
            .is_none());
        assert!(store.remove_todo(&todo.id, &stranger).await.unwrap().is_none());

        let removed = store.remove_todo(&todo.id, &owner).await.unwrap();
        assert_eq!(removed.map(|t| t.id), Some(todo.id));
        assert_eq!(store.todo_count(), 1);
    }
}
