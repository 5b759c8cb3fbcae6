use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Client, Collection, Database,
};

use super::models::{AuthToken, Todo, TodoUpdate, User};
use super::store::{TodoStore, UserStore};
use crate::auth_token::AUTH_ACCESS;
use crate::error::{Result, TodoApiError};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoDbContext {
    db: Database,
}

impl MongoDbContext {
    pub fn new(client: Client, database_name: &str) -> Self {
        Self {
            db: client.database(database_name),
        }
    }

    pub fn users(&self) -> UserRepository {
        UserRepository {
            collection: self.db.collection("users"),
        }
    }

    pub fn todos(&self) -> TodoRepository {
        TodoRepository {
            collection: self.db.collection("todos"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        // Create unique index on email
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.db
            .collection::<User>("users")
            .create_index(email_index)
            .await?;

        // Create index on _creator for todos
        let creator_index = IndexModel::builder().keys(doc! { "_creator": 1 }).build();

        self.db
            .collection::<Todo>("todos")
            .create_index(creator_index)
            .await?;

        log::info!("Database indexes created successfully");
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[derive(Clone)]
pub struct UserRepository {
    collection: Collection<User>,
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert_user(&self, user: User) -> Result<User> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key(&err) => Err(TodoApiError::Validation(format!(
                "email {} is already registered",
                user.email
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn find_user_by_token(&self, id: &ObjectId, token: &str) -> Result<Option<User>> {
        let user = self
            .collection
            .find_one(doc! {
                "_id": id,
                "tokens": { "$elemMatch": { "access": AUTH_ACCESS, "token": token } },
            })
            .await?;
        Ok(user)
    }

    async fn push_token(&self, id: &ObjectId, token: AuthToken) -> Result<()> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "tokens": { "access": token.access, "token": token.token } } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(TodoApiError::Persistence(format!(
                "user {} not found while saving token",
                id.to_hex()
            )));
        }
        Ok(())
    }

    async fn pull_token(&self, id: &ObjectId, token: &str) -> Result<()> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$pull": { "tokens": { "token": token } } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(TodoApiError::Persistence(format!(
                "user {} not found while removing token",
                id.to_hex()
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct TodoRepository {
    collection: Collection<Todo>,
}

fn update_document(update: &TodoUpdate) -> Document {
    let mut set = doc! {
        "completed": update.completed,
        "completedAt": update.completed_at.map(Bson::Int64).unwrap_or(Bson::Null),
    };
    if let Some(text) = &update.text {
        set.insert("text", text.as_str());
    }
    doc! { "$set": set }
}

#[async_trait]
impl TodoStore for TodoRepository {
    async fn insert_todo(&self, todo: Todo) -> Result<Todo> {
        self.collection.insert_one(&todo).await?;
        Ok(todo)
    }

    async fn find_todos(&self, creator: &ObjectId) -> Result<Vec<Todo>> {
        let mut cursor = self
            .collection
            .find(doc! { "_creator": creator })
            .sort(doc! { "_id": 1 })
            .await?;

        let mut todos = Vec::new();
        use futures_util::stream::TryStreamExt;
        while let Some(todo) = cursor.try_next().await? {
            todos.push(todo);
        }

        Ok(todos)
    }

    async fn find_todo(&self, id: &ObjectId, creator: &ObjectId) -> Result<Option<Todo>> {
        let todo = self
            .collection
            .find_one(doc! { "_id": id, "_creator": creator })
            .await?;
        Ok(todo)
    }

    async fn update_todo(
        &self,
        id: &ObjectId,
        creator: &ObjectId,
        update: TodoUpdate,
    ) -> Result<Option<Todo>> {
        let todo = self
            .collection
            .find_one_and_update(
                doc! { "_id": id, "_creator": creator },
                update_document(&update),
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(todo)
    }

    async fn remove_todo(&self, id: &ObjectId, creator: &ObjectId) -> Result<Option<Todo>> {
        let todo = self
            .collection
            .find_one_and_delete(doc! { "_id": id, "_creator": creator })
            .await?;
        Ok(todo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_document_for_completion() {
        let update = TodoUpdate::new(None, Some(true), 333).unwrap();
        let document = update_document(&update);
        let set = document.get_document("$set").unwrap();

        assert!(set.get_bool("completed").unwrap());
        assert_eq!(set.get_i64("completedAt").unwrap(), 333);
        assert!(set.get("text").is_none());
    }

    #[test]
    fn test_update_document_clears_completion() {
        let update = TodoUpdate::new(Some("new text"), Some(false), 333).unwrap();
        let document = update_document(&update);
        let set = document.get_document("$set").unwrap();

        assert!(!set.get_bool("completed").unwrap());
        assert_eq!(set.get("completedAt"), Some(&Bson::Null));
        assert_eq!(set.get_str("text").unwrap(), "new text");
    }
}
