use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::auth_token::AUTH_ACCESS;
use crate::error::{Result, TodoApiError};

pub const MIN_EMAIL_LEN: usize = 5;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access: String,
    pub token: String,
}

impl AuthToken {
    pub fn auth(token: String) -> Self {
        Self {
            access: AUTH_ACCESS.to_string(),
            token,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub tokens: Vec<AuthToken>,
}

impl User {
    /// Validates the credentials and hashes the password; the plaintext is not kept.
    pub fn new(email: &str, password: &str, bcrypt_cost: u32) -> Result<Self> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TodoApiError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = bcrypt::hash(password, bcrypt_cost)?;

        Ok(Self {
            id: ObjectId::new(),
            email,
            password_hash,
            tokens: Vec::new(),
        })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, &self.password_hash)?)
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens
            .iter()
            .any(|entry| entry.access == AUTH_ACCESS && entry.token == token)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
        }
    }
}

/// The part of a user that may leave the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: ObjectId,
    pub email: String,
}

/// Trims and checks an email address.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if email.chars().count() < MIN_EMAIL_LEN {
        return Err(TodoApiError::Validation(format!(
            "email must be at least {MIN_EMAIL_LEN} characters"
        )));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(TodoApiError::Validation(format!(
            "{email} is not a valid email"
        )));
    }

    Ok(email.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "completedAt", default)]
    pub completed_at: Option<i64>,
    #[serde(rename = "_creator")]
    pub creator: ObjectId,
}

impl Todo {
    pub fn new(text: &str, creator: ObjectId) -> Result<Self> {
        Ok(Self {
            id: ObjectId::new(),
            text: normalize_text(text)?,
            completed: false,
            completed_at: None,
            creator,
        })
    }
}

/// Fields a PATCH may change. Completion always rewrites both
/// `completed` and `completedAt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoUpdate {
    pub text: Option<String>,
    pub completed: bool,
    pub completed_at: Option<i64>,
}

impl TodoUpdate {
    pub fn new(text: Option<&str>, completed: Option<bool>, now_ms: i64) -> Result<Self> {
        let text = text.map(normalize_text).transpose()?;
        let (completed, completed_at) = match completed {
            Some(true) => (true, Some(now_ms)),
            _ => (false, None),
        };

        Ok(Self {
            text,
            completed,
            completed_at,
        })
    }

    pub fn apply(&self, todo: &mut Todo) {
        if let Some(text) = &self.text {
            todo.text = text.clone();
        }
        todo.completed = self.completed;
        todo.completed_at = self.completed_at;
    }
}

fn normalize_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TodoApiError::Validation("text must not be empty".to_string()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_user_new() {
        let user = User::new("  a@example.com ", "secret123", TEST_COST).unwrap();
        assert_eq!(user.email, "a@example.com");
        assert_ne!(user.password_hash, "secret123");
        assert!(user.tokens.is_empty());
    }

    #[test]
    fn test_verify_password_correct() {
        let user = User::new("a@example.com", "secret123", TEST_COST).unwrap();
        assert!(user.verify_password("secret123").unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let user = User::new("a@example.com", "secret123", TEST_COST).unwrap();
        assert!(!user.verify_password("wrongpass").unwrap());
    }

    #[test]
    fn test_user_rejects_short_password() {
        let result = User::new("a@example.com", "12345", TEST_COST);
        assert!(matches!(result, Err(TodoApiError::Validation(_))));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" b@c.io ").unwrap(), "b@c.io");
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("no-at-sign.com").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@example.").is_err());
        assert!(normalize_email("a b@example.com").is_err());
        assert!(normalize_email("").is_err());
    }

    #[test]
    fn test_has_token_checks_access() {
        let mut user = User::new("a@example.com", "secret123", TEST_COST).unwrap();
        user.tokens.push(AuthToken::auth("t1".to_string()));
        user.tokens.push(AuthToken {
            access: "reset".to_string(),
            token: "t2".to_string(),
        });

        assert!(user.has_token("t1"));
        assert!(!user.has_token("t2"));
        assert!(!user.has_token("t3"));
    }

    #[test]
    fn test_todo_new_trims_text() {
        let creator = ObjectId::new();
        let todo = Todo::new("  buy milk  ", creator).unwrap();
        assert_eq!(todo.text, "buy milk");
        assert!(!todo.completed);
        assert_eq!(todo.completed_at, None);
        assert_eq!(todo.creator, creator);
    }

    #[test]
    fn test_todo_new_rejects_blank_text() {
        assert!(Todo::new("   ", ObjectId::new()).is_err());
    }

    #[test]
    fn test_todo_update_completion() {
        let mut todo = Todo::new("walk", ObjectId::new()).unwrap();

        TodoUpdate::new(None, Some(true), 333).unwrap().apply(&mut todo);
        assert!(todo.completed);
        assert_eq!(todo.completed_at, Some(333));

        TodoUpdate::new(Some("run"), None, 444).unwrap().apply(&mut todo);
        assert_eq!(todo.text, "run");
        assert!(!todo.completed);
        assert_eq!(todo.completed_at, None);
    }
}
