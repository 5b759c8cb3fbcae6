use actix_web::{delete, get, patch, post, web, HttpResponse};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{
    auth_token::now_ms,
    db::{Todo, TodoStore, TodoUpdate},
    error::{Result, TodoApiError},
    session::AuthenticatedUser,
};

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<i64>,
    #[serde(rename = "_creator")]
    pub creator: String,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id.to_hex(),
            text: todo.text,
            completed: todo.completed,
            completed_at: todo.completed_at,
            creator: todo.creator.to_hex(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoListResponse {
    pub todos: Vec<TodoResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoEnvelope {
    pub todo: TodoResponse,
}

// A malformed id can never name a todo.
fn parse_todo_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| TodoApiError::NotFound)
}

#[post("")]
pub async fn create_todo(
    req: web::Json<CreateTodoRequest>,
    todos: web::Data<dyn TodoStore>,
    auth: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse> {
    let text = req
        .text
        .as_deref()
        .ok_or_else(|| TodoApiError::Validation("text is required".to_string()))?;

    let todo = todos.insert_todo(Todo::new(text, auth.user.id)?).await?;

    log::debug!("Created todo {} for user {}", todo.id.to_hex(), auth.user.id.to_hex());

    Ok(HttpResponse::Ok().json(TodoResponse::from(todo)))
}

#[get("")]
pub async fn list_todos(
    todos: web::Data<dyn TodoStore>,
    auth: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse> {
    let todos = todos.find_todos(&auth.user.id).await?;

    let response = TodoListResponse {
        todos: todos.into_iter().map(TodoResponse::from).collect(),
    };

    Ok(HttpResponse::Ok().json(response))
}

#[get("/{id}")]
pub async fn get_todo(
    path: web::Path<String>,
    todos: web::Data<dyn TodoStore>,
    auth: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse> {
    let id = parse_todo_id(&path)?;

    let todo = todos
        .find_todo(&id, &auth.user.id)
        .await?
        .ok_or(TodoApiError::NotFound)?;

    Ok(HttpResponse::Ok().json(TodoEnvelope {
        todo: TodoResponse::from(todo),
    }))
}

#[patch("/{id}")]
pub async fn update_todo(
    path: web::Path<String>,
    req: web::Json<UpdateTodoRequest>,
    todos: web::Data<dyn TodoStore>,
    auth: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse> {
    let id = parse_todo_id(&path)?;
    let update = TodoUpdate::new(req.text.as_deref(), req.completed, now_ms())?;

    let todo = todos
        .update_todo(&id, &auth.user.id, update)
        .await?
        .ok_or(TodoApiError::NotFound)?;

    Ok(HttpResponse::Ok().json(TodoEnvelope {
        todo: TodoResponse::from(todo),
    }))
}

#[delete("/{id}")]
pub async fn delete_todo(
    path: web::Path<String>,
    todos: web::Data<dyn TodoStore>,
    auth: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse> {
    let id = parse_todo_id(&path)?;

    let todo = todos
        .remove_todo(&id, &auth.user.id)
        .await?
        .ok_or(TodoApiError::NotFound)?;

    log::debug!("Removed todo {} of user {}", id.to_hex(), auth.user.id.to_hex());

    Ok(HttpResponse::Ok().json(TodoEnvelope {
        todo: TodoResponse::from(todo),
    }))
}
