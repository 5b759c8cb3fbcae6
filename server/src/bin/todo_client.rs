use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use reqwest::{header::HeaderMap, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const AUTH_HEADER: &str = "x-auth";

#[derive(Debug, Clone)]
struct ClientConfig {
    http_base: String,
    email: String,
    password: String,
    todo_text: String,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(rename = "_id")]
    id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct TodoResponse {
    #[serde(rename = "_id")]
    id: String,
    text: String,
    completed: bool,
    #[serde(rename = "completedAt")]
    completed_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TodoEnvelope {
    todo: TodoResponse,
}

#[derive(Debug, Deserialize)]
struct TodoListResponse {
    todos: Vec<TodoResponse>,
}

struct Session {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl Session {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = parse_args()?;

    println!("[todo-client] HTTP base: {}", cfg.http_base);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(cfg.timeout_ms))
        .build()
        .context("failed to build HTTP client")?;

    let session = sign_in(client, &cfg).await?;

    let me: UserResponse = expect_json(
        session
            .client
            .get(session.url("/users/me"))
            .header(AUTH_HEADER, &session.token)
            .send()
            .await
            .context("network failure calling /users/me")?,
        "/users/me",
    )
    .await?;
    println!("[todo-client] authenticated as {} ({})", me.email, me.id);

    run_todo_flow(&session, &cfg.todo_text).await?;

    println!("[todo-client] DELETE /users/me/token");
    let response = session
        .client
        .delete(session.url("/users/me/token"))
        .header(AUTH_HEADER, &session.token)
        .send()
        .await
        .context("network failure calling /users/me/token")?;
    expect_ok(response, "/users/me/token").await?;

    let response = session
        .client
        .get(session.url("/users/me"))
        .header(AUTH_HEADER, &session.token)
        .send()
        .await
        .context("network failure calling /users/me")?;
    if response.status() != StatusCode::UNAUTHORIZED {
        bail!(
            "revoked token was not rejected (status {})",
            response.status()
        );
    }
    println!("[todo-client] revoked token rejected as expected");

    println!("[todo-client] smoke run finished successfully");
    Ok(())
}

async fn sign_in(client: reqwest::Client, cfg: &ClientConfig) -> anyhow::Result<Session> {
    let base = cfg.http_base.trim_end_matches('/').to_string();
    let credentials = CredentialsRequest {
        email: &cfg.email,
        password: &cfg.password,
    };

    println!("[todo-client] POST {}/users", base);
    let response = client
        .post(format!("{}/users", base))
        .json(&credentials)
        .send()
        .await
        .context("network failure calling /users")?;

    // An existing account answers 400; fall back to logging in.
    let response = if response.status() == StatusCode::BAD_REQUEST {
        println!("[todo-client] account exists, POST {}/users/login", base);
        client
            .post(format!("{}/users/login", base))
            .json(&credentials)
            .send()
            .await
            .context("network failure calling /users/login")?
    } else {
        response
    };

    let response = expect_ok(response, "sign in").await?;
    let token = auth_header(response.headers())?;
    let user: UserResponse = response
        .json()
        .await
        .context("failed to decode sign in response")?;
    println!("[todo-client] signed in: user_id={}", user.id);

    Ok(Session {
        client,
        base,
        token,
    })
}

async fn run_todo_flow(session: &Session, text: &str) -> anyhow::Result<()> {
    println!("[todo-client] POST /todos");
    let created: TodoResponse = expect_json(
        session
            .client
            .post(session.url("/todos"))
            .header(AUTH_HEADER, &session.token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .context("network failure calling POST /todos")?,
        "POST /todos",
    )
    .await?;
    println!("[todo-client] created todo {} '{}'", created.id, created.text);

    let list: TodoListResponse = expect_json(
        session
            .client
            .get(session.url("/todos"))
            .header(AUTH_HEADER, &session.token)
            .send()
            .await
            .context("network failure calling GET /todos")?,
        "GET /todos",
    )
    .await?;
    if !list.todos.iter().any(|todo| todo.id == created.id) {
        bail!("GET /todos did not return the created todo");
    }
    println!("[todo-client] listed {} todos", list.todos.len());

    let todo_path = format!("/todos/{}", created.id);
    let patched: TodoEnvelope = expect_json(
        session
            .client
            .patch(session.url(&todo_path))
            .header(AUTH_HEADER, &session.token)
            .json(&serde_json::json!({ "completed": true }))
            .send()
            .await
            .context("network failure calling PATCH /todos/{id}")?,
        "PATCH /todos/{id}",
    )
    .await?;
    if !patched.todo.completed || patched.todo.completed_at.is_none() {
        bail!("PATCH /todos/{{id}} did not complete the todo");
    }
    println!(
        "[todo-client] completed todo at {}",
        patched.todo.completed_at.unwrap_or_default()
    );

    let removed: TodoEnvelope = expect_json(
        session
            .client
            .delete(session.url(&todo_path))
            .header(AUTH_HEADER, &session.token)
            .send()
            .await
            .context("network failure calling DELETE /todos/{id}")?,
        "DELETE /todos/{id}",
    )
    .await?;
    println!("[todo-client] removed todo {}", removed.todo.id);

    Ok(())
}

fn auth_header(headers: &HeaderMap) -> anyhow::Result<String> {
    let value = headers
        .get(AUTH_HEADER)
        .ok_or_else(|| anyhow!("response is missing the {} header", AUTH_HEADER))?;
    Ok(value
        .to_str()
        .context("auth header is not valid ASCII")?
        .to_string())
}

async fn expect_ok(response: Response, what: &str) -> anyhow::Result<Response> {
    if response.status() != StatusCode::OK {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        bail!("{} failed with status {}: {}", what, status, body);
    }
    Ok(response)
}

async fn expect_json<T: DeserializeOwned>(response: Response, what: &str) -> anyhow::Result<T> {
    expect_ok(response, what)
        .await?
        .json()
        .await
        .with_context(|| format!("failed to decode {} response", what))
}

fn parse_args() -> anyhow::Result<ClientConfig> {
    let mut cfg = ClientConfig {
        http_base: "http://127.0.0.1:2019".to_string(),
        email: String::new(),
        password: String::new(),
        todo_text: "Smoke test todo".to_string(),
        timeout_ms: 5_000,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--http-base" => cfg.http_base = next_arg_value(&mut args, &arg)?,
            "--email" => cfg.email = next_arg_value(&mut args, &arg)?,
            "--password" => cfg.password = next_arg_value(&mut args, &arg)?,
            "--text" => cfg.todo_text = next_arg_value(&mut args, &arg)?,
            "--timeout-ms" => {
                let value = next_arg_value(&mut args, &arg)?;
                cfg.timeout_ms = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid --timeout-ms: {}", value))?;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                bail!("unknown argument: {}\nUse --help to list the options.", other);
            }
        }
    }

    if cfg.email.is_empty() || cfg.password.is_empty() {
        bail!("--email and --password are required");
    }

    Ok(cfg)
}

fn next_arg_value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn print_help() {
    println!(
        "todo-client\n\n\
Usage:\n  cargo run -p todo-server --bin todo-client -- --email <EMAIL> --password <PASSWORD> [options]\n\n\
Options:\n\
  --http-base <URL>     API base URL (default: http://127.0.0.1:2019)\n\
  --email <EMAIL>       account email; registered when it does not exist yet\n\
  --password <PASS>     account password (min 6 characters)\n\
  --text <TEXT>         text of the todo created during the run\n\
  --timeout-ms <MS>     HTTP timeout (default: 5000)\n\
  -h, --help            show this help"
    );
}
