//! End-to-end tests for the HTTP routes.
//!
//! Each test starts the real server on an ephemeral port and drives it with
//! reqwest, redirects disabled so 303 responses can be inspected.

use chrono::Days;
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use serde_json::Value;
use task_manager::config::Config;
use task_manager::db::{Database, today};
use task_manager::forms::WorkerForm;
use task_manager::http::{AppState, start_server};
use task_manager::services;
use task_manager::types::Worker;
use tokio::sync::oneshot;

const IDENTITY: &str = "x-remote-user";

struct TestServer {
    base: String,
    db: Database,
    client: reqwest::Client,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start(config: Config) -> Self {
        let db = Database::open_in_memory().expect("Failed to create in-memory database");
        let addr = "127.0.0.1:0".parse().unwrap();
        let (shutdown, bound) = start_server(AppState::new(db.clone(), config), addr)
            .await
            .expect("Failed to start server");
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        Self {
            base: format!("http://{}", bound),
            db,
            client,
            _shutdown: shutdown,
        }
    }

    async fn with_defaults() -> Self {
        Self::start(Config::default()).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn worker(&self, username: &str, is_staff: bool) -> Worker {
        services::workers::register(&self.db, &WorkerForm::new().username(username), is_staff)
            .expect("Failed to register worker")
    }

    async fn get(&self, path: &str, as_user: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(user) = as_user {
            request = request.header(IDENTITY, user);
        }
        request.send().await.expect("request failed")
    }

    async fn post(&self, path: &str, as_user: &str, form: &[(&str, String)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header(IDENTITY, as_user)
            .form(form)
            .send()
            .await
            .expect("request failed")
    }
}

fn location(response: &reqwest::Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}

fn deadline_in(days: u64) -> String {
    today().checked_add_days(Days::new(days)).unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::with_defaults().await;
    let response = server.get("/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn dashboard_is_public() {
    let server = TestServer::with_defaults().await;
    let alice = server.worker("alice", false);
    let bug = server.db.create_task_type("Bug").unwrap();
    let form = task_manager::forms::TaskForm::new()
        .name("Fix bug")
        .deadline(today())
        .task_type(bug.id)
        .assignees(&[alice.id]);
    services::tasks::create(&server.db, &alice, &form).unwrap();

    let response = server.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tasks"][0]["name"], "Fix bug");
    assert_eq!(body["task_types"][0]["name"], "Bug");
    assert_eq!(body["workers"][0]["task_count"], 1);
}

#[tokio::test]
async fn anonymous_requests_redirect_to_login() {
    let server = TestServer::with_defaults().await;

    let response = server.get("/tasks/1/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login/?next=%2Ftasks%2F1%2F");

    // an unknown username is no better than none
    let response = server.get("/workers/", Some("mallory")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn create_then_list_my_tasks() {
    let server = TestServer::with_defaults().await;
    let alice = server.worker("alice", false);
    let bob = server.worker("bob", false);
    let bug = server.db.create_task_type("Bug").unwrap();

    let response = server
        .post(
            "/tasks/create/",
            "alice",
            &[
                ("name", "Fix bug".to_string()),
                ("deadline", deadline_in(2)),
                ("task_type", bug.id.to_string()),
                ("assignees", alice.id.to_string()),
                ("assignees", bob.id.to_string()),
                ("created_by", bob.id.to_string()),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/tasks/");

    let response = server.get("/tasks/?task_type_name=bu", Some("bob")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["task_type_name"], "bu");
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["name"], "Fix bug");
    assert_eq!(tasks[0]["priority"], "medium");
    assert_eq!(tasks[0]["created_by"]["username"], "alice");
    assert_eq!(tasks[0]["assignees"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_form_is_422_with_field_map() {
    let server = TestServer::with_defaults().await;
    server.worker("alice", false);

    let response = server
        .post(
            "/tasks/create/",
            "alice",
            &[("name", "   ".to_string()), ("priority", "critical".to_string())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    for field in ["name", "deadline", "priority", "task_type"] {
        assert!(body["fields"][field].is_array(), "missing error for {}", field);
    }
}

#[tokio::test]
async fn completion_is_for_assignees_only() {
    let server = TestServer::with_defaults().await;
    let alice = server.worker("alice", false);
    server.worker("bob", false);
    let bug = server.db.create_task_type("Bug").unwrap();
    let form = task_manager::forms::TaskForm::new()
        .name("Fix bug")
        .deadline(today())
        .task_type(bug.id)
        .assignees(&[alice.id]);
    let task = services::tasks::create(&server.db, &alice, &form).unwrap();
    let path = format!("/tasks/{}/", task.id);

    let response = server.post(&path, "bob", &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server.post(&path, "alice", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), path);

    let body: Value = server.get(&path, Some("alice")).await.json().await.unwrap();
    assert_eq!(body["task"]["is_completed"], true);
    assert_eq!(body["can_complete"], true);
}

#[tokio::test]
async fn missing_task_is_404() {
    let server = TestServer::with_defaults().await;
    server.worker("alice", false);
    let response = server.get("/tasks/999/", Some("alice")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn worker_delete_needs_staff() {
    let server = TestServer::with_defaults().await;
    server.worker("alice", false);
    let bob = server.worker("bob", false);
    server.worker("boss", true);
    let path = format!("/workers/{}/delete/", bob.id);

    let response = server.post(&path, "alice", &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "PERMISSION_DENIED");

    let response = server.post(&path, "boss", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/workers/");
    assert!(server.db.get_worker(bob.id).unwrap().is_none());
}

#[tokio::test]
async fn worker_list_pages_of_seven() {
    let server = TestServer::with_defaults().await;
    for i in 0..9 {
        server.worker(&format!("user{}", i), false);
    }

    let body: Value = server.get("/workers/?page=2", Some("user0")).await.json().await.unwrap();
    assert_eq!(body["page"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["username"], "user7");

    let body: Value = server.get("/workers/?page=9", Some("user0")).await.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn task_type_reads_follow_config() {
    let server = TestServer::with_defaults().await;
    let response = server.get("/tasktypes/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let mut config = Config::default();
    config.access.public_task_type_reads = true;
    let open = TestServer::start(config).await;
    open.db.create_task_type("Bug").unwrap();
    let response = open.get("/tasktypes/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body[0]["name"], "Bug");

    // writes still need a login
    let response = open
        .client
        .post(open.url("/tasktypes/create/"))
        .form(&[("name", "Docs")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/accounts/login/"));
}

#[tokio::test]
async fn task_type_in_use_is_409() {
    let server = TestServer::with_defaults().await;
    let alice = server.worker("alice", false);
    let bug = server.db.create_task_type("Bug").unwrap();
    let form = task_manager::forms::TaskForm::new()
        .name("Fix bug")
        .deadline(today())
        .task_type(bug.id);
    services::tasks::create(&server.db, &alice, &form).unwrap();

    let response = server
        .post(&format!("/tasktypes/{}/delete/", bug.id), "alice", &[])
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn staff_search_endpoint() {
    let server = TestServer::with_defaults().await;
    let alice = server.worker("alice", false);
    server.worker("boss", true);
    let bug = server.db.create_task_type("Bug").unwrap();
    let form = task_manager::forms::TaskForm::new()
        .name("Crash on save")
        .deadline(today())
        .priority("high")
        .task_type(bug.id);
    services::tasks::create(&server.db, &alice, &form).unwrap();

    let response = server.get("/admin/tasks/?q=crash&priority=high", Some("boss")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 1);

    let response = server.get("/admin/tasks/?priority=critical", Some("boss")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = server.get("/admin/tasks/", Some("alice")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
