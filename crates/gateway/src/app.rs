//! Application state and router

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use campusdesk_common::{
    config::AppConfig,
    context::{ContextAssembler, ModelHandle, PromptCompiler, ResponseGateway},
    importer::UploadStore,
    ChatService, DbPool, IdentityGate, Importer, Repository, SessionStore,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::track_requests;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repo: Repository,
    pub gate: IdentityGate,
    pub sessions: SessionStore,
    pub chat: ChatService,
    pub importer: Importer,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, model: ModelHandle) -> Self {
        let repo = Repository::new(db.clone());

        let assembler = ContextAssembler::new(repo.clone(), config.storage.policy_path.clone());
        let chat = ChatService::new(
            repo.clone(),
            assembler,
            PromptCompiler::new(config.language_model.institution.clone()),
            ResponseGateway::new(model),
        );

        Self {
            gate: IdentityGate::new(repo.clone()),
            sessions: SessionStore::new(repo.clone(), config.session_ttl()),
            importer: Importer::new(repo.clone()),
            uploads: UploadStore::new(&config.storage),
            chat,
            repo,
            db,
            config: Arc::new(config),
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Multipart framing needs headroom over the file itself
    let body_limit = state.uploads.max_bytes().saturating_mul(2);
    let timeout = TimeoutLayer::new(state.config.request_timeout());

    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Login
        .route("/", get(handlers::auth::index))
        .route("/login", get(handlers::auth::login_page).post(handlers::auth::login))
        .route("/logout", get(handlers::auth::logout))

        // Chat
        .route("/chat", get(handlers::chat::chat_page))
        .route("/admin/chat", get(handlers::chat::admin_chat_page))
        .route("/api/chat", post(handlers::chat::chat))

        // Administration
        .route("/admin/dashboard", get(handlers::admin::dashboard))
        .route(
            "/admin/upload",
            get(handlers::admin::upload_page).post(handlers::admin::upload),
        )
        .route("/admin/students", get(handlers::admin::list_students))
        .route("/admin/students/{id}", delete(handlers::admin::delete_student))
        .route("/admin/chatlogs", get(handlers::admin::chat_logs))

        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(track_requests))
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use campusdesk_common::{config::StorageConfig, context::FALLBACK_RESPONSE, db::models::StudentPatch};
    use tower::ServiceExt;

    const BOUNDARY: &str = "campusdesk-test-boundary";

    async fn test_state(upload_dir: &std::path::Path) -> AppState {
        test_state_with_storage(StorageConfig {
            upload_dir: upload_dir.to_path_buf(),
            ..Default::default()
        })
        .await
    }

    async fn test_state_with_storage(storage: StorageConfig) -> AppState {
        let config = AppConfig {
            storage,
            ..Default::default()
        };
        let db = DbPool::in_memory().await.unwrap();
        let state = AppState::new(
            config,
            db,
            ModelHandle::Unavailable {
                reason: "test".into(),
            },
        );

        state
            .gate
            .ensure_default_admin("admin@example.com", "admin123")
            .await
            .unwrap();
        state
            .repo
            .upsert_students(&[StudentPatch::new(101, "R1", "Asha")])
            .await
            .unwrap();
        state
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response {
        create_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    async fn login(state: &AppState, form: &'static str) -> Response {
        let request = Request::post("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        send(state, request).await
    }

    /// Log in and return the `Cookie` header value for later requests
    async fn login_cookie(state: &AppState, form: &'static str) -> String {
        let response = login(state, form).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn chat_request(cookie: Option<&str>, query: &str) -> Request<Body> {
        let mut builder = Request::post("/api/chat").header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
            .body(Body::from(serde_json::json!({ "query": query }).to_string()))
            .unwrap()
    }

    fn upload_request(cookie: &str, filename: &str, content: &str) -> Request<Body> {
        upload_bytes_request(cookie, filename, content.as_bytes())
    }

    fn upload_bytes_request(cookie: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            f = filename,
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::post("/admin/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let response = send(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&state, Request::get("/ready").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["language_model"]["status"], "fallback");
    }

    #[tokio::test]
    async fn test_anonymous_visitors() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let response = send(&state, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(location(&response), "/login");

        let response = send(&state, Request::get("/chat").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let response = send(&state, chat_request(None, "hello")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_student_login_and_chat() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let response = login(&state, "login_type=student&serial_no=101&roll_no=R1").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/chat");
        let cookie = login_cookie(&state, "login_type=student&serial_no=101&roll_no=R1").await;

        let response = send(
            &state,
            Request::get("/chat")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Hello Asha!"));

        let response = send(&state, chat_request(Some(cookie.as_str()), "What is my GPA?")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["response"], FALLBACK_RESPONSE);

        let logs = state.repo.list_chat_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user_type, "student");

        let response = send(&state, chat_request(Some(cookie.as_str()), "   ")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Students cannot reach administration endpoints
        let response = send(
            &state,
            Request::get("/admin/students")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_failed_logins_render_login_page() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let response = login(&state, "login_type=student&serial_no=101&roll_no=WRONG").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.contains("Invalid credentials. Please try again."));

        let response = login(&state, "login_type=student&serial_no=abc&roll_no=R1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Serial number must be a number"));

        let response = login(&state, "login_type=admin&email=admin%40example.com&password=nope").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = login(&state, "login_type=guest").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Invalid login type"));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let cookie = login_cookie(&state, "login_type=student&serial_no=101&roll_no=R1").await;

        let response = send(
            &state,
            Request::get("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(location(&response), "/login");
        assert!(response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));

        let response = send(&state, chat_request(Some(cookie.as_str()), "hello")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_upload_listing_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let cookie =
            login_cookie(&state, "login_type=admin&email=admin%40example.com&password=admin123").await;

        let csv = "Serial No,Roll No,Name,Semester 1\n101,R1,Asha Rao,8.5\n102,R2,Ravi,7.0\n";
        let response = send(&state, upload_request(&cookie, "students.csv", csv)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("Imported 1 new and updated 1 existing"));
        assert!(page.contains("students.csv"));

        let response = send(&state, upload_request(&cookie, "notes.txt", "hello")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("File type not allowed"));

        let response = send(
            &state,
            Request::get("/admin/students")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let students: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(students.as_array().unwrap().len(), 2);
        assert_eq!(students[0]["name"], "Asha Rao");

        let id = students[1]["id"].as_i64().unwrap();
        let delete = |id: i64| {
            Request::delete(format!("/admin/students/{}", id))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap()
        };

        let response = send(&state, delete(id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Student Ravi deleted successfully");

        let response = send(&state, delete(id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Student not found");
    }

    #[tokio::test]
    async fn test_admin_chat_logs_and_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let cookie =
            login_cookie(&state, "login_type=admin&email=admin%40example.com&password=admin123").await;

        let response = send(&state, chat_request(Some(cookie.as_str()), "list students")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &state,
            Request::get("/admin/chatlogs")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let logs: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(logs[0]["user_type"], "admin");
        assert_eq!(logs[0]["query"], "list students");
        assert_eq!(logs[0]["timestamp"].as_str().unwrap().len(), 19);

        let response = send(
            &state,
            Request::get("/admin/dashboard")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("<h3>Students</h3><p>1</p>"));
        assert!(page.contains("<h3>Chats</h3><p>1</p>"));
    }

    #[tokio::test]
    async fn test_chat_api_errors_are_json() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let response = send(
            &state,
            Request::post("/api/chat").body(Body::from("not json")).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["code"], "UNAUTHORIZED");

        let cookie = login_cookie(&state, "login_type=student&serial_no=101&roll_no=R1").await;

        let malformed = Request::post("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, &cookie)
            .body(Body::from("not json"))
            .unwrap();
        let response = send(&state, malformed).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let untyped = Request::post("/api/chat")
            .header(header::COOKIE, &cookie)
            .body(Body::from(r#"{"query":"hello"}"#))
            .unwrap();
        let response = send(&state, untyped).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");

        assert!(state.repo.list_chat_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_csv_keeps_upload_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let cookie =
            login_cookie(&state, "login_type=admin&email=admin%40example.com&password=admin123").await;

        let mut csv = b"Serial No,Roll No,Name\n102,R2,Ravi\n".to_vec();
        csv.extend_from_slice(&[0xff, 0xfe, b'\n']);

        let response = send(&state, upload_bytes_request(&cookie, "broken.csv", &csv)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("File uploaded but import failed"));

        assert_eq!(state.repo.list_uploaded_files().await.unwrap().len(), 1);
        assert_eq!(state.repo.list_students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state_with_storage(StorageConfig {
            upload_dir: dir.path().to_path_buf(),
            max_upload_bytes: 200,
            ..Default::default()
        })
        .await;
        let cookie =
            login_cookie(&state, "login_type=admin&email=admin%40example.com&password=admin123").await;

        // Over the file limit but inside the framed body limit
        let content = "x".repeat(210);
        let response = send(&state, upload_request(&cookie, "big.csv", &content)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_text(response).await.contains("limited to 200 bytes"));

        // Over the request body limit as well
        let content = "x".repeat(1000);
        let response = send(&state, upload_request(&cookie, "big.csv", &content)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        assert!(state.repo.list_uploaded_files().await.unwrap().is_empty());
    }
}
