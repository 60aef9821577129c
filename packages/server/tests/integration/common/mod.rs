use std::net::SocketAddr;

use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tempfile::TempDir;

use portal_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, PhoneLookupConfig, ServerConfig, SmsConfig,
    VerificationConfig,
};
use portal_server::extractors::auth::VERIFY_TOKEN_HEADER;
use portal_server::services::verification::code_key;
use portal_server::state::AppState;

pub const ADMIN_PASSWORD: &str = "test-admin-password";

pub mod routes {
    pub const LOGIN: &str = "/api/auth/login";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const CHECK: &str = "/api/auth/check";
    pub const SEND_CODE: &str = "/api/auth/send-code";
    pub const VERIFY_CODE: &str = "/api/auth/verify-code";
    pub const REVOKE_TOKEN: &str = "/api/auth/revoke-token";
    pub const HEALTH: &str = "/api/health";

    pub const SMS_TEMPLATES: &str = "/api/sms/templates";
    pub const SMS_PREVIEW: &str = "/api/sms/preview";
    pub const SMS_SEND: &str = "/api/sms/send";
    pub const SMS_LOGS: &str = "/api/sms/logs";

    pub fn sms_template(id: i32) -> String {
        format!("/api/sms/templates/{id}")
    }

    pub const CATEGORIES: &str = "/api/training/categories";
    pub const SETS: &str = "/api/training/sets";
    pub const RECORDS: &str = "/api/training/records";

    pub fn category(id: i32) -> String {
        format!("/api/training/categories/{id}")
    }

    pub fn set(id: i32) -> String {
        format!("/api/training/sets/{id}")
    }

    pub fn set_questions(id: i32) -> String {
        format!("/api/training/sets/{id}/questions")
    }

    pub fn set_stats(id: i32) -> String {
        format!("/api/training/sets/{id}/stats")
    }

    pub fn record(id: i32) -> String {
        format!("/api/training/records/{id}")
    }

    pub const QUESTIONS: &str = "/api/admin/questions";
    pub const QUESTIONS_PARSE: &str = "/api/admin/questions/parse";
    pub const QUESTIONS_IMPORT: &str = "/api/admin/questions/import";
    pub const QUESTIONS_UPLOAD: &str = "/api/admin/questions/import/upload";

    pub fn question(id: i32) -> String {
        format!("/api/admin/questions/{id}")
    }

    pub const IMPORT_COMPANIES: &str = "/api/import/companies";
    pub const IMPORT_HISTORY: &str = "/api/import/history";

    pub fn import_history(id: i32) -> String {
        format!("/api/import/history/{id}")
    }

    pub fn company(id: i32) -> String {
        format!("/api/import/companies/{id}")
    }

    pub const PHONE_NUMBERS: &str = "/api/phone-numbers";
    pub const PHONE_BATCH: &str = "/api/phone-numbers/lookup/batch";

    pub fn phone_lookup(phone: &str) -> String {
        format!("/api/phone-numbers/lookup?phone={phone}")
    }

    pub fn phone_number(phone: &str) -> String {
        format!("/api/phone-numbers/{phone}")
    }

    pub const PROJECTS: &str = "/api/project-progress/projects";

    pub fn project(id: i32) -> String {
        format!("/api/project-progress/projects/{id}")
    }

    pub fn project_phases(id: i32) -> String {
        format!("/api/project-progress/projects/{id}/phases")
    }

    pub fn phase(id: i32) -> String {
        format!("/api/project-progress/phases/{id}")
    }

    pub fn phase_modules(id: i32) -> String {
        format!("/api/project-progress/phases/{id}/modules")
    }

    pub fn module(id: i32) -> String {
        format!("/api/project-progress/modules/{id}")
    }

    pub fn module_items(id: i32) -> String {
        format!("/api/project-progress/modules/{id}/items")
    }

    pub fn item(id: i32) -> String {
        format!("/api/project-progress/items/{id}")
    }

    pub fn item_status(id: i32) -> String {
        format!("/api/project-progress/items/{id}/status")
    }

    pub const SYSTEM_CONFIG: &str = "/api/system-config";

    pub fn system_config(key: &str) -> String {
        format!("/api/system-config/{key}")
    }
}

/// A running test server backed by its own SQLite file.
pub struct TestApp {
    pub addr: SocketAddr,
    /// Client with a cookie store, so a login sticks for later requests.
    pub client: Client,
    pub db: DatabaseConnection,
    pub state: AppState,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub retry_after: Option<String>,
}

fn test_config(db_url: String) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec!["http://localhost:5173".to_string()],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: db_url,
            max_connections: 5,
        },
        auth: AuthConfig {
            admin_password: ADMIN_PASSWORD.to_string(),
            cookie_name: "admin_auth".to_string(),
            cookie_max_age_days: 7,
        },
        verification: VerificationConfig::default(),
        sms: SmsConfig::default(),
        phone_lookup: PhoneLookupConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with `configure` applied to the test configuration first.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("portal.db").display()
        );

        let db = portal_server::database::init_db(&db_url, 5)
            .await
            .expect("Failed to initialize test database");
        portal_server::seed::seed_defaults(&db)
            .await
            .expect("Failed to seed test database");
        portal_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let mut config = test_config(db_url);
        configure(&mut config);
        let state = AppState::new(db.clone(), config).expect("Failed to build app state");
        let app = portal_server::build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to build client"),
            db,
            state,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_with_verify_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header(VERIFY_TOKEN_HEADER, token)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_html(&self, path: &str, html: &str, set_id: i32) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(html.as_bytes().to_vec())
            .file_name("questions.html")
            .mime_str("text/html")
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("set_id", set_id.to_string());

        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Log in with the admin password; the cookie is kept by the client.
    pub async fn login(&self) {
        let res = self
            .post(routes::LOGIN, &json!({ "password": ADMIN_PASSWORD }))
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);
    }

    /// Request a code for the session/page pair and read it back from the store.
    pub async fn send_code(&self, session_id: &str, page_url: &str) -> String {
        let res = self
            .post(
                routes::SEND_CODE,
                &json!({ "sessionId": session_id, "pageUrl": page_url }),
            )
            .await;
        assert_eq!(res.status, 200, "send-code failed: {}", res.text);

        self.state
            .verification
            .get_code(&code_key(session_id, page_url))
            .expect("Code should be stored after send-code")
    }

    /// Log in, send and verify a code, returning the verification token.
    pub async fn verified_token(&self) -> String {
        self.login().await;
        let code = self.send_code("session-1", "/sms").await;
        let res = self
            .post(
                routes::VERIFY_CODE,
                &json!({ "sessionId": "session-1", "pageUrl": "/sms", "code": code }),
            )
            .await;
        assert_eq!(res.status, 200, "verify-code failed: {}", res.text);
        res.body["data"]["token"]
            .as_str()
            .expect("verify-code should return a token")
            .to_string()
    }

    /// Create a question set and return its `id`. Requires a prior login.
    pub async fn create_set(&self, name: &str) -> i32 {
        let res = self
            .post(
                routes::SETS,
                &json!({ "name": name, "description": "Quarterly safety quiz" }),
            )
            .await;
        assert_eq!(res.status, 201, "create_set failed: {}", res.text);
        res.id()
    }

    /// Create a question in `set_id` and return its `id`. Requires a prior login.
    pub async fn create_question(&self, set_id: i32, text: &str, answer: &str) -> i32 {
        let res = self
            .post(
                routes::QUESTIONS,
                &json!({
                    "set_id": set_id,
                    "question_text": text,
                    "option_a": "Option A",
                    "option_b": "Option B",
                    "option_c": "Option C",
                    "option_d": "Option D",
                    "correct_answer": answer,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "create_question failed: {}", res.text);
        res.id()
    }

    /// Create a project and return its `id`. Requires a prior login.
    pub async fn create_project(&self, name: &str) -> i32 {
        let res = self.post(routes::PROJECTS, &json!({ "name": name })).await;
        assert_eq!(res.status, 201, "create_project failed: {}", res.text);
        res.id()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let retry_after = res
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            retry_after,
        }
    }

    /// `data` of the success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn id(&self) -> i32 {
        self.body["data"]["id"]
            .as_i64()
            .expect("response data should contain 'id'") as i32
    }
}
