//! 端到端测试：启动真实的 HTTP 服务，用替身模型代替远程 API

mod common;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::pdf::build as build_pdf;
use lecture_quiz::error::GenerationError;
use lecture_quiz::{build_router, AppState, ChatBackend, Config, QuestionRecord};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

const PARIS_REPLY: &str = r#"[{"id":1,"question":"What is the capital of France?","answer":"Paris","explanation":"Paris is the capital city of France."}]"#;

/// 按顺序返回预设回复的模型替身
struct CannedBackend {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl CannedBackend {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ChatBackend for CannedBackend {
    async fn complete(
        &self,
        model: &str,
        _prompt: &str,
        _json_mode: bool,
    ) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerationError::fatal(model, "no canned reply"))
    }
}

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    _dir: TempDir,
}

impl TestServer {
    async fn start(backend: Arc<CannedBackend>) -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            llm_api_key: "test-key".into(),
            retry_delay_secs: 0,
            ..Config::default()
        };
        let state = AppState::new(config, backend);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn upload(&self, form: Form) -> reqwest::Response {
        self.client
            .post(self.url("/generate-questions"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(self.url(path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

fn pdf_form(pdf: Vec<u8>) -> Form {
    let part = Part::bytes(pdf)
        .file_name("lecture.pdf")
        .mime_str("application/pdf")
        .unwrap();
    Form::new().part("file", part)
}

#[tokio::test]
async fn test_generate_questions_and_read_history() {
    let backend = CannedBackend::new(&[PARIS_REPLY]);
    let server = TestServer::start(backend.clone()).await;

    let form = pdf_form(build_pdf(&[Some("The capital of France is Paris.")]))
        .text("subject", "Geography")
        .text("type", "Q&A")
        .text("count", "1");
    let resp = server.upload(form).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let records = tokio_test::assert_ok!(resp.json::<Vec<QuestionRecord>>().await);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].answer, "Paris");
    assert_eq!(backend.calls(), 1);

    let subjects = server.get_json("/get-subjects").await;
    assert_eq!(subjects, serde_json::json!(["Geography"]));

    let history = server.get_json("/get-history/Geography").await;
    assert_eq!(history[0]["question"], "What is the capital of France?");
}

#[tokio::test]
async fn test_image_only_pdf_is_rejected() {
    let backend = CannedBackend::new(&[PARIS_REPLY]);
    let server = TestServer::start(backend.clone()).await;

    let form = pdf_form(build_pdf(&[None, None])).text("subject", "Geography");
    let resp = server.upload(form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("扫描件"));
    assert_eq!(backend.calls(), 0);
    assert_eq!(server.get_json("/get-subjects").await, serde_json::json!([]));
}

#[tokio::test]
async fn test_missing_file_is_rejected() {
    let backend = CannedBackend::new(&[PARIS_REPLY]);
    let server = TestServer::start(backend.clone()).await;

    let resp = server.upload(Form::new().text("subject", "Geography")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_invalid_count_is_rejected() {
    let backend = CannedBackend::new(&[PARIS_REPLY]);
    let server = TestServer::start(backend.clone()).await;

    let form = pdf_form(build_pdf(&[Some("The capital of France is Paris.")])).text("count", "zero");
    let resp = server.upload(form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_malformed_reply_is_a_server_error() {
    let backend = CannedBackend::new(&["Here are your questions: 1. What is Paris?"]);
    let server = TestServer::start(backend).await;

    let form = pdf_form(build_pdf(&[Some("The capital of France is Paris.")]))
        .text("subject", "Geography");
    let resp = server.upload(form).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    assert_eq!(
        server.get_json("/get-history/Geography").await,
        serde_json::json!([])
    );
}

#[tokio::test]
async fn test_unknown_subject_has_empty_history() {
    let server = TestServer::start(CannedBackend::new(&[])).await;

    assert_eq!(
        server.get_json("/get-history/Astronomy").await,
        serde_json::json!([])
    );
    let health = server.get_json("/health").await;
    assert_eq!(health["status"], "ok");
}
