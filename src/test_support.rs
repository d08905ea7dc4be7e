use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::schemas::exam::{
    CompleteExamResponse, ExerciseMetadata, FetchQuestionResponse, ResumeExamResponse,
    SessionLayout, StartChapterTestResponse, StartExamResponse, SubmitAnswerRequest,
};
use crate::services::backend::{BackendError, ExamBackend};
use crate::session::proctoring::{FullscreenPlatform, ProctoringError};
use crate::session::types::{QuestionKey, QuestionPayload, SubmissionId};

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("PICRETE_ENV", "test");
    std::env::set_var("PICRETE_STRICT_CONFIG", "0");
    std::env::set_var("EXAM_API_BASE_URL", "http://127.0.0.1:9/api/v1");
    std::env::remove_var("EXAM_API_TOKEN");
    std::env::set_var("EXAM_API_TIMEOUT_SECONDS", "5");
    std::env::set_var("EXAM_API_CONNECT_TIMEOUT_SECONDS", "2");
    std::env::remove_var("EXAM_TICK_MILLIS");
    std::env::remove_var("EXAM_PROCTORING_POLL_MILLIS");
    std::env::remove_var("PROCTORING_EXIT_POLICY");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    for key in [
        "EXAM_SUBMISSION_ID",
        "EXAM_EXERCISE_ID",
        "EXAM_CHAPTER_ID",
        "EXAM_USER_ID",
        "EXAM_TIME_REMAINING_SECONDS",
        "EXAM_DURATION_SECONDS",
    ] {
        std::env::remove_var(key);
    }
}

#[derive(Debug, Default)]
struct ScreenState {
    supported: bool,
    on: bool,
}

/// Full-screen platform whose status the test can flip behind the guard's back.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeScreen {
    state: Arc<StdMutex<ScreenState>>,
}

impl FakeScreen {
    pub(crate) fn supported() -> Self {
        Self { state: Arc::new(StdMutex::new(ScreenState { supported: true, on: false })) }
    }

    pub(crate) fn unsupported() -> Self {
        Self::default()
    }

    pub(crate) fn is_on(&self) -> bool {
        self.state.lock().expect("screen lock").on
    }

    /// The test-taker pressed Escape or switched away.
    pub(crate) fn user_escapes(&self) {
        self.state.lock().expect("screen lock").on = false;
    }

    pub(crate) fn force(&self, on: bool) {
        self.state.lock().expect("screen lock").on = on;
    }
}

impl FullscreenPlatform for FakeScreen {
    fn request_fullscreen(&mut self) -> Result<(), ProctoringError> {
        let mut state = self.state.lock().expect("screen lock");
        if !state.supported {
            return Err(ProctoringError::Unsupported);
        }
        state.on = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<(), ProctoringError> {
        self.state.lock().expect("screen lock").on = false;
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.is_on()
    }
}

#[derive(Debug, Default)]
struct FakeState {
    submission_id: String,
    total_questions: u32,
    question_ids: Vec<String>,
    time_remaining: u64,
    duration_seconds: Option<u64>,
    correct: HashMap<QuestionKey, String>,
    saved: HashMap<QuestionKey, String>,
    failures: HashMap<&'static str, VecDeque<BackendError>>,
    calls: Vec<String>,
    submitted: Vec<SubmitAnswerRequest>,
    paused_with: Vec<u64>,
    completions: u32,
}

/// Scripted in-memory backend. Answers are scored against `set_correct`.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeBackend {
    state: Arc<StdMutex<FakeState>>,
}

impl FakeBackend {
    pub(crate) fn exercise(total_questions: u32, time_remaining: u64) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.lock();
            state.submission_id = "sub-exercise".to_string();
            state.total_questions = total_questions;
            state.time_remaining = time_remaining;
        }
        backend
    }

    pub(crate) fn chapter(question_ids: &[&str], time_remaining: u64) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.lock();
            state.submission_id = "sub-chapter".to_string();
            state.question_ids = question_ids.iter().map(|id| id.to_string()).collect();
            state.total_questions = question_ids.len() as u32;
            state.time_remaining = time_remaining;
        }
        backend
    }

    pub(crate) fn with_duration(self, seconds: u64) -> Self {
        self.lock().duration_seconds = Some(seconds);
        self
    }

    pub(crate) fn set_correct(&self, key: QuestionKey, value: &str) {
        self.lock().correct.insert(key, value.to_string());
    }

    /// Pretends an earlier run already stored this answer.
    pub(crate) fn seed_answer(&self, key: QuestionKey, value: &str) {
        self.lock().saved.insert(key, value.to_string());
    }

    /// Stored remaining time changed outside this session.
    pub(crate) fn set_time_remaining(&self, seconds: u64) {
        self.lock().time_remaining = seconds;
    }

    pub(crate) fn fail_next(&self, call: &'static str, error: BackendError) {
        self.lock().failures.entry(call).or_default().push_back(error);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub(crate) fn call_count(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|name| name.as_str() == call).count()
    }

    pub(crate) fn saved_answer(&self, key: &QuestionKey) -> Option<String> {
        self.lock().saved.get(key).cloned()
    }

    pub(crate) fn submitted(&self) -> Vec<SubmitAnswerRequest> {
        self.lock().submitted.clone()
    }

    pub(crate) fn paused_with(&self) -> Vec<u64> {
        self.lock().paused_with.clone()
    }

    pub(crate) fn completions(&self) -> u32 {
        self.lock().completions
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend lock")
    }

    fn enter(&self, call: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>, BackendError> {
        let mut state = self.lock();
        state.calls.push(call.to_string());
        if let Some(error) = state.failures.get_mut(call).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(state)
    }
}

impl FakeState {
    fn layout(&self) -> SessionLayout {
        if self.question_ids.is_empty() {
            SessionLayout::Sequential { total_questions: self.total_questions }
        } else {
            SessionLayout::Listed { question_ids: self.question_ids.clone() }
        }
    }
}

#[async_trait]
impl ExamBackend for FakeBackend {
    async fn start_exam(
        &self,
        _exercise_id: &str,
        _user_id: &str,
    ) -> Result<StartExamResponse, BackendError> {
        let state = self.enter("start_exam")?;
        Ok(StartExamResponse {
            submission_id: SubmissionId::new(state.submission_id.clone()),
            exercise: ExerciseMetadata {
                title: "Verbal reasoning".to_string(),
                total_questions: state.total_questions,
                duration_seconds: state.duration_seconds,
            },
            time_remaining_seconds: Some(state.time_remaining),
        })
    }

    async fn start_chapter_test(
        &self,
        _chapter_id: &str,
        _user_id: &str,
    ) -> Result<StartChapterTestResponse, BackendError> {
        let state = self.enter("start_chapter_test")?;
        Ok(StartChapterTestResponse {
            submission_id: SubmissionId::new(state.submission_id.clone()),
            question_ids: state.question_ids.clone(),
            time_remaining_seconds: state.time_remaining,
            duration_seconds: state.duration_seconds,
        })
    }

    async fn fetch_question(
        &self,
        _submission_id: &SubmissionId,
        key: &QuestionKey,
    ) -> Result<FetchQuestionResponse, BackendError> {
        let state = self.enter("fetch_question")?;
        Ok(FetchQuestionResponse {
            question: QuestionPayload {
                text: format!("Question {key}"),
                options: ["(A)", "(B)", "(C)", "(D)"].iter().map(|o| o.to_string()).collect(),
                grid: None,
                image_url: None,
                sub_question: None,
            },
            previous_answer: state.saved.get(key).cloned(),
        })
    }

    async fn submit_answer(
        &self,
        _submission_id: &SubmissionId,
        answer: &SubmitAnswerRequest,
    ) -> Result<(), BackendError> {
        let mut state = self.enter("submit_answer")?;
        state.saved.insert(answer.question_key.clone(), answer.value.clone());
        state.submitted.push(answer.clone());
        Ok(())
    }

    async fn fetch_attempted_keys(
        &self,
        _submission_id: &SubmissionId,
    ) -> Result<Vec<QuestionKey>, BackendError> {
        let state = self.enter("fetch_attempted_keys")?;
        Ok(state.saved.keys().cloned().collect())
    }

    async fn pause_exam(
        &self,
        _submission_id: &SubmissionId,
        time_remaining_seconds: u64,
    ) -> Result<(), BackendError> {
        let mut state = self.enter("pause_exam")?;
        state.time_remaining = time_remaining_seconds;
        state.paused_with.push(time_remaining_seconds);
        Ok(())
    }

    async fn resume_exam(
        &self,
        _submission_id: &SubmissionId,
    ) -> Result<ResumeExamResponse, BackendError> {
        let state = self.enter("resume_exam")?;
        Ok(ResumeExamResponse {
            time_remaining_seconds: state.time_remaining,
            layout: state.layout(),
            duration_seconds: state.duration_seconds,
        })
    }

    async fn complete_exam(
        &self,
        _submission_id: &SubmissionId,
    ) -> Result<CompleteExamResponse, BackendError> {
        let mut state = self.enter("complete_exam")?;
        state.completions += 1;
        let score = state
            .saved
            .iter()
            .filter(|(key, value)| state.correct.get(*key) == Some(*value))
            .count() as u32;
        Ok(CompleteExamResponse { score, total_questions: state.total_questions })
    }
}

/// One request seen by the stub server.
#[derive(Debug, Clone)]
pub(crate) struct StubRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) body: Value,
    pub(crate) authorization: Option<String>,
    pub(crate) request_id: Option<String>,
}

#[derive(Default)]
struct StubState {
    routes: StdMutex<HashMap<(String, String), (u16, Value)>>,
    requests: StdMutex<Vec<StubRequest>>,
}

/// In-process HTTP server answering canned JSON per `(method, path)`.
pub(crate) struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
}

impl StubServer {
    pub(crate) fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// `Value::Null` answers with an empty body.
    pub(crate) fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.state
            .routes
            .lock()
            .expect("stub routes")
            .insert((method.to_string(), path.to_string()), (status, body));
    }

    pub(crate) fn requests(&self) -> Vec<StubRequest> {
        self.state.requests.lock().expect("stub requests").clone()
    }
}

pub(crate) async fn spawn_stub_server() -> StubServer {
    let state = Arc::new(StubState::default());
    let app = Router::new().fallback(stub_handler).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    StubServer { addr, state }
}

async fn stub_handler(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: &str| {
        headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
    };
    let path = uri.path().to_string();
    state.requests.lock().expect("stub requests").push(StubRequest {
        method: method.to_string(),
        path: path.clone(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        authorization: header_value(header::AUTHORIZATION.as_str()),
        request_id: header_value("x-request-id"),
    });

    let route = state.routes.lock().expect("stub routes").get(&(method.to_string(), path.clone())).cloned();
    match route {
        Some((status, Value::Null)) => {
            StatusCode::from_u16(status).unwrap_or(StatusCode::OK).into_response()
        }
        Some((status, body)) => {
            (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), Json(body)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "detail": format!("no stub for {method} {path}") })),
        )
            .into_response(),
    }
}
