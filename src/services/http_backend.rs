use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::schemas::exam::{
    AttemptedKeysResponse, CompleteExamResponse, FetchQuestionRequest, FetchQuestionResponse,
    PauseExamRequest, ResumeExamResponse, StartChapterTestResponse, StartExamResponse,
    StartSessionRequest, SubmitAnswerRequest,
};
use crate::services::backend::{BackendError, ExamBackend};
use crate::session::types::{QuestionKey, SubmissionId};

/// JSON-over-HTTP client for the exam backend.
#[derive(Debug, Clone)]
pub(crate) struct HttpExamBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpExamBackend {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api = settings.api();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_seconds))
            .timeout(Duration::from_secs(api.timeout_seconds))
            .build()
            .map_err(|err| anyhow::anyhow!(err).context("Failed to build exam API client"))?;

        let token = Some(api.token.clone()).filter(|token| !token.is_empty());
        Ok(Self { client, base_url: api.base_url.as_str().to_string(), token })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn submission_endpoint(&self, submission_id: &SubmissionId, tail: &str) -> String {
        self.endpoint(&format!("/submissions/{}/{tail}", submission_id.as_str()))
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("X-Request-Id", Uuid::new_v4().to_string());
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, call: &'static str) -> Result<String, BackendError> {
        let response = self.prepare(builder).send().await.map_err(|err| {
            tracing::debug!(call, error = %err, "Exam API transport failure");
            BackendError::Transport(err.to_string())
        })?;

        let status = response.status();
        let raw_body = response
            .text()
            .await
            .map_err(|err| BackendError::Transport(format!("failed to read {call} response: {err}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&raw_body)
                .map(|parsed| extract_error_message(&parsed))
                .unwrap_or_else(|_| fallback_detail(status, &raw_body));
            tracing::debug!(call, status = status.as_u16(), detail = %detail, "Exam API rejected request");
            return Err(BackendError::Status { status: status.as_u16(), detail });
        }

        Ok(raw_body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        call: &'static str,
    ) -> Result<T, BackendError> {
        let raw_body = self.send(builder, call).await?;
        serde_json::from_str(&raw_body)
            .map_err(|err| BackendError::Decode(format!("{call}: {err}")))
    }
}

#[async_trait]
impl ExamBackend for HttpExamBackend {
    async fn start_exam(
        &self,
        exercise_id: &str,
        user_id: &str,
    ) -> Result<StartExamResponse, BackendError> {
        let request = self
            .client
            .post(self.endpoint(&format!("/exams/{exercise_id}/start")))
            .json(&StartSessionRequest { user_id });
        self.send_json(request, "start_exam").await
    }

    async fn start_chapter_test(
        &self,
        chapter_id: &str,
        user_id: &str,
    ) -> Result<StartChapterTestResponse, BackendError> {
        let request = self
            .client
            .post(self.endpoint(&format!("/chapters/{chapter_id}/start")))
            .json(&StartSessionRequest { user_id });
        self.send_json(request, "start_chapter_test").await
    }

    async fn fetch_question(
        &self,
        submission_id: &SubmissionId,
        key: &QuestionKey,
    ) -> Result<FetchQuestionResponse, BackendError> {
        let request = self
            .client
            .post(self.submission_endpoint(submission_id, "questions/fetch"))
            .json(&FetchQuestionRequest { question_key: key });
        self.send_json(request, "fetch_question").await
    }

    async fn submit_answer(
        &self,
        submission_id: &SubmissionId,
        answer: &SubmitAnswerRequest,
    ) -> Result<(), BackendError> {
        let request =
            self.client.post(self.submission_endpoint(submission_id, "answers")).json(answer);
        self.send(request, "submit_answer").await.map(|_| ())
    }

    async fn fetch_attempted_keys(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Vec<QuestionKey>, BackendError> {
        let request = self.client.get(self.submission_endpoint(submission_id, "attempted"));
        let response: AttemptedKeysResponse =
            self.send_json(request, "fetch_attempted_keys").await?;
        Ok(response.keys)
    }

    async fn pause_exam(
        &self,
        submission_id: &SubmissionId,
        time_remaining_seconds: u64,
    ) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.submission_endpoint(submission_id, "pause"))
            .json(&PauseExamRequest { time_remaining_seconds });
        self.send(request, "pause_exam").await.map(|_| ())
    }

    async fn resume_exam(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<ResumeExamResponse, BackendError> {
        let request = self.client.post(self.submission_endpoint(submission_id, "resume"));
        self.send_json(request, "resume_exam").await
    }

    async fn complete_exam(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<CompleteExamResponse, BackendError> {
        let request = self.client.post(self.submission_endpoint(submission_id, "complete"));
        self.send_json(request, "complete_exam").await
    }
}

fn fallback_detail(status: StatusCode, raw_body: &str) -> String {
    let trimmed = raw_body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("unknown_error").to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

fn extract_error_message(payload: &Value) -> String {
    if let Some(detail) = payload.get("detail") {
        if let Some(text) = detail.as_str() {
            return text.to_string();
        }
        if let Some(items) = detail.as_array() {
            let joined = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .or_else(|| item.get("message").and_then(Value::as_str))
                })
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return joined;
            }
        }
    }

    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;
    use crate::test_support::{self, spawn_stub_server, StubRequest};

    async fn backend_for(base_url: &str, token: Option<&str>) -> HttpExamBackend {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("EXAM_API_BASE_URL", base_url);
        if let Some(token) = token {
            std::env::set_var("EXAM_API_TOKEN", token);
        }
        let settings = Settings::load().expect("settings");
        HttpExamBackend::from_settings(&settings).expect("backend")
    }

    #[test]
    fn error_message_prefers_detail() {
        let payload = serde_json::json!({ "detail": "Submission is closed", "message": "x" });
        assert_eq!(extract_error_message(&payload), "Submission is closed");

        let payload = serde_json::json!({ "detail": [{ "msg": "bad key" }, { "message": "late" }] });
        assert_eq!(extract_error_message(&payload), "bad key; late");

        let payload = serde_json::json!({ "error": "rate_limited" });
        assert_eq!(extract_error_message(&payload), "rate_limited");
    }

    #[tokio::test]
    async fn start_chapter_test_posts_user_and_decodes_ids() {
        let stub = spawn_stub_server().await;
        stub.respond(
            "POST",
            "/api/v1/chapters/ch-2/start",
            200,
            serde_json::json!({
                "submissionId": "sub-77",
                "questionIds": ["q7", "q3", "q9"],
                "timeRemainingSeconds": 900
            }),
        );
        let backend = backend_for(&stub.base_url(), Some("secret-token")).await;

        let started = backend.start_chapter_test("ch-2", "student-5").await.expect("start");
        assert_eq!(started.submission_id, SubmissionId::new("sub-77"));
        assert_eq!(started.question_ids, vec!["q7", "q3", "q9"]);
        assert_eq!(started.time_remaining_seconds, 900);

        let requests: Vec<StubRequest> = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/api/v1/chapters/ch-2/start");
        assert_eq!(requests[0].body, serde_json::json!({ "user_id": "student-5" }));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer secret-token"));
        assert!(requests[0].request_id.is_some());
    }

    #[tokio::test]
    async fn question_keys_keep_their_json_shape() {
        let stub = spawn_stub_server().await;
        let question = serde_json::json!({
            "question": { "text": "Which word does not belong?", "options": ["(A)", "(B)"] },
            "previousAnswer": "(B)"
        });
        stub.respond("POST", "/api/v1/submissions/sub-1/questions/fetch", 200, question);
        let backend = backend_for(&stub.base_url(), None).await;
        let submission = SubmissionId::new("sub-1");

        let fetched =
            backend.fetch_question(&submission, &QuestionKey::Number(12)).await.expect("fetch");
        assert_eq!(fetched.previous_answer.as_deref(), Some("(B)"));
        backend
            .fetch_question(&submission, &QuestionKey::Id("q7".to_string()))
            .await
            .expect("fetch");

        let requests = stub.requests();
        assert_eq!(requests[0].body, serde_json::json!({ "question_key": 12 }));
        assert_eq!(requests[1].body, serde_json::json!({ "question_key": "q7" }));
        assert_eq!(requests[0].authorization, None);
    }

    #[tokio::test]
    async fn answers_and_pause_carry_their_payloads() {
        let stub = spawn_stub_server().await;
        stub.respond("POST", "/api/v1/submissions/sub-3/answers", 200, serde_json::json!({}));
        stub.respond("POST", "/api/v1/submissions/sub-3/pause", 204, Value::Null);
        let backend = backend_for(&stub.base_url(), None).await;
        let submission = SubmissionId::new("sub-3");

        let answer = SubmitAnswerRequest {
            question_key: QuestionKey::Number(4),
            value: "(C)".to_string(),
            dwell_seconds: 17,
        };
        backend.submit_answer(&submission, &answer).await.expect("answer");
        backend.pause_exam(&submission, 600).await.expect("pause");

        let requests = stub.requests();
        assert_eq!(requests[0].path, "/api/v1/submissions/sub-3/answers");
        assert_eq!(requests[1].path, "/api/v1/submissions/sub-3/pause");
        assert_eq!(
            requests[0].body,
            serde_json::json!({ "question_key": 4, "value": "(C)", "dwell_seconds": 17 })
        );
        assert_eq!(requests[1].body, serde_json::json!({ "time_remaining_seconds": 600 }));
    }

    #[tokio::test]
    async fn resume_and_attempted_keys_decode() {
        let stub = spawn_stub_server().await;
        stub.respond(
            "POST",
            "/api/v1/submissions/sub-4/resume",
            200,
            serde_json::json!({ "timeRemainingSeconds": 420, "layout": { "totalQuestions": 50 } }),
        );
        stub.respond(
            "GET",
            "/api/v1/submissions/sub-4/attempted",
            200,
            serde_json::json!({ "keys": [1, 2, 5] }),
        );
        let backend = backend_for(&stub.base_url(), None).await;
        let submission = SubmissionId::new("sub-4");

        let resumed = backend.resume_exam(&submission).await.expect("resume");
        assert_eq!(resumed.time_remaining_seconds, 420);
        let keys = backend.fetch_attempted_keys(&submission).await.expect("keys");
        assert_eq!(keys, vec![QuestionKey::Number(1), QuestionKey::Number(2), QuestionKey::Number(5)]);

        let routes: Vec<(String, String)> = stub
            .requests()
            .into_iter()
            .map(|request| (request.method, request.path))
            .collect();
        assert_eq!(
            routes,
            vec![
                ("POST".to_string(), "/api/v1/submissions/sub-4/resume".to_string()),
                ("GET".to_string(), "/api/v1/submissions/sub-4/attempted".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn non_success_status_maps_to_status_error() {
        let stub = spawn_stub_server().await;
        stub.respond(
            "POST",
            "/api/v1/submissions/sub-5/complete",
            409,
            serde_json::json!({ "detail": "Submission already completed" }),
        );
        let backend = backend_for(&stub.base_url(), None).await;

        let err = backend.complete_exam(&SubmissionId::new("sub-5")).await.expect_err("conflict");
        match err {
            BackendError::Status { status, detail } => {
                assert_eq!(status, 409);
                assert_eq!(detail, "Submission already completed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_maps_to_decode_error() {
        let stub = spawn_stub_server().await;
        stub.respond(
            "POST",
            "/api/v1/submissions/sub-6/complete",
            200,
            serde_json::json!({ "score": "lots" }),
        );
        let backend = backend_for(&stub.base_url(), None).await;

        let err = backend.complete_exam(&SubmissionId::new("sub-6")).await.expect_err("decode");
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let backend = backend_for("http://127.0.0.1:9/api/v1", None).await;
        let err = backend.resume_exam(&SubmissionId::new("sub-7")).await.expect_err("refused");
        assert!(matches!(err, BackendError::Transport(_)));
        assert!(err.is_transient());
    }
}
