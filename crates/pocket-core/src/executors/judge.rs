//! Remote judge backend
//!
//! Each call is a self-contained cycle against a Judge0-compatible service:
//! submit the source, then poll the submission by token until it reaches a
//! terminal status or the attempt ceiling is hit. The client keeps nothing but
//! its configuration between calls, so one instance can serve concurrent runs.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{CodeExecutor, ExecutionResult};
use crate::config::JudgeConfig;
use crate::errors::ExecutorError;

/// Judge language ids for the identifiers this client knows about.
///
/// Ids are the Judge0 CE ones (`GET /languages`); in particular kotlin is 78
/// and swift is 83, not the 63/82 pairing seen in older client maps.
pub const JUDGE_LANGUAGE_IDS: &[(&str, u32)] = &[
    ("c", 50),
    ("cpp", 54),
    ("go", 57),
    ("java", 62),
    ("javascript", 63),
    ("php", 68),
    ("python", 71),
    ("ruby", 72),
    ("rust", 73),
    ("typescript", 74),
    ("kotlin", 78),
    ("swift", 83),
];

/// Status ids up to this value mean the submission is queued or running.
const STATUS_IN_PROGRESS_MAX: u32 = 2;
const STATUS_ACCEPTED: u32 = 3;

const API_KEY_HEADER: &str = "X-RapidAPI-Key";
const API_HOST_HEADER: &str = "X-RapidAPI-Host";

pub fn judge_language_id(language: &str) -> Option<u32> {
    let language = language.to_lowercase();
    JUDGE_LANGUAGE_IDS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, id)| *id)
}

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    source_code: &'a str,
    language_id: u32,
    stdin: &'a str,
    expected_output: &'a str,
    compile_only: bool,
}

#[derive(Debug, Deserialize)]
struct SubmissionToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    id: u32,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionResult {
    #[serde(default)]
    status: Option<SubmissionStatus>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    compile_output: Option<String>,
    #[serde(default)]
    exit_code: Option<i32>,
}

impl SubmissionResult {
    fn status_id(&self) -> Option<u32> {
        self.status.as_ref().map(|s| s.id)
    }

    /// A missing status is treated as terminal; it cannot get any better.
    fn is_terminal(&self) -> bool {
        self.status_id().map_or(true, |id| id > STATUS_IN_PROGRESS_MAX)
    }

    fn into_execution_result(self, started: Instant) -> ExecutionResult {
        if self.status_id() == Some(STATUS_ACCEPTED) {
            return ExecutionResult::success(
                self.stdout.unwrap_or_default(),
                self.exit_code,
                started,
            );
        }

        let diagnostic = [self.stderr, self.compile_output]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty());
        let error = diagnostic.unwrap_or_else(|| {
            match self.status.and_then(|s| s.description).filter(|d| !d.is_empty()) {
                Some(description) => format!("Execution failed: {}", description),
                None => "Execution failed".to_string(),
            }
        });
        ExecutionResult::failure(error, self.exit_code, started)
    }
}

#[derive(Debug, Clone)]
pub struct RemoteJudgeExecutor {
    http: Client,
    api_url: String,
    api_key: String,
    api_host: String,
    poll_interval: Duration,
    max_attempts: u32,
    default_language_id: Option<u32>,
}

impl RemoteJudgeExecutor {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ExecutorError> {
        let config = JudgeConfig {
            api_url: api_url.into(),
            api_key: api_key.into(),
            ..JudgeConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &JudgeConfig) -> Result<Self, ExecutorError> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_host: config.api_host.clone(),
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts.max(1),
            default_language_id: config.default_language_id,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_default_language_id(mut self, language_id: u32) -> Self {
        self.default_language_id = Some(language_id);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Judge id for `language`, falling back to the configured default.
    pub fn language_id(&self, language: &str) -> Option<u32> {
        judge_language_id(language).or(self.default_language_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            return request;
        }
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_HOST_HEADER, &self.api_host)
    }

    async fn submit(&self, code: &str, language_id: u32) -> Result<String, ExecutorError> {
        let url = format!("{}/submissions", self.api_url);
        let payload = SubmissionRequest {
            source_code: code,
            language_id,
            stdin: "",
            expected_output: "",
            compile_only: false,
        };

        let response = self
            .authorize(self.http.post(&url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExecutorError::Submission(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Submission(format!(
                "judge responded with {}: {}",
                status,
                body.trim()
            )));
        }

        let token: SubmissionToken = response.json().await.map_err(|e| {
            ExecutorError::Submission(format!("invalid submission response: {}", e))
        })?;
        Ok(token.token)
    }

    async fn fetch(&self, token: &str) -> Result<SubmissionResult, ExecutorError> {
        let url = format!("{}/submissions/{}", self.api_url, token);
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<SubmissionResult>().await?)
    }

    /// Poll until the submission is terminal. Hitting the ceiling first is its
    /// own outcome and never classified as a judge verdict.
    async fn poll(&self, token: &str) -> Result<SubmissionResult, ExecutorError> {
        let mut attempts = 0;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            attempts += 1;

            let result = self.fetch(token).await?;
            log::debug!(
                "Submission {} poll {}/{}: status {:?}",
                token,
                attempts,
                self.max_attempts,
                result.status_id()
            );
            if result.is_terminal() {
                return Ok(result);
            }
            if attempts >= self.max_attempts {
                log::warn!(
                    "Submission {} still running after {} polls, giving up",
                    token,
                    attempts
                );
                return Err(ExecutorError::PollTimeout);
            }
        }
    }

    async fn run(&self, code: &str, language_id: u32) -> Result<SubmissionResult, ExecutorError> {
        let token = self.submit(code, language_id).await?;
        log::info!("Submitted to judge with token {}", token);
        self.poll(&token).await
    }
}

#[async_trait]
impl CodeExecutor for RemoteJudgeExecutor {
    async fn execute_code(
        &self,
        code: &str,
        language: &str,
    ) -> Result<ExecutionResult, ExecutorError> {
        let started = Instant::now();
        let Some(language_id) = self.language_id(language) else {
            let err = ExecutorError::UnsupportedLanguage(language.to_lowercase());
            log::warn!("{}", err);
            return Ok(ExecutionResult::from_error(&err, started));
        };

        match self.run(code, language_id).await {
            Ok(result) => {
                let result = result.into_execution_result(started);
                log::info!(
                    "Judge run finished in {}ms ({})",
                    result.execution_time_ms,
                    if result.is_success() { "accepted" } else { "failed" }
                );
                Ok(result)
            }
            Err(e) => {
                log::warn!("Judge run failed: {}", e);
                Ok(ExecutionResult::from_error(&e, started))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judge_mock::{JudgeFixture, MockJudgeServer, PollResponse};

    fn client(server: &MockJudgeServer) -> RemoteJudgeExecutor {
        RemoteJudgeExecutor::new(server.address(), "")
            .unwrap()
            .with_poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn test_language_table_is_case_insensitive() {
        assert_eq!(judge_language_id("python"), Some(71));
        assert_eq!(judge_language_id("PYTHON"), Some(71));
        assert_eq!(judge_language_id("Cpp"), Some(54));
        assert_eq!(judge_language_id("cobol"), None);
        assert_eq!(judge_language_id(""), None);
    }

    #[tokio::test]
    async fn test_accepted_submission() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::accepted("42\n")])).await;
        let judge = client(&server);

        let result = judge.execute_code("print(42)", "python").await.unwrap();
        assert_eq!(result.output, "42\n");
        assert!(result.error.is_none());

        let submissions = server.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].source_code, "print(42)");
        assert_eq!(submissions[0].language_id, 71);
        assert_eq!(submissions[0].stdin, "");
        assert_eq!(submissions[0].expected_output, "");
        assert!(!submissions[0].compile_only);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_polls_until_terminal() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![
            PollResponse::in_progress(1),
            PollResponse::in_progress(2),
            PollResponse::accepted("done\n").with_exit_code(0),
        ]))
        .await;

        let result = client(&server).execute_code("print('done')", "Python").await.unwrap();
        assert_eq!(result.output, "done\n");
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(server.poll_count(), 3);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_stderr_takes_precedence_over_compile_output() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::finished(11)
            .with_stderr("Traceback: boom")
            .with_compile_output("warning: unused")
            .with_exit_code(1)]))
        .await;

        let result = client(&server).execute_code("raise", "python").await.unwrap();
        assert_eq!(result.output, "");
        assert_eq!(result.error.as_deref(), Some("Traceback: boom"));
        assert_eq!(result.exit_code, Some(1));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_compile_output_used_without_stderr() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::finished(6)
            .with_stderr("")
            .with_compile_output("main.c:1: error: expected ';'")]))
        .await;

        let result = client(&server).execute_code("int main() {", "c").await.unwrap();
        assert_eq!(result.error.as_deref(), Some("main.c:1: error: expected ';'"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_generic_failure_message() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::finished(13)])).await;
        let result = client(&server).execute_code("x", "go").await.unwrap();
        assert_eq!(result.error.as_deref(), Some("Execution failed"));
        server.shutdown().await;

        let server = MockJudgeServer::start(JudgeFixture::new(vec![
            PollResponse::finished(5).with_description("Time Limit Exceeded"),
        ]))
        .await;
        let result = client(&server).execute_code("loop {}", "rust").await.unwrap();
        assert_eq!(result.error.as_deref(), Some("Execution failed: Time Limit Exceeded"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_poll_ceiling_reports_timeout() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::in_progress(2)])).await;
        let judge = client(&server).with_max_attempts(4);

        let started = Instant::now();
        let result = judge.execute_code("while True: pass", "python").await.unwrap();

        assert_eq!(result.error.as_deref(), Some("execution timed out"));
        assert_eq!(result.output, "");
        assert_eq!(server.poll_count(), 4);
        assert!(result.execution_time_ms >= 4 * 5, "took {}ms", result.execution_time_ms);
        assert!(started.elapsed() < Duration::from_secs(5));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejected_submission_becomes_result() {
        let server =
            MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::accepted("")]).rejecting(401)).await;

        let result = client(&server).execute_code("print(1)", "python").await.unwrap();
        let error = result.error.unwrap();
        assert!(error.contains("401"), "unexpected error: {}", error);
        assert_eq!(server.poll_count(), 0);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_or_malformed_endpoints_never_raise() {
        for url in ["http://127.0.0.1:1", "not a url", "http://[::1"] {
            let judge = RemoteJudgeExecutor::new(url, "key")
                .unwrap()
                .with_poll_interval(Duration::from_millis(1));
            let result = judge.execute_code("print(1)", "python").await.unwrap();
            let error = result.error.unwrap_or_default();
            assert!(!error.is_empty(), "no error for {}", url);
            assert_eq!(result.output, "");
        }
    }

    #[tokio::test]
    async fn test_credentials_are_sent() {
        let server = MockJudgeServer::start(
            JudgeFixture::new(vec![PollResponse::accepted("ok")]).requiring_key("s3cret"),
        )
        .await;
        let config = JudgeConfig {
            api_url: server.address(),
            api_key: "s3cret".to_string(),
            api_host: "judge.example".to_string(),
            poll_interval_ms: 5,
            ..JudgeConfig::default()
        };

        let result = RemoteJudgeExecutor::from_config(&config)
            .unwrap()
            .execute_code("print('ok')", "python")
            .await
            .unwrap();
        assert_eq!(result.output, "ok");

        let submissions = server.submissions();
        assert_eq!(submissions[0].api_key.as_deref(), Some("s3cret"));
        assert_eq!(submissions[0].api_host.as_deref(), Some("judge.example"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_language_is_unsupported() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::accepted("")])).await;

        let result = client(&server).execute_code("DISPLAY 'HI'.", "COBOL").await.unwrap();
        assert_eq!(result.error.as_deref(), Some("unsupported language: cobol"));
        assert!(server.submissions().is_empty());
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_configured_default_language() {
        let server = MockJudgeServer::start(JudgeFixture::new(vec![PollResponse::accepted("HI\n")])).await;

        let result = client(&server)
            .with_default_language_id(71)
            .execute_code("print('HI')", "cobol")
            .await
            .unwrap();
        assert_eq!(result.output, "HI\n");
        assert_eq!(server.submissions()[0].language_id, 71);
        server.shutdown().await;
    }

    #[test]
    fn test_missing_status_is_terminal_failure() {
        let result: SubmissionResult = serde_json::from_str(r#"{"stdout": "x"}"#).unwrap();
        assert!(result.is_terminal());
        let result = result.into_execution_result(Instant::now());
        assert_eq!(result.error.as_deref(), Some("Execution failed"));
        assert_eq!(result.output, "");
    }
}
