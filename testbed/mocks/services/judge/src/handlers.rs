use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::fixtures::{JudgeFixture, PollResponse};

pub const API_KEY_HEADER: &str = "x-rapidapi-key";
pub const API_HOST_HEADER: &str = "x-rapidapi-host";

/// A submission as the mock received it, credentials included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSubmission {
    pub source_code: String,
    pub language_id: u32,
    #[serde(default)]
    pub stdin: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub compile_only: bool,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub api_host: Option<String>,
}

#[derive(Default)]
struct Ledger {
    polls: VecDeque<PollResponse>,
    tokens: HashSet<String>,
    submissions: Vec<RecordedSubmission>,
    poll_count: usize,
}

#[derive(Clone)]
pub struct JudgeState {
    fixture: Arc<JudgeFixture>,
    ledger: Arc<Mutex<Ledger>>,
}

impl JudgeState {
    pub fn new(fixture: JudgeFixture) -> Self {
        let ledger = Ledger {
            polls: fixture.polls.iter().cloned().collect(),
            ..Ledger::default()
        };
        Self {
            fixture: Arc::new(fixture),
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.ledger().submissions.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.ledger().poll_count
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "judge-mock"
    }))
}

pub async fn create_submission(
    State(state): State<JudgeState>,
    headers: HeaderMap,
    Json(mut submission): Json<RecordedSubmission>,
) -> Response {
    submission.api_key = header(&headers, API_KEY_HEADER);
    submission.api_host = header(&headers, API_HOST_HEADER);

    if let Some(required) = &state.fixture.required_api_key {
        if submission.api_key.as_deref() != Some(required.as_str()) {
            tracing::warn!("Rejecting submission with missing or wrong API key");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid API key" })),
            )
                .into_response();
        }
    }

    if let Some(status) = state.fixture.reject_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::info!("Rejecting submission with scripted status {}", status);
        return (status, Json(json!({ "error": "submission rejected" }))).into_response();
    }

    let mut ledger = state.ledger();
    let token = format!("{}-{}", state.fixture.token, ledger.submissions.len() + 1);
    tracing::info!(
        "Accepted submission {} (language {})",
        token,
        submission.language_id
    );
    ledger.tokens.insert(token.clone());
    ledger.submissions.push(submission);

    (StatusCode::CREATED, Json(json!({ "token": token }))).into_response()
}

pub async fn get_submission(
    Path(token): Path<String>,
    State(state): State<JudgeState>,
) -> Response {
    let mut ledger = state.ledger();
    if !ledger.tokens.contains(&token) {
        return StatusCode::NOT_FOUND.into_response();
    }
    ledger.poll_count += 1;

    let next = if ledger.polls.len() > 1 {
        ledger.polls.pop_front()
    } else {
        ledger.polls.front().cloned()
    };

    match next {
        Some(response) => {
            tracing::debug!("Poll {} for {}: status {}", ledger.poll_count, token, response.status_id);
            Json(response.to_json(&token)).into_response()
        }
        None => {
            tracing::error!("Judge mock has no scripted poll responses");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
