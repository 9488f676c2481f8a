use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN: &str = "mock-token";

/// One scripted answer to `GET /submissions/{token}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub status_id: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

impl PollResponse {
    fn with_status(status_id: u32, description: Option<&str>) -> Self {
        Self {
            status_id,
            description: description.map(str::to_string),
            stdout: None,
            stderr: None,
            compile_output: None,
            exit_code: None,
        }
    }

    /// Status 3 with the given stdout.
    pub fn accepted(stdout: &str) -> Self {
        let mut response = Self::with_status(3, Some("Accepted"));
        response.stdout = Some(stdout.to_string());
        response
    }

    /// Queued (1) or processing (2).
    pub fn in_progress(status_id: u32) -> Self {
        let description = if status_id == 1 { "In Queue" } else { "Processing" };
        Self::with_status(status_id, Some(description))
    }

    /// Any terminal status, without a description unless one is added.
    pub fn finished(status_id: u32) -> Self {
        Self::with_status(status_id, None)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = Some(stderr.to_string());
        self
    }

    pub fn with_compile_output(mut self, compile_output: &str) -> Self {
        self.compile_output = Some(compile_output.to_string());
        self
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    pub fn to_json(&self, token: &str) -> serde_json::Value {
        serde_json::json!({
            "token": token,
            "status": {
                "id": self.status_id,
                "description": self.description,
            },
            "stdout": self.stdout,
            "stderr": self.stderr,
            "compile_output": self.compile_output,
            "exit_code": self.exit_code,
        })
    }
}

/// How the mock judge behaves for the lifetime of one server.
///
/// Polls are consumed in order across all submissions; once a single response
/// is left it is repeated forever, which is how a never-finishing run is
/// scripted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeFixture {
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default)]
    pub polls: Vec<PollResponse>,
    #[serde(default)]
    pub reject_status: Option<u16>,
    #[serde(default)]
    pub required_api_key: Option<String>,
}

fn default_token() -> String {
    DEFAULT_TOKEN.to_string()
}

impl JudgeFixture {
    pub fn new(polls: Vec<PollResponse>) -> Self {
        Self {
            token: default_token(),
            polls,
            reject_status: None,
            required_api_key: None,
        }
    }

    /// Answer every submission with `status` instead of a token.
    pub fn rejecting(mut self, status: u16) -> Self {
        self.reject_status = Some(status);
        self
    }

    /// Answer 401 unless `X-RapidAPI-Key` matches.
    pub fn requiring_key(mut self, key: &str) -> Self {
        self.required_api_key = Some(key.to_string());
        self
    }

    pub fn from_yaml(yaml_content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml_content)?)
    }

    /// A run that sits in the queue once, then prints a greeting.
    pub fn create_test_fixture() -> Self {
        Self::new(vec![
            PollResponse::in_progress(1),
            PollResponse::accepted("Hello from judge-mock\n").with_exit_code(0),
        ])
    }
}

impl Default for JudgeFixture {
    fn default() -> Self {
        Self::create_test_fixture()
    }
}
