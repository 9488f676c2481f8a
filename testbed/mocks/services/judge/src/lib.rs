//! Mock Judge0 API for exercising the remote judge backend without a network.
//!
//! Responses are scripted by a [`JudgeFixture`]: what each poll returns, and
//! whether submissions are rejected or require an API key. Every accepted
//! submission is recorded with the credentials it carried.

pub mod fixtures;
pub mod handlers;
pub mod server;

pub use fixtures::{JudgeFixture, PollResponse};
pub use handlers::RecordedSubmission;
pub use server::{router, serve, MockJudgeServer};
