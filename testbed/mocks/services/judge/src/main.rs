use judge_mock::JudgeFixture;
use std::env;
use std::fs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let fixtures_path = env::var("FIXTURES_PATH").unwrap_or_else(|_| "/app/fixtures".to_string());
    let fixture_file = format!("{}/judge-fixture.yaml", fixtures_path);

    let fixture = match fs::read_to_string(&fixture_file) {
        Ok(content) => {
            tracing::info!("Loading fixture from {}", fixture_file);
            JudgeFixture::from_yaml(&content)?
        }
        Err(_) => {
            tracing::info!("No fixture file found, using default test fixture");
            JudgeFixture::create_test_fixture()
        }
    };

    let addr = env::var("JUDGE_MOCK_ADDR").unwrap_or_else(|_| "0.0.0.0:2358".to_string());
    judge_mock::serve(fixture, &addr).await
}
