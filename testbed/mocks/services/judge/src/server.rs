use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::fixtures::JudgeFixture;
use crate::handlers::{create_submission, get_submission, health_check, JudgeState, RecordedSubmission};

pub fn router(state: JudgeState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/submissions", post(create_submission))
        .route("/submissions/{token}", get(get_submission))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the mock judge on `addr` until the process is stopped.
pub async fn serve(fixture: JudgeFixture, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Judge mock listening on {}", listener.local_addr()?);
    axum::serve(listener, router(JudgeState::new(fixture))).await?;
    Ok(())
}

/// An in-process judge on an ephemeral port, for tests.
pub struct MockJudgeServer {
    addr: SocketAddr,
    state: JudgeState,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockJudgeServer {
    pub async fn start(fixture: JudgeFixture) -> Self {
        let state = JudgeState::new(fixture);
        let app = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind judge mock to 127.0.0.1:0: {}", e);
        });
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("Judge mock has no local address: {}", e));
        tracing::info!("Judge mock listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Judge mock server error: {}", e);
            }
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.state.submissions()
    }

    pub fn poll_count(&self) -> usize {
        self.state.poll_count()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            tracing::warn!("Judge mock already stopped");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }
}
