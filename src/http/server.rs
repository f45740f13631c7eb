//! HTTP server implementation.

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::service::{router, AppState};
use crate::error::{HoneylogError, Result};
use crate::pipeline::LoginPipeline;

/// HTTP server for the login honeypot.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The request pipeline
    pipeline: Arc<LoginPipeline>,
    /// Static asset directory, if any
    static_dir: Option<PathBuf>,
    trust_forwarded_header: bool,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, pipeline: Arc<LoginPipeline>) -> Self {
        Self {
            addr,
            pipeline,
            static_dir: None,
            trust_forwarded_header: false,
        }
    }

    /// Serve files from `dir` for paths that are not API routes.
    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Take caller identifiers from `X-Forwarded-For`.
    pub fn trust_forwarded_header(mut self, trust: bool) -> Self {
        self.trust_forwarded_header = trust;
        self
    }

    fn router(&self) -> Router {
        let state = AppState::new(self.pipeline.clone(), self.trust_forwarded_header);
        router(state, self.static_dir.as_deref())
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(self.addr).await?;

        info!(
            addr = %listener.local_addr()?,
            static_dir = ?self.static_dir,
            trust_forwarded_header = self.trust_forwarded_header,
            "Starting HTTP server"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            HoneylogError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::pipeline::tests::test_pipeline;

    #[tokio::test]
    async fn test_server_shuts_down_on_signal() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path(), Arc::new(ManualClock::default()), &[]).await;
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let server = HttpServer::new(addr, pipeline).trust_forwarded_header(true);
        let result = server.serve_with_shutdown(async {}).await;

        assert!(result.is_ok());
    }
}
