//! Web server for Sharebox.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::compression::CompressionLayer;

use crate::config::{Config, WebConfig};
use crate::{Result, ShareboxError};

use super::handlers::AppState;
use super::router::{apply_layers, create_health_router, create_router, create_static_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Web configuration.
    web_config: WebConfig,
}

impl WebServer {
    /// Create a new web server. Opens (and if needed creates) the share root.
    pub fn new(config: &Config) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| ShareboxError::Config(format!("invalid server address: {e}")))?;

        let app_state = AppState::new(config)?;
        tracing::info!("Sharing directory: {}", app_state.root.path().display());

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            web_config: config.web.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Assemble the full application router.
    pub fn router(&self) -> Router {
        let mut router = create_router(self.app_state.clone()).merge(create_health_router());

        if self.web_config.serve_static {
            if let Some(static_router) = create_static_router(&self.web_config.static_path) {
                router = router.merge(static_router);
            }
        }
        let router = apply_layers(router, &self.web_config.cors_origins);

        // Folder archives are already gzip-compressed.
        let predicate = DefaultPredicate::new().and(NotForContentType::const_new("application/gzip"));
        router.layer(CompressionLayer::new().compress_when(predicate))
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn create_test_config(share: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.share.path = share.path().to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_web_server_new() {
        let share = TempDir::new().unwrap();
        let server = WebServer::new(&create_test_config(&share)).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_web_server_invalid_host() {
        let share = TempDir::new().unwrap();
        let mut config = create_test_config(&share);
        config.server.host = "not a host".to_string();

        assert!(matches!(
            WebServer::new(&config),
            Err(ShareboxError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_static_front_end_gets_security_headers() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::util::ServiceExt;

        let share = TempDir::new().unwrap();
        let site = TempDir::new().unwrap();
        std::fs::write(site.path().join("index.html"), "<h1>sharebox</h1>").unwrap();

        let mut config = create_test_config(&share);
        config.web.serve_static = true;
        config.web.static_path = site.path().to_string_lossy().into_owned();
        let router = WebServer::new(&config).unwrap().router();

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let share = TempDir::new().unwrap();
        let server = WebServer::new(&create_test_config(&share)).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));
    }
}
