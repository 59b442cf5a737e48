//! HTTP listener bootstrap

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::api::routes::create_router;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::AppState;

/// Build state, bind the configured address and serve until a shutdown signal
pub async fn run(config: AppConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config)?);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Bind { addr, source })?;

    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = listener.local_addr().map_err(AppError::Serve)?.port();
    state.logger.log_line(&format!("App started on port {}", port));
    tracing::info!("App listening on {}", port);
    tracing::debug!("Bound to {}:{}", state.config.host, port);

    let app = create_router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(AppError::Serve)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::sync::oneshot;

    struct TestServer {
        addr: SocketAddr,
        state: Arc<AppState>,
        shutdown: oneshot::Sender<()>,
        handle: tokio::task::JoinHandle<Result<()>>,
        _dir: tempfile::TempDir,
    }

    async fn start() -> TestServer {
        let (state, dir) = AppState::for_tests();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state.clone(), async move {
            let _ = rx.await;
        }));
        TestServer {
            addr,
            state,
            shutdown,
            handle,
            _dir: dir,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_health_served_while_slow_pending() {
        let TestServer {
            addr,
            state,
            shutdown,
            handle: server,
            _dir,
        } = start().await;
        let client = reqwest::Client::new();
        let base = format!("http://{}", addr);

        // Warm up a connection so the timed request does not include connect
        let warmup = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(warmup.text().await.unwrap(), "healthy");

        let slow_client = client.clone();
        let slow_url = format!("{}/slow", base);
        let slow = tokio::spawn(async move {
            let started = Instant::now();
            let response = slow_client.get(slow_url).send().await.unwrap();
            let status = response.status().as_u16();
            let body = response.text().await.unwrap();
            (status, body, started.elapsed())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let started = Instant::now();
        let response = client.get(format!("{}/health", base)).send().await.unwrap();
        let health_latency = started.elapsed();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.text().await.unwrap(), "healthy");
        assert!(health_latency < Duration::from_millis(50), "{:?}", health_latency);
        assert!(!slow.is_finished());

        let (status, body, slow_latency) = slow.await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, "slow response");
        assert!(slow_latency >= Duration::from_millis(800));

        drop(client);
        shutdown.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let log = std::fs::read_to_string(state.logger.path()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines[0], format!("App started on port {}", addr.port()));
        assert!(lines.contains(&"Slow endpoint responded"));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("127.0.0.1 - - [") && l.contains(r#""GET /slow HTTP/1.1" 200 13"#)));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let dir = tempfile::tempdir().unwrap();

        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port,
            log_dir: dir.path().to_path_buf(),
        };
        let result = run(config).await;
        assert!(matches!(result, Err(AppError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_unwritable_log_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_dir: blocker,
        };
        let result = run(config).await;
        assert!(matches!(result, Err(AppError::LogDir { .. })));
    }
}
