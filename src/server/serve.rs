// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

/// Accept loop for the watchdog listener
///
/// Returns once `shutdown` completes. Connections already being served keep
/// running on their own tasks.
pub async fn run<S>(listener: TcpListener, state: Arc<config::AppState>, shutdown: S)
where
    S: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_info("Listener closed, no longer accepting connections");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppState, Config};
    use crate::function::{EchoFunction, Function, FunctionError, Params};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    struct Stalls;

    #[async_trait]
    impl Function for Stalls {
        fn name(&self) -> &str {
            "stalls"
        }

        async fn call(&self, _params: Params) -> Result<Value, FunctionError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Value::Null)
        }
    }

    async fn roundtrip(addr: std::net::SocketAddr, body: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_requests_until_shutdown() {
        let mut config = Config::load_from("/nonexistent/watchdog-test-config", None).unwrap();
        config.logging.access_log = false;
        let state = Arc::new(AppState::new(config, Arc::new(EchoFunction)));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, state, async move {
            let _ = stop_rx.await;
        }));

        let response = roundtrip(addr, "not valid json").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.contains(r#"{"error":"#), "{response}");

        // A bad request does not take the server down
        let response = roundtrip(addr, r#"{"x":1}"#).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.ends_with(r#"{"x":1}"#), "{response}");

        stop_tx.send(()).unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_function_answers_before_connection_deadline() {
        let mut config = Config::load_from("/nonexistent/watchdog-test-config", None).unwrap();
        config.logging.access_log = false;
        config.performance.read_timeout = 2;
        config.performance.write_timeout = 2;
        let state = Arc::new(AppState::new(config, Arc::new(Stalls)));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, state, async move {
            let _ = stop_rx.await;
        }));

        let response = roundtrip(addr, "{}").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(
            response.ends_with(r#"{"error":"function timed out after 1.5s"}"#),
            "{response}"
        );

        stop_tx.send(()).unwrap();
        server.await.unwrap();
    }
}
