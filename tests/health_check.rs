// ABOUTME: Integration tests for health verification.
// ABOUTME: Runs the HTTP probe against a local listener and the polling policy against a fake.

mod support;

use rollout::config::{HealthConfig, VerifyPolicy};
use rollout::deploy::CancelToken;
use rollout::health::*;
use std::time::{Duration, Instant};
use support::fakes::{Call, CallLog, FakeProbe};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve one connection with `status`, reporting the request head.
async fn serve_once(status: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
        let response = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    (addr.to_string(), rx)
}

fn once(timeout: Duration) -> HealthConfig {
    HealthConfig {
        path: "/health".to_string(),
        timeout,
        policy: VerifyPolicy::Once,
    }
}

mod http_probe {
    use super::*;

    #[tokio::test]
    async fn healthy_endpoint() {
        let (endpoint, head) = serve_once("200 OK").await;

        let report = verify(
            &HttpProbe::new(),
            Some(&endpoint),
            &once(Duration::from_secs(5)),
            &CancelToken::never(),
        )
        .await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.http_status, Some(200));
        assert_eq!(report.attempts, 1);
        assert_eq!(report.url.as_deref(), Some(format!("http://{endpoint}/health").as_str()));

        let head = head.await.unwrap();
        assert!(head.starts_with("GET /health HTTP/1.1\r\n"), "{head}");
        assert!(head.to_ascii_lowercase().contains(&format!("host: {endpoint}")));
    }

    #[tokio::test]
    async fn server_error_is_unhealthy() {
        let (endpoint, _head) = serve_once("503 Service Unavailable").await;

        let report = verify(
            &HttpProbe::new(),
            Some(&endpoint),
            &once(Duration::from_secs(5)),
            &CancelToken::never(),
        )
        .await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.http_status, Some(503));
        assert_eq!(report.detail.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn refused_connection_is_unhealthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);

        let report = verify(
            &HttpProbe::new(),
            Some(&endpoint),
            &once(Duration::from_secs(5)),
            &CancelToken::never(),
        )
        .await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.http_status.is_none());
        assert!(report.detail.unwrap().contains("connection failed"));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let _hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let started = Instant::now();
        let report = verify(
            &HttpProbe::new(),
            Some(&endpoint),
            &once(Duration::from_millis(200)),
            &CancelToken::never(),
        )
        .await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.detail.unwrap().contains("no response within"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn https_endpoint_is_not_probed() {
        let report = verify(
            &HttpProbe::new(),
            Some("https://agent.example.com"),
            &once(Duration::from_secs(1)),
            &CancelToken::never(),
        )
        .await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.attempts, 0);
        assert!(report.detail.unwrap().contains("unsupported scheme"));
    }
}

mod policy {
    use super::*;

    fn poll(deadline: Duration) -> HealthConfig {
        HealthConfig {
            path: "/health".to_string(),
            timeout: Duration::from_millis(100),
            policy: VerifyPolicy::Poll {
                interval: Duration::from_millis(10),
                max_interval: Duration::from_millis(20),
                deadline,
            },
        }
    }

    #[tokio::test]
    async fn missing_endpoint_is_unknown_without_requests() {
        let log = CallLog::default();
        let probe = FakeProbe::status(&log, 200);

        let never = CancelToken::never();
        let report = verify(&probe, None, &once(Duration::from_secs(1)), &never).await;

        assert_eq!(report.status, HealthStatus::Unknown);
        assert_eq!(report.detail.as_deref(), Some("no public endpoint"));
        assert!(log.calls().is_empty());

        let report = verify(&probe, None, &poll(Duration::from_secs(1)), &never).await;
        assert_eq!(report.status, HealthStatus::Unknown);
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn once_issues_exactly_one_request() {
        let log = CallLog::default();
        let probe = FakeProbe::status(&log, 502);

        let never = CancelToken::never();
        let report = verify(&probe, Some("alb.example.com"), &once(Duration::from_secs(1)), &never).await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(
            log.calls(),
            vec![Call::Probe("http://alb.example.com/health".to_string())]
        );
    }

    #[tokio::test]
    async fn poll_stops_at_first_healthy_response() {
        let log = CallLog::default();
        let probe = FakeProbe::sequence(
            &log,
            vec![
                Err(ProbeError::Connect("connection refused".to_string())),
                Ok(503),
            ],
            Ok(200),
        );

        let never = CancelToken::never();
        let report = verify(&probe, Some("alb.example.com"), &poll(Duration::from_secs(5)), &never).await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.attempts, 3);
        assert_eq!(log.calls().len(), 3);
    }

    #[tokio::test]
    async fn poll_gives_up_at_deadline() {
        let log = CallLog::default();
        let probe = FakeProbe::status(&log, 503);

        let started = Instant::now();
        let never = CancelToken::never();
        let report = verify(&probe, Some("alb.example.com"), &poll(Duration::from_millis(80)), &never).await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.attempts >= 2);
        assert_eq!(report.attempts as usize, log.calls().len());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancel_stops_polling_before_deadline() {
        let log = CallLog::default();
        let probe = FakeProbe::status(&log, 503);
        let (handle, token) = CancelToken::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let started = Instant::now();
        let report = verify(&probe, Some("alb.example.com"), &poll(Duration::from_secs(300)), &token).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.attempts >= 1);
        assert_eq!(report.attempts as usize, log.calls().len());
    }

    #[tokio::test]
    async fn cancelled_token_still_probes_once() {
        let log = CallLog::default();
        let probe = FakeProbe::status(&log, 503);
        let (handle, token) = CancelToken::new();
        handle.cancel();

        let report = verify(&probe, Some("alb.example.com"), &poll(Duration::from_secs(300)), &token).await;

        assert_eq!(report.attempts, 1);
        assert_eq!(log.calls().len(), 1);
    }

    #[tokio::test]
    async fn verify_once_uses_the_given_path() {
        let log = CallLog::default();
        let probe = FakeProbe::status(&log, 204);

        let report = verify_once(&probe, Some("alb.example.com/"), "healthz", Duration::from_secs(1)).await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(
            log.calls(),
            vec![Call::Probe("http://alb.example.com/healthz".to_string())]
        );
    }
}
