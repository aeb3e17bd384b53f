//! End-to-end tests: the real server on a TCP port, a mock upstream behind it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mapgate::config::EnvVarConfig;
use mapgate::{IngressState, env_vars, server};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestServer {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
    data: TempDir,
}

impl TestServer {
    async fn start(env: &[(&str, &str)]) -> Self {
        let data = TempDir::new().unwrap();
        std::fs::write(data.path().join("layers.json"), r#"{"layers":["roads"]}"#).unwrap();

        let mut vars: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.insert(
            env_vars::DATA_DIR.to_string(),
            data.path().display().to_string(),
        );
        let config = EnvVarConfig::from_lookup(move |key| {
            vars.get(key).cloned().ok_or(std::env::VarError::NotPresent)
        });
        let state = Arc::new(IngressState::from_config(&config, config.data_dir()).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::serve(listener, state, async {
            let _ = rx.await;
        }));

        Self {
            addr,
            stop: Some(tx),
            handle,
            data,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn data_file(&self, name: &str) -> std::path::PathBuf {
        self.data.path().join(name)
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

// ===========================================
// Proxy path
// ===========================================

#[tokio::test]
async fn test_proxy_end_to_end() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/SG/rest/services/tiles"))
        .and(query_param("z", "3"))
        .and(header("x-access-token", "integration-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("tile-bytes", "application/octet-stream"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let server = TestServer::start(&[
        (env_vars::UPSTREAM_URL, upstream.uri().as_str()),
        (env_vars::PROXY_ALLOWED_HOSTS, "127.0.0.1"),
        (env_vars::UPSTREAM_ACCESS_TOKEN, "integration-token"),
    ])
    .await;

    let response = client()
        .get(server.url("/sgs-proxy/rest/services/tiles?z=3"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/octet-stream");
    assert_eq!(response.text().await.unwrap(), "tile-bytes");

    server.shutdown().await;
}

#[tokio::test]
async fn test_rate_limit_end_to_end() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(4)
        .mount(&upstream)
        .await;

    let server = TestServer::start(&[
        (env_vars::UPSTREAM_URL, upstream.uri().as_str()),
        (env_vars::PROXY_ALLOWED_HOSTS, "127.0.0.1"),
        (env_vars::RATE_LIMIT_REQUESTS, "3"),
        (env_vars::RATE_LIMIT_WINDOW_SECS, "60"),
    ])
    .await;

    let client = client();
    for _ in 0..3 {
        let response = client.get(server.url("/sgs-proxy/a")).send().await.unwrap();
        assert_eq!(response.status(), 200);
    }

    let denied = client.get(server.url("/sgs-proxy/a")).send().await.unwrap();
    assert_eq!(denied.status(), 429);
    let body: serde_json::Value = denied.json().await.unwrap();
    assert_eq!(body["detail"], "rate limited");

    // A different forwarded client still has its quota
    let other = client
        .get(server.url("/sgs-proxy/a"))
        .header("x-forwarded-for", "198.51.100.23")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), 200);

    server.shutdown().await;
}

#[tokio::test]
async fn test_default_whitelist_refuses_other_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    // Whitelist left at its default, which does not include 127.0.0.1
    let server = TestServer::start(&[(env_vars::UPSTREAM_URL, upstream.uri().as_str())]).await;

    let response = client().get(server.url("/sgs-proxy/x")).send().await.unwrap();
    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "host not allowed: 127.0.0.1");

    server.shutdown().await;
}

#[tokio::test]
async fn test_upstream_timeout_end_to_end() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&upstream)
        .await;

    let server = TestServer::start(&[
        (env_vars::UPSTREAM_URL, upstream.uri().as_str()),
        (env_vars::PROXY_ALLOWED_HOSTS, "127.0.0.1"),
        (env_vars::PROXY_TIMEOUT_SECS, "1"),
    ])
    .await;

    let response = client().get(server.url("/sgs-proxy/slow")).send().await.unwrap();
    assert_eq!(response.status(), 502);

    server.shutdown().await;
}

#[tokio::test]
async fn test_post_body_relayed() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/SG/query"))
        .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = TestServer::start(&[
        (env_vars::UPSTREAM_URL, upstream.uri().as_str()),
        (env_vars::PROXY_ALLOWED_HOSTS, "127.0.0.1"),
    ])
    .await;

    let response = client()
        .post(server.url("/sgs-proxy/query"))
        .body(r#"{"where":"1=1"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received[0].body, br#"{"where":"1=1"}"#.to_vec());

    server.shutdown().await;
}

// ===========================================
// Health and data routes
// ===========================================

#[tokio::test]
async fn test_health_end_to_end() {
    let server = TestServer::start(&[]).await;

    let response = client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["upstream"], "http://124.17.4.220:24088/SG");
    assert_eq!(body["proxy_endpoint"], "/sgs-proxy/");

    server.shutdown().await;
}

#[tokio::test]
async fn test_data_routes_end_to_end() {
    let server = TestServer::start(&[]).await;
    let client = client();

    let response = client.get(server.url("/data/layers.json")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"layers": ["roads"]}));

    std::fs::write(server.data_file("layers.json"), r#"{"layers":[]}"#).unwrap();
    let body: serde_json::Value = client
        .get(server.url("/data/layers.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({"layers": []}));

    let cleared = client.delete(server.url("/data")).send().await.unwrap();
    assert_eq!(cleared.status(), 204);

    let missing = client.get(server.url("/data/nope.json")).send().await.unwrap();
    assert_eq!(missing.status(), 404);

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_route_end_to_end() {
    let server = TestServer::start(&[]).await;

    let response = client().get(server.url("/admin")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.headers()["content-type"], "application/json");

    server.shutdown().await;
}
