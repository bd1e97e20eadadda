use ketoan_server::handlers::LOGGED_OUT_MESSAGE;
use ketoan_server::middleware::LOGIN_REQUIRED_MESSAGE;
use ketoan_server::pages::PROTECTED_PAGES;
use ketoan_server::{AppConfig, ServerBuilder, build_app};
use reqwest::{Client, Response, StatusCode, header};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

const COOKIE: &str = "ketoan_session";

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&AppConfig::default()).expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

fn client() -> Client {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// `name=value` of the session cookie set by the response, if any.
fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{COOKIE}=")))
        .map(str::to_string)
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn log_in(client: &Client, base: &str) -> String {
    let resp = client
        .post(format!("{base}/set-session"))
        .json(&json!({"user_id": 12, "username": "thu.nguyen"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp).expect("session cookie set");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    cookie
}

#[tokio::test]
async fn health_endpoints_work() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = client();

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "ready"}));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login_with_a_flash() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = client();

    for page in PROTECTED_PAGES.iter() {
        let resp = client
            .get(format!("{base}{}", page.path()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", page.path());
        assert_eq!(location(&resp), "/login");
    }

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    let cookie = session_cookie(&resp).expect("flash needs a session");

    // The flash shows up once on the login page...
    let resp = client
        .get(format!("{base}/login"))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains(LOGIN_REQUIRED_MESSAGE));
    assert!(html.contains("login-form"));

    // ...and is gone afterwards.
    let resp = client
        .get(format!("{base}/login"))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    let html = resp.text().await.unwrap();
    assert!(!html.contains(LOGIN_REQUIRED_MESSAGE));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn established_session_renders_pages() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = client();
    let cookie = log_in(&client, &base).await;

    let resp = client
        .get(format!("{base}/products"))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let html = resp.text().await.unwrap();
    assert!(html.contains("Quản lý sản phẩm"));
    assert!(html.contains("thu.nguyen"));
    assert!(html.contains("data-backend-url"));

    for page in PROTECTED_PAGES.iter() {
        let resp = client
            .get(format!("{base}{}", page.path()))
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", page.path());
    }

    // Root goes to the general diary
    let resp = client
        .get(format!("{base}/"))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/general-diary");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn login_page_accepts_post() {
    let (base, shutdown_tx, handle) = start_server().await;
    let resp = client()
        .post(format!("{base}/login"))
        .form(&[("username", "a"), ("password", "b")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("login-form"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn logout_clears_session_and_flashes_success() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = client();
    let old_cookie = log_in(&client, &base).await;

    let resp = client
        .get(format!("{base}/logout"))
        .header(header::COOKIE, &old_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    let flash_cookie = session_cookie(&resp).expect("flash session cookie");
    assert_ne!(flash_cookie, old_cookie);

    let html = client
        .get(format!("{base}/login"))
        .header(header::COOKIE, &flash_cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(LOGGED_OUT_MESSAGE));

    // The pre-logout session no longer grants access
    let resp = client
        .get(format!("{base}/orders"))
        .header(header::COOKIE, &old_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn set_session_rejects_bad_payloads() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = client();

    let resp = client
        .post(format!("{base}/set-session"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(session_cookie(&resp).is_none());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    let resp = client
        .post(format!("{base}/set-session"))
        .json(&json!({"username": "nobody"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "user_id is required");

    let resp = client
        .post(format!("{base}/set-session"))
        .body(r#"{"user_id": 1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "content type is required");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn static_assets_and_request_ids() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = client();

    let resp = client
        .get(format!("{base}/static/css/app.css"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-request-id"], "req-123");
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );

    let resp = client
        .get(format!("{base}/static/nope.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key("x-request-id"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

/// Full `Set-Cookie` header for the session cookie, attributes included.
fn session_set_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{COOKIE}=")))
        .map(str::to_string)
}

#[tokio::test]
async fn unusable_session_cookies_are_treated_as_anonymous() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = client();

    // Malformed and unknown (expired or purged) ids
    let stale = [
        format!("{COOKIE}=not-a-session-id"),
        format!("{COOKIE}=6f1c2b1e-3d4a-4c5b-8e9f-0a1b2c3d4e5f"),
    ];

    for cookie in &stale {
        // Protected pages still redirect, with a fresh session for the flash
        let resp = client
            .get(format!("{base}/orders"))
            .header(header::COOKIE, cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{cookie}");
        assert_eq!(location(&resp), "/login");
        let replaced = session_cookie(&resp).expect("new session cookie");
        assert_ne!(&replaced, cookie);

        // A page that stores nothing expires the stale cookie
        let resp = client
            .get(format!("{base}/login"))
            .header(header::COOKIE, cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let removal = session_set_cookie(&resp).expect("stale cookie is expired");
        assert!(removal.starts_with(&format!("{COOKIE}=;")), "{removal}");
        assert!(removal.contains("Max-Age=0"), "{removal}");
    }

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn binding_a_taken_port_fails_before_serving() {
    let taken = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = taken.local_addr().unwrap();

    let server = ServerBuilder::new().with_addr(addr).build().expect("build");
    let err = server.bind().await.err().expect("port already in use");
    assert!(err.to_string().contains(&addr.to_string()));
}
