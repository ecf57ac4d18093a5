use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use server::ratelimit::FixedWindowLimiter;
use server::routes::{self, AppState};
use service::memory::MemoryUserStore;
use service::store::UserStore;

const RATE_LIMIT_MESSAGE: &str =
    "Too many requests from this IP, please try again after 5 minutes";

struct TestApp {
    base_url: String,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Boot the real router on an ephemeral port. Rate-limit parameters are
/// injected per test so quota tests stay fast.
async fn start_server(max_requests: u32, window: Duration) -> anyhow::Result<TestApp> {
    let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let limiter = Arc::new(FixedWindowLimiter::new(max_requests, window));
    let state = AppState { store, limiter };

    let app: Router = routes::build_router(state, CorsLayer::very_permissive());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url })
}

/// Generous quota so CRUD tests never trip the limiter.
async fn start_default_server() -> anyhow::Result<TestApp> {
    start_server(100, Duration::from_secs(300)).await
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn health_reports_up() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let res = client().get(app.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body, json!({"message": "UP"}));
    Ok(())
}

#[tokio::test]
async fn crud_lifecycle_matches_contract() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let c = client();

    // POST {"name":"Alice"} -> 201 {"id":1,"name":"Alice"}
    let res = c
        .post(app.url("/v1/users"))
        .json(&json!({"name": "Alice"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<serde_json::Value>().await?;
    assert_eq!(created, json!({"id": 1, "name": "Alice"}));

    // GET /v1/users/1 -> same record
    let res = c.get(app.url("/v1/users/1")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<serde_json::Value>().await?, created);

    // DELETE -> 204 empty
    let res = c.delete(app.url("/v1/users/1")).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.bytes().await?.is_empty());

    // GET after delete -> 404
    let res = c.get(app.url("/v1/users/1")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body, json!({"message": "User not found"}));
    Ok(())
}

#[tokio::test]
async fn list_returns_records_in_creation_order() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let c = client();

    for name in ["Alice", "Bob", "Carol"] {
        let res = c
            .post(app.url("/v1/users"))
            .json(&json!({"name": name}))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = c.get(app.url("/v1/users")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let users = res.json::<Vec<serde_json::Value>>().await?;
    assert_eq!(users.len(), 3);
    assert_eq!(users[0]["id"], 1);
    assert_eq!(users[1]["id"], 2);
    assert_eq!(users[2]["id"], 3);
    assert_eq!(users[2]["name"], "Carol");
    Ok(())
}

#[tokio::test]
async fn ids_keep_increasing_after_delete() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let c = client();

    let first = c
        .post(app.url("/v1/users"))
        .json(&json!({"name": "a"}))
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;
    assert_eq!(first["id"], 1);

    let res = c.delete(app.url("/v1/users/1")).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let second = c
        .post(app.url("/v1/users"))
        .json(&json!({"name": "b"}))
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;
    assert_eq!(second["id"], 2);
    Ok(())
}

#[tokio::test]
async fn put_replaces_fields_and_keeps_path_id() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let c = client();

    let res = c
        .post(app.url("/v1/users"))
        .json(&json!({"name": "Alice", "age": 30}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    // replacement drops old fields; a body id is ignored
    let res = c
        .put(app.url("/v1/users/1"))
        .json(&json!({"id": 42, "city": "Oslo"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = res.json::<serde_json::Value>().await?;
    assert_eq!(updated, json!({"id": 1, "city": "Oslo"}));

    let res = c.get(app.url("/v1/users/1")).send().await?;
    assert_eq!(res.json::<serde_json::Value>().await?, updated);
    Ok(())
}

#[tokio::test]
async fn missing_ids_return_user_not_found() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let c = client();

    for res in [
        c.get(app.url("/v1/users/99")).send().await?,
        c.put(app.url("/v1/users/99")).json(&json!({"name": "x"})).send().await?,
        c.delete(app.url("/v1/users/99")).send().await?,
    ] {
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(body, json!({"message": "User not found"}));
    }
    Ok(())
}

#[tokio::test]
async fn non_numeric_ids_return_user_not_found() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let c = client();

    for res in [
        c.get(app.url("/v1/users/abc")).send().await?,
        c.put(app.url("/v1/users/abc")).json(&json!({"name": "x"})).send().await?,
        c.delete(app.url("/v1/users/abc")).send().await?,
        // out of range for a u64 behaves the same as unparsable
        c.get(app.url("/v1/users/-1")).send().await?,
    ] {
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(body, json!({"message": "User not found"}));
    }
    Ok(())
}

#[tokio::test]
async fn non_object_bodies_are_accepted() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let c = client();

    // arrays spread into index-keyed fields
    let res = c
        .post(app.url("/v1/users"))
        .json(&json!([1, 2, 3]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<serde_json::Value>().await?;
    assert_eq!(created, json!({"id": 1, "0": 1, "1": 2, "2": 3}));

    // scalars store as a bare record
    let res = c.post(app.url("/v1/users")).json(&json!(42)).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.json::<serde_json::Value>().await?, json!({"id": 2}));

    // PUT takes any shape too
    let res = c
        .put(app.url("/v1/users/1"))
        .json(&json!("hi"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.json::<serde_json::Value>().await?,
        json!({"id": 1, "0": "h", "1": "i"})
    );
    Ok(())
}

#[tokio::test]
async fn unmatched_routes_fall_back_to_404() -> anyhow::Result<()> {
    let app = start_default_server().await?;
    let res = client().get(app.url("/nope/nothing/here")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body, json!({"message": "Not Found"}));
    Ok(())
}

#[tokio::test]
async fn quota_applies_to_every_route_and_resets() -> anyhow::Result<()> {
    let app = start_server(3, Duration::from_millis(300)).await?;
    let c = client();

    // quota is shared across routes, health included
    assert_eq!(c.get(app.url("/health")).send().await?.status(), StatusCode::OK);
    assert_eq!(c.get(app.url("/v1/users")).send().await?.status(), StatusCode::OK);
    assert_eq!(c.get(app.url("/nope")).send().await?.status(), StatusCode::NOT_FOUND);

    let res = c.get(app.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body, json!({"message": RATE_LIMIT_MESSAGE}));

    // after the window elapses the client is admitted again
    tokio::time::sleep(Duration::from_millis(350)).await;
    let res = c.get(app.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
