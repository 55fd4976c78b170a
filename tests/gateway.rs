use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::sync::Arc;
use warden::api;
use warden::application_impl::hash_password;
use warden::domain_model::{IdentityOptions, StorageKind};
use warden::server::Server;
use warden::settings::*;
use warp::Filter;
use warp::http::StatusCode;

fn settings(address: &str, gateway: Gateway) -> Settings {
    Settings {
        log: Log {
            filter: "info".into(),
        },
        http: Http {
            address: address.into(),
            cert_path: None,
            key_path: None,
        },
        gateway,
        storage: Storage {
            backend: "fake".into(),
            kind: StorageKind::Local,
            default_expiration_secs: 3600,
            redis_url: None,
            prefix: "warden".into(),
        },
        identity: IdentityOptions::default(),
        issuer: Issuer {
            secret: "gateway-tests".into(),
            ttl_secs: 600,
            roles: Vec::new(),
        },
    }
}

fn fake_gateway() -> Gateway {
    Gateway {
        backend: "fake".into(),
        realm: "warden".into(),
        challenge: false,
        exempt_paths: Vec::new(),
        users: HashMap::new(),
    }
}

fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

async fn api(
    settings: Settings,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    let server = Arc::new(Server::try_new(&settings).await.unwrap());
    warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server))
        .recover(api::v1::recover_error)
}

#[tokio::test]
async fn anonymous_routes_need_no_credentials() {
    let api = api(settings("127.0.0.1:8081", fake_gateway())).await;

    let hello = warp::test::request().path("/api/v1/hello").reply(&api).await;
    assert_eq!(hello.status(), StatusCode::OK);
    assert_eq!(hello.body(), "Hello!");

    let health = warp::test::request().path("/api/v1/health").reply(&api).await;
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn valid_credentials_reach_the_handler() {
    let api = api(settings("127.0.0.1:8081", fake_gateway())).await;

    let response = warp::test::request()
        .path("/api/v1/hello/world")
        .header("authorization", basic("test", "t"))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "Hello world!");

    let me = warp::test::request()
        .path("/api/v1/me")
        .header("authorization", basic("test", "t"))
        .reply(&api)
        .await;
    let body: serde_json::Value = serde_json::from_slice(me.body()).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "test");
    assert_eq!(body["data"]["authentication_type"], "Basic");
}

#[tokio::test]
async fn failure_without_challenge_is_plain_401() {
    let api = api(settings("127.0.0.1:8081", fake_gateway())).await;

    let response = warp::test::request()
        .path("/api/v1/hello/world")
        .header("authorization", basic("test", "wrong"))
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.body(), "Challenge failed");
    assert!(response.headers().get("www-authenticate").is_none());
}

#[tokio::test]
async fn failure_on_challenge_port_asks_for_credentials() {
    let api = api(settings("127.0.0.1:8080", fake_gateway())).await;

    let response = warp::test::request().path("/api/v1/me").reply(&api).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("www-authenticate").unwrap(),
        "Basic realm=\"warden\""
    );
}

#[tokio::test]
async fn malformed_header_is_rejected() {
    let api = api(settings("127.0.0.1:8081", fake_gateway())).await;

    let response = warp::test::request()
        .path("/api/v1/me")
        .header("authorization", format!("Basic {}", STANDARD.encode("no-colon")))
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn argon2_user_table() {
    let gateway = Gateway {
        backend: "real".into(),
        realm: "ops".into(),
        challenge: true,
        exempt_paths: vec!["*/health".into()],
        users: HashMap::from([("ops".to_string(), hash_password("hunter2").unwrap())]),
    };
    let api = api(settings("127.0.0.1:9001", gateway)).await;

    let ok = warp::test::request()
        .path("/api/v1/me")
        .header("authorization", basic("ops", "hunter2"))
        .reply(&api)
        .await;
    assert_eq!(ok.status(), StatusCode::OK);

    let denied = warp::test::request()
        .path("/api/v1/me")
        .header("authorization", basic("ops", "hunter3"))
        .reply(&api)
        .await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        denied.headers().get("www-authenticate").unwrap(),
        "Basic realm=\"ops\""
    );
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let api = api(settings("127.0.0.1:8081", fake_gateway())).await;

    let response = warp::test::request().path("/api/v1/nope").reply(&api).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
