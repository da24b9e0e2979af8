use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use treats_api::auth::AppStateInner;
use treats_api::routes::router;
use treats_api::scheduler::Scheduler;
use treats_store::Store;

struct TestApp {
    router: Router,
    store: Arc<Store>,
}

fn app() -> TestApp {
    let store = Arc::new(Store::in_memory("http://localhost:3200/imgurl/default.jpg"));
    let (scheduler, _task) = Scheduler::start(store.clone());
    let state = Arc::new(AppStateInner {
        store: store.clone(),
        scheduler,
        jwt_secret: "test-secret".into(),
    });
    TestApp {
        router: router(state),
        store,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(&self, email: &str, first: &str, last: &str) -> (String, u64) {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "hunter22",
                    "nameFirst": first,
                    "nameLast": last,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["authUserId"].as_u64().unwrap(),
        )
    }

    async fn create_channel(&self, token: &str, name: &str) -> u64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/channels/create",
                Some(token),
                Some(json!({ "name": name, "isPublic": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["channelId"].as_u64().unwrap()
    }

    async fn bodies(&self, token: &str, channel_id: u64) -> Vec<String> {
        let (status, body) = self
            .call(
                Method::GET,
                &format!("/channel/messages?channelId={}&start=0", channel_id),
                Some(token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["message"].as_str().unwrap().to_string())
            .collect()
    }
}

#[tokio::test]
async fn register_login_logout_round_trip() {
    let app = app();
    let (token, user_id) = app.register("ada@example.com", "Ada", "Lovelace").await;

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/user/profile?uId={}", user_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["handleStr"], "adalovelace");

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authUserId"].as_u64(), Some(user_id));
    let second = body["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(Method::POST, "/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // the first session is gone, the second still works
    let (status, body) = app.call(Method::GET, "/users/all", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);
    let (status, _) = app.call(Method::GET, "/users/all", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rejects_bad_credentials() {
    let app = app();
    app.register("ada@example.com", "Ada", "Lovelace").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-one" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "alan@example.com",
                "password": "short",
                "nameFirst": "Alan",
                "nameLast": "Turing",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app();
    let (status, body) = app.call(Method::GET, "/channels/list", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);

    let (status, _) = app
        .call(Method::GET, "/channels/list", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn send_and_page_channel_messages() {
    let app = app();
    let (ada, _) = app.register("ada@example.com", "Ada", "Lovelace").await;
    let (alan, _) = app.register("alan@example.com", "Alan", "Turing").await;
    let channel = app.create_channel(&ada, "general").await;

    for text in ["one", "two"] {
        let (status, _) = app
            .call(
                Method::POST,
                "/message/send",
                Some(&ada),
                Some(json!({ "channelId": channel, "message": text })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(app.bodies(&ada, channel).await, vec!["two", "one"]);

    // not a member yet
    let (status, _) = app
        .call(
            Method::POST,
            "/message/send",
            Some(&alan),
            Some(json!({ "channelId": channel, "message": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // unknown channel
    let (status, body) = app
        .call(
            Method::POST,
            "/message/send",
            Some(&ada),
            Some(json!({ "channelId": 999, "message": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn mention_shows_up_in_notifications() {
    let app = app();
    let (ada, _) = app.register("ada@example.com", "Ada", "Lovelace").await;
    let (alan, _) = app.register("alan@example.com", "Alan", "Turing").await;
    let channel = app.create_channel(&ada, "general").await;
    let (status, _) = app
        .call(
            Method::POST,
            "/channel/join",
            Some(&alan),
            Some(json!({ "channelId": channel })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.call(
        Method::POST,
        "/message/send",
        Some(&ada),
        Some(json!({ "channelId": channel, "message": "@alanturing look" })),
    )
    .await;

    let (status, body) = app
        .call(Method::GET, "/notifications/get", Some(&alan), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["notifications"][0]["notificationMessage"],
        "adalovelace tagged you in general: @alanturing look"
    );
}

#[tokio::test(start_paused = true)]
async fn send_later_delivers_at_the_requested_time() {
    let app = app();
    let (ada, _) = app.register("ada@example.com", "Ada", "Lovelace").await;
    let channel = app.create_channel(&ada, "general").await;
    let time_sent = app.store.now() + 2;

    let (status, body) = app
        .call(
            Method::POST,
            "/message/sendlater",
            Some(&ada),
            Some(json!({ "channelId": channel, "message": "later", "timeSent": time_sent })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let message_id = body["messageId"].as_u64().unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    let (_, page) = app
        .call(
            Method::GET,
            &format!("/channel/messages?channelId={}&start=0", channel),
            Some(&ada),
            None,
        )
        .await;
    assert_eq!(page["messages"][0]["messageId"].as_u64(), Some(message_id));
    assert_eq!(page["messages"][0]["timeSent"].as_i64(), Some(time_sent));

    let (status, _) = app
        .call(
            Method::POST,
            "/message/sendlater",
            Some(&ada),
            Some(json!({
                "channelId": channel,
                "message": "too late",
                "timeSent": app.store.now() - 10,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn standup_over_http() {
    let app = app();
    let (ada, _) = app.register("ada@example.com", "Ada", "Lovelace").await;
    let channel = app.create_channel(&ada, "general").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/standup/start",
            Some(&ada),
            Some(json!({ "channelId": channel, "length": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let time_finish = body["timeFinish"].as_i64().unwrap();

    let (_, active) = app
        .call(
            Method::GET,
            &format!("/standup/active?channelId={}", channel),
            Some(&ada),
            None,
        )
        .await;
    assert_eq!(active["isActive"], true);
    assert_eq!(active["timeFinish"].as_i64(), Some(time_finish));

    let (status, _) = app
        .call(
            Method::POST,
            "/standup/send",
            Some(&ada),
            Some(json!({ "channelId": channel, "message": "shipped it" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.bodies(&ada, channel).await.is_empty());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(app.bodies(&ada, channel).await, vec!["Ada: shipped it"]);

    let (_, active) = app
        .call(
            Method::GET,
            &format!("/standup/active?channelId={}", channel),
            Some(&ada),
            None,
        )
        .await;
    assert_eq!(active["isActive"], false);
    assert_eq!(active["timeFinish"], Value::Null);
}

#[tokio::test]
async fn clear_resets_everything() {
    let app = app();
    let (ada, _) = app.register("ada@example.com", "Ada", "Lovelace").await;
    app.create_channel(&ada, "general").await;

    let (status, body) = app.call(Method::DELETE, "/clear", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    // sessions went with the users
    let (status, _) = app.call(Method::GET, "/channels/listall", Some(&ada), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (again, _) = app.register("ada@example.com", "Ada", "Lovelace").await;
    let (_, body) = app
        .call(Method::GET, "/channels/listall", Some(&again), None)
        .await;
    assert_eq!(body["channels"], json!([]));
}

#[tokio::test]
async fn malformed_input_is_a_json_bad_request() {
    let app = app();
    let (ada, _) = app.register("ada@example.com", "Ada", "Lovelace").await;
    let channel = app.create_channel(&ada, "general").await;

    let bad_requests = [
        (
            "/message/sendlater",
            json!({ "channelId": -1, "message": "hi", "timeSent": 0 }),
        ),
        ("/standup/start", json!({ "channelId": channel })),
        (
            "/admin/userpermission/change",
            json!({ "uId": 1, "permissionId": 300 }),
        ),
    ];
    for (uri, body) in bad_requests {
        let (status, response) = app.call(Method::POST, uri, Some(&ada), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response["status"], 400, "{uri}");
        assert!(response["error"].is_string(), "{uri}");
    }

    let (status, response) = app
        .call(Method::GET, "/channel/messages?channelId=abc", Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["status"], 400);
}
