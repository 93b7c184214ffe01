//! Adapter tests against a local mock of the chat backend's REST API.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use caretalk_stream::{Config, MembershipOutcome, StreamClient, StreamError};
use caretalk_types::Platform;

fn client_for(server: &MockServer) -> StreamClient {
    let config = Config::new("key", "secret")
        .with_base_url(Url::parse(&server.uri()).unwrap());
    StreamClient::new(config).unwrap()
}

fn channel_json(id: &str) -> serde_json::Value {
    json!({
        "channel": {
            "id": id,
            "type": "messaging",
            "cid": format!("messaging:{id}"),
        },
        "members": [],
    })
}

#[tokio::test]
async fn ensure_user_returns_existing_without_creating() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("api_key", "key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "id": "u1", "name": "Alice", "role": "user" }],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.ensure_user("u1", "Alice").await.unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.name, "Alice");
}

#[tokio::test]
async fn ensure_user_creates_exactly_once_when_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_partial_json(json!({
            "users": { "u2": { "id": "u2", "name": "Bob", "role": "user" } },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.ensure_user("u2", "Bob").await.unwrap();
    assert_eq!(user.id, "u2");
    // A freshly created user carries a client-side auth token.
    assert!(user.token.is_some());
}

#[tokio::test]
async fn ensure_channel_reuses_existing_and_adds_missing_members() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "channel": {
                "id": "user-u1-weight-loss",
                "type": "messaging",
                "cid": "messaging:user-u1-weight-loss",
            },
            "members": [{ "user_id": "doctor_main" }],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss"))
        .and(body_partial_json(json!({ "add_members": ["u1"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let members = vec!["doctor_main".to_string(), "u1".to_string()];
    let ensured = client
        .ensure_channel("user-u1-weight-loss", "Weight Loss Alice", "doctor_main", &members)
        .await
        .unwrap();
    assert_eq!(ensured.membership, MembershipOutcome::Added(vec!["u1".to_string()]));
}

#[tokio::test]
async fn ensure_channel_skips_member_update_when_all_present() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "channel": {
                "id": "user-u1-weight-loss",
                "type": "messaging",
                "cid": "messaging:user-u1-weight-loss",
            },
            "members": [{ "user_id": "doctor_main" }, { "user_id": "u1" }],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let members = vec!["doctor_main".to_string(), "u1".to_string()];
    let ensured = client
        .ensure_channel("user-u1-weight-loss", "Weight Loss Alice", "doctor_main", &members)
        .await
        .unwrap();
    assert_eq!(ensured.membership, MembershipOutcome::AlreadyComplete);
}

#[tokio::test]
async fn ensure_channel_tolerates_member_add_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(channel_json("user-u1-weight-loss")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": 0,
            "message": "internal error",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let members = vec!["doctor_main".to_string(), "u1".to_string()];
    let ensured = client
        .ensure_channel("user-u1-weight-loss", "Weight Loss Alice", "doctor_main", &members)
        .await
        .unwrap();
    assert!(matches!(ensured.membership, MembershipOutcome::Warning(_)));
}

#[tokio::test]
async fn ensure_channel_creates_when_backend_reports_missing() {
    let server = MockServer::start().await;

    // The creation call carries channel data; the read-only probe does not.
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .and(body_partial_json(json!({
            "data": { "created_by_id": "doctor_main", "members": ["doctor_main", "u1"] },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "channel": {
                "id": "user-u1-weight-loss",
                "type": "messaging",
                "cid": "messaging:user-u1-weight-loss",
                "name": "Weight Loss Alice",
            },
            "members": [{ "user_id": "doctor_main" }, { "user_id": "u1" }],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 16,
            "message": "channel does not exist",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let members = vec!["doctor_main".to_string(), "u1".to_string()];
    let ensured = client
        .ensure_channel("user-u1-weight-loss", "Weight Loss Alice", "doctor_main", &members)
        .await
        .unwrap();
    assert_eq!(ensured.membership, MembershipOutcome::Created);
    assert_eq!(ensured.state.channel.id, "user-u1-weight-loss");
}

#[tokio::test]
async fn ensure_channel_escalates_non_not_found_query_failures() {
    let server = MockServer::start().await;

    // One call only: a failed probe must not be followed by a create.
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": 0,
            "message": "internal error",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let members = vec!["doctor_main".to_string()];
    let err = client
        .ensure_channel("user-u1-weight-loss", "Weight Loss Alice", "doctor_main", &members)
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::Api { status: 500, .. }));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn post_message_creates_missing_channel_before_sending() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .and(body_partial_json(json!({ "data": { "created_by_id": "doctor_main" } })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(channel_json("user-u1-weight-loss")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/query"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 16,
            "message": "channel does not exist",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/messaging/user-u1-weight-loss/message"))
        .and(body_partial_json(json!({
            "message": {
                "text": "hello",
                "user": { "id": "doctor_main", "name": "Doctor Sami" },
            },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": {
                "id": "m1",
                "text": "hello",
                "user": { "id": "doctor_main", "name": "Doctor Sami" },
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let message = client
        .post_message("user-u1-weight-loss", "doctor_main", "Doctor Sami", "hello")
        .await
        .unwrap();
    assert_eq!(message.id, "m1");
    assert_eq!(message.text, "hello");
}

#[tokio::test]
async fn register_device_maps_android_to_firebase() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/devices"))
        .and(body_partial_json(json!({
            "id": "dev123",
            "push_provider": "firebase",
            "user_id": "u2",
            "push_provider_name": "Caretalk-Client-Android",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.register_device("u2", "dev123", Platform::Android).await.unwrap();
}

#[tokio::test]
async fn register_device_with_empty_id_issues_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.register_device("u2", "", Platform::Ios).await.unwrap();
}

#[tokio::test]
async fn delete_all_channels_sweeps_two_pages() {
    let server = MockServer::start().await;

    let page = |ids: std::ops::Range<u32>| {
        json!({
            "channels": ids
                .map(|i| json!({
                    "channel": {
                        "id": format!("c{i}"),
                        "type": "messaging",
                        "cid": format!("messaging:c{i}"),
                    },
                }))
                .collect::<Vec<_>>(),
        })
    };

    // 45 channels, page size 30: a full page, then a short one. The short
    // page ends the sweep without a third query.
    Mock::given(method("POST"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0..30)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(30..45)))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/channels/messaging/c\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(45)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let deleted = client.delete_all_channels().await.unwrap();
    assert_eq!(deleted, 45);
}
