//! Gift API client against a mock application server

use giftlist::{
    ApiError, ClientConfig, CredentialKey, GiftDraft, GiftUpdate, GiftsClient, LogNavigator,
    MemoryStore, NewGift, PreviewClient, PreviewConfig, TokenManager, TokenStore,
};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn gift_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "u1",
        "name": name,
        "link": "https://shop.example/p/1",
        "image": "https://shop.example/img/a.png",
        "created_at": "2025-11-02T10:00:00+00:00",
        "updated_at": "2025-11-02T10:00:00+00:00"
    })
}

async fn signed_in_client(server: &MockServer) -> GiftsClient {
    let store = Arc::new(MemoryStore::new());
    store.set(CredentialKey::AccessToken, "A1").unwrap();
    store.set(CredentialKey::RefreshToken, "R1").unwrap();
    store.set(CredentialKey::User, r#"{"id":"u1"}"#).unwrap();

    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    let tokens = TokenManager::new(config, store, Arc::new(LogNavigator)).unwrap();
    GiftsClient::new(tokens)
}

#[tokio::test]
async fn test_list_sends_bearer_and_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gifts"))
        .and(query_param("user_id", "u1"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([gift_json("g2", "Kettle"), gift_json("g1", "Lamp")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = signed_in_client(&server).await;

    let user_id = client.current_user_id().unwrap().unwrap();
    let gifts = client.list(&user_id).await.unwrap();

    assert_eq!(gifts.len(), 2);
    assert_eq!(gifts[0].name, "Kettle");
    server.verify().await;
}

#[tokio::test]
async fn test_create_posts_new_gift() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gifts"))
        .and(body_partial_json(json!({ "name": "Lamp", "user_id": "u1" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(gift_json("g1", "Lamp")))
        .expect(1)
        .mount(&server)
        .await;
    let client = signed_in_client(&server).await;

    let gift = client
        .create(&NewGift {
            name: "Lamp".to_string(),
            link: "https://shop.example/p/1".to_string(),
            image: "https://shop.example/img/a.png".to_string(),
            user_id: "u1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(gift.id, "g1");
    server.verify().await;
}

#[tokio::test]
async fn test_create_rejects_blank_fields_locally() {
    let server = MockServer::start().await;
    let client = signed_in_client(&server).await;

    let err = client
        .create(&NewGift {
            name: "Lamp".to_string(),
            link: "https://shop.example/p/1".to_string(),
            image: " ".to_string(),
            user_id: "u1".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput(msg) if msg == "image is required"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_sends_changed_fields_with_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/gifts/g1"))
        .and(body_partial_json(json!({ "name": "Brass Lamp" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gift_json("g1", "Brass Lamp")))
        .expect(1)
        .mount(&server)
        .await;
    let client = signed_in_client(&server).await;

    let gift = client
        .update(
            "g1",
            &GiftUpdate {
                name: Some("Brass Lamp".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(gift.name, "Brass Lamp");
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert!(body.get("updated_at").is_some());
    assert!(body.get("link").is_none());
}

#[tokio::test]
async fn test_delete_error_carries_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/gifts/g9"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "row not found" })))
        .mount(&server)
        .await;
    let client = signed_in_client(&server).await;

    let err = client.delete("g9").await.unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(message, "row not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_public_list_sends_no_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gifts/public/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gifts": [gift_json("g1", "Lamp")],
            "userName": "Ana"
        })))
        .mount(&server)
        .await;
    let client = signed_in_client(&server).await;

    let list = client.public_list("u1").await.unwrap();

    assert_eq!(list.user_name, "Ana");
    assert_eq!(list.gifts.len(), 1);
    let requests: Vec<Request> = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_update_encodes_space_in_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/gifts/a%20b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gift_json("a b", "Lamp")))
        .expect(1)
        .mount(&server)
        .await;
    let client = signed_in_client(&server).await;

    client
        .update(
            "a b",
            &GiftUpdate {
                name: Some("Lamp".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    server.verify().await;
}

async fn serve_page(server: &MockServer, route: &str, html: &str) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

fn previews() -> PreviewClient {
    PreviewClient::new(&PreviewConfig::default()).unwrap()
}

#[tokio::test]
async fn test_draft_fills_name_and_image_from_link() {
    let site = MockServer::start().await;
    let link = serve_page(
        &site,
        "/p/lamp",
        r#"<meta property="og:title" content="Desk Lamp"><meta property="og:image" content="/img/lamp.png">"#,
    )
    .await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gifts"))
        .and(body_partial_json(json!({
            "name": "Desk Lamp",
            "image": format!("{}/img/lamp.png", site.uri())
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(gift_json("g1", "Desk Lamp")))
        .expect(1)
        .mount(&server)
        .await;
    let client = signed_in_client(&server).await;

    let draft = GiftDraft {
        link: link.clone(),
        ..Default::default()
    };
    let gift = draft.complete(&previews(), "u1").await;

    assert_eq!(gift.name, "Desk Lamp");
    assert_eq!(gift.link, link);
    client.create(&gift).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_draft_keeps_entered_fields() {
    let site = MockServer::start().await;
    let link = serve_page(&site, "/p/lamp", r#"<meta property="og:title" content="Desk Lamp">"#).await;

    let draft = GiftDraft {
        name: Some("My lamp".to_string()),
        link,
        image: Some("https://cdn.example/mine.png".to_string()),
    };
    let gift = draft.complete(&previews(), "u1").await;

    assert_eq!(gift.name, "My lamp");
    assert_eq!(gift.image, "https://cdn.example/mine.png");
    assert!(site.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_untitled_page_does_not_fill_name() {
    let site = MockServer::start().await;
    let link = serve_page(
        &site,
        "/p/untitled",
        r#"<meta property="og:image" content="https://cdn.example/a.png">"#,
    )
    .await;
    let server = MockServer::start().await;
    let client = signed_in_client(&server).await;

    let gift = GiftDraft {
        link,
        ..Default::default()
    }
    .complete(&previews(), "u1")
    .await;

    assert_eq!(gift.name, "");
    assert_eq!(gift.image, "https://cdn.example/a.png");
    let err = client.create(&gift).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(msg) if msg == "name is required"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_preview_leaves_fields_blank() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;

    let gift = GiftDraft {
        name: Some("Lamp".to_string()),
        link: format!("{}/gone", site.uri()),
        image: None,
    }
    .complete(&previews(), "u1")
    .await;

    assert_eq!(gift.name, "Lamp");
    assert_eq!(gift.image, "");
}
