use fieldcrm::channels::whatsapp::WhatsAppClient;
use fieldcrm::config::WhatsAppConfig;

fn config(token: Option<&str>, phone_id: Option<&str>) -> WhatsAppConfig {
    WhatsAppConfig {
        api_token: token.map(str::to_string),
        phone_id: phone_id.map(str::to_string),
        verify_token: Some("verify".to_string()),
    }
}

#[tokio::test]
async fn send_text_posts_to_the_graph_api() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/555000/messages")
        .match_header("authorization", "Bearer token-1")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": "905551234567",
            "type": "text",
            "text": { "body": "Merhaba" }
        })))
        .with_status(200)
        .with_body(r#"{"messages":[{"id":"wamid.X"}]}"#)
        .create_async()
        .await;

    let client =
        WhatsAppClient::new(&config(Some("token-1"), Some("555000"))).with_base_url(&server.url());
    client.send_text("905551234567", "Merhaba").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn send_text_without_credentials_is_a_silent_no_op() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = WhatsAppClient::new(&config(None, None)).with_base_url(&server.url());
    // Degrades to a logged warning, not an error.
    client.send_text("905551234567", "Merhaba").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn send_text_surfaces_api_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/555000/messages")
        .with_status(400)
        .with_body(r#"{"error":{"message":"bad request"}}"#)
        .create_async()
        .await;

    let client =
        WhatsAppClient::new(&config(Some("token-1"), Some("555000"))).with_base_url(&server.url());
    let result = client.send_text("905551234567", "Merhaba").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn media_url_resolves_the_download_link() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/media-42")
        .match_header("authorization", "Bearer token-1")
        .with_status(200)
        .with_body(r#"{"url":"https://lookaside.example.com/media-42","mime_type":"image/jpeg"}"#)
        .create_async()
        .await;

    let client =
        WhatsAppClient::new(&config(Some("token-1"), Some("555000"))).with_base_url(&server.url());
    let url = client.media_url("media-42").await;
    assert_eq!(
        url.as_deref(),
        Some("https://lookaside.example.com/media-42")
    );
}

#[tokio::test]
async fn media_url_failures_collapse_to_none() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/media-42")
        .with_status(404)
        .with_body("{}")
        .create_async()
        .await;

    let client =
        WhatsAppClient::new(&config(Some("token-1"), Some("555000"))).with_base_url(&server.url());
    assert!(client.media_url("media-42").await.is_none());

    let no_token = WhatsAppClient::new(&config(None, None)).with_base_url(&server.url());
    assert!(no_token.media_url("media-42").await.is_none());
}

#[tokio::test]
async fn download_media_returns_the_bytes() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/blob.jpg")
        .match_header("authorization", "Bearer token-1")
        .with_status(200)
        .with_body(&[0xFF, 0xD8, 0xFF, 0xE0][..])
        .create_async()
        .await;

    let client =
        WhatsAppClient::new(&config(Some("token-1"), Some("555000"))).with_base_url(&server.url());
    let bytes = client
        .download_media(&format!("{}/blob.jpg", server.url()))
        .await
        .unwrap();
    assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
}
