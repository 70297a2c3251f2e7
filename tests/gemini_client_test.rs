use fieldcrm::llm::{GeminiClient, ImageAnalyzer, ImageSource, WHATSAPP_PHOTO_PROMPT};
use fieldcrm::shared::error::CrmError;

fn inline(data: &str) -> ImageSource {
    ImageSource::Inline {
        data: data.to_string(),
        mime_type: "image/jpeg".to_string(),
    }
}

#[tokio::test]
async fn analyze_sends_prompt_and_inline_image() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock(
            "POST",
            "/models/gemini-1.5-flash:generateContent?key=test-key",
        )
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "contents": [{ "parts": [
                { "text": WHATSAPP_PHOTO_PROMPT },
                { "inline_data": { "mime_type": "image/jpeg", "data": "QUJD" } }
            ] }]
        })))
        .with_status(200)
        .with_body(
            r#"{"candidates":[{"content":{"parts":[{"text":"Duvara klima monte edilmiş."}]}}]}"#,
        )
        .create_async()
        .await;

    let client = GeminiClient::new(Some("test-key".to_string())).with_base_url(&server.url());
    let analysis = client
        .analyze(&[inline("QUJD")], WHATSAPP_PHOTO_PROMPT)
        .await
        .unwrap();

    assert_eq!(analysis, "Duvara klima monte edilmiş.");
    mock.assert_async().await;
}

#[tokio::test]
async fn analyze_without_api_key_is_a_configuration_error() {
    let client = GeminiClient::new(None);
    let err = client
        .analyze(&[inline("QUJD")], "prompt")
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Configuration("GEMINI_API_KEY")));
}

#[tokio::test]
async fn unsafe_urls_are_rejected_before_any_fetch() {
    let mut server = mockito::Server::new_async().await;
    let model_mock = server
        .mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = GeminiClient::new(Some("test-key".to_string())).with_base_url(&server.url());
    for bad in [
        "http://localhost/x.jpg",
        "http://127.0.0.1/x.jpg",
        "http://192.168.1.10/x.jpg",
        "http://10.1.2.3/x.jpg",
    ] {
        let err = client
            .analyze(&[ImageSource::Url(bad.to_string())], "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)), "{} not rejected", bad);
    }

    model_mock.assert_async().await;
}

#[tokio::test]
async fn model_failures_surface_as_remote_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock(
            "POST",
            "/models/gemini-1.5-flash:generateContent?key=test-key",
        )
        .with_status(500)
        .with_body(r#"{"error":{"message":"internal"}}"#)
        .create_async()
        .await;

    let client = GeminiClient::new(Some("test-key".to_string())).with_base_url(&server.url());
    let err = client
        .analyze(&[inline("QUJD")], "prompt")
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Remote(_)));
}
