use log::info;
use reqwest::Client;

use crate::config::StorageConfig;
use crate::shared::error::CrmError;

/// Thin client over the hosted object storage (Supabase Storage REST API).
///
/// Public URLs are derived by concatenation, not signing; the bucket must be
/// public-readable by policy.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    bucket: String,
    service_key: Option<String>,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CrmError> {
        let key = self
            .service_key
            .as_deref()
            .ok_or(CrmError::Configuration("SUPABASE_SERVICE_ROLE_KEY"))?;

        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Remote(format!(
                "storage upload failed ({}): {}",
                status, body
            )));
        }

        info!("uploaded {} to bucket {}", path, self.bucket);
        Ok(())
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    fn config(key: Option<&str>) -> StorageConfig {
        StorageConfig {
            base_url: "https://example.supabase.co".to_string(),
            bucket: "crm-media".to_string(),
            service_key: key.map(str::to_string),
        }
    }

    #[test]
    fn public_url_is_derived_by_concatenation() {
        let storage = StorageClient::new(&config(Some("key")));
        assert_eq!(
            storage.public_url("whatsapp/abc/1.jpg"),
            "https://example.supabase.co/storage/v1/object/public/crm-media/whatsapp/abc/1.jpg"
        );
    }

    #[tokio::test]
    async fn upload_without_service_key_is_a_configuration_error() {
        let storage = StorageClient::new(&config(None));
        let err = storage
            .upload("a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Configuration(_)));
    }
}
