use crate::shared::error::CrmError;

/// Runtime configuration, loaded once at startup from the environment.
///
/// Required settings fail fast with a `Configuration` error naming the
/// variable. Optional integrations stay `None` and degrade at the point of
/// use: WhatsApp sends become logged no-ops, webhook verification rejects
/// everything, analysis raises when invoked, and the cron endpoint matches
/// no secret.
#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub storage: StorageConfig,
    pub gemini: GeminiConfig,
    pub whatsapp: WhatsAppConfig,
    pub cron_secret: Option<String>,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct StorageConfig {
    /// Base URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub bucket: String,
    pub service_key: Option<String>,
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
}

#[derive(Clone)]
pub struct WhatsAppConfig {
    pub api_token: Option<String>,
    pub phone_id: Option<String>,
    pub verify_token: Option<String>,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CrmError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| CrmError::Configuration("DATABASE_URL"))?;
        let base_url =
            std::env::var("SUPABASE_URL").map_err(|_| CrmError::Configuration("SUPABASE_URL"))?;

        Ok(AppConfig {
            server: ServerConfig {
                host: optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: optional("SERVER_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database_url,
            storage: StorageConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                bucket: optional("STORAGE_BUCKET").unwrap_or_else(|| "crm-media".to_string()),
                service_key: optional("SUPABASE_SERVICE_ROLE_KEY"),
            },
            gemini: GeminiConfig {
                api_key: optional("GEMINI_API_KEY"),
            },
            whatsapp: WhatsAppConfig {
                api_token: optional("WHATSAPP_API_TOKEN"),
                phone_id: optional("WHATSAPP_PHONE_ID"),
                verify_token: optional("WHATSAPP_VERIFY_TOKEN"),
            },
            cron_secret: optional("CRON_SECRET"),
        })
    }
}
