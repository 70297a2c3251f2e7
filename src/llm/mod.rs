use async_trait::async_trait;

use crate::shared::error::CrmError;

pub mod gemini;

pub use gemini::GeminiClient;

/// Prompt used for photos arriving over WhatsApp.
pub const WHATSAPP_PHOTO_PROMPT: &str =
    "Bu görseldeki yapılan işi ve kullanılan malzemeleri detaylıca analiz et. Türkçe yanıt ver.";

/// Prompt for photos taken at the start of a job.
pub const JOB_START_PROMPT: &str = "Sen profesyonel bir saha operasyon uzmanısın. Bu fotoğraflar bir teknik servis veya montaj işinin BAŞLANGICINDA çekildi.
Lütfen fotoğrafları analiz et ve şunları çıkar:
1. Mevcut durum nedir? (Örn: Eski cihaz duvarda asılı, kablolar dağınık, boş bir duvar var vb.)
2. Yapılacak iş neye benziyor? (Örn: Klima montajı, kablo çekimi, arıza tespiti vb.)
3. Görünen riskler veya dikkat edilmesi gerekenler var mı?

Yanıtını kısa, maddeler halinde ve profesyonel bir dille Türkçe olarak ver.";

/// Prompt for photos taken at the end of a job.
pub const JOB_END_PROMPT: &str = "Sen profesyonel bir saha operasyon uzmanısın. Bu fotoğraflar bir teknik servis veya montaj işinin BİTİMİNDE çekildi.
Lütfen fotoğrafları analiz et ve şunları çıkar:
1. Yapılan iş nedir? (Örn: Yeni klima takılmış, kablolar kanala alınmış vb.)
2. Kullanılan malzemeler neler olabilir? (Görselden tespit edebildiğin kadarıyla. Örn: 3 metre kablo, 1 adet sigorta, dübel vb.)
3. İşçilik kalitesi nasıl görünüyor? (Temiz, düzenli vb.)

Yanıtını kısa, maddeler halinde ve profesyonel bir dille Türkçe olarak ver.";

/// One image handed to the analyzer, either already inline or fetched from a
/// remote URL after the SSRF check.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Url(String),
    Inline { data: String, mime_type: String },
}

impl ImageSource {
    /// Classifies a raw string the way report uploads arrive: data URIs and
    /// bare base64 payloads are inline, everything else is a URL. The mime
    /// type declared by a data URI is kept; jpeg is only the fallback.
    pub fn from_raw(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("data:") {
            let (meta, data) = rest.split_once(',').unwrap_or(("", rest));
            let mime_type = meta
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .unwrap_or("image/jpeg")
                .to_string();
            return ImageSource::Inline {
                data: data.to_string(),
                mime_type,
            };
        }
        if !raw.starts_with("http") {
            return ImageSource::Inline {
                data: raw.to_string(),
                mime_type: "image/jpeg".to_string(),
            };
        }
        ImageSource::Url(raw.to_string())
    }
}

#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Sends one prompt plus the given images to a vision model and returns
    /// its free-text analysis. Single attempt, no retry.
    async fn analyze(&self, images: &[ImageSource], prompt: &str) -> Result<String, CrmError>;
}

/// Rejects URLs that could reach loopback or private-range hosts when
/// fetched server-side with untrusted input.
pub fn is_safe_url(raw: &str) -> bool {
    let parsed = match url::Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return false,
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return false,
    };
    if host == "localhost" || host == "127.0.0.1" || host == "::1" || host == "[::1]" {
        return false;
    }
    if host.starts_with("192.168.") || host.starts_with("10.") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denylist_rejects_loopback_and_private_ranges() {
        for bad in [
            "http://localhost/x.jpg",
            "http://127.0.0.1/x.jpg",
            "http://[::1]/x.jpg",
            "http://192.168.1.5/x.jpg",
            "http://10.0.0.8/x.jpg",
            "ftp://example.com/x.jpg",
            "not a url",
        ] {
            assert!(!is_safe_url(bad), "{} should be rejected", bad);
        }
    }

    #[test]
    fn denylist_allows_public_http_hosts() {
        assert!(is_safe_url("https://example.com/photo.jpg"));
        assert!(is_safe_url("http://cdn.example.org/a/b.png"));
        // 10.x must match as a prefix of the host, not of the path
        assert!(is_safe_url("https://example.com/10.0.0.1.jpg"));
    }

    #[test]
    fn raw_strings_classify_into_inline_or_url() {
        assert!(matches!(
            ImageSource::from_raw("https://example.com/a.jpg"),
            ImageSource::Url(_)
        ));
        match ImageSource::from_raw("data:image/png;base64,QUJD") {
            ImageSource::Inline { data, .. } => assert_eq!(data, "QUJD"),
            other => panic!("expected inline, got {:?}", other),
        }
        assert!(matches!(
            ImageSource::from_raw("QUJDRA=="),
            ImageSource::Inline { .. }
        ));
    }

    #[test]
    fn data_uri_mime_type_is_preserved() {
        match ImageSource::from_raw("data:image/png;base64,QUJD") {
            ImageSource::Inline { data, mime_type } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data, "QUJD");
            }
            other => panic!("expected inline, got {:?}", other),
        }
        match ImageSource::from_raw("QUJDRA==") {
            ImageSource::Inline { mime_type, .. } => assert_eq!(mime_type, "image/jpeg"),
            other => panic!("expected inline, got {:?}", other),
        }
    }
}
