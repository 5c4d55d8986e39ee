//! Remote recognition of a region through the Mathpix v3 API.

use std::fmt;
use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GenericImageView, ImageFormat};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "https://api.mathpix.com/v3/latex";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const PLACEHOLDER_APP_ID: &str = "your_app_id";
pub const PLACEHOLDER_APP_KEY: &str = "your_app_key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathpixSettings {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub endpoint: String,
    pub formats: Vec<String>,
    pub timeout: Duration,
}

impl Default for MathpixSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            app_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            formats: vec!["asciimath".to_string()],
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl MathpixSettings {
    pub fn has_credentials(&self) -> bool {
        self.app_id.is_some() && self.app_key.is_some()
    }
}

/// Blank values and the sample-config placeholders count as unset.
pub fn normalize_credential(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER_APP_ID || trimmed == PLACEHOLDER_APP_KEY {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug)]
pub enum RecognizerError {
    MissingCredentials,
    InvalidEndpoint {
        value: String,
        source: url::ParseError,
    },
    Encode(image::ImageError),
    Client(reqwest::Error),
    Http {
        url: Url,
        source: reqwest::Error,
    },
    Status {
        url: Url,
        status: StatusCode,
        body: String,
    },
}

impl fmt::Display for RecognizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognizerError::MissingCredentials => {
                write!(f, "mathpix app_id and app_key are not configured")
            }
            RecognizerError::InvalidEndpoint { value, source } => {
                write!(f, "invalid mathpix endpoint '{value}': {source}")
            }
            RecognizerError::Encode(source) => {
                write!(f, "failed to encode region as PNG: {source}")
            }
            RecognizerError::Client(source) => {
                write!(f, "failed to build HTTP client: {source}")
            }
            RecognizerError::Http { url, source } => {
                write!(f, "request to {url} failed: {source}")
            }
            RecognizerError::Status { url, status, body } => {
                write!(f, "{url} answered {status}: {body}")
            }
        }
    }
}

impl std::error::Error for RecognizerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecognizerError::InvalidEndpoint { source, .. } => Some(source),
            RecognizerError::Encode(source) => Some(source),
            RecognizerError::Client(source) => Some(source),
            RecognizerError::Http { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecognitionRequest<'a> {
    src: String,
    formats: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecognitionBody {
    asciimath: Option<String>,
    latex: Option<String>,
    text: Option<String>,
    error: Option<String>,
    error_info: Option<ErrorInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorInfo {
    id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionFailure {
    pub error: String,
    pub id: Option<String>,
    pub message: Option<String>,
}

/// What the service answered; `raw` is the body exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub asciimath: Option<String>,
    pub latex: Option<String>,
    pub text: Option<String>,
    pub failure: Option<RecognitionFailure>,
    pub raw: String,
}

impl Recognition {
    /// Never fails: a body that is not the expected JSON is only kept raw.
    pub fn parse(raw: String) -> Self {
        let body: RecognitionBody = serde_json::from_str(&raw).unwrap_or_default();
        let info = body.error_info.unwrap_or_default();
        let failure = match (body.error, info.id, info.message) {
            (None, None, None) => None,
            (error, id, message) => Some(RecognitionFailure {
                error: error.unwrap_or_default(),
                id,
                message,
            }),
        };
        Self {
            asciimath: body.asciimath,
            latex: body.latex,
            text: body.text,
            failure,
            raw,
        }
    }

    /// Best human-readable rendering, falling back to the raw body.
    pub fn best_text(&self) -> &str {
        [&self.asciimath, &self.latex, &self.text]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
            .unwrap_or(&self.raw)
    }
}

pub fn png_data_uri(image: &DynamicImage) -> Result<String, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(&bytes)))
}

pub struct MathpixRecognizer {
    client: Client,
    endpoint: Url,
    app_id: String,
    app_key: String,
    formats: Vec<String>,
}

impl MathpixRecognizer {
    pub fn new(settings: &MathpixSettings) -> Result<Self, RecognizerError> {
        let (Some(app_id), Some(app_key)) = (settings.app_id.clone(), settings.app_key.clone())
        else {
            return Err(RecognizerError::MissingCredentials);
        };
        let endpoint =
            Url::parse(&settings.endpoint).map_err(|source| RecognizerError::InvalidEndpoint {
                value: settings.endpoint.clone(),
                source,
            })?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(RecognizerError::Client)?;
        Ok(Self {
            client,
            endpoint,
            app_id,
            app_key,
            formats: settings.formats.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(&self, image: &DynamicImage) -> Result<RecognitionRequest<'_>, RecognizerError> {
        Ok(RecognitionRequest {
            src: png_data_uri(image).map_err(RecognizerError::Encode)?,
            formats: &self.formats,
        })
    }

    pub async fn recognize(&self, image: &DynamicImage) -> Result<Recognition, RecognizerError> {
        let body = self.request_body(image)?;
        info!(
            endpoint = %self.endpoint,
            width = image.width(),
            height = image.height(),
            "sending region for recognition"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("app_id", &self.app_id)
            .header("app_key", &self.app_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| RecognizerError::Http {
                url: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|source| RecognizerError::Http {
                url: self.endpoint.clone(),
                source,
            })?;
        if !status.is_success() {
            return Err(RecognizerError::Status {
                url: self.endpoint.clone(),
                status,
                body: raw,
            });
        }

        debug!(bytes = raw.len(), "recognition answered");
        Ok(Recognition::parse(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> MathpixSettings {
        MathpixSettings {
            app_id: Some("id".into()),
            app_key: Some("key".into()),
            ..Default::default()
        }
    }

    #[test]
    fn placeholders_count_as_unset() {
        assert_eq!(normalize_credential(Some("your_app_id".into())), None);
        assert_eq!(normalize_credential(Some(" your_app_key ".into())), None);
        assert_eq!(normalize_credential(Some("   ".into())), None);
        assert_eq!(normalize_credential(None), None);
        assert_eq!(
            normalize_credential(Some(" abc ".into())),
            Some("abc".to_string())
        );
    }

    #[test]
    fn missing_credentials_are_reported() {
        let settings = MathpixSettings {
            app_id: Some("id".into()),
            ..Default::default()
        };
        assert!(matches!(
            MathpixRecognizer::new(&settings),
            Err(RecognizerError::MissingCredentials)
        ));
    }

    #[test]
    fn default_endpoint_is_parsed() {
        let recognizer = MathpixRecognizer::new(&configured()).unwrap();
        assert_eq!(recognizer.endpoint().as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let settings = MathpixSettings {
            endpoint: "not a url".into(),
            ..configured()
        };
        assert!(matches!(
            MathpixRecognizer::new(&settings),
            Err(RecognizerError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn request_carries_png_data_uri_and_formats() {
        let recognizer = MathpixRecognizer::new(&configured()).unwrap();
        let body = recognizer
            .request_body(&DynamicImage::new_luma8(3, 2))
            .unwrap();
        let json = serde_json::to_value(&body).unwrap();
        let src = json["src"].as_str().unwrap();
        assert!(src.starts_with("data:image/png;base64,"));
        let png = BASE64
            .decode(&src["data:image/png;base64,".len()..])
            .unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(json["formats"], serde_json::json!(["asciimath"]));
    }

    #[test]
    fn answer_is_parsed_and_raw_kept() {
        let raw = r#"{"asciimath":"x^2","latex":"x^{2}","latex_confidence":0.9}"#;
        let recognition = Recognition::parse(raw.to_string());
        assert_eq!(recognition.asciimath.as_deref(), Some("x^2"));
        assert_eq!(recognition.latex.as_deref(), Some("x^{2}"));
        assert_eq!(recognition.failure, None);
        assert_eq!(recognition.raw, raw);
        assert_eq!(recognition.best_text(), "x^2");
    }

    #[test]
    fn error_answer_is_structured() {
        let raw = r#"{"error":"Invalid credentials","error_info":{"id":"http_unauthorized","message":"Invalid credentials"}}"#;
        let recognition = Recognition::parse(raw.to_string());
        assert_eq!(
            recognition.failure,
            Some(RecognitionFailure {
                error: "Invalid credentials".into(),
                id: Some("http_unauthorized".into()),
                message: Some("Invalid credentials".into()),
            })
        );
        assert_eq!(recognition.best_text(), raw);
    }

    #[test]
    fn non_json_body_is_kept_verbatim() {
        let recognition = Recognition::parse("<html>bad gateway</html>".into());
        assert_eq!(recognition.asciimath, None);
        assert_eq!(recognition.failure, None);
        assert_eq!(recognition.best_text(), "<html>bad gateway</html>");
    }
}
