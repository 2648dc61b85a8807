//! Typed reqwest client for the Gemini REST API.
//!
//! Covers the two endpoints the extractor needs: the Files API (multipart
//! upload plus state polling) and `generateContent`. Errors are classified
//! so callers can retry transient timeouts and abort on everything else.

use chrono::{DateTime, Utc};
use reqwest::multipart;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the Gemini API client.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Transient timeout; callers retry these.
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("cannot connect to the Gemini API at {0}")]
    Connect(String),

    #[error("Gemini API error {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("malformed API response: {0}")]
    InvalidResponse(String),

    #[error("cannot read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("uploaded file {0} failed server-side processing")]
    FileFailed(String),
}

impl GeminiError {
    /// Whether the operation that produced this error should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeminiError::Timeout(_))
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub temperature: f32,
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    StateUnspecified,
}

/// Metadata of a file held by the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc-123`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// URI referenced from `generateContent` requests.
    pub uri: String,
    #[serde(default)]
    pub state: FileState,
    /// When the API will drop the file.
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: UploadedFile,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: Vec<&str> = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text.concat())
        }
    }
}

/// The Gemini API client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    /// Build a client with the configured request timeout.
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(GeminiError::Transport)?;

        Ok(Self { config, http })
    }

    /// Upload a local PDF to the Files API.
    pub async fn upload_file(
        &self,
        path: &Path,
        display_name: &str,
    ) -> Result<UploadedFile, GeminiError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| GeminiError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| display_name.to_string());

        let metadata = serde_json::json!({ "file": { "display_name": display_name } });
        let form = multipart::Form::new()
            .part(
                "metadata",
                multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(GeminiError::Transport)?,
            )
            .part(
                "file",
                multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/pdf")
                    .map_err(GeminiError::Transport)?,
            );

        let url = format!("{}/upload/v1beta/files", self.config.api_base_url);
        debug!("Uploading {} to {}", path.display(), url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::check_status(response).await?;

        let upload: UploadFileResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))?;

        info!("Uploaded {} as {}", path.display(), upload.file.name);
        Ok(upload.file)
    }

    /// Fetch current metadata for an uploaded file.
    pub async fn get_file(&self, name: &str) -> Result<UploadedFile, GeminiError> {
        let url = format!("{}/v1beta/{}", self.config.api_base_url, name);

        let response = self
            .http
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))
    }

    /// Poll until a file leaves `PROCESSING`. PDFs usually come back
    /// `ACTIVE` immediately; the poll covers the window where they don't.
    pub async fn wait_until_active(
        &self,
        file: UploadedFile,
    ) -> Result<UploadedFile, GeminiError> {
        let mut file = file;
        loop {
            match file.state {
                FileState::Active => return Ok(file),
                FileState::Failed => return Err(GeminiError::FileFailed(file.name)),
                FileState::Processing | FileState::StateUnspecified => {
                    debug!("File {} still processing, polling again", file.name);
                    tokio::time::sleep(Duration::from_secs(self.config.poll_interval_seconds))
                        .await;
                    file = self.get_file(&file.name).await?;
                }
            }
        }
    }

    /// Run one `generateContent` call over the prompt and uploaded files,
    /// returning the response text.
    pub async fn generate_content(
        &self,
        prompt: &str,
        files: &[UploadedFile],
    ) -> Result<String, GeminiError> {
        let mut parts = vec![Part {
            text: Some(prompt.to_string()),
            file_data: None,
        }];
        for file in files {
            parts.push(Part {
                text: None,
                file_data: Some(FileData {
                    mime_type: file
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "application/pdf".to_string()),
                    file_uri: file.uri.clone(),
                }),
            });
        }

        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base_url, self.config.model
        );
        debug!("Sending generateContent request to {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::check_status(response).await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))?;

        body.text()
            .ok_or_else(|| GeminiError::InvalidResponse("no candidate text".to_string()))
    }

    /// Map a transport error to a retryable/terminal classification.
    fn classify(&self, e: reqwest::Error) -> GeminiError {
        if e.is_timeout() {
            GeminiError::Timeout(format!(
                "no response within {}s",
                self.config.timeout_seconds
            ))
        } else if e.is_connect() {
            GeminiError::Connect(self.config.api_base_url.clone())
        } else {
            GeminiError::Transport(e)
        }
    }

    /// Turn non-success statuses into errors; HTTP 408/504 count as
    /// timeouts so the retry loops pick them up.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GeminiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(GeminiError::Timeout(format!("HTTP {} from the API", status)));
        }

        let message = response.text().await.unwrap_or_default();
        Err(GeminiError::Api { status, message })
    }
}
