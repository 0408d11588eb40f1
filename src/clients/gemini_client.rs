//! Gemini API 客户端
//!
//! 直接调用 REST 接口：
//! - `POST upload/v1beta/files` 上传原始文件
//! - `DELETE v1beta/files/*` 删除文件
//! - `POST v1beta/models/{model}:generateContent` 生成内容

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerativeModel, Part, RemoteFile};
use crate::config::Config;
use crate::error::{AppError, AppResult, ModelError};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model_name: String,
}

impl GeminiClient {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: config.api_base().trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// 非 2xx 响应转换为错误，保留响应体用于诊断
    async fn ensure_success(
        endpoint: &str,
        response: reqwest::Response,
    ) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ModelError::BadResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        }
        .into())
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> AppResult<RemoteFile> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        debug!("上传文件 {} ({} 字节)", path.display(), bytes.len());

        let endpoint = self.endpoint("upload/v1beta/files");
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&endpoint, e))?;
        let response = Self::ensure_success(&endpoint, response).await?;

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::request_failed(&endpoint, e))?;

        Ok(RemoteFile {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| mime_type.to_string()),
        })
    }

    async fn delete_file(&self, file: &RemoteFile) -> AppResult<()> {
        let endpoint = self.endpoint(&format!("v1beta/{}", file.name));
        let response = self
            .http
            .delete(&endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&endpoint, e))?;
        Self::ensure_success(&endpoint, response).await?;
        Ok(())
    }

    async fn generate(&self, parts: &[Part]) -> AppResult<String> {
        let model = self.model_name.trim_start_matches("models/");
        let endpoint = self.endpoint(&format!("v1beta/models/{}:generateContent", model));
        debug!("调用 Gemini generateContent，模型: {}", model);

        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateRequest::from_parts(parts))
            .send()
            .await
            .map_err(|e| AppError::request_failed(&endpoint, e))?;
        let response = Self::ensure_success(&endpoint, response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::request_failed(&endpoint, e))?;

        body.text().ok_or_else(|| {
            ModelError::EmptyResponse {
                model: self.model_name.clone(),
            }
            .into()
        })
    }
}

// ========== 请求 / 响应结构 ==========

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn from_parts(parts: &'a [Part]) -> Self {
        let parts = parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::Text { text },
                Part::File(file) => WirePart::File {
                    file_data: FileData {
                        mime_type: &file.mime_type,
                        file_uri: &file.uri,
                    },
                },
            })
            .collect();
        Self {
            contents: vec![Content {
                role: "user",
                parts,
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
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

impl GenerateResponse {
    /// 拼接第一个候选的所有文本片段
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
