//! OpenAI 兼容服务客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//!
//! chat completions 接口没有文件存储，"上传"在本地完成：
//! PDF 逐页渲染为 PNG，以 base64 data URL 的形式放进请求。

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use base64::Engine;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{GenerativeModel, Part, RemoteFile};
use crate::config::Config;
use crate::error::{AppError, AppResult, ModelError};
use crate::infrastructure::PdfRasterizer;

/// OpenAI 兼容客户端
pub struct OpenAiCompatClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_tokens: u32,
    rasterizer: Arc<dyn PdfRasterizer>,
    /// 本地"已上传"文件：资源名 → 各页 data URL
    documents: Mutex<HashMap<String, Vec<String>>>,
    next_id: AtomicUsize,
}

impl OpenAiCompatClient {
    pub fn new(config: &Config, api_key: impl Into<String>, rasterizer: Arc<dyn PdfRasterizer>) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(config.api_base());

        Self {
            client: Client::with_config(openai_config),
            model_name: config.model_name.clone(),
            max_tokens: config.max_output_tokens,
            rasterizer,
            documents: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    async fn encode_document(&self, path: &Path, mime_type: &str) -> AppResult<Vec<String>> {
        let engine = base64::engine::general_purpose::STANDARD;
        if mime_type == "application/pdf" {
            let pages = self.rasterizer.rasterize(path).await?;
            return Ok(pages
                .iter()
                .map(|page| format!("data:image/png;base64,{}", engine.encode(&page.png)))
                .collect());
        }
        if mime_type.starts_with("image/") {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
            return Ok(vec![format!("data:{};base64,{}", mime_type, engine.encode(bytes))]);
        }
        Err(ModelError::InvalidRequest {
            source: format!("不支持的文件类型: {mime_type}").into(),
        }
        .into())
    }
}

fn invalid_request(e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::Model(ModelError::InvalidRequest {
        source: Box::new(e),
    })
}

#[async_trait]
impl GenerativeModel for OpenAiCompatClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> AppResult<RemoteFile> {
        let pages = self.encode_document(path, mime_type).await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("local/{id}");
        debug!("本地缓存文件 {} → {} ({} 张图片)", path.display(), name, pages.len());

        self.documents.lock().await.insert(name.clone(), pages);
        Ok(RemoteFile {
            uri: format!("local://{id}"),
            name,
            mime_type: mime_type.to_string(),
        })
    }

    async fn delete_file(&self, file: &RemoteFile) -> AppResult<()> {
        match self.documents.lock().await.remove(&file.name) {
            Some(_) => Ok(()),
            None => Err(ModelError::UnknownFile {
                name: file.name.clone(),
            }
            .into()),
        }
    }

    async fn generate(&self, parts: &[Part]) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);

        // 构建用户消息内容（支持图片）
        let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
        let mut image_count = 0;
        {
            let documents = self.documents.lock().await;
            for part in parts {
                match part {
                    Part::Text(text) => {
                        content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                            ChatCompletionRequestMessageContentPartText { text: text.clone() },
                        ));
                    }
                    Part::File(file) => {
                        let pages = documents.get(&file.name).ok_or_else(|| ModelError::UnknownFile {
                            name: file.name.clone(),
                        })?;
                        for url in pages {
                            content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                                ChatCompletionRequestMessageContentPartImage {
                                    image_url: ImageUrl {
                                        url: url.clone(),
                                        detail: Some(ImageDetail::High),
                                    },
                                },
                            ));
                            image_count += 1;
                        }
                    }
                }
            }
        }

        let user_msg = if image_count > 0 {
            debug!("使用 Vision API，包含 {} 张图片", image_count);
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                .build()
                .map_err(invalid_request)?
        } else {
            // 没有图片，只有文本
            let text = parts
                .iter()
                .filter_map(|p| match p {
                    Part::Text(t) => Some(t.as_str()),
                    Part::File(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .map_err(invalid_request)?
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .max_tokens(self.max_tokens)
            .build()
            .map_err(invalid_request)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::request_failed("chat/completions", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ModelError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}
