//! 模型客户端
//!
//! 封装托管生成模型的三个能力：上传文件、删除文件、生成内容。
//! 具体服务由配置中的 provider 决定。

pub mod gemini_client;
pub mod openai_client;
pub mod uploaded_file;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, Provider};
use crate::error::{AppResult, ConfigError};
use crate::infrastructure::PdfRasterizer;

pub use gemini_client::GeminiClient;
pub use openai_client::OpenAiCompatClient;
pub use uploaded_file::UploadedFile;

/// 已上传到模型服务的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// 服务端资源名，删除时使用
    pub name: String,
    /// 生成请求中引用的 URI
    pub uri: String,
    pub mime_type: String,
}

/// 生成请求的一段内容
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    File(RemoteFile),
}

/// 托管生成模型
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// 模型名称（用于日志和错误信息）
    fn model_name(&self) -> &str;

    /// 上传本地文件
    async fn upload_file(&self, path: &Path, mime_type: &str) -> AppResult<RemoteFile>;

    /// 删除已上传的文件
    async fn delete_file(&self, file: &RemoteFile) -> AppResult<()>;

    /// 发送一次生成请求，返回模型的文本输出
    async fn generate(&self, parts: &[Part]) -> AppResult<String>;

    /// 纯文本生成
    async fn generate_text(&self, prompt: &str) -> AppResult<String> {
        self.generate(&[Part::Text(prompt.to_string())]).await
    }
}

/// 按配置创建模型客户端
///
/// 调用前应已通过 [`Config::validate`]
pub fn build_model(
    config: &Config,
    rasterizer: Arc<dyn PdfRasterizer>,
) -> AppResult<Arc<dyn GenerativeModel>> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ConfigError::Invalid {
            problems: vec![format!("API key 未设置 ({})", config.api_key_env)],
        })?;

    let model: Arc<dyn GenerativeModel> = match config.provider {
        Provider::Gemini => Arc::new(GeminiClient::new(config, api_key)),
        Provider::OpenAi => Arc::new(OpenAiCompatClient::new(config, api_key, rasterizer)),
    };
    Ok(model)
}
