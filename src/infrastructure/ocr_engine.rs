//! OCR 引擎 - 基础设施层
//!
//! 只负责"图片 → 文本"，不认识页码标记和输出文件

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::rasterizer::PageImage;
use crate::error::{AppResult, ExtractError};

/// OCR 能力
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// 引擎名称（用于日志）
    fn name(&self) -> &str;

    /// 识别单页图片中的文字
    async fn recognize(&self, page: &PageImage) -> AppResult<String>;
}

/// Tesseract 命令行实现
///
/// 图片通过 stdin 传入，结果从 stdout 读取，不落临时文件
pub struct TesseractCli {
    binary: String,
    language: String,
}

impl TesseractCli {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, page: &PageImage) -> AppResult<String> {
        debug!("tesseract 识别第 {} 页 ({} 字节)", page.index, page.png.len());

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExtractError::ToolUnavailable {
                tool: self.binary.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&page.png)
                .await
                .map_err(|source| ExtractError::ToolUnavailable {
                    tool: self.binary.clone(),
                    source,
                })?;
            // 关闭 stdin，tesseract 才会开始识别
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| ExtractError::ToolUnavailable {
                tool: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::ToolFailed {
                tool: self.binary.clone(),
                detail: format!(
                    "第 {} 页: {}",
                    page.index,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
