//! 阶段间文件读写
//!
//! 各阶段只通过本地文件传递中间结果，这里统一错误类型

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use crate::error::{AppError, AppResult, FileError};

/// 读取文本文件
pub async fn read_text(path: &Path) -> AppResult<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))
}

/// 读取可选的文本文件，不存在时返回 `None`
pub async fn read_optional_text(path: &Path) -> AppResult<Option<String>> {
    match read_text(path).await {
        Ok(text) => Ok(Some(text)),
        Err(AppError::File(FileError::NotFound { .. })) => Ok(None),
        Err(e) => Err(e),
    }
}

/// 写入文本文件，必要时创建父目录
pub async fn write_text(path: &Path, contents: &str) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }
    fs::write(path, contents)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// 以两空格缩进写入 JSON（保留非 ASCII 字符）
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| FileError::Json {
        path: path.display().to_string(),
        source,
    })?;
    write_text(path, &json).await
}

/// 读取 JSON 文件
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let text = read_text(path).await?;
    serde_json::from_str(&text).map_err(|source| {
        FileError::Json {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}
