//! 模型输出的 JSON 解析与修复
//!
//! 流程：去掉 markdown 代码块标记后解析 → 失败则提取第一个 `{...}` 块再解析 →
//! 仍失败时由调用方决定降级（转写）还是报错（标准答案、评分）。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ResponseFormatError;

/// 从第一个 `{` 贪婪匹配到最后一个 `}`
static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("JSON block pattern is valid"));

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum JsonOutcome<T> {
    /// 去掉代码块标记后直接解析成功
    Parsed(T),
    /// 从周围文字中提取出 JSON 后解析成功
    Repaired(T),
    /// 两次解析都失败，使用了调用方提供的降级结果
    Degraded(T),
    /// 两次解析都失败
    Failed(ResponseFormatError),
}

impl<T> JsonOutcome<T> {
    /// 失败时用 `fallback` 生成降级结果
    pub fn degrade_with<F>(self, fallback: F) -> Self
    where
        F: FnOnce(&ResponseFormatError) -> T,
    {
        match self {
            JsonOutcome::Failed(err) => {
                warn!("模型输出无法解析为 JSON，使用降级结果: {}", err.reason);
                JsonOutcome::Degraded(fallback(&err))
            }
            other => other,
        }
    }

    /// 转为 `Result`，失败时返回带原文摘录的错误
    pub fn into_result(self) -> Result<T, ResponseFormatError> {
        match self {
            JsonOutcome::Parsed(v) | JsonOutcome::Repaired(v) | JsonOutcome::Degraded(v) => Ok(v),
            JsonOutcome::Failed(err) => Err(err),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            JsonOutcome::Parsed(v) | JsonOutcome::Repaired(v) | JsonOutcome::Degraded(v) => Some(v),
            JsonOutcome::Failed(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, JsonOutcome::Degraded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JsonOutcome::Failed(_))
    }

    /// 用于日志的标签
    pub fn label(&self) -> &'static str {
        match self {
            JsonOutcome::Parsed(_) => "parsed",
            JsonOutcome::Repaired(_) => "repaired",
            JsonOutcome::Degraded(_) => "degraded",
            JsonOutcome::Failed(_) => "failed",
        }
    }
}

/// 去掉 ```json / ``` 标记
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// 解析模型输出
///
/// 解析成目标类型失败（包括结构不匹配）都视为解析失败
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> JsonOutcome<T> {
    let raw = raw.trim();
    let cleaned = strip_code_fences(raw);

    let first_error = match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => return JsonOutcome::Parsed(value),
        Err(e) => e,
    };
    debug!("直接解析失败: {}，尝试提取 JSON 块", first_error);

    if let Some(block) = JSON_BLOCK.find(raw) {
        match serde_json::from_str::<T>(block.as_str()) {
            Ok(value) => return JsonOutcome::Repaired(value),
            Err(e) => {
                return JsonOutcome::Failed(ResponseFormatError::new(raw, e.to_string()));
            }
        }
    }

    JsonOutcome::Failed(ResponseFormatError::new(raw, first_error.to_string()))
}
