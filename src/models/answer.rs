use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::lenient;

/// 答案类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerType {
    /// 选择题
    Mcq,
    /// 主观题
    #[default]
    Written,
    /// JSON 解析失败时保留的原始文本
    Raw,
}

impl AnswerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Mcq => "mcq",
            AnswerType::Written => "written",
            AnswerType::Raw => "raw",
        }
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 模型偶尔返回 "MCQ"、"short_answer" 之类的值，未知类型按主观题处理
impl<'de> Deserialize<'de> for AnswerType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::text(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "mcq" | "multiple_choice" | "multiple-choice" => AnswerType::Mcq,
            "raw" => AnswerType::Raw,
            _ => AnswerType::Written,
        })
    }
}

/// 单道题的手写答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub question_number: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub answer_text: String,
    #[serde(default)]
    pub answer_type: AnswerType,
}

impl AnswerRecord {
    pub fn new(
        question_number: impl Into<String>,
        answer_text: impl Into<String>,
        answer_type: AnswerType,
    ) -> Self {
        Self {
            question_number: question_number.into(),
            answer_text: answer_text.into(),
            answer_type,
        }
    }
}

/// 处理的页数：正常为数字，降级结果为 `"unknown"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PagesProcessed {
    Count(u64),
    Label(String),
    Other(Value),
}

impl fmt::Display for PagesProcessed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagesProcessed::Count(n) => write!(f, "{}", n),
            PagesProcessed::Label(s) => f.write_str(s),
            PagesProcessed::Other(v) => write!(f, "{}", v),
        }
    }
}

/// 手写答案转写结果
///
/// 模型返回的未知字段保存在 `extra` 中，写回 JSON 时原样保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_questions_found: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<PagesProcessed>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub extraction_notes: Option<String>,
    /// 来源 PDF（写文件前补充）
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_pdf: Option<String>,
    /// 本次转写使用的 API 调用次数
    #[serde(
        default,
        deserialize_with = "lenient::opt_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_calls_used: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transcription {
    /// 模型输出无法解析时的降级结果：整段原文作为一条 raw 答案
    pub fn degraded(raw_response: &str) -> Self {
        Self {
            answers: vec![AnswerRecord::new("?", raw_response, AnswerType::Raw)],
            total_questions_found: Some(0),
            pages_processed: Some(PagesProcessed::Label("unknown".to_string())),
            extraction_notes: Some("JSON parse failed — raw text included".to_string()),
            ..Default::default()
        }
    }

    /// 找到的题目数量，模型未给出时以答案条数为准
    pub fn questions_found(&self) -> u64 {
        self.total_questions_found
            .unwrap_or(self.answers.len() as u64)
    }

    /// 用于展示的页数
    pub fn pages_label(&self) -> String {
        self.pages_processed
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}
