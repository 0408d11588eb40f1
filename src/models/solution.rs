use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::answer::AnswerType;
use super::lenient;

/// 标准答案中的一道题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub question_number: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub correct_answer: String,
    #[serde(default)]
    pub answer_type: AnswerType,
    /// 该题分值
    #[serde(default, deserialize_with = "lenient::marks")]
    pub marks: f64,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub explanation: Option<String>,
}

/// 标准答案
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionKey {
    #[serde(default)]
    pub solutions: Vec<SolutionRecord>,
    #[serde(default, deserialize_with = "lenient::marks")]
    pub total_marks: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SolutionKey {
    /// 没有 solutions.txt 时使用的空答案
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}
