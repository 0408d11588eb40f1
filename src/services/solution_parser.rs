//! 标准答案解析 - 业务能力层
//!
//! OCR 得到的标准答案文本 → 模型 → 结构化的 [`SolutionKey`]

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clients::GenerativeModel;
use crate::error::AppResult;
use crate::infrastructure::files;
use crate::models::SolutionKey;
use crate::services::json_repair::parse_model_json;
use crate::utils::{format_marks, truncate_text};

/// 标准答案解析器
pub struct SolutionParser {
    model: Arc<dyn GenerativeModel>,
}

impl SolutionParser {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// 读取标准答案文本文件并解析
    pub async fn parse_file(&self, path: &Path) -> AppResult<SolutionKey> {
        let text = files::read_text(path).await?;
        self.parse_text(&text).await
    }

    /// 解析标准答案文本
    ///
    /// 模型输出无法解析时返回 [`crate::error::ResponseFormatError`]
    pub async fn parse_text(&self, solutions_text: &str) -> AppResult<SolutionKey> {
        let prompt = build_prompt(solutions_text);
        let raw = self.model.generate_text(&prompt).await?;
        debug!("标准答案原始输出: {}", truncate_text(&raw, 200));

        let key = interpret_response(&raw)?;
        info!("  找到 {} 道题的标准答案", key.solutions.len());
        info!("  总分: {}", format_marks(key.total_marks));
        Ok(key)
    }
}

/// 构建标准答案解析提示词
pub fn build_prompt(solutions_text: &str) -> String {
    format!(
        r#"Parse this exam solutions document and extract all correct answers.

SOLUTIONS TEXT:
{solutions_text}

Return JSON in this exact format:
{{
  "solutions": [
    {{
      "question_number": "1",
      "correct_answer": "B",
      "answer_type": "mcq",
      "marks": 2,
      "explanation": "Brief explanation"
    }}
  ],
  "total_marks": 50
}}

Return ONLY valid JSON."#
    )
}

/// 解析模型输出，不做降级
pub fn interpret_response(raw: &str) -> AppResult<SolutionKey> {
    let outcome = parse_model_json::<SolutionKey>(raw);
    debug!("标准答案解析: {}", outcome.label());
    Ok(outcome.into_result()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::AnswerType;
    use crate::testing::ScriptedModel;

    #[tokio::test]
    async fn test_parse_text_sends_solutions_in_prompt() {
        let reply = r#"Here you go:
{"solutions": [
  {"question_number": 1, "correct_answer": "B", "answer_type": "mcq", "marks": 2, "explanation": "Definition"},
  {"question_number": "2", "correct_answer": "Verify invoices", "answer_type": "written", "marks": "8"}
], "total_marks": 10}"#;
        let model = Arc::new(ScriptedModel::replying([reply]));
        let parser = SolutionParser::new(model.clone());

        let key = parser.parse_text("1. B\n2. Verify invoices").await.unwrap();

        assert!(model.prompt(0).contains("SOLUTIONS TEXT:\n1. B\n2. Verify invoices"));
        assert_eq!(key.solutions.len(), 2);
        assert_eq!(key.solutions[0].question_number, "1");
        assert_eq!(key.solutions[0].answer_type, AnswerType::Mcq);
        assert_eq!(key.solutions[1].marks, 8.0);
        assert_eq!(key.solutions[1].explanation, None);
        assert_eq!(key.total_marks, 10.0);
    }

    #[tokio::test]
    async fn test_numeric_explanation_is_accepted() {
        let reply = r#"{"solutions": [
  {"question_number": 1, "correct_answer": ["A", "C"], "answer_type": "mcq", "marks": 2, "explanation": 42},
  {"question_number": 2, "correct_answer": "Materiality", "answer_type": "written", "marks": 3, "explanation": ["ISA 320", "planning"]}
], "total_marks": 5}"#;
        let model = Arc::new(ScriptedModel::replying([reply]));
        let key = SolutionParser::new(model).parse_text("1. A, C").await.unwrap();

        assert_eq!(key.solutions.len(), 2);
        assert_eq!(key.solutions[0].correct_answer, "A, C");
        assert_eq!(key.solutions[0].explanation.as_deref(), Some("42"));
        assert_eq!(key.solutions[1].explanation.as_deref(), Some("ISA 320, planning"));
        assert_eq!(key.total_marks, 5.0);
    }

    #[tokio::test]
    async fn test_garbage_is_fatal_with_excerpt() {
        let garbage = format!("I cannot help with that. {}", "x".repeat(500));
        let model = Arc::new(ScriptedModel::replying([garbage.clone()]));
        let parser = SolutionParser::new(model);

        let err = parser.parse_text("1. B").await.unwrap_err();
        match err {
            AppError::ResponseFormat(e) => {
                assert_eq!(e.excerpt.chars().count(), 300);
                assert!(garbage.starts_with(&e.excerpt));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let model = Arc::new(ScriptedModel::replying(Vec::<String>::new()));
        let parser = SolutionParser::new(model.clone());
        let err = parser
            .parse_file(Path::new("/nonexistent/solutions.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::File(_)));
        assert_eq!(model.request_count(), 0);
    }

    #[test]
    fn test_prompt_braces_are_literal() {
        let prompt = build_prompt("abc");
        assert!(prompt.contains("\"solutions\": ["));
        assert!(prompt.contains("\"total_marks\": 50\n}"));
    }
}
