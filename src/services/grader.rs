//! 评分 - 业务能力层
//!
//! 学生答案 + 标准答案（+ 可选题目原文）→ 模型 → [`GradingReport`]。
//! 题号匹配完全交给模型，本地只负责组装提示词和校正分数。

use std::sync::Arc;

use tracing::{debug, info};

use crate::clients::GenerativeModel;
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{GradingReport, SolutionKey, Transcription};
use crate::services::json_repair::parse_model_json;
use crate::utils::{take_chars, truncate_text};

/// 评分器
pub struct Grader {
    model: Arc<dyn GenerativeModel>,
    context_limit: usize,
    enforce_invariants: bool,
}

impl Grader {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &Config) -> Self {
        Self::with_options(
            model,
            config.question_context_limit,
            config.enforce_marks_invariants,
        )
    }

    pub fn with_options(
        model: Arc<dyn GenerativeModel>,
        context_limit: usize,
        enforce_invariants: bool,
    ) -> Self {
        Self {
            model,
            context_limit,
            enforce_invariants,
        }
    }

    /// 评分
    ///
    /// `questions_text` 为空或 `None` 时提示词中不包含题目上下文
    pub async fn grade(
        &self,
        answers: &Transcription,
        solutions: &SolutionKey,
        questions_text: Option<&str>,
    ) -> AppResult<GradingReport> {
        let prompt = self.build_prompt(answers, solutions, questions_text);
        let raw = self.model.generate_text(&prompt).await?;
        debug!("评分原始输出: {}", truncate_text(&raw, 200));

        let outcome = parse_model_json::<GradingReport>(&raw);
        debug!("评分结果解析: {}", outcome.label());
        let mut report = outcome.into_result()?;

        if self.enforce_invariants {
            let corrections = report.enforce_marks_invariants();
            if corrections > 0 {
                info!("  本地修正了 {} 处分数", corrections);
            }
        }

        info!("  得分: {} ({:.1}%)", report.score_line(), report.percentage);
        info!("  等级: {}", report.grade_label());
        Ok(report)
    }

    /// 构建评分提示词
    pub fn build_prompt(
        &self,
        answers: &Transcription,
        solutions: &SolutionKey,
        questions_text: Option<&str>,
    ) -> String {
        let answers_json = serde_json::to_string_pretty(&answers.answers).unwrap_or_default();
        let solutions_json = serde_json::to_string_pretty(&solutions.solutions).unwrap_or_default();
        let context = match questions_text.filter(|t| !t.is_empty()) {
            Some(text) => format!("QUESTIONS CONTEXT:\n{}", take_chars(text, self.context_limit)),
            None => String::new(),
        };

        format!(
            r#"You are a strict but fair exam grader for CA (Chartered Accountancy) exams.

Grading rules:
- MCQ: Full marks for correct answer only. Zero for wrong.
- Written: Award marks proportionally based on key points covered.
- Be specific in feedback.

STUDENT ANSWERS:
{answers_json}

SOLUTION KEY:
{solutions_json}

{context}

Return grading report as JSON:
{{
  "results": [
    {{
      "question_number": "1",
      "student_answer": "B",
      "correct_answer": "B",
      "is_correct": true,
      "marks_awarded": 2,
      "marks_available": 2,
      "feedback": "Correct!"
    }}
  ],
  "total_marks_awarded": 20,
  "total_marks_available": 50,
  "percentage": 40.0,
  "grade": "Pass",
  "overall_feedback": "Summary of performance."
}}

Return ONLY valid JSON."#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerRecord, AnswerType, SolutionRecord};
    use crate::testing::ScriptedModel;

    fn answers() -> Transcription {
        Transcription {
            answers: vec![
                AnswerRecord::new("1", "B", AnswerType::Mcq),
                AnswerRecord::new("2", "Check the ledger", AnswerType::Written),
            ],
            ..Default::default()
        }
    }

    fn solutions() -> SolutionKey {
        SolutionKey {
            solutions: vec![SolutionRecord {
                question_number: "1".to_string(),
                correct_answer: "B".to_string(),
                answer_type: AnswerType::Mcq,
                marks: 2.0,
                explanation: None,
            }],
            total_marks: 2.0,
            ..Default::default()
        }
    }

    fn grader(model: Arc<ScriptedModel>, enforce: bool) -> Grader {
        Grader::with_options(model, 3000, enforce)
    }

    #[test]
    fn test_context_only_when_present() {
        let g = grader(Arc::new(ScriptedModel::replying(Vec::<String>::new())), true);

        let without = g.build_prompt(&answers(), &solutions(), None);
        assert!(!without.contains("QUESTIONS CONTEXT"));
        let empty = g.build_prompt(&answers(), &solutions(), Some(""));
        assert!(!empty.contains("QUESTIONS CONTEXT"));

        let long = "Q".repeat(5000);
        let with = g.build_prompt(&answers(), &solutions(), Some(&long));
        assert!(with.contains(&format!("QUESTIONS CONTEXT:\n{}\n", "Q".repeat(3000))));
        assert!(!with.contains(&"Q".repeat(3001)));
        assert!(with.contains("\"answer_text\": \"Check the ledger\""));
        assert!(with.contains("\"correct_answer\": \"B\""));
    }

    #[tokio::test]
    async fn test_grade_parses_report() {
        let reply = r#"```json
{"results": [
  {"question_number": "1", "student_answer": "B", "correct_answer": "B", "is_correct": true, "marks_awarded": 2, "marks_available": 2, "feedback": "Correct!"}
], "total_marks_awarded": 20, "total_marks_available": 50, "percentage": 40.0, "grade": "Pass", "overall_feedback": "Solid."}
```"#;
        let model = Arc::new(ScriptedModel::replying([reply]));
        let report = grader(model.clone(), true)
            .grade(&answers(), &solutions(), Some("1. What is audit?"))
            .await
            .unwrap();

        assert_eq!(model.request_count(), 1);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.score_line(), "20 / 50");
        assert_eq!(report.grade_label(), "Pass");
    }

    #[tokio::test]
    async fn test_numeric_grade_and_list_answers_are_accepted() {
        let reply = r#"{"results": [
  {"question_number": 1, "student_answer": ["A", "C"], "correct_answer": ["A", "D"], "is_correct": false, "marks_awarded": 1, "marks_available": 2, "feedback": {"note": "half right"}}
], "total_marks_awarded": 1, "total_marks_available": 2, "percentage": 50, "grade": 7, "overall_feedback": ["Revise MCQs"]}"#;
        let report = grader(Arc::new(ScriptedModel::replying([reply])), true)
            .grade(&answers(), &solutions(), None)
            .await
            .unwrap();

        assert_eq!(report.results[0].student_answer, "A, C");
        assert_eq!(report.results[0].correct_answer, "A, D");
        assert_eq!(report.results[0].feedback, r#"{"note":"half right"}"#);
        assert_eq!(report.grade_label(), "7");
        assert_eq!(report.overall_feedback, "Revise MCQs");
        assert_eq!(report.score_line(), "1 / 2");
    }

    #[tokio::test]
    async fn test_invariants_are_applied_when_enabled() {
        let reply = r#"{"results": [{"question_number": "1", "marks_awarded": 5, "marks_available": 2}],
            "total_marks_awarded": 2, "total_marks_available": 4, "percentage": 90}"#;

        let enforced = grader(Arc::new(ScriptedModel::replying([reply])), true)
            .grade(&answers(), &solutions(), None)
            .await
            .unwrap();
        assert_eq!(enforced.results[0].marks_awarded, 2.0);
        assert!((enforced.percentage - 50.0).abs() < 1e-9);

        let trusted = grader(Arc::new(ScriptedModel::replying([reply])), false)
            .grade(&answers(), &solutions(), None)
            .await
            .unwrap();
        assert_eq!(trusted.results[0].marks_awarded, 5.0);
        assert_eq!(trusted.percentage, 90.0);
    }

    #[tokio::test]
    async fn test_unparseable_output_is_fatal() {
        let model = Arc::new(ScriptedModel::replying(["The student did well overall."]));
        let err = grader(model, true)
            .grade(&answers(), &solutions(), None)
            .await
            .unwrap_err();
        assert!(err.is_response_format());
    }
}
