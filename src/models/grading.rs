use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::lenient;
use crate::utils::format_marks;

/// 单题评分结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    #[serde(default, deserialize_with = "lenient::text")]
    pub question_number: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub student_answer: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub correct_answer: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_correct: bool,
    #[serde(default, deserialize_with = "lenient::marks")]
    pub marks_awarded: f64,
    #[serde(default, deserialize_with = "lenient::marks")]
    pub marks_available: f64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub feedback: String,
}

/// 单题得分状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStatus {
    /// 完全正确
    Full,
    /// 部分得分
    Partial,
    /// 零分
    Zero,
}

impl MarkStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            MarkStatus::Full => "✓",
            MarkStatus::Partial => "~",
            MarkStatus::Zero => "✗",
        }
    }
}

impl GradingResult {
    pub fn status(&self) -> MarkStatus {
        if self.is_correct {
            MarkStatus::Full
        } else if self.marks_awarded > 0.0 {
            MarkStatus::Partial
        } else {
            MarkStatus::Zero
        }
    }
}

/// 评分报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingReport {
    #[serde(default)]
    pub results: Vec<GradingResult>,
    #[serde(default, deserialize_with = "lenient::marks")]
    pub total_marks_awarded: f64,
    #[serde(default, deserialize_with = "lenient::marks")]
    pub total_marks_available: f64,
    #[serde(default, deserialize_with = "lenient::marks")]
    pub percentage: f64,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub overall_feedback: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GradingReport {
    /// 在本地修正模型给出的分数
    ///
    /// - 单题得分限制在 `[0, marks_available]`（分值大于 0 时）
    /// - 总分可用时按 `awarded / available` 重新计算百分比
    ///
    /// 返回修正的次数
    pub fn enforce_marks_invariants(&mut self) -> usize {
        let mut corrections = 0;

        for result in &mut self.results {
            if result.marks_available > 0.0 && result.marks_awarded > result.marks_available {
                warn!(
                    "Q{} 得分 {} 超过满分 {}，已修正",
                    result.question_number,
                    format_marks(result.marks_awarded),
                    format_marks(result.marks_available)
                );
                result.marks_awarded = result.marks_available;
                corrections += 1;
            }
            if result.marks_awarded < 0.0 {
                warn!("Q{} 得分为负数，已修正为 0", result.question_number);
                result.marks_awarded = 0.0;
                corrections += 1;
            }
        }

        if self.total_marks_available > 0.0 {
            let expected = self.total_marks_awarded / self.total_marks_available * 100.0;
            if (expected - self.percentage).abs() > 0.05 {
                warn!(
                    "百分比 {:.1}% 与总分 {}/{} 不一致，已修正为 {:.1}%",
                    self.percentage,
                    format_marks(self.total_marks_awarded),
                    format_marks(self.total_marks_available),
                    expected
                );
                self.percentage = expected;
                corrections += 1;
            }
        }

        let summed: f64 = self.results.iter().map(|r| r.marks_awarded).sum();
        if !self.results.is_empty() && (summed - self.total_marks_awarded).abs() > 1e-6 {
            // 总分以模型给出的为准，只记录差异
            warn!(
                "各题得分之和 {} 与总得分 {} 不一致",
                format_marks(summed),
                format_marks(self.total_marks_awarded)
            );
        }

        corrections
    }

    /// 分数摘要，例如 `20 / 50`
    pub fn score_line(&self) -> String {
        format!(
            "{} / {}",
            format_marks(self.total_marks_awarded),
            format_marks(self.total_marks_available)
        )
    }

    pub fn grade_label(&self) -> &str {
        self.grade.as_deref().unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(awarded: f64, available: f64, correct: bool) -> GradingResult {
        GradingResult {
            question_number: "1".to_string(),
            is_correct: correct,
            marks_awarded: awarded,
            marks_available: available,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_glyphs() {
        assert_eq!(result(2.0, 2.0, true).status().glyph(), "✓");
        assert_eq!(result(1.0, 4.0, false).status().glyph(), "~");
        assert_eq!(result(0.0, 4.0, false).status().glyph(), "✗");
    }

    #[test]
    fn test_lenient_report_parsing() {
        let report: GradingReport = serde_json::from_value(json!({
            "results": [{"question_number": 3, "is_correct": "true", "marks_awarded": "2", "marks_available": 2}],
            "total_marks_awarded": 2,
            "total_marks_available": 2,
            "percentage": "100%",
            "grade": "Distinction"
        }))
        .unwrap();
        assert_eq!(report.results[0].question_number, "3");
        assert!(report.results[0].is_correct);
        assert_eq!(report.percentage, 100.0);
        assert_eq!(report.overall_feedback, "");
    }

    #[test]
    fn test_report_accepts_non_string_text_fields() {
        let raw = r#"{
            "results": [{
                "question_number": "4",
                "student_answer": ["A", "C"],
                "correct_answer": {"a": "A", "b": "D"},
                "is_correct": false,
                "marks_awarded": 1,
                "marks_available": 2,
                "feedback": ["first part right", "second part wrong"]
            }],
            "total_marks_awarded": 1,
            "total_marks_available": 2,
            "percentage": 50,
            "grade": 7,
            "overall_feedback": {"strengths": "MCQ"}
        }"#;
        let report: GradingReport = serde_json::from_str(raw).unwrap();

        let q = &report.results[0];
        assert_eq!(q.student_answer, "A, C");
        assert_eq!(q.correct_answer, r#"{"a":"A","b":"D"}"#);
        assert_eq!(q.feedback, "first part right, second part wrong");
        assert_eq!(report.grade.as_deref(), Some("7"));
        assert_eq!(report.grade_label(), "7");
        assert_eq!(report.overall_feedback, r#"{"strengths":"MCQ"}"#);
        assert!(report.extra.is_empty());
    }

    #[test]
    fn test_null_grade_reads_as_missing() {
        let report: GradingReport = serde_json::from_str(r#"{"results": [], "grade": null}"#).unwrap();
        assert_eq!(report.grade, None);
        assert_eq!(report.grade_label(), "N/A");
    }

    #[test]
    fn test_enforce_clamps_awarded_marks() {
        let mut report = GradingReport {
            results: vec![result(5.0, 2.0, true), result(-1.0, 3.0, false)],
            total_marks_awarded: 2.0,
            total_marks_available: 5.0,
            percentage: 40.0,
            ..Default::default()
        };
        assert_eq!(report.enforce_marks_invariants(), 2);
        assert_eq!(report.results[0].marks_awarded, 2.0);
        assert_eq!(report.results[1].marks_awarded, 0.0);
    }

    #[test]
    fn test_enforce_recomputes_percentage() {
        let mut report = GradingReport {
            total_marks_awarded: 20.0,
            total_marks_available: 50.0,
            percentage: 75.0,
            ..Default::default()
        };
        assert_eq!(report.enforce_marks_invariants(), 1);
        assert!((report.percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_enforce_tolerates_rounded_percentage() {
        // 模型常把 2/3 写成 66.67，差值在 0.05 以内时不改动
        let mut report = GradingReport {
            total_marks_awarded: 2.0,
            total_marks_available: 3.0,
            percentage: 66.67,
            ..Default::default()
        };
        assert_eq!(report.enforce_marks_invariants(), 0);
        assert_eq!(report.percentage, 66.67);

        report.percentage = 66.5;
        assert_eq!(report.enforce_marks_invariants(), 1);
        assert!((report.percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_enforce_keeps_percentage_without_totals() {
        let mut report = GradingReport {
            percentage: 80.0,
            ..Default::default()
        };
        assert_eq!(report.enforce_marks_invariants(), 0);
        assert_eq!(report.percentage, 80.0);
    }

    #[test]
    fn test_enforce_leaves_consistent_report_alone() {
        let mut report = GradingReport {
            results: vec![result(20.0, 50.0, false)],
            total_marks_awarded: 20.0,
            total_marks_available: 50.0,
            percentage: 40.0,
            ..Default::default()
        };
        assert_eq!(report.enforce_marks_invariants(), 0);
    }

    #[test]
    fn test_score_line() {
        let report = GradingReport {
            total_marks_awarded: 20.0,
            total_marks_available: 50.0,
            ..Default::default()
        };
        assert_eq!(report.score_line(), "20 / 50");
        assert_eq!(report.grade_label(), "N/A");
    }
}
