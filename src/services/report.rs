//! 报告生成 - 业务能力层
//!
//! 纯格式化：评分结果 → 可读报告；同时写出汇总 JSON

use std::path::PathBuf;

use crate::error::AppResult;
use crate::infrastructure::files;
use crate::models::PipelineArtifact;
use crate::utils::{format_marks, logging, take_chars};

const RULE_WIDTH: usize = 60;
const ANSWER_PREVIEW_CHARS: usize = 100;

/// 报告生成器
pub struct ReportGenerator {
    report_path: PathBuf,
    output_json_path: PathBuf,
}

impl ReportGenerator {
    pub fn new(report_path: impl Into<PathBuf>, output_json_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
            output_json_path: output_json_path.into(),
        }
    }

    /// 写出 `final_output.json` 和文本报告，返回报告内容
    pub async fn generate(&self, artifact: &PipelineArtifact) -> AppResult<String> {
        files::write_json(&self.output_json_path, artifact).await?;
        logging::log_saved("完整输出", &self.output_json_path);

        let report = render_report(artifact);
        files::write_text(&self.report_path, &report).await?;
        logging::log_saved("评分报告", &self.report_path);

        Ok(report)
    }
}

fn section(title: &str) -> String {
    let prefix = format!("\n── {} ", title);
    // 标题行总宽度固定为 60 个字符（不含开头换行）
    let used = prefix.chars().count() - 1;
    format!("{}{}", prefix, "─".repeat(RULE_WIDTH.saturating_sub(used)))
}

/// 渲染文本报告
pub fn render_report(artifact: &PipelineArtifact) -> String {
    let extraction = &artifact.extraction;
    let grading = &artifact.grading;
    let rule = "=".repeat(RULE_WIDTH);

    let mut lines = vec![
        rule.clone(),
        "         PAPER CORRECTION REPORT".to_string(),
        rule.clone(),
        format!(
            "\nSource: {}",
            extraction.source_pdf.as_deref().unwrap_or("N/A")
        ),
        format!(
            "Questions extracted: {}",
            extraction.total_questions_found.unwrap_or(0)
        ),
        section("SCORE SUMMARY"),
        format!("  Total Marks : {}", grading.score_line()),
        format!("  Percentage  : {:.1}%", grading.percentage),
        format!("  Grade       : {}", grading.grade_label()),
        section("OVERALL FEEDBACK"),
        format!("  {}", grading.overall_feedback),
        section("QUESTION-WISE RESULTS"),
    ];

    for result in &grading.results {
        lines.push(format!(
            "\n  Q{} [{}] {}/{} marks",
            result.question_number,
            result.status().glyph(),
            format_marks(result.marks_awarded),
            format_marks(result.marks_available)
        ));
        lines.push(format!(
            "  Student : {}",
            take_chars(&result.student_answer, ANSWER_PREVIEW_CHARS)
        ));
        lines.push(format!(
            "  Correct : {}",
            take_chars(&result.correct_answer, ANSWER_PREVIEW_CHARS)
        ));
        lines.push(format!("  Feedback: {}", result.feedback));
    }
    lines.push(format!("\n{}", rule));

    lines.join("\n")
}
