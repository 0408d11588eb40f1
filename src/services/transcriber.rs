//! 手写答案转写 - 业务能力层
//!
//! 整份 PDF 上传后只发一次生成请求，所有页面一起识别。
//! 模型输出无法解析时降级为一条 raw 答案，转写永远不会因为输出格式失败。

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{GenerativeModel, Part, UploadedFile};
use crate::error::AppResult;
use crate::infrastructure::files;
use crate::models::Transcription;
use crate::services::json_repair::{parse_model_json, JsonOutcome};
use crate::utils::logging;

const PDF_MIME: &str = "application/pdf";

/// 转写提示词
pub const TRANSCRIPTION_PROMPT: &str = r#"You are an expert handwriting recognition system for exam answer sheets.

Process ALL pages of this PDF and transcribe ALL handwritten content.

Rules:
- Transcribe EXACTLY what is written; preserve the student's words verbatim
- For MCQ answers: detect patterns like "1. B", "2. C", "3. A" etc.
- For written answers: transcribe the full handwritten text faithfully
- If handwriting is unclear, note [unclear]
- Group content by question number
- Do NOT correct grammar or spelling, just transcribe
- Ignore printed text and only extract handwritten content
- Process ALL pages, not just the first one

Return ALL handwritten answers as JSON:
{
  "answers": [
    {"question_number": "1", "answer_text": "B", "answer_type": "mcq"},
    {"question_number": "2", "answer_text": "The auditor should verify...", "answer_type": "written"}
  ],
  "total_questions_found": 10,
  "pages_processed": 9,
  "extraction_notes": "Any notes about handwriting quality"
}

Return ONLY valid JSON. No markdown, no explanation."#;

/// 手写答案转写器
pub struct HandwritingTranscriber {
    model: Arc<dyn GenerativeModel>,
}

impl HandwritingTranscriber {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// 转写手写答案 PDF，写出 JSON 和文本两个文件
    pub async fn transcribe(
        &self,
        pdf_path: &Path,
        json_path: &Path,
        text_path: &Path,
    ) -> AppResult<Transcription> {
        info!("[1/3] 上传 PDF: {}", pdf_path.display());
        let upload = UploadedFile::upload(Arc::clone(&self.model), pdf_path, PDF_MIME).await?;

        info!("[2/3] 识别手写内容（整份 PDF 一次请求）...");
        let response = self
            .model
            .generate(&[upload.as_part(), Part::Text(TRANSCRIPTION_PROMPT.to_string())])
            .await;
        upload.release().await;
        let raw = response?;

        let outcome = interpret_response(&raw);
        info!("转写结果: {}", outcome.label());
        let mut result = outcome.into_result()?;

        let source = pdf_path.display().to_string();
        result.source_pdf = Some(source.clone());
        result.api_calls_used = Some(1);

        info!(
            "  → 共找到 {} 道题的答案，处理了 {} 页",
            result.questions_found(),
            result.pages_label()
        );
        if let Some(notes) = result.extraction_notes.as_deref().filter(|n| !n.is_empty()) {
            warn!("  ⚠ 备注: {}", notes);
        }

        files::write_json(json_path, &result).await?;
        logging::log_saved("[3/3] 转写 JSON", json_path);
        files::write_text(text_path, &render_transcript(&result, &source)).await?;
        logging::log_saved("转写文本", text_path);

        Ok(result)
    }
}

/// 解析模型输出，失败时降级
pub fn interpret_response(raw: &str) -> JsonOutcome<Transcription> {
    let raw = raw.trim();
    parse_model_json::<Transcription>(raw).degrade_with(|_| Transcription::degraded(raw))
}

/// 可读文本格式的转写结果
pub fn render_transcript(result: &Transcription, source: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Handwritten Answers from: {}\n", source));
    out.push_str(&format!("# Questions found: {}\n", result.questions_found()));
    out.push_str(&format!(
        "# Notes: {}\n\n",
        result.extraction_notes.as_deref().unwrap_or("Clean extraction")
    ));
    for answer in &result.answers {
        out.push_str(&format!(
            "Q{}. [{}]\n{}\n\n",
            answer.question_number,
            answer.answer_type.as_str().to_uppercase(),
            answer.answer_text
        ));
    }
    out
}
