//! 完整评分流水线 - 编排层
//!
//! ## 流程
//!
//! 1. 转写手写答案（必须成功）
//! 2. 解析标准答案（`solutions.txt` 不存在时使用空答案并警告）
//! 3. 评分（`question.txt` 存在时作为题目上下文）
//! 4. 写出 `final_output.json` 和 `grading_report.txt`，并打印报告
//!
//! 各阶段严格顺序执行，任何阶段失败都会终止流水线，不做重试。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::GenerativeModel;
use crate::config::Config;
use crate::infrastructure::files;
use crate::models::{PipelineArtifact, SolutionKey};
use crate::services::{Grader, HandwritingTranscriber, ReportGenerator, SolutionParser};
use crate::utils::logging;

/// 评分流水线
pub struct Pipeline {
    config: Config,
    transcriber: HandwritingTranscriber,
    solution_parser: SolutionParser,
    grader: Grader,
    reporter: ReportGenerator,
}

impl Pipeline {
    pub fn new(config: &Config, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            config: config.clone(),
            transcriber: HandwritingTranscriber::new(Arc::clone(&model)),
            solution_parser: SolutionParser::new(Arc::clone(&model)),
            grader: Grader::new(model, config),
            reporter: ReportGenerator::new(&config.report_txt, &config.final_output_json),
        }
    }

    /// 运行完整流水线
    pub async fn run(&self) -> Result<PipelineArtifact> {
        logging::log_step("Step 1", "转写手写答案...");
        let extraction = self
            .transcriber
            .transcribe(
                &self.config.handwritten_pdf,
                &self.config.transcription_json,
                &self.config.transcription_txt,
            )
            .await
            .with_context(|| format!("转写失败: {}", self.config.handwritten_pdf.display()))?;

        let solutions = self.load_solutions().await?;
        if solutions.is_empty() {
            warn!("标准答案为空，评分时没有可对照的答案");
        }
        let questions_text = self.load_question_context().await?;

        logging::log_step("Step 3", "评分...");
        let grading = self
            .grader
            .grade(&extraction, &solutions, questions_text.as_deref())
            .await
            .context("评分失败")?;

        let artifact = PipelineArtifact::new(extraction, solutions, grading);

        logging::log_step("Step 4", "生成报告...");
        let report = self
            .reporter
            .generate(&artifact)
            .await
            .context("写出报告失败")?;

        println!("\n{}", "─".repeat(60));
        println!("{}", report);

        logging::log_finished(&[
            self.config.final_output_json.as_path(),
            self.config.report_txt.as_path(),
        ]);
        Ok(artifact)
    }

    /// 解析标准答案，文件不存在时返回空答案
    async fn load_solutions(&self) -> Result<SolutionKey> {
        let path = &self.config.solutions_txt;
        let Some(text) = files::read_optional_text(path).await? else {
            logging::log_missing_input("Step 2", path, "请先运行 extract 子命令");
            return Ok(SolutionKey::empty());
        };

        logging::log_step("Step 2", "解析标准答案...");
        self.solution_parser
            .parse_text(&text)
            .await
            .with_context(|| format!("解析标准答案失败: {}", path.display()))
    }

    /// 读取题目原文，不存在时不提供上下文
    async fn load_question_context(&self) -> Result<Option<String>> {
        let path: &Path = &self.config.questions_txt;
        let text = files::read_optional_text(path).await?;
        if text.is_none() {
            info!("未找到 {}，评分时不提供题目上下文", path.display());
        }
        Ok(text)
    }
}
