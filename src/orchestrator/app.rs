//! 应用入口 - 编排层
//!
//! 持有配置和外部资源（模型客户端、栅格化工具、OCR 引擎），
//! 每个子命令对应一个方法。模型客户端只在需要时创建，
//! 因此只做 OCR 提取时不要求配置 API key。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::clients::{build_model, GenerativeModel};
use crate::config::Config;
use crate::infrastructure::{files, OcrEngine, PdfRasterizer, PdftoppmRasterizer, TesseractCli};
use crate::models::{PipelineArtifact, SolutionKey, Transcription};
use crate::orchestrator::Pipeline;
use crate::services::{render_report, HandwritingTranscriber, PrintedTextExtractor, SolutionParser};
use crate::utils::{format_marks, logging};

/// 应用主结构
pub struct App {
    config: Config,
    rasterizer: Arc<dyn PdfRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    model: Option<Arc<dyn GenerativeModel>>,
}

impl App {
    /// 初始化应用
    ///
    /// `requires_model` 为 true 时校验 API key 并创建模型客户端，
    /// 配置有问题时在任何网络请求之前返回错误。
    pub fn initialize(config: Config, requires_model: bool) -> Result<Self> {
        config.validate(requires_model)?;

        let rasterizer: Arc<dyn PdfRasterizer> = Arc::new(PdftoppmRasterizer::new(config.ocr_dpi));
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractCli::new(config.ocr_language.clone()));
        let model = if requires_model {
            Some(build_model(&config, Arc::clone(&rasterizer))?)
        } else {
            None
        };

        Ok(Self {
            config,
            rasterizer,
            ocr,
            model,
        })
    }

    /// 使用外部提供的模型客户端（测试或嵌入使用）
    pub fn with_model(config: Config, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            rasterizer: Arc::new(PdftoppmRasterizer::new(config.ocr_dpi)),
            ocr: Arc::new(TesseractCli::new(config.ocr_language.clone())),
            config,
            model: Some(model),
        }
    }

    /// 替换 OCR 相关组件
    pub fn with_ocr(mut self, rasterizer: Arc<dyn PdfRasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        self.rasterizer = rasterizer;
        self.ocr = ocr;
        self
    }

    fn model(&self) -> Result<Arc<dyn GenerativeModel>> {
        self.model
            .clone()
            .context("模型客户端未初始化（该命令需要 API key）")
    }

    /// 提取单个 PDF 的印刷文本
    pub async fn extract(&self, pdf_path: &Path, output_path: &Path) -> Result<String> {
        let extractor = PrintedTextExtractor::new(Arc::clone(&self.rasterizer), Arc::clone(&self.ocr));
        extractor
            .extract(pdf_path, output_path)
            .await
            .with_context(|| format!("提取文本失败: {}", pdf_path.display()))
    }

    /// 提取题目和标准答案两个 PDF
    pub async fn extract_all(&self) -> Result<()> {
        logging::log_step("Extract", "提取题目文本...");
        self.extract(&self.config.questions_pdf, &self.config.questions_txt)
            .await?;
        logging::log_step("Extract", "提取标准答案文本...");
        self.extract(&self.config.solutions_pdf, &self.config.solutions_txt)
            .await?;
        logging::log_finished(&[
            self.config.questions_txt.as_path(),
            self.config.solutions_txt.as_path(),
        ]);
        Ok(())
    }

    /// 只转写手写答案
    pub async fn transcribe(&self) -> Result<Transcription> {
        logging::log_startup("手写答案转写（整份 PDF 一次请求）", self.model()?.model_name());
        let transcriber = HandwritingTranscriber::new(self.model()?);
        let result = transcriber
            .transcribe(
                &self.config.handwritten_pdf,
                &self.config.transcription_json,
                &self.config.transcription_txt,
            )
            .await
            .with_context(|| format!("转写失败: {}", self.config.handwritten_pdf.display()))?;
        info!(
            "✓ 完成，{} 页只用了 1 次 API 调用",
            result.pages_label()
        );
        Ok(result)
    }

    /// 只解析标准答案，写出 `solutions.json`
    pub async fn parse_solutions(&self) -> Result<SolutionKey> {
        logging::log_step("Step 2", "解析标准答案...");
        let parser = SolutionParser::new(self.model()?);
        let key = parser
            .parse_file(&self.config.solutions_txt)
            .await
            .with_context(|| format!("解析标准答案失败: {}", self.config.solutions_txt.display()))?;
        files::write_json(&self.config.solutions_json, &key).await?;
        logging::log_saved("标准答案 JSON", &self.config.solutions_json);
        Ok(key)
    }

    /// 运行完整流水线
    ///
    /// `with_extraction` 为 true 时先对题目和标准答案 PDF 做 OCR
    pub async fn run(&self, with_extraction: bool) -> Result<PipelineArtifact> {
        logging::log_startup("试卷批改 - 完整流水线", self.model()?.model_name());
        if with_extraction {
            self.extract_all().await?;
        }
        Pipeline::new(&self.config, self.model()?).run().await
    }

    /// 根据已有的 `final_output.json` 重新生成报告
    pub async fn report(&self) -> Result<String> {
        let path = &self.config.final_output_json;
        let artifact: PipelineArtifact = files::read_json(path)
            .await
            .with_context(|| format!("无法读取 {}", path.display()))?;
        info!(
            "已读取评分结果: {} ({} 道题)",
            format_marks(artifact.grading.total_marks_awarded),
            artifact.grading.results.len()
        );

        // final_output.json 保持不变，只重写报告
        let report = render_report(&artifact);
        files::write_text(&self.config.report_txt, &report).await?;
        logging::log_saved("评分报告", &self.config.report_txt);

        println!("{}", report);
        Ok(report)
    }
}
