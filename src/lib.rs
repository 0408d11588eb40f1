//! # Exam Grader
//!
//! 手写试卷自动批改：OCR 提取印刷题目和标准答案，视觉模型转写手写答案，
//! 模型评分后生成报告
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - pdftoppm 栅格化、tesseract OCR、阶段间文件读写
//! - `clients/` - 托管生成模型（Gemini REST / OpenAI 兼容接口），上传文件守卫
//!
//! ### ② 数据层（Models）
//! - `models/` - 转写结果、标准答案、评分报告，宽松解析模型输出
//!
//! ### ③ 业务能力层（Services）
//! - `PrintedTextExtractor` - PDF → 带页码标记的文本
//! - `HandwritingTranscriber` - 手写 PDF → 结构化答案（可降级）
//! - `SolutionParser` - 标准答案文本 → 结构化答案
//! - `Grader` - 答案 + 标准答案 → 评分报告
//! - `ReportGenerator` - 评分报告 → 文本报告 + 汇总 JSON
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 子命令入口，持有资源
//! - `orchestrator/pipeline` - 完整评分流水线，严格顺序执行
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use clients::{GenerativeModel, Part, RemoteFile};
pub use config::{Config, ConfigOverrides};
pub use error::{AppError, AppResult};
pub use models::{GradingReport, PipelineArtifact, SolutionKey, Transcription};
pub use orchestrator::{App, Pipeline};
