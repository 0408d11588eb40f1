//! 业务能力层（Services）
//!
//! 每个服务只做一件事，彼此之间不直接调用，由编排层串联：
//!
//! ```text
//! extractor        PDF → OCR 文本（question.txt / solutions.txt）
//! transcriber      手写 PDF → Transcription
//! solution_parser  solutions.txt → SolutionKey
//! grader           Transcription + SolutionKey → GradingReport
//! report           PipelineArtifact → grading_report.txt + final_output.json
//! ```

pub mod extractor;
pub mod grader;
pub mod json_repair;
pub mod report;
pub mod solution_parser;
pub mod transcriber;

pub use extractor::PrintedTextExtractor;
pub use grader::Grader;
pub use json_repair::{parse_model_json, JsonOutcome};
pub use report::{render_report, ReportGenerator};
pub use solution_parser::SolutionParser;
pub use transcriber::HandwritingTranscriber;
