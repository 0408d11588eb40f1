pub mod answer;
pub mod artifact;
pub mod grading;
pub mod lenient;
pub mod page;
pub mod solution;

pub use answer::{AnswerRecord, AnswerType, PagesProcessed, Transcription};
pub use artifact::PipelineArtifact;
pub use grading::{GradingReport, GradingResult, MarkStatus};
pub use page::{render_document, PageText};
pub use solution::{SolutionKey, SolutionRecord};
