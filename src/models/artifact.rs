use serde::{Deserialize, Serialize};

use super::{GradingReport, SolutionKey, Transcription};

/// 流水线最终产物：转写、标准答案、评分合并为一个 JSON 文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub extraction: Transcription,
    pub solutions: SolutionKey,
    pub grading: GradingReport,
}

impl PipelineArtifact {
    pub fn new(extraction: Transcription, solutions: SolutionKey, grading: GradingReport) -> Self {
        Self {
            extraction,
            solutions,
            grading,
        }
    }
}
