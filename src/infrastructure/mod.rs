//! 基础设施层
//!
//! 持有外部工具（pdftoppm / tesseract）和本地文件系统，只暴露能力，
//! 不认识答案、标准答案或评分。

pub mod files;
pub mod ocr_engine;
pub mod rasterizer;

pub use ocr_engine::{OcrEngine, TesseractCli};
pub use rasterizer::{PageImage, PdfRasterizer, PdftoppmRasterizer};
