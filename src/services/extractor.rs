//! 印刷文本提取 - 业务能力层
//!
//! PDF → 逐页图片 → OCR → 带页码标记的纯文本文件

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppResult;
use crate::infrastructure::{files, OcrEngine, PdfRasterizer};
use crate::models::{render_document, PageText};
use crate::utils::logging;

/// 印刷文本提取器
pub struct PrintedTextExtractor {
    rasterizer: Arc<dyn PdfRasterizer>,
    ocr: Arc<dyn OcrEngine>,
}

impl PrintedTextExtractor {
    pub fn new(rasterizer: Arc<dyn PdfRasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { rasterizer, ocr }
    }

    /// 提取 PDF 中的印刷文本并写入 `output_path`
    ///
    /// 输出内容为每页 `--- Page N ---\n<text>\n\n` 的拼接，返回完整文本。
    /// PDF 无法打开或渲染时直接返回错误，不写任何输出。
    pub async fn extract(&self, pdf_path: &Path, output_path: &Path) -> AppResult<String> {
        info!("正在从 {} 提取文本...", pdf_path.display());

        let images = self.rasterizer.rasterize(pdf_path).await?;
        let total = images.len();

        let mut pages = Vec::with_capacity(total);
        for (position, image) in images.iter().enumerate() {
            debug!("{} 识别第 {}/{} 页", self.ocr.name(), position + 1, total);
            let text = self.ocr.recognize(image).await?;
            pages.push(PageText::new(position + 1, text));
        }

        let full_text = render_document(&pages);
        files::write_text(output_path, &full_text).await?;
        logging::log_saved(&format!("{} 页文本", total), output_path);

        Ok(full_text)
    }
}
