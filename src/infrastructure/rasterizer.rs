//! PDF 栅格化 - 基础设施层
//!
//! 把 PDF 的每一页渲染成 PNG，不关心后续是 OCR 还是交给视觉模型

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppError, AppResult, ExtractError, FileError};

/// 渲染后的单页图片
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 页码，从 1 开始
    pub index: usize,
    pub png: Vec<u8>,
}

/// PDF 栅格化能力
#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    /// 按页序返回所有页面图片
    async fn rasterize(&self, pdf_path: &Path) -> AppResult<Vec<PageImage>>;
}

/// 基于 poppler `pdftoppm` 命令行的实现
pub struct PdftoppmRasterizer {
    binary: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self {
            binary: "pdftoppm".to_string(),
            dpi,
        }
    }

    /// 使用自定义可执行文件路径
    pub fn with_binary(binary: impl Into<String>, dpi: u32) -> Self {
        Self {
            binary: binary.into(),
            dpi,
        }
    }
}

#[async_trait]
impl PdfRasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf_path: &Path) -> AppResult<Vec<PageImage>> {
        if !pdf_path.exists() {
            return Err(FileError::NotFound {
                path: pdf_path.display().to_string(),
            }
            .into());
        }

        let work_dir = tempfile::tempdir()
            .map_err(|e| AppError::file_write_failed(std::env::temp_dir().display().to_string(), e))?;
        let prefix = work_dir.path().join("page");

        debug!("pdftoppm 渲染 {} (dpi={})", pdf_path.display(), self.dpi);
        let output = Command::new(&self.binary)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|source| ExtractError::ToolUnavailable {
                tool: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::ToolFailed {
                tool: self.binary.clone(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let mut rendered: Vec<(usize, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(work_dir.path())
            .await
            .map_err(|e| AppError::file_read_failed(work_dir.path().display().to_string(), e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::file_read_failed(work_dir.path().display().to_string(), e))?
        {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                rendered.push((number, path));
            }
        }

        if rendered.is_empty() {
            return Err(ExtractError::NoPages {
                path: pdf_path.display().to_string(),
            }
            .into());
        }

        // pdftoppm 的文件名按页数补零（page-1 / page-01），只能按解析出的数字排序
        rendered.sort_by_key(|(number, _)| *number);

        let mut pages = Vec::with_capacity(rendered.len());
        for (position, (_, path)) in rendered.iter().enumerate() {
            let png = tokio::fs::read(path)
                .await
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
            pages.push(PageImage {
                index: position + 1,
                png,
            });
        }

        debug!("共渲染 {} 页", pages.len());
        Ok(pages)
    }
}

/// 从 `page-007.png` 中解析出 7
fn page_number(path: &Path) -> Option<usize> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('-')?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_parsing() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/page-2.ppm")), None);
        assert_eq!(page_number(Path::new("/tmp/x/notes.png")), None);
    }

    #[tokio::test]
    async fn test_missing_pdf_is_reported() {
        let rasterizer = PdftoppmRasterizer::new(200);
        let err = rasterizer
            .rasterize(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::File(FileError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("questions.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let rasterizer = PdftoppmRasterizer::with_binary("pdftoppm-not-installed", 200);
        let err = rasterizer.rasterize(&pdf).await.unwrap_err();
        match err {
            AppError::Extract(ExtractError::ToolUnavailable { tool, .. }) => {
                assert_eq!(tool, "pdftoppm-not-installed")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_binary_is_tool_failed() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("questions.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let rasterizer = PdftoppmRasterizer::with_binary("false", 200);
        let err = rasterizer.rasterize(&pdf).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Extract(ExtractError::ToolFailed { ref tool, .. }) if tool == "false"
        ));
    }
}
