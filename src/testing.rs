//! 单元测试共用的替身实现

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::{GenerativeModel, Part, RemoteFile};
use crate::error::{AppResult, ModelError};
use crate::infrastructure::{OcrEngine, PageImage, PdfRasterizer};

/// 按顺序返回预设回复的模型
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<AppResult<String>>>,
    pub requests: Mutex<Vec<Vec<Part>>>,
    pub uploads: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl ScriptedModel {
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = AppResult<String>>,
    {
        Self {
            replies: Mutex::new(results.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            uploads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// 第 `index` 次请求中的全部文本
    pub fn prompt(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index]
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.clone()),
                Part::File(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> AppResult<RemoteFile> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RemoteFile {
            name: format!("files/{n}"),
            uri: format!("mem://{}", path.display()),
            mime_type: mime_type.to_string(),
        })
    }

    async fn delete_file(&self, _file: &RemoteFile) -> AppResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate(&self, parts: &[Part]) -> AppResult<String> {
        self.requests.lock().unwrap().push(parts.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ModelError::EmptyResponse {
                    model: "scripted".to_string(),
                }
                .into())
            })
    }
}

/// 生成固定页数的空白页
pub(crate) struct BlankPages(pub usize);

#[async_trait]
impl PdfRasterizer for BlankPages {
    async fn rasterize(&self, _pdf_path: &Path) -> AppResult<Vec<PageImage>> {
        Ok((1..=self.0)
            .map(|index| PageImage {
                index,
                png: vec![index as u8],
            })
            .collect())
    }
}

/// 把图片的第一个字节当作页码"识别"出来
pub(crate) struct EchoOcr;

#[async_trait]
impl OcrEngine for EchoOcr {
    fn name(&self) -> &str {
        "echo"
    }

    async fn recognize(&self, page: &PageImage) -> AppResult<String> {
        Ok(format!("text of page {}", page.png.first().copied().unwrap_or_default()))
    }
}
