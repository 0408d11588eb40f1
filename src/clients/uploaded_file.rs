//! 上传文件的作用域管理
//!
//! 上传即获取资源，释放时尽力删除远端文件。删除失败只记录日志，不影响流程。
//! 未显式释放就被 drop（例如提前 `?` 返回）时，在当前 tokio 运行时上补发删除。

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{GenerativeModel, Part, RemoteFile};
use crate::error::AppResult;

/// 已上传文件的守卫
pub struct UploadedFile {
    model: Arc<dyn GenerativeModel>,
    file: RemoteFile,
    released: bool,
}

impl UploadedFile {
    /// 上传本地文件
    pub async fn upload(
        model: Arc<dyn GenerativeModel>,
        path: &Path,
        mime_type: &str,
    ) -> AppResult<Self> {
        let file = model.upload_file(path, mime_type).await?;
        debug!("已上传: {}", file.name);
        Ok(Self {
            model,
            file,
            released: false,
        })
    }

    /// 作为生成请求的一部分
    pub fn as_part(&self) -> Part {
        Part::File(self.file.clone())
    }

    /// 删除远端文件，失败时只记录警告
    pub async fn release(mut self) {
        self.released = true;
        match self.model.delete_file(&self.file).await {
            Ok(()) => debug!("已删除上传文件: {}", self.file.name),
            Err(e) => warn!("删除上传文件 {} 失败（已忽略）: {}", self.file.name, e),
        }
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let model = Arc::clone(&self.model);
        let file = self.file.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = model.delete_file(&file).await {
                        warn!("删除上传文件 {} 失败（已忽略）: {}", file.name, e);
                    }
                });
            }
            Err(_) => warn!("上传文件 {} 未能删除：没有可用的运行时", file.name),
        }
    }
}
