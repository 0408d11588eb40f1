use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 模型服务错误
    #[error("模型服务错误: {0}")]
    Model(#[from] ModelError),
    /// 印刷文本提取错误
    #[error("文本提取错误: {0}")]
    Extract(#[from] ExtractError),
    /// 模型输出格式错误
    #[error("响应格式错误: {0}")]
    ResponseFormat(#[from] ResponseFormatError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 配置错误
///
/// 启动时所有配置问题汇总为一个错误，而不是分散在各处检查
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("无法读取配置文件 ({path}): {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    /// 配置文件不是合法的 TOML
    #[error("无法解析配置文件 ({path}): {source}")]
    FileParse {
        path: String,
        source: toml::de::Error,
    },
    /// 配置校验失败
    #[error("{}", format_problems(.problems))]
    Invalid { problems: Vec<String> },
}

fn format_problems(problems: &[String]) -> String {
    let mut out = format!("发现 {} 个配置问题:", problems.len());
    for problem in problems {
        out.push_str("\n  - ");
        out.push_str(problem);
    }
    out
}

/// 模型服务错误
#[derive(Debug, Error)]
pub enum ModelError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务返回非成功状态码
    #[error("服务返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 服务返回内容为空
    #[error("模型返回内容为空 (模型: {model})")]
    EmptyResponse { model: String },
    /// 请求构建失败
    #[error("无法构建模型请求: {source}")]
    InvalidRequest {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 引用了不存在的上传文件
    #[error("上传文件不存在: {name}")]
    UnknownFile { name: String },
}

/// 印刷文本提取错误（栅格化 / OCR）
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 外部工具无法启动
    #[error("无法运行 {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        source: std::io::Error,
    },
    /// 外部工具执行失败
    #[error("{tool} 执行失败: {detail}")]
    ToolFailed { tool: String, detail: String },
    /// PDF 中没有可识别的页面
    #[error("PDF 没有可渲染的页面: {path}")]
    NoPages { path: String },
}

/// 模型输出无法解析为 JSON
///
/// 只保留原始输出的前 300 个字符用于诊断
#[derive(Debug, Clone, PartialEq, Error)]
#[error("无法将模型输出解析为 JSON ({reason}):\n{excerpt}")]
pub struct ResponseFormatError {
    pub reason: String,
    pub excerpt: String,
}

impl ResponseFormatError {
    pub const EXCERPT_CHARS: usize = 300;

    pub fn new(raw: &str, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            excerpt: raw.chars().take(Self::EXCERPT_CHARS).collect(),
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
    /// JSON 序列化 / 反序列化失败
    #[error("JSON 处理失败 ({path}): {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建模型请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Model(ModelError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return AppError::File(FileError::NotFound { path });
        }
        AppError::File(FileError::ReadFailed { path, source })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为模型输出格式错误
    pub fn is_response_format(&self) -> bool {
        matches!(self, AppError::ResponseFormat(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
