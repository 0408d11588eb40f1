//! 程序配置
//!
//! 加载顺序（后者覆盖前者）：
//! 1. 内置默认值
//! 2. 环境变量（`.env` 文件中的值不会覆盖已存在的环境变量）
//! 3. TOML 配置文件
//! 4. 命令行参数
//!
//! 所有问题在 [`Config::validate`] 中汇总成一个 [`ConfigError`]。

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件名（存在时自动加载）
pub const DEFAULT_CONFIG_FILE: &str = "exam-grader.toml";

/// `.env` 模板里的占位 key
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

/// 模型服务提供方
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Provider {
    /// Google Gemini REST API（支持文件上传）
    #[default]
    Gemini,
    /// 兼容 OpenAI 的 chat completions 服务
    OpenAi,
}

impl Provider {
    pub fn default_api_base(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openai" | "openai-compatible" => Ok(Provider::OpenAi),
            other => Err(format!("未知的模型提供方: {other} (可选: gemini, openai)")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 输入文件 ---
    pub questions_pdf: PathBuf,
    pub solutions_pdf: PathBuf,
    pub handwritten_pdf: PathBuf,
    // --- 中间产物 ---
    pub questions_txt: PathBuf,
    pub solutions_txt: PathBuf,
    pub transcription_json: PathBuf,
    pub transcription_txt: PathBuf,
    pub solutions_json: PathBuf,
    // --- 最终输出 ---
    pub final_output_json: PathBuf,
    pub report_txt: PathBuf,
    // --- 模型配置 ---
    pub provider: Provider,
    pub model_name: String,
    /// 为空时使用 provider 的默认地址
    pub api_base_url: Option<String>,
    /// 存放 API key 的环境变量名
    pub api_key_env: String,
    /// 解析后的 API key
    pub api_key: Option<String>,
    /// 仅 OpenAI 兼容服务使用
    pub max_output_tokens: u32,
    // --- OCR 配置 ---
    pub ocr_language: String,
    pub ocr_dpi: u32,
    // --- 评分配置 ---
    /// 题目上下文最多传给模型的字符数
    pub question_context_limit: usize,
    /// 是否在本地修正分数（见 DESIGN.md）
    pub enforce_marks_invariants: bool,
    // --- 其他 ---
    pub env_file: PathBuf,
    pub verbose_logging: bool,
    /// 加载阶段发现的问题，由 [`Config::validate`] 一并报告
    pub load_problems: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            questions_pdf: PathBuf::from("questions.pdf"),
            solutions_pdf: PathBuf::from("solutions.pdf"),
            handwritten_pdf: PathBuf::from("handwritten-ans.pdf"),
            questions_txt: PathBuf::from("question.txt"),
            solutions_txt: PathBuf::from("solutions.txt"),
            transcription_json: PathBuf::from("handwritten-ans.json"),
            transcription_txt: PathBuf::from("handwritten-ans.txt"),
            solutions_json: PathBuf::from("solutions.json"),
            final_output_json: PathBuf::from("final_output.json"),
            report_txt: PathBuf::from("grading_report.txt"),
            provider: Provider::Gemini,
            model_name: "gemini-2.5-flash-lite".to_string(),
            api_base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            max_output_tokens: 8192,
            ocr_language: "eng".to_string(),
            ocr_dpi: 200,
            question_context_limit: 3000,
            enforce_marks_invariants: true,
            env_file: PathBuf::from(".env"),
            verbose_logging: false,
            load_problems: Vec::new(),
        }
    }
}

/// 命令行层面的覆盖项，优先级最高
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub api_base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub handwritten_pdf: Option<PathBuf>,
    pub questions_txt: Option<PathBuf>,
    pub solutions_txt: Option<PathBuf>,
    pub final_output_json: Option<PathBuf>,
    pub report_txt: Option<PathBuf>,
    pub verbose_logging: bool,
}

/// TOML 配置文件结构，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub questions_pdf: Option<PathBuf>,
    pub solutions_pdf: Option<PathBuf>,
    pub handwritten_pdf: Option<PathBuf>,
    pub questions_txt: Option<PathBuf>,
    pub solutions_txt: Option<PathBuf>,
    pub transcription_json: Option<PathBuf>,
    pub transcription_txt: Option<PathBuf>,
    pub solutions_json: Option<PathBuf>,
    pub final_output_json: Option<PathBuf>,
    pub report_txt: Option<PathBuf>,
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub api_base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub api_key: Option<String>,
    pub max_output_tokens: Option<u32>,
    pub ocr_language: Option<String>,
    pub ocr_dpi: Option<u32>,
    pub question_context_limit: Option<usize>,
    pub enforce_marks_invariants: Option<bool>,
    pub verbose_logging: Option<bool>,
}

impl Config {
    /// 按优先级加载配置（不做校验）
    ///
    /// 值无法解析时只记录问题，留给 [`Config::validate`] 统一报告；
    /// 只有配置文件本身读取或解析失败才直接返回错误
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut problems = Vec::new();

        let explicit_env = overrides.env_file.is_some();
        let env_file = overrides.env_file.clone().unwrap_or_else(|| config.env_file.clone());
        load_env_file(&env_file, explicit_env, &mut problems);
        config.env_file = env_file;

        config.apply_env(|key| std::env::var(key).ok(), &mut problems);

        match &overrides.config_file {
            Some(path) => config.apply_file(&load_file_config(path)?, &mut problems),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    config.apply_file(&load_file_config(default_path)?, &mut problems);
                }
            }
        }

        config.apply_overrides(overrides, &mut problems);

        // 显式配置的 key 优先，其次读取环境变量
        if config.api_key.is_none() {
            config.api_key = std::env::var(&config.api_key_env).ok();
        }

        config.load_problems = problems;
        Ok(config)
    }

    /// 应用环境变量
    ///
    /// `lookup` 便于测试时替换真实的进程环境
    pub fn apply_env<F>(&mut self, lookup: F, problems: &mut Vec<String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EXAM_GRADER_PROVIDER") {
            match v.parse() {
                Ok(provider) => self.provider = provider,
                Err(e) => problems.push(format!("EXAM_GRADER_PROVIDER: {e}")),
            }
        }
        if let Some(v) = lookup("EXAM_GRADER_MODEL") {
            self.model_name = v;
        }
        if let Some(v) = lookup("EXAM_GRADER_API_BASE") {
            self.api_base_url = Some(v);
        }
        if let Some(v) = lookup("EXAM_GRADER_API_KEY_ENV") {
            self.api_key_env = v;
        }
        if let Some(v) = lookup("EXAM_GRADER_OCR_LANGUAGE") {
            self.ocr_language = v;
        }
        parse_env(&lookup, "EXAM_GRADER_OCR_DPI", &mut self.ocr_dpi, problems);
        parse_env(&lookup, "EXAM_GRADER_MAX_OUTPUT_TOKENS", &mut self.max_output_tokens, problems);
        parse_env(&lookup, "EXAM_GRADER_CONTEXT_LIMIT", &mut self.question_context_limit, problems);
        parse_env(&lookup, "EXAM_GRADER_ENFORCE_MARKS", &mut self.enforce_marks_invariants, problems);
        parse_env(&lookup, "VERBOSE_LOGGING", &mut self.verbose_logging, problems);
    }

    /// 应用配置文件
    pub fn apply_file(&mut self, file: &FileConfig, problems: &mut Vec<String>) {
        set_if(&mut self.questions_pdf, &file.questions_pdf);
        set_if(&mut self.solutions_pdf, &file.solutions_pdf);
        set_if(&mut self.handwritten_pdf, &file.handwritten_pdf);
        set_if(&mut self.questions_txt, &file.questions_txt);
        set_if(&mut self.solutions_txt, &file.solutions_txt);
        set_if(&mut self.transcription_json, &file.transcription_json);
        set_if(&mut self.transcription_txt, &file.transcription_txt);
        set_if(&mut self.solutions_json, &file.solutions_json);
        set_if(&mut self.final_output_json, &file.final_output_json);
        set_if(&mut self.report_txt, &file.report_txt);
        if let Some(provider) = &file.provider {
            match provider.parse() {
                Ok(p) => self.provider = p,
                Err(e) => problems.push(format!("配置文件 provider: {e}")),
            }
        }
        set_if(&mut self.model_name, &file.model_name);
        if file.api_base_url.is_some() {
            self.api_base_url = file.api_base_url.clone();
        }
        set_if(&mut self.api_key_env, &file.api_key_env);
        if file.api_key.is_some() {
            self.api_key = file.api_key.clone();
        }
        set_if(&mut self.max_output_tokens, &file.max_output_tokens);
        set_if(&mut self.ocr_language, &file.ocr_language);
        set_if(&mut self.ocr_dpi, &file.ocr_dpi);
        set_if(&mut self.question_context_limit, &file.question_context_limit);
        set_if(&mut self.enforce_marks_invariants, &file.enforce_marks_invariants);
        set_if(&mut self.verbose_logging, &file.verbose_logging);
    }

    /// 应用命令行参数
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides, problems: &mut Vec<String>) {
        if let Some(provider) = &overrides.provider {
            match provider.parse() {
                Ok(p) => self.provider = p,
                Err(e) => problems.push(format!("--provider: {e}")),
            }
        }
        set_if(&mut self.model_name, &overrides.model_name);
        if overrides.api_base_url.is_some() {
            self.api_base_url = overrides.api_base_url.clone();
        }
        set_if(&mut self.api_key_env, &overrides.api_key_env);
        set_if(&mut self.handwritten_pdf, &overrides.handwritten_pdf);
        set_if(&mut self.questions_txt, &overrides.questions_txt);
        set_if(&mut self.solutions_txt, &overrides.solutions_txt);
        set_if(&mut self.final_output_json, &overrides.final_output_json);
        set_if(&mut self.report_txt, &overrides.report_txt);
        if overrides.verbose_logging {
            self.verbose_logging = true;
        }
    }

    /// 启动时校验
    ///
    /// `requires_model` 为 false 时（例如只做 OCR 提取）不检查 API key
    pub fn validate(&self, requires_model: bool) -> Result<(), ConfigError> {
        let mut problems = self.load_problems.clone();

        if requires_model {
            match self.api_key.as_deref().map(str::trim) {
                None | Some("") => problems.push(self.missing_key_message("未设置")),
                Some(PLACEHOLDER_API_KEY) => problems.push(self.missing_key_message("仍是占位值")),
                Some(_) => {}
            }
            if self.model_name.trim().is_empty() {
                problems.push("模型名称不能为空".to_string());
            }
        }
        if self.question_context_limit == 0 {
            problems.push("question_context_limit 必须大于 0".to_string());
        }
        if self.ocr_dpi == 0 {
            problems.push("ocr_dpi 必须大于 0".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }

    /// 实际使用的 API 地址
    pub fn api_base(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_base())
    }

    fn missing_key_message(&self, state: &str) -> String {
        format!(
            "API key {state}！请打开 {} 并填写:\n      {}=<你的 key>\n    Gemini key 可在 https://aistudio.google.com/apikey 获取",
            self.env_file.display(),
            self.api_key_env
        )
    }
}

/// 读取 `.env` 文件，已存在的环境变量不会被覆盖
///
/// 默认的 `.env` 不存在时跳过；显式指定的文件不存在或内容有误都记为问题
fn load_env_file(path: &Path, explicit: bool, problems: &mut Vec<String>) {
    match dotenvy::from_path(path) {
        Ok(()) => {}
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound && !explicit => {}
        Err(dotenvy::Error::Io(e)) => {
            problems.push(format!("无法读取 env 文件 {}: {e}", path.display()))
        }
        Err(e) => problems.push(format!("env 文件 {} 格式错误: {e}", path.display())),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::FileParse {
        path: path.display().to_string(),
        source,
    })
}

fn set_if<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

fn parse_env<F, T>(lookup: &F, key: &str, target: &mut T, problems: &mut Vec<String>)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(v) => *target = v,
            Err(_) => problems.push(format!(
                "环境变量 {key} 解析失败: 值 '{raw}' 无法转换为 {}",
                std::any::type_name::<T>()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_pipeline_file_names() {
        let config = Config::default();
        assert_eq!(config.questions_txt, PathBuf::from("question.txt"));
        assert_eq!(config.solutions_txt, PathBuf::from("solutions.txt"));
        assert_eq!(config.final_output_json, PathBuf::from("final_output.json"));
        assert_eq!(config.report_txt, PathBuf::from("grading_report.txt"));
        assert_eq!(config.question_context_limit, 3000);
        assert_eq!(config.api_base(), "https://generativelanguage.googleapis.com");
    }

    #[test]
    fn test_env_overrides_defaults() {
        let mut config = Config::default();
        let mut problems = Vec::new();
        config.apply_env(
            lookup_from(&[("EXAM_GRADER_MODEL", "gemini-2.5-pro"), ("EXAM_GRADER_OCR_DPI", "300")]),
            &mut problems,
        );
        assert!(problems.is_empty());
        assert_eq!(config.model_name, "gemini-2.5-pro");
        assert_eq!(config.ocr_dpi, 300);
    }

    #[test]
    fn test_file_overrides_env_and_cli_overrides_file() {
        let mut config = Config::default();
        let mut problems = Vec::new();
        config.apply_env(lookup_from(&[("EXAM_GRADER_MODEL", "from-env")]), &mut problems);

        let file: FileConfig = toml::from_str(
            r#"
            model_name = "from-file"
            provider = "openai"
            report_txt = "out/report.txt"
            "#,
        )
        .unwrap();
        config.apply_file(&file, &mut problems);
        assert_eq!(config.model_name, "from-file");
        assert_eq!(config.provider, Provider::OpenAi);

        let overrides = ConfigOverrides {
            model_name: Some("from-cli".to_string()),
            ..Default::default()
        };
        config.apply_overrides(&overrides, &mut problems);
        assert!(problems.is_empty());
        assert_eq!(config.model_name, "from-cli");
        assert_eq!(config.report_txt, PathBuf::from("out/report.txt"));
    }

    #[test]
    fn test_bad_env_values_are_collected() {
        let mut config = Config::default();
        let mut problems = Vec::new();
        config.apply_env(
            lookup_from(&[("EXAM_GRADER_OCR_DPI", "high"), ("EXAM_GRADER_PROVIDER", "claude")]),
            &mut problems,
        );
        assert_eq!(problems.len(), 2);
        assert_eq!(config.ocr_dpi, 200);
    }

    #[test]
    fn test_unknown_file_keys_are_rejected() {
        let parsed: Result<FileConfig, _> = toml::from_str("modle_name = \"typo\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_rejects_missing_and_placeholder_key() {
        let mut config = Config::default();
        let err = config.validate(true).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        config.api_key = Some(PLACEHOLDER_API_KEY.to_string());
        assert!(config.validate(true).is_err());

        config.api_key = Some("real-key".to_string());
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn test_missing_default_env_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut problems = Vec::new();
        load_env_file(&dir.path().join(".env"), false, &mut problems);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_missing_explicit_env_file_is_a_problem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prod.env");
        let mut problems = Vec::new();
        load_env_file(&path, true, &mut problems);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("prod.env"));
    }

    #[test]
    fn test_malformed_env_file_is_a_problem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "EXAM_GRADER_BROKEN_VALUE=\"never closed\n").unwrap();

        // 默认路径同样报告格式错误，只有文件不存在才跳过
        let mut problems = Vec::new();
        load_env_file(&path, false, &mut problems);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("格式错误"));
    }

    #[test]
    fn test_load_problems_and_missing_key_form_one_error() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join("broken.env");
        std::fs::write(&env_file, "this line has no equals sign\n").unwrap();
        let config_file = dir.path().join("exam-grader.toml");
        std::fs::write(&config_file, "ocr_dpi = 0\n").unwrap();

        let overrides = ConfigOverrides {
            config_file: Some(config_file),
            env_file: Some(env_file),
            provider: Some("claude".to_string()),
            api_key_env: Some("EXAM_GRADER_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..Default::default()
        };
        let config = Config::load(&overrides).unwrap();
        assert_eq!(config.load_problems.len(), 2);

        let err = config.validate(true).unwrap_err();
        let ConfigError::Invalid { problems } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(problems.len(), 4);
        assert!(problems[0].contains("broken.env"));
        assert!(problems[1].starts_with("--provider"));
        assert!(problems[2].contains("EXAM_GRADER_TEST_KEY_THAT_IS_NEVER_SET"));
        assert!(problems[3].contains("ocr_dpi"));
        assert!(err.to_string().starts_with("发现 4 个配置问题"));
    }

    #[test]
    fn test_load_problems_reported_without_model() {
        let config = Config {
            load_problems: vec!["环境变量 EXAM_GRADER_OCR_DPI 解析失败".to_string()],
            ..Config::default()
        };
        let err = config.validate(false).unwrap_err();
        assert!(err.to_string().contains("EXAM_GRADER_OCR_DPI"));
    }

    #[test]
    fn test_validate_skips_key_when_model_not_needed() {
        let config = Config::default();
        assert!(config.validate(false).is_ok());
    }
}
