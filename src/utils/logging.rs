//! 日志工具模块
//!
//! 提供日志初始化和统一格式的阶段输出

use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，默认 info。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(title: &str, model_name: &str) {
    info!("{}", "=".repeat(60));
    info!("📝 {}", title);
    info!("🤖 模型: {}", model_name);
    info!(
        "🕒 启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始
pub fn log_step(step: &str, description: &str) {
    info!("\n[{}] {}", step, description);
}

/// 记录文件已保存
pub fn log_saved(label: &str, path: &Path) {
    info!("      {} 已保存 → {}", label, path.display());
}

/// 记录缺失的可选输入
pub fn log_missing_input(step: &str, path: &Path, hint: &str) {
    warn!("[{}] ⚠️ 未找到 {}，{}", step, path.display(), hint);
}

/// 打印完成信息
pub fn log_finished(outputs: &[&Path]) {
    info!("\n{}", "=".repeat(60));
    info!(
        "✅ 全部完成 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    for path in outputs {
        info!("   输出: {}", path.display());
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本，超长时以 `...` 结尾
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
