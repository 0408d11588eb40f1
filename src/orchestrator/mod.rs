//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 校验配置，创建模型客户端和 OCR 组件
//! - 每个子命令一个方法（extract / transcribe / parse-solutions / run / report）
//!
//! ### `pipeline` - 完整评分流水线
//! - 转写 → 解析标准答案 → 评分 → 报告，严格顺序执行
//! - 处理可选输入缺失（solutions.txt / question.txt）
//!
//! ## 层次关系
//!
//! ```text
//! app (子命令)
//!     ↓
//! pipeline (一次完整评分)
//!     ↓
//! services (extractor / transcriber / solution_parser / grader / report)
//!     ↓
//! clients + infrastructure (模型服务 / pdftoppm / tesseract / 文件)
//! ```
//!
//! 本层只做调度和汇总，不解析模型输出。

pub mod app;
pub mod pipeline;

pub use app::App;
pub use pipeline::Pipeline;
