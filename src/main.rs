use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use exam_grader::config::{Config, ConfigOverrides};
use exam_grader::utils::logging;
use exam_grader::App;

#[derive(Parser)]
#[command(name = "exam-grader")]
#[command(about = "手写试卷自动批改：OCR 提取 → 手写转写 → 模型评分 → 报告")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML 配置文件（默认读取 ./exam-grader.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// .env 文件路径
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    /// 模型提供方: gemini | openai
    #[arg(long, global = true)]
    provider: Option<String>,
    /// 模型名称
    #[arg(long, global = true)]
    model: Option<String>,
    /// API 地址
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// 保存 API key 的环境变量名
    #[arg(long, global = true)]
    api_key_env: Option<String>,
    /// 手写答案 PDF
    #[arg(long, global = true)]
    handwritten: Option<PathBuf>,
    /// 题目文本（评分上下文）
    #[arg(long, global = true)]
    questions_txt: Option<PathBuf>,
    /// 标准答案文本
    #[arg(long, global = true)]
    solutions_txt: Option<PathBuf>,
    /// 汇总 JSON 输出路径
    #[arg(long, global = true)]
    output_json: Option<PathBuf>,
    /// 报告输出路径
    #[arg(long, global = true)]
    report: Option<PathBuf>,
    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR 提取印刷文本（不带参数时提取题目和标准答案两个 PDF）
    Extract {
        /// 输入 PDF
        #[arg(long, requires = "out")]
        pdf: Option<PathBuf>,
        /// 输出文本文件
        #[arg(long, requires = "pdf")]
        out: Option<PathBuf>,
    },
    /// 只转写手写答案
    Transcribe,
    /// 只解析标准答案，写出 solutions.json
    ParseSolutions,
    /// 运行完整流水线（默认命令）
    #[command(alias = "grade")]
    Run {
        /// 先对题目和标准答案 PDF 做 OCR 提取
        #[arg(long)]
        extract: bool,
    },
    /// 根据已有的 final_output.json 重新生成报告
    Report,
}

impl Commands {
    fn requires_model(&self) -> bool {
        matches!(
            self,
            Commands::Transcribe | Commands::ParseSolutions | Commands::Run { .. }
        )
    }
}

impl From<GlobalArgs> for ConfigOverrides {
    fn from(args: GlobalArgs) -> Self {
        ConfigOverrides {
            config_file: args.config,
            env_file: args.env_file,
            provider: args.provider,
            model_name: args.model,
            api_base_url: args.api_base,
            api_key_env: args.api_key_env,
            handwritten_pdf: args.handwritten,
            questions_txt: args.questions_txt,
            solutions_txt: args.solutions_txt,
            final_output_json: args.output_json,
            report_txt: args.report,
            verbose_logging: args.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run { extract: false });

    let config = Config::load(&cli.global.into())?;
    logging::init(config.verbose_logging);

    let app = App::initialize(config, command.requires_model())?;

    match command {
        Commands::Extract {
            pdf: Some(pdf),
            out: Some(out),
        } => {
            app.extract(&pdf, &out).await?;
        }
        Commands::Extract { .. } => app.extract_all().await?,
        Commands::Transcribe => {
            app.transcribe().await?;
        }
        Commands::ParseSolutions => {
            app.parse_solutions().await?;
        }
        Commands::Run { extract } => {
            app.run(extract).await?;
        }
        Commands::Report => {
            app.report().await?;
        }
    }

    Ok(())
}
