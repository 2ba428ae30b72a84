//! # EvoBot CLI
//!
//! 动作序列的检查与播放工具。
//!
//! ```bash
//! # 查看 .ebs 文件头部和前 5 帧（前向填充后）
//! evobot-cli inspect actions/wave.ebs --frames 5
//!
//! # 以 40Hz 播放 actions/ 目录下的 wave.ebs，Ctrl-C 触发急停
//! evobot-cli play wave --dir actions --frequency 40
//!
//! # 生成默认播放器配置
//! evobot-cli config init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCommand, InspectCommand, PlayCommand};

/// EvoBot CLI - 动作序列命令行工具
#[derive(Parser, Debug)]
#[command(name = "evobot-cli")]
#[command(about = "Inspect and play EvoBot motion sequences", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 检查 .ebs 文件
    Inspect {
        #[command(flatten)]
        args: InspectCommand,
    },

    /// 播放动作序列
    Play {
        #[command(flatten)]
        args: PlayCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("evobot_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute().await,
        Commands::Inspect { args } => args.execute().await,
        Commands::Play { args } => args.execute().await,
    }
}
