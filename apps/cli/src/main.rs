//! # Tablelift CLI
//!
//! 升降桌高度控制命令行工具。
//!
//! 每个命令都是一次独立会话：获取独占锁 -> 打开总线 -> 执行 -> 断电并释放锁。
//!
//! ```bash
//! # 记录标定点
//! tablelift mark-high
//! tablelift mark-low
//!
//! # 移动到标定点
//! tablelift up
//! tablelift down
//!
//! # 诊断
//! tablelift debug
//! tablelift print-loop --count 20
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod modes;
#[cfg(test)]
mod testing;

use commands::{DebugCommand, DistanceCommand, LoopCommand, MarkCommand, MoveCommand};
use modes::oneshot::OneShotMode;
use tablelift_control::{INTERRUPT_EXIT_CODE, Mark};

/// Tablelift CLI - 升降桌高度控制
#[derive(Parser, Debug)]
#[command(name = "tablelift")]
#[command(about = "Sonar-guided height control for a motorized table", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（缺省：<config_dir>/tablelift/config.toml）
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 升到 high 标定点
    Up,

    /// 降到 low 标定点
    Down,

    /// 将当前高度记为 high 标定点
    #[command(alias = "markHigh")]
    MarkHigh,

    /// 将当前高度记为 low 标定点
    #[command(alias = "markLow")]
    MarkLow,

    /// 打印原始状态、平均高度和标定点
    Debug,

    /// 打印一次平均高度
    #[command(alias = "printDistance")]
    PrintDistance {
        #[command(flatten)]
        args: DistanceCommand,
    },

    /// 持续打印平均高度（Ctrl+C 结束，退出码 0）
    #[command(alias = "printLoop")]
    PrintLoop {
        #[command(flatten)]
        args: LoopCommand,
    },
}

impl Commands {
    /// 收到中断信号时的退出码
    ///
    /// `print-loop` 本来就靠 Ctrl+C 结束，按正常退出处理。
    fn interrupt_exit_code(&self) -> i32 {
        match self {
            Commands::PrintLoop { .. } => 0,
            _ => INTERRUPT_EXIT_CODE,
        }
    }
}

fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，stdout 只留测量结果）
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    let mode = OneShotMode::start(config, cli.command.interrupt_exit_code())?;
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Up => mode.run(|session| MoveCommand::new(Mark::High).execute(session, &mut out)),
        Commands::Down => mode.run(|session| MoveCommand::new(Mark::Low).execute(session, &mut out)),
        Commands::MarkHigh => {
            mode.run(|session| MarkCommand::new(Mark::High).execute(session, &mut out))
        },
        Commands::MarkLow => {
            mode.run(|session| MarkCommand::new(Mark::Low).execute(session, &mut out))
        },
        Commands::Debug => mode.run(|session| DebugCommand.execute(session, &mut out)),
        Commands::PrintDistance { args } => mode.run(|session| args.execute(session, &mut out)),
        Commands::PrintLoop { args } => mode.run(|session| args.execute(session, &mut out)),
    }
}
