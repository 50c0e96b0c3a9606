//! 高度测量命令
//!
//! - `print-distance`：打印一次平均高度
//! - `print-loop`：持续打印平均高度，直到 Ctrl+C 或达到 `--count`

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use crate::modes::oneshot::CliSession;

/// `print-distance` 参数
#[derive(Args, Debug)]
pub struct DistanceCommand {
    /// 采样次数（覆盖配置中的 sampling.check_runs）
    #[arg(short, long)]
    pub runs: Option<u32>,
}

impl DistanceCommand {
    pub fn execute(&self, session: &CliSession, out: &mut impl Write) -> Result<()> {
        let height = session.measure(self.runs).context("测量高度失败")?;
        writeln!(out, "{:.2}", height)?;
        Ok(())
    }
}

/// `print-loop` 参数
#[derive(Args, Debug)]
pub struct LoopCommand {
    /// 每次读数的采样次数（覆盖配置中的 sampling.check_runs）
    #[arg(short, long)]
    pub runs: Option<u32>,

    /// 打印多少次后退出（缺省一直运行）
    #[arg(short, long)]
    pub count: Option<u64>,
}

impl LoopCommand {
    pub fn execute(&self, session: &CliSession, out: &mut impl Write) -> Result<()> {
        writeln!(out, "🔁 持续测量高度（Ctrl+C 结束）")?;

        let mut printed = 0u64;
        let mut written = Ok(());
        session
            .watch(self.runs, |height| {
                printed += 1;
                written = writeln!(out, "{:>6} {:.2} cm", printed, height);
                written.is_ok() && self.count.is_none_or(|count| printed < count)
            })
            .context("测量高度失败")?;
        // 输出端关闭（例如管道断开）时停止并报告
        written?;
        Ok(())
    }
}
