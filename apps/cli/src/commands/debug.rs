//! 诊断命令
//!
//! 打印单次原始状态、平均高度和两个标定点。标定缺失显示为 `unknown`，不视为错误。

use std::io::Write;

use anyhow::{Context, Result};
use tablelift_control::StoreError;
use tablelift_protocol::TICKS_PER_CM;

use crate::modes::oneshot::CliSession;

/// 诊断命令
#[derive(Debug, Clone, Copy)]
pub struct DebugCommand;

impl DebugCommand {
    pub fn execute(&self, session: &CliSession, out: &mut impl Write) -> Result<()> {
        let report = session.debug_report().context("读取诊断信息失败")?;
        let status = &report.status;

        writeln!(out, "📊 状态:")?;
        writeln!(
            out,
            "  距离: {} ticks / {} = {:.2} cm",
            status.distance_ticks,
            TICKS_PER_CM,
            status.distance_cm()
        )?;
        writeln!(out, "  电源: {}", if status.switch_on { "on" } else { "off" })?;
        writeln!(out, "  方向: {}", status.direction())?;
        match status.last_command {
            Some(cmd) => writeln!(out, "  最后命令: {:?}", cmd)?,
            None => writeln!(out, "  最后命令: unknown")?,
        }

        writeln!(
            out,
            "📏 平均高度: {:.2} cm（{} 次采样）",
            report.average_cm,
            session.config().sampling.check_runs
        )?;
        writeln!(out, "🔖 high: {}", format_mark(&report.high))?;
        writeln!(out, "🔖 low: {}", format_mark(&report.low))?;
        Ok(())
    }
}

fn format_mark(mark: &Result<f64, StoreError>) -> String {
    match mark {
        Ok(height) => format!("{:.1} cm", height),
        Err(_) => "unknown".to_string(),
    }
}
