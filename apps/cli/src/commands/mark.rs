//! 标定命令
//!
//! 多次采样取平均，写入 `tableHeight_high` / `tableHeight_low`。

use std::io::Write;

use anyhow::{Context, Result};
use tablelift_control::Mark;

use crate::modes::oneshot::CliSession;

/// 标定命令
#[derive(Debug, Clone, Copy)]
pub struct MarkCommand {
    pub mark: Mark,
}

impl MarkCommand {
    pub fn new(mark: Mark) -> Self {
        Self { mark }
    }

    pub fn execute(&self, session: &CliSession, out: &mut impl Write) -> Result<()> {
        writeln!(
            out,
            "📏 测量当前高度（{} 次采样）...",
            session.config().sampling.mark_runs
        )?;

        let height = session
            .mark(self.mark)
            .with_context(|| format!("记录 {} 标定点失败", self.mark))?;

        writeln!(
            out,
            "✅ {} 标定点: {:.1} cm -> {}",
            self.mark,
            height,
            session.store().path(self.mark).display()
        )?;
        Ok(())
    }
}
