//! 移动命令
//!
//! `up` 移动到 high 标定点，`down` 移动到 low 标定点。

use std::io::Write;

use anyhow::{Context, Result};
use tablelift_control::{Direction, Mark};

use crate::modes::oneshot::CliSession;

/// 移动命令
#[derive(Debug, Clone, Copy)]
pub struct MoveCommand {
    pub mark: Mark,
}

impl MoveCommand {
    pub fn new(mark: Mark) -> Self {
        Self { mark }
    }

    /// 执行移动
    pub fn execute(&self, session: &CliSession, out: &mut impl Write) -> Result<()> {
        let arrow = match self.mark.direction() {
            Direction::Up => "⬆️",
            Direction::Down => "⬇️",
        };
        writeln!(out, "{} 移动到 {} 标定点...", arrow, self.mark)?;

        let report = session
            .move_to_mark(self.mark)
            .with_context(|| format!("移动到 {} 标定点失败", self.mark))?;

        writeln!(
            out,
            "✅ 已到达 {:.2} cm（目标 {:.1} cm，粗调 {} 步，精调 {} 次）",
            report.final_cm, report.target_cm, report.coarse_steps, report.corrections
        )?;
        Ok(())
    }
}
