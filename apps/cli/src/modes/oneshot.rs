//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 安装中断处理器
//! 2. 获取独占锁
//! 3. 打开 I2C 总线
//! 4. 执行操作
//! 5. 断电并释放锁（成功、出错、中断都会执行）

use anyhow::{Context, Result};
use tablelift_bus::BusLink;
use tablelift_control::{ControlConfig, ExclusionLock, InterruptGuard, Session, open_lock};
use tracing::info;

/// CLI 使用的会话类型：真实总线 + 按配置选择的锁
pub type CliSession = Session<Box<dyn BusLink + Send>, Box<dyn ExclusionLock>>;

/// One-shot 模式
pub struct OneShotMode {
    session: CliSession,
}

impl OneShotMode {
    /// 安装中断处理器、获取锁并连接总线
    ///
    /// `exit_code` 是收到中断信号后的进程退出码。
    pub fn start(config: ControlConfig, exit_code: i32) -> Result<Self> {
        // 先装处理器再拿锁：拿锁之后的任何时刻收到信号都能释放锁
        let guard = InterruptGuard::install(exit_code).context("安装中断处理器失败")?;

        info!(
            "Connecting to {} (address 0x{:02X})",
            config.bus.device, config.bus.address
        );

        let lock = open_lock(&config.lock);
        let session = Session::start_guarded(
            lock,
            config,
            |config| tablelift_bus::open_default(&config.bus.device, config.bus.address),
            &guard,
        )
        .context("启动会话失败")?;

        Ok(Self { session })
    }

    #[cfg(test)]
    pub fn from_session(session: CliSession) -> Self {
        Self { session }
    }

    /// 执行一个命令，然后收尾
    ///
    /// 命令出错时同样先收尾再返回错误。
    pub fn run<F>(self, command: F) -> Result<()>
    where
        F: FnOnce(&CliSession) -> Result<()>,
    {
        let result = command(&self.session);
        self.session.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::simulated_session;
    use tablelift_bus::Command;
    use tablelift_bus::mock::SimulatedTable;

    #[test]
    fn test_run_closes_session_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = SimulatedTable::new(40.0);
        let session = simulated_session(dir.path(), &table);
        let lock_path = session.config().lock.path.clone();
        assert!(lock_path.exists());

        let result = OneShotMode::from_session(session).run(|_| anyhow::bail!("boom"));

        assert!(result.is_err());
        assert!(!lock_path.exists());
        assert_eq!(table.last_command(), Some(Command::SwitchOff));
    }
}
