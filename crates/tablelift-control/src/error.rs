//! 控制层错误类型定义

use tablelift_bus::BusError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::lock::LockError;
use crate::store::StoreError;

/// 控制层错误类型
///
/// 所有错误原样向上传递到命令分发层，由分发层记录日志、
/// 执行收尾并以非 0 状态退出。
#[derive(Error, Debug)]
pub enum ControlError {
    /// 总线传输错误（不重试）
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// 无法在重试预算内获得独占锁
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// 标定文件缺失/无法解析/读写失败
    #[error("Calibration error: {0}")]
    Calibration(#[from] StoreError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 精调阶段超过最大修正次数仍未进入容差带
    #[error(
        "Height did not converge to {target_cm:.1}cm after {corrections} corrections (last {last_cm:.2}cm)"
    )]
    NotConverged {
        target_cm: f64,
        last_cm: f64,
        corrections: u32,
    },

    /// 中断信号处理器安装失败
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl ControlError {
    /// 是否为标定缺失（对只读操作可降级处理）
    pub fn is_calibration_missing(&self) -> bool {
        matches!(self, ControlError::Calibration(e) if e.is_missing())
    }
}
