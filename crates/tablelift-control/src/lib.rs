//! # Tablelift Control
//!
//! 升降桌高度闭环控制：
//! - `sampling`：声呐多次采样平均（降噪）
//! - `controller`：粗调 + 带死区的精调
//! - `store`：high/low 标定点持久化
//! - `lock`：单实例独占锁（标记文件 / 咨询锁）
//! - `session`：会话生命周期，保证任何退出路径都断电并释放锁
//! - `config`：TOML 配置

pub mod config;
pub mod controller;
mod error;
pub mod lock;
pub mod sampling;
pub mod session;
pub mod store;

// 重新导出常用类型
pub use config::{ConfigError, ControlConfig, LockKind};
pub use controller::{ControlSettings, HeightController, MoveReport};
pub use error::ControlError;
pub use lock::{
    AdvisoryFileLock, ExclusionLock, LockError, MarkerFileLock, RetryPolicy, open_lock,
};
pub use sampling::{RunningMean, SamplingFilter};
pub use session::{DebugReport, INTERRUPT_EXIT_CODE, InterruptGuard, Session, Teardown};
pub use store::{HeightStore, Mark, StoreError};
pub use tablelift_protocol::Direction;
