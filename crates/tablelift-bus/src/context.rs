//! 共享总线上下文
//!
//! 替代全局连接句柄：所有组件通过 `BusContext` 访问链路。
//! 中断处理线程与控制线程共享同一个上下文，每次传输都在互斥锁内完成。
//!
//! # 停机闩锁
//!
//! [`BusContext::halt`] 在持锁状态下置位闩锁并发送 `SwitchOff`。
//! 之后的所有传输都返回 [`BusError::Halted`]，因此控制循环
//! 无法在断电之后重新接通电机。

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{BusError, BusLink, Command, Status, StatusFrame};

struct Shared<L> {
    link: L,
    halted: bool,
}

/// 共享总线句柄
pub struct BusContext<L> {
    shared: Arc<Mutex<Shared<L>>>,
}

impl<L> Clone for BusContext<L> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<L: BusLink> BusContext<L> {
    pub fn new(link: L) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                link,
                halted: false,
            })),
        }
    }

    /// 发送单字节命令
    pub fn send(&self, command: Command) -> Result<(), BusError> {
        let mut shared = self.shared.lock();
        if shared.halted {
            return Err(BusError::Halted);
        }
        trace!(?command, "bus send");
        shared.link.send(command)
    }

    /// 读取原始状态帧
    pub fn read_status_frame(&self) -> Result<StatusFrame, BusError> {
        let mut shared = self.shared.lock();
        if shared.halted {
            return Err(BusError::Halted);
        }
        shared.link.read_status_frame()
    }

    /// 读取并解析状态
    pub fn read_status(&self) -> Result<Status, BusError> {
        let frame = self.read_status_frame()?;
        Ok(Status::from_frame(&frame))
    }

    /// 置位停机闩锁并断开电机电源
    ///
    /// 可重复调用；每次都会重新发送 `SwitchOff`。
    pub fn halt(&self) -> Result<(), BusError> {
        let mut shared = self.shared.lock();
        if !shared.halted {
            warn!("halting bus, actuator switched off");
        }
        shared.halted = true;
        shared.link.send(Command::SwitchOff)
    }

    pub fn is_halted(&self) -> bool {
        self.shared.lock().halted
    }
}
