//! # Tablelift Bus Layer
//!
//! 总线硬件抽象层：向微控制器发送 1 字节命令，读取 5 字节状态帧。
//!
//! - [`BusLink`]：链路 trait，所有后端（I2C、模拟器）实现它
//! - [`BusContext`]：共享链路句柄，带停机闩锁（halt latch）
//! - `i2c`：Linux I2C 后端（仅 Linux）
//! - `mock`：模拟升降桌（`mock` feature）

use thiserror::Error;

pub use tablelift_protocol::{Command, Status, StatusFrame};

mod context;
pub use context::BusContext;

#[cfg(target_os = "linux")]
pub mod i2c;

#[cfg(target_os = "linux")]
pub use i2c::I2cBusLink;

#[cfg(feature = "mock")]
pub mod mock;

/// 总线层统一错误类型
#[derive(Error, Debug)]
pub enum BusError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] BusDeviceError),
    /// 停机闩锁已触发，拒绝后续所有传输
    #[error("Bus halted by teardown")]
    Halted,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDeviceErrorKind {
    /// 设备节点不存在
    NotFound,
    /// 没有设备节点的读写权限
    AccessDenied,
    /// 读写或从机地址绑定失败
    Transfer,
    Unsupported,
    Injected,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct BusDeviceError {
    pub kind: BusDeviceErrorKind,
    pub message: String,
}

impl BusDeviceError {
    pub fn new(kind: BusDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 点对点命令/状态链路
///
/// 传输失败以 [`BusError`] 返回，不做自动重试，由调用方决定。
pub trait BusLink {
    /// 发送单字节命令
    fn send(&mut self, command: Command) -> Result<(), BusError>;

    /// 读取一个完整的状态帧
    fn read_status_frame(&mut self) -> Result<StatusFrame, BusError>;

    /// 读取并解析状态
    fn read_status(&mut self) -> Result<Status, BusError> {
        let frame = self.read_status_frame()?;
        Ok(Status::from_frame(&frame))
    }
}

impl<T: BusLink + ?Sized> BusLink for Box<T> {
    fn send(&mut self, command: Command) -> Result<(), BusError> {
        (**self).send(command)
    }

    fn read_status_frame(&mut self) -> Result<StatusFrame, BusError> {
        (**self).read_status_frame()
    }
}

/// 打开当前平台的默认链路
///
/// Linux 上为 `/dev/i2c-N` 上的 I2C 设备；其他平台返回 `Unsupported`。
#[cfg(target_os = "linux")]
pub fn open_default(device: &str, address: u16) -> Result<Box<dyn BusLink + Send>, BusError> {
    Ok(Box::new(I2cBusLink::open(device, address)?))
}

#[cfg(not(target_os = "linux"))]
pub fn open_default(device: &str, address: u16) -> Result<Box<dyn BusLink + Send>, BusError> {
    Err(BusDeviceError::new(
        BusDeviceErrorKind::Unsupported,
        format!(
            "I2C link {} @ 0x{:02X} is only available on Linux",
            device, address
        ),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLink {
        frame: StatusFrame,
        sent: Vec<Command>,
    }

    impl BusLink for FixedLink {
        fn send(&mut self, command: Command) -> Result<(), BusError> {
            self.sent.push(command);
            Ok(())
        }

        fn read_status_frame(&mut self) -> Result<StatusFrame, BusError> {
            Ok(self.frame)
        }
    }

    #[test]
    fn test_read_status_decodes_frame() {
        let mut link = FixedLink {
            frame: [0x22, 0x0B, 0, 1, 1],
            sent: Vec::new(),
        };
        let status = link.read_status().unwrap();
        assert_eq!(status.distance_cm(), 50.0);
        assert!(status.switch_up);
    }

    #[test]
    fn test_boxed_link_forwards() {
        let mut link: Box<dyn BusLink> = Box::new(FixedLink {
            frame: [0; 5],
            sent: Vec::new(),
        });
        link.send(Command::SonarRun).unwrap();
        assert_eq!(link.read_status_frame().unwrap(), [0; 5]);
    }

    #[test]
    fn test_bus_error_display() {
        let err = BusError::from(BusDeviceError::new(
            BusDeviceErrorKind::NotFound,
            "/dev/i2c-9",
        ));
        let msg = err.to_string();
        assert!(msg.contains("NotFound") && msg.contains("/dev/i2c-9"), "{}", msg);

        assert_eq!(BusError::Halted.to_string(), "Bus halted by teardown");
    }
}
