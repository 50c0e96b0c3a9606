//! Linux I2C 后端
//!
//! 通过 `/dev/i2c-N` 与微控制器通信：每条命令写 1 字节，
//! 每次状态读取读 [`STATUS_FRAME_LEN`] 字节。

use std::fs::OpenOptions;
use std::io;

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tablelift_protocol::STATUS_FRAME_LEN;
use tracing::{debug, info};

use crate::{BusDeviceError, BusDeviceErrorKind, BusError, BusLink, Command, StatusFrame};

/// I2C 链路
pub struct I2cBusLink {
    device: LinuxI2CDevice,
    path: String,
    address: u16,
}

/// 打开设备节点失败时的分类
fn open_error(path: &str, e: &io::Error) -> BusDeviceError {
    match e.kind() {
        io::ErrorKind::NotFound => BusDeviceError::new(
            BusDeviceErrorKind::NotFound,
            format!("{} does not exist (is I2C enabled?)", path),
        ),
        io::ErrorKind::PermissionDenied => BusDeviceError::new(
            BusDeviceErrorKind::AccessDenied,
            format!("{}: {} (is the user in the i2c group?)", path, e),
        ),
        _ => BusDeviceError::new(BusDeviceErrorKind::Transfer, format!("{}: {}", path, e)),
    }
}

impl I2cBusLink {
    /// 打开 I2C 设备并绑定从机地址
    pub fn open(path: &str, address: u16) -> Result<Self, BusError> {
        // 先以读写方式打开一次，区分“不存在”和“无权限”
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| open_error(path, &e))?;

        let device = LinuxI2CDevice::new(path, address).map_err(|e| {
            BusDeviceError::new(
                BusDeviceErrorKind::Transfer,
                format!("bind {} @ 0x{:02X}: {}", path, address, e),
            )
        })?;

        info!("Opened I2C device: {} address 0x{:02X}", path, address);

        Ok(Self {
            device,
            path: path.to_string(),
            address,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    fn transfer_error(&self, op: &str, e: impl std::fmt::Display) -> BusError {
        BusDeviceError::new(
            BusDeviceErrorKind::Transfer,
            format!("{} on {} @ 0x{:02X}: {}", op, self.path, self.address, e),
        )
        .into()
    }
}

impl BusLink for I2cBusLink {
    fn send(&mut self, command: Command) -> Result<(), BusError> {
        self.device
            .write(&[command.to_byte()])
            .map_err(|e| self.transfer_error("write", e))
    }

    fn read_status_frame(&mut self) -> Result<StatusFrame, BusError> {
        let mut frame = [0u8; STATUS_FRAME_LEN];
        self.device
            .read(&mut frame)
            .map_err(|e| self.transfer_error("read", e))?;
        debug!(?frame, "I2C status frame");
        Ok(frame)
    }
}
