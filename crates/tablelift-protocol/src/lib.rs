//! # Tablelift Protocol
//!
//! 升降桌微控制器总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义
//! - `command`: 命令字节与运动方向
//! - `status`: 状态帧解析
//!
//! ## 帧格式
//!
//! 主机每次发送 1 个命令字节，微控制器返回固定 5 字节的状态帧。
//! 协议没有分帧和校验，可靠性由底层链路保证。
//!
//! ## 字节序
//!
//! 状态帧中的距离字段使用小端字节序（低字节在前）。

pub mod command;
pub mod constants;
pub mod status;

// 重新导出常用类型
pub use command::*;
pub use constants::*;
pub use status::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },
}

/// 小端字节序转 u16
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// u16 转小端字节序
pub fn u16_to_bytes_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}
