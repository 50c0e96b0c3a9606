//! 命令帧定义
//!
//! 主机到微控制器的单字节命令，以及运动方向到命令的映射。

use crate::ProtocolError;

/// 总线命令
///
/// 每条命令在总线上编码为 1 个字节。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[repr(u8)]
pub enum Command {
    /// 空操作
    SonarNoop = 0x00,
    /// 触发一次声呐测距
    SonarRun = 0x01,
    /// 接通电机电源
    SwitchOn = 0x02,
    /// 断开电机电源
    SwitchOff = 0x03,
    /// 设置方向：向上
    SwitchUp = 0x04,
    /// 设置方向：向下
    SwitchDown = 0x05,
}

impl Command {
    /// 编码为总线字节
    #[inline]
    pub fn to_byte(self) -> u8 {
        self.into()
    }

    /// 从总线字节解析
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        Self::try_from(byte).map_err(|_| ProtocolError::InvalidValue {
            field: "command".to_string(),
            value: byte,
        })
    }
}

/// 运动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// 对应的方向切换命令
    pub fn switch_command(self) -> Command {
        match self {
            Direction::Up => Command::SwitchUp,
            Direction::Down => Command::SwitchDown,
        }
    }

    /// 当前距离是否已经到达或越过目标
    ///
    /// 向上时 `distance >= target`，向下时 `distance <= target`。
    pub fn has_reached(self, distance_cm: f64, target_cm: f64) -> bool {
        match self {
            Direction::Up => distance_cm >= target_cm,
            Direction::Down => distance_cm <= target_cm,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}
