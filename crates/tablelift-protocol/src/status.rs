//! 状态帧解析
//!
//! 微控制器在每次读取时返回 5 字节状态帧，布局见 [`STATUS_FRAME_LEN`]。

use crate::{
    Command, Direction, ProtocolError, STATUS_FRAME_LEN, bytes_to_u16_le, ticks_to_cm,
    u16_to_bytes_le,
};

/// 原始状态帧
pub type StatusFrame = [u8; STATUS_FRAME_LEN];

/// 微控制器状态
///
/// 每次总线读取都会生成新的 `Status`，不做持久化。
/// 距离只保存原始 tick，厘米值由 [`Status::distance_cm`] 派生。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// 声呐往返时间（原始 tick）
    pub distance_ticks: u16,
    /// 电机电源是否接通
    pub switch_on: bool,
    /// 电机方向是否向上
    pub switch_up: bool,
    /// 微控制器回显的最近一次命令
    ///
    /// 固件回显未知命令码时为 `None`。
    pub last_command: Option<Command>,
}

impl Status {
    /// 从固定长度的状态帧解析
    pub fn from_frame(frame: &StatusFrame) -> Self {
        Self {
            distance_ticks: bytes_to_u16_le([frame[0], frame[1]]),
            switch_on: frame[2] != 0,
            switch_up: frame[3] != 0,
            last_command: Command::try_from(frame[4]).ok(),
        }
    }

    /// 编码为状态帧（模拟器使用）
    pub fn to_frame(&self) -> StatusFrame {
        let [lo, hi] = u16_to_bytes_le(self.distance_ticks);
        [
            lo,
            hi,
            self.switch_on as u8,
            self.switch_up as u8,
            self.last_command.map(Command::to_byte).unwrap_or(u8::MAX),
        ]
    }

    /// 距离（厘米）
    #[inline]
    pub fn distance_cm(&self) -> f64 {
        ticks_to_cm(self.distance_ticks)
    }

    /// 当前电机方向
    pub fn direction(&self) -> Direction {
        if self.switch_up {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

impl TryFrom<&[u8]> for Status {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let frame: &StatusFrame =
            bytes.try_into().map_err(|_| ProtocolError::InvalidLength {
                expected: STATUS_FRAME_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self::from_frame(frame))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "distance={:.1}cm ({} ticks) on={} dir={} last={}",
            self.distance_cm(),
            self.distance_ticks,
            self.switch_on,
            self.direction(),
            match self.last_command {
                Some(cmd) => format!("{:?}", cmd),
                None => "unknown".to_string(),
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_frame() {
        // 2850 ticks = 0x0B22
        let frame = [0x22, 0x0B, 1, 0, Command::SwitchOn.to_byte()];
        let status = Status::from_frame(&frame);

        assert_eq!(status.distance_ticks, 2850);
        assert_eq!(status.distance_cm(), 50.0);
        assert!(status.switch_on);
        assert!(!status.switch_up);
        assert_eq!(status.direction(), Direction::Down);
        assert_eq!(status.last_command, Some(Command::SwitchOn));
    }

    #[test]
    fn test_decode_nonzero_flags_are_true() {
        let frame = [0, 0, 0x7F, 0xFF, 0];
        let status = Status::from_frame(&frame);
        assert!(status.switch_on);
        assert!(status.switch_up);
        assert_eq!(status.last_command, Some(Command::SonarNoop));
    }

    #[test]
    fn test_decode_unknown_last_command() {
        let frame = [0, 0, 0, 0, 0x42];
        let status = Status::from_frame(&frame);
        assert_eq!(status.last_command, None);
        assert!(status.to_string().contains("last=unknown"));
    }

    #[test]
    fn test_try_from_invalid_length() {
        let bytes = [0u8; 3];
        let result = Status::try_from(&bytes[..]);
        assert_eq!(
            result.unwrap_err(),
            ProtocolError::InvalidLength {
                expected: 5,
                actual: 3
            }
        );

        let bytes = [0u8; 6];
        assert!(Status::try_from(&bytes[..]).is_err());
    }

    #[test]
    fn test_try_from_valid_slice() {
        let bytes = vec![0x39, 0x00, 0, 1, 1];
        let status = Status::try_from(bytes.as_slice()).unwrap();
        assert_eq!(status.distance_ticks, 57);
        assert_eq!(status.distance_cm(), 1.0);
        assert_eq!(status.last_command, Some(Command::SonarRun));
    }

    #[test]
    fn test_to_frame() {
        let status = Status {
            distance_ticks: 0x0102,
            switch_on: true,
            switch_up: true,
            last_command: Some(Command::SwitchUp),
        };
        assert_eq!(status.to_frame(), [0x02, 0x01, 1, 1, 4]);
    }

    proptest! {
        #[test]
        fn prop_distance_cm_is_ticks_over_57(ticks in any::<u16>()) {
            let [lo, hi] = ticks.to_le_bytes();
            let status = Status::from_frame(&[lo, hi, 0, 0, 0]);
            prop_assert_eq!(status.distance_ticks, ticks);
            prop_assert_eq!(status.distance_cm(), ticks as f64 / 57.0);
        }
    }
}
