//! 协议常量定义

/// 状态帧长度（字节）
///
/// - byte 0-1: 声呐往返时间（tick，小端）
/// - byte 2: 电机电源开关
/// - byte 3: 电机方向（非 0 表示向上）
/// - byte 4: 最近一次执行的命令码
pub const STATUS_FRAME_LEN: usize = 5;

/// 每厘米对应的声呐往返 tick 数
///
/// 声波往返 1 cm 约 57 µs，微控制器以 µs 为 tick 上报。
pub const TICKS_PER_CM: f64 = 57.0;

/// 微控制器默认 I2C 从机地址
pub const DEFAULT_SLAVE_ADDRESS: u16 = 0x04;

/// 默认 I2C 总线设备（树莓派 GPIO 2/3）
pub const DEFAULT_I2C_DEVICE: &str = "/dev/i2c-1";

/// 将原始 tick 转换为厘米
#[inline]
pub fn ticks_to_cm(ticks: u16) -> f64 {
    ticks as f64 / TICKS_PER_CM
}

/// 将厘米转换为最接近的原始 tick（饱和到 u16 范围）
#[inline]
pub fn cm_to_ticks(cm: f64) -> u16 {
    (cm * TICKS_PER_CM).round().clamp(0.0, u16::MAX as f64) as u16
}
