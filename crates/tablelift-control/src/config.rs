//! 控制配置
//!
//! 从 TOML 文件加载，所有字段都有默认值，缺省的段落/字段使用默认配置。
//!
//! ```toml
//! [bus]
//! device = "/dev/i2c-1"
//! address = 4
//!
//! [sampling]
//! settle_ms = 125
//!
//! [control]
//! tolerance_cm = 0.4
//! pulse_ms = 250
//!
//! [lock]
//! kind = "marker"
//! path = "tableHeight_lock"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tablelift_protocol::{DEFAULT_I2C_DEVICE, DEFAULT_SLAVE_ADDRESS};
use thiserror::Error;

use crate::lock::RetryPolicy;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 总线配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// I2C 设备路径
    pub device: String,
    /// 微控制器从机地址
    pub address: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_I2C_DEVICE.to_string(),
            address: DEFAULT_SLAVE_ADDRESS,
        }
    }
}

/// 采样配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// 触发测距后等待声呐稳定的时间（毫秒）
    pub settle_ms: u64,
    /// 轻量检查的采样次数
    pub check_runs: u32,
    /// 标定时的采样次数
    pub mark_runs: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 125,
            check_runs: 5,
            mark_runs: 10,
        }
    }
}

impl SamplingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// 闭环控制配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// 容差带半宽（厘米）
    pub tolerance_cm: f64,
    /// 精调脉冲时长（毫秒）
    pub pulse_ms: u64,
    /// 精调阶段每次判断的采样次数
    pub fine_runs: u32,
    /// 精调阶段最大修正次数（`None` 表示不限）
    pub max_corrections: Option<u32>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tolerance_cm: 0.4,
            pulse_ms: 250,
            fine_runs: 5,
            max_corrections: None,
        }
    }
}

impl ControllerConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

/// 独占锁实现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// 零字节标记文件（存在即表示有会话在运行）
    #[default]
    Marker,
    /// 操作系统咨询锁（进程崩溃时自动释放）
    Advisory,
}

/// 独占锁配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub kind: LockKind,
    pub path: PathBuf,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            kind: LockKind::Marker,
            path: PathBuf::from("tableHeight_lock"),
            max_attempts: 10,
            retry_delay_ms: 500,
        }
    }
}

impl LockConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// 标定存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 标定文件所在目录
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub bus: BusConfig,
    pub sampling: SamplingConfig,
    pub control: ControllerConfig,
    pub lock: LockConfig,
    pub store: StoreConfig,
}

impl ControlConfig {
    /// 从 TOML 文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = self.control.tolerance_cm;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "control.tolerance_cm must be positive, got {}",
                tolerance
            )));
        }
        if self.control.fine_runs == 0 {
            return Err(ConfigError::Invalid(
                "control.fine_runs must be at least 1".to_string(),
            ));
        }
        if self.sampling.check_runs == 0 || self.sampling.mark_runs == 0 {
            return Err(ConfigError::Invalid(
                "sampling.check_runs and sampling.mark_runs must be at least 1".to_string(),
            ));
        }
        if self.lock.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "lock.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
