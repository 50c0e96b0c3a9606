//! 高度闭环控制器
//!
//! 两阶段收敛：
//!
//! 1. **粗调**：单次未滤波读数，沿指令方向持续通电，直到读数到达或越过目标，然后断电。
//!    每轮都重新采样，所以用速度换精度。
//! 2. **精调**：对多次采样取平均，与对称容差带 `[target - ε, target + ε]` 比较。
//!    高于容差带向下点动，低于容差带向上点动，落入容差带即收敛。
//!    死区避免在目标附近反复开关电机。
//!
//! 任何总线错误都会立即中止；最终的 `SwitchOff` 由会话收尾负责。

use std::thread;
use std::time::Duration;

use tablelift_bus::{BusContext, BusError, BusLink, Command};
use tablelift_protocol::Direction;
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::sampling::SamplingFilter;

/// 控制参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSettings {
    /// 容差带半宽 ε（厘米）
    pub tolerance_cm: f64,
    /// 精调点动时长
    pub pulse: Duration,
    /// 精调每轮的采样次数
    pub fine_runs: u32,
    /// 精调最大修正次数（`None` 不限）
    pub max_corrections: Option<u32>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            tolerance_cm: 0.4,
            pulse: Duration::from_millis(250),
            fine_runs: 5,
            max_corrections: None,
        }
    }
}

impl From<&ControllerConfig> for ControlSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            tolerance_cm: config.tolerance_cm,
            pulse: config.pulse(),
            fine_runs: config.fine_runs,
            max_corrections: config.max_corrections,
        }
    }
}

impl ControlSettings {
    /// 根据平均读数决定修正方向，落在容差带内（含边界）返回 `None`
    pub fn correction(&self, average_cm: f64, target_cm: f64) -> Option<Direction> {
        if average_cm > target_cm + self.tolerance_cm {
            Some(Direction::Down)
        } else if average_cm < target_cm - self.tolerance_cm {
            Some(Direction::Up)
        } else {
            None
        }
    }
}

/// 一次移动的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveReport {
    pub direction: Direction,
    pub target_cm: f64,
    /// 精调结束时的平均读数
    pub final_cm: f64,
    /// 粗调阶段的通电次数
    pub coarse_steps: u32,
    /// 精调阶段的点动次数
    pub corrections: u32,
}

/// 高度控制器
pub struct HeightController<'a, L> {
    bus: &'a BusContext<L>,
    sampler: SamplingFilter,
    settings: ControlSettings,
}

impl<'a, L: BusLink> HeightController<'a, L> {
    pub fn new(bus: &'a BusContext<L>, sampler: SamplingFilter, settings: ControlSettings) -> Self {
        Self {
            bus,
            sampler,
            settings,
        }
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    /// 沿 `direction` 移动到 `target_cm`：粗调 + 精调
    pub fn move_to(&self, direction: Direction, target_cm: f64) -> Result<MoveReport, ControlError> {
        info!("Moving {} to {:.1}cm", direction, target_cm);

        let coarse_steps = self.approach(direction, target_cm)?;
        let (final_cm, corrections) = self.settle(target_cm)?;

        info!(
            "Reached {:.2}cm (target {:.1}cm, {} coarse steps, {} corrections)",
            final_cm, target_cm, coarse_steps, corrections
        );

        Ok(MoveReport {
            direction,
            target_cm,
            final_cm,
            coarse_steps,
            corrections,
        })
    }

    /// 粗调：持续通电直到单次读数到达或越过目标，返回通电次数
    pub fn approach(&self, direction: Direction, target_cm: f64) -> Result<u32, ControlError> {
        let mut steps = 0u32;

        loop {
            let status = self.sampler.read_once(self.bus)?;
            debug!("Read status: {}", status);

            if direction.has_reached(status.distance_cm(), target_cm) {
                break;
            }

            self.bus.send(direction.switch_command())?;
            self.bus.send(Command::SwitchOn)?;
            steps += 1;
        }

        self.bus.send(Command::SwitchOff)?;
        debug!("Coarse approach done after {} steps", steps);
        Ok(steps)
    }

    /// 精调：点动修正直到平均读数落入容差带，返回 (最终平均读数, 点动次数)
    pub fn settle(&self, target_cm: f64) -> Result<(f64, u32), ControlError> {
        let mut corrections = 0u32;

        loop {
            let average = self
                .sampler
                .sample_average(self.bus, self.settings.fine_runs)?;

            let Some(direction) = self.settings.correction(average, target_cm) else {
                return Ok((average, corrections));
            };

            if let Some(max) = self.settings.max_corrections
                && corrections >= max
            {
                return Err(ControlError::NotConverged {
                    target_cm,
                    last_cm: average,
                    corrections,
                });
            }

            debug!(
                "Average {:.2}cm outside [{:.2}, {:.2}], pulsing {}",
                average,
                target_cm - self.settings.tolerance_cm,
                target_cm + self.settings.tolerance_cm,
                direction
            );
            self.pulse(direction)?;
            corrections += 1;
        }
    }

    /// 点动：设置方向、通电、等待、断电
    fn pulse(&self, direction: Direction) -> Result<(), BusError> {
        self.bus.send(direction.switch_command())?;
        self.bus.send(Command::SwitchOn)?;
        if !self.settings.pulse.is_zero() {
            thread::sleep(self.settings.pulse);
        }
        self.bus.send(Command::SwitchOff)
    }
}
