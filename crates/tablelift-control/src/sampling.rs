//! 采样滤波
//!
//! 声呐单次读数有 ±1 tick 级别的噪声。这里对 N 次测距取算术平均，
//! 是系统唯一的降噪手段。

use std::thread;
use std::time::Duration;

use tablelift_bus::{BusContext, BusError, BusLink, Command, Status};
use tracing::{debug, trace};

/// 增量算术平均
///
/// 使用 `avg' = (avg * i + x) / (i + 1)` 逐个折叠样本。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    mean: f64,
    count: u32,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一个样本，返回新的平均值
    pub fn push(&mut self, sample: f64) -> f64 {
        let i = self.count as f64;
        self.mean = (self.mean * i + sample) / (i + 1.0);
        self.count += 1;
        self.mean
    }

    /// 当前平均值，没有样本时为 `None`
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl FromIterator<f64> for RunningMean {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut mean = Self::new();
        for sample in iter {
            mean.push(sample);
        }
        mean
    }
}

/// 采样滤波器
#[derive(Debug, Clone, Copy)]
pub struct SamplingFilter {
    settle: Duration,
}

impl SamplingFilter {
    /// `settle`：触发测距后等待回波的时间
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// 触发一次测距并读取状态（单次、未滤波）
    pub fn read_once<L: BusLink>(&self, bus: &BusContext<L>) -> Result<Status, BusError> {
        bus.send(Command::SonarRun)?;
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        bus.read_status()
    }

    /// 连续测距 `runs` 次并返回平均距离（厘米）
    ///
    /// 任意一次总线失败都会放弃整个平均值。`runs == 0` 按 1 次处理。
    pub fn sample_average<L: BusLink>(
        &self,
        bus: &BusContext<L>,
        runs: u32,
    ) -> Result<f64, BusError> {
        let runs = runs.max(1);
        let mut mean = RunningMean::new();
        let mut avg = 0.0;

        for i in 0..runs {
            let status = self.read_once(bus)?;
            avg = mean.push(status.distance_cm());
            trace!(sample = i, distance_cm = status.distance_cm(), avg, "sonar sample");
        }

        debug!("Read distance avg: {:.2}cm over {} samples", avg, runs);
        Ok(avg)
    }
}
