//! 模拟升降桌
//!
//! 用于测试的 [`BusLink`] 实现，模拟一张带声呐的升降桌：
//!
//! - 每次 `SwitchOn` 沿当前方向移动固定步长
//! - `SwitchOff` 停止移动（可选：第一次停机时按惯性多走一段）
//! - `SonarRun` 锁存一次测量（可叠加循环噪声）
//! - 可在 N 次传输后注入故障
//!
//! 状态保存在 `Arc<Mutex<..>>` 中，克隆出的句柄可在测试中观察命令历史。

use std::sync::Arc;

use parking_lot::Mutex;
use tablelift_protocol::{TICKS_PER_CM, cm_to_ticks};

use crate::{
    BusDeviceError, BusDeviceErrorKind, BusError, BusLink, Command, Status, StatusFrame,
};

#[derive(Debug)]
struct SimState {
    /// 真实高度（tick，浮点以避免累积取整误差）
    height_ticks: f64,
    switch_on: bool,
    switch_up: bool,
    last_command: Command,
    step_ticks: f64,
    /// 一次性惯性过冲（第一次带电停机时生效）
    overshoot_ticks: Option<f64>,
    noise_ticks: Vec<i32>,
    noise_index: usize,
    measured_ticks: u16,
    fail_after: Option<usize>,
    transactions: usize,
    log: Vec<Command>,
}

impl SimState {
    fn sign(&self) -> f64 {
        if self.switch_up { 1.0 } else { -1.0 }
    }

    fn check_fault(&mut self) -> Result<(), BusError> {
        if let Some(limit) = self.fail_after
            && self.transactions >= limit
        {
            return Err(BusDeviceError::new(
                BusDeviceErrorKind::Injected,
                format!("injected failure after {} transactions", limit),
            )
            .into());
        }
        self.transactions += 1;
        Ok(())
    }

    fn measure(&mut self) {
        let noise = if self.noise_ticks.is_empty() {
            0
        } else {
            let n = self.noise_ticks[self.noise_index % self.noise_ticks.len()];
            self.noise_index += 1;
            n
        };
        let ticks = (self.height_ticks.round() as i64 + noise as i64).clamp(0, u16::MAX as i64);
        self.measured_ticks = ticks as u16;
    }
}

/// 模拟升降桌链路
#[derive(Debug, Clone)]
pub struct SimulatedTable {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedTable {
    /// 创建一张初始高度为 `height_cm` 的模拟桌，默认每次 `SwitchOn` 移动 1 cm
    pub fn new(height_cm: f64) -> Self {
        let height_ticks = height_cm * TICKS_PER_CM;
        Self {
            state: Arc::new(Mutex::new(SimState {
                height_ticks,
                switch_on: false,
                switch_up: true,
                last_command: Command::SonarNoop,
                step_ticks: TICKS_PER_CM,
                overshoot_ticks: None,
                noise_ticks: Vec::new(),
                noise_index: 0,
                measured_ticks: cm_to_ticks(height_cm),
                fail_after: None,
                transactions: 0,
                log: Vec::new(),
            })),
        }
    }

    /// 设置每次 `SwitchOn` 的移动步长（厘米）
    pub fn with_step_cm(self, step_cm: f64) -> Self {
        self.state.lock().step_ticks = step_cm * TICKS_PER_CM;
        self
    }

    /// 设置一次性惯性过冲（厘米），在第一次带电 `SwitchOff` 时沿运动方向生效
    pub fn with_overshoot_cm(self, overshoot_cm: f64) -> Self {
        self.state.lock().overshoot_ticks = Some(overshoot_cm * TICKS_PER_CM);
        self
    }

    /// 设置循环噪声序列（tick），每次 `SonarRun` 取下一个值
    pub fn with_noise_ticks(self, noise: Vec<i32>) -> Self {
        self.state.lock().noise_ticks = noise;
        self
    }

    /// 在 `transactions` 次成功传输之后，所有传输都失败
    pub fn fail_after(self, transactions: usize) -> Self {
        self.state.lock().fail_after = Some(transactions);
        self
    }

    /// 当前真实高度（厘米）
    pub fn height_cm(&self) -> f64 {
        self.state.lock().height_ticks / TICKS_PER_CM
    }

    /// 电机是否通电
    pub fn is_on(&self) -> bool {
        self.state.lock().switch_on
    }

    /// 已发送的全部命令
    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().log.clone()
    }

    /// 最后一条命令
    pub fn last_command(&self) -> Option<Command> {
        self.state.lock().log.last().copied()
    }

    /// 某条命令的发送次数
    pub fn count(&self, command: Command) -> usize {
        self.state.lock().log.iter().filter(|&&c| c == command).count()
    }
}

impl BusLink for SimulatedTable {
    fn send(&mut self, command: Command) -> Result<(), BusError> {
        let mut s = self.state.lock();
        s.check_fault()?;
        s.log.push(command);
        s.last_command = command;

        match command {
            Command::SonarNoop => {},
            Command::SonarRun => s.measure(),
            Command::SwitchUp => s.switch_up = true,
            Command::SwitchDown => s.switch_up = false,
            Command::SwitchOn => {
                s.switch_on = true;
                let delta = s.step_ticks * s.sign();
                s.height_ticks = (s.height_ticks + delta).max(0.0);
            },
            Command::SwitchOff => {
                if s.switch_on
                    && let Some(overshoot) = s.overshoot_ticks.take()
                {
                    let delta = overshoot * s.sign();
                    s.height_ticks = (s.height_ticks + delta).max(0.0);
                }
                s.switch_on = false;
            },
        }

        Ok(())
    }

    fn read_status_frame(&mut self) -> Result<StatusFrame, BusError> {
        let mut s = self.state.lock();
        s.check_fault()?;
        let status = Status {
            distance_ticks: s.measured_ticks,
            switch_on: s.switch_on,
            switch_up: s.switch_up,
            last_command: Some(s.last_command),
        };
        Ok(status.to_frame())
    }
}
