//! 控制会话与生命周期
//!
//! 会话顺序：
//! 1. 获取独占锁（失败则不触碰总线）
//! 2. 打开总线链路（失败则释放锁）
//! 3. 执行命令
//! 4. 收尾：断开电机电源（尽力而为，只记日志）并释放锁
//!
//! 收尾在所有路径上都会执行：正常结束（[`Session::close`]）、错误返回
//! （`Drop`）以及中断信号（[`InterruptGuard`]）。
//!
//! 中断处理器在获取锁之前安装。[`Session::start_guarded`] 拿到锁后立即登记
//! “释放锁”，链路打开后再换成完整收尾，因此打开链路期间收到信号也不会留下锁文件。

use std::sync::Arc;

use parking_lot::Mutex;
use tablelift_bus::{BusContext, BusError, BusLink, Status};
use tracing::{info, warn};

use crate::config::ControlConfig;
use crate::controller::{ControlSettings, HeightController, MoveReport};
use crate::error::ControlError;
use crate::lock::ExclusionLock;
use crate::sampling::SamplingFilter;
use crate::store::{HeightStore, Mark, StoreError};

/// 收到中断信号后的进程退出码
pub const INTERRUPT_EXIT_CODE: i32 = 130;

type Cleanup = Box<dyn FnMut() + Send>;

/// 中断处理器（Ctrl+C / SIGTERM）
///
/// 每个进程只能安装一次。信号到达时执行当前登记的收尾动作，然后以
/// 安装时给定的退出码退出。
#[derive(Clone)]
pub struct InterruptGuard {
    cleanup: Arc<Mutex<Option<Cleanup>>>,
    exit_code: i32,
}

impl InterruptGuard {
    /// 安装信号处理器
    pub fn install(exit_code: i32) -> Result<Self, ControlError> {
        let guard = Self::new(exit_code);
        let handler = guard.clone();
        ctrlc::set_handler(move || {
            warn!("Received interrupt signal. Shutting down...");
            handler.trigger();
            std::process::exit(handler.exit_code);
        })?;
        Ok(guard)
    }

    fn new(exit_code: i32) -> Self {
        Self {
            cleanup: Arc::new(Mutex::new(None)),
            exit_code,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// 登记收尾动作，替换之前登记的
    pub fn register(&self, cleanup: impl FnMut() + Send + 'static) {
        *self.cleanup.lock() = Some(Box::new(cleanup));
    }

    /// 执行已登记的收尾（最多一次），返回是否执行
    pub fn trigger(&self) -> bool {
        let cleanup = self.cleanup.lock().take();
        match cleanup {
            Some(mut cleanup) => {
                cleanup();
                true
            },
            None => false,
        }
    }
}

/// 尽力释放锁，失败只记日志
fn release_lock<X: ExclusionLock>(lock: &Arc<Mutex<X>>) {
    let mut lock = lock.lock();
    if let Err(e) = lock.release() {
        warn!("Error releasing lock {}: {}", lock.path().display(), e);
    }
}

/// 共享收尾动作
///
/// 可克隆，多个线程可同时调用 [`Teardown::run`]，只有第一次真正执行；
/// 其余调用会等待它完成后返回。
pub struct Teardown<L, X> {
    bus: BusContext<L>,
    lock: Arc<Mutex<X>>,
    done: Arc<Mutex<bool>>,
}

impl<L, X> Clone for Teardown<L, X> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            lock: Arc::clone(&self.lock),
            done: Arc::clone(&self.done),
        }
    }
}

impl<L: BusLink, X: ExclusionLock> Teardown<L, X> {
    fn new(bus: BusContext<L>, lock: Arc<Mutex<X>>) -> Self {
        Self {
            bus,
            lock,
            done: Arc::new(Mutex::new(false)),
        }
    }

    /// 断电并释放锁，返回本次调用是否执行了收尾
    pub fn run(&self) -> bool {
        let mut done = self.done.lock();
        if *done {
            return false;
        }
        *done = true;

        if let Err(e) = self.bus.halt() {
            warn!("Error on switch off: {}", e);
        }

        release_lock(&self.lock);

        info!("Session teardown complete");
        true
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock()
    }
}

/// `debug` 命令的输出
#[derive(Debug)]
pub struct DebugReport {
    /// 单次原始状态
    pub status: Status,
    /// 多次采样的平均距离
    pub average_cm: f64,
    /// 上标定点（缺失时为错误，按“未知”处理）
    pub high: Result<f64, StoreError>,
    /// 下标定点
    pub low: Result<f64, StoreError>,
}

/// 控制会话
pub struct Session<L: BusLink, X: ExclusionLock> {
    bus: BusContext<L>,
    store: HeightStore,
    sampler: SamplingFilter,
    config: ControlConfig,
    teardown: Teardown<L, X>,
}

impl<L: BusLink, X: ExclusionLock> Session<L, X> {
    /// 获取锁、打开链路，开始一个会话
    pub fn start<F>(lock: X, config: ControlConfig, open_link: F) -> Result<Self, ControlError>
    where
        F: FnOnce(&ControlConfig) -> Result<L, BusError>,
    {
        Self::start_with(lock, config, open_link, |_| {}, |_| {})
    }

    /// `on_locked` 在拿到锁后、打开链路前调用；`on_ready` 在收尾句柄建立后调用
    fn start_with<F, A, B>(
        mut lock: X,
        config: ControlConfig,
        open_link: F,
        on_locked: A,
        on_ready: B,
    ) -> Result<Self, ControlError>
    where
        F: FnOnce(&ControlConfig) -> Result<L, BusError>,
        A: FnOnce(&Arc<Mutex<X>>),
        B: FnOnce(&Teardown<L, X>),
    {
        config.validate()?;

        // 没有独占权之前不能触碰总线
        lock.acquire(config.lock.retry_policy())?;
        let lock_path = lock.path().to_path_buf();
        let lock = Arc::new(Mutex::new(lock));
        on_locked(&lock);

        let link = match open_link(&config) {
            Ok(link) => link,
            Err(e) => {
                release_lock(&lock);
                return Err(e.into());
            },
        };

        info!("Session started (lock {})", lock_path.display());

        let bus = BusContext::new(link);
        let teardown = Teardown::new(bus.clone(), lock);
        on_ready(&teardown);

        Ok(Self {
            bus,
            store: HeightStore::new(&config.store.dir),
            sampler: SamplingFilter::new(config.sampling.settle()),
            config,
            teardown,
        })
    }

    pub fn bus(&self) -> &BusContext<L> {
        &self.bus
    }

    pub fn store(&self) -> &HeightStore {
        &self.store
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// 共享收尾句柄
    pub fn teardown(&self) -> Teardown<L, X> {
        self.teardown.clone()
    }

    pub fn controller(&self) -> HeightController<'_, L> {
        HeightController::new(
            &self.bus,
            self.sampler,
            ControlSettings::from(&self.config.control),
        )
    }

    /// 移动到标定点（high 向上，low 向下）
    ///
    /// 标定缺失时中止：不能朝未定义的目标移动。
    pub fn move_to_mark(&self, mark: Mark) -> Result<MoveReport, ControlError> {
        let target = self.store.read_mark(mark)?;
        info!("Table {} height: {:.1}cm", mark, target);
        self.controller().move_to(mark.direction(), target)
    }

    /// 将当前高度记为标定点，返回写入的平均读数
    pub fn mark(&self, mark: Mark) -> Result<f64, ControlError> {
        let average = self
            .sampler
            .sample_average(&self.bus, self.config.sampling.mark_runs)?;
        self.store.write_mark(mark, average)?;
        Ok(average)
    }

    /// 测量当前高度，`runs` 缺省时使用轻量检查的采样次数
    pub fn measure(&self, runs: Option<u32>) -> Result<f64, ControlError> {
        let runs = runs.unwrap_or(self.config.sampling.check_runs);
        Ok(self.sampler.sample_average(&self.bus, runs)?)
    }

    /// 打印诊断信息所需的数据；标定缺失不视为错误
    pub fn debug_report(&self) -> Result<DebugReport, ControlError> {
        let status = self.sampler.read_once(&self.bus)?;
        let average_cm = self.measure(None)?;

        let high = self.store.read_mark(Mark::High);
        if let Err(e) = &high {
            warn!("{}", e);
        }
        let low = self.store.read_mark(Mark::Low);
        if let Err(e) = &low {
            warn!("{}", e);
        }

        Ok(DebugReport {
            status,
            average_cm,
            high,
            low,
        })
    }

    /// 持续测量，每次平均读数都交给 `on_reading`，回调返回 `false` 时停止
    pub fn watch<F>(&self, runs: Option<u32>, mut on_reading: F) -> Result<(), ControlError>
    where
        F: FnMut(f64) -> bool,
    {
        loop {
            let average = self.measure(runs)?;
            if !on_reading(average) {
                return Ok(());
            }
        }
    }

    /// 正常结束：执行收尾
    pub fn close(self) {
        self.teardown.run();
    }
}

impl<L, X> Session<L, X>
where
    L: BusLink + Send + 'static,
    X: ExclusionLock + 'static,
{
    /// 与 [`Session::start`] 相同，但每个阶段都向 `guard` 登记对应的收尾：
    /// 拿到锁后登记释放锁，会话建立后登记完整收尾（断电 + 释放锁）
    pub fn start_guarded<F>(
        lock: X,
        config: ControlConfig,
        open_link: F,
        guard: &InterruptGuard,
    ) -> Result<Self, ControlError>
    where
        F: FnOnce(&ControlConfig) -> Result<L, BusError>,
    {
        Self::start_with(
            lock,
            config,
            open_link,
            |lock| {
                let lock = Arc::clone(lock);
                guard.register(move || release_lock(&lock));
            },
            |teardown| {
                let teardown = teardown.clone();
                guard.register(move || {
                    teardown.run();
                });
            },
        )
    }
}

impl<L: BusLink, X: ExclusionLock> Drop for Session<L, X> {
    fn drop(&mut self) {
        self.teardown.run();
    }
}
