//! 单实例独占锁
//!
//! 保证同一时刻只有一个控制会话操作执行器：两个进程共享总线会让电机指令互相竞争。
//!
//! - [`MarkerFileLock`]：零字节标记文件，存在即表示有会话在运行（默认）
//! - [`AdvisoryFileLock`]：`fs4` 排他咨询锁，进程崩溃时由操作系统释放
//!
//! 两种实现都通过 [`ExclusionLock`] trait 使用，控制器不感知具体原语。

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fs4::fs_std::FileExt;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{LockConfig, LockKind};

/// 获取锁失败
#[derive(Error, Debug)]
pub enum LockError {
    /// 重试预算耗尽，锁仍被其他实例持有
    #[error("Lock {path} is held by another session (gave up after {attempts} attempts)")]
    Busy { path: PathBuf, attempts: u32 },

    #[error("IO error on lock {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 重试策略：最多尝试 `max_attempts` 次，每次失败后等待 `retry_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// 只尝试一次
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            retry_delay: Duration::ZERO,
        }
    }
}

/// 单实例锁
pub trait ExclusionLock: Send {
    /// 获取锁，失败时按策略重试
    fn acquire(&mut self, policy: RetryPolicy) -> Result<(), LockError>;

    /// 释放锁（幂等）
    fn release(&mut self) -> io::Result<()>;

    /// 当前实例是否持有锁
    fn is_held(&self) -> bool;

    fn path(&self) -> &Path;
}

impl<T: ExclusionLock + ?Sized> ExclusionLock for Box<T> {
    fn acquire(&mut self, policy: RetryPolicy) -> Result<(), LockError> {
        (**self).acquire(policy)
    }

    fn release(&mut self) -> io::Result<()> {
        (**self).release()
    }

    fn is_held(&self) -> bool {
        (**self).is_held()
    }

    fn path(&self) -> &Path {
        (**self).path()
    }
}

/// 按配置创建锁
pub fn open_lock(config: &LockConfig) -> Box<dyn ExclusionLock> {
    match config.kind {
        LockKind::Marker => Box::new(MarkerFileLock::new(&config.path)),
        LockKind::Advisory => Box::new(AdvisoryFileLock::new(&config.path)),
    }
}

/// 有界重试循环
///
/// `attempt` 返回 `Ok(true)` 表示获得锁，`Ok(false)` 表示锁被占用。
fn retry_acquire<F>(path: &Path, policy: RetryPolicy, mut attempt: F) -> Result<(), LockError>
where
    F: FnMut() -> io::Result<bool>,
{
    let attempts = policy.max_attempts.max(1);
    for n in 1..=attempts {
        let acquired = attempt().map_err(|source| LockError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if acquired {
            info!("Acquired lock {} (attempt {})", path.display(), n);
            return Ok(());
        }

        debug!(
            "Lock {} is busy (attempt {}/{})",
            path.display(),
            n,
            attempts
        );
        if n < attempts && !policy.retry_delay.is_zero() {
            thread::sleep(policy.retry_delay);
        }
    }

    Err(LockError::Busy {
        path: path.to_path_buf(),
        attempts,
    })
}

/// 零字节标记文件锁
#[derive(Debug)]
pub struct MarkerFileLock {
    path: PathBuf,
    held: bool,
}

impl MarkerFileLock {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            held: false,
        }
    }
}

impl ExclusionLock for MarkerFileLock {
    fn acquire(&mut self, policy: RetryPolicy) -> Result<(), LockError> {
        if self.held {
            return Ok(());
        }

        let path = self.path.clone();
        retry_acquire(&path, policy, || {
            // create_new 保证“检查不存在并创建”是原子的
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e),
            }
        })?;
        self.held = true;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        if !self.held {
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {},
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => return Err(e),
        }
        self.held = false;
        info!("Released lock {}", self.path.display());
        Ok(())
    }

    fn is_held(&self) -> bool {
        self.held
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// 排他咨询锁
///
/// 锁文件本身保留在磁盘上，互斥由 `flock`/`LockFileEx` 提供。
#[derive(Debug)]
pub struct AdvisoryFileLock {
    path: PathBuf,
    file: Option<File>,
}

impl AdvisoryFileLock {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }
}

impl ExclusionLock for AdvisoryFileLock {
    fn acquire(&mut self, policy: RetryPolicy) -> Result<(), LockError> {
        if self.file.is_some() {
            return Ok(());
        }

        let path = self.path.clone();
        let mut locked = None;
        retry_acquire(&path, policy, || {
            // 注意：这里不截断文件，因为还没拿到锁
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .read(true)
                .open(&path)?;
            if file.try_lock_exclusive()? {
                locked = Some(file);
                Ok(true)
            } else {
                Ok(false)
            }
        })?;
        self.file = locked;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file)?;
            info!("Released lock {}", self.path.display());
        }
        Ok(())
    }

    fn is_held(&self) -> bool {
        self.file.is_some()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AdvisoryFileLock {
    fn drop(&mut self) {
        // 文件关闭时操作系统也会释放锁
        let _ = self.release();
    }
}
