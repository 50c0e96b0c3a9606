//! 标定高度存储
//!
//! 每个标定点（high/low）保存为一个纯文本文件，内容为一位小数的十进制数。
//! 并发写入由独占锁排除，存储本身不做同步。

use std::fmt;
use std::fs;
use std::io;
use std::num::ParseFloatError;
use std::path::{Path, PathBuf};

use tablelift_protocol::Direction;
use thiserror::Error;
use tracing::info;

/// 标定文件名前缀
pub const MARK_FILE_PREFIX: &str = "tableHeight";

/// 标定存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Table height file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("Table height file {path} contains {value:?}: {source}")]
    Parse {
        path: PathBuf,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("Table height file {path} contains a non-finite value")]
    NotFinite { path: PathBuf },

    #[error("IO error on table height file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// 标定文件是否缺失
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// 标定点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    High,
    Low,
}

impl Mark {
    pub fn name(self) -> &'static str {
        match self {
            Mark::High => "high",
            Mark::Low => "low",
        }
    }

    /// 标定文件名，如 `tableHeight_high`
    pub fn file_name(self) -> String {
        format!("{}_{}", MARK_FILE_PREFIX, self.name())
    }

    /// 移动到该标定点时的方向
    pub fn direction(self) -> Direction {
        match self {
            Mark::High => Direction::Up,
            Mark::Low => Direction::Down,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 标定高度存储
#[derive(Debug, Clone)]
pub struct HeightStore {
    dir: PathBuf,
}

impl HeightStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 标定文件完整路径
    pub fn path(&self, mark: Mark) -> PathBuf {
        self.dir.join(mark.file_name())
    }

    /// 读取标定高度（厘米）
    pub fn read_mark(&self, mark: Mark) -> Result<f64, StoreError> {
        let path = self.path(mark);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path });
            },
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let trimmed = content.trim();
        let value: f64 = trimmed.parse().map_err(|source| StoreError::Parse {
            path: path.clone(),
            value: trimmed.to_string(),
            source,
        })?;
        if !value.is_finite() {
            return Err(StoreError::NotFinite { path });
        }
        Ok(value)
    }

    /// 写入标定高度（保留一位小数，覆盖旧值）
    ///
    /// 先写入同目录下的临时文件再重命名，读者不会看到写了一半的内容。
    pub fn write_mark(&self, mark: Mark, value: f64) -> Result<(), StoreError> {
        let path = self.path(mark);
        if !value.is_finite() {
            return Err(StoreError::NotFinite { path });
        }

        let tmp = self.dir.join(format!(".{}.tmp", mark.file_name()));
        let content = format!("{:.1}", value);
        fs::write(&tmp, &content).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Height for file {} set at {}", path.display(), content);
        Ok(())
    }
}
