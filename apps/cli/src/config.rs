//! 配置文件定位
//!
//! 优先级：`--config` > `<config_dir>/tablelift/config.toml` > 内置默认值

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tablelift_control::ControlConfig;
use tracing::debug;

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("tablelift");
    path.push("config.toml");
    Some(path)
}

/// 加载配置
///
/// 显式指定的文件必须存在；默认位置的文件不存在时使用内置默认值。
pub fn load(explicit: Option<&Path>) -> Result<ControlConfig> {
    load_from(explicit, default_config_path())
}

fn load_from(explicit: Option<&Path>, fallback: Option<PathBuf>) -> Result<ControlConfig> {
    if let Some(path) = explicit {
        debug!("Loading config from {}", path.display());
        return ControlConfig::load(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()));
    }

    if let Some(path) = fallback
        && path.exists()
    {
        debug!("Loading config from {}", path.display());
        return ControlConfig::load(&path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()));
    }

    debug!("No config file, using defaults");
    Ok(ControlConfig::default())
}
