//! 测试辅助：在模拟升降桌上建立 CLI 会话

use std::path::Path;

use tablelift_bus::BusLink;
use tablelift_bus::mock::SimulatedTable;
use tablelift_control::{ControlConfig, Session, open_lock};

use crate::modes::oneshot::CliSession;

/// 锁和标定点都放在 `dir` 下，不等待、不重试
pub fn test_config(dir: &Path) -> ControlConfig {
    let mut config = ControlConfig::default();
    config.sampling.settle_ms = 0;
    config.control.pulse_ms = 0;
    config.lock.path = dir.join("tableHeight_lock");
    config.lock.max_attempts = 1;
    config.lock.retry_delay_ms = 0;
    config.store.dir = dir.to_path_buf();
    config
}

/// 与真实 CLI 相同的会话类型，链路换成 `table` 的克隆
pub fn simulated_session(dir: &Path, table: &SimulatedTable) -> CliSession {
    let config = test_config(dir);
    let lock = open_lock(&config.lock);
    let link = table.clone();
    Session::start(lock, config, move |_| {
        Ok(Box::new(link) as Box<dyn BusLink + Send>)
    })
    .unwrap()
}

/// 命令写出的文本
pub fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}
