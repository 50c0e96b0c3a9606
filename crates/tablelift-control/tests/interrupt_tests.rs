//! 真实信号下的中断收尾
//!
//! 测试进程以子进程方式重新运行自己：子进程安装中断处理器并开始一次
//! 永远到不了目标的移动，父进程向它发送 SIGINT，然后检查退出码和锁文件。

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tablelift_bus::mock::SimulatedTable;
use tablelift_control::{
    ControlConfig, HeightStore, INTERRUPT_EXIT_CODE, InterruptGuard, Mark, MarkerFileLock,
    Session,
};

/// 设置后以子进程身份运行，值为工作目录
const CHILD_ENV: &str = "TABLELIFT_INTERRUPT_CHILD";
const READY_FILE: &str = "ready";

fn test_config(dir: &Path) -> ControlConfig {
    let mut config = ControlConfig::default();
    config.sampling.settle_ms = 1;
    config.control.pulse_ms = 0;
    config.lock.path = dir.join("tableHeight_lock");
    config.lock.max_attempts = 1;
    config.lock.retry_delay_ms = 0;
    config.store.dir = dir.to_path_buf();
    config
}

/// 子进程：会话建立后写 ready 文件，然后一直移动直到被信号结束
fn run_child(dir: &Path) {
    let guard = InterruptGuard::install(INTERRUPT_EXIT_CODE).unwrap();
    let config = test_config(dir);
    HeightStore::new(dir).write_mark(Mark::High, 50.0).unwrap();

    let table = SimulatedTable::new(30.0).with_step_cm(0.0);
    let lock = MarkerFileLock::new(&config.lock.path);
    let session = Session::start_guarded(lock, config, move |_| Ok(table), &guard).unwrap();
    fs::write(dir.join(READY_FILE), "").unwrap();

    // 收尾后移动以 Halted 结束；进程由处理器退出，这里不能先返回
    let _ = session.move_to_mark(Mark::High);
    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

#[test]
fn test_sigint_during_move_releases_lock_and_exits() {
    if let Ok(dir) = std::env::var(CHILD_ENV) {
        run_child(Path::new(&dir));
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("tableHeight_lock");

    let mut child = Command::new(std::env::current_exe().unwrap())
        .args([
            "test_sigint_during_move_releases_lock_and_exits",
            "--exact",
            "--nocapture",
            "--test-threads=1",
        ])
        .env(CHILD_ENV, dir.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !dir.path().join(READY_FILE).exists() {
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("child never started its session");
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(lock_path.exists(), "child should hold the lock");

    let sent = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(INTERRUPT_EXIT_CODE));
    assert!(!lock_path.exists(), "interrupt must release the lock");
}
