//! 高度收敛测试
//!
//! 使用模拟升降桌验证粗调 + 精调在不同起点、步长、过冲和噪声下都能收敛到容差带内。

use std::time::Duration;

use tablelift_bus::mock::SimulatedTable;
use tablelift_bus::{BusContext, Command};
use tablelift_control::{
    ControlConfig, ControlSettings, Direction, HeightController, HeightStore, Mark,
    MarkerFileLock, SamplingFilter, Session,
};

const TARGET: f64 = 50.0;
const TOLERANCE: f64 = 0.4;

fn fast_controller(bus: &BusContext<SimulatedTable>) -> HeightController<'_, SimulatedTable> {
    HeightController::new(
        bus,
        SamplingFilter::new(Duration::ZERO),
        ControlSettings {
            pulse: Duration::ZERO,
            ..Default::default()
        },
    )
}

fn assert_in_band(value: f64) {
    assert!(
        (TARGET - TOLERANCE..=TARGET + TOLERANCE).contains(&value),
        "{:.3}cm is outside [{:.1}, {:.1}]",
        value,
        TARGET - TOLERANCE,
        TARGET + TOLERANCE
    );
}

/// 起点 30 cm，每次 SwitchUp+SwitchOn 上升 2 cm，SwitchOff 不动，目标 50 cm
#[test]
fn test_move_up_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ControlConfig::default();
    config.sampling.settle_ms = 0;
    config.control.pulse_ms = 0;
    config.lock.path = dir.path().join("tableHeight_lock");
    config.store.dir = dir.path().to_path_buf();

    HeightStore::new(dir.path())
        .write_mark(Mark::High, TARGET)
        .unwrap();

    let table = SimulatedTable::new(30.0).with_step_cm(2.0);
    let link = table.clone();
    let lock_path = config.lock.path.clone();
    let session =
        Session::start(MarkerFileLock::new(&lock_path), config, move |_| Ok(link)).unwrap();

    let report = session.move_to_mark(Mark::High).unwrap();

    assert_eq!(report.direction, Direction::Up);
    assert_eq!(report.target_cm, TARGET);
    assert_eq!(report.coarse_steps, 10);
    assert_eq!(report.corrections, 0);
    assert_in_band(report.final_cm);
    assert!(!table.is_on(), "actuator must be off after convergence");
    assert_eq!(table.last_command(), Some(Command::SonarRun));

    session.close();
    assert_eq!(table.last_command(), Some(Command::SwitchOff));
    assert!(!lock_path.exists());
}

/// 精调：起点在容差带外，每次点动固定步长，点动次数有上界
#[test]
fn test_fine_correction_is_bounded() {
    let starts = [45.0, 47.3, 52.9, 53.0, 58.1];
    let steps = [0.3, 0.5, 0.7];

    for &start in &starts {
        for &step in &steps {
            let table = SimulatedTable::new(start).with_step_cm(step);
            let bus = BusContext::new(table.clone());
            let controller = fast_controller(&bus);

            let (final_cm, corrections) = controller.settle(TARGET).unwrap();

            let bound = ((start - TARGET).abs() / step).ceil() as u32 + 1;
            assert_in_band(final_cm);
            assert!(
                corrections <= bound,
                "start {} step {}: {} corrections > bound {}",
                start,
                step,
                corrections,
                bound
            );
            assert_eq!(table.count(Command::SwitchOn) as u32, corrections);
            assert!(!table.is_on());
        }
    }
}

/// 从上方 53 cm 以 0.5 cm 步长向下修正：53 → 50.5 共 5 次仍在带外，第 6 次进入
#[test]
fn test_fine_correction_pulses_down() {
    let table = SimulatedTable::new(53.0).with_step_cm(0.5);
    let bus = BusContext::new(table.clone());
    let controller = fast_controller(&bus);

    let (final_cm, corrections) = controller.settle(TARGET).unwrap();

    assert_eq!(corrections, 6);
    assert!((final_cm - TARGET).abs() < 0.02);
    assert_eq!(table.count(Command::SwitchDown), 6);
    assert_eq!(table.count(Command::SwitchUp), 0);
    assert_eq!(table.count(Command::SwitchOff), 6);
}

/// 向下移动时惯性过冲到目标下方，精调需要反向（向上）修正
#[test]
fn test_move_down_corrects_overshoot_upwards() {
    let table = SimulatedTable::new(60.0)
        .with_step_cm(0.5)
        .with_overshoot_cm(1.0);
    let bus = BusContext::new(table.clone());
    let controller = fast_controller(&bus);

    let report = controller.move_to(Direction::Down, TARGET).unwrap();

    assert_eq!(report.coarse_steps, 20);
    assert_eq!(report.corrections, 2);
    assert_in_band(report.final_cm);
    assert_eq!(table.count(Command::SwitchUp), 2);
    assert!(!table.is_on());
}

/// 向上移动时过冲到目标上方，精调向下修正
#[test]
fn test_move_up_corrects_overshoot_downwards() {
    let table = SimulatedTable::new(45.0)
        .with_step_cm(0.5)
        .with_overshoot_cm(0.8)
        .with_noise_ticks(vec![1, -1, 2, -2, 0]);
    let bus = BusContext::new(table.clone());
    let controller = fast_controller(&bus);

    let report = controller.move_to(Direction::Up, TARGET).unwrap();

    assert_in_band(report.final_cm);
    assert!(
        (1..=2).contains(&report.corrections),
        "corrections = {}",
        report.corrections
    );
    assert!(table.count(Command::SwitchDown) >= 1);
    assert!(!table.is_on());
}

/// 噪声下精调不抖动：平均值已在带内时不点动
#[test]
fn test_noise_inside_band_does_not_chatter() {
    // 单次噪声 ±0.5 cm（约 ±28 tick），超过容差带半宽
    let table = SimulatedTable::new(50.1).with_noise_ticks(vec![28, -28, 14, -14, 0]);
    let bus = BusContext::new(table.clone());
    let controller = fast_controller(&bus);

    for _ in 0..5 {
        let (final_cm, corrections) = controller.settle(TARGET).unwrap();
        assert_eq!(corrections, 0);
        assert_in_band(final_cm);
    }
    assert_eq!(table.count(Command::SwitchOn), 0);
}
