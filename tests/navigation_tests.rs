use hermes_robot::config::Config;
use hermes_robot::control::navigation::{DriveOutput, NavigationController, StopReason};
use hermes_robot::driver::motor::{clamp_duty, Direction};
use hermes_robot::system::command;
use hermes_robot::system::state::ActiveCommand;

const CONFIG: Config = Config::DEFAULT;
const DT: f32 = 0.02;

fn motors(output: DriveOutput) -> [i32; 4] {
    match output {
        DriveOutput::Motors(r) => [r[0].duty, r[1].duty, r[2].duty, r[3].duty],
        DriveOutput::Stop => panic!("expected the motors to run"),
    }
}

/// Spin the robot at `rate` deg/s for `ticks` navigation steps
fn turn(nav: &mut NavigationController, rate: f32, ticks: usize) {
    for _ in 0..ticks {
        nav.tick(Some(rate), DT);
    }
}

#[test]
fn forward_from_stop_locks_current_heading() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    turn(&mut nav, 45.0, 50);
    let yaw = nav.state().yaw;
    assert!((yaw - 45.0).abs() < 0.01);

    nav.apply_command(ActiveCommand::Forward, 100);
    assert_eq!(nav.state().target_yaw, yaw);
    assert_eq!(nav.heading_pid().integral(), 0.0);
}

#[test]
fn repeated_forward_keeps_lock_and_integral() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    nav.apply_command(ActiveCommand::Forward, 0);

    // Drift clockwise and let the integral build up
    turn(&mut nav, -10.0, 25);
    let target = nav.state().target_yaw;
    let integral = nav.heading_pid().integral();
    assert!(integral > 0.0);

    nav.apply_command(ActiveCommand::Forward, 600);
    assert_eq!(nav.state().target_yaw, target);
    assert_eq!(nav.heading_pid().integral(), integral);
    assert_eq!(nav.state().last_command_time, 600);
}

#[test]
fn forward_after_other_command_relocks() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    nav.apply_command(ActiveCommand::Forward, 0);
    turn(&mut nav, -10.0, 25);

    nav.apply_command(ActiveCommand::Left, 500);
    turn(&mut nav, 90.0, 25);
    nav.apply_command(ActiveCommand::Forward, 1_000);

    assert_eq!(nav.state().target_yaw, nav.state().yaw);
    assert_eq!(nav.heading_pid().integral(), 0.0);
}

#[test]
fn every_command_refreshes_last_command_time() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    for (at, cmd) in [
        (10, ActiveCommand::Stop),
        (20, ActiveCommand::Right),
        (30, ActiveCommand::Right),
        (40, ActiveCommand::Stop),
    ] {
        nav.apply_command(cmd, at);
        assert_eq!(nav.state().last_command_time, at);
        assert_eq!(nav.state().active_command, cmd);
    }
}

#[test]
fn decoded_payloads_drive_the_controller() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));

    nav.apply_command(command::decode(br#"{"command": "move:atras"}"#), 5);
    let output = nav.tick(Some(0.0), DT);
    match output {
        DriveOutput::Motors(r) => assert!(r.iter().all(|m| m.direction == Direction::Ccw)),
        DriveOutput::Stop => panic!("BACKWARD must drive"),
    }

    nav.apply_command(command::decode(b"garbage"), 10);
    assert_eq!(nav.state().active_command, ActiveCommand::Stop);
    assert_eq!(nav.tick(Some(0.0), DT), DriveOutput::Stop);
}

#[test]
fn clockwise_drift_speeds_up_right_side() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    nav.apply_command(ActiveCommand::Forward, 0);
    turn(&mut nav, -20.0, 10);

    let [m1, m2, m3, m4] = motors(nav.tick(Some(0.0), DT));
    assert_eq!(m1, m2);
    assert_eq!(m3, m4);
    assert!(m3 > m1, "left {} right {}", m1, m3);
}

/// Skid-steer model: turn rate proportional to the duty difference of the sides
#[test]
fn heading_recovers_after_disturbance() {
    const DEG_PER_S_PER_DUTY: f32 = 0.25;

    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    nav.apply_command(ActiveCommand::Forward, 0);

    let mut rate = 0.0f32;
    let mut peak = 0.0f32;
    for step in 0..750 {
        let [left, _, right, _] = motors(nav.tick(Some(rate), DT));
        let left = f32::from(clamp_duty(left));
        let right = f32::from(clamp_duty(right));
        // Half a second of being pushed clockwise
        let push = if step < 25 { -20.0 } else { 0.0 };
        rate = DEG_PER_S_PER_DUTY * (right - left) + push;
        peak = peak.max(nav.state().yaw.abs());
    }

    assert!(peak > 3.0, "disturbance too small to test anything: {}", peak);
    assert!(nav.state().yaw.abs() < 2.0, "yaw {} after 15 s", nav.state().yaw);
}

#[test]
fn without_gyro_forward_is_straight_and_pid_idle() {
    let mut nav = NavigationController::new(&CONFIG, None);
    assert!(!nav.heading_hold_available());
    nav.apply_command(ActiveCommand::Forward, 0);

    let base = i32::from(CONFIG.motors.heading_base_duty);
    for _ in 0..10 {
        assert_eq!(motors(nav.tick(None, DT)), [base; 4]);
    }
    assert_eq!(nav.heading_pid().integral(), 0.0);
    assert_eq!(nav.state().yaw, 0.0);
}

#[test]
fn emergency_overrides_commands_until_released() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    nav.apply_command(ActiveCommand::Forward, 0);
    assert!(nav.engage_emergency());
    assert!(!nav.engage_emergency());
    assert_eq!(nav.state().active_command, ActiveCommand::Stop);

    // Commands are still accepted but cannot move the robot
    nav.apply_command(ActiveCommand::Right, 100);
    assert_eq!(nav.state().active_command, ActiveCommand::Right);
    assert_eq!(nav.tick(Some(0.0), DT), DriveOutput::Stop);

    assert!(nav.release_emergency());
    assert!(!nav.release_emergency());
    assert!(matches!(nav.tick(Some(0.0), DT), DriveOutput::Motors(_)));
}

#[test]
fn force_stop_only_reports_moving_robots() {
    let mut nav = NavigationController::new(&CONFIG, Some(0.0));
    assert!(!nav.force_stop(StopReason::Obstacle));

    nav.apply_command(ActiveCommand::Backward, 50);
    assert!(nav.force_stop(StopReason::CommandTimeout));
    assert_eq!(nav.state().active_command, ActiveCommand::Stop);
    assert_eq!(nav.state().last_command_time, 50);
}
