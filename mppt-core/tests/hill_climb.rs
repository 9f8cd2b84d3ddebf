use mppt_core::climb::{ClimbDecision, ClimbDirection, HillClimbController};
use mppt_core::ladder::LadderState;

#[test]
fn rising_power_walks_state_down_without_flipping() {
    let mut controller = HillClimbController::new();
    let mut previous = controller.state();

    for tick in 1..=40u8 {
        let decision = controller.step(f32::from(tick));
        assert_eq!(decision, ClimbDecision::Continued);
        assert!(
            controller.state() < previous,
            "tick {tick}: state must keep decreasing"
        );
        assert_eq!(controller.direction(), ClimbDirection::Rising);
        previous = controller.state();
    }

    assert_eq!(controller.state(), LadderState::new(255 - 40));
}

#[test]
fn single_drop_while_rising_steps_up_and_flips() {
    let mut controller = HillClimbController::new();
    controller.step(10.0);
    controller.step(11.0);
    let before = controller.state();
    assert_eq!(before, LadderState::new(253));

    assert_eq!(controller.step(9.0), ClimbDecision::Reversed);
    assert_eq!(controller.state(), before.increment());
    assert_eq!(controller.direction(), ClimbDirection::Falling);
}

#[test]
fn oscillates_around_a_power_peak() {
    // Power peaks at state 200; the controller should settle into a small band
    // around it rather than drift away.
    let peak = 200.0_f32;
    let power_at = |state: LadderState| 10_000.0 - (f32::from(state.raw()) - peak).powi(2);

    let mut controller = HillClimbController::new();
    for _ in 0..200 {
        let power = power_at(controller.state());
        controller.step(power);
    }

    let settled = f32::from(controller.state().raw());
    assert!(
        (settled - peak).abs() <= 3.0,
        "controller settled at {settled}"
    );
}

#[test]
fn pinned_at_zero_while_power_keeps_rising() {
    let mut controller =
        HillClimbController::starting_at(LadderState::new(2), ClimbDirection::Rising);
    for power in [1.0, 2.0, 3.0, 4.0, 5.0] {
        controller.step(power);
    }
    assert_eq!(controller.state(), LadderState::MIN);
    assert_eq!(
        controller.direction(),
        ClimbDirection::Rising,
        "saturation alone never flips the phase"
    );
}

#[test]
fn rising_power_parks_at_maximum_in_falling_phase() {
    let mut controller = HillClimbController::new();
    controller.step(10.0);
    assert_eq!(controller.step(9.0), ClimbDecision::Reversed);
    assert_eq!(controller.state(), LadderState::MAX);
    assert_eq!(controller.direction(), ClimbDirection::Falling);

    for power in [11.0, 12.0, 13.0] {
        assert_eq!(controller.step(power), ClimbDecision::Continued);
        assert_eq!(controller.state(), LadderState::MAX);
        assert_eq!(controller.direction(), ClimbDirection::Falling);
    }

    assert_eq!(controller.step(12.5), ClimbDecision::Reversed);
    assert_eq!(controller.state(), LadderState::new(254));
    assert_eq!(controller.direction(), ClimbDirection::Rising);
}
