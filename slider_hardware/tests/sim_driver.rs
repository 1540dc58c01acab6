use rstest::rstest;
use slider_hardware::SimDriver;
use slider_traits::StepDirDriver;

#[rstest]
fn pulses_are_noops_until_setup_and_enable() {
    let mut drv = SimDriver::new();
    let probe = drv.handle();

    // Neither ready nor enabled: nothing recorded.
    drv.pulse_step(4).unwrap();
    assert_eq!(probe.pulses(), 0);

    drv.setup().unwrap();
    drv.pulse_step(4).unwrap();
    assert_eq!(probe.pulses(), 0, "disabled driver must not step");

    drv.enable(true).unwrap();
    assert!(probe.enabled());
    drv.pulse_step(4).unwrap();
    drv.pulse_step(4).unwrap();
    assert_eq!(probe.pulses(), 2);

    drv.enable(false).unwrap();
    drv.pulse_step(4).unwrap();
    assert_eq!(probe.pulses(), 2);
}

#[rstest]
fn endstops_reflect_handle_mutations() {
    let mut drv = SimDriver::new();
    drv.setup().unwrap();
    let probe = drv.handle();

    assert!(!drv.read_min_endstop().unwrap());
    assert!(!drv.read_max_endstop().unwrap());

    probe.press_min(true);
    assert!(drv.read_min_endstop().unwrap());
    assert!(!drv.read_max_endstop().unwrap());

    probe.press_min(false);
    probe.press_max(true);
    assert!(!drv.read_min_endstop().unwrap());
    assert!(drv.read_max_endstop().unwrap());
}

#[rstest]
fn cleanup_disables() {
    let mut drv = SimDriver::new();
    drv.setup().unwrap();
    drv.enable(true).unwrap();
    let probe = drv.handle();
    drv.cleanup();
    assert!(!probe.enabled());
}

#[test]
fn init_driver_falls_back_to_simulator_off_target() {
    // Without the hardware feature this always yields a working simulator.
    let mut drv = slider_hardware::init_driver(&slider_config::SliderConfig::default());
    drv.enable(true).unwrap();
    drv.pulse_step(4).unwrap();
    drv.enable(false).unwrap();
}
