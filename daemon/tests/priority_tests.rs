use loadguard_daemon::platform::PriorityClass;

#[test]
fn tiers_follow_nice_ranges() {
    assert_eq!(PriorityClass::IDLE.tier(), "idle");
    assert_eq!(PriorityClass::from_nice(10).tier(), "below_normal");
    assert_eq!(PriorityClass::NORMAL.tier(), "normal");
    assert_eq!(PriorityClass::from_nice(-5).tier(), "above_normal");
    assert_eq!(PriorityClass::from_nice(-15).tier(), "high");
}

#[test]
fn strongest_nice_is_still_a_nice_tier() {
    let top = PriorityClass::from_nice(-20);
    assert_eq!(top.tier(), "high");
    assert_eq!(top.to_string(), "high (nice -20)");
}

#[test]
fn nice_values_are_clamped() {
    assert_eq!(PriorityClass::from_nice(40), PriorityClass::IDLE);
    assert_eq!(PriorityClass::from_nice(-40).nice(), -20);
    assert!(PriorityClass::from_nice(25).is_idle());
}
