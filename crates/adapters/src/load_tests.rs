// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn normalize_load_divides_by_cores() {
    let load = normalize_load(2.0, 4).unwrap();
    assert!((load - 0.5).abs() < f64::EPSILON);
}

#[test]
fn normalize_load_clamps_overload() {
    assert_eq!(normalize_load(9.0, 2), Some(1.0));
}

#[test]
fn normalize_load_rejects_unusable_readings() {
    assert_eq!(normalize_load(1.0, 0), None);
    assert_eq!(normalize_load(f64::NAN, 4), None);
    assert_eq!(normalize_load(-1.0, 4), None);
}

#[test]
fn system_load_sees_cores_and_stays_in_range() {
    let probe = SystemLoad::new();
    assert!(probe.cpus() > 0);

    let load = probe.sample();
    assert!((0.0..=1.0).contains(&load));
}

#[test]
fn fake_probe_is_settable() {
    let probe = FakeLoadProbe::new(0.1);
    probe.set(0.95);
    assert_eq!(probe.sample(), 0.95);
}
