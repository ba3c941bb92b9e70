mod common;

use ads7846::{
    calibration::CALIBRATION_MAGIC, Ads7846, CalibrationError, CalibrationMatrix, TouchConfig,
};
use common::*;
use embedded_graphics::{mock_display::MockDisplay, pixelcolor::Rgb565, prelude::*};

const TARGETS: [Point; 3] = [Point::new(20, 20), Point::new(300, 120), Point::new(160, 220)];

/// Raw readings for `x = (raw_x - 100) / 2`, `y = (raw_y - 100) / 2`.
fn raw_for(target: Point) -> Point {
    Point::new(target.x * 2 + 100, target.y * 2 + 100)
}

#[test]
fn blank_store_gets_factory_matrix() {
    let (mut touch, _panel, _scheduler) = setup();
    let mut store = [0u32; 8];

    touch.init_calibration(&mut store);

    assert_eq!(*touch.calibration(), CalibrationMatrix::FACTORY);
    assert_eq!(store[0], CALIBRATION_MAGIC);
    assert_eq!(store[7] as i32, CalibrationMatrix::FACTORY.div);
}

#[test]
fn stored_matrix_is_restored() {
    let (mut touch, _panel, _scheduler) = setup();
    let mut store = [0u32; 8];
    SHIFT_MATRIX.persist(&mut store).unwrap();
    touch.install_calibration(CalibrationMatrix::FACTORY);

    touch.init_calibration(&mut store);
    assert_eq!(*touch.calibration(), SHIFT_MATRIX);
}

#[test]
fn failed_calibration_keeps_previous_matrix() {
    let (mut touch, _panel, _scheduler) = setup();
    let raws = [Point::new(100, 100), Point::new(200, 200), Point::new(300, 300)];

    assert_eq!(
        touch.set_calibration(&TARGETS, &raws),
        Err(CalibrationError::InvalidGeometry)
    );
    assert_eq!(*touch.calibration(), SHIFT_MATRIX);
    assert!(!touch.install_calibration(CalibrationMatrix {
        div: 0,
        ..SHIFT_MATRIX
    }));
    assert_eq!(*touch.calibration(), SHIFT_MATRIX);
}

#[test]
fn set_calibration_maps_subsequent_touches() {
    let (mut touch, panel, mut scheduler) = setup();
    let matrix = touch
        .set_calibration(&TARGETS, &TARGETS.map(raw_for))
        .unwrap();
    assert_eq!(matrix.transform(raw_for(Point::new(60, 80))), Some(Point::new(60, 80)));
    let mut store = [0u32; 8];
    touch.persist_calibration(&mut store).unwrap();
    assert_eq!(CalibrationMatrix::load(&store), Some(matrix));

    // raw (700, 340), see `raw12` for the 12 bit encoding.
    {
        let mut panel = panel.borrow_mut();
        panel.touching = true;
        panel.x = 4048 - 2 * 700;
        panel.y = 2 * 340;
    }
    touch.on_edge(&mut scheduler, &mut NoDelay);
    assert_eq!(touch.actual_position(), TARGETS[1]);
}

#[test]
fn wizard_collects_three_points_and_persists() {
    take_events();
    let panel = Panel::default();
    {
        let mut panel = panel.borrow_mut();
        panel.hold_reads = 4;
        // `touch_at` encodes positions for the shift matrix, undo its offset.
        panel.touches = TARGETS
            .iter()
            .map(|&t| raw_for(t) - Point::new(1000, 1000))
            .collect();
    }
    let mut touch = Ads7846::new(
        FakeChip(panel.clone()),
        FakeIrq(panel.clone()),
        TouchConfig::default(),
    );
    let mut scheduler = FakeScheduler::default();
    let mut store = [0u32; 8];
    let mut display = MockDisplay::<Rgb565>::new();
    display.set_allow_overdraw(true);
    display.set_allow_out_of_bounds_drawing(true);

    let matrix = touch.run_calibration_wizard(&mut display, &mut scheduler, &mut NoDelay, &mut store);

    for target in TARGETS {
        assert_eq!(matrix.transform(raw_for(target)), Some(target));
    }
    assert_eq!(*touch.calibration(), matrix);
    assert_eq!(store[0], CALIBRATION_MAGIC);
    assert_eq!(CalibrationMatrix::load(&store), Some(matrix));
    assert_eq!(display.get_pixel(Point::new(32, 32)), Some(Rgb565::WHITE));
}
