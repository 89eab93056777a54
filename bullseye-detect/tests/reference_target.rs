use bullseye_detect::synthetic::{render_bullseye, BullseyeTarget};
use bullseye_detect::{BullseyeConfig, BullseyeSelector, GrayView, Keypoint, SelectorBuilder};
use image::GrayImage;

const ROWS: usize = 120;
const COLUMNS: usize = 110;

/// How the marker is painted into the reference scene.
#[derive(Clone, Copy)]
struct Rendering {
    row: f64,
    column: f64,
    supersample: usize,
    blur_sigma: Option<f32>,
    dark_center: bool,
}

impl Rendering {
    fn at(row: f64, column: f64) -> Self {
        Self {
            row,
            column,
            supersample: 4,
            blur_sigma: None,
            dark_center: true,
        }
    }
}

fn blur(img: Vec<u8>, rows: usize, columns: usize, sigma: f32) -> Vec<u8> {
    let gray = GrayImage::from_raw(columns as u32, rows as u32, img).unwrap();
    imageproc::filter::gaussian_blur_f32(&gray, sigma).into_raw()
}

/// Gradient background, a bright blob, a dark corner block and one
/// 10/15/5 bullseye.
fn reference_image(rendering: Rendering) -> Vec<u8> {
    let mut img = vec![0u8; ROWS * COLUMNS];
    for row in 0..ROWS {
        for column in 0..COLUMNS {
            img[row * COLUMNS + column] = 90 + (column / 3) as u8;
        }
    }

    for row in 17..34 {
        for column in 77..94 {
            let dr = row as f64 - 25.0;
            let dc = column as f64 - 85.0;
            if dr * dr + dc * dc < 64.0 {
                img[row * COLUMNS + column] = 200;
            }
        }
    }

    for row in 95..ROWS {
        for column in 80..COLUMNS {
            img[row * COLUMNS + column] = 40;
        }
    }

    let target = BullseyeTarget {
        dark_center: rendering.dark_center,
        ..BullseyeTarget::new(rendering.row, rendering.column, 10.0, 15.0, 5)
    };
    render_bullseye(&mut img, ROWS, COLUMNS, &target, rendering.supersample);
    match rendering.blur_sigma {
        Some(sigma) => blur(img, ROWS, COLUMNS, sigma),
        None => img,
    }
}

/// Detects the single marker of `rendering` and checks its location.
fn assert_localized(rendering: Rendering, tolerance: f64) {
    let img = reference_image(rendering);
    let view = GrayView::new(&img, ROWS, COLUMNS).unwrap();

    let mut selector = BullseyeSelector::new(BullseyeConfig::new(10, 15, 5)).unwrap();
    selector.set_image(view).unwrap();

    let expected = Keypoint::new(rendering.row.round() as usize, rendering.column.round() as usize);
    assert_eq!(selector.get_keypoints().unwrap(), vec![expected]);

    let general = selector.get_keypoints_general_position().unwrap();
    assert_eq!(general.len(), 1);
    let (dr, dc) = (general[0].row - rendering.row, general[0].column - rendering.column);
    assert!(
        (dr * dr + dc * dc).sqrt() <= tolerance,
        "marker at ({}, {}) localized at ({:.3}, {:.3})",
        rendering.row,
        rendering.column,
        general[0].row,
        general[0].column
    );
}

#[test]
fn finds_reference_bullseye() {
    assert_localized(Rendering::at(59.0, 54.0), 0.1);
}

#[test]
fn off_grid_bullseye_is_localized_to_a_quarter_pixel() {
    assert_localized(Rendering::at(59.3, 54.4), 0.25);
}

#[test]
fn point_sampled_off_grid_bullseye_is_found() {
    assert_localized(
        Rendering {
            supersample: 1,
            ..Rendering::at(59.3, 54.4)
        },
        0.25,
    );
}

#[test]
fn blurred_off_grid_bullseye_is_found() {
    assert_localized(
        Rendering {
            blur_sigma: Some(0.4),
            ..Rendering::at(59.3, 54.4)
        },
        0.25,
    );
}

#[test]
fn inverted_off_grid_bullseye_is_found() {
    assert_localized(
        Rendering {
            dark_center: false,
            ..Rendering::at(58.6, 54.2)
        },
        0.25,
    );
}

#[test]
fn reference_detection_is_deterministic() {
    let img = reference_image(Rendering::at(59.3, 54.4));
    let view = GrayView::new(&img, ROWS, COLUMNS).unwrap();

    let mut first = BullseyeSelector::new(BullseyeConfig::new(10, 15, 5)).unwrap();
    let mut second = BullseyeSelector::new(BullseyeConfig::new(10, 15, 5)).unwrap();
    first.set_image(view).unwrap();
    second.set_image(view).unwrap();

    assert_eq!(first.get_keypoints().unwrap(), second.get_keypoints().unwrap());
    assert_eq!(
        first.get_keypoints_general_position().unwrap(),
        second.get_keypoints_general_position().unwrap()
    );
}

// Quarter and half pixel offsets are exact in binary, so both markers render
// to identical pixels and score identically.
fn two_target_image(second: BullseyeTarget) -> Vec<u8> {
    let (rows, columns) = (40, 70);
    let mut img = vec![128u8; rows * columns];
    render_bullseye(&mut img, rows, columns, &BullseyeTarget::new(20.25, 19.5, 3.0, 9.0, 3), 4);
    render_bullseye(&mut img, rows, columns, &second, 4);
    img
}

#[test]
fn separated_targets_yield_independent_keypoints() {
    let configured = SelectorBuilder::new().radii(3, 9, 3).build().unwrap();
    let img = two_target_image(BullseyeTarget::new(20.25, 44.5, 3.0, 9.0, 3));
    let view = GrayView::new(&img, 40, 70).unwrap();

    let mut selector = configured.selector();
    selector.set_image(view).unwrap();
    let keypoints = selector.get_keypoints().unwrap();
    assert_eq!(keypoints.len(), 2);
    for (kp, column) in keypoints.iter().zip([19.5, 44.5]) {
        assert_eq!(kp.row, 20);
        assert!((kp.column as f64 - column).abs() <= 0.5);
    }

    let general = selector.get_keypoints_general_position().unwrap();
    for (gp, column) in general.iter().zip([19.5, 44.5]) {
        assert!((gp.row - 20.25).abs() < 0.25);
        assert!((gp.column - column).abs() < 0.25);
    }
}

#[test]
fn targets_within_exclusion_radius_collapse_by_tie_break() {
    let configured = SelectorBuilder::new().radii(3, 9, 3).exclusion_radius(30).build().unwrap();
    let img = two_target_image(BullseyeTarget::new(20.25, 44.5, 3.0, 9.0, 3));
    let view = GrayView::new(&img, 40, 70).unwrap();

    let mut selector = configured.selector();
    selector.set_image(view).unwrap();
    let keypoints = selector.get_keypoints().unwrap();
    assert_eq!(keypoints.len(), 1);
    assert!(keypoints[0].column < 30);
}

#[test]
fn targets_within_exclusion_radius_collapse_to_strongest() {
    let configured = SelectorBuilder::new().radii(3, 9, 3).exclusion_radius(30).build().unwrap();
    let strong = BullseyeTarget {
        dark: 0,
        bright: 255,
        ..BullseyeTarget::new(20.25, 44.5, 3.0, 9.0, 3)
    };
    let img = two_target_image(strong);
    let view = GrayView::new(&img, 40, 70).unwrap();

    let mut selector = configured.selector();
    selector.set_image(view).unwrap();
    let keypoints = selector.get_keypoints().unwrap();
    assert_eq!(keypoints.len(), 1);
    assert!(keypoints[0].column > 40);
}

#[test]
fn targets_near_the_border_are_never_reported() {
    let config = BullseyeConfig::new(3, 9, 3);
    let (rows, columns) = (40, 40);
    let mut img = vec![128u8; rows * columns];
    for &(row, column) in &[(4.2, 20.0), (20.0, 3.4), (35.3, 35.0), (20.3, 19.8)] {
        render_bullseye(&mut img, rows, columns, &BullseyeTarget::for_config(&config, row, column), 4);
    }
    let view = GrayView::new(&img, rows, columns).unwrap();

    let mut selector = BullseyeSelector::new(config).unwrap();
    selector.set_image(view).unwrap();
    let keypoints = selector.get_keypoints().unwrap();
    assert_eq!(keypoints, vec![Keypoint::new(20, 20)]);
    for kp in keypoints {
        assert!(kp.row >= 9 && kp.row + 9 < rows);
        assert!(kp.column >= 9 && kp.column + 9 < columns);
    }
}
