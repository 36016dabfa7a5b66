use ndarray::Array4;

use super::*;

fn assert_close(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-5, "{a} vs {b}");
}

#[test]
fn centre_tap_kernels_reproduce_the_unpadded_input() {
    let k = 3;
    let input = Array4::from_shape_fn((1, 2, 4, 5), |(_, c, y, x)| (c * 100 + y * 10 + x) as f32);
    let centre = Array4::from_shape_fn((1, k, 2, 3), |(_, i, _, _)| if i == 1 { 1.0 } else { 0.0 });
    let out = separable_filter(&input, &centre, &centre).unwrap();
    assert_eq!(out.dim(), (1, 2, 2, 3));
    for c in 0..2 {
        for y in 0..2 {
            for x in 0..3 {
                assert_close(out[[0, c, y, x]], input[[0, c, y + 1, x + 1]]);
            }
        }
    }
}

#[test]
fn constant_kernels_scale_the_window_sum() {
    let input = Array4::<f32>::ones((2, 1, 5, 5));
    let vertical = Array4::from_elem((2, 3, 3, 3), 0.5f32);
    let horizontal = Array4::from_elem((2, 3, 3, 3), 2.0f32);
    let out = separable_filter(&input, &vertical, &horizontal).unwrap();
    assert_eq!(out.dim(), (2, 1, 3, 3));
    for &v in &out {
        assert_close(v, 9.0);
    }
}

#[test]
fn kernels_are_per_pixel() {
    let input = Array4::from_shape_fn((1, 1, 3, 4), |(_, _, y, x)| (y * 4 + x) as f32);
    // Each output pixel picks the top-left tap of its own window.
    let pick_first =
        Array4::from_shape_fn((1, 3, 1, 2), |(_, i, _, _)| if i == 0 { 1.0 } else { 0.0 });
    let out = separable_filter(&input, &pick_first, &pick_first).unwrap();
    assert_close(out[[0, 0, 0, 0]], 0.0);
    assert_close(out[[0, 0, 0, 1]], 1.0);
}

#[test]
fn mismatched_extents_are_rejected() {
    let input = Array4::<f32>::zeros((1, 1, 5, 5));
    let k3 = Array4::<f32>::zeros((1, 3, 3, 3));
    let k5 = Array4::<f32>::zeros((1, 5, 3, 3));
    assert!(matches!(separable_filter(&input, &k3, &k5), Err(NetError::ShapeMismatch(_))));
    assert!(matches!(
        separable_filter(&input, &Array4::zeros((1, 3, 4, 4)), &Array4::zeros((1, 3, 4, 4))),
        Err(NetError::ShapeMismatch(_))
    ));
}

#[test]
fn normalizer_divides_and_floors_small_values() {
    let mut t = Array4::<f32>::zeros((1, 3, 1, 2));
    t[[0, 0, 0, 0]] = 4.0;
    t[[0, 1, 0, 0]] = 6.0;
    t[[0, 2, 0, 0]] = 2.0;
    t[[0, 0, 0, 1]] = 4.0;
    t[[0, 1, 0, 1]] = 6.0;
    t[[0, 2, 0, 1]] = 0.001;
    let out = divide_by_normalizer(&t).unwrap();
    assert_eq!(out.dim(), (1, 2, 1, 2));
    assert_close(out[[0, 0, 0, 0]], 2.0);
    assert_close(out[[0, 1, 0, 0]], 3.0);
    assert_close(out[[0, 0, 0, 1]], 4.0);
    assert_close(out[[0, 1, 0, 1]], 6.0);

    assert!(divide_by_normalizer(&Array4::zeros((1, 1, 2, 2))).is_err());
}

#[test]
fn pair_normalization_uses_joint_statistics() {
    let one = Array4::from_elem((1, 3, 2, 2), 1.0f32);
    let two = Array4::from_elem((1, 3, 2, 2), 3.0f32);
    let (a, b) = normalize_pair(&one, &two).unwrap();
    // mean 2, both variances 0, joint deviation sqrt((1 + 1) / 2) = 1.
    for &v in &a {
        assert_close(v, -1.0);
    }
    for &v in &b {
        assert_close(v, 1.0);
    }
}

#[test]
fn pair_normalization_is_per_batch_entry() {
    let one = Array4::from_shape_fn((2, 1, 1, 2), |(n, _, _, x)| (n * 10 + x) as f32);
    let two = one.clone();
    let (a, _) = normalize_pair(&one, &two).unwrap();
    // Entry 0 is [0, 1] and entry 1 is [10, 11]; both normalize to [-1, 1].
    assert_close(a[[0, 0, 0, 0]], -1.0);
    assert_close(a[[1, 0, 0, 1]], 1.0);
}

#[test]
fn synthesis_frame_appends_ones_and_replicates_borders() {
    let frame = Array4::from_shape_fn((1, 3, 2, 2), |(_, c, y, x)| (c * 4 + y * 2 + x) as f32);
    let padded = synthesis_frame(&frame, 5).unwrap();
    assert_eq!(padded.dim(), (1, 4, 6, 6));
    assert!(padded.slice(s![0, 3, .., ..]).iter().all(|&v| v == 1.0));
    assert_eq!(padded[[0, 1, 0, 0]], frame[[0, 1, 0, 0]]);
    assert_eq!(padded[[0, 2, 5, 5]], frame[[0, 2, 1, 1]]);
}
