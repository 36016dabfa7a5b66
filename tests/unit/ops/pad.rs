use ndarray::{Array4, s};

use super::*;

fn ramp(h: usize, w: usize) -> Tensor {
    Array4::from_shape_fn((1, 1, h, w), |(_, _, y, x)| (y * w + x) as f32)
}

#[test]
fn zero_padding_surrounds_input() {
    let t = ramp(2, 2);
    let out = pad(&t, Padding::uniform(1), PadMode::Zeros).unwrap();
    assert_eq!(out.dim(), (1, 1, 4, 4));
    assert_eq!(out[[0, 0, 0, 0]], 0.0);
    assert_eq!(out[[0, 0, 1, 1]], 0.0);
    assert_eq!(out[[0, 0, 2, 2]], 3.0);
    assert_eq!(out[[0, 0, 3, 3]], 0.0);
}

#[test]
fn replicate_and_reflect_follow_edge_rules() {
    // Row [0, 1, 2]
    let t = ramp(1, 3);
    let rep = pad(&t, Padding::trailing(0, 2), PadMode::Replicate).unwrap();
    assert_eq!(rep.as_slice().unwrap(), &[0.0, 1.0, 2.0, 2.0, 2.0]);

    let refl = pad(
        &t,
        Padding {
            left: 2,
            right: 2,
            ..Padding::default()
        },
        PadMode::Reflect,
    )
    .unwrap();
    assert_eq!(
        refl.as_slice().unwrap(),
        &[2.0, 1.0, 0.0, 1.0, 2.0, 1.0, 0.0]
    );
}

#[test]
fn reflect_rejects_pad_not_smaller_than_extent() {
    let t = ramp(1, 3);
    assert!(pad(&t, Padding::uniform(1), PadMode::Reflect).is_err());
}

#[test]
fn pad_to_even_only_touches_odd_extents() {
    let odd_h = ramp(5, 4);
    let out = pad_to_even(&odd_h, PadMode::Zeros).unwrap();
    assert_eq!(out.dim(), (1, 1, 6, 4));
    assert!(out.slice(s![0, 0, 5, ..]).iter().all(|v| *v == 0.0));

    let both = ramp(3, 3);
    let out = pad_to_even(&both, PadMode::Replicate).unwrap();
    assert_eq!(out.dim(), (1, 1, 4, 4));
    assert_eq!(out[[0, 0, 3, 3]], 8.0);

    let even = ramp(4, 4);
    assert_eq!(pad_to_even(&even, PadMode::Reflect).unwrap(), even);
}

#[test]
fn crop_trailing_keeps_leading_block() {
    let t = ramp(3, 3);
    let out = crop_trailing(&t, 2, 3).unwrap();
    assert_eq!(out.dim(), (1, 1, 2, 3));
    assert_eq!(out[[0, 0, 1, 2]], 5.0);
    assert!(crop_trailing(&t, 4, 3).is_err());
}
