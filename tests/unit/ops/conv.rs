use ndarray::{Array1, Array4};

use super::*;

fn geom(stride: usize, padding: usize) -> ConvGeometry {
    ConvGeometry {
        stride,
        padding,
        pad_mode: PadMode::Zeros,
    }
}

#[test]
fn output_extent_formula() {
    assert_eq!(geom(1, 1).output_extent(5, 3), Some(5));
    assert_eq!(geom(2, 1).output_extent(8, 3), Some(4));
    assert_eq!(geom(2, 1).output_extent(9, 3), Some(5));
    assert_eq!(geom(1, 0).output_extent(2, 3), None);
}

#[test]
fn centre_tap_kernel_is_identity() {
    let input = Array4::from_shape_fn((2, 1, 4, 5), |(n, _, y, x)| (n * 100 + y * 5 + x) as f32);
    let mut weight = Array4::<f32>::zeros((1, 1, 3, 3));
    weight[[0, 0, 1, 1]] = 1.0;
    let out = conv2d(&input, &weight, None, geom(1, 1)).unwrap();
    assert_eq!(out, input);
}

#[test]
fn box_kernel_sums_neighbourhood_with_zero_border() {
    let input = Array4::from_elem((1, 1, 3, 3), 1.0f32);
    let weight = Array4::from_elem((1, 1, 3, 3), 1.0f32);
    let out = conv2d(&input, &weight, None, geom(1, 1)).unwrap();
    assert_eq!(out[[0, 0, 0, 0]], 4.0);
    assert_eq!(out[[0, 0, 0, 1]], 6.0);
    assert_eq!(out[[0, 0, 1, 1]], 9.0);

    let replicate = ConvGeometry {
        pad_mode: PadMode::Replicate,
        ..geom(1, 1)
    };
    let out = conv2d(&input, &weight, None, replicate).unwrap();
    assert!(out.iter().all(|v| *v == 9.0));
}

#[test]
fn channels_mix_and_bias_is_added() {
    let input = Array4::from_shape_fn((1, 2, 2, 2), |(_, c, _, _)| (c + 1) as f32);
    // out0 = in0 + in1, out1 = in0 - in1, 1x1 kernels.
    let weight = Array4::from_shape_vec((2, 2, 1, 1), vec![1.0, 1.0, 1.0, -1.0]).unwrap();
    let bias = Array1::from_vec(vec![0.5, -0.5]);
    let out = conv2d(&input, &weight, Some(&bias), geom(1, 0)).unwrap();
    assert_eq!(out.dim(), (1, 2, 2, 2));
    assert!(out.slice(ndarray::s![0, 0, .., ..]).iter().all(|v| *v == 3.5));
    assert!(out.slice(ndarray::s![0, 1, .., ..]).iter().all(|v| *v == -1.5));
}

#[test]
fn strided_convolution_halves_extent() {
    let input = Array4::from_shape_fn((1, 1, 8, 8), |(_, _, y, x)| (y * 8 + x) as f32);
    let mut weight = Array4::<f32>::zeros((1, 1, 3, 3));
    weight[[0, 0, 1, 1]] = 1.0;
    let out = conv2d(&input, &weight, None, geom(2, 1)).unwrap();
    assert_eq!(out.dim(), (1, 1, 4, 4));
    assert_eq!(out[[0, 0, 1, 2]], input[[0, 0, 2, 4]]);
}

#[test]
fn mismatched_channels_are_rejected() {
    let input = Array4::<f32>::zeros((1, 3, 4, 4));
    let weight = Array4::<f32>::zeros((2, 2, 3, 3));
    assert!(matches!(
        conv2d(&input, &weight, None, geom(1, 1)),
        Err(NetError::ShapeMismatch(_))
    ));
}
