use ndarray::Array4;

use super::*;

#[test]
fn add_requires_identical_shapes() {
    let a = Array4::from_elem((1, 2, 3, 3), 1.0f32);
    let b = Array4::from_elem((1, 2, 3, 3), 2.0f32);
    assert!(add(&a, &b).unwrap().iter().all(|v| *v == 3.0));

    let c = Array4::from_elem((1, 2, 4, 3), 2.0f32);
    match add(&a, &c) {
        Err(NetError::ShapeMismatch(msg)) => {
            assert!(msg.contains("(1, 2, 3, 3)"), "{msg}");
            assert!(msg.contains("(1, 2, 4, 3)"), "{msg}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn prelu_scales_only_negatives() {
    let t = Array4::from_shape_vec((1, 1, 1, 3), vec![-2.0, 0.0, 3.0]).unwrap();
    let out = prelu(&t, 0.25);
    assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![-0.5, 0.0, 3.0]);
}

#[test]
fn concat_stacks_channels() {
    let a = Array4::from_elem((1, 2, 2, 2), 1.0f32);
    let b = Array4::from_elem((1, 3, 2, 2), 2.0f32);
    let out = concat_channels(&[&a, &b]).unwrap();
    assert_eq!(out.dim(), (1, 5, 2, 2));
    assert_eq!(out[[0, 1, 0, 0]], 1.0);
    assert_eq!(out[[0, 2, 0, 0]], 2.0);

    let bad = Array4::from_elem((1, 1, 3, 2), 0.0f32);
    assert!(concat_channels(&[&a, &bad]).is_err());
}
