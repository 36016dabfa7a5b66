use ndarray::Array4;

use super::*;

fn small_config() -> NetworkConfig {
    NetworkConfig {
        channels: vec![4, 8, 8],
        kernel_size: 5,
        ..NetworkConfig::default()
    }
}

fn frame(seed: usize, h: usize, w: usize) -> Tensor {
    Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
        ((seed * 7 + c * 3 + y * 5 + x * 11) % 23) as f32 / 23.0
    })
}

#[test]
fn plan_follows_odd_rounding_through_the_pyramid() {
    let mut net = Network::new(small_config()).unwrap();
    let plan = net.plan(6, 10).unwrap();
    assert_eq!(plan.features, Shape4::new(1, 4, 6, 10));
    assert_eq!(plan.shape_table.get(0), Some(Shape4::new(1, 4, 6, 10)));
    assert_eq!(plan.shape_table.get(1), Some(Shape4::new(1, 8, 3, 5)));
    assert_eq!(plan.shape_table.get(2), Some(Shape4::new(1, 8, 2, 3)));
    assert_eq!(plan.decoder[1], Some(Shape4::new(1, 8, 3, 5)));
    assert_eq!(plan.decoder[0], Some(Shape4::new(1, 4, 6, 10)));
    assert_eq!(plan.kernels, Shape4::new(1, 5, 6, 10));
    assert_eq!(plan.output, Shape4::new(1, 3, 6, 10));
    assert_eq!(plan.param_count, net.export_params().unwrap().scalar_count());
}

#[test]
fn forward_produces_an_rgb_frame_of_input_size() {
    let net = Network::new(small_config()).unwrap();
    let out = net.forward(&frame(1, 6, 10), &frame(2, 6, 10)).unwrap();
    assert_eq!(Shape4::of(&out), Shape4::new(1, 3, 6, 10));
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn forward_is_deterministic_across_instances() {
    let a = Network::new(small_config()).unwrap();
    let b = Network::new(small_config()).unwrap();
    assert_eq!(a, b);
    let (one, two) = (frame(3, 4, 4), frame(4, 4, 4));
    assert_eq!(a.forward(&one, &two).unwrap(), b.forward(&one, &two).unwrap());
}

#[test]
fn forward_validates_frames() {
    let net = Network::new(small_config()).unwrap();
    let ok = frame(0, 4, 4);
    assert!(matches!(net.forward(&ok, &frame(0, 4, 6)), Err(NetError::Validation(_))));
    assert!(matches!(net.forward(&frame(0, 5, 4), &frame(0, 5, 4)), Err(NetError::Validation(_))));
    let gray = Array4::<f32>::zeros((1, 1, 4, 4));
    assert!(matches!(net.forward(&gray, &gray), Err(NetError::Validation(_))));
}

#[test]
fn parameters_have_stable_names() {
    let mut net = Network::new(small_config()).unwrap();
    let inventory = net.param_inventory().unwrap();
    assert_eq!(inventory[0], ("input.weight".to_owned(), vec![2, 3, 3, 3]));
    assert_eq!(inventory[1], ("input.bias".to_owned(), vec![2]));
    let names: Vec<&str> = inventory.iter().map(|(n, _)| n.as_str()).collect();
    assert!(names.contains(&"encoder.vertical.1.main.1.weight"));
    assert!(names.contains(&"decoder.horizontal.2.main.1.weight"));
    assert!(!names.contains(&"decoder.horizontal.2.shortcut.weight"));
    assert!(names.contains(&"decoder.vertical.1.main.2.weight"));
    assert!(names.contains(&"head.horizontal_two.main.3.bias"));
    assert!(!names.iter().any(|n| n.starts_with("encoder.horizontal")));
    assert!(!names.iter().any(|n| n.starts_with("decoder.vertical.0")));
}

#[test]
fn exported_parameters_load_back() {
    let mut source = Network::new(small_config()).unwrap();
    let store = source.export_params().unwrap();

    let mut scrambled = store.clone();
    for name in store.names().map(str::to_owned).collect::<Vec<_>>() {
        let mut array = scrambled.get(&name).unwrap().clone();
        array.data.iter_mut().for_each(|v| *v += 1.0);
        scrambled.insert(name, array);
    }

    let mut target = Network::new(small_config()).unwrap();
    target.load_params(&scrambled).unwrap();
    assert_ne!(target, source);
    target.load_params(&store).unwrap();
    assert_eq!(target, source);

    target.load_params(&scrambled).unwrap();
    target.reset_params();
    assert_eq!(target, source);
}

#[test]
fn load_rejects_missing_misshapen_and_unknown_arrays() {
    let mut net = Network::new(small_config()).unwrap();
    let store = net.export_params().unwrap();

    let mut missing = ParamStore::new();
    for (name, array) in store.iter().skip(1) {
        missing.insert(name, array.clone());
    }
    assert!(matches!(net.load_params(&missing), Err(NetError::Params(_))));

    let mut misshapen = store.clone();
    misshapen.insert("input.bias", ParamArray::new(vec![3], vec![0.0; 3]).unwrap());
    assert!(matches!(net.load_params(&misshapen), Err(NetError::Params(_))));

    let mut extra = store.clone();
    extra.insert("head.extra.weight", ParamArray::new(vec![1], vec![0.0]).unwrap());
    match net.load_params(&extra) {
        Err(NetError::Params(msg)) => assert!(msg.contains("head.extra.weight"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_config_is_rejected_before_building() {
    let cfg = NetworkConfig {
        kernel_size: 4,
        ..small_config()
    };
    assert!(matches!(Network::new(cfg), Err(NetError::Validation(_))));
}
