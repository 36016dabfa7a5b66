use super::*;

#[test]
fn empty_json_yields_defaults() {
    let cfg = NetworkConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, NetworkConfig::default());
    assert_eq!(cfg.channels, vec![32, 64, 128, 256, 512]);
    assert_eq!(cfg.kernel_size, 51);
    assert_eq!((cfg.max_width, cfg.max_height), (1280, 720));
    assert_eq!(cfg.input_channels(), 16);
    cfg.validate().unwrap();
}

#[test]
fn partial_json_overrides_only_given_fields() {
    let cfg = NetworkConfig::from_json_str(r#"{"channels":[4,8],"kernel_size":5,"threads":2}"#)
        .unwrap();
    assert_eq!(cfg.channels, vec![4, 8]);
    assert_eq!(cfg.kernel_size, 5);
    assert_eq!(cfg.threads, Some(2));
    assert_eq!(cfg.head, NetworkConfig::default().head);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = NetworkConfig::from_json_str(r#"{"chanels":[4,8]}"#).unwrap_err();
    assert!(matches!(err, NetError::Serde(_)), "{err}");
}

#[test]
fn validate_rejects_unbuildable_configs() {
    let with = |f: fn(&mut NetworkConfig)| {
        let mut cfg = NetworkConfig::default();
        f(&mut cfg);
        cfg.validate()
    };
    assert!(matches!(with(|c| c.channels = vec![32]), Err(NetError::Validation(_))));
    assert!(matches!(with(|c| c.channels = vec![32, 0, 8]), Err(NetError::Validation(_))));
    assert!(matches!(with(|c| c.channels = vec![5, 8]), Err(NetError::Validation(_))));
    assert!(matches!(with(|c| c.kernel_size = 50), Err(NetError::Validation(_))));
    assert!(matches!(with(|c| c.max_width = 0), Err(NetError::Validation(_))));
    assert!(matches!(with(|c| c.threads = Some(0)), Err(NetError::Validation(_))));
    assert!(matches!(
        with(|c| c.head = "conv(3)-warp".to_owned()),
        Err(NetError::MalformedSpec { .. })
    ));
}

#[test]
fn config_round_trips_through_json() {
    let cfg = NetworkConfig {
        channels: vec![4, 8, 8],
        kernel_size: 7,
        ..NetworkConfig::default()
    };
    let text = serde_json::to_string(&cfg).unwrap();
    assert_eq!(NetworkConfig::from_json_reader(text.as_bytes()).unwrap(), cfg);
}

#[test]
fn thread_pool_honours_requested_size() {
    assert!(matches!(build_thread_pool(Some(0)), Err(NetError::Validation(_))));
    let pool = build_thread_pool(Some(2)).unwrap();
    assert_eq!(pool.current_num_threads(), 2);
    assert!(build_thread_pool(None).is_ok());
}
