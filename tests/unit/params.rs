use super::*;

fn sample() -> ParamStore {
    let mut store = ParamStore::new();
    store.insert(
        "b.weight",
        ParamArray::new(vec![2, 1, 1, 1], vec![0.5, -0.25]).unwrap(),
    );
    store.insert("a.slope", ParamArray::new(vec![1], vec![0.25]).unwrap());
    store
}

#[test]
fn array_length_must_match_shape() {
    assert!(ParamArray::new(vec![2, 3], vec![0.0; 6]).is_ok());
    assert!(matches!(
        ParamArray::new(vec![2, 3], vec![0.0; 5]),
        Err(NetError::Params(_))
    ));
}

#[test]
fn store_is_name_ordered() {
    let store = sample();
    assert_eq!(store.names().collect::<Vec<_>>(), vec!["a.slope", "b.weight"]);
    assert_eq!(store.len(), 2);
    assert_eq!(store.scalar_count(), 3);
    assert!(store.contains("a.slope"));
    assert!(store.get("missing").is_none());
}

#[test]
fn json_form_is_a_flat_object() {
    let mut bytes = Vec::new();
    sample().to_json_writer(&mut bytes).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(
        text,
        r#"{"a.slope":{"shape":[1],"data":[0.25]},"b.weight":{"shape":[2,1,1,1],"data":[0.5,-0.25]}}"#
    );
    assert_eq!(ParamStore::from_json_reader(text.as_bytes()).unwrap(), sample());
}

#[test]
fn reader_rejects_inconsistent_arrays() {
    let bad = r#"{"w":{"shape":[2,2],"data":[1.0,2.0,3.0]}}"#;
    match ParamStore::from_json_reader(bad.as_bytes()) {
        Err(NetError::Params(msg)) => assert!(msg.contains("'w'"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        ParamStore::from_json_reader("[1, 2]".as_bytes()),
        Err(NetError::Serde(_))
    ));
}

#[test]
fn files_round_trip() {
    let dir = std::env::temp_dir().join(format!("resep-params-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("weights.json");
    sample().to_path(&path).unwrap();
    assert_eq!(ParamStore::from_path(&path).unwrap(), sample());
    let _ = std::fs::remove_dir_all(&dir);

    assert!(matches!(
        ParamStore::from_path(dir.join("nope.json")),
        Err(NetError::Params(_))
    ));
}
