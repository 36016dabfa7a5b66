use super::*;

#[test]
fn fnv_matches_known_vector() {
    // FNV-1a 64 of the empty string is the offset basis; of "a" is a published constant.
    assert_eq!(hash_str(""), Fnv1a64::OFFSET_BASIS);
    assert_eq!(hash_str("a"), 0xaf63_dc4c_8601_ec8c);
}

#[test]
fn splitmix_streams_are_reproducible_per_name() {
    let mut a = SplitMix64::from_name("encoder.horizontal.0.main.1.weight");
    let mut b = SplitMix64::from_name("encoder.horizontal.0.main.1.weight");
    let mut c = SplitMix64::from_name("encoder.horizontal.0.main.3.weight");
    let xs: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
    let ys: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
    let zs: Vec<u64> = (0..8).map(|_| c.next_u64()).collect();
    assert_eq!(xs, ys);
    assert_ne!(xs, zs);
}

#[test]
fn uniform_fill_respects_fan_in_bound() {
    let mut data = vec![0.0f32; 1024];
    fill_uniform_fan_in("w", 16, &mut data);
    assert!(data.iter().all(|v| v.abs() <= 0.25));
    assert!(data.iter().any(|v| *v != 0.0));
}
