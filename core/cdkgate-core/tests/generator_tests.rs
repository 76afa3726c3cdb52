mod common;

use cdkgate_core::{generate_batch, generate_code, generate_unique, CoreError, MAX_BATCH};
use cdkgate_store::CdkStore;
use cdkgate_types::{CdkCode, CODE_ALPHABET, CODE_LEN};
use common::store;
use proptest::prelude::*;
use std::collections::HashSet;

#[test]
fn generated_code_has_correct_shape() {
    for _ in 0..100 {
        let code = generate_code();
        assert_eq!(code.as_str().len(), CODE_LEN);
        assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }
}

#[test]
fn generated_codes_are_distinct() {
    let codes: HashSet<String> = (0..1000).map(|_| generate_code().to_string()).collect();
    // 36^16 combinations; a collision in a thousand draws would point at a
    // broken random source.
    assert_eq!(codes.len(), 1000);
}

#[test]
fn generate_unique_persists_the_record() {
    let store = store();
    let rec = generate_unique(&store).unwrap();
    assert!(!rec.used);
    let found = store.find_by_code(&rec.code).unwrap().unwrap();
    assert_eq!(found, rec);
}

#[test]
fn batch_count_zero_rejected() {
    let store = store();
    assert!(matches!(
        generate_batch(&store, 0),
        Err(CoreError::Validation(_))
    ));
    assert_eq!(store.count_all().unwrap(), 0);
}

#[test]
fn batch_count_over_max_rejected() {
    let store = store();
    assert!(matches!(
        generate_batch(&store, MAX_BATCH + 1),
        Err(CoreError::Validation(_))
    ));
    assert_eq!(store.count_all().unwrap(), 0);
}

#[test]
fn batch_at_max_yields_distinct_codes() {
    let store = store();
    let records = generate_batch(&store, MAX_BATCH).unwrap();
    assert_eq!(records.len(), MAX_BATCH);

    let codes: HashSet<&str> = records.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes.len(), MAX_BATCH);
    assert_eq!(store.count_all().unwrap(), MAX_BATCH as u64);
}

#[test]
fn batches_never_collide_with_existing_codes() {
    let store = store();
    generate_batch(&store, 50).unwrap();
    generate_batch(&store, 50).unwrap();
    // The unique index would have rejected any collision outright.
    assert_eq!(store.count_all().unwrap(), 100);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_valid_batch_size_yields_distinct_persisted_codes(count in 1usize..=50) {
        let store = store();
        let records = generate_batch(&store, count).unwrap();
        prop_assert_eq!(records.len(), count);

        let codes: HashSet<&str> = records.iter().map(|r| r.code.as_str()).collect();
        prop_assert_eq!(codes.len(), count);
        prop_assert_eq!(store.count_all().unwrap(), count as u64);
    }

    #[test]
    fn generated_codes_are_already_canonical(_draw in 0u8..32) {
        // normalize must be a no-op on generator output: no lowercase, no
        // surrounding whitespace, nothing outside the alphabet.
        let code = generate_code();
        let normalized = CdkCode::normalize(code.as_str()).unwrap();
        prop_assert_eq!(normalized, code);
    }
}
