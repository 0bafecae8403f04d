//! Property tests for the round-trip laws exposed through the public API.

use kimberlite_wal::Log;
use proptest::prelude::*;
use tempfile::NamedTempFile;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn append_then_read_is_identity(payload in proptest::collection::vec(any::<u8>(), 0..8192)) {
        let file = NamedTempFile::new().unwrap();
        let log = Log::open(file.path(), None).unwrap();
        let index = log.append(&payload).unwrap();
        prop_assert_eq!(log.read(index).unwrap(), payload);
    }

    #[test]
    fn appends_assign_strictly_increasing_indices(payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..256), 1..50)) {
        let file = NamedTempFile::new().unwrap();
        let log = Log::open(file.path(), None).unwrap();
        let mut last = 0u64;
        for payload in &payloads {
            let index = log.append(payload).unwrap();
            prop_assert!(index > last);
            last = index;
        }
        prop_assert_eq!(log.last_index(), payloads.len() as u64);
    }

    #[test]
    fn truncate_front_removes_exactly_the_requested_prefix(
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 2..20),
        cut_fraction in 0.0f64..1.0f64,
    ) {
        let file = NamedTempFile::new().unwrap();
        let log = Log::open(file.path(), None).unwrap();
        for payload in &payloads {
            log.append(payload).unwrap();
        }
        let n = payloads.len() as u64;
        let cut = 1 + (cut_fraction * (n - 1) as f64) as u64;

        log.truncate_front(cut).unwrap();

        let indices: Vec<u64> = log.items().unwrap().iter().map(|i| i.index).collect();
        prop_assert_eq!(indices.first().copied(), Some(cut));
        prop_assert_eq!(indices.last().copied(), Some(n));
        for idx in 1..cut {
            prop_assert!(log.read(idx).is_err());
        }
        for idx in cut..=n {
            prop_assert!(log.read(idx).is_ok());
        }
    }
}
