// Property: range planning either rejects a request as unsatisfiable
// (to > file_size, to < from, or nothing left after clamping) or produces a
// chunk-aligned window whose geometry covers exactly the requested bytes.

use proptest::prelude::*;
use stream_gateway::range_planner::{parse_range_header, plan};
use stream_gateway::GatewayError;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_window_geometry(
        file_size in 1u64..50_000_000,
        chunk_size in 1u64..2_000_000,
        from in 0u64..50_000_001,
        to in 0u64..50_000_001,
    ) {
        let header = format!("bytes={}-{}", from, to);
        let result = plan(Some(&header), file_size, chunk_size);

        let clamped = to.min(file_size - 1);
        let unsatisfiable = to > file_size || to < from || from > clamped;

        match result {
            Err(GatewayError::RangeNotSatisfiable { file_size: reported }) => {
                prop_assert!(unsatisfiable, "rejected a satisfiable range {}-{}/{}", from, to, file_size);
                prop_assert_eq!(reported, file_size);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            Ok(window) => {
                prop_assert!(!unsatisfiable, "accepted an unsatisfiable range {}-{}/{}", from, to, file_size);
                prop_assert_eq!(window.from_byte, from);
                prop_assert_eq!(window.to_byte, clamped);
                prop_assert_eq!(window.offset % chunk_size, 0);
                prop_assert!(window.offset <= from);
                prop_assert!(from - window.offset < chunk_size);
                prop_assert_eq!(window.first_cut, from - window.offset);
                prop_assert!(window.last_cut >= 1 && window.last_cut <= chunk_size);

                // The last fetched chunk is the one holding `to_byte`.
                let last_chunk_start = window.offset + (window.part_count - 1) * chunk_size;
                prop_assert!(last_chunk_start <= window.to_byte);
                prop_assert!(window.to_byte < last_chunk_start + chunk_size);
                prop_assert_eq!(last_chunk_start + window.last_cut - 1, window.to_byte);

                prop_assert_eq!(window.content_length(), clamped - from + 1);
                prop_assert_eq!(
                    window.content_range(),
                    format!("bytes {}-{}/{}", from, clamped, file_size)
                );
            }
        }
    }

    #[test]
    fn prop_open_ended_range_runs_to_end(
        file_size in 1u64..10_000_000,
        chunk_size in 1u64..1_000_000,
        from in 0u64..10_000_000,
    ) {
        let header = format!("bytes={}-", from);
        match plan(Some(&header), file_size, chunk_size) {
            Ok(window) => {
                prop_assert!(from < file_size);
                prop_assert_eq!(window.to_byte, file_size - 1);
                prop_assert!(window.partial);
            }
            Err(e) => {
                prop_assert!(from >= file_size, "unexpected rejection: {}", e);
                prop_assert_eq!(e.to_http_status(), 416);
            }
        }
    }

    #[test]
    fn prop_bounds_beyond_u64_are_unsatisfiable(
        file_size in 0u64..10_000_000,
        chunk_size in 1u64..1_000_000,
        small in 0u64..10_000_000,
        extra_digits in "[0-9]{1,20}",
        overflow_to in any::<bool>(),
    ) {
        // 20+ digits starting with 9 always exceed u64::MAX.
        let huge = format!("99999999999999999999{}", extra_digits);
        let header = if overflow_to {
            format!("bytes={}-{}", small, huge)
        } else {
            format!("bytes={}-", huge)
        };

        match plan(Some(&header), file_size, chunk_size) {
            Err(GatewayError::RangeNotSatisfiable { file_size: reported }) => {
                prop_assert_eq!(reported, file_size);
            }
            other => prop_assert!(false, "{} should be unsatisfiable, got {:?}", header, other),
        }
    }

    #[test]
    fn prop_garbage_headers_fall_back_to_full_file(
        garbage in "[a-z=,; -]{0,20}",
        file_size in 1u64..1_000_000,
    ) {
        prop_assume!(parse_range_header(&garbage).is_none());

        let window = plan(Some(&garbage), file_size, 4096).expect("full file is always satisfiable");
        prop_assert!(!window.partial);
        prop_assert_eq!(window.from_byte, 0);
        prop_assert_eq!(window.to_byte, file_size - 1);
    }
}
