// Property: for any file, chunk size and satisfiable range, the streamed body
// is exactly bytes [from, to] of the file, the number of backend fetches
// equals part_count, and the session load returns to zero afterwards.

use bytes::Bytes;
use futures::StreamExt;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use stream_gateway::backend::memory::MemorySession;
use stream_gateway::backend::BackendSession;
use stream_gateway::chunk_stream::chunk_stream;
use stream_gateway::range_planner::plan;
use stream_gateway::{FileCatalog, FileLocation, LoadTracker, SessionStreamer};

fn file_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i * 31 % 251) as u8).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_body_matches_requested_window(
        file_size in 1usize..5_000,
        chunk_size in 1u64..700,
        a in 0usize..5_000,
        b in 0usize..5_000,
    ) {
        let from = (a % file_size) as u64;
        let to = from.max((b % file_size) as u64);
        let content = file_content(file_size);

        let session = Arc::new(MemorySession::new("s0").with_content("remote", content.clone()));
        let streamer = Arc::new(SessionStreamer::new(
            0,
            session.clone() as Arc<dyn BackendSession>,
            Arc::new(FileCatalog::default()),
            Duration::from_secs(5),
        ));
        let tracker = Arc::new(LoadTracker::new(1));

        let header = format!("bytes={}-{}", from, to);
        let window = plan(Some(&header), file_size as u64, chunk_size)
            .expect("window inside the file should be satisfiable");
        prop_assert!(window.partial);
        prop_assert_eq!(window.content_length(), to - from + 1);

        let guard = tracker.acquire(0);
        prop_assert_eq!(tracker.load(0), 1);

        let stream = chunk_stream(streamer, FileLocation::new("remote"), window, Some(guard), None);
        let pieces: Vec<Bytes> = tokio_test::block_on(async {
            stream.map(|piece| piece.expect("in-memory fetch should not fail")).collect().await
        });

        let body: Vec<u8> = pieces.iter().flat_map(|p| p.iter().copied()).collect();
        prop_assert_eq!(&body[..], &content[from as usize..=to as usize]);
        prop_assert_eq!(session.fetch_calls() as u64, window.part_count);
        prop_assert_eq!(tracker.load(0), 0, "load must be released once the stream ends");
    }
}
