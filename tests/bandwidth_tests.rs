use sharefast::server::bandwidth::BandwidthTracker;
use std::sync::Arc;

const WORKERS: usize = 16;
const INCREMENTS_PER_WORKER: u64 = 1000;

#[tokio::test]
async fn concurrent_increments_lose_no_updates() {
    let tracker = Arc::new(BandwidthTracker::new());

    let mut handles = Vec::new();
    for _ in 0..WORKERS {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            for _ in 0..INCREMENTS_PER_WORKER {
                tracker.add_download(3);
                tracker.add_upload(1);
            }
        }));
    }
    for handle in handles {
        handle.await.expect("worker task");
    }

    let snap = tracker.snapshot();
    assert_eq!(snap.download_bytes, WORKERS as u64 * INCREMENTS_PER_WORKER * 3);
    assert_eq!(snap.upload_bytes, WORKERS as u64 * INCREMENTS_PER_WORKER);
}

#[tokio::test]
async fn concurrent_increments_with_snapshots_interleaved() {
    let tracker = Arc::new(BandwidthTracker::new());

    let writer = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            for _ in 0..INCREMENTS_PER_WORKER {
                tracker.add_download(10);
            }
        })
    };
    let reader = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            // Snapshots must always see a consistent, monotonic count.
            let mut last = 0u64;
            for _ in 0..100 {
                let now = tracker.snapshot().download_bytes;
                assert!(now >= last, "counter went backwards: {now} < {last}");
                last = now;
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.expect("writer");
    reader.await.expect("reader");

    assert_eq!(
        tracker.snapshot().download_bytes,
        INCREMENTS_PER_WORKER * 10
    );
}

#[test]
fn reset_restarts_elapsed_origin() {
    let tracker = BandwidthTracker::new();
    tracker.add_download(1 << 20);
    tracker.add_upload(1 << 10);
    std::thread::sleep(std::time::Duration::from_millis(15));

    tracker.reset();
    let snap = tracker.snapshot();

    assert_eq!(snap.download_bytes, 0);
    assert_eq!(snap.upload_bytes, 0);
    assert!(snap.elapsed_secs < 0.1);
    assert_eq!(snap.download_rate, 0.0);
}

#[test]
fn negative_input_is_impossible_by_type() {
    // Inputs are u64; the contract's clamp-to-zero is enforced by the type
    // system. This just documents the floor.
    let tracker = BandwidthTracker::new();
    tracker.add_download(0);
    assert_eq!(tracker.snapshot().download_bytes, 0);
}
