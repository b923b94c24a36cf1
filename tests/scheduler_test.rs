mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use batch_url_processor::models::{ProgressSnapshot, RunStats};
use batch_url_processor::services::ProgressLedger;
use batch_url_processor::{BatchScheduler, Config, ItemFlow, Shutdown};
use common::{Event, MemoryIndex, RecordingTrigger};

fn fast_config(batch_size: usize, max_workers: usize) -> Arc<Config> {
    Arc::new(Config {
        batch_size,
        max_workers,
        max_retries: 3,
        tab_delay_secs: 0.0,
        retry_delay_secs: 0.0,
        verify_delay_secs: 0.0,
        batch_delay_secs: 0.0,
        progress_save_interval: 2,
        ..Config::default()
    })
}

fn urls(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

struct Harness {
    scheduler: BatchScheduler,
    index: Arc<MemoryIndex>,
    trigger: Arc<RecordingTrigger>,
    ledger: ProgressLedger,
    _dir: tempfile::TempDir,
}

fn harness(
    config: Arc<Config>,
    index: MemoryIndex,
    build: impl FnOnce(RecordingTrigger) -> RecordingTrigger,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let ledger = ProgressLedger::new(dir.path().join("progress.json"));
    let index = Arc::new(index);
    let trigger = Arc::new(build(RecordingTrigger::new(
        &index,
        Duration::from_millis(20),
    )));
    let flow = Arc::new(ItemFlow::new(
        config.clone(),
        index.clone(),
        trigger.clone(),
        None,
    ));
    Harness {
        scheduler: BatchScheduler::new(config, flow, ledger.clone()),
        index,
        trigger,
        ledger,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_batches_are_sequential_and_bounded() {
    let h = harness(fast_config(2, 2), MemoryIndex::default(), |t| t);
    let list = urls(&["a", "b", "c", "d", "e"]);
    let mut stats = RunStats::new(list.len());

    let report = h.scheduler.run(&list, &mut stats, &Shutdown::new()).await;

    assert_eq!(report.batch_sizes, vec![2, 2, 1]);
    assert!(!report.interrupted);
    assert!(h.trigger.max_in_flight.load(Ordering::SeqCst) <= 2);

    // 每一批全部结束之后下一批才开始
    let events = h.trigger.events();
    let position = |e: Event| events.iter().position(|x| *x == e).unwrap();
    for (done, next) in [("a", "c"), ("b", "c"), ("a", "d"), ("b", "d"), ("c", "e"), ("d", "e")] {
        assert!(position(Event::End(done.into())) < position(Event::Start(next.into())));
    }

    assert_eq!(stats.processed, 5);
    assert_eq!(stats.successful, 5);
    assert!(stats.is_consistent());
}

#[tokio::test]
async fn test_worker_limit_within_batch() {
    let h = harness(fast_config(6, 2), MemoryIndex::default(), |t| t);
    let list = urls(&["a", "b", "c", "d", "e", "f"]);
    let mut stats = RunStats::new(list.len());

    h.scheduler.run(&list, &mut stats, &Shutdown::new()).await;

    assert_eq!(h.trigger.max_in_flight.load(Ordering::SeqCst), 2);
    assert_eq!(stats.successful, 6);
}

#[tokio::test]
async fn test_duplicate_is_skipped_and_other_is_extracted() {
    let h = harness(fast_config(5, 3), MemoryIndex::with(&["x"]), |t| t);
    let list = urls(&["x", "y"]);
    let mut stats = RunStats::new(list.len());

    h.scheduler.run(&list, &mut stats, &Shutdown::new()).await;

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.successful, 1);
    assert_eq!(h.trigger.started(), vec!["y".to_string()]);
    assert!(h.index.contains("y"));
}

#[tokio::test]
async fn test_unverified_item_recorded_once_after_max_retries() {
    let h = harness(fast_config(5, 3), MemoryIndex::default(), |t| {
        t.never_persist(&["bad"])
    });
    let list = urls(&["good", "bad"]);
    let mut stats = RunStats::new(list.len());

    h.scheduler.run(&list, &mut stats, &Shutdown::new()).await;

    let bad_attempts = h.trigger.started().iter().filter(|u| *u == "bad").count();
    assert_eq!(bad_attempts, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.errors.len(), 1);
    assert_eq!(stats.errors[0].url, "bad");
    assert_eq!(stats.errors[0].error, "Failed after 3 attempts");
    assert!(stats.is_consistent());
}

#[tokio::test]
async fn test_no_batches_after_shutdown() {
    let h = harness(fast_config(2, 2), MemoryIndex::default(), |t| t);
    let list = urls(&["a", "b", "c"]);
    let mut stats = RunStats::new(list.len());

    let shutdown = Shutdown::new();
    shutdown.request();
    let report = h.scheduler.run(&list, &mut stats, &shutdown).await;

    assert!(report.batch_sizes.is_empty());
    assert!(report.interrupted);
    assert_eq!(h.trigger.calls.load(Ordering::SeqCst), 0);
    assert_eq!(stats.processed, 0);
}

#[tokio::test]
async fn test_shutdown_mid_batch_aborts_in_flight_and_stops() {
    let h = harness(fast_config(2, 1), MemoryIndex::default(), |t| t.stop_on("a"));
    let list = urls(&["a", "b", "c", "d"]);
    let mut stats = RunStats::new(list.len());

    let report = h.scheduler.run(&list, &mut stats, &Shutdown::new()).await;

    assert!(report.interrupted);
    assert_eq!(report.batch_sizes, vec![1]);
    assert_eq!(h.trigger.started(), vec!["a".to_string()]);
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.processed, 0);
    assert!(stats.is_consistent());
}

#[tokio::test]
async fn test_checkpoint_written_when_interval_crossed() {
    let h = harness(fast_config(5, 3), MemoryIndex::default(), |t| t);
    let list = urls(&["a", "b", "c"]);
    let mut stats = RunStats::new(list.len());

    h.scheduler.run(&list, &mut stats, &Shutdown::new()).await;

    let content = std::fs::read_to_string(h.ledger.path()).unwrap();
    let snapshot: ProgressSnapshot = serde_json::from_str(&content).unwrap();
    assert_eq!(snapshot.stats.processed, 2);
    assert!(snapshot.stats.is_consistent());
}

#[tokio::test]
async fn test_task_starts_are_staggered_by_tab_delay() {
    let config = Arc::new(Config {
        tab_delay_secs: 0.1,
        ..(*fast_config(3, 3)).clone()
    });
    let h = harness(config, MemoryIndex::default(), |t| t);
    let list = urls(&["a", "b", "c"]);
    let mut stats = RunStats::new(list.len());

    h.scheduler.run(&list, &mut stats, &Shutdown::new()).await;

    let starts = h.trigger.start_times();
    assert_eq!(starts.len(), 3);
    for pair in starts.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(80), "启动间隔过短: {:?}", gap);
    }
    assert_eq!(stats.successful, 3);
}
