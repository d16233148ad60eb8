//! Priority work queue behaviour

mod common;

use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing_test::traced_test;

use common::*;
use tv_cache::config::QueueConfig;
use tv_cache::errors::QueueError;
use tv_cache::job_scheduling::{
    CacheRefreshJob, CacheSearchJob, JobOutcome, PriorityWorkQueue, QueuePriority, WorkItem,
};
use tv_cache::models::RefreshOutcome;

const POLL: Duration = Duration::from_millis(5);

fn queue(name: &str) -> PriorityWorkQueue {
    PriorityWorkQueue::new(name, &QueueConfig { poll_interval: POLL })
}

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(queue: &PriorityWorkQueue, log: &Log, name: &str, priority: QueuePriority) {
    let log = log.clone();
    queue
        .submit_fn(WorkItem::new(name, priority), move |item| async move {
            log.lock().unwrap().push(item.name);
        })
        .unwrap();
}

async fn wait_idle(queue: &PriorityWorkQueue) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while queue.is_busy() {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("queue did not go idle");
}

#[tokio::test]
async fn priorities_run_extreme_high_low() {
    let queue = queue("search queue");
    let log: Log = Arc::default();

    queue.start();
    queue.pause();
    tokio::time::sleep(POLL * 4).await;

    recorder(&queue, &log, "high", QueuePriority::High);
    recorder(&queue, &log, "low", QueuePriority::Low);
    recorder(&queue, &log, "extreme", QueuePriority::Extreme);

    queue.resume();
    wait_idle(&queue).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["SEARCH-QUEUE-EXTREME", "SEARCH-QUEUE-HIGH", "SEARCH-QUEUE-LOW"]
    );
    queue.shutdown().await;
}

#[tokio::test]
async fn pause_holds_pending_items_without_evicting_them() {
    let queue = queue("daily");
    let log: Log = Arc::default();
    queue.start();
    queue.pause();
    assert!(queue.is_paused());
    tokio::time::sleep(POLL * 4).await;

    recorder(&queue, &log, "one", QueuePriority::Normal);
    recorder(&queue, &log, "two", QueuePriority::Normal);
    tokio::time::sleep(POLL * 10).await;

    assert!(log.lock().unwrap().is_empty());
    let pending: Vec<String> = queue.queue_items().into_iter().map(|i| i.name).collect();
    assert_eq!(pending, vec!["DAILY-ONE", "DAILY-TWO"]);
    assert!(queue.is_busy());

    queue.resume();
    assert!(!queue.is_paused());
    wait_idle(&queue).await;
    assert_eq!(*log.lock().unwrap(), vec!["DAILY-ONE", "DAILY-TWO"]);
    queue.shutdown().await;
}

#[tokio::test]
async fn pause_never_preempts_running_work() {
    let queue = queue("backlog");
    let gate = Arc::new(Notify::new());
    let log: Log = Arc::default();
    queue.start();

    let running_gate = gate.clone();
    let running = queue
        .submit_fn(WorkItem::new("long", QueuePriority::Normal), move |_| async move {
            running_gate.notified().await;
            "done"
        })
        .unwrap();
    tokio::time::sleep(POLL * 6).await;
    recorder(&queue, &log, "next", QueuePriority::Normal);

    queue.pause();
    gate.notify_one();
    assert_eq!(running.result().await.unwrap(), "done");

    tokio::time::sleep(POLL * 10).await;
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(queue.queue_items().len(), 1);

    queue.resume();
    wait_idle(&queue).await;
    assert_eq!(*log.lock().unwrap(), vec!["BACKLOG-NEXT"]);
    queue.shutdown().await;
}

#[tokio::test]
async fn stop_drains_pending_and_rejects_new_work() {
    let queue = queue("shutdown");
    let log: Log = Arc::default();
    queue.pause();
    for i in 0..5 {
        recorder(&queue, &log, &format!("item {i}"), QueuePriority::Normal);
    }
    queue.start();
    assert!(queue.is_active());

    // Stopping drains even a paused queue
    queue.stop();
    let late = queue.submit_fn(WorkItem::new("late", QueuePriority::Extreme), |_| async {});
    assert!(late.is_none());

    queue.shutdown().await;
    assert!(!queue.is_active());
    assert!(!queue.is_busy());
    assert_eq!(log.lock().unwrap().len(), 5);
    assert!(!log.lock().unwrap().iter().any(|name| name.contains("LATE")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submissions_racing_shutdown_always_resolve() {
    let queue = Arc::new(queue("race"));
    queue.start();

    let submitters: Vec<_> = (0..4)
        .map(|t| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut handles = Vec::new();
                for i in 0..50 {
                    let name = format!("job {t}-{i}");
                    if let Some(handle) = queue
                        .submit_fn(WorkItem::new(name, QueuePriority::Normal), |_| async { 1 })
                    {
                        handles.push(handle);
                    }
                    tokio::task::yield_now().await;
                }
                handles
            })
        })
        .collect();

    tokio::time::sleep(POLL * 2).await;
    queue.shutdown().await;
    assert!(!queue.is_active());

    // Everything accepted ran before the loop exited
    for submitter in submitters {
        for handle in submitter.await.unwrap() {
            let result = tokio::time::timeout(Duration::from_secs(5), handle.result())
                .await
                .expect("handle never resolved");
            assert_eq!(result.unwrap(), 1);
        }
    }
    assert!(!queue.is_busy());
}

#[tokio::test]
async fn shutdown_of_an_unstarted_queue_drops_pending_work() {
    let queue = queue("unstarted");
    let handle = queue
        .submit_fn(WorkItem::new("waiting", QueuePriority::High), |_| async {})
        .unwrap();

    queue.shutdown().await;
    let result = tokio::time::timeout(Duration::from_secs(1), handle.result())
        .await
        .expect("handle never resolved");
    assert_eq!(
        result,
        Err(QueueError::ResultDropped {
            item: "UNSTARTED-WAITING".to_string()
        })
    );
}

#[tokio::test]
async fn cancelled_items_still_run_and_see_the_flag() {
    let queue = queue("cancel");
    let handle = queue
        .submit_fn(WorkItem::new("job", QueuePriority::Normal), |item| async move {
            item.is_stopped()
        })
        .unwrap();

    handle.cancel();
    assert_eq!(queue.queue_items().len(), 1);

    queue.start();
    assert!(handle.result().await.unwrap());
    queue.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn job_panics_are_logged_and_not_retried() {
    let queue = queue("panic");
    queue.start();
    let runs = Arc::new(Mutex::new(0));

    let counter = runs.clone();
    let handle = queue
        .submit_fn(WorkItem::new("boom", QueuePriority::High), move |_| async move {
            *counter.lock().unwrap() += 1;
            panic!("job body failed");
        })
        .unwrap();

    let err = handle.result().await.unwrap_err();
    assert!(err.to_string().contains("job body failed"));
    wait_idle(&queue).await;
    tokio::time::sleep(POLL * 5).await;
    assert_eq!(*runs.lock().unwrap(), 1);
    assert!(logs_contain("PANIC-BOOM panicked"));
    queue.shutdown().await;
}

#[tokio::test]
async fn cache_jobs_run_through_the_queue() {
    let provider = Arc::new(FakeProvider::new(
        "eztv",
        vec![feed_item("Show.Name.S01E01.720p.HDTV-GRP", "https://example.com/1.torrent")],
    ));
    let cache = tv_cache(provider, context().await);
    let queue = queue("provider eztv");
    queue.start();

    let refresh = CacheRefreshJob::new(cache.clone(), false);
    let item = refresh.work_item(QueuePriority::Normal);
    let handle = queue.submit(item, refresh).unwrap();
    assert_eq!(handle.name(), "PROVIDER-EZTV-REFRESH-EZTV");
    let outcome = handle.result().await.unwrap().completed().unwrap();
    assert!(matches!(outcome, RefreshOutcome::Refreshed { added: 1, .. }));

    let search = CacheSearchJob::new(cache.clone(), SHOW_ID, 1001);
    let item = search.work_item(QueuePriority::High);
    let results = queue
        .submit(item, search)
        .unwrap()
        .result()
        .await
        .unwrap()
        .completed()
        .unwrap()
        .unwrap();
    assert_eq!(results[&1001].len(), 1);

    // A cancelled job reports that it never started
    let refresh = CacheRefreshJob::new(cache.clone(), true);
    let item = refresh.work_item(QueuePriority::Low);
    item.stop.cancel();
    let outcome = queue.submit(item, refresh).unwrap().result().await.unwrap();
    assert_eq!(outcome, JobOutcome::Cancelled);

    queue.shutdown().await;
}

#[tokio::test]
async fn separate_queues_run_in_parallel() {
    let gate = Arc::new(Notify::new());
    let first = queue("first");
    let second = queue("second");
    first.start();
    second.start();

    let blocked_gate = gate.clone();
    let blocked = first
        .submit_fn(WorkItem::new("blocked", QueuePriority::Normal), move |_| async move {
            blocked_gate.notified().await;
        })
        .unwrap();
    let free = second
        .submit_fn(WorkItem::new("free", QueuePriority::Normal), |_| async { 7 })
        .unwrap();

    assert_eq!(free.result().await.unwrap(), 7);
    assert!(first.is_busy());
    gate.notify_one();
    blocked.result().await.unwrap();

    first.shutdown().await;
    second.shutdown().await;
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn dequeue_order_is_priority_then_arrival(priorities in prop::collection::vec(0usize..4, 1..20)) {
        let levels = [
            QueuePriority::Extreme,
            QueuePriority::High,
            QueuePriority::Normal,
            QueuePriority::Low,
        ];
        let order = tokio_test::block_on(async {
            let queue = queue("prop");
            let log: Log = Arc::default();
            for (i, p) in priorities.iter().enumerate() {
                recorder(&queue, &log, &format!("{p} {i}"), levels[*p]);
            }
            queue.start();
            queue.shutdown().await;
            log.lock().unwrap().clone()
        });

        let keys: Vec<(usize, usize)> = order
            .iter()
            .map(|name| {
                let mut parts = name.trim_start_matches("PROP-").split('-');
                let p = parts.next().unwrap().parse().unwrap();
                let i = parts.next().unwrap().parse().unwrap();
                (p, i)
            })
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys.len(), priorities.len());
        prop_assert_eq!(keys, sorted);
    }
}
