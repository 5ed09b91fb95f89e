use anyhow::bail;
use std::collections::HashSet;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};
use workpipe::pipeline::{
    CancelToken, Collector, Dispatcher, Handler, Take, bounded_queue, spawn_workers,
};
use workpipe::{
    CancelReason, CollectStatus, Pipeline, PipelineError, PipelineOpts, Task, TaskResult, run,
};

fn int_tasks(values: impl IntoIterator<Item = i64>) -> Vec<Task<i64>> {
    values
        .into_iter()
        .map(|v| Task::new(v as u64, v))
        .collect()
}

fn opts(workers: usize) -> PipelineOpts {
    PipelineOpts {
        workers,
        ..Default::default()
    }
}

// --- Pipeline::run / run ---

#[test]
fn test_doubling_five_tasks_two_workers() {
    let outcome = run(int_tasks(1..=5), 2, 5, None, |x: i64| Ok(x * 2)).unwrap();
    assert_eq!(outcome.status, CollectStatus::Complete);
    let mut pairs: Vec<(u64, i64)> = outcome
        .results
        .iter()
        .map(|r| (r.task_id, *r.output().unwrap()))
        .collect();
    pairs.sort();
    assert_eq!(pairs, vec![(1, 2), (2, 4), (3, 6), (4, 8), (5, 10)]);
    assert_eq!(outcome.submitted, 5);
    assert_eq!(outcome.cancel_reason, None);
}

#[test]
fn test_every_task_yields_exactly_one_result() {
    for n in [0_i64, 1, 7, 100] {
        for w in [1_usize, 2, 8] {
            let outcome = Pipeline::new(opts(w))
                .run(int_tasks(1..=n), |x: i64| Ok(x + 1))
                .unwrap();
            assert_eq!(outcome.status, CollectStatus::Complete, "n={n} w={w}");
            assert_eq!(outcome.results.len(), n as usize, "n={n} w={w}");
            let ids: HashSet<u64> = outcome.results.iter().map(|r| r.task_id).collect();
            let want: HashSet<u64> = (1..=n as u64).collect();
            assert_eq!(ids, want, "n={n} w={w}");
        }
    }
}

#[test]
fn test_zero_tasks_complete_immediately() {
    let start = Instant::now();
    let outcome = run(Vec::<Task<i64>>::new(), 3, 0, None, |x: i64| Ok(x)).unwrap();
    assert_eq!(outcome.status, CollectStatus::Complete);
    assert!(outcome.results.is_empty());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_cancel_after_two_results() {
    let pipeline = Pipeline::new(opts(3));
    let token = pipeline.cancel_token();
    let mut seen = 0;
    let outcome = pipeline
        .run_with(
            int_tasks(1..=10),
            |x: i64| {
                thread::sleep(Duration::from_millis(20));
                Ok(x)
            },
            |_| {
                seen += 1;
                if seen == 2 {
                    token.cancel();
                }
            },
        )
        .unwrap();
    assert_eq!(outcome.status, CollectStatus::Cancelled);
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.submitted <= 10);
    assert_eq!(outcome.cancel_reason, Some(CancelReason::Requested));
    assert!(pipeline.is_cancelled());
    assert!(matches!(
        outcome.ensure_complete(),
        Err(PipelineError::Cancelled)
    ));
}

#[test]
fn test_no_result_delivered_after_cancel() {
    // Rendezvous sink: a put only succeeds when the collector takes it.
    let pipeline = Pipeline::new(PipelineOpts {
        workers: 4,
        sink_capacity: 0,
        ..Default::default()
    });
    let token = pipeline.cancel_token();
    let mut seen = 0;
    let outcome = pipeline
        .run_with(
            int_tasks(1..=40),
            |x: i64| {
                thread::sleep(Duration::from_millis(5));
                Ok(x)
            },
            |_| {
                seen += 1;
                if seen == 2 {
                    token.cancel();
                }
            },
        )
        .unwrap();
    assert_eq!(outcome.status, CollectStatus::Cancelled);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.delivered, outcome.results.len());
}

#[test]
fn test_cancel_on_last_expected_result_is_cancelled() {
    let pipeline = Pipeline::new(opts(2));
    let token = pipeline.cancel_token();
    let mut seen = 0;
    let outcome = pipeline
        .run_with(
            int_tasks(1..=3),
            |x: i64| Ok(x),
            |_| {
                seen += 1;
                if seen == 3 {
                    token.cancel();
                }
            },
        )
        .unwrap();
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.status, CollectStatus::Cancelled);
    assert_eq!(outcome.cancel_reason, Some(CancelReason::Requested));
}

#[test]
fn test_failing_task_does_not_stop_the_rest() {
    let tasks = int_tasks([1, 2, 0, 4, 5]);
    let outcome = run(tasks, 2, 5, None, |x: i64| {
        if x == 0 {
            bail!("division by zero");
        }
        Ok(100 / x)
    })
    .unwrap();
    assert_eq!(outcome.status, CollectStatus::Complete);
    assert_eq!(outcome.results.len(), 5);
    let failed: Vec<&TaskResult<i64>> = outcome.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].task_id, 0);
    assert!(failed[0].failure().unwrap().message.contains("division by zero"));
    assert!(!failed[0].failure().unwrap().panicked);
    assert_eq!(outcome.successes().count(), 4);
    assert!(outcome.ensure_complete().is_ok());
}

#[test]
fn test_panicking_task_becomes_failure() {
    let outcome = run(int_tasks(1..=4), 2, 4, None, |x: i64| {
        if x == 3 {
            panic!("boom on {x}");
        }
        Ok(x)
    })
    .unwrap();
    assert_eq!(outcome.status, CollectStatus::Complete);
    let failure = outcome
        .results
        .iter()
        .find(|r| r.task_id == 3)
        .and_then(|r| r.failure())
        .unwrap();
    assert!(failure.panicked);
    assert!(failure.message.contains("boom on 3"));
    assert_eq!(outcome.successes().count(), 3);
}

#[test]
fn test_deadline_cancels_slow_run() {
    let pipeline = Pipeline::new(PipelineOpts {
        workers: 2,
        deadline: Some(Duration::from_millis(50)),
        ..Default::default()
    });
    let start = Instant::now();
    let outcome = pipeline
        .run(int_tasks(1..=20), |x: i64| {
            thread::sleep(Duration::from_millis(200));
            Ok(x)
        })
        .unwrap();
    assert_eq!(outcome.status, CollectStatus::Cancelled);
    assert_eq!(outcome.cancel_reason, Some(CancelReason::Deadline));
    assert!(outcome.results.len() < 20);
    // In-flight tasks finish, nothing new starts.
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_deadline_not_reached_leaves_no_reason() {
    let pipeline = Pipeline::new(PipelineOpts {
        workers: 2,
        deadline: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let start = Instant::now();
    let outcome = pipeline.run(int_tasks(1..=10), |x: i64| Ok(x)).unwrap();
    assert_eq!(outcome.status, CollectStatus::Complete);
    assert_eq!(outcome.cancel_reason, None);
    assert!(!pipeline.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_expected_more_than_tasks_is_exhausted() {
    let outcome = run(int_tasks(1..=3), 2, 5, None, |x: i64| Ok(x)).unwrap();
    assert_eq!(outcome.status, CollectStatus::Exhausted);
    assert_eq!(outcome.results.len(), 3);
    assert!(matches!(
        outcome.ensure_complete(),
        Err(PipelineError::Exhausted {
            expected: 5,
            received: 3
        })
    ));
}

#[test]
fn test_huge_expected_is_exhausted() {
    for expected in [usize::MAX, usize::MAX / 2] {
        let outcome = run(int_tasks(1..=1), 1, expected, None, |x: i64| Ok(x)).unwrap();
        assert_eq!(outcome.status, CollectStatus::Exhausted);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.delivered, 1);
    }
}

#[test]
fn test_deadline_racing_completion_never_mixes_outcomes() {
    for i in 0..300_u64 {
        let pipeline = Pipeline::new(PipelineOpts {
            workers: 1,
            deadline: Some(Duration::from_micros(300 + i % 200)),
            ..Default::default()
        });
        let outcome = pipeline
            .run(int_tasks(1..=1), |x: i64| {
                thread::sleep(Duration::from_micros(350));
                Ok(x)
            })
            .unwrap();
        match outcome.status {
            CollectStatus::Complete => {
                assert_eq!(outcome.cancel_reason, None, "run {i}");
                assert_eq!(outcome.results.len(), 1, "run {i}");
                assert!(!pipeline.is_cancelled(), "run {i}");
            }
            CollectStatus::Cancelled => {
                assert_eq!(outcome.cancel_reason, Some(CancelReason::Deadline), "run {i}");
                assert!(pipeline.is_cancelled(), "run {i}");
            }
            CollectStatus::Exhausted => panic!("run {i}: exhausted"),
        }
    }
}

#[test]
fn test_expected_fewer_than_tasks_shuts_down() {
    let pipeline = Pipeline::new(PipelineOpts {
        workers: 2,
        expected: Some(3),
        queue_capacity: 1,
        sink_capacity: 1,
        ..Default::default()
    });
    let outcome = pipeline.run(int_tasks(1..=50), |x: i64| Ok(x)).unwrap();
    assert_eq!(outcome.status, CollectStatus::Complete);
    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.submitted <= 50);
}

#[test]
fn test_zero_workers_rejected() {
    let err = run(int_tasks(1..=3), 0, 3, None, |x: i64| Ok(x)).unwrap_err();
    assert!(matches!(err, PipelineError::NoWorkers));
}

#[test]
fn test_run_on_cancelled_pipeline() {
    let pipeline = Pipeline::new(opts(2));
    assert!(pipeline.cancel());
    let outcome = pipeline.run(int_tasks(1..=5), |x: i64| Ok(x)).unwrap();
    assert_eq!(outcome.status, CollectStatus::Cancelled);
    assert!(outcome.results.is_empty());

    // Nothing to wait for still counts as complete.
    let pipeline = Pipeline::new(PipelineOpts {
        workers: 1,
        expected: Some(0),
        ..Default::default()
    });
    pipeline.cancel();
    let outcome = pipeline.run(int_tasks(1..=5), |x: i64| Ok(x)).unwrap();
    assert_eq!(outcome.status, CollectStatus::Complete);
}

// --- CancelToken ---

#[test]
fn test_cancel_is_idempotent() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());
    assert_eq!(token.reason(), None);
    assert!(token.cancel_with(CancelReason::Interrupted));
    assert!(!token.cancel());
    assert!(!token.cancel_with(CancelReason::Deadline));
    assert!(token.is_cancelled());
    assert_eq!(token.reason(), Some(CancelReason::Interrupted));
    let clone = token.clone();
    assert!(clone.is_cancelled());
}

#[test]
fn test_wait_timeout() {
    let token = CancelToken::new();
    assert!(!token.wait_timeout(Duration::from_millis(10)));
    let t = token.clone();
    let h = thread::spawn(move || t.wait_timeout(Duration::from_secs(10)));
    thread::sleep(Duration::from_millis(20));
    token.cancel();
    assert!(h.join().unwrap());
}

#[test]
fn test_deadline_guard_drop_disarms() {
    let token = CancelToken::new();
    let guard = token.with_deadline(Duration::from_millis(30)).unwrap();
    drop(guard);
    thread::sleep(Duration::from_millis(60));
    assert!(!token.is_cancelled());

    let guard = token.with_deadline(Duration::from_millis(10)).unwrap();
    assert!(token.wait_timeout(Duration::from_secs(5)));
    assert_eq!(token.reason(), Some(CancelReason::Deadline));
    guard.disarm();
}

#[test]
fn test_try_disarm_and_fire_are_exclusive() {
    let token = CancelToken::new();
    let guard = token.with_deadline(Duration::from_millis(10)).unwrap();
    assert!(guard.try_disarm());
    assert!(guard.try_disarm());
    thread::sleep(Duration::from_millis(40));
    assert!(!token.is_cancelled());
    drop(guard);

    let guard = token.with_deadline(Duration::from_millis(5)).unwrap();
    assert!(token.wait_timeout(Duration::from_secs(5)));
    assert!(!guard.try_disarm());
    assert_eq!(token.reason(), Some(CancelReason::Deadline));
}

#[test]
fn test_collector_disarms_deadline_on_complete() {
    let cancel = CancelToken::new();
    let (tx, rx) = bounded_queue::<TaskResult<i64>>(4);
    tx.put(
        TaskResult {
            task_id: 1,
            outcome: Ok(1),
            worker: 0,
            elapsed: Duration::ZERO,
        },
        &cancel,
    )
    .unwrap();
    let guard = cancel.with_deadline(Duration::from_millis(20)).unwrap();
    let collector = Collector::new(rx, cancel.clone()).with_deadline_guard(guard);
    let (results, status) = collector.collect(1);
    assert_eq!(status, CollectStatus::Complete);
    assert_eq!(results.len(), 1);
    thread::sleep(Duration::from_millis(60));
    assert!(!cancel.is_cancelled());
}

// --- Queue ---

#[test]
fn test_closed_queue_drains_then_reports_closed() {
    let cancel = CancelToken::new();
    let (mut tx, rx) = bounded_queue::<u32>(4);
    tx.put(1, &cancel).unwrap();
    tx.put(2, &cancel).unwrap();
    tx.close();
    tx.close();
    assert!(tx.is_closed());
    assert!(matches!(tx.put(3, &cancel), Err(PipelineError::ClosedQueue)));
    assert_eq!(rx.take(&cancel), Take::Item(1));
    assert_eq!(rx.take(&cancel), Take::Item(2));
    assert_eq!(rx.take(&cancel), Take::Closed);
}

#[test]
fn test_blocked_take_wakes_on_cancel() {
    let cancel = CancelToken::new();
    let (_tx, rx) = bounded_queue::<u32>(1);
    let (done_tx, done_rx) = mpsc::channel();
    let c = cancel.clone();
    let h = thread::spawn(move || {
        done_tx.send(rx.take(&c)).unwrap();
    });
    thread::sleep(Duration::from_millis(20));
    cancel.cancel();
    let got = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(got, Take::Cancelled);
    h.join().unwrap();
}

#[test]
fn test_blocked_put_wakes_on_cancel() {
    let cancel = CancelToken::new();
    let (tx, rx) = bounded_queue::<u32>(1);
    tx.put(1, &cancel).unwrap();
    let (done_tx, done_rx) = mpsc::channel();
    let c = cancel.clone();
    let h = thread::spawn(move || {
        done_tx.send(tx.put(2, &c)).unwrap();
    });
    thread::sleep(Duration::from_millis(20));
    cancel.cancel();
    let got = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(got, Err(PipelineError::Cancelled)));
    assert_eq!(rx.len(), 1);
    h.join().unwrap();
}

#[test]
fn test_put_without_receivers_is_disconnected() {
    let cancel = CancelToken::new();
    let (tx, rx) = bounded_queue::<u32>(1);
    drop(rx);
    assert!(matches!(tx.put(1, &cancel), Err(PipelineError::Disconnected)));
}

// --- Dispatcher ---

#[test]
fn test_submit_after_close_is_closed_queue_error() {
    let cancel = CancelToken::new();
    let (tx, rx) = bounded_queue::<Task<i64>>(8);
    let mut dispatcher = Dispatcher::new(tx, cancel.clone());
    assert_eq!(dispatcher.submit(int_tasks(1..=3)).unwrap(), 3);
    assert!(dispatcher.is_closed());
    assert!(matches!(
        dispatcher.submit(int_tasks(4..=4)),
        Err(PipelineError::ClosedQueue)
    ));
    assert!(matches!(
        dispatcher.submit_one(Task::new(9, 9)),
        Err(PipelineError::ClosedQueue)
    ));
    assert_eq!(dispatcher.submitted(), 3);

    let mut ids = Vec::new();
    while let Take::Item(task) = rx.take(&cancel) {
        ids.push(task.id);
    }
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_dispatcher_drop_closes_queue() {
    let cancel = CancelToken::new();
    let (tx, rx) = bounded_queue::<Task<i64>>(8);
    {
        let mut dispatcher = Dispatcher::new(tx, cancel.clone());
        dispatcher.submit_one(Task::new(1, 1)).unwrap();
    }
    assert!(matches!(rx.take(&cancel), Take::Item(_)));
    assert_eq!(rx.take(&cancel), Take::Closed);
}

// --- Workers + Collector wired by hand ---

#[test]
fn test_collector_exhausted_when_workers_finish() {
    let cancel = CancelToken::new();
    let (task_tx, task_rx) = bounded_queue::<Task<i64>>(2);
    let (result_tx, result_rx) = bounded_queue::<TaskResult<i64>>(2);
    let handler: Handler<i64, i64> =
        Arc::new(|x: i64| -> anyhow::Result<i64> { Ok(x * 3) });
    let workers = spawn_workers(&task_rx, &result_tx, &handler, &cancel, 3).unwrap();
    drop(result_tx);
    drop(task_rx);

    let mut dispatcher = Dispatcher::new(task_tx, cancel.clone());
    let h = thread::spawn(move || dispatcher.submit(int_tasks(1..=4)));

    let collector = Collector::new(result_rx, cancel);
    let (results, status) = collector.collect(10);
    assert_eq!(status, CollectStatus::Exhausted);
    assert_eq!(results.len(), 4);
    assert_eq!(h.join().unwrap().unwrap(), 4);
    let delivered: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(delivered, 4);
}
