//! End-to-end scenarios for `Scheduler` (scenarios 5-6 of the testable properties).

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use taskforge::{Scheduler, Task, TaskHandle};

struct RecordOrder(u32, Arc<Mutex<Vec<u32>>>);

impl Task for RecordOrder {
    fn execute(&self) {
        self.1.lock().unwrap().push(self.0);
    }
    fn abandon(&self) {}
}

struct RecordingTask {
    executed: AtomicUsize,
    abandoned: AtomicUsize,
}

impl RecordingTask {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            executed: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
        })
    }
}

impl Task for RecordingTask {
    fn execute(&self) {
        self.executed.fetch_add(1, Ordering::SeqCst);
    }
    fn abandon(&self) {
        self.abandoned.fetch_add(1, Ordering::SeqCst);
    }
}

fn wait_until(mut predicate: impl FnMut() -> bool) {
    for _ in 0..400 {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition did not become true in time");
}

#[test]
fn scenario_5_deadlines_fire_in_ascending_order() {
    support::execute_or_abandon(|| {
        let scheduler = Scheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let now = Instant::now();

        scheduler.submit(
            Arc::new(RecordOrder(30, Arc::clone(&order))) as TaskHandle,
            now + Duration::from_millis(30),
        );
        scheduler.submit(
            Arc::new(RecordOrder(10, Arc::clone(&order))) as TaskHandle,
            now + Duration::from_millis(10),
        );
        scheduler.submit(
            Arc::new(RecordOrder(20, Arc::clone(&order))) as TaskHandle,
            now + Duration::from_millis(20),
        );

        wait_until(|| order.lock().unwrap().len() == 3);

        assert_eq!(*order.lock().unwrap(), vec![10, 20, 30]);
    });
}

#[test]
fn scenario_6_destructor_abandons_all_pending_tasks() {
    support::execute_or_abandon(|| {
        let scheduler = Scheduler::new();
        let tasks: Vec<_> = (0..25).map(|_| RecordingTask::new()).collect();

        for task in &tasks {
            scheduler.submit(
                Arc::clone(task) as TaskHandle,
                Instant::now() + Duration::from_secs(60),
            );
        }

        drop(scheduler);

        for task in &tasks {
            assert_eq!(task.executed.load(Ordering::SeqCst), 0);
            assert_eq!(task.abandoned.load(Ordering::SeqCst), 1);
        }
    });
}

#[test]
fn deadline_at_or_before_now_executes_promptly() {
    support::execute_or_abandon(|| {
        let scheduler = Scheduler::new();
        let task = RecordingTask::new();

        scheduler.submit(Arc::clone(&task) as TaskHandle, Instant::now());

        wait_until(|| task.executed.load(Ordering::SeqCst) == 1);
    });
}
