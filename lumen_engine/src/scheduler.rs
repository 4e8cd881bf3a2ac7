use crossbeam_channel::{unbounded, Receiver, Sender};

type Task = Box<dyn FnOnce() + Send>;

/// FIFO of deferred closures, handing work from MIDI callbacks to the render
/// task. Any thread may schedule; a single consumer drains.
pub struct Scheduler {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn schedule(&self, task: impl FnOnce() + Send + 'static) {
        // The queue is unbounded and we hold both ends, so this cannot fail.
        let _ = self.tx.send(Box::new(task));
    }

    /// Drains the queue, running each task exactly once in FIFO order. Tasks
    /// scheduled while draining are picked up by the same drain. Returns
    /// whether anything ran.
    pub fn execute_all(&self) -> bool {
        let mut executed = false;
        while let Ok(task) = self.rx.try_recv() {
            task();
            executed = true;
        }
        executed
    }

    /// Runs the task at the front of the queue, if any.
    pub fn execute_one(&self) -> bool {
        match self.rx.try_recv() {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn executes_in_fifo_order() {
        let scheduler = Scheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..5 {
            let order = Arc::clone(&order);
            scheduler.schedule(move || order.lock().unwrap().push(id));
        }

        assert!(scheduler.execute_all());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(!scheduler.execute_all());
    }

    #[test]
    fn execute_one_pops_a_single_task() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let count = Arc::clone(&count);
            scheduler.schedule(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(scheduler.execute_one());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(scheduler.execute_one());
        assert!(!scheduler.execute_one());
    }

    #[test]
    fn tasks_scheduled_during_a_drain_run_in_the_same_drain() {
        let scheduler = Arc::new(Scheduler::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = Arc::clone(&scheduler);
        let inner_count = Arc::clone(&count);
        scheduler.schedule(move || {
            let count = Arc::clone(&inner_count);
            inner_scheduler.schedule(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        });

        scheduler.execute_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn producers_may_live_on_other_threads() {
        let scheduler = Arc::new(Scheduler::new());
        let count = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                let count = Arc::clone(&count);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let count = Arc::clone(&count);
                        scheduler.schedule(move || {
                            count.fetch_add(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        scheduler.execute_all();
        assert_eq!(count.load(Ordering::SeqCst), 400);
    }
}
