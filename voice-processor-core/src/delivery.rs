//! Single-threaded delivery context for listener callbacks.
//!
//! The capture worker never calls user code directly. Frames, errors,
//! lifecycle notifications and pending results are posted here and run one
//! at a time, in posting order.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{unbounded, Sender};

use crate::models::error::CaptureError;

/// A unit of work run on the delivery context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Serial executor that all session callbacks are marshaled onto.
///
/// Implementations must run jobs one at a time, in the order they were posted,
/// and must not run a job inline inside `post`: the session posts while
/// holding its state lock.
pub trait DeliveryContext: Send + Sync {
    fn post(&self, job: Job);
}

/// Default delivery context: a dedicated thread draining an unbounded queue.
pub struct EventLoop {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl EventLoop {
    pub fn spawn(name: &str) -> Result<Self, CaptureError> {
        let (sender, receiver) = unbounded::<Job>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in receiver.iter() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("Listener panicked on the delivery thread");
                    }
                }
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn delivery thread: {}", e)))?;

        Ok(Self {
            sender: Some(sender),
            thread_id: handle.thread().id(),
            handle: Some(handle),
        })
    }

    /// Whether the caller is running on this loop's thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl DeliveryContext for EventLoop {
    fn post(&self, job: Job) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(job).is_err() {
            log::warn!("Delivery thread has exited; dropping event");
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain what is queued and exit.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if self.is_current() {
                return;
            }
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn runs_jobs_in_posting_order() {
        let event_loop = EventLoop::spawn("test-events").unwrap();
        let (tx, rx) = unbounded();

        for i in 0..100 {
            let tx = tx.clone();
            event_loop.post(Box::new(move || tx.send(i).unwrap()));
        }

        let received: Vec<i32> = (0..100)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn survives_panicking_job() {
        let event_loop = EventLoop::spawn("test-events").unwrap();
        let (tx, rx) = unbounded();

        event_loop.post(Box::new(|| panic!("listener bug")));
        event_loop.post(Box::new(move || tx.send(()).unwrap()));

        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn drop_drains_queued_jobs() {
        let (tx, rx) = unbounded();
        {
            let event_loop = EventLoop::spawn("test-events").unwrap();
            for i in 0..10 {
                let tx = tx.clone();
                event_loop.post(Box::new(move || tx.send(i).unwrap()));
            }
        }
        assert_eq!(rx.try_iter().count(), 10);
    }

    #[test]
    fn is_current_only_on_loop_thread() {
        let event_loop = std::sync::Arc::new(EventLoop::spawn("test-events").unwrap());
        assert!(!event_loop.is_current());

        let (tx, rx) = unbounded();
        let inner = std::sync::Arc::clone(&event_loop);
        event_loop.post(Box::new(move || tx.send(inner.is_current()).unwrap()));
        assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
    }
}
