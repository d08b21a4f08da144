//! CPU/GPU fence.
//!
//! wgpu has no user-visible fence object, so the counter is kept here: the CPU
//! owns a monotonically increasing target value, the queue publishes the value
//! it has reached through a shared atomic once submitted work completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::DeviceError;

/// Queue side of a fence: something that can signal a value after all previously
/// submitted work and block until that value is reached.
pub trait SignalQueue {
    /// Enqueues a signal of `value`; `completed` is raised to at least `value`
    /// once the queue has drained everything submitted before the call.
    fn signal(&mut self, value: u64, completed: &Arc<AtomicU64>) -> Result<(), DeviceError>;

    /// Blocks until the queue has reached `value`.
    fn wait(&mut self, value: u64, completed: &AtomicU64) -> Result<(), DeviceError>;
}

/// Monotonic fence counter.
#[derive(Debug, Default)]
pub struct Fence {
    target: u64,
    completed: Arc<AtomicU64>,
}

impl Fence {
    /// Creates a fence at value 0 (nothing signaled yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value handed to the queue.
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Last value the queue reported as reached.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Waits for every piece of work submitted so far.
    ///
    /// Increments the target, signals it and blocks until the queue reports it.
    /// Returns the value waited for.
    pub fn flush<Q: SignalQueue>(&mut self, queue: &mut Q) -> Result<u64, DeviceError> {
        self.target += 1;
        let value = self.target;

        queue.signal(value, &self.completed)?;

        if self.completed() < value {
            queue.wait(value, &self.completed)?;
        }

        let completed = self.completed();
        if completed < value {
            return Err(DeviceError::FenceIncomplete { value, completed });
        }

        log::trace!("fence flushed at {value}");
        Ok(value)
    }
}

/// [`SignalQueue`] backed by a wgpu queue.
///
/// The signal is an empty submission whose completion callback publishes the
/// value; waiting polls the device for that submission.
pub struct QueueTimeline<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    pending: Option<wgpu::SubmissionIndex>,
}

impl<'a> QueueTimeline<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            pending: None,
        }
    }
}

impl SignalQueue for QueueTimeline<'_> {
    fn signal(&mut self, value: u64, completed: &Arc<AtomicU64>) -> Result<(), DeviceError> {
        let completed = Arc::clone(completed);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        self.pending = Some(self.queue.submit(std::iter::empty()));
        Ok(())
    }

    fn wait(&mut self, value: u64, completed: &AtomicU64) -> Result<(), DeviceError> {
        let submission_index = self.pending.take();
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index,
                timeout: None,
            })
            .map_err(|e| DeviceError::FenceWait {
                value,
                reason: e.to_string(),
            })?;

        // Callbacks fire during poll; a single extra poll covers backends that
        // defer them to the next maintenance pass.
        if completed.load(Ordering::Acquire) < value {
            let _ = self.device.poll(wgpu::PollType::Poll);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Queue that completes signals either immediately or only on `wait`.
    #[derive(Default)]
    struct FakeQueue {
        immediate: bool,
        waits: u32,
        signaled: Vec<u64>,
        broken: bool,
    }

    impl SignalQueue for FakeQueue {
        fn signal(&mut self, value: u64, completed: &Arc<AtomicU64>) -> Result<(), DeviceError> {
            self.signaled.push(value);
            if self.immediate {
                completed.fetch_max(value, Ordering::AcqRel);
            }
            Ok(())
        }

        fn wait(&mut self, value: u64, completed: &AtomicU64) -> Result<(), DeviceError> {
            self.waits += 1;
            if !self.broken {
                completed.fetch_max(value, Ordering::AcqRel);
            }
            Ok(())
        }
    }

    // ── monotonicity ──────────────────────────────────────────────────────

    #[test]
    fn flush_values_increase_and_complete() {
        let mut fence = Fence::new();
        let mut queue = FakeQueue::default();

        let mut previous = 0;
        for k in 1..=5 {
            let v = fence.flush(&mut queue).unwrap();
            assert_eq!(v, k);
            assert!(fence.completed() >= v);
            assert!(fence.completed() >= previous);
            previous = v;
        }
        assert_eq!(queue.signaled, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn flush_skips_wait_when_already_reached() {
        let mut fence = Fence::new();
        let mut queue = FakeQueue { immediate: true, ..Default::default() };

        fence.flush(&mut queue).unwrap();
        fence.flush(&mut queue).unwrap();
        assert_eq!(queue.waits, 0);
        assert_eq!(fence.completed(), 2);
    }

    #[test]
    fn flush_waits_when_pending() {
        let mut fence = Fence::new();
        let mut queue = FakeQueue::default();

        fence.flush(&mut queue).unwrap();
        assert_eq!(queue.waits, 1);
    }

    #[test]
    fn flush_reports_incomplete_wait() {
        let mut fence = Fence::new();
        let mut queue = FakeQueue { broken: true, ..Default::default() };

        let err = fence.flush(&mut queue).unwrap_err();
        assert!(matches!(err, DeviceError::FenceIncomplete { value: 1, completed: 0 }));
    }
}
