//! Channels bound to the active runtime
//!
//! `Channel<T>` is a cheap, cloneable handle to a shared [`ChannelCore`].
//! Every operation drives the core with whatever runtime is running on
//! this OS thread, so a channel may be created before `run` and moved into
//! any number of threads.

use std::fmt;
use std::rc::Rc;

use crate::config::defaults;
use crate::scheduler::{self, CurrentScheduler};
use uthread_core::channel::ChannelCore;
use uthread_core::error::{SchedResult, TryRecvError, TrySendError};

/// Shared handle to a bounded channel
///
/// A capacity of 0 makes every transfer a rendezvous between a sender and
/// a receiver.
pub struct Channel<T> {
    core: Rc<ChannelCore<T>>,
}

/// Create a channel with room for `capacity` buffered values
pub fn channel<T: 'static>(capacity: usize) -> Channel<T> {
    Channel::new(capacity)
}

impl<T: 'static> Channel<T> {
    /// Create a channel with room for `capacity` buffered values
    ///
    /// Wait queues take their capacity from the active runtime's config,
    /// or the compiled-in default outside a runtime.
    pub fn new(capacity: usize) -> Self {
        let max_waiters = scheduler::active_max_waiters().unwrap_or(defaults::MAX_WAITERS);
        Self::with_max_waiters(capacity, max_waiters)
    }

    /// Create a channel with explicit wait queue capacity
    pub fn with_max_waiters(capacity: usize, max_waiters: usize) -> Self {
        Self {
            core: Rc::new(ChannelCore::new(capacity, max_waiters)),
        }
    }

    /// Send `value`, blocking until a receiver takes it or it is buffered
    pub fn send(&self, value: T) -> SchedResult<()> {
        self.core.send(&CurrentScheduler, value)
    }

    /// Receive the next value, blocking until one is available
    pub fn recv(&self) -> SchedResult<T> {
        self.core.recv(&CurrentScheduler)
    }

    /// Send without blocking; the value is handed back on failure
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.core.try_send(&CurrentScheduler, value)
    }

    /// Receive without blocking
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.core.try_recv(&CurrentScheduler)
    }
}

impl<T> Channel<T> {
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Buffered values
    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Threads blocked in `send`
    pub fn waiting_senders(&self) -> usize {
        self.core.waiting_senders()
    }

    /// Threads blocked in `recv`
    pub fn waiting_receivers(&self) -> usize {
        self.core.waiting_receivers()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("waiting_senders", &self.waiting_senders())
            .field("waiting_receivers", &self.waiting_receivers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::scheduler::{current_id, yield_now, Runtime};
    use std::cell::RefCell;
    use uthread_core::error::SchedError;
    use uthread_core::id::ThreadId;
    use uthread_core::state::ThreadState;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::new().stack_size(64 * 1024)).unwrap()
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_producer_consumer_end_to_end() {
        let mut rt = runtime();
        let ch = channel::<i32>(0);
        let got = Rc::new(RefCell::new(Vec::new()));

        let tx = ch.clone();
        rt.spawn(move || {
            for v in 1..=3 {
                tx.send(v).unwrap();
            }
        })
        .unwrap();

        let rx = ch.clone();
        let out = Rc::clone(&got);
        rt.spawn(move || {
            for _ in 0..3 {
                out.borrow_mut().push(rx.recv().unwrap());
            }
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(*got.borrow(), vec![1, 2, 3]);
        assert!(rt.is_empty());
        assert_eq!(ch.waiting_senders(), 0);
        assert_eq!(ch.waiting_receivers(), 0);
    }

    #[test]
    fn test_rendezvous_is_fifo_across_senders() {
        let mut rt = runtime();
        let ch = channel::<&'static str>(0);
        let got = log();

        for name in ["a", "b", "c"] {
            let tx = ch.clone();
            rt.spawn(move || tx.send(name).unwrap()).unwrap();
        }

        let rx = ch.clone();
        let out = Rc::clone(&got);
        rt.spawn(move || {
            for _ in 0..3 {
                out.borrow_mut().push(rx.recv().unwrap().to_string());
            }
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(*got.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_buffered_send_does_not_block() {
        let mut rt = runtime();
        let ch = channel::<u32>(2);
        let events = log();

        let tx = ch.clone();
        let ev = Rc::clone(&events);
        rt.spawn(move || {
            tx.send(1).unwrap();
            tx.send(2).unwrap();
            ev.borrow_mut().push("sent both".into());
        })
        .unwrap();

        let rx = ch.clone();
        let ev = Rc::clone(&events);
        rt.spawn(move || {
            let a = rx.recv().unwrap();
            let b = rx.recv().unwrap();
            ev.borrow_mut().push(format!("got {} {}", a, b));
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(*events.borrow(), vec!["sent both", "got 1 2"]);
    }

    #[test]
    fn test_waiting_receiver_bypasses_free_buffer() {
        let mut rt = runtime();
        let ch = channel::<u32>(4);
        let got = Rc::new(RefCell::new(None));
        let observed = Rc::new(RefCell::new(Vec::new()));

        let rx = ch.clone();
        let out = Rc::clone(&got);
        rt.spawn(move || *out.borrow_mut() = Some(rx.recv().unwrap()))
            .unwrap();

        let tx = ch.clone();
        let obs = Rc::clone(&observed);
        rt.spawn(move || {
            obs.borrow_mut().push((tx.waiting_receivers(), tx.len()));
            tx.send(7).unwrap();
            // Handed straight to the receiver's mailbox
            obs.borrow_mut().push((tx.waiting_receivers(), tx.len()));
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(*got.borrow(), Some(7));
        assert_eq!(*observed.borrow(), vec![(1, 0), (0, 0)]);
    }

    #[test]
    fn test_blocked_sender_resumes_with_its_value_taken() {
        let mut rt = runtime();
        let ch = channel::<String>(0);
        let events = log();

        let tx = ch.clone();
        let ev = Rc::clone(&events);
        let sender = rt
            .spawn(move || {
                tx.send("payload".to_string()).unwrap();
                ev.borrow_mut().push("send returned".into());
            })
            .unwrap();

        let rx = ch.clone();
        let ev = Rc::clone(&events);
        rt.spawn(move || {
            ev.borrow_mut().push(format!("{} waiting", rx.waiting_senders()));
            let v = rx.recv().unwrap();
            ev.borrow_mut().push(format!("received {}", v));
        })
        .unwrap();

        assert_eq!(rt.state(sender), Some(ThreadState::Ready));
        rt.run().unwrap();
        assert_eq!(
            *events.borrow(),
            vec!["1 waiting", "received payload", "send returned"]
        );
    }

    #[test]
    fn test_try_ops_inside_runtime() {
        let mut rt = runtime();
        let ch = channel::<u8>(1);
        let c = ch.clone();

        rt.block_on(move || {
            assert_eq!(c.try_recv(), Err(TryRecvError));
            c.try_send(1).unwrap();
            assert_eq!(c.try_send(2), Err(TrySendError(2)));
            assert_eq!(c.try_recv(), Ok(1));
        })
        .unwrap();
    }

    #[test]
    fn test_spurious_wake_does_not_swallow_next_send() {
        let mut rt = runtime();
        let ch = channel::<u32>(0);
        let recv_result = Rc::new(RefCell::new(None));
        let send_result = Rc::new(RefCell::new(None));

        let rx = ch.clone();
        let out = Rc::clone(&recv_result);
        let receiver = rt
            .spawn(move || *out.borrow_mut() = Some(rx.recv()))
            .unwrap();

        let tx = ch.clone();
        let out = Rc::clone(&send_result);
        rt.spawn(move || {
            crate::scheduler::mark_ready(receiver).unwrap();
            yield_now();
            *out.borrow_mut() = Some(tx.try_send(9));
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(*recv_result.borrow(), Some(Err(SchedError::InvalidState)));
        assert_eq!(*send_result.borrow(), Some(Err(TrySendError(9))));
        assert_eq!(ch.waiting_receivers(), 0);
    }

    #[test]
    fn test_unmatched_recv_deadlocks() {
        let mut rt = runtime();
        let ch = channel::<u8>(0);
        let rx = ch.clone();
        let id = rt.spawn(move || {
            let _ = rx.recv();
        })
        .unwrap();

        assert_eq!(rt.run(), Err(SchedError::Deadlock { blocked: 1 }));
        assert_eq!(rt.state(id), Some(ThreadState::ChannelBlockRecv));
        assert_eq!(ch.waiting_receivers(), 1);
    }

    #[test]
    fn test_sender_queue_limit_from_config() {
        let mut rt = Runtime::new(
            RuntimeConfig::new().stack_size(64 * 1024).max_waiters(1),
        )
        .unwrap();
        let result = Rc::new(RefCell::new(None));

        fn spawn_sender(ch: Channel<u8>) {
            crate::scheduler::spawn(move || ch.send(1).unwrap()).unwrap();
        }

        let out = Rc::clone(&result);
        rt.spawn(move || {
            let ch = channel::<u8>(0);
            spawn_sender(ch.clone());
            yield_now();
            // The other thread holds the only sender slot
            *out.borrow_mut() = Some(ch.send(2));
            // Drain so the first sender finishes
            assert_eq!(ch.recv(), Ok(1));
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(
            *result.borrow(),
            Some(Err(SchedError::WaitQueueFull { capacity: 1 }))
        );
    }

    #[test]
    fn test_outside_runtime() {
        let ch = channel::<u8>(1);
        assert_eq!(ch.capacity(), 1);

        // Non-blocking paths work without a scheduler
        ch.send(5).unwrap();
        assert_eq!(ch.len(), 1);
        assert_eq!(ch.recv(), Ok(5));

        // Blocking needs one
        assert_eq!(ch.recv(), Err(SchedError::NotInitialized));
        assert_eq!(current_id(), ThreadId::NONE);
    }
}
