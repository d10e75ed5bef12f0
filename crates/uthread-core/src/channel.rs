//! Bounded channel decision logic
//!
//! `ChannelCore` implements the full send/receive protocol (rendezvous,
//! buffering, blocking) but never touches a stack or a register: every
//! state change and every yield goes through a [`SchedulerOps`]. The
//! runtime wraps it in a shareable `Channel<T>` bound to the active
//! scheduler.
//!
//! Protocol, in order of preference:
//!
//! ```text
//! send(v):  waiting receiver? -> hand v to it, wake it
//!           buffer has room?  -> push v
//!           otherwise         -> queue (me, v), block, yield
//!
//! recv():   waiting sender?   -> take its v, wake it
//!           buffer non-empty? -> pop
//!           otherwise         -> queue me, block, yield, read mailbox
//! ```
//!
//! A waiting sender is served before the buffer. With a full buffer and a
//! blocked sender, the blocked sender's value is received first.

use core::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{SchedError, SchedResult, TryRecvError, TrySendError};
use crate::id::ThreadId;
use crate::state::ThreadState;
use crate::traits::SchedulerOps;
use crate::ktrace;

/// Shared state of one channel
pub struct ChannelCore<T> {
    state: RefCell<ChannelState<T>>,

    /// Maximum buffered values; 0 means every transfer is a rendezvous
    capacity: usize,

    /// Fixed capacity of each wait queue
    max_waiters: usize,
}

struct ChannelState<T> {
    /// Ring buffer of messages
    buffer: VecDeque<T>,

    /// Threads blocked in `send`, with the value they are offering
    senders: VecDeque<(ThreadId, T)>,

    /// Threads blocked in `recv`
    receivers: VecDeque<ThreadId>,
}

impl<T: 'static> ChannelCore<T> {
    /// Create a channel holding up to `capacity` buffered values and up to
    /// `max_waiters` blocked threads per direction.
    pub fn new(capacity: usize, max_waiters: usize) -> Self {
        Self {
            state: RefCell::new(ChannelState {
                buffer: VecDeque::with_capacity(capacity),
                senders: VecDeque::new(),
                receivers: VecDeque::new(),
            }),
            capacity,
            max_waiters,
        }
    }

    /// Send a value, blocking the current thread until it is taken or buffered
    ///
    /// Returns `Err(WaitQueueFull)` if the sender queue is at capacity, and
    /// `Err(NoRunnableThreads)` if blocking was required but the scheduler
    /// had nothing else to run. A thread woken before any receiver took its
    /// value gets `Err(InvalidState)`. In every error case the value is
    /// dropped and no queue entry is left behind.
    pub fn send<S: SchedulerOps + ?Sized>(&self, sched: &S, value: T) -> SchedResult<()> {
        let value = match self.offer(sched, value) {
            Ok(()) => return Ok(()),
            Err(value) => value,
        };

        let me = sched.current_thread();
        if me.is_none() {
            return Err(SchedError::NotInitialized);
        }

        {
            let mut st = self.state.borrow_mut();
            if st.senders.len() >= self.max_waiters {
                return Err(SchedError::WaitQueueFull { capacity: self.max_waiters });
            }
            st.senders.push_back((me, value));
        }

        ktrace!("thread {} blocked in send", me);
        sched.mark_blocked(me, ThreadState::ChannelBlockSend);

        if !sched.yield_thread() {
            // Nobody can ever take the value; withdraw it.
            self.withdraw_sender(me);
            sched.mark_running(me);
            return Err(SchedError::NoRunnableThreads);
        }

        // Woken without a receiver taking our entry
        if self.withdraw_sender(me) {
            return Err(SchedError::InvalidState);
        }
        Ok(())
    }

    /// Receive a value, blocking the current thread until one arrives
    pub fn recv<S: SchedulerOps + ?Sized>(&self, sched: &S) -> SchedResult<T> {
        if let Some(value) = self.take(sched) {
            return Ok(value);
        }

        let me = sched.current_thread();
        if me.is_none() {
            return Err(SchedError::NotInitialized);
        }

        {
            let mut st = self.state.borrow_mut();
            if st.receivers.len() >= self.max_waiters {
                return Err(SchedError::WaitQueueFull { capacity: self.max_waiters });
            }
            st.receivers.push_back(me);
        }

        ktrace!("thread {} blocked in recv", me);
        sched.mark_blocked(me, ThreadState::ChannelBlockRecv);

        if !sched.yield_thread() {
            self.withdraw_receiver(me);
            sched.mark_running(me);
            return Err(SchedError::NoRunnableThreads);
        }

        // Resumed: the matching sender wrote into our mailbox.
        let Some(boxed) = sched.take_delivery(me) else {
            // Woken without a delivery; a later send must not pick us.
            self.withdraw_receiver(me);
            return Err(SchedError::InvalidState);
        };
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| SchedError::InvalidState)
    }

    /// Try to send without blocking
    pub fn try_send<S: SchedulerOps + ?Sized>(
        &self,
        sched: &S,
        value: T,
    ) -> Result<(), TrySendError<T>> {
        self.offer(sched, value).map_err(TrySendError)
    }

    /// Try to receive without blocking
    pub fn try_recv<S: SchedulerOps + ?Sized>(&self, sched: &S) -> Result<T, TryRecvError> {
        self.take(sched).ok_or(TryRecvError)
    }

    /// Rendezvous with a waiting receiver, or buffer. Gives the value back
    /// if neither is possible.
    fn offer<S: SchedulerOps + ?Sized>(&self, sched: &S, value: T) -> Result<(), T> {
        let mut st = self.state.borrow_mut();

        if let Some(receiver) = st.receivers.pop_front() {
            drop(st);
            sched.deliver(receiver, Box::new(value));
            sched.mark_ready(receiver);
            return Ok(());
        }

        if st.buffer.len() < self.capacity {
            st.buffer.push_back(value);
            return Ok(());
        }

        Err(value)
    }

    /// Remove `me` from the sender queue, dropping its value. Returns
    /// whether an entry was still queued.
    fn withdraw_sender(&self, me: ThreadId) -> bool {
        let mut st = self.state.borrow_mut();
        match st.senders.iter().position(|(id, _)| *id == me) {
            Some(pos) => {
                st.senders.remove(pos);
                true
            }
            None => false,
        }
    }

    fn withdraw_receiver(&self, me: ThreadId) {
        self.state.borrow_mut().receivers.retain(|id| *id != me);
    }

    /// Rendezvous with a waiting sender, or drain the buffer
    fn take<S: SchedulerOps + ?Sized>(&self, sched: &S) -> Option<T> {
        let mut st = self.state.borrow_mut();

        if let Some((sender, value)) = st.senders.pop_front() {
            drop(st);
            sched.mark_ready(sender);
            return Some(value);
        }

        st.buffer.pop_front()
    }
}

impl<T> ChannelCore<T> {
    /// Get channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the fixed capacity of each wait queue
    pub fn max_waiters(&self) -> usize {
        self.max_waiters
    }

    /// Get current number of items in the buffer
    pub fn len(&self) -> usize {
        self.state.borrow().buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.state.borrow().buffer.is_empty()
    }

    /// Number of threads blocked in `send`
    pub fn waiting_senders(&self) -> usize {
        self.state.borrow().senders.len()
    }

    /// Number of threads blocked in `recv`
    pub fn waiting_receivers(&self) -> usize {
        self.state.borrow().receivers.len()
    }
}
