//! Cooperative round-robin scheduler
//!
//! All threads of a runtime share the OS thread that called [`Runtime::run`].
//! Control passes between them only through [`yield_thread`]; there is no
//! preemption. The driver itself is thread 0 (`ThreadId::MAIN`): it sits at
//! the front of the thread list, so one round of the round robin visits
//! every spawned thread and then the driver.
//!
//! ```text
//! threads: [main, t1, t2, t3]      current = t2
//! yield:   scan t3, main, t1 for the first Ready, switch to it
//! exit:    remove t2, keep its stack as the zombie, switch away;
//!          the next thread to land frees the zombie stack
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::rc::Rc;

use crate::arch::{self, Context};
use crate::config::RuntimeConfig;
use crate::thread::{Entry, Thread};
use crate::tls;
use uthread_core::error::{SchedError, SchedResult};
use uthread_core::id::ThreadId;
use uthread_core::state::ThreadState;
use uthread_core::traits::SchedulerOps;
use uthread_core::{kdebug, kerror, kprint, kwarn};

/// Scheduler state shared by the driver and every green thread
///
/// Lives in its own heap allocation so its address stays fixed while
/// threads hold it through the thread-local pointer. Accessed only through
/// short-lived `&mut` derived from that pointer; no reference is ever held
/// across a context switch.
pub(crate) struct Core {
    /// Live threads sorted by id; the driver is always at index 0
    threads: Vec<Thread>,

    /// Thread currently executing
    current: ThreadId,

    /// Next id to mint
    next_id: u64,

    /// Last exited thread, kept until control is on another stack
    zombie: Option<Thread>,

    config: RuntimeConfig,

    /// `run` is on the stack
    running: bool,

    /// Completed context switches
    switches: u64,
}

impl Core {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            threads: vec![Thread::main()],
            current: ThreadId::MAIN,
            next_id: 1,
            zombie: None,
            config,
            running: false,
            switches: 0,
        }
    }

    #[inline]
    fn position(&self, id: ThreadId) -> Option<usize> {
        self.threads.binary_search_by_key(&id, |t| t.id).ok()
    }

    #[inline]
    fn thread_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        let pos = self.position(id)?;
        Some(&mut self.threads[pos])
    }

    fn spawn(&mut self, entry: Entry) -> SchedResult<ThreadId> {
        let id = ThreadId::new(self.next_id);
        let thread = Thread::spawned(id, self.config.stack_size, thread_start, entry)?;
        self.next_id += 1;

        if self.config.debug_logging {
            kdebug!("spawned thread {} ({} byte stack)", id, thread.stack_size());
        }

        // Ids only grow, so pushing keeps the list sorted
        self.threads.push(thread);
        Ok(id)
    }

    fn set_state(&mut self, id: ThreadId, state: ThreadState) -> SchedResult<()> {
        let thread = self.thread_mut(id).ok_or(SchedError::ThreadNotFound(id))?;
        thread.state = state;
        Ok(())
    }

    /// Free the stack of the last exited thread
    ///
    /// Must run on a stack other than the zombie's.
    fn reap(&mut self) {
        if let Some(thread) = self.zombie.take() {
            if self.config.debug_logging {
                kdebug!("released stack of thread {}", thread.id);
            }
        }
    }

    /// Spawned threads still alive
    fn live(&self) -> usize {
        self.threads.len() - 1
    }
}

/// Switch from the current thread to the next `Ready` one
///
/// With `exiting`, the current thread is removed from the set and never
/// resumes. Returns `false` without switching if no other thread is ready;
/// otherwise returns `true` once the current thread is resumed.
///
/// # Safety
///
/// `core` must be the active runtime on this OS thread and the caller must
/// not hold any reference into it.
unsafe fn switch_away(core: *mut Core, exiting: bool) -> bool {
    let (save, resume) = {
        let core = unsafe { &mut *core };
        let Some(pos) = core.position(core.current) else {
            return false;
        };

        let len = core.threads.len();
        let Some(next) = (1..len)
            .map(|k| &core.threads[(pos + k) % len])
            .find(|t| t.state.is_runnable())
            .map(|t| t.id)
        else {
            return false;
        };

        core.current = next;
        core.switches += 1;

        let save: *mut Context = if exiting {
            core.reap();
            let thread = core.threads.remove(pos);
            &mut core.zombie.insert(thread).ctx
        } else {
            let thread = &mut core.threads[pos];
            if thread.state == ThreadState::Running {
                thread.state = ThreadState::Ready;
            }
            &mut thread.ctx
        };

        let Some(next_pos) = core.position(next) else {
            return false;
        };
        let thread = &mut core.threads[next_pos];
        thread.state = ThreadState::Running;
        kprint::set_thread_id(next);

        (save, &thread.ctx as *const Context)
    };

    unsafe {
        arch::switch(save, resume);
        // Resumed: whoever switched here may have left a zombie behind
        (*core).reap();
    }
    true
}

/// First code run on every spawned thread's stack
extern "C" fn thread_start() -> ! {
    if let Some(core) = tls::current_core() {
        let entry = unsafe {
            let core = &mut *core;
            core.reap();
            let id = core.current;
            core.thread_mut(id).and_then(|t| t.entry.take())
        };

        if let Some(entry) = entry {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(entry)) {
                kerror!("thread panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }
    exit_current()
}

/// Terminate the calling green thread
///
/// Only reachable from a spawned thread, where the driver is always
/// `Ready`, so the final switch cannot fail.
pub(crate) fn exit_current() -> ! {
    if let Some(core) = tls::current_core() {
        unsafe {
            if (*core).config.debug_logging {
                kdebug!("thread {} finished", (*core).current);
            }
            switch_away(core, true);
        }
    }
    kerror!("exiting thread found nothing to resume");
    std::process::abort()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string payload>"
    }
}

/// Run `f` against the active runtime, if any
///
/// `f` must not yield.
#[inline]
fn with_core<R>(f: impl FnOnce(&mut Core) -> R) -> Option<R> {
    tls::current_core().map(|core| f(unsafe { &mut *core }))
}

/// A single-OS-thread green thread runtime
///
/// ```rust,ignore
/// let mut rt = Runtime::new(RuntimeConfig::from_env())?;
/// rt.spawn(|| {
///     for i in 0..3 {
///         println!("tick {}", i);
///         yield_now();
///     }
/// })?;
/// rt.run()?;
/// ```
pub struct Runtime {
    core: NonNull<Core>,
}

impl Runtime {
    /// Create a runtime after validating `config`
    pub fn new(config: RuntimeConfig) -> SchedResult<Self> {
        config.validate()?;
        if config.debug_logging {
            config.print();
        }
        let core = Box::new(Core::new(config));
        Ok(Self {
            core: NonNull::from(Box::leak(core)),
        })
    }

    /// Create a runtime from compile-time defaults and environment overrides
    pub fn from_env() -> SchedResult<Self> {
        Self::new(RuntimeConfig::from_env())
    }

    #[inline]
    fn core(&self) -> &Core {
        unsafe { self.core.as_ref() }
    }

    /// Add a `Ready` thread that will run `f`
    ///
    /// May be called before `run` or, through the free [`spawn`], from any
    /// thread while it runs.
    pub fn spawn<F>(&self, f: F) -> SchedResult<ThreadId>
    where
        F: FnOnce() + 'static,
    {
        unsafe { (*self.core.as_ptr()).spawn(Box::new(f)) }
    }

    /// Drive threads until none is `Ready`
    ///
    /// Returns `Ok(())` once every spawned thread has finished. If threads
    /// remain but all are blocked on channels, returns
    /// `Err(SchedError::Deadlock)`; those threads stay in the runtime.
    pub fn run(&mut self) -> SchedResult<()> {
        let core = self.core.as_ptr();

        let (debug, live) = unsafe {
            let core = &mut *core;
            if core.running {
                return Err(SchedError::AlreadyRunning);
            }
            core.running = true;
            core.current = ThreadId::MAIN;
            core.threads[0].state = ThreadState::Running;
            (core.config.debug_logging, core.live())
        };

        if debug {
            kdebug!("run: {} thread(s) ready", live);
        }

        let prev_core = tls::enter(core);
        let prev_tag = kprint::thread_id();
        kprint::set_thread_id(ThreadId::MAIN);

        while unsafe { switch_away(core, false) } {}

        kprint::set_thread_id(prev_tag);
        tls::leave(prev_core);

        let core = unsafe { &mut *core };
        core.running = false;

        let blocked = core.live();
        if blocked > 0 {
            kwarn!("run stopped with {} blocked thread(s)", blocked);
            return Err(SchedError::Deadlock { blocked });
        }

        if debug {
            kdebug!("run: all threads finished after {} switches", core.switches);
        }
        Ok(())
    }

    /// Spawn `f`, run to completion and return its result
    ///
    /// Returns `Err(InvalidState)` if `f` panicked.
    pub fn block_on<F, R>(&mut self, f: F) -> SchedResult<R>
    where
        F: FnOnce() -> R + 'static,
        R: 'static,
    {
        let slot = Rc::new(RefCell::new(None));
        let out = Rc::clone(&slot);
        self.spawn(move || {
            let value = f();
            *out.borrow_mut() = Some(value);
        })?;

        self.run()?;
        let result = slot.borrow_mut().take();
        result.ok_or(SchedError::InvalidState)
    }

    /// Number of spawned threads that have not finished
    pub fn len(&self) -> usize {
        self.core().live()
    }

    /// No spawned thread is left
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// State of a live thread
    pub fn state(&self, id: ThreadId) -> Option<ThreadState> {
        let core = self.core();
        core.position(id).map(|pos| core.threads[pos].state)
    }

    /// Thread this runtime considers current (the driver outside `run`)
    pub fn current_thread(&self) -> ThreadId {
        self.core().current
    }

    /// Context switches performed so far
    pub fn context_switches(&self) -> u64 {
        self.core().switches
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.core().config
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let core = unsafe { Box::from_raw(self.core.as_ptr()) };
        if core.live() > 0 && core.config.debug_logging {
            kdebug!("dropping runtime with {} unfinished thread(s)", core.live());
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core();
        f.debug_struct("Runtime")
            .field("threads", &core.threads)
            .field("current", &core.current)
            .field("running", &core.running)
            .finish()
    }
}

// ============================================================================
// Free functions (active runtime)
// ============================================================================

/// Spawn a thread on the runtime driving this OS thread
///
/// Returns `Err(NotInitialized)` outside `Runtime::run`.
pub fn spawn<F>(f: F) -> SchedResult<ThreadId>
where
    F: FnOnce() + 'static,
{
    with_core(|core| core.spawn(Box::new(f))).unwrap_or(Err(SchedError::NotInitialized))
}

/// Hand control to the next `Ready` thread
///
/// Returns `false` without switching when nothing else is ready or no
/// runtime is active.
pub fn yield_thread() -> bool {
    match tls::current_core() {
        Some(core) => unsafe { switch_away(core, false) },
        None => false,
    }
}

/// Yield to other green threads; outside a runtime, yield the OS thread
pub fn yield_now() {
    if !tls::in_runtime() {
        std::thread::yield_now();
        return;
    }
    yield_thread();
}

/// Id of the running green thread, `ThreadId::NONE` outside a runtime
pub fn current_id() -> ThreadId {
    with_core(|core| core.current).unwrap_or(ThreadId::NONE)
}

/// Same as [`current_id`]
#[inline]
pub fn current_thread() -> ThreadId {
    current_id()
}

/// Put `id` into a channel-blocked state; it is skipped until `mark_ready`
pub(crate) fn mark_blocked(id: ThreadId, state: ThreadState) -> SchedResult<()> {
    debug_assert!(state.is_blocked(), "{} is not a blocked state", state);
    with_core(|core| core.set_state(id, state)).unwrap_or(Err(SchedError::NotInitialized))
}

/// Make `id` selectable by the round robin again
pub(crate) fn mark_ready(id: ThreadId) -> SchedResult<()> {
    with_core(|core| core.set_state(id, ThreadState::Ready)).unwrap_or(Err(SchedError::NotInitialized))
}

/// Wait queue capacity configured on the active runtime
pub(crate) fn active_max_waiters() -> Option<usize> {
    with_core(|core| core.config.max_waiters)
}

/// [`SchedulerOps`] bound to whatever runtime is active on this OS thread
pub(crate) struct CurrentScheduler;

impl SchedulerOps for CurrentScheduler {
    fn current_thread(&self) -> ThreadId {
        current_id()
    }

    fn mark_blocked(&self, id: ThreadId, state: ThreadState) {
        if let Err(e) = mark_blocked(id, state) {
            kwarn!("mark_blocked: {}", e);
        }
    }

    fn mark_ready(&self, id: ThreadId) {
        if let Err(e) = mark_ready(id) {
            kwarn!("mark_ready: {}", e);
        }
    }

    fn mark_running(&self, id: ThreadId) {
        if let Some(Err(e)) = with_core(|core| core.set_state(id, ThreadState::Running)) {
            kwarn!("mark_running: {}", e);
        }
    }

    fn yield_thread(&self) -> bool {
        yield_thread()
    }

    fn deliver(&self, id: ThreadId, value: Box<dyn Any>) {
        with_core(|core| match core.thread_mut(id) {
            Some(thread) => thread.chan_val = Some(value),
            None => kwarn!("delivery to unknown thread {} dropped", id),
        });
    }

    fn take_delivery(&self, id: ThreadId) -> Option<Box<dyn Any>> {
        with_core(|core| core.thread_mut(id).and_then(|t| t.chan_val.take())).flatten()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::new().stack_size(64 * 1024)).unwrap()
    }

    #[test]
    fn test_round_robin_order() {
        let mut rt = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..3 {
            let log = Rc::clone(&log);
            rt.spawn(move || {
                for _ in 0..3 {
                    log.borrow_mut().push(current_id().as_u64());
                    yield_now();
                }
            })
            .unwrap();
        }

        rt.run().unwrap();
        assert_eq!(*log.borrow(), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
        assert!(rt.is_empty());
    }

    #[test]
    fn test_every_thread_makes_progress() {
        let mut rt = runtime();
        let counters: Rc<Vec<Cell<u32>>> = Rc::new((0..5).map(|_| Cell::new(0)).collect());

        for i in 0..5 {
            let counters = Rc::clone(&counters);
            rt.spawn(move || {
                for _ in 0..(i + 1) * 10 {
                    counters[i].set(counters[i].get() + 1);
                    yield_now();
                }
            })
            .unwrap();
        }

        rt.run().unwrap();
        let totals: Vec<u32> = counters.iter().map(Cell::get).collect();
        assert_eq!(totals, vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_terminated_thread_is_removed() {
        let mut rt = runtime();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);

        let id = rt.spawn(move || flag.set(true)).unwrap();
        assert_eq!(id, ThreadId::new(1));
        assert_eq!(rt.state(id), Some(ThreadState::Ready));
        assert_eq!(rt.len(), 1);

        rt.run().unwrap();
        assert!(ran.get());
        assert_eq!(rt.state(id), None);
        assert!(rt.is_empty());

        // Ids are not reused
        let next = rt.spawn(|| {}).unwrap();
        assert_eq!(next, ThreadId::new(2));
        rt.run().unwrap();
    }

    #[test]
    fn test_spawn_from_inside_thread() {
        let mut rt = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer = Rc::clone(&log);

        rt.spawn(move || {
            let inner = Rc::clone(&outer);
            let child = spawn(move || inner.borrow_mut().push("child")).unwrap();
            assert_eq!(child, ThreadId::new(2));
            outer.borrow_mut().push("parent");
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(*log.borrow(), vec!["parent", "child"]);
    }

    #[test]
    fn test_current_id() {
        assert_eq!(current_id(), ThreadId::NONE);

        let mut rt = runtime();
        let seen = Rc::new(Cell::new(ThreadId::NONE));
        let out = Rc::clone(&seen);
        let id = rt.spawn(move || out.set(current_id())).unwrap();

        rt.run().unwrap();
        assert_eq!(seen.get(), id);
        assert_eq!(rt.current_thread(), ThreadId::MAIN);
        assert_eq!(current_id(), ThreadId::NONE);
    }

    #[test]
    fn test_outside_runtime() {
        assert_eq!(spawn(|| {}), Err(SchedError::NotInitialized));
        assert!(!yield_thread());
        assert_eq!(active_max_waiters(), None);
        assert_eq!(mark_ready(ThreadId::new(1)), Err(SchedError::NotInitialized));
        yield_now();
    }

    #[test]
    fn test_deadlock_reported() {
        let mut rt = runtime();
        let id = rt
            .spawn(|| {
                let me = current_id();
                mark_blocked(me, ThreadState::ChannelBlockRecv).unwrap();
                yield_thread();
                unreachable!("nobody wakes this thread");
            })
            .unwrap();

        assert_eq!(rt.run(), Err(SchedError::Deadlock { blocked: 1 }));
        assert_eq!(rt.state(id), Some(ThreadState::ChannelBlockRecv));
        assert_eq!(rt.len(), 1);
    }

    #[test]
    fn test_mark_ready_wakes_blocked_thread() {
        let mut rt = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));

        let sleeper_log = Rc::clone(&log);
        let sleeper = rt
            .spawn(move || {
                mark_blocked(current_id(), ThreadState::ChannelBlockSend).unwrap();
                sleeper_log.borrow_mut().push("blocked");
                yield_thread();
                sleeper_log.borrow_mut().push("woken");
            })
            .unwrap();

        let waker_log = Rc::clone(&log);
        rt.spawn(move || {
            yield_now();
            waker_log.borrow_mut().push("waking");
            mark_ready(sleeper).unwrap();
        })
        .unwrap();

        rt.run().unwrap();
        assert_eq!(*log.borrow(), vec!["blocked", "waking", "woken"]);
    }

    #[test]
    fn test_mark_unknown_thread() {
        let mut rt = runtime();
        let err = rt.block_on(|| mark_ready(ThreadId::new(99))).unwrap();
        assert_eq!(err, Err(SchedError::ThreadNotFound(ThreadId::new(99))));
    }

    #[test]
    fn test_panicking_thread_terminates() {
        let mut rt = runtime();
        let sibling_done = Rc::new(Cell::new(false));
        let done = Rc::clone(&sibling_done);

        rt.spawn(move || {
            yield_now();
            done.set(true);
        })
        .unwrap();

        let result: SchedResult<()> = rt.block_on(|| panic!("thread failure"));
        assert_eq!(result, Err(SchedError::InvalidState));
        assert!(sibling_done.get());
        assert!(rt.is_empty());

        // The runtime is still usable afterwards
        assert_eq!(rt.block_on(|| 7), Ok(7));
    }

    #[test]
    fn test_block_on_returns_value() {
        let mut rt = runtime();
        let value = rt
            .block_on(|| {
                let partial = Rc::new(Cell::new(20));
                let p = Rc::clone(&partial);
                spawn(move || p.set(p.get() + 1)).unwrap();
                yield_now();
                partial.get() * 2
            })
            .unwrap();
        assert_eq!(value, 42);
        assert!(rt.context_switches() > 0);
    }

    #[test]
    fn test_many_threads_release_stacks() {
        let mut rt = runtime();
        let done = Rc::new(Cell::new(0));
        for _ in 0..200 {
            let done = Rc::clone(&done);
            rt.spawn(move || {
                yield_now();
                done.set(done.get() + 1);
            })
            .unwrap();
        }
        rt.run().unwrap();
        assert_eq!(done.get(), 200);
        assert!(rt.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Runtime::new(RuntimeConfig::new().stack_size(1024)).unwrap_err();
        assert!(matches!(err, SchedError::InvalidConfig(_)));

        let err = Runtime::new(RuntimeConfig::new().stack_size(usize::MAX - 10)).unwrap_err();
        assert!(matches!(err, SchedError::InvalidConfig(_)));
    }

    #[test]
    fn test_run_with_no_threads() {
        let mut rt = runtime();
        rt.run().unwrap();
        assert_eq!(rt.context_switches(), 0);
    }
}
