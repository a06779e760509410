//! Process-wide runtime shared by every plugin instance.
//!
//! Some host-side resources (message loop integration, GUI toolkit state)
//! exist once per process. [`SharedRuntime`] counts live instances and runs
//! an init hook when the first one appears and a teardown hook when the
//! last one goes away. Each instance holds a [`RuntimeLease`].

use parking_lot::Mutex;

type Hook = Box<dyn Fn() + Send>;

struct RuntimeState {
    instances: usize,
    init: Option<Hook>,
    teardown: Option<Hook>,
}

/// Instance reference count with init/teardown hooks.
pub struct SharedRuntime {
    state: Mutex<RuntimeState>,
}

static GLOBAL: SharedRuntime = SharedRuntime::new();

impl SharedRuntime {
    pub const fn new() -> Self {
        Self {
            state: parking_lot::const_mutex(RuntimeState {
                instances: 0,
                init: None,
                teardown: None,
            }),
        }
    }

    /// The process-wide runtime used by [`HostAdapter`](crate::HostAdapter).
    pub fn global() -> &'static SharedRuntime {
        &GLOBAL
    }

    /// Install the hooks run on the first acquire and the last release.
    ///
    /// Refused (returns `false`) while any instance is alive, so a hook
    /// never sees an unbalanced count.
    pub fn install_hooks(
        &self,
        init: impl Fn() + Send + 'static,
        teardown: impl Fn() + Send + 'static,
    ) -> bool {
        let mut state = self.state.lock();
        if state.instances != 0 {
            log::warn!(
                "runtime hooks not installed: {} instances alive",
                state.instances
            );
            return false;
        }
        state.init = Some(Box::new(init));
        state.teardown = Some(Box::new(teardown));
        true
    }

    /// Register a live instance. Runs the init hook on the first one.
    pub fn acquire(&self) -> RuntimeLease<'_> {
        let mut state = self.state.lock();
        state.instances += 1;
        if state.instances == 1 {
            log::debug!("shared runtime starting");
            if let Some(init) = &state.init {
                init();
            }
        }
        RuntimeLease { runtime: self }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.instances > 0, "runtime released more often than acquired");
        state.instances = state.instances.saturating_sub(1);
        if state.instances == 0 {
            log::debug!("shared runtime shutting down");
            if let Some(teardown) = &state.teardown {
                teardown();
            }
        }
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.state.lock().instances
    }
}

impl Default for SharedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the runtime alive for one instance. Released on drop.
#[must_use = "the runtime is released when the lease is dropped"]
pub struct RuntimeLease<'a> {
    runtime: &'a SharedRuntime,
}

impl Drop for RuntimeLease<'_> {
    fn drop(&mut self) {
        self.runtime.release();
    }
}
