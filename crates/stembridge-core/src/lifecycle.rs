//! Lifecycle state machine shared by the audio thread and setup threads.
//!
//! ```text
//!              begin_exclusive            publish(true)
//! Unprepared ----------------> Preparing --------------> Ready
//!      ^                          |   ^                   |  ^
//!      |       publish(false)     |   |  begin_exclusive  |  | end_render
//!      +--------------------------+   +-------------------+  |
//!                                                  try_begin_render
//!                                                          v  |
//!                                                        Rendering
//! ```
//!
//! The audio thread only ever performs one compare-and-swap
//! (`Ready -> Rendering`) and one store (`Rendering -> Ready`). It never
//! waits: if the swap fails, the bridge is not ready for this block.
//!
//! Setup threads take the `Preparing` phase to get exclusive access to the
//! engine. They wait, yielding, while a block is being rendered.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Not prepared. Blocks are passed through.
    Unprepared = 0,
    /// A setup thread owns the engine.
    Preparing = 1,
    /// Prepared and idle.
    Ready = 2,
    /// The audio thread owns the engine.
    Rendering = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Preparing,
            2 => Phase::Ready,
            3 => Phase::Rendering,
            _ => Phase::Unprepared,
        }
    }
}

/// Atomic holder of the current [`Phase`].
#[derive(Debug)]
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(Phase::Unprepared as u8))
    }

    /// Current phase.
    #[inline]
    pub fn load(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Try to take the engine for one block. Never waits.
    #[inline]
    pub fn try_begin_render(&self) -> bool {
        self.0
            .compare_exchange(
                Phase::Ready as u8,
                Phase::Rendering as u8,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Hand the engine back after a block.
    #[inline]
    pub fn end_render(&self) {
        debug_assert_eq!(self.load(), Phase::Rendering);
        self.0.store(Phase::Ready as u8, Ordering::Release);
    }

    /// Take the engine for setup work, waiting out any block in flight.
    ///
    /// Returns whether the engine was prepared before. Callers must be
    /// serialized among themselves; the wait only covers the audio thread.
    pub fn begin_exclusive(&self) -> bool {
        loop {
            let current = self.0.load(Ordering::Acquire);
            match Phase::from_u8(current) {
                Phase::Rendering | Phase::Preparing => std::thread::yield_now(),
                phase @ (Phase::Unprepared | Phase::Ready) => {
                    if self
                        .0
                        .compare_exchange_weak(
                            current,
                            Phase::Preparing as u8,
                            Ordering::Acquire,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        return phase == Phase::Ready;
                    }
                }
            }
        }
    }

    /// Finish setup work, publishing whether the engine is ready.
    pub fn publish(&self, ready: bool) {
        debug_assert_eq!(self.load(), Phase::Preparing);
        let phase = if ready { Phase::Ready } else { Phase::Unprepared };
        self.0.store(phase as u8, Ordering::Release);
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    /// Take the engine for one block, released when the guard drops.
    #[inline]
    pub fn try_render(&self) -> Option<RenderGuard<'_>> {
        if self.try_begin_render() {
            Some(RenderGuard(self))
        } else {
            None
        }
    }

    /// Take the engine for setup work, released when the guard drops.
    ///
    /// The guard publishes `Unprepared` unless told otherwise with
    /// [`ExclusiveGuard::set_ready`], so a panicking setup leaves the bridge
    /// passing audio through rather than rendering a half-built engine.
    pub fn exclusive(&self) -> ExclusiveGuard<'_> {
        let was_ready = self.begin_exclusive();
        ExclusiveGuard {
            cell: self,
            was_ready,
            ready: false,
        }
    }
}

/// Audio-thread ownership of the engine for one block.
pub struct RenderGuard<'a>(&'a PhaseCell);

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.0.end_render();
    }
}

/// Setup-thread ownership of the engine.
pub struct ExclusiveGuard<'a> {
    cell: &'a PhaseCell,
    was_ready: bool,
    ready: bool,
}

impl ExclusiveGuard<'_> {
    /// Whether the engine was ready when the guard was taken.
    pub fn was_ready(&self) -> bool {
        self.was_ready
    }

    /// Phase to publish on drop: `Ready` if true, `Unprepared` otherwise.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.cell.publish(self.ready);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_transitions() {
        let phase = PhaseCell::new();
        assert_eq!(phase.load(), Phase::Unprepared);
        assert!(!phase.try_begin_render());

        assert!(!phase.begin_exclusive());
        assert_eq!(phase.load(), Phase::Preparing);
        assert!(!phase.try_begin_render());
        phase.publish(true);

        assert!(phase.try_begin_render());
        assert_eq!(phase.load(), Phase::Rendering);
        assert!(!phase.try_begin_render());
        phase.end_render();

        assert!(phase.begin_exclusive());
        phase.publish(false);
        assert_eq!(phase.load(), Phase::Unprepared);
    }

    #[test]
    fn test_exclusive_waits_for_render() {
        let phase = Arc::new(PhaseCell::new());
        phase.begin_exclusive();
        phase.publish(true);
        assert!(phase.try_begin_render());

        let waiter = {
            let phase = Arc::clone(&phase);
            std::thread::spawn(move || phase.begin_exclusive())
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(phase.load(), Phase::Rendering);
        phase.end_render();

        assert!(waiter.join().unwrap());
        assert_eq!(phase.load(), Phase::Preparing);
    }

    #[test]
    fn test_guards() {
        let phase = PhaseCell::new();
        assert!(phase.try_render().is_none());

        {
            let mut guard = phase.exclusive();
            assert!(!guard.was_ready());
            guard.set_ready(true);
        }
        assert_eq!(phase.load(), Phase::Ready);

        {
            let _render = phase.try_render().unwrap();
            assert_eq!(phase.load(), Phase::Rendering);
        }
        assert_eq!(phase.load(), Phase::Ready);

        // dropped without set_ready
        {
            let guard = phase.exclusive();
            assert!(guard.was_ready());
        }
        assert_eq!(phase.load(), Phase::Unprepared);
    }

    #[test]
    fn test_refused_render_leaves_phase() {
        let phase = PhaseCell::new();
        for _ in 0..3 {
            assert!(phase.try_render().is_none());
            assert_eq!(phase.load(), Phase::Unprepared);
        }

        let _setup = phase.exclusive();
        assert!(phase.try_render().is_none());
        assert_eq!(phase.load(), Phase::Preparing);
    }
}
