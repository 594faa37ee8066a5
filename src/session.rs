//! Single-writer session over a [`MutationEngine`]: a caller
//! acquires a handle, performs mutations, and must explicitly commit or
//! roll back before the session ends.

use crate::engine::MutationEngine;
use crate::error::GraphResult;
use crate::store::ChangeListener;

/// Whether a session is still open for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Closed,
}

/// Owns one [`MutationEngine`] for the lifetime of a unit of work. Only
/// one session may hold a given engine at a time; the type enforces this
/// by taking ownership rather than borrowing, mirroring the single-writer
/// scheduling model nothing else in this core relies on.
pub struct GraphSession {
    engine: MutationEngine,
    state: SessionState,
}

impl GraphSession {
    pub fn new() -> Self {
        GraphSession {
            engine: MutationEngine::new(),
            state: SessionState::Open,
        }
    }

    pub fn with_listener(listener: Box<dyn ChangeListener>) -> Self {
        GraphSession {
            engine: MutationEngine::with_listener(listener),
            state: SessionState::Open,
        }
    }

    /// Borrow the mutation engine. Panics if the session has already been
    /// committed, rolled back, or closed — callers must not retain a
    /// handle across those boundaries.
    pub fn handle(&mut self) -> &mut MutationEngine {
        assert_eq!(self.state, SessionState::Open, "session is no longer open");
        &mut self.engine
    }

    /// Flush the attached listener's queued events and close the session.
    /// After this call, `handle()` panics on further use.
    pub fn commit(&mut self) -> GraphResult<()> {
        assert_eq!(self.state, SessionState::Open, "session is no longer open");
        self.engine.flush_listener();
        self.state = SessionState::Closed;
        Ok(())
    }

    /// Discard the session without flushing pending listener events. The
    /// in-memory store itself is not reverted — every mutation method on
    /// [`MutationEngine`] validates fully before writing, so a session
    /// that only calls infallible operations has nothing to roll back;
    /// callers that need true rollback should discard the whole session
    /// and its store rather than reuse it.
    pub fn rollback(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

impl Default for GraphSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GraphSession {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Closed;
        }
    }
}
