//! Per-worker-thread binding of "which session is this worker acting for"
//! (§4.4). Tool callbacks consult this to resolve the caller's session
//! without it being threaded through every function signature.
//!
//! The entire "set → act → clear" region for one turn must run on a single
//! OS thread — this is why the core avoids task-migrating async runtimes.

use std::cell::RefCell;

use crate::record::SessionHandle;

thread_local! {
    static CURRENT: RefCell<Option<SessionHandle>> = const { RefCell::new(None) };
}

/// Binds `session` to the calling thread for the lifetime of the returned
/// guard. The guard clears the binding on drop — including on early return
/// or panic-unwind — so no exit path can leak a stale context.
#[must_use]
pub struct CommandContextGuard {
    _private: (),
}

impl Drop for CommandContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|c| *c.borrow_mut() = None);
    }
}

/// Enters the command-context scope for `session`. Caller must already hold
/// a strong reference to `session` (the registry `get`/`create` path
/// guarantees this).
pub fn enter(session: SessionHandle) -> CommandContextGuard {
    CURRENT.with(|c| *c.borrow_mut() = Some(session));
    CommandContextGuard { _private: () }
}

/// The session bound to the calling thread's current command-context
/// scope, if any.
pub fn current() -> Option<SessionHandle> {
    CURRENT.with(|c| c.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::SessionKind;
    use crate::record::SessionRecord;
    use chrono::Utc;
    use std::sync::Arc;

    #[test]
    fn context_is_cleared_on_guard_drop() {
        assert!(current().is_none());
        let session: SessionHandle = Arc::new(SessionRecord::new(1, SessionKind::Web, None, Utc::now()));
        {
            let _guard = enter(session.clone());
            assert_eq!(current().unwrap().session_id, 1);
        }
        assert!(current().is_none());
    }

    #[test]
    fn context_clears_even_on_early_return() {
        fn scoped(session: SessionHandle) -> bool {
            let _guard = enter(session);
            if true {
                return true;
            }
            false
        }
        let session: SessionHandle = Arc::new(SessionRecord::new(2, SessionKind::Web, None, Utc::now()));
        assert!(scoped(session));
        assert!(current().is_none());
    }
}
