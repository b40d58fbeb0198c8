///
/// Session release hook.
///
/// The owning session hands a release action to the row iterator instead of
/// a reference to itself. The iterator runs it once, after cursor and
/// statement teardown, and then forgets it. Sessions that must not be kept
/// alive by the hook capture a `Weak` reference inside the closure.
///

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{CloseFault, CloseStep};

type ReleaseFn = Box<dyn FnOnce() + Send>;

pub struct SessionHook {
    release: Option<ReleaseFn>,
}

impl SessionHook {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Hook for iterators whose session needs no release step.
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Runs the release action if it has not run yet. A panic inside the
    /// action is caught and reported as a session close fault.
    pub(crate) fn release(&mut self) -> Result<(), CloseFault> {
        let Some(release) = self.release.take() else {
            return Ok(());
        };
        panic::catch_unwind(AssertUnwindSafe(release))
            .map_err(|payload| CloseFault::new(CloseStep::Session, panic_message(payload.as_ref())))
    }
}

impl fmt::Debug for SessionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHook")
            .field("released", &self.is_released())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "session release panicked".to_string()
    }
}
