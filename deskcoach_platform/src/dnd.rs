//! `DndQuery` implementations.
use std::sync::atomic::{AtomicBool, Ordering};

use deskcoach_traits::DndQuery;

/// Always reports DND inactive. Used when no OS-level DND integration is
/// available for the current platform.
#[derive(Debug, Default)]
pub struct NullDnd;

impl DndQuery for NullDnd {
    fn is_dnd_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(false)
    }
}

/// Atomic-flag DND source for tests and demos: flip it externally and the
/// next query observes it.
#[derive(Debug, Default)]
pub struct ManualDnd {
    active: AtomicBool,
}

impl ManualDnd {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
        }
    }

    pub fn set(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl DndQuery for ManualDnd {
    fn is_dnd_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.active.load(Ordering::SeqCst))
    }
}
