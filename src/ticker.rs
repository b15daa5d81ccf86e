use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::trace;

#[derive(Default)]
struct Registry {
    next_id: u64,
    live: BTreeMap<u64, usize>,
}

/// Per-frame callback registry. Each registration samples one slide and stays
/// live until its [`TickRegistration`] is dropped.
#[derive(Clone, Default)]
pub struct Ticker {
    registry: Rc<RefCell<Registry>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, slide: usize) -> TickRegistration {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.live.insert(id, slide);
        trace!(id, slide, "tick registered");

        TickRegistration {
            id,
            slide,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Slides with a live registration, oldest first.
    pub fn scheduled(&self) -> Vec<usize> {
        self.registry.borrow().live.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().live.len()
    }
}

/// Handle of a live ticker registration; deregisters on drop.
pub struct TickRegistration {
    id: u64,
    slide: usize,
    registry: Weak<RefCell<Registry>>,
}

impl TickRegistration {
    pub fn slide(&self) -> usize {
        self.slide
    }
}

impl Drop for TickRegistration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().live.remove(&self.id);
            trace!(id = self.id, slide = self.slide, "tick released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_scoped() {
        let ticker = Ticker::new();
        {
            let first = ticker.register(0);
            let _second = ticker.register(2);
            assert_eq!(ticker.scheduled(), vec![0, 2]);
            drop(first);
            assert_eq!(ticker.scheduled(), vec![2]);
        }
        assert_eq!(ticker.len(), 0);
    }

    #[test]
    fn handle_outliving_ticker_is_harmless() {
        let registration = {
            let ticker = Ticker::new();
            ticker.register(1)
        };
        assert_eq!(registration.slide(), 1);
        drop(registration);
    }
}
