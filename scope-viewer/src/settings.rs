use std::cell::RefCell;
use std::rc::Rc;

use crate::resolver::Normalization;

/// Feature normalisation and sprite appearance shared by the resolver and the
/// renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub log_transform: bool,
    pub cpm_normalize: bool,
    pub sprite_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_transform: true,
            cpm_normalize: true,
            sprite_scale: 2.5,
        }
    }
}

impl Settings {
    pub fn normalization(&self) -> Normalization {
        Normalization {
            log_transform: self.log_transform,
            cpm_normalize: self.cpm_normalize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&Settings)>;

#[derive(Default)]
struct Shared {
    settings: Settings,
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
}

/// Cloneable handle to one settings value with change notification.
#[derive(Clone, Default)]
pub struct SettingsHandle {
    inner: Rc<RefCell<Shared>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Shared {
                settings,
                ..Default::default()
            })),
        }
    }

    pub fn get(&self) -> Settings {
        self.inner.borrow().settings
    }

    pub fn subscribe(&self, observer: impl FnMut(&Settings) + 'static) -> SubscriptionId {
        let mut shared = self.inner.borrow_mut();
        let id = SubscriptionId(shared.next_id);
        shared.next_id += 1;
        shared.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut shared = self.inner.borrow_mut();
        let before = shared.observers.len();
        shared.observers.retain(|(oid, _)| *oid != id);
        shared.observers.len() != before
    }

    /// Applies `change` and notifies observers if the value differs.
    /// Returns whether anything changed.
    pub fn update(&self, change: impl FnOnce(&mut Settings)) -> bool {
        let snapshot = {
            let mut shared = self.inner.borrow_mut();
            let before = shared.settings;
            change(&mut shared.settings);
            if shared.settings == before {
                return false;
            }
            shared.settings
        };

        // observers may read or subscribe while being notified
        let mut observers = std::mem::take(&mut self.inner.borrow_mut().observers);
        for (_, observer) in observers.iter_mut() {
            observer(&snapshot);
        }
        let mut shared = self.inner.borrow_mut();
        observers.append(&mut shared.observers);
        shared.observers = observers;
        true
    }
}
