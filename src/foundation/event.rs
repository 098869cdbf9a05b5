//! Typed publish/subscribe for component change notifications.
//!
//! Every component owns one [`Emitter`] over its own closed event enum. Subscribing returns a
//! [`Subscription`] guard; dropping the guard unsubscribes.
//!
//! Callbacks run synchronously inside `emit`. Emitting again from inside a callback is allowed:
//! the nested emission reaches every other subscriber, but a callback is never re-entered while it
//! is still running.

use crate::foundation::error::{CliplaneError, CliplaneResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<E> = Arc<Mutex<Box<dyn FnMut(&E) + Send>>>;

/// Closed set of named events for one component.
///
/// Names are the wire identifiers used by external collaborators (e.g. `"CHANGE_OUTPUTX"`).
pub trait EventName: Sized + Copy + PartialEq + 'static {
    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    /// Stable external name of this event.
    fn name(self) -> &'static str;

    /// Resolve an external name against the closed set.
    fn parse_name(name: &str) -> CliplaneResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name() == name)
            .ok_or_else(|| {
                CliplaneError::unknown_event(format!(
                    "'{name}' is not one of [{}]",
                    Self::ALL
                        .iter()
                        .map(|e| e.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

struct Registry<E> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<E>)>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-component event emitter.
pub struct Emitter<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &lock(&self.registry).callbacks.len())
            .finish()
    }
}

impl<E: 'static> Emitter<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Register `callback` for every event. The returned guard unsubscribes on drop.
    #[must_use = "dropping the Subscription immediately unsubscribes"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = {
            let mut reg = lock(&self.registry);
            let id = reg.next_id;
            reg.next_id += 1;
            reg.callbacks.push((id, Arc::new(Mutex::new(Box::new(callback)))));
            id
        };

        let weak: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(reg) = weak.upgrade() {
                    lock(&reg).callbacks.retain(|(cb_id, _)| *cb_id != id);
                }
            })),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }

    /// Deliver `event` to every subscriber registered at the time of the call.
    pub fn emit(&self, event: E) {
        let snapshot: Vec<Callback<E>> = lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for cb in snapshot {
            // A callback that is already on the stack is skipped instead of deadlocking.
            if let Ok(mut f) = cb.try_lock() {
                (*f)(&event);
            }
        }
    }
}

impl<E: EventName + Send> Emitter<E> {
    /// Subscribe to a single event by its external name.
    pub fn subscribe_named<F>(&self, name: &str, mut callback: F) -> CliplaneResult<Subscription>
    where
        F: FnMut() + Send + 'static,
    {
        let wanted = E::parse_name(name)?;
        Ok(self.subscribe(move |e: &E| {
            if *e == wanted {
                callback();
            }
        }))
    }
}

/// Scoped subscription handle. Dropping it removes the callback.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Keep the callback registered for the lifetime of the emitter.
    pub fn forget(mut self) {
        self.detach = None;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/event.rs"]
mod tests;
