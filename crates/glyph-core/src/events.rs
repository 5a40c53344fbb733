//! Listener registration and explicit-ownership cleanup handles.
//!
//! Every registration returns a [`Subscription`] that unregisters exactly
//! once, either through [`Subscription::release`] or on drop. Related
//! subscriptions can be batched into a [`DisposeBag`]. One-shot listeners
//! registered with [`Emitter::once`] are removed before their callback runs,
//! so a reentrant emit cannot fire them twice.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listener<T> {
    id: u64,
    once: bool,
    callback: Callback<T>,
}

struct EmitterInner<T> {
    next_id: u64,
    listeners: Vec<Listener<T>>,
}

/// A thread-safe list of listeners for one kind of event.
pub struct Emitter<T> {
    inner: Arc<Mutex<EmitterInner<T>>>,
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<T> Emitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmitterInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Invokes current listeners with `value`.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe,
    /// release, or emit again without deadlocking.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = {
            let mut inner = lock_inner(&self.inner);
            let callbacks = inner
                .listeners
                .iter()
                .map(|l| Arc::clone(&l.callback))
                .collect();
            inner.listeners.retain(|l| !l.once);
            callbacks
        };
        for callback in callbacks {
            callback(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock_inner(&self.inner).listeners.len()
    }
}

impl<T: 'static> Emitter<T> {
    /// Registers a listener invoked on every emit until released.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.register(callback, false)
    }

    /// Registers a listener that fires at most once and is then removed.
    pub fn once(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.register(callback, true)
    }

    fn register(&self, callback: impl Fn(&T) + Send + Sync + 'static, once: bool) -> Subscription {
        let id = {
            let mut inner = lock_inner(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push(Listener {
                id,
                once,
                callback: Arc::new(callback),
            });
            id
        };

        let weak: Weak<Mutex<EmitterInner<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock_inner(&inner).listeners.retain(|l| l.id != id);
            }
        })
    }
}

#[track_caller]
fn lock_inner<T>(inner: &Mutex<EmitterInner<T>>) -> MutexGuard<'_, EmitterInner<T>> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(err) => {
            let loc = std::panic::Location::caller();
            tracing::error!(
                target = "glyph.core",
                file = loc.file(),
                line = loc.line(),
                "emitter mutex poisoned; continuing with recovered guard"
            );
            err.into_inner()
        }
    }
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle for one listener registration.
///
/// Releasing (explicitly or on drop) unregisters exactly once. A released or
/// empty subscription is inert.
pub struct Subscription {
    release: Mutex<Option<ReleaseFn>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self
            .release
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("Subscription").field("active", &active).finish()
    }
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A handle that does nothing when released.
    ///
    /// Returned from public entry points for invalid input, so callers'
    /// cleanup paths stay uniform.
    pub fn empty() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    /// Unregisters the listener. Subsequent calls are no-ops.
    pub fn release(&self) {
        let release = match self.release.lock() {
            Ok(mut guard) => guard.take(),
            Err(err) => err.into_inner().take(),
        };
        if let Some(release) = release {
            release();
        }
    }

    /// Consumes the handle while leaving the listener registered.
    ///
    /// Used for fire-and-forget continuations that must outlive their
    /// creator; a detached one-shot listener is removed by the emitter after
    /// it fires.
    pub fn detach(self) {
        match self.release.lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(err) => drop(err.into_inner().take()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Batches related subscriptions so they can be released together.
#[derive(Debug, Default)]
pub struct DisposeBag {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl DisposeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, subscription: Subscription) {
        match self.subscriptions.lock() {
            Ok(mut guard) => guard.push(subscription),
            Err(err) => err.into_inner().push(subscription),
        }
    }

    /// Releases everything collected so far.
    pub fn dispose(&self) {
        let drained: Vec<Subscription> = match self.subscriptions.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(err) => err.into_inner().drain(..).collect(),
        };
        for subscription in drained {
            subscription.release();
        }
    }

    pub fn len(&self) -> usize {
        match self.subscriptions.lock() {
            Ok(guard) => guard.len(),
            Err(err) => err.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for DisposeBag {
    fn drop(&mut self) {
        self.dispose();
    }
}
