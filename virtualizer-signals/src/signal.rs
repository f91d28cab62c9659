use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use reaktiv::{Computed, untracked};

type Equals<T> = fn(&T, &T) -> bool;

struct Shared<T> {
    value: RwLock<T>,
    changed: reaktiv::Signal,
    equals: Option<Equals<T>>,
}

/// A writable reactive cell.
///
/// `reaktiv` signals only mark changes; a `Signal` pairs that marker with the value it guards.
/// Reads through [`Signal::get`] and [`Signal::with`] subscribe the running effect or computed
/// value. Writes notify only when the equality function reports a change.
///
/// Clones share the same cell.
pub struct Signal<T> {
    shared: Arc<Shared<T>>,
}

impl<T: PartialEq + Send + Sync + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self::with_equals(value, Some(<T as PartialEq>::eq))
    }
}

impl<T: Send + Sync + 'static> Signal<T> {
    /// Creates a signal whose writes always notify, even when the new value equals the old one.
    pub fn never_equal(value: T) -> Self {
        Self::with_equals(value, None)
    }

    fn with_equals(value: T, equals: Option<Equals<T>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                value: RwLock::new(value),
                changed: reaktiv::Signal::new(),
                equals,
            }),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.shared.value.read().clone()
    }

    /// Runs `f` on the current value.
    ///
    /// The value stays read-locked while `f` runs, so `f` must not write to this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.shared.changed.track_dependency();
        f(&*self.shared.value.read())
    }

    /// Stores `value`. Returns whether dependents were notified.
    pub fn set(&self, value: T) -> bool {
        let previous = {
            let mut current = self.shared.value.write();
            if self.shared.equals.is_some_and(|equals| equals(&*current, &value)) {
                return false;
            }
            std::mem::replace(&mut *current, value)
        };
        drop(previous);
        self.shared.changed.emit();
        true
    }

    /// Mutates the value in place and notifies unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.shared.value.write());
        self.shared.changed.emit();
    }

    pub fn read_only(&self) -> ReadSignal<T>
    where
        T: Clone,
    {
        ReadSignal {
            source: Arc::clone(&self.shared) as Arc<dyn Source<T>>,
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T> Eq for Signal<T> {}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal")
            .field(&*self.shared.value.read())
            .finish()
    }
}

trait Source<T>: Send + Sync {
    fn get(&self) -> T;
}

impl<T: Clone + Send + Sync> Source<T> for Shared<T> {
    fn get(&self) -> T {
        self.changed.track_dependency();
        self.value.read().clone()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Source<T> for Computed<T> {
    fn get(&self) -> T {
        Computed::get(self)
    }
}

// Compares unequal to everything, so the wrapped computed notifies on every re-derivation.
#[derive(Clone)]
struct Fresh<T>(T);

impl<T> PartialEq for Fresh<T> {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}

struct Always<T>(Arc<Computed<Fresh<T>>>);

impl<T: Clone + Send + Sync + 'static> Source<T> for Always<T> {
    fn get(&self) -> T {
        self.0.get().0
    }
}

/// A read-only reactive value: a view of a [`Signal`] or a memoized derivation.
///
/// Derivations stay subscribed to their sources while any clone of the handle is alive and are
/// released with the last one. Equality is identity.
pub struct ReadSignal<T> {
    source: Arc<dyn Source<T>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ReadSignal<T> {
    /// A derivation computed now and re-derived whenever a tracked source changes.
    ///
    /// Dependents are notified only when the derived value changed.
    pub fn computed(f: impl FnMut() -> T + Send + 'static) -> Self {
        let cell = untracked(|| Computed::new(f));
        Self {
            source: cell as Arc<dyn Source<T>>,
        }
    }

    /// Like [`ReadSignal::computed`], but nothing runs until the first read.
    pub fn lazy(f: impl FnMut() -> T + Send + 'static) -> Self {
        let cell = untracked(|| Computed::lazy(f));
        Self {
            source: cell as Arc<dyn Source<T>>,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ReadSignal<T> {
    /// A derivation that notifies dependents on every re-derivation, whether or not the value
    /// changed. For values without a meaningful equality, such as records holding callbacks.
    pub fn always(mut f: impl FnMut() -> T + Send + 'static) -> Self {
        let cell = untracked(|| Computed::new(move || Fresh(f())));
        Self {
            source: Arc::new(Always(cell)),
        }
    }

    pub fn get(&self) -> T {
        self.source.get()
    }

    pub fn get_untracked(&self) -> T {
        untracked(|| self.source.get())
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T> PartialEq for ReadSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl<T> Eq for ReadSignal<T> {}

impl<T> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal").finish_non_exhaustive()
    }
}

/// A data-less change marker. Clones share the same marker.
#[derive(Clone, Default)]
pub struct Trigger {
    marker: Arc<reaktiv::Signal>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the running effect or computed value.
    pub fn track(&self) {
        self.marker.track_dependency();
    }

    pub fn notify(&self) {
        self.marker.emit();
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.marker, &other.marker)
    }
}

impl Eq for Trigger {}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Trigger")
    }
}
