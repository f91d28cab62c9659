use std::cell::RefCell;
use std::collections::VecDeque;

use parking_lot::{Mutex, ReentrantMutex};
use virtualizer_signals::Trigger;

use crate::Engine;

type Deferred<E> = Box<dyn FnOnce(&mut E) + Send>;

/// The adapter-owned engine instance: empty until first needed, populated once, never replaced.
///
/// The engine sits behind a re-entrant lock, so the thread running a command can reach the slot
/// again from inside the engine's `on_change`. Borrows under that lock follow `RefCell` rules:
/// [`EngineSlot::read`] and [`EngineSlot::write`] panic when they conflict with a running
/// command, [`EngineSlot::try_read`] reports the conflict, and [`EngineSlot::write_or_defer`]
/// queues the write until the command releases the engine.
pub(crate) struct EngineSlot<E> {
    engine: ReentrantMutex<RefCell<Option<E>>>,
    deferred: Mutex<VecDeque<Deferred<E>>>,
    created: Trigger,
}

impl<E: Engine> EngineSlot<E> {
    pub(crate) fn new() -> Self {
        Self {
            engine: ReentrantMutex::new(RefCell::new(None)),
            deferred: Mutex::new(VecDeque::new()),
            created: Trigger::new(),
        }
    }

    /// Notified once, when the engine is stored.
    pub(crate) fn created(&self) -> &Trigger {
        &self.created
    }

    pub(crate) fn is_populated(&self) -> bool {
        // A failed borrow means a command is using the engine right now.
        self.engine
            .lock()
            .try_borrow()
            .map_or(true, |engine| engine.is_some())
    }

    /// Stores `engine` unless one exists already. Returns whether it was stored.
    pub(crate) fn populate(&self, engine: E) -> bool {
        {
            let guard = self.engine.lock();
            let Ok(mut slot) = guard.try_borrow_mut() else {
                return false;
            };
            if slot.is_some() {
                return false;
            }
            *slot = Some(engine);
        }
        self.created.notify();
        true
    }

    /// Reads the engine, constructing it with `init` first if the slot is empty.
    ///
    /// # Panics
    ///
    /// Panics if a command holds the engine mutably.
    pub(crate) fn read<R>(&self, init: impl FnOnce() -> E, f: impl FnOnce(&E) -> R) -> R {
        {
            let guard = self.engine.lock();
            let engine = guard.borrow();
            if let Some(engine) = engine.as_ref() {
                return f(engine);
            }
        }
        let engine = init();
        let out = f(&engine);
        self.populate(engine);
        out
    }

    /// Reads the engine if it exists and no command holds it mutably.
    pub(crate) fn try_read<R>(&self, f: impl FnOnce(&E) -> R) -> Option<R> {
        let guard = self.engine.lock();
        let engine = guard.try_borrow().ok()?;
        engine.as_ref().map(f)
    }

    /// Mutates the engine, constructing it with `init` first if the slot is empty.
    ///
    /// # Panics
    ///
    /// Panics if the engine is already borrowed, i.e. when called from inside its `on_change`.
    pub(crate) fn write<R>(&self, init: impl FnOnce() -> E, f: impl FnOnce(&mut E) -> R) -> R {
        let (out, constructed) = {
            let guard = self.engine.lock();
            let mut slot = guard.borrow_mut();
            match slot.as_mut() {
                Some(engine) => (f(engine), false),
                None => {
                    let mut engine = init();
                    let out = f(&mut engine);
                    *slot = Some(engine);
                    (out, true)
                }
            }
        };
        if constructed {
            self.created.notify();
        }
        self.drain();
        out
    }

    /// Mutates the engine now if it is free, or queues `f` until the command holding it returns.
    ///
    /// Returns `false`, dropping `f`, when there is no engine yet.
    pub(crate) fn write_or_defer(&self, f: impl FnOnce(&mut E) + Send + 'static) -> bool {
        {
            let guard = self.engine.lock();
            let Ok(mut slot) = guard.try_borrow_mut() else {
                vdebug!("engine is busy; deferring write");
                self.deferred.lock().push_back(Box::new(f));
                return true;
            };
            let Some(engine) = slot.as_mut() else {
                return false;
            };
            f(engine);
        }
        self.drain();
        true
    }

    // Applies writes queued while the engine was busy, in arrival order.
    fn drain(&self) {
        loop {
            let guard = self.engine.lock();
            let Ok(mut slot) = guard.try_borrow_mut() else {
                return;
            };
            let Some(engine) = slot.as_mut() else {
                return;
            };
            let Some(next) = self.deferred.lock().pop_front() else {
                return;
            };
            vtrace!("applying deferred write");
            next(engine);
        }
    }
}
