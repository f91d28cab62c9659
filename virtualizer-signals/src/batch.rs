use std::cell::Cell;

use reaktiv::Transaction;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

// Marks the current thread as inside a batch, flush or render pass until dropped.
pub(crate) struct Scope(());

impl Scope {
    pub(crate) fn enter() -> Self {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self(())
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Runs `f` as one transaction.
///
/// Effects scheduled by writes inside `f` run once, when the outermost batch ends.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = Scope::enter();
    Transaction::run(f)
}

/// Runs pending effects until none are left. Returns how many ran.
pub fn flush() -> usize {
    let _scope = Scope::enter();
    let ran = reaktiv::flush_effects();
    vtrace!(ran, "flush");
    ran
}

/// Whether a [`batch`], [`flush`] or [`crate::render`] pass is running on this thread.
///
/// Work requested now is picked up by that pass before it returns, so callers can coalesce
/// instead of acting immediately.
pub fn is_batching() -> bool {
    DEPTH.with(Cell::get) > 0
}
