use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use reaktiv::{Effect, untracked};
use virtualizer_signals::{AfterRenderRef, after_next_render};

use crate::Engine;
use crate::slot::EngineSlot;

#[derive(Default)]
struct MountState {
    mounted: AtomicBool,
    hook: Mutex<Option<AfterRenderRef>>,
    effect: Mutex<Option<Effect>>,
}

impl MountState {
    fn hook_pending(&self) -> bool {
        self.hook.lock().is_some()
    }
}

/// Calls the engine's `did_mount` exactly once, after the first render that completes while the
/// engine exists.
///
/// An effect watches for the engine to become available and registers a single post-render hook.
/// The hook marks the adapter mounted, calls `did_mount`, and drops the effect.
pub(crate) struct MountScheduler {
    state: Arc<MountState>,
}

impl MountScheduler {
    pub(crate) fn new<E: Engine>(slot: Arc<EngineSlot<E>>) -> Self {
        let state = Arc::new(MountState::default());
        let effect = untracked(|| {
            let state = Arc::clone(&state);
            Effect::new(move || {
                slot.created().track();
                if state.mounted.load(Ordering::Acquire)
                    || state.hook_pending()
                    || !slot.is_populated()
                {
                    return;
                }
                vtrace!("scheduling did_mount after the next render");
                let hook = after_next_render({
                    let state = Arc::clone(&state);
                    let slot = Arc::clone(&slot);
                    move || {
                        state.hook.lock().take();
                        if state.mounted.swap(true, Ordering::AcqRel) {
                            return;
                        }
                        vdebug!("mounted");
                        untracked(|| slot.write_or_defer(E::did_mount));
                        let effect = state.effect.lock().take();
                        drop(effect);
                    }
                });
                *state.hook.lock() = Some(hook);
            })
        });
        *state.effect.lock() = Some(effect);
        Self { state }
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.state.mounted.load(Ordering::Acquire)
    }
}

impl Drop for MountScheduler {
    fn drop(&mut self) {
        let effect = self.state.effect.lock().take();
        drop(effect);
        let hook = self.state.hook.lock().take();
        if let Some(hook) = hook {
            hook.destroy();
        }
    }
}
