use parking_lot::Mutex;

use crate::batch::{self, Scope};

type RenderHook = Box<dyn FnOnce() + Send>;

struct RenderQueue {
    next_id: u64,
    hooks: Vec<(u64, RenderHook)>,
}

static QUEUE: Mutex<RenderQueue> = Mutex::new(RenderQueue {
    next_id: 0,
    hooks: Vec::new(),
});

/// Handle to a hook registered with [`after_next_render`].
#[derive(Debug, PartialEq, Eq)]
pub struct AfterRenderRef {
    id: u64,
}

impl AfterRenderRef {
    /// Deregisters the hook if it has not run yet.
    pub fn destroy(self) {
        let removed = {
            let mut queue = QUEUE.lock();
            queue
                .hooks
                .iter()
                .position(|(id, _)| *id == self.id)
                .map(|pos| queue.hooks.remove(pos))
        };
        drop(removed);
    }
}

/// Registers `f` to run once, after the next completed render pass.
///
/// Hooks registered while a render pass is running hooks wait for the following pass.
pub fn after_next_render(f: impl FnOnce() + Send + 'static) -> AfterRenderRef {
    let mut queue = QUEUE.lock();
    let id = queue.next_id;
    queue.next_id += 1;
    queue.hooks.push((id, Box::new(f)));
    AfterRenderRef { id }
}

/// Completes one host render pass.
///
/// Flushes pending effects, runs every hook registered before the pass (each exactly once), then
/// flushes whatever the hooks scheduled.
pub fn render() {
    let _scope = Scope::enter();
    batch::flush();
    let hooks = std::mem::take(&mut QUEUE.lock().hooks);
    vtrace!(hooks = hooks.len(), "render");
    for (_, hook) in hooks {
        hook();
    }
    batch::flush();
}

/// Number of hooks waiting for the next render pass.
pub fn pending_render_hooks() -> usize {
    QUEUE.lock().hooks.len()
}
