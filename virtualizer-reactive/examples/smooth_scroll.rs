use std::sync::Arc;

use parking_lot::Mutex;
use virtualizer_reactive::{
    Align, Easing, ElementOptions, ScrollBehavior, ScrollSurface, ScrollTarget, ScrollToOptions,
    SurfaceSize, create_virtualizer,
};
use virtualizer_signals::render;

#[derive(Clone)]
struct Panel {
    trail: Arc<Mutex<Vec<u64>>>,
}

impl PartialEq for Panel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.trail, &other.trail)
    }
}

impl ScrollSurface for Panel {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(320, 200)
    }

    fn scroll_offset(&self, _horizontal: bool) -> u64 {
        self.trail.lock().last().copied().unwrap_or(0)
    }

    fn scroll_to(&self, offset: u64, _horizontal: bool, _behavior: ScrollBehavior) {
        self.trail.lock().push(offset);
    }
}

fn main() {
    let panel = Panel {
        trail: Arc::new(Mutex::new(Vec::new())),
    };
    let v = create_virtualizer({
        let panel = panel.clone();
        move || {
            ElementOptions::new(2_000, |_| 24)
                .with_scroll_element(ScrollTarget::Element(panel.clone()))
                .with_smooth_scroll(240, Easing::SmoothStep)
        }
    });
    render();

    v.scroll_to_index(1_200, ScrollToOptions::smooth(Align::Center));

    // A frame loop; each tick moves the list and the panel together.
    let mut now_ms = 0u64;
    while let Some(offset) = v.tick(now_ms) {
        if now_ms % 80 == 0 {
            println!("t={now_ms} offset={offset} range={:?}", v.range().get());
        }
        now_ms += 16;
    }

    println!(
        "done: offset={} frames={} is_scrolling={}",
        v.scroll_offset().get(),
        panel.trail.lock().len(),
        v.is_scrolling().get()
    );
}
