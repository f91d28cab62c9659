use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reaktiv::Effect;
use virtualizer_reactive::{
    ElementOptions, ElementRef, ScrollBehavior, ScrollSurface, SurfaceSize, create_virtualizer,
};
use virtualizer_signals::{flush, render};

// A scroll container the host would own; equality is identity.
#[derive(Clone)]
struct Panel {
    offset: Arc<AtomicU64>,
    size: SurfaceSize,
}

impl PartialEq for Panel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.offset, &other.offset)
    }
}

impl ScrollSurface for Panel {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn scroll_offset(&self, _horizontal: bool) -> u64 {
        self.offset.load(Ordering::Relaxed)
    }

    fn scroll_to(&self, offset: u64, _horizontal: bool, _behavior: ScrollBehavior) {
        self.offset.store(offset, Ordering::Relaxed);
    }
}

fn main() {
    // Fixed-height rows inside a panel that only exists after the first render.
    let parent = ElementRef::<Panel>::new();
    let rows = create_virtualizer({
        let parent = parent.clone();
        move || {
            ElementOptions::new(10_000, |_| 35)
                .with_overscan(5)
                .with_scroll_element(parent.clone())
        }
    });

    let items = rows.virtual_items();
    let _log = Effect::new(move || {
        let items = items.get();
        match (items.first(), items.last()) {
            (Some(first), Some(last)) => {
                println!("rendering rows {}..={} ({})", first.index, last.index, items.len())
            }
            _ => println!("nothing to render"),
        }
    });

    render();
    println!("total_size={}", rows.total_size().get());

    let panel = Panel {
        offset: Arc::new(AtomicU64::new(0)),
        size: SurfaceSize::new(400, 300),
    };
    parent.mount(panel.clone());
    flush();

    // The host forwards native scroll events.
    for (now_ms, offset) in [(0, 700), (16, 1_400), (32, 2_100)] {
        panel.offset.store(offset, Ordering::Relaxed);
        rows.handle_scroll(offset, now_ms);
        flush();
    }

    rows.tick(500);
    println!(
        "range={:?} is_scrolling={}",
        rows.range().get(),
        rows.is_scrolling().get()
    );
}
