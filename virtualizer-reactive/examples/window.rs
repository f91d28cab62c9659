use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use virtualizer_reactive::{
    Align, ElementOptions, ScrollBehavior, ScrollSurface, ScrollToOptions, SurfaceSize,
    create_window_virtualizer,
};
use virtualizer_signals::{Signal, flush, render};

#[derive(Clone)]
struct Window {
    offset: Arc<AtomicU64>,
    size: Arc<Mutex<SurfaceSize>>,
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.offset, &other.offset)
    }
}

impl ScrollSurface for Window {
    fn size(&self) -> SurfaceSize {
        *self.size.lock()
    }

    fn scroll_offset(&self, _horizontal: bool) -> u64 {
        self.offset.load(Ordering::Relaxed)
    }

    fn scroll_to(&self, offset: u64, _horizontal: bool, _behavior: ScrollBehavior) {
        println!("window.scroll_to({offset})");
        self.offset.store(offset, Ordering::Relaxed);
    }
}

fn main() {
    // A list that starts 240px down the page, below a header.
    let window = Window {
        offset: Arc::new(AtomicU64::new(0)),
        size: Arc::new(Mutex::new(SurfaceSize::new(1024, 768))),
    };
    let header = Signal::new(240u32);
    let list = create_window_virtualizer(window.clone(), {
        let header = header.clone();
        move || {
            ElementOptions::new(5_000, |_| 48)
                .with_scroll_margin(header.get())
                .with_gap(4)
        }
    });

    render();
    println!(
        "total_size={} range={:?}",
        list.total_size().get(),
        list.range().get()
    );

    list.scroll_to_index(1_000, ScrollToOptions::new(Align::Center));
    println!("offset={} range={:?}", list.scroll_offset().get(), list.range().get());

    // The header grows; the engine keeps its scroll position and measurements.
    header.set(320);
    flush();
    println!("after header change: offset={}", list.scroll_offset().get());

    *window.size.lock() = SurfaceSize::new(1024, 400);
    list.handle_resize(window.size());
    println!("after resize: range={:?}", list.range().get());
}
