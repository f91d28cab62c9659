use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reaktiv::{Effect, untracked};
use virtualizer_reactive::{
    ElementOptions, ScrollBehavior, ScrollSurface, ScrollTarget, SurfaceSize,
    create_eager_virtualizer,
};
use virtualizer_signals::{Signal, flush, render};

const PAGE: usize = 50;

#[derive(Clone)]
struct Feed {
    offset: Arc<AtomicU64>,
}

impl PartialEq for Feed {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.offset, &other.offset)
    }
}

impl ScrollSurface for Feed {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(360, 640)
    }

    fn scroll_offset(&self, _horizontal: bool) -> u64 {
        self.offset.load(Ordering::Relaxed)
    }

    fn scroll_to(&self, offset: u64, _horizontal: bool, _behavior: ScrollBehavior) {
        self.offset.store(offset, Ordering::Relaxed);
    }
}

fn main() {
    // Loaded rows plus one loader row at the end; reaching the loader fetches the next page.
    let feed = Feed {
        offset: Arc::new(AtomicU64::new(0)),
    };
    let loaded = Signal::new(PAGE);
    let v = create_eager_virtualizer({
        let feed = feed.clone();
        let loaded = loaded.clone();
        move || {
            ElementOptions::new(loaded.get() + 1, |_| 80)
                .with_scroll_element(ScrollTarget::Element(feed.clone()))
        }
    });

    let items = v.virtual_items();
    let _fetch = Effect::new({
        let loaded = loaded.clone();
        move || {
            let Some(last) = items.with(|items| items.last().map(|item| item.index)) else {
                return;
            };
            let count = untracked(|| loaded.get());
            if last >= count {
                println!("loader visible; fetching rows {count}..{}", count + PAGE);
                loaded.set(count + PAGE);
            }
        }
    });

    render();
    for _ in 0..6 {
        let end = v.total_size().get();
        feed.offset.store(end, Ordering::Relaxed);
        v.handle_scroll(end, 0);
        flush();
        println!(
            "loaded={} total_size={} offset={}",
            loaded.get(),
            v.total_size().get(),
            v.scroll_offset().get()
        );
    }
}
