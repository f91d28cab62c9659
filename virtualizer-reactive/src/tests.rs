use crate::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};
use virtualizer_signals::{ReadSignal, Signal, batch, flush, pending_render_hooks, render};

use crate::mount::MountScheduler;
use crate::slot::EngineSlot;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        start + (self.next_u64() % (end_exclusive - start))
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    size: SurfaceSize,
    offset: u64,
    scrolls: Vec<u64>,
}

/// A scroll container; identity is the id.
#[derive(Clone, Debug)]
struct TestSurface {
    id: u32,
    state: Arc<Mutex<SurfaceState>>,
}

impl TestSurface {
    fn new(id: u32, width: u32, height: u32) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(SurfaceState {
                size: SurfaceSize::new(width, height),
                ..SurfaceState::default()
            })),
        }
    }

    fn with_offset(self, offset: u64) -> Self {
        self.state.lock().offset = offset;
        self
    }

    fn last_scroll(&self) -> Option<u64> {
        self.state.lock().scrolls.last().copied()
    }
}

impl PartialEq for TestSurface {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl ScrollSurface for TestSurface {
    fn size(&self) -> SurfaceSize {
        self.state.lock().size
    }

    fn scroll_offset(&self, _horizontal: bool) -> u64 {
        self.state.lock().offset
    }

    fn scroll_to(&self, offset: u64, _horizontal: bool, _behavior: ScrollBehavior) {
        let mut state = self.state.lock();
        state.offset = offset;
        state.scrolls.push(offset);
    }
}

struct TestItem {
    index: Option<usize>,
    size: SurfaceSize,
}

impl ItemElement for TestItem {
    fn data_index(&self) -> Option<usize> {
        self.index
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Calls {
    constructions: usize,
    set_options: usize,
    will_update: usize,
    did_mount: usize,
    total_size_reads: usize,
    offset_queries: usize,
    drops: usize,
}

static CALLS: Mutex<Calls> = Mutex::new(Calls {
    constructions: 0,
    set_options: 0,
    will_update: 0,
    did_mount: 0,
    total_size_reads: 0,
    offset_queries: 0,
    drops: 0,
});

// reaktiv keeps one pending set per process, and the call counters are global too.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    flush();
    reset_calls();
    guard
}

fn calls() -> Calls {
    *CALLS.lock()
}

fn reset_calls() {
    *CALLS.lock() = Calls::default();
}

fn record(f: impl FnOnce(&mut Calls)) {
    f(&mut CALLS.lock());
}

#[derive(Clone)]
struct FakeOptions {
    count: usize,
    item_size: u32,
    viewport: u32,
    scroll_element: ScrollTarget<TestSurface>,
    on_change: Option<OnChange<FakeEngine>>,
}

impl FakeOptions {
    fn new(count: usize) -> Self {
        Self {
            count,
            item_size: 10,
            viewport: 100,
            scroll_element: ScrollTarget::None,
            on_change: None,
        }
    }

    fn with_scroll_element(mut self, target: impl Into<ScrollTarget<TestSurface>>) -> Self {
        self.scroll_element = target.into();
        self
    }

    fn with_on_change(mut self, f: impl Fn(&FakeEngine, bool) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(f));
        self
    }
}

/// Fixed-size rows, no overscan. Every state change reports through `on_change`, including
/// `set_options`.
struct FakeEngine {
    options: FakeOptions,
    element: Option<TestSurface>,
    offset: u64,
    scrolling: bool,
}

impl FakeEngine {
    fn viewport(&self) -> u32 {
        self.element
            .as_ref()
            .map_or(self.options.viewport, |el| el.size().height)
    }

    fn total(&self) -> u64 {
        self.options.count as u64 * self.options.item_size as u64
    }

    fn max_offset(&self) -> u64 {
        self.total().saturating_sub(self.viewport() as u64)
    }

    fn changed(&self) {
        if let Some(on_change) = &self.options.on_change {
            on_change(self, self.scrolling);
        }
    }

    fn visible(&self) -> Option<VirtualRange> {
        let size = self.options.item_size as u64;
        let view = self.viewport() as u64;
        if self.options.count == 0 || view == 0 {
            return None;
        }
        let start = ((self.offset / size) as usize).min(self.options.count);
        let end = ((self.offset + view).div_ceil(size) as usize).min(self.options.count);
        (start < end).then_some(VirtualRange {
            start_index: start,
            end_index: end,
        })
    }

    fn item(&self, index: usize) -> VirtualItem<usize> {
        VirtualItem {
            key: index,
            index,
            start: index as u64 * self.options.item_size as u64,
            size: self.options.item_size,
        }
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        record(|c| c.drops += 1);
    }
}

impl Engine for FakeEngine {
    type Options = FakeOptions;
    type Element = TestSurface;
    type Key = usize;

    fn new(options: FakeOptions) -> Self {
        record(|c| c.constructions += 1);
        Self {
            options,
            element: None,
            offset: 0,
            scrolling: false,
        }
    }

    fn set_options(&mut self, options: FakeOptions) {
        record(|c| c.set_options += 1);
        self.options = options;
        self.offset = self.offset.min(self.max_offset());
        self.changed();
    }

    fn options(&self) -> &FakeOptions {
        &self.options
    }

    fn scroll_element_of(options: &FakeOptions) -> Option<TestSurface> {
        resolve_scroll_element(&options.scroll_element)
    }

    fn on_change_of(options: &FakeOptions) -> Option<OnChange<Self>> {
        options.on_change.clone()
    }

    fn with_on_change(mut options: FakeOptions, on_change: OnChange<Self>) -> FakeOptions {
        options.on_change = Some(on_change);
        options
    }

    fn did_mount(&mut self) {
        record(|c| c.did_mount += 1);
    }

    fn will_update(&mut self) {
        record(|c| c.will_update += 1);
        self.element = resolve_scroll_element(&self.options.scroll_element);
        self.changed();
    }

    fn total_size(&self) -> u64 {
        record(|c| c.total_size_reads += 1);
        self.total()
    }

    fn virtual_items(&self) -> Vec<VirtualItem<usize>> {
        self.visible()
            .map(|r| (r.start_index..r.end_index).map(|i| self.item(i)).collect())
            .unwrap_or_default()
    }

    fn range(&self) -> Option<VirtualRange> {
        self.visible()
    }

    fn is_scrolling(&self) -> bool {
        self.scrolling
    }

    fn scroll_direction(&self) -> Option<ScrollDirection> {
        None
    }

    fn scroll_offset(&self) -> u64 {
        self.offset
    }

    fn scroll_rect(&self) -> Rect {
        Rect {
            main: self.viewport(),
            cross: 0,
        }
    }

    fn scroll_element(&self) -> Option<TestSurface> {
        self.element.clone()
    }

    fn offset_for_index(&self, index: usize, align: Align) -> Option<(u64, Align)> {
        record(|c| c.offset_queries += 1);
        (index < self.options.count).then(|| (self.item(index).start.min(self.max_offset()), align))
    }

    fn offset_for_alignment(&self, to_offset: u64, _align: Align) -> u64 {
        to_offset.min(self.max_offset())
    }

    fn virtual_item_for_offset(&self, offset: u64) -> Option<VirtualItem<usize>> {
        let index = (offset / self.options.item_size as u64) as usize;
        (index < self.options.count).then(|| self.item(index))
    }

    fn scroll_to_offset(&mut self, offset: u64, _options: ScrollToOptions) {
        self.offset = offset.min(self.max_offset());
        self.changed();
    }

    fn scroll_to_index(&mut self, index: usize, options: ScrollToOptions) {
        if let Some((offset, _)) = self.offset_for_index(index, options.align) {
            self.offset = offset;
            self.changed();
        }
    }

    fn scroll_by(&mut self, delta: i64, _behavior: ScrollBehavior) {
        self.offset = self.offset.saturating_add_signed(delta).min(self.max_offset());
        self.changed();
    }

    fn measure(&mut self) {
        self.changed();
    }

    fn resize_item(&mut self, _index: usize, _size: u32) {
        self.changed();
    }

    fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize> {
        element.data_index()
    }

    fn measure_element<I: ItemElement>(&mut self, element: &I) {
        if element.data_index().is_some() {
            self.changed();
        }
    }

    fn handle_scroll(&mut self, offset: u64, _now_ms: u64) {
        self.offset = offset;
        self.scrolling = true;
        self.changed();
    }

    fn handle_resize(&mut self, size: SurfaceSize) {
        self.options.viewport = size.height;
        self.changed();
    }

    fn tick(&mut self, _now_ms: u64) -> Option<u64> {
        if self.scrolling {
            self.scrolling = false;
            self.changed();
        }
        None
    }
}

// Behaviour both adapters promise, run against each of them.
macro_rules! adapter_contract {
    ($name:ident, $adapter:ident) => {
        mod $name {
            use super::*;

            type Adapter = $adapter<FakeEngine>;

            fn counted(count: &Signal<usize>) -> Adapter {
                let count = count.clone();
                let v = create_adapter::<Adapter>(move || FakeOptions::new(count.get()));
                let _ = v.total_size().get();
                v
            }

            #[test]
            fn engine_is_constructed_once_and_updated_in_place() {
                let _serial = serial();
                let count = Signal::new(10usize);
                let v = counted(&count);
                flush();
                assert_eq!(calls().constructions, 1);
                assert_eq!(calls().set_options, 0);

                for n in 11..15 {
                    count.set(n);
                    flush();
                }
                assert_eq!(calls().constructions, 1);
                assert_eq!(calls().set_options, 4);
                assert_eq!(v.with_engine(|e| e.options.count), 14);
                assert_eq!(v.total_size().get(), 140);
            }

            #[test]
            fn did_mount_runs_once_after_the_first_render() {
                let _serial = serial();
                let count = Signal::new(10usize);
                let v = counted(&count);
                flush();
                count.set(20);
                flush();
                count.set(30);
                flush();
                assert_eq!(calls().did_mount, 0);
                assert!(!v.is_mounted());

                render();
                assert_eq!(calls().did_mount, 1);
                assert!(v.is_mounted());

                count.set(40);
                render();
                render();
                assert_eq!(calls().did_mount, 1);
                assert_eq!(pending_render_hooks(), 0);
            }

            #[test]
            fn cells_are_memoized_until_the_engine_changes() {
                let _serial = serial();
                let v = counted(&Signal::new(100usize));
                flush();

                let a = v.virtual_items().get();
                let b = v.virtual_items().get();
                assert!(Arc::ptr_eq(&a, &b));
                assert_eq!(a.len(), 10);

                v.scroll_to_offset(250, ScrollToOptions::default());
                let c = v.virtual_items().get();
                assert!(!Arc::ptr_eq(&a, &c));
                assert_eq!(c.first().map(|item| item.index), Some(25));
                assert_eq!(v.scroll_offset().get(), 250);
            }

            #[test]
            fn items_stay_in_bounds_and_ordered_while_scrolling() {
                let _serial = serial();
                let surface = TestSurface::new(1, 400, 300);
                let v = create_adapter::<$adapter<ElementVirtualizer<TestSurface>>>(move || {
                    ElementOptions::new(10_000, |_| 35)
                        .with_overscan(5)
                        .with_scroll_element(ScrollTarget::Element(surface.clone()))
                });
                render();
                assert_eq!(v.total_size().get(), 350_000);

                let mut rng = Lcg(7);
                for step in 0..200 {
                    if step % 3 == 0 {
                        let index = rng.gen_range_u64(0, 12_000) as usize;
                        v.scroll_to_index(index, ScrollToOptions::new(Align::Auto));
                    } else {
                        let offset = rng.gen_range_u64(0, 400_000);
                        v.scroll_to_offset(offset, ScrollToOptions::default());
                    }
                    let items = v.virtual_items().get();
                    assert!(!items.is_empty());
                    assert!(items.iter().all(|item| item.index < 10_000));
                    assert!(items.windows(2).all(|w| w[0].start <= w[1].start));
                }
            }

            #[test]
            fn scroll_element_appearing_later_triggers_one_update() {
                let _serial = serial();
                let parent = ElementRef::<TestSurface>::new();
                let count = Signal::new(100usize);
                let v = create_adapter::<Adapter>({
                    let parent = parent.clone();
                    let count = count.clone();
                    move || FakeOptions::new(count.get()).with_scroll_element(parent.clone())
                });
                render();
                assert_eq!(calls().will_update, 0);
                assert_eq!(
                    v.range().get(),
                    Some(VirtualRange {
                        start_index: 0,
                        end_index: 10
                    })
                );

                let surface = TestSurface::new(7, 200, 140);
                parent.mount(surface.clone());
                flush();
                assert_eq!(calls().will_update, 1);
                assert_eq!(v.with_engine(|e| e.element.clone()), Some(surface));
                assert_eq!(
                    v.range().get(),
                    Some(VirtualRange {
                        start_index: 0,
                        end_index: 14
                    })
                );

                count.set(200);
                flush();
                assert_eq!(calls().will_update, 1);
            }

            #[test]
            fn engine_change_during_a_pending_update_is_kept() {
                let _serial = serial();
                let count = Signal::new(10usize);
                let v = counted(&count);
                flush();

                count.set(40);
                v.handle_scroll(55, 0);
                flush();

                assert_eq!(calls().set_options, 1);
                assert_eq!(v.scroll_offset().get(), 55);
                assert_eq!(v.total_size().get(), 400);
                assert!(v.is_scrolling().get());
            }

            #[test]
            fn options_arriving_while_a_command_holds_the_engine_are_applied_after_it() {
                let _serial = serial();
                let count = Signal::new(100usize);
                // Flushing from on_change runs the options update while scroll_by still holds
                // the engine.
                let v = create_adapter::<Adapter>({
                    let count = count.clone();
                    move || {
                        FakeOptions::new(count.get()).with_on_change(|_, _| {
                            flush();
                        })
                    }
                });
                let size = v.total_size();
                assert_eq!(size.get(), 1_000);
                flush();

                count.set(200);
                v.scroll_by(10, ScrollBehavior::Auto);

                assert_eq!(calls().set_options, 1);
                assert_eq!(v.with_engine(|e| e.options.count), 200);
                assert_eq!(v.scroll_offset().get(), 10);
                assert_eq!(size.get(), 2_000);
            }

            #[test]
            fn dropping_the_adapter_releases_the_engine_and_its_subscriptions() {
                let _serial = serial();
                let count = Signal::new(10usize);
                let factory_runs = Arc::new(AtomicUsize::new(0));
                {
                    let v = create_adapter::<Adapter>({
                        let count = count.clone();
                        let factory_runs = Arc::clone(&factory_runs);
                        move || {
                            factory_runs.fetch_add(1, Ordering::SeqCst);
                            FakeOptions::new(count.get())
                        }
                    });
                    let _ = v.total_size().get();
                    let _ = v.range().get();
                    flush();
                    assert_eq!(calls().drops, 0);
                }
                assert_eq!(calls().drops, 1);
                assert_eq!(pending_render_hooks(), 0);

                let runs = factory_runs.load(Ordering::SeqCst);
                count.set(11);
                flush();
                assert_eq!(factory_runs.load(Ordering::SeqCst), runs);
                assert_eq!(calls().set_options, 0);
            }

            #[test]
            fn commands_and_queries_reach_the_engine() {
                let _serial = serial();
                let v = counted(&Signal::new(100usize));
                flush();

                v.scroll_to_index(42, ScrollToOptions::default());
                assert_eq!(v.scroll_offset().get(), 420);
                v.scroll_by(-20, ScrollBehavior::Auto);
                assert_eq!(v.scroll_offset().get(), 400);
                assert_eq!(
                    VirtualizerAdapter::offset_for_index(&v, 3, Align::Start),
                    Some((30, Align::Start))
                );
                assert_eq!(
                    VirtualizerAdapter::offset_for_alignment(&v, 5_000, Align::End),
                    900
                );
                assert_eq!(
                    VirtualizerAdapter::virtual_item_for_offset(&v, 95).map(|item| item.index),
                    Some(9)
                );

                let item = TestItem {
                    index: Some(4),
                    size: SurfaceSize::new(10, 10),
                };
                assert_eq!(v.index_from_element(&item), Some(4));

                v.handle_scroll(10, 0);
                assert!(v.is_scrolling().get());
                v.tick(500);
                assert!(!v.is_scrolling().get());
            }
        }
    };
}

adapter_contract!(lazy_contract, LazyVirtualizer);
adapter_contract!(eager_contract, EagerVirtualizer);

#[test]
fn lazy_cells_are_created_on_first_access() {
    let _serial = serial();
    let v = create_adapter::<LazyVirtualizer<FakeEngine>>(|| FakeOptions::new(10));
    flush();
    assert!(!v.is_cached(Property::TotalSize));
    assert_eq!(calls().constructions, 0);

    assert_eq!(v.total_size().get(), 100);
    assert!(v.is_cached(Property::TotalSize));
    assert!(!v.is_cached(Property::VirtualItems));
    assert_eq!(calls().constructions, 1);

    // The engine was built from the current options; nothing is forwarded twice.
    flush();
    assert_eq!(calls().constructions, 1);
    assert_eq!(calls().set_options, 0);
}

#[test]
fn lazy_state_cells_are_shared_and_factory_cells_are_not() {
    let _serial = serial();
    let v = create_adapter::<LazyVirtualizer<FakeEngine>>(|| FakeOptions::new(100));
    flush();

    assert_eq!(v.total_size(), v.total_size());
    let a = v.offset_for_index(3, Align::Start);
    let b = v.offset_for_index(3, Align::Start);
    assert_ne!(a, b);
    assert_eq!(a.get(), b.get());

    let item = v.virtual_item_for_offset(250);
    assert_eq!(item.get().map(|item| item.index), Some(25));
    v.resize_item(0, 20);
    assert_eq!(item.get().map(|item| item.index), Some(25));
}

#[test]
fn lazy_factory_cells_stop_tracking_the_engine_once_dropped() {
    let _serial = serial();
    let v = create_adapter::<LazyVirtualizer<FakeEngine>>(|| FakeOptions::new(100));
    for index in 0..100 {
        let offset = v.offset_for_index(index, Align::Start).get();
        assert_eq!(offset.map(|(offset, _)| offset), Some((index as u64 * 10).min(900)));
    }
    let kept = v.offset_for_index(3, Align::Start);
    assert_eq!(kept.get(), Some((30, Align::Start)));
    reset_calls();

    v.scroll_by(10, ScrollBehavior::Auto);
    flush();
    assert_eq!(calls().offset_queries, 1);
    assert_eq!(kept.get(), Some((30, Align::Start)));
    assert_eq!(calls().offset_queries, 1);

    drop(kept);
    v.scroll_by(10, ScrollBehavior::Auto);
    flush();
    assert_eq!(calls().offset_queries, 1);
}

#[test]
fn lazy_cells_re_derive_once_per_revision() {
    let _serial = serial();
    let count = Signal::new(10usize);
    let v = create_adapter::<LazyVirtualizer<FakeEngine>>({
        let count = count.clone();
        move || FakeOptions::new(count.get())
    });
    flush();

    let size = v.total_size();
    assert_eq!(size.get(), 100);
    let reads = calls().total_size_reads;
    assert_eq!(size.get(), 100);
    assert_eq!(calls().total_size_reads, reads);

    count.set(20);
    count.set(30);
    flush();
    assert_eq!(size.get(), 300);
    assert_eq!(calls().total_size_reads, reads + 1);
}

#[test]
fn lazy_options_cell_follows_the_engine() {
    let _serial = serial();
    let count = Signal::new(10usize);
    let v = create_adapter::<LazyVirtualizer<FakeEngine>>({
        let count = count.clone();
        move || FakeOptions::new(count.get())
    });
    flush();

    let options = v.options();
    assert_eq!(options.with(|o| o.count), 10);
    count.set(12);
    flush();
    assert_eq!(options.with(|o| o.count), 12);
    assert_eq!(v.scroll_rect().get().main, 100);
    assert_eq!(v.scroll_element().get(), None);
}

#[test]
fn eager_updates_in_one_flush_cost_one_sync() {
    let _serial = serial();
    let count = Signal::new(10usize);
    let v = create_adapter::<EagerVirtualizer<FakeEngine>>({
        let count = count.clone();
        move || FakeOptions::new(count.get())
    });
    assert_eq!(calls().constructions, 1);
    flush();
    assert_eq!(v.syncs(), 1);

    count.set(20);
    count.set(30);
    flush();
    assert_eq!(calls().set_options, 1);
    assert_eq!(v.syncs(), 2);
    assert_eq!(v.total_size().get(), 300);
}

#[test]
fn eager_engine_changes_inside_a_batch_are_coalesced() {
    let _serial = serial();
    let v = create_adapter::<EagerVirtualizer<FakeEngine>>(|| FakeOptions::new(100));
    flush();
    let syncs = v.syncs();

    batch(|| {
        v.scroll_to_offset(100, ScrollToOptions::default());
        v.scroll_by(50, ScrollBehavior::Auto);
        v.measure();
    });
    assert_eq!(v.syncs(), syncs + 1);
    assert_eq!(v.scroll_offset().get(), 150);

    // Outside a batch every change is mirrored right away.
    v.scroll_by(10, ScrollBehavior::Auto);
    assert_eq!(v.syncs(), syncs + 2);
    assert_eq!(v.scroll_offset().get(), 160);
}

#[test]
fn eager_user_on_change_sees_synced_state() {
    let _serial = serial();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mirror: Arc<Mutex<Option<ReadSignal<u64>>>> = Arc::new(Mutex::new(None));
    let v = create_adapter::<EagerVirtualizer<FakeEngine>>({
        let seen = Arc::clone(&seen);
        let mirror = Arc::clone(&mirror);
        move || {
            let seen = Arc::clone(&seen);
            let mirror = Arc::clone(&mirror);
            FakeOptions::new(100).with_on_change(move |engine, _| {
                let offset = mirror.lock().clone();
                if let Some(offset) = offset {
                    seen.lock().push((engine.offset, offset.get_untracked()));
                }
            })
        }
    });
    *mirror.lock() = Some(v.scroll_offset());
    flush();
    seen.lock().clear();

    v.scroll_to_offset(120, ScrollToOptions::default());
    assert_eq!(*seen.lock(), vec![(120, 120)]);
}

#[test]
fn mount_waits_for_the_engine() {
    let _serial = serial();
    let slot = Arc::new(EngineSlot::<FakeEngine>::new());
    let mount = MountScheduler::new(Arc::clone(&slot));

    render();
    render();
    assert_eq!(pending_render_hooks(), 0);
    assert!(!mount.is_mounted());

    assert!(slot.populate(FakeEngine::new(FakeOptions::new(1))));
    assert!(!slot.populate(FakeEngine::new(FakeOptions::new(2))));
    assert_eq!(slot.try_read(|e| e.options.count), Some(1));

    render();
    assert!(mount.is_mounted());
    assert_eq!(calls().did_mount, 1);
    render();
    assert_eq!(calls().did_mount, 1);
}

#[test]
fn slot_writes_queued_during_a_command_run_after_it() {
    let _serial = serial();
    let slot = Arc::new(EngineSlot::<FakeEngine>::new());
    assert!(!slot.write_or_defer(|engine| engine.offset = 1));
    assert!(slot.populate(FakeEngine::new(FakeOptions::new(100))));

    let order = Arc::new(Mutex::new(Vec::new()));
    slot.write(
        || unreachable!("the slot is populated"),
        |engine| {
            engine.offset = 5;
            let order = Arc::clone(&order);
            assert!(slot.write_or_defer(move |engine| {
                order.lock().push(engine.offset);
                engine.offset = 7;
            }));
            assert!(slot.is_populated());
            assert_eq!(slot.try_read(|engine| engine.offset), None);
        },
    );
    order.lock().push(0);

    assert_eq!(*order.lock(), vec![5, 0]);
    assert_eq!(slot.try_read(|engine| engine.offset), Some(7));
}

#[test]
fn change_observers_run_in_order() {
    let _serial = serial();
    let log = Arc::new(Mutex::new(Vec::new()));
    let observers = ChangeObservers::<FakeEngine>::new()
        .with({
            let log = Arc::clone(&log);
            move |_, _| log.lock().push("adapter")
        })
        .with({
            let log = Arc::clone(&log);
            move |_, scrolling| log.lock().push(if scrolling { "user+" } else { "user" })
        });
    assert_eq!(observers.len(), 2);

    let engine = FakeEngine::new(FakeOptions::new(1));
    observers.into_on_change()(&engine, false);
    assert_eq!(*log.lock(), vec!["adapter", "user"]);
}

#[test]
fn capability_table() {
    assert_eq!(capability_of("total_size"), Capability::State);
    assert_eq!(capability_of("virtual_items"), Capability::State);
    assert_eq!(capability_of("options"), Capability::State);
    assert_eq!(capability_of("offset_for_index"), Capability::Factory);
    assert_eq!(capability_of("virtual_item_for_offset"), Capability::Factory);
    assert_eq!(capability_of("scroll_to_index"), Capability::PassThrough);
    assert_eq!(capability_of("not_a_property"), Capability::PassThrough);

    for property in Property::ALL {
        assert_eq!(Property::from_name(property.name()), Some(property));
    }
}

#[test]
fn resolve_scroll_targets() {
    let _serial = serial();
    let surface = TestSurface::new(1, 10, 10);
    assert_eq!(resolve_scroll_element::<TestSurface>(&ScrollTarget::None), None);
    assert_eq!(
        resolve_scroll_element(&ScrollTarget::Element(surface.clone())),
        Some(surface.clone())
    );

    let reference = ElementRef::<TestSurface>::new();
    let target = ScrollTarget::from(reference.clone());
    assert_eq!(resolve_scroll_element(&target), None);
    reference.mount(surface.clone());
    assert_eq!(resolve_scroll_element(&target), Some(surface.clone()));
    reference.unmount();
    assert_eq!(resolve_scroll_element(&target), None);

    let window = TestSurface::new(2, 10, 10);
    let options = ElementOptions::new(1, |_| 1).with_window_defaults(&window);
    assert_eq!(options.resolve_scroll_element(), Some(window.clone()));
    let options = ElementOptions::new(1, |_| 1)
        .with_scroll_element(ScrollTarget::Element(surface.clone()))
        .with_window_defaults(&window);
    assert_eq!(options.resolve_scroll_element(), Some(surface));
}

fn attached(count: usize, height: u32) -> (ElementVirtualizer<TestSurface>, TestSurface) {
    let surface = TestSurface::new(1, 400, height);
    let mut v = ElementVirtualizer::new(
        ElementOptions::new(count, |_| 10)
            .with_scroll_element(ScrollTarget::Element(surface.clone())),
    );
    v.did_mount();
    (v, surface)
}

#[test]
fn element_virtualizer_attaches_on_mount() {
    let (v, surface) = attached(100, 50);
    assert!(v.is_mounted());
    assert_eq!(v.scroll_element(), Some(surface));
    assert_eq!(v.scroll_rect().main, 50);
    assert_eq!(
        v.range(),
        Some(VirtualRange {
            start_index: 0,
            end_index: 5
        })
    );
}

#[test]
fn element_virtualizer_alignment() {
    let (v, _) = attached(100, 50);
    assert_eq!(v.offset_for_index(20, Align::Start), Some((200, Align::Start)));
    assert_eq!(v.offset_for_index(20, Align::End), Some((160, Align::End)));
    assert_eq!(v.offset_for_index(20, Align::Center), Some((180, Align::Center)));
    assert_eq!(v.offset_for_index(20, Align::Auto), Some((160, Align::End)));
    assert_eq!(v.offset_for_index(2, Align::Auto), Some((0, Align::Auto)));
    assert_eq!(v.offset_for_index(99, Align::Start), Some((950, Align::Start)));
    assert_eq!(v.offset_for_alignment(500, Align::Center), 475);
    assert_eq!(v.offset_for_alignment(5_000, Align::Start), 950);

    let (empty, _) = attached(0, 50);
    assert_eq!(empty.offset_for_index(0, Align::Start), None);
}

#[test]
fn element_virtualizer_scrolls_the_surface() {
    let (mut v, surface) = attached(100, 50);
    v.scroll_to_index(30, ScrollToOptions::new(Align::Start));
    assert_eq!(v.scroll_offset(), 300);
    assert_eq!(surface.last_scroll(), Some(300));

    v.scroll_by(-50, ScrollBehavior::Auto);
    assert_eq!(v.scroll_offset(), 250);
    assert_eq!(v.scroll_direction(), Some(ScrollDirection::Backward));
    assert_eq!(surface.last_scroll(), Some(250));
}

#[test]
fn element_virtualizer_smooth_scroll_advances_on_tick() {
    let surface = TestSurface::new(1, 400, 50);
    let mut v = ElementVirtualizer::new(
        ElementOptions::new(100, |_| 10)
            .with_scroll_element(ScrollTarget::Element(surface.clone()))
            .with_smooth_scroll(300, Easing::Linear),
    );
    v.did_mount();

    v.scroll_to_offset(300, ScrollToOptions::smooth(Align::Start));
    assert!(v.is_animating());
    assert_eq!(v.scroll_offset(), 0);

    assert_eq!(v.tick(1_000), Some(0));
    assert_eq!(v.tick(1_150), Some(150));
    assert!(v.is_scrolling());
    assert_eq!(v.tick(1_300), Some(300));
    assert!(!v.is_animating());
    assert!(!v.is_scrolling());
    assert_eq!(surface.last_scroll(), Some(300));
    assert_eq!(v.tick(1_400), None);
}

#[test]
fn element_virtualizer_user_scroll_cancels_smooth_scroll() {
    let (mut v, _) = attached(100, 50);
    v.scroll_to_offset(300, ScrollToOptions::smooth(Align::Start));
    v.tick(0);
    v.handle_scroll(40, 10);
    assert!(!v.is_animating());
    assert_eq!(v.scroll_offset(), 40);
    assert_eq!(v.tick(20), None);
    assert_eq!(v.scroll_offset(), 40);
}

#[test]
fn element_virtualizer_resize_above_viewport_keeps_position() {
    let (mut v, surface) = attached(100, 50);
    v.scroll_to_offset(200, ScrollToOptions::default());

    v.resize_item(5, 30);
    assert_eq!(v.total_size(), 1_020);
    assert_eq!(v.scroll_offset(), 220);
    assert_eq!(surface.last_scroll(), Some(220));

    v.measure_element(&TestItem {
        index: Some(90),
        size: SurfaceSize::new(400, 25),
    });
    assert_eq!(v.total_size(), 1_035);
    assert_eq!(v.scroll_offset(), 220);

    v.measure();
    assert_eq!(v.total_size(), 1_000);
}

#[test]
fn element_virtualizer_ignores_elements_without_index() {
    let (mut v, _) = attached(100, 50);
    let item = TestItem {
        index: None,
        size: SurfaceSize::new(400, 99),
    };
    assert_eq!(v.index_from_element(&item), None);
    v.measure_element(&item);
    assert_eq!(v.total_size(), 1_000);
}

#[test]
fn element_virtualizer_set_options_keeps_measurements() {
    let surface = TestSurface::new(1, 400, 50);
    let options =
        ElementOptions::new(100, |_| 10).with_scroll_element(ScrollTarget::Element(surface));
    let mut v = ElementVirtualizer::new(options.clone());
    v.did_mount();
    v.resize_item(0, 50);
    v.scroll_to_offset(300, ScrollToOptions::default());
    assert_eq!(v.total_size(), 1_040);

    v.set_options(options.clone().with_overscan(3));
    assert_eq!(v.total_size(), 1_040);
    assert_eq!(v.scroll_offset(), 300);

    let mut grown = options;
    grown.count = 101;
    v.set_options(grown);
    assert_eq!(v.total_size(), 1_050);
}

#[test]
fn element_virtualizer_detaches_when_the_element_goes_away() {
    let _serial = serial();
    let parent = ElementRef::<TestSurface>::new();
    let mut v =
        ElementVirtualizer::new(ElementOptions::new(100, |_| 10).with_scroll_element(parent.clone()));
    v.did_mount();
    assert_eq!(v.scroll_element(), None);
    assert_eq!(v.range(), None);

    parent.mount(TestSurface::new(3, 400, 50));
    v.will_update();
    assert_eq!(v.scroll_rect().main, 50);
    assert!(v.range().is_some());

    parent.unmount();
    v.will_update();
    assert_eq!(v.scroll_element(), None);
    assert_eq!(v.scroll_rect(), Rect::default());
    assert_eq!(v.range(), None);
}

#[test]
fn element_virtualizer_reports_each_change_once() {
    let changes = Arc::new(AtomicUsize::new(0));
    let surface = TestSurface::new(1, 400, 50);
    let mut v = ElementVirtualizer::new(
        ElementOptions::new(100, |_| 10)
            .with_scroll_element(ScrollTarget::Element(surface))
            .with_on_change({
                let changes = Arc::clone(&changes);
                move |_, _| {
                    changes.fetch_add(1, Ordering::SeqCst);
                }
            }),
    );
    v.did_mount();
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    v.scroll_to_offset(100, ScrollToOptions::default());
    assert_eq!(changes.load(Ordering::SeqCst), 2);
    v.scroll_to_offset(100, ScrollToOptions::default());
    assert_eq!(changes.load(Ordering::SeqCst), 2);
    v.handle_resize(SurfaceSize::new(400, 80));
    assert_eq!(changes.load(Ordering::SeqCst), 3);
    assert_eq!(v.scroll_rect().main, 80);
}

#[test]
fn window_virtualizer_reads_the_initial_offset_from_the_window() {
    let _serial = serial();
    let window = TestSurface::new(9, 800, 600).with_offset(120);
    let v = create_window_virtualizer(window.clone(), || ElementOptions::new(1_000, |_| 20));
    assert_eq!(v.scroll_offset().get(), 120);

    render();
    assert!(v.is_mounted());
    assert_eq!(v.scroll_element().get(), Some(window));
    assert_eq!(v.scroll_offset().get(), 120);
    assert_eq!(
        v.range().get(),
        Some(VirtualRange {
            start_index: 6,
            end_index: 36
        })
    );
}

#[test]
fn eager_window_virtualizer_mirrors_on_creation() {
    let _serial = serial();
    let window = TestSurface::new(9, 800, 600);
    let v = create_eager_window_virtualizer(window, || {
        ElementOptions::new(1_000, |_| 20).with_scroll_margin(100)
    });
    assert_eq!(v.total_size().get(), 20_000);

    flush();
    assert_eq!(v.total_size().get(), 20_000);
    assert_eq!(v.range().get().map(|r| r.start_index), Some(0));
    assert!(v.scroll_element().get().is_some());
}
