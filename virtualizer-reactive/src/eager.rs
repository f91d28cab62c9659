//! The eager adapter: a fixed set of signals mirrored from the engine at one synchronization
//! point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use reaktiv::{Effect, untracked};
use virtualizer::{Align, ScrollDirection, VirtualRange};
use virtualizer_signals::{ReadSignal, Signal, Trigger, is_batching};

use crate::engine::wire_on_change;
use crate::mount::MountScheduler;
use crate::slot::EngineSlot;
use crate::{Engine, ItemElement, ScrollBehavior, ScrollToOptions, SurfaceSize, VirtualItem};

struct Mirror<K> {
    is_scrolling: Signal<bool>,
    scroll_direction: Signal<Option<ScrollDirection>>,
    scroll_offset: Signal<u64>,
    virtual_items: Signal<Arc<[VirtualItem<K>]>>,
    total_size: Signal<u64>,
    range: Signal<Option<VirtualRange>>,
}

impl<K: PartialEq + Send + Sync + 'static> Mirror<K> {
    fn new() -> Self {
        Self {
            is_scrolling: Signal::new(false),
            scroll_direction: Signal::new(None),
            scroll_offset: Signal::new(0),
            virtual_items: Signal::new(Arc::from(Vec::new())),
            total_size: Signal::new(0),
            range: Signal::new(None),
        }
    }
}

struct SyncState<E: Engine> {
    mirror: Mirror<E::Key>,
    pending: AtomicBool,
    requested: Trigger,
    syncs: AtomicUsize,
}

impl<E: Engine> SyncState<E> {
    // The only place engine state is written into the graph.
    fn sync(&self, engine: &E) {
        self.syncs.fetch_add(1, Ordering::Relaxed);
        let mirror = &self.mirror;
        mirror.is_scrolling.set(engine.is_scrolling());
        mirror.scroll_direction.set(engine.scroll_direction());
        mirror.scroll_offset.set(engine.scroll_offset());
        mirror.virtual_items.set(engine.virtual_items().into());
        mirror.total_size.set(engine.total_size());
        mirror.range.set(engine.range());
    }

    /// Asks for one sync at the end of the current flush. Repeated requests coalesce.
    fn defer(&self) {
        if self.pending.swap(true, Ordering::AcqRel) {
            vtrace!("sync already pending; coalescing");
            return;
        }
        self.requested.notify();
    }

    /// Syncs now, or defers to the running flush or batch so several changes cost one sync.
    fn request(&self, engine: &E) {
        if is_batching() {
            self.defer();
        } else {
            self.sync(engine);
        }
    }
}

/// Reactive adapter that mirrors engine state into plain signals.
///
/// Six signals (`is_scrolling`, `scroll_direction`, `scroll_offset`, `virtual_items`,
/// `total_size`, `range`) are created up front and rewritten together after every option update
/// and every engine `on_change`. Changes that arrive during a flush or batch are coalesced into a
/// single sync. Queries and commands go straight to the engine, which is constructed with the
/// adapter.
///
/// # Panics
///
/// Calling commands or queries from inside the engine's `on_change` panics, because the command
/// that fired the callback still holds the engine. Use the instance passed to `on_change`.
/// Option updates and syncs requested meanwhile wait for the command to finish instead.
pub struct EagerVirtualizer<E: Engine> {
    slot: Arc<EngineSlot<E>>,
    options: ReadSignal<E::Options>,
    sync: Arc<SyncState<E>>,
    scroll_element: ReadSignal<Option<E::Element>>,
    // Dropping these unsubscribes them.
    _effects: [Effect; 3],
    mount: MountScheduler,
}

impl<E: Engine> EagerVirtualizer<E> {
    pub fn new(options: ReadSignal<E::Options>) -> Self {
        let slot = Arc::new(EngineSlot::<E>::new());
        let sync = Arc::new(SyncState {
            mirror: Mirror::new(),
            pending: AtomicBool::new(false),
            requested: Trigger::new(),
            syncs: AtomicUsize::new(0),
        });

        let sync_options = untracked(|| {
            let slot = Arc::clone(&slot);
            let sync = Arc::clone(&sync);
            let options = options.clone();
            Effect::new(move || {
                let options = options.get();
                untracked(|| {
                    let options = wire::<E>(options, &sync);
                    if slot.is_populated() {
                        vtrace!("forwarding options to the engine");
                        let sync = Arc::clone(&sync);
                        slot.write_or_defer(move |engine| {
                            engine.set_options(options);
                            sync.request(engine);
                        });
                    } else {
                        vdebug!("constructing engine");
                        slot.populate(E::new(options));
                        sync.defer();
                    }
                });
            })
        });

        let apply_sync = untracked(|| {
            let slot = Arc::clone(&slot);
            let sync = Arc::clone(&sync);
            Effect::new(move || {
                sync.requested.track();
                if !sync.pending.swap(false, Ordering::AcqRel) {
                    return;
                }
                let sync = Arc::clone(&sync);
                untracked(|| slot.write_or_defer(move |engine| sync.sync(engine)));
            })
        });

        let scroll_element = {
            let options = options.clone();
            ReadSignal::computed(move || options.with(E::scroll_element_of))
        };
        let attach = untracked(|| {
            let slot = Arc::clone(&slot);
            let scroll_element = scroll_element.clone();
            Effect::new(move || {
                if scroll_element.get().is_some() {
                    untracked(|| slot.write_or_defer(E::will_update));
                }
            })
        });

        let mount = MountScheduler::new(Arc::clone(&slot));
        Self {
            slot,
            options,
            sync,
            scroll_element,
            _effects: [sync_options, apply_sync, attach],
            mount,
        }
    }

    /// Number of times engine state has been mirrored into the signals.
    pub(crate) fn syncs(&self) -> usize {
        self.sync.syncs.load(Ordering::Relaxed)
    }

    // The options effect populates the slot on creation; this only runs if that was skipped.
    fn construct(&self) -> E {
        vdebug!("constructing engine");
        E::new(wire::<E>(self.options.get_untracked(), &self.sync))
    }

    fn read<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        untracked(|| self.slot.read(|| self.construct(), f))
    }

    fn write<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        untracked(|| self.slot.write(|| self.construct(), f))
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_mounted()
    }

    /// Reads the engine directly, constructing it first if needed. Reads are not tracked.
    pub fn with_engine<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        self.read(f)
    }

    pub fn options(&self) -> ReadSignal<E::Options> {
        self.options.clone()
    }

    /// The container the options currently resolve to.
    pub fn scroll_element(&self) -> ReadSignal<Option<E::Element>> {
        self.scroll_element.clone()
    }

    pub fn is_scrolling(&self) -> ReadSignal<bool> {
        self.sync.mirror.is_scrolling.read_only()
    }

    pub fn scroll_direction(&self) -> ReadSignal<Option<ScrollDirection>> {
        self.sync.mirror.scroll_direction.read_only()
    }

    pub fn scroll_offset(&self) -> ReadSignal<u64> {
        self.sync.mirror.scroll_offset.read_only()
    }

    pub fn virtual_items(&self) -> ReadSignal<Arc<[VirtualItem<E::Key>]>> {
        self.sync.mirror.virtual_items.read_only()
    }

    pub fn total_size(&self) -> ReadSignal<u64> {
        self.sync.mirror.total_size.read_only()
    }

    pub fn range(&self) -> ReadSignal<Option<VirtualRange>> {
        self.sync.mirror.range.read_only()
    }

    pub fn offset_for_index(&self, index: usize, align: Align) -> Option<(u64, Align)> {
        self.read(|engine| engine.offset_for_index(index, align))
    }

    pub fn offset_for_alignment(&self, to_offset: u64, align: Align) -> u64 {
        self.read(|engine| engine.offset_for_alignment(to_offset, align))
    }

    pub fn virtual_item_for_offset(&self, offset: u64) -> Option<VirtualItem<E::Key>> {
        self.read(|engine| engine.virtual_item_for_offset(offset))
    }

    pub fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize> {
        self.read(|engine| engine.index_from_element(element))
    }

    pub fn scroll_to_offset(&self, offset: u64, options: ScrollToOptions) {
        self.write(|engine| engine.scroll_to_offset(offset, options));
    }

    pub fn scroll_to_index(&self, index: usize, options: ScrollToOptions) {
        self.write(|engine| engine.scroll_to_index(index, options));
    }

    pub fn scroll_by(&self, delta: i64, behavior: ScrollBehavior) {
        self.write(|engine| engine.scroll_by(delta, behavior));
    }

    pub fn measure(&self) {
        self.write(E::measure);
    }

    pub fn measure_element<I: ItemElement>(&self, element: &I) {
        self.write(|engine| engine.measure_element(element));
    }

    pub fn resize_item(&self, index: usize, size: u32) {
        self.write(|engine| engine.resize_item(index, size));
    }

    pub fn handle_scroll(&self, offset: u64, now_ms: u64) {
        self.write(|engine| engine.handle_scroll(offset, now_ms));
    }

    pub fn handle_resize(&self, size: SurfaceSize) {
        self.write(|engine| engine.handle_resize(size));
    }

    pub fn tick(&self, now_ms: u64) -> Option<u64> {
        self.write(|engine| engine.tick(now_ms))
    }
}

fn wire<E: Engine>(options: E::Options, sync: &Arc<SyncState<E>>) -> E::Options {
    let sync = Arc::clone(sync);
    wire_on_change::<E>(options, move |engine, _| sync.request(engine))
}
