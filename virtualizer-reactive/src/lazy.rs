//! The lazy adapter: derived cells are created the first time a consumer asks for them.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use reaktiv::{Effect, untracked};
use virtualizer::{Align, Rect, ScrollDirection, VirtualRange};
use virtualizer_signals::{ReadSignal, Trigger};

use crate::engine::wire_on_change;
use crate::mount::MountScheduler;
use crate::slot::EngineSlot;
use crate::{Engine, ItemElement, ScrollBehavior, ScrollToOptions, SurfaceSize, VirtualItem};

/// What the lazy adapter hands out for an engine property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capability {
    /// A memoized cell, created once and shared by every reader.
    State,
    /// A function returning a fresh cell per call, one per argument set.
    Factory,
    /// The engine's own method, called without caching.
    PassThrough,
}

/// Engine properties the lazy adapter knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Property {
    TotalSize,
    VirtualItems,
    Range,
    IsScrolling,
    ScrollDirection,
    ScrollOffset,
    ScrollRect,
    ScrollElement,
    Options,
    OffsetForIndex,
    OffsetForAlignment,
    VirtualItemForOffset,
    ScrollToOffset,
    ScrollToIndex,
    ScrollBy,
    Measure,
    MeasureElement,
    ResizeItem,
    IndexFromElement,
    HandleScroll,
    HandleResize,
    Tick,
}

impl Property {
    pub const ALL: [Property; 22] = [
        Property::TotalSize,
        Property::VirtualItems,
        Property::Range,
        Property::IsScrolling,
        Property::ScrollDirection,
        Property::ScrollOffset,
        Property::ScrollRect,
        Property::ScrollElement,
        Property::Options,
        Property::OffsetForIndex,
        Property::OffsetForAlignment,
        Property::VirtualItemForOffset,
        Property::ScrollToOffset,
        Property::ScrollToIndex,
        Property::ScrollBy,
        Property::Measure,
        Property::MeasureElement,
        Property::ResizeItem,
        Property::IndexFromElement,
        Property::HandleScroll,
        Property::HandleResize,
        Property::Tick,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Property::TotalSize => "total_size",
            Property::VirtualItems => "virtual_items",
            Property::Range => "range",
            Property::IsScrolling => "is_scrolling",
            Property::ScrollDirection => "scroll_direction",
            Property::ScrollOffset => "scroll_offset",
            Property::ScrollRect => "scroll_rect",
            Property::ScrollElement => "scroll_element",
            Property::Options => "options",
            Property::OffsetForIndex => "offset_for_index",
            Property::OffsetForAlignment => "offset_for_alignment",
            Property::VirtualItemForOffset => "virtual_item_for_offset",
            Property::ScrollToOffset => "scroll_to_offset",
            Property::ScrollToIndex => "scroll_to_index",
            Property::ScrollBy => "scroll_by",
            Property::Measure => "measure",
            Property::MeasureElement => "measure_element",
            Property::ResizeItem => "resize_item",
            Property::IndexFromElement => "index_from_element",
            Property::HandleScroll => "handle_scroll",
            Property::HandleResize => "handle_resize",
            Property::Tick => "tick",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn capability(self) -> Capability {
        match self {
            Property::TotalSize
            | Property::VirtualItems
            | Property::Range
            | Property::IsScrolling
            | Property::ScrollDirection
            | Property::ScrollOffset
            | Property::ScrollRect
            | Property::ScrollElement
            | Property::Options => Capability::State,
            Property::OffsetForIndex
            | Property::OffsetForAlignment
            | Property::VirtualItemForOffset => Capability::Factory,
            _ => Capability::PassThrough,
        }
    }
}

/// Looks up how the lazy adapter treats `name`. Names it does not know are passed through.
pub fn capability_of(name: &str) -> Capability {
    Property::from_name(name).map_or(Capability::PassThrough, Property::capability)
}

struct LazyInner<E: Engine> {
    slot: Arc<EngineSlot<E>>,
    options: ReadSignal<E::Options>,
    // Notified after every option update and every engine `on_change`.
    revision: Trigger,
}

impl<E: Engine> LazyInner<E> {
    fn wire(&self, options: E::Options) -> E::Options {
        let revision = self.revision.clone();
        wire_on_change::<E>(options, move |_, _| revision.notify())
    }

    fn construct(&self) -> E {
        vdebug!("constructing engine");
        E::new(self.wire(self.options.get_untracked()))
    }

    fn ensure(&self) {
        if self.slot.is_populated() {
            return;
        }
        untracked(|| {
            self.slot.populate(self.construct());
        });
    }

    fn read<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        self.ensure();
        self.slot.read(|| self.construct(), f)
    }

    fn write<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        self.ensure();
        untracked(|| self.slot.write(|| self.construct(), f))
    }

    /// Derives a cell value from the engine and subscribes the cell to the revision marker.
    ///
    /// A flush started from inside `on_change` runs while the command that fired it still holds
    /// the engine. The cell then keeps `last` and is derived again once the engine is released.
    fn derive<T: Clone>(&self, read: impl Fn(&E) -> T, last: &mut Option<T>) -> T {
        self.revision.track();
        self.ensure();
        let value = match (self.slot.try_read(&read), last.take()) {
            (Some(value), _) => value,
            (None, Some(previous)) => {
                vtrace!("engine is busy; keeping the previous value");
                let revision = self.revision.clone();
                untracked(|| self.slot.write_or_defer(move |_| revision.notify()));
                previous
            }
            (None, None) => self.read(&read),
        };
        *last = Some(value.clone());
        value
    }
}

/// Reactive adapter that creates derived cells on first access.
///
/// The engine is constructed by the first access of any kind (a cell read, a query, a command) or
/// when the options first resolve a scroll container. It is updated in place whenever the options
/// signal changes and attached to the scroll container whenever the resolved container changes.
/// Every cell re-derives from a single revision marker that is notified after option updates and
/// on every engine `on_change`.
///
/// State cells are cached per property and shared by every reader. Factory cells
/// ([`LazyVirtualizer::offset_for_index`] and friends) belong to the caller and stop tracking the
/// engine when the last clone is dropped.
///
/// # Panics
///
/// Calling commands, [`LazyVirtualizer::with_engine`], or reading a cell for the first time from
/// inside the engine's `on_change` panics, because the command that fired the callback still
/// holds the engine. Use the instance passed to `on_change`. Option updates and cells that
/// already hold a value wait for the command to finish instead.
pub struct LazyVirtualizer<E: Engine> {
    inner: Arc<LazyInner<E>>,
    cells: RefCell<HashMap<Property, Box<dyn Any>>>,
    // Dropping these unsubscribes them.
    _effects: [Effect; 2],
    mount: MountScheduler,
}

impl<E: Engine> LazyVirtualizer<E> {
    pub fn new(options: ReadSignal<E::Options>) -> Self {
        let inner = Arc::new(LazyInner {
            slot: Arc::new(EngineSlot::<E>::new()),
            options,
            revision: Trigger::new(),
        });

        let sync_options = untracked(|| {
            let inner = Arc::clone(&inner);
            Effect::new(move || {
                let options = inner.options.get();
                untracked(|| {
                    // An empty slot picks up the current options when it is first needed.
                    if !inner.slot.is_populated() {
                        return;
                    }
                    vtrace!("forwarding options to the engine");
                    let options = inner.wire(options);
                    let revision = inner.revision.clone();
                    inner.slot.write_or_defer(move |engine| {
                        engine.set_options(options);
                        revision.notify();
                    });
                });
            })
        });

        let resolved_element = {
            let options = inner.options.clone();
            ReadSignal::computed(move || options.with(E::scroll_element_of))
        };
        let attach = untracked(|| {
            let inner = Arc::clone(&inner);
            Effect::new(move || {
                if resolved_element.get().is_some() {
                    untracked(|| {
                        inner.ensure();
                        inner.slot.write_or_defer(E::will_update);
                    });
                }
            })
        });

        let mount = MountScheduler::new(Arc::clone(&inner.slot));
        Self {
            inner,
            cells: RefCell::new(HashMap::new()),
            _effects: [sync_options, attach],
            mount,
        }
    }

    fn state_cell<T: Clone + PartialEq + Send + Sync + 'static>(
        &self,
        property: Property,
        read: fn(&E) -> T,
    ) -> ReadSignal<T> {
        self.cell(property, || {
            let inner = Arc::clone(&self.inner);
            let mut last = None;
            ReadSignal::lazy(move || inner.derive(read, &mut last))
        })
    }

    fn cell<T: 'static>(
        &self,
        property: Property,
        create: impl FnOnce() -> ReadSignal<T>,
    ) -> ReadSignal<T> {
        debug_assert_eq!(property.capability(), Capability::State);
        if let Some(cell) = self
            .cells
            .borrow()
            .get(&property)
            .and_then(|cell| cell.downcast_ref::<ReadSignal<T>>())
        {
            return cell.clone();
        }
        self.inner.ensure();
        let cell = create();
        vtrace!(property = property.name(), "created state cell");
        self.cells
            .borrow_mut()
            .insert(property, Box::new(cell.clone()));
        cell
    }

    fn factory_cell<T: Clone + PartialEq + Send + Sync + 'static>(
        &self,
        property: Property,
        read: impl Fn(&E) -> T + Send + 'static,
    ) -> ReadSignal<T> {
        debug_assert_eq!(property.capability(), Capability::Factory);
        self.inner.ensure();
        let inner = Arc::clone(&self.inner);
        let mut last = None;
        ReadSignal::lazy(move || inner.derive(&read, &mut last))
    }

    /// Whether a state cell for `property` has been created.
    pub fn is_cached(&self, property: Property) -> bool {
        self.cells.borrow().contains_key(&property)
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_mounted()
    }

    /// The options signal this adapter follows.
    pub fn options_source(&self) -> ReadSignal<E::Options> {
        self.inner.options.clone()
    }

    /// Reads the engine directly, constructing it first if needed. Reads are not tracked.
    pub fn with_engine<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        untracked(|| self.inner.read(f))
    }

    pub fn total_size(&self) -> ReadSignal<u64> {
        self.state_cell(Property::TotalSize, E::total_size)
    }

    pub fn virtual_items(&self) -> ReadSignal<Arc<[VirtualItem<E::Key>]>> {
        self.state_cell(Property::VirtualItems, |engine| engine.virtual_items().into())
    }

    pub fn range(&self) -> ReadSignal<Option<VirtualRange>> {
        self.state_cell(Property::Range, E::range)
    }

    pub fn is_scrolling(&self) -> ReadSignal<bool> {
        self.state_cell(Property::IsScrolling, E::is_scrolling)
    }

    pub fn scroll_direction(&self) -> ReadSignal<Option<ScrollDirection>> {
        self.state_cell(Property::ScrollDirection, E::scroll_direction)
    }

    pub fn scroll_offset(&self) -> ReadSignal<u64> {
        self.state_cell(Property::ScrollOffset, E::scroll_offset)
    }

    pub fn scroll_rect(&self) -> ReadSignal<Rect> {
        self.state_cell(Property::ScrollRect, E::scroll_rect)
    }

    /// The container the engine is attached to.
    pub fn scroll_element(&self) -> ReadSignal<Option<E::Element>> {
        self.state_cell(Property::ScrollElement, E::scroll_element)
    }

    /// The options the engine currently holds. Notifies on every revision.
    pub fn options(&self) -> ReadSignal<E::Options> {
        self.cell(Property::Options, || {
            let inner = Arc::clone(&self.inner);
            let mut last = None;
            ReadSignal::always(move || {
                inner.derive(|engine: &E| engine.options().clone(), &mut last)
            })
        })
    }

    pub fn offset_for_index(&self, index: usize, align: Align) -> ReadSignal<Option<(u64, Align)>> {
        self.factory_cell(Property::OffsetForIndex, move |engine| {
            engine.offset_for_index(index, align)
        })
    }

    pub fn offset_for_alignment(&self, to_offset: u64, align: Align) -> ReadSignal<u64> {
        self.factory_cell(Property::OffsetForAlignment, move |engine| {
            engine.offset_for_alignment(to_offset, align)
        })
    }

    pub fn virtual_item_for_offset(&self, offset: u64) -> ReadSignal<Option<VirtualItem<E::Key>>> {
        self.factory_cell(Property::VirtualItemForOffset, move |engine| {
            engine.virtual_item_for_offset(offset)
        })
    }

    pub fn scroll_to_offset(&self, offset: u64, options: ScrollToOptions) {
        self.inner.write(|engine| engine.scroll_to_offset(offset, options));
    }

    pub fn scroll_to_index(&self, index: usize, options: ScrollToOptions) {
        self.inner.write(|engine| engine.scroll_to_index(index, options));
    }

    pub fn scroll_by(&self, delta: i64, behavior: ScrollBehavior) {
        self.inner.write(|engine| engine.scroll_by(delta, behavior));
    }

    pub fn measure(&self) {
        self.inner.write(E::measure);
    }

    pub fn measure_element<I: ItemElement>(&self, element: &I) {
        self.inner.write(|engine| engine.measure_element(element));
    }

    pub fn resize_item(&self, index: usize, size: u32) {
        self.inner.write(|engine| engine.resize_item(index, size));
    }

    pub fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize> {
        self.with_engine(|engine| engine.index_from_element(element))
    }

    pub fn handle_scroll(&self, offset: u64, now_ms: u64) {
        self.inner.write(|engine| engine.handle_scroll(offset, now_ms));
    }

    pub fn handle_resize(&self, size: SurfaceSize) {
        self.inner.write(|engine| engine.handle_resize(size));
    }

    pub fn tick(&self, now_ms: u64) -> Option<u64> {
        self.inner.write(|engine| engine.tick(now_ms))
    }
}
