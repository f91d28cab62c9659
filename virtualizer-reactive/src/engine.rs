use std::fmt;
use std::sync::Arc;

use virtualizer::{Align, Rect, ScrollDirection, VirtualRange};

use crate::{ItemElement, ScrollBehavior, ScrollToOptions, SurfaceSize, VirtualItem};

/// Change notification fired by an engine: `(instance, is_scrolling)`.
pub type OnChange<E> = Arc<dyn Fn(&E, bool) + Send + Sync>;

/// The imperative virtualization engine the adapters drive.
///
/// Adapters own exactly one instance per adapter, construct it from an options record, update it
/// in place with [`Engine::set_options`], and learn about state changes through the options
/// record's `on_change` callback. Everything else is plain method calls.
///
/// The adapters keep the engine and everything derived from it in signal cells, which must be
/// `Send`; the instance itself is only ever touched by one thread at a time.
///
/// [`crate::ElementVirtualizer`] is the production implementation.
pub trait Engine: Sized + Send + 'static {
    type Options: Clone + Send + Sync + 'static;
    /// The scroll container type. Equality is identity.
    type Element: Clone + PartialEq + Send + Sync + 'static;
    type Key: Clone + PartialEq + Send + Sync + 'static;

    fn new(options: Self::Options) -> Self;

    /// Replaces the options in place. Must not discard measurements or scroll state that the new
    /// options do not invalidate.
    fn set_options(&mut self, options: Self::Options);

    fn options(&self) -> &Self::Options;

    /// The scroll container an options record currently resolves to.
    fn scroll_element_of(options: &Self::Options) -> Option<Self::Element>;

    fn on_change_of(options: &Self::Options) -> Option<OnChange<Self>>;

    fn with_on_change(options: Self::Options, on_change: OnChange<Self>) -> Self::Options;

    /// Called once, after the host completed its first render with this engine.
    fn did_mount(&mut self);

    /// Called when the resolved scroll container may have changed.
    fn will_update(&mut self);

    fn total_size(&self) -> u64;

    fn virtual_items(&self) -> Vec<VirtualItem<Self::Key>>;

    /// The visible index range, or `None` when nothing is visible.
    fn range(&self) -> Option<VirtualRange>;

    fn is_scrolling(&self) -> bool;

    fn scroll_direction(&self) -> Option<ScrollDirection>;

    fn scroll_offset(&self) -> u64;

    fn scroll_rect(&self) -> Rect;

    /// The scroll container the engine is currently attached to.
    fn scroll_element(&self) -> Option<Self::Element>;

    /// The offset that brings `index` into view with `align`, and the alignment that was
    /// actually used (`Auto` resolves to `Start` or `End`, or stays `Auto` when no scroll is
    /// needed).
    fn offset_for_index(&self, index: usize, align: Align) -> Option<(u64, Align)>;

    fn offset_for_alignment(&self, to_offset: u64, align: Align) -> u64;

    fn virtual_item_for_offset(&self, offset: u64) -> Option<VirtualItem<Self::Key>>;

    fn scroll_to_offset(&mut self, offset: u64, options: ScrollToOptions);

    fn scroll_to_index(&mut self, index: usize, options: ScrollToOptions);

    fn scroll_by(&mut self, delta: i64, behavior: ScrollBehavior);

    /// Drops every measurement and falls back to estimates.
    fn measure(&mut self);

    fn resize_item(&mut self, index: usize, size: u32);

    fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize>;

    fn measure_element<I: ItemElement>(&mut self, element: &I);

    /// The scroll container reported a new scroll position.
    fn handle_scroll(&mut self, offset: u64, now_ms: u64);

    /// The scroll container reported a new size.
    fn handle_resize(&mut self, size: SurfaceSize);

    /// Advances time-driven state (smooth scrolling, `is_scrolling` debouncing).
    ///
    /// Returns the offset applied by an active smooth scroll, if any.
    fn tick(&mut self, now_ms: u64) -> Option<u64>;
}

/// An ordered list of change observers, folded into a single engine callback.
///
/// Observers run in insertion order. Adapters push their own synchronization handler first and
/// the consumer's callback second, so consumers always see adapter state that already reflects
/// the change.
pub struct ChangeObservers<E> {
    observers: Vec<OnChange<E>>,
}

impl<E: 'static> ChangeObservers<E> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn push(&mut self, observer: OnChange<E>) {
        self.observers.push(observer);
    }

    pub fn with(mut self, observer: impl Fn(&E, bool) + Send + Sync + 'static) -> Self {
        self.push(Arc::new(observer));
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&self, instance: &E, is_scrolling: bool) {
        for observer in &self.observers {
            observer(instance, is_scrolling);
        }
    }

    pub fn into_on_change(self) -> OnChange<E> {
        Arc::new(move |instance: &E, is_scrolling: bool| self.notify(instance, is_scrolling))
    }
}

impl<E: 'static> Default for ChangeObservers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ChangeObservers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeObservers")
            .field("len", &self.observers.len())
            .finish()
    }
}

/// Wraps an engine's configured `on_change` so `first` runs before it.
pub(crate) fn wire_on_change<E: Engine>(
    options: E::Options,
    first: impl Fn(&E, bool) + Send + Sync + 'static,
) -> E::Options {
    let mut observers = ChangeObservers::new().with(first);
    if let Some(user) = E::on_change_of(&options) {
        observers.push(user);
    }
    E::with_on_change(options, observers.into_on_change())
}
