use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use virtualizer::{
    Align, InitialOffset, ItemKey, KeyCacheKey, Rect, ScrollDirection, VirtualRange, Virtualizer,
};
use virtualizer_adapter::Tween;

use crate::{
    ElementOptions, Engine, ItemElement, OnChange, ScrollBehavior, ScrollSurface, ScrollToOptions,
    SurfaceSize, VirtualItem,
};

/// Key types usable with [`ElementVirtualizer`].
pub trait VirtualizerKey: KeyCacheKey + Clone + Send + Sync + 'static {}

impl<K: KeyCacheKey + Clone + Send + Sync + 'static> VirtualizerKey for K {}

/// An element-aware engine built on `virtualizer::Virtualizer`.
///
/// It owns the headless virtualizer and adds what a host integration needs:
///
/// - attaching to a scroll container resolved from the options (`will_update`)
/// - TanStack-style alignment for programmatic scrolling, pushed back to the container
/// - smooth scrolling driven by `tick(now_ms)`
/// - measuring rendered item elements
///
/// State changes are reported through the options' `on_change`, once per mutating call.
pub struct ElementVirtualizer<S, K = ItemKey> {
    list: Virtualizer<K>,
    options: ElementOptions<S, K>,
    scroll_element: Option<S>,
    mounted: bool,
    pending_smooth: Option<u64>,
    tween: Option<Tween>,
    changed: Arc<AtomicBool>,
}

impl<S: ScrollSurface, K: VirtualizerKey> ElementVirtualizer<S, K> {
    pub fn new(options: ElementOptions<S, K>) -> Self {
        let changed = Arc::new(AtomicBool::new(false));
        let initial_offset = options.initial_offset.clone().unwrap_or_else(|| {
            let offset = options
                .resolve_scroll_element()
                .map_or(0, |el| el.scroll_offset(options.horizontal));
            InitialOffset::Value(offset)
        });
        let list = Virtualizer::new(options.to_list_options(
            initial_offset,
            options.initial_rect,
            &changed,
        ));
        vdebug!(count = options.count, "ElementVirtualizer::new");
        Self {
            list,
            options,
            scroll_element: None,
            mounted: false,
            pending_smooth: None,
            tween: None,
            changed,
        }
    }

    pub fn options(&self) -> &ElementOptions<S, K> {
        &self.options
    }

    /// Updates the options in place.
    ///
    /// The measurement cache and the current scroll position survive; estimates are rebuilt only
    /// when the count or the estimate/key closures changed.
    pub fn set_options(&mut self, options: ElementOptions<S, K>) {
        let initial_offset = match &options.initial_offset {
            Some(initial_offset) => initial_offset.clone(),
            None => self.list.options().initial_offset.clone(),
        };
        let initial_rect = options.initial_rect.or(self.list.options().initial_rect);
        let list = options.to_list_options(initial_offset, initial_rect, &self.changed);
        // Re-enabling resets the inner virtualizer to its initial rect.
        let needs_surface = options.horizontal != self.options.horizontal
            || (options.enabled && !self.list.enabled());
        self.options = options;
        self.list.set_options(list);
        if needs_surface {
            self.remeasure_surface();
        }
        vtrace!(count = self.options.count, "ElementVirtualizer::set_options");
        self.emit();
    }

    pub fn list(&self) -> &Virtualizer<K> {
        &self.list
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some() || self.pending_smooth.is_some()
    }

    pub fn scroll_element(&self) -> Option<S> {
        self.scroll_element.clone()
    }

    pub fn did_mount(&mut self) {
        vdebug!("ElementVirtualizer::did_mount");
        self.mounted = true;
        self.will_update();
    }

    /// Re-resolves the scroll container and attaches to it if it changed.
    pub fn will_update(&mut self) {
        let next = self.options.resolve_scroll_element();
        if next == self.scroll_element {
            return;
        }
        vdebug!(attached = next.is_some(), "scroll element changed");
        self.scroll_element = next;
        self.pending_smooth = None;
        self.tween = None;
        if !self.remeasure_surface() {
            self.list.set_scroll_rect(Rect::default());
        }
        self.changed.store(true, Ordering::Release);
        self.emit();
    }

    // Reads viewport geometry and scroll position from the attached container.
    fn remeasure_surface(&mut self) -> bool {
        let horizontal = self.options.horizontal;
        let Some(surface) = &self.scroll_element else {
            return false;
        };
        let rect = surface.size().to_rect(horizontal);
        let offset = surface.scroll_offset(horizontal);
        self.list.batch_update(|v| {
            v.set_scroll_rect(rect);
            v.set_scroll_offset(offset);
        });
        true
    }

    pub fn total_size(&self) -> u64 {
        self.list.total_size()
    }

    pub fn virtual_items(&self) -> Vec<VirtualItem<K>> {
        let mut items = Vec::new();
        self.list
            .for_each_virtual_item_keyed(|item| items.push(VirtualItem::from(item)));
        items
    }

    pub fn range(&self) -> Option<VirtualRange> {
        let range = self.list.visible_range();
        (!range.is_empty()).then_some(range)
    }

    pub fn is_scrolling(&self) -> bool {
        self.list.is_scrolling()
    }

    pub fn scroll_direction(&self) -> Option<ScrollDirection> {
        self.list.scroll_direction()
    }

    pub fn scroll_offset(&self) -> u64 {
        self.list.scroll_offset()
    }

    pub fn scroll_rect(&self) -> Rect {
        self.list.scroll_rect()
    }

    pub fn offset_for_alignment(&self, to_offset: u64, align: Align) -> u64 {
        self.align_offset(to_offset, align, 0)
    }

    fn align_offset(&self, to_offset: u64, align: Align, item_size: u32) -> u64 {
        let view = self.list.viewport_size() as u64;
        let align = match align {
            Align::Auto if to_offset >= self.list.scroll_offset().saturating_add(view) => Align::End,
            Align::Auto => Align::Start,
            align => align,
        };
        let target = match align {
            Align::Center => to_offset
                .saturating_add(item_size as u64 / 2)
                .saturating_sub(view / 2),
            Align::End => to_offset.saturating_sub(view),
            Align::Start | Align::Auto => to_offset,
        };
        self.list.clamp_scroll_offset(target)
    }

    pub fn offset_for_index(&self, index: usize, align: Align) -> Option<(u64, Align)> {
        let count = self.list.count();
        if count == 0 {
            return None;
        }
        let index = index.min(count - 1);
        let start = self.list.item_start(index)?;
        let size = self.list.item_size(index)?;
        let end = start.saturating_add(size as u64);

        let scroll = self.list.scroll_offset();
        let view = self.list.viewport_size() as u64;
        let sp_start = self.options.scroll_padding_start as u64;
        let sp_end = self.options.scroll_padding_end as u64;

        let align = match align {
            Align::Auto => {
                if end >= scroll.saturating_add(view).saturating_sub(sp_end) {
                    Align::End
                } else if start <= scroll.saturating_add(sp_start) {
                    Align::Start
                } else {
                    return Some((scroll, Align::Auto));
                }
            }
            align => align,
        };
        let to_offset = match align {
            Align::End => end.saturating_add(sp_end),
            _ => start.saturating_sub(sp_start),
        };
        Some((self.align_offset(to_offset, align, size), align))
    }

    pub fn virtual_item_for_offset(&self, offset: u64) -> Option<VirtualItem<K>> {
        self.list
            .virtual_item_keyed_for_offset(offset)
            .map(VirtualItem::from)
    }

    pub fn scroll_to_offset(&mut self, offset: u64, options: ScrollToOptions) {
        let target = self.offset_for_alignment(offset, options.align);
        self.apply_scroll(target, options.behavior);
    }

    pub fn scroll_to_index(&mut self, index: usize, options: ScrollToOptions) {
        let Some((target, _)) = self.offset_for_index(index, options.align) else {
            return;
        };
        self.apply_scroll(target, options.behavior);
    }

    pub fn scroll_by(&mut self, delta: i64, behavior: ScrollBehavior) {
        let current = self.list.scroll_offset();
        let target = if delta >= 0 {
            current.saturating_add(delta as u64)
        } else {
            current.saturating_sub(delta.unsigned_abs())
        };
        self.apply_scroll(target, behavior);
    }

    fn apply_scroll(&mut self, target: u64, behavior: ScrollBehavior) {
        let target = self.list.clamp_scroll_offset(target);
        if behavior == ScrollBehavior::Smooth && self.options.smooth_scroll_duration_ms > 0 {
            vtrace!(target, "smooth scroll requested");
            self.pending_smooth = Some(target);
            return;
        }
        self.pending_smooth = None;
        self.tween = None;
        self.list.set_scroll_offset(target);
        self.push_offset_to_surface();
        self.emit();
    }

    fn push_offset_to_surface(&self) {
        if let Some(surface) = &self.scroll_element {
            surface.scroll_to(
                self.list.scroll_offset(),
                self.options.horizontal,
                ScrollBehavior::Auto,
            );
        }
    }

    pub fn measure(&mut self) {
        self.list.reset_measurements();
        self.emit();
    }

    pub fn resize_item(&mut self, index: usize, size: u32) {
        let applied = self.list.resize_item(index, size);
        if applied != 0 {
            vtrace!(index, applied, "scroll adjusted for resized item");
            self.push_offset_to_surface();
        }
        self.emit();
    }

    pub fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize> {
        let index = element.data_index();
        if index.is_none() {
            vwarn!("measured element has no data index");
        }
        index
    }

    pub fn measure_element<I: ItemElement>(&mut self, element: &I) {
        let Some(index) = self.index_from_element(element) else {
            return;
        };
        let size = element.size().main(self.options.horizontal);
        self.resize_item(index, size);
    }

    pub fn handle_scroll(&mut self, offset: u64, now_ms: u64) {
        self.pending_smooth = None;
        self.tween = None;
        self.list.apply_scroll_offset_event(offset, now_ms);
        self.emit();
    }

    pub fn handle_resize(&mut self, size: SurfaceSize) {
        self.list
            .apply_scroll_rect_event(size.to_rect(self.options.horizontal));
        self.emit();
    }

    /// Advances smooth scrolling and `is_scrolling` debouncing.
    ///
    /// Returns the offset applied by an active smooth scroll; the offset has already been pushed
    /// to the scroll container.
    pub fn tick(&mut self, now_ms: u64) -> Option<u64> {
        if let Some(target) = self.pending_smooth.take() {
            self.tween = Some(Tween::new(
                self.list.scroll_offset(),
                target,
                now_ms,
                self.options.smooth_scroll_duration_ms,
                self.options.smooth_scroll_easing,
            ));
        }
        let Some(tween) = self.tween else {
            self.list.update_scrolling(now_ms);
            self.emit();
            return None;
        };

        self.list
            .apply_scroll_offset_event_clamped(tween.sample(now_ms), now_ms);
        if tween.is_done(now_ms) {
            self.tween = None;
            self.list.set_is_scrolling(false);
        }
        self.push_offset_to_surface();
        self.emit();
        Some(self.list.scroll_offset())
    }

    fn emit(&self) {
        if !self.changed.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(on_change) = &self.options.on_change {
            on_change(self, self.list.is_scrolling());
        }
    }
}

impl<S: fmt::Debug, K> fmt::Debug for ElementVirtualizer<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementVirtualizer")
            .field("options", &self.options)
            .field("scroll_element", &self.scroll_element)
            .field("mounted", &self.mounted)
            .field("tween", &self.tween)
            .finish_non_exhaustive()
    }
}

impl<S: ScrollSurface, K: VirtualizerKey> Engine for ElementVirtualizer<S, K> {
    type Options = ElementOptions<S, K>;
    type Element = S;
    type Key = K;

    fn new(options: Self::Options) -> Self {
        ElementVirtualizer::new(options)
    }

    fn set_options(&mut self, options: Self::Options) {
        ElementVirtualizer::set_options(self, options);
    }

    fn options(&self) -> &Self::Options {
        &self.options
    }

    fn scroll_element_of(options: &Self::Options) -> Option<S> {
        options.resolve_scroll_element()
    }

    fn on_change_of(options: &Self::Options) -> Option<OnChange<Self>> {
        options.on_change.clone()
    }

    fn with_on_change(mut options: Self::Options, on_change: OnChange<Self>) -> Self::Options {
        options.on_change = Some(on_change);
        options
    }

    fn did_mount(&mut self) {
        ElementVirtualizer::did_mount(self);
    }

    fn will_update(&mut self) {
        ElementVirtualizer::will_update(self);
    }

    fn total_size(&self) -> u64 {
        ElementVirtualizer::total_size(self)
    }

    fn virtual_items(&self) -> Vec<VirtualItem<K>> {
        ElementVirtualizer::virtual_items(self)
    }

    fn range(&self) -> Option<VirtualRange> {
        ElementVirtualizer::range(self)
    }

    fn is_scrolling(&self) -> bool {
        ElementVirtualizer::is_scrolling(self)
    }

    fn scroll_direction(&self) -> Option<ScrollDirection> {
        ElementVirtualizer::scroll_direction(self)
    }

    fn scroll_offset(&self) -> u64 {
        ElementVirtualizer::scroll_offset(self)
    }

    fn scroll_rect(&self) -> Rect {
        ElementVirtualizer::scroll_rect(self)
    }

    fn scroll_element(&self) -> Option<S> {
        ElementVirtualizer::scroll_element(self)
    }

    fn offset_for_index(&self, index: usize, align: Align) -> Option<(u64, Align)> {
        ElementVirtualizer::offset_for_index(self, index, align)
    }

    fn offset_for_alignment(&self, to_offset: u64, align: Align) -> u64 {
        ElementVirtualizer::offset_for_alignment(self, to_offset, align)
    }

    fn virtual_item_for_offset(&self, offset: u64) -> Option<VirtualItem<K>> {
        ElementVirtualizer::virtual_item_for_offset(self, offset)
    }

    fn scroll_to_offset(&mut self, offset: u64, options: ScrollToOptions) {
        ElementVirtualizer::scroll_to_offset(self, offset, options);
    }

    fn scroll_to_index(&mut self, index: usize, options: ScrollToOptions) {
        ElementVirtualizer::scroll_to_index(self, index, options);
    }

    fn scroll_by(&mut self, delta: i64, behavior: ScrollBehavior) {
        ElementVirtualizer::scroll_by(self, delta, behavior);
    }

    fn measure(&mut self) {
        ElementVirtualizer::measure(self);
    }

    fn resize_item(&mut self, index: usize, size: u32) {
        ElementVirtualizer::resize_item(self, index, size);
    }

    fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize> {
        ElementVirtualizer::index_from_element(self, element)
    }

    fn measure_element<I: ItemElement>(&mut self, element: &I) {
        ElementVirtualizer::measure_element(self, element);
    }

    fn handle_scroll(&mut self, offset: u64, now_ms: u64) {
        ElementVirtualizer::handle_scroll(self, offset, now_ms);
    }

    fn handle_resize(&mut self, size: SurfaceSize) {
        ElementVirtualizer::handle_resize(self, size);
    }

    fn tick(&mut self, now_ms: u64) -> Option<u64> {
        ElementVirtualizer::tick(self, now_ms)
    }
}
