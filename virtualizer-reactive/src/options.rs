use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use virtualizer::{InitialOffset, ItemKey, RangeExtractor, Rect, Virtualizer, VirtualizerOptions};
use virtualizer_adapter::Easing;

use crate::element::{ScrollTarget, resolve_scroll_element};
use crate::{ElementVirtualizer, OnChange, ScrollSurface};

/// Configuration for [`ElementVirtualizer`].
///
/// Mirrors `virtualizer::VirtualizerOptions` plus the host-facing fields (scroll target, axis,
/// smooth scrolling, `on_change` with access to the element-aware engine). Closures are stored
/// behind `Arc`, so cloning is cheap and re-deriving a record with the same closures keeps
/// the engine's estimates and measurements.
pub struct ElementOptions<S, K = ItemKey> {
    pub count: usize,
    pub estimate_size: Arc<dyn Fn(usize) -> u32 + Send + Sync>,
    pub get_item_key: Arc<dyn Fn(usize) -> K + Send + Sync>,
    /// Optional index selection hook (pinned/sticky rows).
    pub range_extractor: Option<RangeExtractor>,
    pub enabled: bool,
    pub overscan: usize,
    pub scroll_element: ScrollTarget<S>,
    /// Virtualize along the x axis instead of the y axis.
    pub horizontal: bool,
    pub padding_start: u32,
    pub padding_end: u32,
    pub scroll_padding_start: u32,
    pub scroll_padding_end: u32,
    /// Where the list starts inside the scroll container (e.g. below a page header when the
    /// window scrolls).
    pub scroll_margin: u32,
    pub gap: u32,
    /// Initial scroll offset. `None` reads the scroll container's current offset, or 0 when the
    /// container is not available yet.
    pub initial_offset: Option<InitialOffset>,
    /// Viewport size to assume before the scroll container has been measured.
    pub initial_rect: Option<Rect>,
    pub is_scrolling_reset_delay_ms: u64,
    pub smooth_scroll_duration_ms: u64,
    pub smooth_scroll_easing: Easing,
    pub on_change: Option<OnChange<ElementVirtualizer<S, K>>>,
}

impl<S: ScrollSurface> ElementOptions<S, ItemKey> {
    /// Creates options for a list keyed by index.
    pub fn new(count: usize, estimate_size: impl Fn(usize) -> u32 + Send + Sync + 'static) -> Self {
        Self::new_with_key(count, estimate_size, |i| i as ItemKey)
    }
}

impl<S: ScrollSurface, K> ElementOptions<S, K> {
    pub fn new_with_key(
        count: usize,
        estimate_size: impl Fn(usize) -> u32 + Send + Sync + 'static,
        get_item_key: impl Fn(usize) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            count,
            estimate_size: Arc::new(estimate_size),
            get_item_key: Arc::new(get_item_key),
            range_extractor: None,
            enabled: true,
            overscan: 1,
            scroll_element: ScrollTarget::None,
            horizontal: false,
            padding_start: 0,
            padding_end: 0,
            scroll_padding_start: 0,
            scroll_padding_end: 0,
            scroll_margin: 0,
            gap: 0,
            initial_offset: None,
            initial_rect: None,
            is_scrolling_reset_delay_ms: 150,
            smooth_scroll_duration_ms: 300,
            smooth_scroll_easing: Easing::EaseInOutCubic,
            on_change: None,
        }
    }

    pub fn with_scroll_element(mut self, target: impl Into<ScrollTarget<S>>) -> Self {
        self.scroll_element = target.into();
        self
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_horizontal(mut self, horizontal: bool) -> Self {
        self.horizontal = horizontal;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_padding(mut self, padding_start: u32, padding_end: u32) -> Self {
        self.padding_start = padding_start;
        self.padding_end = padding_end;
        self
    }

    pub fn with_scroll_padding(mut self, scroll_padding_start: u32, scroll_padding_end: u32) -> Self {
        self.scroll_padding_start = scroll_padding_start;
        self.scroll_padding_end = scroll_padding_end;
        self
    }

    pub fn with_scroll_margin(mut self, scroll_margin: u32) -> Self {
        self.scroll_margin = scroll_margin;
        self
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_initial_offset(mut self, initial_offset: u64) -> Self {
        self.initial_offset = Some(InitialOffset::Value(initial_offset));
        self
    }

    pub fn with_initial_rect(mut self, initial_rect: Rect) -> Self {
        self.initial_rect = Some(initial_rect);
        self
    }

    pub fn with_range_extractor(
        mut self,
        extractor: impl Fn(virtualizer::Range, &mut dyn FnMut(usize)) + Send + Sync + 'static,
    ) -> Self {
        self.range_extractor = Some(Arc::new(extractor));
        self
    }

    pub fn with_is_scrolling_reset_delay_ms(mut self, delay_ms: u64) -> Self {
        self.is_scrolling_reset_delay_ms = delay_ms;
        self
    }

    pub fn with_smooth_scroll(mut self, duration_ms: u64, easing: Easing) -> Self {
        self.smooth_scroll_duration_ms = duration_ms;
        self.smooth_scroll_easing = easing;
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: impl Fn(&ElementVirtualizer<S, K>, bool) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Arc::new(on_change));
        self
    }

    /// Falls back to `window` when no scroll target was configured.
    pub fn with_window_defaults(mut self, window: &S) -> Self {
        if self.scroll_element.is_none() {
            self.scroll_element = ScrollTarget::Window(window.clone());
        }
        self
    }

    /// The scroll container this record currently resolves to.
    pub fn resolve_scroll_element(&self) -> Option<S> {
        resolve_scroll_element(&self.scroll_element)
    }

    /// Builds the options for the inner `virtualizer::Virtualizer`.
    ///
    /// Closure `Arc`s are shared, not rebuilt, so `Virtualizer::set_options` can tell that the
    /// estimate and key functions did not change. Inner notifications only raise `changed`; the
    /// element-aware engine reports them through its own `on_change`.
    pub(crate) fn to_list_options(
        &self,
        initial_offset: InitialOffset,
        initial_rect: Option<Rect>,
        changed: &Arc<AtomicBool>,
    ) -> VirtualizerOptions<K>
    where
        K: 'static,
    {
        let changed = Arc::clone(changed);
        let on_change: virtualizer::OnChangeCallback<K> =
            Arc::new(move |_: &Virtualizer<K>, _: bool| changed.store(true, Ordering::Release));
        VirtualizerOptions {
            count: self.count,
            estimate_size: Arc::clone(&self.estimate_size),
            get_item_key: Arc::clone(&self.get_item_key),
            range_extractor: self.range_extractor.clone(),
            enabled: self.enabled,
            overscan: self.overscan,
            initial_rect,
            padding_start: self.padding_start,
            padding_end: self.padding_end,
            scroll_padding_start: self.scroll_padding_start,
            scroll_padding_end: self.scroll_padding_end,
            scroll_margin: self.scroll_margin,
            initial_offset,
            on_change: Some(on_change),
            use_scrollend_event: false,
            is_scrolling_reset_delay_ms: self.is_scrolling_reset_delay_ms,
            should_adjust_scroll_position_on_item_size_change: None,
            gap: self.gap,
        }
    }
}

impl<S: Clone, K> Clone for ElementOptions<S, K> {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            estimate_size: Arc::clone(&self.estimate_size),
            get_item_key: Arc::clone(&self.get_item_key),
            range_extractor: self.range_extractor.clone(),
            enabled: self.enabled,
            overscan: self.overscan,
            scroll_element: self.scroll_element.clone(),
            horizontal: self.horizontal,
            padding_start: self.padding_start,
            padding_end: self.padding_end,
            scroll_padding_start: self.scroll_padding_start,
            scroll_padding_end: self.scroll_padding_end,
            scroll_margin: self.scroll_margin,
            gap: self.gap,
            initial_offset: self.initial_offset.clone(),
            initial_rect: self.initial_rect,
            is_scrolling_reset_delay_ms: self.is_scrolling_reset_delay_ms,
            smooth_scroll_duration_ms: self.smooth_scroll_duration_ms,
            smooth_scroll_easing: self.smooth_scroll_easing,
            on_change: self.on_change.clone(),
        }
    }
}

impl<S: fmt::Debug, K> fmt::Debug for ElementOptions<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementOptions")
            .field("count", &self.count)
            .field("enabled", &self.enabled)
            .field("overscan", &self.overscan)
            .field("scroll_element", &self.scroll_element)
            .field("horizontal", &self.horizontal)
            .field("padding_start", &self.padding_start)
            .field("padding_end", &self.padding_end)
            .field("scroll_margin", &self.scroll_margin)
            .field("gap", &self.gap)
            .field("initial_offset", &self.initial_offset)
            .field("initial_rect", &self.initial_rect)
            .field("smooth_scroll_duration_ms", &self.smooth_scroll_duration_ms)
            .finish_non_exhaustive()
    }
}
