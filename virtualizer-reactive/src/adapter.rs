use std::sync::Arc;

use virtualizer::{Align, ScrollDirection, VirtualRange};
use virtualizer_signals::ReadSignal;

use crate::{
    EagerVirtualizer, ElementOptions, ElementVirtualizer, Engine, ItemElement, LazyVirtualizer,
    ScrollBehavior, ScrollSurface, ScrollToOptions, SurfaceSize, VirtualItem, VirtualizerKey,
};

/// The contract shared by [`LazyVirtualizer`] and [`EagerVirtualizer`].
///
/// Both follow an options signal, construct one engine and keep it for their whole lifetime,
/// forward option updates in place, attach the engine to the resolved scroll container, and call
/// `did_mount` once after the first render. State is exposed as signals; queries return plain
/// values computed from the engine's current state.
pub trait VirtualizerAdapter: Sized {
    type Engine: Engine;

    fn from_options(options: ReadSignal<<Self::Engine as Engine>::Options>) -> Self;

    fn is_mounted(&self) -> bool;

    fn with_engine<R>(&self, f: impl FnOnce(&Self::Engine) -> R) -> R;

    fn total_size(&self) -> ReadSignal<u64>;

    fn virtual_items(&self) -> ReadSignal<Arc<[VirtualItem<<Self::Engine as Engine>::Key>]>>;

    fn range(&self) -> ReadSignal<Option<VirtualRange>>;

    fn is_scrolling(&self) -> ReadSignal<bool>;

    fn scroll_direction(&self) -> ReadSignal<Option<ScrollDirection>>;

    fn scroll_offset(&self) -> ReadSignal<u64>;

    fn offset_for_index(&self, index: usize, align: Align) -> Option<(u64, Align)>;

    fn offset_for_alignment(&self, to_offset: u64, align: Align) -> u64;

    fn virtual_item_for_offset(
        &self,
        offset: u64,
    ) -> Option<VirtualItem<<Self::Engine as Engine>::Key>>;

    fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize>;

    fn scroll_to_offset(&self, offset: u64, options: ScrollToOptions);

    fn scroll_to_index(&self, index: usize, options: ScrollToOptions);

    fn scroll_by(&self, delta: i64, behavior: ScrollBehavior);

    fn measure(&self);

    fn measure_element<I: ItemElement>(&self, element: &I);

    fn resize_item(&self, index: usize, size: u32);

    fn handle_scroll(&self, offset: u64, now_ms: u64);

    fn handle_resize(&self, size: SurfaceSize);

    fn tick(&self, now_ms: u64) -> Option<u64>;
}

macro_rules! forward_adapter {
    ($ty:ident) => {
        impl<E: Engine> VirtualizerAdapter for $ty<E> {
            type Engine = E;

            fn from_options(options: ReadSignal<E::Options>) -> Self {
                $ty::new(options)
            }

            fn is_mounted(&self) -> bool {
                $ty::is_mounted(self)
            }

            fn with_engine<R>(&self, f: impl FnOnce(&E) -> R) -> R {
                $ty::with_engine(self, f)
            }

            fn total_size(&self) -> ReadSignal<u64> {
                $ty::total_size(self)
            }

            fn virtual_items(&self) -> ReadSignal<Arc<[VirtualItem<E::Key>]>> {
                $ty::virtual_items(self)
            }

            fn range(&self) -> ReadSignal<Option<VirtualRange>> {
                $ty::range(self)
            }

            fn is_scrolling(&self) -> ReadSignal<bool> {
                $ty::is_scrolling(self)
            }

            fn scroll_direction(&self) -> ReadSignal<Option<ScrollDirection>> {
                $ty::scroll_direction(self)
            }

            fn scroll_offset(&self) -> ReadSignal<u64> {
                $ty::scroll_offset(self)
            }

            fn offset_for_index(&self, index: usize, align: Align) -> Option<(u64, Align)> {
                self.with_engine(|engine| engine.offset_for_index(index, align))
            }

            fn offset_for_alignment(&self, to_offset: u64, align: Align) -> u64 {
                self.with_engine(|engine| engine.offset_for_alignment(to_offset, align))
            }

            fn virtual_item_for_offset(&self, offset: u64) -> Option<VirtualItem<E::Key>> {
                self.with_engine(|engine| engine.virtual_item_for_offset(offset))
            }

            fn index_from_element<I: ItemElement>(&self, element: &I) -> Option<usize> {
                $ty::index_from_element(self, element)
            }

            fn scroll_to_offset(&self, offset: u64, options: ScrollToOptions) {
                $ty::scroll_to_offset(self, offset, options);
            }

            fn scroll_to_index(&self, index: usize, options: ScrollToOptions) {
                $ty::scroll_to_index(self, index, options);
            }

            fn scroll_by(&self, delta: i64, behavior: ScrollBehavior) {
                $ty::scroll_by(self, delta, behavior);
            }

            fn measure(&self) {
                $ty::measure(self);
            }

            fn measure_element<I: ItemElement>(&self, element: &I) {
                $ty::measure_element(self, element);
            }

            fn resize_item(&self, index: usize, size: u32) {
                $ty::resize_item(self, index, size);
            }

            fn handle_scroll(&self, offset: u64, now_ms: u64) {
                $ty::handle_scroll(self, offset, now_ms);
            }

            fn handle_resize(&self, size: SurfaceSize) {
                $ty::handle_resize(self, size);
            }

            fn tick(&self, now_ms: u64) -> Option<u64> {
                $ty::tick(self, now_ms)
            }
        }
    };
}

forward_adapter!(LazyVirtualizer);
forward_adapter!(EagerVirtualizer);

/// Builds an adapter over an options factory.
///
/// `factory` runs inside a computed value, so every signal it reads is tracked and each change
/// produces a complete, re-defaulted options record. The adapter holds the only handle to that
/// value, so it stops tracking when the adapter is dropped.
pub fn create_adapter<A: VirtualizerAdapter>(
    factory: impl Fn() -> <A::Engine as Engine>::Options + Send + 'static,
) -> A {
    A::from_options(ReadSignal::always(factory))
}

/// Creates a lazy virtualizer scrolling inside an element.
///
/// ```
/// # use virtualizer_reactive::*;
/// # #[derive(Clone, PartialEq)] struct Panel;
/// # impl ScrollSurface for Panel {
/// #     fn size(&self) -> SurfaceSize { SurfaceSize::new(400, 300) }
/// #     fn scroll_offset(&self, _: bool) -> u64 { 0 }
/// #     fn scroll_to(&self, _: u64, _: bool, _: ScrollBehavior) {}
/// # }
/// let parent = ElementRef::<Panel>::new();
/// let rows = create_virtualizer({
///     let parent = parent.clone();
///     move || {
///         ElementOptions::new(10_000, |_| 35)
///             .with_overscan(5)
///             .with_scroll_element(parent.clone())
///     }
/// });
/// parent.mount(Panel);
/// virtualizer_signals::render();
///
/// assert_eq!(rows.total_size().get(), 350_000);
/// assert!(rows.is_mounted());
/// ```
pub fn create_virtualizer<S: ScrollSurface, K: VirtualizerKey>(
    factory: impl Fn() -> ElementOptions<S, K> + Send + 'static,
) -> LazyVirtualizer<ElementVirtualizer<S, K>> {
    create_adapter(factory)
}

/// Creates a lazy virtualizer that scrolls the window unless the factory picks another target.
///
/// The initial offset is read from `window` when the factory does not set one.
pub fn create_window_virtualizer<S: ScrollSurface, K: VirtualizerKey>(
    window: S,
    factory: impl Fn() -> ElementOptions<S, K> + Send + 'static,
) -> LazyVirtualizer<ElementVirtualizer<S, K>> {
    create_adapter(move || factory().with_window_defaults(&window))
}

/// Eager counterpart of [`create_virtualizer`].
pub fn create_eager_virtualizer<S: ScrollSurface, K: VirtualizerKey>(
    factory: impl Fn() -> ElementOptions<S, K> + Send + 'static,
) -> EagerVirtualizer<ElementVirtualizer<S, K>> {
    create_adapter(factory)
}

/// Eager counterpart of [`create_window_virtualizer`].
pub fn create_eager_window_virtualizer<S: ScrollSurface, K: VirtualizerKey>(
    window: S,
    factory: impl Fn() -> ElementOptions<S, K> + Send + 'static,
) -> EagerVirtualizer<ElementVirtualizer<S, K>> {
    create_adapter(move || factory().with_window_defaults(&window))
}
