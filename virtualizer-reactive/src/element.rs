//! Scroll surfaces, item elements and scroll-element resolution.
//!
//! A host exposes its scrollable container through [`ScrollSurface`] and its rendered rows through
//! [`ItemElement`]. Options records point at the scroll container with a [`ScrollTarget`], which
//! may be a surface itself, a window-like root surface, or a reference wrapper (anything
//! implementing [`NativeElement`], such as [`ElementRef`]) that only yields a surface once the
//! host has mounted it.

use std::fmt;
use std::sync::Arc;

use virtualizer::Rect;
use virtualizer_signals::Signal;

use crate::ScrollBehavior;

/// Size of a surface or element in pixels (or cells, for terminal hosts).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size along the virtualized axis.
    pub fn main(self, horizontal: bool) -> u32 {
        if horizontal { self.width } else { self.height }
    }

    pub(crate) fn to_rect(self, horizontal: bool) -> Rect {
        if horizontal {
            Rect {
                main: self.width,
                cross: self.height,
            }
        } else {
            Rect {
                main: self.height,
                cross: self.width,
            }
        }
    }
}

/// A scrollable container owned by the host.
///
/// Equality is identity: two values compare equal when they denote the same container, which is
/// what decides whether the engine has to re-attach.
pub trait ScrollSurface: Clone + PartialEq + Send + Sync + 'static {
    /// Current size of the visible area.
    fn size(&self) -> SurfaceSize;

    /// Current scroll position along the given axis.
    fn scroll_offset(&self, horizontal: bool) -> u64;

    /// Moves the container to `offset` along the given axis.
    fn scroll_to(&self, offset: u64, horizontal: bool, behavior: ScrollBehavior);
}

/// A rendered item that can be measured.
pub trait ItemElement {
    /// The item index the host attached to the element (`data-index`), if any.
    fn data_index(&self) -> Option<usize>;

    fn size(&self) -> SurfaceSize;
}

/// Anything that wraps an underlying element and can hand it out once it exists.
pub trait NativeElement<S>: Send + Sync {
    fn native_element(&self) -> Option<S>;
}

/// A reactive element reference, filled in by the host when the element is mounted.
///
/// Reads are tracked, so options derived from an `ElementRef` are re-derived when the element
/// appears or goes away. Clones refer to the same element.
pub struct ElementRef<S> {
    slot: Signal<Option<S>>,
}

impl<S> Clone for ElementRef<S> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for ElementRef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef").field("slot", &self.slot).finish()
    }
}

impl<S: Clone + PartialEq + Send + Sync + 'static> ElementRef<S> {
    pub fn new() -> Self {
        Self {
            slot: Signal::new(None),
        }
    }

    pub fn mount(&self, element: S) {
        self.slot.set(Some(element));
    }

    pub fn unmount(&self) {
        self.slot.set(None);
    }

    pub fn get(&self) -> Option<S> {
        self.slot.get()
    }
}

impl<S: Clone + PartialEq + Send + Sync + 'static> Default for ElementRef<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + PartialEq + Send + Sync + 'static> NativeElement<S> for ElementRef<S> {
    fn native_element(&self) -> Option<S> {
        self.slot.get()
    }
}

/// Where an options record says the scroll container is.
pub enum ScrollTarget<S> {
    /// No container yet. The engine treats this as "no measurements available".
    None,
    Element(S),
    /// The window (or a root surface). Window virtualizers default to this.
    Window(S),
    /// A reference wrapper resolved through [`NativeElement`].
    Ref(Arc<dyn NativeElement<S>>),
}

impl<S> ScrollTarget<S> {
    pub fn from_ref(reference: impl NativeElement<S> + 'static) -> Self {
        Self::Ref(Arc::new(reference))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl<S: Clone> Clone for ScrollTarget<S> {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Element(element) => Self::Element(element.clone()),
            Self::Window(window) => Self::Window(window.clone()),
            Self::Ref(reference) => Self::Ref(Arc::clone(reference)),
        }
    }
}

impl<S> Default for ScrollTarget<S> {
    fn default() -> Self {
        Self::None
    }
}

impl<S: fmt::Debug> fmt::Debug for ScrollTarget<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
            Self::Window(window) => f.debug_tuple("Window").field(window).finish(),
            Self::Ref(_) => f.write_str("Ref(..)"),
        }
    }
}

impl<S: Clone + PartialEq + Send + Sync + 'static> From<ElementRef<S>> for ScrollTarget<S> {
    fn from(reference: ElementRef<S>) -> Self {
        Self::from_ref(reference)
    }
}

/// Resolves a scroll target to the container it currently denotes.
///
/// Reference wrappers are unwrapped through their accessor; a wrapper whose element is not
/// mounted yet resolves to `None`, the same as an absent target.
pub fn resolve_scroll_element<S: Clone>(target: &ScrollTarget<S>) -> Option<S> {
    match target {
        ScrollTarget::None => None,
        ScrollTarget::Element(element) | ScrollTarget::Window(element) => Some(element.clone()),
        ScrollTarget::Ref(reference) => reference.native_element(),
    }
}
