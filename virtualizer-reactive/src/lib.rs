//! Signal-based adapters for the `virtualizer` crate.
//!
//! `virtualizer` is imperative: you push viewport and scroll state in and pull ranges out. UI
//! layers built on signals want the opposite, values that update themselves. This crate bridges
//! the two with adapters that own one engine instance and keep a set of signals in step with it:
//!
//! - [`LazyVirtualizer`]: creates derived cells on first access, all re-deriving from a single
//!   revision marker. Unused state is never computed.
//! - [`EagerVirtualizer`]: mirrors a fixed set of signals from the engine at one synchronization
//!   point, coalesced per flush.
//!
//! Both follow an options signal (usually built with [`create_virtualizer`] or
//! [`create_window_virtualizer`]), update the engine in place so measurements and scroll state
//! survive, attach it to the scroll container the options resolve to, and call `did_mount` once
//! after the first completed render.
//!
//! The engine behind the adapters is abstracted by [`Engine`]; [`ElementVirtualizer`] is the
//! implementation for hosts that expose their scroll containers through [`ScrollSurface`].
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod adapter;
mod eager;
mod element;
mod engine;
mod handle;
mod lazy;
mod mount;
mod options;
mod slot;
mod types;

#[cfg(test)]
mod tests;

pub use adapter::{
    VirtualizerAdapter, create_adapter, create_eager_virtualizer, create_eager_window_virtualizer,
    create_virtualizer, create_window_virtualizer,
};
pub use eager::EagerVirtualizer;
pub use element::{
    ElementRef, ItemElement, NativeElement, ScrollSurface, ScrollTarget, SurfaceSize,
    resolve_scroll_element,
};
pub use engine::{ChangeObservers, Engine, OnChange};
pub use handle::{ElementVirtualizer, VirtualizerKey};
pub use lazy::{Capability, LazyVirtualizer, Property, capability_of};
pub use options::ElementOptions;
pub use types::{ScrollBehavior, ScrollToOptions, VirtualItem};

pub use virtualizer::{Align, InitialOffset, ItemKey, Rect, ScrollDirection, VirtualRange};
pub use virtualizer_adapter::Easing;
