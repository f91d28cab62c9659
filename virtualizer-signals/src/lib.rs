//! Value cells, batching scopes and render hooks on top of [`reaktiv`].
//!
//! `reaktiv` tracks dependencies between data-less signals, effects and memoized computed
//! values. The `virtualizer-reactive` adapters need a little more than that:
//!
//! - [`Signal`]: a value paired with its change marker, with an equality cutoff on writes
//! - [`ReadSignal`]: a read-only handle over a signal or a memoized derivation
//! - [`Trigger`]: a shareable data-less marker
//! - [`batch`], [`flush`] and [`is_batching`]: explicit scheduling scopes adapters coalesce against
//! - [`after_next_render`]: one-shot hooks that run after the host completes a [`render`] pass
//!
//! Writes never run effects on their own: pending effects run on [`flush`], at the end of the
//! outermost [`batch`], or as part of [`render`]. `reaktiv` keeps its graph in process-wide
//! arenas, so every value stored in a cell or captured by a derivation must be `Send`.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod batch;
mod render;
mod signal;


pub use batch::{batch, flush, is_batching};
pub use render::{AfterRenderRef, after_next_render, pending_render_hooks, render};
pub use signal::{ReadSignal, Signal, Trigger};
