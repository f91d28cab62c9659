use virtualizer::VirtualItemKeyed;

/// How a programmatic scroll reaches its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollBehavior {
    /// Jump to the target immediately.
    #[default]
    Auto,
    /// Animate towards the target; the animation advances on `tick(now_ms)`.
    Smooth,
}

/// Options for `scroll_to_offset` / `scroll_to_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollToOptions {
    pub align: virtualizer::Align,
    pub behavior: ScrollBehavior,
}

impl ScrollToOptions {
    pub fn new(align: virtualizer::Align) -> Self {
        Self {
            align,
            behavior: ScrollBehavior::Auto,
        }
    }

    pub fn smooth(align: virtualizer::Align) -> Self {
        Self {
            align,
            behavior: ScrollBehavior::Smooth,
        }
    }

    pub fn with_behavior(mut self, behavior: ScrollBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

impl Default for ScrollToOptions {
    fn default() -> Self {
        Self::new(virtualizer::Align::Start)
    }
}

/// A rendered item as exposed to reactive consumers.
///
/// Unlike `virtualizer::VirtualItemKeyed`, this type is comparable, so derived cells holding item
/// lists can skip notifying consumers when a re-derivation produced the same window.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualItem<K = virtualizer::ItemKey> {
    pub key: K,
    pub index: usize,
    /// Start offset in the scroll axis (includes `scroll_margin` and `padding_start`).
    pub start: u64,
    /// Size in the scroll axis (excludes `gap`).
    pub size: u32,
}

impl<K> VirtualItem<K> {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size as u64)
    }
}

impl<K> From<VirtualItemKeyed<K>> for VirtualItem<K> {
    fn from(item: VirtualItemKeyed<K>) -> Self {
        Self {
            key: item.key,
            index: item.index,
            start: item.start,
            size: item.size,
        }
    }
}
