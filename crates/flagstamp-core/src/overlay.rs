//! The collection of placed flag overlays.
//!
//! Overlays are kept in insertion order, which is also their z-order: later
//! overlays paint on top and win hit-tests. Every origin is clamped so the
//! whole flag stays on the surface:
//!
//! `0 <= x <= surface.width - flag.width` and `0 <= y <= surface.height - flag.height`
//!
//! Mutations are announced to subscribers as [`OverlayEvent`]s.

use serde::{Deserialize, Serialize};

use crate::geometry::{clamp_origin, Rect, Size, SurfaceSize};
use crate::notify::{SubscriberId, Subscribers};

/// Stable identity of an overlay.
///
/// Handles come from a per-store counter and are never reused, even after
/// the store is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayHandle(pub u64);

/// A placed flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagOverlay {
    pub handle: OverlayHandle,
    /// Opaque flag image URL.
    pub url: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FlagOverlay {
    /// The placement rectangle in surface units.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Change notification emitted by [`OverlayStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "handle", rename_all = "camelCase")]
pub enum OverlayEvent {
    Appended(OverlayHandle),
    Moved(OverlayHandle),
    Removed(OverlayHandle),
}

/// In-memory overlay collection for one surface.
#[derive(Debug)]
pub struct OverlayStore {
    surface: SurfaceSize,
    flag_size: Size,
    overlays: Vec<FlagOverlay>,
    next_handle: u64,
    subscribers: Subscribers<OverlayEvent>,
}

impl OverlayStore {
    /// Create an empty store for the given surface and flag size.
    pub fn new(surface: SurfaceSize, flag_size: Size) -> Self {
        Self {
            surface,
            flag_size,
            overlays: Vec::new(),
            next_handle: 0,
            subscribers: Subscribers::new(),
        }
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn flag_size(&self) -> Size {
        self.flag_size
    }

    /// Insert a new overlay centered on the surface and return its handle.
    pub fn append(&mut self, url: impl Into<String>) -> OverlayHandle {
        let handle = OverlayHandle(self.next_handle);
        self.next_handle += 1;

        let x = self.clamp_x(self.surface.width / 2.0 - self.flag_size.width / 2.0);
        let y = self.clamp_y(self.surface.height / 2.0 - self.flag_size.height / 2.0);

        self.overlays.push(FlagOverlay {
            handle,
            url: url.into(),
            x,
            y,
            width: self.flag_size.width,
            height: self.flag_size.height,
        });
        log::debug!("overlay {} appended at ({x}, {y})", handle.0);
        self.subscribers.emit(&OverlayEvent::Appended(handle));
        handle
    }

    /// Move an overlay's origin to `(x, y)`, clamped to the surface.
    ///
    /// Unknown handles are ignored. Returns the clamped origin when the
    /// overlay exists.
    pub fn move_to(&mut self, handle: OverlayHandle, x: f64, y: f64) -> Option<(f64, f64)> {
        let x = self.clamp_x(x);
        let y = self.clamp_y(y);

        let overlay = self.overlays.iter_mut().find(|o| o.handle == handle)?;
        if overlay.x != x || overlay.y != y {
            overlay.x = x;
            overlay.y = y;
            self.subscribers.emit(&OverlayEvent::Moved(handle));
        }
        Some((x, y))
    }

    /// Overlays in z-order (bottom first).
    pub fn iter_in_z(&self) -> impl Iterator<Item = &FlagOverlay> + '_ {
        self.overlays.iter()
    }

    /// Handle of the topmost overlay containing the surface point, if any.
    pub fn find_top_at(&self, px: f64, py: f64) -> Option<OverlayHandle> {
        self.overlays
            .iter()
            .rev()
            .find(|o| o.rect().contains(px, py))
            .map(|o| o.handle)
    }

    pub fn get(&self, handle: OverlayHandle) -> Option<&FlagOverlay> {
        self.overlays.iter().find(|o| o.handle == handle)
    }

    pub fn contains(&self, handle: OverlayHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// An owned copy of all overlays in z-order.
    pub fn snapshot(&self) -> Vec<FlagOverlay> {
        self.overlays.clone()
    }

    /// Remove every overlay, emitting `Removed` for each in z-order.
    ///
    /// The handle counter keeps running so stale handles stay dead.
    pub fn clear(&mut self) {
        for overlay in std::mem::take(&mut self.overlays) {
            self.subscribers.emit(&OverlayEvent::Removed(overlay.handle));
        }
    }

    /// Change the surface size and re-clamp every overlay into it.
    pub fn set_surface(&mut self, surface: SurfaceSize) {
        self.surface = surface;
        let max_x = surface.width - self.flag_size.width;
        let max_y = surface.height - self.flag_size.height;

        let mut moved = Vec::new();
        for overlay in self.overlays.iter_mut() {
            let x = clamp_origin(overlay.x, max_x);
            let y = clamp_origin(overlay.y, max_y);
            if x != overlay.x || y != overlay.y {
                overlay.x = x;
                overlay.y = y;
                moved.push(overlay.handle);
            }
        }
        for handle in moved {
            self.subscribers.emit(&OverlayEvent::Moved(handle));
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&OverlayEvent) + 'static) -> SubscriberId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn clamp_x(&self, x: f64) -> f64 {
        clamp_origin(x, self.surface.width - self.flag_size.width)
    }

    fn clamp_y(&self, y: f64) -> f64 {
        clamp_origin(y, self.surface.height - self.flag_size.height)
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for a sequence of move targets, including far out-of-bounds values.
    fn moves_strategy() -> impl Strategy<Value = Vec<(usize, f64, f64)>> {
        prop::collection::vec((0usize..4, -2000.0f64..2000.0, -2000.0f64..2000.0), 0..40)
    }

    proptest! {
        /// Property: every origin stays within bounds after any move sequence.
        #[test]
        fn prop_origins_stay_in_bounds(
            sw in 1.0f64..1200.0,
            sh in 1.0f64..1200.0,
            moves in moves_strategy(),
        ) {
            let mut s = OverlayStore::new(Size::new(sw, sh), Size::new(60.0, 40.0));
            let handles: Vec<_> = (0..4).map(|i| s.append(format!("u{i}"))).collect();

            for (idx, x, y) in moves {
                s.move_to(handles[idx], x, y);
            }

            let max_x = (sw - 60.0).max(0.0);
            let max_y = (sh - 40.0).max(0.0);
            for o in s.iter_in_z() {
                prop_assert!(o.x >= 0.0 && o.x <= max_x, "x {} out of [0, {}]", o.x, max_x);
                prop_assert!(o.y >= 0.0 && o.y <= max_y, "y {} out of [0, {}]", o.y, max_y);
            }
        }

        /// Property: find_top_at returns the latest overlay containing the point.
        #[test]
        fn prop_find_top_at_is_greatest_index(
            positions in prop::collection::vec((0.0f64..740.0, 0.0f64..560.0), 1..12),
            px in 0.0f64..800.0,
            py in 0.0f64..600.0,
        ) {
            let mut s = OverlayStore::new(Size::new(800.0, 600.0), Size::new(60.0, 40.0));
            let mut handles = Vec::new();
            for (i, (x, y)) in positions.iter().enumerate() {
                let h = s.append(format!("u{i}"));
                s.move_to(h, *x, *y);
                handles.push(h);
            }

            let expected = s
                .iter_in_z()
                .enumerate()
                .filter(|(_, o)| o.rect().contains(px, py))
                .map(|(i, _)| handles[i])
                .last();
            prop_assert_eq!(s.find_top_at(px, py), expected);
        }

        /// Property: appending the same URL N times yields N overlays.
        #[test]
        fn prop_append_not_idempotent(n in 1usize..30) {
            let mut s = OverlayStore::new(Size::new(800.0, 600.0), Size::new(60.0, 40.0));
            for _ in 0..n {
                s.append("same");
            }
            prop_assert_eq!(s.len(), n);
        }
    }
}
