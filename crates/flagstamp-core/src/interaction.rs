//! Pointer-driven overlay manipulation.
//!
//! Mouse, touch and pen input is normalized by the host into
//! [`PointerEvent`]s carrying surface-relative coordinates. The transition
//! function [`step`] is pure: it reads the overlay store for hit-testing
//! and returns the next state plus an optional [`MoveCommand`]. The
//! [`Interaction`] wrapper applies those commands to the store.
//!
//! # States
//!
//! - `Idle`: a press on an overlay grabs the topmost one under the pointer
//! - `Grabbing`: moves reposition the grabbed overlay; release or cancel
//!   ends the grab. A second press from the same pointer means its release
//!   was lost, so it is handled as release followed by press.
//!
//! Only one grab exists at a time. Presses from other pointers while a grab
//! is active are ignored.

use serde::{Deserialize, Serialize};

use crate::overlay::{OverlayHandle, OverlayStore};

/// The kind of device that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerPhase {
    Press,
    Move,
    Release,
    Cancel,
}

/// A normalized pointer event in surface coordinates.
///
/// Coordinates are optional so the host can forward events verbatim;
/// presses and moves without coordinates are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub phase: PointerPhase,
    #[serde(default)]
    pub kind: PointerKind,
    #[serde(default)]
    pub pointer_id: u32,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, kind: PointerKind, pointer_id: u32, x: f64, y: f64) -> Self {
        Self {
            phase,
            kind,
            pointer_id,
            x: Some(x),
            y: Some(y),
        }
    }

    pub fn press(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Press, PointerKind::Mouse, 0, x, y)
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Move, PointerKind::Mouse, 0, x, y)
    }

    pub fn release() -> Self {
        Self {
            phase: PointerPhase::Release,
            kind: PointerKind::Mouse,
            pointer_id: 0,
            x: None,
            y: None,
        }
    }

    pub fn cancel() -> Self {
        Self {
            phase: PointerPhase::Cancel,
            ..Self::release()
        }
    }

    /// Same event, reported as coming from a touch point.
    pub fn with_touch(mut self, pointer_id: u32) -> Self {
        self.kind = PointerKind::Touch;
        self.pointer_id = pointer_id;
        self
    }

    fn position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

/// An active grab: which overlay is held, by which pointer, and the offset
/// from the overlay origin to the press point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grab {
    pub handle: OverlayHandle,
    pub pointer_id: u32,
    pub kind: PointerKind,
    pub dx: f64,
    pub dy: f64,
}

/// State of the interaction machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Grabbing(Grab),
}

impl InteractionState {
    pub fn grab(&self) -> Option<&Grab> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Grabbing(grab) => Some(grab),
        }
    }
}

/// Request to reposition an overlay. Clamping happens in the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveCommand {
    pub handle: OverlayHandle,
    pub x: f64,
    pub y: f64,
}

/// Result of one transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: InteractionState,
    pub command: Option<MoveCommand>,
    /// The host should suppress default handling (scrolling) for this event.
    pub absorbed: bool,
}

impl Transition {
    fn stay(state: InteractionState) -> Self {
        Self {
            state,
            command: None,
            absorbed: false,
        }
    }
}

/// Compute the next state for `event`.
pub fn step(state: InteractionState, event: &PointerEvent, store: &OverlayStore) -> Transition {
    match state {
        InteractionState::Idle => match event.phase {
            PointerPhase::Press => press(event, store),
            PointerPhase::Move | PointerPhase::Release | PointerPhase::Cancel => {
                Transition::stay(state)
            }
        },
        InteractionState::Grabbing(grab) => {
            let absorbed = event.kind == PointerKind::Touch;

            // Single-grab policy: other pointers cannot affect the active grab
            if event.pointer_id != grab.pointer_id || event.kind != grab.kind {
                return Transition {
                    state,
                    command: None,
                    absorbed,
                };
            }

            match event.phase {
                // The release for this grab never arrived: start over
                PointerPhase::Press => {
                    log::debug!("press while holding overlay {}, regrabbing", grab.handle.0);
                    let transition = press(event, store);
                    Transition {
                        absorbed: transition.absorbed || absorbed,
                        ..transition
                    }
                }
                PointerPhase::Move => {
                    if !store.contains(grab.handle) {
                        log::debug!("grabbed overlay {} no longer exists", grab.handle.0);
                        return Transition {
                            state: InteractionState::Idle,
                            command: None,
                            absorbed,
                        };
                    }
                    let Some((px, py)) = event.position() else {
                        return Transition {
                            state,
                            command: None,
                            absorbed,
                        };
                    };
                    Transition {
                        state,
                        command: Some(MoveCommand {
                            handle: grab.handle,
                            x: px - grab.dx,
                            y: py - grab.dy,
                        }),
                        absorbed,
                    }
                }
                PointerPhase::Release | PointerPhase::Cancel => {
                    log::debug!("release overlay {}", grab.handle.0);
                    Transition {
                        state: InteractionState::Idle,
                        command: None,
                        absorbed,
                    }
                }
            }
        }
    }
}

/// Start a grab on the top-most overlay under a press, if any.
fn press(event: &PointerEvent, store: &OverlayStore) -> Transition {
    let Some((px, py)) = event.position() else {
        return Transition::stay(InteractionState::Idle);
    };
    let Some(overlay) = store.find_top_at(px, py).and_then(|h| store.get(h)) else {
        return Transition::stay(InteractionState::Idle);
    };
    let grab = Grab {
        handle: overlay.handle,
        pointer_id: event.pointer_id,
        kind: event.kind,
        dx: px - overlay.x,
        dy: py - overlay.y,
    };
    log::debug!("grab overlay {} at ({px}, {py})", overlay.handle.0);
    Transition {
        state: InteractionState::Grabbing(grab),
        command: None,
        absorbed: event.kind == PointerKind::Touch,
    }
}

/// Outcome of [`Interaction::handle_event`], reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disposition {
    /// The host should call `preventDefault` on the originating event.
    pub absorbed: bool,
    /// Overlay repositioned by this event, if any.
    pub moved: Option<OverlayHandle>,
    /// A grab is active after this event.
    pub grabbing: bool,
}

/// Stateful driver around [`step`].
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    state: InteractionState,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn active_grab(&self) -> Option<&Grab> {
        self.state.grab()
    }

    /// Feed one event, applying any resulting move to `store`.
    pub fn handle_event(&mut self, event: &PointerEvent, store: &mut OverlayStore) -> Disposition {
        let transition = step(self.state, event, store);
        self.state = transition.state;

        let moved = transition
            .command
            .and_then(|cmd| store.move_to(cmd.handle, cmd.x, cmd.y).map(|_| cmd.handle));

        Disposition {
            absorbed: transition.absorbed,
            moved,
            grabbing: self.state.grab().is_some(),
        }
    }

    /// Drop any active grab.
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    fn store_with(urls: &[&str]) -> (OverlayStore, Vec<OverlayHandle>) {
        let mut store = OverlayStore::new(Size::new(800.0, 600.0), Size::new(60.0, 40.0));
        let handles = urls.iter().map(|u| store.append(*u)).collect();
        (store, handles)
    }

    #[test]
    fn test_grab_and_clamp() {
        let (mut store, handles) = store_with(&["u1"]);
        let mut interaction = Interaction::new();

        let d = interaction.handle_event(&PointerEvent::press(380.0, 290.0), &mut store);
        assert!(d.grabbing);
        let grab = interaction.active_grab().unwrap();
        assert_eq!((grab.dx, grab.dy), (10.0, 10.0));

        let d = interaction.handle_event(&PointerEvent::moved(-100.0, -100.0), &mut store);
        assert_eq!(d.moved, Some(handles[0]));

        let d = interaction.handle_event(&PointerEvent::release(), &mut store);
        assert!(!d.grabbing);
        assert_eq!(interaction.state(), InteractionState::Idle);

        let o = store.get(handles[0]).unwrap();
        assert_eq!((o.x, o.y), (0.0, 0.0));
    }

    #[test]
    fn test_drag_keeps_grab_offset() {
        let (mut store, handles) = store_with(&["u1"]);
        let mut interaction = Interaction::new();

        interaction.handle_event(&PointerEvent::press(400.0, 300.0), &mut store);
        interaction.handle_event(&PointerEvent::moved(450.0, 320.0), &mut store);
        interaction.handle_event(&PointerEvent::moved(500.0, 350.0), &mut store);

        let o = store.get(handles[0]).unwrap();
        assert_eq!((o.x, o.y), (470.0, 330.0));
    }

    #[test]
    fn test_press_on_empty_area_stays_idle() {
        let (mut store, _) = store_with(&["u1"]);
        let mut interaction = Interaction::new();

        let d = interaction.handle_event(&PointerEvent::press(5.0, 5.0), &mut store);
        assert!(!d.grabbing);
        let d = interaction.handle_event(&PointerEvent::moved(400.0, 300.0), &mut store);
        assert_eq!(d.moved, None);
    }

    #[test]
    fn test_press_grabs_topmost() {
        let (mut store, handles) = store_with(&["u1", "u2", "u3"]);
        let mut interaction = Interaction::new();

        interaction.handle_event(&PointerEvent::press(400.0, 300.0), &mut store);
        assert_eq!(interaction.active_grab().unwrap().handle, handles[2]);
    }

    #[test]
    fn test_secondary_pointer_ignored_while_grabbing() {
        let (mut store, handles) = store_with(&["u1", "u2"]);
        store.move_to(handles[0], 0.0, 0.0);
        let mut interaction = Interaction::new();

        interaction.handle_event(&PointerEvent::press(400.0, 300.0).with_touch(1), &mut store);
        // Second finger lands on the other flag
        let d = interaction.handle_event(&PointerEvent::press(10.0, 10.0).with_touch(2), &mut store);
        assert!(d.absorbed);
        assert_eq!(interaction.active_grab().unwrap().handle, handles[1]);

        // Second finger moving does nothing
        let d = interaction.handle_event(&PointerEvent::moved(100.0, 100.0).with_touch(2), &mut store);
        assert_eq!(d.moved, None);

        // Second finger lifting does not end the grab
        interaction.handle_event(&PointerEvent::release().with_touch(2), &mut store);
        assert!(interaction.active_grab().is_some());

        interaction.handle_event(&PointerEvent::cancel().with_touch(1), &mut store);
        assert!(interaction.active_grab().is_none());
    }

    #[test]
    fn test_press_without_release_regrabs() {
        let (mut store, handles) = store_with(&["u1", "u2"]);
        store.move_to(handles[0], 0.0, 0.0);
        let mut interaction = Interaction::new();

        interaction.handle_event(&PointerEvent::press(400.0, 300.0), &mut store);
        assert_eq!(interaction.active_grab().unwrap().handle, handles[1]);

        // Release lost outside the surface; next press lands on the other flag
        let d = interaction.handle_event(&PointerEvent::press(10.0, 10.0), &mut store);
        assert!(d.grabbing);
        let grab = interaction.active_grab().unwrap();
        assert_eq!(grab.handle, handles[0]);
        assert_eq!((grab.dx, grab.dy), (10.0, 10.0));

        interaction.handle_event(&PointerEvent::moved(110.0, 110.0), &mut store);
        let o = store.get(handles[0]).unwrap();
        assert_eq!((o.x, o.y), (100.0, 100.0));
        let o = store.get(handles[1]).unwrap();
        assert_eq!((o.x, o.y), (370.0, 280.0));

        // A fresh press on empty area ends the stale grab
        let d = interaction.handle_event(&PointerEvent::press(700.0, 50.0), &mut store);
        assert!(!d.grabbing);
    }

    #[test]
    fn test_touch_events_absorbed_during_grab() {
        let (mut store, _) = store_with(&["u1"]);
        let mut interaction = Interaction::new();

        let d = interaction.handle_event(&PointerEvent::press(400.0, 300.0).with_touch(7), &mut store);
        assert!(d.absorbed);
        let d = interaction.handle_event(&PointerEvent::moved(410.0, 310.0).with_touch(7), &mut store);
        assert!(d.absorbed);
        let d = interaction.handle_event(&PointerEvent::release().with_touch(7), &mut store);
        assert!(d.absorbed);

        // Touch outside any overlay while idle scrolls normally
        let d = interaction.handle_event(&PointerEvent::press(5.0, 5.0).with_touch(7), &mut store);
        assert!(!d.absorbed);
    }

    #[test]
    fn test_mouse_events_not_absorbed() {
        let (mut store, _) = store_with(&["u1"]);
        let mut interaction = Interaction::new();
        let d = interaction.handle_event(&PointerEvent::press(400.0, 300.0), &mut store);
        assert!(!d.absorbed);
    }

    #[test]
    fn test_malformed_events_dropped() {
        let (mut store, handles) = store_with(&["u1"]);
        let mut interaction = Interaction::new();

        let press = PointerEvent {
            phase: PointerPhase::Press,
            kind: PointerKind::Mouse,
            pointer_id: 0,
            x: None,
            y: Some(300.0),
        };
        interaction.handle_event(&press, &mut store);
        assert!(interaction.active_grab().is_none());

        interaction.handle_event(&PointerEvent::press(400.0, 300.0), &mut store);
        let bad_move = PointerEvent {
            x: Some(f64::NAN),
            ..PointerEvent::moved(0.0, 0.0)
        };
        let d = interaction.handle_event(&bad_move, &mut store);
        assert_eq!(d.moved, None);
        assert!(d.grabbing);

        let o = store.get(handles[0]).unwrap();
        assert_eq!((o.x, o.y), (370.0, 280.0));
    }

    #[test]
    fn test_grab_on_removed_overlay_is_dropped() {
        let (mut store, _) = store_with(&["u1"]);
        let mut interaction = Interaction::new();

        interaction.handle_event(&PointerEvent::press(400.0, 300.0), &mut store);
        store.clear();

        let d = interaction.handle_event(&PointerEvent::moved(10.0, 10.0), &mut store);
        assert_eq!(d.moved, None);
        assert!(!d.grabbing);
    }

    #[test]
    fn test_step_is_pure() {
        let (store, handles) = store_with(&["u1"]);
        let t1 = step(InteractionState::Idle, &PointerEvent::press(380.0, 290.0), &store);
        let t2 = step(t1.state, &PointerEvent::moved(100.0, 100.0), &store);

        assert_eq!(
            t2.command,
            Some(MoveCommand {
                handle: handles[0],
                x: 90.0,
                y: 90.0
            })
        );
        // Store untouched
        let o = store.get(handles[0]).unwrap();
        assert_eq!((o.x, o.y), (370.0, 280.0));
    }
}
