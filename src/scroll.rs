//! Pointer-drag scroll control and snap settling.

/// Drag phase of the pointer interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragPhase {
    /// No pointer interaction in progress
    #[default]
    Idle,
    /// Pointer is down and panning the strip
    Dragging,
}

/// How the host should apply a scroll command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollMotion {
    /// Apply immediately, no easing (drag tracking)
    Instant,
    /// Animate over a finite duration (snap correction)
    Smooth,
}

/// Commands emitted by the controller for the host to apply.
///
/// The controller never touches the scroll position itself; the host
/// maps these onto its scrolling primitives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollCommand {
    /// Scroll horizontally by `delta` pixels
    ScrollBy { delta: f64, motion: ScrollMotion },
    /// Abort any snap animation currently in flight
    CancelSettle,
    /// Start or restart the settle debounce timer
    RestartSettleTimer { delay_ms: u32 },
}

/// Finite-state scroll controller for the page strip.
///
/// Owns the drag/settle state machine but no timing and no DOM: the
/// host forwards pointer and scroll events, runs the debounce timer the
/// controller asks for, and applies the returned [`ScrollCommand`]s.
/// Scroll position is mutated by exactly one authority at a time,
/// either the drag tracking or the snap correction; the state machine
/// enforces this.
///
/// Momentum handling: releasing a drag does not snap immediately.
/// Every scroll event restarts the settle timer, so the snap runs only
/// once the platform's momentum scrolling has come to rest. The snap's
/// own smooth scroll restarts the timer too; when that timer fires the
/// remaining delta is below the epsilon and settling ends, so the
/// correction can never feed itself an unbounded loop.
///
/// ## Example
///
/// ```rust
/// use comic_core_view::{ScrollCommand, ScrollController, ScrollMotion};
///
/// let mut controller = ScrollController::new(100, 0.5);
///
/// controller.pointer_down(200.0);
/// let command = controller.pointer_move(180.0);
/// assert_eq!(
///     command,
///     Some(ScrollCommand::ScrollBy { delta: 20.0, motion: ScrollMotion::Instant })
/// );
///
/// let _ = controller.pointer_up();
/// // ...settle timer fires with the measured snap delta:
/// let command = controller.settle_elapsed(Some(-37.0));
/// assert_eq!(
///     command,
///     Some(ScrollCommand::ScrollBy { delta: -37.0, motion: ScrollMotion::Smooth })
/// );
/// ```
#[derive(Clone, Debug)]
pub struct ScrollController {
    phase: DragPhase,
    /// A snap correction is in flight
    settling: bool,
    last_pointer_x: Option<f64>,
    settle_debounce_ms: u32,
    snap_epsilon: f64,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(100, 0.5)
    }
}

impl ScrollController {
    /// Create a controller with the given settle debounce (ms) and the
    /// epsilon below which a snap delta counts as already settled.
    pub fn new(settle_debounce_ms: u32, snap_epsilon: f64) -> Self {
        Self {
            phase: DragPhase::Idle,
            settling: false,
            last_pointer_x: None,
            settle_debounce_ms: settle_debounce_ms.max(1),
            snap_epsilon: snap_epsilon.max(0.0),
        }
    }

    /// Current drag phase.
    #[inline]
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Whether a drag is in progress.
    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.phase == DragPhase::Dragging
    }

    /// Whether a snap correction is in flight.
    #[inline]
    pub fn is_settling(&self) -> bool {
        self.settling
    }

    /// Settle debounce interval for the host timer.
    #[inline]
    pub fn settle_debounce_ms(&self) -> u32 {
        self.settle_debounce_ms
    }

    /// Pointer pressed at horizontal position `x`.
    ///
    /// Starts a drag. Any pending or in-flight snap is cancelled
    /// immediately; drag takes priority.
    pub fn pointer_down(&mut self, x: f64) -> ScrollCommand {
        self.phase = DragPhase::Dragging;
        self.settling = false;
        self.last_pointer_x = Some(x);
        ScrollCommand::CancelSettle
    }

    /// Pointer moved to horizontal position `x`.
    ///
    /// While dragging, the strip tracks the pointer 1:1 with no easing:
    /// moving the pointer right scrolls the content left under it.
    /// Outside a drag this is a no-op.
    pub fn pointer_move(&mut self, x: f64) -> Option<ScrollCommand> {
        if self.phase != DragPhase::Dragging {
            return None;
        }

        let last = self.last_pointer_x.replace(x)?;
        let delta = last - x;
        if delta == 0.0 {
            return None;
        }

        Some(ScrollCommand::ScrollBy {
            delta,
            motion: ScrollMotion::Instant,
        })
    }

    /// Pointer released: the drag ends and rest detection is armed.
    ///
    /// The scroll offset at this moment is only a candidate; platform
    /// momentum may keep moving it, so the snap waits for the settle
    /// timer rather than firing here.
    pub fn pointer_up(&mut self) -> Option<ScrollCommand> {
        if self.phase != DragPhase::Dragging {
            return None;
        }

        self.phase = DragPhase::Idle;
        self.last_pointer_x = None;
        Some(ScrollCommand::RestartSettleTimer {
            delay_ms: self.settle_debounce_ms,
        })
    }

    /// A scroll event fired on the strip.
    ///
    /// Restarts rest detection: the snap only runs once no scroll event
    /// has arrived for the debounce window. Ignored while dragging;
    /// the drag is the sole authority over the offset until release.
    pub fn scroll_event(&mut self) -> Option<ScrollCommand> {
        if self.phase == DragPhase::Dragging {
            return None;
        }

        Some(ScrollCommand::RestartSettleTimer {
            delay_ms: self.settle_debounce_ms,
        })
    }

    /// The settle timer fired; `snap_delta` is the correction measured
    /// from current tile and viewport rects (see [`crate::snap_delta`]).
    ///
    /// Emits the smooth correction, or ends settling when the offset is
    /// already within epsilon of a page boundary. A drag that started
    /// in the meantime wins: the timer result is discarded.
    pub fn settle_elapsed(&mut self, snap_delta: Option<f64>) -> Option<ScrollCommand> {
        if self.phase == DragPhase::Dragging {
            return None;
        }

        let delta = match snap_delta {
            Some(d) => d,
            None => {
                self.settling = false;
                return None;
            }
        };

        if delta.abs() <= self.snap_epsilon {
            // At rest on a boundary; the correction loop terminates here.
            self.settling = false;
            return None;
        }

        self.settling = true;
        log::debug!("snap correction by {delta:.1}px");
        Some(ScrollCommand::ScrollBy {
            delta,
            motion: ScrollMotion::Smooth,
        })
    }

    /// Geometry changed (resize or first real image metadata).
    ///
    /// Drops any pending settle so the next correction is computed from
    /// fresh layout measurements instead of stale rects.
    pub fn invalidate(&mut self) {
        self.settling = false;
    }

    /// Reset the controller to its initial state.
    pub fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.settling = false;
        self.last_pointer_x = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{layout_strip, snap_delta_for_scroll, SpreadCount, ViewportGeometry};

    #[test]
    fn test_drag_tracks_pointer_one_to_one() {
        let mut ctrl = ScrollController::default();

        assert_eq!(ctrl.pointer_down(300.0), ScrollCommand::CancelSettle);
        assert!(ctrl.is_dragging());

        // Pointer moves left by 40: content scrolls right under it
        let cmd = ctrl.pointer_move(260.0);
        assert_eq!(
            cmd,
            Some(ScrollCommand::ScrollBy {
                delta: 40.0,
                motion: ScrollMotion::Instant
            })
        );

        // Next move is relative to the last position, not the start
        let cmd = ctrl.pointer_move(270.0);
        assert_eq!(
            cmd,
            Some(ScrollCommand::ScrollBy {
                delta: -10.0,
                motion: ScrollMotion::Instant
            })
        );
    }

    #[test]
    fn test_move_without_drag_is_noop() {
        let mut ctrl = ScrollController::default();
        assert_eq!(ctrl.pointer_move(100.0), None);
        assert_eq!(ctrl.pointer_up(), None);
    }

    #[test]
    fn test_release_arms_rest_detection() {
        let mut ctrl = ScrollController::new(80, 0.5);
        ctrl.pointer_down(100.0);
        let _ = ctrl.pointer_move(90.0);

        let cmd = ctrl.pointer_up();
        assert_eq!(cmd, Some(ScrollCommand::RestartSettleTimer { delay_ms: 80 }));
        assert!(!ctrl.is_dragging());
        assert!(!ctrl.is_settling());
    }

    #[test]
    fn test_settle_emits_smooth_correction() {
        let mut ctrl = ScrollController::default();
        ctrl.pointer_down(100.0);
        let _ = ctrl.pointer_up();

        let cmd = ctrl.settle_elapsed(Some(-42.0));
        assert_eq!(
            cmd,
            Some(ScrollCommand::ScrollBy {
                delta: -42.0,
                motion: ScrollMotion::Smooth
            })
        );
        assert!(ctrl.is_settling());
    }

    #[test]
    fn test_settle_loop_terminates() {
        let mut ctrl = ScrollController::default();

        // First correction starts settling
        assert!(ctrl.settle_elapsed(Some(30.0)).is_some());
        assert!(ctrl.is_settling());

        // The correction's own scroll events restart the timer
        assert!(matches!(
            ctrl.scroll_event(),
            Some(ScrollCommand::RestartSettleTimer { .. })
        ));

        // When the timer fires again the offset has reached the
        // boundary: no further command, settling ends
        assert_eq!(ctrl.settle_elapsed(Some(0.2)), None);
        assert!(!ctrl.is_settling());
    }

    #[test]
    fn test_pointer_down_cancels_settle() {
        let mut ctrl = ScrollController::default();
        let _ = ctrl.settle_elapsed(Some(50.0));
        assert!(ctrl.is_settling());

        assert_eq!(ctrl.pointer_down(10.0), ScrollCommand::CancelSettle);
        assert!(!ctrl.is_settling());

        // Drag owns the offset: timer results and scroll events are ignored
        assert_eq!(ctrl.settle_elapsed(Some(50.0)), None);
        assert_eq!(ctrl.scroll_event(), None);
    }

    #[test]
    fn test_invalidate_drops_stale_settle() {
        let mut ctrl = ScrollController::default();
        let _ = ctrl.settle_elapsed(Some(25.0));
        assert!(ctrl.is_settling());

        ctrl.invalidate();
        assert!(!ctrl.is_settling());
    }

    /// Minimal host: applies controller commands to a scroll offset over
    /// a strip layout, with momentum mocked to zero.
    struct TestHost {
        ctrl: ScrollController,
        layout: crate::StripLayout,
        geometry: ViewportGeometry,
        viewport_width: f64,
        scroll: f64,
        timer_armed: bool,
    }

    impl TestHost {
        fn apply(&mut self, cmd: Option<ScrollCommand>) {
            match cmd {
                Some(ScrollCommand::ScrollBy { delta, .. }) => {
                    self.scroll += delta;
                    // A real scroll fires scroll events; forward one
                    let next = self.ctrl.scroll_event();
                    if matches!(next, Some(ScrollCommand::RestartSettleTimer { .. })) {
                        self.timer_armed = true;
                    }
                }
                Some(ScrollCommand::RestartSettleTimer { .. }) => {
                    self.timer_armed = true;
                }
                Some(ScrollCommand::CancelSettle) | None => {}
            }
        }

        fn fire_timer(&mut self) {
            while self.timer_armed {
                self.timer_armed = false;
                let delta = snap_delta_for_scroll(
                    &self.layout,
                    self.scroll,
                    self.viewport_width,
                    &self.geometry,
                );
                let cmd = self.ctrl.settle_elapsed(delta);
                self.apply(cmd);
            }
        }
    }

    #[test]
    fn test_drag_release_settles_on_nearest_boundary() {
        let geometry = ViewportGeometry {
            spread: SpreadCount::One,
            page_width: 200.0,
            padding_inline: 0.0,
        };
        let layout = layout_strip(5, &geometry);
        let start = layout.initial_scroll(200.0); // resting on page 1

        let mut host = TestHost {
            ctrl: ScrollController::default(),
            layout,
            geometry,
            viewport_width: 200.0,
            scroll: start,
            timer_armed: false,
        };

        // Drag 150px toward the next page (pointer moves right in RTL)
        host.ctrl.pointer_down(400.0);
        let cmd = host.ctrl.pointer_move(550.0);
        assert_eq!(
            cmd,
            Some(ScrollCommand::ScrollBy {
                delta: -150.0,
                motion: ScrollMotion::Instant
            })
        );
        host.scroll += -150.0;

        let cmd = host.ctrl.pointer_up();
        host.apply(cmd);
        host.fire_timer();

        // With zero momentum the strip settles exactly one page over
        assert!((host.scroll - (start - 200.0)).abs() < 1e-9);
        assert!(!host.ctrl.is_settling());
    }
}
