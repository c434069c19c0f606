//! Pan/zoom gesture handling for the horizontal time axis.
//!
//! The controller owns the gesture primitive exclusively. It feeds the primitive from the
//! host's own pointer and wheel listeners and turns every change event back into a
//! [`VisiblePortion`]. Downstream layers only ever see that portion and the derived
//! detail level, never the primitive's transform.

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone};

use crate::core::ratio::{ratio_in_interval, rect_ratio, ElementRect};
use crate::core::scale::{ScaleClassifier, ScaleDetailLevel};
use crate::error::TimelineError;
use crate::state::{TimeInterval, TimelineSettings, VisiblePortion};

/// Transform reported by the gesture primitive after each change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanzoomChange {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
}

/// Primitive operations of a pan/zoom engine. Mutating calls return the change event
/// they produced, or `None` when the transform did not move.
pub trait GesturePrimitive {
    fn create(options: &PanZoomOptions, container_width: f64) -> Self
    where
        Self: Sized;
    fn handle_down(&mut self, x: f64, y: f64) -> Option<PanzoomChange>;
    fn handle_move(&mut self, x: f64, y: f64) -> Option<PanzoomChange>;
    fn handle_up(&mut self) -> Option<PanzoomChange>;
    /// Zoom by a wheel delta about `focal_x`, in container-local pixels.
    fn zoom_with_wheel(&mut self, delta_y: f64, focal_x: f64) -> Option<PanzoomChange>;
    fn zoom(&mut self, scale: f64) -> Option<PanzoomChange>;
    fn pan(&mut self, x: f64, y: f64) -> Option<PanzoomChange>;
    fn get_scale(&self) -> f64;
    fn get_pan(&self) -> (f64, f64);
    fn set_bounds(&mut self, container_width: f64);
    fn destroy(&mut self);
}

/// Configuration for the controller and the primitive it creates.
#[derive(Debug, Clone, PartialEq)]
pub struct PanZoomOptions {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Wheel delta to zoom exponent factor
    pub wheel_step: f64,
    /// Wait between a programmatic zoom and the pan that follows it
    pub settle_delay: Duration,
    /// Centre on "now" at mount when the rendered day is today
    pub center_on_now: bool,
    /// The primitive must not bind its own DOM listeners
    pub no_bind: bool,
    /// The primitive must not intercept the start event, so children still see it
    pub no_bind_start_event: bool,
    /// Vertical panning is meaningless on a time axis
    pub disable_y: bool,
}

impl PanZoomOptions {
    pub fn desktop(min_scale: f64, max_scale: f64) -> Self {
        let min_scale = min_scale.max(1.0);
        Self {
            min_scale,
            max_scale: max_scale.max(min_scale),
            wheel_step: 0.002,
            settle_delay: Duration::from_millis(50),
            center_on_now: false,
            no_bind: true,
            no_bind_start_event: true,
            disable_y: true,
        }
    }

    /// Mobile layouts pin the zoom and start centred on the current time.
    pub fn mobile(zoom: f64) -> Self {
        Self {
            center_on_now: true,
            ..Self::desktop(zoom, zoom)
        }
    }

    pub fn from_settings(settings: &TimelineSettings, mobile: bool) -> Self {
        let base = if mobile {
            Self::mobile(settings.mobile_zoom)
        } else {
            Self::desktop(settings.min_zoom, settings.max_zoom)
        };
        Self {
            wheel_step: settings.wheel_step,
            settle_delay: settings.settle_delay(),
            ..base
        }
    }

    pub fn is_pinned(&self) -> bool {
        (self.max_scale - self.min_scale).abs() < f64::EPSILON
    }
}

impl Default for PanZoomOptions {
    fn default() -> Self {
        Self::desktop(1.0, 96.0)
    }
}

/// Headless pan/zoom engine.
///
/// The element is laid out as `translateX(x) scale(s)` with its origin on the left edge,
/// so it spans `[x, x + width * s]` in container-local pixels. It is contained: the
/// element always covers the whole container.
#[derive(Debug, Clone)]
pub struct Panzoom {
    min_scale: f64,
    max_scale: f64,
    step: f64,
    disable_y: bool,
    container_width: f64,
    scale: f64,
    x: f64,
    y: f64,
    drag_origin: Option<(f64, f64)>,
    destroyed: bool,
}

impl Panzoom {
    fn clamp_x(&self, x: f64, scale: f64) -> f64 {
        let min_x = self.container_width - self.container_width * scale;
        x.clamp(min_x.min(0.0), 0.0)
    }

    fn apply(&mut self, scale: f64, x: f64, y: f64) -> Option<PanzoomChange> {
        if self.destroyed || !scale.is_finite() || !x.is_finite() {
            return None;
        }
        let scale = scale.clamp(self.min_scale, self.max_scale);
        let x = self.clamp_x(x, scale);
        let y = if self.disable_y { 0.0 } else { y };
        if scale == self.scale && x == self.x && y == self.y {
            return None;
        }
        self.scale = scale;
        self.x = x;
        self.y = y;
        Some(PanzoomChange { scale, x, y })
    }

    /// Zoom so the content under `focal_x` stays under it.
    fn zoom_to_point(&mut self, scale: f64, focal_x: f64) -> Option<PanzoomChange> {
        let target = scale.clamp(self.min_scale, self.max_scale);
        let x = focal_x - (focal_x - self.x) * (target / self.scale);
        self.apply(target, x, self.y)
    }
}

impl GesturePrimitive for Panzoom {
    fn create(options: &PanZoomOptions, container_width: f64) -> Self {
        Self {
            min_scale: options.min_scale,
            max_scale: options.max_scale,
            step: options.wheel_step,
            disable_y: options.disable_y,
            container_width: container_width.max(0.0),
            scale: options.min_scale,
            x: 0.0,
            y: 0.0,
            drag_origin: None,
            destroyed: false,
        }
    }

    fn handle_down(&mut self, x: f64, _y: f64) -> Option<PanzoomChange> {
        if !self.destroyed {
            self.drag_origin = Some((x, self.x));
        }
        None
    }

    fn handle_move(&mut self, x: f64, y: f64) -> Option<PanzoomChange> {
        let (origin_x, origin_pan) = self.drag_origin?;
        self.apply(self.scale, origin_pan + (x - origin_x), y)
    }

    fn handle_up(&mut self) -> Option<PanzoomChange> {
        self.drag_origin = None;
        None
    }

    fn zoom_with_wheel(&mut self, delta_y: f64, focal_x: f64) -> Option<PanzoomChange> {
        let factor = (-delta_y * self.step).exp();
        self.zoom_to_point(self.scale * factor, focal_x)
    }

    fn zoom(&mut self, scale: f64) -> Option<PanzoomChange> {
        self.zoom_to_point(scale, self.container_width / 2.0)
    }

    fn pan(&mut self, x: f64, y: f64) -> Option<PanzoomChange> {
        self.apply(self.scale, x, y)
    }

    fn get_scale(&self) -> f64 {
        self.scale
    }

    fn get_pan(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn set_bounds(&mut self, container_width: f64) {
        self.container_width = container_width.max(0.0);
        self.x = self.clamp_x(self.x, self.scale);
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.drag_origin = None;
    }
}

/// DOM listeners the controller installs on its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputListener {
    PointerDown,
    PointerMove,
    PointerUp,
    Wheel,
    PanzoomChange,
}

impl InputListener {
    pub const ALL: [InputListener; 5] = [
        InputListener::PointerDown,
        InputListener::PointerMove,
        InputListener::PointerUp,
        InputListener::Wheel,
        InputListener::PanzoomChange,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            InputListener::PointerDown => "pointerdown",
            InputListener::PointerMove => "pointermove",
            InputListener::PointerUp => "pointerup",
            InputListener::Wheel => "wheel",
            InputListener::PanzoomChange => "panzoomchange",
        }
    }
}

/// Pointer event in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub pointer_id: i64,
    pub client_x: f64,
    pub client_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub delta_x: f64,
    pub delta_y: f64,
    pub client_x: f64,
}

impl WheelInput {
    /// Vertical-dominant wheels zoom; the rest scroll the page through the timeline.
    pub fn is_zoom(&self) -> bool {
        self.delta_y.abs() >= self.delta_x.abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerState {
    Idle,
    Dragging {
        pointer_id: i64,
        down_at: Instant,
        down_x: f64,
    },
}

/// End of a pointer press; the renderer decides whether it was a click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerRelease {
    pub elapsed: Duration,
    pub down_x: f64,
    pub client_x: f64,
}

/// Second half of a programmatic centre: the pan that runs after the zoom settles.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPan<Z: TimeZone = chrono_tz::Tz> {
    epoch: u64,
    time: DateTime<Z>,
}

impl<Z: TimeZone> PendingPan<Z> {
    pub fn time(&self) -> &DateTime<Z> {
        &self.time
    }
}

/// Signed pan offset that puts `time` at the middle of the container at `scale`.
pub fn centering_offset<Z: TimeZone>(
    time: &DateTime<Z>,
    interval: &TimeInterval,
    container_width: f64,
    scale: f64,
) -> f64 {
    let element_width = container_width * scale;
    container_width / 2.0 - ratio_in_interval(time, interval) * element_width
}

/// Gesture state machine and visible-window tracker.
pub struct PanZoomController<G = Panzoom> {
    options: PanZoomOptions,
    classifier: ScaleClassifier,
    gesture: Option<G>,
    container: Option<ElementRect>,
    listeners: Vec<InputListener>,
    pointer: PointerState,
    visible: VisiblePortion,
    epoch: u64,
}

impl<G: GesturePrimitive> PanZoomController<G> {
    pub fn new(options: PanZoomOptions, classifier: ScaleClassifier) -> Self {
        Self {
            options,
            classifier,
            gesture: None,
            container: None,
            listeners: Vec::new(),
            pointer: PointerState::Idle,
            visible: VisiblePortion::FULL,
            epoch: 0,
        }
    }

    /// Create the gesture and install listeners. A missing container installs nothing and
    /// can be retried on the next mount.
    pub fn mount(&mut self, container: Option<ElementRect>) -> Result<(), TimelineError> {
        let Some(container) = container else {
            tracing::warn!("pan/zoom container missing at mount");
            return Err(TimelineError::MissingContainer);
        };
        if self.gesture.is_some() {
            self.set_container(container);
            return Ok(());
        }
        self.epoch = self.epoch.wrapping_add(1);
        self.gesture = Some(G::create(&self.options, container.width));
        self.container = Some(container);
        self.listeners = InputListener::ALL.to_vec();
        self.pointer = PointerState::Idle;
        self.recompute_visible();
        tracing::debug!(
            width = container.width,
            min_scale = self.options.min_scale,
            max_scale = self.options.max_scale,
            "pan/zoom mounted"
        );
        Ok(())
    }

    /// Remove listeners and destroy the gesture. Idempotent.
    pub fn unmount(&mut self) {
        self.listeners.clear();
        if let Some(mut gesture) = self.gesture.take() {
            gesture.destroy();
            tracing::debug!("pan/zoom unmounted");
        }
        self.pointer = PointerState::Idle;
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn is_mounted(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn listeners(&self) -> &[InputListener] {
        &self.listeners
    }

    pub fn options(&self) -> &PanZoomOptions {
        &self.options
    }

    pub fn pointer_state(&self) -> PointerState {
        self.pointer
    }

    pub fn visible_portion(&self) -> VisiblePortion {
        self.visible
    }

    pub fn container(&self) -> Option<ElementRect> {
        self.container
    }

    pub fn scale(&self) -> f64 {
        self.gesture
            .as_ref()
            .map(|gesture| gesture.get_scale())
            .unwrap_or(self.options.min_scale)
    }

    pub fn scale_detail(&self) -> ScaleDetailLevel {
        self.classifier.classify(self.scale())
    }

    pub fn classifier(&self) -> &ScaleClassifier {
        &self.classifier
    }

    /// Bounds of the transformed element, derived from the container and the transform.
    pub fn element_rect(&self) -> Option<ElementRect> {
        let container = self.container?;
        let gesture = self.gesture.as_ref()?;
        let (x, _) = gesture.get_pan();
        Some(ElementRect::new(
            container.left + x,
            container.top,
            container.width * gesture.get_scale(),
            container.height,
        ))
    }

    /// Container resized: rebound the gesture and recompute the window.
    pub fn set_container(&mut self, container: ElementRect) {
        self.container = Some(container);
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.set_bounds(container.width);
        }
        self.recompute_visible();
    }

    /// Handle a change event. The window is always rebuilt from live geometry, so a later
    /// event fully supersedes an earlier one.
    pub fn on_change(&mut self, change: PanzoomChange) -> VisiblePortion {
        tracing::trace!(scale = change.scale, x = change.x, "panzoom change");
        self.recompute_visible()
    }

    fn recompute_visible(&mut self) -> VisiblePortion {
        if let (Some(container), Some(element)) = (self.container, self.element_rect()) {
            self.visible = VisiblePortion::new(
                rect_ratio(&element, container.left),
                rect_ratio(&element, container.right()),
            );
        }
        self.visible
    }

    fn dispatch(&mut self, change: Option<PanzoomChange>) -> Option<VisiblePortion> {
        change.map(|change| self.on_change(change))
    }

    fn local_x(&self, client_x: f64) -> f64 {
        client_x - self.container.map(|c| c.left).unwrap_or(0.0)
    }

    pub fn pointer_down(&mut self, input: PointerInput, at: Instant) -> Option<VisiblePortion> {
        if !self.listeners.contains(&InputListener::PointerDown) {
            return None;
        }
        let x = self.local_x(input.client_x);
        let change = self.gesture.as_mut()?.handle_down(x, input.client_y);
        self.pointer = PointerState::Dragging {
            pointer_id: input.pointer_id,
            down_at: at,
            down_x: input.client_x,
        };
        self.dispatch(change)
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Option<VisiblePortion> {
        if !self.listeners.contains(&InputListener::PointerMove) {
            return None;
        }
        let PointerState::Dragging { pointer_id, .. } = self.pointer else {
            return None;
        };
        if pointer_id != input.pointer_id {
            return None;
        }
        let x = self.local_x(input.client_x);
        let change = self.gesture.as_mut()?.handle_move(x, input.client_y);
        self.dispatch(change)
    }

    /// Finish a press. Returns how long it lasted so a click can be told from a drag.
    pub fn pointer_up(&mut self, input: PointerInput, at: Instant) -> Option<PointerRelease> {
        if !self.listeners.contains(&InputListener::PointerUp) {
            return None;
        }
        let PointerState::Dragging {
            pointer_id,
            down_at,
            down_x,
        } = self.pointer
        else {
            return None;
        };
        if pointer_id != input.pointer_id {
            return None;
        }
        self.pointer = PointerState::Idle;
        if let Some(change) = self.gesture.as_mut().and_then(|gesture| gesture.handle_up()) {
            self.on_change(change);
        }
        Some(PointerRelease {
            elapsed: at.saturating_duration_since(down_at),
            down_x,
            client_x: input.client_x,
        })
    }

    /// Wheel zoom. Mostly-horizontal wheels are page scrolls and are left alone.
    pub fn wheel(&mut self, input: WheelInput) -> Option<VisiblePortion> {
        if !self.listeners.contains(&InputListener::Wheel) {
            return None;
        }
        if !input.is_zoom() {
            tracing::trace!(delta_x = input.delta_x, "horizontal wheel ignored");
            return None;
        }
        let x = self.local_x(input.client_x);
        let change = self.gesture.as_mut()?.zoom_with_wheel(input.delta_y, x);
        self.dispatch(change)
    }

    /// Multiply the current scale, e.g. from +/- buttons.
    pub fn zoom_by(&mut self, factor: f64) -> Option<VisiblePortion> {
        let scale = self.scale() * factor;
        let change = self.gesture.as_mut()?.zoom(scale);
        self.dispatch(change)
    }

    /// First step of centring: apply the target zoom. The returned pan must run after the
    /// primitive has settled, via [`Self::pan_to`].
    pub fn zoom_to<Z: TimeZone>(&mut self, time: DateTime<Z>, scale: f64) -> Option<PendingPan<Z>> {
        let change = self.gesture.as_mut()?.zoom(scale);
        self.dispatch(change);
        Some(PendingPan {
            epoch: self.epoch,
            time,
        })
    }

    /// Second step of centring. Dropped if the controller was unmounted in between.
    pub fn pan_to<Z: TimeZone>(
        &mut self,
        pending: PendingPan<Z>,
        interval: &TimeInterval,
    ) -> Option<VisiblePortion> {
        if pending.epoch != self.epoch {
            tracing::debug!("controller remounted before pan, skipping");
            return None;
        }
        let container = self.container?;
        let gesture = self.gesture.as_mut()?;
        let x = centering_offset(&pending.time, interval, container.width, gesture.get_scale());
        let change = gesture.pan(x, 0.0);
        self.dispatch(change);
        Some(self.visible)
    }

    /// Zoom to `scale` (or the current scale), wait for the settle delay, then pan so
    /// `time` sits mid-container.
    pub async fn center_on_time<Z: TimeZone>(
        &mut self,
        time: DateTime<Z>,
        interval: &TimeInterval,
        scale: Option<f64>,
    ) -> Option<VisiblePortion> {
        let scale = scale.unwrap_or_else(|| self.scale());
        let pending = self.zoom_to(time, scale)?;
        tokio::time::sleep(self.options.settle_delay).await;
        self.pan_to(pending, interval)
    }

    /// Mobile mount behaviour: when the rendered day is today, zoom in on "now".
    pub fn mount_centering<Z: TimeZone>(
        &mut self,
        interval: &TimeInterval,
        now: DateTime<Z>,
    ) -> Option<PendingPan<Z>> {
        if !self.options.center_on_now || !interval.is_same_day(&now) {
            return None;
        }
        let scale = self.options.max_scale;
        self.zoom_to(now, scale)
    }
}
