//! Zoom, pan and pointer handling over a large logical canvas.
//!
//! Screen position = viewport center + pan + scene position * scale.

use blockview_core::{Rect, Vec2};
use blockview_events::{ObserverList, Subscription};
use blockview_graph::DetailLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Zoom-out floor.
    pub min_scale: f32,
    pub max_scale: f32,
    /// Below this scale only block silhouettes are drawn.
    pub lod_threshold: f32,
    /// Pointer travel (screen pixels) that turns a press into a drag.
    pub drag_threshold: f32,
    /// Half-size of the logical canvas in scene units.
    pub extent: f32,
    /// Zoom factor per wheel step.
    pub zoom_step: f32,
    /// Screen padding kept around the scene by `zoom_to_fit`.
    pub fit_padding: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.015,
            max_scale: 4.0,
            lod_threshold: 0.3,
            drag_threshold: 4.0,
            extent: 500_000.0,
            zoom_step: 1.25,
            fit_padding: 20.0,
        }
    }
}

/// Emitted whenever the visible content needs repainting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawRequest;

/// What a completed pointer gesture amounts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    /// Released below the drag threshold; carries the scene position.
    Click(Vec2),
    DragFinished,
    /// Release without a matching press.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    start_screen: Vec2,
    start_pan: Vec2,
    dragging: bool,
}

#[derive(Debug)]
pub struct Viewport {
    config: ViewportConfig,
    scale: f32,
    pan: Vec2,
    size: Vec2,
    drag: Option<DragState>,
    redraw: ObserverList<RedrawRequest>,
}

impl Viewport {
    pub fn new(config: ViewportConfig, size: Vec2) -> Self {
        Self {
            config,
            scale: 1.0,
            pan: Vec2::ZERO,
            size,
            drag: None,
            redraw: ObserverList::new(),
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.pan
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some_and(|drag| drag.dragging)
    }

    pub fn resize(&mut self, size: Vec2) {
        self.size = Vec2::new(size.x.max(0.0), size.y.max(0.0));
        self.request_redraw();
    }

    fn screen_center(&self) -> Vec2 {
        self.size / 2.0
    }

    pub fn scene_to_screen(&self, scene: Vec2) -> Vec2 {
        self.screen_center() + self.pan + scene * self.scale
    }

    pub fn screen_to_scene(&self, screen: Vec2) -> Vec2 {
        (screen - self.screen_center() - self.pan) / self.scale
    }

    /// Scene point shown at the middle of the viewport.
    pub fn center(&self) -> Vec2 {
        self.screen_to_scene(self.screen_center())
    }

    pub fn visible_scene_rect(&self) -> Rect {
        Rect::from_min_max(self.screen_to_scene(Vec2::ZERO), self.screen_to_scene(self.size))
    }

    /// Keep the visible center on the logical canvas.
    fn clamp_pan(&mut self) {
        let limit = self.config.extent * self.scale;
        self.pan = Vec2::new(self.pan.x.clamp(-limit, limit), self.pan.y.clamp(-limit, limit));
    }

    /// Multiply the scale by `factor`, keeping `anchor` (screen) fixed.
    ///
    /// Returns false when the clamp leaves the scale unchanged.
    pub fn zoom(&mut self, factor: f32, anchor: Vec2) -> bool {
        if !(factor.is_finite() && factor > 0.0) {
            tracing::debug!("Ignoring zoom factor {}", factor);
            return false;
        }
        let new_scale = (self.scale * factor).clamp(self.config.min_scale, self.config.max_scale);
        if (new_scale - self.scale).abs() <= f32::EPSILON * self.scale {
            return false;
        }
        let anchored = self.screen_to_scene(anchor);
        self.scale = new_scale;
        self.pan = anchor - self.screen_center() - anchored * self.scale;
        self.clamp_pan();
        self.request_redraw();
        true
    }

    /// Wheel zoom: positive steps zoom in.
    pub fn wheel(&mut self, steps: f32, anchor: Vec2) -> bool {
        self.zoom(self.config.zoom_step.powf(steps), anchor)
    }

    /// Move the visible region by `delta` scene units.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan -= delta * self.scale;
        self.clamp_pan();
        self.request_redraw();
    }

    pub fn center_on(&mut self, scene: Vec2) {
        self.pan = Vec2::ZERO - scene * self.scale;
        self.clamp_pan();
        self.request_redraw();
    }

    /// Back to scale 1 centered on `initial`.
    pub fn reset_view(&mut self, initial: Vec2) {
        self.scale = 1.0;
        self.center_on(initial);
    }

    /// Center `bounds`, zooming out only when it does not fit at scale 1.
    pub fn zoom_to_fit(&mut self, bounds: Rect) {
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            self.center_on(bounds.center());
            return;
        }
        let padding = self.config.fit_padding * 2.0;
        let available = Vec2::new((self.size.x - padding).max(1.0), (self.size.y - padding).max(1.0));
        let fit = (available.x / bounds.width()).min(available.y / bounds.height());
        self.scale = fit.min(1.0).clamp(self.config.min_scale, self.config.max_scale);
        self.center_on(bounds.center());
    }

    /// Pan just enough to bring `rect` into view, centering it when it is off screen.
    pub fn ensure_visible(&mut self, rect: Rect) {
        let visible = self.visible_scene_rect();
        let inside = rect.min.x >= visible.min.x
            && rect.min.y >= visible.min.y
            && rect.max.x <= visible.max.x
            && rect.max.y <= visible.max.y;
        if !inside {
            self.center_on(rect.center());
        }
    }

    pub fn detail_level(&self) -> DetailLevel {
        if self.scale < self.config.lod_threshold {
            DetailLevel::Silhouette
        } else {
            DetailLevel::Full
        }
    }

    pub fn pointer_pressed(&mut self, screen: Vec2) {
        self.drag = Some(DragState {
            start_screen: screen,
            start_pan: self.pan,
            dragging: false,
        });
    }

    /// Returns true while the gesture is a drag.
    pub fn pointer_moved(&mut self, screen: Vec2) -> bool {
        let Some(mut drag) = self.drag else {
            return false;
        };
        let travel = screen - drag.start_screen;
        if !drag.dragging && travel.length() >= self.config.drag_threshold {
            drag.dragging = true;
        }
        if drag.dragging {
            self.pan = drag.start_pan + travel;
            self.clamp_pan();
            self.request_redraw();
        }
        self.drag = Some(drag);
        drag.dragging
    }

    pub fn pointer_released(&mut self, screen: Vec2) -> PointerOutcome {
        match self.drag.take() {
            Some(drag) if drag.dragging => PointerOutcome::DragFinished,
            Some(_) => PointerOutcome::Click(self.screen_to_scene(screen)),
            None => PointerOutcome::Ignored,
        }
    }

    /// Another handle to the redraw observer list.
    pub fn redraw_notifier(&self) -> ObserverList<RedrawRequest> {
        self.redraw.clone()
    }

    pub fn subscribe_redraw(&self, callback: impl FnMut(&RedrawRequest) + 'static) -> Subscription {
        self.redraw.subscribe(callback)
    }

    pub fn request_redraw(&self) {
        self.redraw.notify(&RedrawRequest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn viewport() -> Viewport {
        Viewport::new(ViewportConfig::default(), Vec2::new(800.0, 600.0))
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-2
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut vp = viewport();
        vp.center_on(Vec2::new(100.0, 50.0));
        let anchor = Vec2::new(620.0, 130.0);
        let before = vp.screen_to_scene(anchor);

        assert!(vp.zoom(2.0, anchor));
        assert_eq!(vp.scale(), 2.0);
        assert!(close(vp.screen_to_scene(anchor), before));
    }

    #[test]
    fn test_zoom_clamps_at_minimum() {
        let mut vp = viewport();
        for _ in 0..100 {
            vp.wheel(-1.0, Vec2::new(400.0, 300.0));
        }
        assert_eq!(vp.scale(), 0.015);
        assert!(!vp.zoom(0.5, Vec2::ZERO));
        assert_eq!(vp.detail_level(), DetailLevel::Silhouette);
    }

    #[test]
    fn test_detail_threshold() {
        let mut vp = viewport();
        assert_eq!(vp.detail_level(), DetailLevel::Full);
        vp.zoom(0.29, Vec2::ZERO);
        assert_eq!(vp.detail_level(), DetailLevel::Silhouette);
    }

    #[test]
    fn test_pan_moves_visible_region_in_scene_units() {
        let mut vp = viewport();
        vp.zoom(2.0, Vec2::new(400.0, 300.0));
        let before = vp.center();
        vp.pan(Vec2::new(30.0, -10.0));
        assert!(close(vp.center(), before + Vec2::new(30.0, -10.0)));
    }

    #[test]
    fn test_pan_is_clamped_to_extent() {
        let mut vp = viewport();
        vp.pan(Vec2::new(10_000_000.0, 0.0));
        assert!(close(vp.center(), Vec2::new(500_000.0, 0.0)));
    }

    #[test]
    fn test_small_movement_is_a_click() {
        let mut vp = viewport();
        vp.pointer_pressed(Vec2::new(400.0, 300.0));
        assert!(!vp.pointer_moved(Vec2::new(402.0, 301.0)));
        assert_eq!(vp.pointer_released(Vec2::new(402.0, 301.0)), PointerOutcome::Click(Vec2::new(2.0, 1.0)));
        assert_eq!(vp.pan_offset(), Vec2::ZERO);
    }

    #[test]
    fn test_drag_pans() {
        let mut vp = viewport();
        vp.pointer_pressed(Vec2::new(400.0, 300.0));
        assert!(vp.pointer_moved(Vec2::new(450.0, 280.0)));
        assert!(vp.is_dragging());
        assert_eq!(vp.pointer_released(Vec2::new(450.0, 280.0)), PointerOutcome::DragFinished);
        assert!(close(vp.center(), Vec2::new(-50.0, 20.0)));
        assert_eq!(vp.pointer_released(Vec2::ZERO), PointerOutcome::Ignored);
    }

    #[test]
    fn test_zoom_to_fit() {
        let mut vp = viewport();
        vp.zoom_to_fit(Rect::from_pos_size(Vec2::new(0.0, 0.0), Vec2::new(200.0, 100.0)));
        assert_eq!(vp.scale(), 1.0);
        assert!(close(vp.center(), Vec2::new(100.0, 50.0)));

        vp.zoom_to_fit(Rect::from_pos_size(Vec2::new(0.0, 0.0), Vec2::new(3040.0, 560.0)));
        assert!((vp.scale() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_redraw_notifications() {
        let vp = viewport();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let sub = vp.subscribe_redraw(move |_| counter.set(counter.get() + 1));
        vp.request_redraw();
        vp.request_redraw();
        sub.cancel();
        vp.request_redraw();
        assert_eq!(count.get(), 2);
    }

    proptest! {
        #[test]
        fn prop_scale_stays_within_bounds(steps in proptest::collection::vec(-5.0f32..5.0, 1..60)) {
            let mut vp = viewport();
            for step in steps {
                vp.wheel(step, Vec2::new(123.0, 456.0));
                prop_assert!(vp.scale() >= vp.config().min_scale);
                prop_assert!(vp.scale() <= vp.config().max_scale);
            }
        }
    }
}
