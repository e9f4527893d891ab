//! Hint tooltip controller.
//!
//! At most one tooltip is open at a time. The page feeds pointer, tap,
//! resize and scroll events in; the controller decides what is open and
//! where it goes. Drawing it is the page's job.

use log::debug;

use crate::dom::NodeId;

/// Viewports at or below this width use the narrow layout.
pub const MOBILE_BREAKPOINT: f64 = 768.0;
pub const MOBILE_WIDTH_RATIO: f64 = 0.6;
pub const DESKTOP_MAX_WIDTH: f64 = 500.0;
/// Minimum distance between the tooltip and the viewport edges.
pub const VIEWPORT_MARGIN: f64 = 10.0;
/// Gap between the tooltip's bottom edge and the marker.
pub const MARKER_GAP: f64 = 10.0;

/// A client rectangle (viewport coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Viewport {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn scrolled(mut self, x: f64, y: f64) -> Self {
        self.scroll_x = x;
        self.scroll_y = y;
        self
    }
}

/// Measures the single-line rendered width of a hint, padding included.
pub trait TextMeasure {
    fn single_line_width(&self, text: &str) -> f64;
}

impl<F> TextMeasure for F
where
    F: Fn(&str) -> f64,
{
    fn single_line_width(&self, text: &str) -> f64 {
        self(text)
    }
}

/// Document-coordinate placement. `top` is the tooltip's bottom edge; the
/// page shifts it up by its own height (`translateY(-100%)`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TooltipLayout {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub max_width: f64,
    pub single_line: bool,
}

impl TooltipLayout {
    /// Compute placement for a hint over the marker at `rect`.
    pub fn compute(hint: &str, rect: Rect, viewport: Viewport, measure: &dyn TextMeasure) -> Self {
        let max_width = max_width(viewport.width);
        let natural = measure.single_line_width(hint);
        let single_line = natural <= max_width;
        let width = if single_line { natural } else { max_width };

        let mut layout = Self {
            left: 0.0,
            top: 0.0,
            width,
            max_width,
            single_line,
        };
        layout.place(rect, viewport);
        layout
    }

    /// Re-anchor over `rect`, keeping the measured width.
    pub fn place(&mut self, rect: Rect, viewport: Viewport) {
        let center = rect.left + rect.width / 2.0 + viewport.scroll_x;
        let mut left = center - self.width / 2.0;
        if left < VIEWPORT_MARGIN {
            left = VIEWPORT_MARGIN;
        } else if left + self.width > viewport.width - VIEWPORT_MARGIN {
            left = viewport.width - VIEWPORT_MARGIN - self.width;
        }
        self.left = left;
        self.top = rect.top + viewport.scroll_y - MARKER_GAP;
    }

    /// Inline CSS for the tooltip element.
    pub fn style(&self) -> String {
        let (white_space, width) = if self.single_line {
            ("nowrap", "fit-content".to_string())
        } else {
            ("normal", format!("{}px", self.max_width))
        };
        format!(
            "position: absolute; left: {}px; top: {}px; max-width: {}px; width: {width}; white-space: {white_space}; transform: translateY(-100%);",
            self.left, self.top, self.max_width
        )
    }
}

fn max_width(viewport_width: f64) -> f64 {
    if viewport_width <= MOBILE_BREAKPOINT {
        viewport_width * MOBILE_WIDTH_RATIO
    } else {
        DESKTOP_MAX_WIDTH
    }
}

/// How the open tooltip was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Hover,
    Tap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenTooltip {
    pub marker: NodeId,
    pub hint: String,
    pub trigger: Trigger,
    pub layout: TooltipLayout,
}

/// Single-tooltip state machine.
#[derive(Debug, Default)]
pub struct TooltipController {
    touch_device: bool,
    open: Option<OpenTooltip>,
}

impl TooltipController {
    pub fn new(touch_device: bool) -> Self {
        Self {
            touch_device,
            open: None,
        }
    }

    pub fn current(&self) -> Option<&OpenTooltip> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Pointer entered a marker. Touch devices get no hover tooltips.
    pub fn pointer_enter(
        &mut self,
        marker: NodeId,
        hint: &str,
        rect: Rect,
        viewport: Viewport,
        measure: &dyn TextMeasure,
    ) -> Option<&OpenTooltip> {
        if self.touch_device {
            return None;
        }
        self.show(marker, hint, Trigger::Hover, rect, viewport, measure)
    }

    /// Pointer left a marker; its tooltip closes.
    pub fn pointer_leave(&mut self, marker: NodeId) {
        if !self.touch_device && self.open.as_ref().is_some_and(|t| t.marker == marker) {
            self.close();
        }
    }

    /// Tap or click on a marker. Tapping the marker whose tooltip is open
    /// closes it.
    pub fn tap(
        &mut self,
        marker: NodeId,
        hint: &str,
        rect: Rect,
        viewport: Viewport,
        measure: &dyn TextMeasure,
    ) -> Option<&OpenTooltip> {
        if self.open.as_ref().is_some_and(|t| t.marker == marker) {
            self.close();
            return None;
        }
        self.show(marker, hint, Trigger::Tap, rect, viewport, measure)
    }

    /// Tap anywhere outside the open marker.
    pub fn outside_tap(&mut self) {
        self.close();
    }

    /// The viewport changed size; follow the marker, now at `rect`.
    pub fn resize(&mut self, rect: Rect, viewport: Viewport) {
        if let Some(open) = &mut self.open {
            open.layout.place(rect, viewport);
        }
    }

    pub fn scroll(&mut self) {
        self.close();
    }

    /// Forget the open tooltip; its marker is gone after a chapter swap.
    pub fn clear(&mut self) {
        self.open = None;
    }

    fn close(&mut self) {
        if let Some(open) = self.open.take() {
            debug!("Tooltip closed for marker {:?}", open.marker);
        }
    }

    fn show(
        &mut self,
        marker: NodeId,
        hint: &str,
        trigger: Trigger,
        rect: Rect,
        viewport: Viewport,
        measure: &dyn TextMeasure,
    ) -> Option<&OpenTooltip> {
        let layout = TooltipLayout::compute(hint, rect, viewport, measure);
        self.open = Some(OpenTooltip {
            marker,
            hint: hint.to_string(),
            trigger,
            layout,
        });
        self.open.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(width: f64) -> impl Fn(&str) -> f64 {
        move |_| width
    }

    #[test]
    fn test_single_line_is_centered_above_marker() {
        let rect = Rect::new(400.0, 300.0, 60.0, 20.0);
        let viewport = Viewport::new(1200.0).scrolled(0.0, 1000.0);
        let layout = TooltipLayout::compute("подсказка", rect, viewport, &fixed(120.0));

        assert!(layout.single_line);
        assert_eq!(layout.width, 120.0);
        assert_eq!(layout.max_width, 500.0);
        assert_eq!(layout.left, 370.0);
        assert_eq!(layout.top, 1290.0);
    }

    #[test]
    fn test_long_hint_wraps_at_max_width() {
        let rect = Rect::new(600.0, 100.0, 40.0, 20.0);
        let layout = TooltipLayout::compute("…", rect, Viewport::new(1200.0), &fixed(900.0));
        assert!(!layout.single_line);
        assert_eq!(layout.width, 500.0);
        assert!(layout.style().contains("white-space: normal"));
    }

    #[test]
    fn test_mobile_max_width() {
        let rect = Rect::new(100.0, 100.0, 40.0, 20.0);
        let layout = TooltipLayout::compute("…", rect, Viewport::new(400.0), &fixed(300.0));
        assert_eq!(layout.max_width, 240.0);
        assert_eq!(layout.width, 240.0);
    }

    #[test]
    fn test_clamped_to_viewport_margins() {
        let viewport = Viewport::new(1000.0);
        let near_left = TooltipLayout::compute("x", Rect::new(0.0, 50.0, 20.0, 10.0), viewport, &fixed(200.0));
        assert_eq!(near_left.left, 10.0);

        let near_right =
            TooltipLayout::compute("x", Rect::new(980.0, 50.0, 20.0, 10.0), viewport, &fixed(200.0));
        assert_eq!(near_right.left, 790.0);
    }

    #[test]
    fn test_hover_ignored_on_touch_devices() {
        let mut controller = TooltipController::new(true);
        let opened = controller.pointer_enter(NodeId(1), "x", Rect::default(), Viewport::new(800.0), &fixed(50.0));
        assert!(opened.is_none());
        assert!(!controller.is_open());
    }

    #[test]
    fn test_hover_then_leave() {
        let mut controller = TooltipController::new(false);
        controller.pointer_enter(NodeId(1), "x", Rect::default(), Viewport::new(800.0), &fixed(50.0));
        assert_eq!(controller.current().unwrap().trigger, Trigger::Hover);

        controller.pointer_leave(NodeId(2));
        assert!(controller.is_open());
        controller.pointer_leave(NodeId(1));
        assert!(!controller.is_open());
    }

    #[test]
    fn test_tap_toggles_and_outside_tap_closes() {
        let mut controller = TooltipController::new(true);
        let viewport = Viewport::new(400.0);
        controller.tap(NodeId(1), "первая", Rect::default(), viewport, &fixed(50.0));
        controller.tap(NodeId(2), "вторая", Rect::default(), viewport, &fixed(50.0));
        assert_eq!(controller.current().unwrap().hint, "вторая");

        controller.tap(NodeId(2), "вторая", Rect::default(), viewport, &fixed(50.0));
        assert!(!controller.is_open());

        controller.tap(NodeId(1), "первая", Rect::default(), viewport, &fixed(50.0));
        controller.outside_tap();
        assert!(!controller.is_open());
    }

    #[test]
    fn test_resize_repositions_and_scroll_closes() {
        let mut controller = TooltipController::new(false);
        controller.tap(NodeId(1), "x", Rect::new(100.0, 100.0, 20.0, 10.0), Viewport::new(1000.0), &fixed(40.0));
        controller.resize(Rect::new(300.0, 80.0, 20.0, 10.0), Viewport::new(900.0));

        let layout = controller.current().unwrap().layout;
        assert_eq!(layout.left, 290.0);
        assert_eq!(layout.top, 70.0);
        assert_eq!(layout.width, 40.0);

        controller.scroll();
        assert!(controller.current().is_none());
    }
}
