//! Two-finger pinch to zoom, single tap to focus.

use crate::camera::ZoomRange;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    /// Another finger went down while at least one was already pressed.
    SecondPointerDown,
    Move,
    PointerUp,
    Up,
    Cancel,
}

/// A touch event with the positions of every pointer currently down.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub pointers: Vec<Point>,
}

impl TouchEvent {
    pub fn new(action: TouchAction, pointers: Vec<Point>) -> Self {
        Self { action, pointers }
    }

    /// Distance between the first two pointers.
    pub fn finger_spacing(&self) -> Option<f32> {
        match self.pointers.as_slice() {
            [a, b, ..] => Some((a.x - b.x).hypot(a.y - b.y)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    None,
    /// Apply this zoom level.
    Zoom(u32),
    /// Request a single autofocus cycle.
    Focus,
}

#[derive(Debug, Clone)]
pub struct PinchZoom {
    threshold: f32,
    last_distance: f32,
}

impl PinchZoom {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(0.0),
            last_distance: 0.0,
        }
    }

    pub fn last_distance(&self) -> f32 {
        self.last_distance
    }

    pub fn on_touch(&mut self, event: &TouchEvent, zoom: Option<ZoomRange>) -> GestureOutcome {
        if event.pointers.len() > 1 {
            let distance = match event.finger_spacing() {
                Some(d) => d,
                None => return GestureOutcome::None,
            };
            match event.action {
                TouchAction::SecondPointerDown => {
                    self.last_distance = distance;
                    GestureOutcome::None
                }
                TouchAction::Move => match zoom {
                    Some(range) => self.step(distance, range),
                    None => GestureOutcome::None,
                },
                _ => GestureOutcome::None,
            }
        } else if event.action == TouchAction::Up {
            GestureOutcome::Focus
        } else {
            GestureOutcome::None
        }
    }

    fn step(&mut self, distance: f32, range: ZoomRange) -> GestureOutcome {
        let mut level = range.current.min(range.max);
        if distance - self.threshold > self.last_distance {
            if level < range.max {
                level += 1;
            }
        } else if distance + self.threshold < self.last_distance {
            level = level.saturating_sub(1);
        }
        self.last_distance = distance;
        if level == range.current {
            GestureOutcome::None
        } else {
            GestureOutcome::Zoom(level)
        }
    }
}

/// Turns a Ctrl+scroll on the preview into the two-finger events a pinch
/// would produce: scrolling up spreads the fingers, scrolling down pinches.
pub fn pinch_from_scroll(center: Point, delta_y: f32) -> [TouchEvent; 2] {
    const BASE_SPREAD: f32 = 200.0;
    let spread = (BASE_SPREAD + delta_y).max(0.0);
    let pair = |half: f32| {
        vec![
            Point::new(center.x - half, center.y),
            Point::new(center.x + half, center.y),
        ]
    };
    [
        TouchEvent::new(TouchAction::SecondPointerDown, pair(BASE_SPREAD / 2.0)),
        TouchEvent::new(TouchAction::Move, pair(spread / 2.0)),
    ]
}
