use crate::geometry::{Point, Rect};
use crate::model::TileSize;

/// New span after moving `delta` cells, in whole grid units clamped to
/// `[1, max]`.
pub fn resize_span(start: u16, delta: i32, unit: f64, max: u16) -> u16 {
    let unit = if unit.is_finite() && unit >= 1.0 { unit } else { 1.0 };
    let span = (f64::from(start) + f64::from(delta) / unit).round();
    span.clamp(1.0, f64::from(max.max(1))) as u16
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub instance_id: String,
    pub start: Point,
    /// Frame rect when the drag began.
    pub origin: Rect,
    pub offset: (i32, i32),
}

impl DragSession {
    pub fn update(&mut self, pointer: Point) -> (i32, i32) {
        self.offset = pointer.delta_from(self.start);
        self.offset
    }

    /// Center of the dragged frame at its previewed position.
    pub fn dropped_center(&self) -> (f64, f64) {
        let (cx, cy) = self.origin.center();
        (cx + f64::from(self.offset.0), cy + f64::from(self.offset.1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub instance_id: String,
    pub start: Point,
    pub start_size: TileSize,
    pub current: TileSize,
}

impl ResizeSession {
    pub fn update(
        &mut self,
        pointer: Point,
        column_unit: f64,
        row_unit: f64,
        columns: u16,
        row_cap: u16,
    ) -> TileSize {
        let (dx, dy) = pointer.delta_from(self.start);
        self.current = TileSize {
            col_span: resize_span(self.start_size.col_span, dx, column_unit, columns),
            row_span: resize_span(self.start_size.row_span, dy, row_unit, row_cap),
        };
        self.current
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Drag(DragSession),
    Resize(ResizeSession),
}

impl Gesture {
    pub fn instance_id(&self) -> &str {
        match self {
            Gesture::Drag(session) => &session.instance_id,
            Gesture::Resize(session) => &session.instance_id,
        }
    }
}

/// Holds at most one drag or resize session.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    active: Option<Gesture>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&Gesture> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Gesture> {
        self.active.as_mut()
    }

    /// Returns false, leaving the current session alone, when one is in flight.
    pub fn begin_drag(&mut self, instance_id: &str, start: Point, origin: Rect) -> bool {
        self.begin(Gesture::Drag(DragSession {
            instance_id: instance_id.to_string(),
            start,
            origin,
            offset: (0, 0),
        }))
    }

    pub fn begin_resize(&mut self, instance_id: &str, start: Point, size: TileSize) -> bool {
        self.begin(Gesture::Resize(ResizeSession {
            instance_id: instance_id.to_string(),
            start,
            start_size: size,
            current: size,
        }))
    }

    fn begin(&mut self, gesture: Gesture) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(gesture);
        true
    }

    /// End the session, handing it back for commit.
    pub fn finish(&mut self) -> Option<Gesture> {
        self.active.take()
    }

    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }
}
