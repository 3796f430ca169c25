use crate::geometry::{Point, Rect, Size};
use crate::layout::{GridSpec, place};
use crate::model::{TileInstance, TileSize};
use crate::settings::SettingsPanel;

/// Text lines a tile writes its content into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentHost {
    lines: Vec<String>,
}

impl ContentHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Replace everything with `text`, split on newlines.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    Ready,
    /// Inline error marker scoped to this tile.
    Failed { message: String },
    /// Placeholder for an instance whose type is not registered.
    Missing { type_id: String },
}

/// Visual frame for one rendered tile instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFrame {
    pub instance_id: String,
    pub type_id: String,
    pub label: String,
    pub size: TileSize,
    pub content: ContentHost,
    pub status: FrameStatus,
    /// Drag handle, resize handle and gear accept input only when set.
    pub editable: bool,
    pub panel: SettingsPanel,
    pub rect: Rect,
    /// Visual-only translation while a drag is in flight.
    pub drag_offset: Option<(i32, i32)>,
    /// Span shown while a resize is in flight.
    pub live_size: Option<TileSize>,
}

impl TileFrame {
    pub fn new(tile: &TileInstance, editable: bool) -> Self {
        Self {
            instance_id: tile.instance_id.clone(),
            type_id: tile.type_id.clone(),
            label: tile.label.clone(),
            size: tile.size(),
            content: ContentHost::new(),
            status: FrameStatus::Ready,
            editable,
            panel: SettingsPanel::new(tile.instance_id.clone(), tile.label.clone()),
            rect: Rect::default(),
            drag_offset: None,
            live_size: None,
        }
    }

    pub fn missing(tile: &TileInstance, editable: bool) -> Self {
        let mut frame = Self::new(tile, editable);
        frame.content.push_line(format!("Missing tile type `{}`", tile.type_id));
        frame.status = FrameStatus::Missing {
            type_id: tile.type_id.clone(),
        };
        frame
    }

    /// Swap whatever the tile drew for the inline error marker.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.content.clear();
        self.content
            .push_line(format!("Error rendering tile: {}", self.type_id));
        self.status = FrameStatus::Failed {
            message: message.into(),
        };
    }

    pub fn display_size(&self) -> TileSize {
        self.live_size.unwrap_or(self.size)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, FrameStatus::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FrameStatus::Failed { .. })
    }

    pub fn drag_handle(&self) -> Rect {
        Rect::new(self.rect.x, self.rect.y, 1, 1)
    }

    pub fn gear(&self) -> Rect {
        Rect::new(self.rect.right().saturating_sub(1), self.rect.y, 1, 1)
    }

    pub fn resize_handle(&self) -> Rect {
        Rect::new(
            self.rect.right().saturating_sub(1),
            self.rect.bottom().saturating_sub(1),
            1,
            1,
        )
    }
}

/// Which part of the canvas a pointer landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    EmptyCanvas,
    DragHandle(String),
    ResizeHandle(String),
    Gear(String),
    Body(String),
    Outside,
}

/// Retained visual model rebuilt on every render pass.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    frames: Vec<TileFrame>,
    canvas: Rect,
    generation: u64,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn replace(&mut self, frames: Vec<TileFrame>) {
        self.frames = frames;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn frames(&self) -> &[TileFrame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [TileFrame] {
        &mut self.frames
    }

    pub fn frame(&self, instance_id: &str) -> Option<&TileFrame> {
        self.frames.iter().find(|f| f.instance_id == instance_id)
    }

    pub fn frame_mut(&mut self, instance_id: &str) -> Option<&mut TileFrame> {
        self.frames.iter_mut().find(|f| f.instance_id == instance_id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of completed render passes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn canvas(&self) -> Rect {
        self.canvas
    }

    pub fn healthy_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_ready()).count()
    }

    pub fn error_markers(&self) -> usize {
        self.frames.iter().filter(|f| f.is_failed()).count()
    }

    pub fn set_editable(&mut self, editable: bool) {
        for frame in &mut self.frames {
            frame.editable = editable;
        }
    }

    pub fn close_panels(&mut self) {
        for frame in &mut self.frames {
            frame.panel.open = false;
        }
    }

    pub fn open_panel(&self) -> Option<&TileFrame> {
        self.frames.iter().find(|f| f.panel.open)
    }

    pub fn clear_previews(&mut self) {
        for frame in &mut self.frames {
            frame.drag_offset = None;
            frame.live_size = None;
        }
    }

    /// Recompute every frame's rect from its displayed span.
    pub fn apply_placement(&mut self, spec: GridSpec, canvas: Rect) {
        self.canvas = canvas;
        let sizes: Vec<TileSize> = self.frames.iter().map(TileFrame::display_size).collect();
        let rects = place(spec, canvas, &sizes);
        for (frame, rect) in self.frames.iter_mut().zip(rects) {
            frame.rect = rect;
        }
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas.width, self.canvas.height)
    }

    pub fn hit_test(&self, at: Point) -> HitTarget {
        if !self.canvas.contains(at) {
            return HitTarget::Outside;
        }
        for frame in &self.frames {
            if !frame.rect.contains(at) {
                continue;
            }
            let id = frame.instance_id.clone();
            if frame.drag_handle().contains(at) {
                return HitTarget::DragHandle(id);
            }
            if frame.resize_handle().contains(at) {
                return HitTarget::ResizeHandle(id);
            }
            if frame.gear().contains(at) {
                return HitTarget::Gear(id);
            }
            return HitTarget::Body(id);
        }
        HitTarget::EmptyCanvas
    }

    /// Nearest other frame to `center`, by center-to-center distance.
    /// Ties go to the earlier frame in presentation order.
    pub fn nearest_other(&self, exclude: &str, center: (f64, f64)) -> Option<&TileFrame> {
        let mut best: Option<(&TileFrame, f64)> = None;
        for frame in self.frames.iter().filter(|f| f.instance_id != exclude) {
            let (cx, cy) = frame.rect.center();
            let distance = ((cx - center.0).powi(2) + (cy - center.1).powi(2)).sqrt();
            match best {
                Some((_, d)) if d <= distance => {}
                _ => best = Some((frame, distance)),
            }
        }
        best.map(|(frame, _)| frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TileConfig;

    fn frame(id: &str, cols: u16, rows: u16) -> TileFrame {
        let tile = TileInstance::new(id, "t", id, TileSize::new(cols, rows), 1, TileConfig::new());
        TileFrame::new(&tile, true)
    }

    fn surface() -> Surface {
        let mut surface = Surface::new();
        surface.replace(vec![frame("a", 1, 1), frame("b", 1, 1), frame("c", 2, 1)]);
        let spec = GridSpec::new(4, 3, 0);
        surface.apply_placement(spec, Rect::new(0, 0, 40, 20));
        surface
    }

    #[test]
    fn fail_replaces_content_with_marker() {
        let mut frame = frame("x", 1, 1);
        frame.content.push_line("partial");
        frame.fail("boom");
        assert!(frame.is_failed());
        assert_eq!(frame.content.lines(), ["Error rendering tile: t"]);
    }

    #[test]
    fn hit_test_distinguishes_chrome() {
        let surface = surface();
        let a = surface.frame("a").unwrap().rect;
        assert_eq!(a, Rect::new(0, 0, 10, 3));
        assert_eq!(surface.hit_test(Point::new(0, 0)), HitTarget::DragHandle("a".into()));
        assert_eq!(surface.hit_test(Point::new(9, 0)), HitTarget::Gear("a".into()));
        assert_eq!(surface.hit_test(Point::new(9, 2)), HitTarget::ResizeHandle("a".into()));
        assert_eq!(surface.hit_test(Point::new(4, 1)), HitTarget::Body("a".into()));
        assert_eq!(surface.hit_test(Point::new(5, 10)), HitTarget::EmptyCanvas);
        assert_eq!(surface.hit_test(Point::new(50, 1)), HitTarget::Outside);
    }

    #[test]
    fn nearest_other_skips_excluded_frame() {
        let surface = surface();
        let a_center = surface.frame("a").unwrap().rect.center();
        let nearest = surface.nearest_other("a", a_center).unwrap();
        assert_eq!(nearest.instance_id, "b");
        assert!(Surface::new().nearest_other("a", (0.0, 0.0)).is_none());
    }
}
