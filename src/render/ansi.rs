use std::io::Write;

use crate::cursor;
use crate::error::Result;
use crate::geometry::Rect;
use crate::width::{display_width, truncate_to_width};

use super::surface::{FrameStatus, Surface, TileFrame};

const DRAG_GLYPH: char = '≡';
const GEAR_GLYPH: char = '*';
const RESIZE_GLYPH: char = '◢';

/// Renderer runtime parameters.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Blank cells between a frame's border and its content.
    pub padding: u16,
    pub clear_before_paint: bool,
    pub restore_cursor: Option<(u16, u16)>,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            padding: 1,
            clear_before_paint: true,
            restore_cursor: None,
        }
    }
}

/// Modal box painted above the tiles: the tile manager or a settings panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub title: String,
    pub lines: Vec<String>,
    pub selected: Option<usize>,
    pub footer: String,
}

impl Overlay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn selected(mut self, index: Option<usize>) -> Self {
        self.selected = index;
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }
}

/// ANSI escape code renderer painting the whole surface on every call.
pub struct AnsiRenderer {
    settings: RendererSettings,
}

impl AnsiRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn with_default() -> Self {
        Self::new(RendererSettings::default())
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    /// Paint frames in presentation order, then the toolbar row directly
    /// under the canvas, then the overlay if any.
    pub fn render(
        &mut self,
        writer: &mut impl Write,
        surface: &Surface,
        toolbar: &str,
        overlay: Option<&Overlay>,
    ) -> Result<()> {
        if self.settings.clear_before_paint {
            write!(writer, "{}", cursor::clear_screen())?;
        }

        let canvas = surface.canvas();
        let mut dragged = None;
        for frame in surface.frames() {
            if frame.drag_offset.is_some() {
                dragged = Some(frame);
                continue;
            }
            paint_frame(writer, frame, frame.rect, self.settings.padding)?;
        }
        // The dragged frame floats above its neighbours.
        if let Some(frame) = dragged {
            let rect = translate(frame.rect, frame.drag_offset.unwrap_or_default(), canvas);
            paint_frame(writer, frame, rect, self.settings.padding)?;
        }

        if canvas.width > 0 {
            let line = fit(toolbar, canvas.width);
            write!(
                writer,
                "{}{}{}{}",
                cursor::move_to_cell(canvas.x, canvas.bottom()),
                cursor::reverse(),
                line,
                cursor::reset()
            )?;
        }

        if let Some(overlay) = overlay {
            paint_overlay(writer, overlay, canvas)?;
        }

        if let Some((row, col)) = self.settings.restore_cursor {
            write!(writer, "{}", cursor::move_to(row + 1, col + 1))?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn translate(rect: Rect, (dx, dy): (i32, i32), canvas: Rect) -> Rect {
    let clamp = |origin: u16, delta: i32, min: u16, max: u16| -> u16 {
        let moved = i32::from(origin) + delta;
        moved.clamp(i32::from(min), i32::from(max.max(min))) as u16
    };
    Rect::new(
        clamp(
            rect.x,
            dx,
            canvas.x,
            canvas.right().saturating_sub(rect.width),
        ),
        clamp(
            rect.y,
            dy,
            canvas.y,
            canvas.bottom().saturating_sub(rect.height),
        ),
        rect.width,
        rect.height,
    )
}

fn paint_frame(writer: &mut impl Write, frame: &TileFrame, rect: Rect, padding: u16) -> Result<()> {
    if rect.width < 2 || rect.height < 2 {
        return Ok(());
    }
    let inner = usize::from(rect.width - 2);

    let color = match frame.status {
        FrameStatus::Ready => "",
        FrameStatus::Failed { .. } => cursor::red(),
        FrameStatus::Missing { .. } => cursor::yellow(),
    };

    // Top border carries the label and, while editable, the drag handle and gear.
    let (left, right) = if frame.editable {
        (DRAG_GLYPH, GEAR_GLYPH)
    } else {
        ('┌', '┐')
    };
    let title = fit(&format!(" {} ", frame.label), inner);
    let title = title.trim_end();
    let mut top = String::new();
    top.push(left);
    top.push_str(title);
    top.push_str(&"─".repeat(inner.saturating_sub(display_width(title))));
    top.push(right);
    write!(
        writer,
        "{}{}{}{}",
        cursor::move_to_cell(rect.x, rect.y),
        cursor::bold(),
        top,
        cursor::reset()
    )?;

    let pad = usize::from(padding).min(inner / 2);
    let body_width = inner - pad * 2;
    let body_rows = usize::from(rect.height - 2);
    let lines = wrap_to_width(&frame.content.lines().join("\n"), body_width);
    for row in 0..body_rows {
        let text = lines.get(row).map(String::as_str).unwrap_or("");
        write!(
            writer,
            "{}│{}{}{}{}{}│",
            cursor::move_to_cell(rect.x, rect.y + 1 + row as u16),
            " ".repeat(pad),
            color,
            fit(text, body_width),
            if color.is_empty() { "" } else { cursor::reset() },
            " ".repeat(pad),
        )?;
    }

    let corner = if frame.editable { RESIZE_GLYPH } else { '┘' };
    write!(
        writer,
        "{}└{}{}",
        cursor::move_to_cell(rect.x, rect.bottom() - 1),
        "─".repeat(inner),
        corner
    )?;
    Ok(())
}

fn paint_overlay(writer: &mut impl Write, overlay: &Overlay, canvas: Rect) -> Result<()> {
    let widest = overlay
        .lines
        .iter()
        .chain([&overlay.title, &overlay.footer])
        .map(|line| display_width(line))
        .max()
        .unwrap_or(0);
    let width = saturating_cells(widest)
        .saturating_add(4)
        .clamp(12, canvas.width.max(12));
    let extra_rows = if overlay.footer.is_empty() { 2 } else { 3 };
    let height = saturating_cells(overlay.lines.len())
        .saturating_add(extra_rows)
        .min(canvas.height.max(3));
    let x = canvas.x + canvas.width.saturating_sub(width) / 2;
    let y = canvas.y + canvas.height.saturating_sub(height) / 2;
    let inner = usize::from(width - 2);

    let title = fit(&format!(" {} ", overlay.title), inner);
    let title = title.trim_end();
    write!(
        writer,
        "{}{}┌{}{}┐{}",
        cursor::move_to_cell(x, y),
        cursor::bold(),
        title,
        "─".repeat(inner.saturating_sub(display_width(title))),
        cursor::reset()
    )?;

    let body_rows = usize::from(height.saturating_sub(extra_rows));
    for (row, line) in overlay.lines.iter().take(body_rows).enumerate() {
        let highlight = overlay.selected == Some(row);
        write!(
            writer,
            "{}│{}{}{}│",
            cursor::move_to_cell(x, y + 1 + row as u16),
            if highlight { cursor::reverse() } else { "" },
            fit(&format!(" {line}"), inner),
            cursor::reset()
        )?;
    }

    let mut next = y + 1 + body_rows as u16;
    if !overlay.footer.is_empty() {
        write!(
            writer,
            "{}│{}{}{}│",
            cursor::move_to_cell(x, next),
            cursor::dim(),
            fit(&format!(" {}", overlay.footer), inner),
            cursor::reset()
        )?;
        next += 1;
    }
    write!(
        writer,
        "{}└{}┘",
        cursor::move_to_cell(x, next),
        "─".repeat(inner)
    )?;
    Ok(())
}

fn saturating_cells(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

/// Truncate or pad `text` to exactly `width` cells.
fn fit(text: &str, width: impl Into<usize>) -> String {
    let width = width.into();
    let mut line = truncate_to_width(text, width);
    let used = display_width(&line);
    line.push_str(&" ".repeat(width.saturating_sub(used)));
    line
}

fn wrap_to_width(content: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for raw in content.split('\n') {
        let mut current = String::new();
        for word in raw.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if display_width(&candidate) <= width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // Words longer than a whole row are hard-split.
            let mut rest = word.to_string();
            while display_width(&rest) > width {
                let head = truncate_to_width(&rest, width);
                if head.is_empty() {
                    rest.clear();
                    break;
                }
                rest = rest[head.len()..].to_string();
                lines.push(head);
            }
            current = rest;
        }
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::GridSpec;
    use crate::model::{TileConfig, TileInstance, TileSize};

    fn surface(editable: bool) -> Surface {
        let ok = TileInstance::new("a", "notes", "Notes", TileSize::new(1, 1), 1, TileConfig::new());
        let bad = TileInstance::new("b", "feed", "Feed", TileSize::new(1, 1), 2, TileConfig::new());
        let mut first = TileFrame::new(&ok, editable);
        first.content.push_line("buy milk");
        let mut second = TileFrame::new(&bad, editable);
        second.fail("offline");

        let mut surface = Surface::new();
        surface.replace(vec![first, second]);
        surface.apply_placement(GridSpec::new(1, 5, 0), Rect::new(0, 0, 40, 10));
        surface
    }

    fn paint(surface: &Surface, overlay: Option<&Overlay>) -> String {
        let mut output = Vec::new();
        let mut renderer = AnsiRenderer::with_default();
        renderer.render(&mut output, surface, "EDIT", overlay).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn wrap_basic() {
        let lines = wrap_to_width("hello world", 5);
        assert_eq!(lines, vec!["hello".to_string(), "world".to_string()]);
        assert_eq!(wrap_to_width("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn frames_show_label_content_and_error_marker() {
        let rendered = paint(&surface(false), None);
        assert!(rendered.contains("Notes"));
        assert!(rendered.contains("buy milk"));
        assert!(rendered.contains("\x1b[31mError rendering tile: feed"));
        assert!(!rendered.contains(GEAR_GLYPH));
        assert!(rendered.contains("\x1b[11;1H\x1b[7mEDIT"));
    }

    #[test]
    fn editable_frames_expose_handles() {
        let rendered = paint(&surface(true), None);
        assert!(rendered.contains(DRAG_GLYPH));
        assert!(rendered.contains(GEAR_GLYPH));
        assert!(rendered.contains(RESIZE_GLYPH));
    }

    #[test]
    fn overlay_highlights_selection() {
        let overlay = Overlay::new("Tiles")
            .line("Clock")
            .line("Notes")
            .selected(Some(1))
            .footer("Esc closes");
        let rendered = paint(&surface(false), Some(&overlay));
        assert!(rendered.contains("Tiles"));
        assert!(rendered.contains("\x1b[7m Notes"));
        assert!(rendered.contains("Esc closes"));
    }

    #[test]
    fn oversized_overlays_are_clipped_to_the_canvas() {
        let overlay = Overlay::new("Tiles")
            .line(format!("Calendar: {}", "x".repeat(70_000)))
            .footer("Esc closes");
        let overlay = (0..70_000).fold(overlay, |o, i| o.line(i.to_string()));
        let rendered = paint(&surface(false), Some(&overlay));
        assert!(rendered.contains("Calendar: xxx"));
        assert!(!rendered.contains("x".repeat(100).as_str()));
    }

    #[test]
    fn dragged_frames_stay_on_canvas() {
        let moved = translate(Rect::new(0, 0, 10, 5), (-4, 100), Rect::new(0, 0, 40, 10));
        assert_eq!(moved, Rect::new(0, 5, 10, 5));
    }
}
