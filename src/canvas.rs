use crate::font::{FontId, FontRegistry};
use crate::pdf::ImageId;
use crate::types::{Color, Pt, Size};

/// Drawing commands in PDF user space (origin bottom-left, points).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetFont(FontId),
    SetFontSize(Pt),
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    Fill,
    Stroke,
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
    // Images are anchored at their bottom-left corner.
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        image: ImageId,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Text runs in drawing order.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            Command::DrawString { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    font: Option<FontId>,
    font_size: Pt,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            font: None,
            font_size: Pt::from_f32(12.0),
        }
    }
}

/// Records commands page by page, dropping redundant state changes.
pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    current_state: GraphicsState,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::new(),
            current_state: GraphicsState::default(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    /// Pages finished so far, not counting the one being drawn.
    pub fn finished_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.current.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = width.max(Pt::ZERO);
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_font(&mut self, font: FontId, size: Pt) {
        if self.current_state.font != Some(font) {
            self.current_state.font = Some(font);
            self.current.commands.push(Command::SetFont(font));
        }
        if self.current_state.font_size != size {
            self.current_state.font_size = size;
            self.current.commands.push(Command::SetFontSize(size));
        }
    }

    pub fn move_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::LineTo { x, y });
    }

    pub fn fill(&mut self) {
        self.current.commands.push(Command::Fill);
    }

    pub fn stroke(&mut self) {
        self.current.commands.push(Command::Stroke);
    }

    pub fn draw_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::DrawRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn fill_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, color: Color) {
        self.set_fill_color(color);
        self.draw_rect(x, y, width, height);
        self.fill();
    }

    pub fn stroke_line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.move_to(x1, y1);
        self.line_to(x2, y2);
        self.stroke();
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    /// Draws `text` horizontally centered on the page at baseline `y`,
    /// measured with the current font. Returns the left x used.
    pub fn draw_centered_string(&mut self, fonts: &FontRegistry, y: Pt, text: &str) -> Pt {
        let font = self.current_state.font.unwrap_or(FontRegistry::HELVETICA);
        let width = fonts.measure_text_width(font, self.current_state.font_size, text);
        let x = crate::units::centered_x(self.page_size.width, width);
        self.draw_string(x, y, text);
        x
    }

    pub fn draw_image(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, image: ImageId) {
        self.current.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            image,
        });
    }

    /// Closes the current page and starts a fresh one with default state.
    pub fn show_page(&mut self) {
        let page = std::mem::replace(&mut self.current, Page::new());
        self.pages.push(page);
        self.current_state = GraphicsState::default();
    }

    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_state_changes_are_dropped() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_fill_color(Color::BLACK);
        canvas.set_fill_color(Color::NAVY);
        canvas.set_fill_color(Color::NAVY);
        canvas.set_font(FontRegistry::HELVETICA_BOLD, Pt::from_f32(10.0));
        canvas.set_font(FontRegistry::HELVETICA_BOLD, Pt::from_f32(10.0));
        let doc = canvas.finish();
        assert_eq!(
            doc.pages[0].commands,
            vec![
                Command::SetFillColor(Color::NAVY),
                Command::SetFont(FontRegistry::HELVETICA_BOLD),
                Command::SetFontSize(Pt::from_f32(10.0)),
            ]
        );
    }

    #[test]
    fn show_page_resets_state_and_finish_keeps_trailing_page() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_fill_color(Color::NAVY);
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "one");
        canvas.show_page();
        canvas.set_fill_color(Color::NAVY);
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "two");
        assert_eq!(canvas.finished_pages(), 1);
        let doc = canvas.finish();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[1].commands[0], Command::SetFillColor(Color::NAVY));
        assert_eq!(doc.pages[1].strings().collect::<Vec<_>>(), vec!["two"]);
    }

    #[test]
    fn empty_canvas_still_has_one_page() {
        assert_eq!(Canvas::new(Size::a4()).finish().pages.len(), 1);
    }

    #[test]
    fn centered_string_uses_measured_width() {
        let fonts = FontRegistry::new();
        let mut canvas = Canvas::new(Size::new(Pt::from_f32(200.0), Pt::from_f32(100.0)));
        canvas.set_font(FontRegistry::HELVETICA_BOLD, Pt::from_f32(10.0));
        let x = canvas.draw_centered_string(&fonts, Pt::from_f32(50.0), "AB");
        assert!((x.to_f32() - (200.0 - 14.44) / 2.0).abs() < 1e-3);
    }
}
