//! Participant rosters: one tabular block per competition class, optionally
//! spanning several playing fields, accumulated into a single PDF.

use crate::canvas::Canvas;
use crate::doc_context::DocContext;
use crate::error::PiagamError;
use crate::font::{FontId, FontRegistry};
use crate::model::{ClassDefinition, ParticipationRecord};
use crate::naming::{batch_roster_filename, indonesian_long_date, roster_filename};
use crate::pdf::{ImageId, PdfDocument};
use crate::types::{Color, Pt, Size};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const MARGIN: f32 = 40.0;
const LOGO_SIZE: f32 = 60.0;
const LOGO_GAP: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const TITLE_LINE_GAP: f32 = 20.0;
const INFO_ROW_HEIGHT: f32 = 18.0;
const INFO_LABEL_WIDTH: f32 = 90.0;
const TEXT_SIZE: f32 = 10.0;
const HEADER_ROW_HEIGHT: f32 = 20.0;
const ROW_HEIGHT: f32 = 18.0;
const BOTTOM_MARGIN: f32 = 50.0;
const COL_NO: f32 = 8.0;
const COL_NAME: f32 = 45.0;
const COL_CLUB: f32 = 300.0;
const ROW_SHADE: f32 = 0.95;

/// One class block of a roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterGroup {
    #[serde(default)]
    pub class: Option<ClassDefinition>,
    pub class_name: String,
    pub field_name: String,
    #[serde(default)]
    pub participants: Vec<ParticipationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchExportRequest {
    pub competition_name: String,
    pub export_date: NaiveDate,
    #[serde(default)]
    pub left_logo: Option<String>,
    #[serde(default)]
    pub right_logo: Option<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
    pub groups: Vec<RosterGroup>,
}

impl BatchExportRequest {
    fn field_names(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for group in &self.groups {
            if !fields.contains(&group.field_name.as_str()) {
                fields.push(&group.field_name);
            }
        }
        fields
    }

    /// Single field: field name plus weekday and date; several fields: `BATCH` prefix.
    pub fn filename(&self) -> String {
        match self.field_names().as_slice() {
            [single] => roster_filename(single, self.export_date),
            _ => batch_roster_filename(self.export_date),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RosterOutcome {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub participant_count: usize,
}

/// Splits a title into two lines at the word-count midpoint. Titles of a
/// single word cannot be split.
pub fn split_title(title: &str) -> Option<(String, String)> {
    let words: Vec<&str> = title.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    let mid = words.len().div_ceil(2);
    Some((words[..mid].join(" "), words[mid..].join(" ")))
}

/// Title lines for the header: one line when it fits `available`, two otherwise.
pub fn title_lines(fonts: &FontRegistry, font: FontId, title: &str, available: Pt) -> Vec<String> {
    let title = title.trim();
    let width = fonts.measure_text_width(font, Pt::from_f32(TITLE_SIZE), title);
    if width <= available {
        return vec![title.to_string()];
    }
    match split_title(title) {
        Some((first, second)) => vec![first, second],
        None => vec![title.to_string()],
    }
}

/// Display name and club of a roster row.
pub fn roster_entry(participation: &ParticipationRecord) -> (String, String) {
    let athlete_club = participation
        .athlete
        .as_deref()
        .and_then(|a| a.club_name())
        .map(str::to_string);
    if participation.is_team {
        let club = participation
            .members
            .first()
            .and_then(|m| m.club_name())
            .map(str::to_string)
            .or(athlete_club)
            .unwrap_or_else(|| "-".to_string());
        return (format!("Tim {club}"), club);
    }
    let name = participation
        .athlete
        .as_deref()
        .map(|a| a.name.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "-".to_string());
    (name, athlete_club.unwrap_or_else(|| "-".to_string()))
}

/// Cuts `text` with an ellipsis so it fits `max_width`.
pub fn fit_text(fonts: &FontRegistry, font: FontId, size: Pt, text: &str, max_width: Pt) -> String {
    if fonts.measure_text_width(font, size, text) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate = format!("{}...", chars.iter().collect::<String>().trim_end());
        if fonts.measure_text_width(font, size, &candidate) <= max_width {
            return candidate;
        }
    }
    "...".to_string()
}

struct Logos {
    left: Option<ImageId>,
    right: Option<ImageId>,
}

struct RosterPainter<'c, 'a> {
    ctx: &'c DocContext<'a>,
    canvas: Canvas,
    page_size: Size,
    theme: Color,
    logos: Logos,
    started: bool,
}

impl RosterPainter<'_, '_> {
    fn width(&self) -> f32 {
        self.page_size.width.to_f32()
    }

    fn height(&self) -> f32 {
        self.page_size.height.to_f32()
    }

    fn table_width(&self) -> f32 {
        self.width() - 2.0 * MARGIN
    }

    fn new_page(&mut self) {
        if self.started {
            self.canvas.show_page();
        }
        self.started = true;
    }

    fn text(&mut self, font: FontId, size: f32, color: Color, x: f32, y: f32, text: &str) {
        self.canvas.set_fill_color(color);
        self.canvas.set_font(font, Pt::from_f32(size));
        self.canvas.draw_string(Pt::from_f32(x), Pt::from_f32(y), text);
    }

    /// Logos, title, info box and count line. Returns the y below them.
    fn draw_block_header(&mut self, competition: &str, group: &RosterGroup, date: NaiveDate) -> f32 {
        let top = self.height() - MARGIN;
        let logo_y = Pt::from_f32(top - LOGO_SIZE);
        let logo = Pt::from_f32(LOGO_SIZE);
        if let Some(left) = self.logos.left {
            self.canvas.draw_image(Pt::from_f32(MARGIN), logo_y, logo, logo, left);
        }
        if let Some(right) = self.logos.right {
            let x = Pt::from_f32(self.width() - MARGIN - LOGO_SIZE);
            self.canvas.draw_image(x, logo_y, logo, logo, right);
        }

        let available = Pt::from_f32(self.table_width() - 2.0 * (LOGO_SIZE + LOGO_GAP));
        let headline = self.ctx.font_set.headline;
        let lines = title_lines(&self.ctx.fonts, headline, competition, available);
        self.canvas.set_fill_color(self.theme);
        self.canvas.set_font(headline, Pt::from_f32(TITLE_SIZE));
        let mut baseline = top - 24.0;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                baseline -= TITLE_LINE_GAP;
            }
            self.canvas
                .draw_centered_string(&self.ctx.fonts, Pt::from_f32(baseline), line);
        }

        let mut y = (top - LOGO_SIZE).min(baseline) - 20.0;
        let box_height = 3.0 * INFO_ROW_HEIGHT;
        let box_bottom = y - box_height;
        let x = MARGIN;
        let w = self.table_width();
        self.canvas.set_stroke_color(Color::BLACK);
        self.canvas.set_line_width(Pt::from_f32(0.75));
        self.canvas.draw_rect(Pt::from_f32(x), Pt::from_f32(box_bottom), Pt::from_f32(w), Pt::from_f32(box_height));
        self.canvas.stroke();
        for row in 1..3 {
            let divider = y - row as f32 * INFO_ROW_HEIGHT;
            self.canvas.stroke_line(
                Pt::from_f32(x),
                Pt::from_f32(divider),
                Pt::from_f32(x + w),
                Pt::from_f32(divider),
            );
        }
        self.canvas.stroke_line(
            Pt::from_f32(x + INFO_LABEL_WIDTH),
            Pt::from_f32(y),
            Pt::from_f32(x + INFO_LABEL_WIDTH),
            Pt::from_f32(box_bottom),
        );

        let long_date = indonesian_long_date(date);
        let rows = [
            ("Class", group.class_name.as_str()),
            ("Field", group.field_name.as_str()),
            ("Date", long_date.as_str()),
        ];
        let fallback = self.ctx.font_set.fallback;
        let body = self.ctx.font_set.body;
        let value_width = Pt::from_f32(w - INFO_LABEL_WIDTH - 16.0);
        for (row, (label, value)) in rows.into_iter().enumerate() {
            let baseline = y - row as f32 * INFO_ROW_HEIGHT - 13.0;
            self.text(fallback, TEXT_SIZE, Color::BLACK, x + 8.0, baseline, label);
            let value = fit_text(&self.ctx.fonts, body, Pt::from_f32(TEXT_SIZE), value, value_width);
            self.text(body, TEXT_SIZE, Color::BLACK, x + INFO_LABEL_WIDTH + 8.0, baseline, &value);
        }
        y = box_bottom - 18.0;

        let count = format!("Total participants: {}", group.participants.len());
        self.text(fallback, TEXT_SIZE, Color::BLACK, x, y, &count);
        y - 10.0
    }

    /// Header row whose top edge sits at `top`. Returns the y below it.
    fn draw_table_header(&mut self, top: f32) -> f32 {
        let bottom = top - HEADER_ROW_HEIGHT;
        let x = MARGIN;
        self.canvas.fill_rect(
            Pt::from_f32(x),
            Pt::from_f32(bottom),
            Pt::from_f32(self.table_width()),
            Pt::from_f32(HEADER_ROW_HEIGHT),
            self.theme,
        );
        let baseline = bottom + 6.5;
        let bold = self.ctx.font_set.fallback;
        for (offset, label) in [(COL_NO, "No"), (COL_NAME, "Name"), (COL_CLUB, "Club")] {
            self.text(bold, TEXT_SIZE, Color::WHITE, x + offset, baseline, label);
        }
        bottom
    }

    fn draw_row(&mut self, top: f32, index: usize, participation: &ParticipationRecord) {
        let bottom = top - ROW_HEIGHT;
        let x = MARGIN;
        if index % 2 == 1 {
            self.canvas.fill_rect(
                Pt::from_f32(x),
                Pt::from_f32(bottom),
                Pt::from_f32(self.table_width()),
                Pt::from_f32(ROW_HEIGHT),
                Color::rgb(ROW_SHADE, ROW_SHADE, ROW_SHADE),
            );
        }
        let (name, club) = roster_entry(participation);
        let body = self.ctx.font_set.body;
        let size = Pt::from_f32(TEXT_SIZE);
        let name_width = Pt::from_f32(COL_CLUB - COL_NAME - COL_NO);
        let club_width = Pt::from_f32(self.table_width() - COL_CLUB - COL_NO);
        let name = fit_text(&self.ctx.fonts, body, size, &name, name_width);
        let club = fit_text(&self.ctx.fonts, body, size, &club, club_width);
        let baseline = bottom + 5.5;
        self.text(body, TEXT_SIZE, Color::BLACK, x + COL_NO, baseline, &(index + 1).to_string());
        self.text(body, TEXT_SIZE, Color::BLACK, x + COL_NAME, baseline, &name);
        self.text(body, TEXT_SIZE, Color::BLACK, x + COL_CLUB, baseline, &club);
    }

    fn draw_group(&mut self, competition: &str, group: &RosterGroup, date: NaiveDate) {
        self.new_page();
        let mut y = self.draw_block_header(competition, group, date);
        if y - HEADER_ROW_HEIGHT - ROW_HEIGHT < BOTTOM_MARGIN {
            // Header row and first entry do not fit below the block header.
            self.new_page();
            y = self.height() - MARGIN;
        }
        y = self.draw_table_header(y);
        for (index, participation) in group.participants.iter().enumerate() {
            if y - ROW_HEIGHT < BOTTOM_MARGIN {
                self.new_page();
                y = self.draw_table_header(self.height() - MARGIN);
            }
            self.draw_row(y, index, participation);
            y -= ROW_HEIGHT;
        }
    }
}

fn load_logo(ctx: &DocContext<'_>, pdf: &mut PdfDocument, reference: Option<&str>) -> Option<ImageId> {
    let reference = reference.filter(|r| !r.trim().is_empty())?;
    match ctx.assets.fetch(reference).and_then(|bytes| pdf.embed_png(&bytes)) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::warn!(logo = reference, error = %err, "logo unavailable, skipped");
            None
        }
    }
}

/// Renders every group of `request` into one document, in order.
#[tracing::instrument(skip_all, fields(groups = request.groups.len()))]
pub fn compose_roster(ctx: &DocContext<'_>, request: &BatchExportRequest) -> Result<RosterOutcome, PiagamError> {
    let page_size = ctx.config.roster_page_size;
    let mut pdf = PdfDocument::create();
    let logos = Logos {
        left: load_logo(ctx, &mut pdf, request.left_logo.as_deref()),
        right: load_logo(ctx, &mut pdf, request.right_logo.as_deref()),
    };
    let mut painter = RosterPainter {
        ctx,
        canvas: Canvas::new(page_size),
        page_size,
        theme: ctx.config.theme(request.theme_color.as_deref()),
        logos,
        started: false,
    };
    for group in &request.groups {
        painter.draw_group(&request.competition_name, group, request.export_date);
    }

    let doc = painter.canvas.finish();
    for page in &doc.pages {
        let index = pdf.add_page(doc.page_size)?;
        pdf.render_page(index, page, &ctx.fonts)?;
    }
    let page_count = pdf.page_count();
    let participant_count = request.groups.iter().map(|g| g.participants.len()).sum();
    let bytes = pdf.save()?;
    tracing::info!(pages = page_count, participants = participant_count, "roster composed");
    Ok(RosterOutcome {
        bytes,
        page_count,
        participant_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetSource;
    use crate::blob::BlobStore;
    use crate::config::EngineConfig;
    use crate::model::AthleteRecord;
    use crate::pdf::fixtures::png;
    use crate::raster::SkiaRasterizer;

    fn athlete_entry(id: i64, name: &str, club: &str) -> ParticipationRecord {
        ParticipationRecord {
            id,
            athlete: Some(Box::new(AthleteRecord {
                id,
                name: name.to_string(),
                club: Some(club.to_string()),
                ..AthleteRecord::default()
            })),
            ..ParticipationRecord::default()
        }
    }

    fn group(field: &str, count: usize) -> RosterGroup {
        RosterGroup {
            class: None,
            class_name: "KYORUGI Cadet Under 45 kg Male".to_string(),
            field_name: field.to_string(),
            participants: (0..count)
                .map(|i| athlete_entry(i as i64 + 1, &format!("Atlet {}", i + 1), "Dojang Merah Putih"))
                .collect(),
        }
    }

    fn request(groups: Vec<RosterGroup>) -> BatchExportRequest {
        BatchExportRequest {
            competition_name: "Kejuaraan Taekwondo".to_string(),
            export_date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            left_logo: Some("/logos/left.png".to_string()),
            right_logo: Some("/logos/missing.png".to_string()),
            theme_color: None,
            groups,
        }
    }

    fn render(request: &BatchExportRequest) -> (RosterOutcome, PdfDocument) {
        render_on(request, Size::a4())
    }

    fn render_on(request: &BatchExportRequest, page_size: Size) -> (RosterOutcome, PdfDocument) {
        let config = EngineConfig {
            roster_page_size: page_size,
            ..EngineConfig::default()
        };
        let assets = MemoryAssetSource::new().with("/logos/left.png", png(8, 8, [0, 128, 0, 255]));
        let blobs = BlobStore::new();
        let ctx = DocContext::new(&config, &assets, &SkiaRasterizer, &blobs);
        let outcome = compose_roster(&ctx, request).unwrap();
        let pdf = PdfDocument::load(&outcome.bytes).unwrap();
        (outcome, pdf)
    }

    #[test]
    fn split_title_uses_word_midpoint() {
        assert_eq!(
            split_title("Kejuaraan Daerah Taekwondo Sumatera Selatan"),
            Some(("Kejuaraan Daerah Taekwondo".to_string(), "Sumatera Selatan".to_string()))
        );
        assert_eq!(
            split_title("Open Taekwondo Cup 2026"),
            Some(("Open Taekwondo".to_string(), "Cup 2026".to_string()))
        );
        assert_eq!(split_title("Kejuaraan"), None);
    }

    #[test]
    fn title_splits_only_when_too_wide() {
        let fonts = FontRegistry::new();
        let bold = FontRegistry::HELVETICA_BOLD;
        let short = title_lines(&fonts, bold, "Open Cup", Pt::from_f32(355.0));
        assert_eq!(short, vec!["Open Cup"]);
        let long = "Kejuaraan Provinsi Taekwondo Antar Dojang Piala Gubernur Sumatera Selatan Tahun 2026";
        let lines = title_lines(&fonts, bold, long, Pt::from_f32(355.0));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Kejuaraan Provinsi Taekwondo Antar Dojang Piala");
    }

    #[test]
    fn team_entries_use_first_member_club() {
        let team = ParticipationRecord {
            id: 1,
            is_team: true,
            members: vec![AthleteRecord {
                id: 2,
                name: "A".to_string(),
                club: Some("Dojang Elang".to_string()),
                ..AthleteRecord::default()
            }],
            ..ParticipationRecord::default()
        };
        assert_eq!(roster_entry(&team), ("Tim Dojang Elang".to_string(), "Dojang Elang".to_string()));
        let solo = athlete_entry(3, "Sari", "Dojang Elang");
        assert_eq!(roster_entry(&solo).0, "Sari");
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        let fonts = FontRegistry::new();
        let fitted = fit_text(&fonts, FontRegistry::HELVETICA, Pt::from_f32(10.0), "Muhammad Abdurrahman Al-Fatih Wicaksono", Pt::from_f32(80.0));
        assert!(fitted.ends_with("..."));
        assert!(fonts.measure_text_width(FontRegistry::HELVETICA, Pt::from_f32(10.0), &fitted) <= Pt::from_f32(80.0));
    }

    #[test]
    fn empty_class_renders_one_page_with_header_row() {
        let (outcome, pdf) = render(&request(vec![group("Lapangan A", 0)]));
        assert_eq!(outcome.page_count, 1);
        let texts = pdf.page_text_runs(0).unwrap();
        assert!(texts.contains(&"Total participants: 0".to_string()));
        assert!(texts.contains(&"No".to_string()));
        assert!(texts.contains(&"Club".to_string()));
        assert!(texts.contains(&"Sabtu, 17 Oktober 2026".to_string()));
        assert_eq!(pdf.page_image_draws(0).unwrap(), 1);
    }

    #[test]
    fn long_class_breaks_pages_and_repeats_header() {
        let (outcome, pdf) = render(&request(vec![group("Lapangan A", 60)]));
        assert!(outcome.page_count >= 2);
        for page in 0..outcome.page_count {
            let texts = pdf.page_text_runs(page).unwrap();
            assert_eq!(texts.iter().filter(|t| *t == "Name").count(), 1, "page {page}");
        }
        let last = pdf.page_text_runs(outcome.page_count - 1).unwrap();
        assert!(last.contains(&"60".to_string()));
        assert!(last.contains(&"Atlet 60".to_string()));
    }

    #[test]
    fn groups_accumulate_into_one_document() {
        let req = request(vec![group("Lapangan A", 3), group("Lapangan B", 2)]);
        let (outcome, pdf) = render(&req);
        assert_eq!(outcome.page_count, 2);
        assert_eq!(outcome.participant_count, 5);
        assert!(pdf.page_text_runs(1).unwrap().contains(&"Lapangan B".to_string()));
        assert_eq!(req.filename(), "BATCH_Daftar_Peserta_Sabtu_17-10-2026.pdf");
        let single = request(vec![group("Lapangan A", 1), group("Lapangan A", 1)]);
        assert_eq!(single.filename(), "Daftar_Peserta_Lapangan_A_Sabtu_17-10-2026.pdf");
    }

    #[test]
    fn short_page_moves_table_header_to_next_page() {
        let page = Size {
            width: Pt::from_f32(595.28),
            height: Pt::from_f32(200.0),
        };
        let (outcome, pdf) = render_on(&request(vec![group("Lapangan A", 1)]), page);
        assert_eq!(outcome.page_count, 2);

        let first = pdf.page_text_positions(0).unwrap();
        assert!(first.iter().any(|(t, _, _)| t == "Total participants: 1"));
        assert!(!first.iter().any(|(t, _, _)| t == "Name"));

        let second = pdf.page_text_positions(1).unwrap();
        let header_y = second.iter().find(|(t, _, _)| t == "Name").map(|(_, _, y)| *y).unwrap();
        let row_y = second.iter().find(|(t, _, _)| t == "Atlet 1").map(|(_, _, y)| *y).unwrap();
        assert!(row_y < header_y);
        assert!(header_y < 200.0 - MARGIN);

        for index in 0..outcome.page_count {
            for (text, _, y) in pdf.page_text_positions(index).unwrap() {
                assert!((0.0..=200.0).contains(&y), "{text:?} at y={y} on page {index}");
            }
        }
    }
}
