use crate::assets::AssetSource;
use crate::error::PiagamError;
use crate::types::Pt;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    fn ascii_widths(&self) -> &'static [u16; 95] {
        match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    fn bbox(&self) -> (i16, i16, i16, i16) {
        match self {
            StandardFont::Helvetica => (-166, -225, 1000, 931),
            StandardFont::HelveticaBold => (-170, -228, 1003, 962),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FontProgramKind {
    TrueType,
    OpenTypeCff,
}

#[derive(Debug)]
pub(crate) enum FontProgram {
    Standard(StandardFont),
    Embedded {
        data: Vec<u8>,
        kind: FontProgramKind,
    },
}

#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) program: FontProgram,
    pub(crate) metrics: FontMetrics,
}

/// Simple-font metrics in 1/1000 em over WinAnsi codes 32..=255.
#[derive(Debug)]
pub(crate) struct FontMetrics {
    pub(crate) first_char: u8,
    pub(crate) last_char: u8,
    pub(crate) widths: Vec<u16>,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) stem_v: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    pub(crate) missing_width: u16,
    pub(crate) is_fixed_pitch: bool,
}

impl FontMetrics {
    fn standard(font: StandardFont) -> Self {
        let mut widths = Vec::with_capacity(224);
        widths.extend_from_slice(font.ascii_widths());
        for code in 127u16..=255 {
            // nbsp shares the space advance; other high codes use the digit width.
            widths.push(if code == 0xA0 { 278 } else { 556 });
        }
        Self {
            first_char: 32,
            last_char: 255,
            widths,
            ascent: 718,
            descent: -207,
            cap_height: 718,
            italic_angle: 0,
            stem_v: if font == StandardFont::HelveticaBold { 140 } else { 88 },
            bbox: font.bbox(),
            missing_width: 556,
            is_fixed_pitch: false,
        }
    }

    fn from_face(face: &ttf_parser::Face<'_>) -> (Self, FontProgramKind) {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let first_char = 32u8;
        let last_char = 255u8;
        let widths = build_widths(face, scale, first_char, last_char);
        let missing_width = widths
            .get((b' ' - first_char) as usize)
            .copied()
            .unwrap_or(0);
        let ascent = scale_i16(face.ascender(), scale);
        let descent = scale_i16(face.descender(), scale);
        let cap_height = face
            .capital_height()
            .map(|value| scale_i16(value, scale))
            .unwrap_or(ascent);
        let bbox = face.global_bounding_box();
        let bbox = (
            scale_i16(bbox.x_min, scale),
            scale_i16(bbox.y_min, scale),
            scale_i16(bbox.x_max, scale),
            scale_i16(bbox.y_max, scale),
        );
        let italic_angle = face
            .italic_angle()
            .map(|value| value.round() as i16)
            .unwrap_or(0);
        let program_kind = if face.tables().cff.is_some() {
            FontProgramKind::OpenTypeCff
        } else {
            FontProgramKind::TrueType
        };
        (
            Self {
                first_char,
                last_char,
                widths,
                ascent,
                descent,
                cap_height,
                italic_angle,
                stem_v: 80,
                bbox,
                missing_width,
                is_fixed_pitch: face.is_monospaced(),
            },
            program_kind,
        )
    }

    fn advance_for_code(&self, code: u8) -> u16 {
        if code < self.first_char || code > self.last_char {
            return self.missing_width;
        }
        let idx = (code - self.first_char) as usize;
        self.widths.get(idx).copied().unwrap_or(self.missing_width)
    }

    /// Width of already-encoded bytes. No kerning is applied, matching how
    /// the text is drawn.
    fn measure_encoded(&self, font_size: Pt, bytes: &[u8]) -> Pt {
        let units: u32 = bytes
            .iter()
            .map(|&b| self.advance_for_code(b) as u32)
            .sum();
        Pt::from_f32(font_size.to_f32() * units as f32 / 1000.0)
    }
}

/// Fonts available to one document job. The two standard fonts are always
/// present, so a fallback never fails.
#[derive(Debug)]
pub struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub const HELVETICA: FontId = FontId(0);
    pub const HELVETICA_BOLD: FontId = FontId(1);

    pub fn new() -> Self {
        let mut registry = Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
        };
        for standard in [StandardFont::Helvetica, StandardFont::HelveticaBold] {
            registry.push(RegisteredFont {
                name: standard.base_font().to_string(),
                program: FontProgram::Standard(standard),
                metrics: FontMetrics::standard(standard),
            });
        }
        registry
    }

    /// Registers a TrueType/OpenType program. Registering the same face name
    /// twice returns the existing id.
    pub fn register_bytes(
        &mut self,
        data: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<FontId, PiagamError> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| PiagamError::Font(format!("invalid font data for {source}: {err}")))?;
        let name = font_name(&face, Path::new(source));
        if let Some(existing) = self.find(&name) {
            return Ok(existing);
        }
        let (metrics, kind) = FontMetrics::from_face(&face);
        drop(face);
        Ok(self.push(RegisteredFont {
            name,
            program: FontProgram::Embedded { data, kind },
            metrics,
        }))
    }

    pub fn find(&self, name: &str) -> Option<FontId> {
        self.lookup.get(&normalize_name(name)).copied().map(FontId)
    }

    pub fn name(&self, id: FontId) -> Option<&str> {
        self.fonts.get(id.0).map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub(crate) fn font(&self, id: FontId) -> Option<&RegisteredFont> {
        self.fonts.get(id.0)
    }

    /// Rendered width of `text` at `font_size`. Unknown ids measure with
    /// Helvetica-Bold, the font they would be drawn with.
    pub fn measure_text_width(&self, id: FontId, font_size: Pt, text: &str) -> Pt {
        let font = self
            .font(id)
            .or_else(|| self.font(Self::HELVETICA_BOLD));
        let Some(font) = font else {
            return Pt::ZERO;
        };
        let encoded = encode_winansi(text);
        font.metrics.measure_encoded(font_size, &encoded.bytes)
    }

    fn push(&mut self, font: RegisteredFont) -> FontId {
        let index = self.fonts.len();
        self.lookup.insert(normalize_name(&font.name), index);
        self.fonts.push(font);
        FontId(index)
    }
}

/// The typefaces a composer draws with.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSet {
    pub headline: FontId,
    pub body: FontId,
    pub fallback: FontId,
    /// References that could not be loaded and were replaced by the fallback.
    pub substituted: Vec<String>,
}

impl FontSet {
    /// Standard fonts only.
    pub fn standard() -> Self {
        Self {
            headline: FontRegistry::HELVETICA_BOLD,
            body: FontRegistry::HELVETICA,
            fallback: FontRegistry::HELVETICA_BOLD,
            substituted: Vec::new(),
        }
    }

    /// Fetches and registers the headline and body fonts. Any failure
    /// substitutes Helvetica-Bold and logs a warning.
    pub fn load(
        registry: &mut FontRegistry,
        source: &dyn AssetSource,
        headline_ref: &str,
        body_ref: &str,
    ) -> Self {
        let mut substituted = Vec::new();
        let mut load_one = |reference: &str| -> FontId {
            let loaded = source
                .fetch(reference)
                .and_then(|data| registry.register_bytes(data, Some(reference)));
            match loaded {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(font = reference, error = %err, "custom font unavailable, using Helvetica-Bold");
                    substituted.push(reference.to_string());
                    FontRegistry::HELVETICA_BOLD
                }
            }
        };
        let headline = load_one(headline_ref);
        let body = load_one(body_ref);
        Self {
            headline,
            body,
            fallback: FontRegistry::HELVETICA_BOLD,
            substituted,
        }
    }
}

pub(crate) struct WinAnsiEncoded {
    pub(crate) bytes: Vec<u8>,
    pub(crate) replaced: usize,
}

/// Encodes text as cp1252 bytes; unmappable characters become `?`.
pub(crate) fn encode_winansi(input: &str) -> WinAnsiEncoded {
    let mut bytes = Vec::with_capacity(input.len());
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            '\u{0020}'..='\u{007E}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\t' | '\n' | '\r' => b' ',
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => {
                replaced += 1;
                b'?'
            }
        };
        bytes.push(byte);
    }
    WinAnsiEncoded { bytes, replaced }
}

fn build_widths(face: &ttf_parser::Face<'_>, scale: f32, first: u8, last: u8) -> Vec<u16> {
    let mut widths = Vec::with_capacity((last - first) as usize + 1);
    for code in first..=last {
        let ch = winansi_char(code);
        let width = ch
            .and_then(|ch| face.glyph_index(ch))
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(0);
        let scaled = (width as f32 * scale).round() as i32;
        widths.push(scaled.clamp(0, u16::MAX as i32) as u16);
    }
    widths
}

/// Unicode character drawn for a WinAnsi code.
fn winansi_char(code: u8) -> Option<char> {
    let cp = match code {
        0x80 => 0x20AC,
        0x82 => 0x201A,
        0x83 => 0x0192,
        0x84 => 0x201E,
        0x85 => 0x2026,
        0x86 => 0x2020,
        0x87 => 0x2021,
        0x88 => 0x02C6,
        0x89 => 0x2030,
        0x8A => 0x0160,
        0x8B => 0x2039,
        0x8C => 0x0152,
        0x8E => 0x017D,
        0x91 => 0x2018,
        0x92 => 0x2019,
        0x93 => 0x201C,
        0x94 => 0x201D,
        0x95 => 0x2022,
        0x96 => 0x2013,
        0x97 => 0x2014,
        0x98 => 0x02DC,
        0x99 => 0x2122,
        0x9A => 0x0161,
        0x9B => 0x203A,
        0x9C => 0x0153,
        0x9E => 0x017E,
        0x9F => 0x0178,
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D | 0x7F => return None,
        other => other as u32,
    };
    char::from_u32(cp)
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn font_name(face: &ttf_parser::Face<'_>, path: &Path) -> String {
    use ttf_parser::name::name_id;

    let mut post = None;
    let mut full = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::POST_SCRIPT_NAME if post.is_none() => post = Some(name),
            name_id::FULL_NAME if full.is_none() => full = Some(name),
            _ => {}
        }
    }
    let stem = path
        .file_stem()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string());
    post.or(full)
        .or(stem)
        .unwrap_or_else(|| "EmbeddedFont".to_string())
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
