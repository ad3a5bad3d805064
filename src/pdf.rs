//! lopdf-backed document handle used by every composer.
//!
//! A [`PdfDocument`] is either a loaded template or an empty output
//! document. Drawing happens by rendering a recorded [`Page`] onto one of
//! its pages; fonts and images referenced by the page are embedded on first
//! use and named with a `Pg` prefix so they never collide with template
//! resources.

use crate::assets::decode_image;
use crate::canvas::{Command, Page};
use crate::error::{PiagamError, lopdf_err};
use crate::font::{FontId, FontProgram, FontProgramKind, FontRegistry, encode_winansi};
use crate::types::{Pt, Size};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId, Stream as LoStream, StringFormat, dictionary};
use std::collections::HashMap;

const MAX_TREE_DEPTH: usize = 32;
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub(crate) usize);

#[derive(Debug, Clone)]
struct EmbeddedImage {
    name: String,
    object_id: LoObjectId,
    width: u32,
    height: u32,
}

pub struct PdfDocument {
    doc: LoDocument,
    pages_id: LoObjectId,
    fonts: HashMap<FontId, (String, LoObjectId)>,
    images: Vec<EmbeddedImage>,
}

impl PdfDocument {
    /// An empty document with no pages.
    pub fn create() -> Self {
        let mut doc = LoDocument::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            LoObject::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<LoObject>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Self {
            doc,
            pages_id,
            fonts: HashMap::new(),
            images: Vec::new(),
        }
    }

    pub fn load(bytes: &[u8]) -> Result<Self, PiagamError> {
        let doc = LoDocument::load_mem(bytes).map_err(lopdf_err)?;
        if doc.is_encrypted() {
            return Err(PiagamError::pdf("document is encrypted"));
        }
        let pages_id = doc
            .trailer
            .get(b"Root")
            .and_then(LoObject::as_reference)
            .and_then(|root| doc.get_object(root))
            .and_then(LoObject::as_dict)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(LoObject::as_reference)
            .map_err(|err| PiagamError::pdf(format!("document has no page tree: {err}")))?;
        Ok(Self {
            doc,
            pages_id,
            fonts: HashMap::new(),
            images: Vec::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn page_ids(&self) -> Vec<LoObjectId> {
        self.doc.get_pages().values().copied().collect()
    }

    fn page_id(&self, index: usize) -> Result<LoObjectId, PiagamError> {
        self.page_ids()
            .get(index)
            .copied()
            .ok_or_else(|| PiagamError::pdf(format!("page index {index} out of range")))
    }

    /// Size of a page from its (possibly inherited) MediaBox.
    pub fn page_size(&self, index: usize) -> Result<Size, PiagamError> {
        let page_id = self.page_id(index)?;
        let media_box = inherited_attribute(&self.doc, page_id, b"MediaBox")
            .ok_or_else(|| PiagamError::pdf(format!("page {index} has no MediaBox")))?;
        let values: Vec<f32> = media_box
            .as_array()
            .map_err(lopdf_err)?
            .iter()
            .filter_map(number)
            .collect();
        let &[x0, y0, x1, y1] = values.as_slice() else {
            return Err(PiagamError::pdf(format!("page {index} has a malformed MediaBox")));
        };
        Ok(Size::new(
            Pt::from_f32((x1 - x0).abs()),
            Pt::from_f32((y1 - y0).abs()),
        ))
    }

    /// Appends a blank page and returns its index.
    pub fn add_page(&mut self, size: Size) -> Result<usize, PiagamError> {
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), size.width.to_f32().into(), size.height.to_f32().into()],
            "Resources" => Dictionary::new(),
        });
        self.append_kids(&[page_id])?;
        Ok(self.page_count() - 1)
    }

    /// Embeds a font once per document and returns its resource name.
    pub fn embed_font(&mut self, registry: &FontRegistry, id: FontId) -> Result<String, PiagamError> {
        if let Some((name, _)) = self.fonts.get(&id) {
            return Ok(name.clone());
        }
        let font = registry
            .font(id)
            .ok_or_else(|| PiagamError::Font(format!("unknown font id {}", id.0)))?;
        let object_id = match &font.program {
            FontProgram::Standard(standard) => self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => standard.base_font(),
                "Encoding" => "WinAnsiEncoding",
            }),
            FontProgram::Embedded { data, kind } => {
                let metrics = &font.metrics;
                let base_font = pdf_font_name(&font.name);
                let file_key = match kind {
                    FontProgramKind::TrueType => "FontFile2",
                    FontProgramKind::OpenTypeCff => "FontFile3",
                };
                let mut file_dict = dictionary! { "Length1" => data.len() as i64 };
                if *kind == FontProgramKind::OpenTypeCff {
                    file_dict.set("Subtype", "OpenType");
                }
                let file_id = self.doc.add_object(LoStream::new(file_dict, data.clone()));
                let (llx, lly, urx, ury) = metrics.bbox;
                let flags: i64 = if metrics.is_fixed_pitch { 32 | 1 } else { 32 };
                let descriptor_id = self.doc.add_object(dictionary! {
                    "Type" => "FontDescriptor",
                    "FontName" => LoObject::Name(base_font.clone().into_bytes()),
                    "Flags" => flags,
                    "FontBBox" => vec![(llx as i64).into(), (lly as i64).into(), (urx as i64).into(), (ury as i64).into()],
                    "ItalicAngle" => metrics.italic_angle as i64,
                    "Ascent" => metrics.ascent as i64,
                    "Descent" => metrics.descent as i64,
                    "CapHeight" => metrics.cap_height as i64,
                    "StemV" => metrics.stem_v as i64,
                    file_key => file_id,
                });
                let widths: Vec<LoObject> = metrics
                    .widths
                    .iter()
                    .map(|w| LoObject::Integer(*w as i64))
                    .collect();
                self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "TrueType",
                    "BaseFont" => LoObject::Name(base_font.into_bytes()),
                    "FirstChar" => metrics.first_char as i64,
                    "LastChar" => metrics.last_char as i64,
                    "Widths" => widths,
                    "FontDescriptor" => descriptor_id,
                    "Encoding" => "WinAnsiEncoding",
                })
            }
        };
        let name = format!("PgF{}", self.fonts.len() + 1);
        self.fonts.insert(id, (name.clone(), object_id));
        Ok(name)
    }

    /// Embeds a PNG (or any decodable raster) as an image XObject. Transparency
    /// becomes a soft mask.
    pub fn embed_png(&mut self, bytes: &[u8]) -> Result<ImageId, PiagamError> {
        let decoded = decode_image(bytes)?;
        let smask_id = decoded.alpha.map(|alpha| {
            self.doc.add_object(LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => decoded.width as i64,
                    "Height" => decoded.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            ))
        });
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => decoded.width as i64,
            "Height" => decoded.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if let Some(smask_id) = smask_id {
            image_dict.set("SMask", smask_id);
        }
        let object_id = self.doc.add_object(LoStream::new(image_dict, decoded.rgb));
        let id = ImageId(self.images.len());
        self.images.push(EmbeddedImage {
            name: format!("PgIm{}", self.images.len() + 1),
            object_id,
            width: decoded.width,
            height: decoded.height,
        });
        Ok(id)
    }

    /// Pixel size of an embedded image.
    pub fn image_size(&self, id: ImageId) -> Option<(u32, u32)> {
        self.images.get(id.0).map(|img| (img.width, img.height))
    }

    /// Draws a recorded page over the existing content of page `index`.
    pub fn render_page(
        &mut self,
        index: usize,
        page: &Page,
        registry: &FontRegistry,
    ) -> Result<(), PiagamError> {
        let page_id = self.page_id(index)?;
        let mut used_fonts: Vec<(String, LoObjectId)> = Vec::new();
        let mut used_images: Vec<(String, LoObjectId)> = Vec::new();
        let mut ops = Vec::new();
        let mut font = FontRegistry::HELVETICA;
        let mut font_size = 12.0_f32;

        for command in &page.commands {
            match command {
                Command::SetFillColor(c) => {
                    ops.push(Operation::new("rg", vec![c.r.into(), c.g.into(), c.b.into()]))
                }
                Command::SetStrokeColor(c) => {
                    ops.push(Operation::new("RG", vec![c.r.into(), c.g.into(), c.b.into()]))
                }
                Command::SetLineWidth(w) => ops.push(Operation::new("w", vec![w.to_f32().into()])),
                Command::SetFont(id) => font = *id,
                Command::SetFontSize(size) => font_size = size.to_f32(),
                Command::MoveTo { x, y } => {
                    ops.push(Operation::new("m", vec![x.to_f32().into(), y.to_f32().into()]))
                }
                Command::LineTo { x, y } => {
                    ops.push(Operation::new("l", vec![x.to_f32().into(), y.to_f32().into()]))
                }
                Command::Fill => ops.push(Operation::new("f", vec![])),
                Command::Stroke => ops.push(Operation::new("S", vec![])),
                Command::DrawRect {
                    x,
                    y,
                    width,
                    height,
                } => ops.push(Operation::new(
                    "re",
                    vec![
                        x.to_f32().into(),
                        y.to_f32().into(),
                        width.to_f32().into(),
                        height.to_f32().into(),
                    ],
                )),
                Command::DrawString { x, y, text } => {
                    let name = self.embed_font(registry, font)?;
                    if let Some((_, object_id)) = self.fonts.get(&font) {
                        remember(&mut used_fonts, &name, *object_id);
                    }
                    let encoded = encode_winansi(text);
                    if encoded.replaced > 0 {
                        tracing::debug!(text = %text, replaced = encoded.replaced, "characters outside WinAnsi replaced");
                    }
                    ops.push(Operation::new("BT", vec![]));
                    ops.push(Operation::new(
                        "Tf",
                        vec![LoObject::Name(name.into_bytes()), font_size.into()],
                    ));
                    ops.push(Operation::new("Td", vec![x.to_f32().into(), y.to_f32().into()]));
                    ops.push(Operation::new(
                        "Tj",
                        vec![LoObject::String(encoded.bytes, StringFormat::Literal)],
                    ));
                    ops.push(Operation::new("ET", vec![]));
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => {
                    let embedded = self
                        .images
                        .get(image.0)
                        .ok_or_else(|| PiagamError::pdf(format!("unknown image id {}", image.0)))?;
                    remember(&mut used_images, &embedded.name, embedded.object_id);
                    ops.push(Operation::new("q", vec![]));
                    ops.push(Operation::new(
                        "cm",
                        vec![
                            width.to_f32().into(),
                            0.into(),
                            0.into(),
                            height.to_f32().into(),
                            x.to_f32().into(),
                            y.to_f32().into(),
                        ],
                    ));
                    ops.push(Operation::new(
                        "Do",
                        vec![LoObject::Name(embedded.name.clone().into_bytes())],
                    ));
                    ops.push(Operation::new("Q", vec![]));
                }
            }
        }

        self.merge_page_resources(page_id, &used_fonts, &used_images)?;
        self.append_content(page_id, ops)
    }

    /// Appends every page of `src` to this document, preserving order.
    /// Returns the number of pages copied.
    pub fn copy_pages_from(&mut self, src: &PdfDocument) -> Result<usize, PiagamError> {
        let mut src = src.doc.clone();
        src.renumber_objects_with(self.doc.max_id + 1);
        let page_ids: Vec<LoObjectId> = src.get_pages().values().copied().collect();
        for &page_id in &page_ids {
            let inherited: Vec<(&[u8], LoObject)> = INHERITABLE_PAGE_KEYS
                .iter()
                .filter_map(|key| inherited_attribute(&src, page_id, key).map(|v| (*key, v)))
                .collect();
            let page = src
                .get_object_mut(page_id)
                .and_then(LoObject::as_dict_mut)
                .map_err(lopdf_err)?;
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
            page.set("Parent", self.pages_id);
        }
        if src.max_id > self.doc.max_id {
            self.doc.max_id = src.max_id;
        }
        self.doc.objects.extend(src.objects);
        self.append_kids(&page_ids)?;
        Ok(page_ids.len())
    }

    /// Text runs shown on a page, decoded as Latin-1.
    pub fn page_text_runs(&self, index: usize) -> Result<Vec<String>, PiagamError> {
        Ok(self
            .page_text_positions(index)?
            .into_iter()
            .map(|(text, _, _)| text)
            .collect())
    }

    /// Text runs with the `Td` origin of their text object, in drawing order.
    pub fn page_text_positions(&self, index: usize) -> Result<Vec<(String, f32, f32)>, PiagamError> {
        let page_id = self.page_id(index)?;
        let content = self.doc.get_page_content(page_id).map_err(lopdf_err)?;
        let content = Content::decode(&content).map_err(lopdf_err)?;
        let mut origin = (0.0_f32, 0.0_f32);
        let mut runs = Vec::new();
        for op in &content.operations {
            match (op.operator.as_str(), op.operands.as_slice()) {
                ("BT", _) => origin = (0.0, 0.0),
                ("Td", [x, y]) => {
                    origin.0 += x.as_float().map_err(lopdf_err)?;
                    origin.1 += y.as_float().map_err(lopdf_err)?;
                }
                ("Tj", [LoObject::String(bytes, _)]) => {
                    runs.push((bytes.iter().map(|&b| b as char).collect(), origin.0, origin.1));
                }
                _ => {}
            }
        }
        Ok(runs)
    }

    /// Number of image draws (`Do`) on a page.
    pub fn page_image_draws(&self, index: usize) -> Result<usize, PiagamError> {
        let page_id = self.page_id(index)?;
        let content = self.doc.get_page_content(page_id).map_err(lopdf_err)?;
        let content = Content::decode(&content).map_err(lopdf_err)?;
        Ok(content.operations.iter().filter(|op| op.operator == "Do").count())
    }

    pub fn save(mut self) -> Result<Vec<u8>, PiagamError> {
        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc.compress();
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|err| PiagamError::pdf(format!("save failed: {err}")))?;
        Ok(out)
    }

    fn append_kids(&mut self, page_ids: &[LoObjectId]) -> Result<(), PiagamError> {
        let pages = self
            .doc
            .get_object_mut(self.pages_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        let count = pages.get(b"Count").and_then(LoObject::as_i64).unwrap_or(0);
        match pages.get_mut(b"Kids").and_then(LoObject::as_array_mut) {
            Ok(kids) => kids.extend(page_ids.iter().map(|id| LoObject::Reference(*id))),
            Err(_) => pages.set(
                "Kids",
                page_ids
                    .iter()
                    .map(|id| LoObject::Reference(*id))
                    .collect::<Vec<_>>(),
            ),
        }
        pages.set("Count", count + page_ids.len() as i64);
        Ok(())
    }

    fn merge_page_resources(
        &mut self,
        page_id: LoObjectId,
        fonts: &[(String, LoObjectId)],
        images: &[(String, LoObjectId)],
    ) -> Result<(), PiagamError> {
        if fonts.is_empty() && images.is_empty() {
            return Ok(());
        }
        let mut resources = inherited_attribute(&self.doc, page_id, b"Resources")
            .and_then(|obj| obj.as_dict().ok().cloned())
            .unwrap_or_default();
        for (key, entries) in [("Font", fonts), ("XObject", images)] {
            if entries.is_empty() {
                continue;
            }
            let mut sub = resource_subdict(&self.doc, &resources, key.as_bytes());
            for (name, object_id) in entries {
                sub.set(name.as_bytes().to_vec(), LoObject::Reference(*object_id));
            }
            resources.set(key, LoObject::Dictionary(sub));
        }
        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        page.set("Resources", LoObject::Dictionary(resources));
        Ok(())
    }

    /// Adds `ops` after the page's existing content, isolating the existing
    /// content's graphics state with q/Q.
    fn append_content(&mut self, page_id: LoObjectId, ops: Vec<Operation>) -> Result<(), PiagamError> {
        if ops.is_empty() {
            return Ok(());
        }
        let existing: Vec<LoObject> = {
            let page = self
                .doc
                .get_object(page_id)
                .and_then(LoObject::as_dict)
                .map_err(lopdf_err)?;
            match page.get(b"Contents") {
                Ok(LoObject::Reference(id)) => vec![LoObject::Reference(*id)],
                Ok(LoObject::Array(items)) => items.clone(),
                _ => Vec::new(),
            }
        };
        let encoded = Content { operations: ops }.encode().map_err(lopdf_err)?;
        let mut contents = Vec::with_capacity(existing.len() + 2);
        if existing.is_empty() {
            contents.push(self.doc.add_object(LoStream::new(dictionary! {}, encoded)).into());
        } else {
            let open = self.doc.add_object(LoStream::new(dictionary! {}, b"q\n".to_vec()));
            let mut overlay = b"\nQ\n".to_vec();
            overlay.extend_from_slice(&encoded);
            let overlay = self.doc.add_object(LoStream::new(dictionary! {}, overlay));
            contents.push(open.into());
            contents.extend(existing);
            contents.push(overlay.into());
        }
        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        page.set("Contents", contents);
        Ok(())
    }
}

fn remember(list: &mut Vec<(String, LoObjectId)>, name: &str, id: LoObjectId) {
    if !list.iter().any(|(n, _)| n == name) {
        list.push((name.to_string(), id));
    }
}

fn resolve<'a>(doc: &'a LoDocument, obj: &'a LoObject) -> &'a LoObject {
    match obj {
        LoObject::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Looks up a page attribute, walking up the page tree for inherited keys.
fn inherited_attribute(doc: &LoDocument, page_id: LoObjectId, key: &[u8]) -> Option<LoObject> {
    let mut current = doc.get_object(page_id).and_then(LoObject::as_dict).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value).clone());
        }
        let parent = current.get(b"Parent").and_then(LoObject::as_reference).ok()?;
        current = doc.get_object(parent).and_then(LoObject::as_dict).ok()?;
    }
    None
}

fn resource_subdict(doc: &LoDocument, resources: &Dictionary, key: &[u8]) -> Dictionary {
    match resources.get(key) {
        Ok(obj) => resolve(doc, obj).as_dict().cloned().unwrap_or_default(),
        Err(_) => Dictionary::new(),
    }
}

fn number(obj: &LoObject) -> Option<f32> {
    match obj {
        LoObject::Integer(v) => Some(*v as f32),
        LoObject::Real(v) => Some(*v as f32),
        _ => None,
    }
}

fn pdf_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{png, template_pdf};
    use super::*;
    use crate::canvas::Canvas;

    fn resource_names(pdf: &PdfDocument, index: usize, key: &[u8]) -> Vec<String> {
        let page_id = pdf.page_id(index).unwrap();
        let resources = inherited_attribute(&pdf.doc, page_id, b"Resources").unwrap();
        let resources = resources.as_dict().unwrap();
        resource_subdict(&pdf.doc, resources, key)
            .iter()
            .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
            .collect()
    }

    #[test]
    fn created_document_gains_pages() {
        let mut pdf = PdfDocument::create();
        assert_eq!(pdf.page_count(), 0);
        assert_eq!(pdf.add_page(Size::a4()).unwrap(), 0);
        assert_eq!(pdf.add_page(Size::a4()).unwrap(), 1);
        let bytes = pdf.save().unwrap();
        let reloaded = PdfDocument::load(&bytes).unwrap();
        assert_eq!(reloaded.page_count(), 2);
        let size = reloaded.page_size(1).unwrap();
        assert!((size.width.to_f32() - 595.28).abs() < 0.01);
    }

    #[test]
    fn page_size_is_inherited_from_page_tree() {
        let pdf = PdfDocument::load(&template_pdf(153.07, 242.65, &["card"])).unwrap();
        let size = pdf.page_size(0).unwrap();
        assert!((size.width.to_f32() - 153.07).abs() < 0.01);
        assert!((size.height.to_f32() - 242.65).abs() < 0.01);
    }

    #[test]
    fn render_overlays_template_content_and_keeps_resources() {
        let registry = FontRegistry::new();
        let mut pdf = PdfDocument::load(&template_pdf(300.0, 200.0, &["base"])).unwrap();
        let mut canvas = Canvas::new(pdf.page_size(0).unwrap());
        canvas.set_font(FontRegistry::HELVETICA_BOLD, Pt::from_f32(12.0));
        canvas.draw_string(Pt::from_f32(10.0), Pt::from_f32(10.0), "Overlay");
        let doc = canvas.finish();
        pdf.render_page(0, &doc.pages[0], &registry).unwrap();

        let reloaded = PdfDocument::load(&pdf.save().unwrap()).unwrap();
        assert_eq!(reloaded.page_text_runs(0).unwrap(), vec!["base", "Overlay"]);
        let fonts = resource_names(&reloaded, 0, b"Font");
        assert!(fonts.contains(&"F1".to_string()));
        assert!(fonts.contains(&"PgF1".to_string()));
    }

    #[test]
    fn fonts_embed_once_per_document() {
        let registry = FontRegistry::new();
        let mut pdf = PdfDocument::create();
        let a = pdf.embed_font(&registry, FontRegistry::HELVETICA_BOLD).unwrap();
        let b = pdf.embed_font(&registry, FontRegistry::HELVETICA_BOLD).unwrap();
        let c = pdf.embed_font(&registry, FontRegistry::HELVETICA).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn png_with_alpha_gets_soft_mask() {
        let mut pdf = PdfDocument::create();
        pdf.add_page(Size::a4()).unwrap();
        let image = pdf.embed_png(&png(4, 3, [10, 20, 30, 128])).unwrap();
        assert_eq!(pdf.image_size(image), Some((4, 3)));
        let object_id = pdf.images[image.0].object_id;
        let stream = pdf.doc.get_object(object_id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());

        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_image(Pt::from_f32(10.0), Pt::from_f32(10.0), Pt::from_f32(40.0), Pt::from_f32(30.0), image);
        let doc = canvas.finish();
        pdf.render_page(0, &doc.pages[0], &FontRegistry::new()).unwrap();
        let reloaded = PdfDocument::load(&pdf.save().unwrap()).unwrap();
        assert_eq!(reloaded.page_image_draws(0).unwrap(), 1);
    }

    #[test]
    fn opaque_png_has_no_soft_mask() {
        let mut pdf = PdfDocument::create();
        let image = pdf.embed_png(&png(2, 2, [1, 2, 3, 255])).unwrap();
        let object_id = pdf.images[image.0].object_id;
        let stream = pdf.doc.get_object(object_id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_err());
    }

    #[test]
    fn copy_pages_preserves_order_and_inherited_attributes() {
        let first = PdfDocument::load(&template_pdf(200.0, 100.0, &["a1", "a2"])).unwrap();
        let second = PdfDocument::load(&template_pdf(300.0, 150.0, &["b1"])).unwrap();
        let mut out = PdfDocument::create();
        assert_eq!(out.copy_pages_from(&first).unwrap(), 2);
        assert_eq!(out.copy_pages_from(&second).unwrap(), 1);
        let reloaded = PdfDocument::load(&out.save().unwrap()).unwrap();
        assert_eq!(reloaded.page_count(), 3);
        let texts: Vec<String> = (0..3)
            .flat_map(|i| reloaded.page_text_runs(i).unwrap())
            .collect();
        assert_eq!(texts, vec!["a1", "a2", "b1"]);
        assert!((reloaded.page_size(2).unwrap().width.to_f32() - 300.0).abs() < 0.01);
        assert!(resource_names(&reloaded, 2, b"Font").contains(&"F1".to_string()));
    }

    #[test]
    fn garbage_is_not_a_pdf() {
        assert!(matches!(PdfDocument::load(b"not a pdf"), Err(PiagamError::Pdf(_))));
    }
}
