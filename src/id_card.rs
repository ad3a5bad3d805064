use crate::canvas::Canvas;
use crate::doc_context::DocContext;
use crate::error::PiagamError;
use crate::label::athlete_class_label;
use crate::model::{AthleteRecord, ParticipationRecord, resolve_participation};
use crate::raster::PhotoBox;
use crate::template::{FieldSpec, ID_CARD_LAYOUT, id_card_template_path};
use crate::types::{Color, Pt};
use crate::units::{baseline_y, element_bottom_y};

/// Composes one ID card and returns the PDF bytes.
///
/// The template variant follows the athlete's competition tier. A missing
/// or broken photo only drops the photo; a missing template is an error.
#[tracing::instrument(skip_all, fields(athlete = athlete.id))]
pub fn compose_id_card(
    ctx: &DocContext<'_>,
    athlete: &AthleteRecord,
    full_list: Option<&[ParticipationRecord]>,
    theme: Option<&str>,
) -> Result<Vec<u8>, PiagamError> {
    let layout = ID_CARD_LAYOUT;
    let class_label = athlete_class_label(athlete, full_list);
    let tier = resolve_participation(athlete, full_list)
        .and_then(|p| p.class)
        .and_then(|c| c.tier);
    let template_path = id_card_template_path(&ctx.config.org, tier);
    let mut pdf = ctx.load_template(&template_path)?;
    for font in [ctx.font_set.headline, ctx.font_set.body, ctx.font_set.fallback] {
        pdf.embed_font(&ctx.fonts, font)?;
    }

    let page_size = pdf.page_size(0)?;
    let page_height = page_size.height;
    let mut canvas = Canvas::new(page_size);

    if let Some(filename) = athlete.photo.as_deref().filter(|f| !f.trim().is_empty()) {
        let url = ctx.config.photo_url(filename);
        let spec = layout.photo;
        let photo_box = PhotoBox {
            width_mm: spec.width.unwrap_or(0.0),
            height_mm: spec.height.unwrap_or(0.0),
            radius_mm: spec.border_radius.unwrap_or(0.0),
        };
        match ctx.embed_rounded_photo(&mut pdf, &url, photo_box) {
            Ok(image) => canvas.draw_image(
                Pt::from_mm(spec.x),
                element_bottom_y(page_height, spec.y, photo_box.height_mm),
                Pt::from_mm(photo_box.width_mm),
                Pt::from_mm(photo_box.height_mm),
                image,
            ),
            Err(err) => {
                tracing::warn!(athlete = athlete.id, photo = %url, error = %err, "photo unavailable, card produced without it");
            }
        }
    }

    canvas.set_fill_color(ctx.config.theme(theme));
    draw_field(&mut canvas, page_height, ctx.font_set.headline, layout.name, &athlete.name);
    canvas.set_fill_color(Color::BLACK);
    draw_field(&mut canvas, page_height, ctx.font_set.body, layout.class_label, &class_label);
    if let Some(club) = athlete.club_name() {
        draw_field(&mut canvas, page_height, ctx.font_set.body, layout.club, club);
    }

    let doc = canvas.finish();
    pdf.render_page(0, &doc.pages[0], &ctx.fonts)?;
    pdf.save()
}

fn draw_field(canvas: &mut Canvas, page_height: Pt, font: crate::font::FontId, spec: FieldSpec, text: &str) {
    canvas.set_font(font, Pt::from_f32(spec.font_size));
    canvas.draw_string(Pt::from_mm(spec.x), baseline_y(page_height, spec.y), text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetSource;
    use crate::blob::BlobStore;
    use crate::config::EngineConfig;
    use crate::model::{ClassDefinition, CompetitionTier, Discipline, ParticipationStatus};
    use crate::pdf::PdfDocument;
    use crate::pdf::fixtures::{png, template_pdf};
    use crate::raster::SkiaRasterizer;

    fn athlete(tier: CompetitionTier, photo: Option<&str>) -> AthleteRecord {
        AthleteRecord {
            id: 9,
            name: "Rizky Pratama".to_string(),
            club: Some("Dojang Garuda".to_string()),
            photo: photo.map(str::to_string),
            participations: vec![ParticipationRecord {
                id: 90,
                status: ParticipationStatus::Approved,
                class: Some(ClassDefinition {
                    discipline: Some(Discipline::Kyorugi),
                    tier: Some(tier),
                    age_group: Some("Pracadet".to_string()),
                    weight_class: Some("Under 30 kg".to_string()),
                    ..ClassDefinition::default()
                }),
                ..ParticipationRecord::default()
            }],
            ..AthleteRecord::default()
        }
    }

    fn assets() -> MemoryAssetSource {
        MemoryAssetSource::new()
            .with("/templates/e-idcard_taekwondo_pemula.pdf", template_pdf(153.07, 242.65, &["PEMULA"]))
            .with("/templates/e-idcard_taekwondo_prestasi.pdf", template_pdf(153.07, 242.65, &["PRESTASI"]))
            .with("http://localhost:3000/uploads/atlet/pas_foto/rizky.png", png(40, 50, [120, 90, 60, 255]))
    }

    fn compose(athlete: &AthleteRecord, assets: &MemoryAssetSource) -> (Result<Vec<u8>, PiagamError>, BlobStore) {
        let config = EngineConfig::default();
        let blobs = BlobStore::new();
        let ctx = DocContext::new(&config, assets, &SkiaRasterizer, &blobs);
        let result = compose_id_card(&ctx, athlete, None, Some("#8b0000"));
        (result, blobs)
    }

    #[test]
    fn tier_selects_template_and_fields_are_drawn() {
        let assets = assets();
        let (bytes, _) = compose(&athlete(CompetitionTier::Pemula, None), &assets);
        let pdf = PdfDocument::load(&bytes.unwrap()).unwrap();
        assert_eq!(
            pdf.page_text_runs(0).unwrap(),
            vec!["PEMULA", "Rizky Pratama", "pemula - KYORUGI - Pracadet - Under 30 kg", "Dojang Garuda"]
        );
        assert_eq!(pdf.page_image_draws(0).unwrap(), 0);

        let (bytes, _) = compose(&athlete(CompetitionTier::Prestasi, None), &assets);
        let pdf = PdfDocument::load(&bytes.unwrap()).unwrap();
        assert_eq!(pdf.page_text_runs(0).unwrap()[0], "PRESTASI");
    }

    #[test]
    fn photo_is_rounded_and_embedded() {
        let assets = assets();
        let (bytes, blobs) = compose(&athlete(CompetitionTier::Prestasi, Some("rizky.png")), &assets);
        let pdf = PdfDocument::load(&bytes.unwrap()).unwrap();
        assert_eq!(pdf.page_image_draws(0).unwrap(), 1);
        assert_eq!(blobs.live_count(), 0);
    }

    #[test]
    fn missing_photo_is_skipped() {
        let assets = assets();
        let (bytes, _) = compose(&athlete(CompetitionTier::Prestasi, Some("nobody.png")), &assets);
        let pdf = PdfDocument::load(&bytes.unwrap()).unwrap();
        assert_eq!(pdf.page_image_draws(0).unwrap(), 0);
        assert_eq!(pdf.page_text_runs(0).unwrap().len(), 4);
    }

    #[test]
    fn missing_template_is_fatal() {
        let assets = MemoryAssetSource::new();
        let (result, _) = compose(&athlete(CompetitionTier::Pemula, None), &assets);
        assert!(matches!(result, Err(PiagamError::Template(_))));
    }

    #[test]
    fn fields_follow_the_template_height() {
        let athlete = athlete(CompetitionTier::Pemula, None);
        for height in [242.65_f32, 300.0] {
            let assets = MemoryAssetSource::new()
                .with("/templates/e-idcard_taekwondo_pemula.pdf", template_pdf(153.07, height, &["PEMULA"]));
            let (bytes, _) = compose(&athlete, &assets);
            let pdf = PdfDocument::load(&bytes.unwrap()).unwrap();
            let runs = pdf.page_text_positions(0).unwrap();
            for (text, y_mm) in [("Rizky Pratama", 50.0), ("Dojang Garuda", 61.0)] {
                let (_, x, y) = runs.iter().find(|(t, _, _)| t == text).unwrap();
                assert!((x - 5.0 * 2.83465).abs() < 0.05, "{text} x={x}");
                assert!((y - (height - y_mm * 2.83465)).abs() < 0.05, "{text} y={y} on height {height}");
            }
        }
    }
}
