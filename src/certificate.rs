use crate::canvas::Canvas;
use crate::doc_context::DocContext;
use crate::error::PiagamError;
use crate::label::kelas_kejuaraan;
use crate::model::{AthleteRecord, MedalStatus, ParticipationRecord};
use crate::template::{CERTIFICATE_LAYOUT, CERTIFICATE_TEMPLATE_PATH};
use crate::types::Pt;
use crate::units::baseline_y;

/// `"<medal label> <class label>"`, without a trailing space when the class is unknown.
pub fn achievement_line(medal: MedalStatus, class_label: &str) -> String {
    let class_label = class_label.trim();
    if class_label.is_empty() {
        medal.label().to_string()
    } else {
        format!("{} {}", medal.label(), class_label)
    }
}

/// Certificate class label for a participation; empty when it has no class.
pub fn participation_class_label(participation: &ParticipationRecord) -> String {
    participation
        .class
        .as_ref()
        .map(kelas_kejuaraan)
        .unwrap_or_default()
}

/// Composes one certificate. Both lines are centered on the page and share
/// the theme color; the achievement line always uses the fallback bold font.
#[tracing::instrument(skip_all, fields(athlete = athlete.id, medal = ?medal))]
pub fn compose_certificate(
    ctx: &DocContext<'_>,
    athlete: &AthleteRecord,
    medal: MedalStatus,
    class_label: &str,
    theme: Option<&str>,
) -> Result<Vec<u8>, PiagamError> {
    let layout = CERTIFICATE_LAYOUT;
    let mut pdf = ctx.load_template(CERTIFICATE_TEMPLATE_PATH)?;
    for font in [ctx.font_set.headline, ctx.font_set.body, ctx.font_set.fallback] {
        pdf.embed_font(&ctx.fonts, font)?;
    }
    let page_size = pdf.page_size(0)?;
    let mut canvas = Canvas::new(page_size);
    canvas.set_fill_color(ctx.config.theme(theme));

    canvas.set_font(ctx.font_set.headline, Pt::from_f32(layout.name.font_size));
    canvas.draw_centered_string(
        &ctx.fonts,
        baseline_y(page_size.height, layout.name.y),
        &athlete.name.trim().to_uppercase(),
    );

    canvas.set_font(ctx.font_set.fallback, Pt::from_f32(layout.achievement.font_size));
    canvas.draw_centered_string(
        &ctx.fonts,
        baseline_y(page_size.height, layout.achievement.y),
        &achievement_line(medal, class_label),
    );

    let doc = canvas.finish();
    pdf.render_page(0, &doc.pages[0], &ctx.fonts)?;
    pdf.save()
}
