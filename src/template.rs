//! Fixed field placements for each document template.
//!
//! All values are millimeters measured from the top-left corner of the page.

use crate::model::CompetitionTier;

pub const CERTIFICATE_TEMPLATE_PATH: &str = "/templates/piagam.pdf";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub border_radius: Option<f32>,
}

impl FieldSpec {
    pub const fn text(x: f32, y: f32, font_size: f32) -> Self {
        Self {
            x,
            y,
            font_size,
            width: None,
            height: None,
            border_radius: None,
        }
    }

    pub const fn image(x: f32, y: f32, width: f32, height: f32, border_radius: f32) -> Self {
        Self {
            x,
            y,
            font_size: 0.0,
            width: Some(width),
            height: Some(height),
            border_radius: Some(border_radius),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdCardLayout {
    pub photo: FieldSpec,
    pub name: FieldSpec,
    pub class_label: FieldSpec,
    pub club: FieldSpec,
}

/// Shared by both tier variants of the ID card template.
pub const ID_CARD_LAYOUT: IdCardLayout = IdCardLayout {
    photo: FieldSpec::image(17.0, 17.0, 20.0, 25.0, 2.0),
    name: FieldSpec::text(5.0, 50.0, 10.0),
    class_label: FieldSpec::text(5.0, 56.0, 6.5),
    club: FieldSpec::text(5.0, 61.0, 6.5),
};

/// Certificate lines are centered; only `y` and `font_size` apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CertificateLayout {
    pub name: FieldSpec,
    pub achievement: FieldSpec,
}

pub const CERTIFICATE_LAYOUT: CertificateLayout = CertificateLayout {
    name: FieldSpec::text(0.0, 98.0, 28.0),
    achievement: FieldSpec::text(0.0, 114.0, 14.0),
};

/// Template path for an ID card; athletes without a tier use the `prestasi` variant.
pub fn id_card_template_path(org: &str, tier: Option<CompetitionTier>) -> String {
    let tier = tier.unwrap_or(CompetitionTier::Prestasi);
    format!("/templates/e-idcard_{}_{}.pdf", org, tier.as_str())
}
