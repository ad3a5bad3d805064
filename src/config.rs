use crate::error::PiagamError;
use crate::types::{Color, Size};
use std::path::PathBuf;

pub const DEFAULT_ORG: &str = "taekwondo";
pub const DEFAULT_HEADLINE_FONT: &str = "/fonts/headline.ttf";
pub const DEFAULT_BODY_FONT: &str = "/fonts/body.ttf";

/// Engine-wide settings shared by every composer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the registration API; athlete photos live under it.
    pub api_base_url: String,
    /// Local directory that mirrors `/templates` and `/fonts` for file-backed sources.
    pub asset_root: Option<PathBuf>,
    /// Organization slug used in ID card template names.
    pub org: String,
    pub theme_color: Option<String>,
    pub roster_page_size: Size,
    pub headline_font: String,
    pub body_font: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            asset_root: None,
            org: DEFAULT_ORG.to_string(),
            theme_color: None,
            roster_page_size: Size::a4(),
            headline_font: DEFAULT_HEADLINE_FONT.to_string(),
            body_font: DEFAULT_BODY_FONT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads `PIAGAM_*` variables, keeping defaults for anything unset.
    pub fn from_env() -> Result<Self, PiagamError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("PIAGAM_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Ok(root) = std::env::var("PIAGAM_ASSET_ROOT") {
            config.asset_root = Some(PathBuf::from(root));
        }
        if let Ok(org) = std::env::var("PIAGAM_ORG") {
            config.org = org;
        }
        config.theme_color = std::env::var("PIAGAM_THEME_COLOR").ok();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PiagamError> {
        if self.api_base_url.trim().is_empty() {
            return Err(PiagamError::InvalidConfiguration(
                "api_base_url must not be empty".to_string(),
            ));
        }
        let org = self.org.trim();
        if org.is_empty() || !org.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(PiagamError::InvalidConfiguration(format!(
                "org slug {:?} must be non-empty and contain only [A-Za-z0-9_-]",
                self.org
            )));
        }
        if let Some(theme) = self.theme_color.as_deref()
            && Color::from_hex(theme).is_none()
        {
            return Err(PiagamError::InvalidConfiguration(format!(
                "theme_color {theme:?} is not a hex color"
            )));
        }
        let size = self.roster_page_size;
        if size.width.to_f32() <= 0.0 || size.height.to_f32() <= 0.0 {
            return Err(PiagamError::InvalidConfiguration(
                "roster_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Default text color for names and roster headers.
    pub fn theme(&self, override_hex: Option<&str>) -> Color {
        let fallback = Color::theme_or(self.theme_color.as_deref(), Color::NAVY);
        Color::theme_or(override_hex, fallback)
    }

    pub fn photo_url(&self, filename: &str) -> String {
        format!(
            "{}/uploads/atlet/pas_foto/{}",
            self.api_base_url.trim_end_matches('/'),
            filename.trim_start_matches('/')
        )
    }
}
