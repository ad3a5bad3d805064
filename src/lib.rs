mod assets;
mod batch;
mod blob;
mod canvas;
mod certificate;
mod config;
mod doc_context;
mod download;
mod error;
mod font;
mod id_card;
mod label;
mod model;
mod naming;
mod pdf;
mod raster;
mod roster;
mod template;
mod types;
mod units;

#[cfg(feature = "http")]
pub use assets::HttpAssetSource;
pub use assets::{
    AssetSource, DecodedImage, FsAssetSource, MemoryAssetSource, decode_data_url,
    decode_image, encode_data_url,
};
pub use batch::{
    BatchFailure, BatchOutcome, assemble_certificates, assemble_id_cards, enhanced_athlete,
};
pub use blob::{BlobStore, BlobUrl};
pub use canvas::{Canvas, Command, Document, Page};
pub use certificate::{achievement_line, compose_certificate, participation_class_label};
pub use config::{DEFAULT_BODY_FONT, DEFAULT_HEADLINE_FONT, DEFAULT_ORG, EngineConfig};
pub use doc_context::DocContext;
pub use download::{Delivery, DirectorySink, DownloadSink, ExportReport, MemorySink};
pub use error::PiagamError;
pub use font::{FontId, FontRegistry, FontSet, StandardFont};
pub use id_card::compose_id_card;
pub use label::{CATEGORY_UNAVAILABLE, athlete_class_label, id_card_class_label, kelas_kejuaraan};
pub use model::{
    AthleteRecord, ClassDefinition, CompetitionTier, Discipline, Gender, MedalStatus,
    ParticipationRecord, ParticipationStatus, reconcile_participation, resolve_participation,
};
pub use naming::{
    batch_certificate_filename, batch_id_card_filename, batch_roster_filename,
    certificate_filename, id_card_filename, indonesian_long_date, indonesian_weekday,
    roster_filename, sanitize,
};
pub use pdf::{ImageId, PdfDocument};
pub use raster::{ImageRasterizer, PhotoBox, SkiaRasterizer};
pub use roster::{
    BatchExportRequest, RosterGroup, RosterOutcome, compose_roster, fit_text, roster_entry,
    split_title, title_lines,
};
pub use template::{
    CERTIFICATE_LAYOUT, CERTIFICATE_TEMPLATE_PATH, CertificateLayout, FieldSpec, ID_CARD_LAYOUT,
    IdCardLayout, id_card_template_path,
};
pub use types::{Color, Pt, Size};
pub use units::{
    PIXELS_PER_MM, POINTS_PER_MM, baseline_y, centered_x, element_bottom_y, mm_to_pixels,
    mm_to_points,
};

use std::path::PathBuf;
use std::sync::Arc;

/// The document engine. Cheap to share; every call builds its own
/// [`DocContext`], so fonts are fetched once per document or batch.
pub struct Piagam {
    config: EngineConfig,
    assets: Arc<dyn AssetSource>,
    rasterizer: Arc<dyn ImageRasterizer>,
    blobs: BlobStore,
    sink: Arc<dyn DownloadSink>,
}

#[derive(Clone)]
pub struct PiagamBuilder {
    config: EngineConfig,
    assets: Option<Arc<dyn AssetSource>>,
    rasterizer: Option<Arc<dyn ImageRasterizer>>,
    blobs: Option<BlobStore>,
    sink: Option<Arc<dyn DownloadSink>>,
}

impl Default for PiagamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PiagamBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            assets: None,
            rasterizer: None,
            blobs: None,
            sink: None,
        }
    }

    /// Replaces every setting with `config`.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.asset_root = Some(root.into());
        self
    }

    pub fn org(mut self, org: impl Into<String>) -> Self {
        self.config.org = org.into();
        self
    }

    pub fn theme_color(mut self, hex: impl Into<String>) -> Self {
        self.config.theme_color = Some(hex.into());
        self
    }

    pub fn roster_page_size(mut self, size: Size) -> Self {
        self.config.roster_page_size = size;
        self
    }

    pub fn headline_font(mut self, reference: impl Into<String>) -> Self {
        self.config.headline_font = reference.into();
        self
    }

    pub fn body_font(mut self, reference: impl Into<String>) -> Self {
        self.config.body_font = reference.into();
        self
    }

    pub fn asset_source(mut self, source: impl AssetSource + 'static) -> Self {
        self.assets = Some(Arc::new(source));
        self
    }

    pub fn rasterizer(mut self, rasterizer: impl ImageRasterizer + 'static) -> Self {
        self.rasterizer = Some(Arc::new(rasterizer));
        self
    }

    /// Shares an existing object URL store, e.g. to observe revocations.
    pub fn blob_store(mut self, blobs: BlobStore) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn download_sink(mut self, sink: impl DownloadSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn build(self) -> Result<Piagam, PiagamError> {
        self.config.validate()?;
        let assets = match self.assets {
            Some(assets) => assets,
            None => default_asset_source(&self.config)?,
        };
        Ok(Piagam {
            config: self.config,
            assets,
            rasterizer: self.rasterizer.unwrap_or_else(|| Arc::new(SkiaRasterizer)),
            blobs: self.blobs.unwrap_or_default(),
            sink: self.sink.unwrap_or_else(|| Arc::new(MemorySink::new())),
        })
    }
}

fn default_asset_source(config: &EngineConfig) -> Result<Arc<dyn AssetSource>, PiagamError> {
    if let Some(root) = &config.asset_root {
        return Ok(Arc::new(
            FsAssetSource::new(root).with_base_url(config.api_base_url.clone()),
        ));
    }
    #[cfg(feature = "http")]
    {
        Ok(Arc::new(HttpAssetSource::new(config.api_base_url.clone())?))
    }
    #[cfg(not(feature = "http"))]
    {
        Err(PiagamError::InvalidConfiguration(
            "no asset source: set asset_root or enable the http feature".to_string(),
        ))
    }
}

impl Piagam {
    pub fn builder() -> PiagamBuilder {
        PiagamBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// A fresh composition context with fonts loaded.
    pub fn context(&self) -> DocContext<'_> {
        DocContext::new(
            &self.config,
            self.assets.as_ref(),
            self.rasterizer.as_ref(),
            &self.blobs,
        )
    }

    pub fn id_card_pdf(
        &self,
        athlete: &AthleteRecord,
        full_list: Option<&[ParticipationRecord]>,
        theme: Option<&str>,
    ) -> Result<Vec<u8>, PiagamError> {
        compose_id_card(&self.context(), athlete, full_list, theme)
    }

    pub fn certificate_pdf(
        &self,
        athlete: &AthleteRecord,
        medal: MedalStatus,
        class_label: &str,
        theme: Option<&str>,
    ) -> Result<Vec<u8>, PiagamError> {
        compose_certificate(&self.context(), athlete, medal, class_label, theme)
    }

    pub fn export_id_card(
        &self,
        athlete: &AthleteRecord,
        full_list: Option<&[ParticipationRecord]>,
        theme: Option<&str>,
    ) -> Result<ExportReport, PiagamError> {
        let bytes = self.id_card_pdf(athlete, full_list, theme)?;
        self.deliver_single(id_card_filename(&athlete.name), bytes)
    }

    pub fn export_certificate(
        &self,
        athlete: &AthleteRecord,
        medal: MedalStatus,
        class_label: &str,
        theme: Option<&str>,
    ) -> Result<ExportReport, PiagamError> {
        let bytes = self.certificate_pdf(athlete, medal, class_label, theme)?;
        self.deliver_single(certificate_filename(&athlete.name), bytes)
    }

    /// Certificates for every participant in one PDF. Items that fail are
    /// counted in the report; the batch itself only fails on delivery.
    #[tracing::instrument(skip_all, fields(participants = participants.len()))]
    pub fn export_certificates(
        &self,
        participants: &[ParticipationRecord],
        medal: MedalStatus,
        theme: Option<&str>,
    ) -> Result<ExportReport, PiagamError> {
        let outcome = assemble_certificates(&self.context(), participants, medal, theme)?;
        self.deliver_batch(batch_certificate_filename(participants.len()), outcome)
    }

    #[tracing::instrument(skip_all, fields(participants = participants.len()))]
    pub fn export_id_cards(
        &self,
        participants: &[ParticipationRecord],
        theme: Option<&str>,
    ) -> Result<ExportReport, PiagamError> {
        let outcome = assemble_id_cards(&self.context(), participants, theme)?;
        self.deliver_batch(batch_id_card_filename(participants.len()), outcome)
    }

    pub fn export_roster(&self, request: &BatchExportRequest) -> Result<ExportReport, PiagamError> {
        let outcome = compose_roster(&self.context(), request)?;
        let filename = request.filename();
        self.deliver(&filename, outcome.bytes)?;
        Ok(ExportReport {
            filename,
            page_count: outcome.page_count,
            succeeded: outcome.participant_count,
            failed: 0,
        })
    }

    fn deliver_single(&self, filename: String, bytes: Vec<u8>) -> Result<ExportReport, PiagamError> {
        let page_count = PdfDocument::load(&bytes)?.page_count();
        self.deliver(&filename, bytes)?;
        Ok(ExportReport {
            filename,
            page_count,
            succeeded: 1,
            failed: 0,
        })
    }

    fn deliver_batch(&self, filename: String, outcome: BatchOutcome) -> Result<ExportReport, PiagamError> {
        self.deliver(&filename, outcome.bytes)?;
        Ok(ExportReport {
            filename,
            page_count: outcome.page_count,
            succeeded: outcome.succeeded,
            failed: outcome.failed,
        })
    }

    /// Publishes `bytes` under a temporary object URL, hands it to the sink
    /// and revokes the URL whatever the sink returns.
    fn deliver(&self, filename: &str, bytes: Vec<u8>) -> Result<(), PiagamError> {
        let mut url = self.blobs.create("application/pdf", bytes)?;
        let delivered = match self.blobs.resolve(url.as_str()) {
            Some(data) => self.sink.deliver(filename, url.as_str(), &data),
            None => Err(PiagamError::Blob(format!("{} vanished before delivery", url.as_str()))),
        };
        url.revoke()?;
        delivered
    }
}
