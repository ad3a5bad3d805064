use crate::assets::{AssetSource, decode_data_url, encode_data_url};
use crate::blob::BlobStore;
use crate::config::EngineConfig;
use crate::error::PiagamError;
use crate::font::{FontRegistry, FontSet};
use crate::pdf::{ImageId, PdfDocument};
use crate::raster::{ImageRasterizer, PhotoBox};

/// Everything a composer needs for one job. Fonts are fetched once when the
/// context is built and reused for every document the job produces.
pub struct DocContext<'a> {
    pub config: &'a EngineConfig,
    pub assets: &'a dyn AssetSource,
    pub rasterizer: &'a dyn ImageRasterizer,
    pub blobs: &'a BlobStore,
    pub fonts: FontRegistry,
    pub font_set: FontSet,
}

impl<'a> DocContext<'a> {
    pub fn new(
        config: &'a EngineConfig,
        assets: &'a dyn AssetSource,
        rasterizer: &'a dyn ImageRasterizer,
        blobs: &'a BlobStore,
    ) -> Self {
        let mut fonts = FontRegistry::new();
        let font_set = FontSet::load(&mut fonts, assets, &config.headline_font, &config.body_font);
        Self {
            config,
            assets,
            rasterizer,
            blobs,
            fonts,
            font_set,
        }
    }

    /// Fetches and parses a template. Any failure is fatal for the document.
    pub fn load_template(&self, path: &str) -> Result<PdfDocument, PiagamError> {
        tracing::debug!(template = path, "loading template");
        let bytes = self
            .assets
            .fetch(path)
            .map_err(|err| PiagamError::template(format!("{path}: {err}")))?;
        let pdf = PdfDocument::load(&bytes)
            .map_err(|err| PiagamError::template(format!("{path}: {err}")))?;
        if pdf.page_count() == 0 {
            return Err(PiagamError::template(format!("{path} has no pages")));
        }
        Ok(pdf)
    }

    /// Fetches a photo and returns it rounded to `photo_box` as a PNG `data:` URL.
    pub fn rounded_photo_data_url(&self, url: &str, photo_box: PhotoBox) -> Result<String, PiagamError> {
        let source = self.assets.fetch(url)?;
        let png = self.rasterizer.round_image(&source, photo_box)?;
        Ok(encode_data_url("image/png", &png))
    }

    /// Rounds a photo and embeds it into `pdf`.
    ///
    /// The decoded PNG is published under a temporary object URL and embedded
    /// from what that URL serves. The URL is revoked before returning.
    pub fn embed_rounded_photo(
        &self,
        pdf: &mut PdfDocument,
        url: &str,
        photo_box: PhotoBox,
    ) -> Result<ImageId, PiagamError> {
        let data_url = self.rounded_photo_data_url(url, photo_box)?;
        let (mime, png) = decode_data_url(&data_url)?;
        let mut object_url = self.blobs.create(&mime, png)?;
        let embedded = match self.blobs.resolve(object_url.as_str()) {
            Some(bytes) => pdf.embed_png(&bytes),
            None => Err(PiagamError::Blob(format!("{} vanished before embedding", object_url.as_str()))),
        };
        object_url.revoke()?;
        embedded
    }
}
