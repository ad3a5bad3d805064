//! Where templates, fonts and images come from.
//!
//! Asset references are either absolute site paths (`/templates/...`,
//! `/fonts/...`), absolute URLs (athlete photos, logos) or `data:` URLs.

use crate::error::PiagamError;
use base64::Engine;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// Fetches raw asset bytes by reference.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, PiagamError>;
}

/// Serves assets from a local directory laid out like the web root.
///
/// `/templates/x.pdf` maps to `<root>/templates/x.pdf`. URLs under
/// `base_url` map onto the same tree, so `<base>/uploads/atlet/pas_foto/a.jpg`
/// resolves to `<root>/uploads/atlet/pas_foto/a.jpg`.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
    base_url: Option<String>,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, PiagamError> {
        let relative = match &self.base_url {
            Some(base) if reference.starts_with(base.as_str()) => &reference[base.len()..],
            _ if reference.contains("://") => {
                return Err(PiagamError::asset(format!(
                    "{reference} is outside the local asset root"
                )));
            }
            _ => reference,
        };
        let relative = relative.split(['?', '#']).next().unwrap_or(relative);
        let mut path = self.root.clone();
        for part in relative.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    return Err(PiagamError::asset(format!(
                        "{reference} escapes the asset root"
                    )));
                }
                part => path.push(part),
            }
        }
        Ok(path)
    }
}

impl AssetSource for FsAssetSource {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, PiagamError> {
        if reference.starts_with("data:") {
            return decode_data_url(reference).map(|(_, data)| data);
        }
        let path = self.resolve(reference)?;
        tracing::debug!(reference, path = %path.display(), "reading asset");
        std::fs::read(&path)
            .map_err(|err| PiagamError::asset(format!("{}: {err}", path.display())))
    }
}

/// In-memory assets keyed by their exact reference.
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    assets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, reference: impl Into<String>, data: Vec<u8>) -> Self {
        self.insert(reference, data);
        self
    }

    pub fn insert(&self, reference: impl Into<String>, data: Vec<u8>) {
        if let Ok(mut map) = self.assets.write() {
            map.insert(reference.into(), data);
        }
    }

    pub fn len(&self) -> usize {
        self.assets.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, PiagamError> {
        if reference.starts_with("data:") {
            return decode_data_url(reference).map(|(_, data)| data);
        }
        let map = self
            .assets
            .read()
            .map_err(|_| PiagamError::asset("asset map lock poisoned"))?;
        map.get(reference)
            .cloned()
            .ok_or_else(|| PiagamError::asset(format!("{reference} not found")))
    }
}

/// Blocking HTTP fetches. Site paths are resolved against `base_url`.
#[cfg(feature = "http")]
pub struct HttpAssetSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpAssetSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PiagamError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("piagam/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| PiagamError::asset(format!("http client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(feature = "http")]
impl AssetSource for HttpAssetSource {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, PiagamError> {
        if reference.starts_with("data:") {
            return decode_data_url(reference).map(|(_, data)| data);
        }
        let url = if reference.contains("://") {
            reference.to_string()
        } else {
            format!("{}/{}", self.base_url, reference.trim_start_matches('/'))
        };
        tracing::debug!(%url, "fetching asset");
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|err| PiagamError::asset(format!("{url}: {err}")))?;
        let bytes = response
            .bytes()
            .map_err(|err| PiagamError::asset(format!("{url}: {err}")))?;
        Ok(bytes.to_vec())
    }
}

/// Splits a `data:` URL into its mime type and decoded payload.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), PiagamError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| PiagamError::asset("not a data url"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| PiagamError::asset("data url without payload"))?;
    let mime = header
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.split(';').any(|p| p == "base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|err| PiagamError::asset(format!("invalid base64 payload: {err}")))?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok((mime, data))
}

pub fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// A decoded raster split into a color plane and an optional alpha plane.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

pub fn decode_image(data: &[u8]) -> Result<DecodedImage, PiagamError> {
    let decoded = image::load_from_memory(data)
        .map_err(|err| PiagamError::asset(format!("image decode failed: {err}")))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }
    Ok(DecodedImage {
        width,
        height,
        rgb,
        alpha: has_alpha.then_some(alpha),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_roundtrip_keeps_mime() {
        let url = encode_data_url("image/png", b"\x89PNG");
        assert!(url.starts_with("data:image/png;base64,"));
        let (mime, data) = decode_data_url(&url).expect("decode");
        assert_eq!(mime, "image/png");
        assert_eq!(data, b"\x89PNG");
    }

    #[test]
    fn plain_data_url_is_not_base64_decoded() {
        let (mime, data) = decode_data_url("data:text/plain,hello").expect("decode");
        assert_eq!(mime, "text/plain");
        assert_eq!(data, b"hello");
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
        assert!(decode_data_url("http://x").is_err());
    }

    #[test]
    fn fs_source_maps_site_paths_and_base_url() {
        let dir = std::env::temp_dir().join(format!("piagam-assets-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("templates")).expect("mkdir");
        std::fs::create_dir_all(dir.join("uploads/atlet/pas_foto")).expect("mkdir");
        std::fs::write(dir.join("templates/piagam.pdf"), b"pdf").expect("write");
        std::fs::write(dir.join("uploads/atlet/pas_foto/a.jpg"), b"jpg").expect("write");

        let source = FsAssetSource::new(&dir).with_base_url("https://api.test/");
        assert_eq!(source.fetch("/templates/piagam.pdf").expect("template"), b"pdf");
        assert_eq!(
            source
                .fetch("https://api.test/uploads/atlet/pas_foto/a.jpg")
                .expect("photo"),
            b"jpg"
        );
        assert!(source.fetch("https://elsewhere.test/a.jpg").is_err());
        assert!(source.fetch("/templates/../../etc/passwd").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_source_reports_missing_assets() {
        let source = MemoryAssetSource::new().with("/fonts/body.ttf", vec![1, 2, 3]);
        assert_eq!(source.fetch("/fonts/body.ttf").expect("font"), vec![1, 2, 3]);
        assert!(matches!(
            source.fetch("/fonts/missing.ttf"),
            Err(PiagamError::Asset(_))
        ));
    }

    #[test]
    fn decode_image_splits_alpha_only_when_needed() {
        let opaque = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(opaque)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode");
        let decoded = decode_image(&png).expect("decode");
        assert_eq!((decoded.width, decoded.height), (2, 2));
        assert_eq!(decoded.rgb.len(), 12);
        assert!(decoded.alpha.is_none());

        let mut clear = image::RgbaImage::from_pixel(2, 1, image::Rgba([0, 0, 0, 255]));
        clear.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(clear)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode");
        assert_eq!(decode_image(&png).expect("decode").alpha, Some(vec![0, 255]));
    }
}
