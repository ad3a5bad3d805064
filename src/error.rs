/// Error taxonomy for document composition.
///
/// Template and PDF errors abort the document being built. Font, photo and
/// logo problems are normally absorbed by the caller and only surface here
/// when a component is used directly.
#[derive(thiserror::Error, Debug)]
pub enum PiagamError {
    #[error("asset error: {0}")]
    Asset(String),
    #[error("template error: {0}")]
    Template(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("raster error: {0}")]
    Raster(String),
    #[error("pdf error: {0}")]
    Pdf(String),
    #[error("participant {0} has no athlete record")]
    MissingAthlete(i64),
    #[error("object url error: {0}")]
    Blob(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PiagamError {
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    pub fn pdf(msg: impl Into<String>) -> Self {
        Self::Pdf(msg.into())
    }
}

pub(crate) fn lopdf_err(err: lopdf::Error) -> PiagamError {
    PiagamError::Pdf(format!("pdf compose error: {err}"))
}
