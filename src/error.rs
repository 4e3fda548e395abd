use thiserror::Error;

/// Library error type for gallery construction and photo loading.
#[derive(Debug, Error)]
pub enum Error {
    /// A gallery needs at least one photo.
    #[error("photo set is empty")]
    EmptyPhotoSet,

    /// No configured set carries this slug.
    #[error("unknown set: {0}")]
    UnknownSet(String),

    /// A page or redirect URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Flickr response text without a JSON body.
    #[error("unexpected Flickr response: {0}")]
    FlickrEnvelope(String),

    /// The fetcher cannot load this kind of source.
    #[error("unsupported photo source: {0}")]
    UnsupportedSource(String),

    /// Image bytes could not be decoded.
    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML configuration error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// JSON photo list error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
