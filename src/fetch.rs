use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::events::LoadedImage;

/// Fetches one photo and resolves when it is ready to display.
///
/// Calling `fetch` issues the request; the returned future only waits for it.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, source: &str) -> BoxFuture<'static, Result<LoadedImage>>;
}

/// Loads photos from disk.
///
/// Site-relative sources such as `/photography/images/a.jpg` resolve under `root`;
/// `file://` URLs are used directly. Other schemes are rejected.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, source: &str) -> Result<PathBuf> {
        if source.starts_with("file:") {
            let url = Url::parse(source)?;
            return url
                .to_file_path()
                .map_err(|()| Error::UnsupportedSource(source.to_owned()));
        }
        if source.contains("://") {
            return Err(Error::UnsupportedSource(source.to_owned()));
        }
        Ok(self.root.join(source.trim_start_matches('/')))
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, source: &str) -> BoxFuture<'static, Result<LoadedImage>> {
        let resolved = self.resolve(source);
        Box::pin(async move {
            let path = resolved?;
            tokio::task::spawn_blocking(move || decode_rgba8(&path))
                .await
                .map_err(|err| Error::Io(std::io::Error::other(err)))?
        })
    }
}

fn decode_rgba8(path: &Path) -> Result<LoadedImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    let (width, height) = img.dimensions();
    debug!(path = %path.display(), width, height, "decoded");
    Ok(LoadedImage {
        width,
        height,
        pixels: img.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_site_relative_sources_under_root() {
        let fetcher = FileFetcher::new("/srv/site");
        assert_eq!(
            fetcher.resolve("/photography/images/a.jpg").unwrap(),
            PathBuf::from("/srv/site/photography/images/a.jpg")
        );
        assert_eq!(
            fetcher.resolve("images/b.jpg").unwrap(),
            PathBuf::from("/srv/site/images/b.jpg")
        );
    }

    #[test]
    fn rejects_remote_sources() {
        let fetcher = FileFetcher::new("/srv/site");
        let err = fetcher
            .resolve("http://farm5.static.flickr.com/a.jpg")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedSource(_)));
    }

    #[cfg(unix)]
    #[test]
    fn file_urls_bypass_root() {
        let fetcher = FileFetcher::new("/srv/site");
        assert_eq!(
            fetcher.resolve("file:///tmp/c.png").unwrap(),
            PathBuf::from("/tmp/c.png")
        );
    }

    #[tokio::test]
    async fn decodes_png_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let fetcher = FileFetcher::new(dir.path());
        let loaded = fetcher.fetch("/tiny.png").await.unwrap();
        assert_eq!((loaded.width, loaded.height), (3, 2));
        assert_eq!(&loaded.pixels[..4], &[10, 20, 30, 255]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FileFetcher::new(dir.path());
        assert!(fetcher.fetch("nope.jpg").await.is_err());
    }
}
