use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::events::LoadedImage;

/// One photo as supplied by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PhotoDescriptor {
    /// Image to fetch and display.
    #[serde(alias = "source", alias = "source_url")]
    pub source_url: String,
    /// Image handed to share embeds as their preview; defaults to `source_url`.
    #[serde(default, alias = "share_url")]
    pub share_url: Option<String>,
    /// Link to the photo elsewhere (e.g. its Flickr page).
    #[serde(default, alias = "flickr_url", alias = "external_link_url")]
    pub external_link_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl PhotoDescriptor {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            share_url: None,
            external_link_url: None,
            title: None,
        }
    }

    pub fn share_url(&self) -> &str {
        self.share_url.as_deref().unwrap_or(&self.source_url)
    }
}

/// Load progress of one slot in a [`PhotoSet`].
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    Pending,
    Loaded(Arc<LoadedImage>),
    /// Every fetch attempt failed; the slot never displays.
    Unavailable,
}

impl LoadState {
    pub fn image(&self) -> Option<&Arc<LoadedImage>> {
        match self {
            Self::Loaded(image) => Some(image),
            _ => None,
        }
    }
}

/// Ordered, non-empty list of photos; insertion order is display order.
#[derive(Debug, Clone)]
pub struct PhotoSet {
    photos: Vec<PhotoDescriptor>,
    slots: Vec<LoadState>,
}

impl PhotoSet {
    pub fn new(photos: Vec<PhotoDescriptor>) -> Result<Self> {
        if photos.is_empty() {
            return Err(Error::EmptyPhotoSet);
        }
        let slots = vec![LoadState::Pending; photos.len()];
        Ok(Self { photos, slots })
    }

    /// Reads a Flickr `photosets.getPhotos` response.
    ///
    /// Accepts the bare `{"photo": [...]}` object, the same object under a `photoset`
    /// key, and either wrapped in the `jsonFlickrApi(...)` callback.
    pub fn from_flickr_json(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Envelope {
            Wrapped { photoset: PhotoList },
            Bare(PhotoList),
        }

        #[derive(Deserialize)]
        struct PhotoList {
            photo: Vec<PhotoDescriptor>,
        }

        let body = strip_flickr_callback(text)?;
        let list = match serde_json::from_str::<Envelope>(body)? {
            Envelope::Wrapped { photoset } => photoset,
            Envelope::Bare(list) => list,
        };
        Self::new(list.photo)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    /// Never true for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PhotoDescriptor> {
        self.photos.get(index)
    }

    pub fn state(&self, index: usize) -> Option<&LoadState> {
        self.slots.get(index)
    }

    pub fn sources(&self) -> Vec<String> {
        self.photos.iter().map(|p| p.source_url.clone()).collect()
    }

    /// Attaches a fetched image. Returns false for an index outside the set.
    pub fn attach(&mut self, index: usize, image: Arc<LoadedImage>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = LoadState::Loaded(image);
                true
            }
            None => false,
        }
    }

    pub fn mark_unavailable(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if matches!(slot, LoadState::Pending) => {
                *slot = LoadState::Unavailable;
                true
            }
            _ => false,
        }
    }
}

fn strip_flickr_callback(text: &str) -> Result<&str> {
    const CALLBACK: &str = "jsonFlickrApi(";
    let text = text.trim();
    let Some(start) = text.rfind(CALLBACK) else {
        return Ok(text);
    };
    let inner = &text[start + CALLBACK.len()..];
    let end = inner
        .rfind(')')
        .ok_or_else(|| Error::FlickrEnvelope(text.chars().take(64).collect()))?;
    Ok(&inner[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_set() {
        assert!(matches!(PhotoSet::new(Vec::new()), Err(Error::EmptyPhotoSet)));
    }

    #[test]
    fn share_url_defaults_to_source() {
        let mut photo = PhotoDescriptor::new("/photography/images/a.jpg");
        assert_eq!(photo.share_url(), "/photography/images/a.jpg");
        photo.share_url = Some("http://cdn.example/a.jpg".into());
        assert_eq!(photo.share_url(), "http://cdn.example/a.jpg");
    }

    #[test]
    fn reads_wrapped_flickr_response() {
        let text = r#"jsonFlickrApi({"photoset": {"id": "72157", "photo": [
            {"id": "1", "title": "Delancey", "source": "/photography/images/delancey-1.jpg",
             "flickr_url": "http://www.flickr.com/photos/someone/1"},
            {"id": "2", "title": "Orchard", "source": "/photography/images/orchard-2.jpg"}
        ]}, "stat": "ok"})"#;
        let set = PhotoSet::from_flickr_json(text).unwrap();
        assert_eq!(set.len(), 2);
        let first = set.get(0).unwrap();
        assert_eq!(first.source_url, "/photography/images/delancey-1.jpg");
        assert_eq!(
            first.external_link_url.as_deref(),
            Some("http://www.flickr.com/photos/someone/1")
        );
        assert_eq!(first.title.as_deref(), Some("Delancey"));
        assert!(set.get(1).unwrap().external_link_url.is_none());
    }

    #[test]
    fn reads_bare_photo_list() {
        let text = r#"{"photo": [{"source": "a.jpg"}]}"#;
        let set = PhotoSet::from_flickr_json(text).unwrap();
        assert_eq!(set.sources(), vec!["a.jpg".to_string()]);
    }

    #[test]
    fn empty_flickr_list_is_rejected() {
        let err = PhotoSet::from_flickr_json(r#"{"photo": []}"#).unwrap_err();
        assert!(matches!(err, Error::EmptyPhotoSet));
    }

    #[test]
    fn truncated_callback_is_reported() {
        let err = PhotoSet::from_flickr_json("jsonFlickrApi({\"photo\": [").unwrap_err();
        assert!(matches!(err, Error::FlickrEnvelope(_)));
    }

    #[test]
    fn slots_track_load_state() {
        let mut set = PhotoSet::new(vec![
            PhotoDescriptor::new("a.jpg"),
            PhotoDescriptor::new("b.jpg"),
        ])
        .unwrap();
        let image = Arc::new(LoadedImage {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        });
        assert!(set.attach(1, image.clone()));
        assert!(!set.attach(2, image));
        assert!(set.state(1).unwrap().image().is_some());
        assert!(set.state(0).unwrap().image().is_none());

        assert!(set.mark_unavailable(0));
        assert!(!set.mark_unavailable(1), "loaded slots stay loaded");
        assert!(matches!(set.state(0), Some(LoadState::Unavailable)));
    }
}
