/// Track domain type
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A playable item
///
/// Immutable once constructed. Two tracks are equal when their ids are equal,
/// regardless of metadata, so a refreshed copy of a track still matches the
/// queued one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TrackFields")]
pub struct Track {
    id: String,
    title: String,
    #[serde(default)]
    artist_names: Vec<String>,
    #[serde(default)]
    album_title: Option<String>,
    #[serde(default)]
    artwork_url: Option<String>,
    /// Candidate stream descriptor handed to the stream resolver
    #[serde(default)]
    stream_hint: Option<String>,
}

/// Wire shape of a track, validated into [`Track`] on deserialize
#[derive(Deserialize)]
struct TrackFields {
    id: String,
    title: String,
    #[serde(default)]
    artist_names: Vec<String>,
    #[serde(default)]
    album_title: Option<String>,
    #[serde(default)]
    artwork_url: Option<String>,
    #[serde(default)]
    stream_hint: Option<String>,
}

impl TryFrom<TrackFields> for Track {
    type Error = CoreError;

    fn try_from(fields: TrackFields) -> Result<Self> {
        let mut track = Track::new(fields.id, fields.title)?;
        track.artist_names = fields.artist_names;
        track.album_title = fields.album_title;
        track.artwork_url = fields.artwork_url;
        track.stream_hint = fields.stream_hint;
        Ok(track)
    }
}

impl Track {
    /// Create a new track with minimal metadata
    ///
    /// # Errors
    /// Returns `CoreError::InvalidInput` if `id` is empty or whitespace.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::invalid_input("track id must not be empty"));
        }

        Ok(Self {
            id,
            title: title.into(),
            artist_names: Vec::new(),
            album_title: None,
            artwork_url: None,
            stream_hint: None,
        })
    }

    /// Set the artist credits
    #[must_use]
    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artist_names = artists.into_iter().map(Into::into).collect();
        self
    }

    /// Set the album title
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album_title = Some(album.into());
        self
    }

    /// Set the artwork URL
    #[must_use]
    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    /// Set the stream hint
    #[must_use]
    pub fn with_stream_hint(mut self, hint: impl Into<String>) -> Self {
        self.stream_hint = Some(hint.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist_names(&self) -> &[String] {
        &self.artist_names
    }

    pub fn album_title(&self) -> Option<&str> {
        self.album_title.as_deref()
    }

    pub fn artwork_url(&self) -> Option<&str> {
        self.artwork_url.as_deref()
    }

    pub fn stream_hint(&self) -> Option<&str> {
        self.stream_hint.as_deref()
    }

    /// Artist credits joined for display ("A, B")
    pub fn artist_line(&self) -> String {
        self.artist_names.join(", ")
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
