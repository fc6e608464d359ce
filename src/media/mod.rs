//! Media tracks and their kinds.

mod local_tracks;

use std::{fmt, ops::Deref, rc::Rc, str::FromStr};

use derive_more::Display;

use crate::engine::MediaTrack;

#[doc(inline)]
pub use self::local_tracks::{LocalTrackSet, LocalTracks, SelectedDevices};

/// Kind of a media track.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MediaKind {
    #[display(fmt = "audio")]
    Audio,

    #[display(fmt = "video")]
    Video,

    /// Screen capture.
    #[display(fmt = "desktop")]
    Desktop,
}

/// Unknown [`MediaKind`] name.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "Unknown media kind: {}", _0)]
pub struct UnknownMediaKindError(pub String);

impl FromStr for MediaKind {
    type Err = UnknownMediaKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "desktop" => Ok(Self::Desktop),
            _ => Err(UnknownMediaKindError(s.to_owned())),
        }
    }
}

/// Shared reference to an engine [`MediaTrack`].
///
/// Two [`Track`]s are equal only if they reference the same engine track.
#[derive(Clone)]
pub struct Track(Rc<dyn MediaTrack>);

impl Track {
    #[inline]
    pub fn new(track: Rc<dyn MediaTrack>) -> Self {
        Self(track)
    }

    /// Returns the underlying engine track.
    #[inline]
    pub fn inner(&self) -> &Rc<dyn MediaTrack> {
        &self.0
    }

    /// Indicates whether this [`Track`] references the provided engine track.
    #[inline]
    pub fn is(&self, track: &Rc<dyn MediaTrack>) -> bool {
        Rc::as_ptr(&self.0).cast::<()>() == Rc::as_ptr(track).cast::<()>()
    }
}

impl From<Rc<dyn MediaTrack>> for Track {
    #[inline]
    fn from(track: Rc<dyn MediaTrack>) -> Self {
        Self(track)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.is(&other.0)
    }
}

impl Eq for Track {}

impl Deref for Track {
    type Target = dyn MediaTrack;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Track").field(&self.0).finish()
    }
}
