//! The core data type shared by the loader, the exposure tracker, and the
//! playback coordinator.
//!
//! A `FeedItem` is either an image post or a video post.  The media variant
//! is a real enum, so an item can never carry half of each.  Identity is the
//! store-assigned [`ItemId`]; everything else is plain data.
//!
//! ## For contributors
//!
//! If you add a field, also update [`crate::store::MemoryStore`] if it needs
//! special handling on insert (today only `id` and `created_at` do).

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

/// Store-assigned identity of a feed item.
///
/// Ids are handed out by [`FeedStore::insert`](crate::store::FeedStore::insert)
/// and never change afterwards.  Items that have not been inserted yet carry
/// [`ItemId::UNASSIGNED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub i64);

impl ItemId {
    /// Placeholder for items that have not been inserted into a store.
    pub const UNASSIGNED: ItemId = ItemId(0);

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an item wants to be laid out by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutMode {
    /// Full-width row.
    #[default]
    Single,
    /// Half-width cell in a two-column grid.
    Grid,
    /// Reserved; hosts currently treat it like `Grid`.
    Staggered,
}

impl LayoutMode {
    /// Single and grid swap; staggered has no counterpart and stays put.
    pub fn toggled(self) -> Self {
        match self {
            Self::Single => Self::Grid,
            Self::Grid => Self::Single,
            Self::Staggered => Self::Staggered,
        }
    }
}

/// Discriminator for [`Media`], used by store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

/// The media attached to an item.  Exactly one variant is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Image {
        url: String,
        width: u32,
        height: u32,
    },
    Video {
        url: String,
        cover_url: String,
        duration_ms: u64,
        /// Where playback should resume, in milliseconds.
        last_position_ms: u64,
        width: u32,
        height: u32,
    },
}

impl Media {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image { .. } => MediaKind::Image,
            Self::Video { .. } => MediaKind::Video,
        }
    }
}

/// A single feed entry.
///
/// ## Sorting
///
/// `FeedItem` implements [`Ord`] for **reverse-chronological** ordering:
/// newer items sort first.  Items created in the same instant fall back to
/// the higher id first, which matches insertion order in every store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: ItemId,
    pub title: String,
    pub body: String,
    /// Sole sort key.  Stores stamp this on insert.
    pub created_at: DateTime<Utc>,
    pub favorite: bool,
    pub layout: LayoutMode,
    pub media: Media,
}

impl FeedItem {
    /// A new, not yet inserted image post.
    pub fn image(
        title: impl Into<String>,
        body: impl Into<String>,
        url: impl Into<String>,
        width: u32,
        height: u32,
        layout: LayoutMode,
    ) -> Self {
        Self {
            id: ItemId::UNASSIGNED,
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
            favorite: false,
            layout,
            media: Media::Image {
                url: url.into(),
                width,
                height,
            },
        }
    }

    /// A new, not yet inserted video post that starts from the beginning.
    #[allow(clippy::too_many_arguments)]
    pub fn video(
        title: impl Into<String>,
        body: impl Into<String>,
        url: impl Into<String>,
        cover_url: impl Into<String>,
        width: u32,
        height: u32,
        duration_ms: u64,
        layout: LayoutMode,
    ) -> Self {
        Self {
            id: ItemId::UNASSIGNED,
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
            favorite: false,
            layout,
            media: Media::Video {
                url: url.into(),
                cover_url: cover_url.into(),
                duration_ms,
                last_position_ms: 0,
                width,
                height,
            },
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.media.kind()
    }

    pub fn is_video(&self) -> bool {
        self.kind() == MediaKind::Video
    }

    pub fn video_url(&self) -> Option<&str> {
        match &self.media {
            Media::Video { url, .. } => Some(url),
            Media::Image { .. } => None,
        }
    }

    /// Stored resume position; always 0 for images.
    pub fn last_position_ms(&self) -> u64 {
        match self.media {
            Media::Video {
                last_position_ms, ..
            } => last_position_ms,
            Media::Image { .. } => 0,
        }
    }

    /// Returns `false` (and changes nothing) for image items.
    pub fn set_last_position_ms(&mut self, position_ms: u64) -> bool {
        match &mut self.media {
            Media::Video {
                last_position_ms, ..
            } => {
                *last_position_ms = position_ms;
                true
            }
            Media::Image { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Ordering - reverse chronological (newest first)
// ---------------------------------------------------------------------------

impl Ord for FeedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for FeedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
