//! YouTube playlists.

mod client;
mod model;

pub use client::{YouTubeClient, YOUTUBE_API_BASE};
pub use model::{PlaylistVideo, PrivacyStatus, EMBED_URL_BASE};
