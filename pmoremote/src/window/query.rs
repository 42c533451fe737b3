//! Query sources feeding a [`TrackWindow`](super::TrackWindow).
//!
//! A source is a stateless strategy that knows how to count and page one
//! kind of remote list. Both operations may answer `Ok(None)` when the
//! source cannot build a query at all, which is distinct from an empty
//! result.
//!
//! A [`Page`] keeps one slot per requested row: a row the server sent but
//! that could not be decoded is `None`, so its neighbours stay at their
//! index.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{RemoteError, Result};
use crate::model::Track;
use crate::protocol::SocketMessage;
use crate::protocol::names::{key, request};
use crate::transport::Transport;

pub type Page<T> = Vec<Option<T>>;

#[async_trait]
pub trait QuerySource<T>: Debug + Send + Sync {
    async fn count(&self, transport: &dyn Transport, filter: &str) -> Result<Option<usize>>;

    async fn page(
        &self,
        transport: &dyn Transport,
        offset: usize,
        limit: usize,
        filter: &str,
    ) -> Result<Option<Page<T>>>;

    /// Offline-capable sources are usable without a connected transport.
    fn is_offline_capable(&self) -> bool {
        false
    }
}

async fn request_count(transport: &dyn Transport, message: SocketMessage) -> Result<usize> {
    let message = message.with_option(key::COUNT_ONLY, true);
    let response = transport.request(message).await?;
    response
        .usize_option(key::COUNT)
        .ok_or_else(|| RemoteError::missing_option(key::COUNT))
}

async fn request_page(
    transport: &dyn Transport,
    message: SocketMessage,
    offset: usize,
    limit: usize,
) -> Result<Page<Track>> {
    let message = message
        .with_option(key::OFFSET, offset)
        .with_option(key::LIMIT, limit);
    let response = transport.request(message).await?;
    parse_tracks(&response)
}

fn parse_tracks(response: &SocketMessage) -> Result<Page<Track>> {
    let rows = response
        .array_option(key::DATA)
        .ok_or_else(|| RemoteError::missing_option(key::DATA))?;
    Ok(rows.iter().enumerate().map(|(row, value)| decode_row(row, value)).collect())
}

fn decode_row(row: usize, value: &Value) -> Option<Track> {
    match Track::from_value(value) {
        Ok(track) => Some(track),
        Err(err) => {
            warn!(row, "Skipping undecodable track row: {err}");
            None
        }
    }
}

/// Every track of the library, optionally filtered server-side.
#[derive(Debug, Clone, Default)]
pub struct AllTracksQuery;

#[async_trait]
impl QuerySource<Track> for AllTracksQuery {
    async fn count(&self, transport: &dyn Transport, filter: &str) -> Result<Option<usize>> {
        let message = SocketMessage::request(request::QUERY_TRACKS).with_option(key::FILTER, filter);
        request_count(transport, message).await.map(Some)
    }

    async fn page(
        &self,
        transport: &dyn Transport,
        offset: usize,
        limit: usize,
        filter: &str,
    ) -> Result<Option<Page<Track>>> {
        let message = SocketMessage::request(request::QUERY_TRACKS).with_option(key::FILTER, filter);
        request_page(transport, message, offset, limit).await.map(Some)
    }
}

/// Tracks belonging to an album, artist, genre or playlist.
#[derive(Debug, Clone)]
pub struct CategoryTracksQuery {
    pub category: String,
    pub id: i64,
}

impl CategoryTracksQuery {
    pub fn new(category: impl Into<String>, id: i64) -> Self {
        Self {
            category: category.into(),
            id,
        }
    }

    fn is_valid(&self) -> bool {
        !self.category.is_empty() && self.id >= 0
    }

    fn message(&self, filter: &str) -> SocketMessage {
        SocketMessage::request(request::QUERY_TRACKS_BY_CATEGORY)
            .with_option(key::CATEGORY, self.category.as_str())
            .with_option(key::ID, self.id)
            .with_option(key::FILTER, filter)
    }
}

#[async_trait]
impl QuerySource<Track> for CategoryTracksQuery {
    async fn count(&self, transport: &dyn Transport, filter: &str) -> Result<Option<usize>> {
        if !self.is_valid() {
            debug!(category = %self.category, id = self.id, "No category query available");
            return Ok(None);
        }
        request_count(transport, self.message(filter)).await.map(Some)
    }

    async fn page(
        &self,
        transport: &dyn Transport,
        offset: usize,
        limit: usize,
        filter: &str,
    ) -> Result<Option<Page<Track>>> {
        if !self.is_valid() {
            return Ok(None);
        }
        request_page(transport, self.message(filter), offset, limit)
            .await
            .map(Some)
    }
}

/// The server's current play queue. Not filterable.
#[derive(Debug, Clone, Default)]
pub struct PlayQueueTracksQuery;

#[async_trait]
impl QuerySource<Track> for PlayQueueTracksQuery {
    async fn count(&self, transport: &dyn Transport, _filter: &str) -> Result<Option<usize>> {
        let message = SocketMessage::request(request::QUERY_PLAY_QUEUE_TRACKS);
        request_count(transport, message).await.map(Some)
    }

    async fn page(
        &self,
        transport: &dyn Transport,
        offset: usize,
        limit: usize,
        _filter: &str,
    ) -> Result<Option<Page<Track>>> {
        let message = SocketMessage::request(request::QUERY_PLAY_QUEUE_TRACKS);
        request_page(transport, message, offset, limit)
            .await
            .map(Some)
    }
}

/// A locally known list of external ids resolved page by page.
#[derive(Debug, Clone, Default)]
pub struct PlaylistTracksQuery {
    pub external_ids: Vec<String>,
}

impl PlaylistTracksQuery {
    pub fn new(external_ids: Vec<String>) -> Self {
        Self { external_ids }
    }
}

#[async_trait]
impl QuerySource<Track> for PlaylistTracksQuery {
    async fn count(&self, _transport: &dyn Transport, _filter: &str) -> Result<Option<usize>> {
        Ok(Some(self.external_ids.len()))
    }

    async fn page(
        &self,
        transport: &dyn Transport,
        offset: usize,
        limit: usize,
        _filter: &str,
    ) -> Result<Option<Page<Track>>> {
        let end = offset.saturating_add(limit).min(self.external_ids.len());
        if offset >= end {
            return Ok(Some(Vec::new()));
        }
        let ids = &self.external_ids[offset..end];

        let message = SocketMessage::request(request::QUERY_TRACKS_BY_EXTERNAL_IDS)
            .with_option(key::EXTERNAL_IDS, ids.to_vec());
        let response = transport.request(message).await?;

        let mut resolved: HashMap<String, Track> = HashMap::new();
        match response.option(key::DATA) {
            Some(Value::Object(by_id)) => {
                for (row, (external_id, value)) in by_id.iter().enumerate() {
                    if let Some(track) = decode_row(row, value) {
                        resolved.insert(external_id.clone(), track);
                    }
                }
            }
            Some(Value::Array(rows)) => {
                for (row, value) in rows.iter().enumerate() {
                    if let Some(track) = decode_row(row, value) {
                        resolved.insert(track.external_id.clone(), track);
                    }
                }
            }
            _ => return Err(RemoteError::missing_option(key::DATA)),
        }

        // unresolved ids become placeholders carrying only the external id
        let tracks = ids
            .iter()
            .map(|external_id| {
                Some(resolved.remove(external_id).unwrap_or_else(|| {
                    warn!(%external_id, "Playlist entry not found on server");
                    Track {
                        external_id: external_id.clone(),
                        ..Track::default()
                    }
                }))
            })
            .collect();

        Ok(Some(tracks))
    }
}

/// Tracks already held locally, filtered in memory.
#[derive(Debug, Clone, Default)]
pub struct OfflineTracksQuery {
    tracks: Vec<Track>,
}

impl OfflineTracksQuery {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    fn filtered<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a Track> + 'a {
        self.tracks.iter().filter(move |track| track.matches(filter))
    }
}

#[async_trait]
impl QuerySource<Track> for OfflineTracksQuery {
    async fn count(&self, _transport: &dyn Transport, filter: &str) -> Result<Option<usize>> {
        Ok(Some(self.filtered(filter).count()))
    }

    async fn page(
        &self,
        _transport: &dyn Transport,
        offset: usize,
        limit: usize,
        filter: &str,
    ) -> Result<Option<Page<Track>>> {
        Ok(Some(
            self.filtered(filter)
                .skip(offset)
                .take(limit)
                .cloned()
                .map(Some)
                .collect(),
        ))
    }

    fn is_offline_capable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ConnectionState, LoopbackTransport};
    use serde_json::json;

    fn library() -> LoopbackTransport {
        let transport = LoopbackTransport::new();
        transport.set_state(ConnectionState::Connected);
        transport.set_responder(|m| {
            let reply = m.response_to();
            if m.bool_option(key::COUNT_ONLY) == Some(true) {
                return Some(reply.with_option(key::COUNT, 120));
            }
            let offset = m.i64_option(key::OFFSET)?;
            let limit = m.i64_option(key::LIMIT)?;
            let rows: Vec<Value> = (offset..(offset + limit).min(120))
                .map(|id| json!({ "id": id, "title": format!("Track {id}") }))
                .collect();
            Some(reply.with_option(key::DATA, rows))
        });
        transport
    }

    #[tokio::test]
    async fn test_all_tracks_count_and_page() {
        let transport = library();
        let query = AllTracksQuery;

        assert_eq!(query.count(&transport, "jazz").await, Ok(Some(120)));
        let sent = transport.sent_named(request::QUERY_TRACKS);
        assert_eq!(sent[0].string_option(key::FILTER), Some("jazz"));

        let page = query.page(&transport, 100, 75, "").await.unwrap().unwrap();
        assert_eq!(page.len(), 20);
        assert_eq!(page[0].as_ref().map(|t| t.id), Some(100));
        assert!(!query.is_offline_capable());
    }

    #[tokio::test]
    async fn test_invalid_category_has_no_query() {
        let transport = library();

        let empty = CategoryTracksQuery::new("", 4);
        assert_eq!(empty.count(&transport, "").await, Ok(None));

        let unset = CategoryTracksQuery::new("album", -1);
        assert_eq!(unset.page(&transport, 0, 10, "").await, Ok(None));
        assert!(transport.sent().is_empty());

        let album = CategoryTracksQuery::new("album", 4);
        assert_eq!(album.count(&transport, "").await, Ok(Some(120)));
        let sent = transport.sent_named(request::QUERY_TRACKS_BY_CATEGORY);
        assert_eq!(sent[0].string_option(key::CATEGORY), Some("album"));
        assert_eq!(sent[0].i64_option(key::ID), Some(4));
    }

    #[tokio::test]
    async fn test_count_fails_when_disconnected() {
        let transport = LoopbackTransport::new();
        assert_eq!(
            PlayQueueTracksQuery.count(&transport, "").await,
            Err(RemoteError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_playlist_keeps_id_order() {
        let transport = LoopbackTransport::new();
        transport.set_state(ConnectionState::Connected);
        transport.set_responder(|m| {
            Some(m.response_to().with_option(
                key::DATA,
                json!({
                    "c": { "id": 3, "external_id": "c" },
                    "a": { "id": 1, "external_id": "a" }
                }),
            ))
        });

        let query = PlaylistTracksQuery::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(query.count(&transport, "").await, Ok(Some(3)));

        let page = query.page(&transport, 0, 75, "").await.unwrap().unwrap();
        let page: Vec<Track> = page.into_iter().flatten().collect();
        let ids: Vec<&str> = page.iter().map(|t| t.external_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(page[0].id, 1);
        assert_eq!(page[1].id, 0);

        let beyond = query.page(&transport, 5, 75, "").await.unwrap().unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_row_keeps_neighbours_in_place() {
        let transport = LoopbackTransport::new();
        transport.set_state(ConnectionState::Connected);
        transport.set_responder(|m| {
            Some(m.response_to().with_option(
                key::DATA,
                json!([
                    { "id": 10, "title": "Blue in Green" },
                    { "title": "No id" },
                    { "id": 12, "title": "All Blues" }
                ]),
            ))
        });

        let page = AllTracksQuery.page(&transport, 10, 3, "").await.unwrap().unwrap();
        let ids: Vec<Option<i64>> = page.iter().map(|t| t.as_ref().map(|t| t.id)).collect();
        assert_eq!(ids, vec![Some(10), None, Some(12)]);
    }

    #[tokio::test]
    async fn test_playlist_skips_undecodable_entry() {
        let transport = LoopbackTransport::new();
        transport.set_state(ConnectionState::Connected);
        transport.set_responder(|m| {
            Some(m.response_to().with_option(
                key::DATA,
                json!({
                    "a": { "id": 1, "external_id": "a" },
                    "b": { "id": "oops", "external_id": "b" }
                }),
            ))
        });

        let query = PlaylistTracksQuery::new(vec!["a".into(), "b".into()]);
        let page = query.page(&transport, 0, 75, "").await.unwrap().unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].as_ref().map(|t| t.id), Some(1));
        let missing = page[1].as_ref().unwrap();
        assert_eq!(missing.id, 0);
        assert_eq!(missing.external_id, "b");
    }

    #[tokio::test]
    async fn test_offline_query_filters_locally() {
        let transport = LoopbackTransport::new();
        let tracks = vec![
            Track { id: 1, title: "So What".into(), artist: "Miles Davis".into(), ..Track::default() },
            Track { id: 2, title: "Naima".into(), artist: "John Coltrane".into(), ..Track::default() },
            Track { id: 3, title: "Freddie Freeloader".into(), artist: "Miles Davis".into(), ..Track::default() },
        ];
        let query = OfflineTracksQuery::new(tracks);

        assert!(query.is_offline_capable());
        assert_eq!(query.count(&transport, "miles").await, Ok(Some(2)));

        let page = query.page(&transport, 1, 10, "miles").await.unwrap().unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].as_ref().map(|t| t.id), Some(3));
    }
}
