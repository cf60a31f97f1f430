use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use common::models::spotify::track::FullTrack;
use common::words;

use crate::gate::{ContentGate, Rejection, Verdict};
use crate::services::Catalog;

/// Number of results requested from each search.
const SEARCH_LIMIT: u32 = 25;

/// Separators which split a request into a song and an artist.
const SEPARATORS: [&str; 2] = [" by ", " from "];

/// Candidates whose title or primary artist contains any of these are
/// covers, karaoke versions and the like.
const BANNED: [&str; 5] = ["karaoke", "tribute", "made popular", "backing", "instrumental"];

const EXACT_BONUS: u32 = 100;
const PARTIAL_BONUS: u32 = 50;
const SHARED_WORD_BONUS: u32 = 10;

/// A playable track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
}

impl Track {
    pub fn from_full(track: &FullTrack) -> Self {
        Self {
            uri: track.uri.clone(),
            name: track.name.clone(),
            artists: track.artists.iter().map(|a| a.name.clone()).collect(),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.artists.is_empty() {
            return write!(f, "\"{}\"", self.name);
        }

        write!(f, "\"{}\" by {}", self.name, self.artists.join(", "))
    }
}

/// How a request resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The request resolved to the given track.
    Track(Track),
    /// The request or the track it resolved to was blocked.
    Rejected(Rejection),
    /// The catalog has nothing matching the request.
    NotFound,
}

/// Turns free text requests into catalog tracks.
pub struct TrackResolver {
    catalog: Arc<dyn Catalog>,
    gate: ContentGate,
}

impl TrackResolver {
    pub fn new(catalog: Arc<dyn Catalog>, gate: ContentGate) -> Self {
        Self { catalog, gate }
    }

    /// Resolve the given request.
    ///
    /// Errors if the catalog could not be searched.
    pub async fn resolve(&self, text: &str) -> Result<Resolution> {
        if let Verdict::Rejected(rejection) = self.gate.screen(text).await {
            return Ok(Resolution::Rejected(rejection));
        }

        let request = Request::parse(text);
        let plain = request.plain_query();
        let scoped = request.scoped_query();

        let (a, b) = tokio::join!(
            self.catalog.search_tracks(&plain, SEARCH_LIMIT),
            self.catalog.search_tracks(&scoped, SEARCH_LIMIT),
        );

        let (a, b) = match (a, b) {
            (Ok(a), Ok(b)) => (a, b),
            (Ok(a), Err(e)) => {
                common::log_warn!(e, "Search {:?} failed", scoped);
                (a, Vec::new())
            }
            (Err(e), Ok(b)) => {
                common::log_warn!(e, "Search {:?} failed", plain);
                (Vec::new(), b)
            }
            (Err(e), Err(_)) => {
                return Err(e.context(format!("Failed to search for {:?}", text)));
            }
        };

        let candidates = merge(a, b);

        let Some(best) = request.pick(&candidates) else {
            tracing::info!("Nothing found for {:?}", text);
            return Ok(Resolution::NotFound);
        };

        let track = Track::from_full(best);

        if let Verdict::Rejected(rejection) = self.gate.screen(&track.to_string()).await {
            return Ok(Resolution::Rejected(rejection));
        }

        tracing::trace!("Resolved {:?} to {}", text, track);
        Ok(Resolution::Track(track))
    }
}

/// Concatenate two result lists, dropping later duplicates.
fn merge(a: Vec<FullTrack>, b: Vec<FullTrack>) -> Vec<FullTrack> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(a.len() + b.len());

    for track in a.into_iter().chain(b) {
        let id = track.id.clone().unwrap_or_else(|| track.uri.clone());

        if seen.insert(id) {
            out.push(track);
        }
    }

    out
}

/// A request split into its song and artist parts.
#[derive(Debug, PartialEq, Eq)]
struct Request<'a> {
    song: &'a str,
    artist: Option<&'a str>,
}

impl<'a> Request<'a> {
    fn parse(text: &'a str) -> Self {
        let text = text.trim();
        // ASCII lowercasing keeps byte offsets intact.
        let lower = text.to_ascii_lowercase();

        let split = SEPARATORS
            .iter()
            .filter_map(|sep| Some((lower.find(sep)?, sep.len())))
            .min_by_key(|(at, _)| *at);

        if let Some((at, len)) = split {
            let song = text[..at].trim();
            let artist = text[at + len..].trim();

            if !song.is_empty() && !artist.is_empty() {
                return Self {
                    song,
                    artist: Some(artist),
                };
            }
        }

        Self {
            song: text,
            artist: None,
        }
    }

    fn plain_query(&self) -> String {
        match self.artist {
            Some(artist) => format!("{} {}", self.song, artist),
            None => self.song.to_owned(),
        }
    }

    fn scoped_query(&self) -> String {
        let song = self.song.replace('"', "");

        match self.artist {
            Some(artist) => format!("track:\"{}\" artist:\"{}\"", song, artist.replace('"', "")),
            None => format!("track:\"{}\"", song),
        }
    }

    /// Pick the best candidate.
    ///
    /// Banned candidates are skipped and the highest score wins, earlier
    /// candidates winning ties. If every candidate is banned, the first one
    /// is used.
    fn pick<'t>(&self, candidates: &'t [FullTrack]) -> Option<&'t FullTrack> {
        let song = words::normalize(self.song);
        let song_words = words::word_set(self.song);
        let artist = self.artist.map(words::normalize);

        let mut best = None::<(u32, &FullTrack)>;

        for track in candidates.iter().filter(|t| !is_banned(t)) {
            let score = score(track, &song, &song_words, artist.as_deref());

            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, track));
            }
        }

        best.map(|(_, track)| track).or_else(|| candidates.first())
    }
}

fn is_banned(track: &FullTrack) -> bool {
    let name = track.name.to_lowercase();
    let artist = track.primary_artist().unwrap_or_default().to_lowercase();
    BANNED.iter().any(|b| name.contains(b) || artist.contains(b))
}

fn score(
    track: &FullTrack,
    song: &str,
    song_words: &BTreeSet<String>,
    artist: Option<&str>,
) -> u32 {
    let name = words::normalize(&track.name);
    let mut score = 0;

    if name == song {
        score += EXACT_BONUS;
    } else if partially_matches(&name, song) {
        score += PARTIAL_BONUS;
    }

    if let Some(artist) = artist {
        let artists = track
            .artists
            .iter()
            .map(|a| words::normalize(&a.name))
            .collect::<Vec<_>>();

        if artists.iter().any(|a| a == artist) {
            score += EXACT_BONUS;
        } else if artists.iter().any(|a| partially_matches(a, artist)) {
            score += PARTIAL_BONUS;
        }
    }

    let shared = words::word_set(&track.name).intersection(song_words).count();
    score + SHARED_WORD_BONUS * shared as u32
}

fn partially_matches(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}
