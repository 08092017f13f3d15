//! YouTube transcripts via the caption tracks advertised on the watch page.

use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::ExtractError;

const INVALID_URL: &str = "Invalid YouTube URL format. Please provide a valid YouTube URL.";

static CAPTION_TRACKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""captionTracks"\s*:\s*\["#).ok());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

/// Video id from `youtu.be/<id>`, `youtube.com/watch?v=<id>`,
/// `youtube.com/shorts/<id>` or `youtube.com/embed/<id>`.
pub fn parse_video_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("shorts") | Some("embed") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(candidate)
}

pub async fn fetch_transcript(client: &Client, url: &str) -> Result<String, ExtractError> {
    let video_id =
        parse_video_id(url).ok_or_else(|| ExtractError::InvalidInput(INVALID_URL.to_string()))?;

    let watch_url = format!("https://www.youtube.com/watch?v={}&hl=en", video_id);
    let page = get_text(client, &watch_url).await?;

    let tracks = caption_tracks(&page).ok_or_else(|| {
        ExtractError::NoContent(format!(
            "Failed to extract transcript: no captions available for video {}",
            video_id
        ))
    })?;
    let track = pick_track(&tracks).ok_or_else(|| {
        ExtractError::NoContent(format!(
            "Failed to extract transcript: no captions available for video {}",
            video_id
        ))
    })?;

    let xml = get_text(client, &track.base_url).await?;
    let transcript = parse_transcript_xml(&xml)?;
    if transcript.trim().is_empty() {
        return Err(ExtractError::NoContent(format!(
            "Failed to extract transcript: captions for video {} are empty",
            video_id
        )));
    }
    tracing::info!("Fetched transcript for video {}", video_id);
    Ok(transcript)
}

async fn get_text(client: &Client, url: &str) -> Result<String, ExtractError> {
    let response = client.get(url).send().await.map_err(|e| {
        tracing::error!("Error extracting text from YouTube: {}", e);
        ExtractError::Upstream(format!("Failed to extract transcript: {}", e))
    })?;
    if !response.status().is_success() {
        return Err(ExtractError::Upstream(format!(
            "Failed to extract transcript: YouTube returned {}",
            response.status()
        )));
    }
    response
        .text()
        .await
        .map_err(|e| ExtractError::Upstream(format!("Failed to extract transcript: {}", e)))
}

fn caption_tracks(page: &str) -> Option<Vec<CaptionTrack>> {
    let start = CAPTION_TRACKS.as_ref()?.find(page)?.end() - 1;
    let rest = &page[start..];
    let raw = &rest[..json_array_len(rest)?];
    serde_json::from_str(raw).ok()
}

/// Byte length of the JSON array that opens `raw`, skipping over nested
/// arrays, objects and string literals.
fn json_array_len(raw: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in raw.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Manual English captions first, then generated English, then anything.
fn pick_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let is_english = |t: &&CaptionTrack| t.language_code.starts_with("en");
    let is_generated = |t: &&CaptionTrack| t.kind.as_deref() == Some("asr");
    tracks
        .iter()
        .filter(is_english)
        .find(|t| !is_generated(t))
        .or_else(|| tracks.iter().find(is_english))
        .or_else(|| tracks.first())
}

/// Joins the `<text>` entries of a timed-text document with spaces.
pub fn parse_transcript_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries: Vec<String> = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"text" => {
                in_text = true;
                entries.push(String::new());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"text" => in_text = false,
            Ok(Event::Text(te)) if in_text => {
                let once = te.unescape().unwrap_or_default();
                // caption text is entity-escaped twice (e.g. `&amp;#39;`)
                let twice = quick_xml::escape::unescape(&once)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| once.to_string());
                if let Some(last) = entries.last_mut() {
                    if !last.is_empty() {
                        last.push(' ');
                    }
                    last.push_str(twice.replace('\n', " ").trim());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Upstream(format!(
                    "Failed to extract transcript: invalid caption data ({})",
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries
        .into_iter()
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join(" "))
}
