// Share links, `?site=` deep links, and the share fallback chain
// (native share sheet -> clipboard -> manual copy prompt).

use serde::{Deserialize, Serialize};

use crate::types::Record;

pub const SITE_PARAM: &str = "site";

/// `<origin><path>?site=<id>`, with the id percent-encoded.
pub fn share_url(base_url: &str, id: &str) -> String {
    let base = base_url.split(['?', '#']).next().unwrap_or(base_url);
    format!("{base}?{SITE_PARAM}={}", urlencoding::encode(id))
}

/// The `site` value from a query string (with or without the leading `?`).
pub fn deep_link_site(query: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == SITE_PARAM)
        .and_then(|(_, value)| {
            let value = value.replace('+', " ");
            urlencoding::decode(&value).ok().map(|v| v.into_owned())
        })
        .filter(|v| !v.is_empty())
}

const SHARE_TITLE_SUFFIX: &str = " - Kala Ghoda Heritage Map";
const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/?api=1";

/// What the native share sheet receives. The clipboard and manual prompt
/// fallbacks only ever get `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl SharePayload {
    pub fn for_record(record: &Record, base_url: &str) -> Self {
        SharePayload {
            title: format!("{}{SHARE_TITLE_SUFFIX}", record.title),
            text: record.description.clone(),
            url: share_url(base_url, record.id.as_str()),
        }
    }
}

/// Walking directions to a site in Google Maps (`lat,lng` destination).
pub fn directions_url(record: &Record) -> String {
    format!(
        "{DIRECTIONS_BASE}&destination={},{}&travelmode=walking",
        record.center.lat, record.center.lng
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareStep {
    NativeShare,
    Clipboard,
    ManualPrompt,
}

/// How a share step ended, as reported by JS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareOutcome {
    Done,
    /// The user dismissed the share sheet (`AbortError`). Not an error.
    Cancelled,
    Unavailable,
    Failed,
}

/// First step to try.
pub fn first_share_step(native_share_available: bool) -> ShareStep {
    if native_share_available {
        ShareStep::NativeShare
    } else {
        ShareStep::Clipboard
    }
}

/// Next step after `step` ended with `outcome`, or `None` when finished.
pub fn next_share_step(step: ShareStep, outcome: ShareOutcome) -> Option<ShareStep> {
    match outcome {
        ShareOutcome::Done | ShareOutcome::Cancelled => None,
        ShareOutcome::Unavailable | ShareOutcome::Failed => match step {
            ShareStep::NativeShare => Some(ShareStep::Clipboard),
            ShareStep::Clipboard => Some(ShareStep::ManualPrompt),
            ShareStep::ManualPrompt => None,
        },
    }
}
