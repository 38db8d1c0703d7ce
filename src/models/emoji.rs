//! Custom emoji model.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

/// A custom workspace emoji.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Emoji {
    pub name: String,
    pub url: String,
}

impl Emoji {
    /// Local file name for the downloaded image: the last non-empty URL path
    /// segment, percent-decoded. Falls back to `<name>.png`.
    pub fn filename(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .path_segments()
                    .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                    .map(|segment| percent_decode_str(segment).decode_utf8_lossy().to_string())
            })
            .filter(|segment| is_plain_file_name(segment))
            .unwrap_or_else(|| format!("{}.png", self.name))
    }
}

/// A decoded segment must not escape the emoji directory.
fn is_plain_file_name(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

/// Strip the surrounding colons from an emoji reference (`:wave:` -> `wave`).
pub fn emoji_name(reference: &str) -> &str {
    let name = reference.strip_prefix(':').unwrap_or(reference);
    name.strip_suffix(':').unwrap_or(name)
}
