use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest slug accepted from user input.
pub const MAX_SLUG_LEN: usize = 200;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugKind {
    Post,
    Category,
    Tag,
}

impl SlugKind {
    /// Cap on the normalised part of the slug, in characters. Post slugs get the
    /// timestamp suffix on top of this.
    pub fn max_len(self) -> usize {
        match self {
            SlugKind::Post | SlugKind::Category | SlugKind::Tag => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlugKind::Post => "post",
            SlugKind::Category => "category",
            SlugKind::Tag => "tag",
        }
    }
}

impl fmt::Display for SlugKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlugKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(SlugKind::Post),
            "category" => Ok(SlugKind::Category),
            "tag" => Ok(SlugKind::Tag),
            other => Err(format!("unknown slug kind '{}'", other)),
        }
    }
}

/// Which letters survive normalisation besides `a-z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugScript {
    Ascii,
    /// Also keeps CJK unified ideographs U+4E00..=U+9FA5.
    #[default]
    Han,
}

impl SlugScript {
    fn allows(self, c: char) -> bool {
        match self {
            SlugScript::Ascii => c.is_ascii_lowercase(),
            SlugScript::Han => c.is_ascii_lowercase() || ('\u{4e00}'..='\u{9fa5}').contains(&c),
        }
    }
}

pub fn generate_slug(name: &str, kind: SlugKind) -> String {
    generate_slug_at(name, kind, SlugScript::default(), Utc::now())
}

/// Derive a slug for `name` using `now` for the post suffix and the empty-name fallback.
///
/// Characters outside the script, ASCII digits, whitespace and `-` are deleted rather than
/// replaced, so `"don't"` becomes `"dont"`. The result is never empty.
pub fn generate_slug_at(
    name: &str,
    kind: SlugKind,
    script: SlugScript,
    now: DateTime<Utc>,
) -> String {
    let base = normalize(name, script, kind.max_len());
    let timestamp = now.format(TIMESTAMP_FORMAT);

    if base.is_empty() {
        return format!("{}-{}", kind, timestamp);
    }

    match kind {
        SlugKind::Post => format!("{}-{}", base, timestamp),
        SlugKind::Category | SlugKind::Tag => base,
    }
}

fn normalize(name: &str, script: SlugScript, max_len: usize) -> String {
    let mut out = String::with_capacity(name.len());
    let mut len = 0;
    let mut pending_dash = false;

    for c in name.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = len > 0;
            continue;
        }
        if !(script.allows(c) || c.is_ascii_digit()) {
            continue;
        }
        if pending_dash {
            if len + 1 >= max_len {
                break;
            }
            out.push('-');
            len += 1;
            pending_dash = false;
        }
        if len == max_len {
            break;
        }
        out.push(c);
        len += 1;
    }

    out
}

pub fn validate_slug(slug: &str, script: SlugScript) -> bool {
    if slug.is_empty() || slug.chars().count() > MAX_SLUG_LEN {
        return false;
    }
    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return false;
    }
    slug.chars()
        .all(|c| script.allows(c) || c.is_ascii_digit() || c == '-')
}
