//! Allow-list policies for the HTML sanitizer.
//!
//! A [`SanitizePolicy`] names the elements that may survive sanitisation and, per element,
//! the attributes they may keep. One policy exists per [`ContentClass`]; callers pick the
//! policy explicitly instead of sharing a global list.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Elements whose text content the sanitizer drops together with the element.
/// They can never be allowed.
const FORBIDDEN_TAGS: [&str; 2] = ["script", "style"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("element <{0}> cannot be allowed")]
    ForbiddenTag(String),
    #[error("attribute '{attr}' on <{tag}> cannot be allowed")]
    ForbiddenAttribute { tag: String, attr: String },
    #[error("attributes listed for <{0}>, which is not an allowed element")]
    OrphanAttributes(String),
    #[error("element and attribute names must be non-empty lowercase ASCII: '{0}'")]
    InvalidName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    Post,
    Comment,
    /// Short text dropped into templates: summaries, bios, descriptions.
    Inline,
}

impl ContentClass {
    pub const ALL: [ContentClass; 3] = [ContentClass::Post, ContentClass::Comment, ContentClass::Inline];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentClass::Post => "post",
            ContentClass::Comment => "comment",
            ContentClass::Inline => "inline",
        }
    }
}

impl fmt::Display for ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(ContentClass::Post),
            "comment" => Ok(ContentClass::Comment),
            "inline" => Ok(ContentClass::Inline),
            other => Err(format!("unknown content class '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawPolicy {
    tags: Vec<String>,
    #[serde(default)]
    attributes: BTreeMap<String, Vec<String>>,
}

/// Permitted element names and per-element attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy")]
pub struct SanitizePolicy {
    tags: BTreeSet<String>,
    attributes: BTreeMap<String, BTreeSet<String>>,
}

impl TryFrom<RawPolicy> for SanitizePolicy {
    type Error = PolicyError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        SanitizePolicy::new(raw.tags, raw.attributes)
    }
}

impl SanitizePolicy {
    pub fn new<T, A, S>(tags: T, attributes: A) -> Result<Self, PolicyError>
    where
        T: IntoIterator<Item = S>,
        A: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        for tag in &tags {
            check_name(tag)?;
            if FORBIDDEN_TAGS.contains(&tag.as_str()) {
                return Err(PolicyError::ForbiddenTag(tag.clone()));
            }
        }

        let mut attrs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (tag, names) in attributes {
            let tag = tag.into();
            if !tags.contains(&tag) {
                return Err(PolicyError::OrphanAttributes(tag));
            }
            let entry = attrs.entry(tag.clone()).or_default();
            for attr in names {
                let attr = attr.into();
                check_name(&attr)?;
                // Event handlers and inline CSS are never safe to pass through.
                if attr.starts_with("on") || attr == "style" {
                    return Err(PolicyError::ForbiddenAttribute { tag, attr });
                }
                entry.insert(attr);
            }
        }

        Ok(Self { tags, attributes: attrs })
    }

    /// Full post bodies: headings, lists, quotes, code, links and images.
    pub fn post() -> Self {
        Self::builtin(
            &[
                "p", "br", "strong", "em", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol",
                "li", "blockquote", "code", "pre", "a", "img",
            ],
            &[("a", &["href", "title"][..]), ("img", &["src", "alt", "title"][..])],
        )
    }

    /// Reader comments: no headings, lists or images.
    pub fn comment() -> Self {
        Self::builtin(
            &["p", "br", "strong", "em", "u", "code", "pre", "a"],
            &[("a", &["href", "title"][..])],
        )
    }

    pub fn inline() -> Self {
        Self::builtin(
            &["p", "br", "strong", "em", "u", "code", "a"],
            &[("a", &["href", "title"][..])],
        )
    }

    pub fn for_class(class: ContentClass) -> Self {
        match class {
            ContentClass::Post => Self::post(),
            ContentClass::Comment => Self::comment(),
            ContentClass::Inline => Self::inline(),
        }
    }

    fn builtin(tags: &[&str], attributes: &[(&str, &[&str])]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            attributes: attributes
                .iter()
                .map(|(tag, attrs)| {
                    (tag.to_string(), attrs.iter().map(|a| a.to_string()).collect())
                })
                .collect(),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn attributes_for(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.attributes
            .get(tag)
            .into_iter()
            .flat_map(|attrs| attrs.iter().map(String::as_str))
    }

    pub fn allows_attribute(&self, tag: &str, attr: &str) -> bool {
        self.attributes
            .get(tag)
            .is_some_and(|attrs| attrs.contains(attr))
    }
}

fn check_name(name: &str) -> Result<(), PolicyError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PolicyError::InvalidName(name.to_string()))
    }
}

/// The policy to use for each content class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    post: SanitizePolicy,
    comment: SanitizePolicy,
    inline: SanitizePolicy,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            post: SanitizePolicy::post(),
            comment: SanitizePolicy::comment(),
            inline: SanitizePolicy::inline(),
        }
    }
}

impl PolicySet {
    pub fn get(&self, class: ContentClass) -> &SanitizePolicy {
        match class {
            ContentClass::Post => &self.post,
            ContentClass::Comment => &self.comment,
            ContentClass::Inline => &self.inline,
        }
    }

    pub fn with(mut self, class: ContentClass, policy: SanitizePolicy) -> Self {
        match class {
            ContentClass::Post => self.post = policy,
            ContentClass::Comment => self.comment = policy,
            ContentClass::Inline => self.inline = policy,
        }
        self
    }
}
