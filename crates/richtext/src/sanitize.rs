use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use ammonia::{Builder, UrlRelative};
use lazy_static::lazy_static;
use serde::Serialize;

use crate::links;
use crate::policy::{self, FORCED_REL, FORCED_TARGET};

/// Upper bound on re-sanitizing the output until it reproduces itself.
const MAX_SETTLE_PASSES: usize = 4;

lazy_static! {
    static ref SHARED: RichTextSanitizer = RichTextSanitizer::new();
}

/// Sanitize rich text with the shared sanitizer. `None` and `""` yield `""`.
pub fn sanitize(html: Option<&str>) -> String {
    SHARED.sanitize(html)
}

pub fn sanitize_html(html: &str) -> String {
    SHARED.sanitize(Some(html))
}

/// HTML that has been through [`RichTextSanitizer`] and is safe to inject
/// into a display surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeHtml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SafeHtml> for String {
    fn from(html: SafeHtml) -> Self {
        html.0
    }
}

/// Allow-list sanitizer for administrator-authored descriptions.
///
/// Disallowed elements are unwrapped rather than deleted, so their text and
/// any allowed descendants move up to the nearest surviving ancestor. The
/// contents of `<script>` and `<style>` are kept as escaped text. Every
/// surviving anchor gets `target="_blank"` and `rel="noopener noreferrer"`,
/// and loses its `href` unless it points at an http(s) or protocol-relative
/// URL.
pub struct RichTextSanitizer {
    cleaner: Builder<'static>,
}

impl RichTextSanitizer {
    pub fn new() -> Self {
        Self {
            cleaner: create_policy_sanitizer(),
        }
    }

    pub fn sanitize(&self, html: Option<&str>) -> String {
        match html {
            Some(html) if !html.is_empty() => self.clean(html).into_string(),
            _ => String::new(),
        }
    }

    /// Sanitize `html` and settle the result.
    ///
    /// Serializing a filtered tree can produce markup the parser rebuilds
    /// differently (anchors left nested once their table wrappers are gone,
    /// attribute order after an `href` is dropped). The output is fed back
    /// until it reproduces itself, so sanitizing it again is a no-op. Each
    /// of those rebuilds only removes nesting or reorders attributes, so one
    /// or two extra passes settle every input seen so far; if the bound is
    /// ever reached the last pass is returned and a warning is logged.
    pub fn clean(&self, html: &str) -> SafeHtml {
        let mut current = self.clean_once(html);
        for pass in 1..MAX_SETTLE_PASSES {
            let next = self.clean_once(&current);
            if next == current {
                return SafeHtml(current);
            }
            log::trace!("settle pass {} rewrote {} bytes", pass, current.len());
            current = next;
        }
        log::warn!(
            "sanitized output did not settle after {} passes; sanitizing it again may change it",
            MAX_SETTLE_PASSES
        );
        SafeHtml(current)
    }

    fn clean_once(&self, html: &str) -> String {
        if let Some(shielded) = links::shield_hrefs(html) {
            let cleaned = self.cleaner.clean(&shielded).to_string();
            if !cleaned.contains(links::SHIELD_PREFIX) {
                return cleaned;
            }
            log::debug!("shielded href leaked into the output, cleaning the original markup");
        }
        self.cleaner.clean(html).to_string()
    }
}

impl Default for RichTextSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RichTextSanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichTextSanitizer")
            .field("tags", &policy::ALLOWED_TAGS)
            .finish()
    }
}

fn create_policy_sanitizer() -> Builder<'static> {
    let tags: HashSet<&'static str> = policy::ALLOWED_TAGS.iter().copied().collect();

    // `rel` is written by link_rel, which refuses to run when `rel` is also
    // an allowed attribute. `target` stays listed so set_tag_attribute_value
    // overwrites it in place.
    let anchor: HashSet<&'static str> = policy::ANCHOR_ATTRIBUTES
        .iter()
        .copied()
        .filter(|attr| *attr != "rel")
        .collect();
    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", anchor);

    let mut cleaner = Builder::empty();
    cleaner
        .tags(tags)
        .clean_content_tags(HashSet::new())
        .generic_attributes(HashSet::new())
        .tag_attributes(tag_attributes)
        .allowed_classes(HashMap::new())
        .url_schemes(policy::LINK_SCHEMES.iter().copied().collect())
        .url_relative(UrlRelative::PassThrough)
        .attribute_filter(filter_anchor_href)
        .link_rel(Some(FORCED_REL))
        .set_tag_attribute_value("a", "target", FORCED_TARGET)
        .strip_comments(true)
        .id_prefix(None);
    cleaner
}

/// Relative hrefs get past ammonia's URL check; this applies the link
/// safety predicate to whatever is left, after undoing any shielding.
fn filter_anchor_href<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    if element != "a" || attribute != "href" {
        return Some(Cow::Borrowed(value));
    }
    let href = match value.strip_prefix(links::SHIELD_PREFIX) {
        Some(encoded) => Cow::Owned(links::decode_shielded(encoded)?),
        None => Cow::Borrowed(value),
    };
    if !policy::is_acceptable_href(&href) {
        log::debug!("dropping anchor href {:?}", href);
        return None;
    }
    Some(href)
}
