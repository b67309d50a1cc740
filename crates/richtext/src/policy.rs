use lazy_static::lazy_static;
use regex::Regex;

/// Tags that survive sanitization. Everything else is unwrapped.
pub const ALLOWED_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "p", "br", "ul", "ol", "li", "a", "div", "span",
];

/// Attributes kept on `<a>`. No other allowed tag keeps any attribute.
pub const ANCHOR_ATTRIBUTES: &[&str] = &["href", "target", "rel"];

pub const FORCED_TARGET: &str = "_blank";
pub const FORCED_REL: &str = "noopener noreferrer";

/// Schemes an absolute `href` may use.
pub const LINK_SCHEMES: &[&str] = &["http", "https"];

lazy_static! {
    static ref SAFE_HREF: Regex =
        Regex::new(r"(?i)^(https?:)?//").expect("Invalid SAFE_HREF regex pattern");
}

pub fn is_allowed_tag(tag: &str) -> bool {
    ALLOWED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// The attribute allow-list for `tag`, empty unless the tag is an anchor.
pub fn allowed_attributes(tag: &str) -> &'static [&'static str] {
    if tag.eq_ignore_ascii_case("a") {
        ANCHOR_ATTRIBUTES
    } else {
        &[]
    }
}

pub fn is_allowed_attribute(tag: &str, attribute: &str) -> bool {
    is_allowed_tag(tag)
        && allowed_attributes(tag)
            .iter()
            .any(|a| a.eq_ignore_ascii_case(attribute))
}

/// An `href` is acceptable when, trimmed, it is an absolute http(s) URL or a
/// protocol-relative `//host` URL.
pub fn is_acceptable_href(value: &str) -> bool {
    SAFE_HREF.is_match(value.trim())
}
