//! Keeps anchor hrefs that pass the link predicate alive through ammonia.
//!
//! ammonia runs every `href` through `Url::parse` before any attribute filter
//! sees it, and drops values that fail to parse (`https://`, hosts with
//! spaces, unterminated IPv6 literals). Those values still satisfy
//! [`policy::is_acceptable_href`], so they are hex-encoded behind
//! [`SHIELD_PREFIX`] ahead of cleaning, which turns them into fragment-only
//! relative URLs. The attribute filter decodes them and applies the predicate
//! to the decoded value.

use std::cell::{Cell, RefCell};

use ammonia::url::{ParseError, Url};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::policy;

pub const SHIELD_PREFIX: &str = "#richtext-href-";

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Rewrite `html` so that every anchor href ammonia would wrongly reject is
/// shielded. Returns `None` when nothing needs shielding, in which case the
/// original markup should be cleaned as is.
pub fn shield_hrefs(html: &str) -> Option<String> {
    if !mentions_href(html) {
        return None;
    }
    // CDATA and NUL handling depend on tree builder state the tokenizer
    // cannot see.
    if html.contains('\0') || html.contains("<![CDATA[") {
        return None;
    }

    let queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(html));
    let tokenizer = Tokenizer::new(HrefShield::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&queue);
    tokenizer.end();

    let shielded = tokenizer.sink.shielded.get();
    if shielded == 0 {
        return None;
    }
    log::trace!("shielded {} anchor hrefs", shielded);
    Some(tokenizer.sink.out.take())
}

/// Decode the part of a shielded href after [`SHIELD_PREFIX`].
pub fn decode_shielded(encoded: &str) -> Option<String> {
    if encoded.len() % 2 != 0 {
        return None;
    }
    let bytes = encoded
        .as_bytes()
        .chunks(2)
        .map(|pair| Some((hex_value(pair[0])? << 4) | hex_value(pair[1])?))
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

/// An href passes the link predicate but fails ammonia's URL check.
fn needs_shield(href: &str) -> bool {
    policy::is_acceptable_href(href)
        && matches!(Url::parse(href), Err(err) if err != ParseError::RelativeUrlWithoutBase)
}

fn mentions_href(html: &str) -> bool {
    html.as_bytes()
        .windows(4)
        .any(|window| window.eq_ignore_ascii_case(b"href"))
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|value| value as u8)
}

fn push_hex(out: &mut String, value: &str) {
    for byte in value.bytes() {
        out.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
        out.push(HEX_DIGITS[usize::from(byte & 0x0f)] as char);
    }
}

fn push_escaped_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn push_escaped_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Token sink that re-serializes the token stream, shielding hrefs on the
/// way. Comments and doctypes are dropped; the cleaner discards both.
#[derive(Default)]
struct HrefShield {
    out: RefCell<String>,
    verbatim: Cell<bool>,
    shielded: Cell<usize>,
}

impl HrefShield {
    fn write_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let mut out = self.out.borrow_mut();
        if tag.kind == TagKind::EndTag {
            self.verbatim.set(false);
            out.push_str("</");
            out.push_str(&tag.name);
            out.push('>');
            return TokenSinkResult::Continue;
        }

        out.push('<');
        out.push_str(&tag.name);
        for attr in &tag.attrs {
            out.push(' ');
            out.push_str(&attr.name.local);
            out.push_str("=\"");
            if &*tag.name == "a" && &*attr.name.local == "href" && needs_shield(&attr.value) {
                out.push_str(SHIELD_PREFIX);
                push_hex(&mut out, &attr.value);
                self.shielded.set(self.shielded.get() + 1);
            } else {
                push_escaped_attribute(&mut out, &attr.value);
            }
            out.push('"');
        }
        out.push_str(if tag.self_closing { "/>" } else { ">" });

        // Mirror the tokenizer switches the tree builder makes for these
        // elements in HTML content.
        match &*tag.name {
            "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
                self.verbatim.set(true);
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "script" => {
                self.verbatim.set(true);
                TokenSinkResult::RawData(RawKind::ScriptData)
            }
            "plaintext" => {
                self.verbatim.set(true);
                TokenSinkResult::Plaintext
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

impl TokenSink for HrefShield {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => return self.write_tag(tag),
            Token::CharacterTokens(text) => {
                let mut out = self.out.borrow_mut();
                if self.verbatim.get() {
                    out.push_str(&text);
                } else {
                    push_escaped_text(&mut out, &text);
                }
            }
            Token::CommentToken(_)
            | Token::DoctypeToken(_)
            | Token::NullCharacterToken
            | Token::EOFToken
            | Token::ParseError(_) => {}
        }
        TokenSinkResult::Continue
    }
}
