mod links;
pub mod policy;
pub mod sanitize;

pub use sanitize::{sanitize, sanitize_html, RichTextSanitizer, SafeHtml};
