use richtext::RichTextSanitizer;
use serde_json::Value;

/// Sanitizes the rich-text fields of backend JSON records in place.
///
/// Every object in the document is visited, so nested collections (events
/// inside a training program, for instance) are covered as well.
pub struct RecordSanitizer<'a> {
    sanitizer: &'a RichTextSanitizer,
    fields: &'a [String],
    null_as_empty: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    pub sanitized: usize,
    pub nulls: usize,
    pub skipped: usize,
}

impl<'a> RecordSanitizer<'a> {
    pub fn new(
        sanitizer: &'a RichTextSanitizer,
        fields: &'a [String],
        null_as_empty: bool,
    ) -> Self {
        Self {
            sanitizer,
            fields,
            null_as_empty,
        }
    }

    pub fn sanitize(&self, document: &mut Value) -> RecordStats {
        let mut stats = RecordStats::default();
        // Iterative walk so deeply nested documents cannot exhaust the stack.
        let mut stack = vec![document];
        while let Some(value) = stack.pop() {
            match value {
                Value::Object(map) => {
                    for (key, child) in map.iter_mut() {
                        if self.fields.iter().any(|field| field == key) {
                            self.sanitize_field(key, child, &mut stats);
                        } else {
                            stack.push(child);
                        }
                    }
                }
                Value::Array(items) => stack.extend(items.iter_mut()),
                _ => {}
            }
        }
        stats
    }

    fn sanitize_field(&self, key: &str, value: &mut Value, stats: &mut RecordStats) {
        match value {
            Value::String(html) => {
                *html = self.sanitizer.sanitize(Some(html.as_str()));
                stats.sanitized += 1;
            }
            Value::Null => {
                if self.null_as_empty {
                    *value = Value::String(self.sanitizer.sanitize(None));
                }
                stats.nulls += 1;
            }
            _ => {
                log::warn!(
                    "Field '{}' holds {} rather than a string, leaving it unchanged",
                    key,
                    kind_of(value)
                );
                stats.skipped += 1;
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
