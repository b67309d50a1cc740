use anyhow::{Context, Result};
use richtext::RichTextSanitizer;
use serde_json::Value;

use crate::cli::{InputFormat, Invocation};
use crate::config::Config;
use crate::file_manager::FileManager;
use crate::records::RecordSanitizer;

pub struct App {
    pub config: Config,
    sanitizer: RichTextSanitizer,
    file_manager: FileManager,
}

impl App {
    pub fn new(config: Config) -> Self {
        let file_manager = FileManager::new(config.limits.max_input_bytes);
        Self {
            config,
            sanitizer: RichTextSanitizer::new(),
            file_manager,
        }
    }

    /// Read, sanitize and write according to `invocation`.
    pub async fn run(&self, invocation: &Invocation) -> Result<()> {
        let input = self
            .file_manager
            .read_input(invocation.input.as_deref())
            .await?;
        let output = self.render(invocation, &input)?;
        self.file_manager
            .write_output(invocation.output.as_deref(), &output)
            .await
    }

    /// Produce the output text for `input` without touching any I/O.
    pub fn render(&self, invocation: &Invocation, input: &str) -> Result<String> {
        let mut output = match invocation.format {
            InputFormat::Html => self.sanitizer.sanitize(Some(input)),
            InputFormat::Json => self.render_records(invocation, input)?,
        };

        if self.config.output.trailing_newline && !output.ends_with('\n') {
            output.push('\n');
        }
        Ok(output)
    }

    fn render_records(&self, invocation: &Invocation, input: &str) -> Result<String> {
        let mut document: Value =
            serde_json::from_str(input).context("Input is not valid JSON")?;

        let fields = if invocation.fields.is_empty() {
            &self.config.records.fields
        } else {
            &invocation.fields
        };
        let stats = RecordSanitizer::new(&self.sanitizer, fields, self.config.records.null_as_empty)
            .sanitize(&mut document);
        log::info!(
            "Sanitized {} field(s), {} null, {} skipped",
            stats.sanitized,
            stats.nulls,
            stats.skipped
        );
        if stats.sanitized == 0 && stats.nulls == 0 {
            log::warn!("No rich-text fields named {:?} were found", fields);
        }

        let pretty = invocation.pretty.unwrap_or(self.config.output.pretty_json);
        let rendered = if pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        rendered.context("Failed to serialize sanitized records")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn json_invocation() -> Invocation {
        Invocation {
            format: InputFormat::Json,
            ..Invocation::default()
        }
    }

    #[test]
    fn test_render_html_fragment() {
        let app = App::new(Config::default());
        let output = app
            .render(
                &Invocation::default(),
                r#"<div onmouseover="x()"><a href="https://example.com" target="_self">Apply</a></div>"#,
            )
            .unwrap();
        assert_eq!(
            output,
            "<div><a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">Apply</a></div>\n"
        );
    }

    #[test]
    fn test_render_without_trailing_newline() {
        let mut config = Config::default();
        config.output.trailing_newline = false;
        let app = App::new(config);
        let output = app.render(&Invocation::default(), "<b>x</b>").unwrap();
        assert_eq!(output, "<b>x</b>");
    }

    #[test]
    fn test_render_records_uses_config_fields() {
        let app = App::new(Config::default());
        let output = app
            .render(
                &json_invocation(),
                r#"{"description":"<p>Hi<script>x()</script></p>","summary":"<u>keep</u><img src=x>"}"#,
            )
            .unwrap();
        let document: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(document["description"], "<p>Hix()</p>");
        assert_eq!(document["summary"], "<u>keep</u><img src=x>");
    }

    #[test]
    fn test_render_records_field_override_and_pretty() {
        let app = App::new(Config::default());
        let invocation = Invocation {
            fields: vec!["summary".to_string()],
            pretty: Some(true),
            ..json_invocation()
        };
        let output = app
            .render(
                &invocation,
                r#"{"description":"<img src=x>","summary":"<u>keep</u><img src=x>"}"#,
            )
            .unwrap();
        assert!(output.contains("\n  \""));
        let document: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(document["summary"], "<u>keep</u>");
        assert_eq!(document["description"], "<img src=x>");
    }

    #[test]
    fn test_render_records_rejects_invalid_json() {
        let app = App::new(Config::default());
        let err = app.render(&json_invocation(), "<p>not json</p>").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_run_between_files() {
        let mut input = NamedTempFile::new().unwrap();
        write!(input, "<!-- note --><ul><li onclick=\"x()\">One</li></ul>").unwrap();
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clean.html");

        let invocation = Invocation {
            input: Some(input.path().to_path_buf()),
            output: Some(output.clone()),
            ..Invocation::default()
        };
        App::new(Config::default()).run(&invocation).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "<ul><li>One</li></ul>\n"
        );
    }
}
