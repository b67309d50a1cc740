use anyhow::Result;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Reads raw rich text from a file or stdin and writes sanitized output.
pub struct FileManager {
    max_input_bytes: u64,
}

impl FileManager {
    pub fn new(max_input_bytes: u64) -> Self {
        Self { max_input_bytes }
    }

    /// Read from `path`, or from stdin when no path is given.
    pub async fn read_input(&self, path: Option<&Path>) -> Result<String> {
        match path {
            Some(path) => self.read_file(path).await,
            None => self.read_stdin().await,
        }
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Input file not found: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow::anyhow!("Input path is not a file: {}", path.display()));
        }

        match fs::metadata(path).await {
            Ok(metadata) => {
                if metadata.len() > self.max_input_bytes {
                    return Err(anyhow::anyhow!(
                        "Input file is too large ({} bytes, limit {}): {}",
                        metadata.len(),
                        self.max_input_bytes,
                        path.display()
                    ));
                }
            }
            Err(e) => {
                log::warn!("Failed to get file metadata: {}", e);
            }
        }

        match fs::read_to_string(path).await {
            Ok(content) => {
                self.check_content(&content, &path.display().to_string())?;
                log::info!("Read {} bytes from {}", content.len(), path.display());
                Ok(content)
            }
            Err(e) => {
                let error_msg = match e.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        format!("Permission denied reading: {}", path.display())
                    }
                    std::io::ErrorKind::NotFound => {
                        format!("Input file not found: {}", path.display())
                    }
                    std::io::ErrorKind::InvalidData => {
                        format!("Input is not valid UTF-8: {}", path.display())
                    }
                    _ => format!("Failed to read input: {} - {}", path.display(), e),
                };
                Err(anyhow::anyhow!(error_msg))
            }
        }
    }

    async fn read_stdin(&self) -> Result<String> {
        let mut buffer = Vec::new();
        tokio::io::stdin()
            .take(self.max_input_bytes + 1)
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
        let content = self.decode(buffer, "stdin")?;
        log::info!("Read {} bytes from stdin", content.len());
        Ok(content)
    }

    /// Decode raw bytes, enforcing the same limits as file input.
    pub fn decode(&self, bytes: Vec<u8>, source: &str) -> Result<String> {
        if bytes.len() as u64 > self.max_input_bytes {
            return Err(anyhow::anyhow!(
                "Input from {} exceeds the {} byte limit",
                source,
                self.max_input_bytes
            ));
        }
        let content = String::from_utf8(bytes)
            .map_err(|_| anyhow::anyhow!("Input is not valid UTF-8: {}", source))?;
        self.check_content(&content, source)?;
        Ok(content)
    }

    fn check_content(&self, content: &str, source: &str) -> Result<()> {
        if content.contains('\0') {
            return Err(anyhow::anyhow!("Input looks like binary data: {}", source));
        }
        Ok(())
    }

    /// Write to `path`, or to stdout when no path is given.
    pub async fn write_output(&self, path: Option<&Path>, content: &str) -> Result<()> {
        let Some(path) = path else {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(content.as_bytes()).await?;
            stdout.flush().await?;
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to create directory: {} - {}",
                        parent.display(),
                        e
                    )
                })?;
                log::info!("Created directory: {}", parent.display());
            }
        }

        match fs::write(path, content.as_bytes()).await {
            Ok(_) => {
                log::info!("Wrote {} bytes to {}", content.len(), path.display());
                Ok(())
            }
            Err(e) => {
                let error_msg = match e.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        format!("Permission denied writing: {}", path.display())
                    }
                    _ => format!("Failed to write output: {} - {}", path.display(), e),
                };
                Err(anyhow::anyhow!(error_msg))
            }
        }
    }
}
