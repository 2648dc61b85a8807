//! Answer-key extraction from exam PDFs.
//!
//! Orchestrates the Gemini flow for one exam folder: upload both PDFs,
//! wait for them to become active, send the extraction prompt, strip the
//! markdown fence from the response, and persist it as the folder's
//! `data.json`. Timeouts are retried; everything else aborts.

pub mod prompt;

use crate::config::Config;
use crate::gemini::{GeminiClient, GeminiConfig, GeminiError, UploadedFile};
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Options for one extraction run.
pub struct ExtractOptions {
    /// Folder containing the exam PDFs, as given on the command line.
    pub directory: PathBuf,
    /// Gemini API key.
    pub api_key: String,
    /// Show spinners and status lines.
    pub show_progress: bool,
}

/// Run the full extraction flow for one exam folder.
pub async fn run_extraction(options: &ExtractOptions, config: &Config) -> Result<()> {
    let dir = &options.directory;
    if !dir.is_dir() {
        bail!("The directory '{}' does not exist", dir.display());
    }

    let pdf_paths = [
        dir.join(&config.extraction.prova_file),
        dir.join(&config.extraction.gabarito_file),
    ];
    for path in &pdf_paths {
        if !path.is_file() {
            bail!("The file '{}' was not found", path.display());
        }
    }

    let client = GeminiClient::new(GeminiConfig {
        api_base_url: config.model.api_base_url.clone(),
        api_key: options.api_key.clone(),
        model: config.model.name.clone(),
        timeout_seconds: config.model.timeout_seconds,
        poll_interval_seconds: config.model.poll_interval_seconds,
        temperature: config.model.temperature,
    })?;

    let max_retries = config.model.max_retries;

    if options.show_progress {
        println!("Uploading files...");
    }

    let mut uploaded: Vec<UploadedFile> = Vec::new();
    for path in &pdf_paths {
        let display_name = path.to_string_lossy().into_owned();

        let spinner = progress_spinner(
            options.show_progress,
            format!("Uploading {}...", path.display()),
        );
        let file = with_retries("upload", max_retries, || {
            client.upload_file(path, &display_name)
        })
        .await?;
        let file = with_retries("file processing", max_retries, || {
            client.wait_until_active(file.clone())
        })
        .await?;
        spinner.finish_and_clear();

        if options.show_progress {
            println!("✅ Completed upload for: {}", display_name);
        }
        uploaded.push(file);
    }

    if options.show_progress {
        println!("\nAll files uploaded successfully! ✅");
    }

    let link = prompt::pdf_link(
        &config.extraction.link_base,
        &dir.to_string_lossy(),
        &config.extraction.prova_file,
    );
    let extraction_prompt = prompt::build_prompt(&link);

    if options.show_progress {
        println!("\nSending prompt to Gemini...");
    }
    let spinner = progress_spinner(options.show_progress, "Waiting for Gemini...".to_string());
    let response = with_retries("generation", max_retries, || {
        client.generate_content(&extraction_prompt, &uploaded)
    })
    .await?;
    spinner.finish_and_clear();

    println!("\n--- Gemini Response ---");
    println!("{}", response);
    println!("-----------------------\n");

    let cleaned = strip_code_fence(&response);
    let output_path = dir.join(&config.aggregator.data_file);
    std::fs::write(&output_path, cleaned)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!("Answer key written to {}", output_path.display());
    if options.show_progress {
        println!("📄 Answer key saved to {}", output_path.display());
    }

    Ok(())
}

/// Run an operation, retrying while it fails with a retryable error.
///
/// `max_retries` of `None` retries forever, matching the upload and
/// generation loops this replaces.
async fn with_retries<T, F, Fut>(what: &str, max_retries: Option<u32>, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GeminiError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                attempt += 1;
                if let Some(max) = max_retries {
                    if attempt > max {
                        return Err(e)
                            .with_context(|| format!("{} gave up after {} retries", what, max));
                    }
                }
                warn!("{} timed out ({}), retrying (attempt {})", what, e, attempt + 1);
            }
            Err(e) => return Err(e).with_context(|| format!("{} failed", what)),
        }
    }
}

/// Remove the first and last line of a response (the markdown code-fence
/// delimiters). Two or fewer lines yield an empty string.
fn strip_code_fence(text: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    if lines.len() > 2 {
        lines[1..lines.len() - 1].join("\n")
    } else {
        String::new()
    }
}

fn progress_spinner(enabled: bool, message: String) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_strip_code_fence_removes_delimiters() {
        let raw = "```json\n{\n  \"qtd_questoes\": 90\n}\n```";
        assert_eq!(strip_code_fence(raw), "{\n  \"qtd_questoes\": 90\n}");
    }

    #[test]
    fn test_strip_code_fence_trims_surrounding_whitespace() {
        let raw = "\n```json\n{}\n```\n\n";
        assert_eq!(strip_code_fence(raw), "{}");
    }

    #[test]
    fn test_strip_code_fence_short_input_yields_empty() {
        assert_eq!(strip_code_fence("```json\n```"), "");
        assert_eq!(strip_code_fence("only one line"), "");
        assert_eq!(strip_code_fence(""), "");
    }

    #[tokio::test]
    async fn test_with_retries_retries_timeouts() {
        let attempts = Cell::new(0u32);

        let result: Result<u32> = with_retries("op", None, || {
            let attempts = &attempts;
            async move {
                let n = attempts.get() + 1;
                attempts.set(n);
                if n < 3 {
                    Err(GeminiError::Timeout("slow".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn test_with_retries_aborts_on_non_retryable_error() {
        let attempts = Cell::new(0u32);

        let result: Result<u32> = with_retries("op", None, || {
            let attempts = &attempts;
            async move {
                attempts.set(attempts.get() + 1);
                Err(GeminiError::Connect("http://localhost".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test]
    async fn test_with_retries_respects_cap() {
        let attempts = Cell::new(0u32);

        let result: Result<u32> = with_retries("op", Some(2), || {
            let attempts = &attempts;
            async move {
                attempts.set(attempts.get() + 1);
                Err(GeminiError::Timeout("slow".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        // Initial attempt plus two retries.
        assert_eq!(attempts.get(), 3);
    }
}
