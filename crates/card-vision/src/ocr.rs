use anyhow::{bail, Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Per-call OCR configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrOptions {
    /// Tesseract page segmentation mode; 7 is a single text line.
    pub psm: u8,
    pub languages: &'static str,
    /// Restrict recognized characters; `None` allows everything.
    pub whitelist: Option<&'static str>,
}

impl OcrOptions {
    pub const fn line(languages: &'static str, whitelist: Option<&'static str>) -> Self {
        Self {
            psm: 7,
            languages,
            whitelist,
        }
    }
}

/// Something that turns an image into text.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage, options: &OcrOptions) -> Result<String>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Runs the `tesseract` executable once per image.
/// Degrades to returning empty text when Tesseract is not installed.
pub struct TesseractCli {
    program: PathBuf,
    /// Probed on first use.
    available: OnceLock<bool>,
}

impl TesseractCli {
    /// Use `program`, or `tesseract` from `PATH` when `None`.
    pub fn new(program: Option<PathBuf>) -> Self {
        Self {
            program: program.unwrap_or_else(|| PathBuf::from("tesseract")),
            available: OnceLock::new(),
        }
    }

    fn check_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let found = check_tesseract(&self.program);
            if found {
                debug!("Tesseract OCR available at {}", self.program.display());
            } else {
                warn!(
                    "Tesseract not found at {}. OCR disabled, text fields will use defaults",
                    self.program.display()
                );
            }
            found
        })
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &DynamicImage, options: &OcrOptions) -> Result<String> {
        if !self.check_available() {
            return Ok(String::new());
        }

        let input = tempfile::Builder::new()
            .prefix("card_scan_ocr")
            .suffix(".png")
            .tempfile()
            .context("Failed to create OCR temp file")?;
        image
            .save_with_format(input.path(), image::ImageFormat::Png)
            .context("Failed to write OCR input")?;

        let mut cmd = Command::new(&self.program);
        cmd.arg(input.path())
            .arg("stdout")
            .arg("--psm")
            .arg(options.psm.to_string())
            .arg("-l")
            .arg(options.languages);
        if let Some(whitelist) = options.whitelist {
            cmd.arg("-c")
                .arg(format!("tessedit_char_whitelist={}", whitelist));
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;
        if !output.status.success() {
            bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("OCR result: '{}'", text);
        Ok(text)
    }

    fn is_available(&self) -> bool {
        self.check_available()
    }
}

fn check_tesseract(program: &Path) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let engine = TesseractCli::new(Some(PathBuf::from("/nonexistent/tesseract")));
        assert!(!engine.is_available());

        let img = DynamicImage::new_rgb8(4, 4);
        let text = engine
            .recognize(&img, &OcrOptions::line("eng", Some("0123456789")))
            .unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_line_options() {
        let opts = OcrOptions::line("kor+eng", None);
        assert_eq!(opts.psm, 7);
        assert!(opts.whitelist.is_none());
    }
}
