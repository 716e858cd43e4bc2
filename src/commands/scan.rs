use anyhow::{bail, Context, Result};
use card_data::CardData;
use card_vision::{CardScanner, OcrEngine, TesseractCli};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::pipeline::{expand_inputs, is_scannable, BatchRunner, ScanRecord};

/// Scan every input with Tesseract, writing one JSON line per image to `out`.
pub async fn scan<W: Write>(data: &CardData, inputs: Vec<PathBuf>, out: &mut W) -> Result<usize> {
    let engine = Arc::new(TesseractCli::new(data.settings.tesseract_path.clone()));
    scan_with(data, engine, inputs, out).await
}

pub(crate) async fn scan_with<W: Write>(
    data: &CardData,
    engine: Arc<dyn OcrEngine>,
    inputs: Vec<PathBuf>,
    out: &mut W,
) -> Result<usize> {
    for input in inputs.iter().filter(|p| !is_scannable(p)) {
        warn!("No such file or directory: {}", input.display());
    }
    let paths = expand_inputs(&inputs);
    if paths.is_empty() {
        bail!("Nothing to scan");
    }

    let scanner = Arc::new(CardScanner::from_data(data, engine));
    let runner = BatchRunner::new(scanner, &data.settings.batch);
    let threshold = data.settings.confidence_threshold;

    let mut write_error = None;
    let scanned = runner
        .run(&paths, |record| {
            report_low_confidence(&record, threshold);
            if write_error.is_none() {
                write_error = write_record(out, &record).err();
            }
        })
        .await;

    if let Some(e) = write_error {
        return Err(e);
    }
    Ok(scanned)
}

fn write_record<W: Write>(out: &mut W, record: &ScanRecord) -> Result<()> {
    serde_json::to_writer(&mut *out, record).context("Failed to serialize result")?;
    writeln!(out).context("Failed to write result")?;
    Ok(())
}

fn report_low_confidence(record: &ScanRecord, threshold: f64) {
    if !record.result.success {
        warn!("Could not scan {}", record.path.display());
        return;
    }
    for field in record.result.low_confidence(threshold) {
        if let Some(outcome) = record.result.get(field) {
            warn!(
                "{}: {} = '{}' has low confidence {:.2}",
                record.path.display(),
                field,
                outcome.value,
                outcome.confidence
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_vision::OcrOptions;
    use image::{DynamicImage, Rgb, RgbImage};

    struct Constant(&'static str);

    impl OcrEngine for Constant {
        fn recognize(&self, _: &DynamicImage, _: &OcrOptions) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_scan_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let shots = dir.path().join("shots");
        std::fs::create_dir(&shots).unwrap();
        let card = RgbImage::from_fn(400, 500, |x, y| {
            if (100..300).contains(&x) && (100..380).contains(&y) {
                Rgb([210, 210, 210])
            } else {
                Rgb([15, 15, 15])
            }
        });
        card.save(shots.join("one.png")).unwrap();
        card.save(shots.join("two.png")).unwrap();

        let data = CardData::load(dir.path());
        let mut out = Vec::new();
        let scanned = scan_with(&data, Arc::new(Constant("ST")), vec![shots.clone()], &mut out)
            .await
            .unwrap();
        assert_eq!(scanned, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0]["path"].as_str().unwrap().ends_with("one.png"));
        assert_eq!(lines[1]["fields"]["position"]["value"], "ST");
        assert_eq!(lines[1]["fields"]["position"]["confidence"], 1.0);
    }

    #[tokio::test]
    async fn test_nothing_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        let data = CardData::load(dir.path());
        let mut out = Vec::new();
        let err = scan_with(
            &data,
            Arc::new(Constant("")),
            vec![dir.path().join("missing.png")],
            &mut out,
        )
        .await;
        // A missing file is still attempted; an empty directory is not
        assert!(err.is_ok());

        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(scan_with(&data, Arc::new(Constant("")), vec![empty], &mut out)
            .await
            .is_err());
    }
}
