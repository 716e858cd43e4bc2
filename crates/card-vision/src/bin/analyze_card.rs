//! CLI tool to run a saved card screenshot through the full recognition pipeline.
//! Usage: cargo run -p card-vision --features cli --bin analyze_card -- <card.png> [output_dir]

use anyhow::{bail, Result};
use card_data::CardData;
use card_vision::{CardRecognizer, CardScanner, DebugSink, ModelVoter, OcrEngine, TesseractCli};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <card.png> [output_dir]", args[0]);
        std::process::exit(1);
    }

    let input_path = PathBuf::from(&args[1]);
    let output_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./debug_output"));

    let data = CardData::load(&card_data::resolve_data_dir(None));
    let sink = DebugSink::new(&output_dir)?;

    println!("Loading image: {}", input_path.display());
    let image = card_capture::read_screenshot(&input_path)?;
    println!("Image size: {}x{}", image.width(), image.height());

    let engine = Arc::new(TesseractCli::new(data.settings.tesseract_path.clone()));
    if !engine.is_available() {
        println!("Tesseract not available, text fields will show their defaults");
    }

    let recognizer = CardRecognizer::new(engine, data.names.clone())
        .with_voter(ModelVoter::load(&data.models_dir()))
        .with_caching(false)
        .with_debug(Some(sink.clone()));
    let scanner = CardScanner::new(recognizer, data.ratio_boxes()).with_debug(Some(sink));

    let result = scanner.scan_image(&image);
    if !result.success {
        bail!("Image too small to scan");
    }

    println!("\n=== Card ===");
    if let Some(card) = &result.card {
        println!(
            "x={} y={} w={} h={} (aspect {:.2})",
            card.x,
            card.y,
            card.width,
            card.height,
            card.aspect_ratio()
        );
    }

    println!("\n=== Fields ===");
    for (field, outcome) in &result.fields {
        let flag = if outcome.confidence < data.settings.confidence_threshold {
            "  (low confidence)"
        } else {
            ""
        };
        println!(
            "{:<14} {:<12} {:.2}{}",
            field.as_str(),
            outcome.value,
            outcome.confidence,
            flag
        );
    }

    println!("\nDebug images saved to: {}", output_dir.display());
    Ok(())
}
