use card_data::BatchSettings;
use card_state::RecognitionResult;
use card_vision::CardScanner;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Result for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub path: PathBuf,
    #[serde(flatten)]
    pub result: RecognitionResult,
}

/// Scans many screenshots on a bounded pool of blocking workers.
///
/// Each image owns its buffers; only the scanner's cache and name dictionary
/// are shared, and those sit behind the recognizer's lock.
pub struct BatchRunner {
    scanner: Arc<CardScanner>,
    max_batch_size: usize,
    parallel_jobs: usize,
}

impl BatchRunner {
    pub fn new(scanner: Arc<CardScanner>, settings: &BatchSettings) -> Self {
        Self {
            scanner,
            max_batch_size: settings.max_batch_size.max(1),
            parallel_jobs: settings.parallel_jobs.max(1),
        }
    }

    /// Scan `paths` in chunks of `max_batch_size`, calling `emit` for each
    /// record in input order as its chunk completes.
    pub async fn run<F>(&self, paths: &[PathBuf], mut emit: F) -> usize
    where
        F: FnMut(ScanRecord),
    {
        let permits = Arc::new(Semaphore::new(self.parallel_jobs));
        let mut scanned = 0;

        for (n, chunk) in paths.chunks(self.max_batch_size).enumerate() {
            debug!("Batch {}: {} image(s)", n + 1, chunk.len());
            let mut handles = Vec::with_capacity(chunk.len());
            for path in chunk {
                let permits = permits.clone();
                let scanner = self.scanner.clone();
                let path = path.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    tokio::task::spawn_blocking(move || scanner.scan_path(&path)).await
                }));
            }

            for (path, handle) in chunk.iter().zip(handles) {
                let result = match handle.await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) | Err(e) => {
                        warn!("Scan of {} aborted: {}", path.display(), e);
                        RecognitionResult::failed()
                    }
                };
                if result.success {
                    scanned += 1;
                }
                emit(ScanRecord {
                    path: path.clone(),
                    result,
                });
            }
        }

        info!("Scanned {} of {} image(s)", scanned, paths.len());
        scanned
    }
}

/// Expand directories into the screenshots they contain; files pass through.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            match card_capture::list_screenshots(input) {
                Ok(found) => {
                    debug!("{} screenshot(s) in {}", found.len(), input.display());
                    paths.extend(found);
                }
                Err(e) => warn!("{:#}", e),
            }
        } else {
            paths.push(input.clone());
        }
    }
    paths
}

/// Whether `path` names something a scan could start from.
pub fn is_scannable(path: &Path) -> bool {
    path.is_dir() || path.is_file()
}
