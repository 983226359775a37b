//! Locating a run's files under the data root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pcapreduce_core::pcap::is_gzip_extension;
use tracing::{debug, warn};

/// Capture and telemetry files belonging to one run, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFiles {
    pub captures: Vec<PathBuf>,
    pub telemetry: Vec<PathBuf>,
}

impl DiscoveredFiles {
    pub fn total(&self) -> usize {
        self.captures.len() + self.telemetry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// `.pcap` or `.pcapng`, optionally gzip-compressed (`.pcap.gz`).
pub fn is_capture_file(path: &Path) -> bool {
    let inner = if is_gzip_extension(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    };
    inner
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pcap") || ext.eq_ignore_ascii_case("pcapng"))
}

pub fn is_telemetry_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Find every directory under `root` named `run_name` (including `root`
/// itself) and collect the files directly inside them.
///
/// Unreadable subdirectories are logged and skipped; only an unreadable
/// `root` is an error.
pub fn discover(root: &Path, run_name: &str) -> io::Result<DiscoveredFiles> {
    let mut run_dirs = Vec::new();
    if root.file_name().is_some_and(|name| name == run_name) {
        run_dirs.push(root.to_path_buf());
    }

    let mut pending = vec![root.to_path_buf()];
    let mut first = true;
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if first => return Err(e),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        first = false;

        for entry in entries.flatten() {
            let path = entry.path();
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                if entry.file_name() == run_name {
                    run_dirs.push(path.clone());
                }
                pending.push(path);
            }
        }
    }

    let mut found = DiscoveredFiles::default();
    for dir in &run_dirs {
        debug!(dir = %dir.display(), "run directory");
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if is_capture_file(&path) {
                found.captures.push(path);
            } else if is_telemetry_file(&path) {
                found.telemetry.push(path);
            }
        }
    }

    found.captures.sort();
    found.captures.dedup();
    found.telemetry.sort();
    found.telemetry.dedup();
    Ok(found)
}
