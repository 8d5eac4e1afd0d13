//! Resolution of repository-relative paths into locally readable files.
//!
//! Archive indices are published in several compressions (`Packages.xz`,
//! `Packages.gz`, ...). The fetcher probes a fixed list of candidate
//! extensions and returns the first file that exists locally or can be
//! downloaded into the scratch directory. The network transport itself is an
//! injected collaborator; this module never talks to the network directly.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

/// Placeholder in a relative path where the compression extension goes.
pub const FORMAT_SLOT: &str = "{fmt}";

/// Candidate compression extensions, probed in this order. The order is part
/// of the fetcher contract.
pub const COMPRESSION_ORDER: &[&str] = &["xz", "bz2", "gz", ""];

/// Transport used to materialize remote files. Implementations are expected
/// to write the complete payload to `dest` or fail.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Transport stub for local-only archives. Any download attempt fails, which
/// the fetcher treats like a missing candidate.
pub struct NoDownloader;

impl Downloader for NoDownloader {
    fn download(&self, url: &str, _dest: &Path) -> Result<()> {
        bail!("no download transport configured (requested {url})")
    }
}

pub struct Fetcher {
    downloader: Box<dyn Downloader>,
}

impl Fetcher {
    pub fn new(downloader: Box<dyn Downloader>) -> Self {
        Self { downloader }
    }

    /// Resolve `relative` (containing exactly one `{fmt}` slot) against
    /// `root`, trying each compression extension in [`COMPRESSION_ORDER`].
    ///
    /// Returns the path of the first candidate that is locally present or
    /// could be downloaded into `tmp_dir`. Downloads are idempotent: an
    /// existing file of nonzero size is reused without refetching.
    pub fn fetch(&self, root: &str, tmp_dir: &Path, relative: &str) -> Result<PathBuf> {
        if relative.matches(FORMAT_SLOT).count() != 1 {
            bail!("path {relative:?} must contain exactly one {FORMAT_SLOT} slot");
        }

        for ext in COMPRESSION_ORDER {
            let suffix = if ext.is_empty() { String::new() } else { format!(".{ext}") };
            let candidate = relative.replace(FORMAT_SLOT, &suffix);
            if let Ok(path) = self.fetch_plain(root, tmp_dir, &candidate) {
                return Ok(path);
            }
        }

        Err(anyhow!("not found: {relative} (relative to {root})"))
    }

    /// Resolve a single relative path without extension probing.
    pub fn fetch_plain(&self, root: &str, tmp_dir: &Path, relative: &str) -> Result<PathBuf> {
        if is_remote(root) {
            let dest = tmp_dir.join(relative);
            if file_present(&dest) {
                return Ok(dest);
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let url = format!("{}/{}", root.trim_end_matches('/'), relative);
            self.downloader.download(&url, &dest)?;
            if !file_present(&dest) {
                bail!("download of {url} produced no data");
            }
            Ok(dest)
        } else {
            let path = Path::new(root).join(relative);
            if path.is_file() {
                Ok(path)
            } else {
                Err(anyhow!("no such file: {}", path.display()))
            }
        }
    }
}

fn is_remote(root: &str) -> bool {
    root.starts_with("http://") || root.starts_with("https://")
}

fn file_present(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Open a file for reading, transparently decompressing by extension.
/// Unknown extensions are read as plain text.
pub fn open_compressed(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let reader: Box<dyn BufRead> = match ext {
        "xz" => Box::new(BufReader::new(XzDecoder::new(file))),
        "bz2" => Box::new(BufReader::new(BzDecoder::new(file))),
        "gz" => Box::new(BufReader::new(GzDecoder::new(file))),
        _ => Box::new(BufReader::new(file)),
    };
    Ok(reader)
}
