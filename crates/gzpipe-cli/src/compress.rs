//! File compression driver for the `compress` command

use anyhow::{bail, Context, Result};
use gzpipe_alloc::{
    AllocationSnapshot, AllocationStats, GlobalAllocator, HostAllocator, LimitedAllocator,
    TrackingAllocator,
};
use gzpipe_compression::Compressor;
use gzpipe_config::{AllocatorKind, MemoryConfig};
use gzpipe_types::{CompressionConfig, CompressionStats};
use indicatif::ProgressBar;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Suffix appended to compressed files
pub const GZ_SUFFIX: &str = ".gz";

/// Behavior switches for the `compress` command
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressOptions {
    /// Write every member to standard output
    pub to_stdout: bool,
    /// Keep input files after compressing them
    pub keep: bool,
    /// Overwrite existing outputs
    pub force: bool,
    /// Descend into directories
    pub recursive: bool,
}

/// Allocator serving the engine for a whole run
pub struct EngineMemory {
    host: Option<Arc<dyn HostAllocator>>,
    stats: Option<Arc<AllocationStats>>,
}

impl EngineMemory {
    /// Build the allocator stack described by `memory`
    pub fn from_config(memory: &MemoryConfig) -> Self {
        let base: Arc<dyn HostAllocator> = match memory.limit_bytes {
            Some(limit) => Arc::new(LimitedAllocator::new(
                usize::try_from(limit).unwrap_or(usize::MAX),
            )),
            None => Arc::new(GlobalAllocator),
        };

        match memory.allocator {
            AllocatorKind::Engine => Self {
                host: None,
                stats: None,
            },
            AllocatorKind::Global => Self {
                host: Some(base),
                stats: None,
            },
            AllocatorKind::Tracking => {
                let tracker = TrackingAllocator::wrap(base);
                let stats = Arc::clone(tracker.stats());
                Self {
                    host: Some(Arc::new(tracker)),
                    stats: Some(stats),
                }
            }
        }
    }

    /// Open a compressor over `sink` using this allocator
    pub fn compressor<W: Write>(
        &self,
        sink: W,
        config: &CompressionConfig,
    ) -> gzpipe_types::Result<Compressor<W>> {
        match &self.host {
            Some(host) => Compressor::with_allocator(sink, config, Arc::clone(host)),
            None => Compressor::with_config(sink, config),
        }
    }

    /// Allocation counters, when tracking is enabled
    pub fn snapshot(&self) -> Option<AllocationSnapshot> {
        self.stats.as_ref().map(|stats| stats.snapshot())
    }
}

/// Expand the command line paths into the list of files to compress
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Cannot access {}", path.display()))?;

        if metadata.is_dir() {
            if !recursive {
                warn!("{} is a directory, skipping (use --recursive)", path.display());
                continue;
            }
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() {
                    push_input(&mut files, entry.into_path());
                }
            }
        } else {
            push_input(&mut files, path.clone());
        }
    }

    Ok(files)
}

fn push_input(files: &mut Vec<PathBuf>, path: PathBuf) {
    if has_gz_suffix(&path) {
        warn!("{} already has {} suffix, skipping", path.display(), GZ_SUFFIX);
    } else {
        files.push(path);
    }
}

fn has_gz_suffix(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Output path for `input`: the same name with `.gz` appended
pub fn output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(GZ_SUFFIX);
    PathBuf::from(name)
}

/// Compress everything `reader` yields into `sink` as one gzip member
pub fn compress_stream<R: Read, W: Write>(
    mut reader: R,
    sink: W,
    memory: &EngineMemory,
    config: &CompressionConfig,
) -> Result<(CompressionStats, W)> {
    let mut compressor = memory.compressor(sink, config)?;
    io::copy(&mut reader, &mut compressor)?;
    compressor.finish()?;

    let stats = compressor.stats();
    let mut sink = compressor.into_inner();
    sink.flush()?;
    Ok((stats, sink))
}

/// Compress one file according to `options`
pub fn compress_file(
    input: &Path,
    options: CompressOptions,
    memory: &EngineMemory,
    config: &CompressionConfig,
    progress: Option<&ProgressBar>,
) -> Result<CompressionStats> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let reader: Box<dyn Read> = match progress {
        Some(pb) => Box::new(pb.wrap_read(file)),
        None => Box::new(file),
    };

    if options.to_stdout {
        let stdout = io::stdout();
        let (stats, _) = compress_stream(reader, BufWriter::new(stdout.lock()), memory, config)
            .with_context(|| format!("Failed to compress {}", input.display()))?;
        return Ok(stats);
    }

    let output = output_path(input);
    if output.exists() && !options.force {
        bail!(
            "{} already exists, use --force to overwrite",
            output.display()
        );
    }

    let out_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let stats = match compress_stream(reader, BufWriter::new(out_file), memory, config) {
        Ok((stats, _)) => stats,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&output) {
                debug!("Could not remove partial output {}: {}", output.display(), cleanup);
            }
            return Err(e.context(format!("Failed to compress {}", input.display())));
        }
    };

    if !options.keep {
        fs::remove_file(input)
            .with_context(|| format!("Failed to remove {}", input.display()))?;
    }

    info!(
        "{} -> {} ({} -> {} bytes)",
        input.display(),
        output.display(),
        stats.bytes_in,
        stats.bytes_out
    );
    Ok(stats)
}
