// packages/recorder/src/recording/compressor.rs
//! zstd encoding of exported snapshots
//!
//! Decoding is bounded: an imported payload that inflates past
//! [`MAX_DECOMPRESSED_BYTES`] is refused instead of being buffered whole.

use crate::utils::errors::{Result, TelemetryError};
use std::io::Read;
use tracing::debug;

/// Upper bound on a decompressed snapshot
pub const MAX_DECOMPRESSED_BYTES: u64 = 64 * 1024 * 1024;

/// zstd level used for snapshot uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Fast,
    #[default]
    Balanced,
    Best,
    /// Explicit zstd level, clamped to the range the library supports
    Level(i32),
}

impl CompressionLevel {
    pub fn zstd_level(&self) -> i32 {
        match *self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Balanced => 3,
            CompressionLevel::Best => 19,
            CompressionLevel::Level(level) => {
                let range = zstd::compression_level_range();
                level.clamp(*range.start(), *range.end())
            }
        }
    }
}

/// Snapshot compressor
#[derive(Debug, Clone, Copy, Default)]
pub struct Compressor {
    level: CompressionLevel,
}

impl Compressor {
    pub fn new(level: CompressionLevel) -> Self {
        Self { level }
    }

    pub fn compress(&self, snapshot: &[u8]) -> Result<Vec<u8>> {
        let out = zstd::bulk::compress(snapshot, self.level.zstd_level())
            .map_err(|e| TelemetryError::CompressionFailed(format!("encode: {}", e)))?;

        debug!(
            "Snapshot compressed {} -> {} bytes ({:?})",
            snapshot.len(),
            out.len(),
            self.level
        );
        Ok(out)
    }

    pub fn decompress(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let failed = |e: std::io::Error| TelemetryError::CompressionFailed(format!("decode: {}", e));

        let decoder = zstd::stream::read::Decoder::new(frame).map_err(failed)?;
        let mut out = Vec::new();
        decoder
            .take(MAX_DECOMPRESSED_BYTES + 1)
            .read_to_end(&mut out)
            .map_err(failed)?;

        if out.len() as u64 > MAX_DECOMPRESSED_BYTES {
            return Err(TelemetryError::CompressionFailed(format!(
                "decoded snapshot exceeds {} bytes",
                MAX_DECOMPRESSED_BYTES
            )));
        }
        Ok(out)
    }
}
