//! Cold Tier Codec
//!
//! Frames entries written to the slow tier, LZ4-compressing them when that
//! actually saves space.
//!
//! ```text
//! plain:  { ...entry json... }
//! lz4:    0x4C 'Z' | lz4 block (size-prefixed)
//! ```
//!
//! Plain frames are ordinary JSON, so fast-tier bytes and uncompressed
//! slow-tier bytes decode through the same path.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Frame header for LZ4-compressed payloads
const LZ4_MAGIC: [u8; 2] = [0x4C, b'Z'];

/// Supported compression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionAlgorithm {
    /// Stored as-is
    None,
    /// LZ4 block compression
    #[default]
    Lz4,
}

impl CompressionAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::None => "none",
            CompressionAlgorithm::Lz4 => "lz4",
        }
    }
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoder/decoder for slow-tier frames
#[derive(Debug, Clone)]
pub struct ColdTierCodec {
    /// Payloads smaller than this are never compressed
    min_size_bytes: usize,
    /// LZ4 high-compression level
    level: i32,
}

impl Default for ColdTierCodec {
    fn default() -> Self {
        Self {
            min_size_bytes: 1024,
            level: 4,
        }
    }
}

impl ColdTierCodec {
    pub fn new(min_size_bytes: usize, level: i32) -> Self {
        Self {
            min_size_bytes,
            level,
        }
    }

    /// Frame a JSON `payload`; returns the frame and the algorithm used.
    ///
    /// Compression failures fall back to a plain frame.
    pub fn encode(&self, payload: &[u8]) -> (Bytes, CompressionAlgorithm) {
        if payload.len() < self.min_size_bytes {
            return (Bytes::copy_from_slice(payload), CompressionAlgorithm::None);
        }

        match lz4::block::compress(
            payload,
            Some(lz4::block::CompressionMode::HIGHCOMPRESSION(self.level)),
            true,
        ) {
            Ok(compressed) if compressed.len() + LZ4_MAGIC.len() < payload.len() => {
                let mut frame = BytesMut::with_capacity(compressed.len() + LZ4_MAGIC.len());
                frame.put_slice(&LZ4_MAGIC);
                frame.put_slice(&compressed);
                (frame.freeze(), CompressionAlgorithm::Lz4)
            }
            Ok(_) => (Bytes::copy_from_slice(payload), CompressionAlgorithm::None),
            Err(e) => {
                tracing::warn!(error = %e, "LZ4 compression failed, storing uncompressed");
                (Bytes::copy_from_slice(payload), CompressionAlgorithm::None)
            }
        }
    }

    /// Recover the payload from a frame
    pub fn decode(&self, frame: &[u8]) -> Result<Bytes> {
        match frame.strip_prefix(&LZ4_MAGIC) {
            Some(body) => lz4::block::decompress(body, None)
                .map(Bytes::from)
                .map_err(|e| Error::DecompressionFailed {
                    algorithm: CompressionAlgorithm::Lz4.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(Bytes::copy_from_slice(frame)),
        }
    }

    /// Algorithm a frame was written with
    pub fn algorithm_of(frame: &[u8]) -> CompressionAlgorithm {
        if frame.starts_with(&LZ4_MAGIC) {
            CompressionAlgorithm::Lz4
        } else {
            CompressionAlgorithm::None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
