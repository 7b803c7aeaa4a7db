// Decompression of compressed console saves.
//
// Saves may arrive zstd-framed or compressed with Falcom's "Type 1" LZ
// scheme. Each scheme is a `SaveDecompressor` backend:
//
// - `zstd_frame`: zstd frames (feature-gated `zstd`)
// - `type1`:      Falcom Type 1 (always available)
//
// `decompress_savedata` tries each backend in turn and falls back to the
// raw bytes when none of them accepts the input. Failures are logged, never
// raised: an uncompressed save is the common case.

pub mod type1;
#[cfg(feature = "zstd")]
pub mod zstd_frame;

use log::{debug, info};

pub use type1::Type1;
#[cfg(feature = "zstd")]
pub use zstd_frame::ZstdFrame;

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// A decompression scheme a save might be stored with.
pub trait SaveDecompressor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Cheap header check. `decompress` is only attempted when this is true.
    fn detect(&self, data: &[u8]) -> bool;

    /// Decompress the whole buffer.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError>;
}

/// Backends in the order they are tried.
pub fn backends() -> Vec<Box<dyn SaveDecompressor>> {
    let mut list: Vec<Box<dyn SaveDecompressor>> = Vec::new();
    #[cfg(feature = "zstd")]
    list.push(Box::new(ZstdFrame));
    list.push(Box::new(Type1));
    list
}

/// Return the decompressed save, or `data` unchanged when it is not
/// compressed with any known scheme.
pub fn decompress_savedata(data: Vec<u8>) -> Vec<u8> {
    for backend in backends() {
        if !backend.detect(&data) {
            debug!("{}: header not recognized", backend.name());
            continue;
        }
        match backend.decompress(&data) {
            Ok(out) => {
                info!(
                    "save was {}-compressed: {} -> {} bytes",
                    backend.name(),
                    data.len(),
                    out.len()
                );
                return out;
            }
            Err(e) => info!("{} decompression failed, treating save as raw: {e}", backend.name()),
        }
    }
    data
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DecompressError {
    #[error("input truncated at offset {0:#x}")]
    Truncated(usize),

    #[error("declared size {0} is outside [12, 16 MiB]")]
    SizeOutOfRange(usize),

    #[error("declared compressed size {declared} does not match input size {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("back-reference at offset {offset:#x}: {reason}")]
    BadBackReference { offset: usize, reason: &'static str },

    #[error("output overruns declared size {0}")]
    Overrun(usize),

    #[error("decompressed {actual} bytes, header declared {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("zstd: {0}")]
    Zstd(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_save_passes_through() {
        let raw: Vec<u8> = (0..200u8).collect();
        assert_eq!(decompress_savedata(raw.clone()), raw);
    }

    #[test]
    fn tiny_input_passes_through() {
        assert_eq!(decompress_savedata(vec![1, 2, 3]), vec![1, 2, 3]);
        assert!(decompress_savedata(Vec::new()).is_empty());
    }

    #[test]
    fn type1_save_is_expanded() {
        let packed = type1::tests::sample_packed();
        assert_eq!(decompress_savedata(packed), type1::tests::sample_plain());
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_save_is_expanded() {
        let plain: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let framed = zstd::encode_all(&plain[..], 3).unwrap();
        assert_eq!(decompress_savedata(framed), plain);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn corrupt_zstd_falls_back_to_raw() {
        let mut bogus = zstd_frame::ZSTD_MAGIC.to_le_bytes().to_vec();
        bogus.extend_from_slice(&[0xFF; 32]);
        assert_eq!(decompress_savedata(bogus.clone()), bogus);
    }
}
