// zstd-framed saves (feature `zstd`).

use super::{DecompressError, SaveDecompressor};

/// Little-endian frame magic.
pub const ZSTD_MAGIC: u32 = 0xFD2F_B528;

#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdFrame;

impl SaveDecompressor for ZstdFrame {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn detect(&self, data: &[u8]) -> bool {
        data.get(..4)
            .and_then(|b| <[u8; 4]>::try_from(b).ok())
            .map(u32::from_le_bytes)
            == Some(ZSTD_MAGIC)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        Ok(zstd::decode_all(data)?)
    }
}
