// Falcom "Type 1" save compression.
//
// Header (all little-endian u32):
//   0: decompressed size, must lie in [MIN_DECOMPRESSED_SIZE, MAX_DECOMPRESSED_SIZE]
//   4: compressed size, must equal the input length
//   8: marker value introducing a back-reference
//
// Body bytes other than the marker are literals. After a marker:
//   - a second marker byte is an escaped literal marker;
//   - otherwise it is the back-reference distance (values above the marker
//     are stored plus one), followed by a length byte.

use super::{DecompressError, SaveDecompressor};

pub const HEADER_LEN: usize = 12;
pub const MIN_DECOMPRESSED_SIZE: usize = 12;
pub const MAX_DECOMPRESSED_SIZE: usize = 1 << 24;

#[derive(Debug, Clone, Copy, Default)]
pub struct Type1;

impl SaveDecompressor for Type1 {
    fn name(&self) -> &'static str {
        "type1"
    }

    fn detect(&self, data: &[u8]) -> bool {
        match (read_u32(data, 0), read_u32(data, 4)) {
            (Some(size), Some(packed)) => {
                (MIN_DECOMPRESSED_SIZE..=MAX_DECOMPRESSED_SIZE).contains(&size)
                    && packed == data.len()
            }
            _ => false,
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        decompress(data)
    }
}

fn read_u32(data: &[u8], at: usize) -> Option<usize> {
    let bytes: [u8; 4] = data.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes) as usize)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, DecompressError> {
    let size = read_u32(data, 0).ok_or(DecompressError::Truncated(0))?;
    if !(MIN_DECOMPRESSED_SIZE..=MAX_DECOMPRESSED_SIZE).contains(&size) {
        return Err(DecompressError::SizeOutOfRange(size));
    }
    let declared = read_u32(data, 4).ok_or(DecompressError::Truncated(4))?;
    if declared != data.len() {
        return Err(DecompressError::LengthMismatch {
            declared,
            actual: data.len(),
        });
    }
    let marker = read_u32(data, 8).ok_or(DecompressError::Truncated(8))?;

    let mut out = Vec::with_capacity(size);
    let mut pos = HEADER_LEN;
    let next = |pos: &mut usize| -> Result<usize, DecompressError> {
        let byte = *data.get(*pos).ok_or(DecompressError::Truncated(*pos))?;
        *pos += 1;
        Ok(usize::from(byte))
    };

    while pos < data.len() {
        if out.len() >= size {
            return Err(DecompressError::Overrun(size));
        }
        let at = pos;
        let byte = next(&mut pos)?;
        if byte != marker {
            out.push(byte as u8);
            continue;
        }

        let mut distance = next(&mut pos)?;
        if distance == marker {
            out.push(byte as u8);
            continue;
        }
        if distance > marker {
            distance -= 1;
        }
        if distance == 0 {
            return Err(DecompressError::BadBackReference {
                offset: at,
                reason: "zero distance",
            });
        }

        let len = next(&mut pos)?;
        if len == 0 {
            continue;
        }
        if distance > out.len() {
            return Err(DecompressError::BadBackReference {
                offset: at,
                reason: "distance reaches before the start of the output",
            });
        }
        if out.len() + len > size {
            return Err(DecompressError::Overrun(size));
        }
        // Byte at a time: the source may overlap what is being written.
        let from = out.len() - distance;
        for i in 0..len {
            let b = out[from + i];
            out.push(b);
        }
    }

    if out.len() != size {
        return Err(DecompressError::SizeMismatch {
            expected: size,
            actual: out.len(),
        });
    }
    Ok(out)
}
