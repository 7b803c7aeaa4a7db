// Header checksum used by Cold Steel III saves.
//
// Layout: a little-endian u32 file size at offset 8, a little-endian u32
// CRC32 at offset 12, save data from offset 16. The CRC is the reflected
// 0xEDB88320 polynomial seeded with the save-data length and with no final
// XOR.

use log::debug;

use crate::engine::ConvertError;

pub const FILESIZE_OFFSET: usize = 8;
pub const CHECKSUM_OFFSET: usize = FILESIZE_OFFSET + 4;
pub const SAVEDATA_OFFSET: usize = CHECKSUM_OFFSET + 4;

/// CRC32 over `data` starting from the raw register value `init`, with no
/// final XOR.
pub fn crc32(data: &[u8], init: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(!init);
    hasher.update(data);
    !hasher.finalize()
}

/// Rewrite the file-size and CRC fields of a finished save.
pub fn fix_checksum(mut data: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
    if data.len() < SAVEDATA_OFFSET {
        return Err(ConvertError::TooShort {
            len: data.len(),
            min: SAVEDATA_OFFSET,
            what: "a checksum header",
        });
    }
    let filesize = u32::try_from(data.len()).map_err(|_| ConvertError::TooShort {
        len: data.len(),
        min: SAVEDATA_OFFSET,
        what: "a 32-bit file size field",
    })?;
    let body_len = filesize - SAVEDATA_OFFSET as u32;
    let crc = crc32(&data[SAVEDATA_OFFSET..], body_len);

    data[FILESIZE_OFFSET..CHECKSUM_OFFSET].copy_from_slice(&filesize.to_le_bytes());
    data[CHECKSUM_OFFSET..SAVEDATA_OFFSET].copy_from_slice(&crc.to_le_bytes());
    debug!("checksum fixed: size {filesize:#x}, crc {crc:#010x}");
    Ok(data)
}

/// True when the stored size and CRC match the buffer.
pub fn verify_checksum(data: &[u8]) -> bool {
    if data.len() < SAVEDATA_OFFSET {
        return false;
    }
    let Ok(filesize) = u32::try_from(data.len()) else {
        return false;
    };
    let stored_size = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    let stored_crc = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
    stored_size == filesize
        && stored_crc == crc32(&data[SAVEDATA_OFFSET..], filesize - SAVEDATA_OFFSET as u32)
}
