//! Loader config decoding.
//!
//! Loader configs are edited by hand with whatever Windows editor the user
//! had around, so they show up as:
//! - UTF-8 with BOM (0xEF 0xBB 0xBF)
//! - UTF-16 LE (with BOM 0xFF 0xFE)
//! - Plain UTF-8/ASCII
//! - Windows-1252 (anything that isn't valid UTF-8)

/// UTF-16 LE BOM bytes
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-8 BOM bytes
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decode config bytes to a UTF-8 string. Never fails; undecodable bytes
/// become replacement characters.
pub fn decode_config_bytes(bytes: &[u8]) -> String {
    if bytes.starts_with(&UTF8_BOM) {
        return String::from_utf8_lossy(&bytes[3..]).into_owned();
    }

    if bytes.starts_with(&UTF16_LE_BOM) {
        let (cow, _, _) = encoding_rs::UTF_16LE.decode(&bytes[2..]);
        return cow.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (cow, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            cow.into_owned()
        }
    }
}
