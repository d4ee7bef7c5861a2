//! CRC-16/CCITT-FALSE checksum used by EMVCo payloads (tag 63)
//!
//! Poly: 0x1021, Init: 0xFFFF, no reflection, no final XOR.

/// Computes CRC-16/CCITT-FALSE over raw bytes.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        // byte-wise form of the 0x1021 polynomial
        let mut x = ((crc >> 8) ^ (byte as u16)) & 0xFF;
        x ^= x >> 4;
        crc = (crc << 8) ^ (x << 12) ^ (x << 5) ^ x;
    }
    crc
}

/// Checksum of a payload's UTF-8 bytes as 4 uppercase hex digits.
pub fn checksum_hex(payload: &str) -> String {
    format!("{:04X}", crc16_ccitt_false(payload.as_bytes()))
}
