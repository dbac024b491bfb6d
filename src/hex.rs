//! Hex rendering of binary payloads, plus a few byte helpers.
//!
//! Used by the exchanger to dump requests and responses into the log.
//!
//! ```
//! use tcp_exchanger::hex;
//!
//! assert_eq!(hex::encode(&[0x00, 0x05, 0xAB]), "0005AB");
//! assert_eq!(hex::decode("0005ab"), Some(vec![0x00, 0x05, 0xAB]));
//! assert_eq!(hex::decode("0G"), None);
//! ```

const ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Number of entries in the decode table; codes at or above are rejected.
const TABLE_LEN: usize = 128;

const INVALID: i8 = -1;

const DECODE_TABLE: [i8; TABLE_LEN] = build_decode_table();

const fn build_decode_table() -> [i8; TABLE_LEN] {
    let mut table = [INVALID; TABLE_LEN];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as i8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'A' as usize + i] = (10 + i) as i8;
        table[b'a' as usize + i] = (10 + i) as i8;
        i += 1;
    }
    table
}

/// Encode bytes as uppercase hex, two characters per byte, no separators.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for &b in data {
        out.push(ALPHABET[(b >> 4) as usize] as char);
        out.push(ALPHABET[(b & 0x0F) as usize] as char);
    }
    out
}

/// Encode an optional buffer; absent stays absent.
pub fn encode_opt(data: Option<&[u8]>) -> Option<String> {
    data.map(encode)
}

/// Decode hex text (either case) into bytes.
///
/// Returns `None` for odd-length input or any character that is not a hex
/// digit. Empty input decodes to an empty vector.
pub fn decode(encoded: &str) -> Option<Vec<u8>> {
    let raw = encoded.as_bytes();
    if raw.len() % 2 != 0 {
        return None;
    }

    let mut out = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks_exact(2) {
        let hi = nibble(pair[0])?;
        let lo = nibble(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Some(out)
}

/// Decode optional hex text; absent stays absent.
pub fn decode_opt(encoded: Option<&str>) -> Option<Vec<u8>> {
    encoded.and_then(decode)
}

fn nibble(c: u8) -> Option<u8> {
    match DECODE_TABLE.get(c as usize) {
        Some(&v) if v != INVALID => Some(v as u8),
        _ => None,
    }
}

/// Big-endian bytes of a 32-bit integer.
pub fn to_byte_array(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Byte-wise exclusive-or of two 8-byte blocks.
pub fn xor(a: &[u8; 8], b: &[u8; 8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (i, o) in out.iter_mut().enumerate() {
        *o = a[i] ^ b[i];
    }
    out
}
