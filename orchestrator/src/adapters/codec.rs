//! Register word codec
//!
//! Text on the controllers is ASCII with the first character of each pair in
//! the low byte of the register. Names are written by transliterating to
//! ASCII, padding with spaces, swapping each byte pair and packing the result
//! big-endian, which lands the first character back in the low byte.

pub use shared::decode_text;
use shared::PlcOperator;

/// Bytes of an operator name (10 words)
pub const OPERATOR_NAME_BYTES: usize = 20;
/// Words of one operator table entry: name, id, password
pub const OPERATOR_WORDS: usize = 12;

/// Map Turkish letters to their ASCII base letter, anything else non-ASCII to `?`
pub fn transliterate(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ç' => 'c',
            'Ç' => 'C',
            'ğ' => 'g',
            'Ğ' => 'G',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ş' => 's',
            'Ş' => 'S',
            'ü' => 'u',
            'Ü' => 'U',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

/// Swap every byte pair in place; a trailing odd byte stays where it is
pub fn swap_byte_pairs(bytes: &mut [u8]) {
    for pair in bytes.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// Pack bytes into registers, first byte in the high half
pub fn pack_big_endian(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

/// Encode a name into a fixed-width register block
///
/// `byte_len` is rounded up to a whole number of words.
pub fn encode_text(text: &str, byte_len: usize) -> Vec<u16> {
    let byte_len = byte_len + byte_len % 2;
    let mut bytes: Vec<u8> = transliterate(text).into_bytes();
    bytes.truncate(byte_len);
    bytes.resize(byte_len, b' ');
    swap_byte_pairs(&mut bytes);
    pack_big_endian(&bytes)
}

/// Decode one operator table entry
///
/// # Panics
/// Panics when `words` is shorter than [`OPERATOR_WORDS`].
pub fn decode_operator(slot: u8, words: &[u16]) -> PlcOperator {
    let name_words = OPERATOR_NAME_BYTES / 2;
    PlcOperator {
        slot,
        name: decode_text(&words[..name_words]),
        user_id: words[name_words],
        password: words[name_words + 1],
    }
}

/// Encode one operator table entry
pub fn encode_operator(operator: &PlcOperator) -> Vec<u16> {
    let mut words = encode_text(&operator.name, OPERATOR_NAME_BYTES);
    words.push(operator.user_id);
    words.push(operator.password);
    words
}
