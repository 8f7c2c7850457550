use crate::bytebuffer::ByteBuffer;
use bigint::U256;

//
// A CBOR header is one byte: the top 3 bits carry the major type, the bottom
// 5 bits carry the length class. Only the subset needed for request
// parameters is implemented here: integers, byte/text strings, the two
// big-number tags, and indefinite-length arrays/maps with their break code.
//
pub const MAJOR_TYPE_INT: u8 = 0;
pub const MAJOR_TYPE_NEGATIVE_INT: u8 = 1;
pub const MAJOR_TYPE_BYTES: u8 = 2;
pub const MAJOR_TYPE_STRING: u8 = 3;
pub const MAJOR_TYPE_ARRAY: u8 = 4;
pub const MAJOR_TYPE_MAP: u8 = 5;
pub const MAJOR_TYPE_TAG: u8 = 6;
pub const MAJOR_TYPE_CONTENT_FREE: u8 = 7;

/// tag announcing an unsigned big number carried as a byte string
pub const TAG_BIG_NUM: u64 = 2;
/// tag announcing a negative big number carried as a byte string of -1 - n
pub const TAG_NEGATIVE_BIG_NUM: u64 = 3;

/// length class marking an indefinite-length item, and the break code
pub const INDEFINITE_LENGTH: u8 = 31;

/// Append a header for `major_type` covering `value`, using the smallest
/// representation: the value itself in the bottom 5 bits when it is 23 or
/// less, otherwise length class 24/25/26/27 followed by the value as a
/// 1/2/4/8-byte big-endian integer. Values past the 8-byte range are not
/// representable here; callers route those to big-number tagging instead.
pub fn encode_type_and_length(buffer: &mut ByteBuffer, major_type: u8, value: u64) {
    if value <= 23 {
        buffer.append_byte((major_type << 5) | (value as u8));
    } else if value <= 0xFF {
        buffer.append_byte((major_type << 5) | 24);
        buffer.append_int(value, 1);
    } else if value <= 0xFFFF {
        buffer.append_byte((major_type << 5) | 25);
        buffer.append_int(value, 2);
    } else if value <= 0xFFFF_FFFF {
        buffer.append_byte((major_type << 5) | 26);
        buffer.append_int(value, 4);
    } else {
        buffer.append_byte((major_type << 5) | 27);
        buffer.append_int(value, 8);
    }
}

pub fn encode_uint(buffer: &mut ByteBuffer, value: u64) {
    encode_type_and_length(buffer, MAJOR_TYPE_INT, value);
}

/// Append a signed integer. Values inside `[-2^64, 2^64 - 1]` use the plain
/// integer major types (a negative n is stored as -1 - n, so there is no
/// negative zero); values outside fall back to the tagged big-number forms.
pub fn encode_int(buffer: &mut ByteBuffer, value: i128) {
    if value > u64::MAX as i128 {
        encode_big_num(buffer, u256_from_u128(value as u128));
    } else if value < -(u64::MAX as i128) - 1 {
        // -1 - value, computed in two's complement so i128::MIN cannot overflow
        let magnitude = !(value as u128);
        encode_negative_big_num(buffer, u256_from_u128(magnitude));
    } else if value >= 0 {
        encode_type_and_length(buffer, MAJOR_TYPE_INT, value as u64);
    } else {
        encode_type_and_length(buffer, MAJOR_TYPE_NEGATIVE_INT, (-1 - value) as u64);
    }
}

/// Append an unsigned number of up to 256 bits as a tagged byte string of its
/// big-endian magnitude.
pub fn encode_big_num(buffer: &mut ByteBuffer, value: U256) {
    encode_type_and_length(buffer, MAJOR_TYPE_TAG, TAG_BIG_NUM);
    encode_word(buffer, value);
}

/// Append a negative big number. `magnitude` is -1 - n for the number n being
/// encoded.
pub fn encode_negative_big_num(buffer: &mut ByteBuffer, magnitude: U256) {
    encode_type_and_length(buffer, MAJOR_TYPE_TAG, TAG_NEGATIVE_BIG_NUM);
    encode_word(buffer, magnitude);
}

pub fn encode_bytes(buffer: &mut ByteBuffer, value: &[u8]) {
    encode_type_and_length(buffer, MAJOR_TYPE_BYTES, value.len() as u64);
    buffer.append_bytes(value);
}

pub fn encode_string(buffer: &mut ByteBuffer, value: &str) {
    encode_type_and_length(buffer, MAJOR_TYPE_STRING, value.len() as u64);
    buffer.append_bytes(value.as_bytes());
}

/// Open an indefinite-length array. No element count is pre-declared; the
/// caller closes it with `end_sequence` and is responsible for nesting.
pub fn start_array(buffer: &mut ByteBuffer) {
    buffer.append_byte((MAJOR_TYPE_ARRAY << 5) | INDEFINITE_LENGTH);
}

/// Open an indefinite-length map. Pairs stream in insertion order.
pub fn start_map(buffer: &mut ByteBuffer) {
    buffer.append_byte((MAJOR_TYPE_MAP << 5) | INDEFINITE_LENGTH);
}

/// Close the most recently opened indefinite-length array or map.
pub fn end_sequence(buffer: &mut ByteBuffer) {
    buffer.append_byte((MAJOR_TYPE_CONTENT_FREE << 5) | INDEFINITE_LENGTH);
}

fn encode_word(buffer: &mut ByteBuffer, value: U256) {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    encode_bytes(buffer, &word);
}

fn u256_from_u128(value: u128) -> U256 {
    U256::from(&value.to_be_bytes()[..])
}
