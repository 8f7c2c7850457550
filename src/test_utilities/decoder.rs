use bigint::U256;
use std::convert::TryInto;

use crate::cbor::{
    INDEFINITE_LENGTH, MAJOR_TYPE_ARRAY, MAJOR_TYPE_BYTES, MAJOR_TYPE_CONTENT_FREE,
    MAJOR_TYPE_INT, MAJOR_TYPE_MAP, MAJOR_TYPE_NEGATIVE_INT, MAJOR_TYPE_STRING, MAJOR_TYPE_TAG,
    TAG_BIG_NUM, TAG_NEGATIVE_BIG_NUM,
};

/// One decoded item from the wire subset the encoder produces. Consumers of
/// the real protocol decode positionally, and so do the tests and mocks that
/// use this reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CborItem {
    UnsignedInt(u64),
    /// the decoded value itself, i.e. -1 - the stored magnitude
    NegativeInt(i128),
    BigNum(U256),
    /// stored magnitude; the decoded value is -1 - magnitude
    NegativeBigNum(U256),
    Bytes(Vec<u8>),
    Text(String),
    ArrayStart,
    MapStart,
    Break,
}

impl CborItem {
    /// Collapse any of the four integer forms back to the number it encodes.
    /// Panics when the item is not an integer or does not fit in an i128.
    pub fn as_i128(&self) -> i128 {
        match self {
            CborItem::UnsignedInt(value) => *value as i128,
            CborItem::NegativeInt(value) => *value,
            CborItem::BigNum(value) => u128_from_u256(value) as i128,
            CborItem::NegativeBigNum(magnitude) => -1 - u128_from_u256(magnitude) as i128,
            other => panic!("not an integer item: {:?}", other),
        }
    }
}

/// Sequential reader over an encoded byte stream. Panics on malformed input;
/// it only ever reads what the in-crate encoder wrote.
pub struct CborReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> CborReader<'a> {
    pub fn new(bytes: &'a [u8]) -> CborReader<'a> {
        CborReader { bytes, position: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.position == self.bytes.len()
    }

    pub fn read_item(&mut self) -> CborItem {
        let initial = self.read_byte();
        let major_type = initial >> 5;
        let length_class = initial & 0x1F;
        match major_type {
            MAJOR_TYPE_INT => CborItem::UnsignedInt(self.read_length(length_class)),
            MAJOR_TYPE_NEGATIVE_INT => {
                CborItem::NegativeInt(-1 - self.read_length(length_class) as i128)
            }
            MAJOR_TYPE_BYTES => {
                let length = self.read_length(length_class) as usize;
                CborItem::Bytes(self.read_bytes(length).to_vec())
            }
            MAJOR_TYPE_STRING => {
                let length = self.read_length(length_class) as usize;
                CborItem::Text(String::from_utf8(self.read_bytes(length).to_vec()).unwrap())
            }
            MAJOR_TYPE_ARRAY => {
                assert_eq!(length_class, INDEFINITE_LENGTH);
                CborItem::ArrayStart
            }
            MAJOR_TYPE_MAP => {
                assert_eq!(length_class, INDEFINITE_LENGTH);
                CborItem::MapStart
            }
            MAJOR_TYPE_TAG => {
                let tag = self.read_length(length_class);
                let magnitude = match self.read_item() {
                    CborItem::Bytes(bytes) => U256::from(&bytes[..]),
                    other => panic!("tagged item must carry a byte string: {:?}", other),
                };
                match tag {
                    TAG_BIG_NUM => CborItem::BigNum(magnitude),
                    TAG_NEGATIVE_BIG_NUM => CborItem::NegativeBigNum(magnitude),
                    other => panic!("unsupported tag {}", other),
                }
            }
            MAJOR_TYPE_CONTENT_FREE => {
                assert_eq!(length_class, INDEFINITE_LENGTH);
                CborItem::Break
            }
            _ => unreachable!(),
        }
    }

    fn read_length(&mut self, length_class: u8) -> u64 {
        match length_class {
            0..=23 => length_class as u64,
            24 => self.read_byte() as u64,
            25 => u16::from_be_bytes(self.read_bytes(2).try_into().unwrap()) as u64,
            26 => u32::from_be_bytes(self.read_bytes(4).try_into().unwrap()) as u64,
            27 => u64::from_be_bytes(self.read_bytes(8).try_into().unwrap()),
            other => panic!("unsupported length class {}", other),
        }
    }

    fn read_byte(&mut self) -> u8 {
        let byte = self.bytes[self.position];
        self.position += 1;
        byte
    }

    fn read_bytes(&mut self, length: usize) -> &'a [u8] {
        let slice = &self.bytes[self.position..self.position + length];
        self.position += length;
        slice
    }
}

fn u128_from_u256(value: &U256) -> u128 {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    assert_eq!(&word[..16], &[0u8; 16], "value does not fit in 128 bits");
    u128::from_be_bytes(word[16..].try_into().unwrap())
}
