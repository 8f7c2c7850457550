use serde::{Deserialize, Serialize};

/// Backing storage is kept at a multiple of this so appends stay word-aligned.
pub const WORD_SIZE: usize = 32;

/// A growable byte sequence with an explicit logical length over a zero-filled
/// backing store. Appends past the current capacity resize the store to
/// `max(needed, 2 * capacity)`, rounded up to the next multiple of
/// `WORD_SIZE`; existing bytes are preserved and the new region is zero-filled
/// until overwritten.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    length: usize,
}

impl ByteBuffer {
    pub fn new() -> ByteBuffer {
        ByteBuffer {
            data: vec![],
            length: 0,
        }
    }

    /// Create a buffer whose backing store already covers `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> ByteBuffer {
        ByteBuffer {
            data: vec![0; round_up_to_word(capacity)],
            length: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The logical contents: everything appended so far, nothing more.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.length]
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        self.data.truncate(self.length);
        self.data
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.make_room_for(1);
        self.data[self.length] = byte;
        self.length += 1;
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.make_room_for(bytes.len());
        self.data[self.length..self.length + bytes.len()].copy_from_slice(bytes);
        self.length += bytes.len();
    }

    /// Append `value` big-endian, left-padded with zeros to exactly `width`
    /// bytes. Width is one of 1, 2, 4, 8 or 32. A value wider than `width`
    /// loses its high-order bytes: fit is the caller's invariant, not a
    /// runtime check.
    pub fn append_int(&mut self, value: u64, width: usize) {
        let be_bytes = value.to_be_bytes();
        if width <= 8 {
            self.append_bytes(&be_bytes[8 - width..]);
        } else {
            self.append_bytes(&vec![0; width - 8]);
            self.append_bytes(&be_bytes);
        }
    }

    fn make_room_for(&mut self, additional: usize) {
        let needed = self.length + additional;
        if needed <= self.data.len() {
            return;
        }
        let new_capacity = round_up_to_word(std::cmp::max(needed, 2 * self.data.len()));
        self.data.resize(new_capacity, 0);
    }
}

fn round_up_to_word(size: usize) -> usize {
    match size % WORD_SIZE {
        0 => size,
        remainder => size + WORD_SIZE - remainder,
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn append_byte_growth_test() {
        let mut buffer = ByteBuffer::new();
        assert_eq!(buffer.capacity(), 0);
        assert!(buffer.is_empty());

        buffer.append_byte(7);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.capacity(), WORD_SIZE);
        assert_eq!(buffer.as_slice(), &[7]);

        for i in 0..32 {
            buffer.append_byte(i);
        }
        // 33 bytes needed, doubling wins over the minimum
        assert_eq!(buffer.len(), 33);
        assert_eq!(buffer.capacity(), 2 * WORD_SIZE);
    }

    #[test]
    fn append_bytes_large_jump_test() {
        let mut buffer = ByteBuffer::new();
        buffer.append_bytes(&[1; 200]);
        assert_eq!(buffer.len(), 200);
        // needed exceeds double-the-capacity, so needed wins, word-rounded
        assert_eq!(buffer.capacity(), 224);
        assert_eq!(buffer.as_slice(), &[1; 200][..]);

        buffer.append_bytes(&[2; 8]);
        assert_eq!(buffer.len(), 208);
        assert_eq!(buffer.capacity(), 224);
        assert_eq!(&buffer.as_slice()[200..], &[2; 8]);
        assert_eq!(&buffer.as_slice()[..200], &[1; 200][..]);
    }

    #[test]
    fn with_capacity_test() {
        let buffer = ByteBuffer::with_capacity(100);
        assert_eq!(buffer.capacity(), 128);
        assert_eq!(buffer.len(), 0);

        let mut buffer = ByteBuffer::with_capacity(64);
        buffer.append_bytes(&[9; 64]);
        assert_eq!(buffer.capacity(), 64);
    }

    #[test]
    fn append_int_widths_test() {
        let mut buffer = ByteBuffer::new();
        buffer.append_int(0xAB, 1);
        buffer.append_int(0xABCD, 2);
        buffer.append_int(0xABCD_EF01, 4);
        buffer.append_int(0xABCD_EF01_2345_6789, 8);
        assert_eq!(
            buffer.as_slice(),
            &[
                0xAB, 0xAB, 0xCD, 0xAB, 0xCD, 0xEF, 0x01, 0xAB, 0xCD, 0xEF, 0x01, 0x23, 0x45,
                0x67, 0x89
            ]
        );
    }

    #[test]
    fn append_int_word_width_test() {
        let mut buffer = ByteBuffer::new();
        buffer.append_int(0x0102, 32);
        let mut expected = [0u8; 32];
        expected[30] = 0x01;
        expected[31] = 0x02;
        assert_eq!(buffer.as_slice(), &expected);
    }

    #[test]
    fn append_int_truncation_test() {
        let mut buffer = ByteBuffer::new();
        buffer.append_int(0x0102, 1);
        assert_eq!(buffer.as_slice(), &[0x02]);
    }

    #[test]
    fn into_vec_test() {
        let mut buffer = ByteBuffer::with_capacity(64);
        buffer.append_bytes(&[5, 6, 7]);
        assert_eq!(buffer.into_vec(), vec![5, 6, 7]);
    }
}
