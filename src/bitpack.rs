//! Bit packing utilities.
//!
//! `BitPack` is a cursor over a byte buffer that reads and writes
//! variable-width unsigned integers least-significant bit first. Writing one
//! bit per row produces a null bitmap whose bit `i % 8` of byte `i / 8`
//! belongs to row `i`; reading 8, 16 or 32 bits at a byte boundary yields the
//! little-endian integer fields of the wire format.

use crate::error::IonicError;

/// Maximum number of bits that can be read or written in a single operation.
pub const MAX_BITS: usize = 32;

/// Number of bits in a byte.
const BYTE_BITS: usize = 8;

/// A bit packer for reading and writing variable-width integers.
///
/// This supports both reading from a byte slice and writing to a growable Vec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitPack<B> {
    buff: B,
    cursor: usize,
    bits: usize,
}

impl<B> BitPack<B> {
    /// Create a new BitPack with the given buffer.
    #[inline]
    pub fn new(buff: B) -> Self {
        BitPack {
            buff,
            cursor: 0,
            bits: 0,
        }
    }

    /// Get the total number of bits processed so far.
    #[inline]
    pub fn sum_bits(&self) -> usize {
        self.cursor * BYTE_BITS + self.bits
    }

    /// Whether the cursor sits on a byte boundary.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.bits == 0
    }
}

impl<B: AsRef<[u8]>> BitPack<B> {
    /// Get a reference to the underlying buffer as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.buff.as_ref()
    }
}

// Reading operations for byte slices
impl<'a> BitPack<&'a [u8]> {
    /// Read `bits` bits from the buffer and return as u32.
    ///
    /// Returns `MalformedBatch` if fewer than `bits` bits remain.
    pub fn read(&mut self, mut bits: usize) -> Result<u32, IonicError> {
        if bits > MAX_BITS {
            return Err(IonicError::LimitExceeded {
                what: "bit width",
                value: bits,
                limit: MAX_BITS,
            });
        }
        if self.buff.len() * BYTE_BITS < self.sum_bits() + bits {
            return Err(IonicError::malformed(format!(
                "needed {} bits, only {} available",
                bits,
                self.buff.len() * BYTE_BITS - self.sum_bits()
            )));
        }

        let mut bits_left = 0u32;
        let mut output = 0u32;

        while bits > 0 {
            let byte_left = BYTE_BITS - self.bits;
            let take = bits.min(byte_left);

            let mut bb = self.buff[self.cursor] as u32;
            bb >>= self.bits as u32;
            bb &= (1u32 << take) - 1;
            output |= bb << bits_left;

            self.bits += take;
            bits_left += take as u32;
            bits -= take;

            if self.bits == BYTE_BITS {
                self.cursor += 1;
                self.bits = 0;
            }
        }

        Ok(output)
    }

    /// Read a single bit as a bool.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool, IonicError> {
        Ok(self.read(1)? == 1)
    }

    /// Read `n` whole bytes, borrowing them from the underlying buffer.
    ///
    /// The cursor must be byte aligned.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], IonicError> {
        if !self.is_aligned() {
            return Err(IonicError::malformed("byte read at unaligned bit position"));
        }
        let remaining = self.remaining_bytes();
        if n > remaining {
            return Err(IonicError::malformed(format!(
                "declared length {} exceeds the {} remaining bytes",
                n, remaining
            )));
        }
        let buff: &'a [u8] = self.buff;
        let output = &buff[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(output)
    }

    /// Whole bytes left after the cursor.
    #[inline]
    pub fn remaining_bytes(&self) -> usize {
        let consumed = self.cursor + usize::from(self.bits > 0);
        self.buff.len().saturating_sub(consumed)
    }
}

// Writing operations for mutable byte slices
impl BitPack<&mut [u8]> {
    /// Write `bits` bits of `value` to the buffer.
    pub fn write(&mut self, mut value: u32, mut bits: usize) -> Result<(), IonicError> {
        if bits > MAX_BITS {
            return Err(IonicError::LimitExceeded {
                what: "bit width",
                value: bits,
                limit: MAX_BITS,
            });
        }
        if self.buff.len() * BYTE_BITS < self.sum_bits() + bits {
            return Err(IonicError::LimitExceeded {
                what: "bit position",
                value: self.sum_bits() + bits,
                limit: self.buff.len() * BYTE_BITS,
            });
        }

        if bits < MAX_BITS {
            value &= (1u32 << bits) - 1;
        }

        while bits > 0 {
            let bits_left = BYTE_BITS - self.bits;
            let take = bits.min(bits_left);

            let bb = value & ((1u32 << take) - 1);
            self.buff[self.cursor] |= (bb as u8) << self.bits as u8;
            self.bits += take;
            value = value.checked_shr(take as u32).unwrap_or(0);
            bits -= take;

            if self.bits == BYTE_BITS {
                self.cursor += 1;
                self.bits = 0;
            }
        }

        Ok(())
    }
}

impl Default for BitPack<Vec<u8>> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

// Writing operations for growable Vec
impl BitPack<Vec<u8>> {
    /// Create a new BitPack with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Vec::with_capacity(capacity))
    }

    /// Write `bits` bits of `value` to the buffer.
    ///
    /// The buffer will grow as needed; new bytes start zeroed.
    #[inline]
    pub fn write(&mut self, value: u32, bits: usize) -> Result<(), IonicError> {
        if bits > MAX_BITS {
            return Err(IonicError::LimitExceeded {
                what: "bit width",
                value: bits,
                limit: MAX_BITS,
            });
        }

        let len = self.buff.len();
        if let Some(bits_needed) = (self.sum_bits() + bits).checked_sub(len * BYTE_BITS) {
            self.buff.resize(len + bits_needed.div_ceil(BYTE_BITS), 0x0);
        }

        let mut bitpack = BitPack {
            buff: self.buff.as_mut_slice(),
            cursor: self.cursor,
            bits: self.bits,
        };

        bitpack.write(value, bits)?;

        self.bits = bitpack.bits;
        self.cursor = bitpack.cursor;

        Ok(())
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<(), IonicError> {
        self.write(u32::from(bit), 1)
    }

    /// Consume the BitPack and return the underlying buffer.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::with_capacity(8);
        bitpack_vec.write(10, 4).unwrap();
        bitpack_vec.write(1021, 10).unwrap();
        bitpack_vec.write(3, 2).unwrap();

        let mut bitpack = BitPack::<&[u8]>::new(bitpack_vec.as_slice());
        assert_eq!(bitpack.read(4).unwrap(), 10);
        assert_eq!(bitpack.read(10).unwrap(), 1021);
        assert_eq!(bitpack.read(2).unwrap(), 3);
    }

    #[test]
    fn test_single_bits_are_lsb_first() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::with_capacity(1);
        bitpack_vec.write_bit(true).unwrap();
        bitpack_vec.write_bit(false).unwrap();
        bitpack_vec.write_bit(true).unwrap();

        assert_eq!(bitpack_vec.as_slice(), &[0b0000_0101]);

        let mut bitpack = BitPack::<&[u8]>::new(bitpack_vec.as_slice());
        assert!(bitpack.read_bit().unwrap());
        assert!(!bitpack.read_bit().unwrap());
        assert!(bitpack.read_bit().unwrap());
    }

    #[test]
    fn test_growth_is_ceil_of_bits() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::default();
        for _ in 0..9 {
            bitpack_vec.write_bit(true).unwrap();
        }
        assert_eq!(bitpack_vec.into_vec(), vec![0xFF, 0x01]);
    }

    #[test]
    fn test_read_little_endian_fields() {
        let bytes = [0x02, 0x00, 0x03, 0x00, 0x00, 0x00, 0xAB];
        let mut bitpack = BitPack::<&[u8]>::new(&bytes);
        assert_eq!(bitpack.read(16).unwrap(), 2);
        assert_eq!(bitpack.read(32).unwrap(), 3);
        assert_eq!(bitpack.read(8).unwrap(), 0xAB);
        assert_eq!(bitpack.remaining_bytes(), 0);
    }

    #[test]
    fn test_full_width_write() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::default();
        bitpack_vec.write(0xDEAD_BEEF, 32).unwrap();
        assert_eq!(bitpack_vec.as_slice(), &0xDEAD_BEEFu32.to_le_bytes());
    }

    #[test]
    fn test_read_bytes() {
        let bytes = [1u8, 2, 3, 4];
        let mut bitpack = BitPack::<&[u8]>::new(&bytes);
        assert_eq!(bitpack.read_bytes(3).unwrap(), &[1, 2, 3]);
        assert_eq!(bitpack.remaining_bytes(), 1);
        assert!(matches!(
            bitpack.read_bytes(2),
            Err(IonicError::MalformedBatch(_))
        ));
    }

    #[test]
    fn test_read_past_end() {
        let bytes = [0u8; 3];
        let mut bitpack = BitPack::<&[u8]>::new(&bytes);
        assert!(matches!(bitpack.read(32), Err(IonicError::MalformedBatch(_))));
    }

    #[test]
    fn test_bit_width_exceeded() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::with_capacity(8);
        let result = bitpack_vec.write(0, 33);
        assert!(matches!(
            result,
            Err(IonicError::LimitExceeded { value: 33, .. })
        ));
    }
}
