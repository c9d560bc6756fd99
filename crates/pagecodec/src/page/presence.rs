use bytes::{Bytes, BytesMut};

/// Builds a presence bitmap, one bit per row, LSB first.
#[derive(Debug, Default)]
pub struct PresenceBuilder {
    bits: BytesMut,
    len: usize,
}

impl PresenceBuilder {
    /// Number of bytes pushing another row would add.
    pub fn growth(&self) -> usize {
        usize::from(self.len % 8 == 0)
    }

    pub fn byte_len(&self) -> usize {
        self.bits.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, present: bool) {
        let bit = self.len % 8;
        if bit == 0 {
            self.bits.extend_from_slice(&[0]);
        }
        if present {
            let last = self.bits.len() - 1;
            self.bits[last] |= 1 << bit;
        }
        self.len += 1;
    }

    /// Take the bitmap and reset for the next page.
    pub fn finish(&mut self) -> Bytes {
        self.len = 0;
        self.bits.split().freeze()
    }
}

/// Reads a presence bitmap produced by `PresenceBuilder`.
#[derive(Debug)]
pub struct PresenceReader {
    bits: Bytes,
    idx: usize,
}

impl PresenceReader {
    pub fn new(bits: Bytes) -> Self {
        PresenceReader { bits, idx: 0 }
    }

    /// Number of present rows among the first `num_rows`.
    pub fn count_present(&self, num_rows: usize) -> usize {
        let full = (num_rows / 8).min(self.bits.len());
        let mut count: usize = self.bits[..full]
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum();

        let rem = num_rows % 8;
        if rem != 0 && full < self.bits.len() && full == num_rows / 8 {
            let mask = (1u8 << rem) - 1;
            count += (self.bits[full] & mask).count_ones() as usize;
        }
        count
    }

    fn get(&self, idx: usize) -> bool {
        self.bits
            .get(idx / 8)
            .is_some_and(|&byte| (byte >> (idx % 8)) & 1 == 1)
    }

    /// If the next row is present. Rows past the end of the bitmap read as
    /// absent.
    pub fn next_present(&mut self) -> bool {
        let present = self.get(self.idx);
        self.idx += 1;
        present
    }
}
