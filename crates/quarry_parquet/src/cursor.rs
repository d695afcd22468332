use quarry_error::{QuarryError, Result};

/// Borrowing cursor over a fixed byte buffer.
///
/// Every decode step advances the offset by exactly the number of bytes it
/// consumed. The cursor never owns the buffer.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }

    pub fn advance(&mut self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(QuarryError::new(format!(
                "Cursor advance out of bounds, offset: {}, count: {count}, size: {}",
                self.offset,
                self.buf.len()
            )));
        }
        self.offset += count;
        Ok(())
    }

    /// Read `count` bytes, advancing the cursor past them.
    pub fn read_slice(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(QuarryError::new(format!(
                "Unexpected end of buffer, offset: {}, wanted: {count}, remaining: {}",
                self.offset,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_slice(1)?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_le_bytes(bytes.try_into()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_offset() {
        let buf = [1, 2, 3, 4, 5, 6];
        let mut cursor = Cursor::new(&buf);

        assert_eq!(1, cursor.read_u8().unwrap());
        assert_eq!(&[2, 3], cursor.read_slice(2).unwrap());
        assert_eq!(3, cursor.offset());
        assert_eq!(3, cursor.remaining());
    }

    #[test]
    fn read_past_end_errors() {
        let buf = [1, 2];
        let mut cursor = Cursor::new(&buf);
        cursor.read_slice(3).unwrap_err();
        // Failed read consumes nothing.
        assert_eq!(0, cursor.offset());
    }
}
