//! Newline-delimited field splitting for decrypted vote blocks.

/// Lazy iterator over the `\n`-terminated fields of a buffer.
///
/// Each item spans from the current offset up to, not including, the next
/// newline. A trailing segment without a newline is yielded as the last
/// field; once the offset reaches the end of the buffer iteration stops.
/// Nothing past the last field the caller pulls is ever scanned.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.buf.len() {
            return None;
        }

        let rest = &self.buf[self.offset..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                self.offset += end + 1;
                Some(&rest[..end])
            }
            None => {
                self.offset = self.buf.len();
                Some(rest)
            }
        }
    }
}

/// Split `buf` into its newline-delimited fields.
pub fn read_fields(buf: &[u8]) -> Fields<'_> {
    Fields { buf, offset: 0 }
}

/// Decode one field, mapping every byte to the char of the same value.
pub(crate) fn field_to_string(field: &[u8]) -> String {
    field.iter().map(|&b| char::from(b)).collect()
}
