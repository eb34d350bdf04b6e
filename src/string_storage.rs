use crate::error::ErrorKind;

/// Byte offset of an interned string inside the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringId(u16);

impl StringId {
    pub fn offset(self) -> usize {
        self.0 as usize
    }
}

/// String pool for identifiers, literals and comments
///
/// One contiguous buffer of entries, each a length byte followed by the
/// bytes themselves, terminated by a zero byte. Interning scans the entries
/// linearly so the pool never holds two copies of the same bytes.
#[derive(Debug, Clone)]
pub struct StringPool {
    bytes: Vec<u8>,
    used: usize, // Bytes taken by entries, excluding the terminator
    capacity: usize,
}

impl StringPool {
    /// Create an empty pool holding at most `capacity` bytes of entries
    pub fn new(capacity: usize) -> Self {
        let mut bytes = Vec::with_capacity(capacity + 1);
        bytes.push(0);
        Self {
            bytes,
            used: 0,
            capacity,
        }
    }

    /// Intern a byte string and return the offset of its entry
    /// If an identical entry exists its offset is returned instead
    pub fn intern(&mut self, s: &[u8]) -> Result<StringId, ErrorKind> {
        let len = u8::try_from(s.len()).map_err(|_| ErrorKind::TooManyStrings)?;

        // Compare length first so a prefix never matches a longer entry
        let mut pos = 0;
        while pos < self.used {
            let entry_len = self.bytes[pos] as usize;
            if entry_len == s.len() && &self.bytes[pos + 1..pos + 1 + entry_len] == s {
                return Ok(StringId(pos as u16));
            }
            pos += entry_len + 1;
        }

        if self.used + s.len() + 1 > self.capacity {
            return Err(ErrorKind::TooManyStrings);
        }

        let start = self.used;
        self.bytes.truncate(start);
        self.bytes.push(len);
        self.bytes.extend_from_slice(s);
        self.bytes.push(0);
        self.used += s.len() + 1;

        Ok(StringId(start as u16))
    }

    /// Get string content by ID
    pub fn resolve(&self, id: StringId) -> &[u8] {
        let pos = id.offset();
        let len = self.bytes[pos] as usize;
        &self.bytes[pos + 1..pos + 1 + len]
    }

    /// Lossy text of an entry, for diagnostics
    pub fn text(&self, id: StringId) -> String {
        String::from_utf8_lossy(self.resolve(id)).into_owned()
    }

    /// Bytes taken by entries, length bytes included
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget every entry
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.bytes.push(0);
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_interning() {
        let mut pool = StringPool::new(64);

        let id1 = pool.intern(b"hello").unwrap();
        let id2 = pool.intern(b"world").unwrap();
        let id3 = pool.intern(b"hello").unwrap(); // Same as id1

        assert_eq!(id1, id3);
        assert_ne!(id1, id2);
        assert_eq!(pool.resolve(id1), b"hello");
        assert_eq!(pool.resolve(id2), b"world");
        assert_eq!(id1.offset(), 0);
        assert_eq!(id2.offset(), 6);
    }

    #[test]
    fn test_deduplication() {
        let mut pool = StringPool::new(64);

        pool.intern(b"foo").unwrap();
        pool.intern(b"bar").unwrap();
        pool.intern(b"foo").unwrap(); // Duplicate
        pool.intern(b"baz").unwrap();
        pool.intern(b"bar").unwrap(); // Duplicate

        // Three entries of four bytes each
        assert_eq!(pool.len(), 12);
    }

    #[test]
    fn test_prefix_does_not_match() {
        let mut pool = StringPool::new(64);

        let long = pool.intern(b"COUNTER").unwrap();
        let short = pool.intern(b"COUNT").unwrap();
        let longer = pool.intern(b"COUNTERS").unwrap();

        assert_ne!(long, short);
        assert_ne!(long, longer);
        assert_eq!(pool.resolve(short), b"COUNT");
        assert_eq!(pool.intern(b"COUNT").unwrap(), short);
    }

    #[test]
    fn test_empty_strings() {
        let mut pool = StringPool::new(16);

        let id1 = pool.intern(b"").unwrap();
        let id2 = pool.intern(b"").unwrap();
        let id3 = pool.intern(b"x").unwrap();

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(pool.resolve(id1), b"");
        assert_eq!(pool.resolve(id3), b"x");
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_capacity_counts_length_bytes() {
        let mut pool = StringPool::new(8);

        pool.intern(b"abc").unwrap(); // 4 bytes
        pool.intern(b"def").unwrap(); // 8 bytes, exactly full
        assert_eq!(pool.intern(b"g"), Err(ErrorKind::TooManyStrings));

        // Existing entries are still found when full
        assert!(pool.intern(b"abc").is_ok());
    }

    #[test]
    fn test_reset() {
        let mut pool = StringPool::new(8);
        pool.intern(b"abcdefg").unwrap();
        pool.reset();
        assert!(pool.is_empty());
        assert_eq!(pool.intern(b"xyz").unwrap().offset(), 0);
    }
}
