//! Packing of coprocessor command arguments into 32-bit FIFO words.

/// Packs two 16-bit halves into one command word, low half first, which
/// is how the coprocessor expects adjacent 16-bit arguments.
pub const fn pack(lo: u16, hi: u16) -> u32 {
    (lo as u32) | (hi as u32) << 16
}

/// Returns the number of FIFO words needed to carry the given string
/// along with its terminating NUL, rounded up to a whole word.
pub const fn text_word_count(s: &str) -> usize {
    s.len() / 4 + 1
}

/// Iterator over the FIFO words carrying a string argument.
///
/// The string's bytes, followed by a terminating NUL, are packed
/// little-endian into words; the final word is padded out with zeros.
/// This never allocates: each word is assembled on demand from the
/// borrowed string.
pub struct TextWords<'a> {
    bytes: &'a [u8],
    word: usize,
    words: usize,
}

impl<'a> TextWords<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            word: 0,
            words: text_word_count(s),
        }
    }
}

impl<'a> Iterator for TextWords<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.word >= self.words {
            return None;
        }
        let base = self.word * 4;
        let mut v: u32 = 0;
        for i in 0..4 {
            let idx = base + i;
            if idx < self.bytes.len() {
                v |= (self.bytes[idx] as u32) << (i * 8);
            }
            // Bytes past the end stay zero: the first is the
            // terminating NUL, the rest are padding.
        }
        self.word += 1;
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use self::std::vec::Vec;
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(text_word_count(""), 1);
        assert_eq!(text_word_count("abc"), 1);
        assert_eq!(text_word_count("abcd"), 2);
        assert_eq!(text_word_count("Calibrating"), 3);
    }

    #[test]
    fn test_text_words() {
        let words: Vec<u32> = TextWords::new("abcd").collect();
        assert_eq!(words, std::vec![0x64636261, 0x00000000]);

        let words: Vec<u32> = TextWords::new("abc").collect();
        assert_eq!(words, std::vec![0x00636261]);

        let words: Vec<u32> = TextWords::new("").collect();
        assert_eq!(words, std::vec![0x00000000]);
    }
}
