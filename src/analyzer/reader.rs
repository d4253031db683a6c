/// character cursor over the analyzed text.
#[derive(Debug, Clone, Default)]
pub struct TextReader {
    text: Vec<char>,
    position: usize,
}

impl TextReader {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// moves the cursor, clamped to the end of the text.
    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.text.len());
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.text.get(self.position).copied()
    }

    pub fn read_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        Some(c)
    }

    /// consumes `literal` if the text continues with it. leaves the cursor alone otherwise.
    pub fn read_literal(&mut self, literal: &str) -> bool {
        let mut end = self.position;
        for expected in literal.chars() {
            if self.text.get(end) != Some(&expected) {
                return false;
            }
            end += 1;
        }
        self.position = end;
        true
    }

    /// text between two cursor positions.
    pub fn substring(&self, from: usize, to: usize) -> String {
        let to = to.min(self.text.len());
        self.text[from.min(to)..to].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_are_all_or_nothing() {
        let mut reader = TextReader::new("abcd");
        assert!(reader.read_literal("ab"));
        assert_eq!(reader.position(), 2);
        assert!(!reader.read_literal("cx"));
        assert_eq!(reader.position(), 2);
        assert!(reader.read_literal("cd"));
        assert!(reader.is_at_end());
        assert_eq!(reader.read_char(), None);
    }

    #[test]
    fn positions_count_chars() {
        let mut reader = TextReader::new("ñu");
        assert_eq!(reader.read_char(), Some('ñ'));
        assert_eq!(reader.peek(), Some('u'));
        reader.set_position(10);
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.substring(0, 2), "ñu");
    }
}
