/// Single-line text input with a char-aware cursor.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn set<T: Into<String>>(&mut self, value: T) {
        self.text = value.into().replace(['\n', '\r'], " ");
        self.cursor = self.text.len();
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch.is_control() {
            return;
        }
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.text.drain(idx..self.cursor);
            self.cursor = idx;
        }
    }

    pub fn delete_char(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.text.drain(self.cursor..self.cursor + ch.len_utf8());
        }
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Cursor position counted in chars, for placing the terminal cursor.
    pub fn cursor_column(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_places_cursor_at_end_and_flattens_newlines() {
        let mut buffer = TextBuffer::new();
        buffer.set("buy\nmilk");

        assert_eq!(buffer.as_str(), "buy milk");
        assert_eq!(buffer.cursor_column(), 8);
    }

    #[test]
    fn editing_respects_multibyte_chars() {
        let mut buffer = TextBuffer::new();
        buffer.set("café");
        buffer.move_left();
        buffer.insert_char('!');
        assert_eq!(buffer.as_str(), "caf!é");

        buffer.move_right();
        buffer.backspace();
        assert_eq!(buffer.as_str(), "caf!");

        buffer.move_home();
        buffer.delete_char();
        assert_eq!(buffer.as_str(), "af!");
        assert_eq!(buffer.cursor_column(), 0);
    }

    #[test]
    fn boundaries_are_no_ops() {
        let mut buffer = TextBuffer::new();
        buffer.backspace();
        buffer.delete_char();
        buffer.move_left();
        buffer.move_right();
        buffer.insert_char('\t');
        assert!(buffer.is_empty());
        assert_eq!(buffer.cursor_column(), 0);
    }
}
