#![forbid(unsafe_code)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single-line text field with a char-indexed cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(initial: impl Into<String>) -> Self {
        let text = initial.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, text: impl Into<String>) {
        *self = Self::new(text);
    }

    pub fn insert_char(&mut self, c: char) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        chars.insert(cur, c);
        self.text = chars.into_iter().collect();
        self.cursor = cur + 1;
    }

    pub fn backspace(&mut self) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        if cur == 0 {
            return;
        }
        chars.remove(cur - 1);
        self.text = chars.into_iter().collect();
        self.cursor = cur - 1;
    }

    pub fn delete(&mut self) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        if cur >= chars.len() {
            return;
        }
        chars.remove(cur);
        self.text = chars.into_iter().collect();
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.text.chars().count();
        self.cursor = (self.cursor + 1).min(len);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Applies an editing key. Returns false if the key was not consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            KeyCode::Char(c)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.insert_char(c);
            }
            _ => return false,
        }
        true
    }

    /// The part of the text that fits in `width` columns, scrolled so the
    /// cursor stays visible, and the cursor column within it.
    #[must_use]
    pub fn window(&self, width: usize) -> (String, u16) {
        let cursor = self.cursor.min(self.text.chars().count());
        if width == 0 {
            return (String::new(), 0);
        }
        let offset = cursor.saturating_sub(width - 1);
        let visible = self.text.chars().skip(offset).take(width).collect();
        let col = u16::try_from(cursor - offset).unwrap_or(u16::MAX);
        (visible, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn edits_in_the_middle_of_multibyte_text() {
        let mut input = TextInput::new("Reunião");
        input.move_left();
        input.move_left();
        input.insert_char('X');
        assert_eq!(input.as_str(), "ReuniXão");
        input.backspace();
        input.delete();
        assert_eq!(input.as_str(), "Reunio");
        assert_eq!(input.cursor(), 5);
    }

    #[test]
    fn ignores_control_chords() {
        let mut input = TextInput::new("");
        assert!(input.handle_key(key(KeyCode::Char('a'))));
        assert!(!input.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)));
        assert!(!input.handle_key(key(KeyCode::Enter)));
        assert_eq!(input.as_str(), "a");
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = TextInput::new("ab");
        input.move_right();
        assert_eq!(input.cursor(), 2);
        input.move_home();
        input.backspace();
        assert_eq!(input.as_str(), "ab");
        input.move_end();
        input.delete();
        assert_eq!(input.window(10), ("ab".to_owned(), 2));
    }

    #[test]
    fn window_scrolls_to_keep_cursor_visible() {
        let mut input = TextInput::new("abcdefgh");
        assert_eq!(input.window(4), ("fgh".to_owned(), 3));
        input.move_home();
        assert_eq!(input.window(4), ("abcd".to_owned(), 0));
        input.move_right();
        input.move_right();
        assert_eq!(input.window(4), ("abcd".to_owned(), 2));
        assert_eq!(input.window(0), (String::new(), 0));
    }
}
