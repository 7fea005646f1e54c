use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line text input used for the search box and the page prompt.
/// The cursor counts characters, not bytes.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
    input_width: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.current_input.clear();
                self.curser_pos = 0;
                self.get()
            }
            (kc, km) => self.key(kc, km),
        }
    }

    /// Replaces the content and puts the cursor at the end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.curser_pos = self.current_input.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn set_width(&mut self, width: usize) {
        self.input_width = width;
    }

    /// The tail of the input that fits the input width, keeping the cursor visible.
    pub fn visible(&self) -> (String, usize) {
        if self.input_width == 0 || self.curser_pos < self.input_width {
            return (self.current_input.clone(), self.curser_pos);
        }
        let skip = self.curser_pos + 1 - self.input_width;
        let shown = self.current_input.chars().skip(skip).collect();
        (shown, self.curser_pos - skip)
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let at = self.byte_pos(self.curser_pos);
            self.current_input.remove(at);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            let at = self.byte_pos(self.curser_pos);
            self.current_input.remove(at);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.current_input.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.contains(KeyModifiers::CONTROL) || modifier.contains(KeyModifiers::ALT) {
            trace!("Ignoring {code:?} with {modifier:?} in input");
        } else if let Some(chr) = code.as_char() {
            let at = self.byte_pos(self.curser_pos);
            self.current_input.insert(at, chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(input: &mut Inputter, text: &str) {
        for chr in text.chars() {
            press(input, KeyCode::Char(chr));
        }
    }

    #[test]
    fn typing_and_editing() {
        let mut input = Inputter::default();
        type_text(&mut input, "promo");
        assert_eq!(input.get().input, "promo");

        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Left);
        let result = press(&mut input, KeyCode::Backspace);
        assert_eq!(result.input, "prmo");
        assert_eq!(result.curser_pos, 2);

        press(&mut input, KeyCode::Delete);
        assert_eq!(input.get().input, "pro");

        press(&mut input, KeyCode::Home);
        type_text(&mut input, "x");
        assert_eq!(input.get().input, "xpro");
        assert!(!input.get().finished);
    }

    #[test]
    fn multibyte_characters() {
        let mut input = Inputter::default();
        type_text(&mut input, "café");
        press(&mut input, KeyCode::Left);
        type_text(&mut input, "ü");
        assert_eq!(input.get().input, "cafüé");
        press(&mut input, KeyCode::End);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.get().input, "cafü");
    }

    #[test]
    fn enter_finishes_and_escape_cancels() {
        let mut input = Inputter::default();
        type_text(&mut input, "ads");
        let done = press(&mut input, KeyCode::Enter);
        assert!(done.finished);
        assert!(!done.canceled);
        assert_eq!(done.input, "ads");

        input.clear();
        type_text(&mut input, "ads");
        let canceled = press(&mut input, KeyCode::Esc);
        assert!(canceled.finished);
        assert!(canceled.canceled);
        assert_eq!(canceled.input, "");
    }

    #[test]
    fn set_places_cursor_at_end() {
        let mut input = Inputter::default();
        input.set("holiday");
        assert_eq!(input.get().curser_pos, 7);
        input.set_width(4);
        assert_eq!(input.visible(), ("day".to_string(), 3));
    }
}
