//! The text field and send button, gated together.

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character cursor.
#[derive(Debug, Default)]
pub struct InputField {
    value: String,
    cursor: usize,
    disabled: bool,
}

impl InputField {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn insert(&mut self, c: char) {
        if self.disabled {
            return;
        }
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.disabled || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.disabled || self.cursor >= self.value.chars().count() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.remove(byte_pos);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let char_count = self.value.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }
}

#[derive(Debug, Default)]
pub struct SendButton {
    disabled: bool,
}

impl SendButton {
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

/// One logical affordance over the text field and the send button.
///
/// The two controls are only ever toggled together through [`InputGate::set_disabled`],
/// so they can't disagree about whether a submission is allowed.
#[derive(Debug, Default)]
pub struct InputGate {
    field: InputField,
    send: SendButton,
}

impl InputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.field.disabled = disabled;
        self.send.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.field.disabled
    }

    pub fn field(&self) -> &InputField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut InputField {
        &mut self.field
    }

    pub fn send_button(&self) -> &SendButton {
        &self.send
    }

    /// Take the pending text, clearing the field. A disabled gate yields nothing.
    pub fn take_value(&mut self) -> String {
        if self.is_disabled() {
            return String::new();
        }
        self.field.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(gate: &mut InputGate, s: &str) {
        for c in s.chars() {
            gate.field_mut().insert(c);
        }
    }

    #[test]
    fn test_set_disabled_moves_both_controls() {
        let mut gate = InputGate::new();
        gate.set_disabled(true);
        assert!(gate.field().is_disabled());
        assert!(gate.send_button().is_disabled());

        gate.set_disabled(false);
        assert!(!gate.field().is_disabled());
        assert!(!gate.send_button().is_disabled());
    }

    #[test]
    fn test_editing_is_utf8_safe() {
        let mut gate = InputGate::new();
        type_str(&mut gate, "héllo");
        gate.field_mut().move_left();
        gate.field_mut().move_left();
        gate.field_mut().backspace();
        assert_eq!(gate.field().value(), "hélo");

        gate.field_mut().move_home();
        gate.field_mut().delete();
        assert_eq!(gate.field().value(), "élo");

        gate.field_mut().move_end();
        gate.field_mut().insert('!');
        assert_eq!(gate.field().value(), "élo!");
        assert_eq!(gate.field().cursor(), 4);
    }

    #[test]
    fn test_disabled_field_rejects_edits() {
        let mut gate = InputGate::new();
        type_str(&mut gate, "ab");
        gate.set_disabled(true);
        type_str(&mut gate, "cd");
        gate.field_mut().backspace();
        assert_eq!(gate.field().value(), "ab");
    }

    #[test]
    fn test_take_value_clears_field() {
        let mut gate = InputGate::new();
        type_str(&mut gate, "Hi");
        assert_eq!(gate.take_value(), "Hi");
        assert_eq!(gate.field().value(), "");
        assert_eq!(gate.field().cursor(), 0);
    }

    #[test]
    fn test_take_value_while_disabled_yields_nothing() {
        let mut gate = InputGate::new();
        type_str(&mut gate, "Hi");
        gate.set_disabled(true);
        assert_eq!(gate.take_value(), "");
        assert_eq!(gate.field().value(), "Hi");
    }
}
