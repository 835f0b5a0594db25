//! Terminal-agnostic keyboard input and the input line.

/// Keyboard input abstraction.
///
/// Decouples application logic from terminal libraries (crossterm, termion,
/// etc.) enabling deterministic simulation testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key (submit the line).
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Tab key.
    Tab,
    /// Escape key (quit).
    Esc,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
}

/// What a key did to the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Buffer or cursor changed.
    Edited,
    /// Enter on a non-empty line. The buffer has been cleared.
    Submitted(String),
    /// The user asked to quit.
    Quit,
    /// Nothing changed.
    Ignored,
}

/// Input line state.
///
/// The cursor counts characters, not bytes, so multi-byte input edits
/// cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    buffer: String,
    cursor: usize,
}

impl InputState {
    /// Create an empty input line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply a key to the line.
    pub fn handle_key(&mut self, key: KeyInput) -> KeyOutcome {
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_index();
                self.buffer.insert(at, c);
                self.cursor = self.cursor.saturating_add(1);
                KeyOutcome::Edited
            },
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return KeyOutcome::Ignored;
                }
                self.cursor = self.cursor.saturating_sub(1);
                let at = self.byte_index();
                self.buffer.remove(at);
                KeyOutcome::Edited
            },
            KeyInput::Delete => {
                if self.cursor >= self.len() {
                    return KeyOutcome::Ignored;
                }
                let at = self.byte_index();
                self.buffer.remove(at);
                KeyOutcome::Edited
            },
            KeyInput::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                KeyOutcome::Edited
            },
            KeyInput::Right => {
                if self.cursor < self.len() {
                    self.cursor = self.cursor.saturating_add(1);
                }
                KeyOutcome::Edited
            },
            KeyInput::Home => {
                self.cursor = 0;
                KeyOutcome::Edited
            },
            KeyInput::End => {
                self.cursor = self.len();
                KeyOutcome::Edited
            },
            KeyInput::Enter => {
                let text = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                if text.is_empty() { KeyOutcome::Ignored } else { KeyOutcome::Submitted(text) }
            },
            KeyInput::Esc => KeyOutcome::Quit,
            KeyInput::Tab | KeyInput::Up | KeyInput::Down => KeyOutcome::Ignored,
        }
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.buffer.char_indices().nth(self.cursor).map_or(self.buffer.len(), |(i, _)| i)
    }
}
