/// Decorative terminal pane. It never parses or runs anything: typed
/// characters collect in a line buffer, and Enter echoes the line above a
/// canned output block that is simply shown or hidden.
#[derive(Debug, Default)]
pub struct TermPane {
    pub line: String,
    pub output_visible: bool,
    pub last_command: String,
}

/// The static block revealed on Enter.
pub const CANNED_OUTPUT: &[&str] = &[
    "profile-tui — a terminal client for your profile",
    "",
    "  edit     open the profile editor",
    "  about    show this message",
    "",
    "This pane is for show; nothing you type here is executed.",
];

impl TermPane {
    pub fn new() -> Self {
        Self::default()
    }

    /// A printable keystroke. Typing dismisses any visible output before the
    /// character lands in the buffer.
    pub fn type_char(&mut self, c: char) {
        if self.output_visible {
            self.output_visible = false;
        }
        self.line.push(c);
    }

    /// No-op when the buffer is empty.
    pub fn backspace(&mut self) {
        self.line.pop();
    }

    /// Echo the buffer as the submitted command, reveal the output block,
    /// and clear the buffer.
    pub fn submit(&mut self) {
        self.last_command = std::mem::take(&mut self.line);
        self.output_visible = true;
    }

    pub fn placeholder_visible(&self) -> bool {
        self.line.is_empty()
    }
}
