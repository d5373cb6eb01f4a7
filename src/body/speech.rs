//! The sign text shown above a being.

const MAX_SIGN_LINES: usize = 3;
const MAX_SIGN_WIDTH: usize = 60;
const MIN_SIGN_WIDTH: usize = 40;

/// Owner-supplied text, wrapped for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Speech {
    text: String,
    lines: Vec<String>,
}

impl Speech {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = wrap(&text);
        Self { text, lines }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// At most three lines, broken on whitespace between 40 and 60 columns.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

fn wrap(text: &str) -> Vec<String> {
    let mut rest: Vec<char> = text.chars().collect();
    let mut lines = Vec::new();
    while rest.len() > MAX_SIGN_WIDTH {
        let split = (MIN_SIGN_WIDTH + 1..=MAX_SIGN_WIDTH)
            .rev()
            .find(|&i| rest[i].is_whitespace())
            .unwrap_or(MAX_SIGN_WIDTH);
        let head: String = rest[..split].iter().collect();
        lines.push(head.trim().to_string());
        let tail: String = rest[split..].iter().collect();
        rest = tail.trim().chars().collect();
    }
    lines.push(rest.into_iter().collect());
    lines.truncate(MAX_SIGN_LINES);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_line() {
        let speech = Speech::new("hello");
        assert_eq!(speech.lines(), ["hello"]);
    }

    #[test]
    fn test_wraps_on_whitespace() {
        let text = "word ".repeat(30);
        let speech = Speech::new(text.clone());
        assert_eq!(speech.text(), text);
        assert_eq!(speech.lines().len(), MAX_SIGN_LINES);
        for line in speech.lines() {
            assert!(line.chars().count() <= MAX_SIGN_WIDTH);
            assert!(!line.starts_with(' '));
        }
    }

    #[test]
    fn test_hard_break_without_spaces() {
        let speech = Speech::new("x".repeat(70));
        assert_eq!(speech.lines()[0].len(), MAX_SIGN_WIDTH);
        assert_eq!(speech.lines()[1].len(), 10);
    }
}
