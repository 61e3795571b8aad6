//! Byte offset to line/column conversion for rendered diagnostics.

use serde::Serialize;

/// 0-based line, and column counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// Start offsets of every line of one file.
///
/// `\n`, `\r\n` and a lone `\r` all end a line.
#[derive(Debug, Clone, Default)]
pub struct LineMap {
    starts: Vec<u32>,
}

impl LineMap {
    pub fn build(text: &str) -> Self {
        let bytes = text.as_bytes();
        let starts = std::iter::once(0)
            .chain(bytes.iter().enumerate().filter_map(|(i, &b)| {
                let ends_line = b == b'\n' || (b == b'\r' && bytes.get(i + 1) != Some(&b'\n'));
                ends_line.then_some((i + 1) as u32)
            }))
            .collect();
        LineMap { starts }
    }

    /// Offsets past the end of `text` clamp to its last position.
    pub fn offset_to_position(&self, offset: u32, text: &str) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let line_start = self.starts.get(line).map_or(0, |&s| s as usize);
        let end = (offset as usize).min(text.len());
        let character = text
            .get(line_start.min(end)..end)
            .map_or(0, |prefix| prefix.chars().count());
        Position {
            line: line as u32,
            character: character as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LineMap, Position};

    fn at(text: &str, offset: u32) -> (u32, u32) {
        let Position { line, character } = LineMap::build(text).offset_to_position(offset, text);
        (line, character)
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        let text = "class C\n{\n    string s = \"é\"; void M() { }\n}";
        let void_at = text.find("void").unwrap() as u32;
        assert_eq!(at(text, void_at), (2, 20));
        assert_eq!(at(text, 0), (0, 0));
    }

    #[test]
    fn every_line_terminator_starts_a_new_line() {
        let text = "a\r\nb\rc\nd";
        assert_eq!(at(text, 3), (1, 0));
        assert_eq!(at(text, 5), (2, 0));
        assert_eq!(at(text, 7), (3, 0));
        assert_eq!(at(text, 100), (3, 1));
    }
}
