//! Character level scanning with byte offsets.

/// A cursor over the input. Cloning it is cheap, which allows backtracking.
#[derive(Clone)]
pub struct Scan<'a> {
    input: &'a str,
    stream: std::str::CharIndices<'a>,
}

impl<'a> Scan<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            stream: input.char_indices(),
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn is_eof(&self) -> bool {
        self.current().is_none()
    }

    /// Return the byte-offset of the next character that would be read.
    pub fn offset(&self) -> usize {
        self.stream
            .clone()
            .next()
            .map_or(self.input.len(), |(pos, _)| pos)
    }

    pub fn current(&self) -> Option<char> {
        self.stream.clone().next().map(|(_, ch)| ch)
    }

    pub fn next(&mut self) -> Option<(usize, char)> {
        self.stream.next()
    }

    /// Consume `expected` if it is the next character.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.current() == Some(expected) {
            self.stream.next();
            true
        } else {
            false
        }
    }

    /// Consume characters up to and including the next `target`, returning its offset.
    pub fn skip_past(&mut self, target: char) -> Option<usize> {
        while let Some((pos, ch)) = self.next() {
            if ch == target {
                return Some(pos);
            }
        }
        None
    }

    /// Consume the longest prefix whose characters satisfy the predicate.
    pub fn take_while<P: Fn(char) -> bool>(&mut self, predicate: P) -> &'a str {
        let begin = self.offset();
        while let Some(ch) = self.current() {
            if predicate(ch) {
                self.stream.next();
            } else {
                break;
            }
        }
        &self.input[begin..self.offset()]
    }
}
