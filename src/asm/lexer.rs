//! Splits assembly source into words, comments and line breaks.
// Cursor layout follows `rustc_lexer`.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

const EOF_CHAR: char = '\0';

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonic, register, literal, label use or label definition
    Word,
    /// From `#` up to the end of the line
    Comment,
    /// Also includes commas
    Whitespace,
    Newline,
    Eof,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, len: u32) -> Self {
        Token { kind, len }
    }
}

/// Peekable iterator over a char sequence.
pub struct Cursor<'a> {
    len_remaining: usize,
    chars: Chars<'a>,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            chars: input.chars(),
        }
    }

    /// Peek the next char without consuming it, `EOF_CHAR` at the end.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Bytes consumed since the last `reset_pos`.
    pub fn pos_in_token(&self) -> u32 {
        (self.len_remaining - self.chars.as_str().len()) as u32
    }

    pub fn reset_pos(&mut self) {
        self.len_remaining = self.chars.as_str().len();
    }

    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    pub fn advance_token(&mut self) -> Token {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, 0),
        };
        let kind = match first_char {
            '\n' => TokenKind::Newline,
            '#' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            _ => {
                self.take_while(is_word);
                TokenKind::Word
            }
        };
        let res = Token::new(kind, self.pos_in_token());
        self.reset_pos();
        res
    }
}

pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);
    std::iter::from_fn(move || {
        let token = cursor.advance_token();
        if token.kind != TokenKind::Eof {
            Some(token)
        } else {
            None
        }
    })
}

/// Commas separate operands the same way spaces do.
pub(crate) fn is_whitespace(c: char) -> bool {
    c != '\n' && (c.is_whitespace() || c == ',')
}

pub(crate) fn is_word(c: char) -> bool {
    !(c == '\n' || c == '#' || is_whitespace(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(input: &str) -> Vec<(TokenKind, u32)> {
        tokenize(input).map(|t| (t.kind, t.len)).collect()
    }

    #[test]
    fn words_and_separators() {
        assert_eq!(
            kinds("LDR R0, 5\n"),
            vec![
                (Word, 3),
                (Whitespace, 1),
                (Word, 2),
                (Whitespace, 2),
                (Word, 1),
                (Newline, 1)
            ]
        );
    }

    #[test]
    fn comment_runs_to_line_end() {
        assert_eq!(
            kinds("HLT# stop, here\nRET"),
            vec![(Word, 3), (Comment, 12), (Newline, 1), (Word, 3)]
        );
    }

    #[test]
    fn crlf_and_label() {
        assert_eq!(
            kinds("LOOP:\r\n"),
            vec![(Word, 5), (Whitespace, 1), (Newline, 1)]
        );
    }

    #[test]
    fn multibyte_lengths() {
        assert_eq!(kinds("é,x"), vec![(Word, 2), (Whitespace, 1), (Word, 1)]);
    }
}
