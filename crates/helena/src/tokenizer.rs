//! Character stream to token stream conversion.
//!
//! The tokenizer is total: malformed input never fails, it degrades to plain
//! text tokens. Every token records its starting position and byte length so
//! later stages can recover the raw source slice (block morphemes, verbatim
//! string forms) independently of the post-escape literal.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// A position in the source text.
///
/// `index` is a byte offset into the source; `line` and `column` are
/// 0-based and count characters, not bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

/// Kinds of lexical tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum TokenKind {
    /// Run of horizontal whitespace: space, tab, carriage return, form feed.
    Whitespace,
    /// A single line feed.
    Newline,
    /// Backslash immediately followed by a line feed, plus any trailing
    /// horizontal whitespace. Reported with a single-space literal.
    Continuation,
    /// Run of ordinary characters.
    Text,
    /// A recognized backslash escape; the literal holds the decoded form.
    Escape,
    /// Run of one or more consecutive double quotes.
    StringDelimiter,
    Dollar,
    OpenTuple,
    CloseTuple,
    OpenBlock,
    CloseBlock,
    OpenExpression,
    CloseExpression,
    /// Run of one or more `#` characters.
    Comment,
    Semicolon,
    Asterisk,
}

/// A lexical token: kind, start position, byte length, post-escape literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub position: SourcePosition,
    pub len: usize,
    pub literal: String,
}

impl Token {
    /// The raw source slice this token was produced from.
    #[must_use]
    pub fn raw<'a>(&self, source: &'a str) -> &'a str {
        &source[self.position.index..self.position.index + self.len]
    }
}

/// Tokenizes a full source string.
#[must_use]
pub fn tokenize(source: &str) -> Vec<Token> {
    Tokenizer::new(source).tokenize()
}

/// Streaming tokenizer over a source string.
pub struct Tokenizer<'a> {
    source: &'a str,
    index: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            index: 0,
            line: 0,
            column: 0,
        }
    }

    /// Consumes the whole source and returns its tokens.
    #[must_use]
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        // Start byte index of a pending text run, if any. Unrecognized escape
        // sequences degrade into this run rather than failing.
        let mut text_start: Option<(usize, SourcePosition)> = None;

        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.flush_text(&mut tokens, &mut text_start);
                    let start = self.position();
                    while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\x0c')) {
                        self.bump();
                    }
                    self.emit(&mut tokens, TokenKind::Whitespace, start, None);
                }
                '\n' => {
                    self.flush_text(&mut tokens, &mut text_start);
                    let start = self.position();
                    self.bump();
                    self.emit(&mut tokens, TokenKind::Newline, start, None);
                }
                '"' => {
                    self.flush_text(&mut tokens, &mut text_start);
                    let start = self.position();
                    while self.peek() == Some('"') {
                        self.bump();
                    }
                    self.emit(&mut tokens, TokenKind::StringDelimiter, start, None);
                }
                '#' => {
                    self.flush_text(&mut tokens, &mut text_start);
                    let start = self.position();
                    while self.peek() == Some('#') {
                        self.bump();
                    }
                    self.emit(&mut tokens, TokenKind::Comment, start, None);
                }
                '\\' => self.escape(&mut tokens, &mut text_start),
                '$' | '(' | ')' | '{' | '}' | '[' | ']' | ';' | '*' => {
                    self.flush_text(&mut tokens, &mut text_start);
                    let start = self.position();
                    self.bump();
                    let kind = match c {
                        '$' => TokenKind::Dollar,
                        '(' => TokenKind::OpenTuple,
                        ')' => TokenKind::CloseTuple,
                        '{' => TokenKind::OpenBlock,
                        '}' => TokenKind::CloseBlock,
                        '[' => TokenKind::OpenExpression,
                        ']' => TokenKind::CloseExpression,
                        ';' => TokenKind::Semicolon,
                        _ => TokenKind::Asterisk,
                    };
                    self.emit(&mut tokens, kind, start, None);
                }
                _ => {
                    if text_start.is_none() {
                        text_start = Some((self.index, self.position()));
                    }
                    self.bump();
                }
            }
        }
        self.flush_text(&mut tokens, &mut text_start);
        tokens
    }

    /// Handles a backslash. Recognized escapes become `Escape` (or
    /// `Continuation`) tokens; everything else degrades to text.
    fn escape(&mut self, tokens: &mut Vec<Token>, text_start: &mut Option<(usize, SourcePosition)>) {
        let rest = &self.source[self.index + 1..];
        if rest.starts_with('\n') {
            self.flush_text(tokens, text_start);
            let start = self.position();
            self.bump();
            self.bump();
            while matches!(self.peek(), Some(' ' | '\t')) {
                self.bump();
            }
            self.emit(tokens, TokenKind::Continuation, start, Some(" ".to_owned()));
            return;
        }
        if let Some((decoded, extra)) = decode_escape(rest) {
            self.flush_text(tokens, text_start);
            let start = self.position();
            for _ in 0..=extra {
                self.bump();
            }
            self.emit(tokens, TokenKind::Escape, start, Some(decoded.to_string()));
            return;
        }
        // Unrecognized: the backslash joins the current text run and the
        // following characters are scanned normally.
        if text_start.is_none() {
            *text_start = Some((self.index, self.position()));
        }
        self.bump();
    }

    fn flush_text(&mut self, tokens: &mut Vec<Token>, text_start: &mut Option<(usize, SourcePosition)>) {
        if let Some((start_index, position)) = text_start.take() {
            let raw = &self.source[start_index..self.index];
            tokens.push(Token {
                kind: TokenKind::Text,
                position,
                len: self.index - start_index,
                literal: raw.to_owned(),
            });
        }
    }

    /// Pushes a token spanning from `start` to the current position. Without
    /// an explicit literal the raw source slice is used.
    fn emit(&mut self, tokens: &mut Vec<Token>, kind: TokenKind, start: SourcePosition, literal: Option<String>) {
        let len = self.index - start.index;
        let literal = literal.unwrap_or_else(|| self.source[start.index..self.index].to_owned());
        tokens.push(Token {
            kind,
            position: start,
            len,
            literal,
        });
    }

    fn position(&self) -> SourcePosition {
        SourcePosition {
            index: self.index,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}

/// Decodes a recognized escape from the characters following a backslash.
///
/// Returns the decoded character and the number of characters consumed after
/// the backslash, or `None` when the sequence is not a recognized escape
/// (including numeric forms with no digits or an invalid code point).
fn decode_escape(rest: &str) -> Option<(char, usize)> {
    let mut chars = rest.chars();
    let first = chars.next()?;
    let simple = match first {
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0c'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\x0b'),
        '\\' => Some('\\'),
        _ => None,
    };
    if let Some(c) = simple {
        return Some((c, 1));
    }
    match first {
        '0'..='7' => {
            let mut value = 0u32;
            let mut count = 0;
            for c in rest.chars().take(3) {
                match c.to_digit(8) {
                    Some(d) => {
                        value = value * 8 + d;
                        count += 1;
                    }
                    None => break,
                }
            }
            char::from_u32(value).map(|c| (c, count))
        }
        'x' => decode_hex(&rest[1..], 2).map(|(c, n)| (c, n + 1)),
        'u' => decode_hex(&rest[1..], 4).map(|(c, n)| (c, n + 1)),
        'U' => decode_hex(&rest[1..], 8).map(|(c, n)| (c, n + 1)),
        _ => None,
    }
}

/// Decodes up to `max` hex digits into a character. At least one digit is
/// required; out-of-range code points are rejected.
fn decode_hex(rest: &str, max: usize) -> Option<(char, usize)> {
    let mut value = 0u32;
    let mut count = 0;
    for c in rest.chars().take(max) {
        match c.to_digit(16) {
            Some(d) => {
                value = value.checked_mul(16)?.checked_add(d)?;
                count += 1;
            }
            None => break,
        }
    }
    if count == 0 {
        return None;
    }
    char::from_u32(value).map(|c| (c, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn words_and_separators() {
        assert_eq!(
            kinds("cmd arg1 arg2"),
            vec![
                TokenKind::Text,
                TokenKind::Whitespace,
                TokenKind::Text,
                TokenKind::Whitespace,
                TokenKind::Text,
            ]
        );
        assert_eq!(
            kinds("a\nb;c"),
            vec![
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Text,
                TokenKind::Semicolon,
                TokenKind::Text,
            ]
        );
    }

    #[test]
    fn delimiters_are_single_tokens() {
        assert_eq!(
            kinds("(){}[]$*"),
            vec![
                TokenKind::OpenTuple,
                TokenKind::CloseTuple,
                TokenKind::OpenBlock,
                TokenKind::CloseBlock,
                TokenKind::OpenExpression,
                TokenKind::CloseExpression,
                TokenKind::Dollar,
                TokenKind::Asterisk,
            ]
        );
    }

    #[test]
    fn quote_runs_group() {
        let tokens = tokenize(r#""""abc""#);
        assert_eq!(tokens[0].kind, TokenKind::StringDelimiter);
        assert_eq!(tokens[0].literal, "\"\"\"");
        assert_eq!(tokens[1].kind, TokenKind::Text);
        assert_eq!(tokens[2].kind, TokenKind::StringDelimiter);
        assert_eq!(tokens[2].literal, "\"");
    }

    #[test]
    fn comment_runs_group() {
        let tokens = tokenize("## note");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].literal, "##");
    }

    #[test]
    fn simple_escapes_decode() {
        let tokens = tokenize(r"a\nb");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Escape);
        assert_eq!(tokens[1].literal, "\n");
    }

    #[test]
    fn numeric_escapes_decode() {
        assert_eq!(tokenize(r"\x41")[0].literal, "A");
        assert_eq!(tokenize(r"\101")[0].literal, "A");
        assert_eq!(tokenize(r"\u00e9")[0].literal, "\u{e9}");
        assert_eq!(tokenize(r"\U0001F600")[0].literal, "😀");
    }

    #[test]
    fn numeric_escape_without_digits_degrades_to_text() {
        let tokens = tokenize(r"\xg");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].literal, r"\xg");
    }

    #[test]
    fn trailing_backslash_degrades_to_text() {
        let tokens = tokenize("\\");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].literal, "\\");
    }

    #[test]
    fn line_continuation_is_a_single_space() {
        let tokens = tokenize("a \\\n   b");
        assert_eq!(tokens[2].kind, TokenKind::Continuation);
        assert_eq!(tokens[2].literal, " ");
        assert_eq!(tokens[3].kind, TokenKind::Text);
        assert_eq!(tokens[3].literal, "b");
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = tokenize("ab\ncd");
        assert_eq!(tokens[2].position.line, 1);
        assert_eq!(tokens[2].position.column, 0);
        assert_eq!(tokens[2].position.index, 3);
    }

    #[test]
    fn raw_slices_reconstruct_the_source() {
        let source = "cmd \\x41 \"str\" {block} # note\nnext";
        let tokens = tokenize(source);
        let rebuilt: String = tokens.iter().map(|t| t.raw(source)).collect();
        assert_eq!(rebuilt, source);
    }
}
