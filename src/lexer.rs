//! PDF lexer (tokenizer).
//!
//! This module provides low-level tokenization of PDF byte streams. It
//! recognizes all PDF token types: numbers, strings (literal and hex), names,
//! keywords, and the container delimiters.
//!
//! # PDF Syntax Overview
//!
//! PDF uses a PostScript-like syntax:
//! - Numbers: integers (42, -123) and reals (3.14, -2.5, .5)
//! - Strings: literal ((Hello)) and hexadecimal (<48656C6C6F>)
//! - Names: identifiers starting with / (/Type, /Pages)
//! - Keywords: any run of regular characters (true, null, obj, endstream, R)
//! - Delimiters: `[`, `]`, `<<`, `>>`
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are
//! skipped between tokens. String escape sequences and name #XX sequences
//! are decoded here; the parser receives finished byte payloads.
//!
//! [`TokenReader`] drives the token primitives over a [`Scanner`] and caches
//! exactly one token of lookahead. Because only one token is ever lexed
//! ahead, the reader never reads past a `stream` keyword into binary
//! payload bytes.

use crate::scanner::Scanner;
use nom::{
    IResult,
    bytes::complete::take_while,
    character::complete::{char, digit1},
    combinator::opt,
    sequence::preceded,
};

/// Serialization hint carried by string tokens and string objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// `(...)` literal form
    Literal,
    /// `<...>` hexadecimal form
    Hex,
}

/// Container delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `[`
    ArrayOpen,
    /// `]`
    ArrayClose,
    /// `<<`
    DictOpen,
    /// `>>`
    DictClose,
}

/// Token types recognized by the PDF lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric value. `integer` records whether the source had no decimal
    /// point and the value is integral; integrality is a fact, not a type.
    Number {
        /// Numeric value
        value: f64,
        /// True for integer source form
        integer: bool,
    },
    /// Name with #XX escapes already decoded (e.g. "Type" from "/Type")
    Name(String),
    /// String with escapes decoded, plus its source form
    String {
        /// Decoded payload bytes
        bytes: Vec<u8>,
        /// Literal or hex source form
        format: StringFormat,
    },
    /// Any maximal run of regular characters (true, obj, endstream, R, ...)
    Keyword(String),
    /// One of `[`, `]`, `<<`, `>>`
    Delim(Delimiter),
    /// End of input
    Eof,
}

impl Token {
    /// True if this token is the given keyword.
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == kw)
    }

    /// Integer value if this is an integer-form number.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Token::Number { value, integer: true } => Some(*value as i64),
            _ => None,
        }
    }
}

/// PDF whitespace: null, tab, LF, FF, CR, space (PDF 32000-1:2008, 7.2.2).
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// PDF delimiter characters (PDF 32000-1:2008, 7.2.2).
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Regular characters are everything that is neither whitespace nor delimiter.
pub(crate) fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Parse an integer or real number.
///
/// Accepts a leading run of sign characters; an even count of `-` yields a
/// positive value, an odd count a negative one. At least one digit is
/// required; a signless dot or bare sign fails so the caller can reclassify
/// the run as a keyword.
fn lex_number(input: &[u8]) -> IResult<&[u8], Token> {
    let (input, signs) = take_while(|c| c == b'+' || c == b'-')(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    let frac_digits = match &frac_part {
        Some(Some(d)) => Some(*d),
        _ => None,
    };
    if int_part.is_none() && frac_digits.is_none() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)));
    }

    let negative = signs.iter().filter(|&&c| c == b'-').count() % 2 == 1;

    let mut text = String::new();
    if let Some(int) = int_part {
        text.push_str(std::str::from_utf8(int).unwrap_or("0"));
    } else {
        text.push('0');
    }
    let decimal_seen = frac_part.is_some();
    if decimal_seen {
        text.push('.');
        if let Some(frac) = frac_digits {
            text.push_str(std::str::from_utf8(frac).unwrap_or("0"));
        } else {
            text.push('0');
        }
    }

    let mut value: f64 = text.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    if negative {
        value = -value;
    }

    let integer = !decimal_seen && value.fract() == 0.0;
    Ok((input, Token::Number { value, integer }))
}

/// Parse a name starting with `/`.
///
/// The name body is every following regular character. `#XX` sequences with
/// exactly two hex digits decode to the indicated byte; a `#` with fewer
/// than two hex digits after it stays literal.
fn lex_name(input: &[u8]) -> IResult<&[u8], Token> {
    let (input, raw) = preceded(char('/'), take_while(is_regular))(input)?;
    Ok((input, Token::Name(decode_name_escapes(raw))))
}

/// Decode #XX escape sequences in a raw name body.
///
/// PDF 32000-1:2008, 7.3.5: any byte may be written as `#XX`. Invalid
/// sequences are preserved literally.
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            if let Some(hex) = raw.get(i + 1..i + 3) {
                if hex.iter().all(|b| b.is_ascii_hexdigit()) {
                    let hi = (hex[0] as char).to_digit(16).unwrap_or(0) as u8;
                    let lo = (hex[1] as char).to_digit(16).unwrap_or(0) as u8;
                    bytes.push(hi << 4 | lo);
                    i += 3;
                    continue;
                }
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse a keyword: a maximal run of regular characters.
fn lex_keyword(input: &[u8]) -> IResult<&[u8], Token> {
    let (rest, raw) = take_while(is_regular)(input)?;
    if raw.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Alpha)));
    }
    Ok((rest, Token::Keyword(String::from_utf8_lossy(raw).into_owned())))
}

/// Scan a literal string after its opening `(`.
///
/// Returns the number of input bytes consumed (excluding the opening paren)
/// and the decoded payload. Handles balanced nesting, the full escape set,
/// octal escapes masked to 8 bits, line continuations, and EOL
/// normalization of raw CR / CRLF to LF. An unterminated string at end of
/// input returns what was read.
fn scan_literal_string(input: &[u8]) -> (usize, Vec<u8>) {
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        match b {
            b'\\' => {
                i += 1;
                if i >= input.len() {
                    break;
                }
                match input[i] {
                    b'n' => {
                        out.push(b'\n');
                        i += 1;
                    },
                    b'r' => {
                        out.push(b'\r');
                        i += 1;
                    },
                    b't' => {
                        out.push(b'\t');
                        i += 1;
                    },
                    b'b' => {
                        out.push(0x08);
                        i += 1;
                    },
                    b'f' => {
                        out.push(0x0C);
                        i += 1;
                    },
                    b'(' => {
                        out.push(b'(');
                        i += 1;
                    },
                    b')' => {
                        out.push(b')');
                        i += 1;
                    },
                    b'\\' => {
                        out.push(b'\\');
                        i += 1;
                    },
                    // Line continuation: backslash + EOL produces nothing
                    b'\n' => {
                        i += 1;
                    },
                    b'\r' => {
                        i += 1;
                        if i < input.len() && input[i] == b'\n' {
                            i += 1;
                        }
                    },
                    // Octal escape \ddd, 1-3 digits, masked to 8 bits
                    c @ b'0'..=b'7' => {
                        let mut value = (c - b'0') as u32;
                        i += 1;
                        for _ in 0..2 {
                            match input.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + (d - b'0') as u32;
                                    i += 1;
                                },
                                _ => break,
                            }
                        }
                        out.push((value & 0xFF) as u8);
                    },
                    // Unknown escape: the escaped byte itself
                    other => {
                        out.push(other);
                        i += 1;
                    },
                }
            },
            b'(' => {
                depth += 1;
                out.push(b'(');
                i += 1;
            },
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return (i, out);
                }
                out.push(b')');
            },
            // Raw EOLs inside the string normalize to LF
            b'\r' => {
                i += 1;
                if i < input.len() && input[i] == b'\n' {
                    i += 1;
                }
                out.push(b'\n');
            },
            other => {
                out.push(other);
                i += 1;
            },
        }
    }

    // Unterminated at end of input: lenient, keep what was read
    (i, out)
}

/// Scan a hexadecimal string after its opening `<`.
///
/// Returns bytes consumed (excluding the `<`) and the decoded payload.
/// Whitespace is skipped, non-hex bytes are skipped with a warning, and an
/// odd digit count pads a trailing zero.
fn scan_hex_string(input: &[u8]) -> (usize, Vec<u8>) {
    let mut digits: Vec<u8> = Vec::new();
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        i += 1;
        if b == b'>' {
            break;
        }
        if is_whitespace(b) {
            continue;
        }
        if b.is_ascii_hexdigit() {
            digits.push(b);
        } else {
            log::warn!("Skipping non-hex byte 0x{:02x} in hex string", b);
        }
    }

    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }

    let mut out = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        let hi = (pair[0] as char).to_digit(16).unwrap_or(0) as u8;
        let lo = (pair[1] as char).to_digit(16).unwrap_or(0) as u8;
        out.push(hi << 4 | lo);
    }
    (i, out)
}

/// A lexed token together with its byte extent in the input.
#[derive(Debug, Clone)]
struct Lexed {
    token: Token,
    start: usize,
    end: usize,
}

/// Token reader with one cached token of lookahead.
///
/// Each token records the absolute byte offsets it was lexed from, which the
/// object parser uses to disambiguate indirect references (rewinding after a
/// failed `N G R` probe) and to hand stream payload reading back to the raw
/// buffer without lexing binary data.
#[derive(Debug, Clone)]
pub struct TokenReader<'a> {
    scanner: Scanner<'a>,
    peeked: Option<Lexed>,
}

impl<'a> TokenReader<'a> {
    /// Create a reader at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            scanner: Scanner::new(bytes),
            peeked: None,
        }
    }

    /// Create a reader positioned at an absolute offset.
    pub fn at(bytes: &'a [u8], offset: usize) -> Self {
        Self {
            scanner: Scanner::at(bytes, offset),
            peeked: None,
        }
    }

    /// The underlying buffer.
    pub fn bytes(&self) -> &'a [u8] {
        self.scanner.bytes()
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.lex_one());
        }
        &self.peeked.as_ref().expect("lookahead just filled").token
    }

    /// Absolute offset at which the next token starts.
    pub fn peek_start(&mut self) -> usize {
        self.peek();
        self.peeked.as_ref().expect("lookahead just filled").start
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token {
        match self.peeked.take() {
            Some(lexed) => lexed.token,
            None => self.lex_one().token,
        }
    }

    /// Offset usable with [`rewind`](Self::rewind) to re-lex from the next
    /// unconsumed token.
    pub fn checkpoint(&mut self) -> usize {
        match &self.peeked {
            Some(lexed) => lexed.start,
            None => self.scanner.position(),
        }
    }

    /// Move the reader to an absolute offset, dropping the lookahead.
    pub fn rewind(&mut self, offset: usize) {
        self.peeked = None;
        self.scanner.seek(offset);
    }

    /// Cursor position after the last consumed token. Only meaningful while
    /// no lookahead is cached (i.e. right after `next_token`).
    pub fn cursor(&self) -> usize {
        match &self.peeked {
            Some(lexed) => lexed.start,
            None => self.scanner.position(),
        }
    }

    /// Skip whitespace and comments.
    fn skip_ws(&mut self) {
        loop {
            match self.scanner.peek() {
                Some(b) if is_whitespace(b) => {
                    self.scanner.advance();
                },
                Some(b'%') => {
                    // Comment runs to end of line
                    while let Some(b) = self.scanner.advance() {
                        if b == b'\r' || b == b'\n' {
                            break;
                        }
                    }
                },
                _ => break,
            }
        }
    }

    /// Lex one token from the scanner.
    fn lex_one(&mut self) -> Lexed {
        self.skip_ws();
        let start = self.scanner.position();
        let input = self.scanner.remaining();

        let Some(first) = input.first().copied() else {
            return Lexed {
                token: Token::Eof,
                start,
                end: start,
            };
        };

        let (consumed, token) = match first {
            b'/' => Self::run_nom(input, lex_name),
            b'[' => (1, Token::Delim(Delimiter::ArrayOpen)),
            b']' => (1, Token::Delim(Delimiter::ArrayClose)),
            b'<' => {
                if input.get(1) == Some(&b'<') {
                    (2, Token::Delim(Delimiter::DictOpen))
                } else {
                    let (n, bytes) = scan_hex_string(&input[1..]);
                    (
                        n + 1,
                        Token::String {
                            bytes,
                            format: StringFormat::Hex,
                        },
                    )
                }
            },
            b'>' => {
                if input.get(1) == Some(&b'>') {
                    (2, Token::Delim(Delimiter::DictClose))
                } else {
                    log::warn!("Stray '>' at offset {}", start);
                    (1, Token::Keyword(">".to_string()))
                }
            },
            b'(' => {
                let (n, bytes) = scan_literal_string(&input[1..]);
                (
                    n + 1,
                    Token::String {
                        bytes,
                        format: StringFormat::Literal,
                    },
                )
            },
            b')' | b'{' | b'}' => {
                log::warn!("Stray delimiter '{}' at offset {}", first as char, start);
                (1, Token::Keyword((first as char).to_string()))
            },
            b'+' | b'-' | b'.' | b'0'..=b'9' => match lex_number(input) {
                Ok((rest, token)) => (input.len() - rest.len(), token),
                // No digits in the run: reclassify as keyword
                Err(_) => Self::run_nom(input, lex_keyword),
            },
            _ => Self::run_nom(input, lex_keyword),
        };

        self.scanner.seek(start + consumed);
        Lexed {
            token,
            start,
            end: start + consumed,
        }
    }

    fn run_nom(input: &[u8], f: fn(&[u8]) -> IResult<&[u8], Token>) -> (usize, Token) {
        match f(input) {
            Ok((rest, token)) => (input.len() - rest.len(), token),
            Err(_) => {
                // Cannot make progress on this byte; emit it as a keyword so
                // the parser can decide to warn or fail.
                (1, Token::Keyword((input[0] as char).to_string()))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(input: &[u8]) -> Token {
        TokenReader::new(input).next_token()
    }

    fn all(input: &[u8]) -> Vec<Token> {
        let mut reader = TokenReader::new(input);
        let mut out = Vec::new();
        loop {
            let t = reader.next_token();
            if t == Token::Eof {
                return out;
            }
            out.push(t);
        }
    }

    // ========================================================================
    // Number Tests
    // ========================================================================

    #[test]
    fn test_integer() {
        assert_eq!(
            one(b"42"),
            Token::Number {
                value: 42.0,
                integer: true
            }
        );
        assert_eq!(
            one(b"-123"),
            Token::Number {
                value: -123.0,
                integer: true
            }
        );
        assert_eq!(
            one(b"+17"),
            Token::Number {
                value: 17.0,
                integer: true
            }
        );
    }

    #[test]
    fn test_real() {
        assert_eq!(
            one(b"-2.5"),
            Token::Number {
                value: -2.5,
                integer: false
            }
        );
        assert_eq!(
            one(b".5"),
            Token::Number {
                value: 0.5,
                integer: false
            }
        );
        assert_eq!(
            one(b"5."),
            Token::Number {
                value: 5.0,
                integer: false
            }
        );
    }

    #[test]
    fn test_multiple_leading_minus_collapse() {
        // Even count of minus signs cancels out, odd negates
        assert_eq!(
            one(b"--5"),
            Token::Number {
                value: 5.0,
                integer: true
            }
        );
        assert_eq!(
            one(b"---5"),
            Token::Number {
                value: -5.0,
                integer: true
            }
        );
    }

    #[test]
    fn test_digitless_sign_is_keyword() {
        assert_eq!(one(b"- "), Token::Keyword("-".to_string()));
        assert_eq!(one(b"--"), Token::Keyword("--".to_string()));
    }

    // ========================================================================
    // String Tests
    // ========================================================================

    #[test]
    fn test_literal_string() {
        assert_eq!(
            one(b"(Hello World)"),
            Token::String {
                bytes: b"Hello World".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_nesting() {
        assert_eq!(
            one(b"(a (b (c)) d)"),
            Token::String {
                bytes: b"a (b (c)) d".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(
            one(b"(Tab:\\tNL:\\nParens:\\(\\))"),
            Token::String {
                bytes: b"Tab:\tNL:\nParens:()".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_octal() {
        // \247 = 0xA7; \53 = '+'; \7 = BEL; \501 masked to 8 bits = 0x41 'A'
        assert_eq!(
            one(b"(\\247\\53\\7\\501)"),
            Token::String {
                bytes: vec![0xA7, b'+', 0x07, 0x41],
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_octal_stops_at_non_octal() {
        // \128 is \12 followed by literal '8'
        assert_eq!(
            one(b"(\\128)"),
            Token::String {
                bytes: b"\n8".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_line_continuation() {
        assert_eq!(
            one(b"(long \\\nstring)"),
            Token::String {
                bytes: b"long string".to_vec(),
                format: StringFormat::Literal
            }
        );
        assert_eq!(
            one(b"(long \\\r\nstring)"),
            Token::String {
                bytes: b"long string".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_eol_normalization() {
        assert_eq!(
            one(b"(a\rb\r\nc)"),
            Token::String {
                bytes: b"a\nb\nc".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_unknown_escape() {
        // Unknown escape produces the literal byte
        assert_eq!(
            one(b"(\\q)"),
            Token::String {
                bytes: b"q".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_literal_string_unterminated() {
        assert_eq!(
            one(b"(never ends"),
            Token::String {
                bytes: b"never ends".to_vec(),
                format: StringFormat::Literal
            }
        );
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(
            one(b"<48656C6C6F>"),
            Token::String {
                bytes: b"Hello".to_vec(),
                format: StringFormat::Hex
            }
        );
        assert_eq!(
            one(b"<48 65 6C 6C 6F>"),
            Token::String {
                bytes: b"Hello".to_vec(),
                format: StringFormat::Hex
            }
        );
    }

    #[test]
    fn test_hex_string_odd_digits_pad_zero() {
        assert_eq!(
            one(b"<ABC>"),
            Token::String {
                bytes: vec![0xAB, 0xC0],
                format: StringFormat::Hex
            }
        );
    }

    #[test]
    fn test_hex_string_skips_junk() {
        assert_eq!(
            one(b"<4X8>"),
            Token::String {
                bytes: vec![0x48],
                format: StringFormat::Hex
            }
        );
    }

    // ========================================================================
    // Name Tests
    // ========================================================================

    #[test]
    fn test_name() {
        assert_eq!(one(b"/Type"), Token::Name("Type".to_string()));
        assert_eq!(
            one(b"/A;Name_With-Various***Characters"),
            Token::Name("A;Name_With-Various***Characters".to_string())
        );
    }

    #[test]
    fn test_name_hex_escape() {
        assert_eq!(one(b"/A#20B"), Token::Name("A B".to_string()));
        assert_eq!(one(b"/A#20B#23C"), Token::Name("A B#C".to_string()));
    }

    #[test]
    fn test_name_lone_hash_is_literal() {
        assert_eq!(one(b"/A#"), Token::Name("A#".to_string()));
        assert_eq!(one(b"/A#2"), Token::Name("A#2".to_string()));
        assert_eq!(one(b"/A#ZZ"), Token::Name("A#ZZ".to_string()));
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(one(b"/ "), Token::Name(String::new()));
    }

    // ========================================================================
    // Keyword and Delimiter Tests
    // ========================================================================

    #[test]
    fn test_keywords() {
        assert_eq!(one(b"true"), Token::Keyword("true".to_string()));
        assert_eq!(one(b"endstream"), Token::Keyword("endstream".to_string()));
        assert_eq!(one(b"R"), Token::Keyword("R".to_string()));
        assert_eq!(one(b"startxref"), Token::Keyword("startxref".to_string()));
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(one(b"["), Token::Delim(Delimiter::ArrayOpen));
        assert_eq!(one(b"]"), Token::Delim(Delimiter::ArrayClose));
        assert_eq!(one(b"<<"), Token::Delim(Delimiter::DictOpen));
        assert_eq!(one(b">>"), Token::Delim(Delimiter::DictClose));
    }

    #[test]
    fn test_keyword_stops_at_delimiter() {
        let toks = all(b"null]");
        assert_eq!(
            toks,
            vec![
                Token::Keyword("null".to_string()),
                Token::Delim(Delimiter::ArrayClose)
            ]
        );
    }

    // ========================================================================
    // Whitespace / Comment Tests
    // ========================================================================

    #[test]
    fn test_skip_whitespace_and_comments() {
        assert_eq!(
            one(b"  % comment\n \t% another\n 42"),
            Token::Number {
                value: 42.0,
                integer: true
            }
        );
    }

    #[test]
    fn test_eof() {
        let mut reader = TokenReader::new(b"  % just a comment");
        assert_eq!(reader.next_token(), Token::Eof);
        assert_eq!(reader.next_token(), Token::Eof);
    }

    // ========================================================================
    // Reader Mechanics
    // ========================================================================

    #[test]
    fn test_peek_does_not_consume() {
        let mut reader = TokenReader::new(b"1 2");
        assert_eq!(
            reader.peek(),
            &Token::Number {
                value: 1.0,
                integer: true
            }
        );
        assert_eq!(
            reader.next_token(),
            Token::Number {
                value: 1.0,
                integer: true
            }
        );
        assert_eq!(
            reader.next_token(),
            Token::Number {
                value: 2.0,
                integer: true
            }
        );
    }

    #[test]
    fn test_checkpoint_rewind() {
        let mut reader = TokenReader::new(b"7 0 R");
        reader.next_token();
        let cp = reader.checkpoint();
        assert_eq!(
            reader.next_token(),
            Token::Number {
                value: 0.0,
                integer: true
            }
        );
        reader.rewind(cp);
        assert_eq!(
            reader.next_token(),
            Token::Number {
                value: 0.0,
                integer: true
            }
        );
        assert_eq!(reader.next_token(), Token::Keyword("R".to_string()));
    }

    #[test]
    fn test_cursor_stops_after_stream_keyword() {
        let input = b"stream\n\x00\x01binary";
        let mut reader = TokenReader::new(input);
        assert_eq!(reader.next_token(), Token::Keyword("stream".to_string()));
        // The cursor sits right after the keyword; the binary payload was
        // never lexed.
        assert_eq!(reader.cursor(), 6);
    }

    #[test]
    fn test_peek_start_offset() {
        let mut reader = TokenReader::new(b"  << /K 1 >>");
        assert_eq!(reader.peek_start(), 2);
        assert_eq!(reader.next_token(), Token::Delim(Delimiter::DictOpen));
    }
}
