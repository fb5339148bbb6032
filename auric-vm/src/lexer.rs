//! Byte-stream tokenizer with two-token lookahead.

/// Token classes produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input.
    Eof,
    /// Decimal or `0x` hexadecimal integer literal.
    Int,
    /// Decimal literal containing a fractional part.
    Double,
    /// Identifier or keyword.
    Identifier,
    /// Double-quoted string literal; the token text excludes the quotes
    /// and keeps escape sequences unprocessed.
    String,
    /// Single-quoted character literal, resolved by the parser to a
    /// Unicode code point.
    CharString,
    /// One- or two-character operator or punctuation.
    Operator,
    /// `@identifier`, used for class-field access.
    AtIdentifier,
    /// A byte the lexer cannot classify.
    Unknown,
}

/// One token: its class plus the source slice it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token class.
    pub kind: TokenKind,
    /// Covered source text (for strings, the content between quotes).
    pub text: &'a str,
    /// Byte offset of `text` in the source.
    pub start: usize,
}

impl<'a> Token<'a> {
    const EOF: Token<'static> = Token {
        kind: TokenKind::Eof,
        text: "",
        start: usize::MAX,
    };

    /// Whether this is the given operator.
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// Whether this is the given keyword.
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == kw
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheSlot<'a> {
    token: Token<'a>,
    start: usize,
    end: usize,
}

/// The tokenizer.
///
/// Lookahead is a two-slot cache of `(token, start, end)` records. The
/// cache is only trusted while the cursor still stands at the first
/// cached token's start position; the parser may rewind the cursor with
/// [`Lexer::restore`], after which stale entries are dropped and re-lexed.
#[derive(Debug)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    cache: Vec<CacheSlot<'a>>,
}

/// Maximum lookahead distance.
pub const LOOKAHEAD_MAX: usize = 2;

fn is_id_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_id_cont(ch: u8) -> bool {
    is_id_start(ch) || ch.is_ascii_digit()
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the whole source.
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            cache: Vec::with_capacity(LOOKAHEAD_MAX),
        }
    }

    /// The full source text.
    pub fn src(&self) -> &'a str {
        self.src
    }

    /// Current cursor position, for later [`Lexer::restore`].
    pub fn save(&self) -> usize {
        self.pos
    }

    /// Rewind the cursor to a previously saved position.
    pub fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token<'a> {
        if !self.cache.is_empty() {
            let head = self.cache.remove(0);
            if head.start == self.pos {
                self.pos = head.end;
                return head.token;
            }
            self.cache.clear();
        }
        self.lex()
    }

    /// Look ahead `n` tokens (`n < LOOKAHEAD_MAX`) without consuming.
    pub fn peek(&mut self, n: usize) -> Token<'a> {
        debug_assert!(n < LOOKAHEAD_MAX);
        if self
            .cache
            .first()
            .is_some_and(|head| head.start != self.pos)
        {
            self.cache.clear();
        }
        let saved = self.pos;
        while self.cache.len() <= n {
            self.pos = self.cache.last().map_or(saved, |slot| slot.end);
            let start = self.pos;
            let token = self.lex();
            let end = self.pos;
            self.cache.push(CacheSlot { token, start, end });
        }
        self.pos = saved;
        self.cache[n].token
    }

    fn lex(&mut self) -> Token<'a> {
        let src = self.src.as_bytes();
        loop {
            match src.get(self.pos) {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.pos += 1,
                Some(b'/') if src.get(self.pos + 1) == Some(&b'/') => {
                    self.pos += 2;
                    while self.pos < src.len() && src[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let Some(&start_ch) = src.get(self.pos) else {
            return Token::EOF;
        };

        let start = self.pos;
        match start_ch {
            b'"' | b'\'' => {
                self.pos += 1;
                while self.pos < src.len() {
                    if src[self.pos] == b'\\' {
                        self.pos += 2;
                        continue;
                    }
                    if src[self.pos] == start_ch {
                        break;
                    }
                    self.pos += 1;
                }
                let content_end = self.pos.min(src.len());
                if self.pos < src.len() {
                    self.pos += 1;
                }
                Token {
                    kind: if start_ch == b'\'' {
                        TokenKind::CharString
                    } else {
                        TokenKind::String
                    },
                    text: &self.src[start + 1..content_end],
                    start: start + 1,
                }
            }
            b'0'..=b'9' => self.lex_number(start),
            ch if is_id_start(ch) => {
                self.pos += 1;
                while self.pos < src.len() && is_id_cont(src[self.pos]) {
                    self.pos += 1;
                }
                self.token(TokenKind::Identifier, start)
            }
            b'@' => {
                self.pos += 1;
                if self.pos < src.len() && is_id_start(src[self.pos]) {
                    while self.pos < src.len() && is_id_cont(src[self.pos]) {
                        self.pos += 1;
                    }
                    self.token(TokenKind::AtIdentifier, start)
                } else {
                    self.token(TokenKind::Unknown, start)
                }
            }
            b'+' | b'-' | b'*' | b'/' | b'%' | b'!' | b'=' => {
                self.pos += 1;
                if src.get(self.pos) == Some(&b'=') {
                    self.pos += 1;
                }
                self.token(TokenKind::Operator, start)
            }
            b'<' | b'>' => {
                // `<=`, `>=`, `<<`, `>>` or the bare comparison
                self.pos += 1;
                if matches!(src.get(self.pos), Some(&b'=')) || src.get(self.pos) == Some(&start_ch)
                {
                    self.pos += 1;
                }
                self.token(TokenKind::Operator, start)
            }
            b'&' | b'|' => {
                self.pos += 1;
                if src.get(self.pos) == Some(&start_ch) {
                    self.pos += 1;
                }
                self.token(TokenKind::Operator, start)
            }
            b':' => {
                self.pos += 1;
                if src.get(self.pos) == Some(&b':') {
                    self.pos += 1;
                }
                self.token(TokenKind::Operator, start)
            }
            b'#' => {
                self.pos += 1;
                if src.get(self.pos) == Some(&b'[') {
                    self.pos += 1;
                    self.token(TokenKind::Operator, start)
                } else {
                    self.token(TokenKind::Unknown, start)
                }
            }
            b'(' | b')' | b';' | b',' | b'{' | b'}' | b'[' | b']' | b'.' | b'^' | b'~' => {
                self.pos += 1;
                self.token(TokenKind::Operator, start)
            }
            _ => {
                self.pos += 1;
                self.token(TokenKind::Unknown, start)
            }
        }
    }

    fn lex_number(&mut self, start: usize) -> Token<'a> {
        let src = self.src.as_bytes();
        if src[self.pos] == b'0' && src.get(self.pos + 1) == Some(&b'x') {
            self.pos += 2;
            while self.pos < src.len() && src[self.pos].is_ascii_hexdigit() {
                self.pos += 1;
            }
            return self.token(TokenKind::Int, start);
        }
        while self.pos < src.len() && src[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if src.get(self.pos) == Some(&b'.')
            && src.get(self.pos + 1).is_some_and(u8::is_ascii_digit)
        {
            self.pos += 1;
            while self.pos < src.len() && src[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            return self.token(TokenKind::Double, start);
        }
        self.token(TokenKind::Int, start)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.src[start..self.pos],
            start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        let mut l = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let t = l.next_token();
            if t.kind == TokenKind::Eof {
                return out;
            }
            out.push((t.kind, t.text));
        }
    }

    #[test]
    fn classifies_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds("12 0xff 3.25 name _x @field"),
            vec![
                (Int, "12"),
                (Int, "0xff"),
                (Double, "3.25"),
                (Identifier, "name"),
                (Identifier, "_x"),
                (AtIdentifier, "@field"),
            ]
        );
    }

    #[test]
    fn two_char_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("== != <= >= && || << >> :: #[ += -="),
            vec![
                (Operator, "=="),
                (Operator, "!="),
                (Operator, "<="),
                (Operator, ">="),
                (Operator, "&&"),
                (Operator, "||"),
                (Operator, "<<"),
                (Operator, ">>"),
                (Operator, "::"),
                (Operator, "#["),
                (Operator, "+="),
                (Operator, "-="),
            ]
        );
    }

    #[test]
    fn strings_keep_escapes_raw() {
        let toks = kinds(r#""a\nb" 'x'"#);
        assert_eq!(toks[0], (TokenKind::String, "a\\nb"));
        assert_eq!(toks[1], (TokenKind::CharString, "x"));
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        assert_eq!(
            kinds("a // rest of line\nb"),
            vec![(TokenKind::Identifier, "a"), (TokenKind::Identifier, "b")]
        );
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut l = Lexer::new("a b c");
        assert_eq!(l.peek(0).text, "a");
        assert_eq!(l.peek(1).text, "b");
        assert_eq!(l.next_token().text, "a");
        assert_eq!(l.next_token().text, "b");
        assert_eq!(l.next_token().text, "c");
    }

    #[test]
    fn restore_invalidates_stale_lookahead() {
        let mut l = Lexer::new("a + b");
        let saved = l.save();
        l.peek(0);
        l.peek(1);
        assert_eq!(l.next_token().text, "a");
        l.restore(saved);
        assert_eq!(l.next_token().text, "a");
        assert_eq!(l.next_token().text, "+");
        assert_eq!(l.next_token().text, "b");
    }

    #[test]
    fn unknown_bytes_are_surfaced() {
        let toks = kinds("a ?");
        assert_eq!(toks[1].0, TokenKind::Unknown);
    }
}
