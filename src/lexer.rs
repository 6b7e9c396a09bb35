use crate::error::{byte_offset_to_location, LexError, MungeResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: std::ops::Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    LParen,
    RParen,
    Comma,
    Equals,
    Newline,
    LBrace,
    RBrace,
    Def,
    Return,
    Do,
    Eof,
}

impl TokenKind {
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Integer => "INTEGER",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Comma => "DELIMITER",
            TokenKind::Equals => "EQUALS",
            TokenKind::Newline => "NEWLINE",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Def => "def",
            TokenKind::Return => "return",
            TokenKind::Do => "do",
            TokenKind::Eof => "EOF",
        }
    }
}

// Longest keyword first.
const KEYWORDS: [(&str, TokenKind); 3] = [
    ("return", TokenKind::Return),
    ("def", TokenKind::Def),
    ("do", TokenKind::Do),
];

pub fn reserved_symbol(ch: char) -> Option<TokenKind> {
    match ch {
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        ',' => Some(TokenKind::Comma),
        '=' => Some(TokenKind::Equals),
        '\n' => Some(TokenKind::Newline),
        '{' => Some(TokenKind::LBrace),
        '}' => Some(TokenKind::RBrace),
        _ => None,
    }
}

pub fn keyword(word: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(text, _)| *text == word)
        .map(|(_, kind)| *kind)
}

pub fn is_space(ch: char) -> bool {
    ch == ' ' || ch == '\t' || ch == '\r'
}

pub fn is_identifier_char(ch: char) -> bool {
    !ch.is_whitespace() && !ch.is_control() && reserved_symbol(ch).is_none()
}

fn leading_word(input: &str) -> &str {
    let end = input
        .char_indices()
        .find(|&(_, ch)| !is_identifier_char(ch))
        .map(|(index, _)| index)
        .unwrap_or(input.len());
    &input[..end]
}

// `segment` is the identifier text collected since its last space.
pub fn continues_identifier(prev: char, current: char, rest: &str, segment: &str) -> bool {
    if is_space(current) {
        if !is_identifier_char(prev) || keyword(segment).is_some() {
            return false;
        }
        let next = rest.trim_start_matches(is_space);
        return match next.chars().next() {
            Some(ch) => is_identifier_char(ch) && keyword(leading_word(next)).is_none(),
            None => false,
        };
    }

    match current {
        '=' | '(' | ')' => is_identifier_char(prev),
        other => is_identifier_char(other),
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn lex(mut self) -> MungeResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> MungeResult<Token> {
        while let Some(ch) = self.peek_char() {
            if is_space(ch) {
                self.consume_whitespace();
                continue;
            }

            let start = self.position;

            if ch.is_ascii_digit() {
                return Ok(self.read_integer(start));
            }

            if let Some(kind) = reserved_symbol(ch) {
                self.advance_char();
                return Ok(self.token(kind, start));
            }

            let word = leading_word(self.rest());
            if let Some(kind) = keyword(word) {
                self.position += word.len();
                return Ok(self.token(kind, start));
            }

            if is_identifier_char(ch) {
                return Ok(self.read_identifier(start));
            }

            return Err(LexError::UnexpectedCharacter {
                character: ch,
                location: byte_offset_to_location(self.source, start),
            }
            .into());
        }

        Ok(self.token(TokenKind::Eof, self.position))
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text: self.source[start..self.position].to_string(),
            span: start..self.position,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn consume_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !is_space(ch) {
                break;
            }
            self.advance_char();
        }
    }

    fn read_integer(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek_char() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.advance_char();
        }
        self.token(TokenKind::Integer, start)
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        let mut segment_start = start;
        let mut prev = match self.advance_char() {
            Some(ch) => ch,
            None => return self.token(TokenKind::Identifier, start),
        };

        while let Some(ch) = self.peek_char() {
            let rest = &self.rest()[ch.len_utf8()..];
            let segment = &self.source[segment_start..self.position];
            if !continues_identifier(prev, ch, rest, segment) {
                break;
            }

            if is_space(ch) {
                self.consume_whitespace();
                segment_start = self.position;
                prev = ' ';
            } else {
                self.advance_char();
                prev = ch;
            }
        }

        self.token(TokenKind::Identifier, start)
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        Some(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Location, MungeError};
    use pretty_assertions::assert_eq;

    fn kinds_and_text(source: &str) -> MungeResult<Vec<(TokenKind, String)>> {
        Ok(Lexer::new(source)
            .lex()?
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect())
    }

    fn id(text: &str) -> (TokenKind, String) {
        (TokenKind::Identifier, text.to_string())
    }

    fn sym(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn identifier_chars() {
        for (ch, expected) in [
            ('1', true),
            ('a', true),
            ('_', true),
            ('+', true),
            ('-', true),
            (';', true),
            ('#', true),
            ('>', true),
            (',', false),
            ('=', false),
            ('(', false),
            (')', false),
            (' ', false),
            ('\n', false),
            ('\0', false),
        ] {
            assert_eq!(is_identifier_char(ch), expected, "{:?}", ch);
        }
    }

    #[test]
    fn space_predicate_excludes_newline() {
        assert!(is_space(' '));
        assert!(is_space('\t'));
        assert!(!is_space('\n'));
        assert!(!is_space('s'));
    }

    #[test]
    fn continuation_boundary_cases() {
        // (prev, current, rest, segment, expected)
        let cases = [
            ('t', ' ', "canvas", "#viewport", true),
            ('t', ' ', "> canvas", "#viewport", true),
            ('>', ' ', "canvas", ">", true),
            ('o', ' ', "(0)", "div#intro", false),
            ('o', ' ', "{text}", "div#intro", false),
            ('o', ' ', "= div", "intro", false),
            ('o', ' ', "\nnext", "intro", false),
            ('o', ' ', "", "intro", false),
            ('o', ' ', "  canvas", "div", true),
            ('o', ' ', "do f", "x", false),
            ('o', ' ', "return {x}", "x", false),
            ('f', ' ', "name", "def", false),
            ('(', ' ', "x", "(", false),
            ('e', '=', "\"twitter\"]", "[data-name", true),
            (' ', '=', " div", "", false),
            ('d', '(', "2)", "li:nth-child", true),
            (' ', '(', "0)", "", false),
            ('2', ')', "", "li:nth-child(2", true),
            ('(', ')', "", "a(", false),
            ('v', '{', "text}", "div", false),
            ('v', ',', " b", "div", false),
            ('v', '\n', "", "div", false),
            ('(', '2', ")", "nth(", true),
        ];

        for (prev, current, rest, segment, expected) in cases {
            assert_eq!(
                continues_identifier(prev, current, rest, segment),
                expected,
                "prev={:?} current={:?} rest={:?} segment={:?}",
                prev,
                current,
                rest,
                segment
            );
        }
    }

    #[test]
    fn assignment_with_index() -> MungeResult<()> {
        assert_eq!(
            kinds_and_text("intro = div#intro (0)")?,
            vec![
                id("intro"),
                sym(TokenKind::Equals, "="),
                id("div#intro"),
                sym(TokenKind::LParen, "("),
                sym(TokenKind::Integer, "0"),
                sym(TokenKind::RParen, ")"),
                sym(TokenKind::Eof, ""),
            ]
        );
        Ok(())
    }

    #[test]
    fn selectors_keep_spaces_and_punctuation() -> MungeResult<()> {
        assert_eq!(
            kinds_and_text("y = #viewport > canvas {text, html} (1,)")?,
            vec![
                id("y"),
                sym(TokenKind::Equals, "="),
                id("#viewport > canvas"),
                sym(TokenKind::LBrace, "{"),
                id("text"),
                sym(TokenKind::Comma, ","),
                id("html"),
                sym(TokenKind::RBrace, "}"),
                sym(TokenKind::LParen, "("),
                sym(TokenKind::Integer, "1"),
                sym(TokenKind::Comma, ","),
                sym(TokenKind::RParen, ")"),
                sym(TokenKind::Eof, ""),
            ]
        );

        let tokens = kinds_and_text("link = a[data-name=\"twitter\"] li:nth-child(2)")?;
        assert_eq!(tokens[2], id("a[data-name=\"twitter\"] li:nth-child(2)"));
        Ok(())
    }

    #[test]
    fn keywords_are_whole_words() -> MungeResult<()> {
        assert_eq!(
            kinds_and_text("def done\n  return {x}\na, b = do done")?,
            vec![
                sym(TokenKind::Def, "def"),
                id("done"),
                sym(TokenKind::Newline, "\n"),
                sym(TokenKind::Return, "return"),
                sym(TokenKind::LBrace, "{"),
                id("x"),
                sym(TokenKind::RBrace, "}"),
                sym(TokenKind::Newline, "\n"),
                id("a"),
                sym(TokenKind::Comma, ","),
                id("b"),
                sym(TokenKind::Equals, "="),
                sym(TokenKind::Do, "do"),
                id("done"),
                sym(TokenKind::Eof, ""),
            ]
        );
        Ok(())
    }

    #[test]
    fn trailing_spaces_and_crlf_are_not_part_of_selectors() -> MungeResult<()> {
        assert_eq!(
            kinds_and_text("x = div p   \r\n")?,
            vec![
                id("x"),
                sym(TokenKind::Equals, "="),
                id("div p"),
                sym(TokenKind::Newline, "\n"),
                sym(TokenKind::Eof, ""),
            ]
        );
        Ok(())
    }

    #[test]
    fn eof_is_sticky() -> MungeResult<()> {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token()?.kind, TokenKind::Identifier);
        assert_eq!(lexer.next_token()?.kind, TokenKind::Eof);
        assert_eq!(lexer.next_token()?.kind, TokenKind::Eof);
        Ok(())
    }

    #[test]
    fn control_characters_are_rejected() {
        match Lexer::new("x = a\n\u{0}").lex() {
            Err(MungeError::Lex(LexError::UnexpectedCharacter {
                character,
                location,
            })) => {
                assert_eq!(character, '\u{0}');
                assert_eq!(location, Location::new(2, 1));
            }
            other => panic!("expected lex error, got {:?}", other),
        }
    }
}
