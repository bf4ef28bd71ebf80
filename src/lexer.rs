use std::fmt;
use std::str::Chars;

use thiserror::Error;

use crate::ast::Position;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Identifier(String),
    /// An identifier spelled with a unicode escape; never a keyword.
    EscapedIdentifier(String),
    Keyword(Keyword),

    NumericLiteral(f64),
    LegacyOctalLiteral(f64),
    BigIntLiteral(String),
    /// Cooked UTF-16 code units, plus whether a legacy octal escape occurred.
    StringLiteral(Vec<u16>, bool),
    BooleanLiteral(bool),
    NullLiteral,
    RegExpLiteral { pattern: String, flags: String },

    // (cooked, raw); cooked is None for an invalid escape sequence
    NoSubstitutionTemplate(Option<Vec<u16>>, Vec<u16>),
    TemplateHead(Option<Vec<u16>>, Vec<u16>),
    TemplateMiddle(Option<Vec<u16>>, Vec<u16>),
    TemplateTail(Option<Vec<u16>>, Vec<u16>),

    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    Ellipsis,
    Semicolon,
    Comma,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Plus,
    Minus,
    Star,
    Percent,
    Exponent,
    Increment,
    Decrement,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    Ampersand,
    Pipe,
    Caret,
    Bang,
    Tilde,
    LogicalAnd,
    LogicalOr,
    NullishCoalescing,
    Question,
    OptionalChain,
    Colon,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    PercentAssign,
    ExponentAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    AmpersandAssign,
    PipeAssign,
    CaretAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishAssign,
    Arrow,
    Slash,
    SlashAssign,

    LineTerminator,
    Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Async,
    Await,
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    Finally,
    For,
    Function,
    Get,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Of,
    Return,
    Set,
    Static,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Yield,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        Some(match s {
            "async" => Keyword::Async,
            "await" => Keyword::Await,
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "catch" => Keyword::Catch,
            "class" => Keyword::Class,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "debugger" => Keyword::Debugger,
            "default" => Keyword::Default,
            "delete" => Keyword::Delete,
            "do" => Keyword::Do,
            "else" => Keyword::Else,
            "enum" => Keyword::Enum,
            "export" => Keyword::Export,
            "extends" => Keyword::Extends,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "function" => Keyword::Function,
            "get" => Keyword::Get,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "instanceof" => Keyword::Instanceof,
            "let" => Keyword::Let,
            "new" => Keyword::New,
            "of" => Keyword::Of,
            "return" => Keyword::Return,
            "set" => Keyword::Set,
            "static" => Keyword::Static,
            "super" => Keyword::Super,
            "switch" => Keyword::Switch,
            "this" => Keyword::This,
            "throw" => Keyword::Throw,
            "try" => Keyword::Try,
            "typeof" => Keyword::Typeof,
            "var" => Keyword::Var,
            "void" => Keyword::Void,
            "while" => Keyword::While,
            "with" => Keyword::With,
            "yield" => Keyword::Yield,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Async => "async",
            Keyword::Await => "await",
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Class => "class",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Debugger => "debugger",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Enum => "enum",
            Keyword::Export => "export",
            Keyword::Extends => "extends",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::Get => "get",
            Keyword::If => "if",
            Keyword::Import => "import",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::Let => "let",
            Keyword::New => "new",
            Keyword::Of => "of",
            Keyword::Return => "return",
            Keyword::Set => "set",
            Keyword::Static => "static",
            Keyword::Super => "super",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
            Keyword::Yield => "yield",
        }
    }

    /// Contextual keywords that are ordinary identifiers outside their
    /// special positions.
    pub fn is_contextual(self) -> bool {
        matches!(
            self,
            Keyword::Async
                | Keyword::Await
                | Keyword::Get
                | Keyword::Let
                | Keyword::Of
                | Keyword::Set
                | Keyword::Static
                | Keyword::Yield
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error)]
#[error("{message} ({}:{})", position.line, position.column)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    current: Option<char>,
    offset: usize,
    line: u32,
    column: u32,
    token_start: usize,
    token_position: Position,
    pub strict: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            current,
            offset: 0,
            line: 1,
            column: 0,
            token_start: 0,
            token_position: Position { line: 1, column: 0 },
            strict: false,
        }
    }

    /// Byte offset just past the last token.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn token_position(&self) -> Position {
        self.token_position
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current;
        if let Some(c) = ch {
            self.offset += c.len_utf8();
            self.column += 1;
            self.current = self.chars.next();
        }
        ch
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            position: self.position(),
        }
    }

    fn is_line_terminator(ch: char) -> bool {
        matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
    }

    fn is_whitespace(ch: char) -> bool {
        matches!(ch, '\t' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}')
            || (ch.is_whitespace() && !Self::is_line_terminator(ch))
    }

    fn is_identifier_start(ch: char) -> bool {
        ch == '_' || ch == '$' || ch.is_ascii_alphabetic() || (!ch.is_ascii() && unicode_ident::is_xid_start(ch))
    }

    fn is_identifier_continue(ch: char) -> bool {
        ch == '_'
            || ch == '$'
            || ch.is_ascii_alphanumeric()
            || ch == '\u{200C}'
            || ch == '\u{200D}'
            || (!ch.is_ascii() && unicode_ident::is_xid_continue(ch))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(Self::is_whitespace) {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let mut has_line_terminator = false;
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return Ok(has_line_terminator);
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    has_line_terminator = true;
                    self.handle_newline(ch);
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated block comment")),
            }
        }
    }

    fn handle_newline(&mut self, ch: char) {
        if ch == '\r' && self.peek() == Some('\n') {
            self.advance();
        }
        self.line += 1;
        self.column = 0;
    }

    fn read_string(&mut self, quote: char) -> Result<(Vec<u16>, bool), LexError> {
        let mut units = Vec::new();
        let mut legacy_octal = false;
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string literal")),
                Some(ch) if ch == quote => return Ok((units, legacy_octal)),
                Some('\n' | '\r') => return Err(self.error("Unterminated string literal")),
                Some('\\') => {
                    let esc = self.read_escape_sequence(false)?;
                    legacy_octal |= esc.legacy_octal;
                    units.extend(esc.units);
                }
                Some(ch) => push_char(&mut units, ch),
            }
        }
    }

    fn read_escape_sequence(&mut self, in_template: bool) -> Result<Escape, LexError> {
        let simple = |c: u16| Ok(Escape { units: vec![c], legacy_octal: false });
        match self.advance() {
            None => Err(self.error("Unterminated escape sequence")),
            Some('n') => simple(0x0a),
            Some('r') => simple(0x0d),
            Some('t') => simple(0x09),
            Some('b') => simple(0x08),
            Some('f') => simple(0x0c),
            Some('v') => simple(0x0b),
            Some('0') if !self.peek().is_some_and(|c| c.is_ascii_digit()) => simple(0),
            Some(ch @ '0'..='7') => {
                if self.strict || in_template {
                    return Err(self.error("Octal escape sequences are not allowed in strict mode"));
                }
                let mut value = ch as u32 - '0' as u32;
                if let Some(d) = self.peek().and_then(|c| c.to_digit(8)) {
                    self.advance();
                    value = value * 8 + d;
                    if ch <= '3' {
                        if let Some(d) = self.peek().and_then(|c| c.to_digit(8)) {
                            self.advance();
                            value = value * 8 + d;
                        }
                    }
                }
                Ok(Escape {
                    units: vec![value as u16],
                    legacy_octal: true,
                })
            }
            Some('8' | '9') if self.strict || in_template => {
                Err(self.error("\\8 and \\9 are not allowed in strict mode"))
            }
            Some('x') => {
                let hi = self.advance().and_then(hex_val);
                let lo = self.advance().and_then(hex_val);
                match (hi, lo) {
                    (Some(h), Some(l)) => simple((h * 16 + l) as u16),
                    _ => Err(self.error("Invalid hexadecimal escape sequence")),
                }
            }
            Some('u') => {
                let cp = self.read_unicode_escape()?;
                let mut units = Vec::new();
                push_code_point(&mut units, cp);
                Ok(Escape {
                    units,
                    legacy_octal: false,
                })
            }
            Some(ch) if Self::is_line_terminator(ch) => {
                self.handle_newline(ch);
                Ok(Escape {
                    units: Vec::new(),
                    legacy_octal: false,
                })
            }
            Some(ch) => {
                let mut units = Vec::new();
                push_char(&mut units, ch);
                Ok(Escape {
                    units,
                    legacy_octal: false,
                })
            }
        }
    }

    /// Reads the part after `\u`, returning a code point (possibly a lone
    /// surrogate).
    fn read_unicode_escape(&mut self) -> Result<u32, LexError> {
        if self.peek() == Some('{') {
            self.advance();
            let mut value: u32 = 0;
            let mut digits = 0;
            loop {
                match self.advance() {
                    Some('}') if digits > 0 => return Ok(value),
                    Some(c) => {
                        let d = hex_val(c).ok_or_else(|| self.error("Invalid Unicode escape sequence"))?;
                        value = value * 16 + d;
                        if value > 0x10FFFF {
                            return Err(self.error("Undefined Unicode code-point"));
                        }
                        digits += 1;
                    }
                    None => return Err(self.error("Invalid Unicode escape sequence")),
                }
            }
        }
        let mut value = 0;
        for _ in 0..4 {
            let d = self
                .advance()
                .and_then(hex_val)
                .ok_or_else(|| self.error("Invalid Unicode escape sequence"))?;
            value = value * 16 + d;
        }
        Ok(value)
    }

    fn read_numeric_literal(&mut self, first: char) -> Result<Token, LexError> {
        let mut s = String::new();
        s.push(first);
        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => return self.read_radix_literal(16),
                Some('o' | 'O') => return self.read_radix_literal(8),
                Some('b' | 'B') => return self.read_radix_literal(2),
                Some(c) if c.is_ascii_digit() => return self.read_legacy_octal_or_decimal(s),
                _ => {}
            }
        }
        if first != '.' {
            self.read_decimal_digits(&mut s);
            if self.peek() == Some('n') {
                self.advance();
                return Ok(Token::BigIntLiteral(s.replace('_', "")));
            }
            if self.peek() == Some('.') {
                s.push('.');
                self.advance();
            }
        }
        self.read_decimal_digits(&mut s);
        self.read_exponent(&mut s);
        if self.peek().is_some_and(Self::is_identifier_start) {
            return Err(self.error("Identifier starts immediately after numeric literal"));
        }
        let clean = s.replace('_', "");
        clean
            .parse::<f64>()
            .map(Token::NumericLiteral)
            .map_err(|_| self.error("Invalid numeric literal"))
    }

    fn read_exponent(&mut self, s: &mut String) {
        if let Some(e @ ('e' | 'E')) = self.peek() {
            s.push(e);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                s.push(sign);
                self.advance();
            }
            self.read_decimal_digits(s);
        }
    }

    fn read_decimal_digits(&mut self, s: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_radix_literal(&mut self, radix: u32) -> Result<Token, LexError> {
        self.advance();
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                digits.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }
        if digits.is_empty() {
            return Err(self.error("Invalid or unexpected token"));
        }
        if self.peek() == Some('n') {
            self.advance();
            let prefix = match radix {
                16 => "0x",
                8 => "0o",
                _ => "0b",
            };
            return Ok(Token::BigIntLiteral(format!("{prefix}{digits}")));
        }
        let mut value = 0f64;
        for c in digits.chars() {
            value = value * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0));
        }
        Ok(Token::NumericLiteral(value))
    }

    fn read_legacy_octal_or_decimal(&mut self, mut s: String) -> Result<Token, LexError> {
        let mut is_octal = true;
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            if ch >= '8' {
                is_octal = false;
            }
            s.push(ch);
            self.advance();
        }
        if self.strict {
            return Err(self.error("Octal literals are not allowed in strict mode"));
        }
        if is_octal {
            let value = s[1..]
                .chars()
                .fold(0f64, |acc, c| acc * 8.0 + f64::from(c.to_digit(8).unwrap_or(0)));
            return Ok(Token::LegacyOctalLiteral(value));
        }
        if self.peek() == Some('.') {
            s.push('.');
            self.advance();
            self.read_decimal_digits(&mut s);
        }
        self.read_exponent(&mut s);
        s.parse::<f64>()
            .map(Token::NumericLiteral)
            .map_err(|_| self.error("Invalid numeric literal"))
    }

    fn read_identifier(&mut self, first: Option<char>) -> Result<Token, LexError> {
        let mut name = String::new();
        let mut escaped = false;
        match first {
            Some(c) => name.push(c),
            None => {
                escaped = true;
                name.push(self.read_identifier_escape()?);
            }
        }
        loop {
            match self.peek() {
                Some(ch) if Self::is_identifier_continue(ch) => {
                    name.push(ch);
                    self.advance();
                }
                Some('\\') => {
                    self.advance();
                    escaped = true;
                    name.push(self.read_identifier_escape()?);
                }
                _ => break,
            }
        }
        if escaped {
            return Ok(Token::EscapedIdentifier(name));
        }
        Ok(match name.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::NullLiteral,
            _ => match Keyword::from_str(&name) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Identifier(name),
            },
        })
    }

    fn read_identifier_escape(&mut self) -> Result<char, LexError> {
        if self.advance() != Some('u') {
            return Err(self.error("Invalid Unicode escape sequence"));
        }
        let cp = self.read_unicode_escape()?;
        char::from_u32(cp).ok_or_else(|| self.error("Invalid Unicode escape sequence"))
    }

    /// Re-scans from just after a `/` or `/=` the parser found in operand
    /// position.
    pub fn lex_regex(&mut self, starts_with_assign: bool) -> Result<Token, LexError> {
        let mut pattern = String::new();
        if starts_with_assign {
            pattern.push('=');
        }
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    return Err(self.error("Invalid regular expression: missing /"));
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        _ => {}
                    }
                    pattern.push(c);
                    self.advance();
                    if c == '\\' {
                        match self.advance() {
                            Some(n) if !Self::is_line_terminator(n) => pattern.push(n),
                            _ => return Err(self.error("Invalid regular expression: missing /")),
                        }
                    }
                }
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek().filter(|c| Self::is_identifier_continue(*c)) {
            flags.push(c);
            self.advance();
        }
        Ok(Token::RegExpLiteral { pattern, flags })
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            self.token_start = self.offset;
            self.token_position = self.position();
            let Some(ch) = self.peek() else {
                return Ok(Token::Eof);
            };
            if Self::is_line_terminator(ch) {
                self.advance();
                self.handle_newline(ch);
                return Ok(Token::LineTerminator);
            }
            if ch == '/' {
                match self.peek_next() {
                    Some('/') => {
                        self.skip_line_comment();
                        continue;
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        if self.skip_block_comment()? {
                            return Ok(Token::LineTerminator);
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            if ch == '#' && self.offset == 0 && self.peek_next() == Some('!') {
                self.skip_line_comment();
                continue;
            }
            self.advance();
            return match ch {
                '\'' | '"' => {
                    let (units, legacy_octal) = self.read_string(ch)?;
                    Ok(Token::StringLiteral(units, legacy_octal))
                }
                '`' => self.read_template_part(true),
                '0'..='9' => self.read_numeric_literal(ch),
                '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_numeric_literal(ch),
                '\\' => self.read_identifier(None),
                c if Self::is_identifier_start(c) => self.read_identifier(Some(c)),
                c => self.read_punctuator(c),
            };
        }
    }

    /// Reads template characters up to the closing backtick or the next `${`.
    fn read_template_chars(&mut self) -> Result<(Option<Vec<u16>>, Vec<u16>, bool), LexError> {
        let mut cooked = Some(Vec::new());
        let mut raw = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => return Ok((cooked, raw, true)),
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    return Ok((cooked, raw, false));
                }
                Some('\\') => {
                    let before = self.offset;
                    let escape = self.read_escape_sequence(true);
                    raw.push(u16::from(b'\\'));
                    let text = self.source[before..self.offset].replace("\r\n", "\n").replace('\r', "\n");
                    raw.extend(text.encode_utf16());
                    match escape {
                        Ok(esc) => {
                            if let Some(c) = cooked.as_mut() {
                                c.extend(esc.units);
                            }
                        }
                        Err(_) => cooked = None,
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    let normalized = if ch == '\r' { '\n' } else { ch };
                    self.handle_newline(ch);
                    push_char(&mut raw, normalized);
                    if let Some(c) = cooked.as_mut() {
                        push_char(c, normalized);
                    }
                }
                Some(ch) => {
                    push_char(&mut raw, ch);
                    if let Some(c) = cooked.as_mut() {
                        push_char(c, ch);
                    }
                }
            }
        }
    }

    fn read_template_part(&mut self, head: bool) -> Result<Token, LexError> {
        let (cooked, raw, is_tail) = self.read_template_chars()?;
        Ok(match (head, is_tail) {
            (true, true) => Token::NoSubstitutionTemplate(cooked, raw),
            (true, false) => Token::TemplateHead(cooked, raw),
            (false, true) => Token::TemplateTail(cooked, raw),
            (false, false) => Token::TemplateMiddle(cooked, raw),
        })
    }

    /// Continues a template after the `}` closing a substitution.
    pub fn read_template_continuation(&mut self) -> Result<Token, LexError> {
        self.read_template_part(false)
    }

    fn eat_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn read_punctuator(&mut self, ch: char) -> Result<Token, LexError> {
        let token = match ch {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '~' => Token::Tilde,
            ':' => Token::Colon,
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    Token::Ellipsis
                } else {
                    Token::Dot
                }
            }
            '?' => {
                if self.eat_if('?') {
                    if self.eat_if('=') { Token::NullishAssign } else { Token::NullishCoalescing }
                } else if self.peek() == Some('.') && !self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                    Token::OptionalChain
                } else {
                    Token::Question
                }
            }
            '<' => {
                if self.eat_if('<') {
                    if self.eat_if('=') { Token::LeftShiftAssign } else { Token::LeftShift }
                } else if self.eat_if('=') {
                    Token::LessThanEqual
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                if self.eat_if('>') {
                    if self.eat_if('>') {
                        if self.eat_if('=') {
                            Token::UnsignedRightShiftAssign
                        } else {
                            Token::UnsignedRightShift
                        }
                    } else if self.eat_if('=') {
                        Token::RightShiftAssign
                    } else {
                        Token::RightShift
                    }
                } else if self.eat_if('=') {
                    Token::GreaterThanEqual
                } else {
                    Token::GreaterThan
                }
            }
            '=' => {
                if self.eat_if('=') {
                    if self.eat_if('=') { Token::StrictEqual } else { Token::Equal }
                } else if self.eat_if('>') {
                    Token::Arrow
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.eat_if('=') {
                    if self.eat_if('=') { Token::StrictNotEqual } else { Token::NotEqual }
                } else {
                    Token::Bang
                }
            }
            '+' => {
                if self.eat_if('+') {
                    Token::Increment
                } else if self.eat_if('=') {
                    Token::PlusAssign
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if self.eat_if('-') {
                    Token::Decrement
                } else if self.eat_if('=') {
                    Token::MinusAssign
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if self.eat_if('*') {
                    if self.eat_if('=') { Token::ExponentAssign } else { Token::Exponent }
                } else if self.eat_if('=') {
                    Token::StarAssign
                } else {
                    Token::Star
                }
            }
            '/' => {
                if self.eat_if('=') { Token::SlashAssign } else { Token::Slash }
            }
            '%' => {
                if self.eat_if('=') { Token::PercentAssign } else { Token::Percent }
            }
            '&' => {
                if self.eat_if('&') {
                    if self.eat_if('=') { Token::LogicalAndAssign } else { Token::LogicalAnd }
                } else if self.eat_if('=') {
                    Token::AmpersandAssign
                } else {
                    Token::Ampersand
                }
            }
            '|' => {
                if self.eat_if('|') {
                    if self.eat_if('=') { Token::LogicalOrAssign } else { Token::LogicalOr }
                } else if self.eat_if('=') {
                    Token::PipeAssign
                } else {
                    Token::Pipe
                }
            }
            '^' => {
                if self.eat_if('=') { Token::CaretAssign } else { Token::Caret }
            }
            _ => return Err(self.error(format!("Invalid or unexpected token '{ch}'"))),
        };
        Ok(token)
    }
}

struct Escape {
    units: Vec<u16>,
    legacy_octal: bool,
}

fn push_char(units: &mut Vec<u16>, ch: char) {
    let mut buf = [0u16; 2];
    units.extend_from_slice(ch.encode_utf16(&mut buf));
}

fn push_code_point(units: &mut Vec<u16>, cp: u32) {
    match char::from_u32(cp) {
        Some(c) => push_char(units, c),
        None => units.push(cp as u16),
    }
}

fn hex_val(ch: char) -> Option<u32> {
    ch.to_digit(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            match lexer.next_token() {
                Ok(Token::Eof) => break,
                Ok(Token::LineTerminator) => {}
                Ok(t) => tokens.push(t),
                Err(e) => panic!("{e}"),
            }
        }
        tokens
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            lex("let x = yield"),
            vec![
                Token::Keyword(Keyword::Let),
                Token::Identifier("x".into()),
                Token::Assign,
                Token::Keyword(Keyword::Yield),
            ]
        );
    }

    #[test]
    fn string_escapes_produce_utf16() {
        assert_eq!(
            lex(r#"'a\n\u{1F600}\uD800'"#),
            vec![Token::StringLiteral(vec![0x61, 0x0a, 0xD83D, 0xDE00, 0xD800], false)]
        );
        assert_eq!(lex(r"'\101'"), vec![Token::StringLiteral(vec![0x41], true)]);
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(lex("0x1F"), vec![Token::NumericLiteral(31.0)]);
        assert_eq!(lex("1_000.5e1"), vec![Token::NumericLiteral(10005.0)]);
        assert_eq!(lex(".5"), vec![Token::NumericLiteral(0.5)]);
        assert_eq!(lex("017"), vec![Token::LegacyOctalLiteral(15.0)]);
        assert_eq!(lex("10n"), vec![Token::BigIntLiteral("10".into())]);
        assert_eq!(lex("0xffn"), vec![Token::BigIntLiteral("0xff".into())]);
    }

    #[test]
    fn comments_with_newlines_become_line_terminators() {
        let mut lexer = Lexer::new("a /* \n */ b // c\nd");
        let mut tokens = Vec::new();
        while let Ok(t) = lexer.next_token() {
            if t == Token::Eof {
                break;
            }
            tokens.push(t);
        }
        assert_eq!(tokens.iter().filter(|t| **t == Token::LineTerminator).count(), 2);
    }

    #[test]
    fn template_raw_and_cooked_differ() {
        assert_eq!(
            lex(r"`a\tb`"),
            vec![Token::NoSubstitutionTemplate(
                Some("a\tb".encode_utf16().collect()),
                r"a\tb".encode_utf16().collect()
            )]
        );
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let mut lexer = Lexer::new("a\n  bc");
        assert_eq!(lexer.next_token().ok(), Some(Token::Identifier("a".into())));
        assert_eq!(lexer.next_token().ok(), Some(Token::LineTerminator));
        assert_eq!(lexer.next_token().ok(), Some(Token::Identifier("bc".into())));
        assert_eq!(lexer.token_position(), Position { line: 2, column: 2 });
    }
}
