//! Recursive-descent parser producing the tree in [`crate::ast`].
//!
//! The parser keeps one token of lookahead. Cover grammars (arrow parameter
//! lists, destructuring assignment, `for` heads) are resolved by snapshotting
//! the parser, trying the narrower production and restoring on failure.

use std::rc::Rc;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexer, Token};

mod declarations;
mod expressions;
mod modules;
mod statements;

#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            position: e.position,
        }
    }
}

/// What the surrounding code allows, for source parsed by `eval` or the
/// `Function` constructor.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    pub strict: bool,
    pub allow_new_target: bool,
    pub allow_super_property: bool,
    pub allow_super_call: bool,
    /// Code inside a function body, where `return` is allowed.
    pub in_function: bool,
}

#[derive(Clone, Default)]
struct Context {
    strict: bool,
    in_function: bool,
    in_generator: bool,
    in_async: bool,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(Rc<str>, bool)>,
    allow_new_target: bool,
    allow_super_property: bool,
    allow_super_call: bool,
    in_parameters: bool,
    in_class_field: bool,
    no_in: bool,
    is_module: bool,
}

#[derive(Clone)]
struct Snapshot<'a> {
    lexer: Lexer<'a>,
    current: Token,
    current_start: usize,
    current_end: usize,
    current_position: Position,
    prev_end: usize,
    prev_line_terminator: bool,
    ctx: Context,
}

pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    current_start: usize,
    current_end: usize,
    current_position: Position,
    prev_end: usize,
    prev_line_terminator: bool,
    ctx: Context,
}

pub fn parse_script(source: &str) -> Result<Script, ParseError> {
    parse_script_with(source, ParseOptions::default())
}

/// Parses script text under the restrictions of its surrounding code.
pub fn parse_script_with(source: &str, options: ParseOptions) -> Result<Script, ParseError> {
    let mut parser = Parser::new(source)?;
    parser.set_strict(options.strict);
    parser.ctx.allow_new_target = options.allow_new_target;
    parser.ctx.allow_super_property = options.allow_super_property;
    parser.ctx.allow_super_call = options.allow_super_call;
    parser.ctx.in_function = options.in_function;
    let body = parser.parse_body(|t| *t == Token::Eof)?;
    parser.check_top_level_declarations(&body)?;
    Ok(Script {
        body,
        strict: parser.ctx.strict,
    })
}

pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let mut parser = Parser::new(source)?;
    parser.set_strict(true);
    parser.ctx.is_module = true;
    parser.parse_module_items()
}

/// Parses the synthesized source of a dynamic function: exactly one function
/// expression and nothing else.
pub fn parse_dynamic_function(
    source: &str,
    is_async: bool,
    is_generator: bool,
) -> Result<Rc<FunctionNode>, ParseError> {
    let mut parser = Parser::new(source)?;
    let start = parser.current_start;
    let position = parser.current_position;
    if is_async {
        parser.expect_keyword(Keyword::Async)?;
    }
    parser.expect_keyword(Keyword::Function)?;
    if is_generator {
        parser.eat(&Token::Star)?;
    }
    let name = parser.binding_identifier()?;
    let node = parser.parse_function_rest(
        start,
        position,
        Some(name),
        FunctionKind::Normal,
        is_async,
        is_generator,
    )?;
    if parser.current != Token::Eof {
        return Err(parser.error("Unexpected token after function body"));
    }
    Ok(node)
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut parser = Parser {
            source,
            lexer: Lexer::new(source),
            current: Token::Eof,
            current_start: 0,
            current_end: 0,
            current_position: Position::default(),
            prev_end: 0,
            prev_line_terminator: false,
            ctx: Context::default(),
        };
        parser.advance()?;
        Ok(parser)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        self.prev_end = self.current_end;
        self.prev_line_terminator = false;
        let next = loop {
            let token = self.lexer.next_token()?;
            if token == Token::LineTerminator {
                self.prev_line_terminator = true;
                continue;
            }
            break token;
        };
        self.current_start = self.lexer.token_start();
        self.current_end = self.lexer.offset();
        self.current_position = self.lexer.token_position();
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn snapshot(&self) -> Snapshot<'a> {
        Snapshot {
            lexer: self.lexer.clone(),
            current: self.current.clone(),
            current_start: self.current_start,
            current_end: self.current_end,
            current_position: self.current_position,
            prev_end: self.prev_end,
            prev_line_terminator: self.prev_line_terminator,
            ctx: self.ctx.clone(),
        }
    }

    fn restore(&mut self, s: Snapshot<'a>) {
        self.lexer = s.lexer;
        self.current = s.current;
        self.current_start = s.current_start;
        self.current_end = s.current_end;
        self.current_position = s.current_position;
        self.prev_end = s.prev_end;
        self.prev_line_terminator = s.prev_line_terminator;
        self.ctx = s.ctx;
    }

    /// Runs `attempt`, rolling the parser back if it fails or declines.
    fn try_parse<T>(
        &mut self,
        attempt: impl FnOnce(&mut Self) -> Result<Option<T>, ParseError>,
    ) -> Option<T> {
        let saved = self.snapshot();
        match attempt(self) {
            Ok(Some(v)) => Some(v),
            _ => {
                self.restore(saved);
                None
            }
        }
    }

    /// The token after the current one, without consuming anything.
    fn peek_next(&self) -> Option<(Token, bool)> {
        let mut lexer = self.lexer.clone();
        let mut newline = false;
        loop {
            match lexer.next_token() {
                Ok(Token::LineTerminator) => newline = true,
                Ok(t) => return Some((t, newline)),
                Err(_) => return None,
            }
        }
    }

    fn is(&self, token: &Token) -> bool {
        &self.current == token
    }

    fn is_keyword(&self, kw: Keyword) -> bool {
        self.current == Token::Keyword(kw)
    }

    fn eat(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn eat_if(&mut self, expected: &Token) -> Result<bool, ParseError> {
        if &self.current == expected {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        self.eat(&Token::Keyword(kw))
    }

    // §12.10 Automatic Semicolon Insertion
    fn eat_semicolon(&mut self) -> Result<(), ParseError> {
        if self.current == Token::Semicolon {
            self.advance()?;
            return Ok(());
        }
        if self.prev_line_terminator || matches!(self.current, Token::RightBrace | Token::Eof) {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.current_position,
        }
    }

    fn unexpected(&self) -> ParseError {
        match &self.current {
            Token::Eof => self.error("Unexpected end of input"),
            _ => self.error(format!(
                "Unexpected token '{}'",
                &self.source[self.current_start..self.current_end]
            )),
        }
    }

    fn source_since(&self, start: usize) -> Rc<str> {
        self.source[start..self.prev_end].into()
    }

    fn set_strict(&mut self, strict: bool) {
        self.ctx.strict = strict;
        self.lexer.strict = strict;
    }

    fn is_strict_reserved(name: &str) -> bool {
        matches!(
            name,
            "implements" | "interface" | "package" | "private" | "protected" | "public"
        )
    }

    /// Any IdentifierName, including reserved words, as used after `.` and
    /// as property keys.
    fn identifier_name(&self) -> Option<Rc<str>> {
        match &self.current {
            Token::Identifier(n) | Token::EscapedIdentifier(n) => Some(n.as_str().into()),
            Token::Keyword(k) => Some(k.as_str().into()),
            Token::BooleanLiteral(true) => Some("true".into()),
            Token::BooleanLiteral(false) => Some("false".into()),
            Token::NullLiteral => Some("null".into()),
            _ => None,
        }
    }

    /// The current token as an IdentifierReference, if it is one in the
    /// current context.
    fn current_identifier(&self) -> Option<Rc<str>> {
        match &self.current {
            Token::Identifier(n) => {
                if self.ctx.strict && Self::is_strict_reserved(n) {
                    return None;
                }
                Some(n.as_str().into())
            }
            Token::EscapedIdentifier(n) => {
                let reserved = match Keyword::from_str(n) {
                    Some(k) => !k.is_contextual() || matches!(k, Keyword::Yield | Keyword::Await),
                    None => matches!(n.as_str(), "true" | "false" | "null"),
                };
                if reserved || (self.ctx.strict && Self::is_strict_reserved(n)) {
                    return None;
                }
                Some(n.as_str().into())
            }
            Token::Keyword(k) => {
                let allowed = match k {
                    Keyword::Async | Keyword::Get | Keyword::Set | Keyword::Of => true,
                    Keyword::Let | Keyword::Static => !self.ctx.strict,
                    Keyword::Yield => !self.ctx.in_generator && !self.ctx.strict,
                    Keyword::Await => !self.ctx.in_async && !self.ctx.is_module,
                    _ => false,
                };
                allowed.then(|| k.as_str().into())
            }
            _ => None,
        }
    }

    fn identifier_reference(&mut self) -> Result<Rc<str>, ParseError> {
        match self.current_identifier() {
            Some(name) => {
                self.advance()?;
                Ok(name)
            }
            None => Err(self.unexpected()),
        }
    }

    fn check_binding_name(&self, name: &str) -> Result<(), ParseError> {
        if self.ctx.strict && (name == "eval" || name == "arguments") {
            return Err(self.error(format!("Unexpected eval or arguments in strict mode ({name})")));
        }
        Ok(())
    }

    fn binding_identifier(&mut self) -> Result<Rc<str>, ParseError> {
        let name = self.identifier_reference()?;
        self.check_binding_name(&name)?;
        Ok(name)
    }

    /// Parses a statement list up to `end`, handling a directive prologue.
    fn parse_body(&mut self, end: impl Fn(&Token) -> bool) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        let mut in_prologue = true;
        while !end(&self.current) {
            if in_prologue {
                if let Token::StringLiteral(..) = self.current {
                    let raw = &self.source[self.current_start..self.current_end];
                    let is_use_strict = raw == "'use strict'" || raw == "\"use strict\"";
                    let ends_statement = match self.peek_next() {
                        Some((t, newline)) => {
                            newline || matches!(t, Token::Semicolon | Token::RightBrace | Token::Eof)
                        }
                        None => false,
                    };
                    if is_use_strict && ends_statement {
                        self.set_strict(true);
                    }
                    if !ends_statement {
                        in_prologue = false;
                    }
                } else {
                    in_prologue = false;
                }
            }
            body.push(self.parse_statement_list_item()?);
        }
        Ok(body)
    }

    /// Early errors for a statement list that forms its own scope: duplicate
    /// lexical names, and lexical names that clash with var names.
    fn check_scope(&self, lexical: &[Declaration<'_>], var_names: &[Rc<str>]) -> Result<(), ParseError> {
        let mut seen: FxHashSet<Rc<str>> = FxHashSet::default();
        for decl in lexical {
            for name in decl.bound_names() {
                if !seen.insert(name.clone()) {
                    return Err(self.error(format!("Identifier '{name}' has already been declared")));
                }
            }
        }
        for name in var_names {
            if seen.contains(name) {
                return Err(self.error(format!("Identifier '{name}' has already been declared")));
            }
        }
        Ok(())
    }

    fn check_top_level_declarations(&self, body: &[Statement]) -> Result<(), ParseError> {
        let lexical = top_level_lexically_scoped_declarations(body);
        let mut var_names = Vec::new();
        for d in top_level_var_scoped_declarations(body) {
            if !matches!(d, Declaration::Function(_)) {
                var_names.extend(d.bound_names());
            }
        }
        self.check_scope(&lexical, &var_names)?;
        let functions: Vec<Rc<str>> = top_level_var_scoped_declarations(body)
            .iter()
            .filter(|d| matches!(d, Declaration::Function(_)))
            .flat_map(Declaration::bound_names)
            .collect();
        self.check_scope(&lexical, &functions)
    }

    fn check_block_declarations(&self, body: &[Statement]) -> Result<(), ParseError> {
        let lexical = lexically_scoped_declarations(body);
        let mut var_decls = Vec::new();
        var_scoped_declarations(body, &mut var_decls);
        let var_names: Vec<Rc<str>> = var_decls.iter().flat_map(Declaration::bound_names).collect();
        if self.ctx.strict {
            return self.check_scope(&lexical, &var_names);
        }
        // Sloppy code may repeat plain function declarations in a block.
        let mut seen: FxHashSet<Rc<str>> = FxHashSet::default();
        let mut functions: FxHashSet<Rc<str>> = FxHashSet::default();
        for decl in &lexical {
            let is_plain_function = matches!(
                decl,
                Declaration::Function(f) if !f.is_async && !f.is_generator
            );
            for name in decl.bound_names() {
                let repeat_function = is_plain_function && functions.contains(&name);
                if !seen.insert(name.clone()) && !repeat_function {
                    return Err(self.error(format!("Identifier '{name}' has already been declared")));
                }
                if is_plain_function {
                    functions.insert(name);
                }
            }
        }
        for name in &var_names {
            if seen.contains(name) {
                return Err(self.error(format!("Identifier '{name}' has already been declared")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(src: &str) -> Script {
        match parse_script(src) {
            Ok(s) => s,
            Err(e) => panic!("{src}: {e}"),
        }
    }

    #[test]
    fn use_strict_directive_sets_strictness() {
        assert!(script("'use strict'; var x = 1;").strict);
        assert!(!script("'use strict' + 1;").strict);
        assert!(!script("var x = 'use strict';").strict);
    }

    #[test]
    fn strict_mode_rejects_legacy_octal_after_directive() {
        assert!(parse_script("'use strict'; 010").is_err());
        assert!(parse_script("010").is_ok());
    }

    #[test]
    fn duplicate_lexical_declarations_are_errors() {
        assert!(parse_script("let a; let a;").is_err());
        assert!(parse_script("let a; var a;").is_err());
        assert!(parse_script("var a; var a;").is_ok());
        assert!(parse_script("{ function f() {} function f() {} }").is_ok());
        assert!(parse_script("'use strict'; { function f() {} function f() {} }").is_err());
    }

    #[test]
    fn with_statement_is_rejected() {
        assert!(parse_script("with (o) {}").is_err());
    }

    #[test]
    fn asi_inserts_semicolons_at_newlines() {
        let s = script("a = 1\nb = 2\n");
        assert_eq!(s.body.len(), 2);
        assert!(parse_script("a = 1 b = 2").is_err());
    }

    #[test]
    fn parse_errors_carry_positions() {
        let err = match parse_script("var x = ;") {
            Err(e) => e,
            Ok(_) => panic!("expected a parse error"),
        };
        assert_eq!(err.position, Position { line: 1, column: 8 });
    }

    #[test]
    fn dynamic_function_source_must_be_one_function() {
        assert!(parse_dynamic_function("function anonymous(a, b\n) {\nreturn a + b\n}", false, false).is_ok());
        assert!(parse_dynamic_function("function anonymous(\n) {\n}}; x", false, false).is_err());
    }
}
