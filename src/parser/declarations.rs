use super::*;
use crate::types::{JsString, number_ops};

impl<'a> Parser<'a> {
    /// Saves the surrounding context and sets up the one for a new function
    /// body. Arrow functions keep `super`, `new.target` and `await` handling
    /// from their surroundings.
    fn enter_function(&mut self, kind: FunctionKind, is_async: bool, is_generator: bool, derived: bool) -> Context {
        let saved = self.ctx.clone();
        self.ctx.in_function = true;
        self.ctx.in_async = is_async;
        self.ctx.in_generator = is_generator;
        self.ctx.in_iteration = 0;
        self.ctx.in_switch = 0;
        self.ctx.labels.clear();
        self.ctx.no_in = false;
        self.ctx.in_parameters = false;
        if kind != FunctionKind::Arrow {
            self.ctx.allow_new_target = true;
            self.ctx.in_class_field = false;
            self.ctx.allow_super_property =
                matches!(kind, FunctionKind::Method | FunctionKind::ClassConstructor | FunctionKind::ClassField);
            self.ctx.allow_super_call = kind == FunctionKind::ClassConstructor && derived;
        }
        saved
    }

    fn leave_function(&mut self, saved: Context) {
        let strict = saved.strict;
        self.ctx = saved;
        self.lexer.strict = strict;
    }

    pub(super) fn parse_function_declaration(&mut self, is_default_export: bool) -> Result<Rc<FunctionNode>, ParseError> {
        let start = self.current_start;
        let position = self.current_position;
        let is_async = self.eat_if(&Token::Keyword(Keyword::Async))?;
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat_if(&Token::Star)?;
        let name = if self.is(&Token::LeftParen) && is_default_export {
            None
        } else {
            Some(self.binding_identifier()?)
        };
        self.parse_function_rest(start, position, name, FunctionKind::Normal, is_async, is_generator)
    }

    pub(super) fn parse_function_expression(&mut self) -> Result<Rc<FunctionNode>, ParseError> {
        let start = self.current_start;
        let position = self.current_position;
        let is_async = self.eat_if(&Token::Keyword(Keyword::Async))?;
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat_if(&Token::Star)?;
        let name = if self.is(&Token::LeftParen) {
            None
        } else {
            // The name is bound inside the function, under its own kind.
            let saved = (self.ctx.in_generator, self.ctx.in_async);
            self.ctx.in_generator = is_generator;
            self.ctx.in_async = is_async;
            let name = self.binding_identifier();
            (self.ctx.in_generator, self.ctx.in_async) = saved;
            Some(name?)
        };
        self.parse_function_rest(start, position, name, FunctionKind::Normal, is_async, is_generator)
    }

    pub(super) fn parse_function_rest(
        &mut self,
        start: usize,
        position: Position,
        name: Option<Rc<str>>,
        kind: FunctionKind,
        is_async: bool,
        is_generator: bool,
    ) -> Result<Rc<FunctionNode>, ParseError> {
        self.parse_function_with(start, position, name, kind, is_async, is_generator, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_function_with(
        &mut self,
        start: usize,
        position: Position,
        name: Option<Rc<str>>,
        kind: FunctionKind,
        is_async: bool,
        is_generator: bool,
        derived: bool,
    ) -> Result<Rc<FunctionNode>, ParseError> {
        let saved = self.enter_function(kind, is_async, is_generator, derived);
        let result = self.parse_function_parts(kind, is_async);
        let strict = self.ctx.strict;
        self.leave_function(saved);
        let (params, rest, body) = result?;
        Ok(Rc::new(FunctionNode {
            name,
            params,
            rest,
            body: FunctionBody::Block(body),
            kind,
            is_async,
            is_generator,
            strict,
            derived,
            source_text: self.source_since(start),
            position,
        }))
    }

    fn parse_function_parts(
        &mut self,
        kind: FunctionKind,
        is_async: bool,
    ) -> Result<(Vec<Pattern>, Option<Pattern>, Vec<Statement>), ParseError> {
        let (params, rest) = self.parse_formal_parameters()?;
        let strict_before = self.ctx.strict;
        self.eat(&Token::LeftBrace)?;
        let body = self.parse_body(|t| *t == Token::RightBrace)?;
        self.eat(&Token::RightBrace)?;
        let simple = rest.is_none() && params.iter().all(|p| matches!(p, Pattern::Identifier(_)));
        if self.ctx.strict && !strict_before && !simple {
            return Err(self.error("Illegal 'use strict' directive in function with non-simple parameter list"));
        }
        let unique_required = self.ctx.strict || !simple || kind != FunctionKind::Normal || is_async;
        self.check_parameters(&params, rest.as_ref(), &body, unique_required)?;
        self.check_top_level_declarations(&body)?;
        Ok((params, rest, body))
    }

    fn check_parameters(
        &self,
        params: &[Pattern],
        rest: Option<&Pattern>,
        body: &[Statement],
        unique_required: bool,
    ) -> Result<(), ParseError> {
        let mut names = Vec::new();
        for p in params.iter().chain(rest) {
            p.bound_names(&mut names);
        }
        let mut seen = FxHashSet::default();
        for name in &names {
            if self.ctx.strict && (&**name == "eval" || &**name == "arguments") {
                return Err(self.error(format!("Unexpected eval or arguments in strict mode ({name})")));
            }
            if !seen.insert(name.clone()) && unique_required {
                return Err(self.error("Duplicate parameter name not allowed in this context"));
            }
        }
        for decl in top_level_lexically_scoped_declarations(body) {
            if let Some(name) = decl.bound_names().into_iter().find(|n| seen.contains(n)) {
                return Err(self.error(format!("Identifier '{name}' has already been declared")));
            }
        }
        Ok(())
    }

    pub(super) fn parse_formal_parameters(&mut self) -> Result<(Vec<Pattern>, Option<Pattern>), ParseError> {
        self.eat(&Token::LeftParen)?;
        let saved = self.ctx.in_parameters;
        self.ctx.in_parameters = true;
        let mut params = Vec::new();
        let mut rest = None;
        while !self.is(&Token::RightParen) {
            if self.eat_if(&Token::Ellipsis)? {
                rest = Some(self.parse_binding_target()?);
                if !self.is(&Token::RightParen) {
                    return Err(self.error("Rest parameter must be last formal parameter"));
                }
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.is(&Token::RightParen) {
                self.eat(&Token::Comma)?;
            }
        }
        self.ctx.in_parameters = saved;
        self.advance()?;
        Ok((params, rest))
    }

    /// Parses an arrow function body after `=>`.
    pub(super) fn parse_arrow_body(
        &mut self,
        start: usize,
        position: Position,
        params: Vec<Pattern>,
        rest: Option<Pattern>,
        is_async: bool,
    ) -> Result<Rc<FunctionNode>, ParseError> {
        let saved = self.enter_function(FunctionKind::Arrow, is_async, false, false);
        let no_in = saved.no_in;
        let result = (|| -> Result<FunctionBody, ParseError> {
            if self.is(&Token::LeftBrace) {
                let strict_before = self.ctx.strict;
                self.advance()?;
                let body = self.parse_body(|t| *t == Token::RightBrace)?;
                self.eat(&Token::RightBrace)?;
                let simple = rest.is_none() && params.iter().all(|p| matches!(p, Pattern::Identifier(_)));
                if self.ctx.strict && !strict_before && !simple {
                    return Err(self.error("Illegal 'use strict' directive in function with non-simple parameter list"));
                }
                self.check_parameters(&params, rest.as_ref(), &body, true)?;
                self.check_top_level_declarations(&body)?;
                Ok(FunctionBody::Block(body))
            } else {
                self.ctx.no_in = no_in;
                self.check_parameters(&params, rest.as_ref(), &[], true)?;
                Ok(FunctionBody::Expression(self.parse_assignment_expression()?))
            }
        })();
        let strict = self.ctx.strict;
        self.leave_function(saved);
        let body = result?;
        Ok(Rc::new(FunctionNode {
            name: None,
            params,
            rest,
            body,
            kind: FunctionKind::Arrow,
            is_async,
            is_generator: false,
            strict,
            derived: false,
            source_text: self.source_since(start),
            position,
        }))
    }

    pub(super) fn parse_property_name(&mut self) -> Result<PropertyName, ParseError> {
        let name = match &self.current {
            Token::StringLiteral(units, _) => PropertyName::Literal(JsString::from_units(units.clone())),
            Token::NumericLiteral(n) | Token::LegacyOctalLiteral(n) => {
                PropertyName::Literal(JsString::from(number_ops::to_string(*n)))
            }
            Token::BigIntLiteral(digits) => match parse_big_int_literal(digits) {
                Some(b) => PropertyName::Literal(JsString::from(b.to_string())),
                None => return Err(self.unexpected()),
            },
            Token::LeftBracket => {
                self.advance()?;
                let saved = self.ctx.no_in;
                self.ctx.no_in = false;
                let expr = self.parse_assignment_expression();
                self.ctx.no_in = saved;
                let expr = expr?;
                self.eat(&Token::RightBracket)?;
                return Ok(PropertyName::Computed(Box::new(expr)));
            }
            _ => match self.identifier_name() {
                Some(name) => PropertyName::Literal(JsString::from(&*name)),
                None => return Err(self.unexpected()),
            },
        };
        self.advance()?;
        Ok(name)
    }

    /// Whether the current modifier word (`get`, `set`, `async`, `static`)
    /// is a modifier rather than a property name of its own.
    pub(super) fn modifier_applies(&self) -> bool {
        match self.peek_next() {
            Some((Token::LeftParen | Token::Assign | Token::Semicolon | Token::RightBrace, _)) => false,
            Some((Token::Comma | Token::Colon, _)) => false,
            Some((Token::Eof, _)) | None => false,
            Some((_, newline)) => !(newline && self.is_keyword(Keyword::Async)),
        }
    }

    /// Parses the part of a method after its modifiers: key, parameters and
    /// body. `start` is where the method's source text begins.
    pub(super) fn parse_method(
        &mut self,
        start: usize,
        position: Position,
        kind: MethodKind,
        is_async: bool,
        is_generator: bool,
        is_static: bool,
    ) -> Result<MethodDefinition, ParseError> {
        let key = self.parse_property_name()?;
        let function = self.parse_function_rest(start, position, None, FunctionKind::Method, is_async, is_generator)?;
        match kind {
            MethodKind::Get if !function.params.is_empty() || function.rest.is_some() => {
                return Err(self.error("Getter must not have any formal parameters"));
            }
            MethodKind::Set if function.params.len() != 1 || function.rest.is_some() => {
                return Err(self.error("Setter must have exactly one formal parameter"));
            }
            _ => {}
        }
        Ok(MethodDefinition {
            key,
            kind,
            function,
            is_static,
        })
    }

    pub(super) fn parse_class(&mut self, is_declaration: bool, is_default_export: bool) -> Result<Rc<ClassNode>, ParseError> {
        let start = self.current_start;
        self.expect_keyword(Keyword::Class)?;
        let saved_strict = self.ctx.strict;
        self.set_strict(true);
        let result = self.parse_class_tail(start, is_declaration, is_default_export);
        self.set_strict(saved_strict);
        result
    }

    fn parse_class_tail(
        &mut self,
        start: usize,
        is_declaration: bool,
        is_default_export: bool,
    ) -> Result<Rc<ClassNode>, ParseError> {
        let name = if self.current_identifier().is_some() && !self.is_keyword(Keyword::Extends) {
            Some(self.binding_identifier()?)
        } else if is_declaration && !is_default_export {
            return Err(self.error("A class declaration requires a name"));
        } else {
            None
        };
        let heritage = if self.eat_if(&Token::Keyword(Keyword::Extends))? {
            Some(self.parse_left_hand_side_expression()?)
        } else {
            None
        };
        let derived = heritage.is_some();
        self.eat(&Token::LeftBrace)?;
        let mut constructor = None;
        let mut elements = Vec::new();
        while !self.is(&Token::RightBrace) {
            if self.eat_if(&Token::Semicolon)? {
                continue;
            }
            let is_static = self.is_keyword(Keyword::Static) && self.modifier_applies();
            if is_static {
                self.advance()?;
            }
            let element_start = self.current_start;
            let position = self.current_position;
            let (kind, is_async, is_generator) = self.parse_method_modifiers()?;
            let key_is = |key: &PropertyName, s: &str| matches!(key, PropertyName::Literal(k) if *k == JsString::from(s));
            let plain = kind == MethodKind::Method && !is_async && !is_generator;

            let before_key = self.snapshot();
            let key = self.parse_property_name()?;
            if self.is(&Token::LeftParen) {
                if !is_static && key_is(&key, "constructor") {
                    if !plain {
                        return Err(self.error("Class constructor may not be an accessor, generator or async"));
                    }
                    if constructor.is_some() {
                        return Err(self.error("A class may only have one constructor"));
                    }
                    let node = self.parse_function_with(
                        element_start,
                        position,
                        None,
                        FunctionKind::ClassConstructor,
                        false,
                        false,
                        derived,
                    )?;
                    constructor = Some(node);
                    continue;
                }
                if is_static && key_is(&key, "prototype") {
                    return Err(self.error("Classes may not have a static property named 'prototype'"));
                }
                self.restore(before_key);
                let method = self.parse_method(element_start, position, kind, is_async, is_generator, is_static)?;
                elements.push(ClassElement::Method(method));
                continue;
            }
            if !plain {
                return Err(self.unexpected());
            }
            if key_is(&key, "constructor") || (is_static && key_is(&key, "prototype")) {
                return Err(self.error("Classes may not have a field named 'constructor' or a static field named 'prototype'"));
            }
            let initializer = if self.is(&Token::Assign) {
                let init_start = self.current_start;
                let init_position = self.current_position;
                self.advance()?;
                let saved = self.enter_function(FunctionKind::ClassField, false, false, false);
                self.ctx.in_function = false;
                self.ctx.in_class_field = true;
                let value = self.parse_assignment_expression();
                self.leave_function(saved);
                let value = value?;
                Some(Rc::new(FunctionNode {
                    name: None,
                    params: Vec::new(),
                    rest: None,
                    body: FunctionBody::Expression(value),
                    kind: FunctionKind::ClassField,
                    is_async: false,
                    is_generator: false,
                    strict: true,
                    derived: false,
                    source_text: self.source_since(init_start),
                    position: init_position,
                }))
            } else {
                None
            };
            self.eat_semicolon()?;
            elements.push(ClassElement::Field {
                key,
                initializer,
                is_static,
            });
        }
        self.advance()?;
        Ok(Rc::new(ClassNode {
            name,
            heritage,
            constructor,
            elements,
            source_text: self.source_since(start),
        }))
    }

    /// Consumes `async`, `*`, `get` or `set` prefixes of a method.
    pub(super) fn parse_method_modifiers(&mut self) -> Result<(MethodKind, bool, bool), ParseError> {
        let mut is_async = false;
        if self.is_keyword(Keyword::Async) && self.modifier_applies() {
            self.advance()?;
            is_async = true;
        }
        let is_generator = self.eat_if(&Token::Star)?;
        if !is_async && !is_generator {
            let kind = match &self.current {
                Token::Keyword(Keyword::Get) if self.modifier_applies() => Some(MethodKind::Get),
                Token::Keyword(Keyword::Set) if self.modifier_applies() => Some(MethodKind::Set),
                _ => None,
            };
            if let Some(kind) = kind {
                self.advance()?;
                return Ok((kind, false, false));
            }
        }
        Ok((MethodKind::Method, is_async, is_generator))
    }

    pub(super) fn parse_binding_target(&mut self) -> Result<Pattern, ParseError> {
        match &self.current {
            Token::LeftBracket => self.parse_array_binding_pattern(),
            Token::LeftBrace => self.parse_object_binding_pattern(),
            _ => Ok(Pattern::Identifier(self.binding_identifier()?)),
        }
    }

    pub(super) fn parse_binding_element(&mut self) -> Result<Pattern, ParseError> {
        let target = self.parse_binding_target()?;
        self.parse_optional_default(target)
    }

    fn parse_optional_default(&mut self, target: Pattern) -> Result<Pattern, ParseError> {
        if !self.eat_if(&Token::Assign)? {
            return Ok(target);
        }
        let saved = self.ctx.no_in;
        self.ctx.no_in = false;
        let init = self.parse_assignment_expression();
        self.ctx.no_in = saved;
        Ok(Pattern::Default(Box::new(target), Box::new(init?)))
    }

    fn parse_array_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.eat(&Token::LeftBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;
        loop {
            match &self.current {
                Token::RightBracket => break,
                Token::Comma => {
                    self.advance()?;
                    elements.push(None);
                    continue;
                }
                Token::Ellipsis => {
                    self.advance()?;
                    rest = Some(Box::new(self.parse_binding_target()?));
                    break;
                }
                _ => elements.push(Some(self.parse_binding_element()?)),
            }
            if !self.is(&Token::RightBracket) {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBracket)?;
        Ok(Pattern::Array { elements, rest })
    }

    fn parse_object_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut properties = Vec::new();
        let mut rest = None;
        while !self.is(&Token::RightBrace) {
            if self.eat_if(&Token::Ellipsis)? {
                rest = Some(Box::new(Pattern::Identifier(self.binding_identifier()?)));
                break;
            }
            let shorthand = self.current_identifier();
            let key = self.parse_property_name()?;
            let value = if self.eat_if(&Token::Colon)? {
                self.parse_binding_element()?
            } else {
                let Some(name) = shorthand else {
                    return Err(self.unexpected());
                };
                self.check_binding_name(&name)?;
                self.parse_optional_default(Pattern::Identifier(name))?
            };
            properties.push(ObjectPatternProperty { key, value });
            if !self.is(&Token::RightBrace) {
                self.eat(&Token::Comma)?;
            }
        }
        self.eat(&Token::RightBrace)?;
        Ok(Pattern::Object { properties, rest })
    }

    /// Destructuring assignment target starting at `[` or `{`.
    pub(super) fn parse_assignment_pattern(&mut self) -> Result<Pattern, ParseError> {
        match &self.current {
            Token::LeftBracket => {
                self.advance()?;
                let mut elements = Vec::new();
                let mut rest = None;
                loop {
                    match &self.current {
                        Token::RightBracket => break,
                        Token::Comma => {
                            self.advance()?;
                            elements.push(None);
                            continue;
                        }
                        Token::Ellipsis => {
                            self.advance()?;
                            rest = Some(Box::new(self.parse_assignment_target()?));
                            break;
                        }
                        _ => {
                            let target = self.parse_assignment_target()?;
                            elements.push(Some(self.parse_optional_default(target)?));
                        }
                    }
                    if !self.is(&Token::RightBracket) {
                        self.eat(&Token::Comma)?;
                    }
                }
                self.eat(&Token::RightBracket)?;
                Ok(Pattern::Array { elements, rest })
            }
            Token::LeftBrace => {
                self.advance()?;
                let mut properties = Vec::new();
                let mut rest = None;
                while !self.is(&Token::RightBrace) {
                    if self.eat_if(&Token::Ellipsis)? {
                        rest = Some(Box::new(self.parse_assignment_target()?));
                        break;
                    }
                    let shorthand = self.current_identifier();
                    let key = self.parse_property_name()?;
                    let value = if self.eat_if(&Token::Colon)? {
                        let target = self.parse_assignment_target()?;
                        self.parse_optional_default(target)?
                    } else {
                        let Some(name) = shorthand else {
                            return Err(self.unexpected());
                        };
                        self.check_binding_name(&name)?;
                        self.parse_optional_default(Pattern::Identifier(name))?
                    };
                    properties.push(ObjectPatternProperty { key, value });
                    if !self.is(&Token::RightBrace) {
                        self.eat(&Token::Comma)?;
                    }
                }
                self.eat(&Token::RightBrace)?;
                Ok(Pattern::Object { properties, rest })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_assignment_target(&mut self) -> Result<Pattern, ParseError> {
        if matches!(self.current, Token::LeftBracket | Token::LeftBrace) {
            let nested = self.try_parse(|p| {
                let pattern = p.parse_assignment_pattern()?;
                Ok(matches!(
                    p.current,
                    Token::Comma | Token::RightBracket | Token::RightBrace | Token::Assign
                )
                .then_some(pattern))
            });
            if let Some(pattern) = nested {
                return Ok(pattern);
            }
        }
        let expr = self.parse_left_hand_side_expression()?;
        self.simple_assignment_target(expr)
    }

    /// Converts an expression used as an assignment target.
    pub(super) fn simple_assignment_target(&self, expr: Expression) -> Result<Pattern, ParseError> {
        match expr {
            Expression::Identifier(name) => {
                if self.ctx.strict && (&*name == "eval" || &*name == "arguments") {
                    return Err(self.error("Unexpected eval or arguments in strict mode"));
                }
                Ok(Pattern::Identifier(name))
            }
            Expression::Member { optional: false, .. } | Expression::SuperMember(_) => {
                Ok(Pattern::Member(Box::new(expr)))
            }
            Expression::Parenthesized(inner)
                if matches!(
                    *inner,
                    Expression::Identifier(_)
                        | Expression::Member { .. }
                        | Expression::SuperMember(_)
                        | Expression::Parenthesized(_)
                ) =>
            {
                self.simple_assignment_target(*inner)
            }
            _ => Err(self.error("Invalid left-hand side in assignment")),
        }
    }
}

/// Value of a BigInt literal's digits (with an optional radix prefix).
pub(super) fn parse_big_int_literal(digits: &str) -> Option<num_bigint::BigInt> {
    let (radix, body) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits),
    };
    num_bigint::BigInt::parse_bytes(body.as_bytes(), radix)
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse_script;

    fn first(src: &str) -> Statement {
        match parse_script(src) {
            Ok(mut s) => s.body.remove(0),
            Err(e) => panic!("{src}: {e}"),
        }
    }

    #[test]
    fn class_members_are_split_into_constructor_methods_and_fields() {
        let Statement::ClassDeclaration(c) = first(
            "class A extends B { constructor(x) { super(x); } static get y() { return 1 } z = 2; *gen() {} }",
        ) else {
            panic!("expected a class");
        };
        let ctor = c.constructor.as_ref().map(|f| f.derived);
        assert_eq!(ctor, Some(true));
        assert_eq!(c.elements.len(), 3);
        assert!(matches!(
            &c.elements[0],
            ClassElement::Method(MethodDefinition { kind: MethodKind::Get, is_static: true, .. })
        ));
        assert!(matches!(&c.elements[1], ClassElement::Field { initializer: Some(_), .. }));
    }

    #[test]
    fn class_bodies_are_strict() {
        let Statement::ClassDeclaration(c) = first("class A { m() {} }") else {
            panic!("expected a class");
        };
        let ClassElement::Method(m) = &c.elements[0] else {
            panic!("expected a method");
        };
        assert!(m.function.strict);
    }

    #[test]
    fn super_call_needs_derived_constructor() {
        assert!(parse_script("class A { constructor() { super(); } }").is_err());
        assert!(parse_script("function f() { super.x; }").is_err());
        assert!(parse_script("({ m() { return super.x; } })").is_ok());
    }

    #[test]
    fn accessor_arity_is_checked() {
        assert!(parse_script("({ get a(x) {} })").is_err());
        assert!(parse_script("({ set a() {} })").is_err());
        assert!(parse_script("({ get a() {}, set a(v) {} })").is_ok());
    }

    #[test]
    fn parameters_are_validated() {
        assert!(parse_script("function f(a, a) {}").is_ok());
        assert!(parse_script("'use strict'; function f(a, a) {}").is_err());
        assert!(parse_script("function f(a, [a]) {}").is_err());
        assert!(parse_script("function f(a = 1) { 'use strict' }").is_err());
        assert!(parse_script("function f(a) { let a; }").is_err());
    }

    #[test]
    fn function_source_text_is_kept() {
        let Statement::FunctionDeclaration(f) = first("function add(a, b) { return a + b; } add(1, 2)") else {
            panic!("expected a function");
        };
        assert_eq!(&*f.source_text, "function add(a, b) { return a + b; }");
        assert_eq!(f.expected_argument_count(), 2);
    }

    #[test]
    fn big_int_literals_with_radix_prefixes() {
        assert_eq!(super::parse_big_int_literal("0xff").map(|b| b.to_string()), Some("255".into()));
        assert_eq!(super::parse_big_int_literal("12").map(|b| b.to_string()), Some("12".into()));
    }
}
