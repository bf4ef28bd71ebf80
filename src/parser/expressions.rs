use super::declarations::parse_big_int_literal;
use super::*;
use crate::types::JsString;

#[derive(Clone, Copy)]
enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

impl<'a> Parser<'a> {
    /// Runs `f` with the `in` operator allowed, as inside brackets.
    fn allow_in<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        let saved = self.ctx.no_in;
        self.ctx.no_in = false;
        let result = f(self);
        self.ctx.no_in = saved;
        result
    }

    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_assignment_expression()?;
        if !self.is(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_if(&Token::Comma)? {
            items.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::Sequence(items))
    }

    // §13.15 Assignment Operators
    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        if self.is_keyword(Keyword::Yield) && self.ctx.in_generator {
            return self.parse_yield();
        }
        if let Some(arrow) = self.try_arrow_function()? {
            return Ok(arrow);
        }
        if matches!(self.current, Token::LeftBracket | Token::LeftBrace) {
            let pattern = self.try_parse(|p| {
                let pattern = p.parse_assignment_pattern()?;
                Ok(p.is(&Token::Assign).then_some(pattern))
            });
            if let Some(pattern) = pattern {
                self.advance()?;
                let value = self.parse_assignment_expression()?;
                return Ok(Expression::Assign(AssignOp::Assign, Box::new(pattern), Box::new(value)));
            }
        }

        let lhs = self.parse_conditional_expression()?;
        let op = match self.current {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::Compound(BinaryOp::Add),
            Token::MinusAssign => AssignOp::Compound(BinaryOp::Sub),
            Token::StarAssign => AssignOp::Compound(BinaryOp::Mul),
            Token::SlashAssign => AssignOp::Compound(BinaryOp::Div),
            Token::PercentAssign => AssignOp::Compound(BinaryOp::Mod),
            Token::ExponentAssign => AssignOp::Compound(BinaryOp::Exp),
            Token::LeftShiftAssign => AssignOp::Compound(BinaryOp::LShift),
            Token::RightShiftAssign => AssignOp::Compound(BinaryOp::RShift),
            Token::UnsignedRightShiftAssign => AssignOp::Compound(BinaryOp::URShift),
            Token::AmpersandAssign => AssignOp::Compound(BinaryOp::BitAnd),
            Token::PipeAssign => AssignOp::Compound(BinaryOp::BitOr),
            Token::CaretAssign => AssignOp::Compound(BinaryOp::BitXor),
            Token::LogicalAndAssign => AssignOp::Logical(LogicalOp::And),
            Token::LogicalOrAssign => AssignOp::Logical(LogicalOp::Or),
            Token::NullishAssign => AssignOp::Logical(LogicalOp::Nullish),
            _ => return Ok(lhs),
        };
        let target = self.simple_assignment_target(lhs)?;
        self.advance()?;
        let value = self.parse_assignment_expression()?;
        Ok(Expression::Assign(op, Box::new(target), Box::new(value)))
    }

    fn parse_yield(&mut self) -> Result<Expression, ParseError> {
        if self.ctx.in_parameters {
            return Err(self.error("Yield expression not allowed in formal parameter"));
        }
        self.advance()?;
        if self.prev_line_terminator {
            return Ok(Expression::Yield {
                argument: None,
                delegate: false,
            });
        }
        let delegate = self.eat_if(&Token::Star)?;
        let ends = matches!(
            self.current,
            Token::RightParen
                | Token::RightBracket
                | Token::RightBrace
                | Token::Comma
                | Token::Semicolon
                | Token::Colon
                | Token::Eof
        );
        let argument = if ends && !delegate {
            None
        } else {
            Some(Box::new(self.parse_assignment_expression()?))
        };
        Ok(Expression::Yield { argument, delegate })
    }

    /// Tries the arrow function forms at the current token. Only the
    /// parameter list is speculative; errors in the body propagate.
    fn try_arrow_function(&mut self) -> Result<Option<Expression>, ParseError> {
        let start = self.current_start;
        let position = self.current_position;

        if self.is_keyword(Keyword::Async) {
            let candidate = matches!(
                self.peek_next(),
                Some((
                    Token::Identifier(_) | Token::EscapedIdentifier(_) | Token::Keyword(_) | Token::LeftParen,
                    false
                ))
            );
            if candidate {
                let params = self.try_parse(|p| {
                    p.advance()?;
                    let saved = p.ctx.in_async;
                    p.ctx.in_async = true;
                    let params = if p.is(&Token::LeftParen) {
                        p.parse_formal_parameters()
                    } else {
                        p.binding_identifier().map(|name| (vec![Pattern::Identifier(name)], None))
                    };
                    p.ctx.in_async = saved;
                    let params = params?;
                    Ok((p.is(&Token::Arrow) && !p.prev_line_terminator).then_some(params))
                });
                if let Some((params, rest)) = params {
                    self.advance()?;
                    let f = self.parse_arrow_body(start, position, params, rest, true)?;
                    return Ok(Some(Expression::Arrow(f)));
                }
            }
        }

        if self.current_identifier().is_some() && matches!(self.peek_next(), Some((Token::Arrow, false))) {
            let name = self.binding_identifier()?;
            self.advance()?;
            let f = self.parse_arrow_body(start, position, vec![Pattern::Identifier(name)], None, false)?;
            return Ok(Some(Expression::Arrow(f)));
        }

        if self.is(&Token::LeftParen) {
            let params = self.try_parse(|p| {
                let params = p.parse_formal_parameters()?;
                Ok((p.is(&Token::Arrow) && !p.prev_line_terminator).then_some(params))
            });
            if let Some((params, rest)) = params {
                self.advance()?;
                let f = self.parse_arrow_body(start, position, params, rest, false)?;
                return Ok(Some(Expression::Arrow(f)));
            }
        }
        Ok(None)
    }

    // §13.14 Conditional Operator
    fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_binary_expression(0)?;
        if !self.eat_if(&Token::Question)? {
            return Ok(test);
        }
        let consequent = self.allow_in(|p| p.parse_assignment_expression())?;
        self.eat(&Token::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn current_operator(&self) -> Option<(Operator, u8)> {
        use Operator::*;
        let op = match self.current {
            Token::NullishCoalescing => (Logical(LogicalOp::Nullish), 1),
            Token::LogicalOr => (Logical(LogicalOp::Or), 2),
            Token::LogicalAnd => (Logical(LogicalOp::And), 3),
            Token::Pipe => (Binary(BinaryOp::BitOr), 4),
            Token::Caret => (Binary(BinaryOp::BitXor), 5),
            Token::Ampersand => (Binary(BinaryOp::BitAnd), 6),
            Token::Equal => (Binary(BinaryOp::Eq), 7),
            Token::NotEqual => (Binary(BinaryOp::NotEq), 7),
            Token::StrictEqual => (Binary(BinaryOp::StrictEq), 7),
            Token::StrictNotEqual => (Binary(BinaryOp::StrictNotEq), 7),
            Token::LessThan => (Binary(BinaryOp::Lt), 8),
            Token::GreaterThan => (Binary(BinaryOp::Gt), 8),
            Token::LessThanEqual => (Binary(BinaryOp::LtEq), 8),
            Token::GreaterThanEqual => (Binary(BinaryOp::GtEq), 8),
            Token::Keyword(Keyword::Instanceof) => (Binary(BinaryOp::Instanceof), 8),
            Token::Keyword(Keyword::In) if !self.ctx.no_in => (Binary(BinaryOp::In), 8),
            Token::LeftShift => (Binary(BinaryOp::LShift), 9),
            Token::RightShift => (Binary(BinaryOp::RShift), 9),
            Token::UnsignedRightShift => (Binary(BinaryOp::URShift), 9),
            Token::Plus => (Binary(BinaryOp::Add), 10),
            Token::Minus => (Binary(BinaryOp::Sub), 10),
            Token::Star => (Binary(BinaryOp::Mul), 11),
            Token::Slash => (Binary(BinaryOp::Div), 11),
            Token::Percent => (Binary(BinaryOp::Mod), 11),
            Token::Exponent => (Binary(BinaryOp::Exp), 12),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over the binary and logical operators.
    fn parse_binary_expression(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary_expression()?;
        while let Some((op, precedence)) = self.current_operator() {
            if precedence < min_precedence {
                break;
            }
            let exponent = matches!(op, Operator::Binary(BinaryOp::Exp));
            if exponent && matches!(left, Expression::Unary(..) | Expression::Await(_)) {
                return Err(self.error(
                    "Unary operator used immediately before exponentiation expression. Parenthesis must be used to disambiguate operator precedence",
                ));
            }
            self.advance()?;
            // `**` is right-associative.
            let right = if exponent {
                self.parse_binary_expression(precedence)?
            } else {
                self.parse_binary_expression(precedence + 1)?
            };
            left = match op {
                Operator::Binary(op) => Expression::Binary(op, Box::new(left), Box::new(right)),
                Operator::Logical(op) => {
                    let mixes = |e: &Expression| match e {
                        Expression::Logical(inner, ..) => (op == LogicalOp::Nullish) != (*inner == LogicalOp::Nullish),
                        _ => false,
                    };
                    if mixes(&left) || mixes(&right) {
                        return Err(self.error("Cannot mix ?? with && or || without parentheses"));
                    }
                    Expression::Logical(op, Box::new(left), Box::new(right))
                }
            };
        }
        Ok(left)
    }

    // §13.5 Unary Operators
    fn parse_unary_expression(&mut self) -> Result<Expression, ParseError> {
        let op = match self.current {
            Token::Minus => Some(UnaryOp::Minus),
            Token::Plus => Some(UnaryOp::Plus),
            Token::Bang => Some(UnaryOp::Not),
            Token::Tilde => Some(UnaryOp::BitNot),
            Token::Keyword(Keyword::Typeof) => Some(UnaryOp::Typeof),
            Token::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            Token::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let argument = self.parse_unary_expression()?;
            if op == UnaryOp::Delete && self.ctx.strict && is_identifier_reference(&argument) {
                return Err(self.error("Delete of an unqualified identifier in strict mode."));
            }
            return Ok(Expression::Unary(op, Box::new(argument)));
        }
        if let Some(op) = self.update_operator() {
            self.advance()?;
            let target = self.parse_unary_expression()?;
            self.check_update_target(&target)?;
            return Ok(Expression::Update {
                op,
                prefix: true,
                target: Box::new(target),
            });
        }
        if self.is_keyword(Keyword::Await) && self.ctx.in_async {
            if self.ctx.in_parameters {
                return Err(self.error("Illegal await-expression in formal parameters of async function"));
            }
            self.advance()?;
            let argument = self.parse_unary_expression()?;
            return Ok(Expression::Await(Box::new(argument)));
        }

        let expr = self.parse_left_hand_side_expression()?;
        match self.update_operator() {
            Some(op) if !self.prev_line_terminator => {
                self.check_update_target(&expr)?;
                self.advance()?;
                Ok(Expression::Update {
                    op,
                    prefix: false,
                    target: Box::new(expr),
                })
            }
            _ => Ok(expr),
        }
    }

    fn update_operator(&self) -> Option<UpdateOp> {
        match self.current {
            Token::Increment => Some(UpdateOp::Increment),
            Token::Decrement => Some(UpdateOp::Decrement),
            _ => None,
        }
    }

    fn check_update_target(&self, target: &Expression) -> Result<(), ParseError> {
        match target {
            Expression::Identifier(name) => {
                if self.ctx.strict && (&**name == "eval" || &**name == "arguments") {
                    return Err(self.error("Unexpected eval or arguments in strict mode"));
                }
                Ok(())
            }
            Expression::Member { optional: false, .. } | Expression::SuperMember(_) => Ok(()),
            Expression::Parenthesized(inner) => self.check_update_target(inner),
            _ => Err(self.error("Invalid left-hand side expression in update operation")),
        }
    }

    // §13.3 Left-Hand-Side Expressions
    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let start = self.current_start;
        let position = self.current_position;
        let expr = match self.current {
            Token::Keyword(Keyword::New) => self.parse_new_expression()?,
            Token::Keyword(Keyword::Super) => self.parse_super()?,
            _ => self.parse_primary_expression()?,
        };
        self.parse_call_tail(expr, start, position, true)
    }

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        let position = self.current_position;
        self.expect_keyword(Keyword::New)?;
        if self.eat_if(&Token::Dot)? {
            if !matches!(&self.current, Token::Identifier(n) if n == "target") {
                return Err(self.unexpected());
            }
            if !self.ctx.allow_new_target {
                return Err(self.error("new.target expression is not allowed here"));
            }
            self.advance()?;
            return Ok(Expression::NewTarget);
        }
        let callee_start = self.current_start;
        let callee_position = self.current_position;
        let callee = match self.current {
            Token::Keyword(Keyword::New) => self.parse_new_expression()?,
            Token::Keyword(Keyword::Super) => self.parse_super()?,
            _ => self.parse_primary_expression()?,
        };
        let callee = self.parse_call_tail(callee, callee_start, callee_position, false)?;
        let callee_text = self.source_since(callee_start);
        let arguments = if self.is(&Token::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(Box::new(CallExpression {
            callee,
            arguments,
            optional: false,
            position,
            callee_text,
        })))
    }

    fn parse_super(&mut self) -> Result<Expression, ParseError> {
        let position = self.current_position;
        self.expect_keyword(Keyword::Super)?;
        match self.current {
            Token::LeftParen => {
                if !self.ctx.allow_super_call {
                    return Err(self.error("'super' keyword unexpected here"));
                }
                let arguments = self.parse_arguments()?;
                Ok(Expression::SuperCall(arguments, position))
            }
            Token::Dot | Token::LeftBracket => {
                if !self.ctx.allow_super_property {
                    return Err(self.error("'super' keyword unexpected here"));
                }
                let property = self.parse_member_property()?;
                Ok(Expression::SuperMember(property))
            }
            _ => Err(self.error("'super' keyword unexpected here")),
        }
    }

    /// `.name` or `[expr]`.
    fn parse_member_property(&mut self) -> Result<MemberProperty, ParseError> {
        if self.eat_if(&Token::LeftBracket)? {
            let property = self.allow_in(|p| p.parse_expression())?;
            self.eat(&Token::RightBracket)?;
            return Ok(MemberProperty::Computed(Box::new(property)));
        }
        self.eat(&Token::Dot)?;
        self.member_name()
    }

    fn member_name(&mut self) -> Result<MemberProperty, ParseError> {
        match self.identifier_name() {
            Some(name) => {
                self.advance()?;
                Ok(MemberProperty::Dot(name))
            }
            None => Err(self.unexpected()),
        }
    }

    /// Member accesses, calls, optional chains and tagged templates after
    /// `expr`, which started at `start`.
    fn parse_call_tail(
        &mut self,
        mut expr: Expression,
        start: usize,
        position: Position,
        allow_call: bool,
    ) -> Result<Expression, ParseError> {
        let mut in_chain = false;
        loop {
            match self.current {
                Token::Dot | Token::LeftBracket => {
                    let property = self.parse_member_property()?;
                    expr = Expression::Member {
                        object: Box::new(expr),
                        property,
                        optional: false,
                    };
                }
                Token::LeftParen if allow_call => {
                    let callee_text = self.source_since(start);
                    let arguments = self.parse_arguments()?;
                    expr = Expression::Call(Box::new(CallExpression {
                        callee: expr,
                        arguments,
                        optional: false,
                        position,
                        callee_text,
                    }));
                }
                Token::OptionalChain if allow_call => {
                    in_chain = true;
                    let callee_text = self.source_since(start);
                    self.advance()?;
                    expr = match self.current {
                        Token::LeftParen => {
                            let arguments = self.parse_arguments()?;
                            Expression::Call(Box::new(CallExpression {
                                callee: expr,
                                arguments,
                                optional: true,
                                position,
                                callee_text,
                            }))
                        }
                        Token::LeftBracket => {
                            let property = self.parse_member_property()?;
                            Expression::Member {
                                object: Box::new(expr),
                                property,
                                optional: true,
                            }
                        }
                        Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) => {
                            return Err(self.error("Invalid tagged template on optional chain"));
                        }
                        _ => Expression::Member {
                            object: Box::new(expr),
                            property: self.member_name()?,
                            optional: true,
                        },
                    };
                }
                Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) => {
                    if in_chain {
                        return Err(self.error("Invalid tagged template on optional chain"));
                    }
                    let quasi = self.parse_template(true)?;
                    expr = Expression::TaggedTemplate {
                        tag: Box::new(expr),
                        quasi,
                        position,
                    };
                }
                _ => break,
            }
        }
        if in_chain {
            expr = Expression::OptionalChain(Box::new(expr));
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.eat(&Token::LeftParen)?;
        self.allow_in(|p| {
            let mut arguments = Vec::new();
            while !p.is(&Token::RightParen) {
                if p.eat_if(&Token::Ellipsis)? {
                    arguments.push(Expression::Spread(Box::new(p.parse_assignment_expression()?)));
                } else {
                    arguments.push(p.parse_assignment_expression()?);
                }
                if !p.is(&Token::RightParen) {
                    p.eat(&Token::Comma)?;
                }
            }
            p.advance()?;
            Ok(arguments)
        })
    }

    // §13.2 Primary Expression
    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        let literal = match &self.current {
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                return Ok(Expression::This);
            }
            Token::NumericLiteral(n) => Literal::Number(*n),
            Token::LegacyOctalLiteral(n) => {
                if self.ctx.strict {
                    return Err(self.error("Octal literals are not allowed in strict mode."));
                }
                Literal::Number(*n)
            }
            Token::BigIntLiteral(digits) => match parse_big_int_literal(digits) {
                Some(b) => Literal::BigInt(Rc::new(b)),
                None => return Err(self.unexpected()),
            },
            Token::StringLiteral(units, legacy_octal) => {
                if *legacy_octal && self.ctx.strict {
                    return Err(self.error("Octal escape sequences are not allowed in strict mode."));
                }
                Literal::String(JsString::from_units(units.clone()))
            }
            Token::BooleanLiteral(b) => Literal::Boolean(*b),
            Token::NullLiteral => Literal::Null,
            Token::Slash | Token::SlashAssign => {
                let starts_with_assign = self.is(&Token::SlashAssign);
                let token = self.lexer.lex_regex(starts_with_assign)?;
                self.current_end = self.lexer.offset();
                let Token::RegExpLiteral { pattern, flags } = token else {
                    return Err(self.unexpected());
                };
                if !valid_regexp_flags(&flags) {
                    return Err(self.error(format!("Invalid regular expression flags '{flags}'")));
                }
                Literal::RegExp {
                    pattern: pattern.into(),
                    flags: flags.into(),
                }
            }
            Token::LeftBracket => return self.parse_array_literal(),
            Token::LeftBrace => return self.parse_object_literal(),
            Token::LeftParen => {
                self.advance()?;
                let inner = self.allow_in(|p| p.parse_expression())?;
                self.eat(&Token::RightParen)?;
                return Ok(Expression::Parenthesized(Box::new(inner)));
            }
            Token::Keyword(Keyword::Function) => return Ok(Expression::Function(self.parse_function_expression()?)),
            Token::Keyword(Keyword::Async)
                if matches!(self.peek_next(), Some((Token::Keyword(Keyword::Function), false))) =>
            {
                return Ok(Expression::Function(self.parse_function_expression()?));
            }
            Token::Keyword(Keyword::Class) => return Ok(Expression::Class(self.parse_class(false, false)?)),
            Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) => {
                return Ok(Expression::Template(self.parse_template(false)?));
            }
            _ => {
                let name = self.identifier_reference()?;
                if self.ctx.in_class_field && &*name == "arguments" {
                    return Err(self.error("'arguments' is not allowed in class field initializer"));
                }
                return Ok(Expression::Identifier(name));
            }
        };
        self.advance()?;
        Ok(Expression::Literal(literal))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBracket)?;
        self.allow_in(|p| {
            let mut elements = Vec::new();
            loop {
                match p.current {
                    Token::RightBracket => break,
                    Token::Comma => {
                        p.advance()?;
                        elements.push(None);
                        continue;
                    }
                    Token::Ellipsis => {
                        p.advance()?;
                        elements.push(Some(Expression::Spread(Box::new(p.parse_assignment_expression()?))));
                    }
                    _ => elements.push(Some(p.parse_assignment_expression()?)),
                }
                if !p.is(&Token::RightBracket) {
                    p.eat(&Token::Comma)?;
                }
            }
            p.advance()?;
            Ok(Expression::Array(elements))
        })
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.eat(&Token::LeftBrace)?;
        self.allow_in(|p| {
            let mut properties = Vec::new();
            let mut has_proto = false;
            while !p.is(&Token::RightBrace) {
                properties.push(p.parse_property_definition(&mut has_proto)?);
                if !p.is(&Token::RightBrace) {
                    p.eat(&Token::Comma)?;
                }
            }
            p.advance()?;
            Ok(Expression::Object(properties))
        })
    }

    fn parse_property_definition(&mut self, has_proto: &mut bool) -> Result<PropertyDefinition, ParseError> {
        if self.eat_if(&Token::Ellipsis)? {
            return Ok(PropertyDefinition::Spread(self.parse_assignment_expression()?));
        }
        let start = self.current_start;
        let position = self.current_position;
        let (kind, is_async, is_generator) = self.parse_method_modifiers()?;
        if kind != MethodKind::Method || is_async || is_generator {
            let method = self.parse_method(start, position, kind, is_async, is_generator, false)?;
            return Ok(PropertyDefinition::Method(method));
        }

        let shorthand = self.current_identifier();
        let is_proto = match &self.current {
            Token::Identifier(n) => n == "__proto__",
            Token::StringLiteral(units, _) => *units == "__proto__".encode_utf16().collect::<Vec<u16>>(),
            _ => false,
        };
        let before_key = self.snapshot();
        let key = self.parse_property_name()?;
        match self.current {
            Token::Colon => {
                self.advance()?;
                let value = self.parse_assignment_expression()?;
                if is_proto {
                    if *has_proto {
                        return Err(self.error("Duplicate __proto__ fields are not allowed in object literals"));
                    }
                    *has_proto = true;
                    return Ok(PropertyDefinition::Proto(value));
                }
                Ok(PropertyDefinition::KeyValue(key, value))
            }
            Token::LeftParen => {
                self.restore(before_key);
                let method = self.parse_method(start, position, MethodKind::Method, false, false, false)?;
                Ok(PropertyDefinition::Method(method))
            }
            Token::Assign => Err(self.error("Invalid shorthand property initializer")),
            _ => match shorthand {
                Some(name) => Ok(PropertyDefinition::Shorthand(name)),
                None => Err(self.unexpected()),
            },
        }
    }

    // §13.2.8 Template Literals
    fn parse_template(&mut self, tagged: bool) -> Result<Rc<TemplateLiteral>, ParseError> {
        let mut cooked = Vec::new();
        let mut raw = Vec::new();
        let mut expressions = Vec::new();
        loop {
            let (cooked_part, raw_part, done) = match &self.current {
                Token::NoSubstitutionTemplate(c, r) | Token::TemplateTail(c, r) => (c.clone(), r.clone(), true),
                Token::TemplateHead(c, r) | Token::TemplateMiddle(c, r) => (c.clone(), r.clone(), false),
                _ => return Err(self.unexpected()),
            };
            if cooked_part.is_none() && !tagged {
                return Err(self.error("Invalid escape sequence in template"));
            }
            cooked.push(cooked_part.map(JsString::from_units));
            raw.push(JsString::from_units(raw_part));
            self.advance()?;
            if done {
                break;
            }
            expressions.push(self.allow_in(|p| p.parse_expression())?);
            if !self.is(&Token::RightBrace) {
                return Err(self.unexpected());
            }
            self.current = self.lexer.read_template_continuation()?;
            self.current_end = self.lexer.offset();
        }
        Ok(Rc::new(TemplateLiteral {
            cooked,
            raw,
            expressions,
        }))
    }
}

fn is_identifier_reference(e: &Expression) -> bool {
    match e {
        Expression::Identifier(_) => true,
        Expression::Parenthesized(inner) => is_identifier_reference(inner),
        _ => false,
    }
}

fn valid_regexp_flags(flags: &str) -> bool {
    let mut seen = Vec::new();
    flags.chars().all(|c| {
        let ok = "dgimsuy".contains(c) && !seen.contains(&c);
        seen.push(c);
        ok
    })
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse_script;

    fn expr(src: &str) -> Expression {
        match parse_script(src).map(|mut s| s.body.remove(0)) {
            Ok(Statement::Expression(e)) => e,
            Ok(other) => panic!("{src}: not an expression statement: {other:?}"),
            Err(e) => panic!("{src}: {e}"),
        }
    }

    #[test]
    fn precedence_and_associativity() {
        let Expression::Binary(BinaryOp::Add, _, right) = expr("1 + 2 * 3") else {
            panic!("expected addition at the top");
        };
        assert!(matches!(*right, Expression::Binary(BinaryOp::Mul, ..)));
        let Expression::Binary(BinaryOp::Exp, _, right) = expr("2 ** 3 ** 2") else {
            panic!("expected exponentiation at the top");
        };
        assert!(matches!(*right, Expression::Binary(BinaryOp::Exp, ..)));
    }

    #[test]
    fn exponent_after_unary_needs_parentheses() {
        assert!(parse_script("-2 ** 2").is_err());
        assert!(parse_script("(-2) ** 2").is_ok());
    }

    #[test]
    fn nullish_does_not_mix_with_logical_operators() {
        assert!(parse_script("a ?? b || c").is_err());
        assert!(parse_script("a ?? (b || c)").is_ok());
    }

    #[test]
    fn arrow_functions_and_parenthesized_expressions() {
        assert!(matches!(expr("(a, b) => a + b"), Expression::Arrow(_)));
        assert!(matches!(expr("x => x"), Expression::Arrow(_)));
        assert!(matches!(expr("async x => x"), Expression::Arrow(f) if f.is_async));
        assert!(matches!(expr("async (x) => await x"), Expression::Arrow(f) if f.is_async));
        assert!(matches!(expr("(a, b)"), Expression::Parenthesized(_)));
        assert!(matches!(expr("async(a)"), Expression::Call(_)));
    }

    #[test]
    fn destructuring_assignment() {
        let Expression::Parenthesized(inner) = expr("({ a, b: [c] } = obj)") else {
            panic!("expected parentheses");
        };
        assert!(matches!(*inner, Expression::Assign(AssignOp::Assign, ..)));
        assert!(matches!(expr("[a, b] = [b, a]"), Expression::Assign(..)));
        assert!(parse_script("({ a = 1 })").is_err());
    }

    #[test]
    fn invalid_assignment_targets() {
        assert!(parse_script("1 = 2").is_err());
        assert!(parse_script("a?.b = 1").is_err());
        assert!(parse_script("'use strict'; eval = 1").is_err());
        assert!(parse_script("f()++").is_err());
    }

    #[test]
    fn optional_chains_are_wrapped() {
        let Expression::OptionalChain(inner) = expr("a?.b.c()") else {
            panic!("expected an optional chain");
        };
        assert!(matches!(*inner, Expression::Call(_)));
    }

    #[test]
    fn calls_record_callee_text_and_position() {
        let Expression::Call(call) = expr("\n  foo.bar(1)") else {
            panic!("expected a call");
        };
        assert_eq!(&*call.callee_text, "foo.bar");
        assert_eq!(call.position, Position { line: 2, column: 2 });
    }

    #[test]
    fn regexp_literals_in_operand_position() {
        assert!(matches!(
            expr("/a+b/g"),
            Expression::Literal(Literal::RegExp { ref flags, .. }) if &**flags == "g"
        ));
        assert!(matches!(expr("a / b / c"), Expression::Binary(BinaryOp::Div, ..)));
        assert!(parse_script("/a/gg").is_err());
    }

    #[test]
    fn templates_collect_cooked_and_raw_strings() {
        let Expression::Template(t) = expr("`a${1}b${2}c`") else {
            panic!("expected a template");
        };
        assert_eq!(t.raw.len(), 3);
        assert_eq!(t.expressions.len(), 2);
        assert!(parse_script("`\\unicode`").is_err());
        assert!(parse_script("tag`\\unicode`").is_ok());
    }

    #[test]
    fn object_literal_forms() {
        let Expression::Parenthesized(inner) =
            expr("({ a, b: 1, [c]: 2, m() {}, get g() { return 1 }, async *h() {}, __proto__: null, ...d })")
        else {
            panic!("expected parentheses");
        };
        let Expression::Object(props) = *inner else {
            panic!("expected an object literal");
        };
        assert_eq!(props.len(), 8);
        assert!(matches!(props[6], PropertyDefinition::Proto(_)));
        assert!(parse_script("({ __proto__: 1, __proto__: 2 })").is_err());
    }

    #[test]
    fn new_target_and_super_placement() {
        assert!(parse_script("new.target").is_err());
        assert!(parse_script("function f() { return new.target; }").is_ok());
        assert!(parse_script("super.x").is_err());
    }

    #[test]
    fn yield_is_an_identifier_outside_generators() {
        assert!(parse_script("var yield = 1; yield").is_ok());
        assert!(parse_script("function* g() { var x = yield; yield* x; }").is_ok());
    }
}
