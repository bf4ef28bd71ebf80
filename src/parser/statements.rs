use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_statement_list_item(&mut self) -> Result<Statement, ParseError> {
        match &self.current {
            Token::Keyword(Keyword::Function) => {
                let f = self.parse_function_declaration(false)?;
                Ok(Statement::FunctionDeclaration(f))
            }
            Token::Keyword(Keyword::Async) if self.async_function_follows() => {
                let f = self.parse_function_declaration(false)?;
                Ok(Statement::FunctionDeclaration(f))
            }
            Token::Keyword(Keyword::Class) => {
                let c = self.parse_class(true, false)?;
                Ok(Statement::ClassDeclaration(c))
            }
            Token::Keyword(Keyword::Const) => {
                let decl = self.parse_variable_declaration(VarKind::Const)?;
                self.eat_semicolon()?;
                Ok(Statement::Variable(decl))
            }
            Token::Keyword(Keyword::Let) if self.let_declaration_follows() => {
                let decl = self.parse_variable_declaration(VarKind::Let)?;
                self.eat_semicolon()?;
                Ok(Statement::Variable(decl))
            }
            _ => self.parse_statement(),
        }
    }

    /// `async function` with no line break between the two words.
    pub(super) fn async_function_follows(&self) -> bool {
        matches!(
            self.peek_next(),
            Some((Token::Keyword(Keyword::Function), false))
        )
    }

    fn let_declaration_follows(&self) -> bool {
        match self.peek_next() {
            Some((Token::LeftBracket | Token::LeftBrace | Token::Identifier(_), _)) => true,
            Some((Token::EscapedIdentifier(_), _)) => true,
            Some((Token::Keyword(k), _)) => k.is_contextual(),
            _ => false,
        }
    }

    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.current {
            Token::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            Token::Semicolon => {
                self.advance()?;
                Ok(Statement::Empty)
            }
            Token::Keyword(Keyword::Var) => {
                let decl = self.parse_variable_declaration(VarKind::Var)?;
                self.eat_semicolon()?;
                Ok(Statement::Variable(decl))
            }
            Token::Keyword(Keyword::If) => self.parse_if(),
            Token::Keyword(Keyword::For) => self.parse_for(),
            Token::Keyword(Keyword::While) => {
                self.advance()?;
                self.eat(&Token::LeftParen)?;
                let test = self.parse_expression()?;
                self.eat(&Token::RightParen)?;
                let body = self.parse_loop_body()?;
                Ok(Statement::While(WhileStatement {
                    test,
                    body: Box::new(body),
                }))
            }
            Token::Keyword(Keyword::Do) => {
                self.advance()?;
                let body = self.parse_loop_body()?;
                self.expect_keyword(Keyword::While)?;
                self.eat(&Token::LeftParen)?;
                let test = self.parse_expression()?;
                self.eat(&Token::RightParen)?;
                // A semicolon is always insertable after do-while.
                self.eat_if(&Token::Semicolon)?;
                Ok(Statement::DoWhile(WhileStatement {
                    test,
                    body: Box::new(body),
                }))
            }
            Token::Keyword(Keyword::Continue) => self.parse_continue(),
            Token::Keyword(Keyword::Break) => self.parse_break(),
            Token::Keyword(Keyword::Return) => {
                if !self.ctx.in_function {
                    return Err(self.error("Illegal return statement"));
                }
                self.advance()?;
                let argument = if self.prev_line_terminator
                    || matches!(self.current, Token::Semicolon | Token::RightBrace | Token::Eof)
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.eat_semicolon()?;
                Ok(Statement::Return(argument))
            }
            Token::Keyword(Keyword::With) => {
                if self.ctx.strict {
                    return Err(self.error("Strict mode code may not include a with statement"));
                }
                Err(self.error("'with' statements are not supported"))
            }
            Token::Keyword(Keyword::Switch) => self.parse_switch(),
            Token::Keyword(Keyword::Throw) => {
                let position = self.current_position;
                self.advance()?;
                if self.prev_line_terminator {
                    return Err(self.error("Illegal newline after throw"));
                }
                let argument = self.parse_expression()?;
                self.eat_semicolon()?;
                Ok(Statement::Throw(argument, position))
            }
            Token::Keyword(Keyword::Try) => self.parse_try(),
            Token::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.eat_semicolon()?;
                Ok(Statement::Debugger)
            }
            Token::Keyword(Keyword::Function) => {
                Err(self.error("In strict mode code, functions can only be declared at top level or inside a block"))
            }
            Token::Keyword(Keyword::Class) => Err(self.unexpected()),
            Token::Keyword(Keyword::Let)
                if matches!(self.peek_next(), Some((Token::LeftBracket, _))) =>
            {
                Err(self.error("Lexical declaration cannot appear in a single-statement context"))
            }
            _ => self.parse_expression_or_labeled_statement(),
        }
    }

    fn parse_expression_or_labeled_statement(&mut self) -> Result<Statement, ParseError> {
        if let Some(label) = self.current_identifier()
            && matches!(self.peek_next(), Some((Token::Colon, _)))
        {
            self.advance()?;
            self.advance()?;
            if self.ctx.labels.iter().any(|(l, _)| *l == label) {
                return Err(self.error(format!("Label '{label}' has already been declared")));
            }
            let is_loop = self.loop_follows_labels();
            self.ctx.labels.push((label.clone(), is_loop));
            let body = if self.is_keyword(Keyword::Function) && !self.ctx.strict {
                Statement::FunctionDeclaration(self.parse_function_declaration(false)?)
            } else {
                self.parse_statement()?
            };
            self.ctx.labels.pop();
            return Ok(Statement::Labeled(label, Box::new(body)));
        }
        let expression = self.parse_expression()?;
        self.eat_semicolon()?;
        Ok(Statement::Expression(expression))
    }

    /// Whether the current token starts an iteration statement, possibly
    /// behind further labels.
    fn loop_follows_labels(&self) -> bool {
        let mut lexer = self.lexer.clone();
        let mut token = self.current.clone();
        loop {
            match token {
                Token::Keyword(Keyword::For | Keyword::While | Keyword::Do) => return true,
                Token::Identifier(_) | Token::Keyword(_) => {}
                _ => return false,
            }
            let mut next = || loop {
                match lexer.next_token() {
                    Ok(Token::LineTerminator) => {}
                    Ok(t) => return Some(t),
                    Err(_) => return None,
                }
            };
            if next() != Some(Token::Colon) {
                return false;
            }
            match next() {
                Some(t) => token = t,
                None => return false,
            }
        }
    }

    pub(super) fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.eat(&Token::LeftBrace)?;
        let mut body = Vec::new();
        while !self.is(&Token::RightBrace) {
            body.push(self.parse_statement_list_item()?);
        }
        self.advance()?;
        self.check_block_declarations(&body)?;
        Ok(body)
    }

    fn parse_loop_body(&mut self) -> Result<Statement, ParseError> {
        self.ctx.in_iteration += 1;
        let body = self.parse_statement();
        self.ctx.in_iteration -= 1;
        body
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.eat(&Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        let consequent = self.parse_if_branch()?;
        let alternate = if self.eat_if(&Token::Keyword(Keyword::Else))? {
            Some(Box::new(self.parse_if_branch()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent: Box::new(consequent),
            alternate,
        }))
    }

    /// Annex B allows a plain function declaration as an `if` branch in
    /// sloppy code; it behaves as if wrapped in a block.
    fn parse_if_branch(&mut self) -> Result<Statement, ParseError> {
        if self.is_keyword(Keyword::Function) && !self.ctx.strict {
            let f = self.parse_function_declaration(false)?;
            return Ok(Statement::Block(vec![Statement::FunctionDeclaration(f)]));
        }
        self.parse_statement()
    }

    pub(super) fn parse_variable_declaration(&mut self, kind: VarKind) -> Result<VariableDeclaration, ParseError> {
        self.advance()?;
        let mut declarations = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            if kind != VarKind::Var {
                let mut names = Vec::new();
                target.bound_names(&mut names);
                if names.iter().any(|n| &**n == "let") {
                    return Err(self.error("let is disallowed as a lexically bound name"));
                }
            }
            let init = if self.eat_if(&Token::Assign)? {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            if init.is_none() && !self.in_for_in_of_head() {
                if kind == VarKind::Const {
                    return Err(self.error("Missing initializer in const declaration"));
                }
                if !matches!(target, Pattern::Identifier(_)) {
                    return Err(self.error("Missing initializer in destructuring declaration"));
                }
            }
            declarations.push(VariableDeclarator { target, init });
            if !self.eat_if(&Token::Comma)? {
                break;
            }
        }
        Ok(VariableDeclaration { kind, declarations })
    }

    fn in_for_in_of_head(&self) -> bool {
        self.ctx.no_in && matches!(self.current, Token::Keyword(Keyword::In | Keyword::Of))
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let is_await = if self.is_keyword(Keyword::Await) {
            if !self.ctx.in_async {
                return Err(self.unexpected());
            }
            self.advance()?;
            true
        } else {
            false
        };
        self.eat(&Token::LeftParen)?;

        let saved_no_in = self.ctx.no_in;
        self.ctx.no_in = true;
        let head = self.parse_for_head();
        self.ctx.no_in = saved_no_in;
        let head = head?;

        match head {
            ForHead::InOf { left, of } => {
                if is_await && !of {
                    return Err(self.unexpected());
                }
                let right = if of {
                    self.parse_assignment_expression()?
                } else {
                    self.parse_expression()?
                };
                self.eat(&Token::RightParen)?;
                let body = self.parse_loop_body()?;
                self.check_for_body(&left, &body)?;
                let stmt = Box::new(ForInOfStatement {
                    left,
                    right,
                    body,
                    is_await,
                });
                Ok(if of { Statement::ForOf(stmt) } else { Statement::ForIn(stmt) })
            }
            ForHead::Init(init) => {
                if is_await {
                    return Err(self.unexpected());
                }
                self.eat(&Token::Semicolon)?;
                let test = if self.is(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.eat(&Token::Semicolon)?;
                let update = if self.is(&Token::RightParen) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.eat(&Token::RightParen)?;
                let body = self.parse_loop_body()?;
                if let Some(ForInit::Variable(decl)) = &init
                    && decl.kind != VarKind::Var
                {
                    let mut names = Vec::new();
                    for d in &decl.declarations {
                        d.target.bound_names(&mut names);
                    }
                    self.check_no_var_redeclaration(&names, &body)?;
                }
                Ok(Statement::For(Box::new(ForStatement {
                    init,
                    test,
                    update,
                    body,
                })))
            }
        }
    }

    fn check_for_body(&self, left: &ForBinding, body: &Statement) -> Result<(), ParseError> {
        if let ForBinding::Lexical(_, pattern) = left {
            let mut names = Vec::new();
            pattern.bound_names(&mut names);
            self.check_no_var_redeclaration(&names, body)?;
        }
        Ok(())
    }

    fn check_no_var_redeclaration(&self, names: &[Rc<str>], body: &Statement) -> Result<(), ParseError> {
        let mut decls = Vec::new();
        var_scoped_declarations(std::slice::from_ref(body), &mut decls);
        for d in &decls {
            for n in d.bound_names() {
                if names.contains(&n) {
                    return Err(self.error(format!("Identifier '{n}' has already been declared")));
                }
            }
        }
        Ok(())
    }

    fn parse_for_head(&mut self) -> Result<ForHead, ParseError> {
        if self.is(&Token::Semicolon) {
            return Ok(ForHead::Init(None));
        }
        let declaration_kind = match &self.current {
            Token::Keyword(Keyword::Var) => Some(VarKind::Var),
            Token::Keyword(Keyword::Const) => Some(VarKind::Const),
            Token::Keyword(Keyword::Let) if self.let_declaration_follows() => Some(VarKind::Let),
            _ => None,
        };
        if let Some(kind) = declaration_kind {
            let mut decl = self.parse_variable_declaration(kind)?;
            let of = match &self.current {
                Token::Keyword(Keyword::Of) => true,
                Token::Keyword(Keyword::In) => false,
                _ => return Ok(ForHead::Init(Some(ForInit::Variable(decl)))),
            };
            if decl.declarations.len() != 1 {
                return Err(self.error("Invalid left-hand side in for-loop: must have a single binding"));
            }
            let Some(declarator) = decl.declarations.pop() else {
                return Err(self.unexpected());
            };
            if declarator.init.is_some() {
                return Err(self.error("for-in/of loop variable declaration may not have an initializer"));
            }
            self.advance()?;
            let left = match kind {
                VarKind::Var => ForBinding::Var(declarator.target),
                lexical => ForBinding::Lexical(lexical, declarator.target),
            };
            return Ok(ForHead::InOf { left, of });
        }

        if matches!(self.current, Token::LeftBracket | Token::LeftBrace) {
            let pattern = self.try_parse(|p| {
                let pattern = p.parse_assignment_pattern()?;
                Ok(match &p.current {
                    Token::Keyword(Keyword::Of) => Some((pattern, true)),
                    Token::Keyword(Keyword::In) => Some((pattern, false)),
                    _ => None,
                })
            });
            if let Some((pattern, of)) = pattern {
                self.advance()?;
                return Ok(ForHead::InOf {
                    left: ForBinding::Assignment(pattern),
                    of,
                });
            }
        }

        let starts_with_let = self.is_keyword(Keyword::Let);
        let target = self.try_parse(|p| {
            let expr = p.parse_left_hand_side_expression()?;
            Ok(match &p.current {
                Token::Keyword(Keyword::Of) if !starts_with_let => Some((expr, true)),
                Token::Keyword(Keyword::In) => Some((expr, false)),
                _ => None,
            })
        });
        if let Some((expr, of)) = target {
            let pattern = self.simple_assignment_target(expr)?;
            self.advance()?;
            return Ok(ForHead::InOf {
                left: ForBinding::Assignment(pattern),
                of,
            });
        }
        let init = self.parse_expression()?;
        Ok(ForHead::Init(Some(ForInit::Expression(init))))
    }

    fn parse_continue(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let label = self.parse_optional_label()?;
        match &label {
            Some(l) => {
                if !self.ctx.labels.iter().any(|(name, is_loop)| name == l && *is_loop) {
                    return Err(self.error(format!("Undefined label '{l}'")));
                }
            }
            None if self.ctx.in_iteration == 0 => {
                return Err(self.error("Illegal continue statement: no surrounding iteration statement"));
            }
            None => {}
        }
        self.eat_semicolon()?;
        Ok(Statement::Continue(label))
    }

    fn parse_break(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let label = self.parse_optional_label()?;
        match &label {
            Some(l) => {
                if !self.ctx.labels.iter().any(|(name, _)| name == l) {
                    return Err(self.error(format!("Undefined label '{l}'")));
                }
            }
            None if self.ctx.in_iteration == 0 && self.ctx.in_switch == 0 => {
                return Err(self.error("Illegal break statement"));
            }
            None => {}
        }
        self.eat_semicolon()?;
        Ok(Statement::Break(label))
    }

    fn parse_optional_label(&mut self) -> Result<Option<Rc<str>>, ParseError> {
        if self.prev_line_terminator {
            return Ok(None);
        }
        match self.current_identifier() {
            Some(name) => {
                self.advance()?;
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }

    fn parse_switch(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.eat(&Token::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.eat(&Token::RightParen)?;
        self.eat(&Token::LeftBrace)?;
        self.ctx.in_switch += 1;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.is(&Token::RightBrace) {
            let test = if self.eat_if(&Token::Keyword(Keyword::Default))? {
                if seen_default {
                    return Err(self.error("More than one default clause in switch statement"));
                }
                seen_default = true;
                None
            } else {
                self.expect_keyword(Keyword::Case)?;
                Some(self.parse_expression()?)
            };
            self.eat(&Token::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(
                self.current,
                Token::Keyword(Keyword::Case | Keyword::Default) | Token::RightBrace
            ) {
                consequent.push(self.parse_statement_list_item()?);
            }
            cases.push(SwitchCase { test, consequent });
        }
        self.advance()?;
        self.ctx.in_switch -= 1;
        self.check_case_block(&cases)?;
        Ok(Statement::Switch(SwitchStatement { discriminant, cases }))
    }

    fn check_case_block(&self, cases: &[SwitchCase]) -> Result<(), ParseError> {
        let mut lexical = Vec::new();
        let mut var_names = Vec::new();
        for case in cases {
            lexical.extend(lexically_scoped_declarations(&case.consequent));
            let mut decls = Vec::new();
            var_scoped_declarations(&case.consequent, &mut decls);
            var_names.extend(decls.iter().flat_map(Declaration::bound_names));
        }
        self.check_scope(&lexical, &var_names)
    }

    fn parse_try(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let block = self.parse_block()?;
        let handler = if self.eat_if(&Token::Keyword(Keyword::Catch))? {
            let param = if self.eat_if(&Token::LeftParen)? {
                let p = self.parse_binding_target()?;
                self.eat(&Token::RightParen)?;
                Some(p)
            } else {
                None
            };
            let body = self.parse_block()?;
            if let Some(p) = &param {
                let mut names = Vec::new();
                p.bound_names(&mut names);
                let mut unique = FxHashSet::default();
                if !names.iter().all(|n| unique.insert(n.clone())) {
                    return Err(self.error("Duplicate binding in catch parameter"));
                }
                for decl in lexically_scoped_declarations(&body) {
                    if decl.bound_names().iter().any(|n| names.contains(n)) {
                        return Err(self.error("Identifier has already been declared in catch"));
                    }
                }
            }
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.eat_if(&Token::Keyword(Keyword::Finally))? {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }
}

enum ForHead {
    Init(Option<ForInit>),
    InOf { left: ForBinding, of: bool },
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
    fn for_heads_are_classified() {
        assert!(matches!(first("for (let i = 0; i < 3; i++) {}"), Statement::For(_)));
        assert!(matches!(first("for (const k in o) {}"), Statement::ForIn(_)));
        match first("for ([a, b] of pairs) {}") {
            Statement::ForOf(f) => assert!(matches!(f.left, ForBinding::Assignment(Pattern::Array { .. }))),
            other => panic!("unexpected {other:?}"),
        }
        match first("for (o.p in src) ;") {
            Statement::ForIn(f) => assert!(matches!(f.left, ForBinding::Assignment(Pattern::Member(_)))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn break_and_continue_need_targets() {
        assert!(parse_script("break;").is_err());
        assert!(parse_script("while (1) { continue; }").is_ok());
        assert!(parse_script("a: { break a; }").is_ok());
        assert!(parse_script("a: { continue a; }").is_err());
        assert!(parse_script("a: while (1) { continue a; }").is_ok());
    }

    #[test]
    fn return_only_inside_functions() {
        assert!(parse_script("return 1").is_err());
        assert!(parse_script("function f() { return 1 }").is_ok());
    }

    #[test]
    fn restricted_productions() {
        match first("function f() { return\n1 }") {
            Statement::FunctionDeclaration(f) => {
                assert!(matches!(f.statements()[0], Statement::Return(None)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_script("throw\n1").is_err());
    }

    #[test]
    fn let_in_for_body_conflicts_with_var() {
        assert!(parse_script("for (let i of x) { var i; }").is_err());
    }
}
