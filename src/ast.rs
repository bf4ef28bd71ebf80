//! Syntax tree produced by the parser and walked by the evaluator.
//!
//! Identifiers are `Rc<str>` and string literals are already-cooked UTF-16
//! `JsString`s. Function and class nodes are reference counted because
//! function objects keep their defining node alive.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::types::JsString;

/// One-based line, zero-based column of a node's first token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug)]
pub struct Script {
    pub body: Vec<Statement>,
    pub strict: bool,
}

#[derive(Debug)]
pub struct Module {
    pub items: Vec<ModuleItem>,
}

#[derive(Debug)]
pub enum ModuleItem {
    Statement(Statement),
    Import(ImportDeclaration),
    Export(ExportDeclaration),
}

#[derive(Debug)]
pub struct ImportDeclaration {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: Rc<str>,
}

#[derive(Debug)]
pub enum ImportSpecifier {
    Named { imported: Rc<str>, local: Rc<str> },
    Default(Rc<str>),
    Namespace(Rc<str>),
}

#[derive(Debug)]
pub enum ExportDeclaration {
    /// `export { a as b }` and `export { a } from "m"`.
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<Rc<str>>,
    },
    /// `export var|let|const|function|class ...`
    Declaration(Statement),
    /// `export default <expr>;`
    DefaultExpression(Expression),
    DefaultFunction(Rc<FunctionNode>),
    DefaultClass(Rc<ClassNode>),
    /// `export * from "m"` / `export * as ns from "m"`.
    All {
        exported: Option<Rc<str>>,
        source: Rc<str>,
    },
}

#[derive(Debug)]
pub struct ExportSpecifier {
    pub local: Rc<str>,
    pub exported: Rc<str>,
}

#[derive(Debug)]
pub enum Statement {
    Empty,
    Debugger,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(VariableDeclaration),
    FunctionDeclaration(Rc<FunctionNode>),
    ClassDeclaration(Rc<ClassNode>),
    If(IfStatement),
    DoWhile(WhileStatement),
    While(WhileStatement),
    For(Box<ForStatement>),
    ForIn(Box<ForInOfStatement>),
    ForOf(Box<ForInOfStatement>),
    Continue(Option<Rc<str>>),
    Break(Option<Rc<str>>),
    Return(Option<Expression>),
    Switch(SwitchStatement),
    Labeled(Rc<str>, Box<Statement>),
    Throw(Expression, Position),
    Try(TryStatement),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug)]
pub struct VariableDeclaration {
    pub kind: VarKind,
    pub declarations: Vec<VariableDeclarator>,
}

#[derive(Debug)]
pub struct VariableDeclarator {
    pub target: Pattern,
    pub init: Option<Expression>,
}

#[derive(Debug)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Debug)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Statement,
}

#[derive(Debug)]
pub enum ForInit {
    Variable(VariableDeclaration),
    Expression(Expression),
}

#[derive(Debug)]
pub struct ForInOfStatement {
    pub left: ForBinding,
    pub right: Expression,
    pub body: Statement,
    pub is_await: bool,
}

/// The left-hand side of `for-in` / `for-of`.
#[derive(Debug)]
pub enum ForBinding {
    /// `for (x of ...)`, `for ([a, b] of ...)`, `for (o.p in ...)`
    Assignment(Pattern),
    /// `for (var x of ...)`
    Var(Pattern),
    /// `for (let|const x of ...)`
    Lexical(VarKind, Pattern),
}

#[derive(Debug)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
}

#[derive(Debug)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Debug)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Statement>,
}

/// Binding and assignment targets.
#[derive(Debug)]
pub enum Pattern {
    Identifier(Rc<str>),
    /// Only in assignment patterns: `[o.x] = ...`
    Member(Box<Expression>),
    Object {
        properties: Vec<ObjectPatternProperty>,
        rest: Option<Box<Pattern>>,
    },
    Array {
        elements: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
    },
    /// A target with a default: `x = 1` inside a pattern or parameter list.
    Default(Box<Pattern>, Box<Expression>),
}

#[derive(Debug)]
pub struct ObjectPatternProperty {
    pub key: PropertyName,
    pub value: Pattern,
}

#[derive(Debug)]
pub enum PropertyName {
    Literal(JsString),
    Computed(Box<Expression>),
}

#[derive(Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(Rc<str>),
    This,
    /// Elements are `None` for holes; spread elements are `Spread`.
    Array(Vec<Option<Expression>>),
    Object(Vec<PropertyDefinition>),
    Function(Rc<FunctionNode>),
    Arrow(Rc<FunctionNode>),
    Class(Rc<ClassNode>),
    Template(Rc<TemplateLiteral>),
    TaggedTemplate {
        tag: Box<Expression>,
        quasi: Rc<TemplateLiteral>,
        position: Position,
    },
    Unary(UnaryOp, Box<Expression>),
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expression>,
    },
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Assign(AssignOp, Box<Pattern>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Call(Box<CallExpression>),
    New(Box<CallExpression>),
    SuperCall(Vec<Expression>, Position),
    Member {
        object: Box<Expression>,
        property: MemberProperty,
        /// `a?.b`: short-circuits the enclosing `OptionalChain`.
        optional: bool,
    },
    SuperMember(MemberProperty),
    /// Boundary of an optional chain; anything short-circuited inside
    /// evaluates the whole chain to `undefined`.
    OptionalChain(Box<Expression>),
    NewTarget,
    Spread(Box<Expression>),
    Yield {
        argument: Option<Box<Expression>>,
        delegate: bool,
    },
    Await(Box<Expression>),
    Sequence(Vec<Expression>),
    /// `(expr)`: kept so `(a) = 1` and `(f)()` stay distinguishable from
    /// their unparenthesized forms where it matters for naming.
    Parenthesized(Box<Expression>),
}

#[derive(Debug)]
pub struct CallExpression {
    pub callee: Expression,
    pub arguments: Vec<Expression>,
    pub optional: bool,
    pub position: Position,
    /// Source text of the callee, recorded in stack traces.
    pub callee_text: Rc<str>,
}

#[derive(Debug)]
pub enum MemberProperty {
    Dot(Rc<str>),
    Computed(Box<Expression>),
}

#[derive(Debug)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    BigInt(Rc<BigInt>),
    RegExp { pattern: Rc<str>, flags: Rc<str> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    /// `a op= b`
    Compound(BinaryOp),
    /// `a &&= b`, `a ||= b`, `a ??= b`
    Logical(LogicalOp),
}

#[derive(Debug)]
pub enum PropertyDefinition {
    KeyValue(PropertyName, Expression),
    Shorthand(Rc<str>),
    /// `__proto__: value` in literal (non-computed, non-shorthand) form.
    Proto(Expression),
    Method(MethodDefinition),
    Spread(Expression),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Get,
    Set,
}

#[derive(Debug)]
pub struct MethodDefinition {
    pub key: PropertyName,
    pub kind: MethodKind,
    pub function: Rc<FunctionNode>,
    pub is_static: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Normal,
    Arrow,
    Method,
    ClassConstructor,
    /// The synthetic method wrapping a class field initializer.
    ClassField,
}

#[derive(Debug)]
pub enum FunctionBody {
    Block(Vec<Statement>),
    /// Concise arrow bodies and field initializers.
    Expression(Expression),
}

#[derive(Debug)]
pub struct FunctionNode {
    pub name: Option<Rc<str>>,
    pub params: Vec<Pattern>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    pub kind: FunctionKind,
    pub is_async: bool,
    pub is_generator: bool,
    pub strict: bool,
    /// Only meaningful for `ClassConstructor`.
    pub derived: bool,
    pub source_text: Rc<str>,
    pub position: Position,
}

impl FunctionNode {
    pub fn is_arrow(&self) -> bool {
        self.kind == FunctionKind::Arrow
    }

    // §15.1.3 IsSimpleParameterList
    pub fn has_simple_parameter_list(&self) -> bool {
        self.rest.is_none() && self.params.iter().all(|p| matches!(p, Pattern::Identifier(_)))
    }

    // §15.1.5 ExpectedArgumentCount
    pub fn expected_argument_count(&self) -> u32 {
        self.params
            .iter()
            .take_while(|p| !matches!(p, Pattern::Default(..)))
            .count() as u32
    }

    pub fn parameter_names(&self) -> Vec<Rc<str>> {
        let mut names = Vec::new();
        for p in self.params.iter().chain(self.rest.iter()) {
            p.bound_names(&mut names);
        }
        names
    }

    pub fn statements(&self) -> &[Statement] {
        match &self.body {
            FunctionBody::Block(stmts) => stmts,
            FunctionBody::Expression(_) => &[],
        }
    }
}

#[derive(Debug)]
pub struct ClassNode {
    pub name: Option<Rc<str>>,
    pub heritage: Option<Expression>,
    pub constructor: Option<Rc<FunctionNode>>,
    pub elements: Vec<ClassElement>,
    pub source_text: Rc<str>,
}

#[derive(Debug)]
pub enum ClassElement {
    Method(MethodDefinition),
    Field {
        key: PropertyName,
        initializer: Option<Rc<FunctionNode>>,
        is_static: bool,
    },
}

#[derive(Debug)]
pub struct TemplateLiteral {
    /// Cooked strings; `None` where a tagged template held an invalid escape.
    pub cooked: Vec<Option<JsString>>,
    pub raw: Vec<JsString>,
    pub expressions: Vec<Expression>,
}

impl Pattern {
    // §8.2.1 BoundNames
    pub fn bound_names(&self, out: &mut Vec<Rc<str>>) {
        match self {
            Pattern::Identifier(name) => out.push(name.clone()),
            Pattern::Member(_) => {}
            Pattern::Object { properties, rest } => {
                for p in properties {
                    p.value.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Array { elements, rest } => {
                for e in elements.iter().flatten() {
                    e.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Default(target, _) => target.bound_names(out),
        }
    }
}

impl Expression {
    // §8.4.3 IsAnonymousFunctionDefinition
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(f) => f.name.is_none(),
            Expression::Arrow(_) => true,
            Expression::Class(c) => c.name.is_none(),
            Expression::Parenthesized(inner) => inner.is_anonymous_function_definition(),
            _ => false,
        }
    }
}

/// A declaration collected by the scope analyses below.
#[derive(Debug)]
pub enum Declaration<'a> {
    Var(&'a Pattern),
    Lexical {
        names: Vec<Rc<str>>,
        constant: bool,
    },
    Function(&'a Rc<FunctionNode>),
    Class(&'a Rc<ClassNode>),
}

// §8.2.6 VarScopedDeclarations / §8.2.7 VarDeclaredNames
pub fn var_scoped_declarations<'a>(stmts: &'a [Statement], out: &mut Vec<Declaration<'a>>) {
    for s in stmts {
        var_scoped_in_statement(s, out);
    }
}

fn var_scoped_in_statement<'a>(stmt: &'a Statement, out: &mut Vec<Declaration<'a>>) {
    match stmt {
        Statement::Variable(decl) if decl.kind == VarKind::Var => {
            out.extend(decl.declarations.iter().map(|d| Declaration::Var(&d.target)));
        }
        Statement::Block(stmts) => var_scoped_declarations(stmts, out),
        Statement::If(s) => {
            var_scoped_in_statement(&s.consequent, out);
            if let Some(alt) = &s.alternate {
                var_scoped_in_statement(alt, out);
            }
        }
        Statement::DoWhile(s) | Statement::While(s) => var_scoped_in_statement(&s.body, out),
        Statement::For(s) => {
            if let Some(ForInit::Variable(decl)) = &s.init {
                if decl.kind == VarKind::Var {
                    out.extend(decl.declarations.iter().map(|d| Declaration::Var(&d.target)));
                }
            }
            var_scoped_in_statement(&s.body, out);
        }
        Statement::ForIn(s) | Statement::ForOf(s) => {
            if let ForBinding::Var(p) = &s.left {
                out.push(Declaration::Var(p));
            }
            var_scoped_in_statement(&s.body, out);
        }
        Statement::Switch(s) => {
            for case in &s.cases {
                var_scoped_declarations(&case.consequent, out);
            }
        }
        Statement::Labeled(_, body) => var_scoped_in_statement(body, out),
        Statement::Try(t) => {
            var_scoped_declarations(&t.block, out);
            if let Some(h) = &t.handler {
                var_scoped_declarations(&h.body, out);
            }
            if let Some(f) = &t.finalizer {
                var_scoped_declarations(f, out);
            }
        }
        _ => {}
    }
}

/// Top-level form: function declarations directly in a function or script
/// body are var-scoped rather than lexical (§8.2.8 TopLevelVarScopedDeclarations).
pub fn top_level_var_scoped_declarations<'a>(stmts: &'a [Statement]) -> Vec<Declaration<'a>> {
    let mut out = Vec::new();
    for s in stmts {
        match s {
            Statement::FunctionDeclaration(f) => out.push(Declaration::Function(f)),
            Statement::Labeled(..) => {
                let mut inner = s;
                while let Statement::Labeled(_, body) = inner {
                    inner = body;
                }
                if let Statement::FunctionDeclaration(f) = inner {
                    out.push(Declaration::Function(f));
                } else {
                    var_scoped_in_statement(inner, &mut out);
                }
            }
            other => var_scoped_in_statement(other, &mut out),
        }
    }
    out
}

// §8.2.4 LexicallyScopedDeclarations for a block or case list.
pub fn lexically_scoped_declarations(stmts: &[Statement]) -> Vec<Declaration<'_>> {
    let mut out = Vec::new();
    for s in stmts {
        lexical_in_statement(s, &mut out, false);
    }
    out
}

/// The top-level form, where function declarations are var-scoped and so
/// left out.
pub fn top_level_lexically_scoped_declarations(stmts: &[Statement]) -> Vec<Declaration<'_>> {
    let mut out = Vec::new();
    for s in stmts {
        lexical_in_statement(s, &mut out, true);
    }
    out
}

fn lexical_in_statement<'a>(stmt: &'a Statement, out: &mut Vec<Declaration<'a>>, top_level: bool) {
    match stmt {
        Statement::Variable(decl) if decl.kind != VarKind::Var => {
            let mut names = Vec::new();
            for d in &decl.declarations {
                d.target.bound_names(&mut names);
            }
            out.push(Declaration::Lexical {
                names,
                constant: decl.kind == VarKind::Const,
            });
        }
        Statement::FunctionDeclaration(f) if !top_level => out.push(Declaration::Function(f)),
        Statement::ClassDeclaration(c) => out.push(Declaration::Class(c)),
        Statement::Labeled(_, body) if !top_level => lexical_in_statement(body, out, top_level),
        _ => {}
    }
}

impl Declaration<'_> {
    pub fn bound_names(&self) -> Vec<Rc<str>> {
        match self {
            Declaration::Var(p) => {
                let mut names = Vec::new();
                p.bound_names(&mut names);
                names
            }
            Declaration::Lexical { names, .. } => names.clone(),
            Declaration::Function(f) => f.name.iter().cloned().collect(),
            Declaration::Class(c) => c.name.iter().cloned().collect(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Declaration::Lexical { constant: true, .. })
    }
}

/// Whether `arguments` is referenced by the code of a function, not counting
/// nested non-arrow functions.
pub fn function_references_arguments(node: &FunctionNode) -> bool {
    let mut finder = ArgumentsFinder::default();
    for p in node.params.iter().chain(node.rest.iter()) {
        finder.pattern(p);
    }
    match &node.body {
        FunctionBody::Block(stmts) => stmts.iter().for_each(|s| finder.statement(s)),
        FunctionBody::Expression(e) => finder.expression(e),
    }
    finder.found
}

#[derive(Default)]
struct ArgumentsFinder {
    found: bool,
}

impl ArgumentsFinder {
    fn statement(&mut self, s: &Statement) {
        if self.found {
            return;
        }
        match s {
            Statement::Expression(e) | Statement::Throw(e, _) => self.expression(e),
            Statement::Return(e) => e.iter().for_each(|e| self.expression(e)),
            Statement::Block(b) => b.iter().for_each(|s| self.statement(s)),
            Statement::Variable(d) => self.declaration(d),
            Statement::ClassDeclaration(c) => self.class(c),
            Statement::If(i) => {
                self.expression(&i.test);
                self.statement(&i.consequent);
                i.alternate.iter().for_each(|s| self.statement(s));
            }
            Statement::DoWhile(w) | Statement::While(w) => {
                self.expression(&w.test);
                self.statement(&w.body);
            }
            Statement::For(f) => {
                match &f.init {
                    Some(ForInit::Variable(d)) => self.declaration(d),
                    Some(ForInit::Expression(e)) => self.expression(e),
                    None => {}
                }
                f.test.iter().for_each(|e| self.expression(e));
                f.update.iter().for_each(|e| self.expression(e));
                self.statement(&f.body);
            }
            Statement::ForIn(f) | Statement::ForOf(f) => {
                match &f.left {
                    ForBinding::Assignment(p) | ForBinding::Var(p) | ForBinding::Lexical(_, p) => {
                        self.pattern(p)
                    }
                }
                self.expression(&f.right);
                self.statement(&f.body);
            }
            Statement::Switch(sw) => {
                self.expression(&sw.discriminant);
                for c in &sw.cases {
                    c.test.iter().for_each(|e| self.expression(e));
                    c.consequent.iter().for_each(|s| self.statement(s));
                }
            }
            Statement::Labeled(_, body) => self.statement(body),
            Statement::Try(t) => {
                t.block.iter().for_each(|s| self.statement(s));
                if let Some(h) = &t.handler {
                    h.param.iter().for_each(|p| self.pattern(p));
                    h.body.iter().for_each(|s| self.statement(s));
                }
                t.finalizer.iter().flatten().for_each(|s| self.statement(s));
            }
            Statement::Empty
            | Statement::Debugger
            | Statement::FunctionDeclaration(_)
            | Statement::Continue(_)
            | Statement::Break(_) => {}
        }
    }

    fn declaration(&mut self, d: &VariableDeclaration) {
        for decl in &d.declarations {
            self.pattern(&decl.target);
            decl.init.iter().for_each(|e| self.expression(e));
        }
    }

    fn pattern(&mut self, p: &Pattern) {
        match p {
            Pattern::Identifier(_) => {}
            Pattern::Member(e) => self.expression(e),
            Pattern::Object { properties, rest } => {
                for prop in properties {
                    if let PropertyName::Computed(e) = &prop.key {
                        self.expression(e);
                    }
                    self.pattern(&prop.value);
                }
                rest.iter().for_each(|r| self.pattern(r));
            }
            Pattern::Array { elements, rest } => {
                elements.iter().flatten().for_each(|e| self.pattern(e));
                rest.iter().for_each(|r| self.pattern(r));
            }
            Pattern::Default(target, init) => {
                self.pattern(target);
                self.expression(init);
            }
        }
    }

    fn class(&mut self, c: &ClassNode) {
        c.heritage.iter().for_each(|e| self.expression(e));
        for el in &c.elements {
            let key = match el {
                ClassElement::Method(m) => &m.key,
                ClassElement::Field { key, .. } => key,
            };
            if let PropertyName::Computed(e) = key {
                self.expression(e);
            }
        }
    }

    fn expression(&mut self, e: &Expression) {
        if self.found {
            return;
        }
        match e {
            Expression::Identifier(name) => self.found = &**name == "arguments",
            Expression::Arrow(f) => {
                self.found = function_references_arguments(f);
            }
            Expression::Class(c) => self.class(c),
            Expression::Array(items) => items.iter().flatten().for_each(|e| self.expression(e)),
            Expression::Object(props) => {
                for p in props {
                    match p {
                        PropertyDefinition::KeyValue(k, v) => {
                            if let PropertyName::Computed(k) = k {
                                self.expression(k);
                            }
                            self.expression(v);
                        }
                        PropertyDefinition::Shorthand(n) => self.found |= &**n == "arguments",
                        PropertyDefinition::Proto(v) | PropertyDefinition::Spread(v) => {
                            self.expression(v)
                        }
                        PropertyDefinition::Method(m) => {
                            if let PropertyName::Computed(k) = &m.key {
                                self.expression(k);
                            }
                        }
                    }
                }
            }
            Expression::Template(t) => t.expressions.iter().for_each(|e| self.expression(e)),
            Expression::TaggedTemplate { tag, quasi, .. } => {
                self.expression(tag);
                quasi.expressions.iter().for_each(|e| self.expression(e));
            }
            Expression::Unary(_, a)
            | Expression::Spread(a)
            | Expression::Await(a)
            | Expression::OptionalChain(a)
            | Expression::Parenthesized(a) => self.expression(a),
            Expression::Update { target, .. } => self.expression(target),
            Expression::Binary(_, a, b) | Expression::Logical(_, a, b) => {
                self.expression(a);
                self.expression(b);
            }
            Expression::Assign(_, target, value) => {
                self.pattern(target);
                self.expression(value);
            }
            Expression::Conditional(a, b, c) => {
                self.expression(a);
                self.expression(b);
                self.expression(c);
            }
            Expression::Call(call) | Expression::New(call) => {
                self.expression(&call.callee);
                call.arguments.iter().for_each(|e| self.expression(e));
            }
            Expression::SuperCall(args, _) => args.iter().for_each(|e| self.expression(e)),
            Expression::Member { object, property, .. } => {
                self.expression(object);
                if let MemberProperty::Computed(p) = property {
                    self.expression(p);
                }
            }
            Expression::SuperMember(MemberProperty::Computed(p)) => self.expression(p),
            Expression::Yield { argument, .. } => argument.iter().for_each(|e| self.expression(e)),
            Expression::Sequence(items) => items.iter().for_each(|e| self.expression(e)),
            Expression::Literal(_)
            | Expression::This
            | Expression::Function(_)
            | Expression::SuperMember(MemberProperty::Dot(_))
            | Expression::NewTarget => {}
        }
    }
}
