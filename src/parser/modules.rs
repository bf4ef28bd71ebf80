use super::*;

impl<'a> Parser<'a> {
    // §16.2 Modules
    pub(super) fn parse_module_items(&mut self) -> Result<Module, ParseError> {
        let mut items = Vec::new();
        while !self.is(&Token::Eof) {
            let item = match self.current {
                Token::Keyword(Keyword::Import) => ModuleItem::Import(self.parse_import()?),
                Token::Keyword(Keyword::Export) => ModuleItem::Export(self.parse_export()?),
                _ => ModuleItem::Statement(self.parse_statement_list_item()?),
            };
            items.push(item);
        }
        let module = Module { items };
        self.check_module(&module)?;
        Ok(module)
    }

    fn is_contextual(&self, word: &str) -> bool {
        matches!(&self.current, Token::Identifier(n) if n == word)
    }

    fn expect_contextual(&mut self, word: &str) -> Result<(), ParseError> {
        if !self.is_contextual(word) {
            return Err(self.unexpected());
        }
        self.advance()?;
        Ok(())
    }

    fn parse_module_specifier(&mut self) -> Result<Rc<str>, ParseError> {
        let Token::StringLiteral(units, _) = &self.current else {
            return Err(self.unexpected());
        };
        let specifier: Rc<str> = String::from_utf16_lossy(units).into();
        self.advance()?;
        Ok(specifier)
    }

    /// An IdentifierName or a string literal naming an export.
    fn parse_module_export_name(&mut self) -> Result<(Rc<str>, bool), ParseError> {
        if let Token::StringLiteral(units, _) = &self.current {
            let name = String::from_utf16(units).map_err(|_| self.error("Invalid module export name"))?;
            self.advance()?;
            return Ok((name.into(), true));
        }
        match self.identifier_name() {
            Some(name) => {
                self.advance()?;
                Ok((name, false))
            }
            None => Err(self.unexpected()),
        }
    }

    fn parse_import(&mut self) -> Result<ImportDeclaration, ParseError> {
        self.expect_keyword(Keyword::Import)?;
        let mut specifiers = Vec::new();
        if matches!(self.current, Token::StringLiteral(..)) {
            let source = self.parse_module_specifier()?;
            self.eat_semicolon()?;
            return Ok(ImportDeclaration { specifiers, source });
        }

        let mut more = true;
        if self.current_identifier().is_some() {
            specifiers.push(ImportSpecifier::Default(self.binding_identifier()?));
            more = self.eat_if(&Token::Comma)?;
        }
        if more {
            match self.current {
                Token::Star => {
                    self.advance()?;
                    self.expect_contextual("as")?;
                    specifiers.push(ImportSpecifier::Namespace(self.binding_identifier()?));
                }
                Token::LeftBrace => {
                    self.advance()?;
                    while !self.is(&Token::RightBrace) {
                        let shorthand = self.current_identifier();
                        let (imported, _) = self.parse_module_export_name()?;
                        let local = if self.is_contextual("as") {
                            self.advance()?;
                            self.binding_identifier()?
                        } else {
                            match shorthand {
                                Some(name) => {
                                    self.check_binding_name(&name)?;
                                    name
                                }
                                None => return Err(self.error(format!("Unexpected reserved word '{imported}'"))),
                            }
                        };
                        specifiers.push(ImportSpecifier::Named { imported, local });
                        if !self.is(&Token::RightBrace) {
                            self.eat(&Token::Comma)?;
                        }
                    }
                    self.advance()?;
                }
                _ => return Err(self.unexpected()),
            }
        }
        self.expect_contextual("from")?;
        let source = self.parse_module_specifier()?;
        self.eat_semicolon()?;
        Ok(ImportDeclaration { specifiers, source })
    }

    fn parse_export(&mut self) -> Result<ExportDeclaration, ParseError> {
        self.expect_keyword(Keyword::Export)?;
        match self.current {
            Token::Star => {
                self.advance()?;
                let exported = if self.is_contextual("as") {
                    self.advance()?;
                    Some(self.parse_module_export_name()?.0)
                } else {
                    None
                };
                self.expect_contextual("from")?;
                let source = self.parse_module_specifier()?;
                self.eat_semicolon()?;
                Ok(ExportDeclaration::All { exported, source })
            }
            Token::LeftBrace => {
                self.advance()?;
                let mut specifiers = Vec::new();
                let mut not_local = None;
                while !self.is(&Token::RightBrace) {
                    let reserved = self.current_identifier().is_none();
                    let (local, is_string) = self.parse_module_export_name()?;
                    if (reserved || is_string) && not_local.is_none() {
                        not_local = Some(local.clone());
                    }
                    let exported = if self.is_contextual("as") {
                        self.advance()?;
                        self.parse_module_export_name()?.0
                    } else {
                        local.clone()
                    };
                    specifiers.push(ExportSpecifier { local, exported });
                    if !self.is(&Token::RightBrace) {
                        self.eat(&Token::Comma)?;
                    }
                }
                self.advance()?;
                let source = if self.is_contextual("from") {
                    self.advance()?;
                    Some(self.parse_module_specifier()?)
                } else {
                    if let Some(name) = not_local {
                        return Err(self.error(format!("Unexpected reserved word '{name}'")));
                    }
                    None
                };
                self.eat_semicolon()?;
                Ok(ExportDeclaration::Named { specifiers, source })
            }
            Token::Keyword(Keyword::Default) => {
                self.advance()?;
                match self.current {
                    Token::Keyword(Keyword::Function) => {
                        Ok(ExportDeclaration::DefaultFunction(self.parse_function_declaration(true)?))
                    }
                    Token::Keyword(Keyword::Async) if self.async_function_follows() => {
                        Ok(ExportDeclaration::DefaultFunction(self.parse_function_declaration(true)?))
                    }
                    Token::Keyword(Keyword::Class) => Ok(ExportDeclaration::DefaultClass(self.parse_class(true, true)?)),
                    _ => {
                        let saved = self.ctx.no_in;
                        self.ctx.no_in = false;
                        let expr = self.parse_assignment_expression();
                        self.ctx.no_in = saved;
                        let expr = expr?;
                        self.eat_semicolon()?;
                        Ok(ExportDeclaration::DefaultExpression(expr))
                    }
                }
            }
            Token::Keyword(Keyword::Var | Keyword::Let | Keyword::Const | Keyword::Function | Keyword::Class)
            | Token::Keyword(Keyword::Async) => {
                let statement = self.parse_statement_list_item()?;
                match statement {
                    Statement::Variable(_) | Statement::FunctionDeclaration(_) | Statement::ClassDeclaration(_) => {
                        Ok(ExportDeclaration::Declaration(statement))
                    }
                    _ => Err(self.error("Unexpected token after export")),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Early errors of a module body: duplicate bindings, duplicate exports
    /// and exports of names the module never declares.
    fn check_module(&self, module: &Module) -> Result<(), ParseError> {
        let mut lexical: Vec<Declaration<'_>> = Vec::new();
        let mut var_decls = Vec::new();
        let mut exported: Vec<Rc<str>> = Vec::new();
        let mut local_exports: Vec<Rc<str>> = Vec::new();
        let mut import_names = Vec::new();

        for item in &module.items {
            match item {
                ModuleItem::Statement(s) => {
                    lexical.extend(lexically_scoped_declarations(std::slice::from_ref(s)));
                    var_scoped_declarations(std::slice::from_ref(s), &mut var_decls);
                }
                ModuleItem::Import(import) => {
                    for spec in &import.specifiers {
                        import_names.push(match spec {
                            ImportSpecifier::Named { local, .. }
                            | ImportSpecifier::Default(local)
                            | ImportSpecifier::Namespace(local) => local.clone(),
                        });
                    }
                }
                ModuleItem::Export(export) => match export {
                    ExportDeclaration::Named { specifiers, source } => {
                        for spec in specifiers {
                            exported.push(spec.exported.clone());
                            if source.is_none() {
                                local_exports.push(spec.local.clone());
                            }
                        }
                    }
                    ExportDeclaration::Declaration(s) => {
                        lexical.extend(lexically_scoped_declarations(std::slice::from_ref(s)));
                        var_scoped_declarations(std::slice::from_ref(s), &mut var_decls);
                        let names: Vec<Rc<str>> = match s {
                            Statement::Variable(d) => {
                                let mut names = Vec::new();
                                for decl in &d.declarations {
                                    decl.target.bound_names(&mut names);
                                }
                                names
                            }
                            Statement::FunctionDeclaration(f) => f.name.iter().cloned().collect(),
                            Statement::ClassDeclaration(c) => c.name.iter().cloned().collect(),
                            _ => Vec::new(),
                        };
                        exported.extend(names);
                    }
                    ExportDeclaration::DefaultFunction(f) => {
                        if f.name.is_some() {
                            lexical.push(Declaration::Function(f));
                        }
                        exported.push("default".into());
                    }
                    ExportDeclaration::DefaultClass(c) => {
                        if c.name.is_some() {
                            lexical.push(Declaration::Class(c));
                        }
                        exported.push("default".into());
                    }
                    ExportDeclaration::DefaultExpression(_) => exported.push("default".into()),
                    ExportDeclaration::All { exported: name, .. } => exported.extend(name.iter().cloned()),
                },
            }
        }

        lexical.push(Declaration::Lexical {
            names: import_names,
            constant: true,
        });
        let var_names: Vec<Rc<str>> = var_decls.iter().flat_map(Declaration::bound_names).collect();
        self.check_scope(&lexical, &var_names)?;

        let mut seen = FxHashSet::default();
        for name in &exported {
            if !seen.insert(name.clone()) {
                return Err(self.error(format!("Duplicate export of '{name}'")));
            }
        }
        let declared: FxHashSet<Rc<str>> = lexical
            .iter()
            .flat_map(Declaration::bound_names)
            .chain(var_names.iter().cloned())
            .collect();
        if let Some(name) = local_exports.iter().find(|n| !declared.contains(*n)) {
            return Err(self.error(format!("Export '{name}' is not defined in module")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse_module;

    #[test]
    fn import_forms() {
        let module = match parse_module(
            "import 'a'; import d from 'b'; import * as ns from 'c'; import e, { x, y as z } from 'd';",
        ) {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        };
        let counts: Vec<usize> = module
            .items
            .iter()
            .map(|item| match item {
                ModuleItem::Import(i) => i.specifiers.len(),
                _ => usize::MAX,
            })
            .collect();
        assert_eq!(counts, vec![0, 1, 1, 3]);
    }

    #[test]
    fn export_forms() {
        let module = match parse_module(
            "export var a = 1; export let b; export function f() {} export class C {} \
             export { a as aa }; export * from 'm'; export * as ns from 'n'; export { x as y } from 'o'; \
             export default 42;",
        ) {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(module.items.len(), 9);
        assert!(matches!(
            module.items.last(),
            Some(ModuleItem::Export(ExportDeclaration::DefaultExpression(_)))
        ));
    }

    #[test]
    fn anonymous_default_declarations() {
        assert!(parse_module("export default function () {}").is_ok());
        assert!(parse_module("export default class {}").is_ok());
        assert!(parse_module("export default async function () {}").is_ok());
    }

    #[test]
    fn module_early_errors() {
        assert!(parse_module("export { missing };").is_err());
        assert!(parse_module("export var a; export { a };").is_err());
        assert!(parse_module("import { a } from 'm'; let a;").is_err());
        assert!(parse_module("function f() {} function f() {}").is_err());
        assert!(parse_module("export { if };").is_err());
        assert!(parse_module("export { if } from 'm';").is_ok());
    }

    #[test]
    fn modules_are_strict() {
        assert!(parse_module("with (a) {}").is_err());
        assert!(parse_module("var await;").is_err());
        assert!(parse_module("010").is_err());
    }
}
