//! Recursive-descent parser over the token vector.
//!
//! Precedence climbing for expressions, one token of effective lookahead plus
//! cheap position save/restore where PHP's grammar needs it (typed class
//! constants, intersection types vs by-ref parameters). First error wins:
//! the file is abandoned and the caller reports `{line, message}`.

use crate::ast::*;
use crate::lexer::{LexError, Lexer, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            line: err.line,
            message: err.message,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse one PHP source file into its top-level statement list.
pub fn parse_file(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// One entry per enclosing function body; the top is set when a `yield`
    /// is seen so declarations can record `has_yield`.
    yield_stack: Vec<bool>,
}

const CAST_NAMES: &[(&str, CastKind)] = &[
    ("int", CastKind::Int),
    ("integer", CastKind::Int),
    ("float", CastKind::Float),
    ("double", CastKind::Float),
    ("real", CastKind::Float),
    ("string", CastKind::String),
    ("binary", CastKind::String),
    ("bool", CastKind::Bool),
    ("boolean", CastKind::Bool),
    ("array", CastKind::Array),
    ("object", CastKind::Object),
];

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            yield_stack: Vec::new(),
        }
    }

    // =====================================================================
    // Token plumbing
    // =====================================================================

    fn kind(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn accept(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected {what}, found {}", describe(self.kind()))))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn mark_yield(&mut self) {
        if let Some(top) = self.yield_stack.last_mut() {
            *top = true;
        }
    }

    // =====================================================================
    // Program and statements
    // =====================================================================

    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match self.kind() {
            TokenKind::Semicolon => {
                self.bump();
                Ok(Stmt::Nop)
            }
            TokenKind::OpenBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Namespace => self.parse_namespace(),
            TokenKind::Use => self.parse_use(),
            TokenKind::Const => self.parse_const(),
            TokenKind::Declare => self.parse_declare(),
            TokenKind::Function
                if matches!(self.peek_kind(1), TokenKind::Ident(_))
                    || (self.peek_kind(1) == &TokenKind::Amp
                        && matches!(self.peek_kind(2), TokenKind::Ident(_))) =>
            {
                let func = self.parse_function_decl(MemberModifiers::default())?;
                Ok(Stmt::Function(std::rc::Rc::new(func)))
            }
            TokenKind::Abstract | TokenKind::Final | TokenKind::Class | TokenKind::Interface
            | TokenKind::Trait | TokenKind::Enum => self.parse_class_statement(),
            TokenKind::Readonly if self.peek_kind(1) == &TokenKind::Class => {
                self.parse_class_statement()
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Return => {
                self.bump();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.end_statement()?;
                Ok(Stmt::Return { value, line })
            }
            TokenKind::Break => {
                self.bump();
                if let TokenKind::IntLit(_) = self.kind() {
                    self.bump();
                }
                self.end_statement()?;
                Ok(Stmt::Break { line })
            }
            TokenKind::Continue => {
                self.bump();
                if let TokenKind::IntLit(_) = self.kind() {
                    self.bump();
                }
                self.end_statement()?;
                Ok(Stmt::Continue { line })
            }
            TokenKind::Echo => {
                self.bump();
                let mut values = vec![self.parse_expr()?];
                while self.accept(&TokenKind::Comma) {
                    values.push(self.parse_expr()?);
                }
                self.end_statement()?;
                Ok(Stmt::Echo { values, line })
            }
            TokenKind::Global => {
                self.bump();
                let mut names = Vec::new();
                loop {
                    match self.bump().kind {
                        TokenKind::Variable(name) => names.push(name),
                        other => {
                            return Err(self.error(format!(
                                "expected variable in `global`, found {}",
                                describe(&other)
                            )))
                        }
                    }
                    if !self.accept(&TokenKind::Comma) {
                        break;
                    }
                }
                self.end_statement()?;
                Ok(Stmt::Global { names, line })
            }
            TokenKind::Static if matches!(self.peek_kind(1), TokenKind::Variable(_)) => {
                self.bump();
                let mut vars = Vec::new();
                loop {
                    let name = match self.bump().kind {
                        TokenKind::Variable(name) => name,
                        other => {
                            return Err(self.error(format!(
                                "expected variable in `static`, found {}",
                                describe(&other)
                            )))
                        }
                    };
                    let default = if self.accept(&TokenKind::Assign) {
                        Some(self.parse_expr()?)
                    } else {
                        None
                    };
                    vars.push((name, default));
                    if !self.accept(&TokenKind::Comma) {
                        break;
                    }
                }
                self.end_statement()?;
                Ok(Stmt::StaticVars { vars, line })
            }
            TokenKind::Unset => {
                self.bump();
                self.expect(TokenKind::OpenParen, "`(` after `unset`")?;
                let mut targets = vec![self.parse_expr()?];
                while self.accept(&TokenKind::Comma) {
                    if self.check(&TokenKind::CloseParen) {
                        break;
                    }
                    targets.push(self.parse_expr()?);
                }
                self.expect(TokenKind::CloseParen, "`)`")?;
                self.end_statement()?;
                Ok(Stmt::Unset { targets, line })
            }
            TokenKind::AttributeStart => {
                Err(self.error("attributes are not supported"))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Statement terminator: `;`, or end of input (a close tag swallows the
    /// final semicolon in PHP).
    fn end_statement(&mut self) -> Result<(), ParseError> {
        if self.accept(&TokenKind::Semicolon) || self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected `;`, found {}",
                describe(self.kind())
            )))
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::CloseBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error("unexpected end of file, expected `}`"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.bump();
        Ok(stmts)
    }

    /// `{ … }` or a single statement (brace-less control bodies).
    fn parse_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.check(&TokenKind::OpenBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_namespace(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        let name = if self.check(&TokenKind::OpenBrace) || self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_name()?)
        };
        if self.check(&TokenKind::OpenBrace) {
            let body = self.parse_block()?;
            Ok(Stmt::Namespace {
                name,
                body: Some(body),
                line,
            })
        } else {
            self.end_statement()?;
            Ok(Stmt::Namespace {
                name,
                body: None,
                line,
            })
        }
    }

    fn parse_use(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        let kind = if self.accept(&TokenKind::Function) {
            UseKind::Function
        } else if self.accept(&TokenKind::Const) {
            UseKind::Const
        } else {
            UseKind::Class
        };
        let mut items = Vec::new();
        loop {
            let item_line = self.line();
            let name = self.parse_name()?;
            // Group use: `use A\B\{C, D as E};` — parse_name stops before `\{`.
            if self.check(&TokenKind::Backslash) && self.peek_kind(1) == &TokenKind::OpenBrace {
                self.bump();
            }
            if self.check(&TokenKind::OpenBrace) {
                self.bump();
                loop {
                    let inner_line = self.line();
                    let inner = self.parse_name()?;
                    let mut parts = name.parts.clone();
                    parts.extend(inner.parts);
                    let alias = if self.accept(&TokenKind::As) {
                        Some(self.parse_ident("alias")?)
                    } else {
                        None
                    };
                    items.push(UseItem {
                        name: Name {
                            parts,
                            fully_qualified: name.fully_qualified,
                            line: inner_line,
                        },
                        alias,
                        line: inner_line,
                    });
                    if !self.accept(&TokenKind::Comma) {
                        break;
                    }
                    if self.check(&TokenKind::CloseBrace) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseBrace, "`}`")?;
            } else {
                let alias = if self.accept(&TokenKind::As) {
                    Some(self.parse_ident("alias")?)
                } else {
                    None
                };
                items.push(UseItem {
                    name,
                    alias,
                    line: item_line,
                });
            }
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.end_statement()?;
        Ok(Stmt::Use { kind, items, line })
    }

    fn parse_const(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        let mut entries = Vec::new();
        loop {
            let entry_line = self.line();
            let name = self.parse_ident("constant name")?;
            self.expect(TokenKind::Assign, "`=`")?;
            let value = self.parse_expr()?;
            entries.push(ConstEntry {
                name,
                value,
                line: entry_line,
            });
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.end_statement()?;
        Ok(Stmt::Const { entries, line })
    }

    fn parse_declare(&mut self) -> Result<Stmt, ParseError> {
        self.bump();
        self.expect(TokenKind::OpenParen, "`(` after `declare`")?;
        loop {
            self.parse_ident("declare directive")?;
            self.expect(TokenKind::Assign, "`=`")?;
            self.parse_expr()?;
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen, "`)`")?;
        if self.check(&TokenKind::OpenBrace) {
            Ok(Stmt::Block(self.parse_block()?))
        } else {
            self.end_statement()?;
            Ok(Stmt::Nop)
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        self.expect(TokenKind::OpenParen, "`(` after `if`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::CloseParen, "`)`")?;
        let then = self.parse_body()?;
        let mut elseifs = Vec::new();
        let mut else_body = None;
        loop {
            if self.check(&TokenKind::ElseIf) {
                let elseif_line = self.line();
                self.bump();
                self.expect(TokenKind::OpenParen, "`(` after `elseif`")?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::CloseParen, "`)`")?;
                let body = self.parse_body()?;
                elseifs.push(ElseIf {
                    cond,
                    body,
                    line: elseif_line,
                });
            } else if self.check(&TokenKind::Else) {
                self.bump();
                else_body = Some(self.parse_body()?);
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::If {
            cond,
            then,
            elseifs,
            else_body,
            line,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        self.expect(TokenKind::OpenParen, "`(` after `while`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::CloseParen, "`)`")?;
        let body = self.parse_body()?;
        Ok(Stmt::While { cond, body, line })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        let body = self.parse_body()?;
        self.expect(TokenKind::While, "`while`")?;
        self.expect(TokenKind::OpenParen, "`(`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::CloseParen, "`)`")?;
        self.end_statement()?;
        Ok(Stmt::DoWhile { body, cond, line })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        self.expect(TokenKind::OpenParen, "`(` after `for`")?;
        let init = self.parse_expr_list(&TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        let cond = self.parse_expr_list(&TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        let step = self.parse_expr_list(&TokenKind::CloseParen)?;
        self.expect(TokenKind::CloseParen, "`)`")?;
        let body = self.parse_body()?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
            line,
        })
    }

    fn parse_expr_list(&mut self, terminator: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = Vec::new();
        if self.check(terminator) {
            return Ok(exprs);
        }
        exprs.push(self.parse_expr()?);
        while self.accept(&TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_foreach(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        self.expect(TokenKind::OpenParen, "`(` after `foreach`")?;
        let subject = self.parse_expr()?;
        self.expect(TokenKind::As, "`as`")?;
        let mut by_ref = self.accept(&TokenKind::Amp);
        let mut first = self.parse_expr()?;
        let mut key = None;
        if self.accept(&TokenKind::DoubleArrow) {
            key = Some(first);
            by_ref = self.accept(&TokenKind::Amp);
            first = self.parse_expr()?;
        }
        self.expect(TokenKind::CloseParen, "`)`")?;
        let body = self.parse_body()?;
        Ok(Stmt::Foreach(ForeachStmt {
            subject,
            key,
            by_ref,
            value: first,
            body,
            line,
        }))
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        self.expect(TokenKind::OpenParen, "`(` after `switch`")?;
        let subject = self.parse_expr()?;
        self.expect(TokenKind::CloseParen, "`)`")?;
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut cases = Vec::new();
        while !self.check(&TokenKind::CloseBrace) {
            let case_line = self.line();
            let test = if self.accept(&TokenKind::Case) {
                let test = self.parse_expr()?;
                Some(test)
            } else if self.accept(&TokenKind::Default) {
                None
            } else {
                return Err(self.error(format!(
                    "expected `case` or `default`, found {}",
                    describe(self.kind())
                )));
            };
            if !self.accept(&TokenKind::Colon) {
                self.expect(TokenKind::Semicolon, "`:` or `;`")?;
            }
            let mut body = Vec::new();
            while !matches!(
                self.kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::CloseBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                body,
                line: case_line,
            });
        }
        self.bump();
        Ok(Stmt::Switch {
            subject,
            cases,
            line,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.bump();
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.check(&TokenKind::Catch) {
            let catch_line = self.line();
            self.bump();
            self.expect(TokenKind::OpenParen, "`(` after `catch`")?;
            let mut types = vec![self.parse_name()?];
            while self.accept(&TokenKind::Pipe) {
                types.push(self.parse_name()?);
            }
            let var = match self.kind().clone() {
                TokenKind::Variable(name) => {
                    self.bump();
                    Some(name)
                }
                _ => None,
            };
            self.expect(TokenKind::CloseParen, "`)`")?;
            let catch_body = self.parse_block()?;
            catches.push(CatchClause {
                types,
                var,
                body: catch_body,
                line: catch_line,
            });
        }
        let finally = if self.accept(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(self.error("`try` without `catch` or `finally`"));
        }
        Ok(Stmt::Try {
            body,
            catches,
            finally,
            line,
        })
    }

    // =====================================================================
    // Declarations
    // =====================================================================

    fn parse_class_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let mut is_abstract = false;
        let mut is_final = false;
        loop {
            match self.kind() {
                TokenKind::Abstract => {
                    is_abstract = true;
                    self.bump();
                }
                TokenKind::Final => {
                    is_final = true;
                    self.bump();
                }
                TokenKind::Readonly => {
                    self.bump();
                }
                _ => break,
            }
        }
        let kind = match self.bump().kind {
            TokenKind::Class => ClassKind::Class,
            TokenKind::Interface => ClassKind::Interface,
            TokenKind::Trait => ClassKind::Trait,
            TokenKind::Enum => ClassKind::Enum,
            other => {
                return Err(self.error(format!(
                    "expected class declaration, found {}",
                    describe(&other)
                )))
            }
        };
        let name = self.parse_ident("class name")?;
        let enum_backing = if kind == ClassKind::Enum && self.accept(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let mut extends = Vec::new();
        if self.accept(&TokenKind::Extends) {
            extends.push(self.parse_name()?);
            while self.accept(&TokenKind::Comma) {
                extends.push(self.parse_name()?);
            }
        }
        let mut implements = Vec::new();
        if self.accept(&TokenKind::Implements) {
            implements.push(self.parse_name()?);
            while self.accept(&TokenKind::Comma) {
                implements.push(self.parse_name()?);
            }
        }
        self.expect(TokenKind::OpenBrace, "`{`")?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::CloseBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error("unexpected end of file in class body"));
            }
            members.push(self.parse_class_member()?);
        }
        self.bump();
        Ok(Stmt::Class(std::rc::Rc::new(ClassDecl {
            name,
            kind,
            is_abstract,
            is_final,
            extends,
            implements,
            enum_backing,
            members,
            line,
        })))
    }

    fn parse_member_modifiers(&mut self) -> MemberModifiers {
        let mut mods = MemberModifiers::default();
        loop {
            match self.kind() {
                TokenKind::Public => mods.visibility = Some(Visibility::Public),
                TokenKind::Protected => mods.visibility = Some(Visibility::Protected),
                TokenKind::Private => mods.visibility = Some(Visibility::Private),
                TokenKind::Var => mods.visibility = Some(Visibility::Public),
                TokenKind::Static => mods.is_static = true,
                TokenKind::Abstract => mods.is_abstract = true,
                TokenKind::Final => mods.is_final = true,
                TokenKind::Readonly => mods.is_readonly = true,
                _ => break,
            }
            self.bump();
        }
        mods
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, ParseError> {
        let line = self.line();
        if self.check(&TokenKind::AttributeStart) {
            return Err(self.error("attributes are not supported"));
        }
        if self.check(&TokenKind::Use) {
            self.bump();
            let mut traits = vec![self.parse_name()?];
            while self.accept(&TokenKind::Comma) {
                traits.push(self.parse_name()?);
            }
            let mut adaptations = Vec::new();
            if self.check(&TokenKind::OpenBrace) {
                self.bump();
                while !self.check(&TokenKind::CloseBrace) {
                    adaptations.push(self.parse_trait_adaptation()?);
                }
                self.bump();
            } else {
                self.end_statement()?;
            }
            return Ok(ClassMember::UseTrait(UseTrait {
                traits,
                adaptations,
                line,
            }));
        }
        if self.check(&TokenKind::Case) {
            self.bump();
            let name = self.parse_ident("enum case name")?;
            let value = if self.accept(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.end_statement()?;
            return Ok(ClassMember::EnumCase(EnumCase { name, value, line }));
        }

        let modifiers = self.parse_member_modifiers();

        if self.check(&TokenKind::Const) {
            self.bump();
            // Optional type hint: `const int FOO = 1;`. Try a type; keep it
            // only if a constant name followed by `=` comes next.
            let saved = self.pos;
            let hint = match self.parse_type() {
                Ok(ty)
                    if matches!(self.kind(), TokenKind::Ident(_))
                        && self.peek_kind(1) == &TokenKind::Assign =>
                {
                    Some(ty)
                }
                _ => {
                    self.pos = saved;
                    None
                }
            };
            let mut entries = Vec::new();
            loop {
                let entry_line = self.line();
                let name = self.parse_ident("constant name")?;
                self.expect(TokenKind::Assign, "`=`")?;
                let value = self.parse_expr()?;
                entries.push(ConstEntry {
                    name,
                    value,
                    line: entry_line,
                });
                if !self.accept(&TokenKind::Comma) {
                    break;
                }
            }
            self.end_statement()?;
            return Ok(ClassMember::Constants(ConstGroup {
                modifiers,
                hint,
                entries,
                line,
            }));
        }

        if self.check(&TokenKind::Function) {
            let func = self.parse_function_decl(modifiers)?;
            return Ok(ClassMember::Method(std::rc::Rc::new(func)));
        }

        // Property group: optional type hint, then `$name [= default], …;`
        let hint = if matches!(self.kind(), TokenKind::Variable(_)) {
            None
        } else {
            Some(self.parse_type()?)
        };
        let mut entries = Vec::new();
        loop {
            let entry_line = self.line();
            let name = match self.bump().kind {
                TokenKind::Variable(name) => name,
                other => {
                    return Err(self.error(format!(
                        "expected property name, found {}",
                        describe(&other)
                    )))
                }
            };
            let default = if self.accept(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            entries.push(PropEntry {
                name,
                default,
                line: entry_line,
            });
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.end_statement()?;
        Ok(ClassMember::Properties(PropGroup {
            modifiers,
            hint,
            entries,
            line,
        }))
    }

    fn parse_trait_adaptation(&mut self) -> Result<TraitAdaptation, ParseError> {
        let line = self.line();
        let first = self.parse_name()?;
        if self.accept(&TokenKind::DoubleColon) {
            let method = self.parse_member_ident("method name")?;
            if self.accept(&TokenKind::Insteadof) {
                let mut excluded = vec![self.parse_name()?];
                while self.accept(&TokenKind::Comma) {
                    excluded.push(self.parse_name()?);
                }
                self.end_statement()?;
                return Ok(TraitAdaptation::InsteadOf {
                    trait_name: first,
                    method,
                    excluded,
                    line,
                });
            }
            self.expect(TokenKind::As, "`insteadof` or `as`")?;
            let (alias, visibility) = self.parse_alias_tail()?;
            self.end_statement()?;
            return Ok(TraitAdaptation::Alias {
                trait_name: Some(first),
                method,
                alias,
                visibility,
                line,
            });
        }
        // `m as protected;` / `m as n;` without a trait qualifier
        let method = if first.is_simple() {
            first.joined()
        } else {
            return Err(self.error("expected `::` in trait adaptation"));
        };
        self.expect(TokenKind::As, "`as`")?;
        let (alias, visibility) = self.parse_alias_tail()?;
        self.end_statement()?;
        Ok(TraitAdaptation::Alias {
            trait_name: None,
            method,
            alias,
            visibility,
            line,
        })
    }

    fn parse_alias_tail(&mut self) -> Result<(Option<String>, Option<Visibility>), ParseError> {
        let visibility = match self.kind() {
            TokenKind::Public => {
                self.bump();
                Some(Visibility::Public)
            }
            TokenKind::Protected => {
                self.bump();
                Some(Visibility::Protected)
            }
            TokenKind::Private => {
                self.bump();
                Some(Visibility::Private)
            }
            _ => None,
        };
        let alias = if matches!(self.kind(), TokenKind::Ident(_)) {
            Some(self.parse_ident("alias")?)
        } else {
            None
        };
        Ok((alias, visibility))
    }

    fn parse_function_decl(
        &mut self,
        modifiers: MemberModifiers,
    ) -> Result<FunctionDecl, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Function, "`function`")?;
        let by_ref = self.accept(&TokenKind::Amp);
        let name = self.parse_member_ident("function name")?;
        let params = self.parse_params()?;
        let return_type = if self.accept(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let (body, has_yield) = if self.check(&TokenKind::OpenBrace) {
            self.yield_stack.push(false);
            let body = self.parse_block()?;
            let has_yield = self.yield_stack.pop().unwrap_or(false);
            (Some(body), has_yield)
        } else {
            self.end_statement()?;
            (None, false)
        };
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            by_ref,
            body,
            modifiers,
            has_yield,
            line,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::OpenParen, "`(`")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::CloseParen) {
            let line = self.line();
            let mut promotion = None;
            let mut readonly = false;
            loop {
                match self.kind() {
                    TokenKind::Public => promotion = Some(Visibility::Public),
                    TokenKind::Protected => promotion = Some(Visibility::Protected),
                    TokenKind::Private => promotion = Some(Visibility::Private),
                    TokenKind::Readonly => readonly = true,
                    _ => break,
                }
                self.bump();
            }
            let hint = if matches!(
                self.kind(),
                TokenKind::Variable(_) | TokenKind::Amp | TokenKind::Ellipsis
            ) {
                None
            } else {
                Some(self.parse_type()?)
            };
            let by_ref = self.accept(&TokenKind::Amp);
            let variadic = self.accept(&TokenKind::Ellipsis);
            let name = match self.bump().kind {
                TokenKind::Variable(name) => name,
                other => {
                    return Err(self.error(format!(
                        "expected parameter name, found {}",
                        describe(&other)
                    )))
                }
            };
            let default = if self.accept(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name,
                hint,
                by_ref,
                variadic,
                default,
                promotion,
                readonly,
                line,
            });
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen, "`)`")?;
        Ok(params)
    }

    // =====================================================================
    // Types
    // =====================================================================

    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let first = self.parse_type_intersection()?;
        if !self.check(&TokenKind::Pipe) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.accept(&TokenKind::Pipe) {
            parts.push(self.parse_type_intersection()?);
        }
        Ok(TypeExpr::Union(parts))
    }

    fn parse_type_intersection(&mut self) -> Result<TypeExpr, ParseError> {
        let first = self.parse_type_atomic()?;
        // `&` is an intersection only when a type name follows; otherwise it
        // is the by-ref marker of the parameter being declared.
        if !self.type_follows_amp() {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.type_follows_amp() {
            self.bump();
            parts.push(self.parse_type_atomic()?);
        }
        Ok(TypeExpr::Intersection(parts))
    }

    fn type_follows_amp(&self) -> bool {
        self.check(&TokenKind::Amp)
            && matches!(
                self.peek_kind(1),
                TokenKind::Ident(_) | TokenKind::Backslash | TokenKind::Static
            )
    }

    fn parse_type_atomic(&mut self) -> Result<TypeExpr, ParseError> {
        if self.accept(&TokenKind::Question) {
            let inner = self.parse_type_atomic()?;
            return Ok(TypeExpr::Nullable(Box::new(inner)));
        }
        if self.accept(&TokenKind::OpenParen) {
            // DNF segment: `(A&B)` inside a union.
            let inner = self.parse_type_intersection()?;
            self.expect(TokenKind::CloseParen, "`)`")?;
            return Ok(inner);
        }
        if self.check(&TokenKind::Static) {
            let line = self.line();
            self.bump();
            return Ok(TypeExpr::Name(Name::simple("static", line)));
        }
        let name = self.parse_name()?;
        Ok(TypeExpr::Name(name))
    }

    // =====================================================================
    // Names
    // =====================================================================

    fn parse_name(&mut self) -> Result<Name, ParseError> {
        let line = self.line();
        let fully_qualified = self.accept(&TokenKind::Backslash);
        let mut parts = vec![self.parse_ident("name")?];
        while self.check(&TokenKind::Backslash) {
            if !matches!(self.peek_kind(1), TokenKind::Ident(_)) {
                break;
            }
            self.bump();
            parts.push(self.parse_ident("name")?);
        }
        Ok(Name {
            parts,
            fully_qualified,
            line,
        })
    }

    fn parse_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.bump().kind {
            TokenKind::Ident(text) => Ok(text),
            other => Err(self.error(format!("expected {what}, found {}", describe(&other)))),
        }
    }

    /// Identifier where PHP also allows keywords (method and constant names).
    fn parse_member_ident(&mut self, what: &str) -> Result<String, ParseError> {
        if let Some(text) = self.kind().keyword_text() {
            let text = text.to_string();
            self.bump();
            return Ok(text);
        }
        self.parse_ident(what)
    }

    // =====================================================================
    // Expressions
    // =====================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let line = self.line();
            // Assignment family (right-associative, lowest of the symbol ops)
            if min_bp <= 20 {
                if self.check(&TokenKind::Assign) {
                    self.bump();
                    let by_ref = self.accept(&TokenKind::Amp);
                    let value = self.parse_expr_bp(20)?;
                    lhs = Expr::Assign {
                        target: Box::new(lhs),
                        value: Box::new(value),
                        by_ref,
                        line,
                    };
                    continue;
                }
                if let Some(op) = assign_op(self.kind()) {
                    self.bump();
                    let value = self.parse_expr_bp(20)?;
                    lhs = Expr::AssignOp {
                        target: Box::new(lhs),
                        op,
                        value: Box::new(value),
                        line,
                    };
                    continue;
                }
            }
            // Ternary
            if min_bp <= 34 && self.check(&TokenKind::Question) {
                self.bump();
                let then = if self.check(&TokenKind::Colon) {
                    None
                } else {
                    Some(Box::new(self.parse_expr_bp(0)?))
                };
                self.expect(TokenKind::Colon, "`:`")?;
                let else_ = self.parse_expr_bp(34)?;
                lhs = Expr::Ternary {
                    cond: Box::new(lhs),
                    then,
                    else_: Box::new(else_),
                    line,
                };
                continue;
            }
            // instanceof
            if min_bp <= 82 && self.check(&TokenKind::Instanceof) {
                self.bump();
                let class = self.parse_class_ref()?;
                lhs = Expr::Instanceof {
                    expr: Box::new(lhs),
                    class,
                    line,
                };
                continue;
            }
            if let Some((lbp, right_assoc, op)) = binary_op(self.kind()) {
                if lbp < min_bp {
                    break;
                }
                self.bump();
                let rhs = self.parse_expr_bp(if right_assoc { lbp } else { lbp + 1 })?;
                lhs = Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    line,
                };
                continue;
            }
            break;
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.kind().clone() {
            TokenKind::Bang => {
                self.bump();
                // `!` binds looser than `instanceof`: `!$x instanceof Y`
                // negates the whole instanceof test.
                let expr = self.parse_expr_bp(82)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Minus => {
                self.bump();
                let expr = self.parse_expr_bp(84)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Plus => {
                self.bump();
                let expr = self.parse_expr_bp(84)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Plus,
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Tilde => {
                self.bump();
                let expr = self.parse_expr_bp(84)?;
                Ok(Expr::Unary {
                    op: UnaryOp::BitNot,
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Inc => {
                self.bump();
                let expr = self.parse_expr_bp(84)?;
                Ok(Expr::Unary {
                    op: UnaryOp::PreInc,
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Dec => {
                self.bump();
                let expr = self.parse_expr_bp(84)?;
                Ok(Expr::Unary {
                    op: UnaryOp::PreDec,
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::At => {
                self.bump();
                let expr = self.parse_expr_bp(84)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Suppress,
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Print => {
                self.bump();
                let expr = self.parse_expr_bp(9)?;
                Ok(Expr::Print {
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Throw => {
                self.bump();
                let expr = self.parse_expr_bp(9)?;
                Ok(Expr::Throw {
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Clone => {
                self.bump();
                let expr = self.parse_expr_bp(84)?;
                Ok(Expr::Clone {
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Yield => {
                self.bump();
                self.mark_yield();
                // `yield from expr` / `yield` / `yield v` / `yield k => v`
                if let TokenKind::Ident(text) = self.kind() {
                    if text.eq_ignore_ascii_case("from") {
                        self.bump();
                        let value = self.parse_expr_bp(9)?;
                        return Ok(Expr::Yield {
                            value: Some(Box::new(value)),
                            line,
                        });
                    }
                }
                if matches!(
                    self.kind(),
                    TokenKind::Semicolon | TokenKind::CloseParen | TokenKind::Eof
                ) {
                    return Ok(Expr::Yield { value: None, line });
                }
                let first = self.parse_expr_bp(9)?;
                if self.accept(&TokenKind::DoubleArrow) {
                    let value = self.parse_expr_bp(9)?;
                    return Ok(Expr::Yield {
                        value: Some(Box::new(value)),
                        line,
                    });
                }
                Ok(Expr::Yield {
                    value: Some(Box::new(first)),
                    line,
                })
            }
            TokenKind::New => {
                self.bump();
                let class = self.parse_class_ref()?;
                let args = if self.check(&TokenKind::OpenParen) {
                    let (args, first_class) = self.parse_args()?;
                    if first_class {
                        return Err(self.error("`...` is not valid in `new`"));
                    }
                    args
                } else {
                    Vec::new()
                };
                let new = Expr::New { class, args, line };
                self.parse_postfix(new)
            }
            TokenKind::Exit => {
                self.bump();
                let value = if self.accept(&TokenKind::OpenParen) {
                    let value = if self.check(&TokenKind::CloseParen) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    self.expect(TokenKind::CloseParen, "`)`")?;
                    value
                } else {
                    None
                };
                Ok(Expr::Exit { value, line })
            }
            TokenKind::Include => self.parse_include(IncludeKind::Include),
            TokenKind::IncludeOnce => self.parse_include(IncludeKind::IncludeOnce),
            TokenKind::Require => self.parse_include(IncludeKind::Require),
            TokenKind::RequireOnce => self.parse_include(IncludeKind::RequireOnce),
            TokenKind::OpenParen => {
                // Cast or grouped expression.
                if let Some(kind) = self.peek_cast() {
                    self.bump();
                    self.bump();
                    self.bump();
                    let expr = self.parse_expr_bp(84)?;
                    return Ok(Expr::Cast {
                        to: kind,
                        expr: Box::new(expr),
                        line,
                    });
                }
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::CloseParen, "`)`")?;
                self.parse_postfix(inner)
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_include(&mut self, kind: IncludeKind) -> Result<Expr, ParseError> {
        let line = self.line();
        self.bump();
        let path = self.parse_expr_bp(9)?;
        Ok(Expr::Include {
            kind,
            path: Box::new(path),
            line,
        })
    }

    fn peek_cast(&self) -> Option<CastKind> {
        if let TokenKind::Ident(text) = self.peek_kind(1) {
            if self.peek_kind(2) == &TokenKind::CloseParen {
                let lower = text.to_ascii_lowercase();
                return CAST_NAMES
                    .iter()
                    .find(|(name, _)| *name == lower)
                    .map(|(_, kind)| *kind);
            }
        }
        None
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.kind().clone() {
            TokenKind::IntLit(value) => {
                self.bump();
                Ok(Expr::Int { value, line })
            }
            TokenKind::FloatLit(value) => {
                self.bump();
                Ok(Expr::Float { value, line })
            }
            TokenKind::StrLit(value) => {
                self.bump();
                Ok(Expr::Str { value, line })
            }
            TokenKind::Variable(name) => {
                self.bump();
                Ok(Expr::Var { name, line })
            }
            TokenKind::Dollar => {
                self.bump();
                let inner = if self.accept(&TokenKind::OpenBrace) {
                    let expr = self.parse_expr()?;
                    self.expect(TokenKind::CloseBrace, "`}`")?;
                    expr
                } else {
                    self.parse_primary()?
                };
                Ok(Expr::VarVar {
                    expr: Box::new(inner),
                    line,
                })
            }
            TokenKind::OpenBracket => {
                let items = self.parse_array_items(TokenKind::CloseBracket)?;
                Ok(Expr::ArrayLit { items, line })
            }
            TokenKind::List => {
                self.bump();
                self.expect(TokenKind::OpenParen, "`(` after `list`")?;
                let mut items = Vec::new();
                while !self.check(&TokenKind::CloseParen) {
                    if self.accept(&TokenKind::Comma) {
                        items.push(None);
                        continue;
                    }
                    items.push(Some(self.parse_array_item()?));
                    if !self.accept(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseParen, "`)`")?;
                Ok(Expr::List { items, line })
            }
            TokenKind::Isset => {
                self.bump();
                self.expect(TokenKind::OpenParen, "`(` after `isset`")?;
                let mut vars = vec![self.parse_expr()?];
                while self.accept(&TokenKind::Comma) {
                    if self.check(&TokenKind::CloseParen) {
                        break;
                    }
                    vars.push(self.parse_expr()?);
                }
                self.expect(TokenKind::CloseParen, "`)`")?;
                Ok(Expr::Isset { vars, line })
            }
            TokenKind::Empty => {
                self.bump();
                self.expect(TokenKind::OpenParen, "`(` after `empty`")?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::CloseParen, "`)`")?;
                Ok(Expr::EmptyCheck {
                    expr: Box::new(expr),
                    line,
                })
            }
            TokenKind::Function => self.parse_closure(false),
            TokenKind::Fn => self.parse_arrow_fn(false),
            TokenKind::Static => match self.peek_kind(1) {
                TokenKind::Function => {
                    self.bump();
                    self.parse_closure(true)
                }
                TokenKind::Fn => {
                    self.bump();
                    self.parse_arrow_fn(true)
                }
                _ => {
                    self.bump();
                    Ok(Expr::ConstFetch {
                        name: Name::simple("static", line),
                        line,
                    })
                }
            },
            TokenKind::MagicFile => {
                self.bump();
                Ok(Expr::MagicConst {
                    kind: MagicConst::File,
                    line,
                })
            }
            TokenKind::MagicDir => {
                self.bump();
                Ok(Expr::MagicConst {
                    kind: MagicConst::Dir,
                    line,
                })
            }
            TokenKind::MagicLine => {
                self.bump();
                Ok(Expr::MagicConst {
                    kind: MagicConst::Line,
                    line,
                })
            }
            TokenKind::MagicClass => {
                self.bump();
                Ok(Expr::MagicConst {
                    kind: MagicConst::Class,
                    line,
                })
            }
            TokenKind::MagicFunction => {
                self.bump();
                Ok(Expr::MagicConst {
                    kind: MagicConst::Function,
                    line,
                })
            }
            TokenKind::MagicMethod => {
                self.bump();
                Ok(Expr::MagicConst {
                    kind: MagicConst::Method,
                    line,
                })
            }
            TokenKind::MagicNamespace => {
                self.bump();
                Ok(Expr::MagicConst {
                    kind: MagicConst::Namespace,
                    line,
                })
            }
            TokenKind::Ident(ref text) => {
                // Legacy `array(…)` literal.
                if text.eq_ignore_ascii_case("array") && self.peek_kind(1) == &TokenKind::OpenParen
                {
                    self.bump();
                    self.bump();
                    let mut items = Vec::new();
                    while !self.check(&TokenKind::CloseParen) {
                        items.push(self.parse_array_item()?);
                        if !self.accept(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::CloseParen, "`)`")?;
                    return Ok(Expr::ArrayLit { items, line });
                }
                let name = self.parse_name()?;
                Ok(Expr::ConstFetch { name, line })
            }
            TokenKind::Backslash => {
                let name = self.parse_name()?;
                Ok(Expr::ConstFetch { name, line })
            }
            TokenKind::AttributeStart => Err(self.error("attributes are not supported")),
            other => Err(self.error(format!(
                "unexpected token {} in expression",
                describe(&other)
            ))),
        }
    }

    fn parse_array_items(&mut self, closer: TokenKind) -> Result<Vec<ArrayItem>, ParseError> {
        self.bump();
        let mut items = Vec::new();
        while !self.check(&closer) {
            items.push(self.parse_array_item()?);
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(closer, "array closer")?;
        Ok(items)
    }

    fn parse_array_item(&mut self) -> Result<ArrayItem, ParseError> {
        let line = self.line();
        if self.accept(&TokenKind::Ellipsis) {
            let value = self.parse_expr()?;
            return Ok(ArrayItem {
                key: None,
                value,
                by_ref: false,
                spread: true,
                line,
            });
        }
        let by_ref = self.accept(&TokenKind::Amp);
        let first = self.parse_expr()?;
        if !by_ref && self.accept(&TokenKind::DoubleArrow) {
            let by_ref = self.accept(&TokenKind::Amp);
            let value = self.parse_expr()?;
            return Ok(ArrayItem {
                key: Some(first),
                value,
                by_ref,
                spread: false,
                line,
            });
        }
        Ok(ArrayItem {
            key: None,
            value: first,
            by_ref,
            spread: false,
            line,
        })
    }

    fn parse_closure(&mut self, is_static: bool) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Function, "`function`")?;
        let by_ref = self.accept(&TokenKind::Amp);
        let params = self.parse_params()?;
        let mut uses = Vec::new();
        if self.accept(&TokenKind::Use) {
            self.expect(TokenKind::OpenParen, "`(` after `use`")?;
            while !self.check(&TokenKind::CloseParen) {
                let use_line = self.line();
                let by_ref = self.accept(&TokenKind::Amp);
                let name = match self.bump().kind {
                    TokenKind::Variable(name) => name,
                    other => {
                        return Err(self.error(format!(
                            "expected variable in closure `use`, found {}",
                            describe(&other)
                        )))
                    }
                };
                uses.push(ClosureUse {
                    name,
                    by_ref,
                    line: use_line,
                });
                if !self.accept(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::CloseParen, "`)`")?;
        }
        let return_type = if self.accept(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.yield_stack.push(false);
        let body = self.parse_block()?;
        let has_yield = self.yield_stack.pop().unwrap_or(false);
        Ok(Expr::Closure(std::rc::Rc::new(ClosureExpr {
            params,
            uses,
            return_type,
            by_ref,
            is_static,
            body,
            has_yield,
            line,
        })))
    }

    fn parse_arrow_fn(&mut self, is_static: bool) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Fn, "`fn`")?;
        self.accept(&TokenKind::Amp);
        let params = self.parse_params()?;
        let return_type = if self.accept(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::DoubleArrow, "`=>`")?;
        let body = self.parse_expr_bp(20)?;
        Ok(Expr::ArrowFn(std::rc::Rc::new(ArrowFnExpr {
            params,
            return_type,
            is_static,
            body,
            line,
        })))
    }

    fn parse_class_ref(&mut self) -> Result<ClassRef, ParseError> {
        match self.kind() {
            TokenKind::Ident(_) | TokenKind::Backslash => Ok(ClassRef::Name(self.parse_name()?)),
            TokenKind::Static => {
                let line = self.line();
                self.bump();
                Ok(ClassRef::Name(Name::simple("static", line)))
            }
            TokenKind::Variable(_) | TokenKind::Dollar | TokenKind::OpenParen => {
                let expr = self.parse_prefix()?;
                Ok(ClassRef::Expr(Box::new(expr)))
            }
            other => Err(self.error(format!(
                "expected class reference, found {}",
                describe(other)
            ))),
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            let line = self.line();
            match self.kind() {
                TokenKind::OpenParen => {
                    let (args, first_class) = self.parse_args()?;
                    expr = match expr {
                        Expr::ConstFetch { name, .. } => Expr::Call {
                            callee: Callee::Name(name),
                            args,
                            first_class,
                            line,
                        },
                        other => Expr::Call {
                            callee: Callee::Expr(Box::new(other)),
                            args,
                            first_class,
                            line,
                        },
                    };
                }
                TokenKind::OpenBracket => {
                    self.bump();
                    let index = if self.check(&TokenKind::CloseBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    self.expect(TokenKind::CloseBracket, "`]`")?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index,
                        line,
                    };
                }
                TokenKind::Arrow | TokenKind::NullsafeArrow => {
                    let nullsafe = self.kind() == &TokenKind::NullsafeArrow;
                    self.bump();
                    let name = self.parse_member_name()?;
                    if self.check(&TokenKind::OpenParen) {
                        let (args, first_class) = self.parse_args()?;
                        expr = Expr::MethodCall {
                            object: Box::new(expr),
                            name,
                            args,
                            nullsafe,
                            first_class,
                            line,
                        };
                    } else {
                        expr = Expr::Prop {
                            object: Box::new(expr),
                            name,
                            nullsafe,
                            line,
                        };
                    }
                }
                TokenKind::DoubleColon => {
                    self.bump();
                    let class = match expr {
                        Expr::ConstFetch { name, .. } => ClassRef::Name(name),
                        other => ClassRef::Expr(Box::new(other)),
                    };
                    match self.kind().clone() {
                        TokenKind::Variable(prop_name) => {
                            let prop_line = self.line();
                            self.bump();
                            expr = Expr::StaticProp {
                                class,
                                prop: Box::new(Expr::Var {
                                    name: prop_name,
                                    line: prop_line,
                                }),
                                line,
                            };
                        }
                        TokenKind::Class => {
                            self.bump();
                            expr = Expr::ClassConst {
                                class,
                                constant: "class".to_string(),
                                line,
                            };
                        }
                        TokenKind::OpenBrace => {
                            self.bump();
                            let inner = self.parse_expr()?;
                            self.expect(TokenKind::CloseBrace, "`}`")?;
                            let name = MemberName::Expr(Box::new(inner));
                            if self.check(&TokenKind::OpenParen) {
                                let (args, first_class) = self.parse_args()?;
                                expr = Expr::StaticCall {
                                    class,
                                    name,
                                    args,
                                    first_class,
                                    line,
                                };
                            } else {
                                return Err(
                                    self.error("expected `(` after dynamic static member name")
                                );
                            }
                        }
                        _ => {
                            let member = self.parse_member_ident("member name")?;
                            if self.check(&TokenKind::OpenParen) {
                                let (args, first_class) = self.parse_args()?;
                                expr = Expr::StaticCall {
                                    class,
                                    name: MemberName::Name(member),
                                    args,
                                    first_class,
                                    line,
                                };
                            } else {
                                expr = Expr::ClassConst {
                                    class,
                                    constant: member,
                                    line,
                                };
                            }
                        }
                    }
                }
                TokenKind::Inc => {
                    self.bump();
                    expr = Expr::Unary {
                        op: UnaryOp::PostInc,
                        expr: Box::new(expr),
                        line,
                    };
                }
                TokenKind::Dec => {
                    self.bump();
                    expr = Expr::Unary {
                        op: UnaryOp::PostDec,
                        expr: Box::new(expr),
                        line,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_member_name(&mut self) -> Result<MemberName, ParseError> {
        match self.kind().clone() {
            TokenKind::Variable(name) => {
                let line = self.line();
                self.bump();
                Ok(MemberName::Expr(Box::new(Expr::Var { name, line })))
            }
            TokenKind::OpenBrace => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::CloseBrace, "`}`")?;
                Ok(MemberName::Expr(Box::new(inner)))
            }
            _ => Ok(MemberName::Name(self.parse_member_ident("member name")?)),
        }
    }

    /// Parse an argument list. Returns the args and whether this was the
    /// first-class callable form `f(...)`.
    fn parse_args(&mut self) -> Result<(Vec<Arg>, bool), ParseError> {
        self.expect(TokenKind::OpenParen, "`(`")?;
        if self.check(&TokenKind::Ellipsis) && self.peek_kind(1) == &TokenKind::CloseParen {
            self.bump();
            self.bump();
            return Ok((Vec::new(), true));
        }
        let mut args = Vec::new();
        while !self.check(&TokenKind::CloseParen) {
            let line = self.line();
            if self.accept(&TokenKind::Ellipsis) {
                let value = self.parse_expr()?;
                args.push(Arg {
                    name: None,
                    value,
                    spread: true,
                    line,
                });
            } else {
                // Named argument: `label:` where `:` is not `::`.
                let label = if self.peek_kind(1) == &TokenKind::Colon {
                    match self.kind() {
                        TokenKind::Ident(text) => Some(text.clone()),
                        other => other.keyword_text().map(str::to_string),
                    }
                } else {
                    None
                };
                let name = if label.is_some() {
                    self.bump();
                    self.bump();
                    label
                } else {
                    None
                };
                let value = self.parse_expr()?;
                args.push(Arg {
                    name,
                    value,
                    spread: false,
                    line,
                });
            }
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen, "`)`")?;
        Ok((args, false))
    }
}

fn assign_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PlusAssign => BinaryOp::Add,
        TokenKind::MinusAssign => BinaryOp::Sub,
        TokenKind::MulAssign => BinaryOp::Mul,
        TokenKind::DivAssign => BinaryOp::Div,
        TokenKind::ModAssign => BinaryOp::Mod,
        TokenKind::PowAssign => BinaryOp::Pow,
        TokenKind::ConcatAssign => BinaryOp::Concat,
        TokenKind::AndAssign => BinaryOp::BitAnd,
        TokenKind::OrAssign => BinaryOp::BitOr,
        TokenKind::XorAssign => BinaryOp::BitXor,
        TokenKind::ShlAssign => BinaryOp::Shl,
        TokenKind::ShrAssign => BinaryOp::Shr,
        TokenKind::CoalesceAssign => BinaryOp::Coalesce,
        _ => return None,
    })
}

/// `(left binding power, right associative, op)`
fn binary_op(kind: &TokenKind) -> Option<(u8, bool, BinaryOp)> {
    Some(match kind {
        TokenKind::Pow => (90, true, BinaryOp::Pow),
        TokenKind::Star => (78, false, BinaryOp::Mul),
        TokenKind::Slash => (78, false, BinaryOp::Div),
        TokenKind::Percent => (78, false, BinaryOp::Mod),
        TokenKind::Plus => (74, false, BinaryOp::Add),
        TokenKind::Minus => (74, false, BinaryOp::Sub),
        TokenKind::Shl => (70, false, BinaryOp::Shl),
        TokenKind::Shr => (70, false, BinaryOp::Shr),
        TokenKind::Dot => (66, false, BinaryOp::Concat),
        TokenKind::Less => (62, false, BinaryOp::Less),
        TokenKind::LessEq => (62, false, BinaryOp::LessEqual),
        TokenKind::Greater => (62, false, BinaryOp::Greater),
        TokenKind::GreaterEq => (62, false, BinaryOp::GreaterEqual),
        TokenKind::EqEq => (58, false, BinaryOp::Equal),
        TokenKind::NotEq => (58, false, BinaryOp::NotEqual),
        TokenKind::EqEqEq => (58, false, BinaryOp::Identical),
        TokenKind::NotEqEq => (58, false, BinaryOp::NotIdentical),
        TokenKind::Spaceship => (58, false, BinaryOp::Spaceship),
        TokenKind::Amp => (54, false, BinaryOp::BitAnd),
        TokenKind::Caret => (52, false, BinaryOp::BitXor),
        TokenKind::Pipe => (50, false, BinaryOp::BitOr),
        TokenKind::AmpAmp => (46, false, BinaryOp::BoolAnd),
        TokenKind::PipePipe => (44, false, BinaryOp::BoolOr),
        TokenKind::Coalesce => (40, true, BinaryOp::Coalesce),
        TokenKind::LogicalAnd => (12, false, BinaryOp::BoolAnd),
        TokenKind::LogicalXor => (11, false, BinaryOp::LogicalXor),
        TokenKind::LogicalOr => (10, false, BinaryOp::BoolOr),
        _ => return None,
    })
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::IntLit(value) => format!("`{value}`"),
        TokenKind::FloatLit(value) => format!("`{value}`"),
        TokenKind::StrLit(_) => "string literal".to_string(),
        TokenKind::Variable(name) => format!("`${name}`"),
        TokenKind::Ident(name) => format!("`{name}`"),
        TokenKind::Eof => "end of file".to_string(),
        other => {
            if let Some(text) = other.keyword_text() {
                format!("`{text}`")
            } else {
                format!("{other:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Stmt> {
        parse_file(source).expect("parse failed")
    }

    #[test]
    fn simple_assignment() {
        let stmts = parse("<?php $x = 1;");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Expr(Expr::Assign { target, value, .. }) => {
                assert!(matches!(**target, Expr::Var { ref name, .. } if name == "x"));
                assert!(matches!(**value, Expr::Int { value: 1, .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn precedence_mul_over_add() {
        let stmts = parse("<?php $x = 1 + 2 * 3;");
        match &stmts[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => match &**value {
                Expr::Binary {
                    op: BinaryOp::Add,
                    rhs,
                    ..
                } => {
                    assert!(matches!(
                        **rhs,
                        Expr::Binary {
                            op: BinaryOp::Mul,
                            ..
                        }
                    ));
                }
                other => panic!("unexpected expression: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn function_with_params_and_return_type() {
        let stmts = parse("<?php function f(int $a, string ...$rest): ?int { return $a; }");
        match &stmts[0] {
            Stmt::Function(func) => {
                assert_eq!(func.name, "f");
                assert_eq!(func.params.len(), 2);
                assert!(func.params[1].variadic);
                assert!(matches!(func.return_type, Some(TypeExpr::Nullable(_))));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn class_with_members() {
        let stmts = parse(
            "<?php class C extends B implements I, J {\n\
             public const FOO = 1;\n\
             private ?int $x = null;\n\
             public function m(self $other): static { return $this; }\n\
             }",
        );
        match &stmts[0] {
            Stmt::Class(class) => {
                assert_eq!(class.name, "C");
                assert_eq!(class.extends.len(), 1);
                assert_eq!(class.implements.len(), 2);
                assert_eq!(class.members.len(), 3);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn enum_with_backing() {
        let stmts = parse("<?php enum Suit: string { case Hearts = 'H'; case Spades = 'S'; }");
        match &stmts[0] {
            Stmt::Class(class) => {
                assert_eq!(class.kind, ClassKind::Enum);
                assert!(class.enum_backing.is_some());
                assert_eq!(class.members.len(), 2);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn closure_with_use() {
        let stmts = parse("<?php $f = function ($a) use (&$b, $c): int { return $a; };");
        match &stmts[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => match &**value {
                Expr::Closure(closure) => {
                    assert_eq!(closure.uses.len(), 2);
                    assert!(closure.uses[0].by_ref);
                    assert!(!closure.uses[1].by_ref);
                }
                other => panic!("unexpected expression: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn static_call_and_class_const() {
        let stmts = parse("<?php Foo::bar(); Foo::BAZ; Foo::class; self::$prop;");
        assert_eq!(stmts.len(), 4);
        assert!(matches!(
            &stmts[0],
            Stmt::Expr(Expr::StaticCall { .. })
        ));
        assert!(matches!(&stmts[1], Stmt::Expr(Expr::ClassConst { .. })));
        assert!(matches!(
            &stmts[2],
            Stmt::Expr(Expr::ClassConst { ref constant, .. }) if constant == "class"
        ));
        assert!(matches!(&stmts[3], Stmt::Expr(Expr::StaticProp { .. })));
    }

    #[test]
    fn foreach_with_key_and_ref() {
        let stmts = parse("<?php foreach ($xs as $k => &$v) { $v = 1; }");
        match &stmts[0] {
            Stmt::Foreach(stmt) => {
                assert!(stmt.key.is_some());
                assert!(stmt.by_ref);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn yield_marks_generator() {
        let stmts = parse("<?php function gen() { yield 1; }");
        match &stmts[0] {
            Stmt::Function(func) => assert!(func.has_yield),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn intersection_type_vs_by_ref_param() {
        let stmts = parse("<?php function f(A&B $x, C &$y) {}");
        match &stmts[0] {
            Stmt::Function(func) => {
                assert!(matches!(
                    func.params[0].hint,
                    Some(TypeExpr::Intersection(_))
                ));
                assert!(!func.params[0].by_ref);
                assert!(matches!(func.params[1].hint, Some(TypeExpr::Name(_))));
                assert!(func.params[1].by_ref);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn first_class_callable() {
        let stmts = parse("<?php $f = strlen(...);");
        match &stmts[0] {
            Stmt::Expr(Expr::Assign { value, .. }) => {
                assert!(matches!(
                    **value,
                    Expr::Call {
                        first_class: true,
                        ..
                    }
                ));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn named_arguments() {
        let stmts = parse("<?php f(a: 1, b: 2);");
        match &stmts[0] {
            Stmt::Expr(Expr::Call { args, .. }) => {
                assert_eq!(args[0].name.as_deref(), Some("a"));
                assert_eq!(args[1].name.as_deref(), Some("b"));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parse_error_carries_line() {
        let err = parse_file("<?php\n$x = ;\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn group_use() {
        let stmts = parse("<?php use Foo\\Bar\\{Baz, Qux as Q};");
        match &stmts[0] {
            Stmt::Use { items, .. } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].name.joined(), "Foo\\Bar\\Baz");
                assert_eq!(items[1].alias.as_deref(), Some("Q"));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn trait_use_with_insteadof() {
        let stmts = parse(
            "<?php class C { use A, B { A::m insteadof B; B::n as private o; } }",
        );
        match &stmts[0] {
            Stmt::Class(class) => match &class.members[0] {
                ClassMember::UseTrait(use_trait) => {
                    assert_eq!(use_trait.traits.len(), 2);
                    assert_eq!(use_trait.adaptations.len(), 2);
                }
                other => panic!("unexpected member: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }
}
