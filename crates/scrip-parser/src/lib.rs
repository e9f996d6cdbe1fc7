//! scrip-parser - parseur du langage Scrip
//!
//! Branches :
//! - `scrip-lexer` pour la tokenisation et la `LineMap`
//! - `scrip-core` pour `Span`/`Location`
//! - `scrip-ast` pour l’AST cible
//!
//! Grammaire (essentiel):
//! ```text
//! source_file    := pragma* contract EOF
//! pragma         := "pragma" token* ";"
//! contract       := "contract" ident "(" params? ")" "{" function* "}"
//! function       := "function" ident "(" params? ")" block
//! params         := type ident ("," type ident)*
//!
//! block          := "{" stmt* "}"
//! branch         := block | stmt
//! stmt           := type ident "=" expr ";"
//!                 | type ident "," type ident "=" expr ";"
//!                 | ident "=" expr ";"
//!                 | "require" "(" expr ("," STRING)? ")" ";"
//!                 | "if" "(" expr ")" branch ("else" branch)?
//!
//! expr           := pratt_expression (|| && | ^ & == != < <= > >= + - * / %)
//! unary          := ("!" | "-") unary | postfix
//! postfix        := primary ("." ident args? | "[" expr "]")*
//! primary        := ident args? | INT unit? | STRING | HEX | "true" | "false"
//!                 | "(" expr ")" | "[" expr ("," expr)* "]"
//! ```
//!
//! `require(tx.time >= e)` et `require(tx.age >= e)` produisent
//! directement un `StmtKind::TimeOp`.

#![deny(missing_docs)]

use scrip_ast as ast;
use scrip_ast::{BinaryOp, Expr, ExprKind, Literal, Stmt, StmtKind, TimeOpKind, TypeName, UnaryOp};
use scrip_core::{Location, SourceId, Span};
use scrip_lexer::{Keyword, LexError, Lexer, LineMap, Token, TokenKind};

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreur de parsing localisée.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({location})")]
pub struct ParseError {
    /// Localisation.
    pub location: Location,
    /// Message humain.
    pub message: String,
}

/// Résultat du parseur.
pub type PResult<T> = Result<T, ParseError>;

/// Parse un fichier source complet.
pub fn parse_code(src: &str) -> PResult<ast::SourceFile> {
    Parser::new(src, SourceId(0))?.parse_source_file()
}

/* ─────────────────────────── Parser ─────────────────────────── */

/// Parser Scrip (descente récursive + Pratt pour les expressions).
pub struct Parser<'a> {
    /// Jetons, toujours terminés par `Eof`.
    toks: Vec<Token<'a>>,
    /// Index du jeton courant (jamais au-delà de `Eof`).
    idx: usize,
    /// Span du dernier jeton consommé.
    last_span: Span,
    /// Table des lignes pour fabriquer les `Location`.
    lines: LineMap,
}

impl<'a> Parser<'a> {
    /// Tokenise `src` et prépare le parseur.
    pub fn new(src: &'a str, source: SourceId) -> PResult<Self> {
        let lexer = Lexer::new(src, source);
        let lines = lexer.lines.clone();
        let toks = lexer.tokenize().map_err(|e| lex_error(&lines, &e))?;
        let last_span = Span::new(source, scrip_core::Pos::ZERO, scrip_core::Pos::ZERO);
        Ok(Self { toks, idx: 0, last_span, lines })
    }

    /// Parse `pragma* contract EOF`.
    pub fn parse_source_file(&mut self) -> PResult<ast::SourceFile> {
        while self.check(&TokenKind::Kw(Keyword::Pragma)) {
            self.skip_pragma()?;
        }
        let contract = self.parse_contract()?;
        if !self.check(&TokenKind::Eof) {
            return Err(self.err_here("fin de fichier attendue après le contrat"));
        }
        Ok(ast::SourceFile { contract })
    }

    /* ─────────── Contrat & fonctions ─────────── */

    fn skip_pragma(&mut self) -> PResult<()> {
        self.bump();
        while !self.check(&TokenKind::Semi) && !self.check(&TokenKind::Eof) {
            self.bump();
        }
        self.expect(&TokenKind::Semi, "`;`")?;
        Ok(())
    }

    fn parse_contract(&mut self) -> PResult<ast::Contract> {
        let k = self.expect(&TokenKind::Kw(Keyword::Contract), "`contract`")?;
        let (name, _) = self.expect_ident()?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::LBrace, "`{`")?;
        let mut functions = Vec::new();
        while self.check(&TokenKind::Kw(Keyword::Function)) {
            functions.push(self.parse_function()?);
        }
        let rb = self.expect(&TokenKind::RBrace, "`function` ou `}`")?;
        Ok(ast::Contract { name: name.to_string(), params, functions, location: self.loc(k, rb) })
    }

    fn parse_function(&mut self) -> PResult<ast::Function> {
        let k = self.bump().span;
        let (name, _) = self.expect_ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(ast::Function { name: name.to_string(), params, body, location: self.loc(k, self.last_span) })
    }

    fn parse_params(&mut self) -> PResult<Vec<ast::Param>> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let start = self.span();
                let ty = self.parse_type()?;
                let (name, end) = self.expect_ident()?;
                params.push(ast::Param { ty, name: name.to_string(), location: self.loc(start, end) });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        Ok(params)
    }

    fn parse_type(&mut self) -> PResult<TypeName> {
        if let TokenKind::Ident(s) = self.peek() {
            if let Some(ty) = TypeName::from_name(s) {
                self.bump();
                return Ok(ty);
            }
        }
        Err(self.err_here("type attendu"))
    }

    /* ─────────── Blocs & Stmts ─────────── */

    fn parse_block(&mut self) -> PResult<ast::Block> {
        let lb = self.expect(&TokenKind::LBrace, "`{`")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        let rb = self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(ast::Block { stmts, location: self.loc(lb, rb) })
    }

    fn parse_branch(&mut self) -> PResult<ast::Block> {
        if self.check(&TokenKind::LBrace) {
            return self.parse_block();
        }
        let stmt = self.parse_stmt()?;
        let location = stmt.location;
        Ok(ast::Block { stmts: vec![stmt], location })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        if self.check(&TokenKind::Kw(Keyword::Require)) {
            return self.parse_require();
        }
        if self.check(&TokenKind::Kw(Keyword::If)) {
            return self.parse_if();
        }
        let starts_with_type = matches!(self.peek(), TokenKind::Ident(s) if TypeName::from_name(s).is_some());
        if starts_with_type {
            return self.parse_definition();
        }
        if matches!(self.peek(), TokenKind::Ident(_)) {
            return self.parse_assign();
        }
        Err(self.err_here("instruction attendue"))
    }

    fn parse_definition(&mut self) -> PResult<Stmt> {
        let start = self.span();
        let ty = self.parse_type()?;
        let (name, _) = self.expect_ident()?;
        if self.eat(&TokenKind::Comma) {
            let ty2 = self.parse_type()?;
            let (name2, _) = self.expect_ident()?;
            self.expect(&TokenKind::Eq, "`=`")?;
            let value = self.parse_expr()?;
            let semi = self.expect(&TokenKind::Semi, "`;`")?;
            let kind = StmtKind::TupleAssignment {
                left: (ty, name.to_string()),
                right: (ty2, name2.to_string()),
                value,
            };
            return Ok(Stmt::new(kind, self.loc(start, semi)));
        }
        self.expect(&TokenKind::Eq, "`=`")?;
        let value = self.parse_expr()?;
        let semi = self.expect(&TokenKind::Semi, "`;`")?;
        let kind = StmtKind::VariableDefinition { ty, name: name.to_string(), value };
        Ok(Stmt::new(kind, self.loc(start, semi)))
    }

    fn parse_assign(&mut self) -> PResult<Stmt> {
        let (name, start) = self.expect_ident()?;
        self.expect(&TokenKind::Eq, "`=`")?;
        let value = self.parse_expr()?;
        let semi = self.expect(&TokenKind::Semi, "`;`")?;
        Ok(Stmt::new(StmtKind::Assign { name: name.to_string(), value }, self.loc(start, semi)))
    }

    fn parse_require(&mut self) -> PResult<Stmt> {
        let k = self.bump().span;
        self.expect(&TokenKind::LParen, "`(`")?;
        let condition = self.parse_expr()?;
        let message = if self.eat(&TokenKind::Comma) {
            match self.peek().clone() {
                TokenKind::Str(s) => {
                    self.bump();
                    Some(s)
                }
                _ => return Err(self.err_here("message (chaîne) attendu")),
            }
        } else {
            None
        };
        self.expect(&TokenKind::RParen, "`)`")?;
        let semi = self.expect(&TokenKind::Semi, "`;`")?;
        let kind = match split_time_op(condition) {
            Ok((kind, value)) => StmtKind::TimeOp { kind, value, message },
            Err(condition) => StmtKind::Require { condition, message },
        };
        Ok(Stmt::new(kind, self.loc(k, semi)))
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let k = self.bump().span;
        self.expect(&TokenKind::LParen, "`(`")?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "`)`")?;
        let then_block = self.parse_branch()?;
        let else_block = if self.eat(&TokenKind::Kw(Keyword::Else)) { Some(self.parse_branch()?) } else { None };
        let kind = StmtKind::If { condition, then_block, else_block };
        Ok(Stmt::new(kind, self.loc(k, self.last_span)))
    }

    /* ─────────── Expressions (Pratt) ─────────── */

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_prec(0)
    }

    fn parse_prec(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = binary_op(self.peek()) {
            let (lbp, rbp) = precedence(op);
            if lbp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_prec(rbp)?;
            let location = join(lhs.location, rhs.location);
            lhs = Expr::new(ExprKind::Binary { op, left: Box::new(lhs), right: Box::new(rhs) }, location);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.span();
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.bump();
        // `-123` est un littéral, pas une négation
        if op == UnaryOp::Neg {
            if let TokenKind::Int(n) = *self.peek() {
                self.bump();
                let n = self.int_literal(n, true)?;
                return Ok(Expr::new(ExprKind::Literal(Literal::Int(n)), self.loc(start, self.last_span)));
            }
        }
        let e = self.parse_unary()?;
        let location = self.loc(start, self.last_span);
        Ok(Expr::new(ExprKind::Unary { op, expr: Box::new(e) }, location))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let start = self.span();
        let mut e = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let (name, _) = self.expect_ident()?;
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    let kind = ExprKind::MethodCall { receiver: Box::new(e), method: name.to_string(), args };
                    e = Expr::new(kind, self.loc(start, self.last_span));
                } else {
                    let kind = ExprKind::Member { object: Box::new(e), member: name.to_string() };
                    e = Expr::new(kind, self.loc(start, self.last_span));
                }
                continue;
            }
            if self.eat(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                let rb = self.expect(&TokenKind::RBracket, "`]`")?;
                e = Expr::new(ExprKind::Index { object: Box::new(e), index: Box::new(index) }, self.loc(start, rb));
                continue;
            }
            break;
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.span();
        let kind = match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                if self.check(&TokenKind::LParen) {
                    ExprKind::Call { name: name.to_string(), args: self.parse_args()? }
                } else {
                    ExprKind::Identifier(name.to_string())
                }
            }
            TokenKind::Int(n) => {
                self.bump();
                ExprKind::Literal(Literal::Int(self.int_literal(n, false)?))
            }
            TokenKind::Str(s) => {
                self.bump();
                ExprKind::Literal(Literal::Str(s))
            }
            TokenKind::Hex(bytes) => {
                self.bump();
                ExprKind::Literal(Literal::Hex(bytes))
            }
            TokenKind::Kw(Keyword::True) => {
                self.bump();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::Kw(Keyword::False) => {
                self.bump();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                let rp = self.expect(&TokenKind::RParen, "`)`")?;
                // la localisation couvre les parenthèses
                return Ok(Expr::new(inner.kind, self.loc(start, rp)));
            }
            TokenKind::LBracket => {
                self.bump();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket, "`]`")?;
                ExprKind::Array(items)
            }
            _ => return Err(self.err_here("expression attendue")),
        };
        Ok(Expr::new(kind, self.loc(start, self.last_span)))
    }

    fn parse_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        Ok(args)
    }

    /// Magnitude lexée + unité optionnelle (`10 minutes`, `1000 sats`) → i64 signé.
    ///
    /// Le signe est appliqué avant la conversion : `-9223372036854775808` est accepté.
    fn int_literal(&mut self, magnitude: u64, negative: bool) -> PResult<i64> {
        let literal = self.last_span;
        let mut n = magnitude;
        if let TokenKind::Ident(unit) = *self.peek() {
            if let Some(factor) = unit_factor(unit) {
                self.bump();
                n = n.checked_mul(factor).ok_or_else(|| self.err_at(self.last_span, "entier hors limites (i64)"))?;
            }
        }
        let signed = if negative { 0i64.checked_sub_unsigned(n) } else { i64::try_from(n).ok() };
        signed.ok_or_else(|| self.err_at(literal, "entier hors limites (i64)"))
    }

    /* ─────────── Utilitaires ─────────── */

    #[inline]
    fn peek(&self) -> &TokenKind<'a> { &self.toks[self.idx].value }

    #[inline]
    fn span(&self) -> Span { self.toks[self.idx].span }

    /// Consomme le jeton courant (reste sur `Eof`).
    fn bump(&mut self) -> Token<'a> {
        let tok = self.toks[self.idx].clone();
        self.last_span = tok.span;
        if !matches!(tok.value, TokenKind::Eof) {
            self.idx += 1;
        }
        tok
    }

    #[inline]
    fn check(&self, kind: &TokenKind<'_>) -> bool { self.peek() == kind }

    fn eat(&mut self, kind: &TokenKind<'_>) -> bool {
        if self.check(kind) {
            self.bump();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: &TokenKind<'_>, what: &str) -> PResult<Span> {
        if self.check(kind) {
            return Ok(self.bump().span);
        }
        Err(self.err_here(format!("attendu: {what}")))
    }

    fn expect_ident(&mut self) -> PResult<(&'a str, Span)> {
        if let TokenKind::Ident(s) = *self.peek() {
            let span = self.bump().span;
            return Ok((s, span));
        }
        Err(self.err_here("identifiant attendu"))
    }

    fn loc(&self, start: Span, end: Span) -> Option<Location> { Some(self.lines.location(start.to(end))) }

    fn err_here(&self, message: impl Into<String>) -> ParseError { self.err_at(self.span(), message) }

    fn err_at(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError { location: self.lines.location(span), message: message.into() }
    }
}

/* ─────────────────────────── Opérateurs & helpers ─────────────────────────── */

fn binary_op(tok: &TokenKind<'_>) -> Option<BinaryOp> {
    Some(match tok {
        TokenKind::OrOr => BinaryOp::Or,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::Ne => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        _ => return None,
    })
}

const fn precedence(op: BinaryOp) -> (u8, u8) {
    // Pratt binding power (gauche-associatif)
    match op {
        BinaryOp::Or => (1, 2),
        BinaryOp::And => (3, 4),
        BinaryOp::BitOr => (5, 6),
        BinaryOp::BitXor => (7, 8),
        BinaryOp::BitAnd => (9, 10),
        BinaryOp::Eq | BinaryOp::Ne => (11, 12),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (13, 14),
        BinaryOp::Add | BinaryOp::Sub => (15, 16),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (17, 18),
    }
}

fn unit_factor(unit: &str) -> Option<u64> {
    Some(match unit {
        "sats" | "seconds" => 1,
        "finney" => 10,
        "bits" => 100,
        "bitcoin" => 100_000_000,
        "minutes" => 60,
        "hours" => 3_600,
        "days" => 86_400,
        "weeks" => 604_800,
        _ => return None,
    })
}

/// `tx.time >= e` / `tx.age >= e` → (genre, borne) ; sinon rend l’expression.
fn split_time_op(cond: Expr) -> Result<(TimeOpKind, Expr), Expr> {
    match cond.kind {
        ExprKind::Binary { op: BinaryOp::Ge, left, right } => match time_kind(&left) {
            Some(kind) => Ok((kind, *right)),
            None => Err(Expr::new(ExprKind::Binary { op: BinaryOp::Ge, left, right }, cond.location)),
        },
        kind => Err(Expr::new(kind, cond.location)),
    }
}

fn time_kind(e: &Expr) -> Option<TimeOpKind> {
    let ExprKind::Member { object, member } = &e.kind else { return None };
    if object.as_identifier() != Some("tx") {
        return None;
    }
    match member.as_str() {
        "time" => Some(TimeOpKind::Time),
        "age" => Some(TimeOpKind::Age),
        _ => None,
    }
}

fn join(a: Option<Location>, b: Option<Location>) -> Option<Location> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merge(b)),
        (a, b) => a.or(b),
    }
}

fn lex_error(lines: &LineMap, e: &LexError) -> ParseError {
    ParseError { location: lines.location(e.span), message: e.to_string() }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIMPLE: &str = "pragma scrip ^0.10.0;

contract Test() {
    function hello(sig s, pubkey pk) {
        require(checkSig(s, pk));
    }

    function world(int a) {
        require(a == 123);
    }
}
";

    fn parse_ok(src: &str) -> ast::SourceFile {
        parse_code(src).expect("parse ok")
    }

    fn expr_of(code: &str) -> (String, Expr) {
        let src = format!("contract C() {{ function f() {{ require({code}); }} }}");
        let file = parse_ok(&src);
        let stmt = file.contract.functions[0].body.stmts[0].clone();
        match stmt.kind {
            StmtKind::Require { condition, .. } => (src, condition),
            other => panic!("require attendu, obtenu {other:?}"),
        }
    }

    #[test]
    fn contract_and_function_locations() {
        let file = parse_ok(SIMPLE);
        let c = &file.contract;
        assert_eq!(c.name, "Test");
        assert_eq!(c.functions.len(), 2);
        let f = &c.functions[0];
        assert_eq!(f.params[0].ty, TypeName::Sig);
        assert_eq!(f.params[1].name, "pk");
        let text = f.location.unwrap().text(SIMPLE);
        assert_eq!(text, "function hello(sig s, pubkey pk) {\n        require(checkSig(s, pk));\n    }");
        assert!(c.location.unwrap().text(SIMPLE).starts_with("contract Test()"));
    }

    #[test]
    fn precedence_and_assoc() {
        let (_, e) = expr_of("1 + 2 * 3 == 7 && true || false");
        let ExprKind::Binary { op: BinaryOp::Or, left, .. } = e.kind else { panic!("|| en tête attendu") };
        let ExprKind::Binary { op: BinaryOp::And, left, .. } = left.kind else { panic!("&& attendu") };
        let ExprKind::Binary { op: BinaryOp::Eq, left, .. } = left.kind else { panic!("== attendu") };
        let ExprKind::Binary { op: BinaryOp::Add, right, .. } = left.kind else { panic!("+ attendu") };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));

        let (_, e) = expr_of("0x01 | 0x02 ^ 0x03 & 0x04");
        let ExprKind::Binary { op: BinaryOp::BitOr, right, .. } = e.kind else { panic!("| attendu") };
        let ExprKind::Binary { op: BinaryOp::BitXor, right, .. } = right.kind else { panic!("^ attendu") };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::BitAnd, .. }));

        let (_, e) = expr_of("10 - 4 - 3");
        let ExprKind::Binary { op: BinaryOp::Sub, left, .. } = e.kind else { panic!("- attendu") };
        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn negative_literals_and_units() {
        let (_, e) = expr_of("-333 == 1");
        let ExprKind::Binary { left, .. } = e.kind else { panic!() };
        assert_eq!(left.kind, ExprKind::Literal(Literal::Int(-333)));

        let (_, e) = expr_of("-x");
        assert!(matches!(e.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));

        let (_, e) = expr_of("2 days == 172800");
        let ExprKind::Binary { left, .. } = e.kind else { panic!() };
        assert_eq!(left.kind, ExprKind::Literal(Literal::Int(172_800)));
    }

    #[test]
    fn int_literals_cover_the_full_i64_range() {
        let (_, e) = expr_of("-9223372036854775808 == 9223372036854775807");
        let ExprKind::Binary { left, right, .. } = e.kind else { panic!() };
        assert_eq!(left.kind, ExprKind::Literal(Literal::Int(i64::MIN)));
        assert_eq!(right.kind, ExprKind::Literal(Literal::Int(i64::MAX)));

        let err = parse_code("contract C() {\n function f() {\n require(9223372036854775808 == 1);\n }\n}").unwrap_err();
        assert_eq!((err.location.line, err.location.column), (3, 10));
        assert!(err.message.contains("i64"));

        let err = parse_code("contract C() { function f() { require(-9223372036854775809 == 1); } }").unwrap_err();
        assert!(err.message.contains("i64"));
        let err = parse_code("contract C() { function f() { require(-10000000000000 bitcoin == 1); } }").unwrap_err();
        assert!(err.message.contains("i64"));
    }

    #[test]
    fn postfix_chains() {
        let (src, e) = expr_of("\"11\".split(1)[0] == tx.inputs[0].tokenAmount");
        let ExprKind::Binary { left, right, .. } = e.kind else { panic!() };
        assert_eq!(left.location.unwrap().text(&src), "\"11\".split(1)[0]");
        let ExprKind::Index { object, .. } = left.kind else { panic!("index attendu") };
        assert!(matches!(object.kind, ExprKind::MethodCall { ref method, .. } if method == "split"));
        let ExprKind::Member { object, member } = right.kind else { panic!("membre attendu") };
        assert_eq!(member, "tokenAmount");
        assert!(matches!(object.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn paren_location_includes_parens() {
        let (src, e) = expr_of("(1 - 1) == 1");
        let ExprKind::Binary { left, .. } = e.kind else { panic!() };
        assert_eq!(left.location.unwrap().text(&src), "(1 - 1)");
    }

    #[test]
    fn time_ops_and_messages() {
        let src = "contract C() { function f(int x) {
            require(tx.time >= 100, \"too early\");
            require(tx.age >= x);
            require(tx.version >= 2);
        } }";
        let file = parse_ok(src);
        let stmts = &file.contract.functions[0].body.stmts;
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::TimeOp { kind: TimeOpKind::Time, message: Some(m), .. } if m == "too early"
        ));
        assert!(matches!(&stmts[1].kind, StmtKind::TimeOp { kind: TimeOpKind::Age, message: None, .. }));
        assert!(matches!(&stmts[2].kind, StmtKind::Require { .. }));
        assert_eq!(stmts[0].location.unwrap().text(src), "require(tx.time >= 100, \"too early\");");
    }

    #[test]
    fn definitions_assign_and_if() {
        let src = "contract C(bytes20 h) {
            function f(bytes data, int n) {
                bytes4 a, bytes rest = data.split(4);
                int m = n + 1;
                m = m * 2;
                if (m > 3) require(a == 0x01020304);
                else {
                    require(rest.length == m);
                }
            }
        }";
        let file = parse_ok(src);
        assert_eq!(file.contract.params[0].ty, TypeName::Bytes(Some(20)));
        let stmts = &file.contract.functions[0].body.stmts;
        assert!(matches!(&stmts[0].kind, StmtKind::TupleAssignment { left: (TypeName::Bytes(Some(4)), _), .. }));
        assert!(matches!(&stmts[1].kind, StmtKind::VariableDefinition { ty: TypeName::Int, .. }));
        assert!(matches!(&stmts[2].kind, StmtKind::Assign { name, .. } if name == "m"));
        let StmtKind::If { then_block, else_block, .. } = &stmts[3].kind else { panic!("if attendu") };
        assert_eq!(then_block.stmts.len(), 1);
        assert_eq!(else_block.as_ref().map(|b| b.stmts.len()), Some(1));
    }

    #[test]
    fn errors_are_located() {
        let err = parse_code("contract C() {\n function f() {\n require(1 <);\n }\n}").unwrap_err();
        assert_eq!(err.location.line, 3);
        assert!(err.message.contains("expression"));

        let err = parse_code("contract C() { function f() { require(0x123); } }").unwrap_err();
        assert!(err.message.contains("hex"));

        let err = parse_code("contract C() { } trailing").unwrap_err();
        assert!(err.message.contains("fin de fichier"));
    }

    /// Rendu de l’arbre sans localisations.
    fn shape(e: &Expr) -> String {
        let list = |xs: &[Expr]| xs.iter().map(shape).collect::<Vec<_>>().join(",");
        match &e.kind {
            ExprKind::Literal(l) => format!("{l:?}"),
            ExprKind::Identifier(n) => n.clone(),
            ExprKind::Binary { op, left, right } => format!("({} {op} {})", shape(left), shape(right)),
            ExprKind::Unary { op, expr } => format!("{op:?}{}", shape(expr)),
            ExprKind::Call { name, args } => format!("{name}({})", list(args)),
            ExprKind::MethodCall { receiver, method, args } => format!("{}.{method}({})", shape(receiver), list(args)),
            ExprKind::Member { object, member } => format!("{}.{member}", shape(object)),
            ExprKind::Index { object, index } => format!("{}[{}]", shape(object), shape(index)),
            ExprKind::Array(items) => format!("[{}]", list(items)),
        }
    }

    proptest::proptest! {
        #[test]
        fn whitespace_does_not_change_ast_shape(pad in "[ \n\t]{1,3}") {
            let code = "within(x, 1, 10) && !(0x01.length < 2)";
            let spaced = code.replace(' ', &pad).replace('(', &format!("({pad}"));
            let (_, a) = expr_of(code);
            let (_, b) = expr_of(&spaced);
            proptest::prop_assert_eq!(shape(&a), shape(&b));
        }
    }
}
