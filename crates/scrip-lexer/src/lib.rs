//! scrip-lexer - analyse lexicale pour Scrip
//!
//! Faits saillants :
//! - `Lexer` + `LexerOptions` : commentaires `//`, `/* */`, ident/keywords, entiers
//!   décimaux (`_`, exposant `e`), littéraux **hexadécimaux** `0x…` (octets),
//!   chaînes `"…"` / `'…'` avec échappements
//! - `Span`/`Spanned`/`SourceId` + **LineMap** pour `(ligne, colonne)` et `Location`
//! - Erreurs avec `Display` propre + spans précis
//!
//! Exemple éclair :
//! ```
//! use scrip_core::SourceId;
//! use scrip_lexer::{Lexer, TokenKind};
//!
//! let src = "require(checkSig(s, pk)); // fin";
//! let toks = Lexer::new(src, SourceId(0)).tokenize().unwrap();
//! assert!(matches!(toks.last().map(|t| &t.value), Some(TokenKind::Eof)));
//! ```

#![deny(missing_docs)]

use core::fmt;

use scrip_core::{Location, Pos, SourceId, Span, Spanned};

/* ─────────────────────────── Options & LineMap ─────────────────────────── */

/// Options du lexer.
#[derive(Debug, Clone, Copy)]
pub struct LexerOptions {
    /// Autoriser commentaires blocs imbriqués `/* ... /* .. */ ... */`.
    pub nested_block_comments: bool,
}

impl Default for LexerOptions {
    fn default() -> Self { Self { nested_block_comments: false } }
}

/// Table des lignes pour (byte offset) → (ligne, colonne).
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Offsets des débuts de lignes (toujours contient 0).
    pub line_starts: Vec<u32>,
}

impl LineMap {
    /// Construit la table à partir d’un `&str`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(src: &str) -> Self {
        let mut ls = Vec::with_capacity(64);
        ls.push(0);
        for (i, b) in src.as_bytes().iter().enumerate() {
            if *b == b'\n' {
                ls.push((i as u32) + 1);
            }
        }
        Self { line_starts: ls }
    }

    /// Convertit un `Pos` en (ligne, colonne), 1-based.
    #[allow(clippy::cast_possible_truncation)]
    pub fn line_col(&self, pos: Pos) -> (u32, u32) {
        let off = pos.0;
        let idx = match self.line_starts.binary_search(&off) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[idx];
        let col = off.saturating_sub(line_start) + 1;
        ((idx as u32) + 1, col)
    }

    /// Convertit un `Span` en `Location` (lignes/colonnes des deux bornes).
    pub fn location(&self, sp: Span) -> Location {
        let (line, column) = self.line_col(sp.start);
        let (end_line, end_column) = self.line_col(sp.end);
        Location::new(sp.start.0, sp.end.0, line, column, end_line, end_column)
    }
}

/* ─────────────────────────── Tokens ─────────────────────────── */

/// Mots-clés reconnus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `pragma`
    Pragma,
    /// `contract`
    Contract,
    /// `function`
    Function,
    /// `require`
    Require,
    /// `if`
    If,
    /// `else`
    Else,
    /// `true`
    True,
    /// `false`
    False,
}

/// Genre de jeton lexical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// Fin de fichier.
    Eof,
    /// Identifiant (ou mot-clé reclassé dans `Keyword`).
    Ident(&'a str),
    /// Mot-clé.
    Kw(Keyword),
    /// Littéral entier non signé ; le signe et la borne i64 sont l’affaire du parseur.
    Int(u64),
    /// Littéral chaîne (décodée).
    Str(String),
    /// Littéral octets `0x…`.
    Hex(Vec<u8>),
    /// Symbole `(`
    LParen,
    /// Symbole `)`
    RParen,
    /// Symbole `{`
    LBrace,
    /// Symbole `}`
    RBrace,
    /// Symbole `[`
    LBracket,
    /// Symbole `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;`
    Semi,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
}

/// Jeton avec span.
pub type Token<'a> = Spanned<TokenKind<'a>>;

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d’erreur lexicale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Caractère inattendu.
    UnexpectedChar(char),
    /// Commentaire bloc non terminé.
    UnterminatedBlockComment,
    /// Chaîne non terminée.
    UnterminatedString,
    /// Séquence d’échappement invalide.
    InvalidEscape,
    /// Littéral numérique invalide.
    InvalidNumber,
    /// Dépassement entier u64.
    IntOverflow,
    /// Littéral hexadécimal invalide (chiffres impairs ou vide).
    InvalidHex,
}

/// Erreur lexicale avec localisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Localisation.
    pub span: Span,
    /// Genre d’erreur.
    pub kind: LexErrorKind,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LexErrorKind::*;
        match &self.kind {
            UnexpectedChar(c) => write!(f, "unexpected character: {c:?}"),
            UnterminatedBlockComment => write!(f, "unterminated block comment"),
            UnterminatedString => write!(f, "unterminated string literal"),
            InvalidEscape => write!(f, "invalid escape sequence"),
            InvalidNumber => write!(f, "invalid number literal"),
            IntOverflow => write!(f, "integer literal overflows u64"),
            InvalidHex => write!(f, "invalid hex literal"),
        }
    }
}

impl std::error::Error for LexError {}

/* ─────────────────────────── Lexer ─────────────────────────── */

/// Analyseur lexical (itératif).
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// Position courante en bytes.
    off: usize,
    /// Id de la source.
    source: SourceId,
    /// Options.
    opts: LexerOptions,
    /// Table des lignes (exposée pour diagnostics).
    pub lines: LineMap,
}

impl<'a> Lexer<'a> {
    /// Crée un lexer avec options par défaut.
    pub fn new(src: &'a str, source: SourceId) -> Self {
        Self::with_options(src, source, LexerOptions::default())
    }

    /// Crée un lexer avec `LexerOptions`.
    pub fn with_options(src: &'a str, source: SourceId, opts: LexerOptions) -> Self {
        Self { src, bytes: src.as_bytes(), off: 0, source, opts, lines: LineMap::new(src) }
    }

    /// Prochain jeton ; émet toujours `Eof` en fin de source.
    pub fn next(&mut self) -> Result<Option<Token<'a>>, LexError> {
        self.skip_ws_and_comments()?;
        let start = self.off;
        let Some(c) = self.bump_char() else {
            return Ok(Some(Spanned { value: TokenKind::Eof, span: self.span_here(0) }));
        };

        let kind = match c {
            ch if is_ident_start(ch) => {
                self.consume_while(|b| is_ident_continue(b as char));
                let s = &self.src[start..self.off];
                keyword_of(s).map_or(TokenKind::Ident(s), TokenKind::Kw)
            }
            '0' if matches!(self.peek_char(), Some('x' | 'X')) => self.lex_hex(start)?,
            ch if ch.is_ascii_digit() => self.lex_number(start)?,
            '"' | '\'' => TokenKind::Str(self.lex_string(start, c)?),

            '=' => if self.eat('=') { TokenKind::EqEq } else { TokenKind::Eq },
            '&' => if self.eat('&') { TokenKind::AndAnd } else { TokenKind::Amp },
            '|' => if self.eat('|') { TokenKind::OrOr } else { TokenKind::Pipe },
            '!' => if self.eat('=') { TokenKind::Ne } else { TokenKind::Bang },
            '<' => if self.eat('=') { TokenKind::Le } else { TokenKind::Lt },
            '>' => if self.eat('=') { TokenKind::Ge } else { TokenKind::Gt },

            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '.' => TokenKind::Dot,

            other => return Err(self.err_from(start, LexErrorKind::UnexpectedChar(other))),
        };

        Ok(Some(Spanned { value: kind, span: self.span_from(start) }))
    }

    /// Tokenise toute la source (ajoute `Eof` final).
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, LexError> {
        let mut out = Vec::new();
        while let Some(t) = self.next()? {
            let is_eof = matches!(t.value, TokenKind::Eof);
            out.push(t);
            if is_eof {
                break;
            }
        }
        Ok(out)
    }

    /* ────────── Primitives internes ────────── */

    #[inline] fn peek(&self) -> Option<u8> { self.bytes.get(self.off).copied() }
    #[inline] fn peek_char(&self) -> Option<char> { self.peek().map(|b| b as char) }
    #[inline] fn peek2(&self) -> Option<u8> { self.bytes.get(self.off + 1).copied() }
    #[inline] fn eat(&mut self, ch: char) -> bool { if self.peek_char() == Some(ch) { self.off += 1; true } else { false } }

    #[inline]
    fn bump_char(&mut self) -> Option<char> {
        let c = self.src.get(self.off..)?.chars().next()?;
        self.off += c.len_utf8();
        Some(c)
    }

    fn consume_while(&mut self, mut p: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek() {
            if p(b) { self.off += 1; } else { break; }
        }
    }

    fn skip_ws_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            self.consume_while(|b| b.is_ascii_whitespace());
            if self.peek() == Some(b'/') && self.peek2() == Some(b'/') {
                self.consume_while(|b| b != b'\n');
                continue;
            }
            if self.peek() == Some(b'/') && self.peek2() == Some(b'*') {
                let start = self.off;
                self.off += 2;
                let mut depth = 1u32;
                loop {
                    if self.off >= self.bytes.len() {
                        return Err(self.err_from(start, LexErrorKind::UnterminatedBlockComment));
                    }
                    if self.opts.nested_block_comments && self.peek() == Some(b'/') && self.peek2() == Some(b'*') {
                        self.off += 2;
                        depth += 1;
                        continue;
                    }
                    if self.peek() == Some(b'*') && self.peek2() == Some(b'/') {
                        self.off += 2;
                        depth -= 1;
                        if depth == 0 { break; }
                        continue;
                    }
                    self.off += 1;
                }
                continue;
            }
            break;
        }
        Ok(())
    }

    fn lex_string(&mut self, start_quote: usize, quote: char) -> Result<String, LexError> {
        let mut out = String::new();
        loop {
            let c = self.bump_char().ok_or_else(|| self.err_from(start_quote, LexErrorKind::UnterminatedString))?;
            match c {
                '\n' => return Err(self.err_from(start_quote, LexErrorKind::UnterminatedString)),
                c if c == quote => break,
                '\\' => {
                    let esc = self.bump_char().ok_or_else(|| self.err_here(LexErrorKind::UnterminatedString))?;
                    match esc {
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        '\\' => out.push('\\'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        '0' => out.push('\0'),
                        _ => return Err(self.err_here(LexErrorKind::InvalidEscape)),
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn lex_hex(&mut self, start: usize) -> Result<TokenKind<'a>, LexError> {
        // '0' déjà consommé ; on saute le 'x'
        self.off += 1;
        self.consume_while(|b| b.is_ascii_hexdigit() || b == b'_');
        let raw = self.src[start + 2..self.off].replace('_', "");
        if raw.is_empty() {
            return Err(self.err_from(start, LexErrorKind::InvalidHex));
        }
        hex::decode(&raw)
            .map(TokenKind::Hex)
            .map_err(|_| self.err_from(start, LexErrorKind::InvalidHex))
    }

    fn lex_number(&mut self, start: usize) -> Result<TokenKind<'a>, LexError> {
        self.consume_while(|b| b.is_ascii_digit() || b == b'_');
        let mantissa_end = self.off;
        let mut exponent = 0u32;
        if matches!(self.peek_char(), Some('e' | 'E')) && self.peek2().is_some_and(|d| d.is_ascii_digit()) {
            self.off += 1;
            let exp_start = self.off;
            self.consume_while(|b| b.is_ascii_digit());
            exponent = self.src[exp_start..self.off]
                .parse()
                .map_err(|_| self.err_from(start, LexErrorKind::InvalidNumber))?;
        }
        if self.peek().is_some_and(|b| is_ident_start(b as char)) {
            // `12abc` : ni nombre ni identifiant
            self.consume_while(|b| is_ident_continue(b as char));
            return Err(self.err_from(start, LexErrorKind::InvalidNumber));
        }

        let raw = self.src[start..mantissa_end].replace('_', "");
        let mantissa: u64 = raw.parse().map_err(|_| self.err_from(start, LexErrorKind::IntOverflow))?;
        10u64
            .checked_pow(exponent)
            .and_then(|scale| mantissa.checked_mul(scale))
            .map(TokenKind::Int)
            .ok_or_else(|| self.err_from(start, LexErrorKind::IntOverflow))
    }

    /* ────────── Spans / erreurs ────────── */

    #[allow(clippy::cast_possible_truncation)]
    #[inline] fn span_here(&self, width: usize) -> Span {
        Span { source: self.source, start: Pos(self.off as u32), end: Pos((self.off + width) as u32) }
    }
    #[allow(clippy::cast_possible_truncation)]
    #[inline] fn span_from(&self, start: usize) -> Span {
        Span { source: self.source, start: Pos(start as u32), end: Pos(self.off as u32) }
    }
    #[inline] fn err_here(&self, kind: LexErrorKind) -> LexError { LexError { span: self.span_here(1), kind } }
    #[inline] fn err_from(&self, start: usize, kind: LexErrorKind) -> LexError { LexError { span: self.span_from(start), kind } }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
const fn is_ident_start(c: char) -> bool { c == '_' || c.is_ascii_alphabetic() }

#[inline]
const fn is_ident_continue(c: char) -> bool { c == '_' || c.is_ascii_alphanumeric() }

#[inline]
fn keyword_of(s: &str) -> Option<Keyword> {
    use Keyword::*;
    Some(match s {
        "pragma" => Pragma,
        "contract" => Contract,
        "function" => Function,
        "require" => Require,
        "if" => If,
        "else" => Else,
        "true" => True,
        "false" => False,
        _ => return None,
    })
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn toks(src: &str) -> Vec<TokenKind<'_>> {
        Lexer::new(src, SourceId(0)).tokenize().unwrap().into_iter().map(|t| t.value).collect()
    }

    fn lex_err(src: &str) -> LexErrorKind {
        Lexer::new(src, SourceId(0)).tokenize().unwrap_err().kind
    }

    #[test]
    fn idents_keywords() {
        use Keyword::*;
        use TokenKind::*;
        let v = toks("pragma contract function require if else true false tx _x x1");
        assert_eq!(
            v,
            vec![
                Kw(Pragma), Kw(Contract), Kw(Function), Kw(Require), Kw(If), Kw(Else),
                Kw(True), Kw(False), Ident("tx"), Ident("_x"), Ident("x1"), Eof,
            ]
        );
    }

    #[test]
    fn numbers_and_hex() {
        use TokenKind::*;
        let v = toks("0 123 1_000 1e3 2e0 0x01 0xDEad_bEEf 9223372036854775808");
        assert_eq!(v[0], Int(0));
        assert_eq!(v[1], Int(123));
        assert_eq!(v[2], Int(1000));
        assert_eq!(v[3], Int(1000));
        assert_eq!(v[4], Int(2));
        assert_eq!(v[5], Hex(vec![0x01]));
        assert_eq!(v[6], Hex(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(v[7], Int(1 << 63));
    }

    #[test]
    fn number_errors() {
        assert_eq!(lex_err("0x123"), LexErrorKind::InvalidHex);
        assert_eq!(lex_err("0x"), LexErrorKind::InvalidHex);
        assert_eq!(lex_err("0x__ == 1"), LexErrorKind::InvalidHex);
        assert_eq!(lex_err("99999999999999999999"), LexErrorKind::IntOverflow);
        assert_eq!(lex_err("1e30"), LexErrorKind::IntOverflow);
        assert_eq!(lex_err("12ab"), LexErrorKind::InvalidNumber);
    }

    #[test]
    fn strings_both_quotes() {
        use TokenKind::*;
        let v = toks(r#""hi" 'a\'b' "\n" "é""#);
        assert_eq!(v[0], Str("hi".into()));
        assert_eq!(v[1], Str("a'b".into()));
        assert_eq!(v[2], Str("\n".into()));
        assert_eq!(v[3], Str("é".into()));
        assert_eq!(lex_err("\"open"), LexErrorKind::UnterminatedString);
        assert_eq!(lex_err(r#""\q""#), LexErrorKind::InvalidEscape);
    }

    #[test]
    fn comments_ws() {
        use TokenKind::*;
        let v = toks("/* a */ + // line\n 1");
        assert_eq!(v, vec![Plus, Int(1), Eof]);
        assert_eq!(lex_err("/* open"), LexErrorKind::UnterminatedBlockComment);
    }

    #[test]
    fn ops_punct() {
        use TokenKind::*;
        let v = toks("== != <= >= && || ! & | ^ + - * / % ( ) { } [ ] , . ; < > =");
        assert_eq!(
            v,
            vec![
                EqEq, Ne, Le, Ge, AndAnd, OrOr, Bang, Amp, Pipe, Caret, Plus, Minus, Star, Slash,
                Percent, LParen, RParen, LBrace, RBrace, LBracket, RBracket, Comma, Dot, Semi, Lt, Gt, Eq, Eof,
            ]
        );
    }

    #[test]
    fn spans_and_unexpected() {
        let toks = Lexer::new("ab  cd", SourceId(0)).tokenize().unwrap();
        assert_eq!((toks[1].span.start, toks[1].span.end), (Pos(4), Pos(6)));
        let err = Lexer::new("a @", SourceId(0)).tokenize().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedChar('@'));
        assert_eq!(err.span.start, Pos(2));
        assert_eq!(lex_err("~a"), LexErrorKind::UnexpectedChar('~'));
    }

    #[test]
    fn linemap_basic() {
        let src = "a\nbb\nccc";
        let lm = LineMap::new(src);
        assert_eq!(lm.line_col(Pos(0)), (1, 1));
        assert_eq!(lm.line_col(Pos(2)), (2, 1));
        assert_eq!(lm.line_col(Pos(4)), (2, 3));
        assert_eq!(lm.line_col(Pos(6)), (3, 2));
        let loc = lm.location(Span::new(SourceId(0), Pos(2), Pos(7)));
        assert_eq!((loc.line, loc.column, loc.end_line, loc.end_column), (2, 1, 3, 3));
        assert_eq!(loc.text(src), "bb\ncc");
    }

    proptest::proptest! {
        #[test]
        fn never_panics(s in "[ -~\n]{0,64}") {
            let _ = Lexer::new(&s, SourceId(0)).tokenize();
        }

        #[test]
        fn extra_whitespace_keeps_tokens(pad in "[ \t\n]{1,4}") {
            let src = "require(a.split(1)[0] >= 0x0102 && !b);";
            let spaced = src.replace('(', &format!("({pad}")).replace(' ', &pad);
            proptest::prop_assert_eq!(toks(src), toks(&spaced));
        }
    }
}
