// src/lib.rs
//! Scrip AST (Abstract Syntax Tree)
//!
//! Ce crate définit les structures produites par `scrip-parser` et consommées
//! par le générateur de code de `scrip-compiler`.
//!
//! - Ensemble fermé de variantes (`StmtKind`, `ExprKind`) : le générateur de
//!   code les traite par `match` exhaustif
//! - Chaque nœud porte une `Location` optionnelle (offsets + ligne/colonne)
//!
//! # Features
//! - `serde` : permet la sérialisation/désérialisation de l’AST
//!
//! # Exemple
//! ```rust
//! use scrip_ast::{Expr, ExprKind, Literal};
//!
//! let lit = Expr::new(ExprKind::Literal(Literal::Int(42)), None);
//! assert!(lit.location.is_none());
//! ```

#![deny(missing_docs)]

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use scrip_core::Location;

/// Un contrat Scrip complet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contract {
    /// Nom du contrat.
    pub name: String,
    /// Paramètres du constructeur.
    pub params: Vec<Param>,
    /// Fonctions publiques, dans l’ordre de déclaration.
    pub functions: Vec<Function>,
    /// Localisation (mot-clé `contract` → `}` final).
    pub location: Option<Location>,
}

impl Contract {
    /// Recherche une fonction par nom.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Fichier source : pragmas ignorés + un contrat
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceFile {
    /// Le contrat déclaré.
    pub contract: Contract,
}

/// Fonction publique d’un contrat
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Function {
    /// Nom de la fonction.
    pub name: String,
    /// Paramètres positionnels.
    pub params: Vec<Param>,
    /// Corps de la fonction.
    pub body: Block,
    /// Localisation (mot-clé `function` → `}` final).
    pub location: Option<Location>,
}

/// Paramètre (constructeur ou fonction)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Param {
    /// Type déclaré.
    pub ty: TypeName,
    /// Nom du paramètre.
    pub name: String,
    /// Localisation du paramètre.
    pub location: Option<Location>,
}

/// Un bloc d’instructions
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Block {
    /// Instructions contenues dans le bloc.
    pub stmts: Vec<Stmt>,
    /// Localisation du bloc (accolades incluses).
    pub location: Option<Location>,
}

/// Une instruction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stmt {
    /// Genre d’instruction.
    pub kind: StmtKind,
    /// Localisation de l’instruction.
    pub location: Option<Location>,
}

impl Stmt {
    /// Construit une instruction.
    pub const fn new(kind: StmtKind, location: Option<Location>) -> Self { Self { kind, location } }
}

/// Genre de contrôle temporel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeOpKind {
    /// `tx.time` : locktime absolu.
    Time,
    /// `tx.age` : âge relatif (séquence).
    Age,
}

/// Genres d’instructions
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StmtKind {
    /// `T x = e;`
    VariableDefinition {
        /// Type déclaré.
        ty: TypeName,
        /// Nom de la variable.
        name: String,
        /// Valeur initiale.
        value: Expr,
    },
    /// `T a, U b = e;` (e produit un couple, ex. `split`)
    TupleAssignment {
        /// Premier élément (gauche).
        left: (TypeName, String),
        /// Second élément (droite).
        right: (TypeName, String),
        /// Expression couple.
        value: Expr,
    },
    /// `x = e;`
    Assign {
        /// Variable réassignée.
        name: String,
        /// Nouvelle valeur.
        value: Expr,
    },
    /// `require(e);` ou `require(e, "message");`
    Require {
        /// Condition vérifiée.
        condition: Expr,
        /// Message d’erreur optionnel.
        message: Option<String>,
    },
    /// `require(tx.time >= e);` / `require(tx.age >= e);`
    TimeOp {
        /// Genre de contrôle.
        kind: TimeOpKind,
        /// Borne (entier).
        value: Expr,
        /// Message d’erreur optionnel.
        message: Option<String>,
    },
    /// `if (c) { … } else { … }`
    If {
        /// Condition.
        condition: Expr,
        /// Bloc si vrai.
        then_block: Block,
        /// Bloc sinon (optionnel).
        else_block: Option<Block>,
    },
}

/// Une expression
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Expr {
    /// Genre d’expression.
    pub kind: ExprKind,
    /// Localisation de l’expression.
    pub location: Option<Location>,
}

impl Expr {
    /// Construit une expression.
    pub const fn new(kind: ExprKind, location: Option<Location>) -> Self { Self { kind, location } }

    /// Nom si l’expression est un identifiant.
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// Genres d’expressions
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExprKind {
    /// Valeur littérale
    Literal(Literal),
    /// Référence à une variable (ou `tx` / `this`)
    Identifier(String),
    /// Opération binaire
    Binary {
        /// Opérateur.
        op: BinaryOp,
        /// Opérande gauche.
        left: Box<Expr>,
        /// Opérande droite.
        right: Box<Expr>,
    },
    /// Opération unaire
    Unary {
        /// Opérateur.
        op: UnaryOp,
        /// Opérande.
        expr: Box<Expr>,
    },
    /// Appel de fonction intégrée ou cast (`sha256(x)`, `bytes(x)`)
    Call {
        /// Nom appelé.
        name: String,
        /// Arguments, ordre source.
        args: Vec<Expr>,
    },
    /// Appel de méthode (`x.split(1)`)
    MethodCall {
        /// Receveur.
        receiver: Box<Expr>,
        /// Méthode.
        method: String,
        /// Arguments, ordre source.
        args: Vec<Expr>,
    },
    /// Accès membre (`x.length`, `tx.version`)
    Member {
        /// Objet.
        object: Box<Expr>,
        /// Membre.
        member: String,
    },
    /// Indexation (`tx.inputs[0]`, `x.split(1)[0]`)
    Index {
        /// Objet indexé.
        object: Box<Expr>,
        /// Index.
        index: Box<Expr>,
    },
    /// Tableau littéral (`[a, b]`)
    Array(Vec<Expr>),
}

/// Valeurs littérales
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Literal {
    /// Entier signé 64 bits.
    Int(i64),
    /// Booléen.
    Bool(bool),
    /// Chaîne UTF-8.
    Str(String),
    /// Octets (`0x…`).
    Hex(Vec<u8>),
}

/// Opérateurs binaires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
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
    And,
    /// `||`
    Or,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
}

impl BinaryOp {
    /// Symbole source.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.symbol()) }
}

/// Opérateurs unaires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOp {
    /// Négation arithmétique (`-x`).
    Neg,
    /// Négation logique (`!x`).
    Not,
}

/// Types du langage Scrip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TypeName {
    /// `int`
    Int,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `pubkey`
    PubKey,
    /// `sig`
    Sig,
    /// `datasig`
    DataSig,
    /// `bytes` ou `bytesN` (taille fixe)
    Bytes(Option<u16>),
}

impl TypeName {
    /// Résout un nom de type (`int`, `bytes20`, …).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Self::Int,
            "bool" => Self::Bool,
            "string" => Self::String,
            "pubkey" => Self::PubKey,
            "sig" => Self::Sig,
            "datasig" => Self::DataSig,
            "bytes" => Self::Bytes(None),
            other => {
                // chiffres décimaux canoniques : ni signe ni zéro de tête
                let digits = other.strip_prefix("bytes")?;
                if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let n: u16 = digits.parse().ok()?;
                if n > 520 {
                    return None;
                }
                Self::Bytes(Some(n))
            }
        })
    }

    /// Vrai pour les types représentés par des octets bruts sur la pile.
    pub const fn is_bytes_like(self) -> bool {
        matches!(self, Self::String | Self::PubKey | Self::Sig | Self::DataSig | Self::Bytes(_))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::PubKey => f.write_str("pubkey"),
            Self::Sig => f.write_str("sig"),
            Self::DataSig => f.write_str("datasig"),
            Self::Bytes(None) => f.write_str("bytes"),
            Self::Bytes(Some(n)) => write!(f, "bytes{n}"),
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
