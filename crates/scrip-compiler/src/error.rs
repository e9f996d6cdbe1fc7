//! Erreurs du compilateur.

use scrip_core::script::{DecodeError, MappingError};
use scrip_core::Location;
use scrip_parser::ParseError;

/// Genre d’erreur de génération de code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeGenErrorKind {
    /// Identifiant absent de la pile modélisée.
    #[error("undefined identifier `{0}`")]
    UndefinedIdentifier(String),
    /// Nom déjà lié dans la portée de la fonction.
    #[error("identifier `{0}` is already defined")]
    Redefinition(String),
    /// Types incompatibles.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Attendu.
        expected: String,
        /// Trouvé.
        found: String,
    },
    /// Mauvais nombre d’arguments.
    #[error("`{name}` takes {expected} argument(s), {found} given")]
    WrongArity {
        /// Fonction / méthode appelée.
        name: String,
        /// Attendu.
        expected: usize,
        /// Fourni.
        found: usize,
    },
    /// Fonction ou méthode inconnue.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// Construction sans traduction.
    #[error("unsupported construct: {0}")]
    Unsupported(String),
    /// La fonction ne se termine pas par un `require`.
    #[error("function `{0}` must end with a require statement")]
    MissingFinalRequire(String),
    /// Index de couple autre que le littéral 0 ou 1.
    #[error("tuple index must be the literal 0 or 1")]
    InvalidTupleIndex,
}

/// Erreur de génération de code, avec la localisation du nœud fautif.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}{}", .location.map(|l| format!(" at {l}")).unwrap_or_default())]
pub struct CodeGenError {
    /// Genre.
    pub kind: CodeGenErrorKind,
    /// Localisation du nœud (si connue).
    pub location: Option<Location>,
}

impl CodeGenError {
    /// Construit une erreur localisée.
    pub const fn new(kind: CodeGenErrorKind, location: Option<Location>) -> Self { Self { kind, location } }
}

/// Erreur globale de compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Source invalide.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// AST non traduisible.
    #[error("code generation failed: {0}")]
    CodeGen(#[from] CodeGenError),
    /// Source map désalignée du bytecode.
    #[error("source map out of sync with bytecode: {0}")]
    Mapping(#[from] MappingError),
    /// Bytecode émis illisible par le désassembleur.
    #[error("emitted bytecode does not decode: {0}")]
    Decode(#[from] DecodeError),
}

/// Résultat de compilation.
pub type CompileResult<T> = Result<T, CompileError>;
