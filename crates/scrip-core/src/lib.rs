//! scrip-core - primitives partagées du compilateur Scrip
//!
//! Fournit :
//! - `SourceId`, `Pos`, `Span`, `Spanned<T>` (jetons du lexer)
//! - `Location` : plage source immuable avec ligne/colonne et extraction de texte
//! - `script` : table d'opcodes, encodage minimal des pushes, désassembleur,
//!   rendu/lecture ASM et regroupement ASM par ligne source
//! - `source_map` : une entrée de localisation par instruction émise
//!
//! Features :
//! - `serde` : derive (dé)sérialisation sur `Location`, `SourceMap`, etc.

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Plages source avec ligne/colonne (`Location`).
pub mod location;
/// Opcodes, encodage, désassemblage et cartes ligne → ASM.
pub mod script;
/// Source map : une localisation par instruction.
pub mod source_map;

pub use location::Location;
pub use source_map::{PositionHint, SourceLocation, SourceMap, SourceMapError};

/* ─────────────────────────── Spans / Positions ─────────────────────────── */

/// Identifiant de source (fichier, buffer, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceId(pub u32);

/// Position (offset byte) depuis le début de la source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pos(pub u32);

impl Pos {
    /// Position nulle.
    pub const ZERO: Self = Self(0);
    /// Addition saturée.
    #[must_use]
    pub const fn saturating_add(self, v: u32) -> Self { Self(self.0.saturating_add(v)) }
}

/// Plage (demi-ouverte) `[start, end)` dans une source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Source d’où provient l’item.
    pub source: SourceId,
    /// Début inclus.
    pub start: Pos,
    /// Fin exclue.
    pub end: Pos,
}

impl Span {
    /// Crée un span.
    pub const fn new(source: SourceId, start: Pos, end: Pos) -> Self { Self { source, start, end } }
    /// Longueur en bytes.
    pub const fn len(&self) -> u32 { self.end.0.saturating_sub(self.start.0) }
    /// Vrai si le span est vide.
    pub const fn is_empty(&self) -> bool { self.start.0 >= self.end.0 }
    /// Union de deux spans de la même source (`start` de `self`, `end` de `other`).
    #[must_use]
    pub const fn to(self, other: Self) -> Self { Self { source: self.source, start: self.start, end: other.end } }
}

/// Wrapper utilitaire « valeur + span ».
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spanned<T> {
    /// La valeur.
    pub value: T,
    /// La localisation.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Construit un `Spanned<T>`.
    pub const fn new(value: T, span: Span) -> Self { Self { value, span } }
    /// Applique une fonction à la valeur et conserve le span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> { Spanned { value: f(self.value), span: self.span } }
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::script::{
        asm_to_script, build_line_to_asm_map, bytecode_to_asm, bytecode_to_script, script_to_asm,
        script_to_bytecode, DecodeError, LineToAsmMap, MappingError, Opcode, PushOp, ScriptOp,
    };
    pub use super::{
        Location, Pos, PositionHint, SourceId, SourceLocation, SourceMap, Span, Spanned,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_len_and_join() {
        let a = Span::new(SourceId(0), Pos(2), Pos(5));
        let b = Span::new(SourceId(0), Pos(9), Pos(12));
        assert_eq!(a.len(), 3);
        assert!(!a.is_empty());
        let j = a.to(b);
        assert_eq!((j.start, j.end), (Pos(2), Pos(12)));
    }

    #[test]
    fn spanned_map_keeps_span() {
        let sp = Span::new(SourceId(1), Pos::ZERO, Pos(1).saturating_add(3));
        let v = Spanned::new(21, sp).map(|x| x * 2);
        assert_eq!(v.value, 42);
        assert_eq!(v.span.end, Pos(4));
    }
}
