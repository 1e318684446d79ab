//! Word classification.
//!
//! Every word falls into exactly one of five categories, which the compiler
//! and the tree-walking evaluator both dispatch on. Classification is purely
//! structural: it looks at morpheme kinds and adjacency, never at content.

use strum::{Display, IntoStaticStr};

use crate::{
    error::{RunError, RunResult},
    syntax::{Morpheme, Word},
};

/// The five word categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum WordKind {
    /// Only comment morphemes; produces no code.
    Ignored,
    /// A single plain morpheme, lowered as its natural value.
    Root,
    /// Several stems concatenated at string level.
    Compound,
    /// A substitution marker, its source, and trailing selectors.
    Substitution,
    /// A selectable source followed by selectors, with no leading marker.
    Qualified,
}

/// Classifies a word.
///
/// # Errors
/// Returns an `InvalidWord` error when the morpheme sequence fits no
/// category, e.g. a selector with no preceding source or a block in the
/// middle of a compound word.
pub fn check_word(word: &Word) -> RunResult<WordKind> {
    let morphemes = &word.morphemes;
    let Some(first) = morphemes.first() else {
        return Err(RunError::invalid_word());
    };
    if morphemes.iter().all(Morpheme::is_comment) {
        return Ok(WordKind::Ignored);
    }
    if morphemes.iter().any(Morpheme::is_comment) {
        return Err(RunError::invalid_word());
    }
    if morphemes.len() == 1 {
        return match first {
            Morpheme::SubstituteNext { .. } => Err(RunError::invalid_word()),
            _ => Ok(WordKind::Root),
        };
    }
    match first {
        Morpheme::SubstituteNext { .. } => {
            if substitution_group_len(morphemes)? == morphemes.len() {
                Ok(WordKind::Substitution)
            } else {
                check_compound(morphemes)
            }
        }
        Morpheme::Literal(_) => {
            if morphemes[1..].iter().all(is_selector) {
                Ok(WordKind::Qualified)
            } else {
                check_compound(morphemes)
            }
        }
        // Tuples and blocks are only selectable sources: either the whole
        // word is source-plus-selectors or it is invalid
        Morpheme::Tuple(_) | Morpheme::Block { .. } => {
            if morphemes[1..].iter().all(is_selector) {
                Ok(WordKind::Qualified)
            } else {
                Err(RunError::invalid_word())
            }
        }
        Morpheme::Expression(_) => check_compound(morphemes),
        _ => Err(RunError::invalid_word()),
    }
}

/// Whether a morpheme can trail a source as a selector: `(...)` keyed,
/// `[...]` indexed, `{...}` generic.
#[must_use]
pub fn is_selector(morpheme: &Morpheme) -> bool {
    matches!(
        morpheme,
        Morpheme::Tuple(_) | Morpheme::Block { .. } | Morpheme::Expression(_)
    )
}

/// Length of the substitution group starting at `morphemes[0]` (which must
/// be a marker): the marker, a selectable source, and any number of
/// trailing selectors, greedily.
///
/// # Errors
/// Fails when the marker has no selectable source.
pub(crate) fn substitution_group_len(morphemes: &[Morpheme]) -> RunResult<usize> {
    debug_assert!(matches!(morphemes.first(), Some(Morpheme::SubstituteNext { .. })));
    match morphemes.get(1) {
        Some(Morpheme::Literal(_) | Morpheme::Tuple(_) | Morpheme::Block { .. } | Morpheme::Expression(_)) => {}
        _ => return Err(RunError::invalid_word()),
    }
    let selectors = morphemes[2..].iter().take_while(|m| is_selector(m)).count();
    Ok(2 + selectors)
}

/// Validates a compound word: a sequence of stems, each a literal, an
/// expression, or a complete substitution group. Tuples, blocks, and string
/// forms cannot stand alone as stems.
fn check_compound(morphemes: &[Morpheme]) -> RunResult<WordKind> {
    let mut i = 0;
    while i < morphemes.len() {
        match &morphemes[i] {
            Morpheme::Literal(_) | Morpheme::Expression(_) => i += 1,
            Morpheme::SubstituteNext { .. } => i += substitution_group_len(&morphemes[i..])?,
            _ => return Err(RunError::invalid_word()),
        }
    }
    Ok(WordKind::Compound)
}
