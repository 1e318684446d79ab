//! Syntactic tree data: scripts, sentences, words, morphemes.
//!
//! The tree is homogeneous: a script is sentences, a sentence is words, a
//! word is morphemes. Nested scripts (tuple, block, expression morphemes)
//! are fully parsed before the containing morpheme is finalized; block
//! morphemes additionally retain their verbatim source so they can be
//! re-evaluated as strings later.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// An ordered sequence of sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub sentences: Vec<Sentence>,
}

/// An ordered sequence of words, evaluated together as one command
/// invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub words: Vec<Word>,
}

/// An ordered sequence of morphemes forming one argument slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub morphemes: Vec<Morpheme>,
}

/// The smallest syntactic unit of a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Morpheme {
    /// A run of literal text, escapes already applied.
    Literal(String),
    /// `(...)` — a nested script whose words become tuple elements.
    Tuple(Script),
    /// `{...}` — a nested script kept with its verbatim source text.
    Block {
        script: Rc<Script>,
        source: Rc<str>,
    },
    /// `[...]` — a nested script evaluated for its last sentence result.
    Expression(Script),
    /// `"..."` — stems joined into a single string at evaluation time.
    ///
    /// May contain any morpheme except another string at its top level.
    String(Vec<Morpheme>),
    /// `"""..."""` — verbatim content, no escape or substitution processing.
    HereString(String),
    /// `""TAG ... TAG` — verbatim content with closing-line indentation
    /// stripped from every line.
    TaggedString(String),
    LineComment(String),
    BlockComment(String),
    /// `$`... marker: dereference `levels` times, splice the result into the
    /// surrounding frame if `expansion` is set.
    SubstituteNext {
        levels: usize,
        expansion: bool,
    },
}

impl Morpheme {
    /// Whether this morpheme is a line or block comment.
    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::LineComment(_) | Self::BlockComment(_))
    }
}

impl Script {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}
