//! Token stream to syntax tree conversion.
//!
//! The parser runs a context stack: the active context decides how each
//! token is handled. Scripts (top level and nested in tuples, blocks, and
//! expressions) share one set of rules; strings, here-strings, tagged
//! strings, and comments each have their own. The stack is what lets `(`,
//! `{`, and `[` open nested morphemes inside strings.

use std::{mem, rc::Rc};

use crate::{
    error::{RunError, RunResult},
    syntax::{Morpheme, Script, Sentence, Word},
    tokenizer::{Token, TokenKind, tokenize},
};

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Maximum context nesting depth. Parsing is iterative, but the later
    /// classification and compilation passes recurse over the tree, so
    /// pathological nesting is rejected up front.
    pub max_nesting_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { max_nesting_depth: 200 }
    }
}

/// Parses a source string into a script.
///
/// # Errors
/// Returns a syntax error for unmatched or mismatched delimiters, unclosed
/// string forms, unclosed block comments, and nesting overflow.
pub fn parse(source: &str) -> RunResult<Script> {
    parse_with_options(source, &ParserOptions::default())
}

/// Parses with explicit options.
///
/// # Errors
/// See [`parse`].
pub fn parse_with_options(source: &str, options: &ParserOptions) -> RunResult<Script> {
    let tokens = tokenize(source);
    Parser {
        source,
        tokens,
        options: options.clone(),
    }
    .run()
}

/// A pending substitution marker: dollars seen, waiting for its source.
#[derive(Debug, Clone, Copy)]
struct Substitution {
    levels: usize,
    expansion: bool,
}

impl Default for Substitution {
    fn default() -> Self {
        Self {
            levels: 1,
            expansion: false,
        }
    }
}

/// Accumulates the morphemes of one word (or of a string's stems).
///
/// Contiguous text and escape literals merge into a single literal morpheme;
/// substitution markers stay pending until a source morpheme binds them, and
/// degrade to literal text when none does.
#[derive(Debug, Default)]
struct WordBuilder {
    morphemes: Vec<Morpheme>,
    literal: String,
    pending: Option<Substitution>,
}

impl WordBuilder {
    fn is_empty(&self) -> bool {
        self.morphemes.is_empty() && self.literal.is_empty() && self.pending.is_none()
    }

    fn push_text(&mut self, text: &str) {
        self.literal.push_str(text);
    }

    /// Ends any in-progress substitution before appending separator text.
    /// String contexts use this for whitespace and sentence separators,
    /// which are literal content there but still terminate variable names.
    fn push_breaking_text(&mut self, text: &str) {
        if self.pending.is_some() {
            self.commit_literal();
            self.degrade_pending();
        }
        self.literal.push_str(text);
    }

    /// Marks one more `$`.
    fn dollar(&mut self) {
        if self.literal.is_empty() {
            if let Some(sub) = self.pending.as_mut() {
                if sub.expansion {
                    // `$*` already complete: it stands alone, a new marker opens
                    let levels = sub.levels;
                    self.morphemes.push(Morpheme::SubstituteNext {
                        levels,
                        expansion: true,
                    });
                    self.pending = Some(Substitution::default());
                } else {
                    sub.levels += 1;
                }
                return;
            }
            self.pending = Some(Substitution::default());
            return;
        }
        self.commit_literal();
        self.pending = Some(Substitution::default());
    }

    /// `*` directly after a dollar run marks expansion; anywhere else it is
    /// plain text.
    fn asterisk(&mut self) {
        if self.literal.is_empty() {
            if let Some(sub) = self.pending.as_mut() {
                if !sub.expansion {
                    sub.expansion = true;
                    return;
                }
            }
        }
        self.literal.push('*');
    }

    /// Appends a completed morpheme. Tuples, blocks, and expressions bind a
    /// pending substitution marker; anything else degrades it to text first.
    fn add_morpheme(&mut self, morpheme: Morpheme) {
        self.commit_literal();
        if self.pending.is_some() {
            if matches!(
                morpheme,
                Morpheme::Tuple(_) | Morpheme::Block { .. } | Morpheme::Expression(_)
            ) {
                self.commit_pending();
            } else {
                self.degrade_pending();
            }
        }
        self.morphemes.push(morpheme);
    }

    /// Flushes the literal buffer into a literal morpheme, binding a pending
    /// substitution marker to it.
    fn commit_literal(&mut self) {
        if self.literal.is_empty() {
            return;
        }
        self.commit_pending();
        let text = mem::take(&mut self.literal);
        self.morphemes.push(Morpheme::Literal(text));
    }

    fn commit_pending(&mut self) {
        if let Some(sub) = self.pending.take() {
            self.morphemes.push(Morpheme::SubstituteNext {
                levels: sub.levels,
                expansion: sub.expansion,
            });
        }
    }

    /// A trailing marker not followed by a substitutable morpheme reads back
    /// as the literal dollars.
    fn degrade_pending(&mut self) {
        if let Some(sub) = self.pending.take() {
            let mut text = "$".repeat(sub.levels);
            if sub.expansion {
                text.push('*');
            }
            self.morphemes.push(Morpheme::Literal(text));
        }
    }

    /// Ends the word, returning `None` when nothing accumulated.
    fn finish(&mut self) -> Option<Word> {
        let morphemes = self.finish_stems();
        if morphemes.is_empty() {
            None
        } else {
            Some(Word { morphemes })
        }
    }

    /// Ends a stem sequence (string context), which may legitimately be
    /// empty.
    fn finish_stems(&mut self) -> Vec<Morpheme> {
        self.commit_literal();
        self.degrade_pending();
        mem::take(&mut self.morphemes)
    }
}

/// What a script-like context is nested in, which decides both its closing
/// token and the morpheme it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptKind {
    Script,
    Tuple,
    Block,
    Expression,
}

#[derive(Debug)]
struct ScriptContext {
    kind: ScriptKind,
    script: Script,
    sentence: Sentence,
    word: WordBuilder,
    /// Byte index just past the opening token; blocks slice their verbatim
    /// source from here to the closing token.
    open_index: usize,
}

impl ScriptContext {
    fn new(kind: ScriptKind, open_index: usize) -> Self {
        Self {
            kind,
            script: Script::default(),
            sentence: Sentence::default(),
            word: WordBuilder::default(),
            open_index,
        }
    }

    fn end_word(&mut self) {
        if let Some(word) = self.word.finish() {
            self.sentence.words.push(word);
        }
    }

    fn end_sentence(&mut self) {
        self.end_word();
        if !self.sentence.words.is_empty() {
            self.script.sentences.push(mem::take(&mut self.sentence));
        }
    }

    fn finish(&mut self) -> Script {
        self.end_sentence();
        mem::take(&mut self.script)
    }
}

#[derive(Debug, Default)]
struct StringContext {
    builder: WordBuilder,
}

#[derive(Debug)]
struct HereStringContext {
    /// Length of the opening quote run; the closing run must be at least as
    /// long, with any excess leading quotes kept as content.
    delimiter: usize,
    content: String,
}

#[derive(Debug)]
struct TaggedStringContext {
    tag: String,
    lines: Vec<String>,
    line: String,
    at_line_start: bool,
}

#[derive(Debug, Default)]
struct LineCommentContext {
    content: String,
}

#[derive(Debug)]
struct BlockCommentContext {
    hashes: usize,
    depth: usize,
    content: String,
}

#[derive(Debug)]
enum Context {
    Script(ScriptContext),
    String(StringContext),
    HereString(HereStringContext),
    TaggedString(TaggedStringContext),
    LineComment(LineCommentContext),
    BlockComment(BlockCommentContext),
}

/// What to do after a context handled one token.
enum Step {
    /// Consume `n` tokens and continue in the same context.
    Advance(usize),
    /// Push a child context, consuming `n` tokens.
    Open(Context, usize),
    /// Pop the current context, hand the produced morpheme to the parent,
    /// and consume `n` tokens (0 lets the parent reprocess the token).
    Emit(Morpheme, usize),
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    options: ParserOptions,
}

impl Parser<'_> {
    fn run(self) -> RunResult<Script> {
        let mut stack = vec![Context::Script(ScriptContext::new(ScriptKind::Script, 0))];
        let mut i = 0;
        while i < self.tokens.len() {
            let step = match stack.last_mut().expect("context stack underflow") {
                Context::Script(ctx) => self.script_token(ctx, i)?,
                Context::String(ctx) => self.string_token(ctx, i)?,
                Context::HereString(ctx) => self.here_string_token(ctx, i),
                Context::TaggedString(ctx) => self.tagged_string_token(ctx, i),
                Context::LineComment(ctx) => self.line_comment_token(ctx, i),
                Context::BlockComment(ctx) => self.block_comment_token(ctx, i),
            };
            match step {
                Step::Advance(n) => i += n,
                Step::Open(context, n) => {
                    if stack.len() >= self.options.max_nesting_depth {
                        return Err(RunError::syntax("maximum nesting depth exceeded"));
                    }
                    stack.push(context);
                    i += n;
                }
                Step::Emit(morpheme, n) => {
                    stack.pop();
                    add_to_parent(&mut stack, morpheme);
                    i += n;
                }
            }
        }
        // End of input: only line comments close gracefully, and the root
        // context yields the script.
        loop {
            match stack.pop().expect("context stack underflow") {
                Context::Script(mut ctx) => {
                    return match ctx.kind {
                        ScriptKind::Script => Ok(ctx.finish()),
                        ScriptKind::Tuple => Err(RunError::syntax("unmatched left parenthesis")),
                        ScriptKind::Block => Err(RunError::syntax("unmatched left brace")),
                        ScriptKind::Expression => Err(RunError::syntax("unmatched left bracket")),
                    };
                }
                Context::String(_) => return Err(RunError::syntax("unmatched string delimiter")),
                Context::HereString(_) => return Err(RunError::syntax("unmatched here-string delimiter")),
                Context::TaggedString(_) => return Err(RunError::syntax("unmatched tagged string delimiter")),
                Context::BlockComment(_) => return Err(RunError::syntax("unmatched block comment delimiter")),
                Context::LineComment(mut ctx) => {
                    let content = mem::take(&mut ctx.content);
                    add_to_parent(&mut stack, Morpheme::LineComment(content));
                }
            }
        }
    }

    fn script_token(&self, ctx: &mut ScriptContext, i: usize) -> RunResult<Step> {
        let token = &self.tokens[i];
        Ok(match token.kind {
            TokenKind::Whitespace | TokenKind::Continuation => {
                ctx.end_word();
                Step::Advance(1)
            }
            TokenKind::Newline | TokenKind::Semicolon => {
                ctx.end_sentence();
                Step::Advance(1)
            }
            TokenKind::Text | TokenKind::Escape => {
                ctx.word.push_text(&token.literal);
                Step::Advance(1)
            }
            TokenKind::Dollar => {
                ctx.word.dollar();
                Step::Advance(1)
            }
            TokenKind::Asterisk => {
                ctx.word.asterisk();
                Step::Advance(1)
            }
            TokenKind::OpenTuple => self.open_script(ScriptKind::Tuple, token),
            TokenKind::OpenBlock => self.open_script(ScriptKind::Block, token),
            TokenKind::OpenExpression => self.open_script(ScriptKind::Expression, token),
            TokenKind::CloseTuple => self.close_script(ctx, ScriptKind::Tuple, i, "parenthesis")?,
            TokenKind::CloseBlock => self.close_script(ctx, ScriptKind::Block, i, "brace")?,
            TokenKind::CloseExpression => self.close_script(ctx, ScriptKind::Expression, i, "bracket")?,
            TokenKind::Comment => {
                if ctx.word.is_empty() {
                    let hashes = token.literal.len();
                    if self.kind_at(i + 1) == Some(TokenKind::OpenBlock) {
                        Step::Open(
                            Context::BlockComment(BlockCommentContext {
                                hashes,
                                depth: 1,
                                content: String::new(),
                            }),
                            2,
                        )
                    } else {
                        Step::Open(Context::LineComment(LineCommentContext::default()), 1)
                    }
                } else {
                    ctx.word.push_text(&token.literal);
                    Step::Advance(1)
                }
            }
            TokenKind::StringDelimiter => match token.literal.len() {
                1 => Step::Open(Context::String(StringContext::default()), 1),
                2 => {
                    // `""` opens a tagged string when a tag and a newline
                    // follow; otherwise it is an empty string
                    if self.kind_at(i + 1) == Some(TokenKind::Text)
                        && self.kind_at(i + 2) == Some(TokenKind::Newline)
                    {
                        Step::Open(
                            Context::TaggedString(TaggedStringContext {
                                tag: self.tokens[i + 1].literal.clone(),
                                lines: Vec::new(),
                                line: String::new(),
                                at_line_start: true,
                            }),
                            3,
                        )
                    } else {
                        ctx.word.add_morpheme(Morpheme::String(Vec::new()));
                        Step::Advance(1)
                    }
                }
                _ => Step::Open(
                    Context::HereString(HereStringContext {
                        delimiter: token.literal.len(),
                        content: String::new(),
                    }),
                    1,
                ),
            },
        })
    }

    fn open_script(&self, kind: ScriptKind, token: &Token) -> Step {
        Step::Open(
            Context::Script(ScriptContext::new(kind, token.position.index + token.len)),
            1,
        )
    }

    /// Handles a closing delimiter in a script-like context. A matching kind
    /// closes the context into its morpheme; anything else is a delimiter
    /// error.
    fn close_script(&self, ctx: &mut ScriptContext, kind: ScriptKind, i: usize, name: &str) -> RunResult<Step> {
        if ctx.kind != kind {
            return if ctx.kind == ScriptKind::Script {
                Err(RunError::syntax(format!("unmatched right {name}")))
            } else {
                Err(RunError::syntax(format!("mismatched right {name}")))
            };
        }
        let script = ctx.finish();
        let morpheme = match kind {
            ScriptKind::Tuple => Morpheme::Tuple(script),
            ScriptKind::Expression => Morpheme::Expression(script),
            ScriptKind::Block => {
                let raw = &self.source[ctx.open_index..self.tokens[i].position.index];
                Morpheme::Block {
                    script: Rc::new(script),
                    source: Rc::from(raw),
                }
            }
            ScriptKind::Script => unreachable!("root context has no closing delimiter"),
        };
        Ok(Step::Emit(morpheme, 1))
    }

    fn string_token(&self, ctx: &mut StringContext, i: usize) -> RunResult<Step> {
        let token = &self.tokens[i];
        Ok(match token.kind {
            TokenKind::StringDelimiter => {
                if token.literal.len() == 1 {
                    Step::Emit(Morpheme::String(ctx.builder.finish_stems()), 1)
                } else {
                    return Err(RunError::syntax("extra characters after string delimiter"));
                }
            }
            TokenKind::Text | TokenKind::Escape | TokenKind::Comment => {
                ctx.builder.push_text(&token.literal);
                Step::Advance(1)
            }
            TokenKind::Whitespace => {
                ctx.builder.push_breaking_text(&token.literal);
                Step::Advance(1)
            }
            TokenKind::Newline => {
                ctx.builder.push_breaking_text("\n");
                Step::Advance(1)
            }
            TokenKind::Continuation => {
                ctx.builder.push_breaking_text(" ");
                Step::Advance(1)
            }
            TokenKind::Semicolon => {
                ctx.builder.push_breaking_text(";");
                Step::Advance(1)
            }
            TokenKind::Dollar => {
                ctx.builder.dollar();
                Step::Advance(1)
            }
            TokenKind::Asterisk => {
                ctx.builder.asterisk();
                Step::Advance(1)
            }
            TokenKind::OpenTuple => self.open_script(ScriptKind::Tuple, token),
            TokenKind::OpenBlock => self.open_script(ScriptKind::Block, token),
            TokenKind::OpenExpression => self.open_script(ScriptKind::Expression, token),
            TokenKind::CloseTuple => return Err(RunError::syntax("mismatched right parenthesis")),
            TokenKind::CloseBlock => return Err(RunError::syntax("mismatched right brace")),
            TokenKind::CloseExpression => return Err(RunError::syntax("mismatched right bracket")),
        })
    }

    fn here_string_token(&self, ctx: &mut HereStringContext, i: usize) -> Step {
        let token = &self.tokens[i];
        if token.kind == TokenKind::StringDelimiter && token.literal.len() >= ctx.delimiter {
            // Excess leading quotes in a longer closing run stay in the content
            for _ in 0..token.literal.len() - ctx.delimiter {
                ctx.content.push('"');
            }
            return Step::Emit(Morpheme::HereString(mem::take(&mut ctx.content)), 1);
        }
        ctx.content.push_str(token.raw(self.source));
        Step::Advance(1)
    }

    fn tagged_string_token(&self, ctx: &mut TaggedStringContext, i: usize) -> Step {
        if ctx.at_line_start {
            // A line holding only optional indentation and the tag closes the
            // string; its indentation is stripped from every content line.
            let mut j = i;
            let mut indent = "";
            if self.kind_at(j) == Some(TokenKind::Whitespace) {
                indent = self.tokens[j].raw(self.source);
                j += 1;
            }
            if self.kind_at(j) == Some(TokenKind::Text)
                && self.tokens[j].literal == ctx.tag
                && matches!(self.kind_at(j + 1), None | Some(TokenKind::Newline))
            {
                let mut content = String::new();
                for line in &ctx.lines {
                    content.push_str(line.strip_prefix(indent).unwrap_or(line));
                    content.push('\n');
                }
                // The trailing newline stays with the parent to terminate the
                // sentence as usual
                return Step::Emit(Morpheme::TaggedString(content), j + 1 - i);
            }
        }
        let token = &self.tokens[i];
        if token.kind == TokenKind::Newline {
            ctx.lines.push(mem::take(&mut ctx.line));
            ctx.at_line_start = true;
        } else {
            ctx.line.push_str(token.raw(self.source));
            ctx.at_line_start = false;
        }
        Step::Advance(1)
    }

    fn line_comment_token(&self, ctx: &mut LineCommentContext, i: usize) -> Step {
        let token = &self.tokens[i];
        if token.kind == TokenKind::Newline {
            // The newline is left for the parent to end the sentence
            Step::Emit(Morpheme::LineComment(mem::take(&mut ctx.content)), 0)
        } else {
            ctx.content.push_str(token.raw(self.source));
            Step::Advance(1)
        }
    }

    fn block_comment_token(&self, ctx: &mut BlockCommentContext, i: usize) -> Step {
        let token = &self.tokens[i];
        match token.kind {
            TokenKind::Comment
                if token.literal.len() == ctx.hashes && self.kind_at(i + 1) == Some(TokenKind::OpenBlock) =>
            {
                ctx.depth += 1;
                ctx.content.push_str(token.raw(self.source));
                ctx.content.push_str(self.tokens[i + 1].raw(self.source));
                Step::Advance(2)
            }
            TokenKind::CloseBlock
                if self.kind_at(i + 1) == Some(TokenKind::Comment)
                    && self.tokens[i + 1].literal.len() == ctx.hashes =>
            {
                ctx.depth -= 1;
                if ctx.depth == 0 {
                    Step::Emit(Morpheme::BlockComment(mem::take(&mut ctx.content)), 2)
                } else {
                    ctx.content.push_str(token.raw(self.source));
                    ctx.content.push_str(self.tokens[i + 1].raw(self.source));
                    Step::Advance(2)
                }
            }
            _ => {
                ctx.content.push_str(token.raw(self.source));
                Step::Advance(1)
            }
        }
    }

    fn kind_at(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }
}

/// Hands a completed morpheme to the context that opened it.
fn add_to_parent(stack: &mut [Context], morpheme: Morpheme) {
    match stack.last_mut() {
        Some(Context::Script(ctx)) => ctx.word.add_morpheme(morpheme),
        Some(Context::String(ctx)) => ctx.builder.add_morpheme(morpheme),
        _ => unreachable!("only scripts and strings nest morphemes"),
    }
}
