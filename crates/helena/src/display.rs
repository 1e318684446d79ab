//! Canonical source rendering for values and selectors.
//!
//! Rendering produces text that reparses to an equivalent construct. Strings
//! with no special characters render as bare words; anything else is quoted,
//! with delimiters escaped through numeric escapes since they have no
//! single-character escape form. Values with no displayable form render as a
//! block-comment placeholder.

use std::fmt::{self, Write};

use crate::{selector::Selector, value::Value};

/// Placeholder for values with no canonical source form.
pub const UNDISPLAYABLE: &str = "{#{undisplayable value}#}";

/// Renders a string as a source word, bare when possible, quoted otherwise.
#[must_use]
pub fn display_word(text: &str) -> String {
    let mut out = String::new();
    write_word(&mut out, text).expect("string formatting cannot fail");
    out
}

fn is_bare_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_control() && !matches!(c, '\\' | '"' | '$' | '(' | ')' | '{' | '}' | '[' | ']' | '#' | ';' | '*')
}

fn write_word(f: &mut impl Write, text: &str) -> fmt::Result {
    if !text.is_empty() && text.chars().all(is_bare_char) {
        return f.write_str(text);
    }
    f.write_char('"')?;
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\x07' => f.write_str("\\a")?,
            '\x08' => f.write_str("\\b")?,
            '\x0c' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\x0b' => f.write_str("\\v")?,
            // Delimiters and the substitution marker have no single-char
            // escape; the numeric form reparses to the same character
            '"' | '$' | '(' | ')' | '{' | '}' | '[' | ']' => write!(f, "\\x{:02x}", c as u32)?,
            c if c.is_control() => {
                if (c as u32) <= 0xff {
                    write!(f, "\\x{:02x}", c as u32)?;
                } else {
                    write!(f, "\\u{:04x}", c as u32)?;
                }
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Writes the canonical rendering of a value.
pub(crate) fn display_value(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Boolean(_) | Value::Integer(_) | Value::Real(_) | Value::String(_) => {
            let text = value.as_string().expect("scalar values always stringify");
            write_word(f, &text)
        }
        Value::Tuple(items) => {
            f.write_char('(')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_char(' ')?;
                }
                display_value(item, f)?;
            }
            f.write_char(')')
        }
        Value::Script(script) => match &script.source {
            Some(source) => write!(f, "{{{source}}}"),
            None => f.write_str(UNDISPLAYABLE),
        },
        Value::Qualified(qualified) => {
            display_value(&qualified.source, f)?;
            for selector in &qualified.selectors {
                display_selector(selector, f)?;
            }
            Ok(())
        }
        Value::Custom(custom) => match custom.as_string() {
            Ok(text) => write_word(f, &text),
            Err(_) => f.write_str(UNDISPLAYABLE),
        },
        Value::Nil | Value::List(_) | Value::Dictionary(_) => f.write_str(UNDISPLAYABLE),
    }
}

/// Writes the canonical rendering of a selector.
pub(crate) fn display_selector(selector: &Selector, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match selector {
        Selector::Indexed(indexed) => {
            f.write_char('[')?;
            display_value(&indexed.index, f)?;
            f.write_char(']')
        }
        Selector::Keyed(keyed) => {
            f.write_char('(')?;
            for (i, key) in keyed.keys.iter().enumerate() {
                if i > 0 {
                    f.write_char(' ')?;
                }
                display_value(key, f)?;
            }
            f.write_char(')')
        }
        Selector::Generic(generic) => {
            f.write_char('{')?;
            for (i, rule) in generic.rules.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                // Each rule is a sentence: a tuple renders as its words
                match rule {
                    Value::Tuple(words) => {
                        for (j, word) in words.iter().enumerate() {
                            if j > 0 {
                                f.write_char(' ')?;
                            }
                            display_value(word, f)?;
                        }
                    }
                    other => display_value(other, f)?,
                }
            }
            f.write_char('}')
        }
        Selector::Custom(custom) => f.write_str(&custom.render()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        selector::{GenericSelector, IndexedSelector, KeyedSelector},
        value::Value,
    };

    #[test]
    fn plain_strings_render_bare() {
        assert_eq!(display_word("abc"), "abc");
        assert_eq!(display_word("a-b_c.d"), "a-b_c.d");
    }

    #[test]
    fn special_strings_render_quoted() {
        assert_eq!(display_word(""), "\"\"");
        assert_eq!(display_word("a b"), "\"a b\"");
        assert_eq!(display_word("a\nb"), "\"a\\nb\"");
        assert_eq!(display_word("a$b"), "\"a\\x24b\"");
        assert_eq!(display_word("a\"b"), "\"a\\x22b\"");
    }

    #[test]
    fn tuples_render_parenthesized() {
        let t = Value::tuple(vec![Value::from("a"), Value::from("b c")]);
        assert_eq!(t.to_string(), "(a \"b c\")");
    }

    #[test]
    fn selectors_render_canonically() {
        let indexed = Selector::Indexed(IndexedSelector::new(Value::from(1i64)).unwrap());
        assert_eq!(indexed.to_string(), "[1]");

        let keyed = Selector::Keyed(KeyedSelector::new(vec![Value::from("k1"), Value::from("k2")]).unwrap());
        assert_eq!(keyed.to_string(), "(k1 k2)");

        let generic = Selector::Generic(
            GenericSelector::new(vec![
                Value::tuple(vec![Value::from("rule1"), Value::from("arg1")]),
                Value::tuple(vec![Value::from("rule2")]),
            ])
            .unwrap(),
        );
        assert_eq!(generic.to_string(), "{rule1 arg1; rule2}");
    }

    #[test]
    fn qualified_values_render_source_and_selectors() {
        let q = Value::qualified(Value::from("name"));
        let q = q.select_key(&Value::from("k")).unwrap();
        let q = q.select_index(&Value::from(0i64)).unwrap();
        assert_eq!(q.to_string(), "name(k)[0]");
    }

    #[test]
    fn undisplayable_values_use_the_placeholder() {
        assert_eq!(Value::Nil.to_string(), UNDISPLAYABLE);
        assert_eq!(Value::list(vec![]).to_string(), UNDISPLAYABLE);
    }
}
