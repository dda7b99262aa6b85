//! Camel-case identifier normalization.

use std::collections::HashMap;

use crate::ast::pattern::REST_PREFIX;
use crate::ast::FunctionNode;
use crate::error::Result;
use crate::syntax;

// ============ Casing ============

/// `PARA_METER` -> `paraMeter`, `VARIABLE_NAME_3` -> `variableName3`.
///
/// Returns `name` unchanged when it has no alphanumeric word at all.
pub fn camel_case(name: &str) -> String {
    let words = split_words(name);
    if words.is_empty() {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    for (index, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if index == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() && c.is_numeric())
                || (prev.is_numeric() && c.is_alphabetic())
                // `HTMLParser`: the last capital of an acronym starts the next word
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Comparison key for a bound name: camel case without the rest prefix.
pub fn canonical_name(name: &str) -> String {
    camel_case(name.trim_start_matches(REST_PREFIX))
}

// ============ Matching ============

/// Case and separator insensitive lookup of known names.
#[derive(Debug, Clone, Default)]
pub struct NameMatcher {
    by_canonical: HashMap<String, String>,
}

impl NameMatcher {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_canonical = HashMap::new();
        for name in names {
            let name = name.as_ref();
            by_canonical
                .entry(canonical_name(name))
                .or_insert_with(|| name.trim_start_matches(REST_PREFIX).to_string());
        }
        Self { by_canonical }
    }

    /// The known name `name` refers to, without the rest prefix.
    pub fn matches(&self, name: &str) -> Option<&str> {
        self.by_canonical
            .get(&canonical_name(name))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_canonical.is_empty()
    }
}

// ============ Rewriting ============

/// Rename every identifier bound by a parameter or declaration to camel case.
///
/// The renamed text is parsed again, so positions in the result are relative
/// to the function text rather than to the file it came from. Function
/// expressions are parsed in expression position and keep their node type.
pub fn normalize(function: &FunctionNode) -> Result<FunctionNode> {
    let bindings = function.bindings()?;
    let matcher = NameMatcher::new(bindings.names());

    let tree = function.tree();
    let root = tree.root();
    let base = tree.node(root).span.start;

    let mut edits: Vec<(std::ops::Range<usize>, String)> = tree
        .descendants(root)
        .into_iter()
        .filter_map(|id| {
            let node = tree.node(id);
            if !node.is_identifier() || node.synthetic {
                return None;
            }
            let name = node.name.as_deref()?;
            matcher.matches(name)?;
            let renamed = camel_case(name);
            if renamed == name {
                return None;
            }
            let span = node.span.start - base..node.span.end - base;
            Some((span, renamed))
        })
        .collect();

    edits.sort_by_key(|(span, _)| span.start);
    let mut text = function.render().to_string();
    for (span, renamed) in edits.into_iter().rev() {
        text.replace_range(span, &renamed);
    }
    let tree = if function.node_type() == "FunctionExpression" {
        syntax::parse_function_expression(&text)?
    } else {
        syntax::parse_function(&text)?
    };
    Ok(FunctionNode { tree })
}
