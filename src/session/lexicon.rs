//! Clause utilities: lexicon derivation and knowledge-base splitting.
//!
//! The lexicon indexes a session's predicates as `name/arity` tokens so
//! prompts can steer the LLM toward predicates that already exist. Parsing
//! here is deliberately shallow — a head-only scan with paren-balanced,
//! quote-aware argument counting — because full term parsing belongs to
//! the engine.

use std::collections::BTreeSet;

/// Strip a `%` line comment, honoring quoted atoms and strings.
pub fn strip_line_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '%') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split a knowledge-base text into clause chunks.
///
/// Lines accumulate into a chunk until one ends with `.` outside comments
/// and quotes; each chunk is one clause string. Inverse of joining facts
/// with newlines, so `set_knowledge_base(get_knowledge_base(s))` round-trips.
pub fn split_clauses(text: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let meaningful = strip_line_comment(line).trim_end();
        if meaningful.trim().is_empty() && current.is_empty() {
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        if meaningful.ends_with('.') {
            clauses.push(std::mem::take(&mut current).trim().to_string());
        }
    }
    if !current.trim().is_empty() {
        clauses.push(current.trim().to_string());
    }
    clauses
}

/// Derive the `name/arity` indicator for a clause's head.
///
/// For a rule `H :- B.` only `H` is examined. Returns `None` (after a
/// warning) for anything that is not a callable head — such clauses still
/// live in the facts list, they just don't index.
pub fn predicate_indicator(clause: &str) -> Option<String> {
    let stripped: String = clause
        .lines()
        .map(strip_line_comment)
        .collect::<Vec<_>>()
        .join("\n");
    let stripped = stripped.trim();

    let body = stripped.strip_suffix('.')?;
    let head = match find_top_level(body, ":-") {
        Some(pos) => &body[..pos],
        None => body,
    };
    let head = head.trim();
    if head.is_empty() {
        return None;
    }

    if let Some(open) = find_top_level_char(head, '(') {
        let name = head[..open].trim();
        if !is_atom(name) {
            tracing::warn!(clause, "skipping lexicon entry: head is not an atom");
            return None;
        }
        let rest = head[open + 1..].trim_end();
        let args = match rest.strip_suffix(')') {
            Some(args) => args,
            None => {
                tracing::warn!(clause, "skipping lexicon entry: unbalanced head");
                return None;
            }
        };
        if args.trim().is_empty() {
            tracing::warn!(clause, "skipping lexicon entry: empty argument list");
            return None;
        }
        let arity = count_top_level_args(args);
        Some(format!("{}/{}", unquote(name), arity))
    } else if is_atom(head) {
        Some(format!("{}/0", unquote(head)))
    } else {
        tracing::warn!(clause, "skipping lexicon entry: unrecognized head shape");
        None
    }
}

/// Derive the full lexicon for a set of clauses.
pub fn derive_lexicon<'a>(clauses: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    clauses
        .into_iter()
        .filter_map(predicate_indicator)
        .collect()
}

/// Format a lexicon for prompt injection.
pub fn lexicon_summary(lexicon: &BTreeSet<String>) -> String {
    if lexicon.is_empty() {
        "No predicates defined yet.".to_string()
    } else {
        lexicon
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Find `needle` at paren depth zero, outside quotes.
fn find_top_level(text: &str, needle: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match (quote, c) {
            (Some(_), b'\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, b'\'') | (None, b'"') => quote = Some(c),
            (None, b'(') | (None, b'[') | (None, b'{') => depth += 1,
            (None, b')') | (None, b']') | (None, b'}') => depth -= 1,
            (None, _) if depth == 0
                && text.is_char_boundary(i)
                && text[i..].starts_with(needle) =>
            {
                return Some(i)
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Find the first `target` char at depth zero, outside quotes.
fn find_top_level_char(text: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, c) if c == target => return Some(i),
            _ => {}
        }
    }
    None
}

/// Count comma-separated arguments at depth zero, outside quotes.
fn count_top_level_args(args: &str) -> usize {
    let mut count = 1;
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in args.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '(') | (None, '[') | (None, '{') => depth += 1,
            (None, ')') | (None, ']') | (None, '}') => depth -= 1,
            (None, ',') if depth == 0 => count += 1,
            _ => {}
        }
    }
    count
}

fn is_atom(text: &str) -> bool {
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        return true;
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(atom: &str) -> &str {
    if atom.len() >= 2 && atom.starts_with('\'') && atom.ends_with('\'') {
        &atom[1..atom.len() - 1]
    } else {
        atom
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn clause_strategy() -> impl Strategy<Value = String> {
        (
            "[a-z][a-z0-9_]{0,5}",
            prop::collection::vec("[a-z][a-z0-9_]{0,5}", 0..3),
        )
            .prop_map(|(predicate, args)| {
                if args.is_empty() {
                    format!("{predicate}.")
                } else {
                    format!("{}({}).", predicate, args.join(", "))
                }
            })
    }

    proptest! {
        // set_knowledge_base(get_knowledge_base(s)) must not change the
        // facts, so splitting must invert joining.
        #[test]
        fn test_split_inverts_join(clauses in prop::collection::vec(clause_strategy(), 0..8)) {
            let text = clauses.join("\n");
            prop_assert_eq!(split_clauses(&text), clauses);
        }

        // Every lexicon entry must be witnessed by some clause.
        #[test]
        fn test_lexicon_soundness(clauses in prop::collection::vec(clause_strategy(), 0..8)) {
            let lexicon = derive_lexicon(clauses.iter().map(String::as_str));
            for entry in &lexicon {
                prop_assert!(clauses.iter().any(
                    |c| predicate_indicator(c).as_deref() == Some(entry.as_str())
                ));
            }
        }
    }
}
