//! Prolog term text helpers shared by the SIR and LF converters.

/// A bare atom: lowercase letter followed by alphanumerics/underscores.
pub fn is_bare_atom(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A Prolog variable: uppercase letter or underscore, then word chars.
pub fn is_variable(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An integer or decimal literal.
pub fn is_number(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    if body.is_empty() {
        return false;
    }
    match body.split_once('.') {
        None => body.chars().all(|c| c.is_ascii_digit()),
        Some((int, frac)) => {
            !int.is_empty()
                && !frac.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
    }
}

/// Render an atom, single-quoting unless it is a bare lowercase
/// identifier.
pub fn format_atom(text: &str) -> String {
    if is_bare_atom(text) {
        text.to_string()
    } else {
        format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Render a SIR-style argument string: variables and numbers pass
/// through, everything else is treated as an atom.
pub fn format_argument(text: &str) -> String {
    if is_variable(text) || is_number(text) {
        text.to_string()
    } else {
        format_atom(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_atoms() {
        assert!(is_bare_atom("socrates"));
        assert!(is_bare_atom("is_blue2"));
        assert!(!is_bare_atom("Socrates"));
        assert!(!is_bare_atom("two words"));
        assert!(!is_bare_atom(""));
    }

    #[test]
    fn test_variables() {
        assert!(is_variable("X"));
        assert!(is_variable("_G12"));
        assert!(is_variable("Who"));
        assert!(!is_variable("x"));
    }

    #[test]
    fn test_numbers() {
        assert!(is_number("42"));
        assert!(is_number("-7"));
        assert!(is_number("3.14"));
        assert!(!is_number("3."));
        assert!(!is_number(".5"));
        assert!(!is_number("v1"));
    }

    #[test]
    fn test_atom_quoting() {
        assert_eq!(format_atom("socrates"), "socrates");
        assert_eq!(format_atom("New York"), "'New York'");
        assert_eq!(format_atom("it's"), "'it\\'s'");
    }

    #[test]
    fn test_argument_rendering() {
        assert_eq!(format_argument("X"), "X");
        assert_eq!(format_argument("42"), "42");
        assert_eq!(format_argument("sky"), "sky");
        assert_eq!(format_argument("the sky"), "'the sky'");
    }
}
