//! Whitespace splitting for command settings
//!
//! Terms are separated by unquoted whitespace. A backslash makes the next
//! character literal, single or double quotes group text (the quotes are
//! dropped), and a bare unquoted `|` becomes a pipe separator.

/// One token of a split setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A literal word, quotes and escapes already resolved
    Word(String),
    /// The `|` separator between pipeline stages
    Pipe,
}

/// Split a command setting into terms
///
/// Fails only on an unterminated quote or a trailing lone backslash.
pub fn split_terms(input: &str) -> Result<Vec<Term>, &'static str> {
    let mut terms = Vec::new();
    let mut current = String::new();
    // A term exists once anything (even an empty quote pair) was seen
    let mut in_term = false;
    // Whether any part of the current term was quoted or escaped
    let mut literal = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let next = chars.next().ok_or("Dangling escape")?;
                current.push(next);
                in_term = true;
                literal = true;
            }
            '\'' | '"' => {
                let quote = c;
                loop {
                    match chars.next() {
                        Some(q) if q == quote => break,
                        // Backslash still escapes the quote char inside double quotes
                        Some('\\') if quote == '"' => {
                            let next = chars.next().ok_or("Dangling escape")?;
                            current.push(next);
                        }
                        Some(other) => current.push(other),
                        None => return Err("Unterminated quote"),
                    }
                }
                in_term = true;
                literal = true;
            }
            c if c.is_whitespace() => {
                if in_term {
                    terms.push(finish(&mut current, literal));
                    in_term = false;
                    literal = false;
                }
            }
            other => {
                current.push(other);
                in_term = true;
            }
        }
    }

    if in_term {
        terms.push(finish(&mut current, literal));
    }

    Ok(terms)
}

fn finish(current: &mut String, literal: bool) -> Term {
    let word = std::mem::take(current);
    if !literal && word == "|" {
        Term::Pipe
    } else {
        Term::Word(word)
    }
}
