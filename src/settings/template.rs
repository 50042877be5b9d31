//! `${name}` templates
//!
//! A template is parsed once into literal and token segments. Tokens that do
//! not name a known field render back as their original text, and an
//! unterminated `${` is plain literal text.

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFormatter {
    template: String,
    segments: Vec<Segment>,
}

impl TokenFormatter {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            segments.push(Segment::Token(after[..end].to_string()));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Self {
            template: template.to_string(),
            segments,
        }
    }

    /// The template text as written
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Token names in order of appearance, duplicates included
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Token(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Tokens that name one of `all_names`, first appearance order, no duplicates
    pub fn used_field_names<'a, I>(&self, all_names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: Vec<&str> = all_names.into_iter().collect();
        let mut used: Vec<String> = Vec::new();
        for token in self.tokens() {
            if known.contains(&token) && !used.iter().any(|u| u == token) {
                used.push(token.to_string());
            }
        }
        used
    }

    /// Whether the template contains no tokens at all
    pub fn is_literal(&self) -> bool {
        self.tokens().next().is_none()
    }

    /// Substitute tokens left to right
    ///
    /// `resolve` returns `Ok(None)` for names it does not know; those tokens
    /// are kept verbatim. Substituted text is never scanned again.
    pub fn render<F>(&self, mut resolve: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<Option<String>>,
    {
        let mut out = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(name) => match resolve(name)? {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        Ok(out)
    }
}
