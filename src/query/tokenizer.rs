//! Quote-aware scanner for the where-clause DSL

use crate::{Error, Result};

/// A whitespace-delimited token with its byte span in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    /// Token contains a quoted literal somewhere inside it
    pub quoted: bool,
}

impl Token<'_> {
    /// Lowercased keyword, if this token is a bare word
    pub fn keyword(&self) -> Option<String> {
        (!self.quoted).then(|| self.text.to_ascii_lowercase())
    }

    /// Whether this is the given bare keyword (case-insensitive)
    pub fn is_keyword(&self, word: &str) -> bool {
        !self.quoted && self.text.eq_ignore_ascii_case(word)
    }
}

/// Split `input` into tokens. Whitespace inside single or double quotes does
/// not split; a backslash escapes the next character inside quotes.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut quoted = false;
    let mut in_quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if let Some(q) = in_quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                in_quote = None;
            }
            continue;
        }

        if c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(Token {
                    text: &input[s..i],
                    start: s,
                    end: i,
                    quoted,
                });
            }
            continue;
        }

        if start.is_none() {
            start = Some(i);
            quoted = false;
        }
        if c == '\'' || c == '"' {
            in_quote = Some(c);
            quoted = true;
        }
    }

    if let Some(q) = in_quote {
        return Err(Error::Validation(format!(
            "Unterminated {q} quoted literal in where clause: {input}"
        )));
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &input[s..],
            start: s,
            end: input.len(),
            quoted,
        });
    }

    Ok(tokens)
}

/// Split tokens into condition segments on top-level `and`
pub(crate) fn split_on_and<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    tokens.split(|t| t.is_keyword("and")).collect()
}

/// Split a list body (`a, 'b,c', d`) on commas outside quotes
pub(crate) fn split_list(body: &str) -> Result<Vec<&str>> {
    let mut items = Vec::new();
    let mut item_start = 0;
    let mut in_quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        match in_quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => in_quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => in_quote = Some(c),
            None if c == ',' => {
                items.push(body[item_start..i].trim());
                item_start = i + 1;
            }
            None => {}
        }
    }
    if in_quote.is_some() {
        return Err(Error::Validation(format!(
            "Unterminated quoted literal in list: {body}"
        )));
    }
    items.push(body[item_start..].trim());

    if items.iter().any(|item| item.is_empty()) {
        return Err(Error::Validation(format!("Empty item in list: ({body})")));
    }
    Ok(items)
}
