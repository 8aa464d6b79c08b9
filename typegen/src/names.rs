//! Names for things the grammar does not name: variants, steps, values.
//!
//! Every fragment goes through [`SingleLineText`], so a name is always a valid
//! [`Identifier`] a renderer can re-case.

use std::collections::HashSet;

use bnf::{Identifier, SingleLineText};

const DIGITS: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

fn symbol_words(c: char) -> Option<&'static str> {
    let words = match c {
        '+' => "plus",
        '-' => "minus",
        '*' => "star",
        '/' => "slash",
        '\\' => "backslash",
        '%' => "percent",
        '=' => "equals",
        '<' => "less than",
        '>' => "greater than",
        '!' => "bang",
        '?' => "question",
        '.' => "dot",
        ',' => "comma",
        ':' => "colon",
        ';' => "semicolon",
        '(' => "left paren",
        ')' => "right paren",
        '[' => "left bracket",
        ']' => "right bracket",
        '{' => "left brace",
        '}' => "right brace",
        '"' => "quote",
        '\'' => "apostrophe",
        '`' => "backtick",
        '&' => "ampersand",
        '|' => "pipe",
        '^' => "caret",
        '~' => "tilde",
        '#' => "hash",
        '$' => "dollar",
        '@' => "at",
        ' ' => "space",
        '\t' => "tab",
        _ => return None,
    };
    Some(words)
}

/// Words spelling out a literal: letters are kept, digits and symbols are
/// spelled (`"+1"` is `plus one`).
pub fn literal_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphabetic() {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        if let Some(d) = c.to_digit(10) {
            words.push(DIGITS[d as usize].to_owned());
        } else if c == '_' {
            words.push("underscore".to_owned());
        } else if let Some(spelled) = symbol_words(c) {
            words.extend(spelled.split(' ').map(str::to_owned));
        } else {
            words.push(format!("u{:04x}", c as u32));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    if words.is_empty() {
        words.push("empty".to_owned());
    }
    words
}

/// Build an identifier from words, falling back to `fallback` if no word
/// survives validation.
pub fn from_words<I, S>(words: I, fallback: &Identifier) -> Identifier
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let fragments: Vec<SingleLineText> = words
        .into_iter()
        .filter_map(|w| SingleLineText::new(w).ok())
        .collect();
    Identifier::new(fragments).unwrap_or_else(|_| fallback.clone())
}

pub fn literal_name(text: &str, fallback: &Identifier) -> Identifier {
    from_words(literal_words(text), fallback)
}

/// Join several names into one.
pub fn join<'a, I>(names: I, fallback: &Identifier) -> Identifier
where
    I: IntoIterator<Item = &'a Identifier>,
{
    let fragments: Vec<SingleLineText> = names
        .into_iter()
        .flat_map(|name| name.fragments().iter().cloned())
        .collect();
    Identifier::new(fragments).unwrap_or_else(|_| fallback.clone())
}

/// Hands out names that stay unique under any re-casing.
#[derive(Debug, Default)]
pub struct NameSet {
    taken: HashSet<String>,
}

impl NameSet {
    pub fn new() -> Self {
        NameSet::default()
    }

    /// Names nothing may be given, e.g. `build`.
    pub fn with_reserved<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        NameSet {
            taken: reserved.into_iter().map(str::to_lowercase).collect(),
        }
    }

    /// Claim `name`, appending a counter when it is already taken.
    pub fn claim(&mut self, name: Identifier) -> Identifier {
        if self.taken.insert(key(&name)) {
            return name;
        }
        let mut n = 2;
        loop {
            let candidate = from_words(
                name.fragments()
                    .iter()
                    .map(|f| f.as_str().to_owned())
                    .chain(std::iter::once(n.to_string())),
                &name,
            );
            if self.taken.insert(key(&candidate)) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn key(name: &Identifier) -> String {
    name.fragments()
        .iter()
        .map(|f| f.to_lowercase())
        .collect::<String>()
}
