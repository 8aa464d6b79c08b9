//! Delimiter configuration for grammar source text.
//!
//! Nothing in the lexer or the printer hardcodes a delimiter; both read them
//! from a [`Notation`].

/// How a rule ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// A line break ends the rule. Lines starting with the alternative
    /// separator continue the previous rule.
    LineBreak,
    /// An explicit symbol such as `;` ends the rule. Line breaks are plain
    /// whitespace.
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notation {
    pub assign: String,
    pub alternative: String,
    /// Explicit separator between the parts of one alternative. `None` means
    /// parts are separated by adjacency.
    pub concatenation: Option<String>,
    pub terminator: Terminator,
    pub epsilon: String,
    /// Characters that may open (and close) a literal.
    pub quotes: Vec<char>,
    /// Escape character inside literals. With `None` a literal ends at the
    /// first matching quote and cannot contain it.
    pub escape: Option<char>,
    /// Brackets around rule names, e.g. `<digit>`. Bare names are accepted
    /// either way.
    pub name_brackets: Option<(char, char)>,
    /// Line comment prefix.
    pub comment: Option<String>,
}

impl Notation {
    /// Classic line oriented BNF: `<number> ::= <digit> | <number> <digit>`.
    pub fn bnf() -> Self {
        Notation {
            assign: "::=".to_owned(),
            alternative: "|".to_owned(),
            concatenation: None,
            terminator: Terminator::LineBreak,
            epsilon: "ε".to_owned(),
            quotes: vec!['"', '\''],
            escape: None,
            name_brackets: Some(('<', '>')),
            comment: Some("#".to_owned()),
        }
    }

    /// ISO style EBNF subset: `number = digit | number , digit ;`.
    pub fn ebnf() -> Self {
        Notation {
            assign: "=".to_owned(),
            alternative: "|".to_owned(),
            concatenation: Some(",".to_owned()),
            terminator: Terminator::Symbol(";".to_owned()),
            epsilon: "ε".to_owned(),
            quotes: vec!['"', '\''],
            escape: None,
            name_brackets: None,
            comment: Some("#".to_owned()),
        }
    }

    /// Look a preset up by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "bnf" => Some(Notation::bnf()),
            "ebnf" => Some(Notation::ebnf()),
            _ => None,
        }
    }

    pub fn with_escape(mut self, escape: char) -> Self {
        self.escape = Some(escape);
        self
    }

    pub(crate) fn is_quote(&self, c: char) -> bool {
        self.quotes.contains(&c)
    }
}

impl Default for Notation {
    fn default() -> Self {
        Notation::bnf()
    }
}
