//! Grammar source text to AST.
//!
//! Source is scanned by [`lexer::Lexer`] and parsed by [`parser::parse`]
//! according to a [`Notation`]. The resulting [`Grammar`] prints back to the
//! same notation with [`Grammar::display`].

use std::fmt::{self, Display};
use std::str::FromStr;

pub mod error;
pub mod lexer;
pub mod notation;
pub mod parser;
pub mod text;

pub use error::{ParseError, StructureError};
pub use lexer::{LexError, LexErrorKind, Lexeme, Lexer, Position, Token, TokenKind};
pub use notation::{Notation, Terminator};
pub use parser::{parse, parse_rule};
pub use text::{SingleLineText, TextError};

/// A rule name, kept as its fragments so renderers can re-case it.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub struct Identifier(Vec<SingleLineText>);

impl Identifier {
    pub fn new(fragments: Vec<SingleLineText>) -> Result<Self, StructureError> {
        if fragments.is_empty() {
            return Err(StructureError::EmptyIdentifier);
        }
        Ok(Identifier(fragments))
    }

    /// Split a written name into fragments at whitespace, `_`, `-`, and
    /// wherever an upper case letter follows a lower case letter or digit.
    ///
    /// `nonZeroDigit`, `non_Zero_Digit` and `non Zero Digit` all yield the
    /// fragments `non`, `Zero`, `Digit`.
    pub fn from_name(name: &str) -> Result<Self, StructureError> {
        let mut fragments = Vec::new();
        let mut current = String::new();
        let mut prev: Option<char> = None;
        for c in name.chars() {
            if c == ' ' || c == '\t' || c == '_' || c == '-' {
                if !current.is_empty() {
                    fragments.push(SingleLineText::new(std::mem::take(&mut current))?);
                }
                prev = None;
                continue;
            }
            let boundary = c.is_uppercase()
                && prev.map_or(false, |p| p.is_lowercase() || p.is_numeric());
            if boundary && !current.is_empty() {
                fragments.push(SingleLineText::new(std::mem::take(&mut current))?);
            }
            current.push(c);
            prev = Some(c);
        }
        if !current.is_empty() {
            fragments.push(SingleLineText::new(current)?);
        }
        Identifier::new(fragments)
    }

    pub fn fragments(&self) -> &[SingleLineText] {
        &self.0
    }

    /// `NonZeroDigit`.
    pub fn to_pascal_case(&self) -> String {
        self.0
            .iter()
            .map(|fragment| {
                let mut chars = fragment.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }

    /// `non_zero_digit`.
    pub fn to_snake_case(&self) -> String {
        self.0
            .iter()
            .map(|fragment| fragment.to_lowercase())
            .collect::<Vec<_>>()
            .join("_")
    }

    fn print(&self, notation: &Notation, f: &mut fmt::Formatter) -> fmt::Result {
        match notation.name_brackets {
            Some((open, close)) => write!(f, "{}{}{}", open, self.joined(" "), close),
            None => f.write_str(&self.joined("_")),
        }
    }

    fn joined(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(SingleLineText::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.joined(" "))
    }
}

/// A terminal symbol.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub struct Literal(SingleLineText);

impl Literal {
    pub fn new(s: impl Into<String>) -> Result<Self, TextError> {
        Ok(Literal(SingleLineText::new(s)?))
    }

    pub fn text(&self) -> &SingleLineText {
        &self.0
    }

    fn print(&self, notation: &Notation, f: &mut fmt::Formatter) -> fmt::Result {
        let text = self.0.as_str();
        let quote = notation
            .quotes
            .iter()
            .copied()
            .find(|q| !text.contains(*q))
            .or_else(|| notation.quotes.first().copied())
            .unwrap_or('"');
        let mut out = String::with_capacity(text.len() + 2);
        out.push(quote);
        for c in text.chars() {
            if let Some(escape) = notation.escape {
                if c == quote || c == escape {
                    out.push(escape);
                }
            }
            out.push(c);
        }
        out.push(quote);
        f.write_str(&out)
    }
}

impl From<SingleLineText> for Literal {
    fn from(text: SingleLineText) -> Self {
        Literal(text)
    }
}

/// One symbol occurrence within an alternative.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub enum DefinitionPart {
    Literal(Literal),
    Reference(Identifier),
    Epsilon,
}

impl DefinitionPart {
    fn print(&self, notation: &Notation, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DefinitionPart::Literal(literal) => literal.print(notation, f),
            DefinitionPart::Reference(name) => name.print(notation, f),
            DefinitionPart::Epsilon => f.write_str(&notation.epsilon),
        }
    }
}

/// One alternative of a rule. May be empty.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Default)]
pub struct DefinitionChoice(pub Vec<DefinitionPart>);

impl DefinitionChoice {
    pub fn parts(&self) -> &[DefinitionPart] {
        &self.0
    }

    /// Rule names referenced by this alternative, in order.
    pub fn references(&self) -> impl Iterator<Item = &Identifier> {
        self.0.iter().filter_map(|part| match part {
            DefinitionPart::Reference(name) => Some(name),
            DefinitionPart::Literal(_) | DefinitionPart::Epsilon => None,
        })
    }

    fn print(&self, notation: &Notation, f: &mut fmt::Formatter) -> fmt::Result {
        let separator = match &notation.concatenation {
            Some(s) => format!(" {} ", s),
            None => " ".to_owned(),
        };
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(&separator)?;
            }
            part.print(notation, f)?;
        }
        Ok(())
    }
}

/// All alternatives of one rule. Never empty.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct Definition(Vec<DefinitionChoice>);

impl Definition {
    pub fn new(choices: Vec<DefinitionChoice>) -> Result<Self, StructureError> {
        if choices.is_empty() {
            return Err(StructureError::EmptyDefinition);
        }
        Ok(Definition(choices))
    }

    pub fn choices(&self) -> &[DefinitionChoice] {
        &self.0
    }

    fn print(&self, notation: &Notation, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, choice) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " {}", notation.alternative)?;
                if !choice.parts().is_empty() {
                    f.write_str(" ")?;
                }
            }
            choice.print(notation, f)?;
        }
        Ok(())
    }
}

/// A production rule.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct Rule {
    pub name: Identifier,
    pub definition: Definition,
}

impl Rule {
    fn print(&self, notation: &Notation, f: &mut fmt::Formatter) -> fmt::Result {
        self.name.print(notation, f)?;
        write!(f, " {}", notation.assign)?;
        if !self.definition.choices()[0].parts().is_empty() {
            f.write_str(" ")?;
        }
        self.definition.print(notation, f)?;
        if let Terminator::Symbol(symbol) = &notation.terminator {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }

    /// Printable form of the rule in the given notation.
    pub fn display<'a>(&'a self, notation: &'a Notation) -> Printed<'a, Rule> {
        Printed {
            value: self,
            notation,
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.print(&Notation::default(), f)
    }
}

impl FromStr for Rule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rule(s, &Notation::default())
    }
}

/// A set of rules, in source order. Never empty.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct Grammar(Vec<Rule>);

impl Grammar {
    pub fn new(rules: Vec<Rule>) -> Result<Self, StructureError> {
        if rules.is_empty() {
            return Err(StructureError::EmptyGrammar);
        }
        Ok(Grammar(rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.0
    }

    /// Printable form of the grammar in the given notation.
    pub fn display<'a>(&'a self, notation: &'a Notation) -> Printed<'a, Grammar> {
        Printed {
            value: self,
            notation,
        }
    }

    fn print(&self, notation: &Notation, f: &mut fmt::Formatter) -> fmt::Result {
        for rule in &self.0 {
            rule.print(notation, f)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.print(&Notation::default(), f)
    }
}

impl FromStr for Grammar {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s, &Notation::default())
    }
}

/// A grammar value paired with the notation to print it in.
pub struct Printed<'a, T> {
    value: &'a T,
    notation: &'a Notation,
}

impl<'a> Display for Printed<'a, Grammar> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.value.print(self.notation, f)
    }
}

impl<'a> Display for Printed<'a, Rule> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.value.print(self.notation, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;
    use std::string::ToString;

    fn assert_lossless_conversion<T, E>(t: T)
    where
        T: ToString + FromStr<Err = E> + Eq + Debug,
        E: std::error::Error,
    {
        let s = t.to_string();
        let t_parse = T::from_str(&s).unwrap();
        assert_eq!(t, t_parse, "To string:\n{}\n", s);
    }

    fn name(s: &str) -> Identifier {
        Identifier::from_name(s).unwrap()
    }

    fn lit(s: &str) -> DefinitionPart {
        DefinitionPart::Literal(Literal::new(s).unwrap())
    }

    fn rule(n: &str, choices: Vec<Vec<DefinitionPart>>) -> Rule {
        Rule {
            name: name(n),
            definition: Definition::new(choices.into_iter().map(DefinitionChoice).collect())
                .unwrap(),
        }
    }

    #[test]
    fn identifier_fragments() {
        let tests = vec![
            ("digit", vec!["digit"]),
            ("nonZeroDigit", vec!["non", "Zero", "Digit"]),
            ("non zero  digit", vec!["non", "zero", "digit"]),
            ("non_zero-digit", vec!["non", "zero", "digit"]),
            ("HTTPServer", vec!["HTTPServer"]),
            ("base64Value", vec!["base64", "Value"]),
        ];
        for (input, expected) in tests {
            let id = name(input);
            let got: Vec<&str> = id.fragments().iter().map(|f| f.as_str()).collect();
            assert_eq!(got, expected, "input: {:?}", input);
        }
        assert_eq!(
            Identifier::from_name(" _ "),
            Err(StructureError::EmptyIdentifier)
        );
        assert!(matches!(
            Identifier::from_name("a\nb"),
            Err(StructureError::Text(TextError::LineFeed { .. }))
        ));
    }

    #[test]
    fn identifier_casing() {
        let id = name("nonZeroDigit");
        assert_eq!(id.to_pascal_case(), "NonZeroDigit");
        assert_eq!(id.to_snake_case(), "non_zero_digit");
        assert_eq!(id.to_string(), "non Zero Digit");
    }

    #[test]
    fn empty_structures_rejected() {
        assert_eq!(Identifier::new(vec![]), Err(StructureError::EmptyIdentifier));
        assert_eq!(Definition::new(vec![]), Err(StructureError::EmptyDefinition));
        assert_eq!(Grammar::new(vec![]), Err(StructureError::EmptyGrammar));
    }

    #[test]
    fn display_bnf() {
        let g = Grammar::new(vec![
            rule(
                "number",
                vec![
                    vec![DefinitionPart::Reference(name("nonZeroDigit"))],
                    vec![
                        DefinitionPart::Reference(name("number")),
                        DefinitionPart::Reference(name("digit")),
                    ],
                ],
            ),
            rule("quote", vec![vec![lit("\"")], vec![DefinitionPart::Epsilon], vec![]]),
        ])
        .unwrap();
        assert_eq!(
            g.to_string(),
            "<number> ::= <non Zero Digit> | <number> <digit>\n<quote> ::= '\"' | ε |\n"
        );
    }

    #[test]
    fn display_ebnf() {
        let g = Grammar::new(vec![rule(
            "rule",
            vec![vec![
                DefinitionPart::Reference(name("lhs")),
                lit("="),
                DefinitionPart::Reference(name("rhs")),
            ]],
        )])
        .unwrap();
        assert_eq!(
            g.display(&Notation::ebnf()).to_string(),
            "rule = lhs , \"=\" , rhs ;\n"
        );
    }

    #[test]
    fn display_escapes() {
        let notation = Notation::bnf().with_escape('\\');
        let r = rule("a", vec![vec![lit("both \" and '"), lit("back\\slash")]]);
        let printed = r.display(&notation).to_string();
        assert_eq!(printed, r#"<a> ::= "both \" and '" "back\\slash""#);
        assert_eq!(parse_rule(&printed, &notation).unwrap(), r);
    }

    #[test]
    fn lossless_rule() {
        assert_lossless_conversion(rule(
            "a",
            vec![vec![DefinitionPart::Reference(name("b")), lit("c")]],
        ));
        assert_lossless_conversion(rule("empty", vec![vec![]]));
    }

    #[test]
    fn lossless_grammar() {
        let g = Grammar::new(vec![
            rule("a", vec![vec![DefinitionPart::Reference(name("b"))]]),
            rule(
                "c",
                vec![vec![lit("d")], vec![], vec![DefinitionPart::Epsilon]],
            ),
        ])
        .unwrap();
        assert_lossless_conversion(g);
    }
}
