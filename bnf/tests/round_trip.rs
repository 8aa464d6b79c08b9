//! Printing a parsed grammar and parsing it again yields the same grammar.

use bnf::{
    parse, Definition, DefinitionChoice, DefinitionPart, Grammar, Identifier, Literal, Notation,
    Rule,
};
use proptest::prelude::*;

fn identifier() -> impl Strategy<Value = Identifier> {
    "[a-z][a-zA-Z0-9]{0,6}".prop_map(|s| Identifier::from_name(&s).unwrap())
}

fn literal() -> impl Strategy<Value = Literal> {
    // Anything printable except the double quote.
    "[ -!#-~]{0,5}".prop_map(|s| Literal::new(s).unwrap())
}

fn choice() -> impl Strategy<Value = DefinitionChoice> {
    let part = prop_oneof![
        literal().prop_map(DefinitionPart::Literal),
        identifier().prop_map(DefinitionPart::Reference),
    ];
    prop_oneof![
        4 => prop::collection::vec(part, 0..4).prop_map(DefinitionChoice),
        1 => Just(DefinitionChoice(vec![DefinitionPart::Epsilon])),
    ]
}

fn grammar() -> impl Strategy<Value = Grammar> {
    let rule = (identifier(), prop::collection::vec(choice(), 1..4)).prop_map(|(name, choices)| {
        Rule {
            name,
            definition: Definition::new(choices).unwrap(),
        }
    });
    prop::collection::vec(rule, 1..4).prop_map(|rules| Grammar::new(rules).unwrap())
}

proptest! {
    #[test]
    fn bnf_round_trip(g in grammar()) {
        let notation = Notation::bnf();
        let printed = g.display(&notation).to_string();
        let reparsed = parse(&printed, &notation).unwrap();
        prop_assert_eq!(&reparsed, &g, "printed:\n{}", printed);

        // Printing is stable too.
        prop_assert_eq!(reparsed.display(&notation).to_string(), printed);
    }

    #[test]
    fn ebnf_round_trip(g in grammar()) {
        let notation = Notation::ebnf();
        let printed = g.display(&notation).to_string();
        let reparsed = parse(&printed, &notation).unwrap();
        prop_assert_eq!(&reparsed, &g, "printed:\n{}", printed);
    }
}

#[test]
fn number_grammar_round_trip() {
    let source = "\
number ::= nonZeroDigit | number digit
digit ::= \"0\" | nonZeroDigit
nonZeroDigit ::= \"1\" | \"2\" | \"3\" | \"4\" | \"5\" | \"6\" | \"7\" | \"8\" | \"9\"
";
    let g: Grammar = source.parse().unwrap();
    let reparsed: Grammar = g.to_string().parse().unwrap();
    assert_eq!(g, reparsed);
    assert_eq!(g.rules().len(), 3);
}
