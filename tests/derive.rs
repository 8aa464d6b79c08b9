//! Types and builders generated by `#[derive(Grammar)]`.

use gramtype::Grammar;

#[derive(Grammar)]
#[bnf_file = "grammars/number.bnf"]
pub struct Number;

#[derive(Grammar)]
#[bnf_inline = "list ::= item | item \",\" list\nitem ::= \"i\" | \"j\""]
pub struct Items;

#[derive(Grammar)]
#[bnf_inline = "sum = term | sum, \"+\", term ; term = \"x\" | \"y\" ;"]
#[bnf_notation = "ebnf"]
#[bnf_start = "sum"]
pub struct Sums;

#[test]
fn build_a_number() {
    let n = number::Number::builder()
        .one()
        .two()
        .three()
        .zero()
        .build();
    assert_eq!(n.to_string(), "1230");

    let seven = number::Number::builder().seven().build();
    assert_eq!(
        seven,
        number::Number::NonZeroDigit(number::NonZeroDigit::Seven)
    );
}

#[test]
fn flat_rules_build_once() {
    let d = number::Digit::builder().zero().build();
    assert_eq!(d, number::Digit::Zero);
    assert_eq!(d.to_string(), "0");
    assert_eq!(number::Digit::builder().nine().build().to_string(), "9");
}

#[test]
fn refinements_convert() {
    let five = number::NonZeroDigit::Five;
    let as_number: number::Number = five.clone().into();
    let as_digit: number::Digit = five.into();
    assert_eq!(as_number.to_string(), "5");
    assert_eq!(as_digit, number::Digit::NonZeroDigit(number::NonZeroDigit::Five));
}

#[test]
fn compose_general_rules() {
    let i = items::Item::builder().i().build();
    let j = items::Item::builder().j().build();
    let list = items::List::item_comma_list(i, items::List::item(j));
    assert_eq!(list.to_string(), "i,j");
}

#[test]
fn ebnf_grammar() {
    let sum = sums::Sum::builder().x().plus_y().plus_x().build();
    assert_eq!(sum.to_string(), "x+y+x");
}

#[test]
fn grammar_source_is_kept() {
    assert!(Number::GRAMMAR.contains("<nonZeroDigit>"));
    assert!(Items::GRAMMAR.starts_with("list ::="));
}
