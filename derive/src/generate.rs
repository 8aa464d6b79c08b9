use std::collections::HashSet;

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::Ident;

use bnf::Notation;
use typegen::{
    Action, BuilderProtocol, BuilderState, Capability, CompositionContract, Fill, Generated,
    Renderer, RuleId, Selection, StateMachine, SubTerm,
};

/// Renders the generated model as Rust items inside one module.
///
/// Each rule becomes an enum with one variant per alternative. Fields exist
/// for rule values only; literals are restored by `Display`. Fields that can
/// contain their own enum are boxed.
pub struct RustRenderer {
    module: Ident,
}

impl RustRenderer {
    pub fn new(module: Ident) -> Self {
        RustRenderer { module }
    }
}

impl Renderer for RustRenderer {
    type Output = TokenStream;

    fn render(&self, generated: &Generated<'_>) -> TokenStream {
        let cx = Context::new(*generated);
        let module = &self.module;

        let enums = cx
            .generated
            .model
            .capabilities()
            .iter()
            .map(|cap| cx.rule_enum(cap));
        let displays = cx
            .generated
            .model
            .capabilities()
            .iter()
            .map(|cap| cx.display_impl(cap));
        let refinements = cx.from_impls();
        let protocols = cx.generated.builders.iter().map(|protocol| match protocol {
            BuilderProtocol::Incremental(machine) => cx.machine(machine),
            BuilderProtocol::Composition(contract) => cx.constructors(contract),
        });

        quote! {
            pub mod #module {
                #( #enums )*
                #( #displays )*
                #( #refinements )*

                pub mod builders {
                    /// A finished value waiting for `build`.
                    #[derive(Debug, Clone, PartialEq, Eq)]
                    pub struct Ready<T>(T);

                    impl<T> Ready<T> {
                        pub fn build(self) -> T {
                            self.0
                        }
                    }

                    #( #protocols )*
                }
            }
        }
    }
}

/// A valid Rust identifier for `name`. Anything outside `[A-Za-z0-9_]`
/// becomes `_` and keywords get a trailing `_`.
pub fn ident(name: &str) -> Ident {
    let mut s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        s.insert(0, '_');
    }
    if syn::parse_str::<Ident>(&s).is_err() {
        s.push('_');
    }
    Ident::new(&s, Span::call_site())
}

/// Identifiers already handed out in one Rust namespace. Sanitizing can map
/// distinct names to the same identifier, so later ones get `_2`, `_3`, ...
#[derive(Debug, Default)]
struct Namespace(HashSet<String>);

impl Namespace {
    fn with_reserved(reserved: &[&str]) -> Self {
        Namespace(reserved.iter().map(|name| (*name).to_owned()).collect())
    }

    fn claim(&mut self, name: &str) -> Ident {
        let base = ident(name).to_string();
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.0.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        Ident::new(&candidate, Span::call_site())
    }
}

struct Context<'a> {
    generated: Generated<'a>,
    /// Type name per rule.
    types: Vec<Ident>,
    /// Variant names per rule.
    variants: Vec<Vec<Ident>>,
}

impl<'a> Context<'a> {
    fn new(generated: Generated<'a>) -> Self {
        let mut taken = Namespace::with_reserved(&["builders"]);
        let types = generated
            .model
            .capabilities()
            .iter()
            .map(|cap| taken.claim(&cap.name.to_pascal_case()))
            .collect();
        let variants = generated
            .model
            .capabilities()
            .iter()
            .map(|cap| {
                let mut taken = Namespace::default();
                cap.variants
                    .iter()
                    .map(|v| taken.claim(&v.name.to_pascal_case()))
                    .collect()
            })
            .collect();
        Context {
            generated,
            types,
            variants,
        }
    }

    fn ty(&self, rule: RuleId) -> &Ident {
        &self.types[rule.index()]
    }

    fn variant(&self, rule: RuleId, variant: usize) -> &Ident {
        &self.variants[rule.index()][variant]
    }

    /// Whether a `field` inside `owner` needs indirection.
    fn boxed(&self, owner: RuleId, field: RuleId) -> bool {
        self.generated.analyzed.reaches(field, owner)
    }

    fn field_ty(&self, owner: RuleId, field: RuleId, path: &TokenStream) -> TokenStream {
        let ty = self.ty(field);
        if self.boxed(owner, field) {
            quote! { ::std::boxed::Box<#path #ty> }
        } else {
            quote! { #path #ty }
        }
    }

    fn rule_enum(&self, cap: &Capability) -> TokenStream {
        let name = self.ty(cap.rule);
        let doc = format!(" `{}`", self.generated.analyzed.rule(cap.rule).display(&Notation::bnf()));
        let variants = cap.variants.iter().enumerate().map(|(i, v)| {
            let variant = self.variant(cap.rule, i);
            let fields: Vec<TokenStream> = v
                .rule_terms()
                .map(|field| self.field_ty(cap.rule, field, &quote! {}))
                .collect();
            if fields.is_empty() {
                quote! { #variant }
            } else {
                quote! { #variant(#( #fields ),*) }
            }
        });
        quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, PartialEq, Eq, Hash)]
            pub enum #name {
                #( #variants ),*
            }
        }
    }

    fn display_impl(&self, cap: &Capability) -> TokenStream {
        let name = self.ty(cap.rule);
        let arms = cap.variants.iter().enumerate().map(|(i, v)| {
            let variant = self.variant(cap.rule, i);
            let mut bindings = Vec::new();
            let mut writes = Vec::new();
            for term in &v.terms {
                match term {
                    SubTerm::Rule(_) => {
                        let binding = format_ident!("f{}", bindings.len());
                        writes.push(quote! { ::std::fmt::Display::fmt(#binding, f)?; });
                        bindings.push(binding);
                    }
                    SubTerm::Literal(text) => {
                        let text = text.as_str();
                        writes.push(quote! { f.write_str(#text)?; });
                    }
                    SubTerm::Empty => {}
                }
            }
            if writes.is_empty() {
                writes.push(quote! { let _ = f; });
            }
            let pattern = if bindings.is_empty() {
                quote! { #name::#variant }
            } else {
                quote! { #name::#variant(#( #bindings ),*) }
            };
            quote! {
                #pattern => {
                    #( #writes )*
                    Ok(())
                }
            }
        });
        quote! {
            impl ::std::fmt::Display for #name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    match self {
                        #( #arms )*
                    }
                }
            }
        }
    }

    /// `From<Sub> for Super` for every refinement edge.
    fn from_impls(&self) -> Vec<TokenStream> {
        let model = self.generated.model;
        model
            .refinements()
            .filter_map(|(sub, sup)| {
                let index = model
                    .capability(sup)
                    .variants
                    .iter()
                    .position(|v| v.refines == Some(sub))?;
                let sub_ty = self.ty(sub);
                let sup_ty = self.ty(sup);
                let variant = self.variant(sup, index);
                let value = if self.boxed(sup, sub) {
                    quote! { ::std::boxed::Box::new(value) }
                } else {
                    quote! { value }
                };
                Some(quote! {
                    impl ::std::convert::From<#sub_ty> for #sup_ty {
                        fn from(value: #sub_ty) -> Self {
                            #sup_ty::#variant(#value)
                        }
                    }
                })
            })
            .collect()
    }

    /// Builder types for an incremental protocol. `{Rule}Builder` is the
    /// initial state and `{Rule}Growing` the open end of a sequence.
    fn machine(&self, machine: &StateMachine) -> TokenStream {
        let ty = self.ty(machine.rule);
        let builder = format_ident!("{}Builder", ty);
        let growing = format_ident!("{}Growing", ty);

        let state_ty = |state: BuilderState| match state {
            BuilderState::Initial => quote! { #builder },
            BuilderState::Growing => quote! { #growing },
            BuilderState::Complete => quote! { Ready<super::#ty> },
            BuilderState::Built => quote! { super::#ty },
        };
        let wrap = |state: BuilderState, value: TokenStream| match state {
            BuilderState::Initial => quote! { #builder(()) },
            BuilderState::Growing => quote! { #growing(#value) },
            BuilderState::Complete => quote! { Ready(#value) },
            BuilderState::Built => value,
        };

        let mut items = vec![quote! {
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct #builder(());

            impl super::#ty {
                pub fn builder() -> #builder {
                    #builder(())
                }
            }
        }];
        if machine.states.contains(&BuilderState::Growing) {
            items.push(quote! {
                #[derive(Debug, Clone, PartialEq, Eq)]
                pub struct #growing(super::#ty);
            });
        }

        for state in [BuilderState::Initial, BuilderState::Growing] {
            let mut methods = Vec::new();
            let mut taken = Namespace::with_reserved(&["build"]);
            for action in machine.available(state) {
                let to = match machine.next(state, action) {
                    Some(to) => to,
                    None => continue,
                };
                match action {
                    Action::Step(i) => {
                        let step = &machine.steps[i];
                        let method = taken.claim(&step.name.to_snake_case());
                        let params = step.selection.arguments().enumerate().map(|(n, rule)| {
                            let param = format_ident!("p{}", n);
                            let rule_ty = self.ty(rule);
                            quote! { #param: super::#rule_ty }
                        });
                        let value = self.selection(&step.selection, &mut 0, &quote! { super:: });
                        let ret = state_ty(to);
                        let body = wrap(to, value);
                        methods.push(quote! {
                            pub fn #method(self, #( #params ),*) -> #ret {
                                #body
                            }
                        });
                    }
                    Action::Build => {
                        let ret = state_ty(to);
                        methods.push(quote! {
                            pub fn build(self) -> #ret {
                                self.0
                            }
                        });
                    }
                }
            }
            if methods.is_empty() {
                continue;
            }
            let this = state_ty(state);
            items.push(quote! {
                impl #this {
                    #( #methods )*
                }
            });
        }

        quote! { #( #items )* }
    }

    /// Constructor functions on the rule's type, one per alternative.
    fn constructors(&self, contract: &CompositionContract) -> TokenStream {
        let owner = contract.rule;
        let ty = self.ty(owner);
        let mut taken = Namespace::default();
        let functions = contract.constructors.iter().map(|ctor| {
            let function = taken.claim(&ctor.name.to_snake_case());
            let variant = self.variant(owner, ctor.variant);
            let params: Vec<Ident> = (0..ctor.parameters.len())
                .map(|n| format_ident!("p{}", n))
                .collect();
            let tys = ctor.parameters.iter().map(|rule| {
                let rule_ty = self.ty(*rule);
                quote! { super::#rule_ty }
            });
            let fields = params.iter().zip(&ctor.parameters).map(|(param, rule)| {
                if self.boxed(owner, *rule) {
                    quote! { ::std::boxed::Box::new(#param) }
                } else {
                    quote! { #param }
                }
            });
            let value = if params.is_empty() {
                quote! { super::#ty::#variant }
            } else {
                quote! { super::#ty::#variant(#( #fields ),*) }
            };
            quote! {
                pub fn #function(#( #params: #tys ),*) -> super::#ty {
                    #value
                }
            }
        });
        quote! {
            impl super::#ty {
                #( #functions )*
            }
        }
    }

    /// Expression for the value a selection describes. Arguments are taken
    /// from `p{n}` in order, the previous value from `self.0`.
    fn selection(&self, selection: &Selection, next_arg: &mut usize, path: &TokenStream) -> TokenStream {
        let owner = selection.rule;
        let ty = self.ty(owner);
        let variant = self.variant(owner, selection.variant);
        let terms = &self.generated.model.capability(owner).variants[selection.variant].terms;

        let mut fields = Vec::new();
        for (term, fill) in terms.iter().zip(&selection.fills) {
            let field = match term {
                SubTerm::Rule(field) => *field,
                SubTerm::Literal(_) | SubTerm::Empty => continue,
            };
            let value = match fill {
                Fill::Previous => quote! { self.0 },
                Fill::Argument(_) => {
                    let param = format_ident!("p{}", *next_arg);
                    *next_arg += 1;
                    quote! { #param }
                }
                Fill::Fixed(inner) => self.selection(inner, next_arg, path),
                Fill::Literal(_) | Fill::Empty => continue,
            };
            if self.boxed(owner, field) {
                fields.push(quote! { ::std::boxed::Box::new(#value) });
            } else {
                fields.push(value);
            }
        }

        if fields.is_empty() {
            quote! { #path #ty::#variant }
        } else {
            quote! { #path #ty::#variant(#( #fields ),*) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnf::Grammar;
    use proc_macro2::TokenTree;
    use typegen::{analyze, synthesize, AnalyzedGrammar, AnalyzerOptions, BuilderSet, TypeModel};

    struct Fixture {
        analyzed: AnalyzedGrammar,
        model: TypeModel,
        builders: BuilderSet,
    }

    impl Fixture {
        fn new(source: &str) -> Self {
            let g: Grammar = source.parse().unwrap();
            let analyzed = analyze(&g, &AnalyzerOptions::default()).unwrap();
            let model = TypeModel::build(&analyzed);
            let builders = synthesize(&analyzed, &model);
            Fixture {
                analyzed,
                model,
                builders,
            }
        }

        fn generated(&self) -> Generated<'_> {
            Generated {
                analyzed: &self.analyzed,
                model: &self.model,
                builders: &self.builders,
            }
        }
    }

    #[test]
    fn sanitized_idents() {
        let tests = vec![
            ("NonZeroDigit", "NonZeroDigit"),
            ("if", "if_"),
            ("Self", "Self_"),
            ("3d", "_3d"),
            ("a+b", "a_b"),
            ("", "__"),
            ("naïve", "na_ve"),
        ];
        for (input, expected) in tests {
            assert_eq!(ident(input).to_string(), expected, "input: {:?}", input);
        }
    }

    fn function_names(ts: TokenStream) -> Vec<String> {
        let mut names = Vec::new();
        let mut after_fn = false;
        for tree in ts {
            match tree {
                TokenTree::Ident(i) => {
                    if after_fn {
                        names.push(i.to_string());
                    }
                    after_fn = i == "fn";
                }
                TokenTree::Group(g) => {
                    names.extend(function_names(g.stream()));
                    after_fn = false;
                }
                _ => after_fn = false,
            }
        }
        names
    }

    fn assert_distinct(names: &[String]) {
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "names: {:?}", names);
    }

    #[test]
    fn sanitized_names_stay_distinct() {
        let f = Fixture::new(
            "\
a ::= é | ü
é ::= \"é\" | \"ü\"
ü ::= \"1\"
l ::= \"é\" l | \"ü\" l | \"x\"
",
        );
        let cx = Context::new(f.generated());
        let types: Vec<String> = cx.types.iter().map(|t| t.to_string()).collect();
        assert_eq!(types, vec!["A", "__", "___2", "L"]);
        for variants in &cx.variants {
            assert_distinct(&variants.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        }
        assert_eq!(cx.variant(RuleId(1), 0).to_string(), "__");
        assert_eq!(cx.variant(RuleId(1), 1).to_string(), "___2");

        for rule in [RuleId(0), RuleId(1)] {
            let machine = f.builders.protocol(rule).as_machine().unwrap();
            let names = function_names(cx.machine(machine));
            assert!(!names.is_empty());
            assert_distinct(&names);
        }

        let contract = match f.builders.protocol(RuleId(3)) {
            BuilderProtocol::Composition(contract) => contract,
            other => panic!("unexpected protocol: {:?}", other),
        };
        let names = function_names(cx.constructors(contract));
        assert_eq!(names.len(), 3);
        assert_distinct(&names);
    }

    #[test]
    fn simple_rule_enum() {
        let f = Fixture::new("bit ::= \"0\" | \"1\"\n");
        let cx = Context::new(f.generated());
        let expected = quote! {
            #[doc = " `<bit> ::= \"0\" | \"1\"`"]
            #[derive(Debug, Clone, PartialEq, Eq, Hash)]
            pub enum Bit {
                Zero,
                One
            }
        };
        let ts = cx.rule_enum(&f.model.capabilities()[0]);
        assert_eq!(ts.to_string(), expected.to_string());
    }

    #[test]
    fn recursive_fields_are_boxed() {
        let f = Fixture::new("number ::= digit | number digit\ndigit ::= \"0\" | \"1\"\n");
        let cx = Context::new(f.generated());
        let expected = quote! {
            #[doc = " `<number> ::= <digit> | <number> <digit>`"]
            #[derive(Debug, Clone, PartialEq, Eq, Hash)]
            pub enum Number {
                Digit(Digit),
                NumberDigit(::std::boxed::Box<Number>, Digit)
            }
        };
        let ts = cx.rule_enum(&f.model.capabilities()[0]);
        assert_eq!(ts.to_string(), expected.to_string());
    }

    #[test]
    fn display_writes_literals() {
        let f = Fixture::new("pair ::= \"(\" bit \",\" bit \")\" | ε\nbit ::= \"0\"\n");
        let cx = Context::new(f.generated());
        let expected = quote! {
            impl ::std::fmt::Display for Pair {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    match self {
                        Pair::LeftParenBitCommaBitRightParen(f0, f1) => {
                            f.write_str("(")?;
                            ::std::fmt::Display::fmt(f0, f)?;
                            f.write_str(",")?;
                            ::std::fmt::Display::fmt(f1, f)?;
                            f.write_str(")")?;
                            Ok(())
                        }
                        Pair::Empty => {
                            let _ = f;
                            Ok(())
                        }
                    }
                }
            }
        };
        let ts = cx.display_impl(&f.model.capabilities()[0]);
        assert_eq!(ts.to_string(), expected.to_string());
    }

    #[test]
    fn refinements_convert() {
        let f = Fixture::new("number ::= digit | number digit\ndigit ::= \"0\" | \"1\"\n");
        let cx = Context::new(f.generated());
        let expected = quote! {
            impl ::std::convert::From<Digit> for Number {
                fn from(value: Digit) -> Self {
                    Number::Digit(value)
                }
            }
        };
        let impls = cx.from_impls();
        assert_eq!(impls.len(), 1);
        assert_eq!(impls[0].to_string(), expected.to_string());
    }

    #[test]
    fn flat_builder_methods() {
        let f = Fixture::new("bit ::= \"0\" | \"1\"\n");
        let cx = Context::new(f.generated());
        let machine = f.builders.protocol(RuleId(0)).as_machine().unwrap();
        let expected = quote! {
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct BitBuilder(());

            impl super::Bit {
                pub fn builder() -> BitBuilder {
                    BitBuilder(())
                }
            }

            impl BitBuilder {
                pub fn zero(self, ) -> Ready<super::Bit> {
                    Ready(super::Bit::Zero)
                }
                pub fn one(self, ) -> Ready<super::Bit> {
                    Ready(super::Bit::One)
                }
            }
        };
        assert_eq!(cx.machine(machine).to_string(), expected.to_string());
    }

    #[test]
    fn sequence_builder_methods() {
        let f = Fixture::new("number ::= digit | number digit\ndigit ::= \"0\" | \"1\"\n");
        let cx = Context::new(f.generated());
        let machine = f.builders.protocol(RuleId(0)).as_machine().unwrap();
        let ts = cx.machine(machine).to_string();
        let growing = quote! {
            impl NumberGrowing {
                pub fn zero(self, ) -> NumberGrowing {
                    NumberGrowing(super::Number::NumberDigit(::std::boxed::Box::new(self.0), super::Digit::Zero))
                }
                pub fn one(self, ) -> NumberGrowing {
                    NumberGrowing(super::Number::NumberDigit(::std::boxed::Box::new(self.0), super::Digit::One))
                }
                pub fn build(self) -> super::Number {
                    self.0
                }
            }
        };
        assert!(ts.contains(&growing.to_string()), "generated: {}", ts);
    }

    #[test]
    fn composition_constructors() {
        let f = Fixture::new("list ::= item | item \",\" list\nitem ::= \"i\"\n");
        let cx = Context::new(f.generated());
        let contract = match f.builders.protocol(RuleId(0)) {
            BuilderProtocol::Composition(contract) => contract,
            other => panic!("unexpected protocol: {:?}", other),
        };
        let expected = quote! {
            impl super::List {
                pub fn item(p0: super::Item) -> super::List {
                    super::List::Item(p0)
                }
                pub fn item_comma_list(p0: super::Item, p1: super::List) -> super::List {
                    super::List::ItemCommaList(p0, ::std::boxed::Box::new(p1))
                }
            }
        };
        assert_eq!(cx.constructors(contract).to_string(), expected.to_string());
    }
}
