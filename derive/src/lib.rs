//! Proc macro deriving Rust types and builders from a BNF grammar.
//!
//! ```ignore
//! #[derive(Grammar)]
//! #[bnf_file = "grammars/number.bnf"]
//! pub struct Number;
//! ```
//!
//! expands to a `number` module holding one enum per rule and a `builders`
//! module with the fluent construction API.

use std::env;
use std::fs;
use std::path::Path;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, DeriveInput, Lit, Meta};

use bnf::{Identifier, Notation};
use typegen::{analyze, synthesize, AnalyzerOptions, Generated, Renderer, TypeModel};

mod error;
mod generate;

use error::{DeriveError, Result};
use generate::RustRenderer;

const BNF_FILE_ATTR: &str = "bnf_file";
const BNF_INLINE_ATTR: &str = "bnf_inline";
const BNF_START_ATTR: &str = "bnf_start";
const BNF_NOTATION_ATTR: &str = "bnf_notation";

const ATTRS: [&str; 4] = [
    BNF_FILE_ATTR,
    BNF_INLINE_ATTR,
    BNF_START_ATTR,
    BNF_NOTATION_ATTR,
];

#[proc_macro_derive(Grammar, attributes(bnf_file, bnf_inline, bnf_start, bnf_notation))]
pub fn derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    match expand(&ast) {
        Ok(ts) => ts.into(),
        Err(e) => syn::Error::new(ast.ident.span(), e)
            .to_compile_error()
            .into(),
    }
}

#[derive(Debug, PartialEq)]
enum Source {
    Inline(String),
    /// Relative to the manifest directory of the crate using the derive.
    File(String),
}

#[derive(Debug, PartialEq)]
struct GrammarAttrs {
    source: Source,
    start: Option<String>,
    notation: Notation,
}

fn expand(ast: &DeriveInput) -> Result<TokenStream> {
    let attrs = attrs_from_ast(ast)?;
    let (text, path) = read_source(&attrs.source)?;

    let grammar = bnf::parse(&text, &attrs.notation)?;
    let options = AnalyzerOptions {
        start_rule: attrs
            .start
            .as_deref()
            .map(Identifier::from_name)
            .transpose()?,
    };
    let analyzed = analyze(&grammar, &options)?;
    let model = TypeModel::build(&analyzed);
    let builders = synthesize(&analyzed, &model);

    let module = generate::ident(&Identifier::from_name(&ast.ident.to_string())?.to_snake_case());
    let body = RustRenderer::new(module).render(&Generated {
        analyzed: &analyzed,
        model: &model,
        builders: &builders,
    });

    // Including the file makes cargo rebuild when it changes.
    let source = match path {
        Some(path) => quote! { include_str!(#path) },
        None => quote! { #text },
    };
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    Ok(quote! {
        #body

        impl #impl_generics #name #ty_generics #where_clause {
            /// Source of the grammar the types were generated from.
            pub const GRAMMAR: &'static str = #source;
        }
    })
}

/// Read the grammar attributes off a derive input.
///
/// There must be exactly 1 attribute specifying the grammar source, either
/// written inline or as a path to a grammar file.
fn attrs_from_ast(ast: &DeriveInput) -> Result<GrammarAttrs> {
    let mut sources = Vec::new();
    let mut start = None;
    let mut notation = None;
    for attr in &ast.attrs {
        let name = match ATTRS.iter().find(|name| attr.path.is_ident(*name)) {
            Some(name) => *name,
            None => continue,
        };
        let value = string_value(attr, name)?;
        match name {
            BNF_INLINE_ATTR => sources.push(Source::Inline(value)),
            BNF_FILE_ATTR => sources.push(Source::File(value)),
            BNF_START_ATTR => set_once(&mut start, name, value)?,
            _ => set_once(&mut notation, name, value)?,
        }
    }

    let source = match sources.len() {
        0 => return Err(DeriveError::MissingGrammarSource),
        1 => sources.remove(0),
        _ => return Err(DeriveError::MultipleGrammarSources),
    };
    let notation = match notation {
        Some(name) => Notation::preset(&name).ok_or(DeriveError::UnknownNotation(name))?,
        None => Notation::bnf(),
    };

    Ok(GrammarAttrs {
        source,
        start,
        notation,
    })
}

fn string_value(attr: &Attribute, name: &str) -> Result<String> {
    match attr.parse_meta()? {
        Meta::NameValue(val) => match val.lit {
            Lit::Str(s) => Ok(s.value()),
            _ => Err(DeriveError::NotAString(name.to_owned())),
        },
        _ => Err(DeriveError::NotAString(name.to_owned())),
    }
}

fn set_once(slot: &mut Option<String>, name: &str, value: String) -> Result<()> {
    if slot.is_some() {
        return Err(DeriveError::DuplicateAttribute(name.to_owned()));
    }
    *slot = Some(value);
    Ok(())
}

/// The grammar text, plus the absolute path it was read from if any.
fn read_source(source: &Source) -> Result<(String, Option<String>)> {
    match source {
        Source::Inline(text) => Ok((text.clone(), None)),
        Source::File(file) => {
            let root = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
            let path = Path::new(&root).join(file);
            let display = path.to_string_lossy().into_owned();
            let text = fs::read_to_string(&path).map_err(|source| DeriveError::ReadFile {
                path: display.clone(),
                source,
            })?;
            Ok((text, Some(display)))
        }
    }
}
