use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    Expr, ExprArray, ExprLit, ExprPath, ExprUnary, Ident, ItemFn, Result as SynResult, Token,
    UnOp,
};

/// One argument of the `route` attribute: a bare value (positional) or a
/// `key = value` pair.
struct RouteArg {
    key: Option<Ident>,
    value: Expr,
}

impl Parse for RouteArg {
    fn parse(input: ParseStream) -> SynResult<Self> {
        if input.peek(Ident) && input.peek2(Token![=]) {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: Expr = input.parse()?;
            Ok(RouteArg {
                key: Some(key),
                value,
            })
        } else {
            let value: Expr = input.parse()?;
            Ok(RouteArg { key: None, value })
        }
    }
}

struct RouteArgs {
    args: Punctuated<RouteArg, Token![,]>,
}

impl Parse for RouteArgs {
    fn parse(input: ParseStream) -> SynResult<Self> {
        Ok(RouteArgs {
            args: Punctuated::parse_terminated(input)?,
        })
    }
}

fn is_declarative(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(ExprLit { .. }) => true,
        // Negative numeric literals arrive as a unary minus over a literal.
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => matches!(**expr, Expr::Lit(_)),
        // A bare path names an auxiliary symbol resolved by the extractor.
        Expr::Path(ExprPath { qself: None, path, .. }) => path.segments.len() == 1,
        Expr::Array(ExprArray { elems, .. }) => elems.iter().all(is_declarative),
        _ => false,
    }
}

/// Marker attribute for route handler functions.
///
/// The attribute carries declarative metadata only; it does not wrap or alter
/// the function. The route extractor reads the argument list back out of the
/// source text, so every value must be a literal, an array of literals, or a
/// registered auxiliary symbol:
///
/// ```ignore
/// #[route(module = "Accounts", name = "Edit user", permission = false)]
/// pub fn post_edit(req: &Request, user_id: &str) -> anyhow::Result<HandlerValue> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn route(attr: TokenStream, item: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(attr as RouteArgs);

    let mut positional_allowed = true;
    for arg in &parsed.args {
        if arg.key.is_some() {
            positional_allowed = false;
        } else if !positional_allowed {
            return syn::Error::new_spanned(
                &arg.value,
                "positional route arguments must precede named ones",
            )
            .to_compile_error()
            .into();
        }
        if !is_declarative(&arg.value) {
            return syn::Error::new_spanned(
                &arg.value,
                "route arguments must be literals, arrays of literals, or registered symbols",
            )
            .to_compile_error()
            .into();
        }
    }

    // The item must be a free function; emit it unchanged.
    let func = parse_macro_input!(item as ItemFn);
    TokenStream::from(quote! { #func })
}
