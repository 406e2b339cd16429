use proc_macro2::*;
use quote::quote;
use syn::{punctuated::Punctuated, token::Comma, *};

/// Split a derive input into the enum identifier and its variants, or produce the error tokens to return.
fn parse_enum(item: TokenStream, derive_name: &str) -> core::result::Result<(Ident, Punctuated<Variant, Comma>), TokenStream> {
    let input_parsed = syn::parse2::<DeriveInput>(item).map_err(|err| err.to_compile_error())?;

    match input_parsed.data {
        Data::Enum(body) => {
            if let Some(variant) = body.variants.iter().find(|variant| !matches!(variant.fields, Fields::Unit)) {
                let msg = format!("{derive_name} only supports unit variants, '{}' has fields", variant.ident);
                return Err(quote!(compile_error!(#msg);));
            }
            Ok((input_parsed.ident, body.variants))
        },
        _ => {
            let msg = format!("{derive_name} can only be derived for an enum");
            Err(quote!(compile_error!(#msg);))
        }
    }
}

/// Get the string value of a `#[name("...")]` attribute, or the variant name if there is none.
fn string_attr(variant: &Variant, name: &str) -> TokenStream {
    variant.attrs.iter()
    .filter(|attr| attr.path().get_ident().map_or(false, |ident| ident == name))
    .map(|attr| attr.parse_args::<LitStr>().map_or_else(|err| err.to_compile_error(), |parsed| {
        let val = parsed.value();
        quote!(#val)
    }))
    .nth(0)
    .unwrap_or_else(|| {
        let val = variant.ident.to_string();
        quote!(#val)
    })
}

pub fn enum_count(item: TokenStream) -> TokenStream {
    let (ident, variants) = match parse_enum(item, "EnumCount") {
        Ok(parsed) => parsed,
        Err(toks) => return toks,
    };
    let count = variants.len();

    quote!{
        impl cpucaps_base::EnumCountT for #ident {
            const COUNT: usize = #count;
        }
    }
}

pub fn enum_from_index(item: TokenStream) -> TokenStream {
    let (ident, body_variants) = match parse_enum(item, "EnumFromIndex") {
        Ok(parsed) => parsed,
        Err(toks) => return toks,
    };

    let mut variants = Vec::with_capacity(body_variants.len());
    let mut indices = Vec::with_capacity(body_variants.len());
    let mut i = 0;
    for variant in body_variants {
        let idx = match variant.discriminant {
            Some((_, Expr::Lit(ExprLit { lit: Lit::Int(int), .. }))) => match int.base10_parse::<usize>() {
                Ok(int) => int,
                Err(err) => {
                    let msg = err.to_string();
                    return quote!(compile_error!(#msg););
                },
            },
            Some(_) => return quote!(compile_error!("Only integer discriminants are supported by EnumFromIndex");),
            None => i,
        };

        variants.push(variant.ident);
        indices.push(idx);

        i = idx + 1;
    }

    quote!{
        impl cpucaps_base::EnumFromIndexT for #ident {
            fn from_idx(idx: usize) -> Option<Self> {
                match idx {
                    #(#indices => Some(Self::#variants),)*
                    _ => None,
                }
            }

            fn from_idx_or(idx: usize, default: Self) -> Self {
                match idx {
                    #(#indices => Self::#variants,)*
                    _ => default,
                }
            }

            fn to_idx(self) -> usize {
                match self {
                    #(Self::#variants => #indices,)*
                }
            }
        }
    }
}

pub fn enum_display(item: TokenStream) -> TokenStream {
    let (ident, variants) = match parse_enum(item, "EnumDisplay") {
        Ok(parsed) => parsed,
        Err(toks) => return toks,
    };

    let members = variants.iter().map(|variant| &variant.ident).collect::<Vec<_>>();
    let names = variants.iter().map(|variant| string_attr(variant, "display")).collect::<Vec<_>>();

    quote!{
        impl core::fmt::Display for #ident {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    #(#ident::#members => f.pad(#names),)*
                }
            }
        }
    }
}

pub fn enum_from_name(item: TokenStream) -> TokenStream {
    let (ident, variants) = match parse_enum(item, "EnumFromName") {
        Ok(parsed) => parsed,
        Err(toks) => return toks,
    };

    let members = variants.iter().map(|variant| &variant.ident).collect::<Vec<_>>();
    let names = variants.iter().map(|variant| string_attr(variant, "parse_name")).collect::<Vec<_>>();

    quote!{
        impl cpucaps_base::EnumFromNameT for #ident {
            fn parse(s: &str) -> Option<Self> {
                match s {
                    #(#names => Some(Self::#members),)*
                    _ => None,
                }
            }

            fn parse_name(&self) -> &'static str {
                match self {
                    #(Self::#members => #names,)*
                }
            }
        }
    }
}
