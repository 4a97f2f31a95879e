//! Derive macro for the `StableHash` trait.
//!
//! Structs hash their fields in declaration order. Enums hash the index of
//! the variant first and then the variant's fields, so `A(1)` and `B(1)` never
//! share a hash.
//!
//! ```ignore
//! use resgraph::StableHash;
//!
//! #[derive(StableHash)]
//! struct ChunkCoord {
//!     x: i32,
//!     z: i32,
//! }
//!
//! #[derive(StableHash)]
//! enum Lod {
//!     Full,
//!     Reduced(u8),
//! }
//! ```
//!
//! The generated impl refers to `::resgraph::stable_hash` by default. Crates
//! that use the hashing crate directly can point the macro elsewhere with
//! `#[stable_hash_crate(path)]`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Data, DataEnum, DeriveInput, Fields, Ident, Index, parse_macro_input,
};

/// Implements `StableHash` for a struct or enum.
#[proc_macro_derive(StableHash, attributes(stable_hash_crate))]
pub fn derive_stable_hash(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(expanded) => expanded.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let crate_path = crate_path(input)?;

    let body = match &input.data {
        Data::Struct(data) => hash_struct_fields(&crate_path, &data.fields),
        Data::Enum(data) => hash_enum(&crate_path, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "StableHash cannot be derived for unions",
            ));
        }
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) =
        input.generics.split_for_impl();

    let mut where_clause =
        where_clause.cloned().unwrap_or_else(|| syn::parse_quote!(where));

    for param in input.generics.type_params() {
        let ident = &param.ident;
        where_clause
            .predicates
            .push(syn::parse_quote!(#ident: #crate_path::StableHash));
    }

    Ok(quote! {
        impl #impl_generics #crate_path::StableHash for #name #ty_generics
            #where_clause
        {
            fn stable_hash<H: #crate_path::StableHasher + ?Sized>(
                &self,
                sink: &mut H,
            ) {
                #body
            }
        }
    })
}

fn crate_path(input: &DeriveInput) -> syn::Result<syn::Path> {
    let Some(attr) = input
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("stable_hash_crate"))
    else {
        return Ok(syn::parse_quote!(::resgraph::stable_hash));
    };

    attr.parse_args::<syn::Path>().map_err(|_| {
        syn::Error::new_spanned(
            attr,
            "expected a crate path, e.g. `#[stable_hash_crate(my_crate)]`",
        )
    })
}

fn hash_struct_fields(crate_path: &syn::Path, fields: &Fields) -> TokenStream2 {
    let accessors: Vec<TokenStream2> = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|field| {
                let ident = &field.ident;
                quote!(&self.#ident)
            })
            .collect(),

        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|i| {
                let index = Index::from(i);
                quote!(&self.#index)
            })
            .collect(),

        Fields::Unit => Vec::new(),
    };

    quote! {
        #(#crate_path::StableHash::stable_hash(#accessors, sink);)*
    }
}

fn hash_enum(
    crate_path: &syn::Path,
    data: &DataEnum,
) -> syn::Result<TokenStream2> {
    let mut arms = Vec::with_capacity(data.variants.len());

    for (index, variant) in data.variants.iter().enumerate() {
        let index = u32::try_from(index).map_err(|_| {
            syn::Error::new_spanned(variant, "too many enum variants")
        })?;
        let variant_name = &variant.ident;

        let (pattern, bindings): (TokenStream2, Vec<Ident>) =
            match &variant.fields {
                Fields::Named(named) => {
                    let bindings: Vec<Ident> = named
                        .named
                        .iter()
                        .filter_map(|field| field.ident.clone())
                        .collect();
                    (quote!(Self::#variant_name { #(#bindings),* }), bindings)
                }

                Fields::Unnamed(unnamed) => {
                    let bindings: Vec<Ident> = (0..unnamed.unnamed.len())
                        .map(|i| {
                            Ident::new(&format!("field_{i}"), Span::call_site())
                        })
                        .collect();
                    (quote!(Self::#variant_name(#(#bindings),*)), bindings)
                }

                Fields::Unit => (quote!(Self::#variant_name), Vec::new()),
            };

        arms.push(quote! {
            #pattern => {
                #crate_path::StableHasher::write_u32(sink, #index);
                #(#crate_path::StableHash::stable_hash(#bindings, sink);)*
            }
        });
    }

    if arms.is_empty() {
        return Ok(quote!(match *self {}));
    }

    Ok(quote! {
        match self {
            #(#arms)*
        }
    })
}
