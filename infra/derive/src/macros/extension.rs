use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ItemStruct;

pub fn expand(input: ItemStruct) -> TokenStream {
    let handle = &input.ident;
    let vis = &input.vis;
    let fields = &input.fields;
    let attrs = &input.attrs;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "extensions cannot be generic")
            .to_compile_error();
    }

    let inner = format_ident!("{handle}Inner");
    let semi = if matches!(fields, syn::Fields::Named(_)) { quote!() } else { quote!(;) };

    quote! {
        #(#attrs)*
        #[derive(Debug)]
        #vis struct #inner #fields #semi

        #[derive(Debug, Clone)]
        #vis struct #handle {
            inner: ::std::sync::Arc<#inner>,
        }

        impl #impl_generics #handle #ty_generics #where_clause {
            #[must_use]
            pub fn new(inner: #inner) -> Self {
                Self { inner: ::std::sync::Arc::new(inner) }
            }
        }

        impl ::std::ops::Deref for #handle {
            type Target = #inner;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl ::ramverk_kernel::domain::registry::Extension for #handle {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_inner_and_handle() {
        let input: ItemStruct = syn::parse_str("pub struct Greeting { pub text: String }").unwrap();
        let out = expand(input).to_string();
        assert!(out.contains("pub struct GreetingInner"));
        assert!(out.contains("Arc < GreetingInner >"));
        assert!(out.contains("registry :: Extension for Greeting"));
    }

    #[test]
    fn rejects_generic_structs() {
        let input: ItemStruct = syn::parse_str("struct Holder<T> { value: T }").unwrap();
        assert!(expand(input).to_string().contains("cannot be generic"));
    }
}
