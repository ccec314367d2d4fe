use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, LitStr, parse_macro_input};

/// Implements `keystone_base::ConfigSection` with the given section key.
#[proc_macro_attribute]
pub fn config_section(args: TokenStream, input: TokenStream) -> TokenStream {
    let key_arg = parse_macro_input!(args as LitStr);
    let input_struct = parse_macro_input!(input as ItemStruct);

    let struct_name = &input_struct.ident;
    let (impl_generics, ty_generics, where_clause) = input_struct.generics.split_for_impl();
    let key = key_arg.value();

    if key.is_empty() {
        return syn::Error::new(key_arg.span(), "Config section key cannot be empty")
            .to_compile_error()
            .into();
    }

    let expanded = quote! {
        #input_struct

        impl #impl_generics ::keystone_base::ConfigSection for #struct_name #ty_generics #where_clause {
            fn key() -> &'static str {
                #key
            }
        }
    };

    TokenStream::from(expanded)
}
