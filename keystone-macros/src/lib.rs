use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

use syn::spanned::Spanned as _;
use syn::{
    Attribute, Data, DeriveInput, Error, FnArg, GenericArgument, ImplItem, ItemImpl, LitStr,
    PathArguments, Type,
};

const CONSTRUCTOR_ATTR: &str = "constructor";
const INJECT_ATTR: &str = "inject";
const NAMED_ATTR: &str = "named";
const SINGLETON_ATTR: &str = "singleton";

/// Shape of an injected parameter, decided from its declared type.
enum Shape {
    Direct(Type),
    Handle(Type),
}

fn extract_wrapped_type(ty: &Type, wrapper: &str) -> Option<Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == wrapper
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return Some(inner.clone());
    }
    None
}

fn extract_shape(ty: &Type) -> Option<Shape> {
    if let Some(inner) = extract_wrapped_type(ty, "Handle") {
        return Some(Shape::Handle(inner));
    }
    extract_wrapped_type(ty, "Arc").map(Shape::Direct)
}

fn extract_qualifier(attrs: &[Attribute]) -> Result<Option<LitStr>, Error> {
    for attr in attrs {
        if attr.path().is_ident(NAMED_ATTR) {
            return attr.parse_args::<LitStr>().map(Some);
        }
    }
    Ok(None)
}

fn has_attr(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// Generates the parameter descriptor and the argument extraction of one
/// injected field or constructor argument.
fn injection(
    ident: &syn::Ident,
    ty: &Type,
    attrs: &[Attribute],
) -> Result<(TokenStream2, TokenStream2), Error> {
    let qualifier = extract_qualifier(attrs)?;
    let key = |inner: &Type| match &qualifier {
        Some(q) => quote! { ::keystone::Key::named::<#inner>(#q) },
        None => quote! { ::keystone::Key::of::<#inner>() },
    };
    match extract_shape(ty) {
        Some(Shape::Direct(inner)) => {
            let key = key(&inner);
            Ok((
                quote! { ::keystone::Parameter::Direct(#key) },
                quote! { let #ident = args.instance::<#inner>()?; },
            ))
        }
        Some(Shape::Handle(inner)) => {
            let key = key(&inner);
            Ok((
                quote! { ::keystone::Parameter::Handle(#key) },
                quote! { let #ident = args.handle::<#inner>()?; },
            ))
        }
        None => Err(Error::new(
            ty.span(),
            "Injected dependencies must be of type Arc<T> or Handle<T>",
        )),
    }
}

fn args_pattern(empty: bool) -> TokenStream2 {
    if empty {
        quote! { _args }
    } else {
        quote! { mut args }
    }
}

/// Derive macro for the Injectable trait
#[proc_macro_derive(Injectable, attributes(named, singleton))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match handle_derive_injectable(input) {
        Ok(v) => v.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Attribute macro for impl blocks with constructor methods
#[proc_macro_attribute]
pub fn injectable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let long_lived = match parse_injectable_args(attr.into()) {
        Ok(v) => v,
        Err(err) => return err.to_compile_error().into(),
    };
    if let Ok(item_impl) = syn::parse::<ItemImpl>(item) {
        return match handle_injectable_impl(item_impl, long_lived) {
            Ok(v) => v.into(),
            Err(err) => err.to_compile_error().into(),
        };
    }
    TokenStream::from(
        Error::new(
            proc_macro2::Span::call_site(),
            "#[injectable] can only be applied to impl blocks",
        )
        .to_compile_error(),
    )
}

fn parse_injectable_args(attr: TokenStream2) -> Result<bool, Error> {
    if attr.is_empty() {
        return Ok(false);
    }
    let ident = syn::parse2::<syn::Ident>(attr)?;
    if ident == SINGLETON_ATTR {
        Ok(true)
    } else {
        Err(Error::new(ident.span(), "Expected `singleton`"))
    }
}

fn handle_derive_injectable(input: DeriveInput) -> Result<TokenStream2, Error> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        _ => return Err(Error::new(name.span(), "Only structs are supported")),
    };
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Generic structs are not supported",
        ));
    }
    let long_lived = has_attr(&input.attrs, SINGLETON_ATTR);

    let mut params = Vec::new();
    let mut field_lets = Vec::new();
    let mut field_inits = Vec::new();

    match fields {
        syn::Fields::Named(fields) => {
            for field in &fields.named {
                let Some(field_ident) = field.ident.as_ref() else {
                    continue;
                };
                let (param, extract) = injection(field_ident, &field.ty, &field.attrs)?;
                params.push(param);
                field_lets.push(extract);
                field_inits.push(quote! { #field_ident });
            }
        }
        syn::Fields::Unnamed(_) => {
            return Err(Error::new(name.span(), "Tuple structs are not supported"));
        }
        syn::Fields::Unit => {}
    }

    let args = args_pattern(params.is_empty());

    Ok(quote! {
        impl ::keystone::Injectable for #name {
            fn constructors() -> ::std::vec::Vec<::keystone::Constructor> {
                ::std::vec![::keystone::Constructor::new(
                    ::std::vec![#(#params),*],
                    |#args: ::keystone::Arguments| -> ::std::result::Result<Self, ::keystone::StdError> {
                        #(#field_lets)*
                        Ok(Self {
                            #(#field_inits,)*
                        })
                    },
                )]
            }

            fn long_lived() -> bool {
                #long_lived
            }
        }
    })
}

fn handle_injectable_impl(input: ItemImpl, long_lived: bool) -> Result<TokenStream2, Error> {
    if input.trait_.is_some() {
        return Err(Error::new(input.span(), "Trait impls are not supported"));
    }
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Generic impl blocks are not supported",
        ));
    }

    let self_ty = &input.self_ty;
    let mut constructors = Vec::new();

    for item in &input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        if !has_attr(&method.attrs, CONSTRUCTOR_ATTR) {
            continue;
        }
        if method.sig.asyncness.is_some() {
            return Err(Error::new(
                method.sig.span(),
                "Constructor methods cannot be async",
            ));
        }

        let method_name = &method.sig.ident;
        let mut params = Vec::new();
        let mut arg_lets = Vec::new();
        let mut arg_names = Vec::new();

        for fn_arg in &method.sig.inputs {
            let pat_type = match fn_arg {
                FnArg::Receiver(_) => {
                    return Err(Error::new(
                        fn_arg.span(),
                        "Constructor method cannot have self parameter",
                    ));
                }
                FnArg::Typed(v) => v,
            };
            let syn::Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
                return Err(Error::new(
                    pat_type.pat.span(),
                    "Only simple bindings supported",
                ));
            };
            let arg_name = &pat_ident.ident;
            let (param, extract) = injection(arg_name, &pat_type.ty, &pat_type.attrs)?;
            params.push(param);
            arg_lets.push(extract);
            arg_names.push(quote! { #arg_name });
        }

        // Extract the actual return type to decide how the instance is wrapped
        let return_type = match &method.sig.output {
            syn::ReturnType::Default => {
                return Err(Error::new(
                    method.sig.span(),
                    "Constructor method must have a return type",
                ));
            }
            syn::ReturnType::Type(_, ty) => ty.as_ref(),
        };
        let (instance_type, is_result) = extract_instance_type(return_type);
        let is_shared = extract_wrapped_type(&instance_type, "Arc").is_some();

        let method_call = quote! { Self::#method_name(#(#arg_names),*) };
        let body = if is_result {
            quote! {
                #(#arg_lets)*
                #method_call.map_err(::std::convert::Into::into)
            }
        } else {
            quote! {
                #(#arg_lets)*
                Ok(#method_call)
            }
        };
        let build = if is_shared {
            quote! { shared }
        } else {
            quote! { new }
        };
        let args = args_pattern(params.is_empty());
        let designated = if has_attr(&method.attrs, INJECT_ATTR) {
            quote! { .designated() }
        } else {
            quote! {}
        };

        constructors.push(quote! {
            ::keystone::Constructor::#build(
                ::std::vec![#(#params),*],
                |#args: ::keystone::Arguments| -> ::std::result::Result<_, ::keystone::StdError> {
                    #body
                },
            )
            #designated
        });
    }

    if constructors.is_empty() {
        return Err(Error::new(input.span(), "No constructor method found"));
    }

    // Create cleaned input with injection attributes removed
    let mut cleaned_input = input.clone();
    for item in &mut cleaned_input.items {
        if let ImplItem::Fn(method) = item
            && has_attr(&method.attrs, CONSTRUCTOR_ATTR)
        {
            method.attrs.retain(|attr| {
                !attr.path().is_ident(CONSTRUCTOR_ATTR) && !attr.path().is_ident(INJECT_ATTR)
            });
            for fn_arg in &mut method.sig.inputs {
                if let FnArg::Typed(pat_type) = fn_arg {
                    pat_type
                        .attrs
                        .retain(|attr| !attr.path().is_ident(NAMED_ATTR));
                }
            }
        }
    }

    Ok(quote! {
        #cleaned_input

        impl ::keystone::Injectable for #self_ty {
            fn constructors() -> ::std::vec::Vec<::keystone::Constructor> {
                ::std::vec![#(#constructors),*]
            }

            fn long_lived() -> bool {
                #long_lived
            }
        }
    })
}

fn extract_instance_type(ty: &Type) -> (Type, bool) {
    // Check if return type is Result<T, E>
    if let Some(inner) = extract_wrapped_type(ty, "Result") {
        return (inner, true);
    }
    (ty.clone(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_rejects_generic_struct() {
        let input: DeriveInput = syn::parse_quote! {
            struct Wrapper<T> {
                inner: Arc<T>,
            }
        };
        let err = handle_derive_injectable(input).err().unwrap();
        assert_eq!(err.to_string(), "Generic structs are not supported");
    }

    #[test]
    fn test_injectable_rejects_generic_impl() {
        let input: ItemImpl = syn::parse_quote! {
            impl<T> Wrapper<T> {
                #[constructor]
                fn new() -> Self {
                    Self
                }
            }
        };
        let err = handle_injectable_impl(input, false).err().unwrap();
        assert_eq!(err.to_string(), "Generic impl blocks are not supported");
    }

    #[test]
    fn test_derive_plain_struct() {
        let input: DeriveInput = syn::parse_quote! {
            struct Plain {
                inner: Arc<u32>,
            }
        };
        let tokens = handle_derive_injectable(input).unwrap().to_string();
        assert!(tokens.contains("Injectable for Plain"));
    }
}
