// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

/// Field kind for code generation
struct FieldKind {
    /// `::vmbridge::NativeType` variant
    native_tokens: proc_macro2::TokenStream,
    /// `::vmbridge::ScriptBuffer` variant
    buffer_tokens: proc_macro2::TokenStream,
}

/// `#[derive(WireRecord)]` macro: generates `NativeValue` + `WireRecord` impls
///
/// Fields travel in declaration order with their built-in encoding. The
/// generated codec carries script snippets built from the same field list.
///
/// Supports:
/// - Integers: i8, i16, i32, i64, u8, u16, u32
/// - Floats: f32, f64, Half
/// - bool, char, String
///
/// Example:
/// ```ignore
/// use vmbridge::WireRecord;
///
/// #[derive(WireRecord)]
/// struct Vec2 {
///     x: f32,
///     y: f32,
/// }
/// ```
#[proc_macro_derive(WireRecord)]
pub fn derive_wire_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let type_name = name.to_string();

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "Generic records are not supported")
            .to_compile_error()
            .into();
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return syn::Error::new_spanned(&input, "Only named fields are supported")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Only structs are supported")
                .to_compile_error()
                .into()
        }
    };

    struct FieldInfo {
        name: syn::Ident,
        ty: syn::Type,
        kind: FieldKind,
    }

    let mut field_infos = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            return syn::Error::new_spanned(field, "Field must have a name")
                .to_compile_error()
                .into();
        };
        let Some(kind) = get_field_kind(&field.ty) else {
            return syn::Error::new_spanned(
                &field.ty,
                "Unsupported field type. Supported types: i8, i16, i32, i64, u8, u16, u32, \
                 f32, f64, Half, bool, char, String.",
            )
            .to_compile_error()
            .into();
        };
        field_infos.push(FieldInfo {
            name: field_name.clone(),
            ty: field.ty.clone(),
            kind,
        });
    }

    let field_count = field_infos.len();
    let bindings: Vec<_> = (0..field_count).map(|i| format_ident!("field_{}", i)).collect();
    let count_error = format!("{} expects {} fields", type_name, field_count);

    let into_fields = field_infos.iter().map(|f| {
        let field_name = &f.name;
        quote! { ::vmbridge::NativeValue::into_wire(self.#field_name) }
    });

    let from_fields = field_infos.iter().zip(&bindings).map(|(f, binding)| {
        let field_name = &f.name;
        let ty = &f.ty;
        quote! { #field_name: <#ty as ::vmbridge::NativeValue>::from_wire(#binding)? }
    });

    let encode_fields = field_infos.iter().zip(&bindings).map(|(f, binding)| {
        let native = &f.kind.native_tokens;
        quote! { writer.write_builtin_as(&#native, #binding)?; }
    });

    let decode_fields = field_infos.iter().map(|f| {
        let native = &f.kind.native_tokens;
        quote! { reader.read_builtin(&#native)? }
    });

    let script_fields = field_infos.iter().map(|f| {
        let name_str = f.name.to_string();
        let buffer = &f.kind.buffer_tokens;
        quote! { (#name_str, #buffer) }
    });

    let expanded = quote! {
        impl ::vmbridge::NativeValue for #name {
            fn native_type() -> ::vmbridge::NativeType {
                ::vmbridge::NativeType::named(#type_name)
            }

            fn into_wire(self) -> ::vmbridge::WireValue {
                ::vmbridge::WireValue::Record(
                    <Self as ::vmbridge::NativeValue>::native_type(),
                    vec![#(#into_fields),*],
                )
            }

            fn from_wire(value: ::vmbridge::WireValue) -> ::vmbridge::BridgeResult<Self> {
                let expected = <Self as ::vmbridge::NativeValue>::native_type();
                let fields = match value {
                    ::vmbridge::WireValue::Record(ty, fields) if ty == expected => fields,
                    other => {
                        return Err(::vmbridge::BridgeError::TypeMismatch {
                            expected,
                            found: other.native_type(),
                        })
                    }
                };
                let Ok([#(#bindings),*]) = <[::vmbridge::WireValue; #field_count]>::try_from(fields) else {
                    return Err(::vmbridge::BridgeError::InvalidValue {
                        reason: #count_error.to_string(),
                    });
                };
                Ok(Self {
                    #(#from_fields),*
                })
            }
        }

        impl ::vmbridge::codec::WireRecord for #name {
            fn codec() -> ::vmbridge::Codec {
                ::vmbridge::Codec::new(
                    <Self as ::vmbridge::NativeValue>::native_type(),
                    |writer, value| {
                        let expected = <Self as ::vmbridge::NativeValue>::native_type();
                        let [#(#bindings),*] = value.expect_record(&expected)? else {
                            return Err(::vmbridge::BridgeError::InvalidValue {
                                reason: #count_error.to_string(),
                            });
                        };
                        #(#encode_fields)*
                        Ok(())
                    },
                    |reader| {
                        Ok(::vmbridge::WireValue::Record(
                            <Self as ::vmbridge::NativeValue>::native_type(),
                            vec![#(#decode_fields),*],
                        ))
                    },
                    ::vmbridge::ScriptCodec::record(&[#(#script_fields),*]),
                )
            }
        }
    };

    TokenStream::from(expanded)
}

/// Get field kind for a Rust type
fn get_field_kind(ty: &syn::Type) -> Option<FieldKind> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if !segment.arguments.is_empty() {
        return None;
    }

    let (native, buffer) = match segment.ident.to_string().as_str() {
        "u8" => (quote!(U8), quote!(U8)),
        "i8" => (quote!(I8), quote!(S8)),
        "u16" => (quote!(U16), quote!(U16)),
        "i16" => (quote!(I16), quote!(S16)),
        "u32" => (quote!(U32), quote!(U32)),
        "i32" => (quote!(I32), quote!(S32)),
        // The script side has no signed 64-bit buffer kind
        "i64" => (quote!(I64), quote!(U64)),
        "Half" => (quote!(F16), quote!(F16)),
        "f32" => (quote!(F32), quote!(F32)),
        "f64" => (quote!(F64), quote!(F64)),
        "bool" => (quote!(Bool), quote!(Bool)),
        "String" => (quote!(String), quote!(String)),
        "char" => (quote!(Char), quote!(String)),
        _ => return None,
    };

    Some(FieldKind {
        native_tokens: quote! { ::vmbridge::NativeType::#native },
        buffer_tokens: quote! { ::vmbridge::ScriptBuffer::#buffer },
    })
}
