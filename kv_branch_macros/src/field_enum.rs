use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

pub fn derive_field_enum(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = name.to_string();

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "FieldEnum derive only supports enums",
        ));
    };

    let mut variants = Vec::new();
    for variant in &data_enum.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "FieldEnum derive only supports fieldless variants",
            ));
        }
        variants.push(&variant.ident);
    }
    let labels: Vec<String> = variants.iter().map(|v| v.to_string()).collect();

    Ok(quote! {
        impl kv_branch::IntoFieldValue for #name {
            fn to_field_value(&self) -> kv_branch::FieldValue {
                let (discriminant, label) = match self {
                    #(Self::#variants => (Self::#variants as i64, #labels),)*
                };
                kv_branch::FieldValue::Enum(kv_branch::EnumValue { discriminant, label })
            }
        }

        impl kv_branch::FieldType for #name {
            const VALUE_TYPE: kv_branch::ValueType = kv_branch::ValueType::Enum;

            fn from_field_value(
                value: kv_branch::FieldValue,
            ) -> ::std::result::Result<Self, kv_branch::CodecError> {
                let discriminant = match value {
                    kv_branch::FieldValue::Enum(e) => e.discriminant,
                    kv_branch::FieldValue::Int(n) => n,
                    kv_branch::FieldValue::UInt(n) => i64::try_from(n).map_err(|_| {
                        kv_branch::CodecError::OutOfRange {
                            expected: kv_branch::ValueType::Enum,
                            value: n.to_string(),
                        }
                    })?,
                    kv_branch::FieldValue::Str(s) => {
                        #(if s == #labels {
                            return ::std::result::Result::Ok(Self::#variants);
                        })*
                        return ::std::result::Result::Err(kv_branch::CodecError::Parse {
                            expected: kv_branch::ValueType::Enum,
                            value: s,
                        });
                    }
                    other => {
                        return ::std::result::Result::Err(kv_branch::CodecError::TypeMismatch {
                            expected: kv_branch::ValueType::Enum,
                            found: other.kind_name(),
                        })
                    }
                };
                #(if discriminant == Self::#variants as i64 {
                    return ::std::result::Result::Ok(Self::#variants);
                })*
                ::std::result::Result::Err(kv_branch::CodecError::UnknownDiscriminant {
                    ty: #type_name,
                    value: discriminant,
                })
            }
        }
    })
}
