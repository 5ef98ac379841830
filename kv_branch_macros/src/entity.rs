use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr};

struct EntityAttrs {
    name: String,
    queryable: bool,
}

#[derive(Default)]
struct FieldAttrs {
    id: bool,
    json: bool,
    ignore: bool,
}

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = parse_entity_attrs(input)?;

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Entity derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Entity derive only supports structs",
            ))
        }
    };

    let mut id_field: Option<&Ident> = None;
    let mut descriptors = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_attrs = parse_field_attrs(field)?;
        if field_attrs.id {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(
                    ident,
                    "only one field can be marked #[branch(id)]",
                ));
            }
            id_field = Some(ident);
        }
        descriptors.push(descriptor(field, ident, &field_attrs));
    }

    // Default: the field named "id"
    let id_field = match id_field {
        Some(ident) => ident,
        None => fields
            .iter()
            .filter_map(|f| f.ident.as_ref())
            .find(|ident| *ident == "id")
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    name,
                    "Entity derive: no field marked with #[branch(id)] and no field named `id`",
                )
            })?,
    };

    let entity_name = &attrs.name;
    let id_name = id_field.to_string();
    let queryable = attrs.queryable;

    Ok(quote! {
        impl kv_branch::Entity for #name {
            const NAME: &'static str = #entity_name;
            const ID_FIELD: &'static str = #id_name;
            const QUERYABLE: bool = #queryable;

            fn id(&self) -> &str {
                &self.#id_field
            }

            fn fields() -> ::std::vec::Vec<kv_branch::FieldDescriptor<Self>> {
                ::std::vec![#(#descriptors),*]
            }
        }
    })
}

fn descriptor(field: &Field, ident: &Ident, attrs: &FieldAttrs) -> TokenStream2 {
    let ty = &field.ty;
    let field_name = ident.to_string();
    let type_name: String = quote!(#ty).to_string().split_whitespace().collect();

    if attrs.ignore {
        return quote! {
            kv_branch::FieldDescriptor {
                name: #field_name,
                value_type: kv_branch::ValueType::Composite,
                type_name: #type_name,
                ignore: true,
                get: |_: &Self| ::std::result::Result::Ok(kv_branch::FieldValue::Null),
                set: |_: &mut Self, _: kv_branch::FieldValue| ::std::result::Result::Ok(()),
            }
        };
    }

    if attrs.json {
        return quote! {
            kv_branch::FieldDescriptor {
                name: #field_name,
                value_type: kv_branch::ValueType::Composite,
                type_name: #type_name,
                ignore: false,
                get: |entity: &Self| kv_branch::json_value(&entity.#ident),
                set: |entity: &mut Self, value: kv_branch::FieldValue| {
                    entity.#ident = kv_branch::json_field::<#ty>(value)?;
                    ::std::result::Result::Ok(())
                },
            }
        };
    }

    quote! {
        kv_branch::FieldDescriptor {
            name: #field_name,
            value_type: <#ty as kv_branch::FieldType>::VALUE_TYPE,
            type_name: #type_name,
            ignore: false,
            get: |entity: &Self| {
                ::std::result::Result::Ok(kv_branch::IntoFieldValue::to_field_value(&entity.#ident))
            },
            set: |entity: &mut Self, value: kv_branch::FieldValue| {
                entity.#ident = <#ty as kv_branch::FieldType>::from_field_value(value)?;
                ::std::result::Result::Ok(())
            },
        }
    }
}

fn parse_entity_attrs(input: &DeriveInput) -> syn::Result<EntityAttrs> {
    let mut attrs = EntityAttrs {
        name: input.ident.to_string(),
        queryable: false,
    };
    for attr in &input.attrs {
        if !attr.path().is_ident("branch") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.name = value.value();
                Ok(())
            } else if meta.path.is_ident("queryable") {
                attrs.queryable = true;
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"` or `queryable`"))
            }
        })?;
    }
    Ok(attrs)
}

fn parse_field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("branch") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                attrs.id = true;
            } else if meta.path.is_ident("json") {
                attrs.json = true;
            } else if meta.path.is_ident("ignore") {
                attrs.ignore = true;
            } else {
                return Err(meta.error("expected `id`, `json` or `ignore`"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}
