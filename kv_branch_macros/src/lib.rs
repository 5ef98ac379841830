mod entity;
mod field_enum;

use proc_macro::TokenStream;

/// Derive macro for `kv_branch::Entity`.
///
/// Generates the entity name, the id accessor and the static field table the
/// codec and branches work from.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Default, Entity)]
/// #[branch(name = "Stock", queryable)]
/// struct Stock {
///     #[branch(id)]
///     id: String,
///     sector: Sector,          // #[derive(FieldEnum)]
///     price: f64,
///     #[branch(json)]
///     meta: StockMetaData,     // stored as a JSON blob
///     #[branch(ignore)]
///     scratch: Vec<u8>,        // never stored
/// }
/// ```
///
/// Struct attributes:
/// - `name = "..."`: entity name used as the first key segment (default: the struct name)
/// - `queryable`: generate a query branch for every indexable property
///
/// Field attributes:
/// - `id`: the id field (default: the field named `id`)
/// - `json`: store a composite value as JSON
/// - `ignore`: skip the field entirely
#[proc_macro_derive(Entity, attributes(branch))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input)
}

/// Derive macro for fieldless enums used as entity fields.
///
/// The discriminant is what gets stored and scored; the variant name is what
/// appears in group keys.
#[proc_macro_derive(FieldEnum)]
pub fn derive_field_enum(input: TokenStream) -> TokenStream {
    field_enum::derive_field_enum(input)
}
