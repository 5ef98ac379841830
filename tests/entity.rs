mod support;

use kv_branch::{codec, CodecError, Entity, FieldType, FieldValue, HashEntry, ValueType};
use support::stock::*;

fn entry<'a>(entries: &'a [HashEntry], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|e| e.name == name)
        .map(|e| e.value.as_str())
}

#[test]
fn derived_field_table() {
    assert_eq!(Stock::NAME, "Stock");
    assert_eq!(Stock::ID_FIELD, "id");
    assert!(Stock::QUERYABLE);

    let fields = Stock::fields();
    let names: Vec<&str> = fields.iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "name",
            "sector",
            "price",
            "price_change_rate",
            "created_at",
            "is_active",
            "first_letter",
            "volume",
            "meta",
            "scratch",
        ]
    );

    let value_type = |name: &str| Stock::field(name).map(|f| f.value_type);
    assert_eq!(value_type("sector"), Some(ValueType::Enum));
    assert_eq!(value_type("price"), Some(ValueType::Double));
    assert_eq!(value_type("created_at"), Some(ValueType::DateTime));
    assert_eq!(value_type("first_letter"), Some(ValueType::Char));
    assert_eq!(value_type("volume"), Some(ValueType::UInt64));
    assert_eq!(value_type("meta"), Some(ValueType::Composite));
    assert!(Stock::field("scratch").unwrap().ignore);
    assert!(Stock::field("ticker").is_none());
}

#[test]
fn encodes_hash_entries() {
    let stock = Stock::new("A1", "TESLA", Sector::Energy, 229.0, 12.5);
    let entries = codec::encode(&stock).unwrap();

    assert_eq!(entry(&entries, "id"), Some("A1"));
    assert_eq!(entry(&entries, "sector"), Some("2"));
    assert_eq!(entry(&entries, "price"), Some("229"));
    assert_eq!(entry(&entries, "is_active"), Some("true"));
    assert_eq!(entry(&entries, "created_at"), Some("638396640000000000|UTC"));
    assert_eq!(
        entry(&entries, "meta"),
        Some(r#"{"country":"USA","currency":"Usd"}"#)
    );
    // Nulls and ignored fields are not written.
    assert_eq!(entry(&entries, "volume"), None);
    assert_eq!(entry(&entries, "scratch"), None);
}

#[test]
fn decodes_missing_fields_as_defaults() {
    let entries = vec![
        HashEntry::new("id", "A1"),
        HashEntry::new("price", "12.25"),
        HashEntry::new("sector", "3"),
        HashEntry::new("unknown", "ignored"),
    ];
    let stock: Stock = codec::decode(&entries).unwrap();

    assert_eq!(stock.id, "A1");
    assert_eq!(stock.price, 12.25);
    assert_eq!(stock.sector, Sector::Finance);
    assert_eq!(stock.name, "");
    assert_eq!(stock.volume, None);
    assert_eq!(stock.meta, StockMetaData::default());
}

#[test]
fn decode_errors_name_the_field() {
    let entries = vec![HashEntry::new("id", "A1"), HashEntry::new("sector", "9")];
    let err = codec::decode::<Stock>(&entries).unwrap_err();
    match err {
        CodecError::Field { field, source } => {
            assert_eq!(field, "sector");
            assert_eq!(
                *source,
                CodecError::UnknownDiscriminant {
                    ty: "Sector",
                    value: 9
                }
            );
        }
        other => panic!("unexpected error {:?}", other),
    }

    let entries = vec![HashEntry::new("id", "A1"), HashEntry::new("price", "cheap")];
    assert!(codec::decode::<Stock>(&entries).is_err());
}

#[test]
fn field_enums_accept_labels_and_discriminants() {
    assert_eq!(
        Sector::from_field_value(FieldValue::Str("Energy".into())).unwrap(),
        Sector::Energy
    );
    assert_eq!(Sector::from_field_value(FieldValue::Int(1)).unwrap(), Sector::Technology);
    assert!(Sector::from_field_value(FieldValue::Str("Mining".into())).is_err());
    assert!(Sector::from_field_value(FieldValue::Bool(true)).is_err());

    match kv_branch::IntoFieldValue::to_field_value(&Sector::Finance) {
        FieldValue::Enum(value) => {
            assert_eq!(value.discriminant, 3);
            assert_eq!(value.label, "Finance");
        }
        other => panic!("unexpected value {:?}", other),
    }
}
