//! Document metadata and filters shared by the integration tests.

#![allow(dead_code)]

use quince::prelude::*;

/// An enum stored by its upper-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnumFoo {
    Foo,
    Bar,
}

/// Metadata of an embedded location document.
pub struct QLocation {
    pub city: QueryField<String>,
    pub zip: QueryField<String>,
}

impl Metadata for QLocation {
    const NAME: &'static str = "Location";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("city", BsonType::STRING),
        FieldDescriptor::new("zip", BsonType::STRING),
    ];

    fn metadata() -> Self {
        QLocation {
            city: QueryField::new("city"),
            zip: QueryField::new("zip"),
        }
    }
}

/// Metadata of the `Foo` test document.
pub struct QFoo {
    pub string_field: QueryField<String>,
    pub primitive_int_field: QueryField<i32>,
    pub enum_foo: QueryField<EnumFoo>,
    pub rating: QueryField<f64>,
    pub flag: QueryField<bool>,
    pub tags: QueryArrayField<String>,
    pub locations: QueryArrayField<QLocation>,
}

impl Metadata for QFoo {
    const NAME: &'static str = "Foo";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("stringField", BsonType::STRING),
        FieldDescriptor::new("primitiveIntField", BsonType::INT),
        FieldDescriptor::new("enumFoo", BsonType::STRING),
        FieldDescriptor::new("rating", BsonType::DOUBLE),
        FieldDescriptor::new("flag", BsonType::BOOL),
        FieldDescriptor::new("tags", BsonType::ARRAY),
        FieldDescriptor::new("locations", BsonType::ARRAY),
    ];

    fn metadata() -> Self {
        QFoo {
            string_field: QueryField::new("stringField"),
            primitive_int_field: QueryField::new("primitiveIntField"),
            enum_foo: QueryField::new("enumFoo"),
            rating: QueryField::new("rating"),
            flag: QueryField::new("flag"),
            tags: QueryArrayField::new("tags"),
            locations: QueryArrayField::new("locations"),
        }
    }
}

/// `stringField == s || primitiveIntField == n || enumFoo == e`
pub fn any_of(s: &str, n: i32, e: EnumFoo) -> Filter<QFoo, (String, i32, EnumFoo)> {
    Filter::new((s.to_owned(), n, e), |foo: &QFoo, (s, n, e)| {
        foo.string_field.eq(s) | foo.primitive_int_field.eq(n) | foo.enum_foo.eq(e)
    })
}

/// `stringField == s && primitiveIntField == n`
pub fn both(s: &str, n: i32) -> Filter<QFoo, (String, i32)> {
    Filter::new((s.to_owned(), n), |foo: &QFoo, (s, n)| {
        foo.string_field.eq(s) & foo.primitive_int_field.eq(n)
    })
}

/// `primitiveIntField` in the half-open range `[lo, hi)`
pub fn int_range(lo: i32, hi: i32) -> Filter<QFoo, (i32, i32)> {
    Filter::new((lo, hi), |foo: &QFoo, (lo, hi)| {
        foo.primitive_int_field.gte(lo) & foo.primitive_int_field.lt(hi)
    })
}
