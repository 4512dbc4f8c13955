//! Metadata: the queryable fields of a document type.
//!
//! A metadata type is a plain struct with one field handle per document
//! field, plus a static list of `FieldDescriptor`s. It is normally produced
//! by a code generator from the domain type, but can just as well be
//! written by hand:
//!
//! ```
//! # extern crate quince;
//! #
//! # use quince::prelude::*;
//! #
//! struct QUser {
//!     name: QueryField<String>,
//!     age: QueryField<u32>,
//!     roles: QueryArrayField<String>,
//! }
//!
//! impl Metadata for QUser {
//!     const NAME: &'static str = "User";
//!     const FIELDS: &'static [FieldDescriptor] = &[
//!         FieldDescriptor::new("name", BsonType::STRING),
//!         FieldDescriptor::new("age", BsonType::INT),
//!         FieldDescriptor::new("roles", BsonType::ARRAY),
//!     ];
//!
//!     fn metadata() -> Self {
//!         QUser {
//!             name: QueryField::new("name"),
//!             age: QueryField::new("age"),
//!             roles: QueryArrayField::new("roles"),
//!         }
//!     }
//! }
//! #
//! # fn main() {
//! # let user = QUser::metadata();
//! # assert_eq!(user.name.name(), "name");
//! # assert_eq!(user.age.name(), "age");
//! # assert_eq!(user.roles.name(), "roles");
//! # }
//! ```

use std::fmt;
use std::marker::PhantomData;
use crate::literal::{ BsonType, Operator };
use crate::expr::{ Expr, Slot };

/// Describes a single field of a document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// The name of the field, as it appears in BSON.
    pub name: &'static str,
    /// The BSON types the field may hold.
    pub types: BsonType,
}

impl FieldDescriptor {
    /// Creates a descriptor for a field of the given name and types.
    pub const fn new(name: &'static str, types: BsonType) -> Self {
        FieldDescriptor { name, types }
    }

    /// Whether the operator can be used to filter on this field.
    pub fn supports(&self, operator: Operator) -> bool {
        operator.applies_to(self.types)
    }
}

/// Implemented by the metadata type of each document (or embedded
/// document) type that can be filtered on.
pub trait Metadata: Sized + 'static {
    /// The name of the described document type.
    const NAME: &'static str;

    /// Descriptors of the fields that can be filtered on.
    const FIELDS: &'static [FieldDescriptor];

    /// Creates the field handles used for writing filter definitions.
    fn metadata() -> Self;

    /// Looks up the descriptor of a field by name.
    fn descriptor(name: &str) -> Option<&'static FieldDescriptor> {
        Self::FIELDS.iter().find(|field| field.name == name)
    }
}

/// Marks the types of captured values that a field of type `T` can be
/// compared with.
pub trait FieldValue<T: ?Sized> {}

impl<T> FieldValue<T> for T {}

impl<'a, T: ?Sized> FieldValue<T> for &'a T {}

impl<'a> FieldValue<String> for &'a str {}

impl<T> FieldValue<Option<T>> for T {}

impl FieldValue<usize> for u32 {}

impl FieldValue<usize> for u64 {}

impl FieldValue<usize> for i32 {}

impl FieldValue<usize> for i64 {}

/// Handle to a scalar (or embedded document) field of type `T`.
pub struct QueryField<T> {
    /// The BSON name of the field.
    name: &'static str,
    /// The type of the field.
    _marker: PhantomData<fn() -> T>,
}

impl<T> QueryField<T> {
    /// Creates a handle for the field with the given BSON name.
    pub const fn new(name: &'static str) -> Self {
        QueryField { name, _marker: PhantomData }
    }

    /// The BSON name of the field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The field equals the captured value.
    pub fn eq<V: FieldValue<T>>(&self, value: Slot<V>) -> Expr {
        Expr::field(self.name, Operator::Eq, value)
    }

    /// The field is not equal to the captured value. This also matches
    /// documents which don't contain the field.
    pub fn ne<V: FieldValue<T>>(&self, value: Slot<V>) -> Expr {
        Expr::field(self.name, Operator::Ne, value)
    }

    /// The field is greater than the captured value.
    pub fn gt<V: FieldValue<T>>(&self, value: Slot<V>) -> Expr {
        Expr::field(self.name, Operator::Gt, value)
    }

    /// The field is greater than or equal to the captured value.
    pub fn gte<V: FieldValue<T>>(&self, value: Slot<V>) -> Expr {
        Expr::field(self.name, Operator::Gte, value)
    }

    /// The field is less than the captured value.
    pub fn lt<V: FieldValue<T>>(&self, value: Slot<V>) -> Expr {
        Expr::field(self.name, Operator::Lt, value)
    }

    /// The field is less than or equal to the captured value.
    pub fn lte<V: FieldValue<T>>(&self, value: Slot<V>) -> Expr {
        Expr::field(self.name, Operator::Lte, value)
    }

    /// The field equals any of the captured values.
    pub fn is_in<V>(&self, values: Slot<V>) -> Expr
        where V: IntoIterator,
              V::Item: FieldValue<T>,
    {
        Expr::field(self.name, Operator::In, values)
    }

    /// The field equals none of the captured values, or doesn't exist.
    pub fn not_in<V>(&self, values: Slot<V>) -> Expr
        where V: IntoIterator,
              V::Item: FieldValue<T>,
    {
        Expr::field(self.name, Operator::Nin, values)
    }
}

impl<T> Clone for QueryField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for QueryField<T> {}

impl<T> fmt::Debug for QueryField<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "QueryField({})", self.name)
    }
}

/// Handle to an array field whose elements are of type `E`. For arrays of
/// embedded documents, `E` is the metadata type of the element documents.
pub struct QueryArrayField<E> {
    /// The BSON name of the field.
    name: &'static str,
    /// The element type.
    _marker: PhantomData<fn() -> E>,
}

impl<E> QueryArrayField<E> {
    /// Creates a handle for the array field with the given BSON name.
    pub const fn new(name: &'static str) -> Self {
        QueryArrayField { name, _marker: PhantomData }
    }

    /// The BSON name of the field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The array contains all of the captured values.
    pub fn all<V>(&self, values: Slot<V>) -> Expr where V: IntoIterator {
        Expr::field(self.name, Operator::All, values)
    }

    /// The array has exactly as many elements as the captured value says.
    pub fn size<V: FieldValue<usize>>(&self, size: Slot<V>) -> Expr {
        Expr::field(self.name, Operator::Size, size)
    }
}

impl<E: Metadata> QueryArrayField<E> {
    /// At least one element of the array matches all the criteria built
    /// by `criteria` over the fields of the element type.
    pub fn elem_match<F>(&self, criteria: F) -> Expr
        where F: FnOnce(&E) -> Expr
    {
        let element = E::metadata();
        Expr::elem_match(self.name, E::FIELDS, criteria(&element))
    }
}

impl<E> Clone for QueryArrayField<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for QueryArrayField<E> {}

impl<E> fmt::Debug for QueryArrayField<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "QueryArrayField({})", self.name)
    }
}
