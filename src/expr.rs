//! Source-level filter expressions, as written with the field handles of a
//! metadata type, and the value slots standing in for captured values.

use std::fmt;
use std::ops::{ BitAnd, BitOr, Not };
use std::marker::PhantomData;
use bson::Bson;
use serde::Serialize;
use crate::literal::Operator;
use crate::meta::FieldDescriptor;
use crate::bsn::serialize_value;
use crate::error::Result;

/// A placeholder for the captured value of type `T` at a given position.
///
/// Filter definitions never see actual values, only slots, so that the
/// structure of a definition can be analyzed once and reused for every
/// set of captured values.
pub struct Slot<T> {
    /// Position of the referenced value among the captured values.
    position: usize,
    /// The type of the referenced value.
    _marker: PhantomData<fn() -> T>,
}

impl<T> Slot<T> {
    /// Creates a slot referring to the captured value at `position`.
    ///
    /// Closure-style filters get their slots from `Captures::slots()`;
    /// this constructor is for hand-written `FilterExpression` impls.
    pub fn new(position: usize) -> Self {
        Slot { position, _marker: PhantomData }
    }

    /// The position of the referenced value among the captured values.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Slot({})", self.position)
    }
}

/// A boolean predicate over the fields of a document, as written in a
/// filter definition. Combine expressions with `&`, `|` and `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A test of a single field against a captured value.
    Field {
        /// The BSON name of the field.
        name: &'static str,
        /// The operator applied to the field.
        operator: Operator,
        /// Position of the captured value.
        position: usize,
    },
    /// Some element of an array field matches the inner expression,
    /// which refers to the fields described by `fields`.
    ElemMatch {
        /// The BSON name of the array field.
        name: &'static str,
        /// The fields of the element type.
        fields: &'static [FieldDescriptor],
        /// Criteria for an element.
        criteria: Box<Expr>,
    },
    /// Logical conjunction.
    And(Vec<Expr>),
    /// Logical disjunction.
    Or(Vec<Expr>),
    /// Logical negation.
    Not(Box<Expr>),
}

impl Expr {
    /// Tests the field `name` with `operator` against the captured value
    /// referred to by `slot`.
    pub fn field<T>(name: &'static str, operator: Operator, slot: Slot<T>) -> Self {
        Expr::Field { name, operator, position: slot.position }
    }

    /// Some element of the array field `name` satisfies `criteria`.
    pub fn elem_match(
        name: &'static str,
        fields: &'static [FieldDescriptor],
        criteria: Expr,
    ) -> Self {
        Expr::ElemMatch { name, fields, criteria: Box::new(criteria) }
    }

    /// All of the expressions hold.
    pub fn all_of<I: IntoIterator<Item = Expr>>(exprs: I) -> Self {
        Expr::And(exprs.into_iter().collect())
    }

    /// At least one of the expressions holds.
    pub fn any_of<I: IntoIterator<Item = Expr>>(exprs: I) -> Self {
        Expr::Or(exprs.into_iter().collect())
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        Expr::And(vec![self, rhs])
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        Expr::Or(vec![self, rhs])
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

/// The values captured by a filter instance.
///
/// Implemented for `()` and for tuples of up to 8 serializable values.
/// The slots handed to the filter definition mirror the tuple: the slot
/// at index `i` refers to the `i`th element.
pub trait Captures {
    /// A tuple of slots, one per captured value.
    type Slots: Copy;

    /// The slots referring to each captured value, in order.
    fn slots() -> Self::Slots;

    /// Converts the captured values to BSON, in order.
    fn to_bson_values(&self) -> Result<Vec<Bson>>;
}

impl Captures for () {
    type Slots = ();

    fn slots() -> Self::Slots {}

    fn to_bson_values(&self) -> Result<Vec<Bson>> {
        Ok(Vec::new())
    }
}

/// Implements `Captures` for a tuple type.
macro_rules! impl_captures {
    ($($ty:ident: $idx:tt),+) => {
        impl<$($ty: Serialize),+> Captures for ($($ty,)+) {
            type Slots = ($(Slot<$ty>,)+);

            fn slots() -> Self::Slots {
                ($(Slot::new($idx),)+)
            }

            fn to_bson_values(&self) -> Result<Vec<Bson>> {
                Ok(vec![$(serialize_value(&self.$idx)?),+])
            }
        }
    }
}

impl_captures! { A: 0 }
impl_captures! { A: 0, B: 1 }
impl_captures! { A: 0, B: 1, C: 2 }
impl_captures! { A: 0, B: 1, C: 2, D: 3 }
impl_captures! { A: 0, B: 1, C: 2, D: 3, E: 4 }
impl_captures! { A: 0, B: 1, C: 2, D: 3, E: 4, F: 5 }
impl_captures! { A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6 }
impl_captures! { A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinators_nest_in_source_order() {
        let a = Expr::field("a", Operator::Eq, Slot::<i32>::new(0));
        let b = Expr::field("b", Operator::Gt, Slot::<i32>::new(1));
        let c = Expr::field("c", Operator::Lt, Slot::<i32>::new(2));

        assert_eq!(
            a.clone() | b.clone() & !c.clone(),
            Expr::Or(vec![
                a,
                Expr::And(vec![b, Expr::Not(Box::new(c))]),
            ])
        );
    }

    #[test]
    fn tuple_slots_follow_positions() -> Result<()> {
        let (first, second, third) = <(String, i32, bool)>::slots();

        assert_eq!(first.position(), 0);
        assert_eq!(second.position(), 1);
        assert_eq!(third.position(), 2);

        let values = (String::from("John"), 42, true).to_bson_values()?;
        assert_eq!(values, vec![Bson::from("John"), Bson::I32(42), Bson::Boolean(true)]);

        Ok(())
    }

    #[test]
    fn no_captures() -> Result<()> {
        assert!(().to_bson_values()?.is_empty());
        Ok(())
    }
}
