//! Filter expressions: predicate definitions together with the values
//! they capture.

use std::fmt;
use std::any::{ TypeId, type_name };
use std::panic::Location;
use std::marker::PhantomData;
use bson::Bson;
use crate::meta::Metadata;
use crate::expr::{ Expr, Captures };
use crate::error::Result;

/// Identifies a filter definition, i.e. the fixed logical shape of a
/// predicate, independently of the values it captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionId {
    /// A closure-style definition, identified by the source location where
    /// its instances are created, the function building its expression,
    /// the metadata type it filters and the type of its captured values.
    Location {
        /// Source file of the definition.
        file: &'static str,
        /// Line of the definition.
        line: u32,
        /// Column of the definition.
        column: u32,
        /// Address of the function building the expression.
        function: usize,
        /// The metadata type of the filtered documents.
        metadata: TypeId,
        /// Name of the type of the captured values.
        captures: &'static str,
    },
    /// A definition which is a type of its own, e.g. a hand-written
    /// `FilterExpression` impl.
    Type {
        /// The type of the definition.
        id: TypeId,
        /// Human-readable name of the type.
        name: &'static str,
    },
}

impl DefinitionId {
    /// The identity of a definition that is a type of its own.
    pub fn of<T: ?Sized + 'static>() -> Self {
        DefinitionId::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The identity of the definition whose expression is built by
    /// `definition`, written at `location`, filtering documents described
    /// by `M` and capturing values of type `C`.
    ///
    /// The location alone is not enough: a helper forwarding different
    /// definition functions to `Filter::new` creates all of its filters at
    /// the same call site.
    pub fn at<M, C>(
        location: &'static Location<'static>,
        definition: fn(&M, C::Slots) -> Expr,
    ) -> Self
        where M: Metadata,
              C: Captures,
    {
        DefinitionId::Location {
            file: location.file(),
            line: location.line(),
            column: location.column(),
            function: definition as usize,
            metadata: TypeId::of::<M>(),
            captures: type_name::<C>(),
        }
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DefinitionId::Location { file, line, column, .. } => {
                write!(f, "{}:{}:{}", file, line, column)
            }
            DefinitionId::Type { name, .. } => f.write_str(name),
        }
    }
}

/// The capability of being encoded as a MongoDB filter document.
pub trait FilterExpression: fmt::Debug {
    /// Describes the documents being filtered.
    type Metadata: Metadata;

    /// The identity of the definition of this filter. Every instance of
    /// the same definition must return the same identity, and the
    /// `definition()` of all of them must build the same expression.
    fn definition_id(&self) -> DefinitionId;

    /// The captured values, in slot position order.
    fn captured_values(&self) -> Result<Vec<Bson>>;

    /// Builds the predicate over the field handles in `metadata`, with
    /// slots standing in for the captured values.
    fn definition(&self, metadata: &Self::Metadata) -> Expr;
}

impl<'a, F: FilterExpression + ?Sized> FilterExpression for &'a F {
    type Metadata = F::Metadata;

    fn definition_id(&self) -> DefinitionId {
        (**self).definition_id()
    }

    fn captured_values(&self) -> Result<Vec<Bson>> {
        (**self).captured_values()
    }

    fn definition(&self, metadata: &Self::Metadata) -> Expr {
        (**self).definition(metadata)
    }
}

impl<F: FilterExpression + ?Sized> FilterExpression for Box<F> {
    type Metadata = F::Metadata;

    fn definition_id(&self) -> DefinitionId {
        (**self).definition_id()
    }

    fn captured_values(&self) -> Result<Vec<Bson>> {
        (**self).captured_values()
    }

    fn definition(&self, metadata: &Self::Metadata) -> Expr {
        (**self).definition(metadata)
    }
}

/// A closure-style filter: a non-capturing definition function plus the
/// values it refers to through slots.
///
/// ```
/// # #[macro_use]
/// # extern crate bson;
/// # extern crate quince;
/// #
/// # use quince::prelude::*;
/// #
/// # struct QUser { age: QueryField<i32> }
/// #
/// # impl Metadata for QUser {
/// #     const NAME: &'static str = "User";
/// #     const FIELDS: &'static [FieldDescriptor] = &[
/// #         FieldDescriptor::new("age", BsonType::INT),
/// #     ];
/// #     fn metadata() -> Self {
/// #         QUser { age: QueryField::new("age") }
/// #     }
/// # }
/// #
/// fn adults_below(max: i32) -> Filter<QUser, (i32, i32)> {
///     Filter::new((18, max), |user: &QUser, (min, max)| {
///         user.age.gte(min) & user.age.lt(max)
///     })
/// }
///
/// # fn main() -> QuinceResult<()> {
/// let analyzer = Analyzer::new();
/// let renderer = Renderer::new();
///
/// let young = adults_below(30);
/// let tree = analyzer.analyze(&young)?;
/// assert_eq!(renderer.render(&tree, &young)?, doc!{
///     "$and": [
///         { "age": { "$gte": 18 } },
///         { "age": { "$lt": 30 } },
///     ]
/// });
///
/// // a second instance of the same definition reuses the analyzed tree
/// let tree = analyzer.analyze(&adults_below(65))?;
/// assert_eq!(analyzer.cache_misses(), 1);
/// assert_eq!(analyzer.cache_hits(), 1);
/// # let _ = tree;
/// # Ok(())
/// # }
/// ```
pub struct Filter<M, C: Captures> {
    /// Where the filter was defined.
    location: &'static Location<'static>,
    /// Builds the predicate from field handles and slots.
    definition: fn(&M, C::Slots) -> Expr,
    /// The captured values.
    captures: C,
    /// The metadata type.
    _marker: PhantomData<fn() -> M>,
}

impl<M: Metadata, C: Captures> Filter<M, C> {
    /// Creates a filter instance. The caller's source location together
    /// with the `definition` function identifies the definition, so every
    /// instance created by the same call site from the same function
    /// shares one analyzed operation tree.
    #[track_caller]
    pub fn new(captures: C, definition: fn(&M, C::Slots) -> Expr) -> Self {
        Filter {
            location: Location::caller(),
            definition,
            captures,
            _marker: PhantomData,
        }
    }

    /// The captured values.
    pub fn captures(&self) -> &C {
        &self.captures
    }

    /// Where the filter was defined.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl<M: Metadata, C: Captures + fmt::Debug> FilterExpression for Filter<M, C> {
    type Metadata = M;

    fn definition_id(&self) -> DefinitionId {
        DefinitionId::at::<M, C>(self.location, self.definition)
    }

    fn captured_values(&self) -> Result<Vec<Bson>> {
        self.captures.to_bson_values()
    }

    fn definition(&self, metadata: &M) -> Expr {
        (self.definition)(metadata, C::slots())
    }
}

impl<M: Metadata, C: Captures + fmt::Debug> fmt::Debug for Filter<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Filter")
            .field("metadata", &M::NAME)
            .field("location", &self.location)
            .field("captures", &self.captures)
            .finish()
    }
}
