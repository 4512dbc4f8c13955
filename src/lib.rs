//! Quince: statically-typed, cached MongoDB filter expressions.
//!
//! Filters are written against the *metadata* of a document type: a struct
//! of typed field handles. A filter definition never sees actual values,
//! only *slots* standing in for the values its instances capture. The
//! [`Analyzer`](analyzer/struct.Analyzer.html) lowers each definition into
//! an [`OperationTree`](tree/struct.OperationTree.html) once, and the
//! [`Renderer`](render/struct.Renderer.html) combines that tree with the
//! captured values of each instance to produce a MongoDB filter document.
//!
//! ```
//! # #[macro_use]
//! # extern crate bson;
//! # #[macro_use]
//! # extern crate serde_derive;
//! # extern crate quince;
//! #
//! # use quince::prelude::*;
//! #
//! #[derive(Debug, Clone, Copy, Serialize)]
//! enum Plan { Free, Pro }
//!
//! struct QUser {
//!     name: QueryField<String>,
//!     age: QueryField<i32>,
//!     plan: QueryField<Plan>,
//! }
//!
//! impl Metadata for QUser {
//!     const NAME: &'static str = "User";
//!     const FIELDS: &'static [FieldDescriptor] = &[
//!         FieldDescriptor::new("name", BsonType::STRING),
//!         FieldDescriptor::new("age", BsonType::INT),
//!         FieldDescriptor::new("plan", BsonType::STRING),
//!     ];
//!
//!     fn metadata() -> Self {
//!         QUser {
//!             name: QueryField::new("name"),
//!             age: QueryField::new("age"),
//!             plan: QueryField::new("plan"),
//!         }
//!     }
//! }
//!
//! fn by_any(name: &str, age: i32, plan: Plan) -> Filter<QUser, (String, i32, Plan)> {
//!     Filter::new((name.to_owned(), age, plan), |user: &QUser, (name, age, plan)| {
//!         user.name.eq(name) | user.age.eq(age) | user.plan.eq(plan)
//!     })
//! }
//!
//! # fn main() -> QuinceResult<()> {
//! let analyzer = Analyzer::new();
//! let renderer = Renderer::new();
//!
//! let john = by_any("John", 42, Plan::Free);
//! let tree = analyzer.analyze(&john)?;
//! assert_eq!(renderer.render(&tree, &john)?, doc!{
//!     "$or": [
//!         { "name": "John" },
//!         { "age": 42 },
//!         { "plan": "Free" },
//!     ]
//! });
//!
//! let jack = by_any("Jack", 43, Plan::Pro);
//! let tree = analyzer.analyze(&jack)?;
//! assert_eq!(renderer.render(&tree, &jack)?, doc!{
//!     "$or": [
//!         { "name": "Jack" },
//!         { "age": 43 },
//!         { "plan": "Pro" },
//!     ]
//! });
//!
//! assert_eq!(analyzer.cache_misses(), 1);
//! assert_eq!(analyzer.cache_hits(), 1);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/quince/0.1.0")]
#![deny(missing_debug_implementations, missing_copy_implementations,
        trivial_casts, trivial_numeric_casts,
        unsafe_code,
        unstable_features,
        anonymous_parameters, bare_trait_objects,
        unused_import_braces, missing_docs)]
#![allow(clippy::single_match, clippy::match_same_arms, clippy::match_ref_pats,
         clippy::clone_on_ref_ptr, clippy::needless_pass_by_value,
         clippy::new_without_default)]
#![deny(clippy::wrong_pub_self_convention, clippy::used_underscore_binding,
        clippy::similar_names, clippy::pub_enum_variant_names,
        clippy::non_ascii_literal, clippy::unicode_not_nfc,
        clippy::result_unwrap_used, clippy::option_unwrap_used,
        clippy::option_map_unwrap_or_else, clippy::option_map_unwrap_or,
        clippy::int_plus_one, clippy::string_add_assign, clippy::if_not_else,
        clippy::invalid_upcast_comparisons,
        clippy::cast_precision_loss, clippy::cast_lossless,
        clippy::mutex_integer, clippy::mut_mut, clippy::items_after_statements,
        clippy::print_stdout, clippy::mem_forget, clippy::maybe_infinite_iter)]

#[macro_use]
extern crate bitflags;
#[cfg_attr(test, macro_use)]
extern crate bson;
extern crate mongodb;
#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate backtrace;
extern crate typemap;
extern crate dashmap;
extern crate tracing;

pub mod meta;
pub mod expr;
pub mod filter;
pub mod tree;
pub mod analyzer;
pub mod render;
pub mod codec;
pub mod ext;
pub mod literal;
pub mod bsn;
pub mod utils;
pub mod error;
pub mod prelude;
