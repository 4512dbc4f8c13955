//! The Quince prelude provides re-exports of the most commonly used traits
//! and types for convenience, including ones from crate `bson`.

pub use crate::meta::{ Metadata, FieldDescriptor, FieldValue, QueryField, QueryArrayField };
pub use crate::expr::{ Expr, Slot, Captures };
pub use crate::filter::{ Filter, FilterExpression, DefinitionId };
pub use crate::tree::{ Node, SlotId, OperationTree };
pub use crate::analyzer::{ Analyzer, AnalyzerOptions };
pub use crate::render::{ Renderer, RenderOptions };
pub use crate::codec::{ Codec, CodecRegistry, FilterCodec, DocumentCodec, write_encoded };
pub use crate::ext::CollectionExt;
pub use crate::literal::{ BsonType, Operator };
pub use crate::error::{
    Error as QuinceError,
    ErrorKind as QuinceErrorKind,
    Result as QuinceResult,
    ErrorExt,
    ResultExt,
};
pub use bson::{ Bson, Document };
