//! Codecs: conversion of values to and from BSON documents, and a
//! registry for looking them up by the type of the encoded value.

use std::fmt;
use std::result;
use std::sync::Arc;
use std::marker::PhantomData;
use bson::{ Bson, Document };
use serde::{ Serialize, Serializer, Deserialize };
use typemap::{ ShareMap, Key };
use crate::meta::Metadata;
use crate::filter::FilterExpression;
use crate::analyzer::Analyzer;
use crate::render::Renderer;
use crate::bsn::serialize_document;
use crate::error::{ Error, ErrorKind, Result, ResultExt };

/// Converts values of type `T` to and from BSON documents.
pub trait Codec<T: ?Sized>: fmt::Debug {
    /// Encodes `value` as a document.
    fn encode(&self, value: &T) -> Result<Document>;

    /// Reconstructs a value from a document.
    fn decode(&self, doc: Document) -> Result<Box<T>>;
}

/// A shared, type-erased codec, as stored in a `CodecRegistry`.
pub type SharedCodec<T> = Arc<dyn Codec<T> + Send + Sync>;

/// Encodes filter expressions over documents described by `M` as
/// MongoDB filter documents, analyzing each definition once.
pub struct FilterCodec<M> {
    /// Builds and caches operation trees.
    analyzer: Arc<Analyzer>,
    /// Turns trees and captured values into documents.
    renderer: Renderer,
    /// The metadata type.
    _marker: PhantomData<fn() -> M>,
}

impl<M: Metadata> FilterCodec<M> {
    /// Creates a codec backed by the given (possibly shared) analyzer.
    pub fn new(analyzer: Arc<Analyzer>, renderer: Renderer) -> Self {
        FilterCodec { analyzer, renderer, _marker: PhantomData }
    }

    /// The analyzer caching the operation trees of this codec.
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Encodes any filter over `M`, including ones borrowing non-`'static`
    /// data, which can't be turned into the trait object of `encode()`.
    pub fn encode_filter<F>(&self, filter: &F) -> Result<Document>
        where F: FilterExpression<Metadata = M> + ?Sized
    {
        let tree = self.analyzer.analyze(filter)?;
        self.renderer.render(&tree, filter)
    }
}

impl<M: Metadata> Codec<dyn FilterExpression<Metadata = M>> for FilterCodec<M> {
    fn encode(&self, filter: &(dyn FilterExpression<Metadata = M> + 'static)) -> Result<Document> {
        self.encode_filter(filter)
    }

    fn decode(&self, _: Document) -> Result<Box<dyn FilterExpression<Metadata = M>>> {
        Err(Error::new(
            ErrorKind::UnsupportedOperation,
            format!("filter expressions over `{}` can't be decoded from BSON", M::NAME)
        ))
    }
}

impl<M: Metadata> Clone for FilterCodec<M> {
    fn clone(&self) -> Self {
        FilterCodec::new(Arc::clone(&self.analyzer), self.renderer)
    }
}

impl<M: Metadata> fmt::Debug for FilterCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FilterCodec")
            .field("metadata", &M::NAME)
            .field("analyzer", &self.analyzer)
            .field("renderer", &self.renderer)
            .finish()
    }
}

/// Encodes and decodes plain documents through their `serde` impls.
pub struct DocumentCodec<T> {
    /// The document type.
    _marker: PhantomData<fn() -> T>,
}

impl<T> DocumentCodec<T> {
    /// Creates a codec for documents of type `T`.
    pub fn new() -> Self {
        DocumentCodec { _marker: PhantomData }
    }
}

impl<T> Codec<T> for DocumentCodec<T> where T: Serialize + for<'a> Deserialize<'a> {
    fn encode(&self, value: &T) -> Result<Document> {
        serialize_document(value)
    }

    fn decode(&self, doc: Document) -> Result<Box<T>> {
        bson::from_bson(Bson::Document(doc))
            .map(Box::new)
            .chain("can't decode document")
    }
}

impl<T> Default for DocumentCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DocumentCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DocumentCodec<T> {}

impl<T> fmt::Debug for DocumentCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DocumentCodec")
    }
}

/// Registry key of the codec for values of type `T`.
struct CodecKey<T: ?Sized>(PhantomData<T>);

impl<T: ?Sized + 'static> Key for CodecKey<T> {
    type Value = SharedCodec<T>;
}

/// Codecs by the type of the values they encode.
///
/// Looking up a type without a registered codec yields `None`, so that
/// callers can fall back to other means of encoding.
pub struct CodecRegistry {
    /// The codecs, keyed by `CodecKey<T>`.
    codecs: ShareMap,
}

impl CodecRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        CodecRegistry { codecs: ShareMap::custom() }
    }

    /// Registers the codec for values of type `T`. Returns the codec it
    /// replaces, if any.
    pub fn register<T, C>(&mut self, codec: C) -> Option<SharedCodec<T>>
        where T: ?Sized + 'static,
              C: Codec<T> + Send + Sync + 'static,
    {
        self.codecs.insert::<CodecKey<T>>(Arc::new(codec))
    }

    /// Registers a `FilterCodec` for filter expressions over `M`.
    pub fn register_filters<M: Metadata>(
        &mut self,
        analyzer: Arc<Analyzer>,
        renderer: Renderer,
    ) -> Option<SharedCodec<dyn FilterExpression<Metadata = M>>> {
        self.register::<dyn FilterExpression<Metadata = M>, _>(
            FilterCodec::<M>::new(analyzer, renderer)
        )
    }

    /// The codec for values of type `T`, if one is registered.
    pub fn get<T: ?Sized + 'static>(&self) -> Option<SharedCodec<T>> {
        self.codecs.get::<CodecKey<T>>().cloned()
    }

    /// The codec for filter expressions over `M`, if one is registered.
    pub fn filter_codec<M: Metadata>(&self) -> Option<SharedCodec<dyn FilterExpression<Metadata = M>>> {
        self.get::<dyn FilterExpression<Metadata = M>>()
    }

    /// Whether a codec for values of type `T` is registered.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.codecs.contains::<CodecKey<T>>()
    }

    /// The number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Whether no codecs are registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.len() == 0
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Encodes `value` with `codec`, and writes the resulting document to any
/// `serde` serializer, e.g. a JSON writer.
pub fn write_encoded<T, C, S>(codec: &C, value: &T, serializer: S) -> result::Result<S::Ok, S::Error>
    where T: ?Sized,
          C: Codec<T> + ?Sized,
          S: Serializer,
{
    use serde::ser::Error as SerError;

    codec
        .encode(value)
        .map_err(S::Error::custom)?
        .serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorExt;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn document_codec_round_trip() -> Result<()> {
        let codec = DocumentCodec::<Point>::new();
        let point = Point { x: 3, y: -4 };
        let doc = codec.encode(&point)?;

        assert_eq!(doc, doc!{ "x": 3_i64, "y": -4_i64 });
        assert_eq!(*codec.decode(doc)?, point);

        Ok(())
    }

    #[test]
    fn document_codec_rejects_ill_shaped_documents() {
        let codec = DocumentCodec::<Point>::new();
        let error = codec.decode(doc!{ "x": "three" }).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::BsonDecoding);
    }

    #[test]
    fn registry_lookup() {
        let mut registry = CodecRegistry::new();

        assert!(registry.is_empty());
        assert!(registry.register::<Point, _>(DocumentCodec::new()).is_none());
        assert!(registry.register::<Point, _>(DocumentCodec::new()).is_some());

        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Point>());
        assert!(registry.get::<Point>().is_some());
        assert!(registry.get::<String>().is_none());
    }

    #[test]
    fn write_encoded_as_json() -> result::Result<(), serde_json::Error> {
        let codec = DocumentCodec::<Point>::new();
        let mut buf = Vec::new();

        write_encoded(&codec, &Point { x: 1, y: 2 }, &mut serde_json::Serializer::new(&mut buf))?;

        assert_eq!(String::from_utf8_lossy(&buf), r#"{"x":1,"y":2}"#);

        Ok(())
    }
}
