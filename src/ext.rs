//! Running filter expressions against a MongoDB collection.

use bson::Document;
use mongodb::coll::Collection;
use mongodb::cursor::Cursor;
use crate::meta::Metadata;
use crate::codec::FilterCodec;
use crate::filter::FilterExpression;
use crate::utils::int_to_usize_with_msg;
use crate::error::{ Error, Result, ResultExt };

/// Methods for querying a raw `mongodb` collection with filter
/// expressions. The expressions are encoded by a `FilterCodec`, the
/// queries themselves are executed by the driver.
pub trait CollectionExt {
    /// Finds the documents matching `filter`.
    fn find_matching<M, F>(&self, codec: &FilterCodec<M>, filter: &F) -> Result<Cursor>
        where M: Metadata,
              F: FilterExpression<Metadata = M> + ?Sized;

    /// Returns the number of documents matching `filter`.
    fn count_matching<M, F>(&self, codec: &FilterCodec<M>, filter: &F) -> Result<usize>
        where M: Metadata,
              F: FilterExpression<Metadata = M> + ?Sized;

    /// Deletes every document matching `filter`. Returns the number of
    /// deleted documents.
    fn delete_matching<M, F>(&self, codec: &FilterCodec<M>, filter: &F) -> Result<usize>
        where M: Metadata,
              F: FilterExpression<Metadata = M> + ?Sized;
}

impl CollectionExt for Collection {
    fn find_matching<M, F>(&self, codec: &FilterCodec<M>, filter: &F) -> Result<Cursor>
        where M: Metadata,
              F: FilterExpression<Metadata = M> + ?Sized
    {
        let doc = query_document(codec, filter, "find_matching")?;

        self.find(Some(doc), None)
            .chain(|| format!("error in {}::find_matching({:#?})", M::NAME, filter))
    }

    fn count_matching<M, F>(&self, codec: &FilterCodec<M>, filter: &F) -> Result<usize>
        where M: Metadata,
              F: FilterExpression<Metadata = M> + ?Sized
    {
        let doc = query_document(codec, filter, "count_matching")?;

        self.count(Some(doc), None)
            .chain(|| format!("error in {}::count_matching({:#?})", M::NAME, filter))
            .and_then(|n| int_to_usize_with_msg(n, "# of counted documents"))
    }

    fn delete_matching<M, F>(&self, codec: &FilterCodec<M>, filter: &F) -> Result<usize>
        where M: Metadata,
              F: FilterExpression<Metadata = M> + ?Sized
    {
        let message = || format!("error in {}::delete_matching({:#?})", M::NAME, filter);
        let doc = query_document(codec, filter, "delete_matching")?;

        self.delete_many(doc, None)
            .chain(&message)
            .and_then(|result| {
                if let Some(error) = result.write_exception {
                    Err(Error::with_cause(message(), error))
                } else {
                    int_to_usize_with_msg(result.deleted_count, "# of deleted documents")
                }
            })
    }
}

/// Encodes `filter` into the query document of `operation`.
fn query_document<M, F>(codec: &FilterCodec<M>, filter: &F, operation: &str) -> Result<Document>
    where M: Metadata,
          F: FilterExpression<Metadata = M> + ?Sized
{
    codec
        .encode_filter(filter)
        .chain(|| format!("can't encode filter for {}::{}", M::NAME, operation))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use crate::analyzer::Analyzer;
    use crate::render::Renderer;
    use crate::meta::{ FieldDescriptor, QueryField };
    use crate::literal::BsonType;
    use crate::filter::Filter;
    use crate::error::{ ErrorExt, ErrorKind };
    use super::*;

    struct QOrder;

    impl Metadata for QOrder {
        const NAME: &'static str = "Order";
        const FIELDS: &'static [FieldDescriptor] = &[
            FieldDescriptor::new("customer", BsonType::STRING),
            FieldDescriptor::new("paid", BsonType::BOOL),
        ];

        fn metadata() -> Self {
            QOrder
        }
    }

    fn codec() -> FilterCodec<QOrder> {
        FilterCodec::new(Arc::new(Analyzer::new()), Renderer::new())
    }

    #[test]
    fn query_document_encodes_the_filter() -> Result<()> {
        let filter = Filter::new(("Ann".to_owned(), false), |_: &QOrder, (name, paid)| {
            QueryField::<String>::new("customer").eq(name) & QueryField::<bool>::new("paid").eq(paid)
        });

        assert_eq!(query_document(&codec(), &filter, "find_matching")?, doc!{
            "customer": "Ann",
            "paid": false,
        });

        Ok(())
    }

    #[test]
    fn encoding_errors_name_the_operation() {
        let filter = Filter::new((true,), |_: &QOrder, (paid,)| {
            QueryField::<bool>::new("paid").gt(paid)
        });
        let error = query_document(&codec(), &filter, "count_matching").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::MalformedPredicate);
        assert_eq!(error.message(), "can't encode filter for Order::count_matching");
        assert!(error.reason().is_some());
    }
}
