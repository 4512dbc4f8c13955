//! BSON serialization helpers.

use serde_json::Value;
use bson::{ Bson, Document, ValueAccessError };
use serde::Serialize;
use crate::error::{ Error, ErrorKind, Result };

/// Methods for dynamically type-checking JSON.
pub trait JsonExt: Sized {
    /// Ensures that this tree of values doesn't contain integers
    /// which are not expressible by `i64` (e.g. too big `u64`s).
    /// Since the `bson` crate just blindly casts integers to `i64`,
    /// the presence of such values would result in over- or underflow
    /// or truncation, leading to potentially hard-to-debug errors.
    ///
    /// If this check succeeds, `self` is converted into a `Bson` tree.
    /// Preservation of the order of keys in maps is ensured by the
    /// `preserve_order` feature of the `serde_json` crate.
    fn try_into_bson(self) -> Result<Bson>;
}

/// Methods for dynamically type-checking BSON.
pub trait BsonExt: Sized {
    /// Ensures that the BSON value is a `Document` and unwraps it.
    fn try_into_doc(self) -> Result<Document>;

    /// Interprets the BSON value as a 64-bit integer if it is integral.
    fn try_as_i64(&self) -> Option<i64>;
}

impl JsonExt for Value {
    fn try_into_bson(self) -> Result<Bson> {
        match self {
            // We need the value to be representable by either an `i64` or an `f64`.
            Value::Number(n) => if n.is_i64() || n.is_f64() {
                bson::to_bson(&n).map_err(Into::into)
            } else {
                Err(Error::new(
                    ErrorKind::BsonNumberRepr,
                    format!("Value `{}` can't be represented in BSON", n)
                ))
            },

            // Check transitively if every element of the array is correct.
            Value::Array(values) => values
                .into_iter()
                .map(JsonExt::try_into_bson)
                .collect::<Result<Vec<_>>>()
                .map(Bson::from),

            // Map keys are always OK because they're strings;
            // therefore, we only need to check the associated values.
            Value::Object(values) => values
                .into_iter()
                .map(|(k, v)| v.try_into_bson().map(|v| (k, v)))
                .collect::<Result<Document>>()
                .map(Bson::from_extended_document),

            // Anything else non-recursive is OK.
            value => Ok(value.into()),
        }
    }
}

impl BsonExt for Bson {
    fn try_into_doc(self) -> Result<Document> {
        match self {
            Bson::Document(doc) => Ok(doc),
            value => Err(Error::with_cause(
                format!("expected Document, got {:?}", value.element_type()),
                ValueAccessError::UnexpectedType,
            ))
        }
    }

    fn try_as_i64(&self) -> Option<i64> {
        match *self {
            Bson::I32(n) => Some(i64::from(n)),
            Bson::I64(n) => Some(n),
            _ => None,
        }
    }
}

/// Converts a single captured value to BSON.
///
/// Scalars keep their natural BSON representation (`i32` stays `Int32`,
/// unit enum variants become strings); `u64`s which don't fit in an `i64`
/// are rejected by the encoder instead of silently wrapping around.
pub fn serialize_value<T: Serialize + ?Sized>(value: &T) -> Result<Bson> {
    bson::to_bson(value).map_err(|cause| Error::with_cause(
        "can't convert captured value to BSON", cause
    ))
}

/// Creates a BSON `Document` out of a serializable value.
pub fn serialize_document<T: Serialize + ?Sized>(value: &T) -> Result<Document> {
    serde_json::to_value(value)
        .map_err(From::from)
        .and_then(JsonExt::try_into_bson)
        .and_then(BsonExt::try_into_doc)
}

#[cfg(test)]
mod tests {
    use crate::error::Result;
    use super::*;

    #[test]
    fn json_ext_try_into_bson() -> Result<()> {
        let good = serde_json::to_value(&vec![("key", 1_i64)])?;
        let bad = serde_json::to_value(&u64::MAX)?;

        assert_eq!(good.try_into_bson()?, bson!([["key", 1_i64]]));
        assert!(bad.try_into_bson().is_err());

        Ok(())
    }

    #[test]
    fn bson_ext_try_into_doc() -> Result<()> {
        let doc = bson!({ "foo": "bar", "qux": 3.14 });
        let other = bson!([{ "key": "value" }, false, null]);

        assert_eq!(doc.try_into_doc()?,
                   doc!{ "foo": "bar", "qux": 3.14 });

        assert!(other.try_into_doc().is_err());

        Ok(())
    }

    #[test]
    fn bson_ext_try_as_i64() {
        assert_eq!(Bson::I32(3).try_as_i64(), Some(3));
        assert_eq!(Bson::I64(-7).try_as_i64(), Some(-7));
        assert_eq!(Bson::FloatingPoint(1.0).try_as_i64(), None);
        assert_eq!(Bson::from("12").try_as_i64(), None);
    }

    #[test]
    fn serialize_captured_values() -> Result<()> {
        #[derive(Serialize)]
        enum Shade { Light }

        assert_eq!(serialize_value(&42_i32)?, Bson::I32(42));
        assert_eq!(serialize_value("John")?, Bson::from("John"));
        assert_eq!(serialize_value(&Shade::Light)?, Bson::from("Light"));
        assert_eq!(serialize_value(&vec![1_i32, 2])?, bson!([1, 2]));
        assert_eq!(serialize_value(&None::<i32>)?, Bson::Null);

        Ok(())
    }

    #[test]
    fn serialize_one_document() -> Result<()> {
        #[derive(Serialize)]
        struct Number { value: u64 }

        let good = Number { value: i64::MAX as u64 };
        let bad_64 = Number { value: i64::MAX as u64 + 1 };
        let bad_nodoc: i64 = 0;

        assert_eq!(
            serialize_document(&good)?,
            doc!{ "value": i64::MAX }
        );
        assert!(serialize_document(&bad_64)
                .unwrap_err()
                .to_string()
                .contains("can't be represented in BSON"));
        assert!(serialize_document(&bad_nodoc)
                .unwrap_err()
                .to_string()
                .contains("expected Document"));

        Ok(())
    }
}
