//! Helper types for making the construction and validation of filter
//! documents a little less stringly-typed.

use std::fmt;
use bson::{ Bson, to_bson };
use serde::ser::{ Serialize, Serializer, SerializeSeq };

bitflags! {
    /// Non-deprecated BSON types. Field descriptors use these to declare
    /// which types a document field may hold, so that operators can be
    /// checked for applicability.
    ///
    /// ```
    /// # #[macro_use]
    /// # extern crate bson;
    /// # extern crate quince;
    /// #
    /// # use quince::literal::BsonType;
    /// #
    /// # fn main() {
    /// let types = bson!([
    ///     BsonType::OBJECT_ID,
    ///     BsonType::STRING | BsonType::default(),
    /// ]);
    /// assert_eq!(types, bson!(["objectId", ["null", "string"]]));
    /// # }
    /// ```
    pub struct BsonType: u16 {
        /// The `null` value.
        const NULL                  = 0b0000_0000_0000_0001;
        /// `true` or `false`.
        const BOOL                  = 0b0000_0000_0000_0010;
        /// Double-precision floating-point number.
        const DOUBLE                = 0b0000_0000_0000_0100;
        /// 32-bit signed integer.
        const INT                   = 0b0000_0000_0000_1000;
        /// 64-bit signed integer.
        const LONG                  = 0b0000_0000_0001_0000;
        /// 128-bit decimal number.
        const DECIMAL               = 0b0000_0000_0010_0000;
        /// Any of the 4 numeric types (`double`, `int`, `long`, `decimal`).
        const NUMBER                = 0b0000_0000_0011_1100;
        /// `ObjectId`.
        const OBJECT_ID             = 0b0000_0000_0100_0000;
        /// Timestamp.
        const TIMESTAMP             = 0b0000_0000_1000_0000;
        /// Date and time.
        const DATE                  = 0b0000_0001_0000_0000;
        /// String.
        const STRING                = 0b0000_0010_0000_0000;
        /// Types with a meaningful ordering: numbers, `ObjectId`s,
        /// timestamps, dates and strings.
        const ORDERED               = 0b0000_0011_1111_1100;
        /// Regular expression and its matching options.
        const REGEX                 = 0b0000_0100_0000_0000;
        /// Binary data, BLOB.
        const BINARY                = 0b0000_1000_0000_0000;
        /// Array.
        const ARRAY                 = 0b0001_0000_0000_0000;
        /// Document or object.
        const DOCUMENT              = 0b0010_0000_0000_0000;
        /// JavaScript code.
        const JAVASCRIPT            = 0b0100_0000_0000_0000;
        /// JavaScript code with scope.
        const JAVASCRIPT_WITH_SCOPE = 0b1000_0000_0000_0000;
    }
}

/// The default BSON type is `null`.
impl Default for BsonType {
    fn default() -> Self {
        BsonType::NULL
    }
}

/// Encoding `BsonType` as a `Bson` never actually fails (the in-memory tree
/// serializer always succeeds unless the value being serialized itself
/// provokes an error, which a non-empty `BsonType` doesn't.)
impl From<BsonType> for Bson {
    fn from(bson_type: BsonType) -> Self {
        to_bson(&bson_type).unwrap_or_default()
    }
}

/// All distinct BSON type bitflags, along with their string aliases.
static TYPE_NAMES: &[(BsonType, &str)] = &[
    (BsonType::NULL,                  "null"),
    (BsonType::BOOL,                  "bool"),
    (BsonType::DOUBLE,                "double"),
    (BsonType::INT,                   "int"),
    (BsonType::LONG,                  "long"),
    (BsonType::DECIMAL,               "decimal"),
    (BsonType::OBJECT_ID,             "objectId"),
    (BsonType::TIMESTAMP,             "timestamp"),
    (BsonType::DATE,                  "date"),
    (BsonType::STRING,                "string"),
    (BsonType::REGEX,                 "regex"),
    (BsonType::BINARY,                "binData"),
    (BsonType::ARRAY,                 "array"),
    (BsonType::DOCUMENT,              "object"),
    (BsonType::JAVASCRIPT,            "javascript"),
    (BsonType::JAVASCRIPT_WITH_SCOPE, "javascriptWithScope"),
];

impl BsonType {
    /// The aliases of the individual types contained in this set,
    /// in canonical order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        TYPE_NAMES
            .iter()
            .filter(move |&&(flag, _)| self.contains(flag))
            .map(|&(_, name)| name)
    }
}

impl fmt::Display for BsonType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names = self.names();

        match names.next() {
            None => f.write_str("<no type>"),
            Some(first) => {
                f.write_str(first)?;
                for name in names {
                    write!(f, "|{}", name)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for BsonType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        match self.bits().count_ones() {
            0 => Err(S::Error::custom("at least one type must be specified")),
            1 => match self.names().next() {
                Some(name) => serializer.serialize_str(name),
                None => Err(S::Error::custom("found an unexpected flag")),
            },
            n => {
                let mut seq = serializer.serialize_seq(Some(n as usize))?;

                for name in self.names() {
                    seq.serialize_element(name)?;
                }

                seq.end()
            }
        }
    }
}

/// The MongoDB query operators a filter expression can be lowered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    /// `$eq`, rendered as a plain `{ field: value }` pair.
    Eq,
    /// `$ne`
    Ne,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$in`
    In,
    /// `$nin`
    Nin,
    /// `$all`
    All,
    /// `$elemMatch`
    ElemMatch,
    /// `$size`
    Size,
}

impl Operator {
    /// The name of the operator as it appears in a query document.
    /// ```
    /// # use quince::literal::Operator;
    /// assert_eq!(Operator::Gte.as_str(), "$gte");
    /// assert_eq!(Operator::ElemMatch.as_str(), "$elemMatch");
    /// ```
    pub fn as_str(self) -> &'static str {
        use self::Operator::*;

        match self {
            Eq        => "$eq",
            Ne        => "$ne",
            Gt        => "$gt",
            Gte       => "$gte",
            Lt        => "$lt",
            Lte       => "$lte",
            In        => "$in",
            Nin       => "$nin",
            All       => "$all",
            ElemMatch => "$elemMatch",
            Size      => "$size",
        }
    }

    /// The operator matching exactly the documents this one doesn't,
    /// for operators where such a counterpart exists.
    ///
    /// Ordering operators have none: `{ a: { $lte: 1 } }` matches neither
    /// documents without `a` nor ones where `a` is not comparable with `1`,
    /// all of which `{ a: { $gt: 1 } }` rejects, too.
    /// ```
    /// # use quince::literal::Operator;
    /// assert_eq!(Operator::Eq.negation(), Some(Operator::Ne));
    /// assert_eq!(Operator::Nin.negation(), Some(Operator::In));
    /// assert_eq!(Operator::Gt.negation(), None);
    /// ```
    pub fn negation(self) -> Option<Operator> {
        use self::Operator::*;

        match self {
            Eq  => Some(Ne),
            Ne  => Some(Eq),
            In  => Some(Nin),
            Nin => Some(In),
            Gt | Gte | Lt | Lte | All | ElemMatch | Size => None,
        }
    }

    /// Whether this operator is one of `$gt`, `$gte`, `$lt` and `$lte`.
    pub fn is_ordering(self) -> bool {
        use self::Operator::*;

        match self {
            Gt | Gte | Lt | Lte => true,
            _ => false,
        }
    }

    /// Whether this operator compares the field against a single value.
    pub fn is_comparison(self) -> bool {
        use self::Operator::*;

        match self {
            Eq | Ne | Gt | Gte | Lt | Lte => true,
            _ => false,
        }
    }

    /// Whether this operator tests the field against an array of values.
    pub fn is_membership(self) -> bool {
        use self::Operator::*;

        match self {
            In | Nin | All => true,
            _ => false,
        }
    }

    /// Whether this operator can be applied to a field holding values of
    /// the given types.
    /// ```
    /// # use quince::literal::{ BsonType, Operator };
    /// assert!(Operator::Gt.applies_to(BsonType::INT));
    /// assert!(!Operator::Gt.applies_to(BsonType::BOOL));
    /// assert!(Operator::Size.applies_to(BsonType::ARRAY));
    /// assert!(!Operator::Size.applies_to(BsonType::STRING));
    /// assert!(Operator::In.applies_to(BsonType::BOOL));
    /// ```
    pub fn applies_to(self, types: BsonType) -> bool {
        use self::Operator::*;

        match self {
            Eq | Ne | In | Nin => true,
            Gt | Gte | Lt | Lte => types.intersects(BsonType::ORDERED),
            All | ElemMatch | Size => types.contains(BsonType::ARRAY),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
