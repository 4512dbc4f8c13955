//! Rendering operation trees into MongoDB filter documents.

use std::collections::HashSet;
use bson::{ Bson, Document };
use tracing::error;
use crate::tree::{ Node, SlotId, OperationTree };
use crate::literal::Operator;
use crate::filter::FilterExpression;
use crate::bsn::BsonExt;
use crate::utils::int_to_usize_with_msg;
use crate::error::{ Error, ErrorKind, Definition, Result };

/// Tuning knobs of a `Renderer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Render a conjunction of equality tests on distinct fields as a
    /// single document (`{ a: 1, b: 2 }`) instead of an explicit
    /// `{ $and: [{ a: 1 }, { b: 2 }] }`. On by default.
    pub flatten_conjunctions: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            flatten_conjunctions: true,
        }
    }
}

/// Combines an operation tree with the captured values of a filter
/// instance to produce a filter document.
///
/// Rendering is pure: the same tree and values always yield the same
/// document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Renderer {
    /// Output style.
    options: RenderOptions,
}

impl Renderer {
    /// Creates a renderer with the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with the given options.
    pub fn with_options(options: RenderOptions) -> Self {
        Renderer { options }
    }

    /// The options this renderer was created with.
    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Renders `tree`, which must have been analyzed from the definition
    /// of `filter`, with the values captured by `filter`.
    pub fn render<F>(&self, tree: &OperationTree, filter: &F) -> Result<Document>
        where F: FilterExpression + ?Sized
    {
        let values = filter.captured_values().map_err(
            |error| error.with_context::<Definition>(tree.definition())
        )?;
        self.render_values(tree, &values)
    }

    /// Renders `tree` with the given captured values, indexed by capture
    /// position.
    pub fn render_values(&self, tree: &OperationTree, values: &[Bson]) -> Result<Document> {
        let context = Context { tree, values };

        self.node(&context, tree.root())
            .map_err(|error| error.with_context::<Definition>(tree.definition()))
    }

    /// Renders a single node and its descendants.
    fn node(&self, context: &Context, node: &Node) -> Result<Document> {
        match *node {
            Node::Comparison { field, operator: Operator::Eq, slot } => {
                Ok(entry(field, context.value(slot)?))
            }
            Node::Comparison { field, operator, slot } => {
                Ok(operation(field, operator, context.value(slot)?))
            }
            Node::NegatedComparison { field, operator, slot } => {
                let comparison = entry(operator.as_str(), context.value(slot)?);
                Ok(entry(field, Bson::Document(entry("$not", Bson::Document(comparison)))))
            }
            Node::Membership { field, operator, slot } => {
                match context.value(slot)? {
                    value @ Bson::Array(_) => Ok(operation(field, operator, value)),
                    value => Err(Error::new(
                        ErrorKind::MalformedPredicate,
                        format!("`{}` on `{}` needs an array of values, got {:?}",
                                operator, field, value.element_type())
                    )),
                }
            }
            Node::ArraySize { field, slot } => {
                let value = context.value(slot)?;
                let size = value.try_as_i64().ok_or_else(|| Error::new(
                    ErrorKind::MalformedPredicate,
                    format!("`$size` of `{}` must be an integer, got {:?}",
                            field, value.element_type())
                ))?;
                int_to_usize_with_msg(size, &format!("`$size` of `{}`", field))?;

                Ok(operation(field, Operator::Size, Bson::I64(size)))
            }
            Node::ElementMatch { field, ref subtree } => {
                let criteria = self.node(context, subtree)?;
                Ok(operation(field, Operator::ElemMatch, Bson::Document(criteria)))
            }
            Node::And(ref children) => {
                if self.options.flatten_conjunctions && is_flat_equality(children) {
                    let mut doc = Document::new();

                    for child in children {
                        if let Node::Comparison { field, slot, .. } = *child {
                            doc.insert(field, context.value(slot)?);
                        }
                    }

                    Ok(doc)
                } else {
                    Ok(entry("$and", self.array(context, children)?))
                }
            }
            Node::Or(ref children) => {
                Ok(entry("$or", self.array(context, children)?))
            }
        }
    }

    /// Renders each node into an element of a BSON array.
    fn array(&self, context: &Context, nodes: &[Node]) -> Result<Bson> {
        nodes
            .iter()
            .map(|node| self.node(context, node).map(Bson::Document))
            .collect::<Result<Vec<_>>>()
            .map(Bson::Array)
    }
}

/// `{ key: value }`
fn entry(key: &str, value: Bson) -> Document {
    let mut doc = Document::new();
    doc.insert(key, value);
    doc
}

/// `{ field: { operator: value } }`
fn operation(field: &str, operator: Operator, value: Bson) -> Document {
    entry(field, Bson::Document(entry(operator.as_str(), value)))
}

/// Whether the nodes are all equality tests on pairwise distinct fields,
/// so that their conjunction can be written as one document.
fn is_flat_equality(nodes: &[Node]) -> bool {
    let mut fields = HashSet::with_capacity(nodes.len());

    nodes.iter().all(|node| match *node {
        Node::Comparison { field, operator: Operator::Eq, .. } => fields.insert(field),
        _ => false,
    })
}

/// The tree being rendered and the values its slots refer to.
#[derive(Debug, Clone, Copy)]
struct Context<'a> {
    /// The tree being rendered.
    tree: &'a OperationTree,
    /// The captured values, by capture position.
    values: &'a [Bson],
}

impl<'a> Context<'a> {
    /// Resolves a slot to the captured value it refers to.
    fn value(&self, slot: SlotId) -> Result<Bson> {
        let value = self.tree
            .capture_position(slot)
            .and_then(|position| self.values.get(position));

        match value {
            Some(value) => Ok(value.clone()),
            None => {
                error!(
                    definition = %self.tree.definition(),
                    slot = %slot,
                    captured = self.values.len(),
                    "value slot has no captured value"
                );
                Err(Error::new(
                    ErrorKind::UnresolvedSlot,
                    format!("slot {} of the filter has no captured value ({} captured)",
                            slot, self.values.len())
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorExt;
    use crate::filter::DefinitionId;

    fn tree(root: Node, slots: Vec<usize>) -> OperationTree {
        OperationTree::new(DefinitionId::of::<Renderer>(), root, slots)
    }

    fn eq(field: &'static str, slot: usize) -> Node {
        Node::Comparison { field, operator: Operator::Eq, slot: SlotId(slot) }
    }

    #[test]
    fn equality_conjunction_is_flattened() -> Result<()> {
        let tree = tree(Node::And(vec![eq("a", 0), eq("b", 1)]), vec![0, 1]);
        let values = [Bson::I32(1), Bson::from("two")];

        assert_eq!(Renderer::new().render_values(&tree, &values)?,
                   doc!{ "a": 1, "b": "two" });

        let explicit = Renderer::with_options(RenderOptions { flatten_conjunctions: false });
        assert_eq!(explicit.render_values(&tree, &values)?,
                   doc!{ "$and": [{ "a": 1 }, { "b": "two" }] });

        Ok(())
    }

    #[test]
    fn repeated_field_is_not_flattened() -> Result<()> {
        let tree = tree(Node::And(vec![eq("a", 0), eq("a", 1)]), vec![0, 1]);
        let values = [Bson::I32(1), Bson::I32(2)];

        assert_eq!(Renderer::new().render_values(&tree, &values)?,
                   doc!{ "$and": [{ "a": 1 }, { "a": 2 }] });

        Ok(())
    }

    #[test]
    fn slot_table_indirection() -> Result<()> {
        let tree = tree(Node::Or(vec![eq("a", 0), eq("b", 1)]), vec![1, 0]);
        let values = [Bson::from("first"), Bson::from("second")];

        assert_eq!(Renderer::new().render_values(&tree, &values)?,
                   doc!{ "$or": [{ "a": "second" }, { "b": "first" }] });

        Ok(())
    }

    #[test]
    fn negated_comparison_uses_not() -> Result<()> {
        let node = Node::NegatedComparison { field: "age", operator: Operator::Gte, slot: SlotId(0) };
        let tree = tree(node, vec![0]);

        assert_eq!(Renderer::new().render_values(&tree, &[Bson::I32(18)])?,
                   doc!{ "age": { "$not": { "$gte": 18 } } });

        Ok(())
    }

    #[test]
    fn missing_value_is_unresolved() {
        let tree = tree(eq("a", 0), vec![3]);
        let error = Renderer::new().render_values(&tree, &[Bson::Null]).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::UnresolvedSlot);
        assert_eq!(error.context::<Definition>(), Some(&DefinitionId::of::<Renderer>()));
    }

    #[test]
    fn size_must_be_a_non_negative_integer() {
        let size = Node::ArraySize { field: "tags", slot: SlotId(0) };
        let tree = tree(size, vec![0]);
        let renderer = Renderer::new();

        let negative = renderer.render_values(&tree, &[Bson::I32(-1)]).unwrap_err();
        assert_eq!(negative.kind(), ErrorKind::IntConversionUnderflow);

        let fractional = renderer.render_values(&tree, &[Bson::FloatingPoint(1.5)]).unwrap_err();
        assert_eq!(fractional.kind(), ErrorKind::MalformedPredicate);
    }

    #[test]
    fn membership_needs_an_array() {
        let node = Node::Membership { field: "a", operator: Operator::In, slot: SlotId(0) };
        let tree = tree(node, vec![0]);
        let error = Renderer::new().render_values(&tree, &[Bson::I32(1)]).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::MalformedPredicate);
    }
}
