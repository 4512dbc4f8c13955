//! The expression analyzer: lowers filter definitions into operation
//! trees, and caches the trees by definition.

use std::sync::Arc;
use std::sync::atomic::{ AtomicUsize, Ordering };
use dashmap::DashMap;
use tracing::{ debug, trace, warn };
use crate::tree::{ Node, SlotId, OperationTree };
use crate::expr::Expr;
use crate::meta::{ Metadata, FieldDescriptor };
use crate::literal::Operator;
use crate::filter::{ FilterExpression, DefinitionId };
use crate::error::{ Error, ErrorKind, Definition, Result };

/// Tuning knobs of an `Analyzer`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// The maximal number of cached operation trees. Once it is reached,
    /// trees of further definitions are still returned, but not cached.
    /// `None` means no bound.
    pub max_entries: Option<usize>,
}

/// Turns filter definitions into operation trees.
///
/// Each distinct definition is analyzed at most once (modulo concurrent
/// first uses); every later instance of it, regardless of its captured
/// values, gets the cached tree.
#[derive(Debug, Default)]
pub struct Analyzer {
    /// Operation trees by the identity of the definition they came from.
    cache: DashMap<DefinitionId, Arc<OperationTree>>,
    /// Number of analyses served from the cache.
    hits: AtomicUsize,
    /// Number of analyses that had to lower the definition.
    misses: AtomicUsize,
    /// Caching policy.
    options: AnalyzerOptions,
}

impl Analyzer {
    /// Creates an analyzer with an empty, unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer with an empty cache and the given options.
    pub fn with_options(options: AnalyzerOptions) -> Self {
        Analyzer { options, ..Self::default() }
    }

    /// The options this analyzer was created with.
    pub fn options(&self) -> AnalyzerOptions {
        self.options
    }

    /// Returns the operation tree of the definition of `filter`, analyzing
    /// the definition if it hasn't been analyzed yet.
    ///
    /// Errors carry the identity of the definition as their
    /// `error::Definition` context.
    pub fn analyze<F>(&self, filter: &F) -> Result<Arc<OperationTree>>
        where F: FilterExpression + ?Sized
    {
        let id = filter.definition_id();

        if let Some(tree) = self.cache.get(&id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(definition = %id, "operation tree cache hit");
            return Ok(Arc::clone(tree.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        let metadata = <F::Metadata as Metadata>::metadata();
        let expr = filter.definition(&metadata);
        let tree = lower::<F::Metadata>(id, &expr)
            .map_err(|error| error.with_context::<Definition>(id))?;
        let tree = Arc::new(tree);

        if let Some(max_entries) = self.options.max_entries {
            if self.cache.len() >= max_entries {
                warn!(
                    definition = %id,
                    max_entries,
                    "operation tree cache is full; not caching tree"
                );
                return Ok(tree);
            }
        }

        // A racing analysis of the same definition may have won; keep its tree.
        let tree = Arc::clone(self.cache.entry(id).or_insert(tree).value());
        let metadata = <F::Metadata as Metadata>::NAME;

        debug!(
            definition = %id,
            metadata,
            nodes = tree.node_count(),
            slots = tree.slot_count(),
            "analyzed filter definition"
        );

        Ok(tree)
    }

    /// Number of analyses answered from the cache.
    pub fn cache_hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of analyses that had to lower a definition.
    pub fn cache_misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Zeroes the hit and miss counters, keeping the cached trees.
    pub fn reset_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of cached operation trees.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no operation trees are cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Whether the tree of the given definition is cached.
    pub fn contains(&self, id: &DefinitionId) -> bool {
        self.cache.contains_key(id)
    }

    /// Drops every cached operation tree. Trees already handed out stay
    /// valid.
    pub fn clear(&self) {
        debug!(entries = self.cache.len(), "clearing operation tree cache");
        self.cache.clear();
    }
}

/// Lowers the expression of a definition over the fields of `M`.
fn lower<M: Metadata>(id: DefinitionId, expr: &Expr) -> Result<OperationTree> {
    let mut lowering = Lowering::default();
    let root = lowering.lower(expr, M::NAME, M::FIELDS, false)?;

    Ok(OperationTree::new(id, root, lowering.slots))
}

/// The state of lowering a single expression.
#[derive(Debug, Default)]
struct Lowering {
    /// Capture positions of the slots assigned so far, by `SlotId`.
    slots: Vec<usize>,
}

impl Lowering {
    /// Assigns the next `SlotId`, referring to the value at `position`.
    fn slot(&mut self, position: usize) -> SlotId {
        self.slots.push(position);
        SlotId(self.slots.len() - 1)
    }

    /// Lowers `expr`, whose fields are looked up in `fields` (belonging to
    /// the document type called `scope`). If `negated` is set, lowers the
    /// negation of `expr` instead.
    fn lower(
        &mut self,
        expr: &Expr,
        scope: &str,
        fields: &'static [FieldDescriptor],
        negated: bool,
    ) -> Result<Node> {
        match *expr {
            Expr::Field { name, operator, position } => {
                let field = descriptor(scope, fields, name, operator)?;

                if negated && operator.is_ordering() {
                    let slot = self.slot(position);
                    return Ok(Node::NegatedComparison { field: field.name, operator, slot });
                }

                let operator = if negated {
                    negate(field.name, operator)?
                } else {
                    operator
                };
                let slot = self.slot(position);

                if operator.is_comparison() {
                    Ok(Node::Comparison { field: field.name, operator, slot })
                } else if operator.is_membership() {
                    Ok(Node::Membership { field: field.name, operator, slot })
                } else if operator == Operator::Size {
                    Ok(Node::ArraySize { field: field.name, slot })
                } else {
                    Err(Error::new(
                        ErrorKind::MalformedPredicate,
                        format!("`{}` on `{}.{}` needs element criteria, not a value",
                                operator, scope, name)
                    ))
                }
            }
            Expr::ElemMatch { name, fields: element_fields, ref criteria } => {
                let field = descriptor(scope, fields, name, Operator::ElemMatch)?;

                if negated {
                    return Err(negation_error(field.name, Operator::ElemMatch));
                }

                let subtree = self.lower(criteria, field.name, element_fields, false)?;

                Ok(Node::ElementMatch {
                    field: field.name,
                    subtree: Box::new(subtree),
                })
            }
            Expr::And(ref children) => {
                self.connective(children, scope, fields, negated, !negated)
            }
            Expr::Or(ref children) => {
                self.connective(children, scope, fields, negated, negated)
            }
            Expr::Not(ref inner) => self.lower(inner, scope, fields, !negated),
        }
    }

    /// Lowers the children of a conjunction or disjunction into an N-ary
    /// `And` (if `conjunction` is set) or `Or` node. Children of the same
    /// kind are spliced in place; a single child stands for itself.
    fn connective(
        &mut self,
        children: &[Expr],
        scope: &str,
        fields: &'static [FieldDescriptor],
        negated: bool,
        conjunction: bool,
    ) -> Result<Node> {
        if children.is_empty() {
            return Err(Error::new(
                ErrorKind::MalformedPredicate,
                format!("empty {} in filter on `{}`",
                        if conjunction { "conjunction" } else { "disjunction" },
                        scope)
            ));
        }

        let mut nodes = Vec::with_capacity(children.len());

        for child in children {
            match (self.lower(child, scope, fields, negated)?, conjunction) {
                (Node::And(grandchildren), true) | (Node::Or(grandchildren), false) => {
                    nodes.extend(grandchildren)
                }
                (node, _) => nodes.push(node),
            }
        }

        if nodes.len() == 1 {
            Ok(nodes.remove(0))
        } else if conjunction {
            Ok(Node::And(nodes))
        } else {
            Ok(Node::Or(nodes))
        }
    }
}

/// Finds the descriptor of field `name`, and checks that `operator`
/// applies to it.
fn descriptor(
    scope: &str,
    fields: &'static [FieldDescriptor],
    name: &str,
    operator: Operator,
) -> Result<&'static FieldDescriptor> {
    let field = fields.iter().find(|field| field.name == name).ok_or_else(|| {
        Error::new(
            ErrorKind::MalformedPredicate,
            format!("`{}` has no field named `{}`", scope, name)
        )
    })?;

    if field.supports(operator) {
        Ok(field)
    } else {
        Err(Error::new(
            ErrorKind::MalformedPredicate,
            format!("`{}` can't be applied to `{}.{}` of type `{}`",
                    operator, scope, name, field.types)
        ))
    }
}

/// The operator matching the complement of what `operator` matches.
fn negate(field: &str, operator: Operator) -> Result<Operator> {
    operator.negation().ok_or_else(|| negation_error(field, operator))
}

/// Array operators have no complement expressible as a single operator.
fn negation_error(field: &str, operator: Operator) -> Error {
    Error::new(
        ErrorKind::UnsupportedExpression,
        format!("negated `{}` on `{}` is not supported", operator, field)
    )
}
