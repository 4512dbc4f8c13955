//! Integration tests for the analysis and caching of filter definitions.

#[macro_use]
extern crate bson;
#[macro_use]
extern crate serde_derive;
extern crate quince;

mod common;

use std::fmt;
use std::sync::Arc;
use std::thread;
use quince::error::{ Definition, Result };
use quince::prelude::*;
use common::*;

#[test]
fn instances_of_one_definition_share_a_tree() -> Result<()> {
    let analyzer = Analyzer::new();
    let renderer = Renderer::new();

    let john = any_of("John", 42, EnumFoo::Foo);
    let jack = any_of("Jack", 43, EnumFoo::Bar);

    let john_tree = analyzer.analyze(&john)?;
    let jack_tree = analyzer.analyze(&jack)?;

    assert!(Arc::ptr_eq(&john_tree, &jack_tree));
    assert_eq!(analyzer.cache_misses(), 1);
    assert_eq!(analyzer.cache_hits(), 1);
    assert_eq!(analyzer.len(), 1);
    assert!(analyzer.contains(&john.definition_id()));

    assert_eq!(renderer.render(&john_tree, &john)?, doc!{
        "$or": [
            { "stringField": "John" },
            { "primitiveIntField": 42 },
            { "enumFoo": "FOO" },
        ]
    });
    assert_eq!(renderer.render(&jack_tree, &jack)?, doc!{
        "$or": [
            { "stringField": "Jack" },
            { "primitiveIntField": 43 },
            { "enumFoo": "BAR" },
        ]
    });

    Ok(())
}

#[test]
fn many_instances_one_miss() -> Result<()> {
    let analyzer = Analyzer::new();

    for i in 0..10 {
        analyzer.analyze(&int_range(i, i + 10))?;
    }

    assert_eq!(analyzer.cache_misses(), 1);
    assert_eq!(analyzer.cache_hits(), 9);

    Ok(())
}

#[test]
fn distinct_definitions_get_distinct_entries() -> Result<()> {
    let analyzer = Analyzer::new();

    let first = analyzer.analyze(&both("John", 42))?;
    let second = analyzer.analyze(&int_range(0, 42))?;

    assert_ne!(first.definition(), second.definition());
    assert_eq!(analyzer.len(), 2);
    assert_eq!(analyzer.cache_misses(), 2);
    assert_eq!(analyzer.cache_hits(), 0);

    Ok(())
}

#[test]
fn definitions_are_identified_by_location() {
    let here = Filter::new((1,), |foo: &QFoo, (n,)| foo.primitive_int_field.eq(n));
    let there = Filter::new((1,), |foo: &QFoo, (n,)| foo.primitive_int_field.eq(n));

    assert_ne!(here.definition_id(), there.definition_id());
    assert_eq!(int_range(1, 2).definition_id(), int_range(3, 4).definition_id());

    match here.definition_id() {
        DefinitionId::Location { file, line, .. } => {
            assert!(file.ends_with("analyzer.rs"));
            assert_eq!(line, here.location().line());
        }
        id => panic!("unexpected definition id: {:?}", id),
    }
}

/// Builds filters on behalf of its callers, so every filter it returns is
/// created at the same source location.
fn forwarded<C>(captures: C, definition: fn(&QFoo, C::Slots) -> Expr) -> Filter<QFoo, C>
    where C: Captures + fmt::Debug
{
    Filter::new(captures, definition)
}

#[test]
fn forwarded_definitions_get_distinct_entries() -> Result<()> {
    let analyzer = Analyzer::new();
    let renderer = Renderer::new();

    let equal = forwarded((5,), |foo: &QFoo, (n,)| foo.primitive_int_field.eq(n));
    let greater = forwarded((5,), |foo: &QFoo, (n,)| foo.primitive_int_field.gt(n));

    assert_eq!(equal.location(), greater.location());
    assert_ne!(equal.definition_id(), greater.definition_id());

    let equal_tree = analyzer.analyze(&equal)?;
    let greater_tree = analyzer.analyze(&greater)?;

    assert!(!Arc::ptr_eq(&equal_tree, &greater_tree));
    assert_eq!(analyzer.cache_misses(), 2);
    assert_eq!(analyzer.len(), 2);
    assert_eq!(renderer.render(&equal_tree, &equal)?, doc!{ "primitiveIntField": 5 });
    assert_eq!(renderer.render(&greater_tree, &greater)?, doc!{
        "primitiveIntField": { "$gt": 5 }
    });

    Ok(())
}

#[test]
fn concurrent_analysis_yields_one_entry() -> Result<()> {
    let analyzer = Arc::new(Analyzer::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let analyzer = Arc::clone(&analyzer);
            thread::spawn(move || {
                analyzer
                    .analyze(&int_range(i, i * 2))
                    .expect("analysis failed")
            })
        })
        .collect();

    let trees: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("analyzer thread panicked"))
        .collect();

    assert_eq!(analyzer.len(), 1);
    assert_eq!(analyzer.cache_hits() + analyzer.cache_misses(), 8);
    assert!(analyzer.cache_misses() >= 1);

    for tree in &trees {
        assert_eq!(**tree, *trees[0]);
    }

    Ok(())
}

#[test]
fn bounded_cache_still_analyzes() -> Result<()> {
    let analyzer = Analyzer::with_options(AnalyzerOptions { max_entries: Some(1) });

    analyzer.analyze(&both("John", 42))?;
    let tree = analyzer.analyze(&int_range(0, 1))?;

    assert_eq!(tree.slot_count(), 2);
    assert_eq!(analyzer.len(), 1);
    assert_eq!(analyzer.options().max_entries, Some(1));

    // not cached, so analyzed again
    analyzer.analyze(&int_range(0, 1))?;
    assert_eq!(analyzer.cache_misses(), 3);

    Ok(())
}

#[test]
fn clear_and_reset() -> Result<()> {
    let analyzer = Analyzer::new();
    let filter = both("John", 42);
    let tree = analyzer.analyze(&filter)?;

    analyzer.analyze(&filter)?;
    analyzer.reset_counters();
    assert_eq!(analyzer.cache_hits(), 0);
    assert_eq!(analyzer.cache_misses(), 0);
    assert_eq!(analyzer.len(), 1);

    analyzer.clear();
    assert!(analyzer.is_empty());
    assert_eq!(tree.slot_count(), 2);

    analyzer.analyze(&filter)?;
    assert_eq!(analyzer.cache_misses(), 1);

    Ok(())
}

#[test]
fn negation_is_pushed_to_the_leaves() -> Result<()> {
    let analyzer = Analyzer::new();
    let renderer = Renderer::new();
    let filter = Filter::new((5, 9), |foo: &QFoo, (lo, hi)| {
        !(foo.primitive_int_field.lt(lo) | foo.primitive_int_field.gt(hi))
    });

    let tree = analyzer.analyze(&filter)?;

    assert_eq!(renderer.render(&tree, &filter)?, doc!{
        "$and": [
            { "primitiveIntField": { "$not": { "$lt": 5 } } },
            { "primitiveIntField": { "$not": { "$gt": 9 } } },
        ]
    });

    Ok(())
}

#[test]
fn double_negation_cancels() -> Result<()> {
    let analyzer = Analyzer::new();
    let renderer = Renderer::new();
    let filter = Filter::new(("John".to_owned(), vec![1, 2]), |foo: &QFoo, (name, ns)| {
        !!foo.string_field.eq(name) & !foo.primitive_int_field.is_in(ns)
    });

    let tree = analyzer.analyze(&filter)?;

    assert_eq!(renderer.render(&tree, &filter)?, doc!{
        "$and": [
            { "stringField": "John" },
            { "primitiveIntField": { "$nin": [1, 2] } },
        ]
    });

    Ok(())
}

#[test]
fn negated_array_operator_is_unsupported() {
    let analyzer = Analyzer::new();
    let filter = Filter::new((3_i64,), |foo: &QFoo, (n,)| !foo.tags.size(n));
    let error = analyzer.analyze(&filter).unwrap_err();

    assert_eq!(error.kind(), QuinceErrorKind::UnsupportedExpression);
    assert_eq!(error.context::<Definition>(), Some(&filter.definition_id()));
    assert!(analyzer.is_empty());
    assert_eq!(analyzer.cache_misses(), 1);

    let filter = Filter::new((), |foo: &QFoo, ()| {
        !foo.locations.elem_match(|location| location.city.eq(Slot::<String>::new(0)))
    });
    let error = analyzer.analyze(&filter).unwrap_err();
    assert_eq!(error.kind(), QuinceErrorKind::UnsupportedExpression);
}

#[test]
fn malformed_predicates_are_rejected() {
    let analyzer = Analyzer::new();

    let unknown = Filter::new(("Johnny".to_owned(),), |_: &QFoo, (nick,)| {
        QueryField::<String>::new("nickname").eq(nick)
    });
    let error = analyzer.analyze(&unknown).unwrap_err();
    assert_eq!(error.kind(), QuinceErrorKind::MalformedPredicate);
    assert!(error.to_string().contains("nickname"));

    let unordered = Filter::new((true,), |foo: &QFoo, (flag,)| foo.flag.gt(flag));
    let error = analyzer.analyze(&unordered).unwrap_err();
    assert_eq!(error.kind(), QuinceErrorKind::MalformedPredicate);

    let empty = Filter::new((), |_: &QFoo, ()| Expr::all_of(Vec::new()));
    let error = analyzer.analyze(&empty).unwrap_err();
    assert_eq!(error.kind(), QuinceErrorKind::MalformedPredicate);

    assert!(analyzer.is_empty());
}

#[test]
fn element_match_checks_element_fields() {
    let analyzer = Analyzer::new();
    let filter = Filter::new(("Lyon".to_owned(),), |foo: &QFoo, (city,)| {
        foo.locations.elem_match(|_| QueryField::<String>::new("country").eq(city))
    });
    let error = analyzer.analyze(&filter).unwrap_err();

    assert_eq!(error.kind(), QuinceErrorKind::MalformedPredicate);
    assert!(error.message().contains("country"));
}
