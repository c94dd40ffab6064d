//! Property tests for alias clustering and mutability refinement

use opinfo_core::prelude::*;
use opinfo_core::{AliasAnnotation, Argument};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct ArgSpec {
    write: bool,
    set: Option<u8>,
    wildcard: bool,
    value: Option<(u64, usize, usize)>,
}

fn arg_spec() -> impl Strategy<Value = ArgSpec> {
    (
        any::<bool>(),
        prop::option::of(0u8..3),
        any::<bool>(),
        prop::option::of((0u64..3, 0usize..6, 0usize..4)),
    )
        .prop_map(|(write, set, wildcard, value)| ArgSpec {
            write,
            set,
            wildcard,
            value,
        })
}

fn arg_specs() -> impl Strategy<Value = Vec<ArgSpec>> {
    prop::collection::vec(arg_spec(), 1..7)
}

/// Builds `test::generated(Tensor x0, ...)`. Writes without a shared set get a
/// private set so they never join anything.
fn schema_from(specs: &[ArgSpec], shared_sets: bool, wildcards: bool) -> FunctionSchema {
    let mut builder = FunctionSchema::builder("test::generated");
    for (i, spec) in specs.iter().enumerate() {
        let mut sets: Vec<String> = Vec::new();
        if shared_sets {
            if let Some(set) = spec.set {
                sets.push(format!("s{set}"));
            }
        }
        if wildcards && spec.wildcard {
            sets.push("*".to_string());
        }
        if sets.is_empty() && spec.write {
            sets.push(format!("own{i}"));
        }
        let mut arg = Argument::new(format!("x{i}"), "Tensor");
        if !sets.is_empty() {
            arg = arg.with_alias(AliasAnnotation::new(sets, spec.write));
        }
        builder = builder.input(arg);
    }
    builder.build().unwrap()
}

fn bind_all<'a>(info: &mut SchemaInfo<'a>, specs: &[ArgSpec]) {
    let values = specs
        .iter()
        .map(|spec| spec.value.map(|(storage, offset, len)| Value::tensor(storage, offset, len)));
    info.bind_values_positional(values).unwrap();
}

fn clustered(info: &SchemaInfo<'_>, a: usize, b: usize) -> bool {
    info.alias_cluster(SchemaArgument::input(a))
        .unwrap()
        .contains(&SchemaArgument::input(b))
}

proptest! {
    #[test]
    fn prop_plain_signature_is_or_of_declared_writes(specs in arg_specs()) {
        let schema = schema_from(&specs, false, false);
        let mut info = SchemaInfo::with_rules(&schema, RuleTable::builtin());
        bind_all(&mut info, &specs);

        let expected = specs.iter().any(|spec| spec.write);
        prop_assert_eq!(info.is_mutable(), expected);
    }

    #[test]
    fn prop_clusters_are_transitive(specs in arg_specs()) {
        let schema = schema_from(&specs, true, true);
        let mut info = SchemaInfo::new(&schema);
        bind_all(&mut info, &specs);

        let n = specs.len();
        for a in 0..n {
            prop_assert!(clustered(&info, a, a));
            for b in 0..n {
                prop_assert_eq!(clustered(&info, a, b), clustered(&info, b, a));
                for c in 0..n {
                    if clustered(&info, a, b) && clustered(&info, b, c) {
                        prop_assert!(clustered(&info, a, c));
                    }
                }
            }
        }
    }

    #[test]
    fn prop_wildcards_never_merge_clusters(specs in arg_specs()) {
        let with_wildcards = schema_from(&specs, true, true);
        let without_wildcards = schema_from(&specs, true, false);
        let mut lhs = SchemaInfo::new(&with_wildcards);
        let mut rhs = SchemaInfo::new(&without_wildcards);
        bind_all(&mut lhs, &specs);
        bind_all(&mut rhs, &specs);

        for i in 0..specs.len() {
            prop_assert_eq!(
                lhs.alias_cluster(SchemaArgument::input(i)).unwrap(),
                rhs.alias_cluster(SchemaArgument::input(i)).unwrap()
            );
        }
    }

    #[test]
    fn prop_rebinding_matches_fresh_binding(
        specs in arg_specs(),
        first in prop::collection::vec((0u64..3, 0usize..6, 1usize..4), 7),
        second in prop::collection::vec((0u64..3, 0usize..6, 1usize..4), 7),
    ) {
        let schema = schema_from(&specs, true, true);
        let tensors = |values: &[(u64, usize, usize)]| -> Vec<Option<Value>> {
            values
                .iter()
                .take(specs.len())
                .map(|&(storage, offset, len)| Some(Value::tensor(storage, offset, len)))
                .collect()
        };

        let mut rebound = SchemaInfo::new(&schema);
        rebound.bind_values_positional(tensors(&first)).unwrap();
        let _ = rebound.is_mutable();
        rebound.bind_values_positional(tensors(&second)).unwrap();

        let mut fresh = SchemaInfo::new(&schema);
        fresh.bind_values_positional(tensors(&second)).unwrap();

        let n = specs.len();
        for a in 0..n {
            prop_assert_eq!(rebound.is_mutable_at(a).unwrap(), fresh.is_mutable_at(a).unwrap());
            for b in 0..n {
                let lhs = SchemaArgument::input(a);
                let rhs = SchemaArgument::input(b);
                prop_assert_eq!(rebound.may_alias(lhs, rhs).unwrap(), fresh.may_alias(lhs, rhs).unwrap());
            }
        }
    }

    #[test]
    fn prop_rule_override_always_wins(specs in prop::collection::vec(arg_spec(), 3..7)) {
        let schema = schema_from(&specs, true, true);
        let mut rules = RuleTable::new();
        rules.register(OperatorName::base("test::generated"), |_| {
            RuleVerdict::new().with_mutable(2, false)
        });
        let mut info = SchemaInfo::with_rules(&schema, &rules);
        bind_all(&mut info, &specs);

        prop_assert!(!info.is_mutable_at(2).unwrap());
    }
}
