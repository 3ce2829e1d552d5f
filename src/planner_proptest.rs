//! Property-based tests for the reconciliation planner.
//!
//! Catalogs are generated from small name alphabets so that overlaps
//! between the local and remote sides are common.

#[cfg(test)]
mod proptest_tests {
    use crate::config::{ConfigInput, Configuration};
    use crate::planner::{Action, ActionKind, Planner};
    use crate::testing::{local_catalog, remote_catalog, MemoryLister};
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};

    fn names() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set("[a-f]{1,2}", 0..12)
    }

    fn config(update: bool) -> Configuration {
        Configuration::resolve(
            ConfigInput {
                group_id: "acme".to_string(),
                base_directory: Some(PathBuf::from("/work")),
                update,
                ..Default::default()
            },
            Path::new("/"),
        )
        .unwrap()
    }

    fn refs(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    proptest! {
        /// Property: deletes, clones and updates partition the union of names
        #[test]
        fn plan_partitions_names(local in names(), remote in names()) {
            let config = config(true);
            let lister = MemoryLister::new();
            let plan = Planner::new(&config, &lister)
                .plan(&remote_catalog(&refs(&remote)), &local_catalog(&refs(&local)), &[])
                .unwrap();

            let deletes: BTreeSet<String> =
                plan.names(ActionKind::Delete).into_iter().map(String::from).collect();
            let clones: BTreeSet<String> =
                plan.names(ActionKind::Clone).into_iter().map(String::from).collect();
            let updates: BTreeSet<String> =
                plan.names(ActionKind::Update).into_iter().map(String::from).collect();

            let only_local: BTreeSet<String> = local.difference(&remote).cloned().collect();
            let only_remote: BTreeSet<String> = remote.difference(&local).cloned().collect();
            let both: BTreeSet<String> = local.intersection(&remote).cloned().collect();
            prop_assert_eq!(deletes, only_local);
            prop_assert_eq!(clones, only_remote);
            prop_assert_eq!(updates, both);
            prop_assert_eq!(plan.len(), local.union(&remote).count());
        }

        /// Property: deletions always precede clones, clones precede updates
        #[test]
        fn plan_is_ordered_by_kind(local in names(), remote in names()) {
            let config = config(true);
            let lister = MemoryLister::new();
            let plan = Planner::new(&config, &lister)
                .plan(&remote_catalog(&refs(&remote)), &local_catalog(&refs(&local)), &[])
                .unwrap();

            let kinds: Vec<ActionKind> = plan.actions().iter().map(Action::kind).collect();
            let mut sorted = kinds.clone();
            sorted.sort_by_key(|kind| match kind {
                ActionKind::Delete => 0,
                ActionKind::DeleteExtra => 1,
                ActionKind::Clone => 2,
                ActionKind::Update => 3,
                ActionKind::OriginMismatch => 4,
            });
            prop_assert_eq!(kinds, sorted);
        }

        /// Property: applying a plan and planning again yields nothing
        #[test]
        fn applied_plan_is_a_fixed_point(local in names(), remote in names()) {
            let config = config(false);
            let lister = MemoryLister::new();
            let planner = Planner::new(&config, &lister);
            let plan = planner
                .plan(&remote_catalog(&refs(&remote)), &local_catalog(&refs(&local)), &[])
                .unwrap();

            let mut after = local.clone();
            for action in plan.actions() {
                match action {
                    Action::Delete { name, .. } => {
                        after.remove(name);
                    }
                    Action::Clone { identity, .. } => {
                        after.insert(identity.name.clone());
                    }
                    _ => {}
                }
            }

            prop_assert_eq!(&after, &remote);
            let replan = planner
                .plan(&remote_catalog(&refs(&remote)), &local_catalog(&refs(&after)), &[])
                .unwrap();
            prop_assert!(replan.is_empty());
        }
    }
}
