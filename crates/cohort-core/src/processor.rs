//! The reconciliation processor.
//!
//! Rows are processed strictly in input order: later rows' duplicate
//! detection depends on the pair keys recorded by earlier rows.

use std::collections::BTreeSet;

use tracing::{debug, info};

use cohort_model::{
    CohortRef, Counters, ProcessOptions, Result, Row, RowResult, RowStatus, RunOutcome,
};

use crate::directory::Directory;

/// Process rows against a directory and return per-row results plus counters.
///
/// Each row short-circuits at the first applicable rule: validate, dedup,
/// resolve user, resolve cohort, membership check, remove. Malformed row data
/// is a terminal per-row status, never an error return. Directory faults
/// abort the whole run; the caller must treat that as "no reconciliation
/// occurred".
///
/// When `dry_run` is set, no transaction is opened and
/// [`Directory::remove_membership`] is never invoked.
pub fn process<D: Directory>(
    rows: &[Row],
    options: &ProcessOptions,
    directory: &mut D,
) -> Result<RunOutcome> {
    let mut seen_pairs: BTreeSet<(String, CohortRef)> = BTreeSet::new();
    let mut results = Vec::with_capacity(rows.len());
    let mut counters = Counters::default();

    if !options.dry_run {
        directory.begin()?;
    }

    for row in rows {
        let (username, cohort_ref) = normalise(row, options);
        let result = resolve_row(&username, &cohort_ref, &mut seen_pairs, options, directory)?;
        debug!(username = %username, status = %result.status, "row processed");
        counters.record(result.status);
        results.push(result);
    }

    if !options.dry_run {
        directory.commit()?;
    }

    info!(
        total = counters.total,
        processed = counters.processed,
        errors = counters.errors,
        dry_run = options.dry_run,
        "reconciliation run complete"
    );
    Ok(RunOutcome { results, counters })
}

fn resolve_row<D: Directory>(
    username: &str,
    cohort_ref: &CohortRef,
    seen_pairs: &mut BTreeSet<(String, CohortRef)>,
    options: &ProcessOptions,
    directory: &mut D,
) -> Result<RowResult> {
    let echo = |status: RowStatus| RowResult {
        username: username.to_string(),
        cohort_id: cohort_ref.id(),
        cohort_idnumber: cohort_ref.idnumber().map(str::to_string),
        status,
    };

    // Validate.
    if username.is_empty() || cohort_ref.is_unresolved() {
        return Ok(echo(RowStatus::Invalid));
    }

    // De-duplicate within this run. The pair is recorded before resolution,
    // so later identical rows are duplicates regardless of resolvability.
    let pair_key = (username.to_string(), cohort_ref.clone());
    if seen_pairs.contains(&pair_key) {
        return Ok(echo(RowStatus::DuplicateInFile));
    }
    seen_pairs.insert(pair_key);

    // Resolve user.
    let Some(user) = directory.find_active_user(username)? else {
        return Ok(echo(RowStatus::UserNotFound));
    };

    // Resolve cohort; the row format selects exactly one reference kind.
    let cohort = match cohort_ref {
        CohortRef::ById(id) => directory.find_cohort_by_id(*id)?,
        CohortRef::ByIdNumber(idnumber) => directory.find_cohort_by_idnumber(idnumber)?,
        CohortRef::Unresolved => unreachable!("unresolved refs fail validation"),
    };
    let Some(cohort) = cohort else {
        return Ok(echo(RowStatus::CohortNotFound));
    };

    let resolved = |status: RowStatus| RowResult {
        username: username.to_string(),
        cohort_id: Some(cohort.id),
        cohort_idnumber: cohort_ref.idnumber().map(str::to_string),
        status,
    };

    // Membership check.
    if !directory.is_member(cohort.id, user.id)? {
        return Ok(resolved(RowStatus::NotMember));
    }

    // Remove membership (unless this is a dry run).
    if !options.dry_run {
        directory.remove_membership(cohort.id, user.id)?;
    }
    Ok(resolved(RowStatus::Removed))
}

/// Trim the username (lower-casing it under `standardise`) and trim the
/// id-number reference, demoting an emptied id-number to `Unresolved`.
fn normalise(row: &Row, options: &ProcessOptions) -> (String, CohortRef) {
    let mut username = row.username.trim().to_string();
    if options.standardise && !username.is_empty() {
        username = username.to_lowercase();
    }
    let cohort_ref = match &row.cohort_ref {
        CohortRef::ByIdNumber(idnumber) => {
            let trimmed = idnumber.trim();
            if trimmed.is_empty() {
                CohortRef::Unresolved
            } else {
                CohortRef::ByIdNumber(trimmed.to_string())
            }
        }
        other => other.clone(),
    };
    (username, cohort_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;

    fn scenario_directory() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_user(1, "alice")
            .with_user(2, "bob")
            .with_user(3, "charlie")
            .with_cohort(10, "Cohort Z", "cohortZ")
            .with_cohort(11, "Class of 2016", "2016class")
            .with_member(10, 1)
            .with_member(11, 3)
    }

    fn by_idnumber(username: &str, idnumber: &str) -> Row {
        Row::new(username, CohortRef::ByIdNumber(idnumber.to_string()))
    }

    fn statuses(outcome: &RunOutcome) -> Vec<RowStatus> {
        outcome.results.iter().map(|r| r.status).collect()
    }

    #[test]
    fn removes_members_and_skips_nonmembers() {
        let mut directory = scenario_directory();
        let rows = vec![
            by_idnumber("alice", "cohortZ"),
            by_idnumber("bob", "cohortZ"),
            by_idnumber("nobody", "cohortZ"),
            by_idnumber("charlie", "doesnotexist"),
        ];
        let options = ProcessOptions::new().with_standardise(true);

        let outcome = process(&rows, &options, &mut directory).unwrap();

        assert_eq!(
            statuses(&outcome),
            vec![
                RowStatus::Removed,
                RowStatus::NotMember,
                RowStatus::UserNotFound,
                RowStatus::CohortNotFound,
            ]
        );
        assert_eq!(outcome.counters.total, 4);
        assert_eq!(outcome.counters.valid, 2);
        assert_eq!(outcome.counters.processed, 1);
        assert_eq!(outcome.counters.skipped, 3);
        assert_eq!(outcome.counters.errors, 2);

        // alice is gone from cohortZ, charlie untouched in 2016class.
        assert!(!directory.is_member(10, 1).unwrap());
        assert!(directory.is_member(11, 3).unwrap());
        assert_eq!(directory.removal_calls(), 1);
        assert_eq!(directory.commits(), 1);
    }

    #[test]
    fn resolved_rows_carry_the_resolved_cohort_id() {
        let mut directory = scenario_directory();
        let rows = vec![by_idnumber("alice", "cohortZ")];
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        let result = &outcome.results[0];
        assert_eq!(result.cohort_id, Some(10));
        assert_eq!(result.cohort_idnumber.as_deref(), Some("cohortZ"));
        assert_eq!(result.status, RowStatus::Removed);
    }

    #[test]
    fn dry_run_never_touches_the_directory() {
        let rows = vec![
            by_idnumber("alice", "cohortZ"),
            by_idnumber("bob", "cohortZ"),
            by_idnumber("nobody", "cohortZ"),
            by_idnumber("charlie", "doesnotexist"),
        ];
        let options = ProcessOptions::new().with_standardise(true).with_dry_run(true);

        let mut directory = scenario_directory();
        let first = process(&rows, &options, &mut directory).unwrap();
        let second = process(&rows, &options, &mut directory).unwrap();

        // Same statuses and counters as the live run, repeatable, and no
        // mutation at all.
        assert_eq!(first, second);
        assert_eq!(
            statuses(&first),
            vec![
                RowStatus::Removed,
                RowStatus::NotMember,
                RowStatus::UserNotFound,
                RowStatus::CohortNotFound,
            ]
        );
        assert_eq!(first.counters.errors, 2);
        assert!(directory.is_member(10, 1).unwrap());
        assert_eq!(directory.removal_calls(), 0);
        assert_eq!(directory.commits(), 0);
    }

    #[test]
    fn second_identical_pair_is_a_duplicate() {
        let mut directory = scenario_directory();
        let rows = vec![
            by_idnumber("alice", "cohortZ"),
            by_idnumber("alice", "cohortZ"),
        ];
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        assert_eq!(
            statuses(&outcome),
            vec![RowStatus::Removed, RowStatus::DuplicateInFile]
        );
        assert_eq!(directory.removal_calls(), 1);
    }

    #[test]
    fn duplicates_are_flagged_regardless_of_resolvability() {
        // The pair is recorded before user resolution, so an unresolvable
        // pair still shadows its repeats.
        let mut directory = scenario_directory();
        let rows = vec![
            by_idnumber("ghost", "cohortZ"),
            by_idnumber("ghost", "cohortZ"),
        ];
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        assert_eq!(
            statuses(&outcome),
            vec![RowStatus::UserNotFound, RowStatus::DuplicateInFile]
        );
    }

    #[test]
    fn invalid_rows_never_enter_the_pair_set() {
        let mut directory = scenario_directory();
        let rows = vec![
            Row::new("", CohortRef::ById(10)),
            Row::new("", CohortRef::ById(10)),
            Row::new("alice", CohortRef::Unresolved),
        ];
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        assert_eq!(
            statuses(&outcome),
            vec![RowStatus::Invalid, RowStatus::Invalid, RowStatus::Invalid]
        );
        assert_eq!(outcome.counters.errors, 3);
        assert_eq!(outcome.counters.skipped, 3);
    }

    #[test]
    fn standardise_collapses_username_variants() {
        let rows = vec![
            by_idnumber("  Alice ", "cohortZ"),
            by_idnumber("alice", "cohortZ"),
        ];

        let mut directory = scenario_directory();
        let standardised = ProcessOptions::new().with_standardise(true);
        let outcome = process(&rows, &standardised, &mut directory).unwrap();
        assert_eq!(
            statuses(&outcome),
            vec![RowStatus::Removed, RowStatus::DuplicateInFile]
        );
        assert_eq!(outcome.results[0].username, "alice");

        // Without standardisation only trimming applies: "Alice" is a
        // distinct (and unknown) username.
        let mut directory = scenario_directory();
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        assert_eq!(
            statuses(&outcome),
            vec![RowStatus::UserNotFound, RowStatus::Removed]
        );
        assert_eq!(outcome.results[0].username, "Alice");
    }

    #[test]
    fn id_and_idnumber_refs_are_distinct_pairs() {
        // Same user, same cohort, referenced two different ways: not a
        // duplicate. The first row removes the membership, so the second
        // resolves to a non-member.
        let mut directory = scenario_directory();
        let rows = vec![
            Row::new("alice", CohortRef::ById(10)),
            by_idnumber("alice", "cohortZ"),
        ];
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        assert_eq!(
            statuses(&outcome),
            vec![RowStatus::Removed, RowStatus::NotMember]
        );
    }

    #[test]
    fn deleted_users_are_not_found() {
        let mut directory = InMemoryDirectory::new()
            .with_deleted_user(1, "alice")
            .with_cohort(10, "Cohort Z", "cohortZ")
            .with_member(10, 1);
        let rows = vec![by_idnumber("alice", "cohortZ")];
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        assert_eq!(statuses(&outcome), vec![RowStatus::UserNotFound]);
        assert!(directory.is_member(10, 1).unwrap());
    }

    #[test]
    fn whitespace_idnumber_is_invalid() {
        let mut directory = scenario_directory();
        let rows = vec![by_idnumber("alice", "   ")];
        let outcome = process(&rows, &ProcessOptions::new(), &mut directory).unwrap();
        assert_eq!(statuses(&outcome), vec![RowStatus::Invalid]);
        assert_eq!(outcome.results[0].cohort_idnumber, None);
    }

    #[test]
    fn directory_fault_aborts_the_run() {
        let mut directory = scenario_directory();
        directory.fail_next_remove();
        let rows = vec![by_idnumber("alice", "cohortZ")];
        let result = process(&rows, &ProcessOptions::new(), &mut directory);
        assert!(result.is_err());
        // The failed run committed nothing.
        assert_eq!(directory.commits(), 0);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn any_username() -> impl Strategy<Value = String> {
            prop::sample::select(vec![
                "alice".to_string(),
                " Alice ".to_string(),
                "bob".to_string(),
                "ghost".to_string(),
                String::new(),
            ])
        }

        fn any_ref() -> impl Strategy<Value = CohortRef> {
            prop::sample::select(vec![
                CohortRef::ById(10),
                CohortRef::ById(99),
                CohortRef::ByIdNumber("cohortZ".to_string()),
                CohortRef::ByIdNumber("nope".to_string()),
                CohortRef::Unresolved,
            ])
        }

        fn any_rows() -> impl Strategy<Value = Vec<Row>> {
            prop::collection::vec(
                (any_username(), any_ref()).prop_map(|(u, r)| Row::new(u, r)),
                0..32,
            )
        }

        fn oracle_key(row: &Row, standardise: bool) -> Option<(String, CohortRef)> {
            let mut username = row.username.trim().to_string();
            if standardise && !username.is_empty() {
                username = username.to_lowercase();
            }
            let cohort_ref = match &row.cohort_ref {
                CohortRef::ByIdNumber(s) if s.trim().is_empty() => CohortRef::Unresolved,
                CohortRef::ByIdNumber(s) => CohortRef::ByIdNumber(s.trim().to_string()),
                other => other.clone(),
            };
            if username.is_empty() || cohort_ref.is_unresolved() {
                None
            } else {
                Some((username, cohort_ref))
            }
        }

        proptest! {
            #[test]
            fn results_preserve_order_and_counters(
                rows in any_rows(),
                standardise in any::<bool>(),
                dry_run in any::<bool>(),
            ) {
                let mut directory = scenario_directory();
                let options = ProcessOptions {
                    standardise,
                    dry_run,
                };
                let outcome = process(&rows, &options, &mut directory).unwrap();

                // One result per row, same order.
                prop_assert_eq!(outcome.results.len(), rows.len());
                prop_assert_eq!(outcome.counters.total, rows.len() as u64);
                for (row, result) in rows.iter().zip(&outcome.results) {
                    let mut expected = row.username.trim().to_string();
                    if standardise && !expected.is_empty() {
                        expected = expected.to_lowercase();
                    }
                    prop_assert_eq!(&result.username, &expected);
                }

                // Counters are exactly the per-status tallies.
                let recount = outcome.results.iter().fold(
                    Counters::default(),
                    |mut acc, r| {
                        acc.record(r.status);
                        acc
                    },
                );
                prop_assert_eq!(outcome.counters, recount);

                // Any repeat of an already-seen pair key is a duplicate.
                let mut seen = std::collections::BTreeSet::new();
                for (row, result) in rows.iter().zip(&outcome.results) {
                    match oracle_key(row, standardise) {
                        Some(key) => {
                            if !seen.insert(key) {
                                prop_assert_eq!(result.status, RowStatus::DuplicateInFile);
                            } else {
                                prop_assert_ne!(result.status, RowStatus::DuplicateInFile);
                            }
                        }
                        None => prop_assert_eq!(result.status, RowStatus::Invalid),
                    }
                }

                if dry_run {
                    prop_assert_eq!(directory.removal_calls(), 0);
                }
            }
        }
    }
}
