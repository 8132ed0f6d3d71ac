//! Removing branches, tags and saves from the reference graph.
//!
//! Removal only edits refs and writes re-parented saves. The objects that
//! become unreachable stay in their packs until the next collection.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use hoard_refs::{branch_ref_name, tag_ref_name, Ref};
use hoard_repo::{ErrorTally, RepoHandle};
use hoard_store::StoredObject;
use hoard_types::ObjectId;

use crate::config::RmConfig;
use crate::error::{RemovalError, RmResult};
use crate::history::{load_history, Save};
use crate::name::{parse_name, SaveSelector, Target, TAG_DIR};

/// What was removed for one name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Removal {
    Tag(String),
    Branch(String),
    Save { branch: String, save: String },
    /// The save's whole branch was removed by another name in the batch.
    WithBranch { branch: String },
}

/// What happened to one name.
///
/// Names resolving to the same ref, or saves of a branch whose history
/// could not be loaded, share one error.
pub type NameResult = Result<Removal, Arc<RemovalError>>;

/// The result for one name of a batch, in input order.
#[derive(Debug)]
pub struct NameOutcome {
    pub name: String,
    pub result: NameResult,
}

/// Outcome of a removal batch.
#[derive(Debug, Default)]
pub struct RmReport {
    pub outcomes: Vec<NameOutcome>,
    /// Saves re-written with a redirected parent.
    pub snapshots_written: usize,
    pub tally: ErrorTally,
}

impl RmReport {
    pub fn removed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
}

/// Remove every name in `names` from the repository behind `repo`.
///
/// Errors are per name: a failed name is reported and tallied, and the
/// rest of the batch still runs. Nothing already removed is restored.
pub fn remove(repo: &mut dyn RepoHandle, names: &[Vec<u8>], config: &RmConfig) -> RmReport {
    let mut results: Vec<Option<NameResult>> = vec![None; names.len()];
    let mut tags = BTreeMap::<String, Vec<usize>>::new();
    let mut branches = BTreeMap::<String, Vec<usize>>::new();
    let mut saves = BTreeMap::<String, Vec<(usize, SaveSelector)>>::new();

    for (i, raw) in names.iter().enumerate() {
        match parse_name(raw) {
            Ok(Target::Tag(tag)) => tags.entry(tag).or_default().push(i),
            Ok(Target::Branch(branch)) => branches.entry(branch).or_default().push(i),
            Ok(Target::Save { branch, save }) => {
                saves.entry(branch).or_default().push((i, save))
            }
            Err(e) => results[i] = Some(Err(Arc::new(e))),
        }
    }

    for (tag, indices) in tags {
        let outcome = delete(repo, &tag_ref_name(&tag), &format!("{TAG_DIR}/{tag}"))
            .map(|()| Removal::Tag(tag));
        settle(&mut results, indices.into_iter(), outcome);
    }

    let mut deleted_branches = BTreeSet::new();
    for (branch, indices) in branches {
        let outcome = delete(repo, &branch_ref_name(&branch), &branch);
        if outcome.is_ok() {
            deleted_branches.insert(branch.clone());
        }
        settle(&mut results, indices.into_iter(), outcome.map(|()| Removal::Branch(branch)));
    }

    let mut snapshots_written = 0;
    for (branch, selections) in saves {
        if deleted_branches.contains(&branch) {
            let outcome = Ok(Removal::WithBranch { branch });
            settle(&mut results, selections.into_iter().map(|(i, _)| i), outcome);
            continue;
        }
        match remove_saves(repo, &branch, &selections, config) {
            Ok((per_save, written)) => {
                snapshots_written += written;
                for ((i, _), outcome) in selections.iter().zip(per_save) {
                    results[*i] = Some(outcome.map_err(Arc::new));
                }
            }
            Err(e) => settle(&mut results, selections.into_iter().map(|(i, _)| i), Err(e)),
        }
    }

    let mut report = RmReport {
        snapshots_written,
        ..RmReport::default()
    };
    for (raw, result) in names.iter().zip(results) {
        let name = String::from_utf8_lossy(raw).into_owned();
        let result = result.unwrap_or_else(|| {
            Err(Arc::new(RemovalError::NotFound { name: name.clone() }))
        });
        match &result {
            Ok(removal) => tracing::info!(%name, ?removal, "removed"),
            Err(e) => report.tally.record(format!("cannot remove {name}: {e}")),
        }
        report.outcomes.push(NameOutcome { name, result });
    }
    report
}

fn delete(repo: &dyn RepoHandle, ref_name: &str, display: &str) -> Result<(), RemovalError> {
    if repo.refs().delete_ref(ref_name)? {
        Ok(())
    } else {
        Err(RemovalError::NotFound {
            name: display.to_string(),
        })
    }
}

/// Give every name in `indices` the same outcome.
fn settle(
    results: &mut [Option<NameResult>],
    indices: impl Iterator<Item = usize>,
    outcome: Result<Removal, RemovalError>,
) {
    let outcome = outcome.map_err(Arc::new);
    for i in indices {
        results[i] = Some(outcome.clone());
    }
}

type SaveOutcomes = (Vec<Result<Removal, RemovalError>>, usize);

/// Excise the selected saves from `branch`. Returns one outcome per
/// selection and the number of saves re-written.
fn remove_saves(
    repo: &mut dyn RepoHandle,
    branch: &str,
    selections: &[(usize, SaveSelector)],
    config: &RmConfig,
) -> Result<SaveOutcomes, RemovalError> {
    let ref_name = branch_ref_name(branch);
    let tip = repo
        .refs()
        .read_ref(&ref_name)?
        .ok_or_else(|| RemovalError::NotFound {
            name: branch.to_string(),
        })?
        .target();
    let history = load_history(repo, branch, tip)?;

    let mut dead = HashSet::new();
    let outcomes = selections
        .iter()
        .map(|(_, selector)| {
            let found = match selector {
                SaveSelector::Latest => history.last(),
                SaveSelector::Named(name) => history.iter().find(|s| &s.name == name),
            };
            match found {
                Some(save) => {
                    dead.insert(save.id);
                    Ok(Removal::Save {
                        branch: branch.to_string(),
                        save: save.name.clone(),
                    })
                }
                None => Err(RemovalError::NotFound {
                    name: format!("{branch}/{selector}"),
                }),
            }
        })
        .collect::<Vec<_>>();

    if dead.is_empty() {
        return Ok((outcomes, 0));
    }
    if history.iter().all(|s| dead.contains(&s.id)) {
        tracing::debug!(branch, "every save removed, deleting branch");
        repo.refs().delete_ref(&ref_name)?;
        return Ok((outcomes, 0));
    }

    let (new_tip, rewritten) = replay(branch, &history, &dead)?;
    let written = rewritten.len();
    if !rewritten.is_empty() {
        repo.write_objects(&rewritten, config.compression)?;
    }
    repo.refs()
        .update_ref(&ref_name, &Ref::branch(branch, new_tip), Some(tip))?;
    tracing::debug!(
        branch,
        removed = dead.len(),
        rewritten = written,
        tip = %new_tip.short_hex(),
        "branch history rewritten"
    );
    Ok((outcomes, written))
}

/// Rebuild the chain without the dead saves. Kept saves before the first
/// dead one keep their ids; later ones are re-parented. Returns the new tip
/// and the re-written saves.
fn replay(
    branch: &str,
    history: &[Save],
    dead: &HashSet<ObjectId>,
) -> Result<(ObjectId, Vec<StoredObject>), RemovalError> {
    let mut parent: Option<ObjectId> = None;
    let mut rewritten = Vec::new();
    for save in history {
        if dead.contains(&save.id) {
            continue;
        }
        if save.snapshot.parent == parent {
            parent = Some(save.id);
            continue;
        }
        let obj = save.snapshot.with_parent(parent).to_stored_object()?;
        parent = Some(obj.compute_id());
        rewritten.push(obj);
    }
    let tip = parent.ok_or_else(|| RemovalError::MalformedHistory {
        branch: branch.to_string(),
        reason: "no save left to replay".into(),
    })?;
    Ok((tip, rewritten))
}

/// Validate the batch and remove every name.
///
/// Returns `Err` only for configuration problems, before anything is
/// touched. Per-name failures are in the report's outcomes and tally.
pub fn run_rm(
    repo: &mut dyn RepoHandle,
    names: &[Vec<u8>],
    config: &RmConfig,
) -> RmResult<RmReport> {
    config.validate(names)?;
    let report = remove(repo, names, config);
    tracing::info!(
        removed = report.removed(),
        failed = report.tally.count(),
        rewritten = report.snapshots_written,
        "removal finished"
    );
    Ok(report)
}
