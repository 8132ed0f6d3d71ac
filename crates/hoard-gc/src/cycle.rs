//! One collection cycle, from listing the roots to retiring packs.

use std::collections::HashSet;
use std::path::Path;

use hoard_pack::cleanup;
use hoard_repo::{ErrorTally, LocalRepo, LockKind, StoreLock};
use hoard_types::ObjectId;

use crate::config::{DanglingPolicy, GcConfig};
use crate::error::{GcError, GcResult};
use crate::filter::BloomFilter;
use crate::plan::{estimate, plan, GarbageEstimate};
use crate::repack::{rewrite, RewriteOutcome};
use crate::walk::{walk, Anomaly};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Walking,
    FilterBuilt,
    Estimating,
    Planning,
    Rewriting,
    Done,
    Aborted,
}

/// Outcome of a collection cycle.
#[derive(Clone, Debug)]
pub struct GcReport {
    pub final_state: CycleState,
    /// Readable packs present when the cycle started.
    pub packs_examined: usize,
    /// Names of the packs selected for rewriting.
    pub worklist: Vec<String>,
    pub rewritten: usize,
    pub emptied: usize,
    pub unchanged: usize,
    /// Packs left out because they hold objects with broken references.
    pub skipped: usize,
    pub live_objects: usize,
    pub objects_dropped: usize,
    pub bytes_freed: u64,
    pub anomalies: Vec<Anomaly>,
    pub tally: ErrorTally,
}

impl GcReport {
    fn new() -> Self {
        Self {
            final_state: CycleState::Idle,
            packs_examined: 0,
            worklist: Vec::new(),
            rewritten: 0,
            emptied: 0,
            unchanged: 0,
            skipped: 0,
            live_objects: 0,
            objects_dropped: 0,
            bytes_freed: 0,
            anomalies: Vec::new(),
            tally: ErrorTally::new(),
        }
    }
}

/// A collection cycle driven one state at a time.
///
/// [`run_gc`] runs all steps; the individual steps exist so a caller can
/// observe or interleave with them.
pub struct Collector {
    repo: LocalRepo,
    config: GcConfig,
    state: CycleState,
    roots: Vec<(String, ObjectId)>,
    filter: Option<BloomFilter>,
    affected: HashSet<ObjectId>,
    estimates: Vec<GarbageEstimate>,
    worklist: Vec<GarbageEstimate>,
    report: GcReport,
    _lock: StoreLock,
}

impl Collector {
    /// Validate the config, lock the repository, clear leftovers of
    /// interrupted cycles and fix the packs and roots this cycle works on.
    pub fn start(repo_dir: &Path, config: GcConfig) -> GcResult<Self> {
        config.validate()?;
        let mut repo = LocalRepo::open(repo_dir)?;
        let lock = repo.lock(LockKind::Exclusive)?;

        let cleaned = cleanup(&repo.pack_dir())?;
        if !cleaned.removed.is_empty() {
            tracing::info!(
                files = cleaned.removed.len(),
                "removed leftovers of an interrupted collection"
            );
        }
        repo.reload_packs()?;
        let roots = repo.list_roots()?;

        let mut report = GcReport::new();
        for anomaly in repo.packs().anomalies() {
            report.tally.record(format!(
                "unreadable pack {}: {}",
                anomaly.index_path.display(),
                anomaly.error
            ));
        }
        report.packs_examined = repo.packs().pack_count();
        tracing::debug!(
            packs = report.packs_examined,
            roots = roots.len(),
            "collection starting"
        );

        Ok(Self {
            repo,
            config,
            state: CycleState::Idle,
            roots,
            filter: None,
            affected: HashSet::new(),
            estimates: Vec::new(),
            worklist: Vec::new(),
            report,
            _lock: lock,
        })
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn repo(&self) -> &LocalRepo {
        &self.repo
    }

    /// The report so far, with the current state as its final state.
    pub fn into_report(self) -> GcReport {
        GcReport {
            final_state: self.state,
            ..self.report
        }
    }

    /// Run every remaining step.
    pub fn run(mut self) -> GcResult<GcReport> {
        self.walk()?;
        self.estimate()?;
        self.plan()?;
        self.rewrite()?;
        Ok(self.into_report())
    }

    /// Walk the roots and build the membership filter.
    pub fn walk(&mut self) -> GcResult<()> {
        self.guarded(Self::walk_step)
    }

    /// Estimate the garbage in every pack.
    pub fn estimate(&mut self) -> GcResult<()> {
        self.guarded(Self::estimate_step)
    }

    /// Select the packs to rewrite.
    pub fn plan(&mut self) -> GcResult<()> {
        self.guarded(Self::plan_step)
    }

    /// Rewrite the worklist, unless the roots moved since the walk.
    pub fn rewrite(&mut self) -> GcResult<()> {
        self.guarded(Self::rewrite_step)
    }

    fn guarded(&mut self, step: fn(&mut Self) -> GcResult<()>) -> GcResult<()> {
        let result = step(self);
        if let Err(e) = &result {
            tracing::warn!(error = %e, state = ?self.state, "collection aborted");
            self.transition(CycleState::Aborted);
        }
        result
    }

    fn transition(&mut self, next: CycleState) {
        tracing::debug!(from = ?self.state, to = ?next, "gc state");
        self.state = next;
    }

    fn expect(&self, state: CycleState, action: &'static str) -> GcResult<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(GcError::OutOfOrder {
                action,
                state: self.state,
            })
        }
    }

    fn walk_step(&mut self) -> GcResult<()> {
        self.expect(CycleState::Idle, "walk")?;
        self.transition(CycleState::Walking);

        let reachable = walk(self.repo.packs(), &self.roots);
        let live = reachable.len();
        let filter = BloomFilter::build(reachable.iter(), live, self.config.false_positive_rate);
        let anomalies = reachable.into_anomalies();

        let corrupt = anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::CorruptObject { .. }))
            .count();
        if corrupt > 0 {
            self.report.anomalies = anomalies;
            return Err(GcError::CorruptObjects { count: corrupt });
        }

        match self.config.dangling {
            DanglingPolicy::Abort { tolerance } if anomalies.len() > tolerance => {
                let count = anomalies.len();
                self.report.anomalies = anomalies;
                return Err(GcError::DanglingReferences { count, tolerance });
            }
            DanglingPolicy::SkipAffected => {
                self.affected = anomalies.iter().filter_map(Anomaly::affected_object).collect();
            }
            DanglingPolicy::Abort { .. } => {}
        }

        tracing::info!(
            live,
            bits = filter.num_bits(),
            hashes = filter.num_hashes(),
            "membership filter built"
        );
        self.report.live_objects = live;
        self.report.anomalies = anomalies;
        self.filter = Some(filter);
        self.transition(CycleState::FilterBuilt);
        Ok(())
    }

    fn estimate_step(&mut self) -> GcResult<()> {
        self.expect(CycleState::FilterBuilt, "estimate")?;
        self.transition(CycleState::Estimating);
        let Some(filter) = self.filter.as_ref() else {
            return Err(GcError::OutOfOrder {
                action: "estimate",
                state: self.state,
            });
        };

        for pack in self.repo.packs().packs() {
            if self.affected.iter().any(|id| pack.contains(id)) {
                tracing::warn!(pack = %pack.name(), "holds objects with broken references, skipping");
                self.report.skipped += 1;
                continue;
            }
            self.estimates.push(estimate(pack, filter));
        }
        Ok(())
    }

    fn plan_step(&mut self) -> GcResult<()> {
        self.expect(CycleState::Estimating, "plan")?;
        self.transition(CycleState::Planning);

        self.worklist = plan(std::mem::take(&mut self.estimates), self.config.threshold);
        self.report.worklist = self.worklist.iter().map(|e| e.pack.name.clone()).collect();
        tracing::info!(
            packs = self.worklist.len(),
            threshold = self.config.threshold.percent(),
            "planned rewrites"
        );
        Ok(())
    }

    fn rewrite_step(&mut self) -> GcResult<()> {
        self.expect(CycleState::Planning, "rewrite")?;
        if self.repo.list_roots()? != self.roots {
            return Err(GcError::RootsChanged);
        }
        self.transition(CycleState::Rewriting);

        let Some(filter) = self.filter.as_ref() else {
            return Err(GcError::OutOfOrder {
                action: "rewrite",
                state: self.state,
            });
        };
        let pack_dir = self.repo.pack_dir();
        let report = &mut self.report;

        for planned in &self.worklist {
            let Some(reader) = self.repo.packs().find(&planned.pack.name) else {
                report
                    .tally
                    .record(format!("pack {} vanished during collection", planned.pack.name));
                continue;
            };
            match rewrite(reader, filter, self.config.compression, &pack_dir) {
                Ok(outcome) => {
                    report.objects_dropped += outcome.dropped();
                    report.bytes_freed += outcome.bytes_freed(planned.pack.size_bytes);
                    match outcome {
                        RewriteOutcome::NoChangeNeeded => report.unchanged += 1,
                        RewriteOutcome::Emptied { .. } => report.emptied += 1,
                        RewriteOutcome::Rewritten { .. } => report.rewritten += 1,
                    }
                }
                Err(e) => report
                    .tally
                    .record(format!("failed to rewrite {}: {e}", planned.pack.name)),
            }
        }

        self.filter = None;
        self.transition(CycleState::Done);
        tracing::info!(
            rewritten = self.report.rewritten,
            emptied = self.report.emptied,
            dropped = self.report.objects_dropped,
            bytes_freed = self.report.bytes_freed,
            errors = self.report.tally.count(),
            "collection finished"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("repo", &self.repo)
            .field("state", &self.state)
            .field("roots", &self.roots.len())
            .finish()
    }
}

/// Collect garbage in the repository at `repo_dir`.
///
/// Returns `Err` for conditions that stop the cycle before anything is
/// removed. Per-pack failures are tallied in the report instead.
pub fn run_gc(repo_dir: &Path, config: &GcConfig) -> GcResult<GcReport> {
    Collector::start(repo_dir, config.clone())?.run()
}
