//! Staged multi-table replace.
//!
//! Tables are first written under `<schema>.db/_staging/<run_id>/<table>/`.
//! [`StagedCommit::commit`] then swaps them into place one at a time:
//!
//! 1. the live table (if any) is renamed to `_staging/<run_id>/_previous/<table>`,
//! 2. the staged table is renamed to the live location.
//!
//! Every step is recorded in `<schema>.db/_commit.json` *before* it is taken,
//! so an interrupted swap can always be undone by [`recover`]. If a swap step
//! fails, the tables already swapped are put back and [`EtlError::Commit`]
//! names the table that failed.

use super::Warehouse;
use super::format::write_table_dir;
use crate::error::EtlError;
use crate::records::TableSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const STAGING_DIR: &str = "_staging";
pub const JOURNAL_FILE: &str = "_commit.json";
const PREVIOUS_DIR: &str = "_previous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitState {
    Swapping,
    Committed,
}

/// Last step recorded for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapPhase {
    Pending,
    /// About to move (or moved) the live table aside.
    MovingAside,
    /// About to move (or moved) the staged table into place.
    Swapping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub table: String,
    pub had_previous: bool,
    pub phase: SwapPhase,
}

/// Contents of `_commit.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitJournal {
    pub run_id: String,
    pub state: CommitState,
    pub tables: Vec<JournalEntry>,
}

impl CommitJournal {
    fn save(&self, schema_dir: &Path) -> Result<()> {
        let path = schema_dir.join(JOURNAL_FILE);
        let tmp = schema_dir.join(format!("{JOURNAL_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }

    pub fn load(schema_dir: &Path) -> Result<Option<CommitJournal>> {
        let path = schema_dir.join(JOURNAL_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let journal =
            serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
        Ok(Some(journal))
    }
}

/// What a finished commit replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub run_id: String,
    pub tables: Vec<String>,
}

/// Tables staged for one run, not yet visible.
///
/// Dropping a `StagedCommit` without calling [`commit`](Self::commit) or
/// [`abort`](Self::abort) removes its staging directory.
pub struct StagedCommit<'w> {
    warehouse: &'w Warehouse,
    run_id: String,
    dir: PathBuf,
    staged: Vec<&'static str>,
    finished: bool,
}

impl<'w> StagedCommit<'w> {
    pub(crate) fn begin(warehouse: &'w Warehouse, run_id: &str) -> Result<Self> {
        let dir = warehouse.schema_dir().join(STAGING_DIR).join(run_id);
        fs::create_dir_all(&dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
        debug!(run_id, dir = %dir.display(), "Opened staging area");
        Ok(Self {
            warehouse,
            run_id: run_id.to_string(),
            dir,
            staged: Vec::new(),
            finished: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn staged_table_dir(&self, table: &str) -> PathBuf {
        self.dir.join(table)
    }

    pub fn staged_tables(&self) -> &[&'static str] {
        &self.staged
    }

    /// Write `rows` as the staged copy of `spec`, retrying per the
    /// warehouse's policy.
    pub fn stage<T>(&mut self, spec: &TableSpec, rows: &[T]) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let dir = self.staged_table_dir(spec.name);
        let format = self.warehouse.format();
        self.warehouse.retry().run(spec.name, |_attempt| {
            write_table_dir(&dir, spec, format, &self.run_id, rows)
        })?;
        if !self.staged.contains(&spec.name) {
            self.staged.push(spec.name);
        }
        info!(table = spec.name, rows = rows.len(), %format, "Staged table");
        Ok(())
    }

    /// Swap every staged table into place.
    ///
    /// # Errors
    /// [`EtlError::Commit`] if a swap step fails; the warehouse is rolled back
    /// to its previous tables unless the rollback itself failed.
    pub fn commit(mut self) -> Result<CommitSummary> {
        self.finished = true;
        let schema_dir = self.warehouse.schema_dir();
        let mut journal = CommitJournal {
            run_id: self.run_id.clone(),
            state: CommitState::Swapping,
            tables: self
                .staged
                .iter()
                .map(|t| JournalEntry {
                    table: (*t).to_string(),
                    had_previous: false,
                    phase: SwapPhase::Pending,
                })
                .collect(),
        };
        journal.save(&schema_dir)?;

        for i in 0..journal.tables.len() {
            if let Err(e) = self.swap_one(&mut journal, i) {
                let table = journal.tables[i].table.clone();
                warn!(table = %table, error = %format!("{e:#}"), "Swap failed, rolling back");
                let rolled_back = match roll_back(self.warehouse, &journal) {
                    Ok(()) => true,
                    Err(rb) => {
                        warn!(error = %format!("{rb:#}"), "Rollback failed; run `hotel-etl recover`");
                        false
                    }
                };
                return Err(EtlError::Commit {
                    table,
                    message: format!("{e:#}"),
                    rolled_back,
                }
                .into());
            }
        }

        journal.state = CommitState::Committed;
        journal.save(&schema_dir)?;
        finish_cleanup(self.warehouse, &self.run_id)?;
        info!(run_id = %self.run_id, tables = self.staged.len(), "Committed tables");
        Ok(CommitSummary {
            run_id: self.run_id.clone(),
            tables: self.staged.iter().map(|t| (*t).to_string()).collect(),
        })
    }

    fn swap_one(&self, journal: &mut CommitJournal, i: usize) -> Result<()> {
        let schema_dir = self.warehouse.schema_dir();
        let table = journal.tables[i].table.clone();
        let live = self.warehouse.table_dir(&table);
        let previous = self.dir.join(PREVIOUS_DIR).join(&table);
        let staged = self.staged_table_dir(&table);

        if live.exists() {
            journal.tables[i].had_previous = true;
            journal.tables[i].phase = SwapPhase::MovingAside;
            journal.save(&schema_dir)?;
            fs::create_dir_all(self.dir.join(PREVIOUS_DIR))?;
            fs::rename(&live, &previous)
                .with_context(|| format!("move {} aside", live.display()))?;
        }

        journal.tables[i].phase = SwapPhase::Swapping;
        journal.save(&schema_dir)?;
        fs::rename(&staged, &live)
            .with_context(|| format!("move {} into place", staged.display()))?;
        debug!(table = %table, "Swapped table");
        Ok(())
    }

    /// Discard every staged table. Live tables are untouched.
    pub fn abort(mut self) -> Result<()> {
        self.finished = true;
        remove_dir_if_exists(&self.dir)?;
        info!(run_id = %self.run_id, "Aborted staged commit");
        Ok(())
    }
}

impl Drop for StagedCommit<'_> {
    fn drop(&mut self) {
        if !self.finished
            && let Err(e) = remove_dir_if_exists(&self.dir)
        {
            warn!(dir = %self.dir.display(), error = %e, "Could not remove staging directory");
        }
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
    }
    Ok(())
}

/// Undo every swap recorded in `journal`, newest first. Safe to repeat.
fn roll_back(warehouse: &Warehouse, journal: &CommitJournal) -> Result<()> {
    let staging = warehouse.schema_dir().join(STAGING_DIR).join(&journal.run_id);
    for entry in journal.tables.iter().rev() {
        let live = warehouse.table_dir(&entry.table);
        let previous = staging.join(PREVIOUS_DIR).join(&entry.table);
        match entry.phase {
            SwapPhase::Pending => {}
            SwapPhase::MovingAside | SwapPhase::Swapping if entry.had_previous => {
                if previous.exists() {
                    remove_dir_if_exists(&live)?;
                    fs::rename(&previous, &live)
                        .with_context(|| format!("restore {}", live.display()))?;
                }
            }
            SwapPhase::MovingAside | SwapPhase::Swapping => remove_dir_if_exists(&live)?,
        }
        debug!(table = %entry.table, "Rolled back table");
    }
    remove_dir_if_exists(&staging)?;
    fs::remove_file(warehouse.schema_dir().join(JOURNAL_FILE))
        .with_context(|| format!("remove {JOURNAL_FILE}"))?;
    Ok(())
}

fn finish_cleanup(warehouse: &Warehouse, run_id: &str) -> Result<()> {
    remove_dir_if_exists(&warehouse.schema_dir().join(STAGING_DIR).join(run_id))?;
    let journal = warehouse.schema_dir().join(JOURNAL_FILE);
    if journal.exists() {
        fs::remove_file(&journal).with_context(|| format!("remove {}", journal.display()))?;
    }
    Ok(())
}

/// Outcome of [`recover`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Recovery {
    /// No interrupted commit; `removed_staging` abandoned staging runs deleted.
    Clean { removed_staging: usize },
    /// An interrupted swap was undone.
    RolledBack { run_id: String },
    /// A commit had finished swapping; its leftovers were removed.
    Finished { run_id: String },
}

/// Bring the schema back to a consistent state after a crash.
///
/// Undoes a swap that never reached `committed`, finishes the cleanup of one
/// that did, and removes abandoned staging directories.
pub fn recover(warehouse: &Warehouse) -> Result<Recovery> {
    let schema_dir = warehouse.schema_dir();
    let recovery = match CommitJournal::load(&schema_dir)? {
        Some(journal) if journal.state == CommitState::Swapping => {
            warn!(run_id = %journal.run_id, "Rolling back interrupted commit");
            roll_back(warehouse, &journal)?;
            Recovery::RolledBack {
                run_id: journal.run_id,
            }
        }
        Some(journal) => {
            info!(run_id = %journal.run_id, "Finishing cleanup of committed run");
            finish_cleanup(warehouse, &journal.run_id)?;
            Recovery::Finished {
                run_id: journal.run_id,
            }
        }
        None => Recovery::Clean { removed_staging: 0 },
    };

    let staging_root = schema_dir.join(STAGING_DIR);
    let mut removed = 0;
    if staging_root.exists() {
        for entry in fs::read_dir(&staging_root)
            .with_context(|| format!("list {}", staging_root.display()))?
        {
            let path = entry?.path();
            warn!(dir = %path.display(), "Removing abandoned staging directory");
            remove_dir_if_exists(&path)?;
            removed += 1;
        }
        fs::remove_dir(&staging_root).ok();
    }

    Ok(match recovery {
        Recovery::Clean { .. } => Recovery::Clean {
            removed_staging: removed,
        },
        other => other,
    })
}
