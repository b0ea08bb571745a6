//! Append-only per-party vote ledgers.
//!
//! Each party has a CSV file `<party>.csv` under the ledger directory with
//! one row per vote. Recording is idempotent: a vote already present in a
//! party's file is never appended again.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arrow::array::{Array, Int64Array, RecordBatch, StringArray};
use arrow::csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info, warn};
use votelens_core::schema::tables;
use votelens_core::{PartyTally, VoteId, tally_ballots};

use crate::StoreError;
use crate::ballot::read_ballots;

/// Directory of per-party ledger files.
///
/// Appends are serialized through an internal lock so concurrent workers can
/// share one ledger.
#[derive(Debug)]
pub struct PartyLedger {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl PartyLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, party: &str) -> PathBuf {
        self.dir.join(format!("{party}.csv"))
    }

    /// Tally a member ballot spreadsheet and record it for every party.
    pub fn record_ballot(&self, vote_id: &VoteId, spreadsheet: &Path) -> Result<usize, StoreError> {
        let rows = read_ballots(spreadsheet)?;
        let tallies = tally_ballots(vote_id, &rows);
        self.record(&tallies)
    }

    /// Append tallies, skipping parties that already hold the vote.
    ///
    /// Returns the number of rows actually written.
    pub fn record(&self, tallies: &[PartyTally]) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::create_dir_all(&self.dir)?;

        let mut written = 0;
        for tally in tallies {
            let path = self.path_for(&tally.party);
            let known = if path.exists() {
                self.vote_ids(&path)?
            } else {
                HashSet::new()
            };
            if known.contains(tally.vote_id.as_str()) {
                debug!(party = %tally.party, vote_id = %tally.vote_id, "vote already in ledger");
                continue;
            }
            append_row(&path, tally)?;
            written += 1;
        }
        if written > 0 {
            info!(rows = written, dir = %self.dir.display(), "updated party ledgers");
        }
        Ok(written)
    }

    /// All tallies recorded for one party, one per vote id.
    pub fn read(&self, party: &str) -> Result<Vec<PartyTally>, StoreError> {
        let path = self.path_for(party);
        if !path.exists() {
            return Err(StoreError::InputNotFound(path));
        }
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for batch in read_ledger(&path)? {
            let (ids, adopt, reject, abstain) = ledger_columns(&batch)?;
            for row in 0..batch.num_rows() {
                let raw = ids.value(row);
                let vote_id: VoteId = match raw.parse() {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(party, vote_id = raw, error = %e, "malformed ledger row ignored");
                        continue;
                    }
                };
                if !seen.insert(raw.to_string()) {
                    warn!(party, vote_id = raw, "duplicate ledger row ignored");
                    continue;
                }
                out.push(PartyTally {
                    party: party.to_string(),
                    vote_id,
                    adopt: count(adopt, row),
                    reject: count(reject, row),
                    abstain: count(abstain, row),
                });
            }
        }
        Ok(out)
    }

    /// Parties that have a ledger file, sorted by name.
    pub fn parties(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut parties = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                parties.push(stem.to_string());
            }
        }
        parties.sort();
        Ok(parties)
    }

    fn vote_ids(&self, path: &Path) -> Result<HashSet<String>, StoreError> {
        let mut ids = HashSet::new();
        for batch in read_ledger(path)? {
            let (col, ..) = ledger_columns(&batch)?;
            ids.extend(col.iter().flatten().map(str::to_string));
        }
        Ok(ids)
    }
}

fn count(arr: &Int64Array, row: usize) -> u64 {
    if arr.is_null(row) {
        0
    } else {
        arr.value(row).max(0) as u64
    }
}

fn read_ledger(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let reader = ReaderBuilder::new(Arc::new(tables::ledger_schema()))
        .with_header(true)
        .build(File::open(path)?)?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

fn ledger_columns(
    batch: &RecordBatch,
) -> Result<(&StringArray, &Int64Array, &Int64Array, &Int64Array), StoreError> {
    let string = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
    };
    let int = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
            .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
    };
    Ok((
        string("vote_id")?,
        int("adopt_count")?,
        int("reject_count")?,
        int("abstain_count")?,
    ))
}

fn append_row(path: &Path, tally: &PartyTally) -> Result<(), StoreError> {
    let fresh = !path.exists();
    let batch = RecordBatch::try_new(
        Arc::new(tables::ledger_schema()),
        vec![
            Arc::new(StringArray::from(vec![tally.vote_id.as_str()])),
            Arc::new(Int64Array::from(vec![tally.adopt as i64])),
            Arc::new(Int64Array::from(vec![tally.reject as i64])),
            Arc::new(Int64Array::from(vec![tally.abstain as i64])),
        ],
    )?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new().with_header(fresh).build(file);
    writer.write(&batch)?;
    Ok(())
}
