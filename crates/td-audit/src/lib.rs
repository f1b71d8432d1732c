//! td-audit
//!
//! Append-only audit ledger of field-level price changes.
//!
//! Persisted as JSON Lines (one entry per line), appended per entry. The
//! in-memory sequence is authoritative for reads; a failed file write keeps
//! the entry in memory and is reported through [`Appended::durable`].
//! Optional hash chain: each entry can carry `hashPrev` + `hashSelf`.

mod chain;

pub use chain::{compute_entry_hash, verify_hash_chain, verify_hash_chain_str, VerifyResult};

use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use td_schemas::{AuditEntry, FieldChange};
use tracing::{info, warn};

use crate::chain::canonical_json_line;

/// Result of [`AuditLedger::append`].
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    pub entry: AuditEntry,
    /// false when the entry could not be written to the ledger file.
    pub durable: bool,
}

pub struct AuditLedger {
    path: Option<PathBuf>,
    hash_chain: bool,
    /// Hash of the most recent hashed entry.
    last_hash: Option<String>,
    entries: Vec<AuditEntry>,
}

impl AuditLedger {
    /// Ledger without a backing file.
    pub fn in_memory(hash_chain: bool) -> Self {
        Self {
            path: None,
            hash_chain,
            last_hash: None,
            entries: Vec::new(),
        }
    }

    /// Open (or create) a file-backed ledger and restore prior entries.
    ///
    /// A missing file is an empty ledger. A legacy JSON array document is
    /// migrated to JSON Lines; if the migration cannot be written, `open`
    /// fails and the file is left untouched. An unreadable file is moved
    /// aside and the ledger starts empty.
    pub fn open(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create_dir_all {:?}", parent))?;
            }
        }

        let entries = match load_entries(&path) {
            Ok(Loaded::Missing) => Vec::new(),
            Ok(Loaded::Lines(entries)) => entries,
            Ok(Loaded::Legacy(entries)) => {
                // Lines must never be appended after a legacy `]`.
                rewrite_as_lines(&path, &entries)
                    .with_context(|| format!("migrate legacy audit ledger {:?}", path))?;
                info!(path = %path.display(), entries = entries.len(), "migrated legacy audit ledger to JSON Lines");
                entries
            }
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "audit ledger unreadable; starting empty");
                quarantine(&path);
                Vec::new()
            }
        };

        let last_hash = entries.iter().rev().find_map(|e| e.hash_self.clone());

        Ok(Self {
            path: Some(path),
            hash_chain,
            last_hash,
            entries,
        })
    }

    /// Append one change, stamped with the current time.
    pub fn append(&mut self, change: FieldChange) -> Appended {
        let ts = Utc::now().trunc_subsecs(3);
        let seq = self.next_seq();
        let mut entry = AuditEntry::from_change(seq, change, ts);

        if self.hash_chain {
            entry.hash_prev = self.last_hash.clone();
            match compute_entry_hash(&entry) {
                Ok(h) => {
                    entry.hash_self = Some(h.clone());
                    self.last_hash = Some(h);
                }
                Err(err) => {
                    warn!(seq, error = %format!("{err:#}"), "audit hash failed; entry left unchained");
                    entry.hash_prev = None;
                }
            }
        }

        let durable = match &self.path {
            None => true,
            Some(path) => match canonical_json_line(&entry).and_then(|line| append_line(path, &line)) {
                Ok(()) => true,
                Err(err) => {
                    warn!(seq, path = %path.display(), error = %format!("{err:#}"), "audit entry not persisted");
                    false
                }
            },
        };

        self.entries.push(entry.clone());
        Appended { entry, durable }
    }

    /// Every entry in append (= chronological) order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries matching the optional category / record id filters, in order.
    pub fn filter(&self, category: Option<&str>, id: Option<&str>) -> Vec<AuditEntry> {
        self.entries
            .iter()
            .filter(|e| category.map_or(true, |c| e.category.eq_ignore_ascii_case(c)))
            .filter(|e| id.map_or(true, |i| e.id == i))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn hash_chain(&self) -> bool {
        self.hash_chain
    }

    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    /// fsync the ledger file (no-op for in-memory ledgers).
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        File::open(path)
            .and_then(|f| f.sync_all())
            .with_context(|| format!("sync audit ledger {:?}", path))
    }

    /// Verify the hash chain of the backing file, or of the in-memory
    /// entries when there is no file yet.
    pub fn verify(&self) -> Result<VerifyResult> {
        if let Some(path) = self.path.as_deref().filter(|p| p.exists()) {
            return verify_hash_chain(path);
        }
        let mut content = String::new();
        for e in &self.entries {
            content.push_str(&canonical_json_line(e)?);
            content.push('\n');
        }
        verify_hash_chain_str(&content)
    }

    fn next_seq(&self) -> u64 {
        self.entries.last().map(|e| e.seq + 1).unwrap_or(0)
    }
}

enum Loaded {
    Missing,
    Lines(Vec<AuditEntry>),
    Legacy(Vec<AuditEntry>),
}

fn load_entries(path: &Path) -> Result<Loaded> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(err) => return Err(err).with_context(|| format!("read audit ledger {:?}", path)),
    };

    if content.trim_start().starts_with('[') {
        let mut entries: Vec<AuditEntry> =
            serde_json::from_str(&content).context("parse legacy audit document")?;
        for (i, e) in entries.iter_mut().enumerate() {
            e.seq = i as u64;
        }
        return Ok(Loaded::Legacy(entries));
    }

    let mut entries = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let e: AuditEntry = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit entry at line {}", i + 1))?;
        entries.push(e);
    }
    Ok(Loaded::Lines(entries))
}

/// Write a single line to file (with trailing newline).
fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit ledger {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

fn rewrite_as_lines(path: &Path, entries: &[AuditEntry]) -> Result<()> {
    let mut out = String::new();
    for e in entries {
        out.push_str(&canonical_json_line(e)?);
        out.push('\n');
    }
    let tmp = path.with_extension("migrating");
    fs::write(&tmp, out).with_context(|| format!("write {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}

fn quarantine(path: &Path) {
    let Some(name) = path.file_name() else {
        return;
    };
    let aside = path.with_file_name(format!(
        "{}.corrupt-{}",
        name.to_string_lossy(),
        Utc::now().timestamp_millis()
    ));
    match fs::rename(path, &aside) {
        Ok(()) => warn!(moved_to = %aside.display(), "unreadable audit ledger moved aside"),
        Err(err) => warn!(error = %err, "could not move unreadable audit ledger aside"),
    }
}
