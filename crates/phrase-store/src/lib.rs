//! Durable phrase tables shared by every report ever produced.
//!
//! One set of normalized phrases per variable report section, two usage
//! counter tables (per exact phrase, per category) keyed by section, and the
//! corpus of accepted report bodies. Each table lives in its own JSON file
//! under the storage directory and is rewritten after every mutation.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

const WORKED_FILE: &str = "worked_well.json";
const FRICTION_FILE: &str = "minor_friction.json";
const IMPROVEMENTS_FILE: &str = "improvements.json";
const PHRASE_USES_FILE: &str = "phrase_uses.json";
const CATEGORY_USES_FILE: &str = "category_uses.json";
const CORPUS_FILE: &str = "report_corpus.json";

/// Report sections whose bullets must stay unique across the corpus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    WorkedWell,
    MinorFriction,
    Improvements,
}

impl Section {
    pub const ALL: [Section; 3] = [
        Section::WorkedWell,
        Section::MinorFriction,
        Section::Improvements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::WorkedWell => "worked_well",
            Section::MinorFriction => "minor_friction",
            Section::Improvements => "improvements",
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Section::WorkedWell => WORKED_FILE,
            Section::MinorFriction => FRICTION_FILE,
            Section::Improvements => IMPROVEMENTS_FILE,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "worked_well" | "worked" => Ok(Section::WorkedWell),
            "minor_friction" | "friction" => Ok(Section::MinorFriction),
            "improvements" | "suggested_improvements" => Ok(Section::Improvements),
            other => Err(format!("unknown section '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("phrase store i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("phrase store table {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One accepted bullet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhraseEntry {
    pub section: Section,
    pub phrase: String,
    pub category: String,
}

/// Everything a finalized report adds to the store, applied as one mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Commit {
    pub entries: Vec<PhraseEntry>,
    pub body: Option<String>,
}

impl Commit {
    pub fn push(&mut self, section: Section, phrase: impl Into<String>, category: impl Into<String>) {
        self.entries.push(PhraseEntry {
            section,
            phrase: phrase.into(),
            category: category.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.body.is_none()
    }
}

type Counters = BTreeMap<Section, BTreeMap<String, u32>>;

#[derive(Default)]
struct StoreMetrics {
    lookups: AtomicU64,
    hits: AtomicU64,
    commits: AtomicU64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreStats {
    pub phrases: BTreeMap<Section, usize>,
    pub bodies: usize,
    pub top_categories: BTreeMap<Section, Vec<(String, u32)>>,
    pub lookups: u64,
    pub hits: u64,
    pub commits: u64,
}

#[derive(Default)]
pub struct PhraseStore {
    sets: BTreeMap<Section, BTreeSet<String>>,
    phrase_uses: Counters,
    category_uses: Counters,
    corpus: Vec<String>,
    storage_dir: Option<PathBuf>,
    metrics: StoreMetrics,
}

impl fmt::Debug for PhraseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhraseStore")
            .field("storage_dir", &self.storage_dir)
            .field("bodies", &self.corpus.len())
            .finish_non_exhaustive()
    }
}

impl PhraseStore {
    /// Volatile store, used by tests and dry runs.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load every table from `dir`, treating missing files as empty tables.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let mut store = Self {
            storage_dir: Some(dir.clone()),
            ..Self::default()
        };

        for section in Section::ALL {
            let phrases: Vec<String> = read_table(&dir.join(section.file_name()))?;
            store.sets.insert(section, phrases.into_iter().collect());
        }
        store.phrase_uses = read_table(&dir.join(PHRASE_USES_FILE))?;
        store.category_uses = read_table(&dir.join(CATEGORY_USES_FILE))?;
        store.corpus = read_table(&dir.join(CORPUS_FILE))?;

        debug!(
            dir = %dir.display(),
            bodies = store.corpus.len(),
            "phrase store loaded"
        );
        Ok(store)
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn contains(&self, section: Section, phrase: &str) -> bool {
        let hit = self
            .sets
            .get(&section)
            .map(|set| set.contains(phrase))
            .unwrap_or(false);
        self.metrics.lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn phrases(&self, section: Section) -> impl Iterator<Item = &str> {
        self.sets
            .get(&section)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn phrase_count(&self, section: Section) -> usize {
        self.sets.get(&section).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn phrase_uses(&self, section: Section, phrase: &str) -> u32 {
        lookup(&self.phrase_uses, section, phrase)
    }

    pub fn category_uses(&self, section: Section, category: &str) -> u32 {
        lookup(&self.category_uses, section, category)
    }

    pub fn bodies(&self) -> &[String] {
        &self.corpus
    }

    /// Apply a finalized report's additions and flush all tables.
    pub fn commit(&mut self, commit: Commit) -> Result<(), StoreError> {
        if commit.is_empty() {
            return Ok(());
        }
        for entry in commit.entries {
            bump(&mut self.phrase_uses, entry.section, &entry.phrase);
            bump(&mut self.category_uses, entry.section, &entry.category);
            self.sets.entry(entry.section).or_default().insert(entry.phrase);
        }
        if let Some(body) = commit.body {
            self.corpus.push(body);
        }
        self.metrics.commits.fetch_add(1, Ordering::Relaxed);
        self.persist()
    }

    /// Record a single phrase; shorthand for a one-entry [`Commit`].
    pub fn record(
        &mut self,
        section: Section,
        phrase: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<(), StoreError> {
        let mut commit = Commit::default();
        commit.push(section, phrase, category);
        self.commit(commit)
    }

    pub fn stats(&self, top: usize) -> StoreStats {
        let phrases = Section::ALL
            .iter()
            .map(|section| (*section, self.phrase_count(*section)))
            .collect();
        let top_categories = Section::ALL
            .iter()
            .map(|section| {
                let mut counts: Vec<(String, u32)> = self
                    .category_uses
                    .get(section)
                    .map(|map| map.iter().map(|(k, v)| (k.clone(), *v)).collect())
                    .unwrap_or_default();
                counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                counts.truncate(top);
                (*section, counts)
            })
            .collect();
        StoreStats {
            phrases,
            bodies: self.corpus.len(),
            top_categories,
            lookups: self.metrics.lookups.load(Ordering::Relaxed),
            hits: self.metrics.hits.load(Ordering::Relaxed),
            commits: self.metrics.commits.load(Ordering::Relaxed),
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(dir) = self.storage_dir.as_ref() else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;

        for section in Section::ALL {
            let phrases: Vec<&String> = self
                .sets
                .get(&section)
                .map(|set| set.iter().collect())
                .unwrap_or_default();
            write_table(&dir.join(section.file_name()), &phrases)?;
        }
        write_table(&dir.join(PHRASE_USES_FILE), &self.phrase_uses)?;
        write_table(&dir.join(CATEGORY_USES_FILE), &self.category_uses)?;
        write_table(&dir.join(CORPUS_FILE), &self.corpus)?;
        Ok(())
    }
}

fn lookup(counters: &Counters, section: Section, key: &str) -> u32 {
    counters
        .get(&section)
        .and_then(|map| map.get(key))
        .copied()
        .unwrap_or(0)
}

fn bump(counters: &mut Counters, section: Section, key: &str) {
    let slot = counters
        .entry(section)
        .or_default()
        .entry(key.to_string())
        .or_insert(0);
    *slot = slot.saturating_add(1);
}

fn read_table<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes = fs::read(path).map_err(|err| StoreError::io(path, err))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_table<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|err| StoreError::io(path, io::Error::new(io::ErrorKind::Other, err)))?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json).map_err(|err| StoreError::io(&staging, err))?;
    fs::rename(&staging, path).map_err(|err| {
        warn!(path = %path.display(), error = %err, "phrase store rename failed");
        StoreError::io(path, err)
    })
}
