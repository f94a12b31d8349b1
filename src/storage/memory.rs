//! In-memory session
//!
//! Keeps records per entity name in insertion order and optionally mirrors
//! them to a JSON snapshot file. Serves as the reference `Session` and
//! `SearchSession` for the repository layer.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::eval::{sort_records, text_of, tokenize, values_at, Filter};
use super::hql::{self, Statement};
use super::session::{SearchSession, Session, SessionContext};
use crate::config::StorageSettings;
use crate::error::{RepoError, RepoResult};
use crate::models::Paging;
use crate::query::{CountQuery, Criteria, Restriction};
use crate::search::{Analyze, SearchQuery, SortType};

/// Serializable store contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    /// entity name -> id -> record
    tables: BTreeMap<String, IndexMap<String, Value>>,
    /// Entity names whose full-text index exists
    #[serde(default)]
    indexed: BTreeSet<String>,
}

impl StoreData {
    fn rows(&self, entity: &str) -> impl Iterator<Item = &Value> {
        self.tables.get(entity).into_iter().flat_map(|table| table.values())
    }

    fn filtered(&self, entity: &str, restrictions: &[Restriction]) -> RepoResult<Vec<Value>> {
        let filter = Filter::new(restrictions)?;
        Ok(self
            .rows(entity)
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }

    /// Load a snapshot file; a file that does not exist yet is an empty store
    fn load(path: &Path) -> RepoResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(snapshot_error("read", path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| snapshot_error("parse", path, e))
    }

    /// Replace a snapshot file through a staging file in the same directory
    fn save(&self, path: &Path) -> RepoResult<()> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| snapshot_error("encode", path, e))?;

        let staging = path.with_extension("staging");
        let mut file = File::create(&staging).map_err(|e| snapshot_error("stage", path, e))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| snapshot_error("stage", path, e))?;

        fs::rename(&staging, path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            snapshot_error("replace", path, e)
        })
    }

    fn write(&mut self, entity: &str, id: &str, record: Value) {
        self.indexed.insert(entity.to_string());
        self.tables
            .entry(entity.to_string())
            .or_default()
            .insert(id.to_string(), record);
    }
}

fn snapshot_error(action: &str, path: &Path, err: impl Display) -> RepoError {
    RepoError::Storage(format!(
        "Could not {} store snapshot {}: {}",
        action,
        path.display(),
        err
    ))
}

fn window(rows: Vec<Value>, paging: Option<Paging>) -> Vec<Value> {
    match paging {
        Some(paging) => rows
            .into_iter()
            .skip(paging.first_result)
            .take(paging.max_results)
            .collect(),
        None => rows,
    }
}

/// In-memory store acting as one long-lived unit of work
pub struct MemorySession {
    data: RwLock<StoreData>,
    snapshot_file: Option<PathBuf>,
    flush_on_write: bool,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    /// Create an empty session with no snapshot file
    pub fn new() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            snapshot_file: None,
            flush_on_write: false,
        }
    }

    /// Open a session, loading the snapshot file if one is configured
    pub fn open(settings: &StorageSettings) -> RepoResult<Self> {
        let data = match &settings.snapshot_file {
            Some(path) => {
                let data = StoreData::load(path)?;
                debug!(path = %path.display(), tables = data.tables.len(), "loaded store snapshot");
                data
            }
            None => StoreData::default(),
        };

        Ok(Self {
            data: RwLock::new(data),
            snapshot_file: settings.snapshot_file.clone(),
            flush_on_write: settings.flush_on_write,
        })
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, StoreData>> {
        self.data.read().map_err(|e| RepoError::lock("read", e))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, StoreData>> {
        self.data.write().map_err(|e| RepoError::lock("write", e))
    }

    /// Save the store to its snapshot file, if it has one
    pub fn flush(&self) -> RepoResult<()> {
        let Some(path) = &self.snapshot_file else {
            return Ok(());
        };
        self.read()?.save(path)?;
        debug!(path = %path.display(), "flushed store snapshot");
        Ok(())
    }

    fn after_write(&self) -> RepoResult<()> {
        if self.flush_on_write {
            self.flush()?;
        }
        Ok(())
    }

    /// Number of stored rows for an entity name
    pub fn row_count(&self, entity: &str) -> RepoResult<usize> {
        Ok(self.read()?.tables.get(entity).map_or(0, IndexMap::len))
    }

    /// Check if the full-text index of an entity exists
    pub fn is_indexed(&self, entity: &str) -> RepoResult<bool> {
        Ok(self.read()?.indexed.contains(entity))
    }

    fn search_rows(&self, query: &SearchQuery) -> RepoResult<Vec<Value>> {
        let data = self.read()?;
        if !data.indexed.contains(query.entity) {
            return Err(RepoError::IndexNotReady {
                entity_type: query.entity.to_string(),
            });
        }

        let keyword_tokens = query.keyword.as_deref().map(tokenize);
        let mut rows: Vec<Value> = data
            .rows(query.entity)
            .filter(|row| search_matches(row, query, keyword_tokens.as_deref()))
            .cloned()
            .collect();

        if !query.sorts.is_empty() {
            rows.sort_by(|a, b| {
                for sort in &query.sorts {
                    let ordering = compare_sort_keys(a, b, &sort.name, sort.sort_type);
                    let ordering = if sort.reverse {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        Ok(rows)
    }
}

fn keyword_matches(row: &Value, name: &str, analyze: Analyze, keyword: &str, tokens: &[String]) -> bool {
    let values = values_at(row, name);
    match analyze {
        Analyze::No => false,
        Analyze::NotAnalyzed => values
            .iter()
            .filter_map(|v| text_of(v))
            .any(|text| text == keyword),
        Analyze::Analyzed => {
            let field_tokens: BTreeSet<String> = values
                .iter()
                .filter_map(|v| text_of(v))
                .flat_map(|text| tokenize(&text))
                .collect();
            !tokens.is_empty() && tokens.iter().all(|t| field_tokens.contains(t))
        }
    }
}

fn search_matches(row: &Value, query: &SearchQuery, keyword_tokens: Option<&[String]>) -> bool {
    if let (Some(keyword), Some(tokens)) = (query.keyword.as_deref(), keyword_tokens) {
        let hit = query
            .fields
            .iter()
            .any(|(name, analyze)| keyword_matches(row, name, *analyze, keyword, tokens));
        if !hit {
            return false;
        }
    }

    let filters_hold = query.filters.iter().all(|filter| {
        let expected = text_of(&filter.value);
        values_at(row, &filter.name)
            .iter()
            .any(|v| expected.is_some() && text_of(v) == expected)
    });

    let ranges_hold = query.ranges.iter().all(|range| {
        values_at(row, &range.name).iter().any(|v| match v.as_f64() {
            Some(n) => range.min.map_or(true, |min| n >= min) && range.max.map_or(true, |max| n <= max),
            None => false,
        })
    });

    filters_hold && ranges_hold
}

fn compare_sort_keys(a: &Value, b: &Value, name: &str, sort_type: SortType) -> Ordering {
    let left = values_at(a, name).into_iter().next();
    let right = values_at(b, name).into_iter().next();
    if sort_type.is_numeric() {
        let left = left.and_then(Value::as_f64);
        let right = right.and_then(Value::as_f64);
        left.partial_cmp(&right).unwrap_or(Ordering::Equal)
    } else {
        left.and_then(text_of).cmp(&right.and_then(text_of))
    }
}

impl Session for MemorySession {
    fn get(&self, entity: &'static str, id: &str) -> RepoResult<Option<Value>> {
        let data = self.read()?;
        Ok(data.tables.get(entity).and_then(|table| table.get(id)).cloned())
    }

    fn insert(&self, entity: &'static str, id: &str, record: Value) -> RepoResult<()> {
        {
            let mut data = self.write()?;
            let exists = data
                .tables
                .get(entity)
                .is_some_and(|table| table.contains_key(id));
            if exists {
                return Err(RepoError::duplicate(entity, id));
            }
            data.write(entity, id, record);
        }
        self.after_write()
    }

    fn update(&self, entity: &'static str, id: &str, record: Value) -> RepoResult<()> {
        {
            let mut data = self.write()?;
            let exists = data
                .tables
                .get(entity)
                .is_some_and(|table| table.contains_key(id));
            if !exists {
                return Err(RepoError::not_found(entity, id));
            }
            data.write(entity, id, record);
        }
        self.after_write()
    }

    fn upsert(&self, entity: &'static str, id: &str, record: Value) -> RepoResult<()> {
        self.write()?.write(entity, id, record);
        self.after_write()
    }

    fn delete(&self, entity: &'static str, id: &str) -> RepoResult<bool> {
        let removed = {
            let mut data = self.write()?;
            data.tables
                .get_mut(entity)
                .and_then(|table| table.shift_remove(id))
                .is_some()
        };
        if removed {
            self.after_write()?;
        }
        Ok(removed)
    }

    fn list(&self, criteria: &Criteria, paging: Option<Paging>) -> RepoResult<Vec<Value>> {
        let mut rows = self.read()?.filtered(criteria.entity(), criteria.restrictions())?;
        sort_records(&mut rows, criteria.orders());
        Ok(window(rows, paging))
    }

    fn unique(&self, criteria: &Criteria) -> RepoResult<Option<Value>> {
        let mut rows = self.read()?.filtered(criteria.entity(), criteria.restrictions())?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(RepoError::NonUniqueResult { count }),
        }
    }

    fn count(&self, query: &CountQuery) -> RepoResult<usize> {
        let filter = Filter::new(&query.restrictions)?;
        let data = self.read()?;
        Ok(data.rows(query.entity).filter(|row| filter.matches(row)).count())
    }

    fn query(&self, query: &str, params: &[Value], paging: Option<Paging>) -> RepoResult<Vec<Value>> {
        match hql::parse(query, params)? {
            Statement::Select {
                entity,
                count: false,
                restrictions,
                orders,
            } => {
                let mut rows = self.read()?.filtered(&entity, &restrictions)?;
                sort_records(&mut rows, &orders);
                Ok(window(rows, paging))
            }
            Statement::Select {
                entity,
                count: true,
                restrictions,
                ..
            } => {
                let count = self.read()?.filtered(&entity, &restrictions)?.len();
                Ok(vec![Value::from(count)])
            }
            Statement::Delete { .. } => Err(RepoError::Query(format!(
                "Use execute_update for statements: {}",
                query
            ))),
        }
    }

    fn query_count(&self, query: &str, params: &[Value]) -> RepoResult<usize> {
        match hql::parse(query, params)? {
            Statement::Select {
                entity,
                count: true,
                restrictions,
                ..
            } => Ok(self.read()?.filtered(&entity, &restrictions)?.len()),
            _ => Err(RepoError::Query(format!("Not a count query: {}", query))),
        }
    }

    fn execute_update(&self, statement: &str, params: &[Value]) -> RepoResult<usize> {
        let Statement::Delete {
            entity,
            restrictions,
        } = hql::parse(statement, params)?
        else {
            return Err(RepoError::Query(format!(
                "Not an update statement: {}",
                statement
            )));
        };

        let filter = Filter::new(&restrictions)?;
        let removed = {
            let mut data = self.write()?;
            let Some(table) = data.tables.get_mut(&entity) else {
                return Ok(0);
            };
            let before = table.len();
            table.retain(|_, row| !filter.matches(row));
            before - table.len()
        };

        debug!(entity = %entity, removed, "executed bulk delete");
        if removed > 0 {
            self.after_write()?;
        }
        Ok(removed)
    }
}

impl SearchSession for MemorySession {
    fn result_size(&self, query: &SearchQuery) -> RepoResult<usize> {
        Ok(self.search_rows(query)?.len())
    }

    fn search(&self, query: &SearchQuery, paging: Option<Paging>) -> RepoResult<Vec<Value>> {
        Ok(window(self.search_rows(query)?, paging))
    }
}

/// Session context handing out one shared `MemorySession`
#[derive(Clone)]
pub struct MemoryContext {
    session: Arc<MemorySession>,
}

impl MemoryContext {
    pub fn new(session: Arc<MemorySession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<MemorySession> {
        &self.session
    }
}

impl SessionContext for MemoryContext {
    fn current_session(&self) -> Arc<dyn Session> {
        self.session.clone()
    }

    fn current_full_text_session(&self) -> Arc<dyn SearchSession> {
        self.session.clone()
    }
}
