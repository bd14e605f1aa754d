//! In-process store with the same integrity rules as the PostgreSQL schema: monotonic ids,
//! VARCHAR bounds, foreign keys on link rows, unique link pairs and cascading deletes.
//! The lock is never held across an `.await`.

use super::{Record, RowChange, Store, UpdateOutcome, Values};
use crate::bootstrap::{Seed, SeedReport};
use crate::config::{ColumnInfo, ResolvedEntity, ResolvedLink, ResolvedModel, ResolvedRelation};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, MemTable>,
    links: HashMap<String, MemLink>,
}

struct MemTable {
    next_id: i64,
    columns: Vec<ColumnInfo>,
    rows: BTreeMap<i64, Values>,
}

struct MemLink {
    link: ResolvedLink,
    /// (left id, right id) in declaration order.
    pairs: BTreeSet<(i64, i64)>,
}

impl MemTable {
    fn new(columns: Vec<ColumnInfo>) -> Self {
        MemTable {
            next_id: 1,
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Check values against column bounds; `partial` skips columns not present.
    fn check(&self, values: &Values, partial: bool) -> Result<Values, AppError> {
        let mut out = Values::new();
        for c in &self.columns {
            let v = match values.get(&c.name) {
                Some(v) => v.clone(),
                None if partial => continue,
                None => None,
            };
            match (&v, c.max_length) {
                (None, _) if !c.nullable => {
                    return Err(AppError::Validation(format!("{} must not be null", c.name)));
                }
                (Some(s), Some(max)) if s.chars().count() > max as usize => {
                    return Err(AppError::Validation("value too long for column".into()));
                }
                _ => {}
            }
            out.insert(c.name.clone(), v);
        }
        Ok(out)
    }

    fn insert(&mut self, values: &Values) -> Result<i64, AppError> {
        let row = self.check(values, false)?;
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row);
        Ok(id)
    }

    fn record(&self, id: i64) -> Option<Record> {
        self.rows.get(&id).map(|fields| Record {
            id,
            fields: fields.clone(),
        })
    }
}

impl MemLink {
    /// Orient (self, other) ids to the stored (left, right) order.
    fn pair(&self, relation: &ResolvedRelation, self_id: i64, other_id: i64) -> (i64, i64) {
        if relation.self_fk == self.link.left.1 {
            (self_id, other_id)
        } else {
            (other_id, self_id)
        }
    }

    /// Ids on the other side of every pair whose `relation` side equals `id`.
    fn others(&self, relation: &ResolvedRelation, id: i64) -> Vec<i64> {
        let self_is_left = relation.self_fk == self.link.left.1;
        self.pairs
            .iter()
            .filter_map(|&(l, r)| match self_is_left {
                true if l == id => Some(r),
                false if r == id => Some(l),
                _ => None,
            })
            .collect()
    }
}

impl MemoryState {
    fn table(&self, name: &str) -> Result<&MemTable, AppError> {
        self.tables
            .get(name)
            .ok_or_else(|| AppError::Internal(format!("relation \"{}\" does not exist", name)))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemTable, AppError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| AppError::Internal(format!("relation \"{}\" does not exist", name)))
    }

    fn link(&self, name: &str) -> Result<&MemLink, AppError> {
        self.links
            .get(name)
            .ok_or_else(|| AppError::Internal(format!("relation \"{}\" does not exist", name)))
    }

    fn insert_pair(&mut self, link_table: &str, left: i64, right: i64) -> Result<bool, AppError> {
        let link = self.link(link_table)?;
        let (left_table, right_table) = (link.link.left.0.clone(), link.link.right.0.clone());
        for (table, id) in [(&left_table, left), (&right_table, right)] {
            if !self.table(table)?.rows.contains_key(&id) {
                return Err(AppError::Referential(format!(
                    "insert on {} violates foreign key: {} {} does not exist",
                    link_table, table, id
                )));
            }
        }
        let link = self
            .links
            .get_mut(link_table)
            .ok_or_else(|| AppError::Internal(format!("relation \"{}\" does not exist", link_table)))?;
        Ok(link.pairs.insert((left, right)))
    }

    fn upsert(&mut self, relation: &ResolvedRelation, self_id: i64, other_id: i64) -> Result<bool, AppError> {
        let (left, right) = self.link(&relation.link_table)?.pair(relation, self_id, other_id);
        self.insert_pair(&relation.link_table, left, right)
    }

    /// Apply each link's ON DELETE action for a removed row.
    fn cascade_delete(&mut self, table: &str, id: i64) -> Result<(), AppError> {
        for link in self.links.values() {
            let referenced = link.pairs.iter().any(|&(l, r)| {
                (link.link.left.0 == table && l == id) || (link.link.right.0 == table && r == id)
            });
            if referenced && link.link.on_delete != "CASCADE" {
                return Err(AppError::Referential(format!(
                    "delete on {} violates foreign key on {}",
                    table, link.link.table
                )));
            }
        }
        for link in self.links.values_mut() {
            let (left_table, right_table) = (&link.link.left.0, &link.link.right.0);
            link.pairs
                .retain(|&(l, r)| !((left_table == table && l == id) || (right_table == table && r == id)));
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, AppError> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, AppError> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }

    async fn reset(&self, model: &ResolvedModel, seed: &Seed) -> Result<SeedReport, AppError> {
        let mut next = MemoryState::default();
        for entity in &model.entities {
            next.tables
                .insert(entity.table_name.clone(), MemTable::new(entity.columns.clone()));
        }
        for link in &model.links {
            next.links.insert(
                link.table.clone(),
                MemLink {
                    link: link.clone(),
                    pairs: BTreeSet::new(),
                },
            );
        }

        let mut report = SeedReport::default();
        for entity in &model.entities {
            let table = next.table_mut(&entity.table_name)?;
            for values in seed.rows(&entity.table_name) {
                table.insert(values)?;
                report.rows += 1;
            }
        }
        for link in &model.links {
            for (left, right) in seed.pairs(link)? {
                if !next.insert_pair(&link.table, left, right)? {
                    return Err(AppError::Validation(format!("duplicate seed link in {}", link.table)));
                }
                report.links += 1;
            }
        }

        *self.write()? = next;
        Ok(report)
    }

    async fn insert(&self, entity: &ResolvedEntity, values: &Values) -> Result<i64, AppError> {
        self.write()?.table_mut(&entity.table_name)?.insert(values)
    }

    async fn fetch_one(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Record>, AppError> {
        Ok(self.read()?.table(&entity.table_name)?.record(id))
    }

    async fn fetch_all(&self, entity: &ResolvedEntity) -> Result<Vec<Record>, AppError> {
        let state = self.read()?;
        let table = state.table(&entity.table_name)?;
        Ok(table.rows.keys().filter_map(|&id| table.record(id)).collect())
    }

    async fn update(&self, entity: &ResolvedEntity, id: i64, change: &RowChange) -> Result<UpdateOutcome, AppError> {
        let mut state = self.write()?;
        let mut outcome = UpdateOutcome::default();

        // Validate everything before mutating so a failure applies nothing.
        let table = state.table(&entity.table_name)?;
        let exists = table.rows.contains_key(&id);
        let set = table.check(&change.values, true)?;
        if !set.is_empty() && !exists {
            return Err(AppError::NotFound(format!("{} {}", entity.table_name, id)));
        }
        let relation = entity.relation.as_ref().filter(|_| change.link_to.is_some());
        if let (Some(relation), Some(other_id)) = (relation, change.link_to) {
            let other_exists = state.table(&relation.other_table)?.rows.contains_key(&other_id);
            if !exists || !other_exists {
                return Err(AppError::Referential(format!(
                    "insert on {} violates foreign key",
                    relation.link_table
                )));
            }
        }

        if !set.is_empty() {
            let row = state
                .table_mut(&entity.table_name)?
                .rows
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.table_name, id)))?;
            row.extend(set);
            outcome.updated = true;
        }
        if let (Some(relation), Some(other_id)) = (relation, change.link_to) {
            outcome.linked = Some(state.upsert(relation, id, other_id)?);
        }
        Ok(outcome)
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let mut state = self.write()?;
        if !state.table(&entity.table_name)?.rows.contains_key(&id) {
            return Ok(false);
        }
        state.cascade_delete(&entity.table_name, id)?;
        state.table_mut(&entity.table_name)?.rows.remove(&id);
        Ok(true)
    }

    async fn link(&self, relation: &ResolvedRelation, self_id: i64, other_id: i64) -> Result<bool, AppError> {
        self.write()?.upsert(relation, self_id, other_id)
    }

    async fn count_related(&self, relation: &ResolvedRelation, id: i64) -> Result<i64, AppError> {
        let state = self.read()?;
        Ok(state.link(&relation.link_table)?.others(relation, id).len() as i64)
    }

    async fn list_related(&self, relation: &ResolvedRelation, id: i64) -> Result<Vec<Record>, AppError> {
        let state = self.read()?;
        let others = state.table(&relation.other_table)?;
        let mut ids = state.link(&relation.link_table)?.others(relation, id);
        ids.sort_unstable();
        Ok(ids.into_iter().filter_map(|other| others.record(other)).collect())
    }
}
