// 🔗 Merge Engine - one entity per canonical name
//
// Conflict policy per column family:
// - RegistrySource_* → OR (listed in any registry)
// - Collects*        → MAX with missing as 0 (any "yes" wins)
// - everything else  → first non-missing value in input order

use crate::cleaner::{BrokerSchema, BrokerTable, NAME_COLUMN};
use crate::normalize::normalize_name;
use crate::table::{format_number, Table};
use std::collections::BTreeMap;
use tracing::info;

// ============================================================================
// MERGED ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntity {
    /// Canonical name (merge key)
    pub name: String,

    pub sources: Vec<bool>,

    /// Never missing after the merge
    pub collects: Vec<f64>,

    pub passthrough: Vec<Option<String>>,

    /// Number of registry rows folded into this entity
    pub member_count: usize,
}

impl MergedEntity {
    fn from_first(name: String, sources: &[bool], collects: &[Option<f64>], passthrough: &[Option<String>]) -> Self {
        MergedEntity {
            name,
            sources: sources.to_vec(),
            collects: collects.iter().map(|v| v.unwrap_or(0.0)).collect(),
            passthrough: passthrough.to_vec(),
            member_count: 1,
        }
    }

    fn absorb(&mut self, sources: &[bool], collects: &[Option<f64>], passthrough: &[Option<String>]) {
        for (merged, flag) in self.sources.iter_mut().zip(sources) {
            *merged = *merged || *flag;
        }

        for (merged, value) in self.collects.iter_mut().zip(collects) {
            *merged = merged.max(value.unwrap_or(0.0));
        }

        for (merged, value) in self.passthrough.iter_mut().zip(passthrough) {
            if merged.is_none() {
                *merged = value.clone();
            }
        }

        self.member_count += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub schema: BrokerSchema,
    pub entities: Vec<MergedEntity>,
}

impl MergedTable {
    pub fn empty() -> Self {
        MergedTable::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// True once a registry was actually read: every cleaned table has at
    /// least one `Collects*` column, the read-failure result has none.
    pub fn has_schema(&self) -> bool {
        !self.schema.collects_columns.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&MergedEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Merged value of a `Collects*` column for one entity
    pub fn collects_value(&self, entity: &MergedEntity, column: &str) -> Option<f64> {
        self.schema
            .collects_index(column)
            .and_then(|i| entity.collects.get(i).copied())
    }

    /// Merged flag of a registry source for one entity
    pub fn source_flag(&self, entity: &MergedEntity, source: &str) -> Option<bool> {
        self.schema
            .registry_sources
            .iter()
            .position(|s| s == source)
            .and_then(|i| entity.sources.get(i).copied())
    }

    /// Output layout: Name, RegistrySource_*, Collects*, then passthrough
    /// columns sorted by name.
    pub fn to_table(&self) -> Table {
        let mut passthrough_order: Vec<usize> = (0..self.schema.passthrough_columns.len()).collect();
        passthrough_order.sort_by(|&a, &b| {
            self.schema.passthrough_columns[a].cmp(&self.schema.passthrough_columns[b])
        });

        let mut headers = vec![NAME_COLUMN.to_string()];
        headers.extend(self.schema.source_columns());
        headers.extend(self.schema.collects_columns.iter().cloned());
        headers.extend(
            passthrough_order
                .iter()
                .map(|&i| self.schema.passthrough_columns[i].clone()),
        );

        let mut table = Table::new(headers);
        for entity in &self.entities {
            let mut row = vec![Some(entity.name.clone())];
            row.extend(
                entity
                    .sources
                    .iter()
                    .map(|&flag| Some(if flag { "True" } else { "False" }.to_string())),
            );
            row.extend(entity.collects.iter().map(|&v| Some(format_number(v))));
            row.extend(passthrough_order.iter().map(|&i| entity.passthrough[i].clone()));
            table.push_row(row);
        }

        table
    }
}

// ============================================================================
// MERGE
// ============================================================================

/// Normalize names and fold every group of rows sharing a canonical name
/// into one entity. Output is ordered by canonical name.
pub fn merge_by_normalized_name(table: BrokerTable) -> MergedTable {
    let input_rows = table.records.len();
    let mut groups: BTreeMap<String, MergedEntity> = BTreeMap::new();

    for record in &table.records {
        let key = normalize_name(record.name.as_deref());

        match groups.get_mut(&key) {
            Some(entity) => entity.absorb(&record.sources, &record.collects, &record.passthrough),
            None => {
                let entity = MergedEntity::from_first(
                    key.clone(),
                    &record.sources,
                    &record.collects,
                    &record.passthrough,
                );
                groups.insert(key, entity);
            }
        }
    }

    let entities: Vec<MergedEntity> = groups.into_values().collect();
    info!(
        "Merged {} registry rows into {} entities",
        input_rows,
        entities.len()
    );

    MergedTable {
        schema: table.schema,
        entities,
    }
}

// ============================================================================
// TESTS
// ============================================================================
