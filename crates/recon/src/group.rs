use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ReconError;
use crate::key::{CompositeKey, KeyExtractor, NullKeyPolicy};
use crate::merge::{merge_values, MergeRule, MergeSpec};
use crate::model::{Record, Schema, Table};

/// Records sharing one composite key, by row index in first-seen order.
/// Only built by [`group_by_key`]; a group always holds at least one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    key: CompositeKey,
    rows: Vec<usize>,
}

impl DuplicateGroup {
    fn new(key: CompositeKey, first_row: usize) -> Self {
        Self { key, rows: vec![first_row] }
    }

    pub fn key(&self) -> &CompositeKey {
        &self.key
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// First-seen row of the group; its non-merged columns survive.
    pub fn keeper(&self) -> usize {
        self.rows[0]
    }

    pub fn is_singleton(&self) -> bool {
        self.rows.len() == 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub input_rows: usize,
    pub output_rows: usize,
    pub groups: usize,
    pub merged_groups: usize,
}

/// Group `table` by key in a single pass. Groups come out in the order their
/// key first appeared; a record with a null key part is its own group.
pub fn group_by_key(
    table: &Table,
    extractor: &KeyExtractor,
    policy: NullKeyPolicy,
) -> Result<Vec<DuplicateGroup>, ReconError> {
    let mut positions: HashMap<CompositeKey, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for (row, record) in table.rows().enumerate() {
        let key = match policy {
            NullKeyPolicy::Singleton => extractor.extract(record),
            NullKeyPolicy::Error => extractor.extract_complete(record, row)?,
        };
        if !key.is_complete() {
            groups.push(DuplicateGroup::new(key, row));
            continue;
        }
        match positions.get(&key) {
            Some(&pos) => groups[pos].rows.push(row),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup::new(key, row));
            }
        }
    }

    Ok(groups)
}

/// Collapses each key group of a table into a single keeper record.
#[derive(Debug, Clone)]
pub struct Reconciler {
    key_columns: Vec<String>,
    merge_spec: MergeSpec,
    sort_columns: Option<Vec<String>>,
    null_keys: NullKeyPolicy,
}

impl Reconciler {
    pub fn new<S: AsRef<str>>(key_columns: &[S], merge_spec: MergeSpec) -> Self {
        Self {
            key_columns: key_columns.iter().map(|c| c.as_ref().to_string()).collect(),
            merge_spec,
            sort_columns: None,
            null_keys: NullKeyPolicy::default(),
        }
    }

    pub fn sort_by<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.sort_columns = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn null_keys(mut self, policy: NullKeyPolicy) -> Self {
        self.null_keys = policy;
        self
    }

    pub fn run(&self, table: &Table) -> Result<Table, ReconError> {
        self.run_with_stats(table).map(|(t, _)| t)
    }

    pub fn run_with_stats(&self, table: &Table) -> Result<(Table, ReconcileStats), ReconError> {
        let schema = table.schema();
        let extractor = KeyExtractor::new(schema, self.key_columns.as_slice())?;
        let rules = self.merge_spec.resolve(schema, extractor.indices())?;
        if let Some(ref sort) = self.sort_columns {
            for column in sort {
                schema.require(column, "sort column")?;
            }
        }

        let groups = group_by_key(table, &extractor, self.null_keys)?;
        let rows: Vec<&Record> = table.rows().collect();
        let mut merged_groups = 0;
        let keepers: Vec<Record> = groups
            .iter()
            .map(|group| {
                if group.is_singleton() {
                    return rows[group.keeper()].clone();
                }
                merged_groups += 1;
                let members: Vec<&Record> = group.rows.iter().map(|&i| rows[i]).collect();
                keeper_record(table.schema_arc(), &members, &rules)
            })
            .collect();

        log::debug!(
            "reconcile on [{}]: {} rows -> {} groups ({} merged)",
            self.key_columns.join(", "),
            table.len(),
            groups.len(),
            merged_groups
        );

        let stats = ReconcileStats {
            input_rows: table.len(),
            output_rows: keepers.len(),
            groups: groups.len(),
            merged_groups,
        };
        let output = Table::from_parts(Arc::clone(table.schema_arc()), keepers);
        let output = match self.sort_columns {
            Some(ref sort) => output.sort_by(sort.as_slice())?,
            None => output,
        };
        Ok((output, stats))
    }
}

fn keeper_record(schema: &Arc<Schema>, members: &[&Record], rules: &[MergeRule]) -> Record {
    Record::from_parts(Arc::clone(schema), merge_values(members, rules))
}

/// Merge every duplicate-key group of `table` into its first record.
///
/// Output order follows first appearance of each key unless `sort_columns`
/// is given, in which case rows are stably sorted ascending by them.
pub fn reconcile<S: AsRef<str>>(
    table: &Table,
    key_columns: &[S],
    merge_spec: &MergeSpec,
    sort_columns: Option<&[S]>,
) -> Result<Table, ReconError> {
    let mut reconciler = Reconciler::new(key_columns, merge_spec.clone());
    if let Some(sort) = sort_columns {
        reconciler = reconciler.sort_by(sort);
    }
    reconciler.run(table)
}
