use indexmap::IndexMap;

use crate::model::{CanonicalId, Key, MasterAttribute, MasterTable, SourceColumnRef, SourceTable};

/// A [`SourceTable`] with its 1-based `table_id` assigned (spec §3.1:
/// "Assigned an ordinal `table_id ≥ 1` at compile time in declaration order").
#[derive(Debug, Clone)]
pub struct CompiledSourceTable {
    pub table_id: u32,
    pub inner: SourceTable,
}

impl std::ops::Deref for CompiledSourceTable {
    type Target = SourceTable;

    fn deref(&self) -> &SourceTable {
        &self.inner
    }
}

/// A fully-resolved [`CanonicalId`] with the `canonical_ids[0]` default
/// applied and `key_priorities` defaulted to `[1, 2, .., |merge_keys|]`
/// (spec §4.3.3).
#[derive(Debug, Clone)]
pub struct CompiledCanonicalId {
    pub name: String,
    pub merge_by_keys: Vec<String>,
    pub merge_iterations: Option<u32>,
    pub key_priorities: Vec<u32>,
}

/// A [`SourceColumnRef`] with `priority`/`order_by` defaults applied
/// (SPEC_FULL §5.1: `priority` defaults to the column's 1-based position,
/// `order_by` defaults to `"time"`, recovered from `original_source`'s
/// `enumerate(source_columns, 1)` fallback).
#[derive(Debug, Clone)]
pub struct CompiledSourceColumnRef {
    pub table: String,
    pub column: String,
    pub priority: u32,
    pub order_by: String,
}

#[derive(Debug, Clone)]
pub struct CompiledMasterAttribute {
    pub name: String,
    pub source_columns: Vec<CompiledSourceColumnRef>,
    pub array_elements: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CompiledMasterTable {
    pub name: String,
    pub canonical_id: String,
    pub attributes: Vec<CompiledMasterAttribute>,
}

/// `Config` after `validate` + ordinal/namespace assignment (spec §4.1,
/// SPEC_FULL §5.1). This is the only input the plan compiler accepts.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub keys: Vec<Key>,
    pub tables: Vec<CompiledSourceTable>,
    pub canonical_id: CompiledCanonicalId,
    pub master_tables: Vec<CompiledMasterTable>,
    /// `merge_by_keys[i] -> ns` where `ns = i + 1`, spec §3.1.
    pub merge_key_ns: IndexMap<String, u32>,
}

impl CompiledConfig {
    pub fn key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn table(&self, table: &str) -> Option<&CompiledSourceTable> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn ns_of(&self, key_name: &str) -> Option<u32> {
        self.merge_key_ns.get(key_name).copied()
    }

    pub fn priority_of(&self, ns: u32) -> u32 {
        self.canonical_id
            .key_priorities
            .get((ns - 1) as usize)
            .copied()
            .unwrap_or(ns)
    }
}

pub(crate) fn compile_canonical_id(raw: &CanonicalId) -> CompiledCanonicalId {
    let merge_by_keys = raw.merge_by_keys.clone();
    let key_priorities = raw
        .key_priorities
        .clone()
        .unwrap_or_else(|| (1..=merge_by_keys.len() as u32).collect());
    CompiledCanonicalId {
        name: raw.name.clone(),
        merge_by_keys,
        merge_iterations: raw.merge_iterations,
        key_priorities,
    }
}

pub(crate) fn compile_source_column(raw: &SourceColumnRef, position: usize) -> CompiledSourceColumnRef {
    CompiledSourceColumnRef {
        table: raw.table.clone(),
        column: raw.column.clone(),
        priority: raw.priority.unwrap_or(position as u32 + 1),
        order_by: raw.order_by.clone().unwrap_or_else(|| "time".to_string()),
    }
}

pub(crate) fn compile_master_attribute(raw: &MasterAttribute) -> CompiledMasterAttribute {
    CompiledMasterAttribute {
        name: raw.name.clone(),
        source_columns: raw
            .source_columns
            .iter()
            .enumerate()
            .map(|(i, sc)| compile_source_column(sc, i))
            .collect(),
        array_elements: raw.array_elements,
    }
}

pub(crate) fn compile_master_table(raw: &MasterTable) -> CompiledMasterTable {
    CompiledMasterTable {
        name: raw.name.clone(),
        canonical_id: raw.canonical_id.clone(),
        attributes: raw.attributes.iter().map(compile_master_attribute).collect(),
    }
}
