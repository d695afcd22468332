//! Dremel record shredding and materialization.
//!
//! Shredding converts a nested record into one flat stream of
//! (value, repetition level, definition level) tuples per leaf column.
//! Materialization reassembles the original nesting from those streams.

use indexmap::IndexMap;
use quarry_error::{QuarryError, Result};

use crate::schema::{FieldKind, Schema, SchemaField};
use crate::types::Repetition;
use crate::value::{self, Value};

/// Flat Dremel representation of one leaf column.
///
/// `rlevels` and `dlevels` carry one entry per logical occurrence, present
/// or absent; `values` holds present values only. An occurrence is present
/// when its definition level equals the leaf's `d_level_max`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStream {
    pub values: Vec<Value>,
    pub rlevels: Vec<u32>,
    pub dlevels: Vec<u32>,
    pub count: usize,
}

impl ColumnStream {
    fn append(&mut self, other: ColumnStream) {
        self.values.extend(other.values);
        self.rlevels.extend(other.rlevels);
        self.dlevels.extend(other.dlevels);
        self.count += other.count;
    }
}

/// Accumulates shredded records, one stream per leaf column keyed by path.
///
/// The same buffer may be reused across many records to accumulate a row
/// group.
#[derive(Debug, Clone, Default)]
pub struct RecordBuffer {
    pub column_data: IndexMap<Vec<String>, ColumnStream>,
    pub row_count: usize,
}

impl RecordBuffer {
    pub fn new(schema: &Schema) -> Self {
        let column_data = schema
            .leaves()
            .into_iter()
            .map(|leaf| (leaf.path.clone(), ColumnStream::default()))
            .collect();
        RecordBuffer {
            column_data,
            row_count: 0,
        }
    }
}

/// Shred a record into per-column value/level streams.
///
/// The record is shredded into scratch streams first and merged into the
/// buffer only on success, so a schema violation leaves previously
/// accumulated rows valid.
pub fn shred_record(schema: &Schema, record: &Value, buffer: &mut RecordBuffer) -> Result<()> {
    let fields = match record {
        Value::Record(fields) => fields,
        other => {
            return Err(QuarryError::new(format!(
                "Cannot shred {} value, expected a record",
                other.type_name()
            )))
        }
    };

    let mut shredded = RecordBuffer::new(schema);
    shred_fields(schema.fields(), Some(fields), &mut shredded, 0, 0)?;

    buffer.row_count += 1;
    for (path, stream) in shredded.column_data {
        buffer
            .column_data
            .entry(path)
            .or_default()
            .append(stream);
    }
    Ok(())
}

fn shred_fields(
    fields: &IndexMap<String, SchemaField>,
    record: Option<&IndexMap<String, Value>>,
    data: &mut RecordBuffer,
    rlvl: u32,
    dlvl: u32,
) -> Result<()> {
    for (name, field) in fields {
        let raw = record.and_then(|r| r.get(name));
        let occurrences: &[Value] = match raw {
            None | Some(Value::Null) => &[],
            Some(Value::List(items)) => items.as_slice(),
            Some(single) => std::slice::from_ref(single),
        };

        if occurrences.is_empty() {
            if record.is_some() && field.repetition == Repetition::Required {
                return Err(QuarryError::new(format!(
                    "Missing required field: {}",
                    field.path.join(".")
                )));
            }

            // Absence propagates through arbitrarily deep nesting: every
            // descendant leaf still records one level pair.
            match &field.kind {
                FieldKind::Group { children } => {
                    shred_fields(children, None, data, rlvl, dlvl)?;
                }
                FieldKind::Leaf(_) => {
                    let stream = data.column_data.entry(field.path.clone()).or_default();
                    stream.rlevels.push(rlvl);
                    stream.dlevels.push(dlvl);
                    stream.count += 1;
                }
            }
            continue;
        }

        if occurrences.len() > 1 && field.repetition != Repetition::Repeated {
            return Err(QuarryError::new(format!(
                "Too many values for field: {}",
                field.path.join(".")
            )));
        }

        for (idx, occurrence) in occurrences.iter().enumerate() {
            // A new element within a repeated group restarts repetition at
            // that group's level.
            let rlvl_occ = if idx == 0 { rlvl } else { field.r_level_max };

            match &field.kind {
                FieldKind::Group { children } => {
                    let sub = match occurrence {
                        Value::Record(sub) => sub,
                        other => {
                            return Err(QuarryError::new(format!(
                                "Expected record for group field {}, got {}",
                                field.path.join("."),
                                other.type_name()
                            )))
                        }
                    };
                    shred_fields(children, Some(sub), data, rlvl_occ, field.d_level_max)?;
                }
                FieldKind::Leaf(leaf) => {
                    let physical =
                        value::to_physical(leaf.physical_type, leaf.converted_type, occurrence)?;
                    let stream = data.column_data.entry(field.path.clone()).or_default();
                    stream.values.push(physical);
                    stream.rlevels.push(rlvl_occ);
                    stream.dlevels.push(field.d_level_max);
                    stream.count += 1;
                }
            }
        }
    }

    Ok(())
}

/// Materialize nested records back from per-column streams.
///
/// Columns are processed independently; each column's placement is
/// self-contained given its ancestor chain and repetition counters.
pub fn materialize_records(schema: &Schema, buffer: &RecordBuffer) -> Result<Vec<Value>> {
    let mut records: Vec<IndexMap<String, Value>> = Vec::new();

    for (path, column) in &buffer.column_data {
        let field = schema.find_field(path)?;
        let branch = schema.find_field_branch(path)?;
        let leaf = field.leaf().ok_or_else(|| {
            QuarryError::new(format!("Column path is not a leaf: {}", path.join(".")))
        })?;

        let mut values = column.values.iter();
        // counters[level] counts occurrences at that repetition level since
        // the last shallower occurrence reset it.
        let mut counters = vec![0u32; field.r_level_max as usize + 1];

        for i in 0..column.count {
            let d_level = column.dlevels[i];
            let r_level = column.rlevels[i] as usize;
            if r_level >= counters.len() {
                return Err(QuarryError::new(format!(
                    "Repetition level {r_level} out of bounds for column {}",
                    path.join(".")
                )));
            }

            counters[r_level] += 1;
            // A new value at level L starts a fresh run for all deeper
            // levels.
            for counter in counters[r_level + 1..].iter_mut() {
                *counter = 0;
            }

            let value = if d_level == field.d_level_max {
                let raw = values.next().ok_or_else(|| {
                    QuarryError::new(format!(
                        "Column stream ran out of values at entry {i} for {}",
                        path.join(".")
                    ))
                })?;
                Some(value::from_physical(leaf.converted_type, raw.clone())?)
            } else {
                None
            };

            if counters[0] == 0 {
                return Err(QuarryError::new(format!(
                    "First entry of column {} has nonzero repetition level",
                    path.join(".")
                )));
            }
            let record_idx = counters[0] as usize - 1;
            while records.len() <= record_idx {
                records.push(IndexMap::new());
            }

            materialize_field(
                &mut records[record_idx],
                &branch,
                &counters[1..],
                d_level,
                value,
            )?;
        }
    }

    Ok(records.into_iter().map(Value::Record).collect())
}

fn materialize_field(
    record: &mut IndexMap<String, Value>,
    branch: &[&SchemaField],
    counters: &[u32],
    d_level: u32,
    value: Option<Value>,
) -> Result<()> {
    let node = branch[0];

    // The value is absent at a branch above this node.
    if d_level < node.d_level_max {
        return Ok(());
    }

    let shape_conflict = || {
        QuarryError::new(format!(
            "Field {} materialized with conflicting shapes",
            node.path.join(".")
        ))
    };

    if branch.len() > 1 {
        if node.repetition == Repetition::Repeated {
            let entry = record
                .entry(node.name.clone())
                .or_insert_with(|| Value::List(Vec::new()));
            let items = match entry {
                Value::List(items) => items,
                _ => return Err(shape_conflict()),
            };

            let idx = counters[0] as usize;
            while items.len() < idx + 1 {
                items.push(Value::Record(IndexMap::new()));
            }
            let sub = match &mut items[idx] {
                Value::Record(sub) => sub,
                _ => return Err(shape_conflict()),
            };
            materialize_field(sub, &branch[1..], &counters[1..], d_level, value)
        } else {
            let entry = record
                .entry(node.name.clone())
                .or_insert_with(|| Value::Record(IndexMap::new()));
            let sub = match entry {
                Value::Record(sub) => sub,
                _ => return Err(shape_conflict()),
            };
            materialize_field(sub, &branch[1..], counters, d_level, value)
        }
    } else {
        let value = value.ok_or_else(|| {
            QuarryError::new(format!(
                "Missing value for present leaf {}",
                node.path.join(".")
            ))
        })?;

        if node.repetition == Repetition::Repeated {
            let entry = record
                .entry(node.name.clone())
                .or_insert_with(|| Value::List(Vec::new()));
            let items = match entry {
                Value::List(items) => items,
                _ => return Err(shape_conflict()),
            };

            let idx = counters[0] as usize;
            while items.len() < idx + 1 {
                items.push(Value::Null);
            }
            items[idx] = value;
        } else {
            record.insert(node.name.clone(), value);
        }
        Ok(())
    }
}
