//! Event capture for simulation tests and analysis.
//!
//! A `tracing` subscriber that stores every info-level event as one row in
//! a table named after the event's target. Rows keep their fields by name,
//! so emission sites stay free-form; tables convert to polars DataFrames
//! when a test wants aggregation instead of row inspection.
//!
//! # Usage
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "settlement", turn = turn, good = good.0, price = price);
//!
//! // In a test:
//! tracerec::install();
//! // ... run turns ...
//! let capture = tracerec::take();
//! let settlements = &capture.tables["settlement"];
//! assert_eq!(settlements.len(), 3);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// One recorded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl FieldValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Any numeric value widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::U64(v) => Some(*v as f64),
            FieldValue::I64(v) => Some(*v as f64),
            FieldValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// One recorded event: field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FieldValue::as_u64)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    /// Numeric field widened to f64, whatever its recorded type.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// All rows recorded under one tracing target.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose `field` equals `value` after numeric widening.
    pub fn rows_where(&self, field: &str, value: f64) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(move |row| row.get_f64(field) == Some(value))
    }

    /// Sum a numeric column over all rows; rows without the field count
    /// nothing.
    pub fn sum_f64(&self, field: &str) -> f64 {
        self.rows.iter().filter_map(|row| row.get_f64(field)).sum()
    }

    pub fn sum_u64(&self, field: &str) -> u64 {
        self.rows.iter().filter_map(|row| row.get_u64(field)).sum()
    }
}

/// Everything recorded on one thread, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub tables: BTreeMap<String, Table>,
}

impl Capture {
    pub fn table(&self, target: &str) -> Option<&Table> {
        self.tables.get(target)
    }
}

thread_local! {
    static CAPTURE: RefCell<Capture> = RefCell::default();
}

/// Visitor that copies one event's fields into a row.
struct RowVisitor<'a> {
    row: &'a mut Row,
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.row
            .fields
            .insert(field.name().to_string(), FieldValue::U64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.row
            .fields
            .insert(field.name().to_string(), FieldValue::I64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.row
            .fields
            .insert(field.name().to_string(), FieldValue::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.row
            .fields
            .insert(field.name().to_string(), FieldValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.row
            .fields
            .insert(field.name().to_string(), FieldValue::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Subscriber that records info-level events as rows, one table per
/// target. Storage is thread-local, so parallel tests stay isolated even
/// though the subscriber itself is global.
pub struct RowSubscriber;

impl Subscriber for RowSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        // Spans are not tracked.
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut row = Row::default();
        event.record(&mut RowVisitor { row: &mut row });
        CAPTURE.with(|capture| {
            capture
                .borrow_mut()
                .tables
                .entry(event.metadata().target().to_string())
                .or_default()
                .rows
                .push(row);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the row subscriber as the global default. Later calls are
/// no-ops, so every test may call it.
pub fn install() {
    let _ = tracing::subscriber::set_global_default(RowSubscriber);
}

/// Take everything recorded on this thread, leaving the capture empty.
pub fn take() -> Capture {
    CAPTURE.with(|capture| std::mem::take(&mut *capture.borrow_mut()))
}

/// Discard everything recorded on this thread.
pub fn reset() {
    CAPTURE.with(|capture| *capture.borrow_mut() = Capture::default());
}

// === POLARS INTEGRATION ===

use polars::prelude::*;

impl Table {
    /// Convert to a DataFrame with one column per field name seen across
    /// the rows, in order of first appearance. The first row carrying a
    /// field decides its column type; rows missing the field contribute
    /// that type's default.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            for name in row.field_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        let mut columns: Vec<Column> = Vec::with_capacity(names.len());
        for name in names {
            let Some(first) = self.rows.iter().find_map(|row| row.get(name)) else {
                continue;
            };
            let column = match first {
                FieldValue::U64(_) => Column::new(
                    name.into(),
                    self.rows
                        .iter()
                        .map(|row| row.get_u64(name).unwrap_or(0))
                        .collect::<Vec<u64>>(),
                ),
                FieldValue::I64(_) => Column::new(
                    name.into(),
                    self.rows
                        .iter()
                        .map(|row| row.get_i64(name).unwrap_or(0))
                        .collect::<Vec<i64>>(),
                ),
                FieldValue::F64(_) => Column::new(
                    name.into(),
                    self.rows
                        .iter()
                        .map(|row| row.get_f64(name).unwrap_or(0.0))
                        .collect::<Vec<f64>>(),
                ),
                FieldValue::Bool(_) => Column::new(
                    name.into(),
                    self.rows
                        .iter()
                        .map(|row| row.get_bool(name).unwrap_or(false))
                        .collect::<Vec<bool>>(),
                ),
                FieldValue::Str(_) => Column::new(
                    name.into(),
                    self.rows
                        .iter()
                        .map(|row| row.get_str(name).unwrap_or("").to_string())
                        .collect::<Vec<String>>(),
                ),
            };
            columns.push(column);
        }

        DataFrame::new(columns)
    }
}

impl Capture {
    /// Convert every table, skipping any that fail.
    pub fn to_dataframes(&self) -> BTreeMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}
