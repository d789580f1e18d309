//! Best-effort bulk writes to warehouse tables.
//!
//! A write never raises. Rejected rows, or a failed insert call, are logged
//! together with the full submitted payload and returned in a
//! [`WriteReport`]; nothing is retried. Callers that need all-or-nothing
//! semantics must inspect the report.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::WarehouseError;
use crate::traits::{RowError, Warehouse};

/// Outcome of one bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReport {
    pub table: String,
    pub submitted: usize,
    pub failures: Vec<RowError>,
}

impl WriteReport {
    /// True when every submitted row was accepted.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn accepted(&self) -> usize {
        let failed: std::collections::HashSet<usize> =
            self.failures.iter().map(|failure| failure.index).collect();
        self.submitted.saturating_sub(failed.len())
    }
}

pub struct WarehouseWriter<'a, W> {
    warehouse: &'a W,
}

impl<'a, W: Warehouse> WarehouseWriter<'a, W> {
    pub fn new(warehouse: &'a W) -> Self {
        Self { warehouse }
    }

    /// Inserts all records into `table` with a single call. An empty batch
    /// is reported as complete without calling the warehouse.
    pub fn write<T: Serialize>(&self, table: &str, records: &[T]) -> WriteReport {
        let rows = match records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
        {
            Ok(rows) => rows,
            Err(err) => {
                error!(table, error = %err, "could not serialize rows, nothing inserted");
                return WriteReport {
                    table: table.to_string(),
                    submitted: records.len(),
                    failures: whole_batch(records.len(), &err.to_string()),
                };
            }
        };

        if rows.is_empty() {
            debug!(table, "no rows to insert");
            return WriteReport {
                table: table.to_string(),
                submitted: 0,
                failures: Vec::new(),
            };
        }

        let failures = match self.warehouse.insert_rows(table, &rows) {
            Ok(failures) => failures,
            Err(err) => whole_batch(rows.len(), &err.to_string()),
        };

        if failures.is_empty() {
            info!(table, rows = rows.len(), "inserted rows");
        } else {
            let payload = Value::Array(rows.clone()).to_string();
            error!(
                table,
                failed = failures.len(),
                errors = ?failures,
                payload = %payload,
                "encountered errors while inserting rows"
            );
        }

        WriteReport {
            table: table.to_string(),
            submitted: rows.len(),
            failures,
        }
    }
}

fn whole_batch(rows: usize, message: &str) -> Vec<RowError> {
    (0..rows)
        .map(|index| RowError {
            index,
            message: message.to_string(),
        })
        .collect()
}

/// Local warehouse that appends each row as a JSON line to
/// `{dir}/{table}.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonLinesWarehouse {
    dir: PathBuf,
}

impl JsonLinesWarehouse {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", table))
    }
}

impl Warehouse for JsonLinesWarehouse {
    fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<Vec<RowError>, WarehouseError> {
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(Vec::new())
    }
}
