//! Tabular data ingestion.
//!
//! Reads a delimited table (comma or tab, header row first) into the two
//! population sample maps plus one [`Subject`] per kept row. Cells that do
//! not parse as finite numbers are missing measurements; they are kept on
//! the subject as `None` and left out of the population maps.

use crate::dimorphism::{SampleMap, Subject};
use dm_common::{Error, GroupLabels, Population, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Raw delimited table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based source line of each row, for error messages.
    lines: Vec<usize>,
}

impl Table {
    /// Read and parse a table from disk.
    pub fn read(path: &Path) -> Result<Table> {
        let text = std::fs::read_to_string(path)?;
        Table::parse(&text)
    }

    /// Parse delimited text.
    ///
    /// The delimiter is a tab when the header line contains one, otherwise a
    /// comma. Fields may be double-quoted with `""` escapes. Blank lines are
    /// skipped. Every row must have as many fields as the header.
    pub fn parse(text: &str) -> Result<Table> {
        let body = text.strip_prefix('\u{feff}').unwrap_or(text);
        let text = body.trim_start_matches(['\r', '\n']);
        let offset = body[..body.len() - text.len()].matches('\n').count();
        let header_line = text
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| Error::Ingest("table is empty".to_string()))?;
        let delimiter = if header_line.contains('\t') { b'\t' } else { b',' };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());
        let header: Vec<String> = reader
            .headers()
            .map_err(|e| ingest_error(e, offset))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        let mut row_lines = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ingest_error(e, offset))?;
            let line = record.position().map_or(0, |p| p.line() as usize) + offset;
            rows.push(record.iter().map(str::to_string).collect());
            row_lines.push(line);
        }

        Ok(Table {
            header,
            rows,
            lines: row_lines,
        })
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `offset` counts the leading blank lines cut before parsing.
fn ingest_error(err: csv::Error, offset: usize) -> Error {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => Error::Ingest(format!(
            "line {}: expected {} fields, found {}",
            pos.as_ref().map_or(0, |p| p.line() as usize) + offset,
            expected_len,
            len
        )),
        _ => Error::Ingest(err.to_string()),
    }
}

/// Parse a cell as a measurement. Anything but a finite number is missing.
pub fn parse_measurement(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column names and labels that drive ingestion.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub subject_id: String,
    pub group_by: String,
    pub labels: GroupLabels,
    /// Variables to keep. Empty means every column except id and group.
    pub variables: Vec<String>,
}

/// Ingested data: both populations and every kept subject.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub labels: GroupLabels,
    /// Analysed variables in column order.
    pub variables: Vec<String>,
    pub population_a: SampleMap,
    pub population_b: SampleMap,
    pub subjects: Vec<Subject>,
    /// Rows whose group matched neither label.
    pub skipped: usize,
}

impl Dataset {
    pub fn from_table(table: &Table, settings: &IngestSettings) -> Result<Dataset> {
        let id_col = table.column_index(&settings.subject_id)?;
        let group_col = table.column_index(&settings.group_by)?;

        let variables: Vec<String> = if settings.variables.is_empty() {
            table
                .header
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != id_col && *i != group_col)
                .map(|(_, h)| h.clone())
                .collect()
        } else {
            settings.variables.clone()
        };
        let columns: Vec<(String, usize)> = variables
            .iter()
            .map(|v| Ok((v.clone(), table.column_index(v)?)))
            .collect::<Result<_>>()?;

        let empty: SampleMap = variables.iter().map(|v| (v.clone(), Vec::new())).collect();
        let mut population_a = empty.clone();
        let mut population_b = empty;
        let mut subjects = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut skipped = 0;

        for (row, line) in table.rows.iter().zip(&table.lines) {
            let id = row[id_col].trim();
            let group = row[group_col].trim();
            let Some(population) = settings.labels.population_of(group) else {
                warn!(line, group, "row skipped: group matches neither label");
                skipped += 1;
                continue;
            };
            if id.is_empty() {
                return Err(Error::Ingest(format!("line {}: empty subject id", line)));
            }
            if !seen_ids.insert(id.to_string()) {
                return Err(Error::Ingest(format!(
                    "line {}: duplicate subject id '{}'",
                    line, id
                )));
            }

            let target = match population {
                Population::A => &mut population_a,
                Population::B => &mut population_b,
            };
            let mut values = BTreeMap::new();
            for (name, col) in &columns {
                let value = parse_measurement(&row[*col]);
                if let (Some(v), Some(samples)) = (value, target.get_mut(name)) {
                    samples.push(v);
                }
                values.insert(name.clone(), value);
            }
            subjects.push(Subject::new(id, group, values));
        }

        debug!(
            subjects = subjects.len(),
            variables = variables.len(),
            skipped,
            "table ingested"
        );

        Ok(Dataset {
            labels: settings.labels.clone(),
            variables,
            population_a,
            population_b,
            subjects,
            skipped,
        })
    }

    pub fn population(&self, population: Population) -> &SampleMap {
        match population {
            Population::A => &self.population_a,
            Population::B => &self.population_b,
        }
    }

    /// Number of kept subjects in a population.
    pub fn size(&self, population: Population) -> usize {
        let label = self.labels.label(population);
        self.subjects.iter().filter(|s| s.group == label).count()
    }
}
