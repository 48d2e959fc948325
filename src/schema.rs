//! Header-driven column type inference and schema checks for the source CSV.
//!
//! Each column gets the narrowest type that every sampled non-null cell fits:
//! `Integer`, then `Double`, then `Text`. A column with no sampled values is
//! `Text`.

use crate::error::EtlError;
use crate::value::parse_double;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Double,
    Text,
}

impl ColumnType {
    fn widen(self, cell: &str) -> ColumnType {
        match self {
            ColumnType::Integer if cell.parse::<i64>().is_ok() => ColumnType::Integer,
            ColumnType::Integer | ColumnType::Double if parse_double(cell).is_some() => {
                ColumnType::Double
            }
            _ => ColumnType::Text,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Integer => "integer",
            ColumnType::Double => "double",
            ColumnType::Text => "string",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    /// Infer column types from `records`, looking at the first `sample` rows
    /// (all rows when `None`).
    pub fn infer(
        headers: &[String],
        records: &[StringRecord],
        sample: Option<usize>,
        null_values: &[String],
    ) -> Schema {
        let take = sample.unwrap_or(records.len());
        // None = no value seen yet
        let mut types: Vec<Option<ColumnType>> = vec![None; headers.len()];
        for rec in records.iter().take(take) {
            for (i, slot) in types.iter_mut().enumerate() {
                let Some(cell) = rec.get(i) else { continue };
                if cell.is_empty() || null_values.iter().any(|n| n == cell) {
                    continue;
                }
                *slot = Some(slot.unwrap_or(ColumnType::Integer).widen(cell));
            }
        }
        Schema {
            columns: headers
                .iter()
                .zip(types)
                .map(|(name, ty)| Column {
                    name: name.clone(),
                    ty: ty.unwrap_or(ColumnType::Text),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Fail with [`EtlError::SchemaMismatch`] unless every `required` column is
    /// present and no header name repeats.
    pub fn require(&self, required: &[&str], path: &Path) -> Result<(), EtlError> {
        let mut seen = HashSet::new();
        let dupes: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| !seen.insert(c.name.as_str()))
            .map(|c| c.name.as_str())
            .collect();
        if !dupes.is_empty() {
            return Err(EtlError::SchemaMismatch {
                path: path.to_path_buf(),
                reason: format!("duplicate header(s): {}", dupes.join(", ")),
            });
        }

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|r| self.index_of(r).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::SchemaMismatch {
                path: path.to_path_buf(),
                reason: format!("missing required column(s): {}", missing.join(", ")),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root")?;
        for c in &self.columns {
            writeln!(f, " |-- {}: {}", c.name, c.ty)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(cells: &[&str]) -> StringRecord {
        StringRecord::from(cells.to_vec())
    }

    #[test]
    fn infers_narrowest_type_per_column() {
        let headers = vec!["a".to_string(), "b".into(), "c".into(), "d".into()];
        let records = vec![rec(&["1", "1", "x", ""]), rec(&["2", "2.5", "3", ""])];
        let schema = Schema::infer(&headers, &records, None, &[String::new()]);
        let types: Vec<ColumnType> = schema.columns.iter().map(|c| c.ty).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Double,
                ColumnType::Text,
                ColumnType::Text
            ]
        );
    }

    #[test]
    fn sample_limits_rows_considered() {
        let headers = vec!["a".to_string()];
        let records = vec![rec(&["1"]), rec(&["oops"])];
        let schema = Schema::infer(&headers, &records, Some(1), &[]);
        assert_eq!(schema.columns[0].ty, ColumnType::Integer);
    }

    #[test]
    fn require_reports_missing_and_duplicate_columns() {
        let schema = Schema {
            columns: vec![
                Column { name: "a".into(), ty: ColumnType::Text },
                Column { name: "a".into(), ty: ColumnType::Text },
            ],
        };
        let err = schema.require(&["a"], Path::new("x.csv")).unwrap_err();
        assert!(err.to_string().contains("duplicate header"));

        let schema = Schema {
            columns: vec![Column { name: "a".into(), ty: ColumnType::Text }],
        };
        let err = schema.require(&["a", "b"], Path::new("x.csv")).unwrap_err();
        assert!(err.to_string().contains("missing required column(s): b"));
    }
}
