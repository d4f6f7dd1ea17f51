//! Flat-file persistence: one `<table>.txt` per table inside the database
//! directory.
//!
//! The first line is the schema, one `name:type:nullable:pk` entry per
//! column (`:refTable:refColumn` appended for foreign keys), joined by
//! commas. Every following line is a row of escaped, comma-joined values.

use super::{ColumnDef, DataType, ForeignKey, Row, Table};
use crate::error::{DbError, Result};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const EXTENSION: &str = "txt";

pub fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.{EXTENSION}"))
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Splits a row line on unescaped commas and unescapes each value.
pub fn split_row(line: &str) -> Row {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            ',' => values.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    values.push(current);
    values
}

fn encode_column(column: &ColumnDef) -> String {
    let flag = |b: bool| if b { "1" } else { "0" };
    let mut out = format!(
        "{}:{}:{}:{}",
        column.name,
        column.data_type,
        flag(column.nullable),
        flag(column.primary_key)
    );
    if let Some(fk) = &column.foreign_key {
        out.push_str(&format!(":{}:{}", fk.table, fk.column));
    }
    out
}

fn decode_column(field: &str) -> std::result::Result<ColumnDef, String> {
    let parts: Vec<&str> = field.split(':').collect();
    if parts.len() != 4 && parts.len() != 6 {
        return Err(format!("bad column definition '{field}'"));
    }
    if parts[0].is_empty() {
        return Err("empty column name".to_string());
    }
    let data_type: DataType = parts[1].parse().map_err(|e: DbError| e.to_string())?;
    Ok(ColumnDef {
        name: parts[0].to_string(),
        data_type,
        nullable: parts[2] == "1",
        primary_key: parts[3] == "1",
        foreign_key: (parts.len() == 6).then(|| ForeignKey {
            table: parts[4].to_string(),
            column: parts[5].to_string(),
        }),
    })
}

/// Overwrites the table's file in place.
pub fn save_table(dir: &Path, table: &Table) -> Result<()> {
    let path = table_path(dir, table.name());
    let file = fs::File::create(&path).map_err(|e| DbError::io(&path, e))?;
    let mut out = BufWriter::new(file);
    let header: Vec<String> = table.columns().iter().map(encode_column).collect();
    writeln!(out, "{}", header.join(",")).map_err(|e| DbError::io(&path, e))?;
    for row in table.rows() {
        let line: Vec<String> = row.iter().map(|v| escape(v)).collect();
        writeln!(out, "{}", line.join(",")).map_err(|e| DbError::io(&path, e))?;
    }
    out.flush().map_err(|e| DbError::io(&path, e))?;
    debug!("saved table '{}' ({} rows)", table.name(), table.rows().len());
    Ok(())
}

pub fn load_table(path: &Path) -> Result<Table> {
    let corrupt = |reason: String| DbError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| corrupt("file name is not a table name".to_string()))?;
    let file = fs::File::open(path).map_err(|e| DbError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .ok_or_else(|| corrupt("missing schema line".to_string()))?
        .map_err(|e| DbError::io(path, e))?;
    let columns = header
        .split(',')
        .map(decode_column)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(corrupt)?;

    let mut rows = Vec::new();
    for line in lines {
        let line = line.map_err(|e| DbError::io(path, e))?;
        rows.push(split_row(&line));
    }
    Table::with_rows(name, columns, rows).map_err(|e| corrupt(e.to_string()))
}

/// Loads every table file in `dir`. Unreadable table files are skipped.
pub fn load_database(dir: &Path) -> Result<BTreeMap<String, Table>> {
    let entries = fs::read_dir(dir).map_err(|e| DbError::io(dir, e))?;
    let mut tables = BTreeMap::new();
    for entry in entries {
        let path = entry.map_err(|e| DbError::io(dir, e))?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != EXTENSION) {
            continue;
        }
        match load_table(&path) {
            Ok(table) => {
                debug!("loaded table '{}' from {}", table.name(), path.display());
                tables.insert(table.name().to_string(), table);
            }
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }
    Ok(tables)
}

/// Rewrites every table file one after another. A failure part way leaves
/// earlier files rewritten and later ones untouched.
pub fn save_database<'a>(dir: &Path, tables: impl IntoIterator<Item = &'a Table>) -> Result<()> {
    for table in tables {
        save_table(dir, table)?;
    }
    Ok(())
}

pub fn remove_table(dir: &Path, table: &str) -> Result<()> {
    let path = table_path(dir, table);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DbError::io(path, e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Table {
        let mut columns = vec![
            ColumnDef {
                nullable: false,
                primary_key: true,
                ..ColumnDef::new("id", DataType::Integer)
            },
            ColumnDef::new("note", DataType::VarChar(40)),
            ColumnDef::new("owner", DataType::Integer),
        ];
        columns[2].foreign_key = Some(ForeignKey {
            table: "users".to_string(),
            column: "id".to_string(),
        });
        let mut table = Table::new("notes", columns).unwrap();
        for values in [
            ["1", "plain", "7"],
            ["2", "a, b, and c", ""],
            ["3", "back\\slash\nnew line", "7"],
            ["4", "", ""],
        ] {
            table
                .insert_row(values.iter().map(|v| v.to_string()).collect())
                .unwrap();
        }
        table
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a,b\\c\nd"), "a\\,b\\\\c\\nd");
        assert_eq!(split_row("a\\,b\\\\c\\nd,,x"), vec!["a,b\\c\nd", "", "x"]);
        assert_eq!(split_row(""), vec![""]);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let table = sample();
        save_table(dir.path(), &table).unwrap();
        let loaded = load_table(&table_path(dir.path(), "notes")).unwrap();
        assert_eq!(loaded.name(), "notes");
        assert_eq!(loaded.columns(), table.columns());
        assert_eq!(loaded.rows(), table.rows());
    }

    #[test]
    fn test_header_format() {
        let dir = tempdir().unwrap();
        save_table(dir.path(), &sample()).unwrap();
        let text = fs::read_to_string(table_path(dir.path(), "notes")).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "id:INTEGER:0:1,note:VARCHAR(40):1:0,owner:INTEGER:1:0:users:id"
        );
    }

    #[test]
    fn test_load_database_skips_junk() {
        let dir = tempdir().unwrap();
        save_table(dir.path(), &sample()).unwrap();
        fs::write(dir.path().join("readme.md"), "not a table").unwrap();
        fs::write(dir.path().join("broken.txt"), "a:INTEGER\n").unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        let tables = load_database(dir.path()).unwrap();
        assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["notes"]);
    }

    #[test]
    fn test_load_rejects_bad_arity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.txt");
        fs::write(&path, "a:STRING:1:0,b:STRING:1:0\nonly-one\n").unwrap();
        assert!(matches!(load_table(&path), Err(DbError::Corrupt { .. })));
    }

    #[test]
    fn test_remove_table() {
        let dir = tempdir().unwrap();
        save_table(dir.path(), &sample()).unwrap();
        remove_table(dir.path(), "notes").unwrap();
        assert!(!table_path(dir.path(), "notes").exists());
        remove_table(dir.path(), "notes").unwrap();
    }
}
