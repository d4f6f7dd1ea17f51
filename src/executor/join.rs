use super::ResultSet;
use crate::error::{DbError, Result};
use crate::query::{ColumnRef, JoinKind, Select, SelectItem, TableRef};
use crate::storage::table::sort_by_column;
use crate::storage::{BoundPredicate, ColumnResolver, DataType, NULL_MARKER, Row, Table};
use log::debug;
use std::collections::BTreeMap;

/// A table taking part in a multi-table query, placed at `offset` in the
/// concatenated row.
#[derive(Clone, Copy)]
struct Source<'a> {
    alias: &'a str,
    table: &'a Table,
    offset: usize,
}

/// Column lookup over concatenated rows.
struct Sources<'a> {
    sources: Vec<Source<'a>>,
}

impl<'a> Sources<'a> {
    fn new(refs: &[&'a TableRef], tables: &'a BTreeMap<String, Table>) -> Result<Self> {
        let mut sources: Vec<Source<'a>> = Vec::with_capacity(refs.len());
        let mut offset = 0;
        for table_ref in refs {
            let alias = table_ref.alias_or_name();
            if sources.iter().any(|s| s.alias == alias) {
                return Err(DbError::AmbiguousAlias(alias.to_string()));
            }
            let table = tables
                .get(&*table_ref.name)
                .ok_or_else(|| DbError::TableNotFound(table_ref.name.to_string()))?;
            sources.push(Source {
                alias,
                table,
                offset,
            });
            offset += table.columns().len();
        }
        Ok(Self { sources })
    }

    fn prefix(&self, len: usize) -> Sources<'a> {
        Sources {
            sources: self.sources[..len].to_vec(),
        }
    }

    fn width(&self) -> usize {
        self.sources
            .last()
            .map_or(0, |s| s.offset + s.table.columns().len())
    }

    /// Finds the source and column position a reference points to.
    fn locate(&self, column: &ColumnRef) -> Result<(&Source<'a>, usize)> {
        if let Some(qualifier) = &column.qualifier {
            let source = self
                .sources
                .iter()
                .find(|s| s.alias == &**qualifier)
                .ok_or_else(|| DbError::UnknownAlias(qualifier.to_string()))?;
            let pos = source.table.column_index(&column.name)?;
            return Ok((source, pos));
        }
        let mut found = None;
        for source in &self.sources {
            if let Ok(pos) = source.table.column_index(&column.name) {
                if found.is_some() {
                    return Err(DbError::AmbiguousColumn(column.name.to_string()));
                }
                found = Some((source, pos));
            }
        }
        found.ok_or_else(|| DbError::ColumnNotFound(column.name.to_string()))
    }

    fn data_type(&self, column: &ColumnRef) -> Result<DataType> {
        let (source, pos) = self.locate(column)?;
        Ok(source.table.columns()[pos].data_type)
    }
}

impl ColumnResolver for Sources<'_> {
    fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        let (source, pos) = self.locate(column)?;
        Ok(source.offset + pos)
    }
}

fn pad(width: usize) -> impl Iterator<Item = String> {
    std::iter::repeat_n(NULL_MARKER.to_string(), width)
}

/// Runs a SELECT over several tables: the cartesian product of the FROM
/// list, joined with each JOIN table on its ON condition, filtered by WHERE,
/// then sorted and projected.
pub(super) fn select(tables: &BTreeMap<String, Table>, select: &Select) -> Result<ResultSet> {
    if select.has_aggregates() || !select.group_by.is_empty() || select.having.is_some() {
        return Err(DbError::Unsupported(
            "aggregates across multiple tables".to_string(),
        ));
    }
    let refs: Vec<&TableRef> = select
        .from
        .iter()
        .chain(select.joins.iter().map(|join| &join.table))
        .collect();
    let sources = Sources::new(&refs, tables)?;

    let mut rows = match equi_join(&sources, select)? {
        Some(rows) => rows,
        None => product(&sources, select)?,
    };
    debug!("multi-table select combined {} rows", rows.len());

    if let Some(filter) = BoundPredicate::bind_opt(select.filter.as_ref(), &sources)? {
        rows.retain(|row| filter.matches(row));
    }
    if let Some(order_by) = &select.order_by {
        let pos = sources.resolve(&order_by.column)?;
        let data_type = sources.data_type(&order_by.column)?;
        sort_by_column(&mut rows, pos, data_type, order_by.desc);
    }

    let mut columns = Vec::new();
    let mut positions = Vec::new();
    for item in &select.items {
        match item {
            SelectItem::Wildcard => {
                for source in &sources.sources {
                    for (i, column) in source.table.columns().iter().enumerate() {
                        columns.push(column.name.clone());
                        positions.push(source.offset + i);
                    }
                }
            }
            SelectItem::Column { column, .. } => {
                columns.push(item.header());
                positions.push(sources.resolve(column)?);
            }
            SelectItem::Aggregate { .. } => {
                return Err(DbError::Unsupported(
                    "aggregates across multiple tables".to_string(),
                ));
            }
        }
    }
    let rows = rows
        .into_iter()
        .map(|row| positions.iter().map(|&pos| row[pos].clone()).collect())
        .collect();
    Ok(ResultSet { columns, rows })
}

/// `FROM a JOIN b ON a.x = b.y`: handed to `Table::join`.
fn equi_join(sources: &Sources, select: &Select) -> Result<Option<Vec<Row>>> {
    let [join] = select.joins.as_slice() else {
        return Ok(None);
    };
    if select.from.len() != 1 {
        return Ok(None);
    }
    let on = BoundPredicate::bind(&join.on, sources)?;
    let Some(pairs) = on.equi_columns() else {
        return Ok(None);
    };
    let [(a, b)] = pairs.as_slice() else {
        return Ok(None);
    };
    let (left, right) = (&sources.sources[0], &sources.sources[1]);
    let (l, r) = if *a < right.offset && *b >= right.offset {
        (*a, *b)
    } else if *b < right.offset && *a >= right.offset {
        (*b, *a)
    } else {
        return Ok(None);
    };
    let left_col = &left.table.columns()[l].name;
    let right_col = &right.table.columns()[r - right.offset].name;
    left.table
        .join(right.table, left_col, right_col, join.kind)
        .map(Some)
}

fn product(sources: &Sources, select: &Select) -> Result<Vec<Row>> {
    let from = select.from.len();
    let mut rows: Vec<Row> = vec![Vec::new()];
    for source in &sources.sources[..from] {
        rows = rows
            .iter()
            .flat_map(|left| {
                source
                    .table
                    .rows()
                    .iter()
                    .map(move |right| left.iter().chain(right).cloned().collect::<Row>())
            })
            .collect();
    }

    for (i, join) in select.joins.iter().enumerate() {
        let right = &sources.sources[from + i];
        let scope = sources.prefix(from + i + 1);
        let on = BoundPredicate::bind(&join.on, &scope)?;
        let left_width = right.offset;
        let right_width = right.table.columns().len();
        let right_rows = right.table.rows();
        let mut right_matched = vec![false; right_rows.len()];
        let mut joined = Vec::new();

        for left in &rows {
            let mut matched = false;
            for (r_pos, r) in right_rows.iter().enumerate() {
                let row: Row = left.iter().chain(r).cloned().collect();
                if on.matches(&row) {
                    matched = true;
                    right_matched[r_pos] = true;
                    joined.push(row);
                }
            }
            if !matched && join.kind != JoinKind::Inner {
                joined.push(left.iter().cloned().chain(pad(right_width)).collect());
            }
        }
        if join.kind == JoinKind::Full {
            for (r, _) in right_rows.iter().zip(&right_matched).filter(|(_, m)| !**m) {
                joined.push(pad(left_width).chain(r.iter().cloned()).collect());
            }
        }
        rows = joined;
    }
    debug_assert!(rows.iter().all(|row| row.len() == sources.width()));
    Ok(rows)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::{Stmt, parse};
    use crate::storage::ColumnDef;

    fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(
            name,
            columns
                .iter()
                .map(|c| ColumnDef::new(c, DataType::String))
                .collect(),
        )
        .unwrap();
        for row in rows {
            table
                .insert_row(row.iter().map(|v| v.to_string()).collect())
                .unwrap();
        }
        table
    }

    fn tables() -> BTreeMap<String, Table> {
        let mut tables = BTreeMap::new();
        tables.insert(
            "Students".to_string(),
            table("Students", &["ID", "Name"], &[&["1", "A"], &["2", "B"]]),
        );
        tables.insert(
            "Courses".to_string(),
            table("Courses", &["StudentID", "Course"], &[&["1", "X"]]),
        );
        tables.insert(
            "Rooms".to_string(),
            table("Rooms", &["Course", "Room"], &[&["X", "101"], &["Y", "102"]]),
        );
        tables
    }

    fn run(sql: &str) -> Result<ResultSet> {
        match parse(sql).unwrap() {
            Stmt::Select(query) => select(&tables(), &query),
            _ => unreachable!(),
        }
    }

    fn rows(rows: &[&[&str]]) -> Vec<Row> {
        rows.iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_inner_join() {
        let result = run("SELECT * FROM Students s INNER JOIN Courses c ON s.ID = c.StudentID").unwrap();
        assert_eq!(result.columns, vec!["ID", "Name", "StudentID", "Course"]);
        assert_eq!(result.rows, rows(&[&["1", "A", "1", "X"]]));
    }

    #[test]
    fn test_left_join() {
        let result =
            run("SELECT s.Name, c.Course FROM Students s LEFT JOIN Courses c ON c.StudentID = s.ID")
                .unwrap();
        assert_eq!(result.columns, vec!["Name", "Course"]);
        assert_eq!(result.rows, rows(&[&["A", "X"], &["B", "NULL"]]));
    }

    #[test]
    fn test_comma_join_with_where() {
        let result = run(
            "SELECT Name, Course AS course FROM Students, Courses \
             WHERE Students.ID = Courses.StudentID",
        )
        .unwrap();
        assert_eq!(result.columns, vec!["Name", "course"]);
        assert_eq!(result.rows, rows(&[&["A", "X"]]));
    }

    #[test]
    fn test_cartesian_product() {
        let result = run("SELECT s.ID, r.Room FROM Students s, Rooms r ORDER BY r.Room DESC").unwrap();
        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.rows[0][1], "102");
        assert_eq!(result.rows[3][1], "101");
    }

    #[test]
    fn test_chained_joins() {
        let result = run(
            "SELECT s.Name, r.Room FROM Students s \
             JOIN Courses c ON s.ID = c.StudentID \
             FULL JOIN Rooms r ON c.Course = r.Course",
        )
        .unwrap();
        assert_eq!(result.rows, rows(&[&["A", "101"], &["NULL", "102"]]));
    }

    #[test]
    fn test_join_with_extra_on_terms() {
        let result = run(
            "SELECT s.Name FROM Students s JOIN Courses c ON s.ID = c.StudentID AND c.Course = 'Z'",
        )
        .unwrap();
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_ambiguous_column() {
        assert!(matches!(
            run("SELECT Course FROM Courses c, Rooms r"),
            Err(DbError::AmbiguousColumn(_))
        ));
    }

    #[test]
    fn test_unknown_alias() {
        assert!(matches!(
            run("SELECT z.Name FROM Students s, Courses c"),
            Err(DbError::UnknownAlias(_))
        ));
    }

    #[test]
    fn test_duplicate_alias() {
        assert!(matches!(
            run("SELECT * FROM Students s, Courses s"),
            Err(DbError::AmbiguousAlias(_))
        ));
    }

    #[test]
    fn test_missing_table() {
        assert!(matches!(
            run("SELECT * FROM Students, Nope"),
            Err(DbError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_aggregates_rejected() {
        assert!(matches!(
            run("SELECT COUNT(*) FROM Students, Courses"),
            Err(DbError::Unsupported(_))
        ));
    }
}
