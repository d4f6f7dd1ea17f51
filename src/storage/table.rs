use super::aggregate::{evaluate, having_holds};
use super::filter::{self, BoundPredicate, ColumnResolver};
use super::{ColumnDef, DataType, Index, NULL_MARKER, Row};
use crate::error::{DbError, Result};
use crate::query::{AggregateFunc, ColumnRef, Having, JoinKind, Predicate, SelectItem};
use std::collections::{BTreeMap, HashSet};

/// One named table: schema, rows in insertion order and secondary indices.
///
/// A row is identified by its position, which shifts on delete.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
    indices: BTreeMap<String, Index>,
}

enum Projection {
    Column(usize),
    Aggregate(AggregateFunc, Option<usize>),
}

impl Table {
    pub fn new(name: &str, columns: Vec<ColumnDef>) -> Result<Self> {
        if columns.is_empty() {
            return Err(DbError::InvalidSchema(format!(
                "table '{name}' has no columns"
            )));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DbError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
            indices: BTreeMap::new(),
        })
    }

    /// Builds a table from stored rows without re-validating their values.
    pub fn with_rows(name: &str, columns: Vec<ColumnDef>, rows: Vec<Row>) -> Result<Self> {
        let mut table = Self::new(name, columns)?;
        for row in &rows {
            table.check_arity(row.len())?;
        }
        table.rows = rows;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string()))
    }

    fn check_arity(&self, found: usize) -> Result<()> {
        if found == self.columns.len() {
            Ok(())
        } else {
            Err(DbError::ArityMismatch {
                expected: self.columns.len(),
                found,
            })
        }
    }

    fn positions(&self, columns: &[&str]) -> Result<Vec<usize>> {
        if columns.contains(&"*") {
            return Ok((0..self.columns.len()).collect());
        }
        columns.iter().map(|c| self.column_index(c)).collect()
    }

    pub fn insert_row(&mut self, values: Vec<String>) -> Result<()> {
        self.check_arity(values.len())?;
        for (column, value) in self.columns.iter().zip(&values) {
            column.check(value)?;
        }
        self.rows.push(values);
        self.index_row(self.rows.len() - 1);
        Ok(())
    }

    /// Filters, sorts and projects rows. `*` selects every column. The sort
    /// column does not need to be projected.
    pub fn select(
        &self,
        columns: &[&str],
        filter: Option<&Predicate>,
        order_by: Option<&str>,
        desc: bool,
    ) -> Result<Vec<Row>> {
        let positions = self.positions(columns)?;
        let filter = BoundPredicate::bind_opt(filter, self)?;
        let mut matched: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| filter::matches(filter.as_ref(), row))
            .collect();

        if let Some(order_by) = order_by {
            let pos = self.column_index(order_by)?;
            let data_type = self.columns[pos].data_type;
            sort_by_column(&mut matched, pos, data_type, desc);
        }

        Ok(matched
            .into_iter()
            .map(|row| positions.iter().map(|&pos| row[pos].clone()).collect())
            .collect())
    }

    /// Assigns `values` to `columns` in every matching row.
    ///
    /// Each row is validated before it is changed. A failure leaves rows
    /// updated earlier in the call as they are.
    pub fn update_rows(
        &mut self,
        columns: &[&str],
        values: &[&str],
        filter: Option<&Predicate>,
    ) -> Result<bool> {
        if columns.len() != values.len() {
            return Err(DbError::ArityMismatch {
                expected: columns.len(),
                found: values.len(),
            });
        }
        let targets: Vec<usize> = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<_>>()?;
        let filter = BoundPredicate::bind_opt(filter, &*self)?;
        let matched: Vec<usize> = (0..self.rows.len())
            .filter(|&pos| filter::matches(filter.as_ref(), &self.rows[pos]))
            .collect();

        for &pos in &matched {
            for (&col, value) in targets.iter().zip(values) {
                self.columns[col].check(value)?;
            }
            self.unindex_row(pos);
            for (&col, value) in targets.iter().zip(values) {
                self.rows[pos][col] = value.to_string();
            }
            self.index_row(pos);
        }
        Ok(!matched.is_empty())
    }

    /// Removes every matching row, then rebuilds all indices.
    pub fn delete_rows(&mut self, filter: Option<&Predicate>) -> Result<bool> {
        let filter = BoundPredicate::bind_opt(filter, &*self)?;
        let before = self.rows.len();
        self.rows.retain(|row| !filter::matches(filter.as_ref(), row));
        let deleted = before != self.rows.len();
        if deleted {
            self.rebuild_indices();
        }
        Ok(deleted)
    }

    /// Nested-loop equality join. Output rows are this table's columns
    /// followed by `other`'s; the missing side of an outer match is padded
    /// with `NULL`.
    pub fn join(
        &self,
        other: &Table,
        left_col: &str,
        right_col: &str,
        kind: JoinKind,
    ) -> Result<Vec<Row>> {
        let left = self.column_index(left_col)?;
        let right = other.column_index(right_col)?;
        let mut out = Vec::new();
        let mut right_matched = vec![false; other.rows.len()];

        for l in &self.rows {
            let mut matched = false;
            for (r_pos, r) in other.rows.iter().enumerate() {
                if l[left] == r[right] {
                    matched = true;
                    right_matched[r_pos] = true;
                    out.push(l.iter().chain(r).cloned().collect());
                }
            }
            if !matched && kind != JoinKind::Inner {
                let mut row = l.clone();
                row.extend(std::iter::repeat_n(NULL_MARKER.to_string(), other.columns.len()));
                out.push(row);
            }
        }

        if kind == JoinKind::Full {
            for (r, _) in other.rows.iter().zip(&right_matched).filter(|(_, m)| !**m) {
                let mut row = vec![NULL_MARKER.to_string(); self.columns.len()];
                row.extend(r.iter().cloned());
                out.push(row);
            }
        }
        Ok(out)
    }

    /// Builds (or rebuilds) the index for `column` from the current rows.
    pub fn create_index(&mut self, column: &str) -> Result<()> {
        let pos = self.column_index(column)?;
        self.indices
            .insert(column.to_string(), Index::build(&self.rows, pos));
        Ok(())
    }

    pub fn drop_index(&mut self, column: &str) -> bool {
        self.indices.remove(column).is_some()
    }

    pub fn index(&self, column: &str) -> Option<&Index> {
        self.indices.get(column)
    }

    fn index_row(&mut self, pos: usize) {
        let Some(row) = self.rows.get(pos) else {
            return;
        };
        for (name, index) in self.indices.iter_mut() {
            if let Some(col) = self.columns.iter().position(|c| c.name == *name)
                && let Some(value) = row.get(col)
            {
                index.insert(value, pos);
            }
        }
    }

    fn unindex_row(&mut self, pos: usize) {
        let Some(row) = self.rows.get(pos) else {
            return;
        };
        for (name, index) in self.indices.iter_mut() {
            if let Some(col) = self.columns.iter().position(|c| c.name == *name)
                && let Some(value) = row.get(col)
            {
                index.remove(value, pos);
            }
        }
    }

    fn rebuild_indices(&mut self) {
        for (name, index) in self.indices.iter_mut() {
            if let Some(col) = self.columns.iter().position(|c| c.name == *name) {
                *index = Index::build(&self.rows, col);
            }
        }
    }

    /// Aggregate select. Without GROUP BY the result is a single row over all
    /// matching rows, and plain columns take their value from the first one.
    /// With GROUP BY there is one row per group in ascending key order, and
    /// every plain column must be grouped.
    pub fn select_with_aggregates(
        &self,
        items: &[SelectItem],
        filter: Option<&Predicate>,
        group_by: &[Box<str>],
        having: Option<&Having>,
    ) -> Result<Vec<Row>> {
        let projection = items
            .iter()
            .map(|item| -> Result<Projection> {
                Ok(match item {
                    SelectItem::Wildcard => {
                        return Err(DbError::Unsupported(
                            "'*' alongside aggregates".to_string(),
                        ));
                    }
                    SelectItem::Column { column, .. } => Projection::Column(self.resolve(column)?),
                    SelectItem::Aggregate { func, arg, .. } => Projection::Aggregate(
                        *func,
                        arg.as_ref().map(|c| self.resolve(c)).transpose()?,
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let keys: Vec<usize> = group_by
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<_>>()?;
        let having = having
            .map(|h| -> Result<_> {
                let column = h.column.as_deref().map(|c| self.column_index(c)).transpose()?;
                Ok((h, column))
            })
            .transpose()?;

        let filter = BoundPredicate::bind_opt(filter, self)?;
        let matched: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| filter::matches(filter.as_ref(), row))
            .collect();

        let groups: Vec<Vec<&Row>> = if keys.is_empty() {
            vec![matched]
        } else {
            for (item, proj) in items.iter().zip(&projection) {
                if let Projection::Column(pos) = proj
                    && !keys.contains(pos)
                {
                    return Err(DbError::NotGrouped(item.expr()));
                }
            }
            let mut groups: BTreeMap<Vec<&str>, Vec<&Row>> = BTreeMap::new();
            for row in matched {
                let key = keys.iter().map(|&k| row[k].as_str()).collect();
                groups.entry(key).or_default().push(row);
            }
            groups.into_values().collect()
        };

        let mut out = Vec::new();
        for group in groups {
            if let Some((having, column)) = &having {
                let value = evaluate(having.func, *column, &group);
                if !having_holds(&value, having.op, &having.value)? {
                    continue;
                }
            }
            out.push(
                projection
                    .iter()
                    .map(|proj| match proj {
                        Projection::Column(pos) => {
                            group.first().map(|row| row[*pos].clone()).unwrap_or_default()
                        }
                        Projection::Aggregate(func, column) => evaluate(*func, *column, &group),
                    })
                    .collect(),
            );
        }
        Ok(out)
    }
}

impl ColumnResolver for Table {
    /// Qualifiers are checked by the caller; only the name is looked up.
    fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        self.column_index(&column.name)
    }
}

/// Stable sort on one column. Ascending puts nulls first.
pub fn sort_by_column<R: AsRef<[String]>>(
    rows: &mut [R],
    column: usize,
    data_type: DataType,
    desc: bool,
) {
    rows.sort_by(|a, b| {
        let ord = data_type.compare(
            a.as_ref().get(column).map_or("", String::as_str),
            b.as_ref().get(column).map_or("", String::as_str),
        );
        if desc { ord.reverse() } else { ord }
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::{Stmt, parse};

    fn table(name: &str, columns: &[(&str, DataType)]) -> Table {
        Table::new(
            name,
            columns
                .iter()
                .map(|(name, ty)| ColumnDef::new(name, *ty))
                .collect(),
        )
        .unwrap()
    }

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn filter(cond: &str) -> Predicate {
        match parse(&format!("DELETE FROM t WHERE {cond}")).unwrap() {
            Stmt::Delete {
                filter: Some(filter),
                ..
            } => filter,
            _ => unreachable!(),
        }
    }

    fn select_stmt(sql: &str) -> crate::query::Select {
        match parse(sql).unwrap() {
            Stmt::Select(select) => select,
            _ => unreachable!(),
        }
    }

    fn scores() -> Table {
        let mut t = table(
            "scores",
            &[
                ("name", DataType::String),
                ("dept", DataType::String),
                ("score", DataType::Integer),
            ],
        );
        t.insert_row(row(&["kim", "CS", "80"])).unwrap();
        t.insert_row(row(&["lee", "CS", "90"])).unwrap();
        t.insert_row(row(&["park", "EE", "70"])).unwrap();
        t
    }

    fn aggregate(t: &Table, sql: &str) -> Result<Vec<Row>> {
        let q = select_stmt(sql);
        t.select_with_aggregates(&q.items, q.filter.as_ref(), &q.group_by, q.having.as_ref())
    }

    #[test]
    fn test_new_rejects_bad_schema() {
        assert!(matches!(
            Table::new("t", vec![]),
            Err(DbError::InvalidSchema(_))
        ));
        assert!(matches!(
            Table::new(
                "t",
                vec![
                    ColumnDef::new("a", DataType::String),
                    ColumnDef::new("a", DataType::Integer),
                ]
            ),
            Err(DbError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_insert_arity() {
        let mut t = scores();
        assert!(matches!(
            t.insert_row(row(&["a", "b"])),
            Err(DbError::ArityMismatch {
                expected: 3,
                found: 2
            })
        ));
        assert!(t.insert_row(row(&["a", "b", "1", "2"])).is_err());
        assert_eq!(t.rows().len(), 3);
    }

    #[test]
    fn test_insert_types() {
        let mut t = table("t", &[("n", DataType::Integer)]);
        assert!(matches!(
            t.insert_row(row(&["abc"])),
            Err(DbError::TypeMismatch { .. })
        ));
        t.insert_row(row(&["42"])).unwrap();
        t.insert_row(row(&[""])).unwrap();

        let mut strict = Table::new(
            "s",
            vec![ColumnDef {
                nullable: false,
                ..ColumnDef::new("n", DataType::String)
            }],
        )
        .unwrap();
        assert!(matches!(
            strict.insert_row(row(&[""])),
            Err(DbError::NullViolation(_))
        ));
        assert!(strict.rows().is_empty());
    }

    #[test]
    fn test_select_where_and_projection() {
        let t = scores();
        let rows = t
            .select(&["name"], Some(&filter("dept = 'CS' AND score = '90'")), None, false)
            .unwrap();
        assert_eq!(rows, vec![row(&["lee"])]);
        let swapped = t
            .select(&["name"], Some(&filter("score = '90' AND dept = 'CS'")), None, false)
            .unwrap();
        assert_eq!(rows, swapped);
        assert_eq!(t.select(&["*"], None, None, false).unwrap().len(), 3);
        assert!(matches!(
            t.select(&["nope"], None, None, false),
            Err(DbError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_where_compares_text() {
        let mut t = table("t", &[("n", DataType::Integer)]);
        for n in ["9", "10", "100"] {
            t.insert_row(row(&[n])).unwrap();
        }
        // text order: "9" > "10" and "100" > "10"
        let rows = t.select(&["n"], Some(&filter("n > '10'")), None, false).unwrap();
        assert_eq!(rows, vec![row(&["9"]), row(&["100"])]);
    }

    #[test]
    fn test_order_by_unprojected_column() {
        let mut t = table("t", &[("name", DataType::String), ("age", DataType::Integer)]);
        t.insert_row(row(&["a", "10"])).unwrap();
        t.insert_row(row(&["b", "9"])).unwrap();
        t.insert_row(row(&["c", ""])).unwrap();
        let rows = t.select(&["name"], None, Some("age"), false).unwrap();
        assert_eq!(rows, vec![row(&["c"]), row(&["b"]), row(&["a"])]);
        let rows = t.select(&["name"], None, Some("age"), true).unwrap();
        assert_eq!(rows, vec![row(&["a"]), row(&["b"]), row(&["c"])]);
    }

    #[test]
    fn test_update() {
        let mut t = scores();
        t.create_index("dept").unwrap();
        assert!(
            t.update_rows(&["dept"], &["ME"], Some(&filter("name = 'kim'")))
                .unwrap()
        );
        assert_eq!(t.rows()[0], row(&["kim", "ME", "80"]));
        assert_eq!(t.index("dept"), Some(&Index::build(t.rows(), 1)));
        assert!(!t.update_rows(&["dept"], &["ME"], Some(&filter("name = 'x'"))).unwrap());
        assert!(matches!(
            t.update_rows(&["score"], &["high"], None),
            Err(DbError::TypeMismatch { .. })
        ));
        assert!(matches!(
            t.update_rows(&["score", "dept"], &["1"], None),
            Err(DbError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn test_delete_keeps_indices_consistent() {
        let mut t = scores();
        t.insert_row(row(&["choi", "EE", "60"])).unwrap();
        t.create_index("dept").unwrap();
        t.create_index("score").unwrap();
        assert!(t.delete_rows(Some(&filter("name = 'lee'"))).unwrap());
        assert_eq!(t.rows().len(), 3);
        assert_eq!(t.index("dept"), Some(&Index::build(t.rows(), 1)));
        assert_eq!(t.index("score"), Some(&Index::build(t.rows(), 2)));
        let ee: Vec<usize> = t.index("dept").unwrap().positions("EE").unwrap().iter().copied().collect();
        assert_eq!(ee, vec![1, 2]);
        assert!(!t.delete_rows(Some(&filter("name = 'nobody'"))).unwrap());
        assert!(t.delete_rows(None).unwrap());
        assert!(t.index("dept").unwrap().is_empty());
    }

    #[test]
    fn test_insert_maintains_index() {
        let mut t = scores();
        t.create_index("dept").unwrap();
        t.insert_row(row(&["choi", "CS", "60"])).unwrap();
        assert_eq!(t.index("dept"), Some(&Index::build(t.rows(), 1)));
        assert!(t.drop_index("dept"));
        assert!(!t.drop_index("dept"));
        assert!(t.create_index("zzz").is_err());
    }

    fn students_courses() -> (Table, Table) {
        let mut students = table("Students", &[("ID", DataType::Integer), ("Name", DataType::String)]);
        students.insert_row(row(&["1", "A"])).unwrap();
        students.insert_row(row(&["2", "B"])).unwrap();
        let mut courses = table(
            "Courses",
            &[("StudentID", DataType::Integer), ("Course", DataType::String)],
        );
        courses.insert_row(row(&["1", "X"])).unwrap();
        (students, courses)
    }

    #[test]
    fn test_join() {
        let (students, mut courses) = students_courses();
        assert_eq!(
            students.join(&courses, "ID", "StudentID", JoinKind::Inner).unwrap(),
            vec![row(&["1", "A", "1", "X"])]
        );
        assert_eq!(
            students.join(&courses, "ID", "StudentID", JoinKind::Left).unwrap(),
            vec![row(&["1", "A", "1", "X"]), row(&["2", "B", "NULL", "NULL"])]
        );
        courses.insert_row(row(&["3", "Y"])).unwrap();
        assert_eq!(
            students.join(&courses, "ID", "StudentID", JoinKind::Full).unwrap(),
            vec![
                row(&["1", "A", "1", "X"]),
                row(&["2", "B", "NULL", "NULL"]),
                row(&["NULL", "NULL", "3", "Y"]),
            ]
        );
    }

    #[test]
    fn test_group_by() {
        let t = scores();
        assert_eq!(
            aggregate(&t, "SELECT dept, AVG(score) FROM t GROUP BY dept").unwrap(),
            vec![row(&["CS", "85"]), row(&["EE", "70"])]
        );
        assert_eq!(
            aggregate(&t, "SELECT dept, AVG(score) FROM t GROUP BY dept HAVING AVG(score) > 75")
                .unwrap(),
            vec![row(&["CS", "85"])]
        );
        assert_eq!(
            aggregate(&t, "SELECT COUNT(*), dept FROM t GROUP BY dept HAVING COUNT(*) = 1")
                .unwrap(),
            vec![row(&["1", "EE"])]
        );
    }

    #[test]
    fn test_group_by_requires_grouped_columns() {
        let t = scores();
        assert!(matches!(
            aggregate(&t, "SELECT name, COUNT(*) FROM t GROUP BY dept"),
            Err(DbError::NotGrouped(_))
        ));
    }

    #[test]
    fn test_aggregate_without_group() {
        let t = scores();
        assert_eq!(
            aggregate(&t, "SELECT COUNT(*), SUM(score), MAX(score), MIN(name) FROM t").unwrap(),
            vec![row(&["3", "240", "90", "kim"])]
        );
        assert_eq!(
            aggregate(&t, "SELECT dept, COUNT(*) FROM t WHERE dept = 'EE'").unwrap(),
            vec![row(&["EE", "1"])]
        );
        assert_eq!(
            aggregate(&t, "SELECT COUNT(*), AVG(score) FROM t WHERE dept = 'none'").unwrap(),
            vec![row(&["0", ""])]
        );
        assert!(
            aggregate(&t, "SELECT COUNT(*) FROM t HAVING COUNT(*) > 5")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_with_rows_checks_arity() {
        let columns = vec![ColumnDef::new("a", DataType::String)];
        assert!(Table::with_rows("t", columns.clone(), vec![row(&["1", "2"])]).is_err());
        let t = Table::with_rows("t", columns, vec![row(&["x"])]).unwrap();
        assert_eq!(t.rows().len(), 1);
    }
}
