use super::{ResultSet, join};
use crate::error::{DbError, Result};
use crate::query::{Operand, Select, SelectItem, Stmt, TableRef};
use crate::storage::table::sort_by_column;
use crate::storage::{ColumnDef, DataType, Table, file};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

const EXECUTION_FAILED: &str = "query execution failed";

/// Owns the tables of the selected database and keeps them in sync with
/// `<root>/<database>/`.
///
/// Every successful mutation rewrites all table files of the database.
#[derive(Debug)]
pub struct DatabaseManager {
    root: PathBuf,
    current: Option<String>,
    tables: BTreeMap<String, Table>,
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(DbError::InvalidSchema(format!("invalid {kind} name '{name}'")));
    }
    Ok(())
}

impl DatabaseManager {
    /// Opens the data directory, creating it if needed. No database is
    /// selected yet.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| DbError::io(&root, e))?;
        Ok(Self {
            root,
            current: None,
            tables: BTreeMap::new(),
        })
    }

    pub fn current_database(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn database_dir(&self) -> Result<PathBuf> {
        self.current
            .as_ref()
            .map(|name| self.root.join(name))
            .ok_or(DbError::NoDatabaseSelected)
    }

    /// Creates and selects a new, empty database. `false` if it exists.
    pub fn create_database(&mut self, name: &str) -> Result<bool> {
        check_name("database", name)?;
        let dir = self.root.join(name);
        if dir.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&dir).map_err(|e| DbError::io(&dir, e))?;
        self.current = Some(name.to_string());
        self.tables.clear();
        info!("created database '{name}'");
        Ok(true)
    }

    pub fn drop_database(&mut self, name: &str) -> Result<bool> {
        check_name("database", name)?;
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(|e| DbError::io(&dir, e))?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
            self.tables.clear();
        }
        info!("dropped database '{name}'");
        Ok(true)
    }

    /// Selects a database, replacing the loaded tables with its files.
    pub fn use_database(&mut self, name: &str) -> Result<()> {
        check_name("database", name)?;
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(DbError::DatabaseNotFound(name.to_string()));
        }
        self.tables = file::load_database(&dir)?;
        self.current = Some(name.to_string());
        info!("using database '{name}' ({} tables)", self.tables.len());
        Ok(())
    }

    pub fn database_names(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| DbError::io(&self.root, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DbError::io(&self.root, e))?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    fn save(&self) -> Result<()> {
        let dir = self.database_dir()?;
        file::save_database(&dir, self.tables.values())?;
        debug!("saved {} tables to {}", self.tables.len(), dir.display());
        Ok(())
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDef>) -> Result<()> {
        self.database_dir()?;
        check_name("table", name)?;
        if self.tables.contains_key(name) {
            return Err(DbError::TableExists(name.to_string()));
        }
        let table = Table::new(name, columns)?;
        for column in table.columns() {
            let Some(fk) = &column.foreign_key else {
                continue;
            };
            let target = if fk.table == name {
                Some(&table)
            } else {
                self.tables.get(&fk.table)
            };
            let target = target.ok_or_else(|| {
                DbError::InvalidSchema(format!(
                    "column '{}' references missing table '{}'",
                    column.name, fk.table
                ))
            })?;
            if target.column(&fk.column).is_none() {
                return Err(DbError::InvalidSchema(format!(
                    "column '{}' references missing column '{}.{}'",
                    column.name, fk.table, fk.column
                )));
            }
        }
        self.tables.insert(name.to_string(), table);
        self.save()?;
        info!("created table '{name}'");
        Ok(())
    }

    /// Removes the table and its file. `false` if there is no such table.
    pub fn drop_table(&mut self, name: &str) -> Result<bool> {
        let dir = self.database_dir()?;
        if self.tables.remove(name).is_none() {
            return Ok(false);
        }
        file::remove_table(&dir, name)?;
        self.save()?;
        info!("dropped table '{name}'");
        Ok(true)
    }

    pub fn insert_into(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        self.database_dir()?;
        self.table_mut(name)?.insert_row(values)?;
        self.save()
    }

    /// Runs a SELECT. Several tables (comma list or JOIN) go through the
    /// cartesian-product path, one table through `Table::select` or
    /// `Table::select_with_aggregates`.
    pub fn execute_select(&self, select: &Select) -> Result<ResultSet> {
        self.database_dir()
            .and_then(|_| {
                if select.is_multi_table() {
                    join::select(&self.tables, select)
                } else {
                    self.select_single(select)
                }
            })
            .map_err(|e| e.context(EXECUTION_FAILED))
    }

    fn select_single(&self, select: &Select) -> Result<ResultSet> {
        let table_ref = select
            .from
            .first()
            .ok_or_else(|| DbError::InvalidSchema("SELECT without a table".to_string()))?;
        let table = self
            .tables
            .get(&*table_ref.name)
            .ok_or_else(|| DbError::TableNotFound(table_ref.name.to_string()))?;
        check_qualifiers(table_ref, select)?;

        if select.has_aggregates() || !select.group_by.is_empty() || select.having.is_some() {
            return aggregate_select(table, select);
        }

        let mut names: Vec<&str> = Vec::new();
        let mut columns = Vec::new();
        for item in &select.items {
            match item {
                SelectItem::Wildcard => {
                    for column in table.columns() {
                        names.push(&column.name);
                        columns.push(column.name.clone());
                    }
                }
                SelectItem::Column { column, .. } => {
                    names.push(&column.name);
                    columns.push(item.header());
                }
                SelectItem::Aggregate { .. } => {}
            }
        }
        let (order_by, desc) = match &select.order_by {
            Some(order) => (Some(&*order.column.name), order.desc),
            None => (None, false),
        };
        let rows = table.select(&names, select.filter.as_ref(), order_by, desc)?;
        Ok(ResultSet { columns, rows })
    }

    /// Runs anything but SELECT and SHOW. `Ok(false)` means nothing changed;
    /// table files are rewritten only when something did.
    pub fn execute_non_query(&mut self, stmt: &Stmt) -> Result<bool> {
        debug!("executing {}", stmt.kind());
        self.non_query(stmt).map_err(|e| e.context(EXECUTION_FAILED))
    }

    fn non_query(&mut self, stmt: &Stmt) -> Result<bool> {
        match stmt {
            Stmt::CreateDatabase { name } => self.create_database(name),
            Stmt::DropDatabase { name } => self.drop_database(name),
            Stmt::Use { name } => self.use_database(name).map(|_| true),
            Stmt::CreateTable { table, columns } => {
                let columns = columns
                    .iter()
                    .map(ColumnDef::try_from)
                    .collect::<Result<Vec<_>>>()?;
                self.create_table(table, columns).map(|_| true)
            }
            Stmt::DropTable { table } => self.drop_table(table),
            Stmt::Insert { table, values } => self.insert_into(table, values.clone()).map(|_| true),
            Stmt::Update {
                table,
                assigns,
                filter,
            } => {
                self.database_dir()?;
                let columns: Vec<&str> = assigns.iter().map(|(c, _)| &**c).collect();
                let values: Vec<&str> = assigns.iter().map(|(_, v)| v.as_str()).collect();
                let target = self.table_mut(table)?;
                let result = target.update_rows(&columns, &values, filter.as_ref());
                // a failed update may still have changed earlier rows
                if !matches!(result, Ok(false)) {
                    self.save()?;
                }
                result
            }
            Stmt::Delete { table, filter } => {
                self.database_dir()?;
                let deleted = self.table_mut(table)?.delete_rows(filter.as_ref())?;
                if deleted {
                    self.save()?;
                }
                Ok(deleted)
            }
            Stmt::Select(_) | Stmt::ShowTables | Stmt::ShowDatabases => Err(
                DbError::Unsupported(format!("{} as a non-query statement", stmt.kind())),
            ),
        }
    }

    /// `SHOW TABLES` / `SHOW DATABASES` as a one-column result.
    pub fn show(&self, stmt: &Stmt) -> Result<ResultSet> {
        let (column, names) = match stmt {
            Stmt::ShowTables => {
                self.database_dir()?;
                ("table", self.table_names())
            }
            Stmt::ShowDatabases => ("database", self.database_names()?),
            other => return Err(DbError::Unsupported(format!("{} as SHOW", other.kind()))),
        };
        Ok(ResultSet {
            columns: vec![column.to_string()],
            rows: names.into_iter().map(|name| vec![name]).collect(),
        })
    }
}

/// Qualified columns of a single-table query must name the table or its alias.
fn check_qualifiers(table_ref: &TableRef, select: &Select) -> Result<()> {
    let check = |qualifier: Option<&str>| match qualifier {
        Some(q) if q != table_ref.alias_or_name() && q != &*table_ref.name => {
            Err(DbError::UnknownAlias(q.to_string()))
        }
        _ => Ok(()),
    };
    for item in &select.items {
        match item {
            SelectItem::Column { column, .. }
            | SelectItem::Aggregate {
                arg: Some(column), ..
            } => check(column.qualifier.as_deref())?,
            _ => {}
        }
    }
    if let Some(filter) = &select.filter {
        for term in &filter.terms {
            for operand in [&term.left, &term.right] {
                if let Operand::Column(column) = operand {
                    check(column.qualifier.as_deref())?;
                }
            }
        }
    }
    if let Some(order) = &select.order_by {
        check(order.column.qualifier.as_deref())?;
    }
    Ok(())
}

fn aggregate_select(table: &Table, select: &Select) -> Result<ResultSet> {
    let mut rows = table.select_with_aggregates(
        &select.items,
        select.filter.as_ref(),
        &select.group_by,
        select.having.as_ref(),
    )?;
    let columns: Vec<String> = select.items.iter().map(SelectItem::header).collect();

    if let Some(order) = &select.order_by {
        let name: &str = &order.column.name;
        let pos = select
            .items
            .iter()
            .position(|item| match item {
                SelectItem::Column { column, alias } => {
                    alias.as_deref() == Some(name) || &*column.name == name
                }
                SelectItem::Aggregate { alias, .. } => alias.as_deref() == Some(name),
                SelectItem::Wildcard => false,
            })
            .or_else(|| columns.iter().position(|c| c == name))
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string()))?;
        let data_type = match &select.items[pos] {
            SelectItem::Column { column, .. } => table
                .column(&column.name)
                .map_or(DataType::String, |c| c.data_type),
            _ => DataType::Float,
        };
        sort_by_column(&mut rows, pos, data_type, order.desc);
    }
    Ok(ResultSet { columns, rows })
}
