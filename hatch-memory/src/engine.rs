use crate::parser::{ColumnDef, Expr, Filter, Parsed, Projection, Statement};
use hatch_core::{
    ColumnMetadata, Error, GenericSqlWriter, Result, ResultSet, ResultSetMetadata, Row,
    RowNames, RowsAffected, SqlWriter, Value,
};
use std::collections::BTreeMap;

/// What the server sends back for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Rows(ResultSet),
    Affected {
        affected: RowsAffected,
        /// Identifiers assigned to the inserted rows.
        generated: Vec<i64>,
    },
}

impl Response {
    fn affected(rows: usize) -> Self {
        Response::Affected {
            affected: RowsAffected {
                rows_affected: rows as u64,
                last_affected_id: None,
            },
            generated: Vec::new(),
        }
    }
}

/// Storage class of `value`, what a column keeps whatever its declared type.
///
/// Values reaching the server as parameters and as SQL literals end up equal.
pub(crate) fn stored(value: &Value) -> Value {
    match value {
        _ if value.is_null() => Value::Null,
        Value::Boolean(Some(v)) => Value::Int64(Some(*v as i64)),
        Value::Int8(Some(v)) => Value::Int64(Some(*v as i64)),
        Value::Int16(Some(v)) => Value::Int64(Some(*v as i64)),
        Value::Int32(Some(v)) => Value::Int64(Some(*v as i64)),
        Value::Int64(Some(v)) => Value::Int64(Some(*v)),
        Value::UInt8(Some(v)) => Value::Int64(Some(*v as i64)),
        Value::UInt16(Some(v)) => Value::Int64(Some(*v as i64)),
        Value::UInt32(Some(v)) => Value::Int64(Some(*v as i64)),
        Value::UInt64(Some(v)) => match i64::try_from(*v) {
            Ok(v) => Value::Int64(Some(v)),
            Err(..) => Value::UInt64(Some(*v)),
        },
        // Shortest representation, as a literal would carry it
        Value::Float32(Some(v)) => Value::Float64(v.to_string().parse().ok()),
        Value::Float64(Some(v)) => Value::Float64(Some(*v)),
        Value::Decimal(Some(v), ..) => Value::Float64(v.to_string().parse().ok()),
        Value::Char(Some(v)) => Value::Varchar(Some(v.to_string())),
        Value::Varchar(Some(v)) => Value::Varchar(Some(v.clone())),
        Value::Blob(Some(v)) => Value::Blob(Some(v.clone())),
        Value::Date(Some(v)) => rendered(|out| GenericSqlWriter.write_value_date(out, v)),
        Value::Time(Some(v)) => rendered(|out| GenericSqlWriter.write_value_time(out, v)),
        Value::Timestamp(Some(v)) => rendered(|out| {
            GenericSqlWriter.write_value_date(out, &v.date());
            out.push(' ');
            GenericSqlWriter.write_value_time(out, &v.time());
        }),
        Value::Uuid(Some(v)) => Value::Varchar(Some(v.to_string())),
        _ => Value::Null,
    }
}

fn rendered(write: impl FnOnce(&mut String)) -> Value {
    let mut out = String::new();
    write(&mut out);
    Value::Varchar(Some(out))
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int64(Some(v)) => Some(*v as f64),
        Value::UInt64(Some(v)) => Some(*v as f64),
        Value::Float64(Some(v)) => Some(*v),
        _ => None,
    }
}

/// SQL equality of two stored values, NULL equals nothing.
pub(crate) fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        _ if left.is_null() || right.is_null() => false,
        (Value::Int64(Some(l)), Value::Int64(Some(r))) => l == r,
        _ => match (numeric(left), numeric(right)) {
            (Some(l), Some(r)) => l == r,
            _ => left == right,
        },
    }
}

fn evaluate(expr: &Expr, parameters: &[Value]) -> Value {
    match expr {
        Expr::Literal(v) => stored(v),
        Expr::Param(i) => parameters.get(*i).map(stored).unwrap_or_default(),
    }
}

#[derive(Debug)]
struct Table {
    name: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
    last_id: i64,
}

impl Table {
    fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::msg(format!(
                    "Unknown column '{}' in table '{}'",
                    name, self.name
                ))
            })
    }
    fn primary_key(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }
    fn matching(&self, filter: &Option<Filter>, parameters: &[Value]) -> Result<Vec<usize>> {
        let Some(filter) = filter else {
            return Ok((0..self.rows.len()).collect());
        };
        let column = self.column(&filter.column)?;
        let value = evaluate(&filter.value, parameters);
        Ok(self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| equals(&row[column], &value))
            .map(|(i, _)| i)
            .collect())
    }
    /// Validates `candidates` against the constraints, as if they replaced the
    /// rows at the `replaced` positions.
    fn check(&self, candidates: &[Row], replaced: &[usize]) -> Result<()> {
        for row in candidates {
            for (column, value) in self.columns.iter().zip(row.iter()) {
                if !column.nullable && value.is_null() {
                    return Err(Error::msg(format!(
                        "Column '{}' cannot be null",
                        column.name
                    )));
                }
            }
        }
        let Some(key) = self.primary_key() else {
            return Ok(());
        };
        let mut seen: Vec<&Value> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !replaced.contains(i))
            .map(|(_, row)| &row[key])
            .collect();
        for row in candidates {
            let value = &row[key];
            if seen.iter().any(|v| equals(v, value)) {
                return Err(Error::msg(format!(
                    "Duplicate entry '{}' for key 'PRIMARY'",
                    value
                )));
            }
            seen.push(value);
        }
        Ok(())
    }
    /// Identifier of an inserted row: its integer primary key, or the next
    /// value of the table counter.
    fn assign_id(&mut self, row: &Row) -> i64 {
        match self.primary_key().map(|i| &row[i]) {
            Some(Value::Int64(Some(v))) => {
                self.last_id = self.last_id.max(*v);
                *v
            }
            _ => {
                self.last_id += 1;
                self.last_id
            }
        }
    }
}

/// Tables of a memory server and the statements running on them.
#[derive(Debug, Default)]
pub(crate) struct Engine {
    tables: BTreeMap<String, Table>,
}

impl Engine {
    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::msg(format!("Table '{name}' doesn't exist")))
    }
    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::msg(format!("Table '{name}' doesn't exist")))
    }

    pub(crate) fn execute(&mut self, parsed: &Parsed, parameters: &[Value]) -> Result<Response> {
        if parameters.len() != parsed.parameters {
            return Err(Error::msg(format!(
                "The statement expects {} parameters but {} were sent",
                parsed.parameters,
                parameters.len()
            )));
        }
        match &parsed.statement {
            Statement::CreateTable {
                name,
                columns,
                if_not_exists,
            } => {
                let key = name.to_ascii_lowercase();
                if self.tables.contains_key(&key) {
                    if *if_not_exists {
                        return Ok(Response::affected(0));
                    }
                    return Err(Error::msg(format!("Table '{name}' already exists")));
                }
                self.tables.insert(
                    key,
                    Table {
                        name: name.clone(),
                        columns: columns.clone(),
                        rows: Vec::new(),
                        last_id: 0,
                    },
                );
                Ok(Response::affected(0))
            }
            Statement::DropTable { name, if_exists } => {
                if self.tables.remove(&name.to_ascii_lowercase()).is_none() && !if_exists {
                    return Err(Error::msg(format!("Unknown table '{name}'")));
                }
                Ok(Response::affected(0))
            }
            Statement::Insert {
                table,
                columns,
                rows,
            } => {
                let table = self.table_mut(table)?;
                let positions = match columns {
                    Some(names) => names
                        .iter()
                        .map(|v| table.column(v))
                        .collect::<Result<Vec<_>>>()?,
                    None => (0..table.columns.len()).collect(),
                };
                let mut inserted = Vec::with_capacity(rows.len());
                for values in rows {
                    if values.len() != positions.len() {
                        return Err(Error::msg("Column count doesn't match value count"));
                    }
                    let mut row = vec![Value::Null; table.columns.len()];
                    for (position, expr) in positions.iter().zip(values) {
                        row[*position] = evaluate(expr, parameters);
                    }
                    inserted.push(Row::from(row));
                }
                table.check(&inserted, &[])?;
                let generated: Vec<i64> = inserted.iter().map(|v| table.assign_id(v)).collect();
                table.rows.extend(inserted);
                Ok(Response::Affected {
                    affected: RowsAffected {
                        rows_affected: generated.len() as u64,
                        last_affected_id: generated.last().copied(),
                    },
                    generated,
                })
            }
            Statement::Select {
                table,
                projection,
                filter,
            } => {
                let table = self.table(table)?;
                let matching = table.matching(filter, parameters)?;
                if *projection == Projection::Count {
                    return Ok(Response::Rows(ResultSet::new(
                        ["COUNT(*)".to_string()].into(),
                        vec![[Value::Int64(Some(matching.len() as i64))].into()],
                    )));
                }
                let columns = match projection {
                    Projection::Columns(names) => names
                        .iter()
                        .map(|v| table.column(v))
                        .collect::<Result<Vec<_>>>()?,
                    _ => (0..table.columns.len()).collect(),
                };
                let labels: RowNames = columns
                    .iter()
                    .map(|i| table.columns[*i].name.clone())
                    .collect();
                let rows = matching
                    .into_iter()
                    .map(|r| columns.iter().map(|c| table.rows[r][*c].clone()).collect())
                    .collect();
                Ok(Response::Rows(ResultSet::new(labels, rows)))
            }
            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                let table = self.table_mut(table)?;
                let assignments = assignments
                    .iter()
                    .map(|(column, expr)| Ok((table.column(column)?, evaluate(expr, parameters))))
                    .collect::<Result<Vec<_>>>()?;
                let matching = table.matching(filter, parameters)?;
                let updated: Vec<Row> = matching
                    .iter()
                    .map(|i| {
                        let mut row = table.rows[*i].clone();
                        for (column, value) in &assignments {
                            row[*column] = value.clone();
                        }
                        row
                    })
                    .collect();
                table.check(&updated, &matching)?;
                for (i, row) in matching.iter().zip(updated) {
                    table.rows[*i] = row;
                }
                Ok(Response::affected(matching.len()))
            }
            Statement::Delete { table, filter } => {
                let table = self.table_mut(table)?;
                let matching = table.matching(filter, parameters)?;
                let mut position = 0;
                table.rows.retain(|_| {
                    position += 1;
                    !matching.contains(&(position - 1))
                });
                Ok(Response::affected(matching.len()))
            }
        }
    }

    /// Columns of the rows `parsed` produces, `None` when it produces none.
    pub(crate) fn describe(&self, parsed: &Parsed) -> Result<Option<ResultSetMetadata>> {
        let Statement::Select {
            table, projection, ..
        } = &parsed.statement
        else {
            return Ok(None);
        };
        let table = self.table(table)?;
        let column = |c: &ColumnDef| ColumnMetadata {
            name: c.name.clone(),
            table: table.name.clone(),
            value: c.value.clone(),
            nullable: c.nullable,
        };
        let columns = match projection {
            Projection::All => table.columns.iter().map(column).collect(),
            Projection::Columns(names) => names
                .iter()
                .map(|v| Ok(column(&table.columns[table.column(v)?])))
                .collect::<Result<_>>()?,
            Projection::Count => vec![ColumnMetadata {
                name: "COUNT(*)".into(),
                table: String::new(),
                value: Value::Int64(None),
                nullable: false,
            }],
        };
        Ok(Some(ResultSetMetadata { columns }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(engine: &mut Engine, sql: &str, parameters: &[Value]) -> Result<Response> {
        engine.execute(&parse(sql)?, parameters)
    }

    fn rows(response: Response) -> Vec<Row> {
        match response {
            Response::Rows(v) => v.rows,
            other => panic!("Expected rows, got {other:?}"),
        }
    }

    #[test]
    fn storage_classes() {
        assert_eq!(stored(&Value::Boolean(Some(true))), Value::Int64(Some(1)));
        assert_eq!(stored(&Value::UInt8(Some(7))), Value::Int64(Some(7)));
        assert_eq!(stored(&Value::Float32(Some(0.1))), Value::Float64(Some(0.1)));
        assert_eq!(stored(&Value::Char(Some('x'))), Value::Varchar(Some("x".into())));
        assert_eq!(stored(&Value::Int32(None)), Value::Null);
        assert!(equals(&Value::Int64(Some(2)), &Value::Float64(Some(2.0))));
        assert!(!equals(&Value::Null, &Value::Null));
    }

    #[test]
    fn insert_select_update_delete() {
        let mut engine = Engine::default();
        run(
            &mut engine,
            "CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(10))",
            &[],
        )
        .unwrap();
        let inserted = run(
            &mut engine,
            "INSERT INTO t VALUES (?, ?), (2, 'two')",
            &[Value::Int32(Some(1)), Value::Varchar(Some("one".into()))],
        )
        .unwrap();
        assert_eq!(
            inserted,
            Response::Affected {
                affected: RowsAffected {
                    rows_affected: 2,
                    last_affected_id: Some(2),
                },
                generated: vec![1, 2],
            }
        );
        let found = rows(
            run(
                &mut engine,
                "SELECT name FROM t WHERE id = ?",
                &[Value::UInt64(Some(2))],
            )
            .unwrap(),
        );
        assert_eq!(found, vec![Row::from([Value::Varchar(Some("two".into()))])]);

        let updated = run(&mut engine, "UPDATE t SET name = NULL WHERE id = 1", &[]).unwrap();
        assert_eq!(updated, Response::affected(1));
        let deleted = run(&mut engine, "DELETE FROM t WHERE name = 'two'", &[]).unwrap();
        assert_eq!(deleted, Response::affected(1));
        let count = rows(run(&mut engine, "SELECT COUNT(*) FROM t", &[]).unwrap());
        assert_eq!(count, vec![Row::from([Value::Int64(Some(1))])]);
    }

    #[test]
    fn constraints() {
        let mut engine = Engine::default();
        run(
            &mut engine,
            "CREATE TABLE t (id BIGINT PRIMARY KEY, v TEXT NOT NULL)",
            &[],
        )
        .unwrap();
        run(&mut engine, "INSERT INTO t VALUES (1, 'a')", &[]).unwrap();
        let error = run(&mut engine, "INSERT INTO t VALUES (3, 'c'), (1, 'b')", &[]).unwrap_err();
        assert_eq!(error.to_string(), "Duplicate entry '1' for key 'PRIMARY'");
        let error = run(&mut engine, "INSERT INTO t (id) VALUES (4)", &[]).unwrap_err();
        assert_eq!(error.to_string(), "Column 'v' cannot be null");
        let error = run(&mut engine, "SELECT * FROM missing", &[]).unwrap_err();
        assert_eq!(error.to_string(), "Table 'missing' doesn't exist");
        // Nothing of the failed statements was applied
        let count = rows(run(&mut engine, "SELECT COUNT(*) FROM t", &[]).unwrap());
        assert_eq!(count, vec![Row::from([Value::Int64(Some(1))])]);
    }

    #[test]
    fn describe_select() {
        let mut engine = Engine::default();
        run(&mut engine, "CREATE TABLE t (id INT PRIMARY KEY, at DATETIME)", &[]).unwrap();
        let metadata = engine
            .describe(&parse("SELECT at FROM t WHERE id = ?").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(metadata.column_count(), 1);
        let column = metadata.column(0).unwrap();
        assert_eq!(column.name, "at");
        assert_eq!(column.table, "t");
        assert_eq!(column.value, Value::Timestamp(None));
        assert!(column.nullable);
        assert_eq!(
            engine.describe(&parse("DELETE FROM t").unwrap()).unwrap(),
            None
        );
    }
}
