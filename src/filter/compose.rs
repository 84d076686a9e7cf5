use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterValue, Filters, SelectOptions, SqlQuery};
use crate::config;

/// Composes parameterized SQL from typed filter specifications.
///
/// Every statement wraps its result set in `row_to_json` so the data layer
/// returns plain JSON rows regardless of table shape. The WHERE composition is
/// shared by select, update and delete so "what I can see" and "what I can
/// modify" are always computed the same way.
pub struct Compose;

impl Compose {
    pub fn select(
        table: &str,
        columns: &[&str],
        filters: &Filters,
        options: &SelectOptions,
    ) -> Result<SqlQuery, FilterError> {
        validate_table_name(table)?;
        let select_clause = build_select_clause(columns)?;
        let (where_clause, params) = build_where(filters, 1)?;
        let order_clause = build_order_clause(options)?;
        let limit_clause = build_limit_clause(options)?;

        let inner = [
            format!("SELECT {} FROM \"{}\"", select_clause, table),
            if where_clause.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", where_clause)
            },
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlQuery {
            sql: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner),
            params,
        })
    }

    pub fn insert(table: &str, row: &Value) -> Result<SqlQuery, FilterError> {
        validate_table_name(table)?;
        let obj = row.as_object().filter(|o| !o.is_empty()).ok_or(FilterError::InvalidRow)?;

        let mut columns = Vec::with_capacity(obj.len());
        let mut placeholders = Vec::with_capacity(obj.len());
        let mut params = Vec::with_capacity(obj.len());
        for (idx, (column, value)) in obj.iter().enumerate() {
            validate_column_name(column)?;
            columns.push(format!("\"{}\"", column));
            placeholders.push(format!("${}", idx + 1));
            params.push(value.clone());
        }

        let sql = format!(
            "WITH r AS (INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *) SELECT row_to_json(r) AS row FROM r",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(SqlQuery { sql, params })
    }

    pub fn update(table: &str, patch: &Value, filters: &Filters) -> Result<SqlQuery, FilterError> {
        validate_table_name(table)?;
        if filters.is_empty() {
            return Err(FilterError::UnscopedWrite("update"));
        }
        let obj = patch.as_object().filter(|o| !o.is_empty()).ok_or(FilterError::InvalidRow)?;

        let mut assignments = Vec::with_capacity(obj.len());
        let mut params = Vec::with_capacity(obj.len());
        for (idx, (column, value)) in obj.iter().enumerate() {
            validate_column_name(column)?;
            assignments.push(format!("\"{}\" = ${}", column, idx + 1));
            params.push(value.clone());
        }

        let (where_clause, where_params) = build_where(filters, params.len() + 1)?;
        params.extend(where_params);

        let sql = format!(
            "WITH r AS (UPDATE \"{}\" SET {} WHERE {} RETURNING *) SELECT row_to_json(r) AS row FROM r",
            table,
            assignments.join(", "),
            where_clause
        );
        Ok(SqlQuery { sql, params })
    }

    pub fn delete(table: &str, filters: &Filters) -> Result<SqlQuery, FilterError> {
        validate_table_name(table)?;
        if filters.is_empty() {
            return Err(FilterError::UnscopedWrite("delete"));
        }
        let (where_clause, params) = build_where(filters, 1)?;

        let sql = format!(
            "WITH r AS (DELETE FROM \"{}\" WHERE {} RETURNING *) SELECT row_to_json(r) AS row FROM r",
            table, where_clause
        );
        Ok(SqlQuery { sql, params })
    }

    /// Call a named store function taking a single jsonb payload.
    pub fn rpc(name: &str, params: Value) -> Result<SqlQuery, FilterError> {
        if !is_valid_identifier(name) {
            return Err(FilterError::InvalidFunctionName(name.to_string()));
        }
        Ok(SqlQuery {
            sql: format!("SELECT to_jsonb(\"{}\"($1)) AS result", name),
            params: vec![params],
        })
    }

    /// Shared WHERE composition: iterate filters in insertion order, classify
    /// each predicate, AND them together.
    pub fn where_clause(filters: &Filters) -> Result<(String, Vec<Value>), FilterError> {
        build_where(filters, 1)
    }
}

fn build_where(filters: &Filters, start_index: usize) -> Result<(String, Vec<Value>), FilterError> {
    let mut conditions = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    let mut next = start_index;

    for (column, value) in filters.iter() {
        validate_column_name(column)?;
        match value {
            FilterValue::Eq(Value::Null) => {
                conditions.push(format!("\"{}\" IS NULL", column));
            }
            FilterValue::Eq(v) => {
                conditions.push(format!("\"{}\" = ${}", column, next));
                params.push(v.clone());
                next += 1;
            }
            FilterValue::In(values) if values.is_empty() => {
                // Membership in the empty set matches nothing
                conditions.push("FALSE".to_string());
            }
            FilterValue::In(values) => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        let p = format!("${}", next);
                        params.push(v.clone());
                        next += 1;
                        p
                    })
                    .collect();
                conditions.push(format!("\"{}\" IN ({})", column, placeholders.join(", ")));
            }
            FilterValue::ILike(pattern) => {
                conditions.push(format!("\"{}\" ILIKE ${}", column, next));
                params.push(Value::String(pattern.clone()));
                next += 1;
            }
        }
    }

    Ok((conditions.join(" AND "), params))
}

fn build_select_clause(columns: &[&str]) -> Result<String, FilterError> {
    if columns.is_empty() || columns.contains(&"*") {
        return Ok("*".to_string());
    }
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        validate_column_name(column)?;
        parts.push(format!("\"{}\"", column));
    }
    Ok(parts.join(", "))
}

fn build_order_clause(options: &SelectOptions) -> Result<String, FilterError> {
    match &options.order {
        Some(order) => {
            validate_column_name(&order.column)?;
            Ok(format!(
                "ORDER BY \"{}\" {}",
                order.column,
                order.direction.to_sql()
            ))
        }
        None => Ok(String::new()),
    }
}

fn build_limit_clause(options: &SelectOptions) -> Result<String, FilterError> {
    let max_limit = config::CONFIG.query.max_limit;
    let limit = match options.limit {
        Some(l) if l < 0 => {
            return Err(FilterError::InvalidLimit("limit must be non-negative".to_string()))
        }
        Some(l) if l > max_limit => {
            tracing::debug!("limit {} exceeds max {}, capping", l, max_limit);
            Some(max_limit)
        }
        other => other,
    };
    if let Some(o) = options.offset {
        if o < 0 {
            return Err(FilterError::InvalidOffset("offset must be non-negative".to_string()));
        }
    }
    Ok(match (limit, options.offset) {
        (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
        (Some(l), None) => format!("LIMIT {}", l),
        (None, Some(o)) => format!("OFFSET {}", o),
        (None, None) => String::new(),
    })
}

fn validate_table_name(name: &str) -> Result<(), FilterError> {
    if !is_valid_identifier(name) {
        return Err(FilterError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

fn validate_column_name(name: &str) -> Result<(), FilterError> {
    if !is_valid_identifier(name) {
        return Err(FilterError::InvalidColumn(name.to_string()));
    }
    Ok(())
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
