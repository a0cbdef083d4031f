use crate::error::AppError;
use serde_json::Value;
use sqlx::{Executor, Sqlite};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` may appear in the payload; they become the
/// SET clause sorted by name. Arrays and objects are stored as JSON text.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: i64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::InvalidInput("Payload must be a JSON object".into()))?;

    if obj.is_empty() {
        return Err(AppError::InvalidInput("No fields provided for update".into()));
    }

    if let Some(key) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(AppError::InvalidInput(format!("Field {key} cannot be updated")));
    }

    let mut fields: Vec<(&String, &Value)> = obj.iter().collect();
    fields.sort_by_key(|(k, _)| *k);

    // Build SET clause
    let set_clause = fields
        .iter()
        .map(|(k, _)| format!("{k} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for (_, value) in fields {
        let converted = match value {
            Value::String(s) => SqlValue::String(s.clone()),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqlValue::I64(i),
                (None, Some(f)) => SqlValue::F64(f),
                _ => return Err(AppError::InvalidInput(format!("Unsupported number {n}"))),
            },
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Null => SqlValue::Null,
            Value::Array(_) | Value::Object(_) => SqlValue::String(value.to_string()),
        };
        values.push(converted);
    }

    // WHERE id = ?
    values.push(SqlValue::I64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[&str] = &["rank", "skills", "sector"];

    #[test]
    fn builds_set_clause_sorted_by_field() {
        let update = build_update_sql(
            "users",
            &json!({ "sector": "North", "rank": "Sergeant", "skills": ["K9", "EMT"] }),
            FIELDS,
            "id",
            7,
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE users SET rank = ?, sector = ?, skills = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Sergeant".into()),
                SqlValue::String("North".into()),
                SqlValue::String(r#"["K9","EMT"]"#.into()),
                SqlValue::I64(7),
            ]
        );
    }

    #[test]
    fn rejects_fields_outside_the_whitelist() {
        let err = build_update_sql("users", &json!({ "role": "webmaster" }), FIELDS, "id", 1)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("users", &json!({}), FIELDS, "id", 1).is_err());
        assert!(build_update_sql("users", &json!(["rank"]), FIELDS, "id", 1).is_err());
    }
}
