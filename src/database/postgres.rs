use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::document::{id_of, project, with_identity, Document, CREATED_AT_FIELD, ID_FIELD};
use crate::database::manager::DatabaseError;
use crate::database::store::DocumentStore;
use crate::filter::filter_order::FilterOrder;
use crate::filter::filter_where::{validate_field, FilterWhere};
use crate::filter::{Condition, FindQuery};
use crate::types::Collection;

const UNIQUE_VIOLATION: &str = "23505";

/// Document store backed by one JSONB table per collection
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the collection tables and their unique indexes
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for collection in Collection::ALL {
            let table = collection.as_str();
            sqlx::query(&format!(
                r#"CREATE TABLE IF NOT EXISTS "{table}" (
                    id uuid PRIMARY KEY,
                    data jsonb NOT NULL,
                    created_at timestamptz NOT NULL DEFAULT now()
                )"#
            ))
            .execute(&self.pool)
            .await?;

            for key in collection.unique_keys() {
                let columns = key
                    .iter()
                    .map(|field| format!("(data->>'{}')", field))
                    .collect::<Vec<_>>()
                    .join(", ");
                sqlx::query(&format!(
                    r#"CREATE UNIQUE INDEX IF NOT EXISTS "{table}_{}_key" ON "{table}" ({columns})"#,
                    key.join("_")
                ))
                .execute(&self.pool)
                .await?;
            }
        }
        info!("Collection tables ready");
        Ok(())
    }

    fn map_write_error(collection: Collection, err: sqlx::Error) -> DatabaseError {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                DatabaseError::Duplicate(db.constraint().unwrap_or(collection.as_str()).to_string())
            }
            _ => DatabaseError::Sqlx(err),
        }
    }
}

fn into_document(value: Json<Value>) -> Document {
    match value.0 {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn created_at(doc: &Document) -> DateTime<Utc> {
    doc.get(CREATED_AT_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, DatabaseError> {
        let (where_clause, params) = FilterWhere::generate(&query.conditions, 0)?;
        let order_clause = FilterOrder::generate(&query.sort)?;

        let mut sql = format!(
            r#"SELECT data FROM "{}" WHERE {} {}"#,
            query.collection.as_str(),
            where_clause,
            order_clause
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if query.skip > 0 {
            sql.push_str(&format!(" OFFSET {}", query.skip));
        }
        debug!("find: {}", sql);

        let mut q = sqlx::query_scalar::<_, Json<Value>>(&sql);
        for param in params {
            q = q.bind(Json(param));
        }
        let rows = q.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(into_document)
            .map(|doc| match &query.select {
                Some(fields) => project(&doc, fields),
                None => doc,
            })
            .collect())
    }

    async fn count(&self, collection: Collection, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        let (where_clause, params) = FilterWhere::generate(conditions, 0)?;
        let sql = format!(r#"SELECT COUNT(*) FROM "{}" WHERE {}"#, collection.as_str(), where_clause);

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            q = q.bind(Json(param));
        }
        Ok(q.fetch_one(&self.pool).await?.max(0) as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let sql = format!(r#"SELECT data FROM "{}" WHERE id = $1"#, collection.as_str());
        let row = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(into_document))
    }

    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError> {
        let doc = with_identity(doc);
        let id = id_of(&doc).ok_or_else(|| DatabaseError::QueryError(format!("{} must be a UUID", ID_FIELD)))?;
        let sql = format!(
            r#"INSERT INTO "{}" (id, data, created_at) VALUES ($1, $2, $3) RETURNING data"#,
            collection.as_str()
        );
        let row = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .bind(Json(Value::Object(doc.clone())))
            .bind(created_at(&doc))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(collection, e))?;
        Ok(into_document(row))
    }

    async fn update_by_id(&self, collection: Collection, id: Uuid, patch: Document) -> Result<Option<Document>, DatabaseError> {
        let mut unset = Vec::new();
        let mut set = Document::new();
        for (key, value) in patch {
            if key == ID_FIELD {
                continue;
            }
            if value.is_null() {
                unset.push(key);
            } else {
                set.insert(key, value);
            }
        }

        let sql = format!(
            r#"UPDATE "{}" SET data = (data - $2::text[]) || $3 WHERE id = $1 RETURNING data"#,
            collection.as_str()
        );
        let row = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .bind(unset)
            .bind(Json(Value::Object(set)))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(collection, e))?;
        Ok(row.map(into_document))
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let sql = format!(r#"DELETE FROM "{}" WHERE id = $1 RETURNING data"#, collection.as_str());
        let row = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(into_document))
    }

    async fn delete_many(&self, collection: Collection, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        let (where_clause, params) = FilterWhere::generate(conditions, 0)?;
        let sql = format!(r#"DELETE FROM "{}" WHERE {}"#, collection.as_str(), where_clause);

        let mut q = sqlx::query(&sql);
        for param in params {
            q = q.bind(Json(param));
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    async fn average(
        &self,
        collection: Collection,
        group_field: &str,
        group_id: Uuid,
        value_field: &str,
    ) -> Result<Option<f64>, DatabaseError> {
        validate_field(group_field)?;
        validate_field(value_field)?;
        let sql = format!(
            r#"SELECT AVG((data->>'{value_field}')::float8) FROM "{}" WHERE data->>'{group_field}' = $1"#,
            collection.as_str()
        );
        let avg: Option<f64> = sqlx::query_scalar(&sql)
            .bind(group_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(avg)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
