//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Documents are stored relationally: `documents → pages → lines →
//! coordinates`, each child table cascading on delete. Queries render the
//! filter expression to SQL via [`crate::sql::render`].

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use pagegrep_core::filter::Query;
use pagegrep_core::models::{Coordinates, Document, DocumentKey, Line, Page, Point};
use pagegrep_core::store::{DocumentStore, StoreError};

use crate::migrate;
use crate::sql;

/// Keys per `DELETE ... IN (...)` statement.
const DELETE_CHUNK: usize = 500;

/// SQLite implementation of the [`DocumentStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn upsert_one(&self, doc: &Document) -> Result<(), StoreError> {
        let file = format!("{}/{}", doc.bucket, doc.key);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::write(format!("begin upsert of {}", file), e))?;

        sqlx::query(
            "INSERT INTO documents (id, bucket, object_key) VALUES (?, ?, ?) \
             ON CONFLICT(bucket, object_key) DO NOTHING",
        )
        .bind(&doc.id)
        .bind(&doc.bucket)
        .bind(&doc.key)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::write(format!("insert document {}", file), e))?;

        // An existing document keeps its identity key.
        let id: String =
            sqlx::query_scalar("SELECT id FROM documents WHERE bucket = ? AND object_key = ?")
                .bind(&doc.bucket)
                .bind(&doc.key)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| StoreError::write(format!("resolve document {}", file), e))?;

        sqlx::query("DELETE FROM pages WHERE document_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::write(format!("clear pages of {}", file), e))?;

        insert_pages(&mut tx, &id, &doc.pages)
            .await
            .map_err(|e| StoreError::write(format!("insert pages of {}", file), e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::write(format!("commit upsert of {}", file), e))?;
        Ok(())
    }
}

async fn insert_pages(
    tx: &mut Transaction<'_, Sqlite>,
    document_id: &str,
    pages: &[Page],
) -> Result<(), sqlx::Error> {
    for (page_pos, page) in pages.iter().enumerate() {
        sqlx::query("INSERT INTO pages (id, document_id, page_number, position) VALUES (?, ?, ?, ?)")
            .bind(&page.id)
            .bind(document_id)
            .bind(page.page_number)
            .bind(page_pos as i64)
            .execute(&mut **tx)
            .await?;

        for (line_pos, line) in page.lines.iter().enumerate() {
            sqlx::query("INSERT INTO lines (id, page_id, text, position) VALUES (?, ?, ?, ?)")
                .bind(&line.id)
                .bind(&page.id)
                .bind(&line.text)
                .bind(line_pos as i64)
                .execute(&mut **tx)
                .await?;

            let c = &line.coordinates;
            sqlx::query(
                r#"
                INSERT INTO coordinates (id, line_id,
                    top_left_x, top_left_y, top_right_x, top_right_y,
                    bottom_left_x, bottom_left_y, bottom_right_x, bottom_right_y)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&c.id)
            .bind(&line.id)
            .bind(c.top_left.x)
            .bind(c.top_left.y)
            .bind(c.top_right.x)
            .bind(c.top_right.y)
            .bind(c.bottom_left.x)
            .bind(c.bottom_left.y)
            .bind(c.bottom_right.x)
            .bind(c.bottom_right.y)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::decode(format!("column {}", name), e))
}

fn point(row: &SqliteRow, prefix: &str) -> Result<Point, StoreError> {
    Ok(Point::new(
        col(row, &format!("{}_x", prefix))?,
        col(row, &format!("{}_y", prefix))?,
    ))
}

/// Rebuild document trees from rows ordered by document, page, line.
fn assemble(rows: &[SqliteRow]) -> Result<Vec<Document>, StoreError> {
    let mut docs: Vec<Document> = Vec::new();
    for row in rows {
        let doc_id: String = col(row, "document_id")?;
        if docs.last().is_none_or(|d| d.id != doc_id) {
            docs.push(Document {
                id: doc_id,
                bucket: col(row, "bucket")?,
                key: col(row, "object_key")?,
                pages: Vec::new(),
            });
        }
        let Some(doc) = docs.last_mut() else { continue };

        let page_id: Option<String> = col(row, "page_id")?;
        let Some(page_id) = page_id else { continue };
        if doc.pages.last().is_none_or(|p| p.id != page_id) {
            doc.pages.push(Page {
                id: page_id,
                page_number: col(row, "page_number")?,
                lines: Vec::new(),
            });
        }
        let Some(page) = doc.pages.last_mut() else { continue };

        let line_id: Option<String> = col(row, "line_id")?;
        let Some(line_id) = line_id else { continue };
        let coord_id: Option<String> = col(row, "coord_id")?;
        let Some(coord_id) = coord_id else {
            return Err(StoreError::decode(
                format!("line {}", line_id),
                "line has no coordinates",
            ));
        };
        page.lines.push(Line {
            id: line_id,
            text: col(row, "text")?,
            coordinates: Coordinates {
                id: coord_id,
                top_left: point(row, "top_left")?,
                top_right: point(row, "top_right")?,
                bottom_left: point(row, "bottom_left")?,
                bottom_right: point(row, "bottom_right")?,
            },
        });
    }
    Ok(docs)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn setup(&self) -> Result<(), StoreError> {
        migrate::run_migrations(&self.pool)
            .await
            .map_err(|e| StoreError::ddl("create schema", e))
    }

    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError> {
        for doc in documents {
            self.upsert_one(doc).await?;
            tracing::debug!(bucket = %doc.bucket, key = %doc.key, lines = doc.line_count(), "upserted document");
        }
        Ok(())
    }

    async fn delete(&self, keys: &[DocumentKey]) -> Result<(), StoreError> {
        for chunk in keys.chunks(DELETE_CHUNK) {
            let stmt = format!(
                "DELETE FROM documents WHERE id IN ({})",
                sql::placeholders(chunk.len())
            );
            let mut q = sqlx::query(&stmt);
            for key in chunk {
                q = q.bind(key);
            }
            q.execute(&self.pool)
                .await
                .map_err(|e| StoreError::write(format!("delete {} documents", chunk.len()), e))?;
        }
        Ok(())
    }

    async fn delete_by_file_info(&self, query: &Query) -> Result<(), StoreError> {
        let predicate = sql::render(query);
        let stmt = format!(
            "DELETE FROM documents WHERE id IN (SELECT d.id FROM documents d WHERE {})",
            predicate.clause
        );
        sql::bind_values(sqlx::query(&stmt), &predicate.binds)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write("delete by file info", e))?;
        Ok(())
    }

    async fn query_documents(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let predicate = sql::render(query);
        let stmt = format!(
            r#"
            WITH matched AS (
                SELECT d.id, d.rowid AS seq FROM documents d WHERE {}
            )
            SELECT doc.id AS document_id, doc.bucket, doc.object_key,
                   p.id AS page_id, p.page_number,
                   l.id AS line_id, l.text,
                   c.id AS coord_id,
                   c.top_left_x, c.top_left_y, c.top_right_x, c.top_right_y,
                   c.bottom_left_x, c.bottom_left_y, c.bottom_right_x, c.bottom_right_y
            FROM matched m
            JOIN documents doc ON doc.id = m.id
            LEFT JOIN pages p ON p.document_id = doc.id
            LEFT JOIN lines l ON l.page_id = p.id
            LEFT JOIN coordinates c ON c.line_id = l.id
            ORDER BY m.seq, p.position, l.position
            "#,
            predicate.clause
        );
        let rows = sql::bind_values(sqlx::query(&stmt), &predicate.binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::read("query documents", e))?;
        assemble(&rows)
    }

    async fn query_document_keys(&self, query: &Query) -> Result<Vec<DocumentKey>, StoreError> {
        let predicate = sql::render(query);
        let stmt = format!(
            "SELECT d.id FROM documents d WHERE {} ORDER BY d.rowid",
            predicate.clause
        );
        let rows = sql::bind_values(sqlx::query(&stmt), &predicate.binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::read("query document keys", e))?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("id")
                    .map_err(|e| StoreError::read("decode document key", e))
            })
            .collect()
    }

    async fn count_documents(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::read("count documents", e))?;
        Ok(n as u64)
    }
}
