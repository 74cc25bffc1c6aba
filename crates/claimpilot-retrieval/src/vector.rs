//! Policy vector storage and similarity search using sqlite-vec.
//!
//! Section text lives in a regular `policy_sections` table; embeddings live in
//! a `vec0` virtual table partitioned by payer and ranked by cosine distance.
//! All functions here are synchronous and take a borrowed connection.

use std::sync::Once;

use chrono::Utc;
use claimpilot_types::PolicySection;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};
use zerocopy::IntoBytes;

use crate::error::{Result, RetrievalError};

static VEC_INIT: Once = Once::new();

/// Register sqlite-vec for every connection opened afterwards.
pub fn init_vector_extension() {
    use rusqlite::ffi::sqlite3_auto_extension;
    use sqlite_vec::sqlite3_vec_init;

    VEC_INIT.call_once(|| unsafe {
        #[allow(clippy::missing_transmute_annotations)]
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    });
}

/// Version string reported by the loaded sqlite-vec extension.
pub fn check_vector_extension(conn: &Connection) -> Result<String> {
    let version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
    Ok(version)
}

/// Create the section, vector and metadata tables.
///
/// The index remembers the dimensionality it was created with; reopening it
/// with a different size fails with [`RetrievalError::DimensionMismatch`].
pub fn create_tables(conn: &Connection, dims: usize) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS policy_sections (
            id TEXT PRIMARY KEY,
            payer_name TEXT NOT NULL,
            section_title TEXT NOT NULL,
            section_text TEXT NOT NULL,
            indexed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_policy_sections_payer
            ON policy_sections(payer_name);
        "#,
    )?;

    if let Some(existing) = stored_dimensions(conn)? {
        if existing != dims {
            return Err(RetrievalError::DimensionMismatch {
                expected: existing,
                actual: dims,
            });
        }
    } else {
        conn.execute(
            "INSERT INTO index_meta (key, value) VALUES ('dimensions', ?1)",
            params![dims.to_string()],
        )?;
    }

    let sql = format!(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS policy_vectors USING vec0(
            section_id TEXT PRIMARY KEY,
            payer_name TEXT partition key,
            embedding float[{dims}] distance_metric=cosine
        )
        "#
    );
    conn.execute_batch(&sql)?;

    info!(dims, "Policy index tables ready");
    Ok(())
}

/// Dimensionality recorded when the index was created.
pub fn stored_dimensions(conn: &Connection) -> Result<Option<usize>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = 'dimensions'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    value
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| RetrievalError::InvalidData(format!("bad dimensions value '{v}'")))
        })
        .transpose()
}

/// Store a section and its embedding, replacing any previous row with the same id.
///
/// Both tables are written in one transaction.
pub fn store_section(conn: &Connection, section: &PolicySection, embedding: &[f32]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_section(&tx, section, embedding)?;
    tx.commit()?;
    Ok(())
}

/// Store sections with their embeddings in a single transaction.
pub fn store_sections<'a>(
    conn: &Connection,
    items: impl IntoIterator<Item = (&'a PolicySection, &'a [f32])>,
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    for (section, embedding) in items {
        write_section(&tx, section, embedding)?;
        count += 1;
    }
    tx.commit()?;
    Ok(count)
}

fn write_section(conn: &Connection, section: &PolicySection, embedding: &[f32]) -> Result<()> {
    // vec0 doesn't support INSERT OR REPLACE, so delete first if exists
    conn.execute(
        "DELETE FROM policy_vectors WHERE section_id = ?1",
        params![section.id],
    )?;
    conn.execute(
        "INSERT INTO policy_vectors (section_id, payer_name, embedding) VALUES (?1, ?2, ?3)",
        params![section.id, section.payer_name, embedding.as_bytes()],
    )?;
    conn.execute(
        r#"
        INSERT OR REPLACE INTO policy_sections
            (id, payer_name, section_title, section_text, indexed_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            section.id,
            section.payer_name,
            section.section_title,
            section.section_text,
            Utc::now().to_rfc3339()
        ],
    )?;

    debug!(section_id = %section.id, "Stored policy section");
    Ok(())
}

/// A section returned by a similarity query.
#[derive(Debug, Clone)]
pub struct SectionMatch {
    pub section: PolicySection,
    /// Cosine distance from the query (lower = more similar).
    pub distance: f32,
}

/// Nearest sections for one payer, ordered by distance ascending.
pub fn search_payer(
    conn: &Connection,
    query_embedding: &[f32],
    payer_name: &str,
    limit: usize,
) -> Result<Vec<SectionMatch>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        r#"
        WITH knn AS (
            SELECT section_id, distance
            FROM policy_vectors
            WHERE embedding MATCH ?1
              AND k = ?2
              AND payer_name = ?3
        )
        SELECT s.id, s.payer_name, s.section_title, s.section_text, knn.distance
        FROM knn
        JOIN policy_sections s ON s.id = knn.section_id
        ORDER BY knn.distance
        "#,
    )?;

    let rows = stmt.query_map(
        params![query_embedding.as_bytes(), limit as i64, payer_name],
        |row| {
            Ok(SectionMatch {
                section: PolicySection {
                    id: row.get(0)?,
                    payer_name: row.get(1)?,
                    section_title: row.get(2)?,
                    section_text: row.get(3)?,
                },
                distance: row.get(4)?,
            })
        },
    )?;

    let results = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(payer = payer_name, found = results.len(), limit, "Policy search");
    Ok(results)
}

/// Payers with at least one indexed section, and their section counts.
pub fn list_payers(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT payer_name, COUNT(*) FROM policy_sections GROUP BY payer_name ORDER BY payer_name",
    )?;
    let rows = stmt.query_map([], |row| {
        let count: i64 = row.get(1)?;
        Ok((row.get::<_, String>(0)?, count as usize))
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Number of indexed sections, optionally for one payer.
pub fn count_sections(conn: &Connection, payer_name: Option<&str>) -> Result<usize> {
    let count: i64 = match payer_name {
        Some(payer) => conn.query_row(
            "SELECT COUNT(*) FROM policy_sections WHERE payer_name = ?1",
            params![payer],
            |row| row.get(0),
        )?,
        None => conn.query_row("SELECT COUNT(*) FROM policy_sections", [], |row| row.get(0))?,
    };
    Ok(count as usize)
}

/// Remove every section of a payer. Returns the number removed.
pub fn clear_payer(conn: &Connection, payer_name: &str) -> Result<usize> {
    conn.execute(
        r#"
        DELETE FROM policy_vectors
        WHERE section_id IN (SELECT id FROM policy_sections WHERE payer_name = ?1)
        "#,
        params![payer_name],
    )?;
    let removed = conn.execute(
        "DELETE FROM policy_sections WHERE payer_name = ?1",
        params![payer_name],
    )?;
    info!(payer = payer_name, removed, "Cleared payer sections");
    Ok(removed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
