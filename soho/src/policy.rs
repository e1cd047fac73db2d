//! Policy candidate lookup against the external support-program database.
//!
//! The database is a pre-existing read-only SQLite file owned elsewhere:
//! a `policies` table plus a `policies_fts` FTS5 index over title and
//! conditions. Lookup is two independent strategies composed by
//! [`search_candidates`]: full-text first, scored substring matching as
//! the fallback.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, Row, named_params};
use serde::Serialize;

use crate::error::Result;
use crate::profile::ClientProfile;

/// Default cap on returned candidates.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 30;

/// One row from the `policies` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyCandidate {
    /// Row id.
    pub id: i64,
    /// Program title.
    pub title: String,
    /// Target region.
    pub region: Option<String>,
    /// Target industry.
    pub industry: Option<String>,
    /// Application period.
    pub period: Option<String>,
    /// Eligibility conditions, free text.
    pub conditions: Option<String>,
    /// Comma-separated hashtags.
    pub hashtags: Option<String>,
    /// Program URL.
    pub url: Option<String>,
    /// Data source label.
    pub source: Option<String>,
}

impl PolicyCandidate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
            region: row.get("region")?,
            industry: row.get("industry")?,
            period: row.get("period")?,
            conditions: row.get("conditions")?,
            hashtags: row.get("hashtags")?,
            url: row.get("url")?,
            source: row.get("source")?,
        })
    }
}

/// Default search query: business type, region and purpose concatenated.
#[must_use]
pub fn default_query(profile: &ClientProfile) -> String {
    let mut parts = vec![profile.biz_type.as_str(), profile.region.as_str()];
    if let Some(purpose) = profile.purpose.as_deref() {
        parts.push(purpose);
    }
    parts.join(" ").trim().to_owned()
}

/// Full-text search over the `policies_fts` index.
///
/// Query terms are AND-joined as prefix matches (`term*`). FTS5 syntax
/// errors are treated as "no results", not propagated — the caller falls
/// back to [`search_like`].
pub fn search_fts(conn: &Connection, query: &str, limit: usize) -> Vec<PolicyCandidate> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| format!("{t}*"))
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }
    let match_expr = terms.join(" AND ");

    let result = conn
        .prepare(
            "SELECT p.* FROM policies_fts \
             JOIN policies p ON p.id = policies_fts.rowid \
             WHERE policies_fts MATCH ?1 \
             LIMIT ?2",
        )
        .and_then(|mut stmt| {
            stmt.query_map(rusqlite::params![match_expr, limit as i64], |row| {
                PolicyCandidate::from_row(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
        });

    match result {
        Ok(rows) => rows,
        Err(e) => {
            tracing::debug!("FTS query failed, treating as empty: {e}");
            Vec::new()
        }
    }
}

/// Substring fallback search, scored by which field matched.
///
/// Title hits score 3, conditions 2, hashtags 1. Rows must also match the
/// profile's region and industry, either exactly or as a substring of any
/// text field. Ordered by score then id, both descending.
///
/// # Errors
///
/// Returns a database error when the schema does not match.
pub fn search_like(
    conn: &Connection,
    profile: &ClientProfile,
    query: &str,
    limit: usize,
) -> Result<Vec<PolicyCandidate>> {
    let mut stmt = conn.prepare(
        "SELECT p.*, \
           CASE \
             WHEN p.title LIKE :q_like THEN 3 \
             WHEN p.conditions LIKE :q_like THEN 2 \
             WHEN p.hashtags LIKE :q_like THEN 1 \
             ELSE 0 \
           END AS score \
         FROM policies p \
         WHERE (p.title LIKE :q_like OR p.conditions LIKE :q_like OR p.hashtags LIKE :q_like) \
           AND (p.region = :region OR p.title LIKE :region_like \
                OR p.conditions LIKE :region_like OR p.hashtags LIKE :region_like) \
           AND (p.industry = :industry OR p.title LIKE :industry_like \
                OR p.conditions LIKE :industry_like OR p.hashtags LIKE :industry_like) \
         ORDER BY score DESC, p.id DESC \
         LIMIT :limit",
    )?;

    let rows = stmt
        .query_map(
            named_params! {
                ":q_like": format!("%{query}%"),
                ":region": profile.region,
                ":region_like": format!("%{}%", profile.region),
                ":industry": profile.biz_type,
                ":industry_like": format!("%{}%", profile.biz_type),
                ":limit": limit as i64,
            },
            |row| PolicyCandidate::from_row(row),
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Searches the policy database for candidate programs.
///
/// A missing or nonexistent database path short-circuits to an empty
/// result. Full-text search runs first; when it yields nothing (or the
/// query is blank) the scored substring fallback runs instead.
///
/// # Errors
///
/// Returns a database error when the file cannot be opened or the
/// fallback query fails.
pub fn search_candidates(
    db_path: Option<&Path>,
    profile: &ClientProfile,
    free_query: Option<&str>,
    limit: usize,
) -> Result<Vec<PolicyCandidate>> {
    let Some(path) = db_path else {
        return Ok(Vec::new());
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "policy database not found, skipping search");
        return Ok(Vec::new());
    }

    let derived;
    let query = match free_query {
        Some(q) => q.trim(),
        None => {
            derived = default_query(profile);
            derived.as_str()
        }
    };

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut rows = search_fts(&conn, query, limit);
    if rows.is_empty() {
        rows = search_like(&conn, profile, query, limit)?;
    }
    rows.truncate(limit);

    tracing::info!(count = rows.len(), "policy candidates found");
    Ok(rows)
}
