/*
 * Responsibility
 * - Movies の request/response DTO
 * - validation (形式チェック) と release_date の解釈
 */
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repos::movie_repo::MovieRow;

#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    pub title: Option<String>,
    pub release_date: Option<String>,
}

impl CreateMovieRequest {
    /// Returns the trimmed title and parsed release date.
    pub fn validate(&self) -> Result<(String, DateTime<Utc>), &'static str> {
        let title = match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err("title is required"),
        };
        let release_date = match self.release_date.as_deref() {
            Some(raw) => parse_release_date(raw).ok_or("release_date is not a date")?,
            None => return Err("release_date is required"),
        };

        Ok((title, release_date))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub release_date: Option<String>,
}

impl UpdateMovieRequest {
    pub fn validate(&self) -> Result<(Option<String>, Option<DateTime<Utc>>), &'static str> {
        if self.title.is_none() && self.release_date.is_none() {
            return Err("nothing to update");
        }
        let title = match self.title.as_deref().map(str::trim) {
            Some("") => return Err("title cannot be empty"),
            Some(t) => Some(t.to_string()),
            None => None,
        };
        let release_date = match self.release_date.as_deref() {
            Some(raw) => Some(parse_release_date(raw).ok_or("release_date is not a date")?),
            None => None,
        };

        Ok((title, release_date))
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// RFC 3339, RFC 2822, a zone-less datetime, or a bare `YYYY-MM-DD`.
/// Zone-less values are read as UTC. A leading weekday is ignored.
pub fn parse_release_date(raw: &str) -> Option<DateTime<Utc>> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let raw = match collapsed.split_once(", ") {
        Some((weekday, rest)) if weekday.chars().all(|c| c.is_ascii_alphabetic()) => rest,
        _ => collapsed.as_str(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub id: i32,
    pub title: String,
    pub release_date: String,
}

impl From<MovieRow> for MovieResponse {
    fn from(row: MovieRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            release_date: row.release_date.to_rfc3339(),
        }
    }
}
