//! Relevance scoring of literature records against the query that found them.
//!
//! Each query term scores 3 when it appears in the title and 1 when it
//! appears in the abstract (case-insensitive substring match). Recent work
//! earns a bonus of 2 (published within 2 years) or 1 (within 5 years). The
//! total is clamped to `0..=100`. Records without a title or a readable
//! publication year get [`DEFAULT_SCORE`].
//!
//! Scores are attached for display and caller-side sorting only; nothing here
//! reorders results.

use crate::client::LiteratureItem;
use chrono::{Datelike, Utc};

pub const DEFAULT_SCORE: u8 = 50;
pub const MAX_SCORE: u8 = 100;

const TITLE_HIT: u32 = 3;
const ABSTRACT_HIT: u32 = 1;

/// The fields of a literature record the scorer reads
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringInput<'a> {
    pub title: Option<&'a str>,
    pub abstract_text: Option<&'a str>,
    pub publish_date: Option<&'a str>,
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl<'a> From<&'a LiteratureItem> for ScoringInput<'a> {
    fn from(item: &'a LiteratureItem) -> Self {
        Self {
            title: non_empty(&item.title),
            abstract_text: non_empty(&item.abstract_text),
            publish_date: non_empty(&item.publish_date),
        }
    }
}

/// Score a record against `query` using the current calendar year
#[must_use]
pub fn relevance_score(input: &ScoringInput<'_>, query: &str) -> u8 {
    relevance_score_at(input, query, Utc::now().year())
}

/// Score a record against `query` as of `current_year`
#[must_use]
pub fn relevance_score_at(input: &ScoringInput<'_>, query: &str, current_year: i32) -> u8 {
    try_score(input, query, current_year).unwrap_or(DEFAULT_SCORE)
}

fn try_score(input: &ScoringInput<'_>, query: &str, current_year: i32) -> Option<u8> {
    let title = input.title?.to_lowercase();
    let abstract_text = input.abstract_text.unwrap_or_default().to_lowercase();
    let year = publication_year(input.publish_date?)?;

    let mut score: u32 = 0;
    for term in query.split_whitespace().map(str::to_lowercase) {
        if title.contains(&term) {
            score += TITLE_HIT;
        }
        if abstract_text.contains(&term) {
            score += ABSTRACT_HIT;
        }
    }

    let age = current_year - year;
    if age <= 2 {
        score += 2;
    } else if age <= 5 {
        score += 1;
    }

    u8::try_from(score.min(u32::from(MAX_SCORE))).ok()
}

/// First four-digit run in an upstream date such as `"2023 Jan 5"` or
/// `"2021-04-01"`
fn publication_year(date: &str) -> Option<i32> {
    date.split(|c: char| !c.is_ascii_digit())
        .find(|token| token.len() == 4)
        .and_then(|token| token.parse().ok())
}
