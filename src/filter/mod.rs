//! Filter predicates and query-string parsing.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::entity::{Category, Lifecycle, Record};

/// A status or category filter with an `all` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T: PartialEq> Selector<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => wanted == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Selector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::All => write!(f, "all"),
            Selector::Only(value) => write!(f, "{}", value),
        }
    }
}

impl<T: FromStr<Err = String>> FromStr for Selector<T> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Selector::All);
        }
        s.trim().parse().map(Selector::Only)
    }
}

/// The active filters of a collection view.
///
/// Every field defaults to "match everything"; a record is displayed only
/// when it satisfies all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterSet<S, C> {
    /// Free text matched case-insensitively against searchable fields
    pub search: String,
    pub status: Selector<S>,
    pub category: Selector<C>,
    /// Record must carry every listed tag
    pub tags: Vec<String>,
    /// Created at or after this instant
    pub created_after: Option<DateTime<Utc>>,
    /// Created strictly before this instant
    pub created_before: Option<DateTime<Utc>>,
}

/// Filter set for the status and category types of `R`.
pub type Filters<R> = FilterSet<<R as Record>::Status, <R as Record>::Category>;

impl<S, C> Default for FilterSet<S, C> {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: Selector::All,
            category: Selector::All,
            tags: Vec::new(),
            created_after: None,
            created_before: None,
        }
    }
}

impl<S: Lifecycle, C: Category> FilterSet<S, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn with_status(mut self, status: S) -> Self {
        self.status = Selector::Only(status);
        self
    }

    pub fn with_category(mut self, category: C) -> Self {
        self.category = Selector::Only(category);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Check if the set constrains anything.
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.status.is_all()
            && self.category.is_all()
            && self.tags.is_empty()
            && self.created_after.is_none()
            && self.created_before.is_none()
    }
}

pub fn matches_search<R: Record>(record: &R, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    record
        .searchable_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub fn matches_status<R: Record>(record: &R, selector: &Selector<R::Status>) -> bool {
    selector.matches(&record.status())
}

pub fn matches_category<R: Record>(record: &R, selector: &Selector<R::Category>) -> bool {
    selector.matches(&record.category())
}

pub fn matches_date_range<R: Record>(
    record: &R,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
) -> bool {
    let created = record.base().created_at;
    after.map_or(true, |after| created >= after) && before.map_or(true, |before| created < before)
}

pub fn matches_tags<R: Record>(record: &R, tags: &[String]) -> bool {
    let own = &record.base().tags;
    tags.iter()
        .all(|wanted| own.iter().any(|tag| tag.eq_ignore_ascii_case(wanted)))
}

/// True only if every predicate in `filters` accepts `record`.
pub fn evaluate<R: Record>(record: &R, filters: &Filters<R>) -> bool {
    matches_status(record, &filters.status)
        && matches_category(record, &filters.category)
        && matches_tags(record, &filters.tags)
        && matches_date_range(record, filters.created_after, filters.created_before)
        && matches_search(record, &filters.search)
}

/// Parse a raw query string into a filter set.
///
/// Recognized prefixes:
/// - `status:active` - status filter (`all` clears it)
/// - `type:nps` - category filter
/// - `tag:q3` - tag filter (can specify multiple)
/// - `created:>2025-01-01` - created on or after date
/// - `created:<2025-12-31` - created before date
///
/// Everything else becomes the search text.
///
/// ```ignore
/// let filters = parse_query::<SurveyStatus, SurveyType>("status:active satisfaction")?;
/// assert_eq!(filters.search, "satisfaction");
/// ```
pub fn parse_query<S: Lifecycle, C: Category>(raw: &str) -> Result<FilterSet<S, C>, String> {
    let mut filters = FilterSet::default();
    let mut remaining = Vec::new();

    for token in raw.split_whitespace() {
        if let Some(value) = token.strip_prefix("type:") {
            filters.category = value.parse()?;
        } else if let Some(value) = token.strip_prefix("status:") {
            filters.status = value.parse()?;
        } else if let Some(value) = token.strip_prefix("tag:") {
            filters.tags.push(value.to_string());
        } else if let Some(value) = token.strip_prefix("created:>") {
            filters.created_after = Some(parse_date(value)?);
        } else if let Some(value) = token.strip_prefix("created:<") {
            filters.created_before = Some(parse_date(value)?);
        } else {
            remaining.push(token);
        }
    }

    filters.search = remaining.join(" ");
    Ok(filters)
}

/// Parse a date string into DateTime<Utc>.
/// Supports ISO 8601 date format (YYYY-MM-DD) or full datetime.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Date only - midnight UTC
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| DateTime::from_naive_utc_and_offset(datetime, Utc))
        .ok_or_else(|| format!("Invalid date: {}", s))
}
