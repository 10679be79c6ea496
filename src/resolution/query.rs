/// List query normalization
///
/// Query parameters arrive as untrusted strings. They are coerced here into
/// typed pagination, sort and filter values before anything reaches the
/// repository. Unknown sort keys and directions fall back to the default
/// ordering; unparseable offsets, counts and dates are rejected.
use crate::config::PaginationConfig;
use crate::error::{ClinicError, ClinicResult};
use chrono::NaiveDate;
use serde::Deserialize;

/// Raw list parameters as received from the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub offset: Option<String>,
    pub count: Option<String>,
    pub name: Option<String>,
    pub sort: Option<String>,
    pub variant: Option<String>,
    pub date: Option<String>,
}

/// Offset/limit window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u32,
    pub count: u32,
}

impl Pagination {
    pub fn from_params(
        offset: Option<&str>,
        count: Option<&str>,
        config: &PaginationConfig,
    ) -> ClinicResult<Self> {
        let offset = match non_empty(offset) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ClinicError::Validation(format!(
                    "offset must be a non-negative integer, got '{}'",
                    raw
                ))
            })?,
            None => 0,
        };

        let count = match non_empty(count) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) | Err(_) => {
                    return Err(ClinicError::Validation(format!(
                        "count must be a positive integer, got '{}'",
                        raw
                    )))
                }
                Ok(count) => count.min(config.max_count),
            },
            None => config.default_count,
        };

        Ok(Self { offset, count })
    }
}

/// Column a list may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Appointment visit date
    #[default]
    Date,
    Created,
    Updated,
    /// Name of the other party: the doctor for patient lists, the patient
    /// for doctor lists
    Name,
}

impl SortKey {
    /// Parse a sort key, falling back to the default on anything unknown
    pub fn parse(raw: Option<&str>) -> Self {
        match non_empty(raw).map(str::to_lowercase).as_deref() {
            Some("date") | Some("visitdate") | Some("visit_date") => SortKey::Date,
            Some("created") | Some("createdat") | Some("created_at") => SortKey::Created,
            Some("updated") | Some("updatedat") | Some("updated_at") => SortKey::Updated,
            Some("name") => SortKey::Name,
            Some(other) => {
                tracing::debug!("Unknown sort key '{}', using default", other);
                SortKey::default()
            }
            None => SortKey::default(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortVariant {
    Asc,
    #[default]
    Desc,
}

impl SortVariant {
    pub fn parse(raw: Option<&str>) -> Self {
        match non_empty(raw).map(str::to_lowercase).as_deref() {
            Some("asc") => SortVariant::Asc,
            Some("desc") => SortVariant::Desc,
            Some(other) => {
                tracing::debug!("Unknown sort variant '{}', using default", other);
                SortVariant::default()
            }
            None => SortVariant::default(),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortVariant::Asc => "ASC",
            SortVariant::Desc => "DESC",
        }
    }
}

/// Which side of the appointment a list is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Patient,
    Doctor,
}

impl Scope {
    /// SQL expression for the other party's display name
    pub fn counterpart_name_sql(&self) -> &'static str {
        match self {
            Scope::Patient => "(d.first_name || ' ' || d.last_name)",
            Scope::Doctor => "(p.first_name || ' ' || p.last_name)",
        }
    }
}

/// Ordering for a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub key: SortKey,
    pub variant: SortVariant,
}

impl Sort {
    /// ORDER BY body. Built only from enumerated columns; the resolution id
    /// breaks ties so pages never overlap.
    pub fn order_by_sql(&self, scope: Scope) -> String {
        let column = match self.key {
            SortKey::Date => "julianday(a.visit_date)",
            SortKey::Created => "r.created_at",
            SortKey::Updated => "r.updated_at",
            SortKey::Name => scope.counterpart_name_sql(),
        };
        let direction = self.variant.as_sql();
        format!("{column} {direction}, r.id {direction}")
    }
}

/// Normalized pagination, sort and name filter shared by every list shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub pagination: Pagination,
    pub sort: Sort,
    pub name: Option<String>,
}

impl ListQuery {
    pub fn from_params(params: &ListParams, config: &PaginationConfig) -> ClinicResult<Self> {
        Ok(Self {
            pagination: Pagination::from_params(
                params.offset.as_deref(),
                params.count.as_deref(),
                config,
            )?,
            sort: Sort {
                key: SortKey::parse(params.sort.as_deref()),
                variant: SortVariant::parse(params.variant.as_deref()),
            },
            name: non_empty(params.name.as_deref()).map(String::from),
        })
    }
}

/// Parse an optional `YYYY-MM-DD` date
pub fn parse_date(raw: Option<&str>) -> ClinicResult<Option<NaiveDate>> {
    non_empty(raw)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ClinicError::Validation(format!("date must be YYYY-MM-DD, got '{}'", raw))
            })
        })
        .transpose()
}

/// Escape LIKE wildcards so a name filter matches literally
pub fn like_pattern(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push('%');
    for c in name.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Patient's own resolutions
#[derive(Debug, Clone)]
pub struct PatientResolutionFilter {
    pub patient_id: String,
    pub date: Option<NaiveDate>,
    pub query: ListQuery,
}

/// Resolutions authored by the calling doctor
#[derive(Debug, Clone)]
pub struct DoctorResolutionFilter {
    pub doctor_id: String,
    pub date: Option<NaiveDate>,
    pub query: ListQuery,
}

/// Patient's resolutions written by doctors of one specialization
#[derive(Debug, Clone)]
pub struct SpecializationResolutionFilter {
    pub patient_id: String,
    pub specialization_id: String,
    pub query: ListQuery,
}

/// Patient's resolutions for appointments on one date
#[derive(Debug, Clone)]
pub struct DateResolutionFilter {
    pub patient_id: String,
    pub date: NaiveDate,
    pub query: ListQuery,
}

/// Filter shapes that carry a list window
pub trait ListFilter: Clone {
    fn list_query(&self) -> &ListQuery;

    /// Same filter narrowed to its first matching row, which still carries
    /// the total for the whole filter
    fn head(&self) -> Self;
}

macro_rules! impl_list_filter {
    ($($filter:ty),+ $(,)?) => {
        $(
            impl ListFilter for $filter {
                fn list_query(&self) -> &ListQuery {
                    &self.query
                }

                fn head(&self) -> Self {
                    let mut head = self.clone();
                    head.query.pagination = Pagination { offset: 0, count: 1 };
                    head
                }
            }
        )+
    };
}

impl_list_filter!(
    PatientResolutionFilter,
    DoctorResolutionFilter,
    SpecializationResolutionFilter,
    DateResolutionFilter,
);
