use serde::Serialize;

pub const QUERY_MAX_LEN: usize = 100;
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 50;

/// Search parameters as they arrive on the query string, before any checks.
#[derive(Debug, Clone, Default)]
pub struct RawSearchParams {
    pub query: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A search request that passed validation. Only `validate` builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    page: u32,
    limit: u32,
}

impl SearchRequest {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Required,
    MinLength,
    MaxLength,
    Integer,
    Minimum,
    Maximum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub constraint: Constraint,
    pub value: Option<String>,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, constraint: Constraint, value: Option<&str>, message: String) -> Self {
        Self {
            field,
            constraint,
            value: value.map(str::to_string),
            message,
        }
    }
}

impl RawSearchParams {
    /// Collect from decoded query pairs. The first occurrence of a key wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "query" => &mut params.query,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    pub fn validate(&self) -> Result<SearchRequest, Vec<FieldViolation>> {
        validate(
            self.query.as_deref(),
            self.page.as_deref(),
            self.limit.as_deref(),
        )
    }
}

/// Strictly decode the raw parameters. Every field is checked and all
/// violations are reported together.
pub fn validate(
    query: Option<&str>,
    page: Option<&str>,
    limit: Option<&str>,
) -> Result<SearchRequest, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    let query = match query {
        None => {
            violations.push(FieldViolation::new(
                "query",
                Constraint::Required,
                None,
                "query is required".to_string(),
            ));
            None
        }
        Some(q) => {
            let len = q.chars().count();
            if len == 0 {
                violations.push(FieldViolation::new(
                    "query",
                    Constraint::MinLength,
                    Some(q),
                    "query must contain at least 1 character".to_string(),
                ));
                None
            } else if len > QUERY_MAX_LEN {
                violations.push(FieldViolation::new(
                    "query",
                    Constraint::MaxLength,
                    Some(q),
                    format!("query must contain at most {} characters", QUERY_MAX_LEN),
                ));
                None
            } else {
                Some(q.to_string())
            }
        }
    };

    let page = bounded_int("page", page, DEFAULT_PAGE, 1, None, &mut violations);
    let limit = bounded_int("limit", limit, DEFAULT_LIMIT, 1, Some(MAX_LIMIT), &mut violations);

    match (query, page, limit) {
        (Some(query), Some(page), Some(limit)) if violations.is_empty() => {
            Ok(SearchRequest { query, page, limit })
        }
        _ => Err(violations),
    }
}

// Absent and empty values both take the default.
fn bounded_int(
    field: &'static str,
    raw: Option<&str>,
    default: u32,
    min: i64,
    max: Option<u32>,
    violations: &mut Vec<FieldViolation>,
) -> Option<u32> {
    let raw = match raw {
        None | Some("") => return Some(default),
        Some(raw) => raw,
    };

    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            violations.push(FieldViolation::new(
                field,
                Constraint::Integer,
                Some(raw),
                format!("{} must be an integer", field),
            ));
            return None;
        }
    };

    if value < min {
        violations.push(FieldViolation::new(
            field,
            Constraint::Minimum,
            Some(raw),
            format!("{} must be at least {}", field, min),
        ));
        return None;
    }

    if let Some(max) = max {
        if value > i64::from(max) {
            violations.push(FieldViolation::new(
                field,
                Constraint::Maximum,
                Some(raw),
                format!("{} must be at most {}", field, max),
            ));
            return None;
        }
    }

    match u32::try_from(value) {
        Ok(v) => Some(v),
        Err(_) => {
            violations.push(FieldViolation::new(
                field,
                Constraint::Maximum,
                Some(raw),
                format!("{} must be at most {}", field, u32::MAX),
            ));
            None
        }
    }
}
