//! Page/limit handling shared by every list endpoint

use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Resolved pagination window. Values that are missing, unparsable or
/// below 1 fall back to the defaults; `limit` is capped at [`MAX_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).filter(|v| *v >= 1)
}

impl Pagination {
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            limit: parse_positive(limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Parse a lenient boolean query flag ("true", "1", "yes")
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        assert_eq!(Pagination::from_query(None, None), Pagination { page: 1, limit: 10 });
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let p = Pagination::from_query(Some("abc"), Some("-5"));
        assert_eq!(p, Pagination::default());

        let p = Pagination::from_query(Some("0"), Some("2.5"));
        assert_eq!(p, Pagination::default());
    }

    #[test]
    fn test_second_page_offset() {
        let p = Pagination::from_query(Some("2"), Some("10"));
        assert_eq!(p.offset(), 10);
        assert_eq!(p.limit, 10);
    }

    #[test]
    fn test_limit_is_capped() {
        let p = Pagination::from_query(Some(" 3 "), Some("1000"));
        assert_eq!(p.page, 3);
        assert_eq!(p.limit, MAX_LIMIT);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let p = Pagination::from_query(Some(&i64::MAX.to_string()), Some("100"));
        assert_eq!(p.offset(), i64::MAX);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some("1")));
        assert!(!parse_flag(Some("nope")));
        assert!(!parse_flag(None));
    }
}
