use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names owned by the list protocol; filters may not shadow them
pub const RESERVED_KEYS: [&str; 5] = ["page", "limit", "sort", "order", "search"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_desc(desc: bool) -> Self {
        if desc {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn is_desc(self) -> bool {
        self == SortOrder::Desc
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order '{other}' (expected asc or desc)")),
        }
    }
}

/// Sort field and direction. Kept together so `sort` and `order` are
/// always both present or both absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// Query state of one list view, sent to list endpoints as flat pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// Arbitrary entity filters (`departmentId`, `role`, ...)
    pub filters: BTreeMap<String, Value>,
    pub limit: u32,
    /// 1-based
    pub page: u32,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

impl QueryParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            filters: BTreeMap::new(),
            limit,
            page,
            search: None,
            sort: None,
        }
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(SortKey::new(field, order));
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort.as_ref().map(|s| s.field.as_str())
    }

    pub fn order(&self) -> Option<SortOrder> {
        self.sort.as_ref().map(|s| s.order)
    }

    /// Flatten into query-string pairs.
    ///
    /// Blank search and null filters are omitted; array filters repeat
    /// their key; filters named like a protocol field are skipped.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];

        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.field.clone()));
            pairs.push(("order".to_string(), sort.order.as_str().to_string()));
        }

        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search".to_string(), search.to_string()));
            }
        }

        for (key, value) in &self.filters {
            if RESERVED_KEYS.contains(&key.as_str()) {
                tracing::debug!(filter = %key, "Skipping filter that shadows a list parameter");
                continue;
            }
            push_filter(&mut pairs, key, value);
        }

        pairs
    }
}

fn push_filter(pairs: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((key.to_string(), s.clone())),
        Value::Array(items) => {
            for item in items {
                push_filter(pairs, key, item);
            }
        }
        other => pairs.push((key.to_string(), other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_query_pairs_order_and_content() {
        let params = QueryParams::new(2, 50)
            .with_sort("createdAt", SortOrder::Desc)
            .with_search("  ali ")
            .with_filter("departmentId", 0)
            .with_filter("isActive", true);

        assert_eq!(
            params.to_query_pairs(),
            pairs(&[
                ("page", "2"),
                ("limit", "50"),
                ("sort", "createdAt"),
                ("order", "desc"),
                ("search", "ali"),
                ("departmentId", "0"),
                ("isActive", "true"),
            ])
        );
    }

    #[test]
    fn test_null_and_blank_values_are_omitted() {
        let params = QueryParams::default()
            .with_search("   ")
            .with_filter("role", Value::Null);
        assert_eq!(
            params.to_query_pairs(),
            pairs(&[("page", "1"), ("limit", "20")])
        );
    }

    #[test]
    fn test_array_filters_repeat_key() {
        let params = QueryParams::default().with_filter("status", json!(["active", "locked"]));
        let got = params.to_query_pairs();
        assert!(got.contains(&("status".to_string(), "active".to_string())));
        assert!(got.contains(&("status".to_string(), "locked".to_string())));
    }

    #[test]
    fn test_filters_cannot_shadow_protocol_fields() {
        let params = QueryParams::default().with_filter("page", 9);
        assert_eq!(
            params.to_query_pairs(),
            pairs(&[("page", "1"), ("limit", "20")])
        );
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
