use serde::Deserialize;

/// Raw listing query parameters, validated by `Filter::from_params`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub orderby: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub page: Option<String>,
}

impl ListParams {
    pub fn ordered_by(column: &str) -> Self {
        Self {
            orderby: Some(column.to_string()),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset.to_string());
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = Some(page.to_string());
        self
    }

    pub fn descending(mut self) -> Self {
        self.sort_order = Some("desc".to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// Comparable projection of one column of a record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Int(i64),
    Text(String),
}

impl From<i32> for SortValue {
    fn from(v: i32) -> Self {
        SortValue::Int(v.into())
    }
}

impl From<&str> for SortValue {
    fn from(v: &str) -> Self {
        SortValue::Text(v.to_string())
    }
}
