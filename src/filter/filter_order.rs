use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Resolves `orderby`/`sortOrder` against the columns a listing supports
    pub fn validate_and_parse(
        orderby: Option<&str>,
        sort_order: Option<&str>,
        columns: &[&str],
        default_column: &str,
    ) -> Result<FilterOrderInfo, FilterError> {
        let column = match orderby.map(str::trim).filter(|c| !c.is_empty()) {
            None => default_column.to_string(),
            Some(c) if columns.contains(&c) => c.to_string(),
            Some(c) => return Err(FilterError::InvalidColumn(c.to_string())),
        };

        let sort = match sort_order.map(|s| s.trim().to_ascii_lowercase()) {
            None => SortDirection::Asc,
            Some(s) if s == "asc" => SortDirection::Asc,
            Some(s) if s == "desc" => SortDirection::Desc,
            Some(s) => return Err(FilterError::InvalidSortOrder(s)),
        };

        Ok(FilterOrderInfo { column, sort })
    }
}
