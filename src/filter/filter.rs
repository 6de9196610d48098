use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{FilterOrderInfo, ListParams, SortDirection, SortValue};

/// Validated ordering and pagination for one listing.
#[derive(Debug, Clone)]
pub struct Filter {
    order: FilterOrderInfo,
    limit: Option<usize>,
    offset: usize,
}

impl Filter {
    pub fn from_params(
        params: &ListParams,
        columns: &[&str],
        default_column: &str,
    ) -> Result<Self, FilterError> {
        let max_limit = crate::config::CONFIG.listing.max_limit;
        Self::with_max_limit(params, columns, default_column, max_limit)
    }

    pub fn with_max_limit(
        params: &ListParams,
        columns: &[&str],
        default_column: &str,
        max_limit: Option<usize>,
    ) -> Result<Self, FilterError> {
        let order = FilterOrder::validate_and_parse(
            params.orderby.as_deref(),
            params.sort_order.as_deref(),
            columns,
            default_column,
        )?;

        // -1 means no limit; offset and page only apply alongside a limit
        let limit = match params.limit.as_deref().map(str::trim) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(-1) => None,
                Ok(n) if n >= 0 => Some(n as usize),
                _ => return Err(FilterError::InvalidLimit(raw.to_string())),
            },
        };

        // page size is settled before a page number turns into an offset
        let limit = match (limit, max_limit) {
            (Some(limit), Some(max)) if limit > max => {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                Some(max)
            }
            (limit, _) => limit,
        };

        let mut offset = 0;
        if let Some(limit) = limit {
            if let Some(raw) = params.offset.as_deref().map(str::trim) {
                offset = Self::positive(raw).ok_or_else(|| FilterError::InvalidOffset(raw.to_string()))?;
            }
            if let Some(raw) = params.page.as_deref().map(str::trim) {
                let page = Self::positive(raw).ok_or_else(|| FilterError::InvalidPage(raw.to_string()))?;
                offset = (page - 1).saturating_mul(limit);
            }
        }

        Ok(Self { order, limit, offset })
    }

    fn positive(raw: &str) -> Option<usize> {
        raw.parse::<usize>().ok().filter(|n| *n > 0)
    }

    pub fn order(&self) -> &FilterOrderInfo {
        &self.order
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Sorts by the chosen column and cuts out the requested page
    pub fn apply<T>(&self, mut items: Vec<T>, value: impl Fn(&T, &str) -> SortValue) -> Vec<T> {
        let column = self.order.column.as_str();
        items.sort_by_cached_key(|item| value(item, column));
        if self.order.sort == SortDirection::Desc {
            items.reverse();
        }

        let page = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}
