use thiserror::Error;

use crate::error::CoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("must be bigger than -1")]
    InvalidLimit(String),

    #[error("must be a positive integer")]
    InvalidOffset(String),

    #[error("must be a positive integer")]
    InvalidPage(String),

    #[error("cannot order by '{0}'")]
    InvalidColumn(String),

    #[error("must be 'asc' or 'desc', got '{0}'")]
    InvalidSortOrder(String),
}

impl FilterError {
    /// Query parameter the error is about
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidLimit(_) => "limit",
            FilterError::InvalidOffset(_) => "offset",
            FilterError::InvalidPage(_) => "page",
            FilterError::InvalidColumn(_) => "orderby",
            FilterError::InvalidSortOrder(_) => "sortOrder",
        }
    }
}

impl From<FilterError> for CoreError {
    fn from(err: FilterError) -> Self {
        CoreError::validation(err.field(), err.to_string())
    }
}
