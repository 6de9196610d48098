pub mod conditional;
pub mod error;
pub mod response;

pub use conditional::{read_preconditions, write_preconditions};
pub use error::ApiError;
pub use response::{ApiResponse, ApiResult};
