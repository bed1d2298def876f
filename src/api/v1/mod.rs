mod error;
mod handler;
mod router;

pub use error::{ApiErrorCode, recover_error};
pub use router::{routes, with_api_authorization, with_soft_authentication};
