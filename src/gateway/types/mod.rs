//! Gateway types module
//!
//! - [`response`]: success envelope, request/response DTOs and error codes
//! - [`error`]: `ApiError` and its mapping from domain errors

pub mod error;
pub mod response;

pub use error::{ApiError, ApiResult, ErrorBody, ErrorKind, created, ok};
pub use response::{
    AccountView, ApiResponse, DeleteResponse, LoginRequest, LoginResponse, TransferRequest,
    TransferResponse, error_codes,
};
