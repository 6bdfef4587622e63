//! DynamoDB error classification.
//!
//! Maps AWS SDK errors to [`StoreError`] codes at the adapter boundary, so
//! the retry executor never inspects SDK error text.

use std::error::Error as StdError;
use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use dynakit_core::store::{ErrorCode, StoreError, StoreOperation};

/// Maps a service error code to a store error code.
pub fn code_for(service_code: Option<&str>) -> ErrorCode {
    match service_code {
        Some(
            "ProvisionedThroughputExceededException"
            | "ThrottlingException"
            | "RequestLimitExceeded"
            | "LimitExceededException",
        ) => ErrorCode::Throttled,
        // Contention with a concurrent transaction clears on retry.
        Some("TransactionConflictException") => ErrorCode::Throttled,
        Some("InternalServerError" | "InternalFailure") => ErrorCode::InternalServer,
        Some("ServiceUnavailable" | "ServiceUnavailableException") => {
            ErrorCode::ServiceUnavailable
        }
        Some("ResourceNotFoundException") => ErrorCode::ResourceNotFound,
        Some("ValidationException" | "ItemCollectionSizeLimitExceededException") => {
            ErrorCode::Validation
        }
        Some("ConditionalCheckFailedException") => ErrorCode::ConditionalCheckFailed,
        Some("ResourceInUseException") => ErrorCode::Conflict,
        Some(
            "AccessDeniedException"
            | "UnrecognizedClientException"
            | "MissingAuthenticationTokenException",
        ) => ErrorCode::AccessDenied,
        _ => ErrorCode::Unknown,
    }
}

/// Classifies an SDK error for `operation`.
pub fn classify<E, R>(operation: StoreOperation, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let code = match &err {
        SdkError::TimeoutError(_) => ErrorCode::Timeout,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => ErrorCode::Timeout,
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => ErrorCode::Transport,
        SdkError::ConstructionFailure(_) => ErrorCode::Validation,
        SdkError::ServiceError(_) => code_for(err.code()),
        _ => ErrorCode::Unknown,
    };
    StoreError::new(operation, code, DisplayErrorContext(&err).to_string())
}

/// Maps a request builder error; these only arise from malformed input.
pub fn build_error(operation: StoreOperation, err: impl std::fmt::Display) -> StoreError {
    StoreError::new(operation, ErrorCode::Validation, err.to_string())
}
