use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("movie {0} not found")]
    NotFound(i32),
    #[error("a movie titled {0:?} already exists")]
    ConstraintViolation(String),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file type not allowed: {0:?}")]
    InvalidFileType(String),
    #[error("file name {0:?} has no usable characters")]
    InvalidFileName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("request body is too large")]
    PayloadTooLarge,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "The upload exceeds the size limit.".to_string())
            },
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong on our side.".to_string())
            },
        };

        let body = crate::templates::error_page(message);
        (status, Html(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
