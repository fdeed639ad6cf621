/**
 * Body Extractors
 *
 * `JsonBody` and `FormBody` wrap axum's `Json` and `Form` extractors so a
 * rejection (malformed JSON, wrong content type, body over the ceiling)
 * becomes a `DomainError` with the rejection's own status and reaches the
 * error sink like any other domain error.
 */

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequest, Request,
    },
    Form, Json,
};
use crate::backend::error::{AppError, DomainError};

/// JSON request body
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                Err(DomainError::rejected(rejection.status(), rejection.body_text()).into())
            }
        }
    }
}

/// URL-encoded form body
#[derive(Debug, Clone)]
pub struct FormBody<T>(pub T);

impl<S, T> FromRequest<S> for FormBody<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(Form(value)) => Ok(Self(value)),
            Err(rejection) => {
                Err(DomainError::rejected(rejection.status(), rejection.body_text()).into())
            }
        }
    }
}
