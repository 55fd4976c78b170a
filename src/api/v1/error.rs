use super::basic_auth::Unauthorized;
use super::handler::ApiResponse;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::http::header::WWW_AUTHENTICATE;
use warp::{Rejection, Reply, reject};

pub async fn recover_error(err: Rejection) -> Result<Box<dyn Reply>, Infallible> {
    if let Some(unauthorized) = err.find::<Unauthorized>() {
        let reply: Box<dyn Reply> = match &unauthorized.realm {
            Some(realm) => Box::new(warp::reply::with_header(
                warp::reply::with_status("Unauthorized", StatusCode::UNAUTHORIZED),
                WWW_AUTHENTICATE,
                format!("Basic realm=\"{realm}\""),
            )),
            None => Box::new(warp::reply::with_status(
                "Challenge failed",
                StatusCode::UNAUTHORIZED,
            )),
        };
        Ok(reply)
    } else if let Some(err) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone(), err.to_string()));
        Ok(Box::new(warp::reply::with_status(json, StatusCode::OK)))
    } else if err.is_not_found() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::NotFound,
            ApiErrorCode::NotFound.to_string(),
        ));
        Ok(Box::new(warp::reply::with_status(json, StatusCode::NOT_FOUND)))
    } else {
        let json = warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled error: {:?}", err),
            }),
        });
        Ok(Box::new(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        )))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl reject::Reject for ApiErrorCode {}
