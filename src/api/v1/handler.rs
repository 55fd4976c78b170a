use super::error::*;
use crate::domain_model::AppIdentity;
use serde::Serialize;
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

pub async fn hello() -> Result<impl warp::Reply, warp::Rejection> {
    Ok("Hello!")
}

pub async fn hello_name(
    name: String,
    _principal: Arc<AppIdentity>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(format!("Hello {name}!"))
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok("Healthy")
}

#[derive(Debug, Serialize)]
struct MeResponse {
    name: String,
    authentication_type: String,
    roles: Vec<String>,
}

pub async fn me(principal: Arc<AppIdentity>) -> Result<impl warp::Reply, warp::Rejection> {
    let Some(name) = principal.name() else {
        return Err(reject::custom(ApiErrorCode::NotAuthenticated));
    };

    let response = MeResponse {
        name: name.to_string(),
        authentication_type: principal.authentication_type().to_string(),
        roles: principal.roles().map(str::to_string).collect(),
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}
