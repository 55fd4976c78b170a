use super::basic_auth::with_basic_auth;
use super::handler;
use crate::server::*;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let principal = with_basic_auth(
        server.authenticator.clone(),
        server.port,
        server.realm.clone(),
    );

    let hello = warp::get()
        .and(warp::path("hello"))
        .and(warp::path::end())
        .and_then(handler::hello);

    let hello_name = warp::get()
        .and(warp::path("hello"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(principal.clone())
        .and_then(handler::hello_name);

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and_then(handler::health);

    let me = warp::get()
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(principal)
        .and_then(handler::me);

    hello.or(hello_name).or(health).or(me)
}
