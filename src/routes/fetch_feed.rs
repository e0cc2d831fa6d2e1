use crate::feed::{FeedError, FeedProxy};
use crate::utils::{e400, e500};
use actix_web::{HttpResponse, get, web};
use serde::Deserialize;

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Deserialize)]
pub struct FeedParams {
    url: Option<String>,
}

#[get("/fetch-feed")]
#[tracing::instrument(name = "Proxying a feed", skip_all, fields(url = tracing::field::Empty))]
pub async fn get(
    params: web::Query<FeedParams>,
    feed_proxy: web::Data<FeedProxy>,
) -> Result<HttpResponse, actix_web::Error> {
    let url = params
        .into_inner()
        .url
        .ok_or_else(|| e400("URL parameter is required."))?;
    tracing::Span::current().record("url", tracing::field::display(&url));

    let document = feed_proxy.fetch(&url).await.map_err(|e| match e {
        FeedError::InvalidUrl(_) => e400(e),
        FeedError::FetchFailed(_) => e500(e),
    })?;

    Ok(HttpResponse::Ok()
        .content_type(
            document
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        )
        .body(document.body))
}
