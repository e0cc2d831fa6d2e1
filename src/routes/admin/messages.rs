use crate::authentication::reject_unauthorized_admins;
use crate::storage::Store;
use crate::utils::e500;
use actix_web::http::header::ContentType;
use actix_web::middleware::from_fn;
use actix_web::{HttpResponse, get, web};

#[get("/messages", wrap = "from_fn(reject_unauthorized_admins)")]
#[tracing::instrument(name = "Retrieving all contact messages", skip_all)]
pub async fn get(store: web::Data<dyn Store>) -> Result<HttpResponse, actix_web::Error> {
    let messages = store.list_messages().await.map_err(e500)?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .json(messages))
}
