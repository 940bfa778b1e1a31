use actix_multipart::form::MultipartForm;
use actix_web::{post, web, HttpResponse, Responder};
use tracing::instrument;

use crate::{entities::media::MediaUploadForm, errors::AppError, AppState};

#[post("/upload")]
#[instrument(skip(state, form))]
pub async fn upload_media(
    state: web::Data<AppState>,
    form: MultipartForm<MediaUploadForm>,
) -> Result<impl Responder, AppError> {
    let response = state.media_handler.handle_upload(form.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}
