use actix_files::file_extension_to_mime;
use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use shared::NO_FILE_MESSAGE;
use std::path::Path;

use crate::classification::service::{ClassificationService, ClassifyError};
use crate::page::render_index_page;
use crate::storage::upload::read_file_field;
use crate::storage::upload_store::{StorageError, UploadStore};

pub const INVALID_IMAGE_MESSAGE: &str = "The uploaded file is not a valid image.";
pub const TOO_LARGE_MESSAGE: &str = "The uploaded file is too large.";
pub const UNREADABLE_UPLOAD_MESSAGE: &str = "The upload could not be read.";
pub const FAILURE_MESSAGE: &str = "Classification failed. Please try again.";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(index))
            .route(web::post().to(classify_upload)),
    )
    .service(web::resource("/uploads/{name}").route(web::get().to(uploaded_file)));
}

fn render(status: StatusCode, result: Option<&str>, image_url: Option<&str>) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(render_index_page(result, image_url))
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("multipart/"))
        .unwrap_or(false)
}

async fn index() -> HttpResponse {
    render(StatusCode::OK, None, None)
}

async fn classify_upload(
    req: HttpRequest,
    mut payload: Multipart,
    store: web::Data<UploadStore>,
    classifier: web::Data<ClassificationService>,
) -> HttpResponse {
    if !is_multipart(&req) {
        warn!("POST / without a multipart body");
        return render(StatusCode::OK, Some(NO_FILE_MESSAGE), None);
    }

    let upload = match read_file_field(&mut payload, store.max_file_size()).await {
        Ok(upload) => upload,
        Err(StorageError::NoFile) => {
            warn!("POST / without a file field");
            return render(StatusCode::OK, Some(NO_FILE_MESSAGE), None);
        }
        Err(StorageError::EmptyFilename) => {
            info!("POST / submitted without choosing a file");
            return render(StatusCode::OK, None, None);
        }
        Err(StorageError::FileTooLarge(limit)) => {
            warn!("Rejected upload larger than {} bytes", limit);
            return render(StatusCode::PAYLOAD_TOO_LARGE, Some(TOO_LARGE_MESSAGE), None);
        }
        Err(e) => {
            warn!("Failed to read upload: {}", e);
            return render(StatusCode::BAD_REQUEST, Some(UNREADABLE_UPLOAD_MESSAGE), None);
        }
    };

    let stored = match store.store(&upload) {
        Ok(stored) => stored,
        Err(e) => {
            error!("Failed to store upload: {}", e);
            return render(StatusCode::INTERNAL_SERVER_ERROR, Some(FAILURE_MESSAGE), None);
        }
    };
    let image_url = format!("/uploads/{}", urlencoding::encode(&stored.name));

    match classifier.classify(&stored.path).await {
        Ok(result) => render(StatusCode::OK, Some(result.verdict.message()), Some(&image_url)),
        Err(ClassifyError::InvalidImage(e)) => {
            warn!("Upload {} is not a valid image: {}", stored.name, e);
            render(StatusCode::BAD_REQUEST, Some(INVALID_IMAGE_MESSAGE), None)
        }
        Err(e) => {
            error!("Classification of {} failed: {}", stored.name, e);
            render(StatusCode::INTERNAL_SERVER_ERROR, Some(FAILURE_MESSAGE), None)
        }
    }
}

async fn uploaded_file(path: web::Path<String>, store: web::Data<UploadStore>) -> HttpResponse {
    let name = path.into_inner();
    match store.retrieve(&name) {
        Ok(data) => {
            let extension = Path::new(&name)
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default();
            HttpResponse::Ok()
                .content_type(file_extension_to_mime(extension))
                .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                .body(data)
        }
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidName(_)) => {
            info!("Stored file not found: {:?}", name);
            HttpResponse::NotFound().body("Not Found")
        }
        Err(e) => {
            error!("Error reading stored file {:?}: {}", name, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
