use actix_multipart::Multipart;
use futures::TryStreamExt;

use crate::storage::upload_store::{FileUpload, StorageError};

pub const FILE_FIELD: &str = "file";

/// Pulls the first `file` part carrying a filename out of the form.
///
/// A part without a `filename` parameter is a plain form value and does not
/// count as an upload. Every other part is drained so the request body is
/// fully consumed.
pub async fn read_file_field(
    payload: &mut Multipart,
    max_file_size: usize,
) -> Result<FileUpload, StorageError> {
    let mut upload: Option<FileUpload> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| StorageError::Multipart(e.to_string()))?
    {
        let filename = field.content_disposition().and_then(|cd| {
            match (cd.get_name(), cd.get_filename()) {
                (Some(FILE_FIELD), Some(filename)) => Some(filename.to_string()),
                _ => None,
            }
        });

        match filename {
            Some(original_filename) if upload.is_none() => {
                let mut data = Vec::new();
                while let Some(chunk) = field
                    .try_next()
                    .await
                    .map_err(|e| StorageError::Multipart(e.to_string()))?
                {
                    if data.len() + chunk.len() > max_file_size {
                        return Err(StorageError::FileTooLarge(max_file_size));
                    }
                    data.extend_from_slice(&chunk);
                }
                upload = Some(FileUpload {
                    original_filename,
                    data,
                });
            }
            _ => {
                while field
                    .try_next()
                    .await
                    .map_err(|e| StorageError::Multipart(e.to_string()))?
                    .is_some()
                {}
            }
        }
    }

    match upload {
        None => Err(StorageError::NoFile),
        Some(upload) if upload.original_filename.is_empty() => Err(StorageError::EmptyFilename),
        Some(upload) => Ok(upload),
    }
}
