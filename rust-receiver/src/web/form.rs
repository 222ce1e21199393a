//! Multipart body decoding into a [`RawForm`].

use axum::extract::multipart::{Multipart, MultipartError};
use tracing::debug;

use crate::callback::{FilePart, RawForm};

/// Read every part of a multipart body.
///
/// Parts with a filename become files, the rest become text fields. Text that
/// is not valid UTF-8 is decoded lossily. Unnamed parts are skipped.
pub async fn decode_multipart(mut multipart: Multipart) -> Result<RawForm, MultipartError> {
    let mut form = RawForm::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            debug!("multipart_unnamed_part_skipped");
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        match file_name {
            Some(file_name) => {
                debug!(
                    name = %name,
                    file_name = %file_name,
                    bytes = data.len(),
                    "multipart_file_part"
                );
                form.insert_file(
                    name,
                    FilePart {
                        file_name: Some(file_name),
                        content_type,
                        data,
                    },
                );
            }
            None => {
                form.insert_field(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    Ok(form)
}
