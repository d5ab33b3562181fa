//! Response and multipart helpers shared by the module routers.

use std::collections::BTreeMap;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

/// Binary download with `Content-Disposition: attachment`.
pub(crate) fn attachment(body: Vec<u8>, content_type: &str, filename: &str) -> Response {
    file_response(body, content_type, "attachment", filename)
}

/// Binary payload the browser may display in place.
pub(crate) fn inline(body: Vec<u8>, content_type: &str, filename: &str) -> Response {
    file_response(body, content_type, "inline", filename)
}

fn file_response(body: Vec<u8>, content_type: &str, disposition: &str, filename: &str) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&content_disposition(disposition, filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// `filename=` carries an ASCII fallback; non-ASCII names add the RFC 5987
/// `filename*=` form.
fn content_disposition(disposition: &str, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    if filename.is_ascii() {
        return format!("{disposition}; filename=\"{fallback}\"");
    }
    format!(
        "{disposition}; filename=\"{fallback}\"; filename*=UTF-8''{}",
        encode_ext_value(filename)
    )
}

fn encode_ext_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        let attr_char = byte.is_ascii_alphanumeric()
            || matches!(
                byte,
                b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
            );
        if attr_char {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Maps a multipart read failure to its status; an oversized body is a 413.
pub(crate) fn multipart_rejection(err: MultipartError) -> Response {
    json_error(err.status(), err.body_text())
}

/// File part pulled out of a multipart body.
#[derive(Debug, Clone)]
pub(crate) struct UploadedFile {
    pub(crate) field: String,
    pub(crate) file_name: String,
    pub(crate) bytes: Vec<u8>,
}

/// Multipart body split into its text fields and file parts.
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?.to_vec();
                    if file_name.trim().is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        bytes,
                    });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub(crate) fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn files_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a UploadedFile> {
        self.files.iter().filter(move |file| file.field == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disposition_of(response: &Response) -> &str {
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii header")
    }

    #[test]
    fn ascii_names_keep_the_plain_form() {
        let response = attachment(Vec::new(), XLSX_CONTENT_TYPE, "Recibos \"marzo\".xlsx");
        assert_eq!(
            disposition_of(&response),
            "attachment; filename=\"Recibos _marzo_.xlsx\""
        );
    }

    #[test]
    fn non_ascii_names_get_an_encoded_form() {
        let response = inline(Vec::new(), "application/pdf", "cédula Núñez.pdf");
        assert_eq!(
            disposition_of(&response),
            "inline; filename=\"c_dula N__ez.pdf\"; filename*=UTF-8''c%C3%A9dula%20N%C3%BA%C3%B1ez.pdf"
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    }
}
