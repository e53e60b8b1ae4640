use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use super::response::ApiRejection;
use crate::error::ChatlensError;

/// `axum::Json` whose rejections use the v1 error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiRejection))]
pub struct V1Json<T>(pub T);

impl From<JsonRejection> for ApiRejection {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection).into()
    }
}

fn map_json_rejection(rejection: JsonRejection) -> ChatlensError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            // The useful part of a data error is in the source chain.
            let message = std::error::Error::source(&err)
                .map(ToString::to_string)
                .unwrap_or_else(|| err.body_text());
            if let Some(field) = extract_missing_field(&message) {
                ChatlensError::Validation(format!("Missing required field: {field}"))
            } else {
                ChatlensError::Validation(format!("Invalid request body: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            ChatlensError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => ChatlensError::Validation(
            "Missing `Content-Type: application/json` header".to_string(),
        ),
        JsonRejection::BytesRejection(err) => {
            ChatlensError::Validation(format!("Failed to read request body: {}", err.body_text()))
        }
        _ => ChatlensError::Validation(rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_missing_field_name() {
        assert_eq!(
            extract_missing_field("segments: missing field `segments` at line 1 column 2"),
            Some("segments")
        );
        assert_eq!(extract_missing_field("invalid type: string"), None);
    }
}
