use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Json;
use serde_json::json;

use reef_api::{ApiError, Request, RequestType, Response};
use reef_engine::ServiceHandle;
use reef_proto::{binary, text, CodecOptions, MIME_BINARY, MIME_TEXT};

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub handle: ServiceHandle,
    pub codec: CodecOptions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WireCodec {
    Binary,
    Text,
}

pub type CommandReply = (StatusCode, [(header::HeaderName, &'static str); 1], Vec<u8>);

/// POST /api/command: decode, submit to the service, encode the reply.
pub async fn command_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> CommandReply {
    let codec = match select_codec(&headers) {
        Some(codec) => codec,
        None => {
            let err = ApiError::Validation("unsupported content type".into());
            return encode_reply(WireCodec::Text, Response::error(RequestType::Noop, &err));
        }
    };

    let request = match decode_request(codec, &body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(%err, "failed to decode request body");
            let err = ApiError::Decode(err.to_string());
            return encode_reply(codec, Response::error(RequestType::Noop, &err));
        }
    };

    let request_type = request.request_type;
    match state.handle.call(request) {
        Ok(receiver) => match receiver.await {
            Ok(response) => encode_reply(codec, response),
            // Service shut down before producing a response.
            Err(_) => encode_reply(
                codec,
                Response::error(request_type, &ApiError::AlreadyClosed),
            ),
        },
        Err(err) => encode_reply(codec, Response::error(request_type, &err)),
    }
}

/// GET /api/health.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "reef",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn select_codec(headers: &HeaderMap) -> Option<WireCodec> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(MIME_BINARY);
    if content_type.starts_with(MIME_BINARY) {
        Some(WireCodec::Binary)
    } else if content_type.starts_with(MIME_TEXT) {
        Some(WireCodec::Text)
    } else {
        None
    }
}

fn decode_request(codec: WireCodec, body: &[u8]) -> reef_proto::ProtoResult<Request> {
    match codec {
        WireCodec::Binary => binary::decode_request(body),
        WireCodec::Text => {
            let text_body = std::str::from_utf8(body)
                .map_err(|e| reef_proto::ProtoError::Decode(e.to_string()))?;
            text::decode_request(text_body)
        }
    }
}

fn encode_reply(codec: WireCodec, response: Response) -> CommandReply {
    let status = if response.is_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    let (mime, body) = match codec {
        WireCodec::Binary => (MIME_BINARY, binary::encode_response(&response)),
        WireCodec::Text => (
            MIME_TEXT,
            text::encode_response(&response).map(String::into_bytes),
        ),
    };
    match body {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, mime)], bytes),
        Err(err) => {
            tracing::error!(%err, "failed to encode response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, MIME_TEXT)],
                err.to_string().into_bytes(),
            )
        }
    }
}
