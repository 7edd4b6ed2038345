//! POST /compare-image: verify a submitted photo against a user's stored photo.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use faceverify_core::{face_distance, FaceEncoding};
use serde::Serialize;
use serde_json::Value;

use crate::db::UserRecord;
use crate::error::ApiError;
use crate::image_store::ImageStore;
use crate::state::AppState;

/// Standard alphabet; padding optional since browsers and mobile clients disagree.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Who to verify, as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserRef {
    Id(u64),
    /// Present but can never name a row (negative, fractional, non-numeric).
    Unknown,
}

/// Validated request body.
#[derive(Debug)]
struct CompareRequest {
    user: UserRef,
    /// Base64 text with any data-URL header and whitespace removed.
    payload: String,
}

impl CompareRequest {
    /// Accepts `user_id` as a number or numeric string and `image` as a
    /// string carrying base64 data. Anything absent, empty or unparseable is
    /// missing input, including a data-URL header with nothing after it.
    fn parse(body: Result<Json<Value>, JsonRejection>) -> Result<Self, ApiError> {
        let Json(body) = body.map_err(|rejection| {
            tracing::debug!(%rejection, "unreadable request body");
            ApiError::MissingInput
        })?;

        let user = body.get("user_id").and_then(parse_user_ref);
        let payload = body
            .get("image")
            .and_then(Value::as_str)
            .map(strip_payload)
            .filter(|p| !p.is_empty());

        match (user, payload) {
            (Some(user), Some(payload)) => Ok(Self { user, payload }),
            _ => Err(ApiError::MissingInput),
        }
    }
}

/// `None` for the blank values a client sends when it has no id.
fn parse_user_ref(value: &Value) -> Option<UserRef> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(0) => None,
            Some(id) => Some(UserRef::Id(id)),
            None if n.as_f64() == Some(0.0) => None,
            None => Some(UserRef::Unknown),
        },
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.parse().map(UserRef::Id).unwrap_or(UserRef::Unknown))
            }
        }
        _ => None,
    }
}

/// Drop an optional `data:<mime>;base64,` header and any whitespace.
fn strip_payload(image: &str) -> String {
    let payload = image.split_once(',').map_or(image, |(_, data)| data);
    payload.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, ApiError> {
    Ok(BASE64.decode(payload)?)
}

/// Body of a successful verification.
#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub user: UserRecord,
}

impl From<UserRecord> for VerifiedResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            success: true,
            message: "User verified successfully!",
            user,
        }
    }
}

fn first_face(mut encodings: Vec<FaceEncoding>) -> Option<FaceEncoding> {
    if encodings.is_empty() {
        None
    } else {
        Some(encodings.swap_remove(0))
    }
}

/// POST /compare-image
#[tracing::instrument(skip_all, fields(user_id))]
async fn compare_image(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<VerifiedResponse>, ApiError> {
    let request = CompareRequest::parse(body)?;

    let UserRef::Id(user_id) = request.user else {
        return Err(ApiError::UserNotFound);
    };
    tracing::Span::current().record("user_id", user_id);

    let user = state
        .users()
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    let photo = user
        .photo
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::NoStoredImage)?;

    let stored_path = state.images().stored_path(photo);
    tracing::debug!(path = %stored_path.display(), "checking stored image");
    if !ImageStore::is_file(&stored_path).await {
        return Err(ApiError::StoredImageMissing(stored_path));
    }

    let submitted = decode_payload(&request.payload)?;
    let submitted = first_face(state.matcher().encodings(submitted).await?)
        .ok_or(ApiError::NoFaceDetected)?;

    let stored = ImageStore::read(&stored_path).await?;
    let stored = first_face(state.matcher().encodings(stored).await?)
        .ok_or(ApiError::NoFaceInStoredImage)?;

    let tolerance = state.tolerance();
    let matched = state.matcher().compare(&stored, &submitted, tolerance);
    tracing::info!(
        distance = face_distance(&stored, &submitted),
        tolerance,
        matched,
        "face comparison"
    );

    if matched {
        Ok(Json(VerifiedResponse::from(user)))
    } else {
        Err(ApiError::NoMatch)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/compare-image", post(compare_image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn post_json(body: Value) -> Request<Body> {
        post_raw(body.to_string())
    }

    fn post_raw(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/compare-image")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn compare(body: Value) -> (StatusCode, Value) {
        let fx = fixture();
        send_json(&fx.app, post_json(body)).await
    }

    #[tokio::test]
    async fn alice_matches_her_stored_photo() {
        let (status, body) = compare(json!({ "user_id": 1, "image": b64(b"alice-2") })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "User verified successfully!",
                "name": "Alice",
                "email": "alice@example.com",
                "mobile": "5550100",
                "photo": "uploads/alice.jpg",
            })
        );
    }

    #[tokio::test]
    async fn bob_does_not_match_alice() {
        let (status, body) = compare(json!({ "user_id": 1, "image": b64(b"bob") })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "No matching face found for the user" }));
    }

    #[tokio::test]
    async fn data_url_prefix_is_stripped() {
        let image = format!("data:image/jpeg;base64,{}", b64(b"alice"));
        let (status, body) = compare(json!({ "user_id": 1, "image": image })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Alice");
    }

    #[tokio::test]
    async fn string_user_id_is_accepted() {
        let (status, _) = compare(json!({ "user_id": "1", "image": b64(b"alice") })).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn first_face_of_a_group_photo_is_used() {
        let (status, _) = compare(json!({ "user_id": 1, "image": b64(b"group") })).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_fields_are_400() {
        for body in [
            json!({}),
            json!({ "image": b64(b"alice") }),
            json!({ "user_id": 1 }),
            json!({ "user_id": null, "image": b64(b"alice") }),
            json!({ "user_id": 0, "image": b64(b"alice") }),
            json!({ "user_id": "", "image": b64(b"alice") }),
            json!({ "user_id": 1, "image": "" }),
            json!({ "user_id": 1, "image": 42 }),
            json!({ "user_id": 1, "image": "data:image/png;base64," }),
            json!([1, "alice"]),
        ] {
            let (status, resp) = compare(body.clone()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(resp["message"], "No user_id or image provided");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let fx = fixture();
        let (status, body) = send_json(&fx.app, post_raw("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let request = Request::builder()
            .method("POST")
            .uri("/compare-image")
            .body(Body::from(r#"{"user_id":1,"image":"YWxpY2U="}"#))
            .unwrap();
        let (status, _) = send_json(&fx.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "missing content-type");
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        for user_id in [json!(99), json!("abc"), json!(-1), json!(1.5)] {
            let (status, body) = compare(json!({ "user_id": user_id, "image": b64(b"alice") })).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "User not found");
        }
    }

    #[tokio::test]
    async fn user_without_photo_is_404() {
        for user_id in [2, 5] {
            let (status, body) = compare(json!({ "user_id": user_id, "image": b64(b"alice") })).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "No image found for this user");
        }
    }

    #[tokio::test]
    async fn missing_stored_file_reports_path() {
        let fx = fixture();
        let (status, body) =
            send_json(&fx.app, post_json(json!({ "user_id": 3, "image": b64(b"alice") }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let expected = format!(
            "Stored image not found for user at {}",
            fx.dir.path().join("missing.jpg").display()
        );
        assert_eq!(body["message"], expected);
    }

    #[tokio::test]
    async fn no_face_in_submitted_image_is_400() {
        let (status, body) = compare(json!({ "user_id": 1, "image": b64(b"noface") })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No face detected");
    }

    #[tokio::test]
    async fn no_face_in_stored_image_is_400() {
        let (status, body) = compare(json!({ "user_id": 4, "image": b64(b"alice") })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No face detected in stored image");
    }

    #[tokio::test]
    async fn invalid_base64_is_generic_500() {
        let (status, body) = compare(json!({ "user_id": 1, "image": "data:image/png;base64,@@@" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "success": false, "message": "An error occurred on the server" }));
    }

    #[tokio::test]
    async fn matcher_failure_is_generic_500() {
        let (status, body) = compare(json!({ "user_id": 1, "image": b64(b"crash") })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An error occurred on the server");
    }

    #[tokio::test]
    async fn connection_released_once_per_request() {
        let fx = fixture();
        let bodies = [
            json!({ "user_id": 1, "image": b64(b"alice") }),
            json!({ "user_id": 1, "image": b64(b"crash") }),
            json!({ "user_id": 99, "image": b64(b"alice") }),
            json!({ "user_id": 1, "image": "!!!" }),
        ];
        for body in &bodies {
            send_json(&fx.app, post_json(body.clone())).await;
        }
        assert_eq!(fx.users.acquired.load(Ordering::SeqCst), bodies.len());
        assert_eq!(fx.users.released.load(Ordering::SeqCst), bodies.len());
    }

    #[tokio::test]
    async fn database_failure_is_500_and_releases() {
        let fx = fixture();
        fx.users.fail.store(true, Ordering::SeqCst);
        let (status, body) =
            send_json(&fx.app, post_json(json!({ "user_id": 1, "image": b64(b"alice") }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An error occurred on the server");
        assert_eq!(fx.users.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(fx.users.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn header_only_image_is_rejected_before_lookup() {
        let fx = fixture();
        for user_id in [1, 99] {
            let body = json!({ "user_id": user_id, "image": "data:image/png;base64," });
            let (status, resp) = send_json(&fx.app, post_json(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "user {user_id}");
            assert_eq!(resp["message"], "No user_id or image provided");
        }
        assert_eq!(fx.users.acquired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn strip_payload_variants() {
        assert_eq!(strip_payload("YWxpY2U="), "YWxpY2U=");
        assert_eq!(strip_payload("data:image/jpeg;base64,YWxp\nY2U="), "YWxpY2U=");
        assert_eq!(strip_payload("data:,"), "");
        assert_eq!(strip_payload(" \t\n"), "");
    }

    #[test]
    fn decode_payload_variants() {
        assert_eq!(decode_payload("YWxpY2U=").unwrap(), b"alice");
        assert_eq!(decode_payload("YWxpY2U").unwrap(), b"alice");
        assert!(matches!(decode_payload("***"), Err(ApiError::Base64(_))));
    }

    #[test]
    fn parse_user_ref_variants() {
        assert_eq!(parse_user_ref(&json!(7)), Some(UserRef::Id(7)));
        assert_eq!(parse_user_ref(&json!(" 7 ")), Some(UserRef::Id(7)));
        assert_eq!(parse_user_ref(&json!("7a")), Some(UserRef::Unknown));
        assert_eq!(parse_user_ref(&json!(-3)), Some(UserRef::Unknown));
        assert_eq!(parse_user_ref(&json!(0)), None);
        assert_eq!(parse_user_ref(&json!(0.0)), None);
        assert_eq!(parse_user_ref(&json!(false)), None);
        assert_eq!(parse_user_ref(&Value::Null), None);
    }
}
