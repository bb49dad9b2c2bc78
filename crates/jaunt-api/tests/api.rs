use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use jaunt_api::{AppState, AppStateInner, router};
use jaunt_db::Database;
use jaunt_store::DiskStore;

const CDN_BASE: &str = "http://cdn.test/storage";

async fn test_app() -> (Router, AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let store = Arc::new(
        DiskStore::new(
            dir.path().to_path_buf(),
            "http://localhost:3000/storage".into(),
            CDN_BASE.into(),
            "test-secret".into(),
        )
        .await
        .unwrap(),
    );
    let state = Arc::new(AppStateInner { db, store });
    (router(state.clone()), state, dir)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(path: &str, email: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("X-User-Email", email)
        .body(Body::empty())
        .unwrap()
}

fn post_json(path: &str, email: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("X-User-Email", email)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_trip(app: &Router, email: &str, title: &str) -> String {
    let (status, body) = send(app, post_json("/api/trips", email, json!({ "title": title }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn create_moment(app: &Router, email: &str, trip_id: &str, body: Value) -> String {
    let (status, body) = send(
        app,
        post_json(&format!("/api/trips/{}/moments", trip_id), email, body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let (app, _state, _dir) = test_app().await;

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn missing_email_is_unauthorized_everywhere() {
    let (app, _state, _dir) = test_app().await;

    for path in ["/api/me", "/api/trips"] {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(body["error"]["kind"], json!("unauthorized"));
    }

    // An all-whitespace email is as good as none.
    let (status, _) = send(&app, get("/api/me", "   ")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_normalizes_the_email() {
    let (app, _state, _dir) = test_app().await;

    let (status, body) = send(&app, get("/api/me", "  Ann@Example.COM ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("ann@example.com"));
    assert!(body["userId"].as_str().is_some());

    // A second request resolves to the same user.
    let (_, second) = send(&app, get("/api/me", "ann@example.com")).await;
    assert_eq!(second["userId"], body["userId"]);
}

#[tokio::test]
async fn trip_create_defaults_and_lists_for_a_new_user() {
    let (app, _state, _dir) = test_app().await;

    let (status, trip) = send(
        &app,
        post_json("/api/trips", "ann@example.com", json!({ "title": "Paris" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(trip["title"], json!("Paris"));
    assert_eq!(trip["timezone"], json!("America/New_York"));
    assert_eq!(trip["startDate"], Value::Null);
    assert_eq!(trip["endDate"], Value::Null);
    assert_eq!(trip["coverUrl"], Value::Null);
    let id = trip["id"].as_str().unwrap();

    let (status, listed) = send(&app, get("/api/trips", "ann@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], json!(id));
}

#[tokio::test]
async fn trip_create_requires_a_title() {
    let (app, _state, _dir) = test_app().await;

    for body in [json!({}), json!({ "title": "   " })] {
        let (status, err) = send(&app, post_json("/api/trips", "ann@example.com", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["kind"], json!("bad_request"));
    }
}

#[tokio::test]
async fn get_trip_distinguishes_missing_from_forbidden() {
    let (app, _state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    let (status, body) = send(&app, get(&format!("/api/trips/{}", trip), "ann@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], json!("Paris"));

    // A non-member sees 403 for an existing trip...
    let (status, body) = send(&app, get(&format!("/api/trips/{}", trip), "ben@example.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["kind"], json!("forbidden"));

    // ...and 404 for a missing one, same as the owner.
    let missing = uuid::Uuid::new_v4();
    for email in ["ann@example.com", "ben@example.com"] {
        let (status, _) = send(&app, get(&format!("/api/trips/{}", missing), email)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn former_members_lose_access() {
    let (app, state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    // Enroll Ben, verify access, then deactivate him.
    let (_, ben) = send(&app, get("/api/me", "ben@example.com")).await;
    let ben_id = ben["userId"].as_str().unwrap().to_string();

    state
        .db
        .with_writer(|conn| {
            conn.execute(
                "INSERT INTO trip_members (trip_id, user_id, role, status)
                 VALUES (?1, ?2, 'member', 'active')",
                [&trip, &ben_id],
            )?;
            Ok(())
        })
        .unwrap();

    let (status, _) = send(&app, get(&format!("/api/trips/{}", trip), "ben@example.com")).await;
    assert_eq!(status, StatusCode::OK);

    state
        .db
        .with_writer(|conn| {
            conn.execute(
                "UPDATE trip_members SET status = 'removed' WHERE trip_id = ?1 AND user_id = ?2",
                [&trip, &ben_id],
            )?;
            Ok(())
        })
        .unwrap();

    for path in [
        format!("/api/trips/{}", trip),
        format!("/api/trips/{}/moments", trip),
    ] {
        let (status, _) = send(&app, get(&path, "ben@example.com")).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", path);
    }
}

#[tokio::test]
async fn moment_aggregates_carry_day_keys_and_child_arrays() {
    let (app, _state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    let dated = create_moment(
        &app,
        "ann@example.com",
        &trip,
        json!({ "story": "Louvre day", "locationName": "Louvre", "momentTime": "2026-05-02T10:00:00Z" }),
    )
    .await;
    let bare = create_moment(&app, "ann@example.com", &trip, json!({})).await;

    let (status, body) = send(
        &app,
        get(&format!("/api/trips/{}/moments", trip), "ann@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let moments = body.as_array().unwrap();
    assert_eq!(moments.len(), 2);

    // The dated moment sorts before today's bare one and buckets by its
    // own UTC date; the bare moment buckets by creation date.
    assert_eq!(moments[0]["id"], json!(dated));
    assert_eq!(moments[0]["dayKey"], json!("2026-05-02"));
    assert_eq!(moments[0]["story"], json!("Louvre day"));

    assert_eq!(moments[1]["id"], json!(bare));
    assert_eq!(moments[1]["story"], Value::Null);
    let today = chrono::Utc::now().date_naive().to_string();
    assert_eq!(moments[1]["dayKey"], json!(today));

    // Child collections are always present, even when empty.
    for moment in moments {
        assert!(moment["media"].as_array().is_some());
        assert!(moment["attachments"].as_array().is_some());
    }
}

#[tokio::test]
async fn moments_are_gated_by_membership() {
    let (app, _state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    let (status, _) = send(
        &app,
        get(&format!("/api/trips/{}/moments", trip), "ben@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        post_json(
            &format!("/api/trips/{}/moments", trip),
            "ben@example.com",
            json!({ "story": "sneaky" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sign_upload_namespaces_keys_and_checks_access() {
    let (app, _state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/uploads/sign",
            "ann@example.com",
            json!({ "tripId": trip, "kind": "media", "filename": "My Photo.jpg" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let key = body["storageKey"].as_str().unwrap();
    assert!(key.starts_with(&format!("trips/{}/media/", trip)));
    assert!(key.ends_with("_My_Photo.jpg"));
    assert_eq!(body["cdnUrl"], json!(format!("{}/{}", CDN_BASE, key)));
    let signed = body["signedUrl"].as_str().unwrap();
    assert!(signed.contains("expires="));
    assert!(signed.contains("sig="));

    // Unknown kinds land under attachments.
    let (_, body) = send(
        &app,
        post_json(
            "/api/uploads/sign",
            "ann@example.com",
            json!({ "tripId": trip, "kind": "gpx", "filename": "route.gpx" }),
        ),
    )
    .await;
    let key = body["storageKey"].as_str().unwrap();
    assert!(key.starts_with(&format!("trips/{}/attachments/", trip)));

    let (status, _) = send(
        &app,
        post_json(
            "/api/uploads/sign",
            "ann@example.com",
            json!({ "tripId": trip, "kind": "media" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/api/uploads/sign",
            "ben@example.com",
            json!({ "tripId": trip, "kind": "media", "filename": "a.jpg" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signed_put_round_trips_through_the_storage_gateway() {
    let (app, _state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    let (_, body) = send(
        &app,
        post_json(
            "/api/uploads/sign",
            "ann@example.com",
            json!({ "tripId": trip, "kind": "media", "filename": "beach.jpg" }),
        ),
    )
    .await;
    let key = body["storageKey"].as_str().unwrap().to_string();
    let signed = body["signedUrl"].as_str().unwrap();
    let path_and_query = signed.strip_prefix("http://localhost:3000").unwrap();

    let put = Request::builder()
        .method("PUT")
        .uri(path_and_query)
        .body(Body::from("jpeg bytes"))
        .unwrap();
    let (status, _) = send(&app, put).await;
    assert_eq!(status, StatusCode::OK);

    // The public read surface serves the object back.
    let read = Request::builder()
        .uri(format!("/storage/{}", key))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(read).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"jpeg bytes");

    // A tampered signature may not write.
    let forged = Request::builder()
        .method("PUT")
        .uri(format!("/storage/{}?expires=9999999999&sig=deadbeef", key))
        .body(Body::from("evil"))
        .unwrap();
    let (status, _) = send(&app, forged).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn media_commit_rejects_moments_from_other_trips() {
    let (app, _state, _dir) = test_app().await;
    let trip_a = create_trip(&app, "ann@example.com", "Paris").await;
    let trip_b = create_trip(&app, "ann@example.com", "Tokyo").await;
    let moment_a = create_moment(&app, "ann@example.com", &trip_a, json!({})).await;

    // Legitimate commit onto trip A.
    let (status, body) = send(
        &app,
        post_json(
            "/api/media/commit",
            "ann@example.com",
            json!({
                "tripId": trip_a,
                "momentId": moment_a,
                "type": "photo",
                "storageKey": format!("trips/{}/media/aa_x.jpg", trip_a),
                "sizeBytes": 1024,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_str().is_some());

    // Same moment under trip B is not-found despite full access to B.
    let (status, body) = send(
        &app,
        post_json(
            "/api/media/commit",
            "ann@example.com",
            json!({
                "tripId": trip_b,
                "momentId": moment_a,
                "type": "photo",
                "storageKey": format!("trips/{}/media/aa_x.jpg", trip_b),
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], json!("not_found"));

    // The committed media shows up in the aggregate listing.
    let (_, body) = send(
        &app,
        get(&format!("/api/trips/{}/moments", trip_a), "ann@example.com"),
    )
    .await;
    let media = body[0]["media"].as_array().unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0]["type"], json!("photo"));
    assert_eq!(media[0]["sizeBytes"], json!(1024));
}

#[tokio::test]
async fn attachment_commit_supports_trip_level_links() {
    let (app, _state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/attachments/commit",
            "ann@example.com",
            json!({
                "tripId": trip,
                "type": "link",
                "title": "Booking",
                "url": "https://example.com/booking",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_str().is_some());

    let (status, _) = send(
        &app,
        post_json(
            "/api/attachments/commit",
            "ann@example.com",
            json!({ "tripId": trip }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/api/attachments/commit",
            "ben@example.com",
            json!({ "tripId": trip, "type": "link", "url": "https://example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn proxy_upload_stores_and_reports_the_object() {
    let (app, _state, _dir) = test_app().await;
    let trip = create_trip(&app, "ann@example.com", "Paris").await;

    let boundary = "test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    for (name, value) in [("tripId", trip.as_str()), ("kind", "media")] {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"beach.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
            boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"jpeg bytes");
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let req = Request::builder()
        .method("POST")
        .uri("/api/uploads/proxy")
        .header("X-User-Email", "ann@example.com")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sizeBytes"], json!(10));
    assert_eq!(body["contentType"], json!("image/jpeg"));
    let key = body["storageKey"].as_str().unwrap();
    assert!(key.starts_with(&format!("trips/{}/media/", trip)));
    assert!(key.ends_with("_beach.jpg"));

    let read = Request::builder()
        .uri(format!("/storage/{}", key))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(read).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"jpeg bytes");
}
