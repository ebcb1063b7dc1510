use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use classmatch::config::Config;
use classmatch::db::MatcherDb;
use classmatch::server::create_router;
use classmatch::types::AppState;

fn calendar(events: &[(&str, &str, &str)]) -> String {
    let mut ics = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n");
    for (i, (summary, start, end)) in events.iter().enumerate() {
        ics.push_str(&format!(
            "BEGIN:VEVENT\r\nUID:{i}-{start}\r\nSUMMARY:{summary}\r\nLOCATION:DH 2060\r\nDTSTART:{start}\r\nDTEND:{end}\r\nEND:VEVENT\r\n"
        ));
    }
    ics.push_str("END:VCALENDAR\r\n");
    ics
}

fn app() -> Router {
    let db = MatcherDb::open_in_memory().unwrap();
    create_router(Arc::new(AppState::new(db, Config::default())))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn upload(app: &Router, client: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post("/upload")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn register(app: &Router, name: &str, email: &str, events: &[(&str, &str, &str)]) {
    let (status, body) = upload(
        app,
        email,
        json!({ "name": name, "email": email, "year": "first", "ics": calendar(events) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

const MON_9: (&str, &str) = ("20250106T140000Z", "20250106T150000Z");
const WED_9: (&str, &str) = ("20250108T140000Z", "20250108T150000Z");
const THU_1: (&str, &str) = ("20250109T180000Z", "20250109T190000Z");

async fn seeded() -> Router {
    let app = app();
    register(
        &app,
        "Ada",
        "ada@mail.utoronto.ca",
        &[
            ("CSC108H5 LEC0101", MON_9.0, MON_9.1),
            ("CSC108H5 LEC0101", WED_9.0, WED_9.1),
            ("MAT102H5 LEC0101", THU_1.0, THU_1.1),
        ],
    )
    .await;
    register(
        &app,
        "Bob",
        "bob@mail.utoronto.ca",
        &[("CSC108H5 LEC0101", MON_9.0, MON_9.1)],
    )
    .await;
    register(
        &app,
        "Cy",
        "cy@mail.utoronto.ca",
        &[("MAT102H5 LEC0102", WED_9.0, WED_9.1)],
    )
    .await;
    app
}

async fn student_id(app: &Router, name: &str) -> String {
    let (_, body) = get(app, &format!("/students?q={name}")).await;
    body["students"][0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(&app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_upload_reports_counts_and_rejects_duplicates() {
    let app = app();
    let body = json!({
        "name": "Ada",
        "email": "ada@mail.utoronto.ca",
        "year": "second",
        "ics": calendar(&[("CSC108H5 LEC0101", MON_9.0, MON_9.1), ("Gym", WED_9.0, WED_9.1)]),
    });

    let (status, first) = upload(&app, "1.1.1.1", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({ "ok": true, "courses": 1, "events": 2 }));

    let (status, dup) = upload(&app, "1.1.1.1", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(dup["ok"], false);
}

#[tokio::test]
async fn test_upload_validation_and_rate_limit() {
    let app = app();
    let bad = json!({ "name": "Ada", "email": "ada", "year": "first", "ics": "BEGIN:VCALENDAR" });

    for _ in 0..5 {
        let (status, body) = upload(&app, "9.9.9.9", bad.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
    }

    let (status, _) = upload(&app, "9.9.9.9", bad.clone()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different client still gets through to validation
    let (status, _) = upload(&app, "8.8.8.8", bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_undecodable_calendar() {
    let app = app();
    let body = json!({
        "name": "Ada",
        "email": "ada@mail.utoronto.ca",
        "year": "first",
        "ics": "this is definitely not a calendar",
    });

    let (status, body) = upload(&app, "2.2.2.2", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);

    let (_, body) = get(&app, "/students").await;
    assert_eq!(body["students"], json!([]));
}

#[tokio::test]
async fn test_classes_endpoint() {
    let app = seeded().await;

    let (status, body) = get(&app, "/classes").await;
    assert_eq!(status, StatusCode::OK);
    let classes = body["classes"].as_array().unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0]["course_code"], "CSC108H5");
    assert_eq!(classes[0]["size"], 2);
    assert_eq!(classes[0]["location"], "DH 2060");

    let (_, body) = get(&app, "/classes?minSize=1&course=mat").await;
    let classes = body["classes"].as_array().unwrap();
    assert_eq!(classes.len(), 2);
    assert!(classes.iter().all(|c| c["course_code"] == "MAT102H5"));

    let (_, body) = get(&app, "/classes?minSize=99999999999999999999").await;
    assert_eq!(body["classes"], json!([]));
}

#[tokio::test]
async fn test_matches_endpoint() {
    let app = seeded().await;

    let (status, body) = get(&app, "/matches?email=ada@mail.utoronto.ca").await;
    assert_eq!(status, StatusCode::OK);
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["student"]["name"], "Bob");
    assert_eq!(matches[0]["sharedCourses"], json!(["CSC108H5"]));
    assert_eq!(matches[1]["student"]["name"], "Cy");
    assert_eq!(matches[1]["sharedCourses"], json!(["MAT102H5"]));

    // Cy's MAT102 section meets at a different time
    let ada = student_id(&app, "ada").await;
    let (_, body) = get(&app, &format!("/matches?id={ada}&mode=classes")).await;
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["student"]["name"], "Bob");
}

#[tokio::test]
async fn test_matches_errors() {
    let app = seeded().await;

    let (status, body) = get(&app, "/matches").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Provide email or id");

    let (status, _) = get(&app, "/matches?email=ghost@mail.utoronto.ca").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/matches?email=ada@mail.utoronto.ca&mode=sections").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_match_detail_endpoint() {
    let app = seeded().await;
    let bob = student_id(&app, "bob").await;

    let uri = format!("/match-detail?meEmail=ada@mail.utoronto.ca&otherId={bob}");
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let shared = body["sharedCourses"].as_array().unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0]["course_code"], "CSC108H5");
    assert_eq!(shared[0]["myEvents"].as_array().unwrap().len(), 2);
    assert_eq!(shared[0]["otherEvents"].as_array().unwrap().len(), 1);

    let (_, body) = get(&app, &format!("{uri}&mode=classes")).await;
    let shared = body["sharedCourses"].as_array().unwrap();
    assert_eq!(shared[0]["myEvents"].as_array().unwrap().len(), 1);

    let (status, body) = get(&app, "/match-detail?meEmail=ada@mail.utoronto.ca").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "meEmail and otherId required");
}

#[tokio::test]
async fn test_feature_votes() {
    let app = app();

    let (_, body) = get(&app, "/feature").await;
    assert_eq!(body["count"], 0);

    let post = || Request::post("/feature?key=allow-updates").body(Body::empty()).unwrap();
    send(&app, post()).await;
    let (status, body) = send(&app, post()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = get(&app, "/feature?key=allow-updates").await;
    assert_eq!(body["count"], 2);
}
