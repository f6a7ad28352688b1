//! End-to-end tests: drive the router with in-memory requests against an
//! in-memory database and check the team, user, run and reset flows.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use adventlauf_api::routes::router;
use adventlauf_api::state::{AppState, AppStateInner};
use adventlauf_db::Database;

fn app() -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        session_secret: "test-secret".into(),
        session_ttl_days: 1,
    });
    (router(state.clone()), state)
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(resp: &Response<Body>) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
}

fn set_cookie(resp: &Response<Body>) -> &str {
    resp.headers()[header::SET_COOKIE].to_str().unwrap()
}

/// Log in and return the `name=value` part of the session cookie.
async fn login(app: &Router, team: &str, pin: &str, action: &str) -> String {
    let body = format!("team_name={}&pin_code={}&action={}", team, pin, action);
    let resp = send(app, post_form("/team", None, &body)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    set_cookie(&resp).split(';').next().unwrap().to_string()
}

async fn dashboard(app: &Router, cookie: &str) -> Value {
    let resp = send(app, get("/", Some(cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    json(resp).await
}

fn door_id(dashboard: &Value, number: u64) -> String {
    dashboard["doors"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["number"] == number)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn add_user(app: &Router, cookie: &str, name: &str) -> Response<Body> {
    let body = format!("neuer_nutzer_name={}", name);
    send(app, post_form("/add_user", Some(cookie), &body)).await
}

async fn reset_door(app: &Router, cookie: &str, door: &str) -> Response<Body> {
    let uri = format!("/tuer_zuruecksetzen/{}", door);
    send(app, post_form(&uri, Some(cookie), "")).await
}

async fn team_form(app: &Router, body: &str) -> Response<Body> {
    send(app, post_form("/team", None, body)).await
}

async fn log_run(app: &Router, cookie: &str, user: &str, door: &str, km: &str) -> Response<Body> {
    let body = format!("user_id={}&tuer_id={}&kilometer={}", user, door, km);
    send(app, post_form("/lauf_eintragen", Some(cookie), &body)).await
}

#[tokio::test]
async fn full_door_lifecycle() {
    let (app, _) = app();
    let cookie = login(&app, "Foo", "1234", "join").await;

    let board = dashboard(&app, &cookie).await;
    assert_eq!(board["team_name"], "Foo");
    assert_eq!(board["can_write"], true);
    let numbers: Vec<u64> = board["doors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, (1..=24).collect::<Vec<_>>());
    assert_eq!(board["total_target_km"], 300.0);
    assert_eq!(board["total_reached_km"], 0.0);

    let resp = add_user(&app, &cookie, "A").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json(resp).await;
    assert_eq!(body["user"]["color"], "#007bff");
    assert_eq!(body["message"], "Nutzer A hinzugefügt.");
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let door5 = door_id(&board, 5);
    let resp = send(&app, get(&format!("/lauf_erfassen_formular/{}", door5), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let form = json(resp).await;
    assert_eq!(form["remaining_km"], 5.0);
    assert_eq!(form["users"].as_array().unwrap().len(), 1);

    let resp = log_run(&app, &cookie, &user_id, &door5, "5").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json(resp).await["contribution"]["km"], 5.0);

    let board = dashboard(&app, &cookie).await;
    let d5 = &board["doors"][4];
    assert_eq!(d5["reached_km"], 5.0);
    assert_eq!(d5["done"], true);
    assert_eq!(d5["shares"][0]["percent"], 100.0);
    assert_eq!(board["total_reached_km"], 5.0);

    let resp = log_run(&app, &cookie, &user_id, &door5, "1").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json(resp).await["error"],
        "Fehler: Es können nur noch maximal 0.0 km eingetragen werden."
    );

    let resp = send(&app, get(&format!("/lauf_erfassen_formular/{}", door5), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(resp).await["error"], "Türchen 5 ist bereits voll gelaufen!");

    let resp = reset_door(&app, &cookie, &door5).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp).await["removed"], 1);

    let board = dashboard(&app, &cookie).await;
    assert_eq!(board["doors"][4]["reached_km"], 0.0);
    assert_eq!(board["doors"][4]["done"], false);
    assert!(board["doors"][4]["shares"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn partial_runs_report_remaining_capacity() {
    let (app, _) = app();
    let cookie = login(&app, "Foo", "1234", "join").await;
    let user = json(add_user(&app, &cookie, "A").await).await;
    let user_id = user["user"]["id"].as_str().unwrap().to_string();
    let door3 = door_id(&dashboard(&app, &cookie).await, 3);

    let resp = log_run(&app, &cookie, &user_id, &door3, "1.5").await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = log_run(&app, &cookie, &user_id, &door3, "2").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json(resp).await["error"],
        "Fehler: Es können nur noch maximal 1.5 km eingetragen werden."
    );
}

#[tokio::test]
async fn view_session_cannot_write() {
    let (app, _) = app();
    let writer = login(&app, "Foo", "1234", "join").await;
    let user = json(add_user(&app, &writer, "A").await).await;
    let user_id = user["user"]["id"].as_str().unwrap().to_string();

    let viewer = login(&app, "Foo", "", "view").await;
    let board = dashboard(&app, &viewer).await;
    assert_eq!(board["can_write"], false);
    let door1 = door_id(&board, 1);

    assert_eq!(add_user(&app, &viewer, "B").await.status(), StatusCode::FORBIDDEN);
    // Invalid input is still forbidden, not a validation error
    assert_eq!(add_user(&app, &viewer, "").await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        log_run(&app, &viewer, &user_id, &door1, "1").await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        log_run(&app, &viewer, "", "", "abc").await.status(),
        StatusCode::FORBIDDEN
    );
    let resp = reset_door(&app, &viewer, &door1).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Refused before the body is looked at, whatever its content type
    let req = Request::post("/add_user")
        .header(header::COOKIE, &viewer)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = Request::post("/lauf_eintragen")
        .header(header::COOKIE, &viewer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(dashboard(&app, &writer).await["users"].as_array().unwrap().len(), 1);

    // Reading the entry form is allowed
    let resp = send(&app, get(&format!("/lauf_erfassen_formular/{}", door1), Some(&viewer))).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rules() {
    let (app, _) = app();

    let resp = team_form(&app, "team_name=Foo&pin_code=&action=view").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(resp).await["error"], "Team Foo existiert nicht.");

    let resp = team_form(&app, "team_name=Foo&pin_code=12a4&action=join").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = team_form(&app, "team_name=&pin_code=1234&action=join").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = team_form(&app, "team_name=Foo&pin_code=1234&action=steal").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let long_name = "x".repeat(51);
    let resp = team_form(&app, &format!("team_name={}&pin_code=1234&action=join", long_name)).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(resp).await["error"], "Teamname ist zu lang (maximal 50 Zeichen).");
    let resp = add_user(&app, &login(&app, "Long", "1234", "join").await, &long_name).await;
    assert_eq!(json(resp).await["error"], "Name ist zu lang (maximal 50 Zeichen).");

    login(&app, "Foo", "1234", "join").await;

    let resp = team_form(&app, "team_name=Foo&pin_code=9999&action=join").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(resp).await["error"], "Falsche PIN.");

    // Correct PIN on an existing team grants write access again
    let cookie = login(&app, "Foo", "1234", "join").await;
    assert_eq!(dashboard(&app, &cookie).await["can_write"], true);

    let resp = send(&app, get("/team", Some(&cookie))).await;
    let info = json(resp).await;
    assert_eq!(info["team"]["name"], "Foo");
    assert_eq!(info["can_write"], true);
}

#[tokio::test]
async fn missing_session_redirects_to_login() {
    let (app, _) = app();

    let resp = send(&app, get("/", None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/team");

    let resp = send(&app, get("/", Some("adventlauf_session=garbage"))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = send(&app, get("/logout", None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/team");
    assert!(set_cookie(&resp).contains("Max-Age=0"));

    let resp = send(&app, get("/team", None)).await;
    assert_eq!(json(resp).await["team"], Value::Null);
}

#[tokio::test]
async fn deleted_team_invalidates_session() {
    let (app, state) = app();
    let cookie = login(&app, "Foo", "1234", "join").await;
    let info = json(send(&app, get("/team", Some(&cookie))).await).await;
    let team_id = info["team"]["id"].as_str().unwrap().to_string();

    assert!(state.db.delete_team(&team_id).unwrap());

    let resp = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/team");
    assert!(set_cookie(&resp).contains("Max-Age=0"));
}

#[tokio::test]
async fn fourth_user_is_rejected() {
    let (app, _) = app();
    let cookie = login(&app, "Foo", "1234", "join").await;

    let mut colors = Vec::new();
    for name in ["A", "B", "C"] {
        let resp = add_user(&app, &cookie, name).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        colors.push(json(resp).await["user"]["color"].as_str().unwrap().to_string());
    }
    assert_eq!(colors, vec!["#007bff", "#28a745", "#ff9800"]);

    let resp = add_user(&app, &cookie, "A").await;
    assert_eq!(json(resp).await["error"], "Name existiert bereits.");

    let resp = add_user(&app, &cookie, "D").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(resp).await["error"], "Maximale Teamgröße (3 Personen) erreicht.");

    assert_eq!(dashboard(&app, &cookie).await["users"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn other_teams_are_out_of_reach() {
    let (app, _) = app();
    let foo = login(&app, "Foo", "1234", "join").await;
    let bar = login(&app, "Bar", "5678", "join").await;

    let foo_user = json(add_user(&app, &foo, "A").await).await;
    let foo_user_id = foo_user["user"]["id"].as_str().unwrap().to_string();
    let bar_user = json(add_user(&app, &bar, "A").await).await;
    let bar_user_id = bar_user["user"]["id"].as_str().unwrap().to_string();
    let foo_door = door_id(&dashboard(&app, &foo).await, 7);
    let bar_door = door_id(&dashboard(&app, &bar).await, 7);

    let resp = reset_door(&app, &bar, &foo_door).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    assert_eq!(
        log_run(&app, &bar, &bar_user_id, &foo_door, "1").await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        log_run(&app, &bar, &foo_user_id, &bar_door, "1").await.status(),
        StatusCode::FORBIDDEN
    );

    let unknown = uuid::Uuid::new_v4();
    let resp = send(&app, get(&format!("/lauf_erfassen_formular/{}", unknown), Some(&foo))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        log_run(&app, &foo, &foo_user_id, &unknown.to_string(), "1").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn bad_distance_input_is_a_validation_error() {
    let (app, _) = app();
    let cookie = login(&app, "Foo", "1234", "join").await;
    let user = json(add_user(&app, &cookie, "A").await).await;
    let user_id = user["user"]["id"].as_str().unwrap().to_string();
    let door = door_id(&dashboard(&app, &cookie).await, 10);

    let resp = log_run(&app, &cookie, &user_id, &door, "abc").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(resp).await["error"], "Ungültige Kilometer-Angabe.");

    let resp = log_run(&app, &cookie, &user_id, &door, "-2").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = log_run(&app, &cookie, "", &door, "2").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(resp).await["error"], "Fehler beim Eintragen des Laufs.");

    assert_eq!(dashboard(&app, &cookie).await["total_reached_km"], 0.0);
}

#[tokio::test]
async fn malformed_door_ids_are_not_found() {
    let (app, _) = app();
    let cookie = login(&app, "Foo", "1234", "join").await;

    let resp = send(&app, get("/lauf_erfassen_formular/42", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = reset_door(&app, &cookie, "42").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = reset_door(&app, &cookie, "not-a-door").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_session_lifetime_is_an_error_not_a_crash() {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        session_secret: "test-secret".into(),
        session_ttl_days: 1_000_000_000_000,
    });
    let app = router(state);

    let resp = team_form(&app, "team_name=Foo&pin_code=1234&action=join").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
