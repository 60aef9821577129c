use crate::common::{TestApp, routes};
use serde_json::json;

#[tokio::test]
async fn defaults_are_seeded() {
    let app = TestApp::spawn().await;
    app.login().await;

    let res = app.get(routes::SYSTEM_CONFIG).await;
    assert_eq!(res.status, 200);
    let keys: Vec<&str> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"training_pass_score"));

    let pass = app.get(&routes::system_config("training_pass_score")).await;
    assert_eq!(pass.data()["value"], "60");
}

#[tokio::test]
async fn upsert_creates_then_updates() {
    let app = TestApp::spawn().await;
    app.login().await;

    let res = app
        .put(
            &routes::system_config("notice_banner"),
            &json!({ "value": "Office closed Friday", "description": "Header banner" }),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app
        .put(
            &routes::system_config("notice_banner"),
            &json!({ "value": "Office open" }),
        )
        .await;
    assert_eq!(res.status, 200);

    let res = app.get(&routes::system_config("notice_banner")).await;
    assert_eq!(res.data()["value"], "Office open");
    assert_eq!(res.data()["description"], "Header banner");
}

#[tokio::test]
async fn pass_score_must_be_a_percentage() {
    let app = TestApp::spawn().await;
    app.login().await;

    let res = app
        .put(
            &routes::system_config("training_pass_score"),
            &json!({ "value": "150" }),
        )
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn delete_then_missing() {
    let app = TestApp::spawn().await;
    app.login().await;

    assert_eq!(app.delete(&routes::system_config("site_name")).await.status, 200);
    assert_eq!(app.get(&routes::system_config("site_name")).await.status, 404);
    assert_eq!(app.delete(&routes::system_config("site_name")).await.status, 404);
}
