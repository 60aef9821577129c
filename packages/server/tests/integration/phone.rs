use crate::common::{TestApp, routes};
use serde_json::json;

#[tokio::test]
async fn invalid_numbers_are_rejected() {
    let app = TestApp::spawn().await;

    for phone in ["12800138000", "1380013800", "138001380000", "abc", "23800138000"] {
        let res = app.get(&routes::phone_lookup(phone)).await;
        assert_eq!(res.status, 400, "{phone} should be rejected");
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn lookup_stores_then_serves_from_cache() {
    let app = TestApp::spawn().await;

    let first = app.get(&routes::phone_lookup("13800138000")).await;
    assert_eq!(first.status, 200, "{}", first.text);
    assert_eq!(first.data()["carrier"], "中国移动");
    assert_eq!(first.data()["source"], "prefix");
    assert_eq!(first.data()["cached"], false);

    let second = app.get(&routes::phone_lookup("13800138000")).await;
    assert_eq!(second.data()["cached"], true);
    assert_eq!(second.data()["carrier"], "中国移动");

    let list = app.get(routes::PHONE_NUMBERS).await;
    assert_eq!(list.data()["pagination"]["total"], 1);
}

#[tokio::test]
async fn unknown_segment_is_an_upstream_error() {
    let app = TestApp::spawn().await;

    let res = app.get(&routes::phone_lookup("14000000000")).await;
    assert_eq!(res.status, 502);
    assert_eq!(res.body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn batch_reports_per_number() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            routes::PHONE_BATCH,
            &json!({ "phones": ["13800138000", "18612345678", "not-a-phone"] }),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["total"], 3);
    assert_eq!(res.data()["succeeded"], 2);
    assert_eq!(res.data()["failed"], 1);
    assert_eq!(res.data()["results"][1]["result"]["carrier"], "中国联通");
    assert!(res.data()["results"][2]["error"].is_string());
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let app = TestApp::spawn().await;

    let phones: Vec<String> = (0..101).map(|i| format!("138{i:08}")).collect();
    let res = app
        .post(routes::PHONE_BATCH, &json!({ "phones": phones }))
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn manual_correction_survives_lookup() {
    let app = TestApp::spawn().await;
    app.get(&routes::phone_lookup("13800138000")).await;

    let res = app
        .put(
            &routes::phone_number("13800138000"),
            &json!({ "carrier": "中国联通" }),
        )
        .await;
    assert_eq!(res.status, 401);

    app.login().await;
    let res = app
        .put(
            &routes::phone_number("13800138000"),
            &json!({ "carrier": "中国联通", "province": "北京", "note": "转网用户" }),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.data()["source"], "manual");

    let lookup = app.get(&routes::phone_lookup("13800138000")).await;
    assert_eq!(lookup.data()["carrier"], "中国联通");
    assert_eq!(lookup.data()["province"], "北京");
    assert_eq!(lookup.data()["note"], "转网用户");
}

#[tokio::test]
async fn list_filters_by_carrier() {
    let app = TestApp::spawn().await;
    app.get(&routes::phone_lookup("13800138000")).await;
    app.get(&routes::phone_lookup("18612345678")).await;
    app.get(&routes::phone_lookup("18912345678")).await;

    let res = app
        .get(&format!("{}?carrier=中国电信", routes::PHONE_NUMBERS))
        .await;
    assert_eq!(res.data()["pagination"]["total"], 1);
    assert_eq!(res.data()["items"][0]["phone"], "18912345678");
}

#[tokio::test]
async fn delete_removes_the_number() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.get(&routes::phone_lookup("13800138000")).await;

    assert_eq!(app.delete(&routes::phone_number("13800138000")).await.status, 200);
    assert_eq!(app.delete(&routes::phone_number("13800138000")).await.status, 404);

    let lookup = app.get(&routes::phone_lookup("13800138000")).await;
    assert_eq!(lookup.data()["cached"], false);
}
