use crate::common::{TestApp, routes};
use serde_json::json;

const VALID_CODE: &str = "91110000600037341L";

#[tokio::test]
async fn requires_admin() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            routes::IMPORT_COMPANIES,
            &json!({ "companies": [{ "name": "Acme" }] }),
        )
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn clean_batch_completes() {
    let app = TestApp::spawn().await;
    app.login().await;

    let res = app
        .post(
            routes::IMPORT_COMPANIES,
            &json!({
                "file_name": "suppliers.xlsx",
                "companies": [
                    { "name": "北京示例科技有限公司", "credit_code": VALID_CODE, "contact_phone": "13800138000" },
                    { "name": "上海样本贸易有限公司", "contactPhone": "021-12345678" },
                ],
            }),
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.data()["status"], "completed");
    assert_eq!(res.data()["success_count"], 2);
    assert_eq!(res.data()["failed_count"], 0);

    let list = app.get(routes::IMPORT_COMPANIES).await;
    assert_eq!(list.data()["pagination"]["total"], 2);
}

#[tokio::test]
async fn bad_rows_are_recorded_as_failures() {
    let app = TestApp::spawn().await;
    app.login().await;

    let res = app
        .post(
            routes::IMPORT_COMPANIES,
            &json!({
                "companies": [
                    { "name": "Good Co" },
                    { "name": "   " },
                    { "name": "Bad Code Co", "credit_code": "123" },
                    { "name": "Bad Phone Co", "contact_phone": "12345" },
                    { "name": "Good Co" },
                ],
            }),
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.data()["status"], "partial");
    assert_eq!(res.data()["success_count"], 1);
    assert_eq!(res.data()["failed_count"], 4);

    let failed_rows: Vec<i64> = res.data()["failures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["row_number"].as_i64().unwrap())
        .collect();
    assert_eq!(failed_rows, vec![2, 3, 4, 5]);

    let import_id = res.data()["import_id"].as_i64().unwrap() as i32;
    let detail = app.get(&routes::import_history(import_id)).await;
    assert_eq!(detail.status, 200);
    assert_eq!(detail.data()["failures"].as_array().unwrap().len(), 4);
    assert_eq!(detail.data()["failures"][1]["raw_data"]["credit_code"], "123");
}

#[tokio::test]
async fn companies_already_stored_fail_on_reimport() {
    let app = TestApp::spawn().await;
    app.login().await;

    let batch = json!({ "companies": [{ "name": "Repeat Co", "credit_code": VALID_CODE }] });
    let first = app.post(routes::IMPORT_COMPANIES, &batch).await;
    assert_eq!(first.data()["status"], "completed");

    let second = app.post(routes::IMPORT_COMPANIES, &batch).await;
    assert_eq!(second.status, 201);
    assert_eq!(second.data()["status"], "failed");
    assert_eq!(second.data()["success_count"], 0);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let app = TestApp::spawn().await;
    app.login().await;

    let res = app
        .post(routes::IMPORT_COMPANIES, &json!({ "companies": [] }))
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn deleting_history_keeps_companies() {
    let app = TestApp::spawn().await;
    app.login().await;

    let res = app
        .post(
            routes::IMPORT_COMPANIES,
            &json!({ "companies": [{ "name": "Keeper Co" }, { "name": "" }] }),
        )
        .await;
    let import_id = res.data()["import_id"].as_i64().unwrap() as i32;

    let history = app.get(routes::IMPORT_HISTORY).await;
    assert_eq!(history.data()["pagination"]["total"], 1);

    let res = app.delete(&routes::import_history(import_id)).await;
    assert_eq!(res.status, 200);
    assert_eq!(app.get(&routes::import_history(import_id)).await.status, 404);

    let companies = app.get(routes::IMPORT_COMPANIES).await;
    assert_eq!(companies.data()["pagination"]["total"], 1);
    assert!(companies.data()["items"][0]["import_id"].is_null());
}

#[tokio::test]
async fn search_and_delete_company() {
    let app = TestApp::spawn().await;
    app.login().await;

    app.post(
        routes::IMPORT_COMPANIES,
        &json!({ "companies": [{ "name": "Alpha Logistics" }, { "name": "Beta Foods" }] }),
    )
    .await;

    let res = app
        .get(&format!("{}?search=alpha", routes::IMPORT_COMPANIES))
        .await;
    assert_eq!(res.data()["pagination"]["total"], 1);
    let id = res.data()["items"][0]["id"].as_i64().unwrap() as i32;

    assert_eq!(app.delete(&routes::company(id)).await.status, 200);
    assert_eq!(app.delete(&routes::company(id)).await.status, 404);
}
