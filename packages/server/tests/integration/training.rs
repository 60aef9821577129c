use crate::common::{TestApp, routes};
use serde_json::{Value, json};

/// Set with three questions answered A, B, C. Returns (set_id, question ids).
async fn seeded_set(app: &TestApp) -> (i32, Vec<i32>) {
    let set_id = app.create_set("Fire safety").await;
    let mut ids = Vec::new();
    for (text, answer) in [("Q one", "A"), ("Q two", "B"), ("Q three", "C")] {
        ids.push(app.create_question(set_id, text, answer).await);
    }
    (set_id, ids)
}

async fn submit(app: &TestApp, set_id: i32, answers: Value) -> crate::common::TestResponse {
    app.post(
        routes::RECORDS,
        &json!({ "employee_name": "张三", "set_id": set_id, "answers": answers }),
    )
    .await
}

mod categories {
    use super::*;

    #[tokio::test]
    async fn defaults_are_seeded_in_order() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::CATEGORIES).await;
        assert_eq!(res.status, 200);
        let items = res.data().as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0]["name"], "安全生产");
        assert_eq!(items[0]["set_count"], 0);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let app = TestApp::spawn().await;
        app.login().await;

        let res = app
            .post(routes::CATEGORIES, &json!({ "name": "安全生产" }))
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn category_in_use_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        app.login().await;

        let created = app
            .post(routes::CATEGORIES, &json!({ "name": "Onboarding", "color": "#000000" }))
            .await;
        assert_eq!(created.status, 201, "{}", created.text);
        let category_id = created.id();

        let set = app
            .post(
                routes::SETS,
                &json!({ "name": "Week one", "category_id": category_id }),
            )
            .await;
        assert_eq!(set.status, 201);

        let list = app.get(routes::CATEGORIES).await;
        let entry = list
            .data()
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["id"] == category_id)
            .unwrap();
        assert_eq!(entry["set_count"], 1);

        let res = app.delete(&routes::category(category_id)).await;
        assert_eq!(res.status, 409);

        let res = app.delete(&routes::set(set.id())).await;
        assert_eq!(res.status, 200);
        let res = app.delete(&routes::category(category_id)).await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn mutations_need_admin() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::CATEGORIES, &json!({ "name": "Anything" }))
            .await;
        assert_eq!(res.status, 401);
    }
}

mod sets {
    use super::*;

    #[tokio::test]
    async fn create_then_fetch_returns_same_fields() {
        let app = TestApp::spawn().await;
        app.login().await;

        let created = app
            .post(
                routes::SETS,
                &json!({ "name": "Warehouse rules", "description": "Forklift basics", "is_active": false }),
            )
            .await;
        assert_eq!(created.status, 201);

        let fetched = app.get(&routes::set(created.id())).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.data(), created.data());
        assert_eq!(fetched.data()["name"], "Warehouse rules");
        assert_eq!(fetched.data()["description"], "Forklift basics");
        assert_eq!(fetched.data()["is_active"], false);
        assert_eq!(fetched.data()["total_questions"], 0);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = TestApp::spawn().await;
        app.login().await;

        let res = app.post(routes::SETS, &json!({ "name": "   " })).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let app = TestApp::spawn().await;
        app.login().await;

        let res = app
            .post(routes::SETS, &json!({ "name": "Orphan", "category_id": 9999 }))
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn list_filters_active_and_paginates() {
        let app = TestApp::spawn().await;
        app.login().await;

        for i in 0..3 {
            app.create_set(&format!("Set {i}")).await;
        }
        app.post(routes::SETS, &json!({ "name": "Hidden", "is_active": false }))
            .await;

        let res = app
            .get(&format!("{}?active_only=true&limit=2", routes::SETS))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["items"].as_array().unwrap().len(), 2);
        assert_eq!(res.data()["pagination"]["total"], 3);
        assert_eq!(res.data()["pagination"]["totalPages"], 2);
        assert_eq!(res.data()["pagination"]["hasMore"], true);

        let last = app
            .get(&format!("{}?active_only=true&limit=2&page=2", routes::SETS))
            .await;
        assert_eq!(last.data()["items"].as_array().unwrap().len(), 1);
        assert_eq!(last.data()["pagination"]["hasMore"], false);
    }

    #[tokio::test]
    async fn huge_page_number_returns_an_empty_page() {
        let app = TestApp::spawn().await;
        app.login().await;
        app.create_set("Only set").await;

        let res = app
            .get(&format!("{}?page=18446744073709551615&limit=100", routes::SETS))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.data()["items"].as_array().unwrap().is_empty());
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["pagination"]["hasMore"], false);
    }

    #[tokio::test]
    async fn exam_view_hides_answers() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, _) = seeded_set(&app).await;

        let res = app.get(&routes::set_questions(set_id)).await;
        assert_eq!(res.status, 200);
        let questions = res.data()["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 3);
        for q in questions {
            assert!(q.get("correct_answer").is_none());
            assert!(q.get("explanation").is_none());
        }
        assert_eq!(res.data()["set"]["total_questions"], 3);
    }

    #[tokio::test]
    async fn set_with_records_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, ids) = seeded_set(&app).await;

        let res = submit(&app, set_id, json!({ ids[0].to_string(): "A" })).await;
        assert_eq!(res.status, 201, "{}", res.text);

        let res = app.delete(&routes::set(set_id)).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        let still_there = app.get(&routes::set(set_id)).await;
        assert_eq!(still_there.status, 200);
    }

    #[tokio::test]
    async fn delete_removes_questions_with_the_set() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, ids) = seeded_set(&app).await;

        let res = app.delete(&routes::set(set_id)).await;
        assert_eq!(res.status, 200);

        assert_eq!(app.get(&routes::set(set_id)).await.status, 404);
        assert_eq!(app.get(&routes::question(ids[0])).await.status, 404);
    }
}

mod records {
    use super::*;

    #[tokio::test]
    async fn submission_is_graded_server_side() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, ids) = seeded_set(&app).await;

        let answers = json!({
            ids[0].to_string(): "A",
            ids[1].to_string(): "b",
            ids[2].to_string(): "D",
        });
        let res = submit(&app, set_id, answers).await;
        assert_eq!(res.status, 201);
        assert_eq!(res.data()["correctCount"], 2);
        assert_eq!(res.data()["totalQuestions"], 3);
        assert_eq!(res.data()["score"], 67);
        assert_eq!(res.data()["passed"], true);
        assert_eq!(res.data()["results"].as_array().unwrap().len(), 3);
        assert_eq!(res.data()["results"][2]["is_correct"], false);
        assert_eq!(res.data()["results"][2]["correct_answer"], "C");

        let record_id = res.data()["recordId"].as_i64().unwrap() as i32;
        let stored = app.get(&routes::record(record_id)).await;
        assert_eq!(stored.status, 200);
        assert_eq!(stored.data()["score"], 67);
        assert_eq!(stored.data()["employee_name"], "张三");
    }

    #[tokio::test]
    async fn client_ip_comes_from_forwarded_header() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, ids) = seeded_set(&app).await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::RECORDS))
            .header("X-Forwarded-For", "10.1.2.3, 172.16.0.1")
            .json(&json!({
                "employee_name": "李四",
                "set_id": set_id,
                "answers": { ids[0].to_string(): "A" },
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 201);
        let body: Value = res.json().await.unwrap();
        let record_id = body["data"]["recordId"].as_i64().unwrap() as i32;

        let stored = app.get(&routes::record(record_id)).await;
        assert_eq!(stored.data()["ip_address"], "10.1.2.3");
    }

    #[tokio::test]
    async fn inactive_or_empty_sets_are_rejected() {
        let app = TestApp::spawn().await;
        app.login().await;

        let empty = app.create_set("Empty").await;
        let res = submit(&app, empty, json!({})).await;
        assert_eq!(res.status, 400);

        let (set_id, _) = seeded_set(&app).await;
        app.put(&routes::set(set_id), &json!({ "is_active": false }))
            .await;
        let res = submit(&app, set_id, json!({})).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn stats_use_configured_pass_score() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, ids) = seeded_set(&app).await;

        // 100, 67, 0
        submit(
            &app,
            set_id,
            json!({ ids[0].to_string(): "A", ids[1].to_string(): "B", ids[2].to_string(): "C" }),
        )
        .await;
        submit(
            &app,
            set_id,
            json!({ ids[0].to_string(): "A", ids[1].to_string(): "B" }),
        )
        .await;
        submit(&app, set_id, json!({})).await;

        let res = app.get(&routes::set_stats(set_id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["attempts"], 3);
        assert_eq!(res.data()["maxScore"], 100);
        assert_eq!(res.data()["minScore"], 0);
        assert_eq!(res.data()["passScore"], 60);
        assert_eq!(res.data()["passCount"], 2);

        let res = app
            .put(
                &routes::system_config("training_pass_score"),
                &json!({ "value": "80" }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get(&routes::set_stats(set_id)).await;
        assert_eq!(res.data()["passScore"], 80);
        assert_eq!(res.data()["passCount"], 1);
    }

    #[tokio::test]
    async fn list_filters_by_employee() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, _) = seeded_set(&app).await;

        submit(&app, set_id, json!({})).await;
        app.post(
            routes::RECORDS,
            &json!({ "employee_name": "王五", "set_id": set_id, "answers": {} }),
        )
        .await;

        let res = app
            .get(&format!("{}?employee_name=王五", routes::RECORDS))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["employee_name"], "王五");
    }

    #[tokio::test]
    async fn delete_requires_admin() {
        let app = TestApp::spawn().await;
        app.login().await;
        let (set_id, _) = seeded_set(&app).await;
        let res = submit(&app, set_id, json!({})).await;
        let record_id = res.data()["recordId"].as_i64().unwrap() as i32;

        app.post(routes::LOGOUT, &json!({})).await;
        assert_eq!(app.delete(&routes::record(record_id)).await.status, 401);

        app.login().await;
        assert_eq!(app.delete(&routes::record(record_id)).await.status, 200);
        assert_eq!(app.get(&routes::record(record_id)).await.status, 404);
    }
}
