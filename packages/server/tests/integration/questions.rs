use crate::common::{TestApp, routes};
use serde_json::json;

const BANK: &str = r#"
    <h2>一、单选题</h2>
    <p>1. 灭火器的压力指针应位于哪个区域？</p>
    <p>A. 红色</p><p>B. 绿色</p><p>C. 黄色</p><p>D. 任意</p>
    <p>答案：B</p>
    <p>解析：绿色区域表示压力正常。</p>
    <p>2、发现火情首先应该？</p>
    <p>A、报警 B、拍照 C、离开 D、等待</p>
    <p>【答案】A</p>
    <p>3. 缺少答案的题目</p>
    <p>A. 一</p><p>B. 二</p><p>C. 三</p><p>D. 四</p>
"#;

mod crud {
    use super::*;

    #[tokio::test]
    async fn requires_admin() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::QUESTIONS).await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn create_assigns_next_number_and_counts() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Numbers").await;

        let first = app.create_question(set_id, "First", "A").await;
        let second = app.create_question(set_id, "Second", "D").await;

        let res = app.get(&routes::question(second)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["question_number"], 2);
        assert_eq!(res.data()["correct_answer"], "D");

        let set = app.get(&routes::set(set_id)).await;
        assert_eq!(set.data()["total_questions"], 2);

        let res = app.delete(&routes::question(first)).await;
        assert_eq!(res.status, 200);
        let set = app.get(&routes::set(set_id)).await;
        assert_eq!(set.data()["total_questions"], 1);
    }

    #[tokio::test]
    async fn invalid_answer_letter_is_rejected() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Letters").await;

        let res = app
            .post(
                routes::QUESTIONS,
                &json!({
                    "set_id": set_id,
                    "question_text": "Pick one",
                    "option_a": "a", "option_b": "b", "option_c": "c", "option_d": "d",
                    "correct_answer": "E",
                }),
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Edits").await;
        let id = app.create_question(set_id, "Original", "A").await;

        let res = app
            .put(
                &routes::question(id),
                &json!({ "question_text": "Reworded", "explanation": "Because." }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["question_text"], "Reworded");
        assert_eq!(res.data()["explanation"], "Because.");
        assert_eq!(res.data()["option_a"], "Option A");
        assert_eq!(res.data()["correct_answer"], "A");
    }

    #[tokio::test]
    async fn search_matches_question_text() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Search").await;
        app.create_question(set_id, "Where is the fire exit?", "A").await;
        app.create_question(set_id, "Who signs visitor badges?", "B").await;

        let res = app
            .get(&format!("{}?set_id={set_id}&search=FIRE", routes::QUESTIONS))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["pagination"]["total"], 1);
        assert_eq!(res.data()["items"][0]["question_text"], "Where is the fire exit?");
    }

    #[tokio::test]
    async fn out_of_range_question_number_is_rejected() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Bounds").await;
        let id = app.create_question(set_id, "Existing", "A").await;

        let body = |number: i64| {
            json!({
                "set_id": set_id,
                "question_number": number,
                "question_text": "Numbered",
                "option_a": "a", "option_b": "b", "option_c": "c", "option_d": "d",
                "correct_answer": "A",
            })
        };

        let res = app.post(routes::QUESTIONS, &body(2147483647)).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .put(&routes::question(id), &json!({ "question_number": 2147483647 }))
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn next_number_after_the_last_slot_is_rejected() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Full").await;

        let res = app
            .post(
                routes::QUESTIONS,
                &json!({
                    "set_id": set_id,
                    "question_number": 100000,
                    "question_text": "Last slot",
                    "option_a": "a", "option_b": "b", "option_c": "c", "option_d": "d",
                    "correct_answer": "A",
                }),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let res = app
            .post(
                routes::QUESTIONS,
                &json!({
                    "set_id": set_id,
                    "question_text": "One too many",
                    "option_a": "a", "option_b": "b", "option_c": "c", "option_d": "d",
                    "correct_answer": "B",
                }),
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .post(
                routes::QUESTIONS_IMPORT,
                &json!({ "html": BANK, "set_id": set_id }),
            )
            .await;
        assert_eq!(res.status, 400);

        let set = app.get(&routes::set(set_id)).await;
        assert_eq!(set.data()["total_questions"], 1);
    }
}

mod import {
    use super::*;

    #[tokio::test]
    async fn parse_previews_without_writing() {
        let app = TestApp::spawn().await;
        app.login().await;

        let res = app
            .post(routes::QUESTIONS_PARSE, &json!({ "html": BANK }))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["success"], true);
        assert_eq!(res.data()["questions"].as_array().unwrap().len(), 2);
        assert!(!res.data()["warnings"].as_array().unwrap().is_empty());

        let list = app.get(routes::QUESTIONS).await;
        assert_eq!(list.data()["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn import_creates_set_when_named() {
        let app = TestApp::spawn().await;
        app.login().await;

        let res = app
            .post(
                routes::QUESTIONS_IMPORT,
                &json!({ "html": BANK, "set_name": "消防基础" }),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.data()["created_set"], true);
        assert_eq!(res.data()["imported"], 2);
        assert_eq!(res.data()["total_questions"], 2);

        let set_id = res.data()["set_id"].as_i64().unwrap() as i32;
        let exam = app.get(&routes::set_questions(set_id)).await;
        let questions = exam.data()["questions"].as_array().unwrap();
        assert_eq!(questions[0]["section"], "一、单选题");
        assert_eq!(questions[1]["option_a"], "报警");
    }

    #[tokio::test]
    async fn import_appends_after_existing_numbers() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Append").await;
        app.create_question(set_id, "Existing", "C").await;

        let res = app
            .post(
                routes::QUESTIONS_IMPORT,
                &json!({ "html": BANK, "set_id": set_id }),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.data()["total_questions"], 3);

        let exam = app.get(&routes::set_questions(set_id)).await;
        let numbers: Vec<i64> = exam.data()["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["question_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn replace_is_refused_once_records_exist() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Locked").await;
        app.create_question(set_id, "Existing", "C").await;

        let res = app
            .post(
                routes::RECORDS,
                &json!({ "employee_name": "张三", "set_id": set_id, "answers": {} }),
            )
            .await;
        assert_eq!(res.status, 201);

        let res = app
            .post(
                routes::QUESTIONS_IMPORT,
                &json!({ "html": BANK, "set_id": set_id, "replace": true }),
            )
            .await;
        assert_eq!(res.status, 409);

        let set = app.get(&routes::set(set_id)).await;
        assert_eq!(set.data()["total_questions"], 1);
    }

    #[tokio::test]
    async fn replace_swaps_questions() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Swap").await;
        app.create_question(set_id, "Old one", "C").await;

        let res = app
            .post(
                routes::QUESTIONS_IMPORT,
                &json!({ "html": BANK, "set_id": set_id, "replace": true }),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.data()["replaced"], 1);
        assert_eq!(res.data()["total_questions"], 2);
    }

    #[tokio::test]
    async fn large_bank_is_imported_in_one_go() {
        let app = TestApp::spawn().await;
        app.login().await;

        let html: String = (1..=3000)
            .map(|n| {
                format!(
                    "<p>{n}. Safety item {n}</p><p>A. 甲</p><p>B. 乙</p><p>C. 丙</p><p>D. 丁</p><p>答案：A</p>\n"
                )
            })
            .collect();

        let res = app
            .post(
                routes::QUESTIONS_IMPORT,
                &json!({ "html": html, "set_name": "大题库" }),
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.data()["imported"], 3000);
        assert_eq!(res.data()["total_questions"], 3000);

        let set_id = res.data()["set_id"].as_i64().unwrap() as i32;
        let list = app
            .get(&format!("{}?set_id={set_id}", routes::QUESTIONS))
            .await;
        assert_eq!(list.data()["pagination"]["total"], 3000);
    }

    #[tokio::test]
    async fn unparseable_html_is_rejected() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Nothing").await;

        let res = app
            .post(
                routes::QUESTIONS_IMPORT,
                &json!({ "html": "<p>hello</p>", "set_id": set_id }),
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn upload_imports_file_body() {
        let app = TestApp::spawn().await;
        app.login().await;
        let set_id = app.create_set("Uploaded").await;

        let res = app.upload_html(routes::QUESTIONS_UPLOAD, BANK, set_id).await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.data()["imported"], 2);
        assert_eq!(res.data()["created_set"], false);
    }
}
