use crate::common::{TestApp, routes};
use serde_json::json;

async fn create_template(app: &TestApp) -> i32 {
    let res = app
        .post(
            routes::SMS_TEMPLATES,
            &json!({
                "code": "order_notice",
                "name": "Order notice",
                "content": "尊敬的${name}，您的订单{order}已发货。",
            }),
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    res.id()
}

mod templates {
    use super::*;

    #[tokio::test]
    async fn require_admin() {
        let app = TestApp::spawn().await;
        assert_eq!(app.get(routes::SMS_TEMPLATES).await.status, 401);
    }

    #[tokio::test]
    async fn create_lists_placeholder_names() {
        let app = TestApp::spawn().await;
        app.login().await;
        let id = create_template(&app).await;

        let res = app.get(&routes::sms_template(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["code"], "order_notice");
        assert_eq!(res.data()["params"], json!(["name", "order"]));
    }

    #[tokio::test]
    async fn duplicate_code_conflicts() {
        let app = TestApp::spawn().await;
        app.login().await;
        create_template(&app).await;

        let res = app
            .post(
                routes::SMS_TEMPLATES,
                &json!({ "code": "order_notice", "name": "Again", "content": "Hi" }),
            )
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let app = TestApp::spawn().await;
        app.login().await;
        let id = create_template(&app).await;

        let res = app
            .put(&routes::sms_template(id), &json!({ "name": "Shipping notice" }))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["name"], "Shipping notice");
        assert_eq!(res.data()["code"], "order_notice");

        assert_eq!(app.delete(&routes::sms_template(id)).await.status, 200);
        assert_eq!(app.get(&routes::sms_template(id)).await.status, 404);
    }
}

mod sending {
    use super::*;

    #[tokio::test]
    async fn preview_reports_missing_params() {
        let app = TestApp::spawn().await;
        app.login().await;
        create_template(&app).await;

        let res = app
            .post(
                routes::SMS_PREVIEW,
                &json!({ "template_code": "order_notice", "params": { "name": "张三" } }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["content"], "尊敬的张三，您的订单{order}已发货。");
        assert_eq!(res.data()["missingParams"], json!(["order"]));
        assert_eq!(res.data()["segments"], 1);
    }

    #[tokio::test]
    async fn send_needs_a_verification_token() {
        let app = TestApp::spawn().await;
        app.login().await;

        let res = app
            .post(
                routes::SMS_SEND,
                &json!({ "phone": "13800138000", "content": "Hello" }),
            )
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");

        let res = app
            .post_with_verify_token(
                routes::SMS_SEND,
                &json!({ "phone": "13800138000", "content": "Hello" }),
                "0000",
            )
            .await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn token_is_enough_without_the_login_cookie() {
        let app = TestApp::spawn().await;
        let token = app.verified_token().await;
        let res = app.post(routes::LOGOUT, &json!({})).await;
        assert_eq!(res.status, 200);
        assert_eq!(app.get(routes::CHECK).await.data()["authenticated"], false);

        let res = app
            .post_with_verify_token(
                routes::SMS_SEND,
                &json!({ "phone": "13800138000", "content": "Hello" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["status"], "dry_run");
    }

    #[tokio::test]
    async fn dry_run_send_is_logged() {
        let app = TestApp::spawn().await;
        let token = app.verified_token().await;
        create_template(&app).await;

        let res = app
            .post_with_verify_token(
                routes::SMS_SEND,
                &json!({
                    "phone": "+86 138 0013 8000",
                    "template_code": "order_notice",
                    "params": { "name": "张三", "order": "A-1001" },
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data()["status"], "dry_run");

        let logs = app
            .get(&format!("{}?phone=13800138000", routes::SMS_LOGS))
            .await;
        assert_eq!(logs.data()["pagination"]["total"], 1);
        let log = &logs.data()["items"][0];
        assert_eq!(log["content"], "尊敬的张三，您的订单A-1001已发货。");
        assert_eq!(log["template_code"], "order_notice");
    }

    #[tokio::test]
    async fn unresolved_placeholders_are_not_sent() {
        let app = TestApp::spawn().await;
        let token = app.verified_token().await;
        create_template(&app).await;

        let res = app
            .post_with_verify_token(
                routes::SMS_SEND,
                &json!({ "phone": "13800138000", "template_code": "order_notice" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);

        let logs = app.get(routes::SMS_LOGS).await;
        assert_eq!(logs.data()["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn invalid_phone_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.verified_token().await;

        let res = app
            .post_with_verify_token(
                routes::SMS_SEND,
                &json!({ "phone": "12345", "content": "Hello" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }
}
