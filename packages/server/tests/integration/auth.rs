use crate::common::{ADMIN_PASSWORD, TestApp, routes};
use portal_server::services::verification::code_key;
use serde_json::json;

mod login {
    use super::*;

    #[tokio::test]
    async fn correct_password_sets_cookie() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::LOGIN, &json!({ "password": ADMIN_PASSWORD }))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["authenticated"], true);

        let check = app.get(routes::CHECK).await;
        assert_eq!(check.data()["authenticated"], true);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::LOGIN, &json!({ "password": "not-it" }))
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");

        let check = app.get(routes::CHECK).await;
        assert_eq!(check.data()["authenticated"], false);
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() {
        let app = TestApp::spawn().await;
        app.login().await;

        let res = app.post(routes::LOGOUT, &json!({})).await;
        assert_eq!(res.status, 200);

        let check = app.get(routes::CHECK).await;
        assert_eq!(check.data()["authenticated"], false);
    }

    #[tokio::test]
    async fn admin_endpoints_need_the_cookie() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::SYSTEM_CONFIG).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "UNAUTHORIZED");
    }
}

mod verification {
    use super::*;

    #[tokio::test]
    async fn code_flow_does_not_need_login() {
        let app = TestApp::spawn().await;

        let code = app.send_code("s1", "/sms").await;
        let res = app
            .post(
                routes::VERIFY_CODE,
                &json!({ "sessionId": "s1", "pageUrl": "/sms", "code": code }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let check = app.get(routes::CHECK).await;
        assert_eq!(check.data()["authenticated"], false);
    }

    #[tokio::test]
    async fn failed_delivery_does_not_start_the_rate_window() {
        let app = TestApp::spawn_with(|config| {
            config.sms.gateway_url = Some("http://127.0.0.1:1/send".to_string());
            config.sms.admin_phone = Some("13800138000".to_string());
        })
        .await;
        let body = json!({ "sessionId": "s1", "pageUrl": "/sms" });

        for _ in 0..2 {
            let res = app.post(routes::SEND_CODE, &body).await;
            assert_eq!(res.status, 502, "{}", res.text);
            assert_eq!(res.body["code"], "UPSTREAM_ERROR");
        }
        assert!(app.state.verification.get_code(&code_key("s1", "/sms")).is_none());
    }

    #[tokio::test]
    async fn second_send_within_a_minute_is_rate_limited() {
        let app = TestApp::spawn().await;
        app.login().await;
        app.send_code("s1", "/sms").await;

        let res = app
            .post(
                routes::SEND_CODE,
                &json!({ "sessionId": "s1", "pageUrl": "/sms" }),
            )
            .await;
        assert_eq!(res.status, 429);
        assert_eq!(res.body["code"], "RATE_LIMITED");
        let retry_after: u64 = res
            .retry_after
            .as_deref()
            .expect("429 should carry Retry-After")
            .parse()
            .unwrap();
        assert!(retry_after > 0 && retry_after <= 60);
    }

    #[tokio::test]
    async fn other_page_has_its_own_rate_window() {
        let app = TestApp::spawn().await;
        app.login().await;
        app.send_code("s1", "/sms").await;
        app.send_code("s1", "/import").await;
    }

    #[tokio::test]
    async fn correct_code_returns_token_and_is_consumed() {
        let app = TestApp::spawn().await;
        app.login().await;
        let code = app.send_code("s1", "/sms").await;

        let body = json!({ "sessionId": "s1", "pageUrl": "/sms", "code": code });
        let res = app.post(routes::VERIFY_CODE, &body).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.data()["token"].as_str().unwrap().len(), 64);
        assert_eq!(res.data()["expiresIn"], 12 * 60 * 60);

        let again = app.post(routes::VERIFY_CODE, &body).await;
        assert_eq!(again.status, 400);
        assert_eq!(again.body["code"], "CODE_EXPIRED");
    }

    #[tokio::test]
    async fn wrong_code_reports_remaining_attempts() {
        let app = TestApp::spawn().await;
        app.login().await;
        let code = app.send_code("s1", "/sms").await;
        let wrong = if code == "000000" { "111111" } else { "000000" };

        let res = app
            .post(
                routes::VERIFY_CODE,
                &json!({ "sessionId": "s1", "pageUrl": "/sms", "code": wrong }),
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "CODE_INVALID");
        assert_eq!(res.body["remainingAttempts"], 4);
    }

    #[tokio::test]
    async fn five_failures_lock_even_the_right_code() {
        let app = TestApp::spawn().await;
        app.login().await;
        let code = app.send_code("s1", "/sms").await;
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..5 {
            let res = app
                .post(
                    routes::VERIFY_CODE,
                    &json!({ "sessionId": "s1", "pageUrl": "/sms", "code": wrong }),
                )
                .await;
            assert_eq!(res.status, 400);
        }

        let res = app
            .post(
                routes::VERIFY_CODE,
                &json!({ "sessionId": "s1", "pageUrl": "/sms", "code": code }),
            )
            .await;
        assert_eq!(res.status, 423);
        assert_eq!(res.body["code"], "CODE_LOCKED");
    }

    #[tokio::test]
    async fn revoked_token_no_longer_works() {
        let app = TestApp::spawn().await;
        let token = app.verified_token().await;

        let res = app
            .post_with_verify_token(routes::REVOKE_TOKEN, &json!({}), &token)
            .await;
        assert_eq!(res.status, 200);

        let again = app
            .post_with_verify_token(routes::REVOKE_TOKEN, &json!({}), &token)
            .await;
        assert_eq!(again.status, 401);
        assert_eq!(again.body["code"], "TOKEN_INVALID");
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_database_reachable() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::HEALTH).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ok");
        assert_eq!(res.body["database"], true);
    }
}
