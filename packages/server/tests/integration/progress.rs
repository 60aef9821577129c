use crate::common::{TestApp, routes};
use serde_json::json;

/// project -> phase -> module -> two items. Returns (project, phase, module, items).
async fn seeded_tree(app: &TestApp) -> (i32, i32, i32, [i32; 2]) {
    let project = app.create_project("ERP rollout").await;

    let phase = app
        .post(&routes::project_phases(project), &json!({ "name": "Phase 1" }))
        .await;
    assert_eq!(phase.status, 201, "{}", phase.text);
    let phase = phase.id();

    let module = app
        .post(&routes::phase_modules(phase), &json!({ "name": "Purchasing" }))
        .await;
    assert_eq!(module.status, 201, "{}", module.text);
    let module = module.id();

    let mut items = [0; 2];
    for (i, name) in ["Supplier form", "Approval flow"].into_iter().enumerate() {
        let item = app
            .post(&routes::module_items(module), &json!({ "name": name }))
            .await;
        assert_eq!(item.status, 201, "{}", item.text);
        items[i] = item.id();
    }

    (project, phase, module, items)
}

#[tokio::test]
async fn reads_are_public_and_mutations_are_not() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get(routes::PROJECTS).await.status, 200);
    let res = app.post(routes::PROJECTS, &json!({ "name": "Nope" })).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn new_items_start_pending_at_zero() {
    let app = TestApp::spawn().await;
    app.login().await;
    let (project, _, _, _) = seeded_tree(&app).await;

    let res = app.get(&routes::project(project)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["progress"], 0);
    let items = &res.data()["phases"][0]["modules"][0]["items"];
    assert_eq!(items[0]["status"], "pending");
    assert_eq!(items[0]["progress"], 0);
}

#[tokio::test]
async fn progress_rolls_up_through_every_level() {
    let app = TestApp::spawn().await;
    app.login().await;
    let (project, _, _, items) = seeded_tree(&app).await;

    let res = app
        .patch(&routes::item_status(items[0]), &json!({ "status": "completed" }))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.data()["progress"], 100);

    let res = app
        .patch(
            &routes::item_status(items[1]),
            &json!({ "status": "in_progress", "progress": 50 }),
        )
        .await;
    assert_eq!(res.data()["progress"], 50);

    let detail = app.get(&routes::project(project)).await;
    let phase = &detail.data()["phases"][0];
    assert_eq!(phase["modules"][0]["progress"], 75);
    assert_eq!(phase["progress"], 75);
    assert_eq!(detail.data()["progress"], 75);

    let list = app.get(routes::PROJECTS).await;
    assert_eq!(list.data()[0]["progress"], 75);
    assert_eq!(list.data()[0]["phase_count"], 1);
}

#[tokio::test]
async fn pending_status_resets_progress() {
    let app = TestApp::spawn().await;
    app.login().await;
    let (_, _, _, items) = seeded_tree(&app).await;

    app.patch(
        &routes::item_status(items[0]),
        &json!({ "status": "in_progress", "progress": 40 }),
    )
    .await;
    let res = app
        .patch(
            &routes::item_status(items[0]),
            &json!({ "status": "pending", "progress": 40 }),
        )
        .await;
    assert_eq!(res.data()["status"], "pending");
    assert_eq!(res.data()["progress"], 0);
}

#[tokio::test]
async fn out_of_range_progress_is_rejected() {
    let app = TestApp::spawn().await;
    app.login().await;
    let (_, _, _, items) = seeded_tree(&app).await;

    let res = app
        .patch(
            &routes::item_status(items[0]),
            &json!({ "status": "in_progress", "progress": 101 }),
        )
        .await;
    assert_eq!(res.status, 400);

    let res = app
        .patch(&routes::item_status(items[0]), &json!({ "status": "done" }))
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn update_renames_each_level() {
    let app = TestApp::spawn().await;
    app.login().await;
    let (project, phase, module, items) = seeded_tree(&app).await;

    assert_eq!(
        app.put(&routes::project(project), &json!({ "owner": "王工" })).await.status,
        200
    );
    assert_eq!(
        app.put(&routes::phase(phase), &json!({ "name": "Phase A" })).await.status,
        200
    );
    assert_eq!(
        app.put(&routes::module(module), &json!({ "name": "Buying" })).await.status,
        200
    );
    assert_eq!(
        app.put(&routes::item(items[0]), &json!({ "assignee": "李工" })).await.status,
        200
    );

    let detail = app.get(&routes::project(project)).await;
    assert_eq!(detail.data()["owner"], "王工");
    let phase = &detail.data()["phases"][0];
    assert_eq!(phase["name"], "Phase A");
    assert_eq!(phase["modules"][0]["name"], "Buying");
    assert_eq!(phase["modules"][0]["items"][0]["assignee"], "李工");
}

#[tokio::test]
async fn deleting_a_project_removes_its_tree() {
    let app = TestApp::spawn().await;
    app.login().await;
    let (project, phase, module, items) = seeded_tree(&app).await;

    assert_eq!(app.delete(&routes::project(project)).await.status, 200);
    assert_eq!(app.get(&routes::project(project)).await.status, 404);
    assert_eq!(app.delete(&routes::phase(phase)).await.status, 404);
    assert_eq!(app.delete(&routes::module(module)).await.status, 404);
    assert_eq!(app.delete(&routes::item(items[0])).await.status, 404);
}

#[tokio::test]
async fn deleting_a_module_updates_the_rollup() {
    let app = TestApp::spawn().await;
    app.login().await;
    let (project, phase, module, items) = seeded_tree(&app).await;

    app.patch(&routes::item_status(items[0]), &json!({ "status": "completed" }))
        .await;
    let other = app
        .post(&routes::phase_modules(phase), &json!({ "name": "Empty module" }))
        .await
        .id();

    let detail = app.get(&routes::project(project)).await;
    assert_eq!(detail.data()["progress"], 25);

    assert_eq!(app.delete(&routes::module(module)).await.status, 200);
    let detail = app.get(&routes::project(project)).await;
    assert_eq!(detail.data()["progress"], 0);
    assert_eq!(detail.data()["phases"][0]["modules"][0]["id"], other);
}
