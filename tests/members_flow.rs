mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

async fn setup_admin(app: &TestApp) -> Result<(String, Uuid)> {
    let admin_id = app
        .insert_user("admin@example.com", "admin-pass", "admin", None)
        .await?;
    let token = app.login_token("admin@example.com", "admin-pass").await?;
    Ok((token, admin_id))
}

async fn create_member(
    app: &TestApp,
    token: &str,
    company_id: Uuid,
    first: &str,
    last: &str,
    email: &str,
) -> Result<Value> {
    let payload = json!({
        "company_id": company_id,
        "first_name": first,
        "last_name": last,
        "email": email,
        "gender": "female",
        "position": "Engineer",
    });
    let response = app.post_json("/api/members", &payload, Some(token)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn member_creation_provisions_login_account() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (token, admin_id) = setup_admin(&app).await?;
    let company_id = app.insert_company("Acme Corp", admin_id).await?;

    let created = create_member(
        &app,
        &token,
        company_id,
        "Jane",
        "Doe",
        "jane.doe@example.com",
    )
    .await?;

    let staff_id = created["member"]["staff_id"].as_str().unwrap();
    assert_eq!(staff_id.len(), 8);
    assert!(staff_id.starts_with("JD"));
    assert_eq!(created["member"]["status"], "active");
    assert_eq!(created["member"]["company_name"], "Acme Corp");

    // The generated password is usable exactly as returned.
    let generated = created["generated_password"].as_str().unwrap();
    assert_eq!(generated.len(), 8);
    let member_token = app.login_token("jane.doe@example.com", generated).await?;

    let response = app.get("/api/profile", Some(&member_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let profile: Value = serde_json::from_slice(&body)?;
    assert_eq!(profile["company_name"], "Acme Corp");
    assert_eq!(profile["staff_id"].as_str(), Some(staff_id));

    // Member creation notifies the acting admin.
    let response = app.get("/api/notifications", Some(&token)).await?;
    let body = body_to_vec(response.into_body()).await?;
    let notifications: Vec<Value> = serde_json::from_slice(&body)?;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["severity"], "success");
    assert_eq!(notifications[0]["related"]["kind"], "member");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (token, admin_id) = setup_admin(&app).await?;
    let company_id = app.insert_company("Acme Corp", admin_id).await?;

    create_member(
        &app,
        &token,
        company_id,
        "Jane",
        "Doe",
        "jane.doe@example.com",
    )
    .await?;

    let payload = json!({
        "company_id": company_id,
        "first_name": "Janet",
        "last_name": "Dorn",
        "email": "jane.doe@example.com",
        "gender": "female",
    });
    let response = app.post_json("/api/members", &payload, Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn supplied_staff_id_is_validated_and_unique() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (token, admin_id) = setup_admin(&app).await?;
    let company_id = app.insert_company("Acme Corp", admin_id).await?;

    let payload = json!({
        "company_id": company_id,
        "first_name": "Jane",
        "last_name": "Doe",
        "email": "jane.doe@example.com",
        "gender": "female",
        "staff_id": "not-valid",
    });
    let response = app.post_json("/api/members", &payload, Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let payload = json!({
        "company_id": company_id,
        "first_name": "Jane",
        "last_name": "Doe",
        "email": "jane.doe@example.com",
        "gender": "female",
        "staff_id": "JD000001",
    });
    let response = app.post_json("/api/members", &payload, Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let payload = json!({
        "company_id": company_id,
        "first_name": "John",
        "last_name": "Drew",
        "email": "john.drew@example.com",
        "gender": "male",
        "staff_id": "JD000001",
    });
    let response = app.post_json("/api/members", &payload, Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn status_toggle_clears_dormant_bookkeeping() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (token, admin_id) = setup_admin(&app).await?;
    let company_id = app.insert_company("Acme Corp", admin_id).await?;

    let created = create_member(
        &app,
        &token,
        company_id,
        "Jane",
        "Doe",
        "jane.doe@example.com",
    )
    .await?;
    let member_id = created["member"]["id"].as_str().unwrap().to_string();

    let payload = json!({
        "status": "dormant",
        "dormant_reason": "retirement",
        "dormant_note": "left in July",
    });
    let response = app
        .post_json(
            &format!("/api/members/{member_id}/status"),
            &payload,
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let member: Value = serde_json::from_slice(&body)?;
    assert_eq!(member["status"], "dormant");
    assert_eq!(member["dormant_reason"], "retirement");

    let payload = json!({ "status": "active" });
    let response = app
        .post_json(
            &format!("/api/members/{member_id}/status"),
            &payload,
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let member: Value = serde_json::from_slice(&body)?;
    assert_eq!(member["status"], "active");
    assert!(member["dormant_reason"].is_null());
    assert!(member["dormant_note"].is_null());

    let payload = json!({ "status": "dormant", "dormant_reason": "sabbatical" });
    let response = app
        .post_json(
            &format!("/api/members/{member_id}/status"),
            &payload,
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn company_delete_blocked_while_members_remain() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let (token, admin_id) = setup_admin(&app).await?;
    let company_id = app.insert_company("Acme Corp", admin_id).await?;

    let created = create_member(
        &app,
        &token,
        company_id,
        "Jane",
        "Doe",
        "jane.doe@example.com",
    )
    .await?;
    let member_id = created["member"]["id"].as_str().unwrap().to_string();

    let response = app
        .delete(&format!("/api/companies/{company_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .delete(&format!("/api/members/{member_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The member's login account goes with the member row.
    assert!(app
        .login_token("jane.doe@example.com", "whatever")
        .await
        .is_err());

    let response = app
        .delete(&format!("/api/companies/{company_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn member_role_cannot_manage_members() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    app.insert_user("worker@example.com", "worker-pass", "member", None)
        .await?;
    let token = app.login_token("worker@example.com", "worker-pass").await?;

    let response = app.get("/api/members", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}
