#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use serial_test::serial;

    use crate::helpers::{make_test_app, token_for};

    #[tokio::test]
    #[serial]
    async fn issuing_before_start_is_a_conflict() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send("POST", &app.session_uri("/credentials"), Some(&token), Some(json!({})))
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    #[serial]
    async fn issued_credential_validates() {
        let app = make_test_app().await;
        app.start_session().await;
        let credential = app.issue_credential().await;
        assert_eq!(credential["rotation_index"], 0);
        assert_eq!(credential["session_id"], app.seed.session.id);

        let token = token_for(&app.seed.lecturer);
        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/credentials/validate"),
                Some(&token),
                Some(json!({
                    "token": credential["token"],
                    "signature": credential["signature"],
                })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["valid"], true);
        assert_eq!(json["data"]["credential_id"], credential["credential_id"]);
    }

    #[tokio::test]
    #[serial]
    async fn tampered_signature_is_reported_not_thrown() {
        let app = make_test_app().await;
        app.start_session().await;
        let credential = app.issue_credential().await;

        let token = token_for(&app.seed.lecturer);
        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/credentials/validate"),
                Some(&token),
                Some(json!({ "token": credential["token"], "signature": "deadbeef" })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["valid"], false);
        assert_eq!(json["message"], "Invalid signature");
    }

    #[tokio::test]
    #[serial]
    async fn validity_override_is_bounded() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.lecturer);

        let (status, _) = app
            .send(
                "POST",
                &app.session_uri("/credentials"),
                Some(&token),
                Some(json!({ "validity_seconds": 2 })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn rotate_then_history_lists_newest_first() {
        let app = make_test_app().await;
        app.start_session().await;
        let first = app.issue_credential().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send("POST", &app.session_uri("/credentials/rotate"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["rotation_index"], 1);
        assert_ne!(json["data"]["token"], first["token"]);

        let (status, json) = app
            .send("GET", &app.session_uri("/credentials?limit=10"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let items = json["data"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["rotation_index"], 1);
        assert_eq!(items[1]["rotation_index"], 0);
        assert_eq!(items[1]["is_rotated"], true);
        assert!(items[0].get("qr_signature").is_none());
    }

    #[tokio::test]
    #[serial]
    async fn rotate_without_credential_is_a_conflict() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send("POST", &app.session_uri("/credentials/rotate"), Some(&token), None)
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "No active QR code found for this session");
    }

    #[tokio::test]
    #[serial]
    async fn revoke_clears_the_active_credential() {
        let app = make_test_app().await;
        app.start_session().await;
        app.issue_credential().await;
        let token = token_for(&app.seed.lecturer);

        let (status, _) = app
            .send("GET", &app.session_uri("/credentials/active"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = app
            .send("POST", &app.session_uri("/credentials/revoke"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["revoked"], 1);

        let (status, _) = app
            .send("GET", &app.session_uri("/credentials/active"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn students_cannot_issue() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.student);

        let (status, _) = app
            .send("POST", &app.session_uri("/credentials"), Some(&token), Some(json!({})))
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
