#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, SecondsFormat, Utc};
    use serial_test::serial;

    use crate::helpers::{make_test_app, token_for};

    #[tokio::test]
    #[serial]
    async fn audit_is_admin_only() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, _) = app.send("GET", "/api/audit", Some(&token), None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn search_filters_by_action() {
        let app = make_test_app().await;
        app.start_session().await;
        app.issue_credential().await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app
            .send("GET", "/api/audit?action=qr_generated", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 1);
        assert_eq!(json["data"]["entries"][0]["action"], "QR_GENERATED");
        assert_eq!(json["data"]["entries"][0]["device_id"], "test-device");

        let (status, json) = app.send("GET", "/api/audit", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 2);
        assert_eq!(json["data"]["entries"][0]["action"], "QR_GENERATED");
        assert_eq!(json["data"]["entries"][1]["action"], "SESSION_STARTED");
    }

    #[tokio::test]
    #[serial]
    async fn unknown_action_is_a_bad_request() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app
            .send("GET", "/api/audit?action=NOPE", Some(&token), None)
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Unknown audit action: NOPE");
    }

    #[tokio::test]
    #[serial]
    async fn resource_trail_is_chronological() {
        let app = make_test_app().await;
        app.start_session().await;
        let lecturer = token_for(&app.seed.lecturer);
        app.send(
            "PUT",
            &app.session_uri("/scanning"),
            Some(&lecturer),
            Some(serde_json::json!({ "enabled": false })),
        )
        .await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app
            .send(
                "GET",
                &format!("/api/audit/resources/session/{}", app.seed.session.id),
                Some(&token),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let entries = json["data"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["action"], "SESSION_STARTED");
        assert_eq!(entries[1]["action"], "SCANNING_DISABLED");
        assert_eq!(entries[1]["old_value"]["scanning_enabled"], true);
    }

    #[tokio::test]
    #[serial]
    async fn dead_letter_queue_starts_empty() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app
            .send("GET", "/api/audit/dead-letters", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 0);

        let (status, json) = app
            .send("POST", "/api/audit/dead-letters/replay", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["written"], 0);
        assert_eq!(json["data"]["remaining"], 0);
    }

    #[tokio::test]
    #[serial]
    async fn purge_requires_positive_retention() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.admin);

        let (status, _) = app
            .send("DELETE", "/api/audit?older_than_days=0", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = app
            .send("DELETE", "/api/audit?older_than_days=30", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["removed"], 0);
    }

    #[tokio::test]
    #[serial]
    async fn purge_with_huge_retention_is_a_bad_request() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app
            .send(
                "DELETE",
                "/api/audit?older_than_days=1000000000000",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (_, json) = app.send("GET", "/api/audit", Some(&token), None).await;
        assert_eq!(json["data"]["total"], 1);
    }

    #[tokio::test]
    #[serial]
    async fn compliance_report_counts_recent_activity() {
        let app = make_test_app().await;
        app.start_session().await;
        app.issue_credential().await;
        let token = token_for(&app.seed.admin);
        let now = Utc::now();
        let uri = format!(
            "/api/audit/compliance?from={}&to={}",
            (now - Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Secs, true),
            (now + Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        let (status, json) = app.send("GET", &uri, Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_actions"], 2);
        assert_eq!(json["data"]["unique_users"], 1);
        assert_eq!(json["data"]["failed_actions"], 0);
        assert_eq!(json["data"]["actions_by_type"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    #[serial]
    async fn compliance_report_rejects_inverted_range() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app
            .send(
                "GET",
                "/api/audit/compliance?from=2026-02-01T00:00:00Z&to=2026-01-01T00:00:00Z",
                Some(&token),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    #[serial]
    async fn export_as_csv_returns_a_file() {
        let app = make_test_app().await;
        app.start_session().await;
        app.issue_credential().await;
        let token = token_for(&app.seed.admin);

        let (status, body) = app
            .send(
                "GET",
                "/api/audit/export?format=csv&action=SESSION_STARTED",
                Some(&token),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let csv = body.as_str().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,created_at,user_id,action"));
        assert!(lines[1].contains(",SESSION_STARTED,session,"));
    }

    #[tokio::test]
    #[serial]
    async fn export_defaults_to_json_and_rejects_unknown_formats() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app.send("GET", "/api/audit/export", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["action"], "SESSION_STARTED");

        let (status, _) = app
            .send("GET", "/api/audit/export?format=xml", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
