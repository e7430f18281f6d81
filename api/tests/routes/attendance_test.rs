#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use serial_test::serial;

    use crate::helpers::{TestApp, make_test_app, token_for};

    async fn mark(app: &TestApp, student_id: i64, status: &str) -> (StatusCode, Value) {
        let token = token_for(&app.seed.lecturer);
        app.send(
            "POST",
            &app.session_uri("/attendance"),
            Some(&token),
            Some(json!({ "student_id": student_id, "status": status })),
        )
        .await
    }

    #[tokio::test]
    #[serial]
    async fn student_check_in_is_idempotent() {
        let app = make_test_app().await;
        app.start_session().await;
        let credential = app.issue_credential().await;
        let token = token_for(&app.seed.student);
        let body = json!({ "token": credential["token"], "signature": credential["signature"] });

        let (status, json) = app
            .send("POST", &app.session_uri("/check-in"), Some(&token), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["outcome"], "checked_in");
        let attendance_id = json["data"]["attendance_id"].clone();

        let (status, json) = app
            .send("POST", &app.session_uri("/check-in"), Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["outcome"], "already_checked_in");
        assert_eq!(json["data"]["attendance_id"], attendance_id);
    }

    #[tokio::test]
    #[serial]
    async fn check_in_with_forged_signature_is_rejected() {
        let app = make_test_app().await;
        app.start_session().await;
        let credential = app.issue_credential().await;
        let token = token_for(&app.seed.student);

        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/check-in"),
                Some(&token),
                Some(json!({ "token": credential["token"], "signature": "00ff" })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["outcome"], "rejected");
        assert_eq!(json["message"], "Invalid signature");
    }

    #[tokio::test]
    #[serial]
    async fn forged_signature_is_rejected_after_check_in() {
        let app = make_test_app().await;
        app.start_session().await;
        let credential = app.issue_credential().await;
        let token = token_for(&app.seed.student);

        let (status, _) = app
            .send(
                "POST",
                &app.session_uri("/check-in"),
                Some(&token),
                Some(json!({ "token": credential["token"], "signature": credential["signature"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/check-in"),
                Some(&token),
                Some(json!({ "token": credential["token"], "signature": "00ff" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["data"]["outcome"], "rejected");
    }

    #[tokio::test]
    #[serial]
    async fn manual_mark_creates_then_updates() {
        let app = make_test_app().await;
        let student_id = app.seed.student.id;

        let (status, json) = mark(&app, student_id, "late").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["created"], true);
        assert_eq!(json["data"]["attendance"]["status"], "late");
        assert_eq!(json["data"]["attendance"]["verified"], true);

        let (status, json) = mark(&app, student_id, "excused").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["created"], false);
        assert_eq!(json["data"]["previous_status"], "late");
    }

    #[tokio::test]
    #[serial]
    async fn unknown_status_is_rejected() {
        let app = make_test_app().await;

        let (status, json) = mark(&app, app.seed.student.id, "sleeping").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("unknown variant"));
    }

    #[tokio::test]
    #[serial]
    async fn malformed_body_uses_the_response_envelope() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/attendance"),
                Some(&token),
                Some(json!({ "status": "present" })),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("student_id"));
    }

    #[tokio::test]
    #[serial]
    async fn bulk_mark_reports_partial_failure() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/attendance/bulk"),
                Some(&token),
                Some(json!({
                    "records": [
                        { "student_id": app.seed.student.id, "status": "present" },
                        { "student_id": 9999, "status": "present" },
                        { "student_id": app.seed.other_student.id, "status": "absent" },
                    ]
                })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["processed_count"], 3);
        assert_eq!(json["data"]["success_count"], 2);
        assert_eq!(json["data"]["failure_count"], 1);
        assert_eq!(json["data"]["errors"][0]["student_id"], 9999);
    }

    #[tokio::test]
    #[serial]
    async fn bulk_mark_requires_records() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, _) = app
            .send(
                "POST",
                &app.session_uri("/attendance/bulk"),
                Some(&token),
                Some(json!({ "records": [] })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn verify_unknown_record_is_not_found() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, _) = app
            .send(
                "PUT",
                &app.session_uri("/attendance/99/verify"),
                Some(&token),
                Some(json!({ "student_id": app.seed.student.id })),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn unverify_then_verify_keeps_status_and_history() {
        let app = make_test_app().await;
        let (_, json) = mark(&app, app.seed.student.id, "present").await;
        let attendance_id = json["data"]["attendance"]["id"].as_i64().unwrap();
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send(
                "PUT",
                &app.session_uri(&format!("/attendance/{attendance_id}/unverify")),
                Some(&token),
                Some(json!({ "reason": "Disputed" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["verified"], false);
        assert_eq!(json["data"]["status"], "present");

        let (status, json) = app
            .send(
                "PUT",
                &app.session_uri(&format!("/attendance/{attendance_id}/verify")),
                Some(&token),
                Some(json!({ "student_id": app.seed.student.id, "reason": "Confirmed" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["verified"], true);
        assert_eq!(json["data"]["verified_by"], app.seed.lecturer.id);

        let (status, json) = app
            .send(
                "GET",
                &format!(
                    "/api/classes/{}/attendance/{attendance_id}/verifications",
                    app.seed.class.id
                ),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let entries = json["data"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["verification_reason"], "Confirmed");
        assert_eq!(entries[0]["lecturer_name"], "Dr Lecturer");
    }

    #[tokio::test]
    #[serial]
    async fn summary_counts_late_as_attended() {
        let app = make_test_app().await;
        mark(&app, app.seed.student.id, "late").await;
        mark(&app, app.seed.other_student.id, "absent").await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send("GET", &app.session_uri("/attendance/summary"), Some(&token), None)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 2);
        assert_eq!(json["data"]["late"], 1);
        assert_eq!(json["data"]["absent"], 1);
        assert_eq!(json["data"]["attendance_percentage"], 50.0);
    }

    #[tokio::test]
    #[serial]
    async fn students_see_only_their_own_history() {
        let app = make_test_app().await;
        mark(&app, app.seed.student.id, "present").await;
        let uri = format!(
            "/api/classes/{}/students/{}/attendance",
            app.seed.class.id, app.seed.student.id
        );

        let own = token_for(&app.seed.student);
        let (status, json) = app.send("GET", &uri, Some(&own), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["status"], "present");
        assert_eq!(json["data"][0]["verified_by_name"], "Dr Lecturer");

        let lecturer = token_for(&app.seed.lecturer);
        let (status, _) = app.send("GET", &uri, Some(&lecturer), None).await;
        assert_eq!(status, StatusCode::OK);

        let other = token_for(&app.seed.other_student);
        let (status, _) = app.send("GET", &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn verification_stats_group_by_day() {
        let app = make_test_app().await;
        mark(&app, app.seed.student.id, "present").await;
        mark(&app, app.seed.other_student.id, "absent").await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send(
                "GET",
                &format!("/api/classes/{}/verification-stats", app.seed.class.id),
                Some(&token),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let days = json["data"].as_array().unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0]["verifications"], 2);
        assert_eq!(days[0]["present"], 1);
        assert_eq!(days[0]["absent"], 1);
    }
}
