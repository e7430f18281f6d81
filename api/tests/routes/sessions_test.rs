#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use serial_test::serial;

    use crate::helpers::{make_test_app, token_for};

    #[tokio::test]
    #[serial]
    async fn lecturer_starts_session_and_scanning_opens() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send("POST", &app.session_uri("/start"), Some(&token), None)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "in_progress");
        assert_eq!(json["data"]["scanning_enabled"], true);
        assert_eq!(json["data"]["started_by"], app.seed.lecturer.id);
        assert_eq!(json["data"]["session_token"].as_str().unwrap().len(), 32);
    }

    #[tokio::test]
    #[serial]
    async fn starting_twice_is_not_found() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send("POST", &app.session_uri("/start"), Some(&token), None)
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    #[serial]
    async fn session_routes_require_a_token() {
        let app = make_test_app().await;

        let (status, _) = app.send("GET", &app.session_uri(""), None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn other_lecturers_and_students_are_forbidden() {
        let app = make_test_app().await;

        for user in [&app.seed.other_lecturer, &app.seed.student] {
            let token = token_for(user);
            let (status, _) = app
                .send("POST", &app.session_uri("/start"), Some(&token), None)
                .await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    #[serial]
    async fn admin_can_read_session_state() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.admin);

        let (status, json) = app.send("GET", &app.session_uri(""), Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], app.seed.session.id);
        assert_eq!(json["data"]["status"], "scheduled");
    }

    #[tokio::test]
    #[serial]
    async fn delay_rejects_non_positive_minutes() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/delay"),
                Some(&token),
                Some(json!({ "delay_minutes": 0, "reason": "Traffic" })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "delay_minutes must be between 1 and 1440");
    }

    #[tokio::test]
    #[serial]
    async fn cancelled_session_cannot_be_delayed() {
        let app = make_test_app().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send(
                "POST",
                &app.session_uri("/cancel"),
                Some(&token),
                Some(json!({ "reason": "Public holiday" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "cancelled");
        assert_eq!(json["data"]["scanning_enabled"], false);

        let (status, _) = app
            .send(
                "POST",
                &app.session_uri("/delay"),
                Some(&token),
                Some(json!({ "delay_minutes": 10, "reason": "Late" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    #[serial]
    async fn room_change_and_scanning_toggle() {
        let app = make_test_app().await;
        app.start_session().await;
        let token = token_for(&app.seed.lecturer);

        let (status, json) = app
            .send(
                "PUT",
                &app.session_uri("/room"),
                Some(&token),
                Some(json!({ "new_room": "IT 4-1", "old_room": "IT 2-27" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["room_change_to"], "IT 4-1");
        assert_eq!(json["data"]["room_change_from"], "IT 2-27");

        let (status, json) = app
            .send(
                "PUT",
                &app.session_uri("/scanning"),
                Some(&token),
                Some(json!({ "enabled": false })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["scanning_enabled"], false);
        assert_eq!(json["data"]["status"], "in_progress");
    }
}
