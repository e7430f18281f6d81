#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serial_test::serial;

    use crate::helpers::make_test_app;

    #[tokio::test]
    #[serial]
    async fn health_check_reports_database_up() {
        let app = make_test_app().await;

        let (status, json) = app.send("GET", "/api/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["database"], "up");
        assert_eq!(json["message"], "Health check passed");
    }
}
