#[cfg(test)]
mod tests {
    use crate::helpers::app::{
        ROSTER_CSV, body_json, default_fields, generate_request, get_request,
    };
    use crate::helpers::{TestAppOptions, make_test_app, make_test_app_with};
    use axum::http::StatusCode;
    use feedback::testing::{RecordingMailer, ScriptedGenerator};
    use serial_test::serial;
    use tower::ServiceExt;

    fn roster() -> Option<(&'static str, &'static [u8])> {
        Some(("marks.csv", ROSTER_CSV.as_bytes()))
    }

    #[tokio::test]
    #[serial]
    async fn generate_sends_stores_and_links_report() {
        let t = make_test_app().await;

        let response = t
            .app
            .clone()
            .oneshot(generate_request(&default_fields(), roster()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Feedback emails sent and stored in DB.");
        assert_eq!(
            json["data"]["download_link"],
            "/api/download/feedback_summary_Ms_Kapoor.xlsx"
        );
        assert_eq!(json["data"]["filename"], "feedback_summary_Ms_Kapoor.xlsx");
        assert_eq!(json["data"]["processed"], 2);
        assert_eq!(json["data"]["emails_sent"], 2);
        assert_eq!(json["data"]["emails_skipped"], 0);
        assert_eq!(json["data"]["failed"].as_array().unwrap().len(), 0);

        let sent = t.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].to, "ben@example.com");
        assert_eq!(sent[1].subject, "Academic Performance Feedback");

        let prompts = t.generator.prompts();
        assert!(prompts[1].contains("- Physics: 40 (Class Avg: 65, Max: 90) -> below 85% of maximum marks"));
        assert!(prompts[1].contains("Sign the email as Ms Kapoor."));

        let rows = body_json(t.app.oneshot(get_request("/api/feedbacks")).await.unwrap()).await;
        assert_eq!(rows["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    #[serial]
    async fn generation_failure_is_listed_but_batch_succeeds() {
        let t = make_test_app_with(TestAppOptions {
            generator: ScriptedGenerator::new().failing_on("- Name: Ben Li"),
            ..Default::default()
        })
        .await;

        let response = t
            .app
            .clone()
            .oneshot(generate_request(&default_fields(), roster()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["data"]["processed"], 1);
        let failed = json["data"]["failed"].as_array().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["name"], "Ben Li");
        assert_eq!(failed[0]["email"], "ben@example.com");
        assert!(failed[0]["reason"].as_str().unwrap().contains("generation failed"));
        assert_ne!(json["message"], "Feedback emails sent and stored in DB.");

        assert!(t.mailer.sent().iter().all(|m| m.to != "ben@example.com"));

        let rows = body_json(
            t.app
                .oneshot(get_request("/api/feedbacks?email=ben@example.com"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(rows["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn delivery_failure_is_counted_and_row_kept() {
        let t = make_test_app_with(TestAppOptions {
            mailer: RecordingMailer::new().rejecting("asha@example.com"),
            ..Default::default()
        })
        .await;

        let json = body_json(
            t.app
                .clone()
                .oneshot(generate_request(&default_fields(), roster()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["data"]["delivery_failures"], 1);
        assert_eq!(json["data"]["processed"], 2);

        let rows = body_json(
            t.app
                .oneshot(get_request("/api/feedbacks?email=asha@example.com"))
                .await
                .unwrap(),
        )
        .await;
        let rows = rows["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["physics"], 90);
        assert_eq!(rows[0]["feedback"], "Dear Asha Rao, keep up the good work.");
    }

    #[tokio::test]
    #[serial]
    async fn unsupported_file_type_is_rejected_without_side_effects() {
        let t = make_test_app().await;

        let response = t
            .app
            .clone()
            .oneshot(generate_request(
                &default_fields(),
                Some(("marks.txt", ROSTER_CSV.as_bytes())),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("Unsupported file type"));
        assert!(json["data"]["download_link"].as_str().unwrap_or_default().is_empty());

        assert!(t.generator.prompts().is_empty());
        assert!(t.mailer.sent().is_empty());

        let rows = body_json(t.app.clone().oneshot(get_request("/api/feedbacks")).await.unwrap()).await;
        assert_eq!(rows["data"].as_array().unwrap().len(), 0);

        let download = t
            .app
            .oneshot(get_request("/api/download/feedback_summary_Ms_Kapoor.xlsx"))
            .await
            .unwrap();
        assert_eq!(download.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn missing_columns_are_named_in_the_error() {
        let t = make_test_app().await;
        let csv = "Name,Email,Physics,Chemistry,Maths,CS\nAsha,asha@example.com,1,2,3,4\n";

        let response = t
            .app
            .oneshot(generate_request(
                &default_fields(),
                Some(("marks.csv", csv.as_bytes())),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("English"));
    }

    #[tokio::test]
    #[serial]
    async fn missing_form_field_is_a_bad_request() {
        let t = make_test_app().await;
        let fields: Vec<_> = default_fields()
            .into_iter()
            .filter(|(name, _)| *name != "teacher_name")
            .collect();

        let response = t.app.oneshot(generate_request(&fields, roster())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Missing required field: teacher_name");
    }

    #[tokio::test]
    #[serial]
    async fn missing_file_is_a_bad_request() {
        let t = make_test_app().await;

        let response = t.app.oneshot(generate_request(&default_fields(), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(t.generator.prompts().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn max_marks_must_be_positive() {
        for bad in ["0", "-5", "abc"] {
            let t = make_test_app().await;
            let mut fields = default_fields();
            fields.retain(|(name, _)| *name != "max_marks");
            fields.push(("max_marks", bad));

            let response = t.app.oneshot(generate_request(&fields, roster())).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "max_marks={bad}");
        }
    }

    #[tokio::test]
    #[serial]
    async fn oversized_upload_is_rejected() {
        let t = make_test_app_with(TestAppOptions {
            max_upload_bytes: Some(64),
            ..Default::default()
        })
        .await;

        let big = ROSTER_CSV.repeat(20);
        let response = t
            .app
            .oneshot(generate_request(
                &default_fields(),
                Some(("marks.csv", big.as_bytes())),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(t.generator.prompts().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn rerun_accumulates_stored_rows() {
        let t = make_test_app().await;

        for _ in 0..2 {
            let response = t
                .app
                .clone()
                .oneshot(generate_request(&default_fields(), roster()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let rows = body_json(t.app.oneshot(get_request("/api/feedbacks")).await.unwrap()).await;
        let rows = rows["data"].as_array().unwrap();
        assert_eq!(rows.len(), 4);
        // Newest first.
        assert!(rows[0]["id"].as_i64().unwrap() > rows[3]["id"].as_i64().unwrap());
    }

    #[tokio::test]
    #[serial]
    async fn status_is_idle_between_batches() {
        let t = make_test_app().await;

        let json = body_json(
            t.app
                .oneshot(get_request("/api/feedback/status"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "idle");
    }
}
