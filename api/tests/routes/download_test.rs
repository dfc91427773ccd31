#[cfg(test)]
mod tests {
    use crate::helpers::app::{
        ROSTER_CSV, body_bytes, body_json, default_fields, generate_request, get_request,
    };
    use crate::helpers::make_test_app;
    use axum::http::{StatusCode, header};
    use calamine::{Data, Reader, Xlsx};
    use serial_test::serial;
    use std::io::Cursor;
    use tower::ServiceExt;

    #[tokio::test]
    #[serial]
    async fn generated_report_downloads_as_xlsx_attachment() {
        let t = make_test_app().await;

        let generated = body_json(
            t.app
                .clone()
                .oneshot(generate_request(
                    &default_fields(),
                    Some(("marks.csv", ROSTER_CSV.as_bytes())),
                ))
                .await
                .unwrap(),
        )
        .await;
        let link = generated["data"]["download_link"].as_str().unwrap().to_string();

        let response = t.app.oneshot(get_request(&link)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"feedback_summary_Ms_Kapoor.xlsx\""
        );

        let bytes = body_bytes(response).await;
        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let rows: Vec<_> = range.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], Data::String("Name".into()));
        assert_eq!(rows[1][0], Data::String("Asha Rao".into()));
        assert_eq!(rows[2][0], Data::String("Ben Li".into()));
        assert_eq!(rows[2][2], Data::Float(40.0));
    }

    #[tokio::test]
    #[serial]
    async fn returned_link_downloads_for_punctuated_teacher_names() {
        for teacher in ["Ms Kapoor #2", "J.. Rao", "Rao?x", "50% Rao", "Dr. A."] {
            let t = make_test_app().await;
            let mut fields = default_fields();
            fields.retain(|(name, _)| *name != "teacher_name");
            fields.push(("teacher_name", teacher));

            let generated = body_json(
                t.app
                    .clone()
                    .oneshot(generate_request(
                        &fields,
                        Some(("marks.csv", ROSTER_CSV.as_bytes())),
                    ))
                    .await
                    .unwrap(),
            )
            .await;
            assert_eq!(generated["success"], true, "teacher={teacher}");
            let link = generated["data"]["download_link"].as_str().unwrap().to_string();
            let filename = generated["data"]["filename"].as_str().unwrap();
            assert_eq!(link, format!("/api/download/{filename}"));

            let response = t.app.oneshot(get_request(&link)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "teacher={teacher} link={link}");
        }
    }

    #[tokio::test]
    #[serial]
    async fn unknown_report_is_not_found() {
        let t = make_test_app().await;
        let response = t
            .app
            .oneshot(get_request("/api/download/feedback_summary_Nobody.xlsx"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    #[serial]
    async fn traversal_names_are_rejected() {
        let t = make_test_app().await;
        std::fs::write(t.storage.path().join("secret.txt"), "x").unwrap();

        let response = t
            .app
            .oneshot(get_request("/api/download/..%2Fsecret.txt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid filename");
    }
}
