#[cfg(test)]
mod tests {
    use api::state::AppState;
    use feedback::BatchStatus;
    use serial_test::serial;
    use util::config::AppConfig;
    use util::test_helpers::{setup_test_storage_root, test_config};

    #[tokio::test]
    #[serial]
    async fn from_config_wires_offline_collaborators() {
        let storage = setup_test_storage_root();
        let config = test_config(&storage);

        let state = AppState::from_config(config).await.unwrap();
        assert_eq!(state.runner().status(), BatchStatus::Idle);
        assert!(state.downloads_dir().starts_with(storage.path().canonicalize().unwrap()));
        assert!(state.downloads_dir().ends_with("downloads"));
    }

    #[tokio::test]
    #[serial]
    async fn smtp_without_credentials_fails_startup() {
        let storage = setup_test_storage_root();
        let config = AppConfig {
            disable_email: false,
            gmail_username: String::new(),
            ..test_config(&storage)
        };
        assert!(AppState::from_config(config).await.is_err());
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        // SAFETY: serialized with every other test in this binary.
        unsafe {
            std::env::set_var("MAX_CONCURRENT_STUDENTS", "4");
            std::env::set_var("MAIL_TRANSPORT", "gmail_api");
        }
        let config = AppConfig::from_env();
        unsafe {
            std::env::remove_var("MAX_CONCURRENT_STUDENTS");
            std::env::remove_var("MAIL_TRANSPORT");
        }

        assert_eq!(config.max_concurrent_students, 4);
        assert_eq!(config.mail_transport.to_string(), "gmail_api");
    }
}
