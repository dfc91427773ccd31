pub mod app;

pub use app::{TestApp, TestAppOptions, make_test_app, make_test_app_with};
