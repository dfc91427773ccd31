mod download_test;
mod feedback_test;
mod health_test;
