pub mod feedback_store;
pub mod mailer;
pub mod text_generator;
