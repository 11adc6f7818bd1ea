pub mod attachments;
pub mod status;
