pub mod bulk_create;

pub use bulk_create::BulkCreateCommand;
