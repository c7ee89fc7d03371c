pub mod transform;
pub mod validate;

// Re-export command handlers
pub use transform::TransformCommand;
pub use validate::ValidateCommand;
