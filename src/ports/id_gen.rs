//! ID generator port for task and archive identifiers.

/// Generates unique identifiers.
///
/// Generated ids double as file names in the store, so implementations
/// must only emit ASCII alphanumerics, `-` and `_`.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
