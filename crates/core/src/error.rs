//! Domain error taxonomy shared by every crate; the HTTP layer maps each
//! variant to a status code.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_entity_and_key() {
        let err = CoreError::NotFound {
            entity: "user",
            key: "ghost@example.com".to_string(),
        };
        assert_eq!(err.to_string(), "Entity not found: user ghost@example.com");
    }
}
