use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("gtk initialization failed: {message}")]
    GtkInit { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gtk_init_error_names_the_cause() {
        let err = AppError::GtkInit {
            message: "cannot open display".to_string(),
        };
        assert_eq!(err.to_string(), "gtk initialization failed: cannot open display");
    }
}
