use payloads::ClientError;

/// Shown when an error carries no usable text.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Errors that can be shown to a user.
pub trait UserMessage {
    /// A message the backend put in the response body, if any.
    fn nested_message(&self) -> Option<String> {
        None
    }

    /// The error's own description.
    fn own_message(&self) -> String;
}

/// Normalize an error for display: the nested response message, else the
/// error's own message, else [`FALLBACK_MESSAGE`].
pub fn user_message<E: UserMessage + ?Sized>(error: &E) -> String {
    error
        .nested_message()
        .or_else(|| Some(error.own_message()))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

impl UserMessage for ClientError {
    fn nested_message(&self) -> Option<String> {
        self.response_message()
    }

    fn own_message(&self) -> String {
        match self {
            // Bodies without a message field are JSON or HTML that means
            // nothing to a user.
            ClientError::APIError(status, body) => {
                let body = body.trim();
                if body.is_empty() || body.starts_with(['{', '[', '<']) {
                    format!(
                        "Request failed with status code {}",
                        status.as_u16()
                    )
                } else {
                    body.to_string()
                }
            }
            ClientError::Network(_) => self.to_string(),
        }
    }
}

impl UserMessage for String {
    fn own_message(&self) -> String {
        self.clone()
    }
}

impl UserMessage for &str {
    fn own_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payloads::ClientError;
    use reqwest::StatusCode;

    #[test]
    fn prefers_the_nested_body_message() {
        let error = ClientError::APIError(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"success":false,"message":"Registration number taken"}"#.into(),
        );
        assert_eq!(user_message(&error), "Registration number taken");

        let error = ClientError::APIError(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Invalid period"}"#.into(),
        );
        assert_eq!(user_message(&error), "Invalid period");
    }

    #[test]
    fn falls_back_to_the_errors_own_message() {
        let error = ClientError::APIError(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"success":false}"#.into(),
        );
        assert_eq!(user_message(&error), "Request failed with status code 500");

        let error = ClientError::APIError(
            StatusCode::BAD_GATEWAY,
            "upstream down".into(),
        );
        assert_eq!(user_message(&error), "upstream down");
    }

    #[test]
    fn blank_messages_use_the_fallback() {
        assert_eq!(user_message(&String::new()), FALLBACK_MESSAGE);
        assert_eq!(user_message(&"   "), FALLBACK_MESSAGE);
        assert_eq!(user_message(&"Permit not found"), "Permit not found");
    }
}
