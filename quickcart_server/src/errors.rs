use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use quickcart_engine::{traits::GatewayError, OrderFlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(String),
    #[error("Could not serialize access token. {0}")]
    CouldNotSerializeAccessToken(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The payment provider could not be reached. {0}")]
    PaymentProviderError(String),
    #[error("Webhook payload rejected. {0}")]
    WebhookRejected(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::WebhookRejected(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotSerializeAccessToken(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::InvalidRequest(msg) => Self::InvalidRequestBody(msg),
            OrderFlowError::Unauthenticated(msg) => Self::AuthenticationError(msg),
            OrderFlowError::OrderNotFound(msg) => Self::NoRecordFound(msg),
            OrderFlowError::ConfigurationError(msg) => Self::ConfigurationError(msg),
            OrderFlowError::GatewayError(GatewayError::SignatureInvalid) => {
                Self::WebhookRejected("signature verification failed".to_string())
            },
            OrderFlowError::GatewayError(GatewayError::MalformedPayload(msg)) => Self::WebhookRejected(msg),
            OrderFlowError::GatewayError(e) => Self::PaymentProviderError(e.to_string()),
            OrderFlowError::DatabaseError(msg) => Self::BackendError(msg),
        }
    }
}

#[cfg(test)]
mod test {
    use actix_web::{error::ResponseError, http::StatusCode};
    use quickcart_engine::{traits::GatewayError, OrderFlowError};

    use super::ServerError;

    #[test]
    fn order_flow_errors_map_to_the_right_status_codes() {
        let cases = [
            (OrderFlowError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (OrderFlowError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (OrderFlowError::OrderNotFound("x".into()), StatusCode::NOT_FOUND),
            (OrderFlowError::ConfigurationError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (OrderFlowError::GatewayError(GatewayError::SignatureInvalid), StatusCode::BAD_REQUEST),
            (
                OrderFlowError::GatewayError(GatewayError::ProviderError("down".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (OrderFlowError::DatabaseError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let server_err = ServerError::from(err);
            assert_eq!(server_err.status_code(), expected, "{server_err}");
        }
    }
}
