use std::sync::Arc;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use serde_json::Value;

use crate::root::ClientError;

/// One GraphQL operation as sent over the wire.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables,
            operation_name: None,
        }
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Raw `{ data, errors }` envelope. Both halves may be present at once
/// (partial data with field errors).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub path: Vec<Value>,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    /// Provider error code (`extensions.code`) when present.
    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(|c| c.as_str())
    }
}

pub fn format_graphql_errors(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Anything that can carry a GraphQL request to the storefront and hand back
/// the parsed envelope.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ClientError>;
}

#[async_trait]
impl<T: GraphqlTransport + ?Sized> GraphqlTransport for Arc<T> {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ClientError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_operation_name_in_camel_case() {
        let req = GraphqlRequest::new("query Q { shop { name } }", serde_json::json!({})).with_operation_name(
            "Q"
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["operationName"], "Q");
        assert!(v.get("operation_name").is_none());
    }

    #[test]
    fn request_without_operation_name_omits_field() {
        let req = GraphqlRequest::new("{ shop { name } }", serde_json::json!({}));
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("operationName").is_none());
    }

    #[test]
    fn response_keeps_partial_data_alongside_errors() {
        let body =
            r#"{"data":{"products":null},"errors":[{"message":"Invalid cursor","extensions":{"code":"BAD_CURSOR"}}]}"#;
        let resp: GraphqlResponse = serde_json::from_str(body).unwrap();
        assert!(resp.has_errors());
        assert!(resp.data.is_some());
        assert_eq!(resp.errors[0].code(), Some("BAD_CURSOR"));
    }

    #[test]
    fn error_messages_are_joined() {
        let errors = vec![
            GraphqlError { message: "Field not found".into(), path: vec![], extensions: None },
            GraphqlError { message: "Invalid ID".into(), path: vec![], extensions: None }
        ];
        assert_eq!(format_graphql_errors(&errors), "Field not found; Invalid ID");
    }
}
