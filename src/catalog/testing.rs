// In-process transport double for engine tests.

use std::sync::Mutex;

use async_trait::async_trait;
use catalog_client::{ClientError, GraphqlRequest, GraphqlResponse, GraphqlTransport};
use serde_json::{json, Value};

type Handler = Box<dyn Fn(&GraphqlRequest) -> Result<Value, ClientError> + Send + Sync>;

/// Records every request and answers from a handler.
pub struct StubTransport {
    handler: Handler,
    requests: Mutex<Vec<GraphqlRequest>>,
}

impl StubTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&GraphqlRequest) -> Result<Value, ClientError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(body: Value) -> Self {
        Self::new(move |_| Ok(body.clone()))
    }

    /// Every call fails like an unreachable upstream.
    pub fn unavailable() -> Self {
        Self::new(|_| {
            Err(ClientError::Http {
                status: 503,
                body: "upstream unavailable".into(),
            })
        })
    }

    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GraphqlTransport for StubTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        let body = (self.handler)(request)?;
        Ok(serde_json::from_value(body)?)
    }
}

pub fn product_json(id: &str) -> Value {
    json!({
        "id": id,
        "handle": id.rsplit('/').next().unwrap_or(id),
        "title": format!("Product {id}"),
        "tags": [],
        "availableForSale": true,
        "variants": { "nodes": [] }
    })
}

/// Connection JSON whose edge cursors equal the product ids.
pub fn page_json(ids: &[&str], has_next_page: bool) -> Value {
    let edges: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "cursor": id, "node": product_json(id) }))
        .collect();
    json!({
        "edges": edges,
        "pageInfo": {
            "hasNextPage": has_next_page,
            "hasPreviousPage": false,
            "startCursor": ids.first(),
            "endCursor": ids.last(),
        }
    })
}
