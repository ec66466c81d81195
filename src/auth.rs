use std::{collections::HashSet, marker::PhantomData};

use http::{header, Request, Response, StatusCode};
use tower_http::validate_request::ValidateRequest;

/// Static bearer-token gate for the client-facing routes. An empty token
/// list leaves the API open; the webhook route authenticates by signature
/// instead and is never behind this layer.
pub struct StaticTokens<ResBody> {
    tokens: HashSet<String>,
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> StaticTokens<ResBody> {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            _ty: PhantomData,
        }
    }
}

impl<ResBody> Clone for StaticTokens<ResBody> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            _ty: PhantomData,
        }
    }
}

impl<B: Default> ValidateRequest<B> for StaticTokens<B> {
    type ResponseBody = B;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        if self.tokens.is_empty() {
            return Ok(());
        }

        let bearer = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match bearer {
            Some(token) if self.tokens.contains(token) => Ok(()),
            _ => Err(Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body(B::default())
                .unwrap()),
        }
    }
}
