//! State handed from component to component along a search chain.

use crate::request::search_request::SearchServerRequest;
use crate::response::search_response::SearchServerResponse;

/// Requests, responses and trace of one pass through a chain.
#[derive(Debug, Default)]
pub struct SearchCarrier {
    chain_name: String,
    entered_components: Vec<String>,
    server_requests: Vec<SearchServerRequest>,
    server_responses: Vec<SearchServerResponse>,
}

impl SearchCarrier {
    /// Create a carrier for the chain `chain_name`.
    pub fn new<S: Into<String>>(chain_name: S) -> Self {
        SearchCarrier {
            chain_name: chain_name.into(),
            ..Default::default()
        }
    }

    /// Name of the chain this carrier runs through.
    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    /// Names of the components entered so far, in order.
    pub fn entered_components(&self) -> &[String] {
        &self.entered_components
    }

    /// The trace as `a -> b -> c`.
    pub fn trace(&self) -> String {
        self.entered_components.join(" -> ")
    }

    pub(crate) fn enter<S: Into<String>>(&mut self, component: S) {
        self.entered_components.push(component.into());
    }

    /// The requests.
    pub fn server_requests(&self) -> &[SearchServerRequest] {
        &self.server_requests
    }

    /// Replace the requests.
    pub fn set_server_requests(&mut self, requests: Vec<SearchServerRequest>) {
        self.server_requests = requests;
    }

    /// The first request.
    pub fn single_request(&self) -> Option<&SearchServerRequest> {
        self.server_requests.first()
    }

    /// Replace the requests with a single one.
    pub fn set_single_request(&mut self, request: SearchServerRequest) {
        self.server_requests = vec![request];
    }

    /// The responses.
    pub fn server_responses(&self) -> &[SearchServerResponse] {
        &self.server_responses
    }

    /// The responses, mutably, to consume their documents.
    pub fn server_responses_mut(&mut self) -> &mut [SearchServerResponse] {
        &mut self.server_responses
    }

    /// Replace the responses.
    pub fn set_server_responses(&mut self, responses: Vec<SearchServerResponse>) {
        self.server_responses = responses;
    }

    /// Take the responses out of the carrier.
    pub fn take_server_responses(&mut self) -> Vec<SearchServerResponse> {
        std::mem::take(&mut self.server_responses)
    }

    /// The first response.
    pub fn single_response(&self) -> Option<&SearchServerResponse> {
        self.server_responses.first()
    }

    /// The first response, mutably.
    pub fn single_response_mut(&mut self) -> Option<&mut SearchServerResponse> {
        self.server_responses.first_mut()
    }
}
