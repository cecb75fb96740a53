//! Search components and the chain that runs them.
//!
//! A chain passes one [`SearchCarrier`] through its components in order.
//! Each component reads and replaces the carrier's requests or responses
//! and decides whether the chain stops after it.

pub mod carrier;
pub mod elastic;
pub mod request_builder;

use log::trace;

use crate::error::Result;
use crate::request::search_request::SearchServerRequest;

pub use carrier::SearchCarrier;
pub use elastic::ElasticSearchComponent;
pub use request_builder::{CompiledRequest, ResolvedPagination, build_request};

/// One stage of a search chain.
pub trait SearchComponent: Send + Sync {
    /// Name of the component, recorded in the carrier trace.
    fn name(&self) -> &str;

    /// Do the component's work. Returns `true` to stop the chain.
    fn process_search(&self, carrier: &mut SearchCarrier) -> Result<bool>;

    /// Record the entry in the carrier trace, then run
    /// [`SearchComponent::process_search`].
    fn process(&self, carrier: &mut SearchCarrier) -> Result<bool> {
        carrier.enter(self.name());
        trace!(
            "Chain '{}' entered {}: {}",
            carrier.chain_name(),
            self.name(),
            carrier.trace()
        );
        self.process_search(carrier)
    }
}

/// An ordered list of components.
pub struct SearchChain {
    name: String,
    components: Vec<Box<dyn SearchComponent>>,
}

impl SearchChain {
    /// Create an empty chain.
    pub fn new<S: Into<String>>(name: S) -> Self {
        SearchChain {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Append a component.
    pub fn add_component(mut self, component: Box<dyn SearchComponent>) -> Self {
        self.components.push(component);
        self
    }

    /// Name of the chain.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the components on `carrier` until one asks to stop.
    pub fn run(&self, carrier: &mut SearchCarrier) -> Result<()> {
        for component in &self.components {
            if component.process(carrier)? {
                trace!("Chain '{}' stopped at {}", self.name, component.name());
                break;
            }
        }
        Ok(())
    }

    /// Run the chain on a fresh carrier holding `requests`.
    pub fn search(&self, requests: Vec<SearchServerRequest>) -> Result<SearchCarrier> {
        let mut carrier = SearchCarrier::new(self.name.clone());
        carrier.set_server_requests(requests);
        self.run(&mut carrier)?;
        Ok(carrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        stop: bool,
    }

    impl SearchComponent for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn process_search(&self, _carrier: &mut SearchCarrier) -> Result<bool> {
            Ok(self.stop)
        }
    }

    #[test]
    fn test_chain_stops() {
        let chain = SearchChain::new("default")
            .add_component(Box::new(Recorder { name: "prepare", stop: false }))
            .add_component(Box::new(Recorder { name: "search", stop: true }))
            .add_component(Box::new(Recorder { name: "render", stop: false }));

        let carrier = chain.search(Vec::new()).unwrap();
        assert_eq!(carrier.chain_name(), "default");
        assert_eq!(carrier.entered_components(), ["prepare".to_string(), "search".to_string()]);
        assert_eq!(carrier.trace(), "prepare -> search");
    }
}
