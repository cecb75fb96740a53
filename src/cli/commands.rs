//! Command implementations for the elastic-query CLI.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info};
use serde_json::{Value, json};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::component::ElasticSearchComponent;
use crate::component::request_builder::{CompiledRequest, build_request};
use crate::config::ElasticQueryConfig;
use crate::error::{ElasticQueryError, Result};
use crate::request::SearchServerRequest;
use crate::transport::InMemoryTransport;

/// Execute a CLI command.
pub fn execute_command(args: ElasticQueryArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Compile(compile_args) => compile_requests(compile_args, &config, &args),
        Command::Validate(validate_args) => validate_requests(validate_args, &config, &args),
        Command::Simulate(simulate_args) => simulate_requests(simulate_args, config, &args),
    }
}

/// Load the configuration named on the command line, or the defaults.
fn load_config(args: &ElasticQueryArgs) -> Result<ElasticQueryConfig> {
    match &args.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            ElasticQueryConfig::from_json_file(path)
        }
        None => Ok(ElasticQueryConfig::default()),
    }
}

/// Read a file holding either one request object or an array of them.
pub fn load_requests<P: AsRef<Path>>(path: P) -> Result<Vec<SearchServerRequest>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read requests from {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let requests = match value {
        Value::Array(_) => serde_json::from_value::<Vec<SearchServerRequest>>(value),
        other => serde_json::from_value::<SearchServerRequest>(other).map(|request| vec![request]),
    }
    .with_context(|| format!("{} does not hold search requests", path.display()))?;
    Ok(requests)
}

fn compile_requests(args: &CompileArgs, config: &ElasticQueryConfig, cli_args: &ElasticQueryArgs) -> Result<()> {
    let requests = load_requests(&args.requests)?;
    let views = requests
        .iter()
        .enumerate()
        .map(|(position, request)| {
            let compiled = build_request(request, config)
                .map_err(|e| ElasticQueryError::invalid_argument(format!("request #{position}: {e}")))?;
            Ok(compiled_view(position, compiled))
        })
        .collect::<Result<Vec<_>>>()?;

    output_result(&format!("Compiled {} requests", views.len()), &views, cli_args)
}

fn compiled_view(position: usize, compiled: CompiledRequest) -> CompiledRequestView {
    match compiled {
        CompiledRequest::Search { native, pagination } => CompiledRequestView {
            position,
            index: native.index,
            kind: "search".to_string(),
            pagination: pagination.map(|p| format!("{} (keep alive {})", p.method, p.keep_alive)),
            scroll: native.scroll.map(|keep_alive| keep_alive.to_string()),
            body: native.body,
        },
        CompiledRequest::Count { index, query } => CompiledRequestView {
            position,
            index,
            kind: "count".to_string(),
            pagination: None,
            scroll: None,
            body: query.map(|query| json!({ "query": query })).unwrap_or_else(|| json!({})),
        },
        CompiledRequest::Suggestion { native } => CompiledRequestView {
            position,
            index: native.index,
            kind: "suggestion".to_string(),
            pagination: None,
            scroll: None,
            body: native.body,
        },
    }
}

fn validate_requests(args: &ValidateArgs, config: &ElasticQueryConfig, cli_args: &ElasticQueryArgs) -> Result<()> {
    let requests = load_requests(&args.requests)?;
    let mut report = ValidationReport {
        requests: requests.len(),
        ..Default::default()
    };
    for (position, request) in requests.iter().enumerate() {
        if let Err(e) = build_request(request, config) {
            report.problems.push(ValidationProblem {
                position,
                index: request.index.clone(),
                error: e.to_string(),
            });
        }
    }
    report.invalid = report.problems.len();

    output_result("Validation report", &report, cli_args)?;
    if report.invalid > 0 {
        return Err(ElasticQueryError::invalid_argument(format!(
            "{} of {} requests do not compile",
            report.invalid, report.requests
        )));
    }
    Ok(())
}

fn simulate_requests(args: &SimulateArgs, config: ElasticQueryConfig, cli_args: &ElasticQueryArgs) -> Result<()> {
    let requests = load_requests(&args.requests)?;
    let index = args
        .index
        .clone()
        .or_else(|| requests.first().map(|request| request.index.clone()))
        .ok_or_else(|| ElasticQueryError::invalid_argument("no request and no index given"))?;

    let transport = Arc::new(InMemoryTransport::new());
    let file = File::open(&args.documents)
        .with_context(|| format!("Could not open documents {}", args.documents.display()))?;
    let documents_loaded = transport.load_json_lines(&index, BufReader::new(file))?;
    info!("Loaded {documents_loaded} documents into '{index}'");

    let component = ElasticSearchComponent::new(transport, config)?;
    let responses = component.execute(&requests)?;

    let mut simulated = Vec::with_capacity(responses.len());
    for (position, mut response) in responses.into_iter().enumerate() {
        let mut result = SimulatedResponse {
            position,
            num_found: response.num_found(),
            relation: serde_json::to_value(response.num_found_relation())?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        };
        if let Some(kind) = response.query_error() {
            result.error = Some(kind.to_string());
            result.error_message = response.error_message().map(str::to_string);
            simulated.push(result);
            continue;
        }

        // A batch-wide failure has a single response, so positions match here.
        if let Some(request) = requests.get(position) {
            for (name, aggregation) in &request.aggregations {
                if let Some(aggregation_result) = response.aggregation_result(aggregation) {
                    result.aggregations.insert(name.clone(), aggregation_result);
                }
            }
        }
        if response.is_suggestion_search_response() {
            result.suggestions = response.suggestion_results();
        }

        let mut cursor = response.document_results();
        for document in cursor.by_ref() {
            if result.documents.len() < args.max_documents {
                result.documents.push(document);
            }
            result.documents_read += 1;
        }
        if let Some(failure) = cursor.failure() {
            result.error_message = Some(failure.to_string());
        }
        debug!("Response #{position} ended in state {:?}", cursor.state());
        simulated.push(result);
    }

    let result = SimulationResult {
        documents_loaded,
        responses: simulated,
    };
    output_result(&format!("Simulated {} requests", requests.len()), &result, cli_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_requests_single_and_array() {
        let single = write_temp(r#"{"index": "books", "query": {"type": "match_all"}}"#);
        let requests = load_requests(single.path()).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].index, "books");

        let many = write_temp(
            r#"[{"index": "a", "query": {"type": "match_all"}},
                {"index": "b", "query": {"type": "match_all"}, "count_only": true}]"#,
        );
        let requests = load_requests(many.path()).unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].count_only);
    }

    #[test]
    fn test_load_requests_errors_name_the_file() {
        let broken = write_temp("{ not json");
        let err = load_requests(broken.path()).unwrap_err();
        assert!(err.to_string().contains("is not valid JSON"));

        let err = load_requests("/nonexistent/requests.json").unwrap_err();
        assert!(err.to_string().contains("Could not read requests"));
    }

    #[test]
    fn test_compiled_view_of_count() {
        let view = compiled_view(
            3,
            CompiledRequest::Count {
                index: "books".to_string(),
                query: Some(json!({"match_all": {}})),
            },
        );
        assert_eq!(view.position, 3);
        assert_eq!(view.kind, "count");
        assert_eq!(view.body, json!({"query": {"match_all": {}}}));
    }
}
