//! Output formatting for CLI commands.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::aggregation::AggregationResult;
use crate::cli::args::{ElasticQueryArgs, OutputFormat};
use crate::error::Result;
use crate::response::SearchServerDocument;

/// One request as it is sent to the backend.
#[derive(Debug, Serialize)]
pub struct CompiledRequestView {
    pub position: usize,
    pub index: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<String>,
    pub body: Value,
}

/// Result structure for request validation.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub requests: usize,
    pub invalid: usize,
    pub problems: Vec<ValidationProblem>,
}

/// A request that does not compile.
#[derive(Debug, Serialize)]
pub struct ValidationProblem {
    pub position: usize,
    pub index: String,
    pub error: String,
}

/// Result structure for a simulated batch.
#[derive(Debug, Serialize)]
pub struct SimulationResult {
    pub documents_loaded: usize,
    pub responses: Vec<SimulatedResponse>,
}

/// What one response of a simulated batch carried.
#[derive(Debug, Default, Serialize)]
pub struct SimulatedResponse {
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub num_found: u64,
    pub relation: String,
    pub documents_read: usize,
    pub documents: Vec<SearchServerDocument>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aggregations: BTreeMap<String, AggregationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<SearchServerDocument>,
}

/// Output a result in the requested format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &ElasticQueryArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_human<T: Serialize>(message: &str, result: &T, args: &ElasticQueryArgs) -> Result<()> {
    if args.verbosity() > 0 && !message.is_empty() {
        println!("{message}");
    }

    let value = serde_json::to_value(result)?;
    if let Some(responses) = value.get("responses").and_then(Value::as_array) {
        output_simulation_human(&value, responses);
    } else if let Some(views) = value.as_array() {
        output_compiled_human(views);
    } else {
        output_generic_human(&value);
    }
    Ok(())
}

fn output_compiled_human(views: &[Value]) {
    for view in views {
        let position = format_value(&view["position"]);
        let kind = format_value(&view["kind"]);
        let index = format_value(&view["index"]);
        println!("#{position} {kind} on {index}");
        if let Some(pagination) = view.get("pagination") {
            println!("  pagination: {}", format_value(pagination));
        }
        if let Some(scroll) = view.get("scroll") {
            println!("  scroll: {}", format_value(scroll));
        }
        let body = serde_json::to_string_pretty(&view["body"]).unwrap_or_default();
        for line in body.lines() {
            println!("  {line}");
        }
    }
}

fn output_simulation_human(value: &Value, responses: &[Value]) {
    println!("Documents loaded: {}", format_value(&value["documents_loaded"]));
    println!();

    for response in responses {
        let position = format_value(&response["position"]);
        if let Some(error) = response.get("error") {
            let message = response.get("error_message").map(format_value).unwrap_or_default();
            println!("#{position} {} {message}", format_value(error));
            continue;
        }

        let relation = if response["relation"] == "gte" { "at least " } else { "" };
        println!(
            "#{position} found {relation}{}, read {}",
            format_value(&response["num_found"]),
            format_value(&response["documents_read"])
        );
        if let Some(documents) = response["documents"].as_array() {
            for (i, document) in documents.iter().enumerate() {
                let id = document.get("id").map(format_value).unwrap_or_default();
                println!("  {}. {id}", i + 1);
                if let Some(fields) = document.get("fields").and_then(Value::as_object) {
                    for (name, values) in fields {
                        println!("     {name}: {}", format_value(values));
                    }
                }
            }
        }
        if let Some(aggregations) = response.get("aggregations").and_then(Value::as_object) {
            for (name, result) in aggregations {
                println!("  aggregation {name}: {}", format_value(result));
            }
        }
        if let Some(suggestions) = response.get("suggestions").and_then(Value::as_array) {
            for suggestion in suggestions {
                let text = suggestion["fields"]["text"]
                    .get(0)
                    .map(format_value)
                    .unwrap_or_default();
                println!("  suggestion: {text}");
            }
        }
    }
}

fn output_generic_human(value: &Value) {
    match value {
        Value::Object(obj) => {
            for (key, val) in obj {
                let formatted_val = format_value(val);
                println!("{key}: {formatted_val}");
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{formatted_value}");
        }
    }
}

fn output_json<T: Serialize>(result: &T, args: &ElasticQueryArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("rust")), "rust");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(["a", 1, true])), "[a, 1, true]");
        assert_eq!(format_value(&json!(null)), "null");
        assert_eq!(format_value(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn test_simulated_response_skips_empty_sections() {
        let response = SimulatedResponse {
            position: 0,
            num_found: 3,
            relation: "eq".to_string(),
            documents_read: 3,
            ..Default::default()
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("aggregations").is_none());
        assert!(value.get("suggestions").is_none());
        assert_eq!(value["num_found"], json!(3));
    }
}
