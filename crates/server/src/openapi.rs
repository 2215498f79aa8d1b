//! OpenAPI document synthesis from indexer bindings.

use crate::{routes::PROOF_HEADER, server::ServePool};
use serde_yaml::{Mapping, Value};
use std::sync::Arc;

/// The static part of the document: info block and component schemas.
const BASE_DOCUMENT: &str = include_str!("../static/openapi.base.yml");

/// Renders the full OpenAPI document: the embedded base plus one path entry
/// per `(pool, binding path)`.
pub fn generate(pools: &[Arc<ServePool>]) -> Result<String, serde_yaml::Error> {
    let mut document: Value = serde_yaml::from_str(BASE_DOCUMENT)?;

    let mut paths = Mapping::new();
    for pool in pools {
        for (path, endpoint) in pool.adapter.indexer().bindings() {
            let mut parameters = Vec::new();
            for set in &endpoint.parameter_sets {
                for (name, description) in set.params.iter().zip(&set.descriptions) {
                    parameters.push(query_parameter(name, description));
                }
            }
            parameters.push(query_parameter("proof", "disable the inclusion proof with `false`"));

            let mut ok_response = Mapping::new();
            ok_response.insert("description".into(), "successful operation".into());
            ok_response.insert(
                "content".into(),
                json_content(&format!("#/components/schemas/{}", endpoint.schema)),
            );
            if !pool.adapter.exclude_proof() {
                ok_response.insert("headers".into(), proof_header());
            }

            let mut not_found = Mapping::new();
            not_found.insert("description".into(), "not found".into());
            not_found.insert(
                "content".into(),
                json_content(&format!("#/components/schemas/{}Error", endpoint.schema)),
            );

            let mut responses = Mapping::new();
            responses.insert(200.into(), Value::Mapping(ok_response));
            responses.insert(404.into(), Value::Mapping(not_found));

            let mut get = Mapping::new();
            get.insert("tags".into(), Value::Sequence(vec![pool.slug.clone().into()]));
            get.insert(
                "parameters".into(),
                Value::Sequence(parameters.into_iter().map(Value::Mapping).collect()),
            );
            get.insert("responses".into(), Value::Mapping(responses));

            let mut operations = Mapping::new();
            operations.insert("get".into(), Value::Mapping(get));
            paths.insert(
                format!("/{}{}", pool.slug, path).into(),
                Value::Mapping(operations),
            );
        }
    }

    if let Value::Mapping(root) = &mut document {
        root.insert("paths".into(), Value::Mapping(paths));
    }
    serde_yaml::to_string(&document)
}

fn query_parameter(name: &str, description: &str) -> Mapping {
    let mut schema = Mapping::new();
    schema.insert("type".into(), "string".into());

    let mut parameter = Mapping::new();
    parameter.insert("name".into(), name.into());
    parameter.insert("in".into(), "query".into());
    parameter.insert("description".into(), description.into());
    parameter.insert("required".into(), false.into());
    parameter.insert("schema".into(), Value::Mapping(schema));
    parameter
}

fn json_content(schema_ref: &str) -> Value {
    let mut schema = Mapping::new();
    schema.insert("$ref".into(), schema_ref.into());

    let mut media = Mapping::new();
    media.insert("schema".into(), Value::Mapping(schema));

    let mut content = Mapping::new();
    content.insert("application/json".into(), Value::Mapping(media));
    Value::Mapping(content)
}

fn proof_header() -> Value {
    let mut schema = Mapping::new();
    schema.insert("type".into(), "string".into());
    schema.insert("example".into(), "AIQAAAA...Jhhf6ut".into());

    let mut header = Mapping::new();
    header.insert(
        "description".into(),
        "Base64 encoded data item inclusion proof.".into(),
    );
    header.insert("schema".into(), Value::Mapping(schema));

    let mut headers = Mapping::new();
    headers.insert(PROOF_HEADER.into(), Value::Mapping(header));
    Value::Mapping(headers)
}
