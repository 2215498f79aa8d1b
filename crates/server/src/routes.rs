//! Query resolution: parameter-set matching, interception and the catalog
//! fallback.

use crate::{metrics, server::ServePool};
use actix_web::{http::header, web, HttpResponse};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};
use trustless_indexers::{InterceptError, LookupError};
use trustless_types::{Endpoint, FileType, ParameterSet};

/// Cache lifetime of successful responses.
const CACHE_MAX_AGE_SECONDS: u64 = 86_400;

/// The proof header attached to successful responses.
pub const PROOF_HEADER: &str = "x-kyve-proof";

/// Everything one route needs to answer queries.
#[derive(Debug, Clone)]
pub struct RouteContext {
    /// The pool served by this route.
    pub pool: Arc<ServePool>,
    /// The route path as registered, for metrics.
    pub path: String,
    /// The endpoint binding backing this route.
    pub endpoint: Endpoint,
}

/// Handles one record query.
pub async fn handle_query(
    context: web::Data<RouteContext>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let response = resolve(&context, &query.into_inner()).await;
    metrics::REQUESTS_SERVED
        .with_label_values(&[
            &context.pool.slug,
            &context.path,
            response.status().as_str(),
        ])
        .inc();
    response
}

async fn resolve(context: &RouteContext, query: &HashMap<String, String>) -> HttpResponse {
    let pool = &context.pool;
    let indexer = pool.adapter.indexer();

    let Some(set) = match_parameter_set(&context.endpoint.parameter_sets, query) else {
        return error_response(
            context,
            actix_web::http::StatusCode::BAD_REQUEST,
            "invalid params",
            Value::Null,
        );
    };
    let index_value =
        set.params.iter().map(|param| query[*param].as_str()).collect::<Vec<_>>().join("-");

    // The interceptor gets first pick; most indexers pass.
    match indexer.intercept(pool.adapter.as_ref(), set.index_id, query).await {
        Ok(Some(interception)) => {
            return record_response(context, &interception.data, &interception.proof, query);
        }
        Ok(None) => {}
        Err(err) => return intercept_error_response(context, err),
    }

    let file = match pool.adapter.get(set.index_id, &index_value).await {
        Ok(file) => file,
        Err(trustless_catalog::CatalogError::NotFound) => {
            debug!(target: "server", "no record for {} = {index_value}", set.index_id.code());
            return error_response(
                context,
                actix_web::http::StatusCode::NOT_FOUND,
                "not found",
                Value::Null,
            );
        }
        Err(err) => {
            warn!(target: "server", "catalog lookup failed: {err}");
            return error_response(
                context,
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
                json!(err.to_string()),
            );
        }
    };

    // S3 handles can short-circuit to the CDN instead of proxying.
    if file.file_type == FileType::S3 && pool.redirect {
        if let Some(cdn) = &pool.cdn {
            return HttpResponse::MovedPermanently()
                .insert_header((header::LOCATION, format!("{cdn}{}", file.path)))
                .finish();
        }
    }

    match pool.adapter.load_record(&file).await {
        Ok(record) => record_response(context, &record.value, &record.proof, query),
        Err(err) => {
            warn!(target: "server", "failed to resolve file {}: {err}", file.path);
            error_response(
                context,
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
                json!(err.to_string()),
            )
        }
    }
}

/// Picks the first parameter set whose every parameter is present as a
/// non-empty query value.
fn match_parameter_set<'a>(
    sets: &'a [ParameterSet],
    query: &HashMap<String, String>,
) -> Option<&'a ParameterSet> {
    sets.iter().find(|set| {
        set.params.iter().all(|param| query.get(*param).is_some_and(|value| !value.is_empty()))
    })
}

fn record_response(
    context: &RouteContext,
    value: &Value,
    proof: &str,
    query: &HashMap<String, String>,
) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    response.insert_header((header::CACHE_CONTROL, format!("max-age={CACHE_MAX_AGE_SECONDS}")));

    let proof_opted_out = query.get("proof").is_some_and(|value| value == "false");
    if !proof.is_empty() && !context.pool.adapter.exclude_proof() && !proof_opted_out {
        response.insert_header((PROOF_HEADER, proof));
    }
    response.json(value)
}

fn intercept_error_response(context: &RouteContext, err: InterceptError) -> HttpResponse {
    match err {
        InterceptError::TransactionNotFound | InterceptError::Lookup(LookupError::NotFound) => {
            error_response(
                context,
                actix_web::http::StatusCode::NOT_FOUND,
                &err.to_string(),
                Value::Null,
            )
        }
        InterceptError::BadQuery(param) => error_response(
            context,
            actix_web::http::StatusCode::BAD_REQUEST,
            "invalid params",
            json!(param),
        ),
        other => {
            warn!(target: "server", "interception failed: {other}");
            error_response(
                context,
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
                json!(other.to_string()),
            )
        }
    }
}

fn error_response(
    context: &RouteContext,
    status: actix_web::http::StatusCode,
    message: &str,
    data: Value,
) -> HttpResponse {
    let body = context.pool.adapter.indexer().error_response(message, data);
    HttpResponse::build(status).json(body)
}
