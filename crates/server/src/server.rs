//! App assembly: routes from bindings, landing page and OpenAPI document.

use crate::{
    openapi,
    routes::{handle_query, RouteContext},
};
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use std::sync::Arc;
use tracing::info;
use trustless_catalog::CatalogAdapter;

/// The embedded landing page.
const LANDING_PAGE: &str = include_str!("../static/index.html");

/// One pool as exposed over HTTP.
#[derive(Debug)]
pub struct ServePool {
    /// The path prefix the pool is served under.
    pub slug: String,
    /// The pool's catalog window.
    pub adapter: Arc<CatalogAdapter>,
    /// Whether S3 handles redirect to the CDN instead of being proxied.
    pub redirect: bool,
    /// The CDN base url for redirects, if any.
    pub cdn: Option<String>,
}

/// Request server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The port to bind on.
    pub port: u16,
}

/// Builds the routing table for the given pools.
///
/// Registered paths are `/<slug><path>` for every path in the pool's
/// indexer bindings, plus `/` and `/openapi.yml`.
pub fn configure(
    config: &mut web::ServiceConfig,
    pools: &[Arc<ServePool>],
    openapi_document: String,
) {
    config.route("/", web::get().to(landing));
    config.app_data(web::Data::new(openapi_document));
    config.route("/openapi.yml", web::get().to(openapi_document_route));

    for pool in pools {
        for (path, endpoint) in pool.adapter.indexer().bindings() {
            let full_path = format!("/{}{}", pool.slug, path);
            let context = RouteContext {
                pool: pool.clone(),
                path: full_path.clone(),
                endpoint,
            };
            config.service(
                web::resource(full_path)
                    .app_data(web::Data::new(context))
                    .route(web::get().to(handle_query)),
            );
        }
    }
}

/// Runs the request server until the process exits.
pub async fn run(config: ServerConfig, pools: Vec<Arc<ServePool>>) -> std::io::Result<()> {
    let openapi_document = openapi::generate(&pools).map_err(std::io::Error::other)?;
    info!(target: "server", "serving {} pools on port {}", pools.len(), config.port);

    HttpServer::new(move || {
        let pools = pools.clone();
        let openapi_document = openapi_document.clone();
        App::new().configure(move |service| configure(service, &pools, openapi_document))
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}

async fn landing() -> impl Responder {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(LANDING_PAGE)
}

async fn openapi_document_route(document: web::Data<String>) -> impl Responder {
    HttpResponse::Ok().content_type("application/yaml").body(document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{openapi, routes::PROOF_HEADER};
    use actix_http::Request;
    use actix_web::{
        body::MessageBody,
        dev::{Service, ServiceResponse},
        test, App,
    };
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use trustless_catalog::{DatabaseConfig, DatabaseKind};
    use trustless_indexers::Indexer;
    use trustless_merkle::decode_proof_base64;
    use trustless_storage::LocalStore;
    use trustless_types::{Bundle, DataItem, PoolConfig};

    struct Harness {
        pools: Vec<Arc<ServePool>>,
        _dirs: Vec<tempfile::TempDir>,
    }

    impl Harness {
        async fn new() -> Self {
            Self { pools: Vec::new(), _dirs: Vec::new() }
        }

        async fn add_pool(
            &mut self,
            indexer: &str,
            pool_id: u16,
            slug: &str,
            exclude_proof: bool,
        ) -> Arc<CatalogAdapter> {
            let db_dir = tempfile::tempdir().unwrap();
            let store_dir = tempfile::tempdir().unwrap();
            let database = DatabaseConfig {
                kind: DatabaseKind::Sqlite,
                dbname: db_dir.path().join("catalog.db").display().to_string(),
                host: String::new(),
                user: String::new(),
                password: String::new(),
                port: 0,
            };
            let adapter = Arc::new(
                CatalogAdapter::new(
                    database.connect().await.unwrap(),
                    DatabaseKind::Sqlite,
                    PoolConfig {
                        bundle_start_id: 0,
                        chain_id: "kaon-1".to_string(),
                        indexer: indexer.to_string(),
                        pool_id,
                        slug: slug.to_string(),
                        exclude_proof,
                    },
                    Indexer::from_name(indexer).unwrap(),
                    Arc::new(LocalStore::new(store_dir.path(), false)),
                    Arc::new(Mutex::new(())),
                    2,
                )
                .await
                .unwrap(),
            );
            self.pools.push(Arc::new(ServePool {
                slug: slug.to_string(),
                adapter: adapter.clone(),
                redirect: false,
                cdn: None,
            }));
            self._dirs.push(db_dir);
            self._dirs.push(store_dir);
            adapter
        }

        async fn app(
            &self,
        ) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
        {
            let pools = self.pools.clone();
            let document = openapi::generate(&pools).unwrap();
            test::init_service(
                App::new().configure(move |service| configure(service, &pools, document)),
            )
            .await
        }
    }

    fn height_bundle(bundle_id: u64, pool_id: u16, keys: &[&str]) -> Bundle {
        Bundle {
            pool_id,
            bundle_id,
            chain_id: "kaon-1".to_string(),
            data_items: keys
                .iter()
                .map(|key| DataItem {
                    key: key.to_string(),
                    value: json!({ "n": key.parse::<u64>().unwrap() }),
                })
                .collect(),
        }
    }

    #[actix_web::test]
    async fn test_height_query_returns_record_with_proof_header() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("height", 105, "linea", false).await;
        adapter.save(&height_bundle(0, 105, &["1", "2"])).await.unwrap();
        adapter.save(&height_bundle(1, 105, &["3", "4"])).await.unwrap();

        let app = harness.app().await;
        let response =
            test::call_service(&app, test::TestRequest::get().uri("/linea/value?height=3").to_request())
                .await;
        assert_eq!(response.status(), 200);

        let proof = response
            .headers()
            .get(PROOF_HEADER)
            .expect("proof header missing")
            .to_str()
            .unwrap()
            .to_string();
        let decoded = decode_proof_base64(&proof).unwrap();
        assert_eq!(decoded.bundle_id, 1);
        assert_eq!(decoded.pool_id, 105);

        assert_eq!(
            response.headers().get(actix_web::http::header::CACHE_CONTROL).unwrap(),
            "max-age=86400"
        );
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({ "key": "3", "value": { "n": 3 } }));
    }

    #[actix_web::test]
    async fn test_proof_false_suppresses_the_header() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("height", 105, "linea", false).await;
        adapter.save(&height_bundle(0, 105, &["1"])).await.unwrap();

        let app = harness.app().await;
        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/linea/value?height=1&proof=false").to_request(),
        )
        .await;
        assert_eq!(response.status(), 200);
        assert!(response.headers().get(PROOF_HEADER).is_none());
    }

    #[actix_web::test]
    async fn test_exclude_proof_pool_never_sends_the_header() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("height", 106, "nova", true).await;
        adapter.save(&height_bundle(0, 106, &["1"])).await.unwrap();

        let app = harness.app().await;
        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/nova/value?height=1").to_request(),
        )
        .await;
        assert_eq!(response.status(), 200);
        assert!(response.headers().get(PROOF_HEADER).is_none());
    }

    #[actix_web::test]
    async fn test_missing_parameters_are_a_bad_request() {
        let mut harness = Harness::new().await;
        harness.add_pool("height", 105, "linea", false).await;

        let app = harness.app().await;
        let response =
            test::call_service(&app, test::TestRequest::get().uri("/linea/value").to_request())
                .await;
        assert_eq!(response.status(), 400);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "invalid params");

        // An empty value does not satisfy the parameter set either.
        let app = harness.app().await;
        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/linea/value?height=").to_request(),
        )
        .await;
        assert_eq!(response.status(), 400);
    }

    #[actix_web::test]
    async fn test_unknown_key_is_not_found() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("height", 105, "linea", false).await;
        adapter.save(&height_bundle(0, 105, &["1"])).await.unwrap();

        let app = harness.app().await;
        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/linea/value?height=99").to_request(),
        )
        .await;
        assert_eq!(response.status(), 404);
    }

    #[actix_web::test]
    async fn test_blob_queries_resolve_by_height_and_slot() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("ethereum-blobs", 21, "blobs", false).await;
        adapter
            .save(&Bundle {
                pool_id: 21,
                bundle_id: 0,
                chain_id: "kaon-1".to_string(),
                data_items: vec![DataItem {
                    key: "19426587".to_string(),
                    value: json!({ "slot": 8626178, "blobs": [] }),
                }],
            })
            .await
            .unwrap();

        let app = harness.app().await;
        let by_height = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/blobs/beacon/blob_sidecars?block_height=19426587")
                .to_request(),
        )
        .await;
        assert_eq!(by_height.status(), 200);
        let height_proof =
            by_height.headers().get(PROOF_HEADER).unwrap().to_str().unwrap().to_string();
        let height_body: Value = test::read_body_json(by_height).await;

        let by_slot = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/blobs/beacon/blob_sidecars?slot_number=8626178")
                .to_request(),
        )
        .await;
        assert_eq!(by_slot.status(), 200);
        let slot_proof =
            by_slot.headers().get(PROOF_HEADER).unwrap().to_str().unwrap().to_string();
        let slot_body: Value = test::read_body_json(by_slot).await;

        assert_eq!(height_body, slot_body);
        assert_eq!(height_proof, slot_proof);
    }

    #[actix_web::test]
    async fn test_tendermint_block_resolves_by_height_and_hash() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("tendermint", 2, "cosmos", false).await;
        adapter
            .save(&Bundle {
                pool_id: 2,
                bundle_id: 0,
                chain_id: "kaon-1".to_string(),
                data_items: vec![DataItem {
                    key: "100".to_string(),
                    value: json!({
                        "block": {
                            "block_id": { "hash": "0xABC" },
                            "block": { "header": { "height": "100" } },
                        },
                        "block_results": { "height": "100" },
                    }),
                }],
            })
            .await
            .unwrap();

        let app = harness.app().await;
        let by_height = test::call_service(
            &app,
            test::TestRequest::get().uri("/cosmos/block?height=100").to_request(),
        )
        .await;
        assert_eq!(by_height.status(), 200);
        let height_proof =
            by_height.headers().get(PROOF_HEADER).unwrap().to_str().unwrap().to_string();
        let body: Value = test::read_body_json(by_height).await;
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["result"]["block_id"]["hash"], "0xABC");

        let by_hash = test::call_service(
            &app,
            test::TestRequest::get().uri("/cosmos/block_by_hash?hash=0xABC").to_request(),
        )
        .await;
        assert_eq!(by_hash.status(), 200);
        let hash_proof =
            by_hash.headers().get(PROOF_HEADER).unwrap().to_str().unwrap().to_string();
        let body: Value = test::read_body_json(by_hash).await;
        assert_eq!(body["result"]["block_id"]["hash"], "0xABC");

        // Both routes resolve to the same stored block record.
        assert_eq!(height_proof, hash_proof);
        let decoded = decode_proof_base64(&height_proof).unwrap();
        assert_eq!(decoded.bundle_id, 0);
        assert_eq!(decoded.data_item_value_key, "result");

        let results = test::call_service(
            &app,
            test::TestRequest::get().uri("/cosmos/block_results?height=100").to_request(),
        )
        .await;
        assert_eq!(results.status(), 200);
        let results_proof =
            results.headers().get(PROOF_HEADER).unwrap().to_str().unwrap().to_string();
        assert_ne!(results_proof, height_proof);
    }

    #[actix_web::test]
    async fn test_celestia_namespace_query_joins_compound_key() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("celestia", 3, "celestia", false).await;
        adapter
            .save(&Bundle {
                pool_id: 3,
                bundle_id: 0,
                chain_id: "kaon-1".to_string(),
                data_items: vec![DataItem {
                    key: "500".to_string(),
                    value: json!({
                        "sharesByNamespace": [
                            { "namespace_id": "NS_A", "data": [] },
                            { "namespace_id": "NS_B", "data": [] },
                        ],
                    }),
                }],
            })
            .await
            .unwrap();

        let app = harness.app().await;
        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/celestia/GetSharesByNamespace?height=500&namespace=NS_A")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["result"]["namespace_id"], "NS_A");

        // Dropping one half of the compound key is a bad request.
        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/celestia/GetSharesByNamespace?height=500")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), 400);
    }

    #[actix_web::test]
    async fn test_evm_queries_are_intercepted() {
        let mut harness = Harness::new().await;
        let adapter = harness.add_pool("evm", 9, "evm", false).await;
        adapter
            .save(&Bundle {
                pool_id: 9,
                bundle_id: 2,
                chain_id: "kaon-1".to_string(),
                data_items: vec![DataItem {
                    key: "1000".to_string(),
                    value: json!({
                        "block": {
                            "hash": "0xb1",
                            "transactions": [
                                { "hash": "0xt1" }, { "hash": "0xt2" }, { "hash": "0xt3" },
                            ],
                        },
                        "receipts": [
                            { "transactionHash": "0xt1", "logs": [] },
                            { "transactionHash": "0xt2", "logs": [] },
                            { "transactionHash": "0xt3", "logs": [] },
                        ],
                    }),
                }],
            })
            .await
            .unwrap();

        let app = harness.app().await;
        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/evm/transactionByHash?hash=0xt2").to_request(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let proof = response.headers().get(PROOF_HEADER).unwrap().to_str().unwrap().to_string();
        assert!(decode_proof_base64(&proof).is_ok());
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["result"]["hash"], "0xt2");

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/evm/blockByHash?hash=0xb1").to_request(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["result"]["hash"], "0xb1");

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/evm/blockReceipts?hash=0xb1").to_request(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["result"].as_array().unwrap().len(), 3);

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/evm/transactionByHash?hash=0xdead").to_request(),
        )
        .await;
        assert_eq!(response.status(), 404);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"]["code"], -32603);
    }

    #[actix_web::test]
    async fn test_landing_page_and_openapi_document() {
        let mut harness = Harness::new().await;
        harness.add_pool("height", 105, "linea", false).await;

        let app = harness.app().await;
        let response =
            test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(response.status(), 200);

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/openapi.yml").to_request())
                .await;
        assert_eq!(response.status(), 200);
        let body = String::from_utf8(test::read_body(response).await.to_vec()).unwrap();
        assert!(body.contains("/linea/value"));
        assert!(body.contains("x-kyve-proof"));
    }
}
