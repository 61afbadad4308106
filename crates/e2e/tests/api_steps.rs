//! Product API steps against a local stub of the Toolshop API

mod support;

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use support::{test_config, FakeLauncher};
use toolshop_e2e::browser::BrowserLauncher;
use toolshop_e2e::config::TestConfig;
use toolshop_e2e::runner::{RunnerConfig, ScenarioRunner, StepStatus};
use toolshop_e2e::{FeatureSpec, StepRegistry, SuiteResult};

fn catalogue() -> Vec<Value> {
    [
        ("01THORHAMMER", "Thor Hammer", 11.14),
        ("01COMBPLIERS", "Combination Pliers", 14.15),
        ("01BOLTCUTTER", "Bolt Cutters", 48.41),
    ]
    .iter()
    .map(|(id, name, price)| {
        json!({
            "id": id,
            "name": name,
            "description": "",
            "price": price,
            "in_stock": true,
            "is_rental": false,
            "co2_rating": "B"
        })
    })
    .collect()
}

fn page(data: Vec<Value>, current_page: u32) -> Value {
    json!({
        "current_page": current_page,
        "data": data,
        "last_page": 2,
        "per_page": 9,
        "total": 3
    })
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

fn decode(value: &str) -> String {
    value.replace('+', " ").replace("%20", " ").replace("%2C", ",")
}

fn route(target: &str) -> (u16, Value) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let products = catalogue();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["products"] => {
            let mut data = products;
            if decode(query_param(query, "sort").unwrap_or_default()) == "name,asc" {
                data.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
            }
            let current = query_param(query, "page")
                .and_then(|p| p.parse().ok())
                .unwrap_or(1);
            (200, page(data, current))
        }
        ["products", "search"] => {
            let term = decode(query_param(query, "q").unwrap_or_default()).to_lowercase();
            let hits = products
                .into_iter()
                .filter(|p| p["name"].as_str().unwrap_or_default().to_lowercase().contains(&term))
                .collect();
            (200, page(hits, 1))
        }
        ["products", id, "related"] if products.iter().any(|p| p["id"] == *id) => {
            let related = products.into_iter().filter(|p| p["id"] != *id).collect();
            (200, Value::Array(related))
        }
        ["products", id] => match products.into_iter().find(|p| p["id"] == *id) {
            Some(product) => (200, product),
            None => (404, json!({ "message": "Requested item not found" })),
        },
        _ => (404, json!({ "message": "Not found" })),
    }
}

/// Minimal HTTP/1.1 server answering one request per connection
struct StubApi {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubApi {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&seen)));
            }
        });

        Self { addr, requests }
    }

    fn config(&self) -> Arc<TestConfig> {
        Arc::new(TestConfig {
            api_base_url: format!("http://{}", self.addr),
            ..(*test_config()).clone()
        })
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

async fn serve(mut stream: TcpStream, seen: Arc<Mutex<Vec<String>>>) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    let mut request_line = head.split_whitespace();
    let method = request_line.next().unwrap_or("GET").to_string();
    let target = request_line.next().unwrap_or("/").to_string();
    seen.lock().push(format!("{} {}", method, target));

    let (status, body) = route(&target);
    let body = body.to_string();
    let reason = if status == 200 { "OK" } else { "Not Found" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn run(api: &StubApi, yaml: &str) -> SuiteResult {
    let launcher: Arc<dyn BrowserLauncher> = FakeLauncher::new();
    let steps = Arc::new(StepRegistry::toolshop().unwrap());
    let runner = ScenarioRunner::new(api.config(), launcher, steps, RunnerConfig::default());
    let feature = FeatureSpec::from_yaml(yaml).unwrap();
    runner.run_cases(&feature.cases()).await
}

fn statuses(suite: &SuiteResult, scenario: usize) -> Vec<StepStatus> {
    suite.results[scenario].steps.iter().map(|s| s.status).collect()
}

#[tokio::test]
async fn test_listing_and_paging() {
    let api = StubApi::start().await;

    let suite = run(
        &api,
        r#"
feature: Products API
scenarios:
  - name: list all products
    steps:
      - Given Product API is available
      - When Request all products
      - Then API response status is 200
      - And Response contains paginated products
      - And Response has valid product structure
      - And Current page is "1"
  - name: second page
    steps:
      - When Request products with page "2"
      - Then API response status is 200
      - And Current page is "2"
"#,
    )
    .await;

    assert!(suite.success(), "{:?}", suite.results.iter().map(|r| &r.error).collect::<Vec<_>>());
    assert!(api.requests().contains(&"GET /products?page=2".to_string()));
}

#[tokio::test]
async fn test_failed_call_leaves_no_stale_response() {
    let api = StubApi::start().await;

    let suite = run(
        &api,
        r#"
feature: Products API
scenarios:
  - name: unknown product after a listing
    steps:
      - When Request all products
      - And Request product details for invalid ID "nope"
      - Then API response status is 404
      - And Response contains paginated products
      - And Response has valid product structure
  - name: failed call is remembered
    steps:
      - When Request product details for invalid ID "nope"
      - Then API response status is 404
      - And All API calls returned status 200
"#,
    )
    .await;

    assert_eq!(suite.passed, 0);
    assert_eq!(
        statuses(&suite, 0),
        vec![
            StepStatus::Passed,
            StepStatus::Passed,
            StepStatus::Passed,
            StepStatus::Failed,
            StepStatus::Skipped,
        ]
    );
    assert!(suite.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Scenario state slot 'lastResponse' is not set"));

    assert_eq!(
        statuses(&suite, 1),
        vec![StepStatus::Passed, StepStatus::Passed, StepStatus::Failed]
    );
    let error = suite.results[1].error.as_deref().unwrap();
    assert!(error.contains("An API call failed"), "{}", error);
    assert!(error.contains("404"), "{}", error);
    assert!(api.requests().contains(&"GET /products/nope".to_string()));
}

#[tokio::test]
async fn test_unexpected_status_fails_the_request_step() {
    let api = StubApi::start().await;

    let suite = run(
        &api,
        r#"
feature: Products API
scenarios:
  - name: related products of a missing product
    steps:
      - Given Store first product from list
      - When Request related products for non-existent product ID
      - Then API response status is 200
"#,
    )
    .await;

    assert!(!suite.results[0].success);
    assert_eq!(
        statuses(&suite, 0),
        vec![StepStatus::Passed, StepStatus::Passed, StepStatus::Failed]
    );
    assert!(suite.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Expected status 200, got 404"));
}

#[tokio::test]
async fn test_stored_product_threads_through_steps() {
    let api = StubApi::start().await;

    let suite = run(
        &api,
        r#"
feature: Products API
scenarios:
  - name: details and search for a stored product
    steps:
      - Given Store first product from list
      - When Request product details by stored product ID
      - Then API response status is 200
      - And Response has complete product details
      - And Response product matches stored product
      - When Search products for first product name
      - Then Response contains matching products in search results
      - And All results match search term "Thor Hammer"
      - And All API calls returned status 200
  - name: related products feed the stored product
    steps:
      - Given Store first product from list
      - When Request related products for stored product ID
      - Then Response contains array of related products
      - And Related products have valid structure
      - When Store first product from response
      - And Request product details by stored product ID
      - Then Response product matches stored product
"#,
    )
    .await;

    assert!(suite.success(), "{:?}", suite.results.iter().map(|r| &r.error).collect::<Vec<_>>());
    let requests = api.requests();
    assert!(requests.contains(&"GET /products/01THORHAMMER".to_string()));
    assert!(requests.contains(&"GET /products/01THORHAMMER/related".to_string()));
    // The first related product is fetched by the id taken from the related list.
    assert!(requests.contains(&"GET /products/01COMBPLIERS".to_string()));
}

#[tokio::test]
async fn test_sort_assertion_checks_order() {
    let api = StubApi::start().await;

    let suite = run(
        &api,
        r#"
feature: Products API
scenarios:
  - name: sorted by name
    steps:
      - When Request products sorted by "name,asc"
      - Then Products are sorted by name in ascending order
  - name: unsorted listing
    steps:
      - When Request all products
      - Then Products are sorted by name in ascending order
"#,
    )
    .await;

    assert!(suite.results[0].success, "{:?}", suite.results[0].error);
    assert!(!suite.results[1].success);
    assert!(suite.results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("Names are not in ascending order"));
}
