use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Router};
use serde_json::json;

use catalog_ingestion::clients::{AssetFetcher, HttpAssetFetcher};
use catalog_ingestion::models::*;
use catalog_ingestion::processing::{AssetPipeline, MemoryAssetStore};
use catalog_ingestion::schema::build_schema;
use catalog_ingestion::storage::{InMemoryCatalogStore, TaxonomySeed};
use catalog_ingestion::sync::{IngestionPipeline, PipelineSettings};

fn png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

async fn image_server() -> String {
    let body = png();
    let app = Router::new()
        .route("/ok.png", get(move || {
            let body = body.clone();
            async move { ([(axum::http::header::CONTENT_TYPE, "image/png")], body) }
        }))
        .route("/missing.png", get(|| async { (StatusCode::NOT_FOUND, "gone") }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

struct Harness {
    catalog: Arc<InMemoryCatalogStore>,
    objects: Arc<MemoryAssetStore>,
    pipeline: Arc<IngestionPipeline>,
}

fn harness() -> Harness {
    let catalog = Arc::new(
        InMemoryCatalogStore::with_taxonomy(
            &TaxonomySeed { id: Some("cat-1".into()), label: "清洁能源技术".into() },
            &TaxonomySeed { id: Some("sub-1".into()), label: "风能技术".into() },
        )
        .unwrap(),
    );
    let objects = Arc::new(MemoryAssetStore::new("https://assets.test"));
    let fetcher = Arc::new(HttpAssetFetcher::new(5_000, "catalog-ingestion-test").unwrap());
    let settings = PipelineSettings { item_delay: Duration::ZERO, ..PipelineSettings::default() };
    let pipeline = IngestionPipeline::new(
        catalog.clone(),
        AssetPipeline::new(fetcher, objects.clone(), 1024 * 1024),
        settings,
    );
    Harness { catalog, objects, pipeline: Arc::new(pipeline) }
}

fn record(id: &str, image_url: Option<String>) -> RawTechnologyRecord {
    serde_json::from_value(json!({
        "id": id,
        "technologyNameEN": format!("Technology {}", id),
        "companyName": "Acme Green Energy Co., Ltd.",
        "technologyImageUrl": image_url,
        "description": "Floating offshore wind foundation.",
        "benefits": "Greenhouse gases",
        "developedInCountry": "Japan",
        "deployedInCountry": ["Japan", "China"],
        "customLabels": ["海上风电", "基础结构", "抗震"],
    }))
    .unwrap()
}

#[tokio::test]
async fn test_partial_image_failure_still_creates_every_item() {
    let base = image_server().await;
    let h = harness();
    let items: Vec<RawTechnologyRecord> = (1..=5)
        .map(|n| {
            let path = if n == 3 { "missing.png" } else { "ok.png" };
            record(&format!("t{}", n), Some(format!("{}/{}", base, path)))
        })
        .collect();

    let report = h.pipeline.run(&items, &BatchConfig::default()).await;
    assert_eq!(report.summary, BatchSummary { total: 5, successful: 5, failed: 0 });
    assert_eq!(report.results.len(), 5);
    assert!(report.results.iter().all(|r| r.created == Some(true)));

    let rows = h.catalog.technologies();
    assert_eq!(rows.len(), 5);
    let third = rows.iter().find(|r| r.external_id == "t3").unwrap();
    assert!(third.image_url.is_none());
    let first = rows.iter().find(|r| r.external_id == "t1").unwrap();
    assert_eq!(first.image_url.as_deref(), Some("https://assets.test/technologies/t1.png"));
    assert_eq!(first.category_id.as_deref(), Some("cat-1"));
    assert_eq!(first.subcategory_id.as_deref(), Some("sub-1"));
    assert_eq!(first.custom_label, "海上风电|基础结构");
    assert_eq!(first.review_status, ReviewStatus::Published);
    assert!(first.company_logo_url.as_deref().unwrap().starts_with("https://assets.test/company-logos/generated-"));
    assert!(first.description_en.ends_with("ID: t1"));

    // one country row for all five items
    let countries = h.catalog.countries();
    assert_eq!(countries.len(), 1);
    assert_eq!(first.company_country_id.as_deref(), Some(countries[0].id.as_str()));
    // one shared generated logo and four re-hosted images
    assert_eq!(h.objects.keys().len(), 5);
}

#[tokio::test]
async fn test_item_errors_are_isolated() {
    let h = harness();
    let mut bad = record("", None);
    bad.id = None;
    let items = vec![record("a", None), bad, record("b", None)];

    let report = h.pipeline.run(&items, &BatchConfig::default()).await;
    assert_eq!(report.summary, BatchSummary { total: 3, successful: 2, failed: 1 });
    assert_eq!(report.errors.len(), 1);
    assert!(report.results[1].error.is_some());
    assert_eq!(h.catalog.technologies().len(), 2);
}

#[tokio::test]
async fn test_overwrite_twice_is_idempotent_and_keeps_image() {
    let base = image_server().await;
    let h = harness();

    let first = vec![record("42", Some(format!("{}/ok.png", base)))];
    let report = h.pipeline.run(&first, &BatchConfig::default()).await;
    assert_eq!(report.results[0].created, Some(true));
    let store_id = report.results[0].store_id.clone().unwrap();
    let before = h.catalog.technologies().remove(0);

    let mut second = record("42", None);
    second.technology_name_en = Some("Renamed".into());
    second.description = Some("Retrofitted onshore blades.".into());
    second.company_name = Some("Beta Wind Ltd.".into());
    second.company_website_url = Some("https://beta.example".into());
    second.developed_in_country = Some("China".into());
    second.custom_labels = vec!["陆上风电".into(), "叶片".into()];
    let report = h.pipeline.run(&[second], &BatchConfig::default()).await;
    assert_eq!(report.results[0].updated, Some(true));
    assert_eq!(report.results[0].store_id.as_deref(), Some(store_id.as_str()));

    let rows = h.catalog.technologies();
    assert_eq!(rows.len(), 1);
    let after = &rows[0];
    assert_eq!(after.name_en, "Renamed");
    assert!(after.description_en.starts_with("Description: Retrofitted onshore blades."));
    assert!(after.description_zh.starts_with("技术描述：Retrofitted onshore blades."));
    assert_eq!(after.description_en.matches("ID: 42").count(), 1);
    assert_eq!(after.website_url.as_deref(), Some("https://beta.example"));
    assert_eq!(after.custom_label, "陆上风电|叶片");
    assert_eq!(after.company_name_en, "Beta Wind Ltd.");
    assert_eq!(after.company_name_zh, "Beta Wind Ltd.");
    assert_ne!(after.company_logo_url, before.company_logo_url);
    assert_ne!(after.company_country_id, before.company_country_id);
    let country = h
        .catalog
        .countries()
        .into_iter()
        .find(|c| Some(&c.id) == after.company_country_id.as_ref())
        .unwrap();
    assert_eq!(country.code, "cn");
    // insert-only fields and the re-hosted image survive
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.review_status, before.review_status);
    assert_eq!(after.image_url.as_deref(), Some("https://assets.test/technologies/42.png"));
}

#[tokio::test]
async fn test_default_image_never_replaces_rehosted_image() {
    let base = image_server().await;
    let h = harness();
    h.catalog
        .add_subcategory(Subcategory {
            id: "sub-2".into(),
            category_id: "cat-1".into(),
            name_zh: "太阳能技术".into(),
            name_en: "Solar".into(),
            slug: "solar".into(),
            default_tech_image_url: Some("https://cdn.test/default.png".into()),
            is_active: true,
        })
        .unwrap();
    let batch = BatchConfig { subcategory_id: Some("sub-2".into()), ..Default::default() };

    let report = h.pipeline.run(&[record("9", Some(format!("{}/ok.png", base)))], &batch).await;
    assert_eq!(report.results[0].created, Some(true));

    let rerun = vec![
        record("9", Some(format!("{}/missing.png", base))),
        record("10", Some(format!("{}/missing.png", base))),
    ];
    let report = h.pipeline.run(&rerun, &batch).await;
    assert_eq!(report.results[0].updated, Some(true));
    assert_eq!(report.results[1].created, Some(true));

    let rows = h.catalog.technologies();
    let kept = rows.iter().find(|r| r.external_id == "9").unwrap();
    assert_eq!(kept.image_url.as_deref(), Some("https://assets.test/technologies/9.png"));
    let fresh = rows.iter().find(|r| r.external_id == "10").unwrap();
    assert_eq!(fresh.image_url.as_deref(), Some("https://cdn.test/default.png"));
}

#[tokio::test]
async fn test_skip_policy_and_per_item_decisions() {
    let h = harness();
    h.pipeline.run(&[record("s1", None), record("s2", None)], &BatchConfig::default()).await;
    let before = h.catalog.technologies();

    let mut renamed1 = record("s1", None);
    renamed1.technology_name_en = Some("Changed 1".into());
    let mut renamed2 = record("s2", None);
    renamed2.technology_name_en = Some("Changed 2".into());

    let mut batch = BatchConfig { on_duplicate: Some(DuplicatePolicy::Skip), ..Default::default() };
    batch.decisions.insert("s2".into(), DuplicatePolicy::Overwrite);
    let report = h.pipeline.run(&[renamed1, renamed2], &batch).await;

    assert_eq!(report.results[0].skipped, Some(true));
    assert_eq!(report.results[1].updated, Some(true));
    let rows = h.catalog.technologies();
    let s1 = rows.iter().find(|r| r.external_id == "s1").unwrap();
    let s1_before = before.iter().find(|r| r.external_id == "s1").unwrap();
    assert_eq!(s1, s1_before);
    assert_eq!(rows.iter().find(|r| r.external_id == "s2").unwrap().name_en, "Changed 2");
}

#[tokio::test]
async fn test_invalid_taxonomy_aborts_batch() {
    let h = harness();
    let batch = BatchConfig { category: Some("不存在的分类".into()), ..Default::default() };
    let report = h.pipeline.run(&[record("x1", None), record("x2", None)], &batch).await;

    assert!(report.results.is_empty());
    assert!(report.errors.is_empty());
    assert_eq!(report.summary.total, 2);
    assert!(report.setup_error.unwrap().contains("not found"));
    assert!(h.catalog.technologies().is_empty());
}

#[tokio::test]
async fn test_long_name_is_stored_truncated() {
    let h = harness();
    let mut item = record("long", None);
    item.technology_name_en = Some("n".repeat(10_000));
    let report = h.pipeline.run(&[item], &BatchConfig::default()).await;
    assert_eq!(report.summary.successful, 1);
    let rows = h.catalog.technologies();
    assert_eq!(rows[0].name_en, "n".repeat(200));
}

/// Serves a PNG for every URL and remembers what was asked for.
#[derive(Default)]
struct RecordingFetcher {
    requested: Mutex<Vec<String>>,
}

#[async_trait]
impl AssetFetcher for RecordingFetcher {
    async fn fetch_bytes(&self, url: &str) -> catalog_ingestion::models::Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(png())
    }
}

#[tokio::test]
async fn test_builtin_correction_is_applied() {
    let h = harness();
    let fetcher = Arc::new(RecordingFetcher::default());
    let pipeline = IngestionPipeline::new(
        h.catalog.clone(),
        AssetPipeline::new(fetcher.clone(), h.objects.clone(), 1024 * 1024),
        PipelineSettings { item_delay: Duration::ZERO, ..PipelineSettings::default() },
    );

    let mut item = record("171988", None);
    item.company_name = Some("J-Power".into());
    item.developed_in_country = None;
    pipeline.run(&[item], &BatchConfig::default()).await;

    let rows = h.catalog.technologies();
    assert_eq!(rows[0].company_name_en, "Electric Power Development Co., Ltd. (J-POWER)");
    assert_eq!(rows[0].name_zh, "地震防护海上风电柔性三桩基础");
    assert_eq!(rows[0].image_url.as_deref(), Some("https://assets.test/technologies/171988.png"));
    assert_eq!(
        *fetcher.requested.lock().unwrap(),
        vec!["https://thumbnails.wipogreen.wipo.int/171988".to_string()]
    );
    let country = h.catalog.countries().into_iter().find(|c| Some(&c.id) == rows[0].company_country_id.as_ref()).unwrap();
    assert_eq!(country.code, "jp");
}

#[tokio::test]
async fn test_check_existing_rejects_blank_id() {
    let h = harness();
    h.pipeline.run(&[record("b1", None)], &BatchConfig::default()).await;

    for blank in ["", "   "] {
        let err = h.pipeline.check_existing(blank).await.unwrap_err();
        assert!(matches!(err, IngestionError::Validation(_)), "{:?}", err);
    }
    assert!(h.pipeline.check_existing(" b1 ").await.unwrap().is_some());

    let schema = build_schema(h.pipeline.clone());
    let res = schema.execute(r#"{ checkExisting(externalId: " ") }"#).await;
    assert_eq!(res.errors.len(), 1);
    assert!(res.errors[0].message.contains("blank"));
}

#[tokio::test]
async fn test_graphql_batch_import_and_check_existing() {
    let h = harness();
    let schema = build_schema(h.pipeline.clone());

    let mutation = async_graphql::Request::new(
        "mutation Import($input: JSON!) { batchImport(input: $input) }",
    )
    .variables(async_graphql::Variables::from_json(json!({
        "input": {
            "items": [{ "id": "g1", "technologyNameEN": "GraphQL tech", "companyName": "Acme" }],
            "config": { "category": "Clean", "onDuplicate": "skip" }
        }
    })));
    // "Clean" is not a known category label
    let res = schema.execute(mutation).await;
    assert!(res.errors.is_empty(), "{:?}", res.errors);
    let data = res.data.into_json().unwrap();
    assert!(data["batchImport"]["setupError"].is_string());

    let mutation = async_graphql::Request::new(
        "mutation Import($input: JSON!) { batchImport(input: $input) }",
    )
    .variables(async_graphql::Variables::from_json(json!({
        "input": [{ "id": "g1", "technologyNameEN": "GraphQL tech", "companyName": "Acme" }]
    })));
    let res = schema.execute(mutation).await;
    assert!(res.errors.is_empty(), "{:?}", res.errors);
    let data = res.data.into_json().unwrap();
    assert_eq!(data["batchImport"]["summary"], json!({"total": 1, "successful": 1, "failed": 0}));
    assert_eq!(data["batchImport"]["results"][0]["created"], json!(true));

    let res = schema
        .execute(r#"{ health checkExisting(externalId: "g1") }"#)
        .await;
    assert!(res.errors.is_empty(), "{:?}", res.errors);
    let data = res.data.into_json().unwrap();
    assert_eq!(data["health"], json!("OK"));
    assert_eq!(data["checkExisting"]["nameEn"], json!("GraphQL tech"));

    let res = schema.execute(r#"{ checkExisting(externalId: "nope") }"#).await;
    assert_eq!(res.data.into_json().unwrap()["checkExisting"], json!(null));
}
