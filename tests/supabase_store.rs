//! `SupabaseStore` against a stubbed PostgREST endpoint.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zap_scout::models::JobStatus;
use zap_scout::store::{
    AdvertiserUpsert, ListingStore, ReferenceSource, RunLedger, StoreError, SupabaseStore,
};

fn test_store(server: &MockServer) -> SupabaseStore {
    SupabaseStore::new(&server.uri(), "service-key", Duration::from_secs(5))
        .expect("failed to build test SupabaseStore")
}

#[tokio::test]
async fn active_properties_sends_filters_and_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/dna_properties"))
        .and(query_param("active", "eq.true"))
        .and(query_param("order", "id.asc"))
        .and(query_param("limit", "2"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "dna_id": "DNA-1", "type": "apartamento", "price": 500000, "active": true},
            {"id": 2, "dna_id": "DNA-2", "type": "casa", "area_m2": 120.5, "active": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let properties = test_store(&server).active_properties(2).await.unwrap();
    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0].price, Some(500_000.0));
    assert_eq!(properties[1].property_type, "casa");
    assert_eq!(properties[1].area_m2, Some(120.5));
}

#[tokio::test]
async fn unknown_dna_id_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/dna_properties"))
        .and(query_param("dna_id", "eq.DNA-404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let found = test_store(&server)
        .property_by_dna_id("DNA-404")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn advertiser_upsert_merges_on_normalized_name() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/advertisers"))
        .and(query_param("on_conflict", "normalized_name"))
        .and(header_regex("prefer", "resolution=merge-duplicates"))
        .and(body_partial_json(json!({
            "name": "Imobiliária Sol",
            "normalized_name": "IMOBILIARIA SOL",
            "is_dna": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": 42}])))
        .expect(1)
        .mount(&server)
        .await;

    let id = test_store(&server)
        .upsert_advertiser(&AdvertiserUpsert::for_seller("Imobiliária Sol", None))
        .await
        .unwrap();
    assert_eq!(id, 42);
}

#[tokio::test]
async fn error_status_carries_table_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/zap_listing_prices"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&server)
        .await;

    let err = test_store(&server)
        .insert_price(7, 520_000.0)
        .await
        .unwrap_err();
    match err {
        StoreError::UnexpectedStatus {
            status,
            table,
            body,
        } => {
            assert_eq!(status, 409);
            assert_eq!(table, "zap_listing_prices");
            assert_eq!(body, "duplicate key");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_representation_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/scrape_runs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = test_store(&server).start_run(3).await.unwrap_err();
    assert!(matches!(err, StoreError::EmptyResponse { .. }));
}

#[tokio::test]
async fn job_bookkeeping_patches_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/property_scrape_jobs"))
        .and(query_param("id", "eq.9"))
        .and(body_partial_json(json!({
            "status": "error",
            "error_message": "navigation timed out"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/dna_properties"))
        .and(query_param("id", "eq.5"))
        .and(body_partial_json(json!({"last_scrape_status": "success"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = test_store(&server);
    store
        .finish_job(9, JobStatus::Error, Some("navigation timed out"))
        .await
        .unwrap();
    store.mark_property(5, JobStatus::Success).await.unwrap();
}
