//! API Integration Tests
//!
//! Service endpoints driven through the router against in-memory stores.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use guarda_freios::history::{HistoryKey, HistoryStore, MemoryHistoryStore};
use guarda_freios::service_record::MemoryServiceStore;

mod common;

fn service_body(plate: &str, date: &str) -> Value {
    json!({
        "tripulante_id": "18001",
        "numero_servico": "A1",
        "data": date,
        "local_inicio": "Garagem",
        "local_fim": "Terminal",
        "hora_inicio": "07:30",
        "hora_fim": "15:00",
        "numero_chapa": plate,
        "afetacao": "12E"
    })
}

#[tokio::test]
async fn test_create_service_returns_created_record() {
    let (app, _) = common::memory_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/servicos",
            &service_body("545", "2026-03-14"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Serviço criado com sucesso");
    assert_eq!(json["servico"]["numero_servico"], "A1");
    assert_eq!(json["servico"]["estado"], "Agendado");
    assert_eq!(
        json["servico"]["observacoes"],
        "Serviço: A1 | Chapa: 545 | Afetação: 12E"
    );
}

#[tokio::test]
async fn test_auto_fill_after_five_submissions() {
    let (app, _) = common::memory_app();

    for day in 10..15 {
        let response = app
            .clone()
            .oneshot(common::json_request(
                "POST",
                "/servicos",
                &service_body("545", &format!("2026-03-{day}")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(common::get_request(
            "/servicos/auto-preenchimento?tripulante_id=18001&numero_servico=A1",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["auto_preenchimento"], true);
    assert_eq!(json["dados"]["local_inicio"], "Garagem");
    assert_eq!(json["dados"]["local_fim"], "Terminal");
    assert_eq!(json["dados"]["numero_chapa"], "545");
}

#[tokio::test]
async fn test_no_auto_fill_below_threshold() {
    let (app, _) = common::memory_app();

    for day in 10..14 {
        app.clone()
            .oneshot(common::json_request(
                "POST",
                "/servicos",
                &service_body("545", &format!("2026-03-{day}")),
            ))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(common::get_request(
            "/servicos/auto-preenchimento?tripulante_id=18001&numero_servico=A1",
        ))
        .await
        .unwrap();

    let json = common::body_json(response).await;
    assert_eq!(json["auto_preenchimento"], false);
    assert!(json.get("dados").is_none());
}

#[tokio::test]
async fn test_auto_fill_suggests_latest_values() {
    let (app, history) = common::memory_app();

    for (day, plate) in [(10, "545"), (11, "545"), (12, "545"), (13, "560"), (14, "560")] {
        app.clone()
            .oneshot(common::json_request(
                "POST",
                "/servicos",
                &service_body(plate, &format!("2026-03-{day}")),
            ))
            .await
            .unwrap();
    }

    let stored = history
        .get(&HistoryKey::new("18001", "A1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.repeat_count, 5);
    assert_eq!(stored.edit_count, 1);

    let response = app
        .oneshot(common::get_request(
            "/servicos/auto-preenchimento?tripulante_id=18001&numero_servico=A1",
        ))
        .await
        .unwrap();
    let json = common::body_json(response).await;
    assert_eq!(json["dados"]["numero_chapa"], "560");
}

#[tokio::test]
async fn test_missing_field_is_rejected_without_history_change() {
    let (app, history) = common::memory_app();

    let mut body = service_body("545", "2026-03-14");
    body.as_object_mut().unwrap().remove("numero_chapa");

    let response = app
        .oneshot(common::json_request("POST", "/servicos", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error_code"], "missing_field");
    assert!(json["message"].as_str().unwrap().contains("numero_chapa"));
    assert!(history.is_empty().await);
}

#[tokio::test]
async fn test_auto_fill_requires_both_parameters() {
    let (app, _) = common::memory_app();

    let response = app
        .oneshot(common::get_request(
            "/servicos/auto-preenchimento?tripulante_id=18001",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(
        json["message"],
        "tripulante_id e numero_servico são obrigatórios"
    );
}

#[tokio::test]
async fn test_list_services_filters_by_month() {
    let (app, _) = common::memory_app();

    for date in ["2026-02-27", "2026-03-02", "2026-03-01"] {
        app.clone()
            .oneshot(common::json_request(
                "POST",
                "/servicos",
                &service_body("545", date),
            ))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(common::get_request("/servicos?tripulante_id=18001&mes=3&ano=2026"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    let dates: Vec<&str> = json["servicos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["data"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2026-03-01", "2026-03-02"]);

    // Month alone does not filter
    let response = app
        .oneshot(common::get_request("/servicos?tripulante_id=18001&mes=3"))
        .await
        .unwrap();
    let json = common::body_json(response).await;
    assert_eq!(json["servicos"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_delete_service_only_by_owner() {
    let (app, _) = common::memory_app();

    let response = app
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/servicos",
            &service_body("545", "2026-03-14"),
        ))
        .await
        .unwrap();
    let id = common::body_json(response).await["servico"]["id"]
        .as_i64()
        .unwrap();

    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri(format!("/servicos/{id}?tripulante_id=18003"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri(format!("/servicos/{id}?tripulante_id=18001"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], true);
}

// =========================================================================
// Malformed requests
// =========================================================================

#[tokio::test]
async fn test_wrongly_typed_field_gets_json_error() {
    let (app, history) = common::memory_app();

    let mut body = service_body("545", "2026-03-14");
    body["local_inicio"] = json!(5);

    let response = app
        .oneshot(common::json_request("POST", "/servicos", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error_code"], "invalid_request");
    assert!(!json["message"].as_str().unwrap().is_empty());
    assert!(history.is_empty().await);
}

#[tokio::test]
async fn test_unparseable_body_gets_json_error() {
    let (app, _) = common::memory_app();

    let response = app
        .clone()
        .oneshot(common::raw_json_request("POST", "/servicos", "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error_code"], "invalid_request");

    // Same envelope when the content type is missing altogether
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/servicos")
        .body(axum::body::Body::from(service_body("545", "2026-03-14").to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error_code"], "invalid_request");
}

#[tokio::test]
async fn test_malformed_query_gets_json_error() {
    let (app, _) = common::memory_app();

    let response = app
        .oneshot(common::get_request("/servicos?tripulante_id=18001&mes=abc&ano=2026"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error_code"], "invalid_request");
}

// =========================================================================
// Registration roles
// =========================================================================

fn registration(cargo: &str) -> Value {
    json!({
        "numero": 18090,
        "nome": "Rita Lopes",
        "email": "rita.lopes@example.pt",
        "cargo": cargo,
        "password": "eletrico28"
    })
}

#[tokio::test]
async fn test_public_registration_cannot_grant_elevated_roles() {
    let (app, _) = common::memory_app();

    for cargo in ["Gestor", "Tripulante+"] {
        let response = app
            .clone()
            .oneshot(common::json_request(
                "POST",
                "/auth/register",
                &registration(cargo),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "cargo {cargo}");
        let json = common::body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error_code"], "forbidden");
    }
}

#[tokio::test]
async fn test_registration_rejects_unknown_role() {
    let (app, _) = common::memory_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/auth/register",
            &registration("Administrador"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["error_code"], "invalid_field");
}

// =========================================================================
// Store failures
// =========================================================================

async fn assert_opaque_server_error(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = common::body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Erro no servidor");
    assert_eq!(json["error_code"], "database_error");

    let text = json.to_string();
    assert!(!text.contains(common::STORE_FAILURE_DETAIL));
    assert!(!text.contains("historico_servicos"));
    assert!(!text.contains("pid 4242"));
}

#[tokio::test]
async fn test_create_service_hides_service_store_failure() {
    let app = common::app_with_stores(
        Arc::new(common::FailingServiceStore),
        Arc::new(MemoryHistoryStore::new()),
    );

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/servicos",
            &service_body("545", "2026-03-14"),
        ))
        .await
        .unwrap();

    assert_opaque_server_error(response).await;
}

#[tokio::test]
async fn test_create_service_hides_history_store_failure() {
    let app = common::app_with_stores(
        Arc::new(MemoryServiceStore::new()),
        Arc::new(common::FailingHistoryStore),
    );

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/servicos",
            &service_body("545", "2026-03-14"),
        ))
        .await
        .unwrap();

    assert_opaque_server_error(response).await;
}

#[tokio::test]
async fn test_auto_fill_hides_history_store_failure() {
    let app = common::app_with_stores(
        Arc::new(MemoryServiceStore::new()),
        Arc::new(common::FailingHistoryStore),
    );

    let response = app
        .oneshot(common::get_request(
            "/servicos/auto-preenchimento?tripulante_id=18001&numero_servico=A1",
        ))
        .await
        .unwrap();

    assert_opaque_server_error(response).await;
}

#[tokio::test]
async fn test_list_services_hides_service_store_failure() {
    let app = common::app_with_stores(
        Arc::new(common::FailingServiceStore),
        Arc::new(MemoryHistoryStore::new()),
    );

    let response = app
        .oneshot(common::get_request("/servicos?tripulante_id=18001"))
        .await
        .unwrap();

    assert_opaque_server_error(response).await;
}
