use actix_web::{test, App};
use todo_server::handlers;

#[actix_web::test]
async fn test_health_check() {
    let app = test::init_service(App::new().service(handlers::health_check)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_web::test]
async fn test_health_check_needs_no_token() {
    let app = test::init_service(App::new().configure(handlers::configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
}
