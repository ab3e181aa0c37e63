use actix_web::{test, web, App};
use chrono::Utc;
use qc_common::{Money, Secret};
use quickcart_engine::{
    db_types::{NewLineItem, Order, OrderId, OrderStatusType, StatusRecord},
    order_objects::{NewOrderRequest, PaymentInitResult},
    traits::{GatewayError, ProviderStatus},
    OrderFlowApi,
};
use rust_decimal_macros::dec;

use crate::{
    auth::JwtService,
    config::AuthConfig,
    data_objects::JsonResponse,
    endpoint_tests::mocks::{MockDb, MockGateway},
    routes::{health, NewOrderRoute, OrderByIdRoute, ACCESS_TOKEN_HEADER},
    stripe_routes::StripeWebhookRoute,
};

fn jwt_service() -> JwtService {
    JwtService::new(&AuthConfig { jwt_secret: Secret::new("endpoint-test-secret".to_string()), token_expiry_secs: 3600 })
}

fn sample_order(auth_id: &str, status: OrderStatusType) -> Order {
    let now = Utc::now();
    Order {
        id: 1,
        order_id: OrderId("ORD-1724300000000-0000BEEF".into()),
        customer_id: "cus_1".into(),
        remark: String::new(),
        total_amount: Money::from(13),
        currency: "usd".into(),
        payment_auth_id: auth_id.into(),
        status,
        created_at: now,
        updated_at: now,
    }
}

fn order_request() -> NewOrderRequest {
    NewOrderRequest {
        items: vec![
            NewLineItem {
                product_id: "prod-1".into(),
                qty: 2,
                unit_price: Money::from(dec!(10.00)),
                discount: Money::from(dec!(2.00)),
            },
            NewLineItem {
                product_id: "prod-2".into(),
                qty: 1,
                unit_price: Money::from(dec!(5.00)),
                discount: Money::default(),
            },
        ],
        total_amount: None,
        currency: None,
        payment_method_id: Some("pm_card".into()),
        receipt_email: None,
        auto_confirm: false,
    }
}

#[actix_web::test]
async fn health_check() {
    let app = test::init_service(App::new().service(health)).await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn placing_an_order_requires_a_token() {
    let api = OrderFlowApi::new(MockDb::new(), MockGateway::new());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(jwt_service()))
            .service(NewOrderRoute::<MockDb, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::post().uri("/orders").set_json(order_request()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 401);
}

#[actix_web::test]
async fn placing_an_order_returns_payment_details() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    db.expect_find_status_by_name()
        .returning(|_| Ok(Some(StatusRecord { id: 1, name: OrderStatusType::Pending })));
    gateway.expect_create_authorization().withf(|charge| charge.amount == Money::from(13)).return_once(|charge| {
        Ok(quickcart_engine::traits::PaymentAuthorization {
            id: "pi_1".into(),
            client_secret: Some("pi_1_secret".into()),
            status: ProviderStatus::RequiresPaymentMethod,
            amount_minor: 1300,
            currency: charge.currency,
            payment_method_id: charge.payment_method_id,
        })
    });
    db.expect_insert_order().return_once(|order, _| {
        let mut stored = sample_order("pi_1", OrderStatusType::Pending);
        stored.order_id = order.order_id;
        stored.total_amount = order.total_amount;
        Ok(stored)
    });
    let api = OrderFlowApi::new(db, gateway);
    let jwt = jwt_service();
    let token = jwt.issue_token("cus_1").unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(jwt))
            .service(NewOrderRoute::<MockDb, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/orders")
        .insert_header((ACCESS_TOKEN_HEADER, token))
        .set_json(order_request())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 201);
    let body: PaymentInitResult = test::read_body_json(res).await;
    assert_eq!(body.authorization_id, "pi_1");
    assert_eq!(body.amount_minor, 1300);
    assert_eq!(body.client_secret.as_deref(), Some("pi_1_secret"));
}

#[actix_web::test]
async fn fetching_an_unknown_order_is_404() {
    let mut db = MockDb::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(None));
    let api = OrderFlowApi::new(db, MockGateway::new());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(OrderByIdRoute::<MockDb, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::get().uri("/orders/ORD-123").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 404);
}

#[actix_web::test]
async fn webhook_with_a_bad_signature_is_rejected() {
    let db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| Err(GatewayError::SignatureInvalid));
    let api = OrderFlowApi::new(db, gateway);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(StripeWebhookRoute::<MockDb, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/stripe")
        .insert_header(("Stripe-Signature", "t=0,v1=00"))
        .set_payload("{}")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 400);
    let body: JsonResponse = test::read_body_json(res).await;
    assert!(!body.success);
}

#[actix_web::test]
async fn webhook_without_a_signature_header_is_rejected() {
    let api = OrderFlowApi::new(MockDb::new(), MockGateway::new());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(StripeWebhookRoute::<MockDb, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::post().uri("/stripe").set_payload("{}").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 400);
}

#[actix_web::test]
async fn webhook_for_an_unrecognised_event_is_acknowledged() {
    let db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| {
        Ok(quickcart_engine::traits::PaymentEvent {
            event_type: quickcart_engine::traits::PaymentEventType::Other("payment_intent.created".into()),
            authorization_id: "pi_1".into(),
            reason: None,
        })
    });
    let api = OrderFlowApi::new(db, gateway);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(StripeWebhookRoute::<MockDb, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/stripe")
        .insert_header(("Stripe-Signature", "t=0,v1=00"))
        .set_payload("{}")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);
    let body: JsonResponse = test::read_body_json(res).await;
    assert!(body.success);
}
