use chrono::Utc;
use mockall::{mock, predicate::eq};
use qc_common::Money;
use rust_decimal_macros::dec;

use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderLineItem, OrderStatusType, StatusRecord},
    order_flow::{OrderFlowApi, OrderFlowError, WebhookOutcome},
    order_objects::NewOrderRequest,
    traits::{
        AuthError,
        GatewayError,
        IdentityResolver,
        NewCharge,
        OrderDatabaseError,
        OrderManagement,
        PaymentAuthorization,
        PaymentEvent,
        PaymentEventType,
        PaymentGateway,
        ProviderStatus,
        StatusManagement,
        StatusTransition,
    },
};

mock! {
    pub Db {}
    impl OrderManagement for Db {
        async fn insert_order(&self, order: NewOrder, items: Vec<NewLineItem>) -> Result<Order, OrderDatabaseError>;
        async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderDatabaseError>;
        async fn fetch_order_by_auth_id(&self, auth_id: &str) -> Result<Option<Order>, OrderDatabaseError>;
        async fn fetch_line_items_for_order(&self, order_id: &OrderId) -> Result<Vec<OrderLineItem>, OrderDatabaseError>;
        async fn transition_status(
            &self,
            order_id: &OrderId,
            new_status: OrderStatusType,
            remark: Option<String>,
        ) -> Result<Order, OrderDatabaseError>;
        async fn transition_status_checked(
            &self,
            order_id: &OrderId,
            new_status: OrderStatusType,
            remark: Option<String>,
            accept_from: fn(OrderStatusType) -> bool,
        ) -> Result<StatusTransition, OrderDatabaseError>;
        async fn append_remark(&self, order_id: &OrderId, remark: &str) -> Result<Order, OrderDatabaseError>;
        async fn refresh_order(&self, order_id: &OrderId, new_total: Money) -> Result<Order, OrderDatabaseError>;
        async fn delete_order(&self, order_id: &OrderId) -> Result<(), OrderDatabaseError>;
        async fn search_orders(
            &self,
            query: crate::order_objects::OrderQueryFilter,
            pagination: crate::order_objects::Pagination,
        ) -> Result<Vec<Order>, OrderDatabaseError>;
        async fn search_count(&self, query: crate::order_objects::OrderQueryFilter) -> Result<i64, OrderDatabaseError>;
    }
    impl StatusManagement for Db {
        async fn seed_statuses_if_empty(&self, names: &[OrderStatusType]) -> Result<u64, OrderDatabaseError>;
        async fn find_status_by_name(&self, name: &str) -> Result<Option<StatusRecord>, OrderDatabaseError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_authorization(&self, charge: NewCharge) -> Result<PaymentAuthorization, GatewayError>;
        async fn confirm(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError>;
        async fn cancel(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError>;
        async fn get_status(&self, authorization_id: &str) -> Result<PaymentAuthorization, GatewayError>;
        async fn verify_and_parse_event(
            &self,
            payload: &[u8],
            signature_header: &str,
        ) -> Result<PaymentEvent, GatewayError>;
    }
}

struct FixedIdentity(String);

impl IdentityResolver for FixedIdentity {
    async fn resolve_token(&self, token: &str) -> Result<String, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(self.0.clone())
    }
}

fn two_item_request() -> NewOrderRequest {
    NewOrderRequest {
        items: vec![
            NewLineItem {
                product_id: "prod-1".into(),
                qty: 2,
                unit_price: Money::from(dec!(10.00)),
                discount: Money::from(dec!(2.00)),
            },
            NewLineItem { product_id: "prod-2".into(), qty: 1, unit_price: Money::from(dec!(5.00)), discount: Money::default() },
        ],
        // A lying client total. It must never reach the gateway.
        total_amount: Some(Money::from(dec!(0.01))),
        currency: None,
        payment_method_id: Some("pm_card".into()),
        receipt_email: None,
        auto_confirm: false,
    }
}

fn auth(id: &str, status: ProviderStatus, amount_minor: i64) -> PaymentAuthorization {
    PaymentAuthorization {
        id: id.into(),
        client_secret: Some(format!("{id}_secret")),
        status,
        amount_minor,
        currency: "usd".into(),
        payment_method_id: None,
    }
}

fn order_from(new_order: NewOrder) -> Order {
    Order {
        id: 1,
        order_id: new_order.order_id,
        customer_id: new_order.customer_id,
        remark: String::new(),
        total_amount: new_order.total_amount,
        currency: new_order.currency,
        payment_auth_id: new_order.payment_auth_id,
        status: OrderStatusType::Pending,
        created_at: new_order.created_at,
        updated_at: new_order.created_at,
    }
}

fn stored_order(auth_id: &str, status: OrderStatusType) -> Order {
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

fn seeded_registry(db: &mut MockDb) {
    db.expect_find_status_by_name()
        .withf(|name| name == "PENDING")
        .returning(|_| Ok(Some(StatusRecord { id: 1, name: OrderStatusType::Pending })));
}

#[tokio::test]
async fn order_total_is_recomputed_from_line_items() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    seeded_registry(&mut db);
    // (10 - 2) + (5 - 0) = 13, regardless of the client's claimed 0.01
    gateway
        .expect_create_authorization()
        .withf(|charge| {
            charge.amount == Money::from(13) &&
                charge.currency == "usd" &&
                charge.payment_method_id.as_deref() == Some("pm_card")
        })
        .return_once(|_| Ok(auth("pi_1", ProviderStatus::RequiresPaymentMethod, 1300)));
    db.expect_insert_order()
        .withf(|order, items| {
            order.total_amount == Money::from(13) &&
                order.customer_id == "cus_1" &&
                order.payment_auth_id == "pi_1" &&
                items.len() == 2
        })
        .return_once(|order, _| Ok(order_from(order)));
    let api = OrderFlowApi::new(db, gateway);
    let identity = FixedIdentity("cus_1".into());
    let result = api.create_order(two_item_request(), "token", &identity).await.unwrap();
    assert_eq!(result.authorization_id, "pi_1");
    assert_eq!(result.amount_minor, 1300);
    assert_eq!(result.status, "requires_payment_method");
    assert!(result.order_id.as_str().starts_with("ORD-"), "got {}", result.order_id);
}

#[tokio::test]
async fn empty_order_is_rejected_before_any_io() {
    // No expectations at all: touching the db or gateway would panic the mock.
    let api = OrderFlowApi::new(MockDb::new(), MockGateway::new());
    let request = NewOrderRequest {
        items: vec![],
        total_amount: None,
        currency: None,
        payment_method_id: None,
        receipt_email: None,
        auto_confirm: false,
    };
    let err = api.create_order_for_customer(request, "cus_1").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidRequest(_)), "got {err}");
}

#[tokio::test]
async fn discount_must_be_less_than_unit_price() {
    let api = OrderFlowApi::new(MockDb::new(), MockGateway::new());
    let mut request = two_item_request();
    request.items[1].discount = Money::from(dec!(5.00));
    let err = api.create_order_for_customer(request, "cus_1").await.unwrap_err();
    match err {
        OrderFlowError::InvalidRequest(msg) => assert!(msg.contains("prod-2"), "offending item not named: {msg}"),
        other => panic!("expected InvalidRequest, got {other}"),
    }
}

#[tokio::test]
async fn missing_pending_status_is_a_configuration_error() {
    let mut db = MockDb::new();
    db.expect_find_status_by_name().withf(|name| name == "PENDING").returning(|_| Ok(None));
    // The gateway is never reached with an unseeded registry.
    let api = OrderFlowApi::new(db, MockGateway::new());
    let err = api.create_order_for_customer(two_item_request(), "cus_1").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ConfigurationError(_)), "got {err}");
}

#[tokio::test]
async fn gateway_failure_persists_nothing() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    seeded_registry(&mut db);
    gateway
        .expect_create_authorization()
        .return_once(|_| Err(GatewayError::ProviderError("card network is down".into())));
    // insert_order is not expected; the mock panics if the order is persisted anyway.
    let api = OrderFlowApi::new(db, gateway);
    let err = api.create_order_for_customer(two_item_request(), "cus_1").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::GatewayError(_)), "got {err}");
}

#[tokio::test]
async fn persist_failure_cancels_the_fresh_authorization() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    seeded_registry(&mut db);
    gateway
        .expect_create_authorization()
        .return_once(|_| Ok(auth("pi_orphan", ProviderStatus::RequiresPaymentMethod, 1300)));
    db.expect_insert_order()
        .return_once(|_, _| Err(OrderDatabaseError::DuplicateAuthorization("pi_orphan".into())));
    gateway
        .expect_cancel()
        .withf(|a| a == "pi_orphan")
        .times(1)
        .return_once(|_| Ok(auth("pi_orphan", ProviderStatus::Canceled, 1300)));
    let api = OrderFlowApi::new(db, gateway);
    let err = api.create_order_for_customer(two_item_request(), "cus_1").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::DatabaseError(_)), "got {err}");
}

#[tokio::test]
async fn confirmation_projects_provider_status_onto_the_order() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_confirm().withf(|a| a == "pi_1").return_once(|_| Ok(auth("pi_1", ProviderStatus::RequiresAction, 1300)));
    db.expect_fetch_order_by_auth_id()
        .withf(|a| a == "pi_1")
        .returning(|a| Ok(Some(stored_order(a, OrderStatusType::Pending))));
    db.expect_transition_status()
        .withf(|_, status, remark| {
            *status == OrderStatusType::PaymentActionRequired &&
                remark.as_deref() == Some("Payment Status: requires_action")
        })
        .return_once(|oid, status, _| {
            let mut order = stored_order("pi_1", status);
            order.order_id = oid.clone();
            order.remark = "Payment Status: requires_action".into();
            Ok(order)
        });
    let api = OrderFlowApi::new(db, gateway);
    let order = api.confirm_payment_and_update_order("pi_1").await.unwrap();
    assert_eq!(order.status, OrderStatusType::PaymentActionRequired);
    assert_eq!(order.remark, "Payment Status: requires_action");
}

#[tokio::test]
async fn confirmation_for_unknown_authorization_is_not_found() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_confirm().return_once(|_| Ok(auth("pi_ghost", ProviderStatus::Succeeded, 1300)));
    db.expect_fetch_order_by_auth_id().returning(|_| Ok(None));
    let api = OrderFlowApi::new(db, gateway);
    let err = api.confirm_payment_and_update_order("pi_ghost").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(_)), "got {err}");
}

#[tokio::test]
async fn failed_payment_forces_payment_failed_with_reason() {
    let mut db = MockDb::new();
    db.expect_fetch_order_by_auth_id()
        .withf(|a| a == "pi_1")
        .returning(|a| Ok(Some(stored_order(a, OrderStatusType::Pending))));
    db.expect_transition_status()
        .withf(|_, status, remark| {
            *status == OrderStatusType::PaymentFailed &&
                remark.as_deref() == Some("Payment Failed: card_declined")
        })
        .return_once(|_, status, _| Ok(stored_order("pi_1", status)));
    let api = OrderFlowApi::new(db, MockGateway::new());
    let order = api.handle_failed_payment("pi_1", "card_declined").await.unwrap();
    assert_eq!(order.status, OrderStatusType::PaymentFailed);
}

#[tokio::test]
async fn redelivered_success_webhook_is_a_noop() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| {
        Ok(PaymentEvent {
            event_type: PaymentEventType::PaymentSucceeded,
            authorization_id: "pi_1".into(),
            reason: None,
        })
    });
    db.expect_fetch_order_by_auth_id()
        .withf(|a| a == "pi_1")
        .returning(|a| Ok(Some(stored_order(a, OrderStatusType::Confirmed))));
    // The transition's own guard sees the confirmed row and refuses; nothing is written.
    db.expect_transition_status_checked()
        .withf(|_, status, _, accept| *status == OrderStatusType::Confirmed && !accept(OrderStatusType::Confirmed))
        .return_once(|_, _, _, _| Ok(StatusTransition::Refused(stored_order("pi_1", OrderStatusType::Confirmed))));
    let api = OrderFlowApi::new(db, gateway);
    let outcome = api.handle_webhook(b"{}", "sig").await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::AlreadyApplied(_)), "got {outcome:?}");
}

#[tokio::test]
async fn success_webhook_confirms_a_pending_order() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| {
        Ok(PaymentEvent {
            event_type: PaymentEventType::PaymentSucceeded,
            authorization_id: "pi_1".into(),
            reason: None,
        })
    });
    db.expect_fetch_order_by_auth_id()
        .withf(|a| a == "pi_1")
        .returning(|a| Ok(Some(stored_order(a, OrderStatusType::Pending))));
    db.expect_transition_status_checked()
        .withf(|_, status, remark, accept| {
            *status == OrderStatusType::Confirmed &&
                remark.as_deref() == Some("Payment Status: succeeded") &&
                accept(OrderStatusType::Pending)
        })
        .return_once(|_, status, _, _| Ok(StatusTransition::Applied(stored_order("pi_1", status))));
    let api = OrderFlowApi::new(db, gateway);
    let outcome = api.handle_webhook(b"{}", "sig").await.unwrap();
    match outcome {
        WebhookOutcome::Applied(order) => assert_eq!(order.status, OrderStatusType::Confirmed),
        other => panic!("expected Applied, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_webhook_fails_the_order() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| {
        Ok(PaymentEvent {
            event_type: PaymentEventType::PaymentCanceled,
            authorization_id: "pi_1".into(),
            reason: None,
        })
    });
    db.expect_fetch_order_by_auth_id()
        .withf(|a| a == "pi_1")
        .returning(|a| Ok(Some(stored_order(a, OrderStatusType::Pending))));
    db.expect_transition_status_checked()
        .withf(|_, status, remark, accept| {
            *status == OrderStatusType::PaymentFailed &&
                remark.as_deref() == Some("Payment Failed: canceled") &&
                accept(OrderStatusType::Pending)
        })
        .return_once(|_, status, _, _| Ok(StatusTransition::Applied(stored_order("pi_1", status))));
    let api = OrderFlowApi::new(db, gateway);
    let outcome = api.handle_webhook(b"{}", "sig").await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Applied(_)), "got {outcome:?}");
}

#[tokio::test]
async fn late_failure_webhook_does_not_override_a_confirmed_order() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| {
        Ok(PaymentEvent {
            event_type: PaymentEventType::PaymentFailed,
            authorization_id: "pi_1".into(),
            reason: Some("card_declined".into()),
        })
    });
    // The guard handed to the store must reject every settled status while still admitting live ones, and the
    // refusal must surface as AlreadyApplied rather than an overwrite of the confirmed order.
    db.expect_fetch_order_by_auth_id()
        .withf(|a| a == "pi_1")
        .returning(|a| Ok(Some(stored_order(a, OrderStatusType::Confirmed))));
    db.expect_transition_status_checked()
        .withf(|_, status, _, accept| {
            *status == OrderStatusType::PaymentFailed &&
                !accept(OrderStatusType::Confirmed) &&
                !accept(OrderStatusType::Completed) &&
                !accept(OrderStatusType::RejectedByAdmin) &&
                accept(OrderStatusType::Pending) &&
                accept(OrderStatusType::PaymentProcessing)
        })
        .return_once(|_, _, _, _| Ok(StatusTransition::Refused(stored_order("pi_1", OrderStatusType::Confirmed))));
    let api = OrderFlowApi::new(db, gateway);
    let outcome = api.handle_webhook(b"{}", "sig").await.unwrap();
    match outcome {
        WebhookOutcome::AlreadyApplied(order) => assert_eq!(order.status, OrderStatusType::Confirmed),
        other => panic!("expected AlreadyApplied, got {other:?}"),
    }
}

#[tokio::test]
async fn webhook_for_unknown_authorization_is_not_found() {
    let mut db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| {
        Ok(PaymentEvent {
            event_type: PaymentEventType::PaymentSucceeded,
            authorization_id: "pi_ghost".into(),
            reason: None,
        })
    });
    db.expect_fetch_order_by_auth_id().returning(|_| Ok(None));
    let api = OrderFlowApi::new(db, gateway);
    let err = api.handle_webhook(b"{}", "sig").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(_)), "got {err}");
}

#[tokio::test]
async fn unrecognised_webhook_event_is_ignored() {
    let db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| {
        Ok(PaymentEvent {
            event_type: PaymentEventType::Other("payment_intent.created".into()),
            authorization_id: "pi_1".into(),
            reason: None,
        })
    });
    let api = OrderFlowApi::new(db, gateway);
    let outcome = api.handle_webhook(b"{}", "sig").await.unwrap();
    match outcome {
        WebhookOutcome::Ignored(event_type) => assert_eq!(event_type, "payment_intent.created"),
        other => panic!("expected Ignored, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_webhook_signature_is_rejected() {
    let db = MockDb::new();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_and_parse_event().return_once(|_, _| Err(GatewayError::SignatureInvalid));
    let api = OrderFlowApi::new(db, gateway);
    let err = api.handle_webhook(b"{}", "bad-sig").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::GatewayError(GatewayError::SignatureInvalid)), "got {err}");
}

#[tokio::test]
async fn manual_status_change_rejects_unknown_names() {
    let api = OrderFlowApi::new(MockDb::new(), MockGateway::new());
    let oid = OrderId("ORD-1".into());
    let err = api.modify_status_for_order(&oid, "SHINY").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidRequest(_)), "got {err}");
}

#[tokio::test]
async fn refresh_recomputes_total_from_stored_items() {
    let mut db = MockDb::new();
    let oid = OrderId("ORD-1".into());
    db.expect_fetch_line_items_for_order().with(eq(oid.clone())).returning(|oid| {
        Ok(vec![
            OrderLineItem {
                id: 1,
                item_id: "item-1".into(),
                order_id: oid.clone(),
                product_id: "prod-1".into(),
                qty: 2,
                unit_price: Money::from(dec!(10.00)),
                discount: Money::from(dec!(2.50)),
            },
            OrderLineItem {
                id: 2,
                item_id: "item-2".into(),
                order_id: oid.clone(),
                product_id: "prod-2".into(),
                qty: 1,
                unit_price: Money::from(dec!(4.00)),
                discount: Money::default(),
            },
        ])
    });
    db.expect_refresh_order()
        .withf(|_, total| *total == Money::from(dec!(11.50)))
        .return_once(|oid, total| {
            let mut order = stored_order("pi_1", OrderStatusType::Pending);
            order.order_id = oid.clone();
            order.total_amount = total;
            Ok(order)
        });
    let api = OrderFlowApi::new(db, MockGateway::new());
    let order = api.refresh_order(&oid).await.unwrap();
    assert_eq!(order.total_amount, Money::from(dec!(11.50)));
}

#[tokio::test]
async fn deleting_a_confirmed_order_still_deletes() {
    let mut db = MockDb::new();
    let oid = OrderId("ORD-1".into());
    db.expect_fetch_order_by_id()
        .with(eq(oid.clone()))
        .returning(|_| Ok(Some(stored_order("pi_1", OrderStatusType::Confirmed))));
    db.expect_delete_order().with(eq(oid.clone())).times(1).returning(|_| Ok(()));
    let api = OrderFlowApi::new(db, MockGateway::new());
    api.delete_order(&oid).await.unwrap();
}

#[tokio::test]
async fn empty_token_is_unauthenticated() {
    let api = OrderFlowApi::new(MockDb::new(), MockGateway::new());
    let identity = FixedIdentity("cus_1".into());
    let err = api.create_order(two_item_request(), "", &identity).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Unauthenticated(_)), "got {err}");
}
