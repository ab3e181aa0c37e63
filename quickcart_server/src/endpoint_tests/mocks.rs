use mockall::mock;
use qc_common::Money;
use quickcart_engine::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderLineItem, OrderStatusType, StatusRecord},
    order_objects::{OrderQueryFilter, Pagination},
    traits::{
        GatewayError,
        NewCharge,
        OrderDatabaseError,
        OrderManagement,
        PaymentAuthorization,
        PaymentEvent,
        PaymentGateway,
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
            query: OrderQueryFilter,
            pagination: Pagination,
        ) -> Result<Vec<Order>, OrderDatabaseError>;
        async fn search_count(&self, query: OrderQueryFilter) -> Result<i64, OrderDatabaseError>;
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
