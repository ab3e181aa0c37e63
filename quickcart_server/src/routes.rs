//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions. Async handlers get executed
//! concurrently by worker threads and thus don't block execution.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use quickcart_engine::{
    db_types::OrderId,
    order_objects::NewOrderRequest,
    traits::{OrderStore, PaymentGateway},
    OrderFlowApi,
};

use crate::{
    auth::JwtService,
    data_objects::{JsonResponse, OrderSearchParams, TokenRequest, TokenResponse, UpdateRemarkParams, UpdateStatusParams},
    errors::ServerError,
};

pub const ACCESS_TOKEN_HEADER: &str = "qc_access_token";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(auth => Post "/auth");
/// Route handler for the auth endpoint
///
/// Issues a short-lived access token for the given customer id. The endpoint is meant to sit behind the storefront's
/// private network: the storefront authenticates the customer and exchanges the customer id for a token here, then
/// hands the token to the client for the order endpoints.
pub async fn auth(body: web::Json<TokenRequest>, signer: web::Data<JwtService>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received auth request");
    let request = body.into_inner();
    if request.customer_id.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("customer_id must not be empty".to_string()));
    }
    let access_token = signer.issue_token(&request.customer_id)?;
    debug!("💻️ Issued access token for customer {}", request.customer_id);
    Ok(HttpResponse::Ok().json(TokenResponse { access_token }))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(new_order => Post "/orders" impl OrderStore, PaymentGateway);
/// Route handler for placing a new order.
///
/// The caller supplies an access token in the `qc_access_token` header. The order total is recomputed server-side
/// from the line items; a payment authorization is created for the computed total and the order is stored as
/// `PENDING`. The response carries what the client needs to complete the payment (authorization id, client secret).
pub async fn new_order<B, G>(
    req: HttpRequest,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B, G>>,
    identity: web::Data<JwtService>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let token = req
        .headers()
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::AuthenticationError("No access token provided".to_string()))?;
    debug!("💻️ POST new order with {} line items", body.items.len());
    let result = api.create_order(body.into_inner(), token, identity.get_ref()).await?;
    Ok(HttpResponse::Created().json(result))
}

route!(confirm_order => Post "/orders/confirm/{auth_id}" impl OrderStore, PaymentGateway);
/// Confirms the payment authorization with the provider and projects the resulting provider status onto the order.
pub async fn confirm_order<B, G>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let auth_id = path.into_inner();
    debug!("💻️ POST confirm payment [{auth_id}]");
    let order = api.confirm_payment_and_update_order(&auth_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderStore, PaymentGateway);
pub async fn order_by_id<B, G>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let oid = OrderId(path.into_inner());
    debug!("💻️ GET order {oid}");
    let view = api.fetch_order(&oid).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(search_orders => Get "/search/orders" impl OrderStore, PaymentGateway);
/// Paginated order search. All filters are optional; an empty query returns every order, oldest first.
pub async fn search_orders<B, G>(
    params: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let (filter, pagination) = params.into_inner().into_query();
    debug!("💻️ GET search orders");
    let result = api.search_orders(filter, pagination).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(update_order_status => Patch "/orders/{order_id}/status" impl OrderStore, PaymentGateway);
/// An explicit status override for operators. The status name must be one of the seeded registry names.
pub async fn update_order_status<B, G>(
    path: web::Path<String>,
    body: web::Json<UpdateStatusParams>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let oid = OrderId(path.into_inner());
    let params = body.into_inner();
    debug!("💻️ PATCH order {oid} status to {}", params.status);
    let order = api.modify_status_for_order(&oid, &params.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_remark => Patch "/orders/{order_id}/remark" impl OrderStore, PaymentGateway);
pub async fn update_order_remark<B, G>(
    path: web::Path<String>,
    body: web::Json<UpdateRemarkParams>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let oid = OrderId(path.into_inner());
    debug!("💻️ PATCH order {oid} remark");
    let order = api.modify_remark_for_order(&oid, &body.into_inner().remark).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(refresh_order => Post "/orders/{order_id}/refresh" impl OrderStore, PaymentGateway);
/// Recomputes the order total from its stored line items and re-dates the order.
pub async fn refresh_order<B, G>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let oid = OrderId(path.into_inner());
    debug!("💻️ POST refresh order {oid}");
    let order = api.refresh_order(&oid).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(delete_order => Delete "/orders/{order_id}" impl OrderStore, PaymentGateway);
pub async fn delete_order<B, G>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let oid = OrderId(path.into_inner());
    debug!("💻️ DELETE order {oid}");
    api.delete_order(&oid).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {oid} deleted"))))
}
