//----------------------------------------------   Stripe webhooks  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, info, trace, warn};
use quickcart_engine::{
    traits::{GatewayError, OrderStore, PaymentGateway},
    OrderFlowApi,
    OrderFlowError,
    WebhookOutcome,
};

use crate::{data_objects::JsonResponse, route};

route!(stripe_webhook => Post "/stripe" impl OrderStore, PaymentGateway);
/// Route handler for Stripe webhook deliveries.
///
/// The signature is verified against the raw body before anything in the payload is trusted; a failed verification
/// is a 400 and Stripe will not retry it. Everything after a verified signature answers in the 200 range:
/// delivery is at-least-once, the engine's transitions are idempotent, and a retry storm of a poison event helps
/// nobody.
pub async fn stripe_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, G>>,
) -> HttpResponse
where
    B: OrderStore,
    G: PaymentGateway,
{
    trace!("🛍️️ Received webhook request: {}", req.uri());
    let Some(signature) = req.headers().get("Stripe-Signature").and_then(|v| v.to_str().ok()) else {
        warn!("🛍️️ Webhook request arrived without a Stripe-Signature header");
        return HttpResponse::BadRequest().json(JsonResponse::failure("Missing Stripe-Signature header"));
    };
    let result = match api.handle_webhook(body.as_ref(), signature).await {
        Ok(WebhookOutcome::Applied(order)) => {
            info!("🛍️️ Webhook applied. Order {} is now {}", order.order_id, order.status);
            JsonResponse::success(format!("Order {} updated", order.order_id))
        },
        Ok(WebhookOutcome::AlreadyApplied(order)) => {
            debug!("🛍️️ Webhook re-delivery for order {} ignored", order.order_id);
            JsonResponse::success("Event already applied")
        },
        Ok(WebhookOutcome::Ignored(event_type)) => {
            debug!("🛍️️ Ignoring webhook event type {event_type}");
            JsonResponse::success(format!("Event type {event_type} ignored"))
        },
        Err(OrderFlowError::GatewayError(GatewayError::SignatureInvalid)) => {
            warn!("🛍️️ Webhook signature verification failed");
            return HttpResponse::BadRequest().json(JsonResponse::failure("Signature verification failed"));
        },
        Err(OrderFlowError::GatewayError(GatewayError::MalformedPayload(msg))) => {
            warn!("🛍️️ Webhook payload could not be parsed. {msg}");
            return HttpResponse::BadRequest().json(JsonResponse::failure(msg));
        },
        Err(OrderFlowError::OrderNotFound(msg)) => {
            // Possibly an event for an intent created outside this service; acknowledging stops the retries.
            info!("🛍️️ Webhook references an unknown order. {msg}");
            JsonResponse::failure(msg)
        },
        Err(e) => {
            warn!("🛍️️ Unexpected error while handling webhook. {e}");
            JsonResponse::failure("Unexpected error handling event.")
        },
    };
    HttpResponse::Ok().json(result)
}
