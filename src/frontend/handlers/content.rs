use tracing::{debug, trace, warn};

use crate::frontend::context::ConnectionContext;
use crate::frontend::replies;
use crate::gateway::{RouteError, RouteOutcome};
use crate::server::Gateway;
use crate::wire::Message;

// -----------------------------------------------------------------------------
// ----- Content Handler -------------------------------------------------------

pub(crate) async fn handle_content(
    context: &mut ConnectionContext,
    gateway: &Gateway,
    message: Message,
) -> std::io::Result<()> {
    if context.is_relay() {
        relay_inbound(context, gateway, &message).await;
        return Ok(());
    }

    if !context.is_authenticated() {
        debug!(
            "rejecting {:?} from unauthenticated {}",
            message.message_type,
            context.remote_addr()
        );
        return context.reply(replies::auth_required()).await;
    }

    trace!(
        "{:?} {} -> {}: {}",
        message.message_type,
        message.from_user_id,
        message.to_user_id,
        message.payload_lossy()
    );

    let sender = context.reply_to();
    let recipient = message.to_user_id;

    match gateway.router().route(&message).await {
        Ok(RouteOutcome::Delivered { .. } | RouteOutcome::Forwarded { .. }) => Ok(()),

        Ok(RouteOutcome::Informational) => context.reply(replies::ok(sender)).await,

        Err(err @ RouteError::LocalDelivery { .. }) => {
            warn!("{err}");
            context
                .reply(replies::delivery_failed(sender, recipient))
                .await
        }

        Err(err @ (RouteError::NoRoute { .. } | RouteError::Peer(_))) => {
            warn!("cannot route message for user {recipient}: {err}");
            context.reply(replies::unreachable(sender, recipient)).await
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Relay -------------------------------------------------------

/// Traffic from a peer gateway is delivered here or dropped. It is never
/// forwarded again, so two gateways cannot bounce a message between them.
async fn relay_inbound(context: &ConnectionContext, gateway: &Gateway, message: &Message) {
    match gateway.router().deliver_local(message).await {
        Ok(Some(_)) => {}
        Ok(None) => warn!(
            "relay from {}: user {} not connected here; dropped",
            context.remote_addr(),
            message.to_user_id
        ),
        Err(err) => warn!("relay from {}: {err}", context.remote_addr()),
    }
}
