use tracing::{info, warn};

use crate::frontend::context::ConnectionContext;
use crate::frontend::replies;
use crate::gateway::{Registration, SessionLease};
use crate::server::Gateway;
use crate::shared_types::AuthStage;
use crate::wire::{Message, SERVER_USER_ID};

// -----------------------------------------------------------------------------
// ----- Auth Handler ----------------------------------------------------------

pub(crate) async fn handle_auth(
    context: &mut ConnectionContext,
    gateway: &Gateway,
    message: Message,
) -> std::io::Result<()> {
    let user_id = message.from_user_id;

    if user_id == SERVER_USER_ID {
        return handle_relay_hello(context, gateway).await;
    }

    if context.is_relay() {
        warn!(
            "ignoring auth for user {user_id} on relay link {}",
            context.remote_addr()
        );
        return Ok(());
    }

    // Per-connection identity: set once, by the first valid Auth frame.
    if !context.is_authenticated() {
        context.stage = AuthStage::Authenticated { user_id };
        info!("connection {} authenticated as user {user_id}", context.remote_addr());
        context.reply(replies::auth_ack(user_id)).await?;
    }

    // Registry binding: never replaces an authenticated session.
    let registry = gateway.registry();
    match registry.register(user_id, &context.connection) {
        Registration::Created | Registration::Rebound => {
            let lease = SessionLease::new(registry.clone(), user_id, context.connection.id());
            context.hold(lease);
            context.reply(replies::login_succeeded(user_id)).await
        }

        Registration::AlreadyLoggedIn => {
            info!(
                "user {user_id} already logged in; keeping existing session (from {})",
                context.remote_addr()
            );
            context.reply(replies::already_logged_in(user_id)).await
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Relay -------------------------------------------------------

/// Only addresses of configured peers may open a relay link. Anyone else
/// sending the server id gets the same answer as content before login.
async fn handle_relay_hello(
    context: &mut ConnectionContext,
    gateway: &Gateway,
) -> std::io::Result<()> {
    match context.stage {
        AuthStage::Relay => Ok(()),

        AuthStage::Authenticated { user_id } => {
            warn!(
                "user {user_id} on {} sent a relay hello; ignored",
                context.remote_addr()
            );
            Ok(())
        }

        AuthStage::Unauthenticated => {
            if !gateway.settings().trusted_relays.contains(&context.remote_ip()) {
                warn!(
                    "refusing relay hello from {}: not a configured peer",
                    context.remote_addr()
                );
                return context.reply(replies::auth_required()).await;
            }

            context.stage = AuthStage::Relay;
            info!("connection {} is a relay link from a peer gateway", context.remote_addr());
            Ok(())
        }
    }
}
