mod auth;
mod content;
mod liveness;

use tracing::warn;

use crate::frontend::context::ConnectionContext;
use crate::frontend::replies;
use crate::server::Gateway;
use crate::wire::{Message, MessageType};

// -----------------------------------------------------------------------------
// ----- Dispatch --------------------------------------------------------------

/// Handle one decoded frame. An `Err` means this connection can no longer be
/// written to and must be closed.
pub(crate) async fn dispatch(
    context: &mut ConnectionContext,
    gateway: &Gateway,
    message: Message,
) -> std::io::Result<()> {
    match message.message_type {
        MessageType::Auth => auth::handle_auth(context, gateway, message).await,

        MessageType::Text
        | MessageType::Image
        | MessageType::Voice
        | MessageType::Video
        | MessageType::File => content::handle_content(context, gateway, message).await,

        MessageType::Ping => liveness::handle_ping(context).await,
        MessageType::Pong => liveness::handle_pong(context, &message),

        MessageType::Unknown(_) if !context.is_authenticated() => {
            context.reply(replies::auth_required()).await
        }

        MessageType::Unknown(tag) => {
            warn!(
                "unknown message type {tag} from {} ({} payload bytes)",
                context.remote_addr(),
                message.payload.len()
            );
            context.reply(replies::ok(context.reply_to())).await
        }
    }
}
