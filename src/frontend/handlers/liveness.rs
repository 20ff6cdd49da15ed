use tracing::trace;

use crate::frontend::context::ConnectionContext;
use crate::frontend::replies;
use crate::wire::Message;

pub(crate) async fn handle_ping(context: &ConnectionContext) -> std::io::Result<()> {
    context.reply(replies::pong(context.reply_to())).await
}

pub(crate) fn handle_pong(context: &ConnectionContext, message: &Message) -> std::io::Result<()> {
    trace!("pong from {} (user {})", context.remote_addr(), message.from_user_id);
    Ok(())
}
