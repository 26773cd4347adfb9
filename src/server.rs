use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::Method,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::bot::{Bot, Reply, INFO_REPLY};

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

/// Every path and method lands on the webhook handler.
pub fn router(bot: Arc<Bot>) -> Router {
    Router::new().fallback(webhook).with_state(bot)
}

async fn webhook(
    State(bot): State<Arc<Bot>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method != Method::POST {
        info!("Received irrelevant {} request", method);
        return Reply::ok(INFO_REPLY).into_response();
    }

    // Bodies over the default limit cannot be updates; answer like any other non-update.
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Could not read request body: {}", e);
            return Reply::ok(INFO_REPLY).into_response();
        }
    };

    let payload = String::from_utf8_lossy(&body);
    match bot.handle(&payload).await {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            error!("Error handling update: {:#}", e);
            e.reply().into_response()
        }
    }
}

/// Serve the webhook until Ctrl-C.
pub async fn serve(listener: TcpListener, bot: Arc<Bot>) -> Result<()> {
    axum::serve(listener, router(bot))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
