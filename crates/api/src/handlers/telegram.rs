//! Telegram bot webhook and manual sends.
//!
//! The webhook always answers 200 once the secret checks out so Telegram
//! does not redeliver; failures while replying are logged instead.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use backoffice_core::error::CoreError;
use backoffice_core::subscription::days_remaining;
use backoffice_core::telegram::{escape_html, parse_command, welcome_text, BotCommand, HELP_TEXT};
use backoffice_core::types::DbId;
use backoffice_db::models::telegram::TouchTelegramSession;
use backoffice_db::repositories::{BusinessRepo, SubscriptionRepo, TelegramRepo};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// The parts of a Bot API `Update` the bot reacts to.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub from: Option<TelegramUser>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub business_id: DbId,
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub business_id: DbId,
    pub chat_id: i64,
    pub sent: bool,
}

fn check_secret(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = state.config.telegram_webhook_secret.as_deref() else {
        return Ok(());
    };
    let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if given == Some(expected) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Unauthorized(
            "Invalid webhook secret".into(),
        )))
    }
}

/// POST /api/v1/telegram/webhook
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> AppResult<Json<WebhookAck>> {
    check_secret(&state, &headers)?;

    let Some(message) = update.message else {
        tracing::debug!(update_id = update.update_id, "Ignoring non-message update");
        return Ok(Json(WebhookAck { ok: true }));
    };
    let chat_id = message.chat.id;

    if let Some(from) = &message.from {
        TelegramRepo::touch(
            &state.pool,
            &TouchTelegramSession {
                telegram_user_id: from.id,
                chat_id,
                username: from.username.clone(),
                first_name: from.first_name.clone(),
                last_name: from.last_name.clone(),
            },
        )
        .await?;
    }

    let Some(command) = message.text.as_deref().and_then(parse_command) else {
        return Ok(Json(WebhookAck { ok: true }));
    };
    tracing::info!(chat_id, ?command, "Bot command received");

    let reply = handle_command(&state, command, chat_id, message.from.as_ref()).await?;
    if let Err(e) = state.telegram.send_text(chat_id, &reply).await {
        tracing::warn!(chat_id, error = %e, "Failed to send bot reply");
    }
    Ok(Json(WebhookAck { ok: true }))
}

async fn handle_command(
    state: &AppState,
    command: BotCommand,
    chat_id: i64,
    from: Option<&TelegramUser>,
) -> AppResult<String> {
    let reply = match command {
        BotCommand::Start => welcome_text(from.and_then(|u| u.first_name.as_deref())),
        BotCommand::Help => HELP_TEXT.to_string(),
        BotCommand::Status => status_text(state, chat_id, from).await?,
        BotCommand::Link(code) => {
            match BusinessRepo::claim_link_code(&state.pool, &code, chat_id).await? {
                Some(business) => {
                    tracing::info!(business_id = business.id, chat_id, "Chat linked to business");
                    format!(
                        "This chat is now linked to <b>{}</b>. You will receive its notifications here.",
                        escape_html(&business.name)
                    )
                }
                None => "That link code is invalid or was already used. \
                         Ask for a new code from the back office."
                    .to_string(),
            }
        }
        BotCommand::Unlink => {
            let unlinked = BusinessRepo::unlink_chat(&state.pool, chat_id).await?;
            if unlinked == 0 {
                "This chat is not linked to any business.".to_string()
            } else {
                tracing::info!(chat_id, unlinked, "Chat unlinked");
                format!("Unlinked {unlinked} business(es) from this chat.")
            }
        }
        BotCommand::Notifications(enabled) => match from {
            Some(user) => {
                TelegramRepo::set_notifications(&state.pool, user.id, enabled).await?;
                if enabled {
                    "Notifications are now <b>on</b>.".to_string()
                } else {
                    "Notifications are now <b>off</b>.".to_string()
                }
            }
            None => HELP_TEXT.to_string(),
        },
        BotCommand::Unknown(name) => {
            format!("Unknown command /{}.\n\n{HELP_TEXT}", escape_html(&name))
        }
    };
    Ok(reply)
}

async fn status_text(
    state: &AppState,
    chat_id: i64,
    from: Option<&TelegramUser>,
) -> AppResult<String> {
    let businesses = BusinessRepo::find_by_chat_id(&state.pool, chat_id).await?;
    if businesses.is_empty() {
        return Ok("This chat is not linked to a business yet. Use /link CODE.".to_string());
    }

    let now = Utc::now();
    let mut lines = Vec::with_capacity(businesses.len() + 1);
    for business in &businesses {
        let line = match SubscriptionRepo::find_active_for_business(&state.pool, business.id)
            .await?
        {
            Some(detail) => format!(
                "<b>{}</b>: {} until {} ({} days left)",
                escape_html(&business.name),
                escape_html(&detail.plan_name),
                detail.subscription.end_date.format("%Y-%m-%d"),
                days_remaining(detail.subscription.end_date, now)
            ),
            None => format!("<b>{}</b>: no active subscription", escape_html(&business.name)),
        };
        lines.push(line);
    }

    if let Some(user) = from {
        if let Some(session) = TelegramRepo::find_by_telegram_user(&state.pool, user.id).await? {
            let flag = if session.notifications_enabled { "on" } else { "off" };
            lines.push(format!("Notifications: {flag}"));
        }
    }
    Ok(lines.join("\n"))
}

/// POST /api/v1/telegram/send
pub async fn send_message(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<SendMessageRequest>,
) -> AppResult<Json<SendMessageResponse>> {
    input.validate()?;
    let business = BusinessRepo::find_by_id(&state.pool, input.business_id)
        .await?
        .ok_or(AppError::not_found("Business", input.business_id))?;
    let chat_id = business.telegram_chat_id.ok_or_else(|| {
        AppError::validation("Business has no linked Telegram chat")
    })?;
    if !state.telegram.is_enabled() {
        return Err(AppError::BadRequest("Telegram delivery is not configured".into()));
    }

    state
        .telegram
        .send_text(chat_id, &escape_html(&input.text))
        .await
        .map_err(|e| AppError::InternalError(format!("Telegram send failed: {e}")))?;

    tracing::info!(
        business_id = business.id,
        chat_id,
        admin_id = admin.user_id,
        "Manual Telegram message sent"
    );
    Ok(Json(SendMessageResponse {
        business_id: business.id,
        chat_id,
        sent: true,
    }))
}

