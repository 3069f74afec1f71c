//! Inbound update routing. Classifies messages and callback presses,
//! provisions the user record on first contact, handles the global tokens
//! (language, favorites, own ads, moderation) directly and hands workflow
//! tokens to the engine.

use crate::app::App;
use crate::bot::{executor, keyboards, media};
use crate::db::{self, User};
use crate::dialogue::{ChatState, SellDraft};
use crate::errors::{AppError, AppResult};
use crate::lifecycle::format_advertisement;
use crate::localization::detect_language;
use crate::workflow::{self, Event, Keyboard};
use teloxide::prelude::*;
use teloxide::types::{Message, Update, UpdateKind};
use tracing::{debug, warn};

/// Entry point for one webhook delivery
pub async fn process_update(app: &App, update: Update) -> AppResult<()> {
    match update.kind {
        UpdateKind::Message(msg) => handle_message(app, msg).await,
        UpdateKind::CallbackQuery(q) => handle_callback(app, q).await,
        _ => {
            debug!("ignoring unsupported update kind");
            Ok(())
        }
    }
}

async fn resolve_user(app: &App, from: &teloxide::types::User) -> AppResult<User> {
    let language = detect_language(from.language_code.as_deref());
    let user = db::get_or_create_user(
        &app.pool,
        from.id.0 as i64,
        from.username.as_deref(),
        Some(from.first_name.as_str()),
        &language,
    )
    .await?;
    Ok(user)
}

async fn handle_message(app: &App, msg: Message) -> AppResult<()> {
    let Some(from) = msg.from.clone() else {
        return Ok(());
    };
    if from.is_bot {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let user = resolve_user(app, &from).await?;
    let state = ChatState::parse(&user.state);
    let draft = SellDraft::from_json(user.draft.as_deref());

    let event = if let Some(text) = msg.text() {
        if let Some(rest) = text.strip_prefix('/') {
            return handle_command(app, chat_id, &user, state, draft, rest).await;
        }
        Event::Text(text.to_string())
    } else if let Some(contact) = msg.contact() {
        Event::Contact(contact.phone_number.clone())
    } else if let Some(photos) = msg.photo() {
        match classify_photo(app, chat_id, &user, state, photos).await? {
            Some(event) => event,
            None => return Ok(()),
        }
    } else {
        debug!(user_id = %user.telegram_id, "ignoring unsupported message content");
        return Ok(());
    };

    let transition = workflow::transition(state, draft.clone(), &event);
    executor::execute(app, chat_id, &user, &draft, transition).await
}

/// Download a photo when the conversation actually wants one. Outside the
/// photo-awaiting states the engine only needs to know a photo arrived.
async fn classify_photo(
    app: &App,
    chat_id: ChatId,
    user: &User,
    state: ChatState,
    photos: &[teloxide::types::PhotoSize],
) -> AppResult<Option<Event>> {
    if !matches!(
        state,
        ChatState::SellWaitingPhoto | ChatState::WaitingReceipt
    ) {
        return Ok(Some(Event::Photo(String::new())));
    }

    let Some(photo) = media::largest_photo(photos) else {
        return Ok(Some(Event::Photo(String::new())));
    };

    match media::download_and_save_photo(app, photo.file.id.clone()).await {
        Ok(path) => Ok(Some(Event::Photo(path))),
        Err(AppError::Timeout(e)) => {
            warn!(user_id = %user.telegram_id, error = %e, "photo download timed out");
            executor::send_text(
                app,
                chat_id,
                "photo-upload-timeout",
                Keyboard::None,
                &user.language,
            )
            .await;
            Ok(None)
        }
        Err(e) => {
            warn!(user_id = %user.telegram_id, error = %e, "photo download failed");
            executor::send_text(
                app,
                chat_id,
                "photo-upload-error",
                Keyboard::None,
                &user.language,
            )
            .await;
            Ok(None)
        }
    }
}

/// Strip arguments and a group-chat bot mention: `/start@some_bot foo`
/// routes as `start`
fn parse_command(raw: &str) -> &str {
    raw.split_whitespace()
        .next()
        .unwrap_or("")
        .split('@')
        .next()
        .unwrap_or("")
}

/// Slash commands are global overrides and ignore the current state
async fn handle_command(
    app: &App,
    chat_id: ChatId,
    user: &User,
    state: ChatState,
    draft: SellDraft,
    raw: &str,
) -> AppResult<()> {
    match parse_command(raw) {
        "start" => {
            let event = Event::Command("start".to_string());
            let transition = workflow::transition(state, draft.clone(), &event);
            executor::execute(app, chat_id, user, &draft, transition).await
        }
        "help" => {
            executor::send_text(app, chat_id, "help-message", Keyboard::MainMenu, &user.language)
                .await;
            Ok(())
        }
        "language" => {
            send_language_menu(app, chat_id, &user.language).await;
            Ok(())
        }
        "admin" | "moderate" => render_pending(app, chat_id, user).await,
        other => {
            debug!(command = %other, "unknown command");
            executor::send_text(
                app,
                chat_id,
                "unknown-command",
                Keyboard::MainMenu,
                &user.language,
            )
            .await;
            Ok(())
        }
    }
}

async fn send_language_menu(app: &App, chat_id: ChatId, language: &str) {
    let text = app.localization.t("select-language", language);
    if let Err(e) = app
        .bot
        .send_message(chat_id, text)
        .reply_markup(keyboards::languages())
        .await
    {
        warn!(error = %e, "failed to send language menu");
    }
}

async fn handle_callback(app: &App, q: CallbackQuery) -> AppResult<()> {
    // Must never abort the press handling; Telegram just keeps the spinner
    if let Err(e) = app.bot.answer_callback_query(q.id.clone()).await {
        warn!(error = %e, "failed to answer callback query");
    }

    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(q.from.id.0 as i64));

    let user = resolve_user(app, &q.from).await?;
    let language = user.language.clone();

    match data.as_str() {
        "noop" => Ok(()),
        "help" => {
            executor::send_text(app, chat_id, "help-message", Keyboard::MainMenu, &language).await;
            Ok(())
        }
        "language" => {
            send_language_menu(app, chat_id, &language).await;
            Ok(())
        }
        "my_ads" => render_my_ads(app, chat_id, &user, 0).await,
        "my_favorites" => render_favorites(app, chat_id, &user).await,
        _ => {
            if let Some(code) = data.strip_prefix("lang:") {
                return change_language(app, chat_id, &user, code).await;
            }
            if let Some(page) = data.strip_prefix("my_ads:page:") {
                let page = page.parse::<usize>().unwrap_or(0);
                return render_my_ads(app, chat_id, &user, page).await;
            }
            if let Some(id) = token_id(&data, "favorite:add:") {
                db::add_favorite(&app.pool, user.id, id).await?;
                executor::send_text(app, chat_id, "favorite-added", Keyboard::None, &language)
                    .await;
                return Ok(());
            }
            if let Some(id) = token_id(&data, "favorite:rm:") {
                db::remove_favorite(&app.pool, user.id, id).await?;
                executor::send_text(app, chat_id, "favorite-removed", Keyboard::None, &language)
                    .await;
                return Ok(());
            }
            if let Some(id) = token_id(&data, "sold:") {
                return mark_sold(app, chat_id, &user, id).await;
            }
            if let Some(id) = token_id(&data, "approve:") {
                return moderate(app, chat_id, &user, id, true).await;
            }
            if let Some(id) = token_id(&data, "reject:") {
                return moderate(app, chat_id, &user, id, false).await;
            }

            // Everything else belongs to the workflow engine
            let state = ChatState::parse(&user.state);
            let draft = SellDraft::from_json(user.draft.as_deref());
            let event = Event::ButtonPress(data);
            let transition = workflow::transition(state, draft.clone(), &event);
            executor::execute(app, chat_id, &user, &draft, transition).await
        }
    }
}

fn token_id(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_strips_mention_and_arguments() {
        assert_eq!(parse_command("start"), "start");
        assert_eq!(parse_command("start deep-link-payload"), "start");
        assert_eq!(parse_command("language@telebazaar_bot"), "language");
        assert_eq!(parse_command("moderate@telebazaar_bot now"), "moderate");
        assert_eq!(parse_command(""), "");
    }

    #[test]
    fn test_token_id_rejects_malformed_ids() {
        assert_eq!(token_id("sold:42", "sold:"), Some(42));
        assert_eq!(token_id("sold:abc", "sold:"), None);
        assert_eq!(token_id("approve:7", "sold:"), None);
    }
}

async fn change_language(app: &App, chat_id: ChatId, user: &User, code: &str) -> AppResult<()> {
    if !app.localization.is_language_supported(code) {
        executor::send_text(app, chat_id, "generic-error", Keyboard::None, &user.language).await;
        return Ok(());
    }
    db::set_user_language(&app.pool, user.telegram_id, code).await?;
    executor::send_text(app, chat_id, "language-changed", Keyboard::MainMenu, code).await;
    Ok(())
}

/// One card per page; an out-of-range page renders the empty state
async fn render_my_ads(app: &App, chat_id: ChatId, user: &User, page: usize) -> AppResult<()> {
    let ads = app.lifecycle.list_for_user(user.id).await?;
    if ads.is_empty() || page >= ads.len() {
        executor::send_text(app, chat_id, "no-ads-found", Keyboard::MainMenu, &user.language)
            .await;
        return Ok(());
    }

    let card = &ads[page];
    let keyboard = keyboards::my_ads_card(card, page, ads.len(), &app.localization, &user.language);
    executor::send_card(app, chat_id, card, &user.language, Some(keyboard)).await;
    Ok(())
}

async fn render_favorites(app: &App, chat_id: ChatId, user: &User) -> AppResult<()> {
    let favorites = db::list_favorites(&app.pool, user.id).await?;
    if favorites.is_empty() {
        executor::send_text(app, chat_id, "no-ads-found", Keyboard::MainMenu, &user.language)
            .await;
        return Ok(());
    }

    let header = app.localization.t_args(
        "found-ads",
        &user.language,
        &[("count", favorites.len().to_string())],
    );
    if let Err(e) = app.bot.send_message(chat_id, header).await {
        warn!(error = %e, "failed to send favorites header");
    }
    for card in &favorites {
        let keyboard = keyboards::ad_actions(card.id, true, &app.localization, &user.language);
        executor::send_card(app, chat_id, card, &user.language, Some(keyboard)).await;
    }
    Ok(())
}

async fn render_pending(app: &App, chat_id: ChatId, user: &User) -> AppResult<()> {
    if !user.is_moderator() {
        executor::send_text(app, chat_id, "access-denied", Keyboard::None, &user.language).await;
        return Ok(());
    }

    let pending = app.lifecycle.list_pending().await?;
    if pending.is_empty() {
        executor::send_text(app, chat_id, "no-pending-ads", Keyboard::None, &user.language).await;
        return Ok(());
    }

    if let Err(e) = app
        .bot
        .send_message(
            chat_id,
            app.localization.t("pending-ads-title", &user.language),
        )
        .await
    {
        warn!(error = %e, "failed to send moderation header");
    }
    for card in &pending {
        let keyboard = keyboards::moderation(card.id, &app.localization, &user.language);
        executor::send_card(app, chat_id, card, &user.language, Some(keyboard)).await;
    }
    Ok(())
}

async fn mark_sold(app: &App, chat_id: ChatId, user: &User, ad_id: i64) -> AppResult<()> {
    match app.lifecycle.mark_sold(ad_id, user.id).await {
        Ok(_) => {
            executor::send_text(app, chat_id, "marked-sold", Keyboard::MainMenu, &user.language)
                .await;
        }
        Err(AppError::Authorization(_)) => {
            executor::send_text(app, chat_id, "access-denied", Keyboard::None, &user.language)
                .await;
        }
        Err(AppError::NotFound(_)) => {
            executor::send_text(app, chat_id, "not-found", Keyboard::None, &user.language).await;
        }
        Err(AppError::Validation(_)) => {
            executor::send_text(app, chat_id, "generic-error", Keyboard::None, &user.language)
                .await;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

async fn moderate(
    app: &App,
    chat_id: ChatId,
    user: &User,
    ad_id: i64,
    approve: bool,
) -> AppResult<()> {
    let result = if approve {
        app.lifecycle.approve(user, ad_id).await
    } else {
        app.lifecycle.reject(user, ad_id, "rejected by moderator").await
    };

    let card = match result {
        Ok(card) => card,
        Err(AppError::Authorization(_)) => {
            executor::send_text(app, chat_id, "access-denied", Keyboard::None, &user.language)
                .await;
            return Ok(());
        }
        Err(AppError::NotFound(_)) => {
            executor::send_text(app, chat_id, "not-found", Keyboard::None, &user.language).await;
            return Ok(());
        }
        Err(AppError::Validation(_)) => {
            executor::send_text(app, chat_id, "generic-error", Keyboard::None, &user.language)
                .await;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    executor::send_text(app, chat_id, "moderation-done", Keyboard::None, &user.language).await;

    // Tell the seller, in the seller's language; best effort
    let seller_language = db::get_user_by_telegram_id(&app.pool, card.seller_telegram_id)
        .await
        .ok()
        .flatten()
        .map(|u| u.language)
        .unwrap_or_else(|| crate::localization::DEFAULT_LANGUAGE.to_string());
    let notice_key = if approve {
        "ad-approved-notice"
    } else {
        "ad-rejected-notice"
    };
    let notice = format!(
        "{}\n\n{}",
        app.localization.t(notice_key, &seller_language),
        format_advertisement(&card, &seller_language, &app.localization)
    );
    if let Err(e) = app
        .bot
        .send_message(ChatId(card.seller_telegram_id), notice)
        .await
    {
        warn!(ad_id = %ad_id, error = %e, "failed to notify seller of moderation decision");
    }
    Ok(())
}
