//! Effect executor. Interprets the effect list produced by the workflow
//! engine against the real world, in a fixed order:
//!
//! 1. a `CreateAdvertisement` effect runs first; if it fails the new state
//!    is not persisted and the user is asked to retry with the draft intact
//! 2. the new conversation state and draft are persisted; a persistence
//!    failure is fatal for the event and nothing is sent, so redelivery is
//!    safe
//! 3. message effects are sent; transport failures are logged and swallowed
//!    so the inbound delivery is always acknowledged

use crate::app::App;
use crate::bot::keyboards;
use crate::db::{self, AdCard, AdSearchFilters, User};
use crate::dialogue::{Flow, SellDraft};
use crate::errors::{AppError, AppResult};
use crate::lifecycle::{format_advertisement, format_price};
use crate::workflow::{Effect, Keyboard, Transition};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, KeyboardRemove, ReplyMarkup};
use tracing::{info, warn};

/// Run a transition's effects and persist its state for one user
pub async fn execute(
    app: &App,
    chat_id: ChatId,
    user: &User,
    prev_draft: &SellDraft,
    transition: Transition,
) -> AppResult<()> {
    let receipt = transition.effects.iter().find_map(|e| match e {
        Effect::CreateAdvertisement { receipt_path } => Some(receipt_path.clone()),
        _ => None,
    });

    if let Some(receipt_path) = receipt {
        return create_advertisement(app, chat_id, user, prev_draft, &transition, &receipt_path)
            .await;
    }

    // State first: a crash after this point re-renders at worst
    db::set_conversation(
        &app.pool,
        user.telegram_id,
        transition.next.as_str(),
        &transition.draft.to_json(),
    )
    .await?;

    for effect in &transition.effects {
        if let Err(e) = run_message_effect(app, chat_id, user, effect).await {
            warn!(user_id = %user.telegram_id, error = %e, "failed to deliver effect");
        }
    }

    Ok(())
}

async fn create_advertisement(
    app: &App,
    chat_id: ChatId,
    user: &User,
    draft: &SellDraft,
    transition: &Transition,
    receipt_path: &str,
) -> AppResult<()> {
    let language = user.language.as_str();

    let ad_id = match app.lifecycle.create(user.id, draft).await {
        Ok(ad_id) => ad_id,
        Err(e) => {
            // Draft and state survive; the user can resend the receipt
            warn!(user_id = %user.telegram_id, error = %e, "advertisement creation failed");
            send_text(app, chat_id, "ad-creation-error", Keyboard::None, language).await;
            return Ok(());
        }
    };

    match db::submit_payment_receipt(&app.pool, user.id, ad_id, receipt_path).await {
        Ok(true) => {}
        Ok(false) => warn!(user_id = %user.telegram_id, ad_id = %ad_id, "no pending payment to attach receipt to"),
        Err(e) => warn!(user_id = %user.telegram_id, error = %e, "failed to attach payment receipt"),
    }

    db::set_conversation(
        &app.pool,
        user.telegram_id,
        transition.next.as_str(),
        &transition.draft.to_json(),
    )
    .await?;

    info!(user_id = %user.telegram_id, ad_id = %ad_id, "advertisement submitted for moderation");
    send_text(
        app,
        chat_id,
        "ad-created-success",
        Keyboard::MainMenu,
        language,
    )
    .await;

    notify_moderators(app, ad_id).await;
    Ok(())
}

/// Forward a freshly created advertisement to the moderation chat
async fn notify_moderators(app: &App, ad_id: i64) {
    let Some(group_id) = app.config.bot.moderator_group_id else {
        return;
    };
    let card = match db::get_ad_card(&app.pool, ad_id).await {
        Ok(Some(card)) => card,
        Ok(None) => return,
        Err(e) => {
            warn!(ad_id = %ad_id, error = %e, "failed to load advertisement for moderation notice");
            return;
        }
    };

    let language = crate::localization::DEFAULT_LANGUAGE;
    let caption = format!(
        "{}\n\n{}",
        app.localization.t("moderation-new-ad", language),
        format_advertisement(&card, language, &app.localization)
    );
    let keyboard = keyboards::moderation(ad_id, &app.localization, language);

    let result = app
        .bot
        .send_photo(ChatId(group_id), InputFile::file(Path::new(&card.photo_path)))
        .caption(caption)
        .reply_markup(keyboard)
        .await;
    if let Err(e) = result {
        warn!(ad_id = %ad_id, error = %e, "failed to notify moderation chat");
    }
}

async fn run_message_effect(
    app: &App,
    chat_id: ChatId,
    user: &User,
    effect: &Effect,
) -> AppResult<()> {
    let language = user.language.as_str();
    match effect {
        Effect::Say { key, keyboard } => {
            send_text(app, chat_id, key, *keyboard, language).await;
        }
        Effect::ShowCategories { flow } => {
            let categories = db::list_categories(&app.pool).await?;
            if categories.is_empty() {
                send_text(app, chat_id, "no-categories", Keyboard::MainMenu, language).await;
                return Ok(());
            }
            let key = match flow {
                Flow::Sell => "select-category-sell",
                Flow::Buy => "select-category-buy",
            };
            app.bot
                .send_message(chat_id, app.localization.t(key, language))
                .reply_markup(keyboards::categories(
                    &categories,
                    &app.localization,
                    language,
                ))
                .await?;
        }
        Effect::ShowBrands { category_id } => {
            let brands = db::list_brands(&app.pool, *category_id).await?;
            if brands.is_empty() {
                send_text(app, chat_id, "no-brands", Keyboard::BackHome, language).await;
                return Ok(());
            }
            app.bot
                .send_message(chat_id, app.localization.t("select-brand", language))
                .reply_markup(keyboards::brands(&brands, &app.localization, language))
                .await?;
        }
        Effect::SearchListings {
            category_id,
            brand_id,
        } => {
            let filters = AdSearchFilters {
                category_id: Some(*category_id),
                brand_id: *brand_id,
                ..AdSearchFilters::default()
            };
            let results = app.lifecycle.search(&filters).await?;
            if results.is_empty() {
                send_text(app, chat_id, "no-ads-found", Keyboard::BackHome, language).await;
                return Ok(());
            }

            let header = app.localization.t_args(
                "found-ads",
                language,
                &[("count", results.len().to_string())],
            );
            if let Err(e) = app.bot.send_message(chat_id, header).await {
                warn!(error = %e, "failed to send search header");
            }
            for card in &results {
                let is_favorite = db::is_favorite(&app.pool, user.id, card.id)
                    .await
                    .unwrap_or(false);
                let keyboard =
                    keyboards::ad_actions(card.id, is_favorite, &app.localization, language);
                send_card(app, chat_id, card, language, Some(keyboard)).await;
            }
        }
        Effect::PaymentInstructions => {
            if let Err(e) =
                db::create_payment(&app.pool, user.id, app.config.payment.ad_price).await
            {
                warn!(user_id = %user.telegram_id, error = %e, "failed to open payment record");
            }

            // Drop the contact reply keyboard before the inline gate
            if let Err(e) = app
                .bot
                .send_message(chat_id, app.localization.t("phone-received", language))
                .reply_markup(ReplyMarkup::KeyboardRemove(KeyboardRemove::new()))
                .await
            {
                warn!(error = %e, "failed to acknowledge phone number");
            }

            let text = app.localization.t_args(
                "payment-instructions",
                language,
                &[
                    ("price", format_price(app.config.payment.ad_price)),
                    ("card", app.config.payment.payment_card.clone()),
                ],
            );
            app.bot
                .send_message(chat_id, text)
                .reply_markup(keyboards::payment_confirm(&app.localization, language))
                .await?;
        }
        Effect::CreateAdvertisement { .. } => {
            // Handled before persistence in `execute`
        }
    }
    Ok(())
}

/// Send a localized message, mapping the engine's keyboard tag to a real
/// markup. Transport errors are logged and swallowed.
pub async fn send_text(app: &App, chat_id: ChatId, key: &str, keyboard: Keyboard, language: &str) {
    let text = app.localization.t(key, language);
    let markup = match keyboard {
        Keyboard::None => None,
        Keyboard::BackHome => Some(ReplyMarkup::InlineKeyboard(keyboards::back_home(
            &app.localization,
            language,
        ))),
        Keyboard::Contact => Some(ReplyMarkup::Keyboard(keyboards::share_contact(
            &app.localization,
            language,
        ))),
        Keyboard::MainMenu => Some(ReplyMarkup::InlineKeyboard(keyboards::main_menu(
            &app.localization,
            language,
        ))),
        Keyboard::RemoveReply => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
    };

    let request = app.bot.send_message(chat_id, text);
    let result = match markup {
        Some(markup) => request.reply_markup(markup).await,
        None => request.await,
    };
    if let Err(e) = result {
        warn!(error = %e, key = %key, "failed to send message");
    }
}

/// Send an advertisement card as a photo with caption; falls back to a
/// plain text message when the stored photo is gone
pub async fn send_card(
    app: &App,
    chat_id: ChatId,
    card: &AdCard,
    language: &str,
    keyboard: Option<teloxide::types::InlineKeyboardMarkup>,
) {
    let caption = format_advertisement(card, language, &app.localization);

    let result: Result<(), AppError> = if Path::new(&card.photo_path).exists() {
        let request = app
            .bot
            .send_photo(chat_id, InputFile::file(Path::new(&card.photo_path)))
            .caption(caption.clone());
        let outcome = match keyboard.clone() {
            Some(markup) => request.reply_markup(markup).await,
            None => request.await,
        };
        outcome.map(|_| ()).map_err(AppError::from)
    } else {
        Err(AppError::NotFound("photo file missing".to_string()))
    };

    if result.is_err() {
        let request = app.bot.send_message(chat_id, caption);
        let outcome = match keyboard {
            Some(markup) => request.reply_markup(markup).await,
            None => request.await,
        };
        if let Err(e) = outcome {
            warn!(ad_id = %card.id, error = %e, "failed to send advertisement card");
        }
    }
}
