//! # Conversation State
//!
//! Closed set of conversation states plus the accumulating ad draft. Both
//! are persisted per user (state as a short string column, draft as JSON)
//! so a restarted process resumes every conversation where it left off.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where a user currently is in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    /// Main menu / no active flow
    #[default]
    Start,
    /// Picking a category to sell in
    SellSelectCategory,
    /// Picking a brand within the chosen category (sell and buy flows)
    SellSelectBrand,
    SellEnterModel,
    SellEnterPrice,
    SellEnterDescription,
    SellEnterCity,
    SellWaitingPhoto,
    SellWaitingPhone,
    /// Draft complete, waiting for the user to confirm the listing fee
    WaitingPayment,
    /// Waiting for the payment receipt photo
    WaitingReceipt,
    /// Picking a category to browse
    BuySelectCategory,
    /// Browsing search results
    BuyViewing,
}

impl ChatState {
    /// Stable string form used as the persisted column value
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatState::Start => "start",
            ChatState::SellSelectCategory => "sell_select_category",
            ChatState::SellSelectBrand => "sell_select_brand",
            ChatState::SellEnterModel => "sell_enter_model",
            ChatState::SellEnterPrice => "sell_enter_price",
            ChatState::SellEnterDescription => "sell_enter_description",
            ChatState::SellEnterCity => "sell_enter_city",
            ChatState::SellWaitingPhoto => "sell_waiting_photo",
            ChatState::SellWaitingPhone => "sell_waiting_phone",
            ChatState::WaitingPayment => "waiting_payment",
            ChatState::WaitingReceipt => "waiting_receipt",
            ChatState::BuySelectCategory => "buy_select_category",
            ChatState::BuyViewing => "buy_viewing",
        }
    }

    /// Parse a persisted state string. Unknown values (e.g. left over from
    /// an older release) reset the conversation to the main menu.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "start" => ChatState::Start,
            "sell_select_category" => ChatState::SellSelectCategory,
            "sell_select_brand" => ChatState::SellSelectBrand,
            "sell_enter_model" => ChatState::SellEnterModel,
            "sell_enter_price" => ChatState::SellEnterPrice,
            "sell_enter_description" => ChatState::SellEnterDescription,
            "sell_enter_city" => ChatState::SellEnterCity,
            "sell_waiting_photo" => ChatState::SellWaitingPhoto,
            "sell_waiting_phone" => ChatState::SellWaitingPhone,
            "waiting_payment" => ChatState::WaitingPayment,
            "waiting_receipt" => ChatState::WaitingReceipt,
            "buy_select_category" => ChatState::BuySelectCategory,
            "buy_viewing" => ChatState::BuyViewing,
            other => {
                warn!(state = %other, "unknown persisted chat state, resetting to start");
                ChatState::Start
            }
        }
    }

    /// States belonging to the linear part of the sell flow, in order
    pub fn is_sell_flow(&self) -> bool {
        matches!(
            self,
            ChatState::SellSelectCategory
                | ChatState::SellSelectBrand
                | ChatState::SellEnterModel
                | ChatState::SellEnterPrice
                | ChatState::SellEnterDescription
                | ChatState::SellEnterCity
                | ChatState::SellWaitingPhoto
                | ChatState::SellWaitingPhone
        )
    }
}

/// Which flow the user entered brand selection from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    #[default]
    Sell,
    Buy,
}

/// The ad being assembled across the sell flow. Fields fill in one per
/// state; `flow` distinguishes a buyer passing through brand selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SellDraft {
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl SellDraft {
    /// Deserialize a persisted draft. Corrupt or missing JSON yields an
    /// empty draft rather than wedging the conversation.
    pub fn from_json(raw: Option<&str>) -> Self {
        match raw {
            Some(json) if !json.trim().is_empty() => match serde_json::from_str(json) {
                Ok(draft) => draft,
                Err(e) => {
                    warn!(error = %e, "failed to parse persisted draft, starting fresh");
                    SellDraft::default()
                }
            },
            _ => SellDraft::default(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_string_form() {
        let states = [
            ChatState::Start,
            ChatState::SellSelectCategory,
            ChatState::SellSelectBrand,
            ChatState::SellEnterModel,
            ChatState::SellEnterPrice,
            ChatState::SellEnterDescription,
            ChatState::SellEnterCity,
            ChatState::SellWaitingPhoto,
            ChatState::SellWaitingPhone,
            ChatState::WaitingPayment,
            ChatState::WaitingReceipt,
            ChatState::BuySelectCategory,
            ChatState::BuyViewing,
        ];
        for state in states {
            assert_eq!(ChatState::parse(state.as_str()), state);
        }
    }

    #[test]
    fn test_unknown_state_resets_to_start() {
        assert_eq!(ChatState::parse("awaiting_ocr"), ChatState::Start);
    }

    #[test]
    fn test_corrupt_draft_yields_empty() {
        let draft = SellDraft::from_json(Some("{not json"));
        assert_eq!(draft, SellDraft::default());
    }

    #[test]
    fn test_partial_draft_fills_defaults() {
        let draft = SellDraft::from_json(Some(r#"{"category_id": 3, "model": "A52"}"#));
        assert_eq!(draft.category_id, Some(3));
        assert_eq!(draft.model.as_deref(), Some("A52"));
        assert_eq!(draft.price, None);
        assert_eq!(draft.flow, Flow::Sell);
    }
}
