//! # Workflow Engine
//!
//! The conversational state machine behind ad creation and browsing. This
//! module is pure: `transition` maps (state, draft, event) to a next state,
//! an updated draft and a list of outbound effects, and never touches the
//! database or the network. The executor in `bot` interprets the effects.
//!
//! Global navigation (`home`, `back`, `/start`) short-circuits every state.
//! `back` is deliberately coarse: from any linear sell step it jumps to the
//! brand list of the stored category, the start of the sell flow, not one
//! field back.

use crate::dialogue::{ChatState, Flow, SellDraft};
use tracing::warn;

/// Inbound event, already classified by the dispatcher. Photos arrive with
/// the local path of the downloaded file.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Command(String),
    Text(String),
    Photo(String),
    Contact(String),
    ButtonPress(String),
}

/// Which reply/inline keyboard accompanies a message effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    None,
    /// Inline back/home navigation row
    BackHome,
    /// Reply keyboard with a share-contact button
    Contact,
    /// Main menu inline keyboard
    MainMenu,
    /// Removes any lingering reply keyboard
    RemoveReply,
}

/// Outbound effect ordered by the engine, executed by the bot layer
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a localized message identified by its catalog key
    Say { key: &'static str, keyboard: Keyboard },
    /// Render the category list for the given flow
    ShowCategories { flow: Flow },
    /// Render the brand list for a category
    ShowBrands { category_id: i64 },
    /// Run a buy search and render result cards
    SearchListings {
        category_id: i64,
        brand_id: Option<i64>,
    },
    /// Open a payment record and send the fee instructions
    PaymentInstructions,
    /// Validate and persist the finished draft as a pending advertisement
    CreateAdvertisement { receipt_path: String },
}

/// Result of a transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ChatState,
    pub draft: SellDraft,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: ChatState, draft: SellDraft, effects: Vec<Effect>) -> Self {
        Transition {
            next: state,
            draft,
            effects,
        }
    }

    fn goto(next: ChatState, draft: SellDraft, effects: Vec<Effect>) -> Self {
        Transition {
            next,
            draft,
            effects,
        }
    }
}

/// Parse a user-entered price. Thousands separators written as spaces or
/// commas are stripped; the result must be strictly positive. The domain
/// maximum is enforced at submission, not here.
pub fn parse_price(text: &str) -> Result<i64, ()> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != ',')
        .collect();
    match cleaned.parse::<i64>() {
        Ok(price) if price > 0 => Ok(price),
        _ => Err(()),
    }
}

fn main_menu(draft_flow_reset: bool, draft: SellDraft) -> Transition {
    let draft = if draft_flow_reset {
        SellDraft::default()
    } else {
        draft
    };
    Transition::goto(
        ChatState::Start,
        draft,
        vec![Effect::Say {
            key: "main-menu",
            keyboard: Keyboard::MainMenu,
        }],
    )
}

/// Inverse navigation for the `back` token. Coarse by contract: every
/// sell-flow step jumps back to the start of the flow, a fresh category
/// pick, dropping everything collected so far.
fn back_transition(state: ChatState, draft: SellDraft) -> Transition {
    match state {
        ChatState::SellSelectCategory | ChatState::BuySelectCategory => {
            main_menu(true, draft)
        }
        state if state.is_sell_flow() => {
            let flow = draft.flow;
            let next = match flow {
                Flow::Sell => ChatState::SellSelectCategory,
                Flow::Buy => ChatState::BuySelectCategory,
            };
            Transition::goto(
                next,
                SellDraft {
                    flow,
                    ..SellDraft::default()
                },
                vec![Effect::ShowCategories { flow }],
            )
        }
        _ => main_menu(true, draft),
    }
}

/// Compute the next state, draft and effects for an inbound event
pub fn transition(state: ChatState, draft: SellDraft, event: &Event) -> Transition {
    // Global overrides first
    match event {
        Event::Command(name) if name == "start" => {
            return Transition::goto(
                ChatState::Start,
                SellDraft::default(),
                vec![Effect::Say {
                    key: "welcome",
                    keyboard: Keyboard::MainMenu,
                }],
            );
        }
        Event::ButtonPress(token) if token == "home" => {
            return main_menu(true, draft);
        }
        Event::ButtonPress(token) if token == "back" => {
            return back_transition(state, draft);
        }
        _ => {}
    }

    match state {
        ChatState::Start => start_transition(draft, event),
        ChatState::SellSelectCategory => select_category(draft, event, Flow::Sell),
        ChatState::BuySelectCategory => select_category(draft, event, Flow::Buy),
        ChatState::SellSelectBrand => select_brand(draft, event),
        ChatState::SellEnterModel => enter_model(draft, event),
        ChatState::SellEnterPrice => enter_price(draft, event),
        ChatState::SellEnterDescription => enter_description(draft, event),
        ChatState::SellEnterCity => enter_city(draft, event),
        ChatState::SellWaitingPhoto => waiting_photo(draft, event),
        ChatState::SellWaitingPhone => waiting_phone(draft, event),
        ChatState::WaitingPayment => waiting_payment(draft, event),
        ChatState::WaitingReceipt => waiting_receipt(draft, event),
        ChatState::BuyViewing => main_menu(true, draft),
    }
}

fn start_transition(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::ButtonPress(token) if token == "sell" => Transition::goto(
            ChatState::SellSelectCategory,
            SellDraft {
                flow: Flow::Sell,
                ..SellDraft::default()
            },
            vec![Effect::ShowCategories { flow: Flow::Sell }],
        ),
        Event::ButtonPress(token) if token == "buy" => Transition::goto(
            ChatState::BuySelectCategory,
            SellDraft {
                flow: Flow::Buy,
                ..SellDraft::default()
            },
            vec![Effect::ShowCategories { flow: Flow::Buy }],
        ),
        Event::ButtonPress(token) => {
            warn!(token = %token, "unrecognized button token at main menu");
            Transition::stay(ChatState::Start, draft, vec![])
        }
        _ => main_menu(false, draft),
    }
}

fn select_category(draft: SellDraft, event: &Event, flow: Flow) -> Transition {
    let state = match flow {
        Flow::Sell => ChatState::SellSelectCategory,
        Flow::Buy => ChatState::BuySelectCategory,
    };
    match event {
        Event::ButtonPress(token) => match parse_id_token(token, "category") {
            Some(category_id) => Transition::goto(
                ChatState::SellSelectBrand,
                SellDraft {
                    flow,
                    category_id: Some(category_id),
                    ..SellDraft::default()
                },
                vec![Effect::ShowBrands { category_id }],
            ),
            None => {
                warn!(token = %token, "unrecognized button token at category selection");
                Transition::stay(state, draft, vec![])
            }
        },
        // Anything else re-shows the list, idempotently
        _ => Transition::stay(state, draft, vec![Effect::ShowCategories { flow }]),
    }
}

fn select_brand(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::ButtonPress(token) => match parse_id_token(token, "brand") {
            Some(brand_id) => match draft.flow {
                Flow::Sell => Transition::goto(
                    ChatState::SellEnterModel,
                    SellDraft {
                        brand_id: Some(brand_id),
                        ..draft
                    },
                    vec![Effect::Say {
                        key: "enter-model",
                        keyboard: Keyboard::BackHome,
                    }],
                ),
                // Buy branch: a brand pick is a search, not a workflow step
                Flow::Buy => {
                    let category_id = draft.category_id.unwrap_or_default();
                    Transition::goto(
                        ChatState::BuyViewing,
                        SellDraft {
                            brand_id: Some(brand_id),
                            ..draft
                        },
                        vec![Effect::SearchListings {
                            category_id,
                            brand_id: Some(brand_id),
                        }],
                    )
                }
            },
            None => {
                warn!(token = %token, "unrecognized button token at brand selection");
                Transition::stay(ChatState::SellSelectBrand, draft, vec![])
            }
        },
        _ => {
            let effects = match draft.category_id {
                Some(category_id) => vec![Effect::ShowBrands { category_id }],
                None => vec![Effect::ShowCategories { flow: draft.flow }],
            };
            Transition::stay(ChatState::SellSelectBrand, draft, effects)
        }
    }
}

fn enter_model(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::Text(text) if !text.trim().is_empty() => Transition::goto(
            ChatState::SellEnterPrice,
            SellDraft {
                model: Some(text.clone()),
                ..draft
            },
            vec![Effect::Say {
                key: "enter-price",
                keyboard: Keyboard::BackHome,
            }],
        ),
        _ => Transition::stay(
            ChatState::SellEnterModel,
            draft,
            vec![Effect::Say {
                key: "enter-model",
                keyboard: Keyboard::BackHome,
            }],
        ),
    }
}

fn enter_price(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::Text(text) => match parse_price(text) {
            Ok(price) => Transition::goto(
                ChatState::SellEnterDescription,
                SellDraft {
                    price: Some(price),
                    ..draft
                },
                vec![Effect::Say {
                    key: "enter-description",
                    keyboard: Keyboard::BackHome,
                }],
            ),
            Err(()) => Transition::stay(
                ChatState::SellEnterPrice,
                draft,
                vec![Effect::Say {
                    key: "invalid-price",
                    keyboard: Keyboard::BackHome,
                }],
            ),
        },
        _ => Transition::stay(
            ChatState::SellEnterPrice,
            draft,
            vec![Effect::Say {
                key: "enter-price",
                keyboard: Keyboard::BackHome,
            }],
        ),
    }
}

fn enter_description(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::Text(text) if text.trim().chars().count() >= 10 => Transition::goto(
            ChatState::SellEnterCity,
            SellDraft {
                description: Some(text.trim().to_string()),
                ..draft
            },
            vec![Effect::Say {
                key: "enter-city",
                keyboard: Keyboard::BackHome,
            }],
        ),
        Event::Text(_) => Transition::stay(
            ChatState::SellEnterDescription,
            draft,
            vec![Effect::Say {
                key: "description-too-short",
                keyboard: Keyboard::BackHome,
            }],
        ),
        _ => Transition::stay(
            ChatState::SellEnterDescription,
            draft,
            vec![Effect::Say {
                key: "enter-description",
                keyboard: Keyboard::BackHome,
            }],
        ),
    }
}

fn enter_city(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::Text(text) if text.trim().chars().count() >= 2 => Transition::goto(
            ChatState::SellWaitingPhoto,
            SellDraft {
                city: Some(text.trim().to_string()),
                ..draft
            },
            vec![Effect::Say {
                key: "send-photo",
                keyboard: Keyboard::BackHome,
            }],
        ),
        Event::Text(_) => Transition::stay(
            ChatState::SellEnterCity,
            draft,
            vec![Effect::Say {
                key: "city-too-short",
                keyboard: Keyboard::BackHome,
            }],
        ),
        _ => Transition::stay(
            ChatState::SellEnterCity,
            draft,
            vec![Effect::Say {
                key: "enter-city",
                keyboard: Keyboard::BackHome,
            }],
        ),
    }
}

fn waiting_photo(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::Photo(path) => Transition::goto(
            ChatState::SellWaitingPhone,
            SellDraft {
                photo_path: Some(path.clone()),
                ..draft
            },
            vec![Effect::Say {
                key: "send-phone",
                keyboard: Keyboard::Contact,
            }],
        ),
        _ => Transition::stay(
            ChatState::SellWaitingPhoto,
            draft,
            vec![Effect::Say {
                key: "photo-reminder",
                keyboard: Keyboard::BackHome,
            }],
        ),
    }
}

fn waiting_phone(draft: SellDraft, event: &Event) -> Transition {
    let phone = match event {
        Event::Contact(number) => Some(number.clone()),
        Event::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    };
    match phone {
        Some(phone) => Transition::goto(
            ChatState::WaitingPayment,
            SellDraft {
                phone: Some(phone),
                ..draft
            },
            vec![Effect::PaymentInstructions],
        ),
        None => Transition::stay(
            ChatState::SellWaitingPhone,
            draft,
            vec![Effect::Say {
                key: "send-phone",
                keyboard: Keyboard::Contact,
            }],
        ),
    }
}

fn waiting_payment(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::ButtonPress(token) if token == "payment_confirmed" => Transition::goto(
            ChatState::WaitingReceipt,
            draft,
            vec![Effect::Say {
                key: "send-receipt",
                keyboard: Keyboard::None,
            }],
        ),
        // Deliberate low-friction gate: everything else is silently ignored
        _ => Transition::stay(ChatState::WaitingPayment, draft, vec![]),
    }
}

fn waiting_receipt(draft: SellDraft, event: &Event) -> Transition {
    match event {
        Event::Photo(path) => Transition::goto(
            ChatState::Start,
            SellDraft::default(),
            vec![Effect::CreateAdvertisement {
                receipt_path: path.clone(),
            }],
        ),
        _ => Transition::stay(
            ChatState::WaitingReceipt,
            draft,
            vec![Effect::Say {
                key: "send-receipt",
                keyboard: Keyboard::None,
            }],
        ),
    }
}

fn parse_id_token(token: &str, prefix: &str) -> Option<i64> {
    let rest = token.strip_prefix(prefix)?.strip_prefix(':')?;
    rest.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_strips_separators() {
        assert_eq!(parse_price("12,000,000"), Ok(12_000_000));
        assert_eq!(parse_price("12 000 000"), Ok(12_000_000));
        assert_eq!(parse_price("  4500 "), Ok(4500));
    }

    #[test]
    fn test_parse_price_rejects_non_positive_and_garbage() {
        assert_eq!(parse_price("0"), Err(()));
        assert_eq!(parse_price("-5"), Err(()));
        assert_eq!(parse_price("cheap"), Err(()));
        assert_eq!(parse_price(""), Err(()));
    }

    #[test]
    fn test_home_resets_from_any_state() {
        let draft = SellDraft {
            category_id: Some(3),
            model: Some("A52".to_string()),
            ..SellDraft::default()
        };
        let t = transition(
            ChatState::SellEnterPrice,
            draft,
            &Event::ButtonPress("home".to_string()),
        );
        assert_eq!(t.next, ChatState::Start);
        assert_eq!(t.draft, SellDraft::default());
    }

    #[test]
    fn test_back_from_linear_state_returns_to_category_selection() {
        let draft = SellDraft {
            category_id: Some(3),
            brand_id: Some(7),
            model: Some("A52".to_string()),
            price: Some(100),
            ..SellDraft::default()
        };
        let t = transition(
            ChatState::SellEnterDescription,
            draft,
            &Event::ButtonPress("back".to_string()),
        );
        assert_eq!(t.next, ChatState::SellSelectCategory);
        assert_eq!(t.draft.category_id, None);
        assert_eq!(t.draft.brand_id, None);
        assert_eq!(t.draft.model, None);
        assert_eq!(t.effects, vec![Effect::ShowCategories { flow: Flow::Sell }]);
    }

    #[test]
    fn test_category_selection_is_idempotent_on_noise() {
        let t = transition(
            ChatState::SellSelectCategory,
            SellDraft::default(),
            &Event::Text("hello".to_string()),
        );
        assert_eq!(t.next, ChatState::SellSelectCategory);
        assert_eq!(t.effects, vec![Effect::ShowCategories { flow: Flow::Sell }]);
    }

    #[test]
    fn test_payment_gate_ignores_everything_but_confirmation() {
        let draft = SellDraft {
            phone: Some("+998901234567".to_string()),
            ..SellDraft::default()
        };
        let t = transition(
            ChatState::WaitingPayment,
            draft.clone(),
            &Event::Text("done".to_string()),
        );
        assert_eq!(t.next, ChatState::WaitingPayment);
        assert!(t.effects.is_empty());

        let t = transition(
            ChatState::WaitingPayment,
            draft,
            &Event::ButtonPress("payment_confirmed".to_string()),
        );
        assert_eq!(t.next, ChatState::WaitingReceipt);
    }

    #[test]
    fn test_buy_brand_press_triggers_search() {
        let draft = SellDraft {
            flow: Flow::Buy,
            category_id: Some(2),
            ..SellDraft::default()
        };
        let t = transition(
            ChatState::SellSelectBrand,
            draft,
            &Event::ButtonPress("brand:9".to_string()),
        );
        assert_eq!(t.next, ChatState::BuyViewing);
        assert_eq!(
            t.effects,
            vec![Effect::SearchListings {
                category_id: 2,
                brand_id: Some(9),
            }]
        );
    }

    #[test]
    fn test_unknown_token_is_silent_noop() {
        let t = transition(
            ChatState::SellSelectBrand,
            SellDraft::default(),
            &Event::ButtonPress("frobnicate:1".to_string()),
        );
        assert_eq!(t.next, ChatState::SellSelectBrand);
        assert!(t.effects.is_empty());
    }
}
