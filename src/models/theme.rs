//! Theme snapshot as supplied by the card catalog at enrollment time.
use super::CardId;
use serde::{Deserialize, Serialize};

/// Catalog card. Only text is used on the front and back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCard {
    pub id: CardId,
    pub front: String,
    pub back: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeSnapshot {
    pub id: i64,
    pub name: String,
    pub cards: Vec<CatalogCard>,
}

impl ThemeSnapshot {
    pub fn card_ids(&self) -> Vec<CardId> {
        self.cards.iter().map(|card| card.id).collect()
    }

    pub fn card(&self, card_id: CardId) -> Option<&CatalogCard> {
        self.cards.iter().find(|card| card.id == card_id)
    }
}

/// A theme the user has at least one card under review in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeProgress {
    pub theme_id: i64,
    pub reviewed_cards: usize,
    pub total_cards: usize,
}

impl ThemeProgress {
    pub fn is_complete(&self) -> bool {
        self.reviewed_cards == self.total_cards
    }
}
