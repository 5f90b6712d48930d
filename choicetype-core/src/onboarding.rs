use serde::{Deserialize, Serialize};

use crate::data::CatalogError;

const ONBOARDING_JSON: &str = include_str!("../assets/data/onboarding.json");

/// One introductory slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub subtitle: String,
    /// Button label
    pub cta: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDeck {
    slides: Vec<Slide>,
}

impl SlideDeck {
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or has no slides.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let deck: Self = serde_json::from_str(json)?;
        if deck.slides.is_empty() {
            return Err(CatalogError::Empty("onboarding"));
        }
        Ok(deck)
    }

    /// # Errors
    ///
    /// Returns an error if the embedded asset is malformed.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(ONBOARDING_JSON)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slide> {
        self.slides.iter()
    }
}

/// Result of advancing the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Slide(usize),
    Complete,
}

/// Cursor over the slide deck. Shown on every launch; nothing is persisted.
#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    deck: SlideDeck,
    index: usize,
    complete: bool,
}

impl OnboardingFlow {
    #[must_use]
    pub const fn new(deck: SlideDeck) -> Self {
        Self {
            deck,
            index: 0,
            complete: false,
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Slide> {
        if self.complete {
            None
        } else {
            self.deck.slides.get(self.index)
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn next(&mut self) -> OnboardingStep {
        if !self.complete && self.index + 1 < self.deck.len() {
            self.index += 1;
            OnboardingStep::Slide(self.index)
        } else {
            self.complete = true;
            OnboardingStep::Complete
        }
    }

    pub fn skip(&mut self) -> OnboardingStep {
        self.complete = true;
        OnboardingStep::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_every_slide_then_completes() {
        let mut flow = OnboardingFlow::new(SlideDeck::load_from_static().unwrap());
        assert_eq!(flow.current().unwrap().title, "Meet Max");
        assert_eq!(flow.next(), OnboardingStep::Slide(1));
        assert_eq!(flow.next(), OnboardingStep::Slide(2));
        assert_eq!(flow.next(), OnboardingStep::Slide(3));
        assert!(!flow.is_complete());
        assert_eq!(flow.next(), OnboardingStep::Complete);
        assert!(flow.current().is_none());
        assert_eq!(flow.next(), OnboardingStep::Complete);
    }

    #[test]
    fn skip_completes_immediately() {
        let mut flow = OnboardingFlow::new(SlideDeck::load_from_static().unwrap());
        assert_eq!(flow.skip(), OnboardingStep::Complete);
        assert!(flow.is_complete());
        assert_eq!(flow.index(), 0);
    }

    #[test]
    fn empty_deck_is_rejected() {
        assert!(SlideDeck::from_json(r#"{ "slides": [] }"#).is_err());
    }
}
