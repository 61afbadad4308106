//! Shared scenario state
//!
//! Values produced by one step and consumed by a later step of the same
//! scenario. Slots are typed keys; reading a slot nothing has written is an
//! error naming the slot, never a default value.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use crate::api::models::Product;
use crate::error::{E2eError, E2eResult};

/// A named, typed value holder
pub struct Slot<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Slot<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.name).finish()
    }
}

/// Failure outcome of an API call that a later step inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiFailure {
    pub fn from_error(err: &E2eError) -> Self {
        Self {
            status: err.http_status(),
            message: err.to_string(),
        }
    }
}

pub const SEARCH_TERM: Slot<String> = Slot::new("searchTerm");
pub const SELECTED_PRODUCT_NAME: Slot<String> = Slot::new("selectedProductName");
pub const PRODUCT_ID: Slot<String> = Slot::new("productId");
pub const STORED_PRODUCT: Slot<Product> = Slot::new("storedProduct");
pub const LAST_RESPONSE: Slot<Value> = Slot::new("lastResponse");
pub const LAST_STATUS: Slot<u16> = Slot::new("lastStatus");
pub const LAST_ERROR: Slot<ApiFailure> = Slot::new("lastError");
pub const CAPTURED_ITEMS: Slot<Vec<Product>> = Slot::new("capturedItems");
pub const CART_ITEMS: Slot<usize> = Slot::new("cartItems");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePhase {
    /// Nothing written since the last clear
    Fresh,
    /// At least one slot written
    Populated,
}

/// Per-scenario key space of named slots
#[derive(Default)]
pub struct ScenarioState {
    slots: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl ScenarioState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a slot, replacing any previous value
    pub fn set<T: Send + Sync + 'static>(&mut self, slot: Slot<T>, value: T) {
        self.slots.insert(slot.name, Box::new(value));
    }

    /// Read a slot written earlier in this scenario
    pub fn get<T: 'static>(&self, slot: Slot<T>) -> E2eResult<&T> {
        self.slots
            .get(slot.name)
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or(E2eError::SlotNotSet { slot: slot.name })
    }

    pub fn get_mut<T: 'static>(&mut self, slot: Slot<T>) -> E2eResult<&mut T> {
        self.slots
            .get_mut(slot.name)
            .and_then(|value| value.downcast_mut::<T>())
            .ok_or(E2eError::SlotNotSet { slot: slot.name })
    }

    /// Remove a slot and return its value
    pub fn take<T: 'static>(&mut self, slot: Slot<T>) -> E2eResult<T> {
        match self.slots.remove(slot.name) {
            Some(value) => value
                .downcast::<T>()
                .map(|v| *v)
                .map_err(|_| E2eError::SlotNotSet { slot: slot.name }),
            None => Err(E2eError::SlotNotSet { slot: slot.name }),
        }
    }

    pub fn contains<T: 'static>(&self, slot: Slot<T>) -> bool {
        self.slots
            .get(slot.name)
            .is_some_and(|value| value.is::<T>())
    }

    /// Wipe every slot
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn phase(&self) -> StatePhase {
        if self.slots.is_empty() {
            StatePhase::Fresh
        } else {
            StatePhase::Populated
        }
    }

    /// Names of the populated slots, sorted
    pub fn slot_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioState")
            .field("slots", &self.slot_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_before_set_names_the_slot() {
        let state = ScenarioState::new();
        match state.get(PRODUCT_ID) {
            Err(E2eError::SlotNotSet { slot }) => assert_eq!(slot, "productId"),
            other => panic!("expected SlotNotSet, got {:?}", other),
        }
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let mut state = ScenarioState::new();
        state.set(PRODUCT_ID, "42".to_string());
        assert_eq!(state.get(PRODUCT_ID).unwrap(), "42");
    }

    #[test]
    fn test_set_overwrites() {
        let mut state = ScenarioState::new();
        state.set(SEARCH_TERM, "pliers".to_string());
        state.set(SEARCH_TERM, "hammer".to_string());
        assert_eq!(state.get(SEARCH_TERM).unwrap(), "hammer");
    }

    #[test]
    fn test_clear_unsets_every_populated_slot() {
        let mut state = ScenarioState::new();
        state.set(PRODUCT_ID, "01HX".to_string());
        state.set(LAST_STATUS, 200);
        state.set(CART_ITEMS, 2);
        assert_eq!(state.phase(), StatePhase::Populated);

        state.clear();

        assert_eq!(state.phase(), StatePhase::Fresh);
        assert!(state.get(PRODUCT_ID).is_err());
        assert!(state.get(LAST_STATUS).is_err());
        assert!(state.get(CART_ITEMS).is_err());
    }

    #[test]
    fn test_empty_value_is_not_absent() {
        let mut state = ScenarioState::new();
        state.set(CAPTURED_ITEMS, Vec::new());
        assert!(state.get(CAPTURED_ITEMS).unwrap().is_empty());
        assert!(state.contains(CAPTURED_ITEMS));
    }

    #[test]
    fn test_take_and_get_mut() {
        let mut state = ScenarioState::new();
        state.set(CART_ITEMS, 1);
        *state.get_mut(CART_ITEMS).unwrap() += 1;
        assert_eq!(state.take(CART_ITEMS).unwrap(), 2);
        assert!(!state.contains(CART_ITEMS));
        assert!(state.take(CART_ITEMS).is_err());
    }

    #[test]
    fn test_slot_names_are_sorted() {
        let mut state = ScenarioState::new();
        state.set(SEARCH_TERM, "saw".to_string());
        state.set(LAST_STATUS, 404);
        assert_eq!(state.slot_names(), vec!["lastStatus", "searchTerm"]);
    }
}
