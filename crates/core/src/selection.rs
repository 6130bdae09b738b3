//! Modifier selection rules.
//!
//! [`SelectionState`] holds the raw group → options map and enforces the
//! per-group rules:
//!
//! - `single` groups behave like radio buttons that can be un-clicked:
//!   choosing a new option replaces the old one, choosing the current option
//!   clears the group.
//! - `multi` groups toggle membership. Once `max_selections` is reached,
//!   further additions are ignored without error.
//! - A group whose last option is removed disappears from the map.
//!
//! [`ModifierSelector`] wraps the state together with the product's groups
//! and reports every change through a callback, which is its only output.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::catalog::{ChosenCustomization, ModifierGroup, SelectionType};
use crate::types::{ModifierGroupId, ModifierOptionId};

/// Errors raised when a selection refers to something the product does not
/// offer, or when a replayed selection breaks the group rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("modifier group {0} does not belong to this product")]
    UnknownGroup(ModifierGroupId),

    #[error("option {option} is not part of modifier group {group}")]
    UnknownOption {
        group: ModifierGroupId,
        option: ModifierOptionId,
    },

    #[error("{0} is currently unavailable")]
    Unavailable(String),

    #[error("option {option} was chosen more than once in modifier group {group}")]
    DuplicateOption {
        group: ModifierGroupId,
        option: ModifierOptionId,
    },

    #[error("{group} allows at most {limit} selection(s)")]
    TooManySelections { group: String, limit: u32 },

    #[error("please make a selection for: {}", .0.join(", "))]
    Incomplete(Vec<String>),
}

// =============================================================================
// SelectionState
// =============================================================================

/// Chosen option ids per modifier group.
///
/// Never holds an empty set: a group is either absent or has at least one
/// chosen option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    chosen: BTreeMap<ModifierGroupId, BTreeSet<ModifierOptionId>>,
}

impl SelectionState {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is selected in any group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    /// Number of options chosen in a group.
    #[must_use]
    pub fn count(&self, group: ModifierGroupId) -> usize {
        self.chosen.get(&group).map_or(0, BTreeSet::len)
    }

    /// Whether an option is currently chosen.
    #[must_use]
    pub fn is_selected(&self, group: ModifierGroupId, option: ModifierOptionId) -> bool {
        self.chosen
            .get(&group)
            .is_some_and(|set| set.contains(&option))
    }

    /// Groups that have at least one chosen option.
    pub fn groups(&self) -> impl Iterator<Item = ModifierGroupId> + '_ {
        self.chosen.keys().copied()
    }

    /// Chosen options of one group, in id order.
    pub fn options(&self, group: ModifierGroupId) -> impl Iterator<Item = ModifierOptionId> + '_ {
        self.chosen.get(&group).into_iter().flatten().copied()
    }

    /// Apply a click on `option` within `group`.
    ///
    /// Returns `true` if the selection changed. The caller is responsible for
    /// checking that the option belongs to the group.
    pub fn toggle(&mut self, group: &ModifierGroup, option: ModifierOptionId) -> bool {
        match group.selection_type {
            SelectionType::Single => {
                if self.is_selected(group.id, option) {
                    self.chosen.remove(&group.id);
                } else {
                    self.chosen.insert(group.id, BTreeSet::from([option]));
                }
                true
            }
            SelectionType::Multi => {
                if let Some(set) = self.chosen.get_mut(&group.id)
                    && set.remove(&option)
                {
                    if set.is_empty() {
                        self.chosen.remove(&group.id);
                    }
                    return true;
                }

                let count = self.count(group.id);
                let at_limit = group
                    .max_selections
                    .is_some_and(|max| usize::try_from(max).is_ok_and(|max| count >= max));
                if at_limit {
                    return false;
                }

                self.chosen.entry(group.id).or_default().insert(option);
                true
            }
        }
    }

    /// Flatten the selection into customizations, in the display order of
    /// `groups` and their options.
    #[must_use]
    pub fn customizations(&self, groups: &[ModifierGroup]) -> Vec<ChosenCustomization> {
        groups
            .iter()
            .filter(|group| self.count(group.id) > 0)
            .flat_map(|group| {
                group
                    .options
                    .iter()
                    .filter(|option| self.is_selected(group.id, option.id))
                    .map(|option| ChosenCustomization {
                        group_id: group.id,
                        group_name: group.name.clone(),
                        option_id: option.id,
                        option_name: option.name.clone(),
                        price_adjustment: option.price_adjustment,
                    })
            })
            .collect()
    }
}

/// Signed sum of the price deltas of a set of customizations.
#[must_use]
pub fn price_delta(customizations: &[ChosenCustomization]) -> Decimal {
    customizations.iter().map(|c| c.price_adjustment).sum()
}

// =============================================================================
// ModifierSelector
// =============================================================================

/// Interactive modifier selector for one product.
///
/// Every change to the selection recomputes the chosen customizations and
/// their price delta and passes both to `on_change`. Clicks that leave the
/// selection unchanged (a full `multi` group) do not fire the callback.
pub struct ModifierSelector<F>
where
    F: FnMut(&[ChosenCustomization], Decimal),
{
    groups: Vec<ModifierGroup>,
    state: SelectionState,
    on_change: F,
}

impl<F> ModifierSelector<F>
where
    F: FnMut(&[ChosenCustomization], Decimal),
{
    /// Create a selector with nothing selected.
    ///
    /// `groups` are used in the order given; pass them through
    /// [`crate::catalog::customer_facing_groups`] first for shoppers.
    pub fn new(groups: Vec<ModifierGroup>, on_change: F) -> Self {
        Self {
            groups,
            state: SelectionState::new(),
            on_change,
        }
    }

    /// The groups this selector offers.
    #[must_use]
    pub fn groups(&self) -> &[ModifierGroup] {
        &self.groups
    }

    /// Click an option.
    ///
    /// Returns whether the selection changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the group or option is not offered, or the option
    /// is unavailable.
    pub fn toggle(
        &mut self,
        group_id: ModifierGroupId,
        option_id: ModifierOptionId,
    ) -> Result<bool, SelectionError> {
        let group = self
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or(SelectionError::UnknownGroup(group_id))?;
        let option = group.option(option_id).ok_or(SelectionError::UnknownOption {
            group: group_id,
            option: option_id,
        })?;
        if !option.is_available {
            return Err(SelectionError::Unavailable(option.name.clone()));
        }

        let changed = self.state.toggle(group, option_id);
        if changed {
            self.notify();
        }
        Ok(changed)
    }

    /// Names of groups whose `min_selections` is not yet met.
    #[must_use]
    pub fn missing_required(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|g| {
                usize::try_from(g.min_selections).is_ok_and(|min| self.state.count(g.id) < min)
            })
            .map(|g| g.name.clone())
            .collect()
    }

    fn notify(&mut self) {
        let customizations = self.state.customizations(&self.groups);
        let delta = price_delta(&customizations);
        (self.on_change)(&customizations, delta);
    }
}

// =============================================================================
// Replay
// =============================================================================

/// The outcome of replaying a shopper-submitted selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub customizations: Vec<ChosenCustomization>,
    pub price_delta: Decimal,
    /// Names of groups whose minimum is not met.
    pub missing_required: Vec<String>,
}

impl ResolvedSelection {
    /// Fail if any required group is still unanswered.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::Incomplete`] listing the unanswered groups.
    pub fn ensure_complete(&self) -> Result<(), SelectionError> {
        if self.missing_required.is_empty() {
            Ok(())
        } else {
            Err(SelectionError::Incomplete(self.missing_required.clone()))
        }
    }
}

/// Rebuild a selection by clicking each requested option in order.
///
/// The submitted map must be reachable by clicks: a `single` group with two
/// options, or a `multi` group over its limit, is rejected rather than
/// silently trimmed.
///
/// # Errors
///
/// Returns an error for unknown groups/options, unavailable or duplicate
/// options, and selections the group rules would not allow.
pub fn resolve(
    groups: &[ModifierGroup],
    requested: &BTreeMap<ModifierGroupId, Vec<ModifierOptionId>>,
) -> Result<ResolvedSelection, SelectionError> {
    let mut latest: (Vec<ChosenCustomization>, Decimal) = (Vec::new(), Decimal::ZERO);
    let missing_required = {
        let mut selector =
            ModifierSelector::new(groups.to_vec(), |c: &[ChosenCustomization], delta| {
                latest = (c.to_vec(), delta);
            });

        for (&group_id, options) in requested {
            let mut seen = BTreeSet::new();
            for &option_id in options {
                if !seen.insert(option_id) {
                    return Err(SelectionError::DuplicateOption {
                        group: group_id,
                        option: option_id,
                    });
                }
                selector.toggle(group_id, option_id)?;
            }

            let applied: BTreeSet<_> = selector.state.options(group_id).collect();
            if applied != seen
                && let Some(group) = selector.groups.iter().find(|g| g.id == group_id)
            {
                return Err(SelectionError::TooManySelections {
                    group: group.name.clone(),
                    limit: group.selection_limit().unwrap_or(u32::MAX),
                });
            }
        }

        selector.missing_required()
    };

    let (customizations, price_delta) = latest;
    Ok(ResolvedSelection {
        customizations,
        price_delta,
        missing_required,
    })
}
