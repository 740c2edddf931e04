//! Rule presets and the editable custom rule.
//!
//! The catalog holds an immutable set of named presets plus exactly one
//! mutable custom rule. Any edit to a birth/survival set goes through the
//! catalog, which copies the currently selected rule into the custom slot
//! (if needed) before applying the edit and switching the selection there.
//! An unrecognized rule can only enter the system through deserialized
//! data, so `RuleCatalog::sanitize` is the telemetry point for that case.

use serde::{Deserialize, Serialize};

use crate::state::grid::{Dimension, Grid, CELL_DEAD};

/// Set of neighbor counts, stored as a bitmask. Moore counts never exceed
/// 80 (the 4D neighborhood), so a u128 covers every reachable count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborSet(u128);

impl NeighborSet {
    pub const EMPTY: NeighborSet = NeighborSet(0);

    pub fn from_counts(counts: &[u8]) -> Self {
        let mut set = NeighborSet(0);
        for &count in counts {
            set.0 |= 1u128 << count;
        }
        set
    }

    pub fn contains(self, count: u8) -> bool {
        count < 128 && self.0 & (1u128 << count) != 0
    }

    pub fn toggle(&mut self, count: u8) {
        if count < 128 {
            self.0 ^= 1u128 << count;
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Counts present in the set, ascending.
    pub fn counts(self) -> Vec<u8> {
        (0..128).filter(|&c| self.contains(c)).collect()
    }
}

/// How a rule evaluates cell transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Binary birth/survival over the Moore neighborhood.
    Binary {
        birth: NeighborSet,
        survival: NeighborSet,
    },
    /// Three-state decay: 1 -> 2 -> 0; birth on exactly 2 Moore neighbors.
    ThreeState,
    /// Von Neumann majority vote, threshold per dimension.
    Vote,
}

/// Stable identifier of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    Conway,
    Fredkin,
    Brain,
    Seeds,
    DayNight,
    VonNeumann,
    Custom,
}

impl RuleId {
    pub const ALL: [RuleId; 7] = [
        RuleId::Conway,
        RuleId::Fredkin,
        RuleId::Brain,
        RuleId::Seeds,
        RuleId::DayNight,
        RuleId::VonNeumann,
        RuleId::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleId::Conway => "conway",
            RuleId::Fredkin => "fredkin",
            RuleId::Brain => "brain",
            RuleId::Seeds => "seeds",
            RuleId::DayNight => "daynight",
            RuleId::VonNeumann => "vonneumann",
            RuleId::Custom => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<RuleId> {
        RuleId::ALL.iter().copied().find(|id| id.name() == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleId::Conway => "Conway's Life",
            RuleId::Fredkin => "Fredkin",
            RuleId::Brain => "Brian's Brain",
            RuleId::Seeds => "Seeds",
            RuleId::DayNight => "Day & Night",
            RuleId::VonNeumann => "Vote",
            RuleId::Custom => "Custom",
        }
    }

    pub fn cycle(self) -> RuleId {
        let idx = RuleId::ALL.iter().position(|&id| id == self).unwrap_or(0);
        RuleId::ALL[(idx + 1) % RuleId::ALL.len()]
    }
}

/// A fully resolved rule: an identifier plus its evaluation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: RuleId,
    pub kind: RuleKind,
}

impl RuleSpec {
    pub fn preset(id: RuleId) -> RuleSpec {
        let kind = match id {
            RuleId::Conway | RuleId::Custom => RuleKind::Binary {
                birth: NeighborSet::from_counts(&[3]),
                survival: NeighborSet::from_counts(&[2, 3]),
            },
            RuleId::Fredkin => RuleKind::Binary {
                birth: NeighborSet::from_counts(&[1, 3, 5, 7]),
                survival: NeighborSet::from_counts(&[1, 3, 5, 7]),
            },
            RuleId::Brain => RuleKind::ThreeState,
            RuleId::Seeds => RuleKind::Binary {
                birth: NeighborSet::from_counts(&[2]),
                survival: NeighborSet::EMPTY,
            },
            RuleId::DayNight => RuleKind::Binary {
                birth: NeighborSet::from_counts(&[3, 6, 7, 8]),
                survival: NeighborSet::from_counts(&[3, 4, 6, 7, 8]),
            },
            RuleId::VonNeumann => RuleKind::Vote,
        };
        RuleSpec { id, kind }
    }

    /// Whether this rule produces cells in the dying state.
    pub fn uses_three_states(&self) -> bool {
        matches!(self.kind, RuleKind::ThreeState)
    }
}

impl std::fmt::Display for RuleSpec {
    /// Conventional `B.../S...` notation; non-binary rules show their label.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            RuleKind::Binary { birth, survival } => {
                write!(f, "B")?;
                for count in birth.counts() {
                    write!(f, "{}", count)?;
                }
                write!(f, "/S")?;
                for count in survival.counts() {
                    write!(f, "{}", count)?;
                }
                Ok(())
            }
            _ => write!(f, "{}", self.id.label()),
        }
    }
}

/// Immutable presets plus one live-edited custom rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCatalog {
    selected: RuleId,
    custom: RuleSpec,
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self {
            selected: RuleId::Conway,
            custom: RuleSpec::preset(RuleId::Custom),
        }
    }
}

impl RuleCatalog {
    pub fn selected(&self) -> RuleId {
        self.selected
    }

    /// The rule currently in effect.
    pub fn current(&self) -> RuleSpec {
        if self.selected == RuleId::Custom {
            self.custom
        } else {
            RuleSpec::preset(self.selected)
        }
    }

    pub fn custom(&self) -> RuleSpec {
        self.custom
    }

    pub fn select(&mut self, id: RuleId) {
        self.selected = id;
    }

    /// Toggle a count in the birth set of the effective rule. If a preset is
    /// selected its sets are copied into the custom slot first, and the
    /// selection moves to Custom.
    pub fn toggle_birth(&mut self, count: u8) {
        self.edit_custom(|birth, _| birth.toggle(count));
    }

    /// Toggle a count in the survival set, same custom-switch semantics.
    pub fn toggle_survival(&mut self, count: u8) {
        self.edit_custom(|_, survival| survival.toggle(count));
    }

    fn edit_custom(&mut self, edit: impl FnOnce(&mut NeighborSet, &mut NeighborSet)) {
        // Only binary rules have editable sets; editing while a non-binary
        // rule is selected edits the custom slot as-is.
        if self.selected != RuleId::Custom {
            if let RuleKind::Binary { birth, survival } = self.current().kind {
                self.custom.kind = RuleKind::Binary { birth, survival };
            }
            self.selected = RuleId::Custom;
        }
        if let RuleKind::Binary {
            ref mut birth,
            ref mut survival,
        } = self.custom.kind
        {
            edit(birth, survival);
        }
    }

    /// Validate deserialized catalog data. The type system rules out unknown
    /// variants, so the only repairable defect is a custom slot carrying a
    /// non-custom id; log and repair rather than failing the whole load.
    pub fn sanitize(&mut self) {
        if self.custom.id != RuleId::Custom {
            log::warn!(
                target: "rules",
                "custom rule slot carried id {:?}; repairing",
                self.custom.id
            );
            self.custom.id = RuleId::Custom;
        }
    }

    /// Clear any lingering dying cells when switching away from the
    /// three-state rule, so binary rules never see state 2.
    pub fn normalize_grid(&self, grid: &mut Grid) {
        if self.current().uses_three_states() {
            return;
        }
        let coords: Vec<_> = grid.coords().collect();
        for coord in coords {
            if grid.get(coord) > 1 {
                grid.set(coord, CELL_DEAD);
            }
        }
    }

    /// Vote threshold used by the `Vote` kind.
    pub fn vote_threshold(dimension: Dimension) -> u8 {
        dimension.vote_threshold()
    }
}
