//! The closed set of safety predicates and their activation rules.

use std::fmt;
use std::str::FromStr;

use md_action::{ActionId, ActionSummary};
use md_core::{Level, SimConfig};

use crate::{SafetyError, SafetyResult};

/// An emergency stop is unnecessary while the driver has more than this many
/// seconds before becoming unfit.
pub const ES_TTDU_MARGIN: f64 = 5.0;

// ── Severity ──────────────────────────────────────────────────────────────────

/// How urgent a safety event is.  Ordered `Misc < Uncomfortable < Critical`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Misc,
    Uncomfortable,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Misc, Severity::Uncomfortable, Severity::Critical];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Misc          => "misc",
            Severity::Uncomfortable => "uncomfortable",
            Severity::Critical      => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tick inputs ───────────────────────────────────────────────────────────────

/// Everything the predicates look at for one tick.  Built by the orchestrator
/// after the car, driver and road have stepped.
#[derive(Clone, Debug)]
pub struct SafetyInputs<'a> {
    /// Simulated seconds at the start of the tick.
    pub time:           f64,
    /// Car position (km) after this tick's movement.
    pub position:       f64,
    pub level:          Level,
    /// The road's current maximum level.
    pub road_max_level: Level,
    pub ttdu:           f64,
    pub ttdf:           f64,
    /// The driver's outstanding level request.
    pub request:        Option<Level>,
    /// Time of the last declined suggestion, indexed by [`Level::index`].
    pub last_declines:  [Option<f64>; 4],
    /// The action created this tick.
    pub new_action:     Option<ActionId>,
    /// The action resolved this tick.
    pub resolved:       Option<&'a ActionSummary>,
    /// A level switch happened this tick.
    pub switched:       bool,
}

/// Configuration values the predicates compare against.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    pub timestep:               f64,
    pub decline_threshold:      f64,
    pub uncomfortable_switch:   f64,
    pub comfortable_shift_time: f64,
}

impl Thresholds {
    pub fn from_config(cfg: &SimConfig) -> Self {
        Thresholds {
            timestep:               cfg.timestep,
            decline_threshold:      cfg.preferences.decline_threshold,
            uncomfortable_switch:   cfg.preferences.uncomfortable_switch,
            comfortable_shift_time: cfg.preferences.comfortable_shift_time,
        }
    }
}

// ── SafetyKind ────────────────────────────────────────────────────────────────

/// How an open event of a kind decides whether it is still active.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Persistence {
    /// Re-test the predicate against the current tick.
    Live,
    /// Stay active until the car has moved.
    UntilMoved,
    /// Close on the next tick.
    OneTick,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyKind {
    /// Current level above the road's current maximum.
    CarUnfit,
    /// Below L3 with a driver who is unfit now.
    DriverUnfit,
    /// Suggesting a level the driver declined a short while ago.
    DoubleSuggestion,
    /// Starting a shift shortly after the last switch.
    RecentSwitch,
    /// An enforced shift completed in less than the comfortable shift time.
    QuickTakeover,
    /// An emergency stop while the driver still had ample margin.
    UnnecessaryEs,
    /// The driver asked for a level the car is not at.
    PendingRequest,
}

/// Name → kind.  The closed list that configuration names resolve against.
pub const REGISTRY: [(&str, SafetyKind); 7] = [
    ("CarUnfit",         SafetyKind::CarUnfit),
    ("DriverUnfit",      SafetyKind::DriverUnfit),
    ("DoubleSuggestion", SafetyKind::DoubleSuggestion),
    ("RecentSwitch",     SafetyKind::RecentSwitch),
    ("QuickTakeover",    SafetyKind::QuickTakeover),
    ("UnnecessaryES",    SafetyKind::UnnecessaryEs),
    ("PendingRequest",   SafetyKind::PendingRequest),
];

impl SafetyKind {
    pub const ALL: [SafetyKind; 7] = [
        SafetyKind::CarUnfit,
        SafetyKind::DriverUnfit,
        SafetyKind::DoubleSuggestion,
        SafetyKind::RecentSwitch,
        SafetyKind::QuickTakeover,
        SafetyKind::UnnecessaryEs,
        SafetyKind::PendingRequest,
    ];

    pub fn name(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("", |(name, _)| *name)
    }

    pub fn severity(self) -> Severity {
        match self {
            SafetyKind::CarUnfit | SafetyKind::DriverUnfit => Severity::Critical,
            SafetyKind::DoubleSuggestion
            | SafetyKind::RecentSwitch
            | SafetyKind::QuickTakeover
            | SafetyKind::UnnecessaryEs => Severity::Uncomfortable,
            SafetyKind::PendingRequest => Severity::Misc,
        }
    }

    pub fn persistence(self) -> Persistence {
        match self {
            SafetyKind::CarUnfit | SafetyKind::DriverUnfit | SafetyKind::PendingRequest => Persistence::Live,
            SafetyKind::DoubleSuggestion | SafetyKind::RecentSwitch | SafetyKind::QuickTakeover => {
                Persistence::UntilMoved
            }
            SafetyKind::UnnecessaryEs => Persistence::OneTick,
        }
    }

    /// Resolve a list of configured names, keeping their order.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> SafetyResult<Vec<SafetyKind>> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }

    /// Whether the predicate holds this tick.  `last_switch` is the time of
    /// the last level switch before this tick.
    pub fn triggers(self, inputs: &SafetyInputs<'_>, last_switch: Option<f64>, th: &Thresholds) -> bool {
        match self {
            SafetyKind::CarUnfit => inputs.level > inputs.road_max_level,
            SafetyKind::DriverUnfit => inputs.level < Level::L3 && inputs.ttdu == 0.0,
            SafetyKind::DoubleSuggestion => match inputs.new_action {
                Some(ActionId::SuggestShift(level)) => inputs.last_declines[level.index()]
                    .is_some_and(|t| inputs.time - t < th.decline_threshold),
                _ => false,
            },
            SafetyKind::RecentSwitch => {
                inputs.new_action.is_some_and(ActionId::is_shift)
                    && last_switch.is_some_and(|t| inputs.time - t < th.uncomfortable_switch)
            }
            SafetyKind::QuickTakeover => inputs.resolved.is_some_and(|a| {
                matches!(a.id, ActionId::EnforceShift(_))
                    && a.outcome == Some(true)
                    && a.time_passed < th.comfortable_shift_time
            }),
            SafetyKind::UnnecessaryEs => {
                inputs.new_action == Some(ActionId::EmergencyStop)
                    && ((inputs.level < Level::L3 && inputs.ttdu > ES_TTDU_MARGIN)
                        || (inputs.level > Level::L2 && inputs.ttdf == 0.0))
            }
            SafetyKind::PendingRequest => inputs.request.is_some_and(|r| r != inputs.level),
        }
    }
}

impl FromStr for SafetyKind {
    type Err = SafetyError;

    fn from_str(s: &str) -> SafetyResult<Self> {
        REGISTRY
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| SafetyError::UnknownKind(s.to_owned()))
    }
}

impl fmt::Display for SafetyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
