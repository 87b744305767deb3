//! Action identifiers, commands and the available-action vocabulary.
//!
//! Actions are named by short codes: `SSL<n>` and `ESL<n>` for suggested and
//! enforced shifts to level `n`, and `CF`, `CD`, `PD`, `CR`, `ES` for the
//! remaining kinds.  `DN` ("do nothing") and `CANCEL` are commands rather
//! than actions: a command string may carry a `CANCEL` prefix that drops the
//! pending action before the named one is started.

use std::fmt;
use std::str::FromStr;

use md_core::Level;

use crate::{ActionError, ActionResult};

pub const DO_NOTHING: &str = "DN";
pub const CANCEL: &str = "CANCEL";

/// Every code a decision tree may name, whether configured or not.
pub const ACTION_CODES: [&str; 15] = [
    DO_NOTHING, CANCEL, "SSL0", "SSL2", "SSL3", "SSL4", "ESL0", "ESL2", "ESL3", "ESL4", "CF", "CD", "ES", "PD",
    "CR",
];

// ── ActionId ──────────────────────────────────────────────────────────────────

/// One of the seven action kinds, with the target level for shifts.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionId {
    SuggestShift(Level),
    EnforceShift(Level),
    CorrectFatigue,
    CorrectDistraction,
    PrepareDriver,
    ClearRequest,
    EmergencyStop,
}

impl ActionId {
    /// The vocabulary code (`SSL3`, `ESL0`, `CF`, ...).  Identical to the
    /// display name.
    pub fn code(self) -> String {
        self.to_string()
    }

    /// Target level of a shift action.
    pub fn target_level(self) -> Option<Level> {
        match self {
            ActionId::SuggestShift(level) | ActionId::EnforceShift(level) => Some(level),
            _ => None,
        }
    }

    #[inline]
    pub fn is_shift(self) -> bool {
        self.target_level().is_some()
    }

    /// The same action with its target level capped at `max_level`.
    pub fn clamped(self, max_level: Level) -> ActionId {
        match self {
            ActionId::SuggestShift(level) => ActionId::SuggestShift(level.min(max_level)),
            ActionId::EnforceShift(level) => ActionId::EnforceShift(level.min(max_level)),
            other => other,
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionId::SuggestShift(level) => write!(f, "SS{level}"),
            ActionId::EnforceShift(level) => write!(f, "ES{level}"),
            ActionId::CorrectFatigue      => f.write_str("CF"),
            ActionId::CorrectDistraction  => f.write_str("CD"),
            ActionId::PrepareDriver       => f.write_str("PD"),
            ActionId::ClearRequest        => f.write_str("CR"),
            ActionId::EmergencyStop       => f.write_str("ES"),
        }
    }
}

impl FromStr for ActionId {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unknown = || ActionError::UnknownAction(s.to_owned());
        let shift_level = |digits: &str| format!("L{digits}").parse::<Level>().map_err(|_| unknown());

        match s {
            "CF" => Ok(ActionId::CorrectFatigue),
            "CD" => Ok(ActionId::CorrectDistraction),
            "PD" => Ok(ActionId::PrepareDriver),
            "CR" => Ok(ActionId::ClearRequest),
            "ES" => Ok(ActionId::EmergencyStop),
            _ => {
                if let Some(n) = s.strip_prefix("SSL") {
                    shift_level(n).map(ActionId::SuggestShift)
                } else if let Some(n) = s.strip_prefix("ESL") {
                    shift_level(n).map(ActionId::EnforceShift)
                } else {
                    Err(unknown())
                }
            }
        }
    }
}

// ── ActionCommand ─────────────────────────────────────────────────────────────

/// A parsed command: optionally cancel the pending action, optionally start
/// a new one.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionCommand {
    pub cancel: bool,
    pub action: Option<ActionId>,
}

impl ActionCommand {
    /// `DN`.
    pub const NOTHING: ActionCommand = ActionCommand { cancel: false, action: None };
    /// `CANCEL`.
    pub const CANCEL: ActionCommand = ActionCommand { cancel: true, action: None };

    pub fn start(action: ActionId) -> Self {
        ActionCommand { cancel: false, action: Some(action) }
    }

    pub fn replace(action: ActionId) -> Self {
        ActionCommand { cancel: true, action: Some(action) }
    }

    /// Parse a command string, capping shift targets at `max_level`.
    pub fn parse(s: &str, max_level: Level) -> ActionResult<Self> {
        let s = s.trim();
        let (cancel, rest) = match s.strip_prefix(CANCEL) {
            Some(rest) => (true, rest),
            None       => (false, s),
        };
        let action = match rest {
            "" | DO_NOTHING => None,
            name => Some(name.parse::<ActionId>()?.clamped(max_level)),
        };
        Ok(ActionCommand { cancel, action })
    }

    #[inline]
    pub fn is_nothing(&self) -> bool {
        !self.cancel && self.action.is_none()
    }
}

impl fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.cancel, self.action) {
            (false, None)         => f.write_str(DO_NOTHING),
            (true, None)          => f.write_str(CANCEL),
            (false, Some(action)) => write!(f, "{action}"),
            (true, Some(action))  => write!(f, "{CANCEL}{action}"),
        }
    }
}

// ── ActionArgs ────────────────────────────────────────────────────────────────

/// Optional arguments supplied with a shift command.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionArgs {
    /// Remaining time budget in seconds (response window or enforce
    /// countdown).
    pub time: Option<f64>,
    /// Latest start position in km.
    pub last: Option<f64>,
}

impl ActionArgs {
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_last(mut self, last: f64) -> Self {
        self.last = Some(last);
        self
    }
}

// ── Vocabulary ────────────────────────────────────────────────────────────────

/// The configured action vocabulary, expanded with `CANCEL<action>` variants
/// when `CANCEL` itself is available.
///
/// Entry order is stable: every configured code is followed by its cancel
/// variant, so an entry's index can serve as a discrete action number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<String>,
}

impl Vocabulary {
    pub fn new<S: AsRef<str>>(available: &[S]) -> ActionResult<Self> {
        let includes_cancel = available.iter().any(|a| a.as_ref().trim() == CANCEL);
        let mut entries = Vec::with_capacity(available.len() * 2);
        for code in available {
            let code = code.as_ref().trim();
            if code != CANCEL && code != DO_NOTHING {
                code.parse::<ActionId>()?;
            }
            entries.push(code.to_owned());
            if includes_cancel && code != CANCEL {
                entries.push(format!("{CANCEL}{code}"));
            }
        }
        Ok(Vocabulary { entries })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e == code)
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.entries.iter().position(|e| e == code)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Whether `action` (without a cancel prefix) is a configured action.
    pub fn allows(&self, action: ActionId) -> bool {
        self.contains(&action.code())
    }
}
