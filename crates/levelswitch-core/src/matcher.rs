//! Rule matching against live audio levels
//!
//! Rules are scanned in store order and the first one whose trigger condition
//! holds decides the switch (first-match-wins). Its action is resolved into a
//! [`SwitchDirective`]; if the action cannot be resolved (a previous-scene rule
//! fires before any scene change was observed) no directive is produced and
//! later rules are not consulted.

use crate::handle::{LevelMeter, WeakHandle};
use crate::rule::{AudioRule, RuleId};
use tracing::trace;

/// Scene switch requested by a matching rule
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchDirective {
    /// Rule that fired
    pub rule_id: RuleId,
    /// Scene to switch to
    pub scene: WeakHandle,
    /// Transition to use
    pub transition: WeakHandle,
    /// True if `scene` came from previous-scene tracking
    pub to_previous_scene: bool,
}

/// Live inputs for one evaluation tick
#[derive(Clone, Copy)]
pub struct MatchInput<'a> {
    /// Audio level readout
    pub meter: &'a dyn LevelMeter,
    /// Scene currently on air, if known.
    ///
    /// Audio rules do not read it: a rule targeting the scene already on air
    /// still produces a directive, and `SwitcherContext::apply_switch` drops
    /// it. Scene-dependent rule kinds check it in their trigger.
    pub current_scene: Option<&'a WeakHandle>,
    /// Scene that was on air before the current one, if known
    pub previous_scene: Option<&'a WeakHandle>,
}

/// A switch rule of any kind.
///
/// Only audio rules exist in this engine; other switch kinds plug in as
/// further variants with their own trigger check.
#[derive(Debug, Clone, Copy)]
pub enum SwitchRule<'a> {
    /// Level-triggered rule
    Audio(&'a AudioRule),
}

impl SwitchRule<'_> {
    /// Id of the underlying rule
    pub fn id(&self) -> RuleId {
        match self {
            SwitchRule::Audio(rule) => rule.id,
        }
    }

    /// Whether the rule's trigger condition holds for this tick
    pub fn is_triggered(&self, input: &MatchInput<'_>) -> bool {
        match self {
            SwitchRule::Audio(rule) => input
                .meter
                .level(&rule.audio_source)
                .is_some_and(|level| rule.condition.is_met(level, rule.volume_threshold)),
        }
    }

    /// Resolve the rule's action into a directive
    pub fn action(&self, input: &MatchInput<'_>) -> Option<SwitchDirective> {
        match self {
            SwitchRule::Audio(rule) => {
                let scene = if rule.use_previous_scene {
                    input.previous_scene?.clone()
                } else {
                    rule.scene.clone()
                };
                Some(SwitchDirective {
                    rule_id: rule.id,
                    scene,
                    transition: rule.transition.clone(),
                    to_previous_scene: rule.use_previous_scene,
                })
            }
        }
    }

    /// Trigger check followed by action resolution
    pub fn evaluate(&self, input: &MatchInput<'_>) -> Option<SwitchDirective> {
        if self.is_triggered(input) {
            self.action(input)
        } else {
            None
        }
    }
}

/// Evaluate rules in order; the first triggered rule decides the outcome.
pub fn evaluate<'a, I>(rules: I, input: &MatchInput<'_>) -> Option<SwitchDirective>
where
    I: IntoIterator<Item = SwitchRule<'a>>,
{
    rules
        .into_iter()
        .find(|rule| rule.is_triggered(input))
        .and_then(|rule| {
            trace!("Rule {} triggered", rule.id());
            rule.action(input)
        })
}

/// Evaluate a slice of audio rules
pub fn evaluate_audio(rules: &[AudioRule], input: &MatchInput<'_>) -> Option<SwitchDirective> {
    if rules.is_empty() {
        return None;
    }
    evaluate(rules.iter().map(SwitchRule::Audio), input)
}
