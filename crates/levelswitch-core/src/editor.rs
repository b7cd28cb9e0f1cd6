//! Rule editor
//!
//! UI-facing CRUD over the shared rule store. The editor keeps a list-widget
//! model (one [`ListRow`] per rule, in store order) and a selection, and
//! mirrors every change into the store under the context lock. Rows are tied
//! to rules by [`RuleId`]; the row text is the rule's display key.
//!
//! Host resolution and row bookkeeping happen outside the store lock so the
//! evaluation loop is never held up by the editor.

use crate::engine::SwitcherContext;
use crate::handle::{HandleKind, HandleResolver, WeakHandle};
use crate::rule::{AudioRule, LevelCondition, RuleId};
use crate::{CoreError, Result};
use std::sync::Arc;
use tracing::debug;

/// One row of the rule list
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    /// Rule shown in this row
    pub rule_id: RuleId,
    /// Row label
    pub text: String,
}

/// Values entered in the rule form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleForm {
    /// Target scene name, or the previous-scene marker
    pub scene_name: String,
    /// Transition name
    pub transition_name: String,
    /// Monitored audio source name
    pub audio_source_name: String,
    /// Threshold level
    pub volume: f32,
    /// Comparator; `None` uses the configured default
    pub condition: Option<LevelCondition>,
}

/// Result of [`RuleEditor::add_or_update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A new rule was appended
    Added(RuleId),
    /// An existing rule was rewritten in place
    Updated(RuleId),
}

/// Names shown in the form when a row is selected
#[derive(Debug, Clone, PartialEq)]
pub struct RowDetails {
    /// Rule id
    pub rule_id: RuleId,
    /// Scene name (the marker for previous-scene rules, empty if dangling)
    pub scene_name: String,
    /// Transition name (empty if dangling)
    pub transition_name: String,
    /// Audio source name (empty if dangling)
    pub audio_source_name: String,
    /// Threshold level
    pub volume: f32,
    /// Comparator
    pub condition: LevelCondition,
}

/// List-based rule editor
pub struct RuleEditor {
    context: Arc<SwitcherContext>,
    resolver: Arc<dyn HandleResolver>,
    rows: Vec<ListRow>,
    selected: Option<usize>,
    loading: bool,
}

impl RuleEditor {
    /// Create an editor over a shared context
    pub fn new(context: Arc<SwitcherContext>, resolver: Arc<dyn HandleResolver>) -> Self {
        Self {
            context,
            resolver,
            rows: Vec::new(),
            selected: None,
            loading: false,
        }
    }

    /// Rebuild the rows from the store, refreshing labels from host names
    pub fn populate(&mut self) {
        self.loading = true;
        self.context.refresh_display_keys(self.resolver.as_ref());
        self.rows = self.context.with_rules(|rules| {
            rules
                .iter()
                .map(|rule| ListRow {
                    rule_id: rule.id,
                    text: rule.display_key.clone(),
                })
                .collect()
        });
        self.selected = None;
        self.loading = false;
    }

    /// Mark a settings load in progress; selection callbacks are ignored meanwhile
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// True while a load is in progress
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Current rows
    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    /// Selected row index
    pub fn selected_row(&self) -> Option<usize> {
        self.selected
    }

    /// Scene choices: the previous-scene marker first, then every scene
    pub fn scene_choices(&self) -> Vec<String> {
        let mut choices = vec![self.context.settings().previous_scene_name];
        choices.extend(self.resolver.names(HandleKind::Scene));
        choices
    }

    /// Transition choices
    pub fn transition_choices(&self) -> Vec<String> {
        self.resolver.names(HandleKind::Transition)
    }

    /// Audio-capable source choices
    pub fn audio_source_choices(&self) -> Vec<String> {
        self.resolver.audio_sources()
    }

    /// Add a rule, or rewrite the one already watching the same source at
    /// the same threshold.
    pub fn add_or_update(&mut self, form: &RuleForm) -> Result<EditOutcome> {
        if form.scene_name.is_empty() {
            return Err(CoreError::InvalidRule("no scene selected".to_string()));
        }
        if form.audio_source_name.is_empty() {
            return Err(CoreError::InvalidRule("no audio source selected".to_string()));
        }

        let settings = self.context.settings();
        let use_previous_scene = settings.is_previous_scene(&form.scene_name);
        let scene = if use_previous_scene {
            WeakHandle::absent(HandleKind::Scene)
        } else {
            self.resolver.resolve(HandleKind::Scene, &form.scene_name)
        };
        let transition = self
            .resolver
            .resolve(HandleKind::Transition, &form.transition_name);
        let audio_source = self
            .resolver
            .resolve(HandleKind::AudioSource, &form.audio_source_name);

        let rule = AudioRule::new(
            audio_source.clone(),
            form.volume,
            scene,
            transition,
            use_previous_scene,
            &settings.previous_scene_name,
        )
        .with_condition(form.condition.unwrap_or(settings.default_condition));
        let text = rule.display_key.clone();

        let outcome = self.context.with_rules_mut(|rules| {
            match rules.find_by_audio_source_and_threshold(
                &audio_source,
                form.volume,
                settings.threshold_tolerance,
            ) {
                Some(index) => {
                    let id = rules.rules()[index].id;
                    rules.replace_at(index, rule);
                    EditOutcome::Updated(id)
                }
                None => EditOutcome::Added(rules.add(rule)),
            }
        });

        match outcome {
            EditOutcome::Added(id) => {
                self.rows.push(ListRow { rule_id: id, text });
                debug!("Added audio rule {}", id);
            }
            EditOutcome::Updated(id) => {
                match self.rows.iter_mut().find(|row| row.rule_id == id) {
                    Some(row) => row.text = text,
                    None => self.rows.push(ListRow { rule_id: id, text }),
                }
                debug!("Updated audio rule {}", id);
            }
        }
        Ok(outcome)
    }

    /// Remove the selected rule
    pub fn remove_selected(&mut self) -> bool {
        let Some(index) = self.selected.filter(|&i| i < self.rows.len()) else {
            return false;
        };
        let id = self.rows[index].rule_id;
        let removed = self.context.with_rules_mut(|rules| rules.remove(id)).is_some();

        self.rows.remove(index);
        self.selected = if self.rows.is_empty() {
            None
        } else {
            Some(index.min(self.rows.len() - 1))
        };
        removed
    }

    /// Move the selected rule one row up
    pub fn move_selected_up(&mut self) -> bool {
        let Some(index) = self.selected.filter(|&i| i > 0 && i < self.rows.len()) else {
            return false;
        };
        let id = self.rows[index].rule_id;
        if !self.context.with_rules_mut(|rules| rules.move_rule_up(id)) {
            return false;
        }
        self.rows.swap(index, index - 1);
        self.selected = Some(index - 1);
        true
    }

    /// Move the selected rule one row down
    pub fn move_selected_down(&mut self) -> bool {
        let Some(index) = self.selected.filter(|&i| i + 1 < self.rows.len()) else {
            return false;
        };
        let id = self.rows[index].rule_id;
        if !self.context.with_rules_mut(|rules| rules.move_rule_down(id)) {
            return false;
        }
        self.rows.swap(index, index + 1);
        self.selected = Some(index + 1);
        true
    }

    /// Row selection callback. Returns what the form should display.
    pub fn select_row(&mut self, index: Option<usize>) -> Option<RowDetails> {
        if self.loading {
            return None;
        }
        self.selected = index.filter(|&i| i < self.rows.len());
        let id = self.rows.get(self.selected?)?.rule_id;
        let rule = self.context.with_rules(|rules| rules.get(id).cloned())?;
        Some(self.details(&rule))
    }

    /// Look up a rule by its row label and report its names
    pub fn details_by_display_key(&self, key: &str) -> Option<RowDetails> {
        let rule = self.context.with_rules(|rules| {
            rules
                .find_by_display_key(key)
                .map(|index| rules.rules()[index].clone())
        })?;
        Some(self.details(&rule))
    }

    fn details(&self, rule: &AudioRule) -> RowDetails {
        let resolver = self.resolver.as_ref();
        let scene_name = if rule.use_previous_scene {
            self.context.settings().previous_scene_name
        } else {
            rule.scene.name(resolver).unwrap_or_default()
        };
        RowDetails {
            rule_id: rule.id,
            scene_name,
            transition_name: rule.transition.name(resolver).unwrap_or_default(),
            audio_source_name: rule.audio_source.name(resolver).unwrap_or_default(),
            volume: rule.volume_threshold,
            condition: rule.condition,
        }
    }
}
