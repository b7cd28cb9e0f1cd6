//! LevelSwitch - Audio-level triggered scene switching
//!
//! Runs the switcher engine against a scripted host: rules are loaded from a
//! settings file or entered through the editor, a background loop evaluates
//! them every check interval, and the main thread executes the switches.

#![warn(missing_docs)]

mod evaluation;
mod host;
mod logging_setup;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use evaluation::LoopEvent;
use host::{HostScript, ScriptedHost};
use levelswitch_core::{EditOutcome, HandleResolver, RuleEditor, SwitcherContext, SwitcherSettings};
use levelswitch_io::{load_context, SwitcherFile};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Command line options
#[derive(Parser, Debug)]
#[command(name = "levelswitch", version, about = "Audio-level triggered scene switching")]
struct Cli {
    /// Settings file with stored rules (.json or .ron); ignored if missing
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Host script describing scenes, sources and per-tick levels
    #[arg(long, default_value = "crates/levelswitch/demos/stage.json")]
    script: PathBuf,

    /// Number of evaluation ticks (defaults to the script length)
    #[arg(short, long)]
    ticks: Option<usize>,

    /// Write settings and rules here after the run
    #[arg(long)]
    save: Option<PathBuf>,

    /// Override the check interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Log every audio match
    #[arg(short, long)]
    verbose: bool,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let stored = match &cli.settings {
        Some(path) if path.exists() => Some(
            SwitcherFile::load(path)
                .with_context(|| format!("Failed to load settings: {}", path.display()))?,
        ),
        _ => None,
    };

    let mut settings: SwitcherSettings = stored
        .as_ref()
        .map(|file| file.settings.clone())
        .unwrap_or_default();
    if cli.verbose {
        settings.verbose = true;
    }
    if let Some(ms) = cli.interval_ms {
        settings.check_interval_ms = ms;
    }
    if let Some(level) = &cli.log_level {
        settings.log_config.level = level.clone();
    }

    let _log_guard = logging_setup::init(&settings.log_config)?;

    info!("==========================================");
    info!("===     LevelSwitch Session Started    ===");
    info!("==========================================");

    let script = HostScript::load(&cli.script)?;
    let host = Arc::new(ScriptedHost::new(script));
    let resolver: Arc<dyn HandleResolver> = host.registry().clone();

    let context = Arc::new(SwitcherContext::new(settings));
    if let Some(scene) = host.start_scene() {
        context.set_current_scene(scene);
    }

    let mut editor = RuleEditor::new(context.clone(), resolver.clone());
    if let Some(file) = &stored {
        editor.set_loading(true);
        load_context(&context, resolver.as_ref(), &file.document);
        editor.set_loading(false);
    }
    enter_scripted_rules(&mut editor, &host);
    editor.populate();
    log_rules(&editor, &context);

    let ticks = cli.ticks.unwrap_or_else(|| host.tick_count());
    let (sender, receiver) = crossbeam_channel::unbounded();
    let handle = evaluation::spawn(context.clone(), host.clone(), ticks, sender)
        .context("Failed to start evaluation thread")?;

    let mut switches = 0usize;
    for event in receiver {
        match event {
            LoopEvent::Switch { tick, directive } => {
                if context.apply_switch(&directive, resolver.as_ref()) {
                    switches += 1;
                    let scene = resolver
                        .name_of(&directive.scene)
                        .unwrap_or_else(|| directive.scene.cached_name().to_string());
                    let transition = resolver
                        .name_of(&directive.transition)
                        .unwrap_or_else(|| directive.transition.cached_name().to_string());
                    println!("tick {:>3}: -> {} ({})", tick, scene, transition);
                }
            }
            LoopEvent::HostChanged { tick } => {
                debug!("Host resources changed at tick {}, refreshing rule list", tick);
                editor.populate();
                log_rules(&editor, &context);
            }
        }
    }

    handle
        .join()
        .map_err(|_| anyhow!("Evaluation thread panicked"))?;

    let final_scene = context
        .current_scene()
        .and_then(|scene| resolver.name_of(&scene))
        .unwrap_or_else(|| "<none>".to_string());
    println!("{} switches over {} ticks, final scene: {}", switches, ticks, final_scene);

    if let Some(path) = &cli.save {
        let mut file = SwitcherFile::from_context(&context, resolver.as_ref());
        if let Some(stored) = &stored {
            file.metadata.created_at = stored.metadata.created_at;
        }
        file.save(path)
            .with_context(|| format!("Failed to save settings: {}", path.display()))?;
    }

    info!("LevelSwitch session finished");
    Ok(())
}

/// Enter the script's rules through the editor, as a user would
fn enter_scripted_rules(editor: &mut RuleEditor, host: &ScriptedHost) {
    for rule in host.rules() {
        match editor.add_or_update(&rule.to_form()) {
            Ok(EditOutcome::Added(id)) => debug!("Added rule {}", id),
            Ok(EditOutcome::Updated(id)) => debug!("Updated rule {}", id),
            Err(e) => warn!("Skipping scripted rule: {}", e),
        }
    }
}

fn log_rules(editor: &RuleEditor, context: &SwitcherContext) {
    info!("{} audio switches:", editor.rows().len());
    for (index, row) in editor.rows().iter().enumerate() {
        let condition = context
            .with_rules(|rules| rules.get(row.rule_id).map(|rule| rule.condition.as_str()))
            .unwrap_or("?");
        info!("  {}. {} [{}]", index + 1, row.text, condition);
    }
}
