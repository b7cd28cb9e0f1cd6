//! Background evaluation loop
//!
//! Advances the scripted host one tick per check interval, evaluates the
//! audio rules and forwards what happened to the main thread, which owns the
//! editor and executes switches.

use crate::host::ScriptedHost;
use crossbeam_channel::Sender;
use levelswitch_core::{SwitchDirective, SwitcherContext};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Messages from the evaluation thread
#[derive(Debug, Clone)]
pub enum LoopEvent {
    /// A rule fired
    Switch {
        /// Tick the rule fired on
        tick: usize,
        /// Requested switch
        directive: SwitchDirective,
    },
    /// Host resources were removed or renamed
    HostChanged {
        /// Tick of the change
        tick: usize,
    },
}

/// Start the loop on its own thread. The sender is dropped when the last tick
/// has been evaluated, which ends the receiver's iteration.
pub fn spawn(
    context: Arc<SwitcherContext>,
    host: Arc<ScriptedHost>,
    ticks: usize,
    sender: Sender<LoopEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("audio-switch".to_string())
        .spawn(move || run(&context, &host, ticks, &sender))
}

fn run(context: &SwitcherContext, host: &ScriptedHost, ticks: usize, sender: &Sender<LoopEvent>) {
    info!("Evaluation loop started ({} ticks)", ticks);
    for tick in 0..ticks {
        if host.apply_tick(tick) && sender.send(LoopEvent::HostChanged { tick }).is_err() {
            break;
        }

        if let Some(directive) = context.check_audio_switch(host.registry().as_ref()) {
            if sender.send(LoopEvent::Switch { tick, directive }).is_err() {
                debug!("Receiver gone, stopping evaluation loop");
                break;
            }
        }

        thread::sleep(context.settings().check_interval());
    }
    info!("Evaluation loop finished");
}
