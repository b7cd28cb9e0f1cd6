//! Editor-side mutation racing the evaluation loop
use levelswitch_core::{
    AudioRule, HandleKind, HandleResolver, MemoryRegistry, SwitcherContext, SwitcherSettings,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const ITERATIONS: usize = 2_000;

fn registry() -> Arc<MemoryRegistry> {
    let registry = Arc::new(MemoryRegistry::new());
    registry.add_audio_source("Mic");
    registry.add_scene("Scene1");
    registry.add_scene("Scene2");
    registry.add_transition("Fade");
    registry.set_level("Mic", 0.9);
    registry
}

#[test]
fn test_concurrent_add_and_evaluate() {
    let registry = registry();
    let context = Arc::new(SwitcherContext::new(SwitcherSettings::default()));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let context = context.clone();
        let registry = registry.clone();
        thread::spawn(move || {
            for i in 0..ITERATIONS {
                // Odd rules target Scene2 with a threshold that never fires
                let (scene, threshold) = if i % 2 == 0 {
                    ("Scene1", 0.5)
                } else {
                    ("Scene2", 2.0)
                };
                let rule = AudioRule::new(
                    registry.resolve(HandleKind::AudioSource, "Mic"),
                    threshold,
                    registry.resolve(HandleKind::Scene, scene),
                    registry.resolve(HandleKind::Transition, "Fade"),
                    false,
                    "Previous Scene",
                );
                context.with_rules_mut(|rules| rules.add(rule));
            }
        })
    };

    let reader = {
        let context = context.clone();
        let registry = registry.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut evaluations = 0usize;
            let mut last_len = 0usize;
            while !done.load(Ordering::Acquire) || evaluations < ITERATIONS {
                if let Some(directive) = context.check_audio_switch(registry.as_ref()) {
                    // First rule always targets Scene1 with Fade
                    assert_eq!(directive.scene.cached_name(), "Scene1");
                    assert_eq!(directive.transition.cached_name(), "Fade");
                }
                context.with_rules(|rules| {
                    assert!(rules.len() >= last_len, "store shrank under concurrent adds");
                    last_len = rules.len();
                    for rule in rules.iter() {
                        // A torn rule would mix fields of two different adds
                        let consistent = (rule.display_key == "Scene1 using Fade"
                            && rule.volume_threshold == 0.5)
                            || (rule.display_key == "Scene2 using Fade"
                                && rule.volume_threshold == 2.0);
                        assert!(consistent, "inconsistent rule: {:?}", rule);
                    }
                });
                evaluations += 1;
            }
            evaluations
        })
    };

    writer.join().expect("writer panicked");
    done.store(true, Ordering::Release);
    let evaluations = reader.join().expect("reader panicked");

    assert!(evaluations >= ITERATIONS);
    assert_eq!(context.rule_count(), ITERATIONS);

    let ids: Vec<u64> = context.with_rules(|rules| rules.iter().map(|r| r.id).collect());
    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "duplicate rule ids");
}

#[test]
fn test_concurrent_reorder_and_evaluate() {
    let registry = registry();
    let context = Arc::new(SwitcherContext::new(SwitcherSettings::default()));
    for scene in ["Scene1", "Scene2"] {
        let rule = AudioRule::new(
            registry.resolve(HandleKind::AudioSource, "Mic"),
            0.5,
            registry.resolve(HandleKind::Scene, scene),
            registry.resolve(HandleKind::Transition, "Fade"),
            false,
            "Previous Scene",
        );
        context.with_rules_mut(|rules| rules.add(rule));
    }

    let mover = {
        let context = context.clone();
        thread::spawn(move || {
            for i in 0..ITERATIONS {
                context.with_rules_mut(|rules| {
                    if i % 2 == 0 {
                        rules.move_down(0)
                    } else {
                        rules.move_up(1)
                    }
                });
            }
        })
    };

    for _ in 0..ITERATIONS {
        let directive = context
            .check_audio_switch(registry.as_ref())
            .expect("one of the two rules always fires");
        let name = directive.scene.cached_name();
        assert!(name == "Scene1" || name == "Scene2");
    }

    mover.join().expect("mover panicked");
    assert_eq!(context.rule_count(), 2);
    // Even number of swaps: original order
    let first = context.with_rules(|rules| rules.rules()[0].display_key.clone());
    assert_eq!(first, "Scene1 using Fade");
}
