//! End-to-end gate scenarios driven through [`GatePage`].
//!
//! ```sh
//! cargo test -p warpgate-web --test gate_page_e2e
//! ```

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use warpgate_core::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use warpgate_runtime::{
    BoostTransform, GateConfig, GateEffect, GateState, MemoryStorage, StorageBackend,
    TransitionCause, WarpOutcome,
};
use warpgate_web::{GatePage, StepResult};

const FRAME: Duration = Duration::from_millis(16);

fn ephemeral_page() -> GatePage {
    let mut page = GatePage::new(GateConfig::ephemeral(), Arc::new(MemoryStorage::new()));
    page.init().unwrap();
    page
}

/// Step at frame cadence until `state` is reached; returns every result.
fn run_until(page: &mut GatePage, state: GateState, max_frames: usize) -> Vec<StepResult> {
    let mut results = Vec::new();
    for _ in 0..max_frames {
        page.advance_time(FRAME);
        let result = page.step().unwrap();
        results.push(result);
        if result.state == state {
            return results;
        }
    }
    panic!("state {state} not reached in {max_frames} frames");
}

#[test]
fn soft_fallback_then_wheel_exit_reveals() {
    let mut page = ephemeral_page();
    assert_eq!(page.controller().state(), GateState::AwaitingInteraction);

    page.advance_time(Duration::from_millis(2300));
    let result = page.step().unwrap();
    assert_eq!(result.state, GateState::Geometrical);
    assert_eq!(
        page.controller().history().last().map(|r| r.cause),
        Some(TransitionCause::SoftFallback)
    );
    let effects = page.take_effects();
    assert!(effects.contains(&GateEffect::ScrollLock(false)));
    assert!(effects.contains(&GateEffect::ChromeVisible(true)));

    page.push_event(Event::wheel(60));
    page.step().unwrap();
    assert_eq!(page.controller().exit_requests(), 0);

    page.push_event(Event::wheel(60));
    let result = page.step().unwrap();
    assert_eq!(page.controller().exit_requests(), 1);
    assert_eq!(result.state, GateState::Transitioning);

    let frames = run_until(&mut page, GateState::Revealed, 200);
    let peak = frames.iter().map(|r| r.speed).fold(1.0f32, f32::max);
    assert_eq!(peak, 8.0);
    assert!(frames.iter().any(|r| r.streaks_visible));
    assert!(frames.iter().all(|r| r.speed >= 1.0));

    let last = frames.last().copied().unwrap();
    assert_eq!(last.speed, 1.0);
    assert_eq!(last.boost, BoostTransform::IDENTITY);
    assert!(!last.streaks_visible);
    assert!(page.now() >= Duration::from_millis(2300 + 1200));
    assert_eq!(page.controller().last_outcome(), Some(&WarpOutcome::Completed));
    assert_eq!(page.animator().completed_count(), 1);

    let effects = page.take_effects();
    assert!(effects.contains(&GateEffect::GateMounted(false)));
    assert_eq!(effects.last(), Some(&GateEffect::Completed));

    page.push_event(Event::wheel(500));
    page.advance_time(FRAME);
    let after = page.step().unwrap();
    assert_eq!(after.state, GateState::Revealed);
    assert_eq!(page.controller().exit_requests(), 1);
}

#[test]
fn threshold_not_reached_at_99() {
    let mut page = ephemeral_page();
    page.push_event(Event::Interaction);
    page.step().unwrap();

    page.push_event(Event::wheel(50));
    page.push_event(Event::wheel(49));
    let result = page.step().unwrap();
    assert_eq!(result.state, GateState::Geometrical);

    page.push_event(Event::wheel(1));
    let result = page.step().unwrap();
    assert_eq!(result.state, GateState::Transitioning);
}

#[test]
fn upward_wheel_drains_accumulator() {
    let mut page = ephemeral_page();
    page.push_event(Event::Interaction);
    page.push_event(Event::wheel(90));
    page.push_event(Event::wheel(-300));
    page.push_event(Event::wheel(90));
    let result = page.step().unwrap();
    assert_eq!(result.state, GateState::Geometrical);
    assert_eq!(page.controller().trigger().accumulator().value(), 90);
}

#[test]
fn keyboard_path() {
    let mut page = ephemeral_page();
    page.push_event(Event::key(KeyCode::from_dom_key(" ")));
    assert_eq!(page.step().unwrap().state, GateState::Geometrical);

    let release = KeyEvent::new(KeyCode::from_dom_key("ArrowDown")).with_kind(KeyEventKind::Release);
    page.push_event(Event::Key(release));
    assert_eq!(page.step().unwrap().state, GateState::Geometrical);

    page.push_event(Event::key(KeyCode::from_dom_key("PageDown")));
    assert_eq!(page.step().unwrap().state, GateState::Transitioning);
}

#[test]
fn return_to_intro_and_advance_again() {
    let mut page = ephemeral_page();
    page.push_event(Event::Interaction);
    page.step().unwrap();
    page.push_event(Event::Interaction);
    assert_eq!(page.step().unwrap().state, GateState::AwaitingInteraction);

    page.advance_time(Duration::from_millis(2199));
    assert_eq!(page.step().unwrap().state, GateState::AwaitingInteraction);
    page.advance_time(Duration::from_millis(1));
    assert_eq!(page.step().unwrap().state, GateState::Geometrical);
    assert_eq!(
        page.controller().history().last().map(|r| r.cause),
        Some(TransitionCause::SoftFallback)
    );
}

#[test]
fn reentry_at_top_of_page() {
    let mut page = ephemeral_page();
    page.push_event(Event::Interaction);
    page.push_event(Event::key(KeyCode::Down));
    page.step().unwrap();
    run_until(&mut page, GateState::Revealed, 200);
    page.take_effects();

    page.set_scroll_offset(640.0);
    page.set_scroll_offset(1.0);
    assert_eq!(page.step().unwrap().state, GateState::Revealed);

    page.set_scroll_offset(0.0);
    assert_eq!(page.step().unwrap().state, GateState::Geometrical);
    assert_eq!(
        page.take_effects(),
        vec![GateEffect::GateMounted(true), GateEffect::ChromeVisible(true)]
    );

    page.push_event(Event::wheel(100));
    assert_eq!(page.step().unwrap().state, GateState::Transitioning);
    run_until(&mut page, GateState::Revealed, 200);
    assert_eq!(page.animator().completed_count(), 2);
}

#[test]
fn remembered_session_skips_gate() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let config = GateConfig::new("site:intro");

    let mut first = GatePage::new(config.clone(), Arc::clone(&storage));
    first.init().unwrap();
    first.push_event(Event::Interaction);
    first.push_event(Event::key(KeyCode::Space));
    first.step().unwrap();
    run_until(&mut first, GateState::Revealed, 200);
    assert_eq!(storage.get("site:intro").unwrap().as_deref(), Some("done"));
    first.unmount();

    let mut second = GatePage::new(config, storage);
    second.init().unwrap();
    assert!(second.take_effects().is_empty());
    let result = second.step().unwrap();
    assert_eq!(result.state, GateState::Revealed);
    assert_eq!(result.speed, 1.0);
}

#[test]
fn unmount_stops_fallbacks() {
    let mut page = ephemeral_page();
    page.unmount();
    page.advance_time(Duration::from_secs(10));
    assert_eq!(page.step().unwrap().state, GateState::AwaitingInteraction);
    assert!(!page.bus().has_subscriber());
}
