//! Session state machine and fixed-timestep tick
//!
//! Menu → Playing → GameOver transitions, the round sub-cycle, scoring,
//! power-ups. Nothing here touches rendering or the platform, so the whole
//! game is testable headlessly.

use super::difficulty;
use super::powerups::PowerKind;
use super::schedule::{TimerHandle, TimerKind};
use super::spawn::SpawnPlan;
use super::state::{AnswerEntity, GameEvent, GamePhase, RoundPhase, SessionState, SoundCue};
use crate::consts::*;
use crate::ms_to_ticks;
use crate::problem::Problem;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Target catcher x (from pointer/touch position)
    pub target_x: Option<f32>,
    /// Start a session from the menu
    pub start: bool,
    /// Leave the game-over screen back to the menu
    pub play_again: bool,
    /// Activate a power-up
    pub activate_power: Option<PowerKind>,
}

/// Advance the session by one fixed timestep
pub fn tick(state: &mut SessionState, input: &TickInput, dt: f32) {
    match state.phase {
        GamePhase::Menu => {
            if input.start {
                start_session(state);
            }
            return;
        }
        GamePhase::GameOver => {
            if input.play_again {
                state.phase = GamePhase::Menu;
                log::info!("Back to menu");
            }
            return;
        }
        GamePhase::Playing => {}
    }

    state.time_ticks += 1;

    // Catcher follows the pointer directly
    if let Some(x) = input.target_x {
        state.catcher.move_to(x);
    }

    if let Some(kind) = input.activate_power {
        activate_power(state, kind);
    }

    // Cosmetic countdowns
    state.banner_ticks = state.banner_ticks.saturating_sub(1);
    state.flash_ticks = state.flash_ticks.saturating_sub(1);

    // Order matters: fall, then catches, then misses, then timers. A block
    // spawned by a timer this tick must not move or resolve until the next.
    state.field.integrate(state.gravity, dt);

    if state.round != RoundPhase::AwaitingProblem {
        resolve_catches(state);
        resolve_misses(state);
    }
    if state.phase != GamePhase::Playing {
        return;
    }

    let fired = state.timers.fire_due(state.time_ticks);
    for (handle, kind) in fired {
        match kind {
            TimerKind::SpawnEntity => on_spawn_timer(state, handle),
            TimerKind::AdvanceRound => on_advance_timer(state),
            TimerKind::RestoreGravity => on_restore_timer(state),
        }
    }
}

/// Reset everything and enter the first round
pub fn start_session(state: &mut SessionState) {
    state.timers.cancel_all();
    state.spawn_timer = None;
    state.advance_timer = None;
    state.slowdown_timer = None;

    state.phase = GamePhase::Playing;
    state.score = 0;
    state.lives = START_LIVES;
    state.level = 1;
    state.nominal_gravity = difficulty::gravity(1);
    state.gravity = state.nominal_gravity;
    state.problem = None;
    state.plan.clear();
    state.field.clear();
    state.powers.refresh();
    state.banner_ticks = 0;
    state.flash_ticks = 0;

    state.emit(GameEvent::ScoreChanged { score: 0 });
    state.emit(GameEvent::LivesChanged { lives: state.lives });
    state.emit(GameEvent::LevelChanged { level: 1 });
    state.emit(GameEvent::PowersRefreshed);

    log::info!("Session started (seed {})", state.seed);
    request_problem(state);
}

/// Shell callback: a problem arrived for request `serial`. Stale serials
/// (the session restarted or moved on while the fetch was in flight) are
/// dropped.
pub fn problem_ready(state: &mut SessionState, serial: u64, problem: Problem) {
    if serial != state.round_serial
        || state.phase != GamePhase::Playing
        || state.round != RoundPhase::AwaitingProblem
    {
        log::debug!("Dropping stale problem response (serial {serial})");
        return;
    }

    log::debug!("Round {serial}: {}", problem.question);
    state.emit(GameEvent::QuestionChanged {
        text: problem.question.clone(),
    });

    let mut rng = state.rng_state.next_rng();
    state.plan = SpawnPlan::build(&problem, &mut rng);
    state.problem = Some(problem);
    state.round = RoundPhase::Spawning;

    let interval = difficulty::spawn_interval_ticks(state.level);
    let handle = state
        .timers
        .schedule_repeating(TimerKind::SpawnEntity, state.time_ticks, interval);
    state.spawn_timer = Some(handle);
}

/// Shell callback: the problem service failed. The built-in fallback keeps
/// the round moving; the player never sees the error.
pub fn problem_failed(state: &mut SessionState, serial: u64) {
    if serial == state.round_serial && state.round == RoundPhase::AwaitingProblem {
        log::warn!("Problem service failed, using fallback problem");
    }
    problem_ready(state, serial, Problem::fallback());
}

/// Power activation. Consumed powers and non-Playing phases are no-ops.
pub fn activate_power(state: &mut SessionState, kind: PowerKind) {
    if state.phase != GamePhase::Playing || !state.powers.is_available(kind) {
        return;
    }

    match kind {
        PowerKind::Slowdown => {
            state.powers.consume(kind);
            state.emit(GameEvent::PowerUsed { power: kind });
            // Re-activation after a level-up refresh replaces the window
            // instead of compounding the divisor
            if let Some(old) = state.slowdown_timer.take() {
                state.timers.cancel(old);
            }
            state.gravity = state.nominal_gravity / SLOWDOWN_FACTOR;
            let handle = state.timers.schedule_once(
                TimerKind::RestoreGravity,
                state.time_ticks,
                ms_to_ticks(SLOWDOWN_MS),
            );
            state.slowdown_timer = Some(handle);
            log::debug!("Slowdown active, gravity {}", state.gravity);
        }
        PowerKind::Shield => {
            // Passive: stays available until a mistake consumes it
            state.emit(GameEvent::ShieldArmed);
            log::debug!("Shield armed");
        }
        PowerKind::Clear => {
            state.powers.consume(kind);
            state.emit(GameEvent::PowerUsed { power: kind });
            let removed = state.field.clear_distractors();
            log::debug!("Clear destroyed {removed} distractors");
            maybe_schedule_advance(state);
        }
    }
}

/// Move to AwaitingProblem and ask the shell for the next problem
fn request_problem(state: &mut SessionState) {
    state.round = RoundPhase::AwaitingProblem;
    state.round_serial += 1;
    state.emit(GameEvent::ProblemRequested {
        level: state.level,
        serial: state.round_serial,
    });
}

fn on_spawn_timer(state: &mut SessionState, handle: TimerHandle) {
    let Some(block) = state.plan.pop() else {
        state.timers.cancel(handle);
        state.spawn_timer = None;
        return;
    };

    let id = state.next_entity_id();
    state
        .field
        .spawn(AnswerEntity::new(id, block.value, block.is_correct, block.x));

    if state.plan.is_empty() {
        state.timers.cancel(handle);
        state.spawn_timer = None;
        state.round = RoundPhase::Resolving;
    }
}

fn on_advance_timer(state: &mut SessionState) {
    state.advance_timer = None;
    state.problem = None;
    request_problem(state);
}

fn on_restore_timer(state: &mut SessionState) {
    state.slowdown_timer = None;
    state.gravity = state.nominal_gravity;
    log::debug!("Slowdown expired, gravity {}", state.gravity);
}

fn resolve_catches(state: &mut SessionState) {
    let caught = state.field.take_caught(&state.catcher.aabb());
    for entity in caught {
        if state.phase != GamePhase::Playing {
            break;
        }
        if entity.is_correct {
            on_correct_catch(state);
            // Round resolved; the rest of the batch was cleared with it
            break;
        }
        log::debug!("Incorrect catch: {}", entity.value);
        penalize_mistake(state);
    }
    maybe_schedule_advance(state);
}

fn resolve_misses(state: &mut SessionState) {
    let missed = state.field.take_missed();
    for entity in missed {
        if state.phase != GamePhase::Playing {
            break;
        }
        // Only a correct answer hitting the floor costs anything
        if entity.is_correct {
            log::debug!("Missed correct answer {}", entity.value);
            penalize_mistake(state);
        }
    }
    maybe_schedule_advance(state);
}

fn on_correct_catch(state: &mut SessionState) {
    state.play(SoundCue::Correct);
    state.score += CATCH_SCORE;
    state.emit(GameEvent::ScoreChanged { score: state.score });
    log::debug!("Correct catch, score {}", state.score);

    if state.score > 0 && state.score % LEVEL_STEP_SCORE == 0 {
        level_up(state);
    }

    // The rest of the round is moot: stop spawning, drop leftovers
    if let Some(handle) = state.spawn_timer.take() {
        state.timers.cancel(handle);
    }
    state.plan.clear();
    state.field.clear();
    state.round = RoundPhase::Resolving;
}

/// Shield-forgiveness or life loss, shared by incorrect catches and missed
/// correct answers
fn penalize_mistake(state: &mut SessionState) {
    if state.powers.consume(PowerKind::Shield) {
        state.emit(GameEvent::PowerUsed {
            power: PowerKind::Shield,
        });
        log::debug!("Shield absorbed the mistake");
        return;
    }

    state.play(SoundCue::Incorrect);
    state.lives = state.lives.saturating_sub(1);
    state.emit(GameEvent::LivesChanged { lives: state.lives });
    state.emit(GameEvent::MistakePenalized);
    state.flash_ticks = ms_to_ticks(FLASH_MS);

    if state.lives == 0 {
        end_session(state);
    }
}

fn level_up(state: &mut SessionState) {
    state.level += 1;
    log::info!("Level up! Now at level {}", state.level);

    state.powers.refresh();
    state.emit(GameEvent::PowersRefreshed);
    state.emit(GameEvent::LevelChanged { level: state.level });
    state.play(SoundCue::LevelUp);
    state.banner_ticks = ms_to_ticks(BANNER_MS);

    // New nominal gravity. If a slowdown window is running, keep the ratio
    // so the later restore lands on the new level, not the old one.
    state.nominal_gravity = difficulty::gravity(state.level);
    state.gravity = if state.slowdown_timer.is_some() {
        state.nominal_gravity / SLOWDOWN_FACTOR
    } else {
        state.nominal_gravity
    };
}

/// A round is over when the plan is exhausted and the field is empty. Any
/// removal path (catch, miss, Clear) can be the one that empties it, so
/// every path funnels through here.
fn maybe_schedule_advance(state: &mut SessionState) {
    if state.phase != GamePhase::Playing
        || state.round != RoundPhase::Resolving
        || !state.plan.is_empty()
        || !state.field.is_empty()
        || state.advance_timer.is_some()
    {
        return;
    }
    let handle = state.timers.schedule_once(
        TimerKind::AdvanceRound,
        state.time_ticks,
        ms_to_ticks(ROUND_ADVANCE_MS),
    );
    state.advance_timer = Some(handle);
}

/// All lives lost: cancel in-flight timers so nothing mutates the dead
/// session, then surface the final score
fn end_session(state: &mut SessionState) {
    state.phase = GamePhase::GameOver;
    state.round = RoundPhase::AwaitingProblem;
    state.timers.cancel_all();
    state.spawn_timer = None;
    state.advance_timer = None;
    state.slowdown_timer = None;
    state.plan.clear();
    state.field.clear();

    state.play(SoundCue::GameOver);
    state.emit(GameEvent::SessionEnded { score: state.score });
    log::info!("Game over, final score {}", state.score);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn start() -> SessionState {
        let mut state = SessionState::new(7);
        let input = TickInput {
            start: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        state
    }

    fn step(state: &mut SessionState, n: u32) {
        let input = TickInput::default();
        for _ in 0..n {
            tick(state, &input, SIM_DT);
        }
    }

    /// Drop a block straight into the field at a chosen height
    fn place_block(state: &mut SessionState, value: i32, correct: bool, x: f32, y: f32) {
        let id = state.next_entity_id();
        let mut e = AnswerEntity::new(id, value, correct, x);
        e.pos.y = y;
        state.field.spawn(e);
    }

    /// Put the session mid-round with a fully spawned answer set
    fn resolving(state: &mut SessionState) {
        state.round = RoundPhase::Resolving;
        state.plan.clear();
    }

    fn drain(state: &mut SessionState) {
        state.drain_events();
        state.drain_sounds();
    }

    #[test]
    fn test_start_enters_first_round() {
        let mut state = SessionState::new(1);
        assert_eq!(state.phase, GamePhase::Menu);

        let input = TickInput {
            start: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.round, RoundPhase::AwaitingProblem);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::ProblemRequested { level: 1, serial: 1 }));
        assert!(events.contains(&GameEvent::ScoreChanged { score: 0 }));
        assert!(events.contains(&GameEvent::LivesChanged { lives: 3 }));
        assert!(events.contains(&GameEvent::PowersRefreshed));
    }

    #[test]
    fn test_problem_ready_spawns_on_schedule() {
        let mut state = start();
        problem_ready(&mut state, 1, Problem::fallback());

        assert_eq!(state.round, RoundPhase::Spawning);
        assert_eq!(state.plan.len(), 4);
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::QuestionChanged { text } if text == "x² - 5x + 6 = 0"))
        );

        // Level 1 spawn interval is 900ms
        let interval = difficulty::spawn_interval_ticks(1);
        step(&mut state, interval - 1);
        assert_eq!(state.field.len(), 0);
        step(&mut state, 1);
        assert_eq!(state.field.len(), 1);
        // A block spawned this tick has not been integrated yet
        assert_eq!(state.field.iter().next().map(|e| e.vel_y), Some(0.0));

        step(&mut state, interval * 3);
        assert_eq!(state.field.len(), 4);
        assert_eq!(state.round, RoundPhase::Resolving);
        assert!(state.spawn_timer.is_none());
        assert!(state.plan.is_empty());
    }

    #[test]
    fn test_stale_problem_response_is_dropped() {
        let mut state = start();
        problem_ready(&mut state, 99, Problem::fallback());

        assert_eq!(state.round, RoundPhase::AwaitingProblem);
        assert!(state.plan.is_empty());
        assert!(state.problem.is_none());
    }

    #[test]
    fn test_problem_failure_falls_back() {
        let mut state = start();
        problem_failed(&mut state, 1);

        assert_eq!(state.round, RoundPhase::Spawning);
        let q = state.problem.as_ref().map(|p| p.question.as_str());
        assert_eq!(q, Some("x² - 5x + 6 = 0"));
    }

    #[test]
    fn test_catches_ignored_while_awaiting_problem() {
        let mut state = start();
        drain(&mut state);
        // A stray block lands on the catcher before any problem exists
        let x = state.catcher.x;
        place_block(&mut state, 2, true, x, CATCHER_Y - 10.0);

        step(&mut state, 1);
        assert_eq!(state.score, 0);
        assert_eq!(state.field.len(), 1);
    }

    #[test]
    fn test_correct_catch_scores_ten() {
        let mut state = start();
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, 2, true, x, CATCHER_Y - 20.0);
        place_block(&mut state, -2, false, 100.0, 200.0);
        drain(&mut state);

        step(&mut state, 1);

        assert_eq!(state.score, 10);
        assert_eq!(state.level, 1);
        assert_eq!(state.lives, 3);
        // Leftover blocks are cleared with the round
        assert!(state.field.is_empty());
        assert!(state.advance_timer.is_some());
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::ScoreChanged { score: 10 }));
        assert_eq!(state.drain_sounds(), vec![SoundCue::Correct]);
        // No power was touched
        for kind in PowerKind::ALL {
            assert!(state.powers.is_available(kind));
        }
    }

    #[test]
    fn test_round_advances_after_delay() {
        let mut state = start();
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, 2, true, x, CATCHER_Y - 20.0);
        step(&mut state, 1);
        drain(&mut state);

        step(&mut state, ms_to_ticks(ROUND_ADVANCE_MS));
        assert_eq!(state.round, RoundPhase::AwaitingProblem);
        assert_eq!(state.round_serial, 2);
        assert!(state.advance_timer.is_none());
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::ProblemRequested { level: 1, serial: 2 })
        );
    }

    #[test]
    fn test_level_up_every_fifty_points() {
        let mut state = start();
        state.score = 40;
        state.powers.consume(PowerKind::Shield);
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, 3, true, x, CATCHER_Y - 20.0);
        drain(&mut state);

        step(&mut state, 1);

        assert_eq!(state.score, 50);
        assert_eq!(state.level, 2);
        // fall_time(2) = 9s drives the new gravity
        assert_eq!(state.gravity, difficulty::gravity(2));
        assert!(state.banner_ticks > 0);
        // Refresh brought the consumed shield back
        assert!(state.powers.is_available(PowerKind::Shield));
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::PowersRefreshed));
        assert!(events.contains(&GameEvent::LevelChanged { level: 2 }));
    }

    #[test]
    fn test_no_level_up_off_multiples() {
        let mut state = start();
        state.score = 20;
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, 2, true, x, CATCHER_Y - 20.0);

        step(&mut state, 1);
        assert_eq!(state.score, 30);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn test_shield_forgives_first_mistake() {
        let mut state = start();
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, -2, false, x, CATCHER_Y - 20.0);
        drain(&mut state);

        step(&mut state, 1);

        assert_eq!(state.lives, 3);
        assert!(!state.powers.is_available(PowerKind::Shield));
        assert_eq!(state.flash_ticks, 0);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::PowerUsed {
            power: PowerKind::Shield
        }));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::LivesChanged { .. })));
        // Forgiven mistakes stay silent
        assert!(state.drain_sounds().is_empty());
    }

    #[test]
    fn test_incorrect_catch_costs_life() {
        let mut state = start();
        state.powers.consume(PowerKind::Shield);
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, -2, false, x, CATCHER_Y - 20.0);
        drain(&mut state);

        step(&mut state, 1);

        assert_eq!(state.lives, 2);
        assert!(state.flash_ticks > 0);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::LivesChanged { lives: 2 }));
        assert!(events.contains(&GameEvent::MistakePenalized));
        assert_eq!(state.drain_sounds(), vec![SoundCue::Incorrect]);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_missed_distractor_is_free() {
        let mut state = start();
        state.powers.consume(PowerKind::Shield);
        resolving(&mut state);
        place_block(&mut state, -2, false, 200.0, MISS_Y + 1.0);
        drain(&mut state);

        step(&mut state, 1);

        assert_eq!(state.lives, 3);
        assert!(state.field.is_empty());
        assert!(state.drain_sounds().is_empty());
        // Field emptied by the miss, so the round still advances
        assert!(state.advance_timer.is_some());
    }

    #[test]
    fn test_missed_correct_costs_life() {
        let mut state = start();
        state.powers.consume(PowerKind::Shield);
        resolving(&mut state);
        place_block(&mut state, 2, true, 200.0, MISS_Y + 1.0);
        drain(&mut state);

        step(&mut state, 1);

        assert_eq!(state.lives, 2);
        assert_eq!(state.drain_sounds(), vec![SoundCue::Incorrect]);
        assert!(state.advance_timer.is_some());
    }

    #[test]
    fn test_shielded_miss_of_last_block_still_advances() {
        let mut state = start();
        resolving(&mut state);
        place_block(&mut state, 2, true, 200.0, MISS_Y + 1.0);

        step(&mut state, 1);

        assert_eq!(state.lives, 3);
        assert!(!state.powers.is_available(PowerKind::Shield));
        assert!(state.advance_timer.is_some());
    }

    #[test]
    fn test_incorrect_catch_of_last_block_still_advances() {
        let mut state = start();
        state.powers.consume(PowerKind::Shield);
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, -2, false, x, CATCHER_Y - 20.0);

        step(&mut state, 1);

        assert_eq!(state.lives, 2);
        assert!(state.field.is_empty());
        assert!(state.advance_timer.is_some());
    }

    #[test]
    fn test_game_over_on_last_life() {
        let mut state = start();
        state.lives = 1;
        state.score = 120;
        state.powers.consume(PowerKind::Shield);
        resolving(&mut state);
        place_block(&mut state, 5, true, 200.0, MISS_Y + 1.0);
        drain(&mut state);

        step(&mut state, 1);

        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.lives, 0);
        assert!(state.timers.is_empty());
        assert!(state.field.is_empty());
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::SessionEnded { score: 120 })
        );
        assert!(state.drain_sounds().contains(&SoundCue::GameOver));
    }

    #[test]
    fn test_play_again_returns_to_menu() {
        let mut state = start();
        state.lives = 1;
        state.powers.consume(PowerKind::Shield);
        resolving(&mut state);
        place_block(&mut state, 5, true, 200.0, MISS_Y + 1.0);
        step(&mut state, 1);
        assert_eq!(state.phase, GamePhase::GameOver);

        let input = TickInput {
            play_again: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.phase, GamePhase::Menu);
    }

    #[test]
    fn test_slowdown_divides_and_restores_gravity() {
        let mut state = start();
        let nominal = difficulty::gravity(1);
        drain(&mut state);

        let input = TickInput {
            activate_power: Some(PowerKind::Slowdown),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert_eq!(state.gravity, nominal / SLOWDOWN_FACTOR);
        assert!(state.slowdown_active());
        assert!(state.drain_events().contains(&GameEvent::PowerUsed {
            power: PowerKind::Slowdown
        }));

        step(&mut state, ms_to_ticks(SLOWDOWN_MS));
        assert_eq!(state.gravity, nominal);
        assert!(!state.slowdown_active());
    }

    #[test]
    fn test_level_up_during_slowdown_retargets_restore() {
        let mut state = start();
        let input = TickInput {
            activate_power: Some(PowerKind::Slowdown),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.gravity, difficulty::gravity(1) / SLOWDOWN_FACTOR);

        // Level up while the window is open
        state.score = 40;
        resolving(&mut state);
        let x = state.catcher.x;
        place_block(&mut state, 3, true, x, CATCHER_Y - 20.0);
        step(&mut state, 1);
        assert_eq!(state.level, 2);

        // Still slowed, but relative to the new level
        assert_eq!(state.gravity, difficulty::gravity(2) / SLOWDOWN_FACTOR);

        // The restore lands on the new level's gravity, not level 1's
        step(&mut state, ms_to_ticks(SLOWDOWN_MS));
        assert_eq!(state.gravity, difficulty::gravity(2));
    }

    #[test]
    fn test_slowdown_reactivation_replaces_window() {
        let mut state = start();
        let input = TickInput {
            activate_power: Some(PowerKind::Slowdown),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        // A level-up refresh makes the power available again mid-window
        state.powers.refresh();
        tick(&mut state, &input, SIM_DT);

        // The divisor never compounds and only one restore is pending
        assert_eq!(state.gravity, state.nominal_gravity / SLOWDOWN_FACTOR);
        assert_eq!(state.timers.len(), 1);
    }

    #[test]
    fn test_consumed_power_is_a_noop() {
        let mut state = start();
        let input = TickInput {
            activate_power: Some(PowerKind::Slowdown),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        drain(&mut state);

        tick(&mut state, &input, SIM_DT);
        // Second press changes nothing and emits nothing
        assert_eq!(state.gravity, state.nominal_gravity / SLOWDOWN_FACTOR);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_power_activation_outside_playing_is_a_noop() {
        let mut state = SessionState::new(3);
        activate_power(&mut state, PowerKind::Clear);
        assert!(state.powers.is_available(PowerKind::Clear));
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_clear_destroys_only_distractors() {
        let mut state = start();
        resolving(&mut state);
        place_block(&mut state, 2, true, 150.0, 100.0);
        place_block(&mut state, 3, true, 300.0, 100.0);
        place_block(&mut state, -2, false, 450.0, 100.0);
        place_block(&mut state, -3, false, 600.0, 100.0);
        drain(&mut state);

        let input = TickInput {
            activate_power: Some(PowerKind::Clear),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert_eq!(state.field.len(), 2);
        assert!(state.field.iter().all(|e| e.is_correct));
        assert_eq!(state.score, 0);
        assert_eq!(state.lives, 3);
        assert!(!state.powers.is_available(PowerKind::Clear));
        assert!(state.drain_events().contains(&GameEvent::PowerUsed {
            power: PowerKind::Clear
        }));
    }

    #[test]
    fn test_clear_consumes_even_without_targets() {
        let mut state = start();
        resolving(&mut state);
        place_block(&mut state, 2, true, 150.0, 100.0);

        let input = TickInput {
            activate_power: Some(PowerKind::Clear),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert_eq!(state.field.len(), 1);
        assert!(!state.powers.is_available(PowerKind::Clear));
    }

    #[test]
    fn test_clear_emptying_field_advances_round() {
        let mut state = start();
        resolving(&mut state);
        place_block(&mut state, -2, false, 150.0, 100.0);
        place_block(&mut state, -3, false, 300.0, 100.0);

        let input = TickInput {
            activate_power: Some(PowerKind::Clear),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert!(state.field.is_empty());
        assert!(state.advance_timer.is_some());
    }

    #[test]
    fn test_shield_arming_does_not_consume() {
        let mut state = start();
        drain(&mut state);

        let input = TickInput {
            activate_power: Some(PowerKind::Shield),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert!(state.powers.is_available(PowerKind::Shield));
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::ShieldArmed));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PowerUsed { .. })));
    }

    #[test]
    fn test_restart_cancels_pending_timers() {
        let mut state = start();
        let input = TickInput {
            activate_power: Some(PowerKind::Slowdown),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert!(state.slowdown_active());

        // Restart while the restore is still pending
        start_session(&mut state);
        assert!(state.timers.is_empty());
        assert_eq!(state.gravity, difficulty::gravity(1));

        // Long after the stale restore would have fired, gravity is untouched
        step(&mut state, ms_to_ticks(SLOWDOWN_MS) * 2);
        assert_eq!(state.gravity, difficulty::gravity(1));
    }

    proptest! {
        // Level stays 1 + score/50, so each crossing levels up exactly once
        #[test]
        fn prop_level_tracks_score(catches in 1u32..30) {
            let mut state = start();
            for _ in 0..catches {
                resolving(&mut state);
                let x = state.catcher.x;
                place_block(&mut state, 2, true, x, CATCHER_Y - 20.0);
                step(&mut state, 1);
            }
            prop_assert_eq!(state.score, catches * CATCH_SCORE);
            prop_assert_eq!(state.level, 1 + catches * CATCH_SCORE / LEVEL_STEP_SCORE);
        }
    }

    #[test]
    fn test_determinism() {
        fn run(seed: u64) -> SessionState {
            let mut state = SessionState::new(seed);
            tick(
                &mut state,
                &TickInput {
                    start: true,
                    ..Default::default()
                },
                SIM_DT,
            );
            let serial = state.round_serial;
            problem_ready(&mut state, serial, Problem::fallback());
            for i in 0..400u32 {
                let input = TickInput {
                    target_x: Some(100.0 + (i % 600) as f32),
                    ..Default::default()
                };
                tick(&mut state, &input, SIM_DT);
            }
            state.drain_events();
            state.drain_sounds();
            state
        }

        let a = run(4242);
        let b = run(4242);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
