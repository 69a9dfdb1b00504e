//! Root Catch entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};
    use web_sys::{
        Document, HtmlCanvasElement, KeyboardEvent, MouseEvent, PointerEvent, Request,
        RequestInit, Response, TouchEvent,
    };

    use root_catch::audio::AudioManager;
    use root_catch::consts::*;
    use root_catch::problem::{self, Problem, ProblemError, ProblemRequest};
    use root_catch::renderer::Renderer;
    use root_catch::settings::Settings;
    use root_catch::sim::{
        self, GameEvent, GamePhase, PowerKind, SessionState, TickInput, tick,
    };

    /// Game instance holding all state
    struct Game {
        state: SessionState,
        renderer: Renderer,
        audio: AudioManager,
        settings: Settings,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, renderer: Renderer, audio: AudioManager, settings: Settings) -> Self {
            Self {
                state: SessionState::new(seed),
                renderer,
                audio,
                settings,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32, time: f64) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = self.input.clone();
                tick(&mut self.state, &input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.start = false;
                self.input.play_again = false;
                self.input.activate_power = None;
            }

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;

            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }
        }

        /// Render the current frame
        fn render(&self) {
            self.renderer.render(&self.state, &self.settings);
        }

        /// Per-frame DOM updates: overlay visibility and the FPS counter
        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };

            if let Some(el) = document.get_element_by_id("menu") {
                let class = if self.state.phase == GamePhase::Menu {
                    "overlay"
                } else {
                    "overlay hidden"
                };
                let _ = el.set_attribute("class", class);
            }
            if let Some(el) = document.get_element_by_id("game-over") {
                let class = if self.state.phase == GamePhase::GameOver {
                    "overlay"
                } else {
                    "overlay hidden"
                };
                let _ = el.set_attribute("class", class);
            }

            if self.settings.show_fps {
                if let Some(el) = document.get_element_by_id("hud-fps") {
                    el.set_text_content(Some(&self.fps.to_string()));
                }
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Root Catch starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        let renderer = Renderer::new(canvas.clone()).expect("Failed to init renderer");

        let settings = Settings::load();
        let mut audio = AudioManager::new();
        audio.set_master_volume(settings.master_volume);
        audio.set_sfx_volume(settings.sfx_volume);

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, renderer, audio, settings)));

        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(&canvas, game.clone());
        setup_buttons(game.clone());
        setup_blur_mute(game.clone());

        // Start game loop
        request_animation_frame(game);

        log::info!("Root Catch running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Pointer move - the catcher follows the cursor
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let client_w = canvas_clone.client_width() as f32;
                if client_w > 0.0 {
                    let scale = FIELD_WIDTH / client_w;
                    let mut g = game.borrow_mut();
                    g.input.target_x = Some(event.offset_x() as f32 * scale);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Click starts a session (or leaves the game-over screen)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                match g.state.phase {
                    GamePhase::Menu => g.input.start = true,
                    GamePhase::GameOver => g.input.play_again = true,
                    GamePhase::Playing => {}
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch move
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let rect = canvas_clone.get_bounding_client_rect();
                    let client_w = rect.width() as f32;
                    if client_w > 0.0 {
                        let x = touch.client_x() as f32 - rect.left() as f32;
                        let mut g = game.borrow_mut();
                        g.input.target_x = Some(x * (FIELD_WIDTH / client_w));
                    }
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard: space/enter starts, digits fire power-ups, F toggles FPS
        {
            let game = game.clone();
            let window = web_sys::window().unwrap();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                match event.key().as_str() {
                    " " | "Enter" => match g.state.phase {
                        GamePhase::Menu => g.input.start = true,
                        GamePhase::GameOver => g.input.play_again = true,
                        GamePhase::Playing => {}
                    },
                    "1" => g.input.activate_power = Some(PowerKind::Slowdown),
                    "2" => g.input.activate_power = Some(PowerKind::Shield),
                    "3" => g.input.activate_power = Some(PowerKind::Clear),
                    "f" | "F" => {
                        g.settings.show_fps = !g.settings.show_fps;
                        g.settings.save();
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        if let Some(btn) = document.get_element_by_id("start-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                g.input.start = true;
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("play-again-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().input.play_again = true;
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        for kind in PowerKind::ALL {
            let id = format!("power-{}", kind.as_str());
            if let Some(btn) = document.get_element_by_id(&id) {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                    game.borrow_mut().input.activate_power = Some(kind);
                });
                let _ =
                    btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
    }

    fn setup_blur_mute(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.settings.mute_on_blur {
                    g.audio.set_muted(true);
                }
            });
            let _ =
                window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().audio.set_muted(false);
            });
            let _ =
                window.add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let (events, sounds) = {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            let events = g.state.drain_events();
            let sounds = g.state.drain_sounds();
            (events, sounds)
        };

        handle_events(&game, &events);

        {
            let g = game.borrow();
            for cue in sounds {
                g.audio.play(cue);
            }
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }

    /// Apply drained session events to the DOM and kick off problem fetches
    fn handle_events(game: &Rc<RefCell<Game>>, events: &[GameEvent]) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        for event in events {
            match event {
                GameEvent::ScoreChanged { score } => {
                    set_text(&document, "hud-score", &score.to_string());
                }
                GameEvent::LivesChanged { lives } => {
                    set_text(&document, "hud-lives", &lives.to_string());
                }
                GameEvent::LevelChanged { level } => {
                    set_text(&document, "hud-level", &level.to_string());
                }
                GameEvent::QuestionChanged { text } => {
                    set_text(&document, "question", text);
                }
                GameEvent::ProblemRequested { level, serial } => {
                    spawn_problem_fetch(game.clone(), *level, *serial);
                }
                GameEvent::PowerUsed { power } => {
                    set_power_enabled(&document, *power, false);
                }
                GameEvent::PowersRefreshed => {
                    for kind in PowerKind::ALL {
                        set_power_enabled(&document, kind, true);
                    }
                }
                GameEvent::ShieldArmed => {
                    if let Some(el) = document.get_element_by_id("power-shield") {
                        let _ = el.set_attribute("class", "power-btn armed");
                    }
                }
                // The renderer drives the red flash from flash_ticks
                GameEvent::MistakePenalized => {}
                GameEvent::SessionEnded { score } => {
                    set_text(&document, "final-score", &score.to_string());
                }
            }
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_power_enabled(document: &Document, kind: PowerKind, enabled: bool) {
        let id = format!("power-{}", kind.as_str());
        if let Some(el) = document.get_element_by_id(&id) {
            if enabled {
                let _ = el.remove_attribute("disabled");
                let _ = el.set_attribute("class", "power-btn");
            } else {
                let _ = el.set_attribute("disabled", "");
                let _ = el.set_attribute("class", "power-btn used");
            }
        }
    }

    /// Fetch a problem for `level`, then hand the result (or the failure)
    /// back to the session under the request's serial
    fn spawn_problem_fetch(game: Rc<RefCell<Game>>, level: u32, serial: u64) {
        spawn_local(async move {
            match fetch_problem(level).await {
                Ok(problem) => {
                    let mut g = game.borrow_mut();
                    sim::problem_ready(&mut g.state, serial, problem);
                }
                Err(err) => {
                    log::warn!("Problem fetch failed: {err}");
                    let mut g = game.borrow_mut();
                    sim::problem_failed(&mut g.state, serial);
                }
            }
        });
    }

    async fn fetch_problem(level: u32) -> Result<Problem, ProblemError> {
        let body = serde_json::to_string(&ProblemRequest { level })?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_body(&JsValue::from_str(&body));

        let request = Request::new_with_str_and_init("/api/generate-problem", &opts)
            .map_err(js_err)?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(js_err)?;

        let window = web_sys::window().ok_or_else(|| ProblemError::Network("no window".into()))?;
        let resp: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)?;

        if !resp.ok() {
            return Err(ProblemError::Status(resp.status()));
        }

        let text = JsFuture::from(resp.text().map_err(js_err)?)
            .await
            .map_err(js_err)?
            .as_string()
            .ok_or_else(|| ProblemError::Network("response body is not text".into()))?;

        problem::parse_payload(&text)
    }

    fn js_err(value: impl std::fmt::Debug) -> ProblemError {
        ProblemError::Network(format!("{value:?}"))
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    log::info!("Root Catch (native) headless demo, seed {seed}");
    headless_demo(seed);
}

/// Run a scripted session against the local problem generator. The policy
/// just chases the first correct answer still falling.
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo(seed: u64) {
    use root_catch::consts::{FIELD_WIDTH, SIM_DT};
    use root_catch::problem;
    use root_catch::sim::{self, GameEvent, GamePhase, SessionState, TickInput};

    let mut state = SessionState::new(seed);
    let mut input = TickInput {
        start: true,
        ..Default::default()
    };

    // Ten simulated minutes is plenty to show a few level-ups
    let max_ticks = 10 * 60 * 60;
    for _ in 0..max_ticks {
        sim::tick(&mut state, &input, SIM_DT);
        input.start = false;

        for event in state.drain_events() {
            match event {
                GameEvent::ProblemRequested { level, serial } => {
                    let mut rng = state.rng_state.next_rng();
                    let problem = problem::generate(level, &mut rng);
                    sim::problem_ready(&mut state, serial, problem);
                }
                GameEvent::QuestionChanged { text } => log::info!("Solve: {text}"),
                GameEvent::LevelChanged { level } => log::info!("Reached level {level}"),
                GameEvent::LivesChanged { lives } => log::info!("Lives: {lives}"),
                _ => {}
            }
        }
        state.drain_sounds();

        if state.phase == GamePhase::GameOver {
            break;
        }

        input.target_x = state
            .field
            .iter()
            .find(|e| e.is_correct)
            .map(|e| e.pos.x)
            .or(Some(FIELD_WIDTH / 2.0));
    }

    println!(
        "Demo finished: score {}, level {}, lives {}, {} ticks",
        state.score, state.level, state.lives, state.time_ticks
    );
}
