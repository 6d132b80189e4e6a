//! Quantum Grid entry point
//!
//! Handles platform-specific initialization and runs the game loop.
//! The browser build draws the board on a 2D canvas; the native build runs
//! the simulation headless with the autopilot playing.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};

    use quantum_grid::consts::*;
    use quantum_grid::highscores::HighScores;
    use quantum_grid::persistence::{clear_save, load_game, save_game};
    use quantum_grid::platform::input::clear_one_shots;
    use quantum_grid::platform::{KeyValueStore, default_store, now_ms, route_key};
    use quantum_grid::settings::Settings;
    use quantum_grid::sim::{CubeKind, GameEvent, GamePhase, GameState, TickInput, tick};

    /// How long the board flashes after losing rows
    const SHRINK_FLASH_MS: f64 = 250.0;
    /// How long a status message stays up
    const STATUS_MS: f64 = 2000.0;

    struct Palette {
        background: &'static str,
        tile: &'static str,
        mark: &'static str,
        normal: &'static str,
        forbidden: &'static str,
        advantage: &'static str,
        player: &'static str,
        flash: &'static str,
    }

    const NEON: Palette = Palette {
        background: "#05010f",
        tile: "#1b1f4a",
        mark: "#ffe600",
        normal: "#00e5ff",
        forbidden: "#ff2e63",
        advantage: "#39ff14",
        player: "#ff9ef5",
        flash: "#ff2e63",
    };

    const HIGH_CONTRAST: Palette = Palette {
        background: "#000000",
        tile: "#5a5a5a",
        mark: "#ffff00",
        normal: "#ffffff",
        forbidden: "#ff0000",
        advantage: "#00ff00",
        player: "#ff00ff",
        flash: "#ff0000",
    };

    /// Game instance holding all state
    struct Game {
        state: GameState,
        settings: Settings,
        high_scores: HighScores,
        store: Box<dyn KeyValueStore>,
        ctx: CanvasRenderingContext2d,
        /// Canvas size in CSS pixels
        size: (f64, f64),
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
        status: Option<(String, f64)>,
        flash_until: f64,
        last_rank: Option<usize>,
        /// The continue-or-new-game prompt is showing
        continue_pending: bool,
    }

    impl Game {
        fn new(
            seed: u64,
            settings: Settings,
            store: Box<dyn KeyValueStore>,
            ctx: CanvasRenderingContext2d,
            size: (f64, f64),
        ) -> Self {
            let high_scores = HighScores::load_from(store.as_ref()).unwrap_or_else(|e| {
                log::warn!("High scores unreadable ({}), starting fresh", e);
                HighScores::new()
            });
            Self {
                state: GameState::with_rules(seed, settings.rules.clone()),
                settings,
                high_scores,
                store,
                ctx,
                size,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
                status: None,
                flash_until: 0.0,
                last_rank: None,
                continue_pending: false,
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32, time: f64) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut self.state, &self.input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;
                clear_one_shots(&mut self.input);
            }

            for event in self.state.drain_events() {
                self.handle_event(&event, time);
            }

            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 && time > oldest_time {
                self.fps = (60000.0 / (time - oldest_time)).round() as u32;
            }
        }

        fn handle_event(&mut self, event: &GameEvent, time: f64) {
            log::debug!("{:?}", event);
            if let Some(text) = event.message() {
                self.status = Some((text, time + STATUS_MS));
            }

            match event {
                GameEvent::PlatformShrunk { .. } if self.settings.effective_shrink_flash() => {
                    self.flash_until = time + SHRINK_FLASH_MS;
                }
                GameEvent::LevelComplete { .. } | GameEvent::Paused => self.save_game(),
                GameEvent::GameOver { score, level } => {
                    self.last_rank = self.high_scores.add_score(*score, *level, now_ms());
                    if let Some(rank) = self.last_rank {
                        log::info!("New high score #{}", rank);
                        if let Err(e) = self.high_scores.save_to(self.store.as_ref()) {
                            log::warn!("Failed to save high scores: {}", e);
                        }
                    }
                    self.clear_save();
                }
                GameEvent::Restarted { .. } => self.last_rank = None,
                _ => {}
            }
        }

        fn save_game(&self) {
            if let Err(e) = save_game(self.store.as_ref(), &self.state, now_ms()) {
                log::warn!("Failed to save game: {}", e);
            }
        }

        fn clear_save(&self) {
            if let Err(e) = clear_save(self.store.as_ref()) {
                log::warn!("Failed to clear saved game: {}", e);
            }
        }

        /// Fresh run with the current settings
        fn new_run(&mut self, seed: u64) {
            self.state = GameState::with_rules(seed, self.settings.rules.clone());
            self.accumulator = 0.0;
            self.input = TickInput {
                idle_mode: self.input.idle_mode,
                ..Default::default()
            };
            self.last_rank = None;
            self.clear_save();
            log::info!("Started new game with seed: {}", seed);
        }

        fn load_state(&mut self, state: GameState) {
            self.state = state;
            self.accumulator = 0.0;
            self.input = TickInput::default();
        }

        /// Draw the board top-down, far rows at the top of the canvas
        fn render(&self, time: f64) {
            let ctx = &self.ctx;
            let (w, h) = self.size;
            let palette = if self.settings.high_contrast {
                &HIGH_CONTRAST
            } else {
                &NEON
            };

            ctx.set_fill_style_str(palette.background);
            ctx.fill_rect(0.0, 0.0, w, h);

            let platform = &self.state.level.platform;
            let near_z = FALL_OFF_Z.floor() as i32 + 1;
            let far_z = platform.length() + SPAWN_OFFSET + SPAWN_ROWS;
            let columns = f64::from(platform.width());
            let rows = f64::from(far_z - near_z + 1);
            let cell = (w / columns).min(h / rows);
            let bottom = (h + rows * cell) / 2.0;
            let center_x = w / 2.0;

            // Centre of a world position in canvas space
            let to_screen = |x: f32, z: f32| {
                (
                    center_x + f64::from(x) * cell,
                    bottom - (f64::from(z) - f64::from(near_z) + 0.5) * cell,
                )
            };
            let square = |x: f32, z: f32, inset: f64| {
                let (sx, sy) = to_screen(x, z);
                let half = cell / 2.0 - inset;
                (sx - half, sy - half, half * 2.0)
            };

            ctx.set_fill_style_str(palette.tile);
            for tile in platform.tiles().iter().filter(|t| t.exists) {
                let (x, y, side) = square(tile.x as f32, tile.z as f32, 2.0);
                ctx.fill_rect(x, y, side, side);
            }

            ctx.set_line_width(3.0);
            if let Some(mark) = self.state.marked_tile {
                ctx.set_stroke_style_str(palette.mark);
                let (x, y, side) = square(mark.x as f32, mark.y as f32, 3.0);
                ctx.stroke_rect(x, y, side, side);
            }

            if let Some(center) = self.state.stored_advantage {
                ctx.set_stroke_style_str(palette.advantage);
                let (x, y, side) = square(center.x as f32, center.y as f32, 0.0);
                let reach = cell * f64::from(ADVANTAGE_RADIUS);
                ctx.stroke_rect(x - reach, y - reach, side + reach * 2.0, side + reach * 2.0);
            }

            for cube in &self.state.level.cubes {
                let color = match cube.kind {
                    CubeKind::Normal => palette.normal,
                    CubeKind::Forbidden => palette.forbidden,
                    CubeKind::Advantage => palette.advantage,
                };
                ctx.set_fill_style_str(color);
                let (x, y, side) = square(cube.pos.x, cube.pos.y, cell * 0.12);
                ctx.fill_rect(x, y, side, side);
            }

            let player = self.state.player.tile;
            let (px, py) = to_screen(player.x as f32, player.y as f32);
            ctx.set_fill_style_str(palette.player);
            ctx.begin_path();
            let _ = ctx.arc(px, py, cell * 0.3, 0.0, std::f64::consts::TAU);
            ctx.fill();

            if time < self.flash_until {
                ctx.set_global_alpha(0.25);
                ctx.set_fill_style_str(palette.flash);
                ctx.fill_rect(0.0, 0.0, w, h);
                ctx.set_global_alpha(1.0);
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self, document: &Document, time: f64) {
            let state = &self.state;
            set_text(document, "hud-score", &state.score.to_string());
            set_text(document, "hud-lives", &state.lives().to_string());
            set_text(document, "hud-level", &state.current_level.to_string());
            set_text(document, "hud-waves", &state.level.waves_remaining.to_string());
            set_text(
                document,
                "hud-cubes",
                &state.level.remaining_normal_cubes().to_string(),
            );
            set_text(document, "hud-fps", &self.fps.to_string());
            set_visible(document, "hud-fps-item", self.settings.show_fps);
            set_visible(document, "hud-advantage", state.stored_advantage.is_some());
            set_visible(document, "idle-badge", self.input.idle_mode);

            match &self.status {
                Some((text, until)) if time < *until => {
                    set_text(document, "status", text);
                    set_visible(document, "status", true);
                }
                _ => set_visible(document, "status", false),
            }

            set_visible(document, "pause-menu", state.phase == GamePhase::Paused);

            let paywall = state.phase == GamePhase::Paywall;
            set_visible(document, "paywall", paywall);
            if paywall {
                set_text(document, "paywall-count", &state.paywall.play_count.to_string());
            }

            let game_over = state.phase == GamePhase::GameOver;
            set_visible(document, "game-over", game_over);
            if game_over {
                set_text(document, "final-score", &state.score.to_string());
                set_text(document, "final-level", &state.current_level.to_string());
                let rank = self
                    .last_rank
                    .map(|r| format!("New high score #{r}!"))
                    .unwrap_or_default();
                set_text(document, "final-rank", &rank);
                let best = self.high_scores.top_score().unwrap_or(0);
                set_text(document, "best-score", &best.to_string());
                let board = self.high_scores.board_lines(now_ms()).join("\n");
                set_text(document, "leaderboard", &board);
            }
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            if el.text_content().as_deref() != Some(text) {
                el.set_text_content(Some(text));
            }
        }
    }

    fn set_visible(document: &Document, id: &str, visible: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.class_list().toggle_with_force("hidden", !visible);
        }
    }

    fn current_document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn on_click(document: &Document, id: &str, handler: impl FnMut() + 'static) {
        let Some(btn) = document.get_element_by_id(id) else {
            log::warn!("Missing button #{}", id);
            return;
        };
        let mut handler = handler;
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| handler());
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Quantum Grid starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.class_list().add_1("hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        let dpr = window.device_pixel_ratio();
        let client_w = f64::from(canvas.client_width());
        let client_h = f64::from(canvas.client_height());
        canvas.set_width((client_w * dpr) as u32);
        canvas.set_height((client_h * dpr) as u32);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");
        let _ = ctx.scale(dpr, dpr);

        let store = default_store();
        let settings = Settings::load_from(store.as_ref()).unwrap_or_else(|e| {
            log::warn!("Using default settings: {}", e);
            Settings::default()
        });

        let saved_game = match load_game(store.as_ref()) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Discarding saved game: {}", e);
                let _ = clear_save(store.as_ref());
                None
            }
        };

        let seed = js_sys::Date::now() as u64;
        let show_tutorial = settings.show_tutorial;
        let game = Rc::new(RefCell::new(Game::new(
            seed,
            settings,
            store,
            ctx,
            (client_w, client_h),
        )));
        log::info!("Game initialized with seed: {}", seed);

        let has_save = saved_game.is_some();
        if let Some(ref save) = saved_game {
            set_visible(&document, "continue-prompt", true);
            set_text(&document, "continue-level", &save.current_level.to_string());
            set_text(&document, "continue-score", &save.score.to_string());
            // Hold the fresh run until the player chooses
            let mut g = game.borrow_mut();
            g.state.phase = GamePhase::Paused;
            g.continue_pending = true;
        }
        set_visible(&document, "tutorial", show_tutorial && !has_save);

        setup_keyboard(game.clone());
        setup_buttons(&document, game.clone(), saved_game);
        setup_auto_pause(game.clone());

        set_visible(&document, "hud", true);

        request_animation_frame(game);

        log::info!("Quantum Grid running!");
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let key = event.key();
            let mut g = game.borrow_mut();

            if let Some(command) = route_key(&key, g.continue_pending) {
                event.prevent_default();
                command.apply(&mut g.input, js_sys::Date::now() as u64);
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>, saved_game: Option<GameState>) {
        {
            let game = game.clone();
            on_click(document, "restart-btn", move || {
                game.borrow_mut().input.restart = Some(js_sys::Date::now() as u64);
            });
        }
        {
            let game = game.clone();
            on_click(document, "resume-btn", move || {
                game.borrow_mut().input.pause = true;
            });
        }
        {
            let game = game.clone();
            on_click(document, "purchase-btn", move || {
                let mut g = game.borrow_mut();
                g.input.paywall = Some(quantum_grid::sim::PaywallChoice::Purchase);
            });
        }
        {
            let game = game.clone();
            on_click(document, "decline-btn", move || {
                let mut g = game.borrow_mut();
                g.input.paywall = Some(quantum_grid::sim::PaywallChoice::Decline);
            });
        }
        {
            let game = game.clone();
            on_click(document, "tutorial-close-btn", move || {
                let mut g = game.borrow_mut();
                g.settings.show_tutorial = false;
                if let Err(e) = g.settings.save_to(g.store.as_ref()) {
                    log::warn!("Failed to save settings: {}", e);
                }
                if let Some(document) = current_document() {
                    set_visible(&document, "tutorial", false);
                }
            });
        }
        {
            let game = game.clone();
            on_click(document, "continue-btn", move || {
                let mut g = game.borrow_mut();
                g.continue_pending = false;
                if let Some(ref state) = saved_game {
                    let mut state = state.clone();
                    state.phase = GamePhase::Paused;
                    g.load_state(state);
                    log::info!("Resumed saved game (press Escape to continue)");
                }
                if let Some(document) = current_document() {
                    set_visible(&document, "continue-prompt", false);
                }
            });
        }
        on_click(document, "new-game-btn", move || {
            let mut g = game.borrow_mut();
            g.continue_pending = false;
            g.new_run(js_sys::Date::now() as u64);
            if let Some(document) = current_document() {
                set_visible(&document, "continue-prompt", false);
            }
        });
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.render(time);
            if let Some(document) = current_document() {
                g.update_hud(&document, time);
            }
        }

        request_animation_frame(game);
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Tab switch, minimize
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.state.phase == GamePhase::Playing {
                        g.input.pause = true;
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Click outside the window
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.state.phase == GamePhase::Playing {
                    g.input.pause = true;
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use clap::Parser;

    use quantum_grid::consts::SIM_DT;
    use quantum_grid::platform::now_ms;
    use quantum_grid::sim::{
        CrushPolicy, GameEvent, GamePhase, GameState, PaywallChoice, RemovalCause, TickInput, tick,
    };
    use quantum_grid::{HighScores, Settings};

    /// Runs Quantum Grid without a display, with the autopilot playing.
    #[derive(Debug, Parser)]
    #[command(author, version, about, long_about = None)]
    pub struct CliArgs {
        /// Run seed. Defaults to the current time.
        #[arg(long)]
        seed: Option<u64>,
        /// Simulated seconds before the run is stopped.
        #[arg(
            long,
            default_value_t = 300,
            value_parser = clap::value_parser!(u32).range(1..=86_400)
        )]
        seconds: u32,
        /// What a cube does when it reaches the player (end-run, lose-life, normal-only).
        #[arg(long, value_parser = parse_policy)]
        policy: Option<CrushPolicy>,
        /// Buy the full game at the paywall instead of declining.
        #[arg(long)]
        purchase: bool,
        /// Leave the high score board untouched.
        #[arg(long)]
        no_record: bool,
    }

    fn parse_policy(s: &str) -> Result<CrushPolicy, String> {
        CrushPolicy::from_str(s).ok_or_else(|| format!("unknown crush policy '{s}'"))
    }

    #[derive(Debug, Default)]
    struct RunStats {
        captures: u32,
        escaped: u32,
        rows_lost: u32,
        levels_cleared: u32,
        paywalls: u32,
    }

    impl RunStats {
        fn record(&mut self, event: &GameEvent) {
            match event {
                GameEvent::CubeCaptured { .. } => self.captures += 1,
                GameEvent::CubeRemoved {
                    cause: RemovalCause::Escaped,
                    ..
                } => self.escaped += 1,
                GameEvent::PlatformShrunk { rows, .. } => self.rows_lost += rows,
                GameEvent::LevelComplete { .. } => self.levels_cleared += 1,
                GameEvent::PaywallShown { .. } => self.paywalls += 1,
                _ => {}
            }
        }
    }

    pub fn run(args: CliArgs) {
        let settings = Settings::load();
        let mut rules = settings.rules;
        if let Some(policy) = args.policy {
            rules.crush_policy = policy;
        }

        let seed = args.seed.unwrap_or_else(|| now_ms() as u64);
        log::info!(
            "Headless run: seed {}, {} s, crush policy {}",
            seed,
            args.seconds,
            rules.crush_policy.as_str()
        );

        let mut state = GameState::with_rules(seed, rules);
        let choice = if args.purchase {
            PaywallChoice::Purchase
        } else {
            PaywallChoice::Decline
        };
        let idle = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        let at_paywall = TickInput {
            paywall: Some(choice),
            ..idle.clone()
        };

        let mut stats = RunStats::default();
        let total_ticks = u64::from(args.seconds) * u64::from(quantum_grid::consts::SIM_HZ);
        for _ in 0..total_ticks {
            let input = if state.phase == GamePhase::Paywall {
                &at_paywall
            } else {
                &idle
            };
            tick(&mut state, input, SIM_DT);

            for event in state.drain_events() {
                if let Some(text) = event.message() {
                    log::info!("[{:>6}] {}", state.time_ticks, text);
                } else {
                    log::trace!("{:?}", event);
                }
                stats.record(&event);
            }

            if state.is_game_over() {
                break;
            }
        }

        log::info!(
            "Run finished: score {}, level {}, {} captures, {} escaped, {} rows lost, {} levels cleared, {} paywalls{}",
            state.score,
            state.current_level,
            stats.captures,
            stats.escaped,
            stats.rows_lost,
            stats.levels_cleared,
            stats.paywalls,
            if state.is_game_over() { "" } else { " (time limit)" }
        );

        if args.no_record {
            return;
        }
        let mut high_scores = HighScores::load();
        if let Some(rank) = high_scores.add_score(state.score, state.current_level, now_ms()) {
            log::info!("New high score #{}", rank);
            high_scores.save();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Quantum Grid (native) starting...");

    headless::run(headless::CliArgs::parse());
}
