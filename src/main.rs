//! Fruit Slash entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent};

    use fruit_slash::BestScore;
    use fruit_slash::audio::AudioManager;
    use fruit_slash::consts::*;
    use fruit_slash::sim::{
        Entity, EntityKind, GameEvent, GamePhase, GameState, HalfSide, PointerEvent, TickInput,
        Viewport, tick,
    };
    use fruit_slash::tuning::{DeviceClass, Tuning};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        tuning: Tuning,
        audio: AudioManager,
        best: BestScore,
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
        dpr: f64,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        // Presentation deadlines, kept on the sim clock
        flash_until_ms: f64,
        flash_duration_ms: f64,
        combo_until_ms: f64,
        show_game_over_text: bool,
    }

    impl Game {
        fn new(
            seed: u64,
            viewport: Viewport,
            device: DeviceClass,
            canvas: HtmlCanvasElement,
            ctx: CanvasRenderingContext2d,
            dpr: f64,
        ) -> Self {
            let best = BestScore::load();
            let mut state = GameState::new(seed, viewport, device);
            state.best_score = best.value;
            Self {
                state,
                tuning: Tuning::default(),
                audio: AudioManager::new(),
                best,
                canvas,
                ctx,
                dpr,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                flash_until_ms: 0.0,
                flash_duration_ms: 1.0,
                combo_until_ms: 0.0,
                show_game_over_text: false,
            }
        }

        /// Push a stamped pointer event for the next tick
        fn push_pointer(&mut self, make: impl FnOnce(f64) -> PointerEvent) {
            let t_ms = self.state.clock_ms;
            self.input.pointer.push(make(t_ms));
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = self.input.clone();
                tick(&mut self.state, &input, &self.tuning, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.pointer.clear();
                self.input.start = false;
            }

            self.handle_events();
        }

        /// React to events the sim emitted this frame
        fn handle_events(&mut self) {
            let now = self.state.clock_ms;
            for event in self.state.drain_events() {
                match event {
                    GameEvent::Sound(cue) => self.audio.play(cue),
                    GameEvent::Flash { duration_ms } => {
                        self.flash_duration_ms = duration_ms.max(1.0);
                        self.flash_until_ms = now + duration_ms;
                    }
                    GameEvent::ShowGameOverText => {
                        self.show_game_over_text = true;
                    }
                    GameEvent::Combo { count, points } => {
                        self.combo_until_ms = now + self.tuning.combo.display_duration_ms;
                        set_text("combo-text", &format!("Combo x{count}! +{points}"));
                    }
                    GameEvent::MissedFruit { .. } => {}
                    GameEvent::BestScoreImproved { score } => {
                        if self.best.record(score) {
                            self.best.save();
                        }
                    }
                    GameEvent::Started => {
                        self.show_game_over_text = false;
                        self.flash_until_ms = 0.0;
                        self.combo_until_ms = 0.0;
                    }
                    GameEvent::Ended { .. } => {}
                }
            }
        }

        /// Handle a viewport resize: backing store, transform, sim viewport
        fn resize(&mut self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            self.dpr = window.device_pixel_ratio();
            let w = self.canvas.client_width().max(1) as f64;
            let h = self.canvas.client_height().max(1) as f64;
            self.canvas.set_width((w * self.dpr) as u32);
            self.canvas.set_height((h * self.dpr) as u32);
            self.state.viewport = Viewport {
                w: w as f32,
                h: h as f32,
            };
            log::debug!("Resized to {w}x{h} (dpr {})", self.dpr);
        }

        // === Canvas2D drawing ===

        /// Render the current frame
        fn render(&self) {
            let ctx = &self.ctx;
            let w = self.state.viewport.w as f64;
            let h = self.state.viewport.h as f64;
            let now = self.state.clock_ms;

            let _ = ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0);
            ctx.set_fill_style_str("#151c28");
            ctx.fill_rect(0.0, 0.0, w, h);

            for e in &self.state.entities {
                self.draw_entity(e, now);
            }
            self.draw_particles();
            self.draw_trail(now);
            self.draw_flash(now, w, h);
        }

        fn draw_entity(&self, e: &Entity, now: f64) {
            let alpha = e.alpha(now);
            if alpha <= 0.0 {
                return;
            }
            let ctx = &self.ctx;
            // Visual body radius; the hit circle is tighter (0.35 vs 0.45)
            let radius = (e.display_width() * self.tuning.fruit.body_radius_frac) as f64;

            ctx.save();
            ctx.set_global_alpha(alpha as f64);
            let _ = ctx.translate(e.pos.x as f64, e.pos.y as f64);
            let _ = ctx.rotate(e.rotation as f64);

            match e.kind {
                EntityKind::Fruit(kind) => {
                    let [r, g, b] = kind.juice_color();
                    ctx.set_fill_style_str(&format!("rgb({r},{g},{b})"));
                    ctx.begin_path();
                    let _ = ctx.arc(0.0, 0.0, radius, 0.0, std::f64::consts::TAU);
                    ctx.fill();
                    ctx.set_stroke_style_str("rgba(0,0,0,0.3)");
                    ctx.set_line_width((radius * 0.12).max(1.5));
                    ctx.stroke();
                    // Stem notch so the spin reads
                    ctx.begin_path();
                    ctx.move_to(0.0, -radius * 0.55);
                    ctx.line_to(0.0, -radius * 0.9);
                    ctx.set_stroke_style_str("rgba(0,0,0,0.45)");
                    ctx.set_line_width((radius * 0.08).max(1.0));
                    ctx.stroke();
                }
                EntityKind::Bomb => {
                    ctx.set_fill_style_str("#23272e");
                    ctx.begin_path();
                    let _ = ctx.arc(0.0, 0.0, radius, 0.0, std::f64::consts::TAU);
                    ctx.fill();
                    ctx.set_stroke_style_str("#e74c3c");
                    ctx.set_line_width((radius * 0.1).max(2.0));
                    ctx.stroke();
                    // Fuse with a spark at the tip
                    ctx.begin_path();
                    ctx.move_to(0.0, -radius * 0.8);
                    ctx.line_to(0.0, -radius * 1.25);
                    ctx.set_stroke_style_str("#b8b8b8");
                    ctx.set_line_width((radius * 0.08).max(1.5));
                    ctx.stroke();
                    ctx.set_fill_style_str("#f5a623");
                    ctx.begin_path();
                    let _ = ctx.arc(
                        0.0,
                        -radius * 1.25,
                        (radius * 0.14).max(2.0),
                        0.0,
                        std::f64::consts::TAU,
                    );
                    ctx.fill();
                }
                EntityKind::Half { parent, side } => {
                    use std::f64::consts::FRAC_PI_2;
                    let [r, g, b] = parent.juice_color();
                    let (start, end) = match side {
                        HalfSide::Left => (FRAC_PI_2, 3.0 * FRAC_PI_2),
                        HalfSide::Right => (-FRAC_PI_2, FRAC_PI_2),
                    };
                    ctx.set_fill_style_str(&format!("rgb({r},{g},{b})"));
                    ctx.begin_path();
                    let _ = ctx.arc(0.0, 0.0, radius, start, end);
                    ctx.close_path();
                    ctx.fill();
                    ctx.set_stroke_style_str("rgba(255,255,255,0.35)");
                    ctx.set_line_width((radius * 0.06).max(1.0));
                    ctx.stroke();
                }
            }
            ctx.restore();
        }

        fn draw_particles(&self) {
            let ctx = &self.ctx;
            for p in &self.state.particles {
                let [r, g, b] = p.color;
                ctx.set_global_alpha(p.life.clamp(0.0, 1.0) as f64);
                ctx.set_fill_style_str(&format!("rgb({r},{g},{b})"));
                ctx.begin_path();
                let _ = ctx.arc(
                    p.pos.x as f64,
                    p.pos.y as f64,
                    p.size as f64,
                    0.0,
                    std::f64::consts::TAU,
                );
                ctx.fill();
            }
            ctx.set_global_alpha(1.0);
        }

        /// Tapered blade trail: widest at the newest sample
        fn draw_trail(&self, now: f64) {
            let samples = self.state.gesture.samples();
            if samples.len() < 2 {
                return;
            }
            let ctx = &self.ctx;
            let effects = &self.tuning.effects;
            let n = samples.len();

            ctx.set_line_cap("round");
            for i in 1..n {
                let a = samples[i - 1];
                let b = samples[i];
                let age = now - b.t_ms;
                let alpha = (1.0 - age / effects.trail_fade_ms).clamp(0.0, 1.0);
                if alpha <= 0.0 {
                    continue;
                }
                let frac = i as f32 / (n - 1) as f32;
                let width = effects.trail_tip_width
                    + (effects.trail_base_width - effects.trail_tip_width) * frac;
                ctx.set_line_width(width as f64);
                ctx.set_stroke_style_str(&format!("rgba(255,255,255,{:.3})", alpha * 0.85));
                ctx.begin_path();
                ctx.move_to(a.pos.x as f64, a.pos.y as f64);
                ctx.line_to(b.pos.x as f64, b.pos.y as f64);
                ctx.stroke();
            }
        }

        /// Full-screen white flash after a bomb goes off
        fn draw_flash(&self, now: f64, w: f64, h: f64) {
            let remaining = self.flash_until_ms - now;
            if remaining <= 0.0 {
                return;
            }
            let alpha = (remaining / self.flash_duration_ms).clamp(0.0, 1.0) * 0.8;
            self.ctx
                .set_fill_style_str(&format!("rgba(255,255,255,{alpha:.3})"));
            self.ctx.fill_rect(0.0, 0.0, w, h);
        }

        /// Update HUD elements in DOM
        fn update_hud(&self) {
            let now = self.state.clock_ms;

            set_text("score", &self.state.score.to_string());
            set_text("best-score", &self.state.best_score.to_string());

            // Miss icons fill up left to right
            for i in 1..=self.tuning.max_misses {
                let class = if self.state.misses >= i {
                    "miss-icon lost"
                } else {
                    "miss-icon"
                };
                set_class(&format!("miss-{i}"), class);
            }

            set_class(
                "combo-text",
                if now < self.combo_until_ms {
                    "announce"
                } else {
                    "announce hidden"
                },
            );
            set_class(
                "game-over-text",
                if self.show_game_over_text {
                    "announce"
                } else {
                    "announce hidden"
                },
            );
            set_class(
                "start-panel",
                if self.state.phase == GamePhase::Ready {
                    "panel"
                } else {
                    "panel hidden"
                },
            );

            if self.state.phase == GamePhase::GameOver {
                set_class("game-over-panel", "panel");
                set_text("final-score", &self.state.score.to_string());
                set_text("final-best", &self.state.best_score.to_string());
                if let Some(reason) = self.state.game_over_reason {
                    set_text("game-over-reason", &reason.describe());
                }
            } else {
                set_class("game-over-panel", "panel hidden");
            }
        }
    }

    fn set_text(id: &str, text: &str) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_class(id: &str, class: &str) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", class);
        }
    }

    /// Classify the device for base scale and launch velocity
    fn detect_device(window: &web_sys::Window) -> DeviceClass {
        let navigator = window.navigator();
        let ua = navigator.user_agent().unwrap_or_default();
        if navigator.max_touch_points() > 0 || ua.contains("Mobi") || ua.contains("Android") {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Fruit Slash starting...");

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
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");

        // Set canvas size
        let dpr = window.device_pixel_ratio();
        let client_w = canvas.client_width().max(1);
        let client_h = canvas.client_height().max(1);
        canvas.set_width((client_w as f64 * dpr) as u32);
        canvas.set_height((client_h as f64 * dpr) as u32);

        let viewport = Viewport {
            w: client_w as f32,
            h: client_h as f32,
        };
        let device = detect_device(&window);

        // Initialize game
        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(
            seed,
            viewport,
            device,
            canvas.clone(),
            ctx,
            dpr,
        )));

        log::info!("Game initialized with seed: {seed} ({device:?}, {client_w}x{client_h})");

        setup_input_handlers(&canvas, game.clone());
        setup_buttons(game.clone());
        setup_resize(game.clone());

        // Start game loop
        request_animation_frame(game);

        log::info!("Fruit Slash running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse down starts a swipe (and unlocks audio)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                let pos = Vec2::new(event.offset_x() as f32, event.offset_y() as f32);
                g.push_pointer(|t_ms| PointerEvent::Down { pos, t_ms });
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse move extends it (the sim ignores moves with no button down)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                let pos = Vec2::new(event.offset_x() as f32, event.offset_y() as f32);
                g.push_pointer(|t_ms| PointerEvent::Move { pos, t_ms });
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse up or leaving the canvas ends the swipe
        for kind in ["mouseup", "mouseleave"] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.push_pointer(|t_ms| PointerEvent::Up { t_ms });
            });
            let _ =
                canvas.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = game.borrow_mut();
                    g.audio.resume();
                    let rect = canvas_clone.get_bounding_client_rect();
                    let pos = Vec2::new(
                        touch.client_x() as f32 - rect.left() as f32,
                        touch.client_y() as f32 - rect.top() as f32,
                    );
                    g.push_pointer(|t_ms| PointerEvent::Down { pos, t_ms });
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch move
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = game.borrow_mut();
                    let rect = canvas_clone.get_bounding_client_rect();
                    let pos = Vec2::new(
                        touch.client_x() as f32 - rect.left() as f32,
                        touch.client_y() as f32 - rect.top() as f32,
                    );
                    g.push_pointer(|t_ms| PointerEvent::Move { pos, t_ms });
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch end/cancel
        for kind in ["touchend", "touchcancel"] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let mut g = game.borrow_mut();
                g.push_pointer(|t_ms| PointerEvent::Up { t_ms });
            });
            let _ =
                canvas.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        for id in ["start-btn", "retry-btn"] {
            if let Some(btn) = document.get_element_by_id(id) {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                    let mut g = game.borrow_mut();
                    g.audio.resume();
                    g.input.start = true;
                });
                let _ = btn
                    .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
    }

    fn setup_resize(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            game.borrow_mut().resize();
        });
        let _ =
            window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
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

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use fruit_slash::consts::SIM_DT;
    use fruit_slash::sim::{GameEvent, GameState, PointerEvent, TickInput, Viewport, tick};
    use fruit_slash::tuning::{DeviceClass, Tuning};
    use glam::Vec2;

    env_logger::init();
    log::info!("Fruit Slash (native) starting...");
    log::info!("No native renderer - run with `trunk serve` for the web version");

    // Optional tuning override from a JSON file
    let tuning = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => Tuning::from_json(&json),
            Err(e) => {
                log::warn!("Could not read {path}: {e}, using defaults");
                Tuning::default()
            }
        },
        None => Tuning::default(),
    };

    // Headless smoke run: thirty seconds of play with a scripted swipe
    // sweeping the throw corridor once a second.
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(42);
    let viewport = Viewport {
        w: 1280.0,
        h: 720.0,
    };
    let mut state = GameState::new(seed, viewport, DeviceClass::Desktop);

    let mut input = TickInput {
        start: true,
        ..Default::default()
    };
    let ticks_per_second = (1.0 / SIM_DT).round() as u64;
    let swipe_ticks = ticks_per_second / 4;
    let mut sounds = 0usize;
    for i in 0..30 * ticks_per_second {
        let phase = i % ticks_per_second;
        if phase < swipe_ticks {
            let frac = phase as f32 / swipe_ticks as f32;
            let pos = Vec2::new(
                viewport.w * (0.1 + 0.8 * frac),
                viewport.h * (0.65 - 0.25 * frac),
            );
            let t_ms = state.clock_ms;
            if phase == 0 {
                input.pointer.push(PointerEvent::Down { pos, t_ms });
            } else {
                input.pointer.push(PointerEvent::Move { pos, t_ms });
            }
        } else if phase == swipe_ticks {
            let t_ms = state.clock_ms;
            input.pointer.push(PointerEvent::Up { t_ms });
        }

        tick(&mut state, &input, &tuning, SIM_DT);
        input.pointer.clear();
        input.start = false;

        sounds += state
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::Sound(_)))
            .count();
    }

    println!(
        "Smoke run over: score {}, misses {}, phase {:?}, {} sound cues",
        state.score, state.misses, state.phase, sounds
    );
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
