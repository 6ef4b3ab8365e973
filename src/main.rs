//! Neon Folio entry point
//!
//! On the web this mounts the particle background, the asteroid-targeted
//! title, and the visitor lookup onto the page. Natively it runs both
//! simulations headless and prints a summary.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_page {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Element, HtmlCanvasElement, HtmlElement, Response};

    use neon_folio::renderer::{
        CanvasBackend, DrawCommand, asteroid_commands, field_commands, fragment_commands,
    };
    use neon_folio::settings::{AnimationKind, EffectiveType, FieldBudget};
    use neon_folio::sim::{AsteroidText, ParticleField, TargetLocator};
    use neon_folio::visitor::{self, VisitorInfo};
    use neon_folio::{DeviceSignals, PerformanceTier, Settings};

    /// Locates letter spans relative to the overlay canvas
    struct DomLocator {
        spans: Vec<HtmlElement>,
        origin: Element,
    }

    impl TargetLocator for DomLocator {
        fn locate(&self, index: usize) -> Option<Vec2> {
            let span = self.spans.get(index)?;
            if !span.is_connected() {
                return None;
            }
            let rect = span.get_bounding_client_rect();
            let origin = self.origin.get_bounding_client_rect();
            Some(Vec2::new(
                (rect.left() - origin.left() + rect.width() / 2.0) as f32,
                (rect.top() - origin.top() + rect.height() / 2.0) as f32,
            ))
        }
    }

    /// The asteroid-targeted title and its overlay canvas
    struct Title {
        effect: AsteroidText,
        trails: bool,
        locator: DomLocator,
        overlay: CanvasBackend,
        opacities: Vec<f32>,
    }

    /// Everything animated on the page
    struct Page {
        field: Option<(ParticleField, CanvasBackend)>,
        title: Option<Title>,
        commands: Vec<DrawCommand>,
    }

    impl Page {
        fn frame(&mut self, now: f64) {
            if let Some((field, backend)) = self.field.as_mut() {
                if let Some(frame) = field.step() {
                    self.commands.clear();
                    field_commands(frame, &mut self.commands);
                    if let Err(e) = backend.draw(&self.commands) {
                        log::warn!("Field draw failed: {:?}", e);
                    }
                }
            }

            if let Some(title) = self.title.as_mut() {
                title.effect.frame(now, &title.locator);

                for (cell, last) in title
                    .effect
                    .letters()
                    .cells()
                    .iter()
                    .zip(title.opacities.iter_mut())
                {
                    let opacity = cell.opacity();
                    if (opacity - *last).abs() > f32::EPSILON {
                        *last = opacity;
                        if let Some(span) = title.locator.spans.get(cell.index) {
                            let _ = span.style().set_property("opacity", &format!("{:.2}", opacity));
                        }
                    }
                }

                self.commands.clear();
                asteroid_commands(title.effect.projectiles(), title.trails, &mut self.commands);
                fragment_commands(
                    title.effect.letters(),
                    now,
                    &title.locator,
                    &mut self.commands,
                );
                title.overlay.clear();
                if let Err(e) = title.overlay.draw(&self.commands) {
                    log::warn!("Overlay draw failed: {:?}", e);
                }
            }
        }
    }

    /// A requestAnimationFrame loop that can be paused and resumed. Stopping
    /// cancels the pending frame request; dropping also releases the callback.
    struct FrameLoop {
        request_id: Rc<Cell<Option<i32>>>,
        callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    }

    fn request_frame(callback: &Closure<dyn FnMut(f64)>) -> Option<i32> {
        web_sys::window()?
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .ok()
    }

    impl FrameLoop {
        fn new(mut on_frame: impl FnMut(f64) + 'static) -> Self {
            let request_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
            let callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> =
                Rc::new(RefCell::new(None));

            let next_id = request_id.clone();
            let this = callback.clone();
            *callback.borrow_mut() = Some(Closure::new(move |time: f64| {
                // A stopped loop has no pending request
                if next_id.get().is_none() {
                    return;
                }
                on_frame(time);
                if let Some(cb) = this.borrow().as_ref() {
                    next_id.set(request_frame(cb));
                }
            }));

            Self {
                request_id,
                callback,
            }
        }

        fn is_running(&self) -> bool {
            self.request_id.get().is_some()
        }

        /// Request the next frame unless already running
        fn start(&self) {
            if self.is_running() {
                return;
            }
            if let Some(cb) = self.callback.borrow().as_ref() {
                self.request_id.set(request_frame(cb));
            }
        }

        fn stop(&self) {
            if let Some(id) = self.request_id.take() {
                if let Some(window) = web_sys::window() {
                    let _ = window.cancel_animation_frame(id);
                }
            }
        }
    }

    impl Drop for FrameLoop {
        fn drop(&mut self) {
            self.stop();
            // Breaks the closure's reference to itself
            self.callback.borrow_mut().take();
        }
    }

    fn read_signals(window: &web_sys::Window) -> DeviceSignals {
        let width = window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(1920.0) as f32;
        let navigator = window.navigator();
        let cores = navigator.hardware_concurrency();
        let effective_type = js_sys::Reflect::get(&navigator, &JsValue::from_str("connection"))
            .ok()
            .filter(|c| c.is_object())
            .and_then(|c| js_sys::Reflect::get(&c, &JsValue::from_str("effectiveType")).ok())
            .and_then(|t| t.as_string())
            .and_then(|t| EffectiveType::from_str(&t));

        DeviceSignals {
            viewport_width: width,
            device_pixel_ratio: window.device_pixel_ratio() as f32,
            hardware_concurrency: (cores > 0.0).then_some(cores as u32),
            effective_type,
        }
    }

    fn read_settings(canvas: Option<&HtmlCanvasElement>) -> Settings {
        let Some(json) = canvas.and_then(|c| c.get_attribute("data-fx-settings")) else {
            return Settings::default();
        };
        match Settings::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded effect settings from page");
                settings
            }
            Err(e) => {
                log::warn!("Ignoring effect settings: {}", e);
                Settings::default()
            }
        }
    }

    fn find_canvas(document: &web_sys::Document, id: &str) -> Option<HtmlCanvasElement> {
        document.get_element_by_id(id)?.dyn_into().ok()
    }

    /// Match the canvas backing store to its CSS size
    fn fit_canvas(canvas: &HtmlCanvasElement) -> (f32, f32) {
        let width = canvas.client_width().max(1) as u32;
        let height = canvas.client_height().max(1) as u32;
        canvas.set_width(width);
        canvas.set_height(height);
        (width as f32, height as f32)
    }

    fn mount_title(
        document: &web_sys::Document,
        tier: PerformanceTier,
        settings: &Settings,
        seed: u64,
    ) -> Option<Title> {
        let host = document.get_element_by_id("fx-title")?;
        let overlay_canvas = find_canvas(document, "fx-overlay")?;
        let text = host
            .get_attribute("data-text")
            .or_else(|| host.text_content())
            .unwrap_or_default();
        let highlight = host.get_attribute("data-highlight");

        let mut text_settings = settings.text.clone();
        if let Some(count) = host
            .get_attribute("data-asteroids")
            .and_then(|c| c.parse().ok())
        {
            text_settings.asteroid_count = count;
        }

        let (width, _) = fit_canvas(&overlay_canvas);
        let effect = AsteroidText::new(
            &text,
            highlight.as_deref(),
            tier,
            text_settings,
            width,
            seed,
        );

        host.set_text_content(None);
        let transition = format!("opacity {:.1}s ease-out", tier.transition_secs());
        let mut spans = Vec::with_capacity(effect.letters().len());
        for cell in effect.letters().cells() {
            let span: HtmlElement = document.create_element("span").ok()?.dyn_into().ok()?;
            let class = if cell.highlighted {
                "fx-letter fx-highlight"
            } else {
                "fx-letter"
            };
            span.set_class_name(class);
            let _ = span.style().set_property("transition", &transition);
            let shown = if cell.glyph == '_' { '\u{00A0}' } else { cell.glyph };
            span.set_text_content(Some(&shown.to_string()));
            host.append_child(&span).ok()?;
            spans.push(span);
        }

        let overlay = CanvasBackend::new(&overlay_canvas).ok()?;
        let opacities = vec![1.0; spans.len()];
        Some(Title {
            effect,
            trails: !tier.skips(AnimationKind::Trail),
            locator: DomLocator {
                spans,
                origin: overlay_canvas.into(),
            },
            overlay,
            opacities,
        })
    }

    async fn fetch_text(url: &str) -> Option<String> {
        let window = web_sys::window()?;
        let response: Response = JsFuture::from(window.fetch_with_str(url))
            .await
            .ok()?
            .dyn_into()
            .ok()?;
        if !response.ok() {
            return None;
        }
        JsFuture::from(response.text().ok()?).await.ok()?.as_string()
    }

    async fn show_visitor(seed: u64) {
        let Some(target) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("fx-visitor"))
        else {
            return;
        };

        let ip_body = fetch_text(visitor::IP_ENDPOINT).await;
        let location_body = match ip_body.as_deref().map(visitor::parse_ip) {
            Some(Ok(ip)) => fetch_text(&visitor::location_endpoint(&ip)).await,
            _ => None,
        };
        let mut rng = Pcg32::seed_from_u64(seed);
        let info = VisitorInfo::resolve(ip_body.as_deref(), location_body.as_deref(), &mut rng);

        target.set_text_content(Some(&format!(
            "IP: {}\nLOCATION: {}, {}, {}\nISP: {}\nTIMEZONE: {}",
            info.ip, info.city, info.region, info.country, info.isp, info.timezone
        )));
        log::info!("Visitor info shown for {}", info.ip);
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger unavailable: {}", e).into());
        }
        log::info!("Neon Folio starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        let signals = read_signals(&window);
        let tier = PerformanceTier::classify(&signals);
        let budget = FieldBudget::for_device(&signals);
        log::info!(
            "Performance tier: {}, {} particles ({:?})",
            tier.as_str(),
            budget.particles,
            signals
        );

        let background = find_canvas(&document, "fx-canvas");
        let settings = read_settings(background.as_ref());
        let seed = js_sys::Date::now() as u64;

        let field = background.as_ref().and_then(|canvas| {
            let (width, height) = fit_canvas(canvas);
            let backend = CanvasBackend::new(canvas).ok()?;
            Some((
                ParticleField::new(width, height, budget, settings.field.clone(), seed),
                backend,
            ))
        });
        let title = mount_title(&document, tier, &settings, seed.wrapping_add(1));
        if title.is_none() {
            log::info!("No #fx-title/#fx-overlay on page; text effect disabled");
        }

        let page = Rc::new(RefCell::new(Page {
            field,
            title,
            commands: Vec::new(),
        }));

        setup_resize(&window, &document, page.clone());

        let frame_page = page.clone();
        let frame_loop = Rc::new(FrameLoop::new(move |time| {
            frame_page.borrow_mut().frame(time);
        }));
        frame_loop.start();
        setup_page_lifecycle(&window, frame_loop);

        wasm_bindgen_futures::spawn_local(show_visitor(seed.wrapping_add(2)));
        log::info!("Neon Folio running!");
    }

    fn setup_resize(window: &web_sys::Window, document: &web_sys::Document, page: Rc<RefCell<Page>>) {
        let document = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut page = page.borrow_mut();
            if let (Some((field, backend)), Some(canvas)) =
                (page.field.as_mut(), find_canvas(&document, "fx-canvas"))
            {
                let (w, h) = fit_canvas(&canvas);
                field.resize(w, h);
                backend.resize(w as f64, h as f64);
            }
            if let (Some(title), Some(canvas)) =
                (page.title.as_mut(), find_canvas(&document, "fx-overlay"))
            {
                let (w, h) = fit_canvas(&canvas);
                title.effect.resize(w);
                title.overlay.resize(w as f64, h as f64);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Pause the loop while the page is hidden and resume it when the page
    /// is shown again, including restores from the back/forward cache
    fn setup_page_lifecycle(window: &web_sys::Window, frame_loop: Rc<FrameLoop>) {
        let paused = frame_loop.clone();
        let on_hide = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            paused.stop();
            log::info!("Effects paused");
        });
        let _ = window.add_event_listener_with_callback("pagehide", on_hide.as_ref().unchecked_ref());
        on_hide.forget();

        let on_show = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if !frame_loop.is_running() {
                frame_loop.start();
                log::info!("Effects resumed");
            }
        });
        let _ = window.add_event_listener_with_callback("pageshow", on_show.as_ref().unchecked_ref());
        on_show.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    web_page::run().await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Neon Folio (native) starting...");
    log::info!("The page effects need a browser");

    println!("\nRunning headless effects...");
    headless_text();
    headless_field();
}

#[cfg(not(target_arch = "wasm32"))]
fn headless_text() {
    use glam::Vec2;
    use neon_folio::consts::FRAME_MS;
    use neon_folio::settings::TextSettings;
    use neon_folio::sim::AsteroidText;
    use neon_folio::{DeviceSignals, PerformanceTier};

    let tier = PerformanceTier::classify(&DeviceSignals::new(1920.0, 2.0, 8));
    let mut effect = AsteroidText::new(
        "ADNAN_SAMIR",
        Some("SAMIR"),
        tier,
        TextSettings::default(),
        1920.0,
        7,
    );
    let layout: Vec<Option<Vec2>> = (0..effect.letters().len())
        .map(|i| Some(Vec2::new(700.0 + i as f32 * 48.0, 400.0)))
        .collect();

    let (mut spawned, mut impacts, mut repairs) = (0, 0, 0);
    let mut now = 0.0;
    while now < 60_000.0 {
        let report = effect.frame(now, &layout[..]);
        spawned += report.spawned.len();
        impacts += report.impacts.len();
        repairs += report
            .transitions
            .iter()
            .filter(|c| c.to == neon_folio::sim::LetterPhase::Intact)
            .count();
        now += FRAME_MS;
    }

    println!(
        "✓ Asteroid text: {} spawned, {} impacts, {} repairs, {} letters down",
        spawned,
        impacts,
        repairs,
        effect.letters().destroyed().len()
    );
}

#[cfg(not(target_arch = "wasm32"))]
fn headless_field() {
    use neon_folio::renderer::field_commands;
    use neon_folio::DeviceSignals;
    use neon_folio::settings::{FieldBudget, FieldSettings};
    use neon_folio::sim::ParticleField;

    for signals in [
        DeviceSignals::new(1920.0, 2.0, 8),
        DeviceSignals::new(400.0, 3.0, 8),
        DeviceSignals::new(400.0, 1.0, 2),
    ] {
        let budget = FieldBudget::for_device(&signals);
        let mut field = ParticleField::new(
            signals.viewport_width,
            1080.0,
            budget,
            FieldSettings::default(),
            11,
        );
        let mut commands = Vec::new();
        let mut simulated = 0;
        for _ in 0..600 {
            if let Some(frame) = field.step() {
                simulated += 1;
                commands.clear();
                field_commands(frame, &mut commands);
            }
        }
        println!(
            "✓ Particle field ({}): {} particles, {} of 600 frames simulated, {} draw commands last frame",
            budget.tier.as_str(),
            field.len(),
            simulated,
            commands.len()
        );
    }
}
