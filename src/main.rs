// main.rs — 窗口、事件循环、菜单与状态栏；地球仪核心逻辑在 lib 中

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod i18n;
mod renderer;

use globe_viewer::equirect::{self, EquirectangularImage};
use globe_viewer::maps::{display_name, MapLibrary};
use globe_viewer::orientation::{key_event, tick_with, ControlKey, DragTracker};
use globe_viewer::reproject::{ReprojectOptions, ReprojectionJobs};
use globe_viewer::tessellate::SphereCache;
use globe_viewer::{ControlEvent, GlobeConfig, OrientationState};
use renderer::Renderer;

use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

type MapLoad = (PathBuf, globe_viewer::Result<EquirectangularImage>);

struct Preview {
    image: EquirectangularImage,
    orientation: OrientationState,
    texture: egui::TextureHandle,
    open: bool,
}

enum UiAction {
    OpenMap(PathBuf),
    CycleMap,
    Reproject,
    SaveReprojection,
    ResetView,
    ToggleFullscreen,
    Exit,
}

struct App {
    config: GlobeConfig,
    orientation: OrientationState,
    maps: MapLibrary,
    sphere: SphereCache,
    jobs: ReprojectionJobs,
    drag: DragTracker,
    preview: Option<Preview>,
    is_loading: bool,
    is_fullscreen: bool,
    current_lang: String,
}

impl App {
    fn handle_control(&mut self, event: ControlEvent, tx: &Sender<MapLoad>) {
        match self.orientation.apply(event) {
            Some(ControlEvent::RequestReprojection) => self.request_reprojection(),
            Some(ControlEvent::CycleMap) => self.cycle_map(tx),
            _ => {}
        }
    }

    fn request_reprojection(&mut self) {
        let r = &self.config.reprojection;
        log::info!(
            "{}",
            i18n::tr_with(
                "log.reprojection_requested",
                &[
                    ("yaw", format!("{:.1}", self.orientation.yaw)),
                    ("tilt", format!("{:.1}", self.orientation.tilt)),
                    ("w", r.width.to_string()),
                    ("h", r.height.to_string()),
                ]
            )
        );
        self.jobs.request(
            self.maps.active(),
            self.orientation,
            r.width,
            r.height,
            ReprojectOptions {
                reference: r.reference,
            },
        );
    }

    fn cycle_map(&mut self, tx: &Sender<MapLoad>) {
        if let Some(path) = self.maps.next_asset() {
            self.is_loading = true;
            start_load_map(path, tx.clone());
        }
    }

    fn open_map(&mut self, path: PathBuf, tx: &Sender<MapLoad>) {
        self.maps.push_asset(path.clone());
        self.is_loading = true;
        start_load_map(path, tx.clone());
    }

    fn receive_map(&mut self, rx: &Receiver<MapLoad>) {
        while let Ok((path, result)) = rx.try_recv() {
            self.is_loading = false;
            match result {
                Ok(image) => {
                    let name = display_name(&path);
                    log::info!(
                        "{}",
                        i18n::tr_with(
                            "log.map_loaded",
                            &[
                                ("name", name),
                                ("w", image.width().to_string()),
                                ("h", image.height().to_string()),
                            ]
                        )
                    );
                    self.maps.swap(&path, image);
                }
                // keep the current map; a runtime load failure is not fatal
                Err(e) => log::error!(
                    "{}",
                    i18n::tr_with("error.map_load", &[("err", e.to_string())])
                ),
            }
        }
    }

    fn receive_reprojection(&mut self, ctx: &egui::Context) {
        let Some(result) = self.jobs.poll() else {
            return;
        };
        match result.image {
            Ok(image) => {
                let color = egui::ColorImage::from_rgb(
                    [image.width() as usize, image.height() as usize],
                    &image.to_rgb_bytes(),
                );
                let texture = ctx.load_texture("flattened_map", color, egui::TextureOptions::NEAREST);
                self.preview = Some(Preview {
                    image,
                    orientation: result.orientation,
                    texture,
                    open: true,
                });
            }
            Err(e) => log::warn!(
                "{}",
                i18n::tr_with("error.reprojection", &[("err", e.to_string())])
            ),
        }
    }

    fn save_reprojection(&self) {
        let Some(preview) = &self.preview else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("flattened.png")
            .save_file()
        else {
            return;
        };
        match preview.image.to_rgb_image().save(&path) {
            Ok(()) => log::info!(
                "{}",
                i18n::tr_with("log.reprojection_saved", &[("path", path.display().to_string())])
            ),
            Err(e) => log::error!("{}", i18n::tr_with("error.save", &[("err", e.to_string())])),
        }
    }
}

fn pick_map_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(&i18n::tr("file.filter.images"), &["jpg", "jpeg", "png", "bmp"])
        .pick_file()
}

fn control_key(code: VirtualKeyCode) -> Option<ControlKey> {
    match code {
        VirtualKeyCode::W => Some(ControlKey::W),
        VirtualKeyCode::A => Some(ControlKey::A),
        VirtualKeyCode::S => Some(ControlKey::S),
        VirtualKeyCode::D => Some(ControlKey::D),
        VirtualKeyCode::C => Some(ControlKey::C),
        VirtualKeyCode::M => Some(ControlKey::M),
        VirtualKeyCode::R => Some(ControlKey::R),
        _ => None,
    }
}

fn main() {
    env_logger::init();

    let current_lang = i18n::resolve_lang_from_args();
    i18n::init(current_lang.clone());

    if let Err(e) = run(current_lang) {
        log::error!("{}", i18n::tr_with("error.startup", &[("err", e.to_string())]));
        eprintln!("{}", i18n::tr_with("error.startup", &[("err", e.to_string())]));
        std::process::exit(1);
    }
}

fn run(current_lang: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = GlobeConfig::from_args(std::env::args())?;
    // Missing or corrupt first map aborts here, before any window exists.
    let maps = MapLibrary::open(config.map_assets.clone(), config.resolution.stacks)?;

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(900, 900))
            .build(&event_loop)?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone(), config.radius))
        .map_err(|e| i18n::tr_with("error.renderer", &[("err", e.to_string())]))?;

    let mut app = App {
        config,
        orientation: OrientationState::default(),
        maps,
        sphere: SphereCache::default(),
        jobs: ReprojectionJobs::new(),
        drag: DragTracker::default(),
        preview: None,
        is_loading: false,
        is_fullscreen: false,
        current_lang,
    };

    let (tx, rx): (Sender<MapLoad>, Receiver<MapLoad>) = channel();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        app.receive_map(&rx);

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state != ElementState::Pressed {
                            return;
                        }
                        match input.virtual_keycode {
                            Some(VirtualKeyCode::O) => {
                                if let Some(path) = pick_map_file() {
                                    app.open_map(path, &tx);
                                }
                            }
                            Some(VirtualKeyCode::F11) => {
                                toggle_fullscreen(&window, &mut app.is_fullscreen);
                            }
                            Some(code) if app.config.control_scheme.keyboard() => {
                                if let Some(key) = control_key(code) {
                                    let ev = key_event(key, app.config.key_step_deg);
                                    app.handle_control(ev, &tx);
                                }
                            }
                            _ => {}
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left && app.config.control_scheme.mouse() {
                            app.drag.set_pressed(state == ElementState::Pressed);
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        let sensitivity = app.config.mouse_sensitivity;
                        for ev in app.drag.moved(position.x, position.y, sensitivity) {
                            app.handle_control(ev, &tx);
                        }
                    }

                    WindowEvent::DroppedFile(path) => {
                        app.open_map(path, &tx);
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                tick_with(&mut app.orientation, &app.config);
                app.receive_reprojection(&renderer.egui_ctx);

                let active = app.maps.active();
                match app
                    .sphere
                    .get_or_build(
                        &active,
                        app.config.resolution,
                        app.config.radius,
                        app.maps.coloring(),
                    )
                {
                    Ok((strips, true)) => {
                        let n = renderer.upload_sphere(strips);
                        log::debug!(
                            "{}",
                            i18n::tr_with("log.geometry_rebuilt", &[("vertices", n.to_string())])
                        );
                    }
                    Ok((_, false)) => {}
                    Err(e) => {
                        log::error!("{e}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }

                renderer.update_scene(&app.orientation, app.config.enable_sun_light);

                let mut actions = Vec::new();
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(ctx, &mut app, &mut actions, &window);
                });

                for action in actions {
                    match action {
                        UiAction::OpenMap(path) => app.open_map(path, &tx),
                        UiAction::CycleMap => app.cycle_map(&tx),
                        UiAction::Reproject => app.request_reprojection(),
                        UiAction::SaveReprojection => app.save_reprojection(),
                        UiAction::ResetView => app.handle_control(ControlEvent::ResetView, &tx),
                        UiAction::ToggleFullscreen => {
                            toggle_fullscreen(&window, &mut app.is_fullscreen)
                        }
                        UiAction::Exit => *control_flow = ControlFlow::Exit,
                    }
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn toggle_fullscreen(window: &Window, is_fullscreen: &mut bool) {
    *is_fullscreen = !*is_fullscreen;
    if *is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn start_load_map(path: PathBuf, tx: Sender<MapLoad>) {
    thread::spawn(move || {
        log::info!(
            "{}",
            i18n::tr_with("log.loading_map_bg", &[("path", format!("{:?}", path))])
        );
        let result = equirect::load(&path);
        if tx.send((path, result)).is_err() {
            log::error!("{}", i18n::tr("error.send_to_main_failed"));
        }
    });
}

fn draw_ui(ctx: &egui::Context, app: &mut App, actions: &mut Vec<UiAction>, window: &Window) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            // File
            ui.menu_button(i18n::tr("menu.file"), |ui| {
                if ui.button(i18n::tr("menu.open_map")).clicked() {
                    ui.close_menu();
                    if let Some(path) = pick_map_file() {
                        actions.push(UiAction::OpenMap(path));
                    }
                }
                if ui
                    .add_enabled(
                        app.maps.next_asset().is_some(),
                        egui::Button::new(i18n::tr("menu.cycle_map")),
                    )
                    .clicked()
                {
                    actions.push(UiAction::CycleMap);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button(i18n::tr("menu.reproject")).clicked() {
                    actions.push(UiAction::Reproject);
                    ui.close_menu();
                }
                if ui
                    .add_enabled(
                        app.preview.is_some(),
                        egui::Button::new(i18n::tr("menu.save_reprojection")),
                    )
                    .clicked()
                {
                    actions.push(UiAction::SaveReprojection);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button(i18n::tr("menu.exit")).clicked() {
                    actions.push(UiAction::Exit);
                }
            });

            // View
            ui.menu_button(i18n::tr("menu.view"), |ui| {
                if ui.button(i18n::tr("view.reset")).clicked() {
                    actions.push(UiAction::ResetView);
                    ui.close_menu();
                }
                let label = if app.is_fullscreen {
                    i18n::tr("view.fullscreen.exit")
                } else {
                    i18n::tr("view.fullscreen.enter")
                };
                if ui.button(label).clicked() {
                    actions.push(UiAction::ToggleFullscreen);
                    ui.close_menu();
                }
                ui.separator();
                ui.checkbox(&mut app.config.enable_sun_light, i18n::tr("view.sun_light"));
                ui.add(
                    egui::Slider::new(&mut app.config.spin_deg_per_tick, -2.0..=2.0)
                        .text(i18n::tr("view.spin")),
                );
            });

            // Language
            ui.menu_button(i18n::tr("menu.language"), |ui| {
                let langs: [(&str, &str); 2] = [("en", "English"), ("zh-Hans", "简体中文")];
                for (code, name) in langs {
                    if ui
                        .radio_value(&mut app.current_lang, code.to_string(), name)
                        .clicked()
                    {
                        i18n::init(app.current_lang.clone());
                        window.set_title(&i18n::tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if app.is_loading {
                ui.label(
                    egui::RichText::new(i18n::tr("status.loading_map")).color(egui::Color32::YELLOW),
                );
                ui.label("|");
            }
            if app.jobs.is_busy() {
                ui.label(
                    egui::RichText::new(i18n::tr("status.reprojecting"))
                        .color(egui::Color32::LIGHT_BLUE),
                );
                ui.label("|");
            }

            let position = match app.maps.cursor() {
                Some(i) if app.maps.assets().len() > 1 => {
                    format!(" ({}/{})", i + 1, app.maps.assets().len())
                }
                _ => String::new(),
            };
            ui.label(format!(
                "{} {}{}",
                i18n::tr("status.map_prefix"),
                app.maps.active_name(),
                position
            ));
            ui.label("|");
            ui.label(i18n::tr_with(
                "status.grid",
                &[
                    ("slices", app.config.resolution.slices.to_string()),
                    ("stacks", app.config.resolution.stacks.to_string()),
                ],
            ));
            ui.label("|");
            ui.label(format!("Yaw: {:.1}°", app.orientation.yaw));
            ui.label("|");
            ui.label(format!("Tilt: {:.1}°", app.orientation.tilt));
            if app.config.enable_sun_light {
                ui.label("|");
                ui.label(format!("Sun: {:.1}°", app.orientation.sun_angle));
            }
        });
    });

    if let Some(preview) = &mut app.preview {
        let mut open = preview.open;
        egui::Window::new(i18n::tr("preview.title"))
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                ui.label(i18n::tr_with(
                    "preview.orientation",
                    &[
                        ("yaw", format!("{:.1}", preview.orientation.yaw)),
                        ("tilt", format!("{:.1}", preview.orientation.tilt)),
                    ],
                ));
                let size = preview.texture.size_vec2();
                let scale = (ui.available_width() / size.x).clamp(0.25, 2.0);
                ui.image((preview.texture.id(), size * scale));
                if ui.button(i18n::tr("menu.save_reprojection")).clicked() {
                    actions.push(UiAction::SaveReprojection);
                }
            });
        preview.open = open;
    }
}
