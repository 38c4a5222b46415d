use anyhow::{Context, Result};
use kiss3d::light::Light;
use kiss3d::window::Window;
use log::*;
use nalgebra::{Point2, Point3};
use pose_navigator::config::NavigatorConfig;
use pose_navigator::controller::ControllerEvent;
use pose_navigator::grab_input::{GamepadGrabInput, GrabInput, NoGrab};
use pose_navigator::scene::{self, SceneDescription, SceneView};
use pose_navigator::session::Session;
use pose_navigator::source::MqttLandmarkSource;
use simplelog::{Config, LevelFilter, TermLogger, TerminalMode};
use std::time::Instant;

const GAMEPAD_DEADZONE: f32 = 0.2;

fn open_grab_input() -> Box<dyn GrabInput> {
    match GamepadGrabInput::new(GAMEPAD_DEADZONE) {
        Ok(gamepad) => Box::new(gamepad),
        Err(error) => {
            warn!("{}, grabbing disabled", error);
            Box::new(NoGrab)
        }
    }
}

/// Usage: pose_navigator [config.json] [scene.json]
fn main() -> Result<()> {
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Mixed)?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => NavigatorConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => NavigatorConfig::default(),
    };
    let description = match args.next() {
        Some(path) => SceneDescription::load(&path)
            .with_context(|| format!("Failed to load scene from {}", path))?,
        None => SceneDescription::demo(),
    };

    let source = MqttLandmarkSource::connect(&config.mqtt)?;
    let mut grab_input = open_grab_input();
    let mut session = Session::new(
        source,
        config.gesture.clone(),
        config.controller.clone(),
        description.roster(),
    )?;

    let mut window = Window::new("Pose navigator");
    window.set_background_color(0.1, 0.1, 0.12);
    window.set_light(Light::StickToCamera);
    let mut view = SceneView::new(&mut window, &description);
    let mut camera = scene::create_camera(&session.state().camera);

    let font = kiss3d::text::Font::default();
    let mut diagnostic = String::new();
    let mut last_frame = Instant::now();

    while window.render_with_camera(&mut camera) {
        let elapsed = last_frame.elapsed();
        last_frame = Instant::now();

        let step = session.step(grab_input.read(), elapsed);
        for event in &step.events {
            match event {
                ControllerEvent::Diagnostic(report) => diagnostic = report.to_string(),
                ControllerEvent::MarkerHidden => diagnostic.clear(),
                ControllerEvent::ObjectGrabbed { id, position } => {
                    trace!("{} -> {:?}", id, position)
                }
                _ => {}
            }
        }

        scene::sync_camera(&mut camera, &session.state().camera);
        view.update(session.objects(), session.state());

        let mode_color = scene::mode_color(session.mode());
        scene::draw_skeleton(&mut window, session.last_frame(), mode_color);
        let color = Point3::new(mode_color.red, mode_color.green, mode_color.blue);
        window.draw_text(
            &format!(
                "{}  {}  {}",
                session.mode(),
                session.symbol(),
                session.movement()
            ),
            &Point2::new(1.0, 1.0),
            50.0,
            &font,
            &color,
        );
        if !diagnostic.is_empty() {
            window.draw_text(&diagnostic, &Point2::new(1.0, 60.0), 40.0, &font, &color);
        }
    }

    session.stop();
    Ok(())
}
