//! Headless authority host for the ragdoll character controller.
//!
//! Builds a small Rapier scene, joins the local participant and plays a
//! scripted timeline through the real input path. Every replicated sample is
//! forwarded to an in-process observer session, the way a transport would.

mod scene;
mod script;

use anyhow::{Context, Result};
use character::{Burnable, ControllerConfig, FireManager, Session};
use engine_core::ParticipantId;
use input::InputState;
use scene::Scene;
use script::{Action, Script};
use std::path::PathBuf;
use std::time::Duration;

const LOCAL: ParticipantId = ParticipantId(1);
const OBSERVER: ParticipantId = ParticipantId(2);
const DEMO_TICKS: u64 = 720;
/// Render frame length; deliberately not a multiple of the tick length.
const FRAME: Duration = Duration::from_micros(11_111);

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ragdoll.ron"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ControllerConfig::load_or_default(config_path());
    log::info!("Starting ragdoll host at {} Hz", config.tick_rate);

    let mut scene = Scene::build();
    let mut session = Session::authority(LOCAL, config.clone());
    session
        .join(&scene.physics, LOCAL, scene.rig.clone())
        .context("failed to spawn local character")?;
    log::info!(
        "scene: crate {}, wall {}, campfire {}",
        scene.crate_body,
        scene.wall,
        scene.campfire
    );

    // The observer owns its own copy of the rig, posed from replicated samples only.
    let mut observer_scene = Scene::build();
    let mut observer = Session::observer(OBSERVER, config.clone());
    observer
        .join(&observer_scene.physics, LOCAL, observer_scene.rig.clone())
        .context("failed to mirror local character on observer")?;

    let mut fire = FireManager::new(config.fire.clone());
    let campfire = fire.add(Burnable::manual(scene.campfire, 1.0, 60.0, false));
    fire.add_burnable(&scene.physics, scene.kindling);

    let mut input = InputState::with_yaw_sensitivity(config.look.yaw_sensitivity);
    let mut script = Script::new(script::demo_timeline());

    while session.time().tick_count() < DEMO_TICKS {
        input.begin_frame();
        session.advance_frame(FRAME);
        observer.advance_frame(FRAME);

        while session.tick_due() {
            let tick = session.time().tick_count() + 1;
            for action in script.apply(tick, &mut input) {
                match action {
                    Action::Stagger => {
                        session.stagger(&mut scene.physics, LOCAL);
                    }
                    Action::Ignite => {
                        fire.ignite(campfire, session.now());
                    }
                    _ => {}
                }
            }

            session.submit_input(LOCAL, input.drain_sample());
            let Some(mut events) = session.step_due(&mut scene.physics) else {
                break;
            };
            for body in fire.update(&mut session, &mut scene.physics) {
                log::info!("tick {}: {} burned away", tick, body);
            }
            events.extend(session.drain_events());
            scene.physics.step();

            for event in &events {
                log::info!("tick {}: {:?}", tick, event);
            }

            for state in session.take_snapshots() {
                if tick % 60 == 0 {
                    log::info!(
                        "tick {}: health {}, stamina {:.1}, active {}, grabs {}/{}, pose {} bytes",
                        state.tick,
                        state.health,
                        state.stamina,
                        state.active,
                        state.left_grab,
                        state.right_grab,
                        state.pose_bytes().len()
                    );
                }
                observer.receive_snapshot(state);
            }
        }

        while observer.step_due(&mut observer_scene.physics).is_some() {}
    }

    if !script.is_finished() {
        log::warn!("demo ended before the script did");
    }

    let character = session
        .local_character()
        .context("local character disappeared")?;
    let state = character.replicated_state(&scene.physics, session.time().tick_count());
    let text = ron::ser::to_string_pretty(&state, ron::ser::PrettyConfig::default())
        .context("failed to serialize final state")?;
    log::info!("final state:\n{}", text);
    log::info!(
        "observer interpolates {} parts at alpha {:.2}, last tick {:?}",
        observer.interpolated_pose(LOCAL).len(),
        observer.render_alpha(),
        observer.remote(LOCAL).and_then(|view| view.last_tick())
    );
    if let Some(mirror) = observer.character(LOCAL) {
        log::info!(
            "observer sees health {:.0}%, stamina {:.0}%",
            mirror.health_fraction() * 100.0,
            mirror.stamina_fraction() * 100.0
        );
    }

    session
        .leave(&mut scene.physics, LOCAL)
        .context("failed to despawn local character")?;
    Ok(())
}
