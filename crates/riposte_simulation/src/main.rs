//! Headless симуляция Riposte
//!
//! Grunt атакует игрока: несколько полных последовательностей атаки,
//! игрок парирует каждую вторую.

use bevy::prelude::*;
use riposte_simulation::combat::{ENEMY_LAYER, PLAYER_LAYER};
use riposte_simulation::logger::{set_log_level, LogLevel};
use riposte_simulation::{
    create_headless_app, log_info, AttackSequencer, CombatProfile, Health, ParryIntent,
    SequencerState,
};

const TICKS: u32 = 600;

fn main() {
    println!("Starting Riposte headless simulation ({} ticks)", TICKS);

    let mut app = create_headless_app();
    // Только переходы уровня Info (удары, parry, смерти)
    set_log_level(LogLevel::Info);

    let player = CombatProfile::player().spawn(
        &mut app.world_mut().commands(),
        Vec3::new(1.0, 0.0, 0.0),
        PLAYER_LAYER,
    );
    let grunt = CombatProfile::grunt().spawn(
        &mut app.world_mut().commands(),
        Vec3::ZERO,
        ENEMY_LAYER,
    );
    app.world_mut().flush();

    let mut parry_next = false;
    let mut was_winding = false;

    for tick in 0..TICKS {
        // Игрок жмёт parry в момент windup каждой второй атаки
        let winding = app
            .world()
            .get::<AttackSequencer>(grunt)
            .is_some_and(|sequencer| matches!(sequencer.state, SequencerState::Winding { .. }));
        if winding && !was_winding {
            if parry_next {
                app.world_mut().send_event(ParryIntent { defender: player });
            }
            parry_next = !parry_next;
        }
        was_winding = winding;

        app.update();

        if tick % 60 == 0 {
            let player_hp = app.world().get::<Health>(player).map(|health| health.current);
            let state = app.world().get::<AttackSequencer>(grunt).map(|sequencer| sequencer.state);
            log_info(&format!("Tick {}: player hp {:?}, grunt {:?}", tick, player_hp, state));
        }
    }

    println!("Simulation complete!");
}
