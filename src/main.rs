//! Math Shot entry point
//!
//! On the web this mounts the game on `#canvas`. Natively there is nothing to
//! draw, so it plays a scripted round per rule set with an aiming bot and
//! prints the results.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    use math_shot::platform::web::{MathShot, init_logging};

    init_logging();
    log::info!("Math Shot starting...");

    let settings = math_shot::GameSettings::load();
    let handle = MathShot::mount("canvas", settings)?;
    // Lives as long as the page
    std::mem::forget(handle);

    log::info!("Math Shot running!");
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    log::info!("Math Shot (native) bot run, seed {seed}");

    for rules in math_shot::RuleSet::ALL {
        bot::play(rules, seed);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod bot {
    use math_shot::input::ClientRect;
    use math_shot::sim::Phase;
    use math_shot::{Difficulty, Game, GameSettings, InputMethod, Operation, RuleSet, Viewport};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const FRAME_MS: f64 = 16.0;
    /// Give up on rounds that never end (a health round with a perfect bot)
    const MAX_ROUND_MS: f64 = 120_000.0;
    /// Time between bot shots
    const AIM_MS: f64 = 700.0;
    /// Chance the bot picks a wrong answer
    const MISTAKE_RATE: f64 = 0.25;

    pub fn play(rules: RuleSet, seed: u64) {
        let settings = GameSettings {
            difficulty: Difficulty::Medium,
            operation: Operation::Mixed,
            input_method: InputMethod::Mouse,
            rules,
            ..GameSettings::default()
        };
        let viewport = Viewport::new(1280.0, 720.0);
        let rect = ClientRect::new(0.0, 0.0, viewport.width, viewport.height);
        let mut rng = Pcg32::seed_from_u64(seed ^ 0x5eed);

        let mut game = Game::new(settings, seed);
        game.set_viewport(viewport);

        let mut now = 0.0;
        let mut next_shot = AIM_MS;
        while game.phase() != Phase::GameOver && now < MAX_ROUND_MS {
            if game.phase() == Phase::Playing && now >= next_shot {
                next_shot = now + AIM_MS;
                let wrong = rng.random_bool(MISTAKE_RATE);
                let aim = game
                    .round()
                    .targets()
                    .iter()
                    .find(|t| t.is_correct != wrong && !t.is_shot)
                    .map(|t| t.pos);

                if let (Some(aim), Some(pointer)) = (aim, game.source_mut().pointer_mut()) {
                    pointer.on_mouse_move(aim, rect);
                    pointer.on_mouse_down(0, aim, rect, now);
                }
            }

            game.frame(now);
            for event in game.drain_events() {
                log::debug!("{event:?}");
            }
            now += FRAME_MS;
        }

        let view = game.snapshot();
        let prompt = view.prompt.as_deref().unwrap_or("-");
        match view.rating {
            Some(rating) => println!(
                "[{}] score {} health {} after {:.1}s: {} (last question {prompt})",
                rules.as_str(),
                view.score,
                view.health,
                now / 1000.0,
                rating.title()
            ),
            None => println!(
                "[{}] still going after {:.0}s with score {} (health {})",
                rules.as_str(),
                now / 1000.0,
                view.score,
                view.health
            ),
        }
        log::info!("Bot finished {} round", rules.as_str());
    }
}
