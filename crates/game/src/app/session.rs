use std::fs;
use std::path::Path;
use std::time::Duration;

use tilequest_engine::{
    run_headless, GameWorld, InputSnapshot, LoopConfig, LoopSummary, QuestionBank,
    RecordingSink, ScriptedInput, XmlAssets,
};
use tracing::info;

use super::bootstrap::{AppConfig, AppWiring, BootstrapResult, ScriptStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionReport {
    pub(crate) summary: LoopSummary,
    pub(crate) playtime_ms: u64,
    pub(crate) collected: u32,
    pub(crate) remaining: u32,
    pub(crate) hints: Vec<String>,
    pub(crate) draw_calls: usize,
}

/// Builds the world from the configured assets and replays the input script
/// through the headless loop.
pub(crate) fn run_session(wiring: &AppWiring) -> BootstrapResult<SessionReport> {
    let mut world = build_world(&wiring.config, &wiring.asset_root)?;

    let mut input = scripted_input(&wiring.config.script);
    let tick_count = input.remaining();
    let loop_config = LoopConfig::default();
    let frame_dt = Duration::from_millis(wiring.config.frame_ms.max(1));
    let frame_count = frames_for_ticks(tick_count, loop_config.fixed_dt, frame_dt);

    let mut sink = RecordingSink::default();
    let summary = run_headless(
        &mut world,
        &loop_config,
        std::iter::repeat(frame_dt).take(frame_count),
        &mut input,
        &mut sink,
    );

    let report = SessionReport {
        summary,
        playtime_ms: world.playtime_ms(),
        collected: world.collected(),
        remaining: world.remaining(),
        hints: world.hints().to_vec(),
        draw_calls: sink.requests.len(),
    };
    info!(
        playtime_ms = report.playtime_ms,
        collected = report.collected,
        remaining = report.remaining,
        hints = report.hints.len(),
        conflicts = world.diagnostics().total_conflicts,
        "session_finished"
    );
    Ok(report)
}

pub(crate) fn build_world(config: &AppConfig, asset_root: &Path) -> BootstrapResult<GameWorld> {
    let assets = XmlAssets::new(asset_root);
    let mut world = GameWorld::new(config.sim, config.maps.clone(), Box::new(assets));
    if let Some(path) = &config.questions {
        world = world.with_question_bank(load_question_bank(&asset_root.join(path))?);
    }

    let loaded = world
        .load_map(0, false)
        .map_err(|error| format!("load first map: {error}"))?;
    world
        .load_object(&config.player, loaded.spawn)
        .map_err(|error| format!("load player '{}': {error}", config.player))?;
    for placed in &config.objects {
        world
            .load_object(&placed.resource, placed.pos())
            .map_err(|error| format!("load object '{}': {error}", placed.resource))?;
    }
    world.update_collision();
    Ok(world)
}

fn load_question_bank(path: &Path) -> BootstrapResult<QuestionBank> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read question bank '{}': {error}", path.display()))?;
    QuestionBank::from_json_str(&raw)
        .map_err(|error| format!("question bank '{}': {error}", path.display()))
}

fn scripted_input(script: &[ScriptStep]) -> ScriptedInput {
    script
        .iter()
        .fold(ScriptedInput::new(Vec::<InputSnapshot>::new()), |input, step| {
            match step.movement.action() {
                Some(action) => input.hold(action, step.ticks),
                None => input.idle(step.ticks),
            }
        })
}

/// Frames needed for `ticks` fixed steps when every frame lasts `frame_dt`.
fn frames_for_ticks(ticks: usize, fixed_dt: Duration, frame_dt: Duration) -> usize {
    let total = fixed_dt.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX));
    let frame_ms = frame_dt.as_millis().max(1);
    total.as_millis().div_ceil(frame_ms) as usize
}
