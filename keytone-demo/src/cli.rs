use crate::Args;
use anyhow::{Context, Result, bail};
use keytone::{
    EngineSettings, KeyToneConfig, KeyToneController, KeyToneEvent, ManualInput, RawKeyEvent,
    SoundPackRegistry, normalize,
};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

/// Gap between simulated key events, roughly a fast typist.
const KEY_INTERVAL: Duration = Duration::from_millis(60);

/// `KeyboardEvent.code` style name for a typed character.
fn key_code(ch: char) -> Option<String> {
    let code = match ch {
        'a'..='z' | 'A'..='Z' => format!("Key{}", ch.to_ascii_uppercase()),
        '0'..='9' => format!("Digit{}", ch),
        ' ' => "Space".into(),
        '\t' => "Tab".into(),
        '-' | '_' => "Minus".into(),
        '=' | '+' => "Equal".into(),
        '[' | '{' => "BracketLeft".into(),
        ']' | '}' => "BracketRight".into(),
        ';' | ':' => "Semicolon".into(),
        '\'' | '"' => "Quote".into(),
        ',' | '<' => "Comma".into(),
        '.' | '>' => "Period".into(),
        '/' | '?' => "Slash".into(),
        '\\' | '|' => "Backslash".into(),
        '`' | '~' => "Backquote".into(),
        _ => return None,
    };
    Some(code)
}

fn report(events: Vec<KeyToneEvent>) {
    for event in events {
        match event {
            KeyToneEvent::PackLoaded { pack_id, generation } => {
                log::info!("Pack {} loaded (generation {})", pack_id, generation)
            }
            KeyToneEvent::PackLoadFailed { pack_id, error } => {
                log::error!("Pack {} failed to load: {}", pack_id, error)
            }
            KeyToneEvent::AudioUnavailable { reason } => {
                log::warn!("No audio output, typing will be silent: {}", reason)
            }
            other => log::debug!("{:?}", other),
        }
    }
}

fn type_key(controller: &mut KeyToneController<ManualInput>, code: &str) {
    for event in [RawKeyEvent::press(code), RawKeyEvent::release(code)] {
        log::debug!(
            "{} {:?} -> {}",
            event.code,
            event.phase,
            normalize(&event.code, event.phase)
        );
        controller.input_mut().dispatch(&event);
        std::thread::sleep(KEY_INTERVAL);
    }
}

pub fn run(args: Args) -> Result<()> {
    let registry = SoundPackRegistry::discover(&args.packs)
        .with_context(|| format!("Failed to scan {}", args.packs.display()))?;
    if registry.is_empty() {
        bail!("No sound packs found in {}", args.packs.display());
    }
    for descriptor in registry.descriptors() {
        log::info!(
            "  {} - {} ({} sprites)",
            descriptor.id,
            descriptor.display_name,
            descriptor.sprite_map.len()
        );
    }

    let selected = match args.pack {
        Some(id) => id,
        None => registry.list()[0].to_string(),
    };

    let mut controller =
        KeyToneController::open(KeyToneConfig::default(), Arc::new(registry), ManualInput::new())?;
    controller.apply_settings(&EngineSettings {
        enabled: true,
        volume: args.volume,
        selected_pack_id: selected,
    });

    if !controller.wait_for_load(Duration::from_secs(30)) {
        bail!("Timed out loading the sound pack");
    }
    report(controller.poll_events());
    if controller.state().current_pack.is_none() {
        bail!("No sound pack could be loaded");
    }

    log::info!("Type a line and press enter to hear it, ctrl-d to quit");
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        for ch in line.chars() {
            match key_code(ch) {
                Some(code) => type_key(&mut controller, &code),
                None => log::debug!("No key for {:?}", ch),
            }
        }
        type_key(&mut controller, "Enter");
        report(controller.poll_events());
        log::info!("{} voices played so far", controller.playback().voices_started());
    }

    controller.set_enabled(false);
    // Let the last clicks ring out.
    std::thread::sleep(Duration::from_millis(300));
    Ok(())
}
