//! Operator console: command parsing and the rustyline REPL
//!
//! The REPL runs on its own thread and forwards parsed commands over a
//! channel; the main loop applies them between ticks, so command
//! handling never interleaves with snapshot processing.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::warn;

use crate::engine::Engine;
use crate::midilog::LogKind;
use crate::mirror;
use crate::output::{list_output_ports, MidirSink};
use crate::paths;
use crate::preset::PresetStore;
use crate::registry::ControlKey;

/// Parsed operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AxisEnable { key: ControlKey, enabled: bool },
    AxisInvert { key: ControlKey, inverted: bool },
    AxisCc { key: ControlKey, cc: u8 },
    AxisChannel { key: ControlKey, channel: u8 },
    ButtonEnable { key: ControlKey, enabled: bool },
    ButtonNote { key: ControlKey, note: u8 },
    ButtonVelocity { key: ControlKey, velocity: u8 },
    ButtonChannel { key: ControlKey, channel: u8 },
    AnimEnable { key: ControlKey, enabled: bool },
    AnimAction { key: ControlKey, action: String },
    OutputList,
    OutputSelect(String),
    OutputClear,
    PresetSave { device: usize, name: String },
    PresetLoad { device: usize, name: String },
    PresetList,
    PresetExport(Option<PathBuf>),
    PresetImport(PathBuf),
    Devices,
    Mirror,
    LogShow(usize),
    LogClear,
    Actions,
    Help,
    Quit,
}

/// What the main loop should do after applying a command
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Parse one console line into a command
pub fn parse(line: &str) -> Result<Command> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = tokens.split_first() else {
        bail!("empty command");
    };

    match head {
        "axis" => parse_axis(rest),
        "button" => parse_button(rest),
        "anim" => parse_anim(rest),
        "output" => parse_output(rest),
        "preset" => parse_preset(rest),
        "devices" => Ok(Command::Devices),
        "mirror" => Ok(Command::Mirror),
        "log" => match rest {
            [] => Ok(Command::LogShow(20)),
            ["clear"] => Ok(Command::LogClear),
            [n] => Ok(Command::LogShow(parse_count(n)?)),
            _ => bail!("usage: log [<count>|clear]"),
        },
        "actions" => Ok(Command::Actions),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => bail!("unknown command '{}' (try 'help')", other),
    }
}

fn parse_axis(rest: &[&str]) -> Result<Command> {
    let (key, args) = parse_key(rest, "axis")?;
    match args {
        ["on"] => Ok(Command::AxisEnable { key, enabled: true }),
        ["off"] => Ok(Command::AxisEnable { key, enabled: false }),
        ["invert", "on"] => Ok(Command::AxisInvert { key, inverted: true }),
        ["invert", "off"] => Ok(Command::AxisInvert { key, inverted: false }),
        ["cc", n] => Ok(Command::AxisCc { key, cc: parse_byte(n)? }),
        ["channel", n] => Ok(Command::AxisChannel { key, channel: parse_byte(n)? }),
        _ => bail!("usage: axis <dev> <idx> on|off|invert on|off|cc <n>|channel <n>"),
    }
}

fn parse_button(rest: &[&str]) -> Result<Command> {
    let (key, args) = parse_key(rest, "button")?;
    match args {
        ["on"] => Ok(Command::ButtonEnable { key, enabled: true }),
        ["off"] => Ok(Command::ButtonEnable { key, enabled: false }),
        ["note", n] => Ok(Command::ButtonNote { key, note: parse_byte(n)? }),
        ["velocity", n] => Ok(Command::ButtonVelocity { key, velocity: parse_byte(n)? }),
        ["channel", n] => Ok(Command::ButtonChannel { key, channel: parse_byte(n)? }),
        _ => bail!("usage: button <dev> <idx> on|off|note <n>|velocity <n>|channel <n>"),
    }
}

fn parse_anim(rest: &[&str]) -> Result<Command> {
    let (key, args) = parse_key(rest, "anim")?;
    match args {
        ["on"] => Ok(Command::AnimEnable { key, enabled: true }),
        ["off"] => Ok(Command::AnimEnable { key, enabled: false }),
        ["action", name] => Ok(Command::AnimAction { key, action: (*name).to_string() }),
        _ => bail!("usage: anim <dev> <idx> on|off|action <name>"),
    }
}

fn parse_output(rest: &[&str]) -> Result<Command> {
    match rest {
        ["list"] => Ok(Command::OutputList),
        ["none"] => Ok(Command::OutputClear),
        ["select", pattern @ ..] if !pattern.is_empty() => {
            Ok(Command::OutputSelect(pattern.join(" ")))
        }
        _ => bail!("usage: output list|select <port>|none"),
    }
}

fn parse_preset(rest: &[&str]) -> Result<Command> {
    match rest {
        ["save", device, name @ ..] if !name.is_empty() => Ok(Command::PresetSave {
            device: parse_count(device).context("invalid device index")?,
            name: name.join(" "),
        }),
        ["load", device, name @ ..] if !name.is_empty() => Ok(Command::PresetLoad {
            device: parse_count(device).context("invalid device index")?,
            name: name.join(" "),
        }),
        ["list"] => Ok(Command::PresetList),
        ["export"] => Ok(Command::PresetExport(None)),
        ["export", path] => Ok(Command::PresetExport(Some(PathBuf::from(path)))),
        ["import", path] => Ok(Command::PresetImport(PathBuf::from(path))),
        _ => bail!("usage: preset save|load <dev> <name> | list | export [path] | import <path>"),
    }
}

fn parse_key<'a>(rest: &'a [&'a str], what: &str) -> Result<(ControlKey, &'a [&'a str])> {
    if rest.len() < 3 {
        bail!("usage: {} <dev> <idx> ...", what);
    }
    let device = parse_count(rest[0]).context("invalid device index")?;
    let control = parse_count(rest[1]).context("invalid control index")?;
    Ok((ControlKey::new(device, control), &rest[2..]))
}

fn parse_count(token: &str) -> Result<usize> {
    token
        .parse::<usize>()
        .with_context(|| format!("not a number: '{}'", token))
}

/// Numeric config input: any integer is accepted and saturated into byte
/// range; the registry clamps to the legal MIDI range on write
fn parse_byte(token: &str) -> Result<u8> {
    let value = token
        .parse::<i64>()
        .with_context(|| format!("not a number: '{}'", token))?;
    Ok(value.clamp(0, 255) as u8)
}

/// Apply one command against the engine and preset store
pub fn apply(
    command: Command,
    engine: &mut Engine,
    presets: &mut PresetStore,
    presets_dir: &Path,
) -> Outcome {
    match command {
        Command::AxisEnable { key, enabled } => {
            engine.registry_mut().update_axis_config(key, |c| c.enabled = enabled);
        }
        Command::AxisInvert { key, inverted } => {
            engine.registry_mut().update_axis_config(key, |c| c.inverted = inverted);
        }
        Command::AxisCc { key, cc } => {
            engine.registry_mut().update_axis_config(key, |c| c.cc = cc);
        }
        Command::AxisChannel { key, channel } => {
            engine.registry_mut().update_axis_config(key, |c| c.channel = channel);
        }
        Command::ButtonEnable { key, enabled } => {
            engine.registry_mut().update_button_config(key, |c| c.enabled = enabled);
        }
        Command::ButtonNote { key, note } => {
            engine.registry_mut().update_button_config(key, |c| c.note = note);
        }
        Command::ButtonVelocity { key, velocity } => {
            engine.registry_mut().update_button_config(key, |c| c.velocity = velocity);
        }
        Command::ButtonChannel { key, channel } => {
            engine.registry_mut().update_button_config(key, |c| c.channel = channel);
        }
        Command::AnimEnable { key, enabled } => {
            engine.bridge_mut().update_mapping(key, |m| m.enabled = enabled);
        }
        Command::AnimAction { key, action } => {
            engine.bridge_mut().update_mapping(key, |m| m.action = action);
        }
        Command::OutputList => match list_output_ports() {
            Ok(ports) if ports.is_empty() => println!("{}", "no MIDI output ports".dimmed()),
            Ok(ports) => {
                for name in ports {
                    println!("  {}", name);
                }
            }
            Err(e) => println!("{} {}", "failed to list ports:".red(), e),
        },
        Command::OutputSelect(pattern) => match MidirSink::connect(&pattern) {
            Ok(sink) => {
                engine.emitter_mut().set_sink(Box::new(sink));
                println!(
                    "{} {}",
                    "output:".green(),
                    engine.emitter().sink_name().unwrap_or("?")
                );
            }
            Err(e) => println!("{} {}", "failed to select output:".red(), e),
        },
        Command::OutputClear => {
            engine.emitter_mut().clear_sink();
            println!("{}", "output released".dimmed());
        }
        Command::PresetSave { device, name } => match engine.capture_preset(device) {
            Ok(preset) => {
                presets.insert(name.clone(), preset);
                println!("{} '{}'", "saved preset".green(), name);
            }
            Err(e) => println!("{} {}", "save failed:".red(), e),
        },
        Command::PresetLoad { device, name } => match presets.get(&name) {
            Ok(preset) => {
                let preset = preset.clone();
                match engine.apply_preset(device, &preset) {
                    Ok(None) => println!("{} '{}'", "loaded preset".green(), name),
                    Ok(Some(warning)) => {
                        println!("{} '{}'", "loaded preset".green(), name);
                        println!("{} {}", "⚠".yellow(), warning.yellow());
                    }
                    Err(e) => println!("{} {}", "load failed:".red(), e),
                }
            }
            Err(e) => println!("{} {}", "load failed:".red(), e),
        },
        Command::PresetList => {
            if presets.is_empty() {
                println!("{}", "no presets".dimmed());
            }
            for name in presets.names() {
                println!("  {}", name);
            }
        }
        Command::PresetExport(path) => {
            let path = path.unwrap_or_else(|| paths::export_path_today(presets_dir));
            if let Err(e) = presets.export_to_file(&path) {
                println!("{} {:#}", "export failed:".red(), e);
            } else {
                println!("{} {}", "exported to".green(), path.display());
            }
        }
        Command::PresetImport(path) => match presets.import_from_file(&path) {
            Ok(count) => println!("{} {} preset(s)", "imported".green(), count),
            Err(e) => {
                // Recoverable: prior collection is untouched; record it in
                // the activity log alongside the console message
                engine
                    .emitter_mut()
                    .log_mut()
                    .push(LogKind::Error, "Preset import failed", format!("{:#}", e));
                println!("{} {:#}", "import failed:".red(), e);
            }
        },
        Command::Devices => {
            if engine.devices().is_empty() {
                println!("{}", "no devices connected".dimmed());
            }
            let mut devices: Vec<_> = engine.devices().iter().collect();
            devices.sort_by_key(|(index, _)| **index);
            for (index, info) in devices {
                println!(
                    "  [{}] {} ({} axes, {} buttons)",
                    index, info.id, info.axis_count, info.button_count
                );
            }
        }
        Command::Mirror => print!("{}", mirror::render(engine.views())),
        Command::LogShow(count) => {
            for entry in engine.emitter().log().recent(count) {
                println!(
                    "  [{}] {} {} {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.kind.label().cyan(),
                    entry.message,
                    entry.detail.dimmed()
                );
            }
        }
        Command::LogClear => engine.emitter_mut().log_mut().clear(),
        Command::Actions => match engine.bridge().scene() {
            Some(scene) => {
                println!("scene: {}", scene.name.bright_white());
                for name in scene.action_names() {
                    println!("  {}", name);
                }
            }
            None => println!("{}", "no scene loaded".dimmed()),
        },
        Command::Help => print_help(),
        Command::Quit => return Outcome::Quit,
    }
    Outcome::Continue
}

fn print_help() {
    println!("{}", "commands:".bold());
    println!("  axis <dev> <idx> on|off | invert on|off | cc <n> | channel <n>");
    println!("  button <dev> <idx> on|off | note <n> | velocity <n> | channel <n>");
    println!("  anim <dev> <idx> on|off | action <name>");
    println!("  output list | select <port> | none");
    println!("  preset save <dev> <name> | load <dev> <name> | list | export [path] | import <path>");
    println!("  devices | mirror | log [n] | log clear | actions | help | quit");
}

/// Run the REPL on a dedicated thread, forwarding commands to the main
/// loop
pub fn spawn_repl(tx: mpsc::Sender<Command>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                warn!("Console unavailable: {}", e);
                return;
            }
        };

        loop {
            match editor.readline("gw> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(line);
                    match parse(line) {
                        Ok(command) => {
                            let quit = command == Command::Quit;
                            if tx.blocking_send(command).is_err() || quit {
                                break;
                            }
                        }
                        Err(e) => println!("{} {:#}", "error:".red(), e),
                    }
                }
                Err(_) => {
                    let _ = tx.blocking_send(Command::Quit);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_axis_commands() {
        assert_eq!(
            parse("axis 0 2 on").unwrap(),
            Command::AxisEnable { key: ControlKey::new(0, 2), enabled: true }
        );
        assert_eq!(
            parse("axis 0 2 invert off").unwrap(),
            Command::AxisInvert { key: ControlKey::new(0, 2), inverted: false }
        );
        assert_eq!(
            parse("axis 1 0 cc 74").unwrap(),
            Command::AxisCc { key: ControlKey::new(1, 0), cc: 74 }
        );
    }

    #[test]
    fn test_parse_button_commands() {
        assert_eq!(
            parse("button 0 3 note 48").unwrap(),
            Command::ButtonNote { key: ControlKey::new(0, 3), note: 48 }
        );
        assert_eq!(
            parse("button 0 3 velocity 100").unwrap(),
            Command::ButtonVelocity { key: ControlKey::new(0, 3), velocity: 100 }
        );
    }

    #[test]
    fn test_parse_out_of_range_number_saturates() {
        // Clamping to the MIDI range happens at the registry; the parser
        // only saturates into byte range instead of rejecting
        assert_eq!(
            parse("axis 0 0 cc 300").unwrap(),
            Command::AxisCc { key: ControlKey::new(0, 0), cc: 255 }
        );
    }

    #[test]
    fn test_parse_preset_name_with_spaces() {
        assert_eq!(
            parse("preset save 0 inverted sticks").unwrap(),
            Command::PresetSave { device: 0, name: "inverted sticks".to_string() }
        );
    }

    #[test]
    fn test_parse_output_select_pattern() {
        assert_eq!(
            parse("output select loopMIDI Port 1").unwrap(),
            Command::OutputSelect("loopMIDI Port 1".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("axis").is_err());
        assert!(parse("axis 0 x on").is_err());
        assert!(parse("frobnicate 1 2").is_err());
    }

    #[test]
    fn test_parse_log_variants() {
        assert_eq!(parse("log").unwrap(), Command::LogShow(20));
        assert_eq!(parse("log 5").unwrap(), Command::LogShow(5));
        assert_eq!(parse("log clear").unwrap(), Command::LogClear);
    }

    #[test]
    fn test_apply_config_commands_clamp() {
        use crate::avatar::AnimationBridge;
        use crate::avatar::LoggingAvatar;
        use crate::output::Emitter;

        let mut engine = crate::engine::Engine::new(
            Emitter::new(),
            AnimationBridge::new(Box::new(LoggingAvatar)),
        );
        let mut presets = PresetStore::new();
        let dir = std::env::temp_dir();

        let key = ControlKey::new(0, 0);
        apply(Command::AxisCc { key, cc: 255 }, &mut engine, &mut presets, &dir);
        assert_eq!(engine.registry().axis_config(key).cc, 127);

        apply(
            Command::ButtonVelocity { key, velocity: 0 },
            &mut engine,
            &mut presets,
            &dir,
        );
        assert_eq!(engine.registry().button_config(key).velocity, 1);
    }

    #[test]
    fn test_apply_quit_outcome() {
        use crate::avatar::{AnimationBridge, LoggingAvatar};
        use crate::output::Emitter;

        let mut engine = crate::engine::Engine::new(
            Emitter::new(),
            AnimationBridge::new(Box::new(LoggingAvatar)),
        );
        let mut presets = PresetStore::new();
        let outcome = apply(Command::Quit, &mut engine, &mut presets, &std::env::temp_dir());
        assert_eq!(outcome, Outcome::Quit);
    }

    #[test]
    fn test_failed_import_records_error_log_entry() {
        use crate::avatar::{AnimationBridge, LoggingAvatar};
        use crate::output::Emitter;

        let mut engine = crate::engine::Engine::new(
            Emitter::new(),
            AnimationBridge::new(Box::new(LoggingAvatar)),
        );
        let mut presets = PresetStore::new();
        presets.insert(
            "keep",
            crate::preset::Preset::capture(0, "Pad", 1, 1, engine.registry()),
        );

        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ nope").unwrap();

        apply(
            Command::PresetImport(bad),
            &mut engine,
            &mut presets,
            dir.path(),
        );

        // Prior collection untouched, one error entry in the activity log
        assert_eq!(presets.len(), 1);
        let kinds: Vec<_> = engine.emitter().log().entries().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![LogKind::Error]);
    }
}
