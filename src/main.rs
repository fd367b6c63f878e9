// src/main.rs

use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::warn;

use radio_modules::config::{DEFAULT_CONFIG_PATH, RadioConfig};
use radio_modules::now_playing::{fetch_playlist, now_playing_lines};
use radio_modules::pipeline::StreamOutcome;
use radio_modules::player::RadioPlayer;
use radio_modules::render::TerminalBars;
use radio_modules::render::terminal::draw_status_line;
use radio_modules::source::stream::http_client;
use radio_modules::station::{Station, StationList};
use radio_modules::telemetry;

const HISTORY_ROWS: usize = 5;
const VOLUME_STEP: f32 = 0.1;

enum AfterPlay {
    Menu,
    Quit,
}

fn main() -> Result<(), anyhow::Error> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = RadioConfig::load_or_default(&config_path)?;
    telemetry::init(config.log_file.as_deref());
    config.validate()?;
    let client = http_client(&config.network)?;
    let stations = StationList::new(&config.stations);

    loop {
        let Some(station) = choose_station(&stations)? else {
            break;
        };

        let mut lines = Vec::new();
        if let Some(songs_url) = station.songs_url.as_deref() {
            match fetch_playlist(&client, songs_url, config.network.playlist_timeout()) {
                Ok(playlist) => lines = now_playing_lines(&station.name, &playlist, HISTORY_ROWS),
                Err(e) => println!("⚠️ Could not load track list: {e:#}"),
            }
        }
        for line in &lines {
            println!("{line}");
        }

        // banner + menu scroll away; chart goes right under what we just printed
        let (_, row) = crossterm::cursor::position().unwrap_or((0, lines.len() as u16));
        let renderer = TerminalBars::new(row.saturating_add(1), &config.display);

        let player = match RadioPlayer::start(&client, station, &config, renderer) {
            Ok(p) => p,
            Err(e) => {
                println!("❌ Could not play {}: {e:#}", station.name);
                pause()?;
                continue;
            }
        };

        let status_row = row
            .saturating_add(1)
            .saturating_add(config.display.height as u16)
            .saturating_add(1);
        let next = play_loop(player, status_row)?;
        if let AfterPlay::Quit = next {
            break;
        }
    }

    println!("\n🛑 Exiting radio.");
    Ok(())
}

/// Shows the menu until a known station is picked. `None` on end of input.
fn choose_station<'a>(stations: &StationList<'a>) -> Result<Option<&'a Station>, anyhow::Error> {
    let stdin = io::stdin();
    loop {
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        for line in stations.menu_screen() {
            println!("{line}");
        }
        println!();
        print!("📻 Enter the station code or name to play: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        match stations.resolve(&input) {
            Some(station) => return Ok(Some(station)),
            None => {
                println!("Invalid station: {:?}", input.trim());
                pause()?;
            }
        }
    }
}

fn pause() -> Result<(), anyhow::Error> {
    print!("Press Enter to continue...");
    io::stdout().flush()?;
    let mut discard = String::new();
    io::stdin().lock().read_line(&mut discard)?;
    Ok(())
}

fn play_loop(player: RadioPlayer, status_row: u16) -> Result<AfterPlay, anyhow::Error> {
    enable_raw_mode()?;
    let result = key_loop(&player, status_row);
    let _ = disable_raw_mode();

    let next = result.unwrap_or_else(|e| {
        warn!("[player] input loop failed: {e:#}");
        AfterPlay::Menu
    });

    let outcome = player.stop();
    execute!(io::stdout(), MoveTo(0, status_row.saturating_add(1)))?;
    match outcome {
        StreamOutcome::Stopped => println!("⏹ Stopped."),
        StreamOutcome::Exhausted => println!("🏁 Stream ended."),
        StreamOutcome::Failed(e) => println!("❌ Stream failed: {e}"),
    }
    if let AfterPlay::Menu = next {
        pause()?;
    }
    Ok(next)
}

fn key_loop(player: &RadioPlayer, status_row: u16) -> Result<AfterPlay, anyhow::Error> {
    let poll = Duration::from_millis(100);
    let help = "[+/-] Volume | [S/Q/Esc] Stop | [Ctrl+C] Quit";
    draw_status_line(status_row, &format!("{help} | vol {:>3.0}%", player.volume() * 100.0))?;

    loop {
        if player.is_finished() {
            return Ok(AfterPlay::Menu);
        }

        if !event::poll(poll)? {
            continue;
        }
        let Event::Key(ev) = event::read()? else {
            continue;
        };
        if ev.kind != KeyEventKind::Press {
            continue;
        }

        match ev.code {
            KeyCode::Char('c') if ev.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(AfterPlay::Quit);
            }
            KeyCode::Char('q') | KeyCode::Char('s') | KeyCode::Esc => {
                return Ok(AfterPlay::Menu);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                player.adjust_volume(VOLUME_STEP);
            }
            KeyCode::Char('-') => {
                player.adjust_volume(-VOLUME_STEP);
            }
            _ => continue,
        }
        draw_status_line(status_row, &format!("{help} | vol {:>3.0}%", player.volume() * 100.0))?;
    }
}
