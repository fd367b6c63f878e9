// src/now_playing.rs

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Song {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
}

/// Recent tracks of a station, newest first.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    #[serde(rename = "song", default)]
    pub songs: Vec<Song>,
}

impl Playlist {
    pub fn parse(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).context("parsing songs XML")
    }

    pub fn current(&self) -> Option<&Song> {
        self.songs.first()
    }

    /// Up to `n` tracks played before the current one.
    pub fn history(&self, n: usize) -> &[Song] {
        let rest = self.songs.get(1..).unwrap_or(&[]);
        &rest[..n.min(rest.len())]
    }
}

/// Downloads and parses a station's track list. `deadline` bounds the whole request.
pub fn fetch_playlist(client: &Client, songs_url: &str, deadline: Duration) -> Result<Playlist> {
    let body = client
        .get(songs_url)
        .timeout(deadline)
        .send()
        .with_context(|| format!("requesting {songs_url}"))?
        .error_for_status()
        .with_context(|| format!("requesting {songs_url}"))?
        .text()
        .context("reading songs XML")?;
    Playlist::parse(&body)
}

pub fn format_song_row(song: &Song) -> String {
    format!(
        "{:<35.35}  {:<20.20}  {:<20.20}",
        song.title, song.artist, song.album
    )
}

/// Header, current track and history block printed above the chart.
pub fn now_playing_lines(station_name: &str, playlist: &Playlist, history: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(song) = playlist.current() {
        lines.push(format!("Now playing on {station_name}"));
        lines.push(format!("{:<35}  {:<20}  {:<20}", "Track:", "Artist:", "Album:"));
        lines.push(format_song_row(song));
        lines.push(String::new());
    }
    let past = playlist.history(history);
    if !past.is_empty() {
        lines.push("    ----------------------------History------------------------------".into());
        lines.extend(past.iter().map(format_song_row));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<songs channel="groovesalad">
  <song>
    <title>Track One</title>
    <artist>Artist A</artist>
    <album>Album X</album>
    <date>1700000000</date>
  </song>
  <song>
    <title>Track Two</title>
    <artist>Artist B</artist>
    <album>Album Y</album>
  </song>
  <song>
    <title>Track Three</title>
    <artist>Artist C</artist>
    <album></album>
  </song>
</songs>"#;

    #[test]
    fn parses_songs_and_ignores_extra_fields() {
        let pl = Playlist::parse(SAMPLE).unwrap();
        assert_eq!(pl.songs.len(), 3);
        assert_eq!(pl.current().unwrap().title, "Track One");
        assert_eq!(pl.songs[2].album, "");
    }

    #[test]
    fn history_is_bounded_by_list_length() {
        let pl = Playlist::parse(SAMPLE).unwrap();
        assert_eq!(pl.history(5).len(), 2);
        assert_eq!(pl.history(1)[0].title, "Track Two");
        assert!(Playlist::default().history(5).is_empty());
    }

    #[test]
    fn rows_are_fixed_width() {
        let song = Song {
            title: "A very long title that keeps going well past the column".into(),
            artist: "Short".into(),
            album: "Album".into(),
        };
        let row = format_song_row(&song);
        assert_eq!(row.chars().count(), 35 + 2 + 20 + 2 + 20);
        assert!(row.starts_with("A very long title that keeps going "));
    }

    #[test]
    fn empty_playlist_prints_nothing() {
        assert!(now_playing_lines("Lush", &Playlist::default(), 5).is_empty());
    }

    #[test]
    fn lines_include_current_and_history() {
        let pl = Playlist::parse(SAMPLE).unwrap();
        let lines = now_playing_lines("Groove Salad", &pl, 5);
        assert_eq!(lines[0], "Now playing on Groove Salad");
        assert_eq!(lines.len(), 4 + 1 + 2);
    }
}
