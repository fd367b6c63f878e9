// src/station.rs

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub name: String,
    /// Stream URL, or a local file path.
    pub url: String,
    pub shortcut: char,
    /// XML feed with the recent track list, if the station publishes one.
    #[serde(default)]
    pub songs_url: Option<String>,
}

impl Station {
    pub fn new(name: &str, url: &str, shortcut: char, songs_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            shortcut,
            songs_url: songs_url.map(str::to_string),
        }
    }
}

/// SomaFM channels shipped as the default table.
pub fn default_stations() -> Vec<Station> {
    vec![
        Station::new(
            "Lush",
            "https://ice6.somafm.com/lush-128-mp3",
            'l',
            Some("https://somafm.com/songs/lush.xml"),
        ),
        Station::new(
            "Groove Salad",
            "https://ice6.somafm.com/groovesalad-128-mp3",
            'g',
            Some("https://somafm.com/songs/groovesalad.xml"),
        ),
        Station::new(
            "Indie Pop Rocks!",
            "https://ice6.somafm.com/indiepop-128-mp3",
            'i',
            Some("https://somafm.com/songs/indiepop.xml"),
        ),
        Station::new(
            "Secret Agent",
            "https://ice6.somafm.com/secretagent-128-mp3",
            's',
            Some("https://somafm.com/songs/secretagent.xml"),
        ),
        Station::new(
            "Underground 80s",
            "https://ice6.somafm.com/u80s-128-mp3",
            '8',
            Some("https://somafm.com/songs/u80s.xml"),
        ),
    ]
}

const BANNER: &str = r"
  ____           _ _
 |  _ \ __ _  __| (_) ___
 | |_) / _` |/ _` | |/ _ \
 |  _ < (_| | (_| | | (_) |
 |_| \_\__,_|\__,_|_|\___/
";

pub const MENU_HINT: &str = "(enter code or 'Ctrl + c' to quit)";

pub struct StationList<'a> {
    stations: &'a [Station],
}

impl<'a> StationList<'a> {
    pub fn new(stations: &'a [Station]) -> Self {
        Self { stations }
    }

    /// Shortcut first (single character), then exact name, then name ignoring case.
    pub fn resolve(&self, input: &str) -> Option<&'a Station> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let mut chars = input.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(st) = self.stations.iter().find(|s| s.shortcut == c) {
                return Some(st);
            }
        }

        self.stations
            .iter()
            .find(|s| s.name == input)
            .or_else(|| {
                self.stations
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(input))
            })
    }

    pub fn menu_lines(&self) -> Vec<String> {
        self.stations
            .iter()
            .map(|s| format!("{} -- {}", s.shortcut, s.name))
            .collect()
    }

    /// Banner, heading, quit hint and the station lines, ready to print.
    pub fn menu_screen(&self) -> Vec<String> {
        let mut lines: Vec<String> = BANNER.lines().map(str::to_string).collect();
        lines.push(String::new());
        lines.push("Available stations:".into());
        lines.push(MENU_HINT.into());
        lines.extend(self.menu_lines());
        lines
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
