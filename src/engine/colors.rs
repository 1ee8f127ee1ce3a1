use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// A hex display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

impl Color {
    pub const fn new(hex: &'static str) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Task colors, handed out in order and cycled.
pub const PALETTE: [Color; 7] = [
    Color::new("#FF6384"),
    Color::new("#36A2EB"),
    Color::new("#FFCE56"),
    Color::new("#4BC0C0"),
    Color::new("#9966FF"),
    Color::new("#FF9F40"),
    Color::new("#FFCD56"),
];

pub const COMPLETED_COLOR: Color = Color::new("#4CAF50");
pub const SLEEP_COLOR: Color = Color::new("#5FBCFA");
pub const MEAL_COLOR: Color = Color::new("#FFA07A");
pub const FREE_TIME_COLOR: Color = Color::new("#C0C0C0");

/// Title -> color memory for one planning session.
///
/// A title keeps the color it was first given for as long as the cache
/// lives. The cache only grows; completion overrides what is displayed but
/// never what is cached.
#[derive(Debug, Clone, Default)]
pub struct ColorCache {
    assigned: HashMap<String, Color>,
    next_slot: usize,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached color for `title`, assigning the next palette slot on first sight.
    pub fn color_for(&mut self, title: &str) -> Color {
        if let Some(color) = self.assigned.get(title) {
            return *color;
        }
        let color = PALETTE[self.next_slot % PALETTE.len()];
        self.next_slot += 1;
        self.assigned.insert(title.to_string(), color);
        color
    }

    pub fn get(&self, title: &str) -> Option<Color> {
        self.assigned.get(title).copied()
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
