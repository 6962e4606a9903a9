//! Chart instances and their SVG layouts.
//!
//! A chart instance is the computed layout for one input sequence. It lives in
//! a [`ChartSlot`], which holds at most one instance at a time.

use crate::shared::types::{CityMetric, RidePoint};
use crate::utils::format::format_time_of_day;

pub const BAR_COLORS: [&str; 5] = ["#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF"];
pub const MAX_BARS: usize = 5;

/// Owns the current chart instance, if any.
pub struct ChartSlot<C> {
    instance: Option<C>,
}

impl<C> Default for ChartSlot<C> {
    fn default() -> Self {
        Self { instance: None }
    }
}

impl<C> ChartSlot<C> {
    /// Drops the current instance, then builds a new one from `data`.
    /// Empty data leaves the slot empty.
    pub fn sync<T>(&mut self, data: &[T], build: impl FnOnce(&[T]) -> C) {
        drop(self.instance.take());
        if !data.is_empty() {
            self.instance = Some(build(data));
        }
    }

    pub fn release(&mut self) {
        drop(self.instance.take());
    }

    pub fn instance(&self) -> Option<&C> {
        self.instance.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub points: Vec<(f32, f32)>,
    pub line_path: String,
    pub area_path: String,
    pub max_value: u64,
    pub first_label: String,
    pub last_label: String,
}

impl LineChart {
    pub const WIDTH: f32 = 600.0;
    pub const HEIGHT: f32 = 220.0;
    pub const PADDING: f32 = 28.0;

    pub fn build(data: &[RidePoint]) -> Self {
        let (w, h, pad) = (Self::WIDTH, Self::HEIGHT, Self::PADDING);
        let plot_w = w - pad * 2.0;
        let plot_h = h - pad * 2.0;
        let max_value = data.iter().map(|p| p.active_rides).max().unwrap_or(0);
        let scale = max_value.max(1) as f32;
        let step = if data.len() > 1 {
            plot_w / (data.len() - 1) as f32
        } else {
            0.0
        };

        let points: Vec<(f32, f32)> = data
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let x = if data.len() > 1 { pad + step * i as f32 } else { w / 2.0 };
                let y = pad + plot_h - (p.active_rides as f32 / scale) * plot_h;
                (x, y)
            })
            .collect();

        let mut line_path = String::new();
        for (i, (x, y)) in points.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            line_path.push_str(&format!("{cmd}{x:.1},{y:.1} "));
        }
        let baseline = pad + plot_h;
        let area_path = match (points.first(), points.last()) {
            (Some((x0, _)), Some((xn, _))) => {
                format!("{}L{xn:.1},{baseline:.1} L{x0:.1},{baseline:.1} Z", line_path)
            }
            _ => String::new(),
        };

        LineChart {
            width: w,
            height: h,
            padding: pad,
            points,
            line_path: line_path.trim_end().to_string(),
            area_path,
            max_value,
            first_label: data.first().map(|p| format_time_of_day(&p.observed_at)).unwrap_or_default(),
            last_label: data.last().map(|p| format_time_of_day(&p.observed_at)).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub city: String,
    pub value: u64,
    pub y: f32,
    pub width: f32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub width: f32,
    pub height: f32,
    pub label_width: f32,
    pub row_height: f32,
    pub bar_height: f32,
    pub bars: Vec<Bar>,
}

impl BarChart {
    pub const WIDTH: f32 = 600.0;
    pub const LABEL_WIDTH: f32 = 110.0;
    pub const VALUE_WIDTH: f32 = 50.0;
    pub const ROW_HEIGHT: f32 = 40.0;
    pub const BAR_HEIGHT: f32 = 26.0;

    /// Horizontal bars for the first [`MAX_BARS`] cities, in the order given.
    pub fn build(data: &[CityMetric]) -> Self {
        let shown = &data[..data.len().min(MAX_BARS)];
        let max = shown.iter().map(|c| c.active_rides).max().unwrap_or(0).max(1) as f32;
        let track = Self::WIDTH - Self::LABEL_WIDTH - Self::VALUE_WIDTH;

        let bars = shown
            .iter()
            .enumerate()
            .map(|(i, c)| Bar {
                city: c.city.clone(),
                value: c.active_rides,
                y: i as f32 * Self::ROW_HEIGHT + (Self::ROW_HEIGHT - Self::BAR_HEIGHT) / 2.0,
                width: c.active_rides as f32 / max * track,
                color: BAR_COLORS[i % BAR_COLORS.len()],
            })
            .collect::<Vec<_>>();

        BarChart {
            width: Self::WIDTH,
            height: bars.len() as f32 * Self::ROW_HEIGHT,
            label_width: Self::LABEL_WIDTH,
            row_height: Self::ROW_HEIGHT,
            bar_height: Self::BAR_HEIGHT,
            bars,
        }
    }
}
