// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Draws a reconstructed trace as an SVG image: one lane per signal, time running to the right.

use crate::options::RenderOptions;
use crate::trace::{SignalKind, Time, Timeline, Trace};
use itertools::Itertools;
use std::borrow::Cow;

/// Renders the trace with the default style.
///
/// One grid line and tick label is drawn per time unit up to the last time step, so output size
/// grows with the largest timestamp, not with the number of changes.
pub fn render(trace: &Trace) -> Vec<u8> {
    render_with_options(trace, &RenderOptions::default())
}

pub fn render_with_options(trace: &Trace, options: &RenderOptions) -> Vec<u8> {
    let timeline = trace.timeline();
    let signals = trace.signals();
    let times: Vec<Time> = timeline.times().collect();
    let max_time = timeline.max_time();

    let (width, height) = canvas_size(times.len(), signals.len(), options);
    if max_time >= LARGE_TIME_AXIS {
        tracing::warn!(
            trace = trace.name(),
            max_time,
            "long time axis, one grid line is drawn per time unit"
        );
    }
    let mut svg = SvgWriter::new(width, height);
    svg.rect(0, 0, width, height, &options.background_style);

    draw_grid(&mut svg, max_time, height, options);

    let mut y = options.lanes_top;
    for signal in signals.iter() {
        draw_signal(&mut svg, timeline, &times, signal, y, options);
        y += options.signal_height + options.signal_gap;
    }

    tracing::debug!(
        trace = trace.name(),
        width,
        height,
        bytes = svg.len(),
        "rendered waveform"
    );
    svg.finish().into_bytes()
}

/// Time axes with at least this many units produce very large images.
const LARGE_TIME_AXIS: Time = 100_000;

/// The width only accounts for the distinct time steps. Lanes of sparse traces extend past the
/// right edge of the canvas.
fn canvas_size(time_steps: usize, signals: usize, options: &RenderOptions) -> (i64, i64) {
    let width = (time_steps as i64)
        .saturating_mul(options.step_width)
        .saturating_add(options.left_margin + options.right_padding);
    let height = (signals as i64) * (options.signal_height + options.signal_gap)
        + options.vertical_margin;
    (width, height)
}

#[inline]
fn time_to_x(time: Time, options: &RenderOptions) -> i64 {
    (time as i64)
        .saturating_mul(options.step_width)
        .saturating_add(options.left_margin)
}

fn draw_grid(svg: &mut SvgWriter, max_time: Time, height: i64, options: &RenderOptions) {
    let grid_bottom = height - options.grid_bottom_margin;
    for time in 0..=max_time {
        let x = time_to_x(time, options);
        let style = if time == 0 {
            &options.axis_style
        } else {
            &options.grid_style
        };
        svg.line(x, options.grid_top, x, grid_bottom, style);
        svg.line(x, options.tick_top, x, options.tick_bottom, &options.tick_style);
        svg.text_with_shadow(
            x,
            options.tick_label_y,
            &time.to_string(),
            &options.tick_text_style,
            &options.text_shadow_style,
        );
    }
}

fn draw_signal(
    svg: &mut SvgWriter,
    timeline: &Timeline,
    times: &[Time],
    signal: &str,
    y: i64,
    options: &RenderOptions,
) {
    let center = y + options.signal_height / 2;
    svg.text_with_shadow(
        options.label_x,
        center,
        signal,
        &options.text_style,
        &options.text_shadow_style,
    );

    let mut last_label: Option<Cow<str>> = None;
    for (&prev, &cur) in times.iter().tuple_windows() {
        // nothing is drawn before the first value of a signal
        let (Some(before), Some(after)) =
            (timeline.value_at(prev, signal), timeline.value_at(cur, signal))
        else {
            continue;
        };
        let (x0, x1) = (time_to_x(prev, options), time_to_x(cur, options));

        match SignalKind::of(after) {
            SignalKind::Bus => {
                let y_top = y;
                let y_bottom = y + 3 * options.signal_height / 4;
                svg.polygon(
                    &[(x0, y_top), (x1, y_top), (x1, y_bottom), (x0, y_bottom)],
                    &options.bus_fill_style,
                );
                if before != after {
                    // "X" crossing marks the value change
                    svg.line_with_shadow(x0, y_top, x1, y_bottom, &options.bus_style, options);
                    svg.line_with_shadow(x0, y_bottom, x1, y_top, &options.bus_style, options);
                } else {
                    svg.line_with_shadow(x0, y_top, x1, y_top, &options.bus_style, options);
                    svg.line_with_shadow(x0, y_bottom, x1, y_bottom, &options.bus_style, options);
                    let label = format_bus_value(after, options.hex_threshold);
                    if last_label.as_ref() != Some(&label) {
                        svg.text_with_shadow(
                            x0 + 1,
                            center,
                            &label,
                            &options.bus_value_style,
                            &options.text_shadow_style,
                        );
                        last_label = Some(label);
                    }
                }
            }
            SignalKind::Wire => {
                let level = |value: &str| {
                    if value == "1" {
                        y
                    } else {
                        y + options.signal_height
                    }
                };
                let (y0, y1) = (level(before), level(after));
                svg.line_with_shadow(x0, y0, x1, y0, &options.wire_style, options);
                if before != after {
                    svg.line_with_shadow(x1, y0, x1, y1, &options.wire_style, options);
                }
            }
        }
    }
}

/// Long binary values are shown in hex, e.g. `b000111100001` becomes `0x1E1`.
/// Anything that is not a plain binary number is displayed as is.
pub fn format_bus_value(value: &str, hex_threshold: usize) -> Cow<'_, str> {
    if value.len() <= hex_threshold {
        return Cow::Borrowed(value);
    }
    let bits = value
        .strip_prefix('b')
        .or_else(|| value.strip_prefix('B'))
        .unwrap_or(value);
    match binary_to_hex(bits) {
        Some(hex) => Cow::Owned(hex),
        None => Cow::Borrowed(value),
    }
}

/// Works for any width, not only values that fit into 64 bits.
fn binary_to_hex(bits: &str) -> Option<String> {
    if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    let digits = bits.trim_start_matches('0').as_bytes();
    if digits.is_empty() {
        return Some("0x0".to_string());
    }
    let mut out = String::with_capacity(digits.len() / 4 + 3);
    out.push_str("0x");
    let (head, tail) = digits.split_at(digits.len() % 4);
    let nibbles = std::iter::once(head)
        .filter(|n| !n.is_empty())
        .chain(tail.chunks(4));
    for nibble in nibbles {
        let value = nibble
            .iter()
            .fold(0u32, |acc, b| (acc << 1) | u32::from(b - b'0'));
        out.push(char::from_digit(value, 16)?.to_ascii_uppercase());
    }
    Some(out)
}

/// Minimal SVG markup writer. Coordinates are integers, text is escaped.
struct SvgWriter {
    out: String,
}

impl SvgWriter {
    fn new(width: i64, height: i64) -> Self {
        let mut out = String::with_capacity(16 * 1024);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
        ));
        Self { out }
    }

    fn len(&self) -> usize {
        self.out.len()
    }

    fn rect(&mut self, x: i64, y: i64, width: i64, height: i64, style: &str) {
        self.out.push_str(&format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" style=\"{}\" />\n",
            escape(style)
        ));
    }

    fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, style: &str) {
        self.out.push_str(&format!(
            "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x1}\" y2=\"{y1}\" style=\"{}\" />\n",
            escape(style)
        ));
    }

    /// Horizontal lines get their shadow one pixel below, all others one pixel to the right.
    fn line_with_shadow(
        &mut self,
        x0: i64,
        y0: i64,
        x1: i64,
        y1: i64,
        style: &str,
        options: &RenderOptions,
    ) {
        if y0 == y1 {
            self.line(x0, y0 + 1, x1, y1 + 1, &options.shadow_style);
        } else {
            self.line(x0 + 1, y0, x1 + 1, y1, &options.shadow_style);
        }
        self.line(x0, y0, x1, y1, style);
    }

    fn polygon(&mut self, points: &[(i64, i64)], style: &str) {
        let points = points.iter().map(|(x, y)| format!("{x},{y}")).join(" ");
        self.out.push_str(&format!(
            "<polygon points=\"{points}\" style=\"{}\" />\n",
            escape(style)
        ));
    }

    fn text(&mut self, x: i64, y: i64, text: &str, style: &str) {
        self.out.push_str(&format!(
            "<text x=\"{x}\" y=\"{y}\" style=\"{}\">{}</text>\n",
            escape(style),
            escape(text)
        ));
    }

    /// The shadow is a copy of the text, moved one pixel down and right.
    fn text_with_shadow(&mut self, x: i64, y: i64, text: &str, style: &str, shadow: &str) {
        self.text(x + 1, y + 1, text, &format!("{style};{shadow}"));
        self.text(x, y, text, style);
    }

    fn finish(mut self) -> String {
        self.out.push_str("</svg>\n");
        self.out
    }
}

fn escape(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}
