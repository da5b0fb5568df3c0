// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

/// Layout and style of the rendered waveform. All lengths are in SVG user units (pixels).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderOptions {
    /// Height of the area in which a single signal is drawn.
    pub signal_height: i64,
    /// Vertical space between two lanes.
    pub signal_gap: i64,
    /// Horizontal distance between two consecutive time units.
    pub step_width: i64,
    /// Space on the left that holds the signal names. Time 0 starts here.
    pub left_margin: i64,
    pub right_padding: i64,
    /// Added to the height of all lanes to make room for the time axis.
    pub vertical_margin: i64,
    /// Top of the first lane.
    pub lanes_top: i64,
    pub grid_top: i64,
    /// Distance of the end of the grid lines from the bottom of the image.
    pub grid_bottom_margin: i64,
    pub tick_top: i64,
    pub tick_bottom: i64,
    pub tick_label_y: i64,
    /// x position of the signal names.
    pub label_x: i64,
    /// Binary bus values with more characters than this are displayed in hex.
    pub hex_threshold: usize,
    pub background_style: String,
    pub wire_style: String,
    /// Used for the drop shadow of every line.
    pub shadow_style: String,
    pub bus_style: String,
    pub bus_fill_style: String,
    pub bus_value_style: String,
    pub text_style: String,
    /// Used for the drop shadow of every text.
    pub text_shadow_style: String,
    pub tick_text_style: String,
    pub tick_style: String,
    pub grid_style: String,
    pub axis_style: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            signal_height: 20,
            signal_gap: 10,
            step_width: 20,
            left_margin: 150,
            right_padding: 10,
            vertical_margin: 100,
            lanes_top: 50,
            grid_top: 40,
            grid_bottom_margin: 30,
            tick_top: 35,
            tick_bottom: 45,
            tick_label_y: 30,
            label_x: 10,
            hex_threshold: 8,
            background_style: "fill:rgba(20,20,20,1)".to_string(),
            wire_style: "stroke:green;stroke-width:1".to_string(),
            shadow_style: "stroke:rgba(0,0,0,0.5);stroke-width:1".to_string(),
            bus_style: "stroke:cyan;stroke-width:1".to_string(),
            bus_fill_style: "fill:cyan;fill-opacity:0.1".to_string(),
            bus_value_style:
                "font-size:10px;font-family:monospace;text-anchor:start;fill:white".to_string(),
            text_style: "font-size:12px;font-family:monospace;fill:white".to_string(),
            text_shadow_style: "fill:black;fill-opacity:0.5".to_string(),
            tick_text_style:
                "font-size:10px;font-family:monospace;text-anchor:middle;fill:white".to_string(),
            tick_style: "stroke:grey;stroke-width:1".to_string(),
            grid_style: "stroke:#303030;stroke-width:1;stroke-dasharray:1,1".to_string(),
            axis_style: "stroke:#606060;stroke-width:2".to_string(),
        }
    }
}
