//! # Configuration
//!
//! This module defines the configuration struct for the editor.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_LIMIT;

/// Configuration parameters for the canvas editor.
///
/// These settings allow the host application to tune history depth and the
/// feel of pointer interactions. Distances are in client pixels unless noted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Maximum number of snapshots kept in undo history. Default: 200.
    pub history_limit: usize,
    /// Box selections released below this drag distance count as a click. Default: 5.0.
    pub box_select_threshold: f32,
    /// Zoom step per wheel notch. Default: 0.1.
    pub zoom_speed: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Radius around a port anchor that starts a wire. Default: 8.0.
    pub port_hit_radius: f32,
    /// Distance within which a dragged wire snaps to a port. Default: 16.0.
    pub snap_threshold: f32,
    /// Edge length of the group resize handle, in canvas units. Default: 12.0.
    pub resize_handle_size: f32,
    /// Smallest size a group can be resized to, in canvas units.
    pub min_group_size: Vec2,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            box_select_threshold: 5.0,
            zoom_speed: 0.1,
            min_zoom: 0.25,
            max_zoom: 4.0,
            port_hit_radius: 8.0,
            snap_threshold: 16.0,
            resize_handle_size: 12.0,
            min_group_size: Vec2::new(120.0, 80.0),
        }
    }
}
