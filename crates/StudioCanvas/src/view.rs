//! # Viewport System
//!
//! This module handles the mapping between **client space** (pointer
//! coordinates reported by the host window) and **canvas space** (where nodes
//! live). Every gesture goes through the same transform, so pan and zoom behave
//! identically for node drags, object drags, resizes, box selection and wiring.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Position, scroll and zoom of the canvas element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Top-left corner of the canvas element in client space.
    pub origin: Vec2,
    /// Scroll offset of the canvas element, in zoomed pixels.
    pub scroll: Vec2,
    /// The scale factor.
    /// - 1.0 = 100% scale.
    /// - Greater than 1.0 = Zoomed In.
    /// - Less than 1.0 = Zoomed Out.
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            scroll: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Converts a point from client space to canvas space.
    ///
    /// Formula: `Canvas = (Client - Origin + Scroll) / Zoom`
    pub fn client_to_canvas(&self, client: Vec2) -> Vec2 {
        (client - self.origin + self.scroll) / self.zoom
    }

    /// Converts a point from canvas space to client space.
    ///
    /// Formula: `Client = Canvas * Zoom - Scroll + Origin`
    pub fn canvas_to_client(&self, canvas: Vec2) -> Vec2 {
        canvas * self.zoom - self.scroll + self.origin
    }

    /// Converts a client-space displacement to a canvas-space displacement.
    pub fn client_delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom
    }

    /// Sets the zoom while keeping the canvas point under `client` fixed on screen.
    ///
    /// Returns true if the zoom actually changed.
    pub fn zoom_at(&mut self, client: Vec2, zoom: f32, min_zoom: f32, max_zoom: f32) -> bool {
        let new_zoom = zoom.clamp(min_zoom, max_zoom);
        if (new_zoom - self.zoom).abs() <= f32::EPSILON {
            return false;
        }

        let anchor = self.client_to_canvas(client);
        self.zoom = new_zoom;
        // Client = Canvas * Zoom - Scroll + Origin  =>  Scroll = Canvas * Zoom - (Client - Origin)
        self.scroll = anchor * new_zoom - (client - self.origin);
        true
    }

    /// Scrolls the canvas by a client-space displacement (content follows the pointer).
    pub fn pan_by(&mut self, client_delta: Vec2) {
        self.scroll -= client_delta;
    }
}
