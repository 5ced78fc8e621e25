//! Pointer → tooltip instructions for a drawn frame.
//!
//! `hover` is stateless: the host forwards pointer events over wave slots and
//! applies the returned instruction to its tooltip element.

use serde::Serialize;

use crate::allocate::WaveFrame;

/// Tooltip offset from the pointer, in pixels.
pub const TOOLTIP_OFFSET: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Pointer entered the slot at `slot` (index into `WaveFrame::slots`).
    Enter { slot: usize, x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub state_name: String,
    pub subregion: String,
    /// Share of the bucket, one decimal (`"37.5%"`).
    pub share_pct: String,
    pub rank: i32,
    /// Missing-value percentage, one decimal.
    pub missing_pct: String,
    pub waves: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverInstruction {
    Show { tooltip: Tooltip, x: f64, y: f64 },
    MoveTo { x: f64, y: f64 },
    Hide,
}

pub fn hover(frame: &WaveFrame, event: PointerEvent) -> HoverInstruction {
    match event {
        PointerEvent::Enter { slot, x, y } => match tooltip_for(frame, slot) {
            Some(tooltip) => HoverInstruction::Show {
                tooltip,
                x: x + TOOLTIP_OFFSET,
                y: y + TOOLTIP_OFFSET,
            },
            None => HoverInstruction::Hide,
        },
        PointerEvent::Move { x, y } => HoverInstruction::MoveTo {
            x: x + TOOLTIP_OFFSET,
            y: y + TOOLTIP_OFFSET,
        },
        PointerEvent::Leave => HoverInstruction::Hide,
    }
}

pub fn tooltip_for(frame: &WaveFrame, slot: usize) -> Option<Tooltip> {
    let s = frame.slots.get(slot)?;
    Some(Tooltip {
        state_name: s.state_name.clone(),
        subregion: s.subregion.clone(),
        share_pct: format_share_pct(s.share),
        rank: s.rank,
        missing_pct: format!("{:.1}%", s.missing_pct),
        waves: s.waves,
    })
}

/// Fraction → percent with one decimal.
pub fn format_share_pct(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}
