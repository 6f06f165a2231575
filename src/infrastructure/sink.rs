use std::collections::HashSet;

use tracing::debug;

use crate::domain::{AssetMovement, HistoryEvent, MarginPosition, Trade};

/// Persistence seam for canonical records.
///
/// Implementations must be idempotent: a record whose natural identity was
/// seen before is dropped, so re-running an import cannot duplicate history.
pub trait Sink {
    fn add_trade(&mut self, trade: Trade);
    fn add_asset_movement(&mut self, movement: AssetMovement);
    fn add_margin_trade(&mut self, position: MarginPosition);
    fn add_history_events(&mut self, events: Vec<HistoryEvent>);
}

/// In-memory sink with natural-identity dedup, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    trades: Vec<Trade>,
    movements: Vec<AssetMovement>,
    margin_positions: Vec<MarginPosition>,
    history_events: Vec<HistoryEvent>,
    seen_trades: HashSet<String>,
    seen_movements: HashSet<String>,
    seen_margin_positions: HashSet<String>,
    seen_events: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn movements(&self) -> &[AssetMovement] {
        &self.movements
    }

    pub fn margin_positions(&self) -> &[MarginPosition] {
        &self.margin_positions
    }

    pub fn history_events(&self) -> &[HistoryEvent] {
        &self.history_events
    }

    /// Total canonical records held, across all four tables.
    pub fn record_count(&self) -> usize {
        self.trades.len()
            + self.movements.len()
            + self.margin_positions.len()
            + self.history_events.len()
    }
}

impl Sink for MemorySink {
    fn add_trade(&mut self, trade: Trade) {
        if self.seen_trades.insert(trade.identifier()) {
            self.trades.push(trade);
        } else {
            debug!("Dropping duplicate trade {}", trade.link);
        }
    }

    fn add_asset_movement(&mut self, movement: AssetMovement) {
        if self.seen_movements.insert(movement.identifier()) {
            self.movements.push(movement);
        } else {
            debug!("Dropping duplicate asset movement {}", movement.link);
        }
    }

    fn add_margin_trade(&mut self, position: MarginPosition) {
        if self.seen_margin_positions.insert(position.identifier()) {
            self.margin_positions.push(position);
        } else {
            debug!("Dropping duplicate margin position {}", position.link);
        }
    }

    fn add_history_events(&mut self, events: Vec<HistoryEvent>) {
        for event in events {
            if self.seen_events.insert(event.dedup_key()) {
                self.history_events.push(event);
            } else {
                debug!("Dropping duplicate history event {}", event.event_identifier);
            }
        }
    }
}
