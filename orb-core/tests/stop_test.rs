//! Integration tests for break-even and trailing stops over price paths.
//!
//! Tests:
//! 1. Ratchet property: committed stops never move against the position.
//! 2. Break-even is committed once.
//! 3. Trailing respects the step size and the distance behind the best price.

use chrono::NaiveDate;
use orb_core::components::pm::*;
use orb_core::domain::{Direction, Position, Ticket};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const RANGE_SIZE: f64 = 10.0;

fn make_position(direction: Direction) -> Position {
    let (stop, target) = match direction {
        Direction::Long => (90.0, 130.0),
        Direction::Short => (110.0, 70.0),
    };
    Position {
        ticket: Ticket(1),
        direction,
        volume: 1.0,
        entry_price: 100.0,
        stop_price: stop,
        target_price: target,
        opened_at: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(10, 5, 0).unwrap(),
    }
}

/// Drive the manager the way the engine does, committing every proposal.
/// Returns the stop after each price and the committed proposals.
fn run_path(
    pm: &StopManager,
    direction: Direction,
    prices: &[f64],
) -> (Vec<f64>, Vec<StopProposal>) {
    let mut pos = make_position(direction);
    let mut state = TrailingState::new(&pos);
    let mut stops = Vec::new();
    let mut committed = Vec::new();
    for &price in prices {
        if let Some(p) = pm.on_price(&mut state, &pos, price, RANGE_SIZE) {
            pm.commit(&mut state, &mut pos, &p);
            committed.push(p);
        }
        stops.push(pos.stop_price);
    }
    (stops, committed)
}

fn assert_ratchet(direction: Direction, stops: &[f64]) {
    for w in stops.windows(2) {
        match direction {
            Direction::Long => assert!(w[1] >= w[0], "long stop loosened: {} -> {}", w[0], w[1]),
            Direction::Short => assert!(w[1] <= w[0], "short stop loosened: {} -> {}", w[0], w[1]),
        }
    }
}

fn zigzag(start: f64, drift: f64, swing: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| start + drift * i as f64 + if i % 2 == 0 { swing } else { -swing })
        .collect()
}

// ──────────────────────────────────────────────
// Ratchet property
// ──────────────────────────────────────────────

#[test]
fn long_ratchet_over_zigzag() {
    let pm = StopManager::new(StopConfig::default());
    let (stops, _) = run_path(&pm, Direction::Long, &zigzag(100.0, 0.8, 3.0, 60));
    assert_ratchet(Direction::Long, &stops);
    assert!(*stops.last().unwrap() > 100.0);
}

#[test]
fn short_ratchet_over_zigzag() {
    let pm = StopManager::new(StopConfig::default());
    let (stops, _) = run_path(&pm, Direction::Short, &zigzag(100.0, -0.8, 3.0, 60));
    assert_ratchet(Direction::Short, &stops);
    assert!(*stops.last().unwrap() < 100.0);
}

#[test]
fn v_shape_never_loosens() {
    let pm = StopManager::new(StopConfig::default());
    let mut path: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    path.extend((0..30).map(|i| 119.0 - i as f64));
    let (stops, _) = run_path(&pm, Direction::Long, &path);
    assert_ratchet(Direction::Long, &stops);
    // Best 119, trailing 5 behind
    assert!((stops.last().unwrap() - 114.0).abs() < 1e-9);
}

// ──────────────────────────────────────────────
// Behavioral contracts
// ──────────────────────────────────────────────

#[test]
fn breakeven_committed_once() {
    let pm = StopManager::new(StopConfig {
        trailing_distance_fraction: 0.0,
        ..StopConfig::default()
    });
    let (stops, committed) = run_path(&pm, Direction::Long, &[101.0, 105.0, 106.0, 104.0, 108.0, 103.0]);
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].reason, StopReason::Breakeven);
    assert_eq!(stops, vec![90.0, 100.0, 100.0, 100.0, 100.0, 100.0]);
}

#[test]
fn trailing_moves_in_steps() {
    let pm = StopManager::new(StopConfig {
        breakeven_trigger_fraction: 0.0,
        trailing_start_fraction: 1.0,
        trailing_distance_fraction: 0.5,
        trailing_step_fraction: 0.2,
    });
    // Trailing starts at +10; then every 2.0 of new high moves the stop.
    let (stops, committed) =
        run_path(&pm, Direction::Long, &[110.0, 111.0, 112.0, 113.0, 114.5, 116.0]);
    assert!(committed.iter().all(|p| p.reason == StopReason::Trail));
    assert_eq!(stops, vec![105.0, 105.0, 107.0, 107.0, 109.5, 109.5]);
}

#[test]
fn losing_position_is_left_alone() {
    let pm = StopManager::new(StopConfig::default());
    let (stops, committed) = run_path(&pm, Direction::Short, &[101.0, 104.0, 108.0, 109.5]);
    assert!(committed.is_empty());
    assert!(stops.iter().all(|&s| s == 110.0));
}
