//! Criterion benchmarks for ORB hot paths.
//!
//! Benchmarks:
//! 1. Per-tick engine loop over synthetic minute bars
//! 2. Session clock lookup
//! 3. Trend vote and breakout confirmation
//! 4. Stop manager over a rising price path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use orb_core::broker::{BarHistory, MarketSnapshot, PaperBroker};
use orb_core::components::breakout::BreakoutInput;
use orb_core::components::*;
use orb_core::domain::{Bar, Direction, Position, Ticket};
use orb_core::indicators::Atr;
use orb_core::session::{SessionClock, SessionConfig, WeekdayCalendar};
use orb_core::synthetic::{random_walk_bars, SyntheticConfig};
use orb_core::{EngineConfig, SessionEngine};

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn make_bars(minutes: usize) -> Vec<Bar> {
    random_walk_bars(&SyntheticConfig::new(t0(), minutes), 42)
}

fn bench_config() -> EngineConfig {
    let mut config = EngineConfig::for_symbol("US30");
    config.instrument.point = 0.01;
    config.breakout.min_angle_degrees = 0.0;
    config
}

fn replay(bars: &[Bar]) -> usize {
    let mut engine = SessionEngine::orb(bench_config()).unwrap();
    let mut history = BarHistory::new();
    let mut broker = PaperBroker::new(100_000.0);
    let mut atr = Atr::new(14);
    let mut reported = 0;
    for bar in bars {
        history.push(*bar);
        let now = bar.time + Duration::minutes(1);
        broker.set_quote(now, bar.close - 0.01, bar.close + 0.01);
        let mut snapshot = MarketSnapshot::new(bar.close - 0.01, bar.close + 0.01);
        if let Some(v) = atr.update(bar) {
            snapshot = snapshot.with_volatility(v);
        }
        if let Ok(eval) = engine.evaluate(now, &snapshot, &history, &mut broker) {
            if !eval.is_quiet() {
                reported += 1;
            }
        }
    }
    reported
}

// ── 1. Engine Loop ───────────────────────────────────────────────────

fn bench_engine_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_loop");

    for &days in &[1usize, 5, 20] {
        let bars = make_bars(days * 24 * 60);
        group.bench_with_input(BenchmarkId::new("days", days), &bars, |b, bars| {
            b.iter(|| replay(black_box(bars)));
        });
    }

    group.finish();
}

// ── 2. Session Clock ─────────────────────────────────────────────────

fn bench_session_clock(c: &mut Criterion) {
    let clock = SessionClock::new(&SessionConfig { venue_offset_hours: 7, ..Default::default() })
        .unwrap();
    let times: Vec<NaiveDateTime> = (0..1440).map(|m| t0() + Duration::minutes(m)).collect();

    c.bench_function("session_at_one_day", |b| {
        b.iter(|| {
            for &t in &times {
                black_box(clock.session_at(black_box(t), &WeekdayCalendar).unwrap());
            }
        });
    });
}

// ── 3. Breakout Confirmation ─────────────────────────────────────────

fn bench_breakout(c: &mut Criterion) {
    let range = OpeningRange::new(110.0, 100.0);
    let closes: Vec<f64> = (0..20).map(|i| 112.0 - i as f64 * 0.5).collect();
    let trend = TrendConfig::default();
    let config = BreakoutConfig { buffer_fraction: 0.1, min_angle_degrees: 0.0 };

    c.bench_function("breakout_evaluate", |b| {
        b.iter(|| {
            let mut detector = BreakoutDetector::new(&config, &trend);
            black_box(detector.evaluate(&BreakoutInput {
                now: t0(),
                price: black_box(112.5),
                last_close: 112.0,
                range: &range,
                closes: &closes,
            }))
        });
    });
}

// ── 4. Stop Manager ──────────────────────────────────────────────────

fn bench_stop_manager(c: &mut Criterion) {
    let pm = StopManager::new(StopConfig::default());
    let prices: Vec<f64> = (0..1_000).map(|i| 100.0 + (i as f64 * 0.05)).collect();
    let start = Position {
        ticket: Ticket(1),
        direction: Direction::Long,
        volume: 1.0,
        entry_price: 100.0,
        stop_price: 90.0,
        target_price: 200.0,
        opened_at: t0(),
    };

    c.bench_function("stop_manager_1000_ticks", |b| {
        b.iter(|| {
            let mut position = start.clone();
            let mut state = TrailingState::new(&position);
            for &price in &prices {
                if let Some(p) = pm.on_price(&mut state, &position, price, 10.0) {
                    pm.commit(&mut state, &mut position, &p);
                }
            }
            black_box(position.stop_price)
        });
    });
}

criterion_group!(
    benches,
    bench_engine_loop,
    bench_session_clock,
    bench_breakout,
    bench_stop_manager,
);
criterion_main!(benches);
