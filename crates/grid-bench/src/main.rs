use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use gridmux::layout::{GridMetrics, GridRect, InteractionController, Point, ResizeEdge};
use gridmux::window::{CreateOptions, WindowId, WindowKind, WindowRegistry};
use ratatui::layout::Rect;
use tracing::Level;

/// Screen the bench pretends the grid is drawn on: 10x5 cells per grid unit.
const CONTAINER: Rect = Rect {
    x: 0,
    y: 0,
    width: 80,
    height: 40,
};

const EDGES: [ResizeEdge; 8] = [
    ResizeEdge::North,
    ResizeEdge::South,
    ResizeEdge::East,
    ResizeEdge::West,
    ResizeEdge::NorthEast,
    ResizeEdge::NorthWest,
    ResizeEdge::SouthEast,
    ResizeEdge::SouthWest,
];

#[derive(Parser, Debug)]
#[command(
    name = "grid-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Random create/drag/resize/minimize sequences against the window registry"
)]
struct BenchCli {
    /// Number of random operations to run.
    #[arg(short = 'n', long = "ops", default_value_t = 10_000)]
    ops: u64,

    /// Seed for the operation sequence; defaults to the clock.
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Upper bound on live windows.
    #[arg(short = 'w', long = "max-windows", default_value_t = 8)]
    max_windows: usize,

    /// Pointer moves per drag or resize gesture.
    #[arg(long = "steps", default_value_t = 6)]
    steps: u32,

    /// Log layout debug events to stderr.
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Op {
    Create,
    Drag,
    Resize,
    Minimize,
    Restore,
    Close,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Create => "create",
            Op::Drag => "drag",
            Op::Resize => "resize",
            Op::Minimize => "minimize",
            Op::Restore => "restore",
            Op::Close => "close",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct OpStats {
    count: u64,
    total: Duration,
    worst: Duration,
    notifications: u64,
}

impl OpStats {
    fn record(&mut self, elapsed: Duration, notifications: usize) {
        self.count += 1;
        self.total += elapsed;
        self.worst = self.worst.max(elapsed);
        self.notifications += notifications as u64;
    }

    fn average_us(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total.as_secs_f64() * 1_000_000.0 / self.count as f64
    }
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0xA5A5_A5A5_1234_5678,
        }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn below(&mut self, n: u32) -> u32 {
        if n == 0 { 0 } else { self.next() % n }
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.below(items.len() as u32) as usize])
    }
}

struct Bench {
    registry: WindowRegistry,
    controller: InteractionController,
    rng: Lcg,
    steps: u32,
    max_windows: usize,
    stats: BTreeMap<Op, OpStats>,
    overlap_violations: u64,
    bounds_violations: u64,
}

impl Bench {
    fn new(seed: u64, max_windows: usize, steps: u32) -> Self {
        Self {
            registry: WindowRegistry::new(),
            controller: InteractionController::new(GridMetrics::new(CONTAINER)),
            rng: Lcg::new(seed),
            steps: steps.max(1),
            max_windows: max_windows.max(1),
            stats: BTreeMap::new(),
            overlap_violations: 0,
            bounds_violations: 0,
        }
    }

    fn visible(&self) -> Vec<WindowId> {
        self.registry.draw_order()
    }

    fn choose_op(&mut self) -> Op {
        let live = self.registry.len();
        let visible = self.visible().len();
        let minimized = live - visible;
        loop {
            let op = match self.rng.below(100) {
                0..=19 => Op::Create,
                20..=49 => Op::Drag,
                50..=74 => Op::Resize,
                75..=84 => Op::Minimize,
                85..=92 => Op::Restore,
                _ => Op::Close,
            };
            let possible = match op {
                Op::Create => live < self.max_windows,
                Op::Drag | Op::Resize | Op::Minimize => visible > 0,
                Op::Restore => minimized > 0,
                Op::Close => live > 0,
            };
            if possible {
                return op;
            }
        }
    }

    fn random_point(&mut self) -> Point {
        Point::new(
            self.rng.below(CONTAINER.width as u32) as f64,
            self.rng.below(CONTAINER.height as u32) as f64,
        )
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::Create => {
                let options = if self.rng.below(2) == 0 {
                    CreateOptions::default()
                } else {
                    let rect = GridRect::new(
                        self.rng.below(8) as i32,
                        self.rng.below(8) as i32,
                        2 + self.rng.below(5) as i32,
                        2 + self.rng.below(5) as i32,
                    );
                    CreateOptions::at(rect)
                };
                self.registry.create(WindowKind::Terminal, options);
            }
            Op::Drag | Op::Resize => {
                let visible = self.visible();
                let Some(id) = self.rng.pick(&visible) else {
                    return;
                };
                let start = self.random_point();
                let started = if op == Op::Drag {
                    self.controller.begin_drag(&mut self.registry, id, start)
                } else {
                    let edge = self.rng.pick(&EDGES).unwrap_or(ResizeEdge::SouthEast);
                    self.controller
                        .begin_resize(&mut self.registry, id, edge, start)
                };
                if !started {
                    return;
                }
                for _ in 0..self.steps {
                    let pointer = self.random_point();
                    self.controller.pointer_move(&mut self.registry, pointer);
                }
                self.controller.end_gesture(&mut self.registry);
            }
            Op::Minimize => {
                let visible = self.visible();
                if let Some(id) = self.rng.pick(&visible) {
                    self.registry.minimize(id);
                }
            }
            Op::Restore => {
                if let Some(id) = self.registry.last_minimized() {
                    self.registry.restore(id);
                }
            }
            Op::Close => {
                let ids: Vec<WindowId> = self.registry.iter().map(|w| w.id()).collect();
                if let Some(id) = self.rng.pick(&ids) {
                    self.registry.close(id);
                }
            }
        }
    }

    fn check_invariants(&mut self, op: Op) {
        let overlaps = self.registry.overlapping_pairs();
        if !overlaps.is_empty() {
            self.overlap_violations += 1;
            tracing::warn!(%op, ?overlaps, "residual overlap");
        }
        for window in self.registry.iter() {
            if !window.rect().is_valid() {
                self.bounds_violations += 1;
                tracing::warn!(
                    %op,
                    window_id = %window.id(),
                    rect = %window.rect(),
                    "window out of bounds"
                );
            }
        }
    }

    fn run(&mut self, ops: u64) {
        for _ in 0..ops {
            let op = self.choose_op();
            let started = Instant::now();
            self.apply(op);
            let elapsed = started.elapsed();
            let notifications = self.registry.drain_events().len();
            self.stats.entry(op).or_default().record(elapsed, notifications);
            self.check_invariants(op);
        }
    }

    fn report(&self, seed: u64, wall: Duration) -> String {
        let mut rows = String::new();
        for (op, stats) in &self.stats {
            rows.push_str(&format!(
                "  {op:<9} {count:>8} ops | avg {avg:>8.2} us | worst {worst:>8.2} us | {notes:>8} notifications\n",
                count = stats.count,
                avg = stats.average_us(),
                worst = stats.worst.as_secs_f64() * 1_000_000.0,
                notes = stats.notifications,
            ));
        }
        let total: u64 = self.stats.values().map(|s| s.count).sum();
        indoc::formatdoc!(
            r#"
            Grid bench (seed {seed}).
            Operations: {total} in {wall:.3}s
            {rows}Residual overlaps: {overlaps} | Out of bounds: {bounds}
            "#,
            seed = seed,
            total = total,
            wall = wall.as_secs_f64(),
            rows = rows,
            overlaps = self.overlap_violations,
            bounds = self.bounds_violations,
        )
    }
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn main() {
    let args = BenchCli::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let seed = args.seed.unwrap_or_else(seed_from_clock);
    let mut bench = Bench::new(seed, args.max_windows, args.steps);
    let started = Instant::now();
    bench.run(args.ops);
    print!("{}", bench.report(seed, started.elapsed()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_gives_same_layout() {
        let mut a = Bench::new(42, 6, 4);
        let mut b = Bench::new(42, 6, 4);
        a.run(300);
        b.run(300);
        let rects = |bench: &Bench| {
            bench
                .registry
                .iter()
                .map(|w| (w.id(), w.rect(), w.minimized()))
                .collect::<Vec<_>>()
        };
        assert_eq!(rects(&a), rects(&b));
    }

    #[test]
    fn random_runs_stay_in_bounds_and_respect_the_cap() {
        let mut bench = Bench::new(7, 5, 3);
        bench.run(500);
        assert_eq!(bench.bounds_violations, 0);
        assert!(bench.registry.len() <= 5);
        assert_eq!(bench.stats.values().map(|s| s.count).sum::<u64>(), 500);
    }
}
