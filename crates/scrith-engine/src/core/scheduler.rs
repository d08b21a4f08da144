use super::signal::Signal;
use super::task::{Phase, TaskGraph};

/// Drives a [`TaskGraph`] through Init, Runtime and Destroy.
///
/// - Init runs once; a `Quit`/`Error` skips its remaining blocks and the whole Runtime.
/// - Runtime loops over its blocks until one resolves to `Quit` or `Error`. A `Pause`
///   abandons the rest of the iteration and restarts from the first block.
/// - Destroy runs every block exactly once, whatever happened before.
///
/// The returned signal is the outcome of Init/Runtime; Destroy failures are logged
/// but do not change it.
pub struct Scheduler<C> {
    graph: TaskGraph<C>,
    iterations: u64,
}

impl<C> Scheduler<C> {
    pub fn new(graph: TaskGraph<C>) -> Self {
        Self {
            graph,
            iterations: 0,
        }
    }

    /// Number of Runtime iterations started so far (paused ones included).
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn run(&mut self, ctx: &mut C) -> Signal {
        log::info!("scheduler: init");
        let mut outcome = self.run_once(Phase::Init, ctx);

        if outcome.is_terminal() {
            log::warn!("scheduler: init ended with {outcome:?}; skipping runtime");
        } else {
            log::info!("scheduler: runtime");
            outcome = self.run_loop(ctx);
        }

        log::info!("scheduler: destroy ({outcome:?})");
        let destroy = self.run_once(Phase::Destroy, ctx);
        if destroy == Signal::Error {
            log::error!("scheduler: destroy phase reported an error");
        }

        outcome
    }

    fn run_once(&mut self, phase: Phase, ctx: &mut C) -> Signal {
        let mut signal = Signal::Forward;

        for (i, block) in self.graph.blocks_mut(phase).iter_mut().enumerate() {
            if phase != Phase::Destroy && signal.is_terminal() {
                log::debug!("{phase}: skipping block {i}");
                continue;
            }

            let s = block.run(ctx);
            log::trace!("{phase}: block {i} -> {s:?}");

            if s == Signal::Pause {
                // A run-once phase has no iteration to restart.
                log::debug!("{phase}: pause in block {i} treated as forward");
                continue;
            }
            signal = signal.combine(s);
        }

        signal
    }

    fn run_loop(&mut self, ctx: &mut C) -> Signal {
        if self.graph.blocks(Phase::Runtime).is_empty() {
            log::warn!("runtime: no blocks scheduled");
            return Signal::Forward;
        }

        loop {
            self.iterations += 1;

            for (i, block) in self.graph.blocks_mut(Phase::Runtime).iter_mut().enumerate() {
                match block.run(ctx) {
                    Signal::Forward => {}
                    Signal::Pause => {
                        log::trace!("runtime: pause in block {i}, restarting iteration");
                        break;
                    }
                    terminal => {
                        log::debug!(
                            "runtime: block {i} -> {terminal:?} after {} iterations",
                            self.iterations
                        );
                        return terminal;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Block, Task};

    #[derive(Default)]
    struct Counters {
        trace: Vec<&'static str>,
        c_runs: u32,
    }

    fn tag(name: &'static str) -> Task<Counters> {
        Task::new(name, move |c: &mut Counters| {
            c.trace.push(name);
            Signal::Forward
        })
    }

    fn count(c: &Counters, name: &str) -> usize {
        c.trace.iter().filter(|t| **t == name).count()
    }

    // ── phase ordering ────────────────────────────────────────────────────

    #[test]
    fn quit_on_third_iteration_runs_destroy_once() {
        let c_task = Task::new("C", |c: &mut Counters| {
            c.trace.push("C");
            c.c_runs += 1;
            if c.c_runs == 3 { Signal::Quit } else { Signal::Forward }
        });

        let graph = TaskGraph::new()
            .block(Phase::Init, tag("A"))
            .block(Phase::Init, tag("B"))
            .block(Phase::Runtime, c_task)
            .block(Phase::Runtime, tag("D"))
            .block(Phase::Destroy, tag("E"));

        let mut ctx = Counters::default();
        let mut sched = Scheduler::new(graph);
        let outcome = sched.run(&mut ctx);

        assert_eq!(outcome, Signal::Quit);
        assert_eq!(count(&ctx, "A"), 1);
        assert_eq!(count(&ctx, "B"), 1);
        assert_eq!(count(&ctx, "C"), 3);
        assert_eq!(count(&ctx, "D"), 2);
        assert_eq!(count(&ctx, "E"), 1);
        assert_eq!(ctx.trace.first(), Some(&"A"));
        assert_eq!(ctx.trace.last(), Some(&"E"));
        assert_eq!(sched.iterations(), 3);
    }

    #[test]
    fn init_error_skips_runtime_but_not_destroy() {
        let graph = TaskGraph::new()
            .block(Phase::Init, Task::new("fail", |_: &mut Counters| Signal::Error))
            .block(Phase::Init, tag("after-fail"))
            .block(Phase::Runtime, tag("loop"))
            .block(Phase::Destroy, tag("release-1"))
            .block(Phase::Destroy, tag("release-2"));

        let mut ctx = Counters::default();
        let outcome = Scheduler::new(graph).run(&mut ctx);

        assert_eq!(outcome, Signal::Error);
        assert_eq!(ctx.trace, vec!["release-1", "release-2"]);
    }

    #[test]
    fn destroy_runs_all_blocks_even_after_errors() {
        let graph = TaskGraph::new()
            .block(Phase::Runtime, Task::new("quit", |_: &mut Counters| Signal::Quit))
            .block(Phase::Destroy, Task::new("bad", |c: &mut Counters| {
                c.trace.push("bad");
                Signal::Error
            }))
            .block(Phase::Destroy, tag("release"));

        let mut ctx = Counters::default();
        let outcome = Scheduler::new(graph).run(&mut ctx);

        // Destroy failures do not turn a graceful quit into an error.
        assert_eq!(outcome, Signal::Quit);
        assert_eq!(ctx.trace, vec!["bad", "release"]);
    }

    // ── pause ─────────────────────────────────────────────────────────────

    #[test]
    fn pause_restarts_iteration_from_first_block() {
        // Pump pauses twice before letting the frame block through.
        let pump = Task::new("pump", |c: &mut Counters| {
            c.trace.push("pump");
            c.c_runs += 1;
            if c.c_runs <= 2 { Signal::Pause } else { Signal::Forward }
        });
        let frame = Task::new("frame", |c: &mut Counters| {
            c.trace.push("frame");
            Signal::Quit
        });

        let graph = TaskGraph::new()
            .block(Phase::Runtime, tag("update"))
            .block(Phase::Runtime, pump)
            .block(Phase::Runtime, frame);

        let mut ctx = Counters::default();
        let mut sched = Scheduler::new(graph);
        assert_eq!(sched.run(&mut ctx), Signal::Quit);

        assert_eq!(
            ctx.trace,
            vec!["update", "pump", "update", "pump", "update", "pump", "frame"]
        );
        assert_eq!(sched.iterations(), 3);
    }

    #[test]
    fn pause_in_init_is_forward() {
        let graph = TaskGraph::new()
            .block(Phase::Init, Task::new("p", |_: &mut Counters| Signal::Pause))
            .block(Phase::Init, tag("next"))
            .block(Phase::Runtime, Task::new("q", |_: &mut Counters| Signal::Quit));

        let mut ctx = Counters::default();
        assert_eq!(Scheduler::new(graph).run(&mut ctx), Signal::Quit);
        assert_eq!(ctx.trace, vec!["next"]);
    }

    // ── block aggregation ─────────────────────────────────────────────────

    #[test]
    fn error_and_pause_in_one_block_resolves_to_error() {
        let block = Block::new()
            .with(Task::new("pause", |_: &mut Counters| Signal::Pause))
            .with(Task::new("err", |_: &mut Counters| Signal::Error));
        let graph = TaskGraph::new()
            .block(Phase::Runtime, block)
            .block(Phase::Destroy, tag("release"));

        let mut ctx = Counters::default();
        assert_eq!(Scheduler::new(graph).run(&mut ctx), Signal::Error);
        assert_eq!(ctx.trace, vec!["release"]);
    }

    #[test]
    fn empty_runtime_goes_straight_to_destroy() {
        let graph = TaskGraph::new().block(Phase::Destroy, tag("release"));
        let mut ctx = Counters::default();
        assert_eq!(Scheduler::new(graph).run(&mut ctx), Signal::Forward);
        assert_eq!(ctx.trace, vec!["release"]);
    }
}
