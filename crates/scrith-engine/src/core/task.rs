use std::fmt;

use super::signal::Signal;

/// Lifecycle phase a block belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Phase {
    /// Runs once before the loop.
    Init,
    /// Repeats until a block quits or errors.
    Runtime,
    /// Runs once, regardless of how the earlier phases ended.
    Destroy,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::Runtime => "runtime",
            Phase::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

type TaskFn<C> = Box<dyn FnMut(&mut C) -> Signal>;

/// A named unit of work operating on the shared context `C`.
pub struct Task<C> {
    name: String,
    run: TaskFn<C>,
}

impl<C> Task<C> {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut C) -> Signal + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&mut self, ctx: &mut C) -> Signal {
        (self.run)(ctx)
    }
}

impl<C> fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

/// An unordered group of tasks joined before the next block starts.
///
/// Tasks share `&mut C`, so they execute one after another in insertion order.
/// Every task runs even when an earlier one reports an error; the block result
/// is the highest-precedence signal among them.
#[derive(Debug)]
pub struct Block<C> {
    tasks: Vec<Task<C>>,
}

impl<C> Block<C> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn with(mut self, task: Task<C>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn push(&mut self, task: Task<C>) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(Task::name)
    }

    /// Runs every task and resolves their signals.
    pub fn run(&mut self, ctx: &mut C) -> Signal {
        let mut signal = Signal::Forward;
        for task in &mut self.tasks {
            let s = task.run(ctx);
            if s != Signal::Forward {
                log::trace!("task `{}` -> {s:?}", task.name);
            }
            signal = signal.combine(s);
        }
        signal
    }
}

impl<C> Default for Block<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> From<Task<C>> for Block<C> {
    fn from(task: Task<C>) -> Self {
        Block::new().with(task)
    }
}

/// The three ordered block lists driving an application.
///
/// Built once by concatenating layer contributions and never mutated while
/// the scheduler runs.
#[derive(Debug)]
pub struct TaskGraph<C> {
    init: Vec<Block<C>>,
    runtime: Vec<Block<C>>,
    destroy: Vec<Block<C>>,
}

impl<C> TaskGraph<C> {
    pub fn new() -> Self {
        Self {
            init: Vec::new(),
            runtime: Vec::new(),
            destroy: Vec::new(),
        }
    }

    /// Appends a block to the given phase.
    pub fn block(mut self, phase: Phase, block: impl Into<Block<C>>) -> Self {
        self.blocks_mut(phase).push(block.into());
        self
    }

    /// Appends every block of `layer` after the blocks already present, phase by phase.
    pub fn then(mut self, layer: TaskGraph<C>) -> Self {
        self.init.extend(layer.init);
        self.runtime.extend(layer.runtime);
        self.destroy.extend(layer.destroy);
        self
    }

    /// Adds `task` to the first block of `phase`, opening one if the phase is empty.
    pub fn join_front(mut self, phase: Phase, task: Task<C>) -> Self {
        let blocks = self.blocks_mut(phase);
        match blocks.first_mut() {
            Some(first) => first.push(task),
            None => blocks.push(Block::from(task)),
        }
        self
    }

    pub fn blocks(&self, phase: Phase) -> &[Block<C>] {
        match phase {
            Phase::Init => &self.init,
            Phase::Runtime => &self.runtime,
            Phase::Destroy => &self.destroy,
        }
    }

    pub(crate) fn blocks_mut(&mut self, phase: Phase) -> &mut Vec<Block<C>> {
        match phase {
            Phase::Init => &mut self.init,
            Phase::Runtime => &mut self.runtime,
            Phase::Destroy => &mut self.destroy,
        }
    }
}

impl<C> Default for TaskGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<&'static str>);

    fn push(tag: &'static str, s: Signal) -> Task<Log> {
        Task::new(tag, move |log: &mut Log| {
            log.0.push(tag);
            s
        })
    }

    // ── block ─────────────────────────────────────────────────────────────

    #[test]
    fn block_runs_every_task_after_error() {
        let mut block = Block::new()
            .with(push("a", Signal::Error))
            .with(push("b", Signal::Forward));
        let mut log = Log::default();

        assert_eq!(block.run(&mut log), Signal::Error);
        assert_eq!(log.0, vec!["a", "b"]);
    }

    #[test]
    fn block_resolves_error_over_pause() {
        let mut block = Block::new()
            .with(push("a", Signal::Pause))
            .with(push("b", Signal::Error));
        assert_eq!(block.run(&mut Log::default()), Signal::Error);
    }

    // ── graph ─────────────────────────────────────────────────────────────

    #[test]
    fn then_concatenates_layers_in_order() {
        let platform = TaskGraph::new()
            .block(Phase::Init, push("os", Signal::Forward))
            .block(Phase::Destroy, push("os-release", Signal::Forward));
        let graphics = TaskGraph::new()
            .block(Phase::Init, push("gx", Signal::Forward))
            .block(Phase::Destroy, push("gx-release", Signal::Forward));

        let graph = platform.then(graphics);

        let init: Vec<_> = graph
            .blocks(Phase::Init)
            .iter()
            .flat_map(|b| b.task_names())
            .collect();
        assert_eq!(init, vec!["os", "gx"]);
        assert_eq!(graph.blocks(Phase::Destroy).len(), 2);
        assert!(graph.blocks(Phase::Runtime).is_empty());
    }

    #[test]
    fn join_front_extends_first_block() {
        let graph = TaskGraph::new()
            .block(Phase::Runtime, push("pump", Signal::Forward))
            .block(Phase::Runtime, push("draw", Signal::Forward))
            .join_front(Phase::Runtime, push("update", Signal::Forward));

        let runtime = graph.blocks(Phase::Runtime);
        assert_eq!(runtime.len(), 2);
        assert_eq!(runtime[0].task_names().collect::<Vec<_>>(), vec!["pump", "update"]);
        assert_eq!(runtime[1].task_names().collect::<Vec<_>>(), vec!["draw"]);
    }

    #[test]
    fn join_front_opens_block_in_empty_phase() {
        let graph = TaskGraph::new().join_front(Phase::Init, push("only", Signal::Forward));
        assert_eq!(graph.blocks(Phase::Init).len(), 1);
    }
}
