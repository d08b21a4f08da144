/// Control directive returned by a task.
///
/// Variants are ordered by precedence, so the outcome of a block is the
/// maximum over its tasks: `Error > Quit > Pause > Forward`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub enum Signal {
    /// Keep going with the next block.
    #[default]
    Forward,
    /// Abandon the rest of the current Runtime iteration and start over.
    Pause,
    /// Graceful shutdown: skip to Destroy.
    Quit,
    /// Abnormal shutdown: skip to Destroy and report failure.
    Error,
}

impl Signal {
    /// Merges two outcomes, keeping the one with higher precedence.
    pub fn combine(self, other: Signal) -> Signal {
        self.max(other)
    }

    /// Returns `true` for `Quit` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Signal::Quit | Signal::Error)
    }

    /// Folds any number of outcomes; an empty set resolves to `Forward`.
    pub fn resolve<I>(signals: I) -> Signal
    where
        I: IntoIterator<Item = Signal>,
    {
        signals.into_iter().fold(Signal::Forward, Signal::combine)
    }
}

impl From<anyhow::Result<()>> for Signal {
    fn from(r: anyhow::Result<()>) -> Self {
        match r {
            Ok(()) => Signal::Forward,
            Err(e) => {
                log::error!("{e:#}");
                Signal::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── precedence ────────────────────────────────────────────────────────

    #[test]
    fn error_beats_pause() {
        assert_eq!(Signal::resolve([Signal::Error, Signal::Pause]), Signal::Error);
        assert_eq!(Signal::resolve([Signal::Pause, Signal::Error]), Signal::Error);
    }

    #[test]
    fn quit_beats_pause_and_forward() {
        assert_eq!(
            Signal::resolve([Signal::Forward, Signal::Quit, Signal::Pause]),
            Signal::Quit
        );
    }

    #[test]
    fn error_beats_quit() {
        assert_eq!(Signal::Quit.combine(Signal::Error), Signal::Error);
    }

    #[test]
    fn empty_block_is_forward() {
        assert_eq!(Signal::resolve(std::iter::empty()), Signal::Forward);
    }

    // ── conversions ───────────────────────────────────────────────────────

    #[test]
    fn result_maps_to_forward_or_error() {
        assert_eq!(Signal::from(Ok(())), Signal::Forward);
        assert_eq!(Signal::from(Err(anyhow::anyhow!("boom"))), Signal::Error);
    }

    #[test]
    fn terminal_signals() {
        assert!(Signal::Quit.is_terminal());
        assert!(Signal::Error.is_terminal());
        assert!(!Signal::Pause.is_terminal());
        assert!(!Signal::Forward.is_terminal());
    }
}
