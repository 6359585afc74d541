//! Providers of synthetic log content.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::streaming::line::{LogLevel, LogLine};

/// Messages the random source picks from.
pub const MESSAGES: [&str; 7] = [
    "User logged in",
    "Database connection established",
    "Payment processed successfully",
    "API request timeout",
    "New order placed",
    "Cache refreshed",
    "User authentication failed",
];

/// Supplies the next line of a stream.
pub trait LineSource: Send + 'static {
    fn next_line(&mut self) -> LogLine;
}

/// Builds a fresh source for every stream session.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn LineSource> + Send + Sync>;

/// Level and message drawn independently and uniformly.
pub struct RandomLineSource {
    rng: StdRng,
}

impl RandomLineSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn factory() -> SourceFactory {
        Arc::new(|| Box::new(RandomLineSource::new()) as Box<dyn LineSource>)
    }
}

impl Default for RandomLineSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for RandomLineSource {
    fn next_line(&mut self) -> LogLine {
        let level = LogLevel::ALL[self.rng.gen_range(0..LogLevel::ALL.len())];
        let message = MESSAGES[self.rng.gen_range(0..MESSAGES.len())];
        LogLine::now(level, message)
    }
}

/// Replays a fixed list of entries in order, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    entries: Vec<(LogLevel, String)>,
    position: usize,
}

impl ScriptedSource {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (LogLevel, S)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(l, m)| (l, m.into())).collect(),
            position: 0,
        }
    }

    pub fn factory(self) -> SourceFactory {
        Arc::new(move || Box::new(self.clone()) as Box<dyn LineSource>)
    }
}

impl LineSource for ScriptedSource {
    fn next_line(&mut self) -> LogLine {
        let Some((level, message)) = self.entries.get(self.position % self.entries.len().max(1))
        else {
            return LogLine::now(LogLevel::Debug, "");
        };
        self.position += 1;
        LogLine::now(*level, message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_source_draws_from_fixed_sets() {
        let mut source = RandomLineSource::seeded(7);
        let mut levels = HashSet::new();
        for _ in 0..200 {
            let line = source.next_line();
            assert!(MESSAGES.contains(&line.message.as_str()));
            levels.insert(line.level);
        }
        assert_eq!(levels.len(), LogLevel::ALL.len());
    }

    #[test]
    fn test_seeded_sources_repeat() {
        let mut a = RandomLineSource::seeded(42);
        let mut b = RandomLineSource::seeded(42);
        for _ in 0..20 {
            let (x, y) = (a.next_line(), b.next_line());
            assert_eq!((x.level, x.message), (y.level, y.message));
        }
    }

    #[test]
    fn test_scripted_source_wraps() {
        let mut source = ScriptedSource::new([(LogLevel::Error, "a"), (LogLevel::Info, "b")]);
        let got: Vec<_> = (0..3).map(|_| source.next_line().message).collect();
        assert_eq!(got, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_factory_builds_independent_sources() {
        let factory = ScriptedSource::new([(LogLevel::Info, "x"), (LogLevel::Info, "y")]).factory();
        let mut first = factory();
        first.next_line();
        let mut second = factory();
        assert_eq!(second.next_line().message, "x");
    }
}
