use std::time::{Duration, Instant};

/// State of one top-level schema build.
#[derive(Debug)]
pub struct BuildContext {
    /// Profiles currently being expanded, outermost first.
    visiting: Vec<String>,
    max_depth: usize,
    /// Number of expansions cut short by a cycle or the depth bound.
    truncations: usize,
    pub stats: BuildStats,
    start_time: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub elements_processed: usize,
    pub elements_skipped: usize,
    pub slices_processed: usize,
    pub choice_types_resolved: usize,
    pub types_expanded: usize,
    pub cache_hits: usize,
    pub build_duration: Option<Duration>,
}

impl BuildContext {
    pub fn new(max_depth: usize) -> Self {
        Self {
            visiting: Vec::new(),
            max_depth,
            truncations: 0,
            stats: BuildStats::default(),
            start_time: Instant::now(),
        }
    }

    /// Enters a profile. Returns `false`, and records a truncation, when the
    /// profile is already being expanded or the depth bound is reached.
    pub fn enter(&mut self, profile: &str) -> bool {
        if self.visiting.iter().any(|visited| visited == profile) {
            tracing::debug!("Cyclic expansion of {} cut at depth {}", profile, self.depth());
            self.truncations += 1;
            return false;
        }
        if self.depth() >= self.max_depth {
            tracing::warn!(
                "Expansion of {} exceeds max depth {}, leaving it unexpanded",
                profile,
                self.max_depth
            );
            self.truncations += 1;
            return false;
        }
        self.visiting.push(profile.to_string());
        true
    }

    pub fn leave(&mut self) {
        self.visiting.pop();
    }

    pub fn depth(&self) -> usize {
        self.visiting.len()
    }

    pub fn truncations(&self) -> usize {
        self.truncations
    }

    pub fn finish(&mut self) -> &BuildStats {
        self.stats.build_duration = Some(self.start_time.elapsed());
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_rejects_cycles() {
        let mut context = BuildContext::new(8);
        assert!(context.enter("a"));
        assert!(context.enter("b"));
        assert!(!context.enter("a"));
        assert_eq!(context.truncations(), 1);
        context.leave();
        assert_eq!(context.depth(), 1);
    }

    #[test]
    fn test_enter_respects_depth_bound() {
        let mut context = BuildContext::new(2);
        assert!(context.enter("a"));
        assert!(context.enter("b"));
        assert!(!context.enter("c"));
        assert_eq!(context.depth(), 2);
    }
}
