use std::sync::Mutex;

#[derive(Debug, Default)]
struct Counters {
    analyses: u32,
    comments: u32,
}

/// Per-run ceilings on analyzed issues and posted comments.
///
/// Check-and-increment is one step under the lock so two workers can never
/// both pass a check that should only admit one. Counters never reset
/// mid-run, and a reserved analysis slot stays spent even when the analysis
/// call later fails.
#[derive(Debug)]
pub struct RunBudget {
    max_analyses: u32,
    max_comments: u32,
    counters: Mutex<Counters>,
}

/// Counter snapshot for the end-of-run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetUsage {
    pub issues_analyzed: u32,
    pub comments_posted: u32,
}

impl RunBudget {
    pub fn new(max_analyses: u32, max_comments: u32) -> Self {
        Self {
            max_analyses,
            max_comments,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Reserve one analysis slot. True means the caller may proceed and the
    /// counter has already been incremented.
    pub fn try_reserve_analysis(&self) -> bool {
        let mut counters = self.counters.lock().expect("budget lock poisoned");
        if counters.analyses >= self.max_analyses {
            return false;
        }
        counters.analyses += 1;
        true
    }

    /// Reserve one comment slot, same contract as analysis reservation.
    pub fn try_reserve_comment(&self) -> bool {
        let mut counters = self.counters.lock().expect("budget lock poisoned");
        if counters.comments >= self.max_comments {
            return false;
        }
        counters.comments += 1;
        true
    }

    /// Whether the analysis ceiling has been reached; used for early
    /// termination between issues and repositories.
    pub fn analyses_exhausted(&self) -> bool {
        let counters = self.counters.lock().expect("budget lock poisoned");
        counters.analyses >= self.max_analyses
    }

    pub fn comments_exhausted(&self) -> bool {
        let counters = self.counters.lock().expect("budget lock poisoned");
        counters.comments >= self.max_comments
    }

    pub fn usage(&self) -> BudgetUsage {
        let counters = self.counters.lock().expect("budget lock poisoned");
        BudgetUsage {
            issues_analyzed: counters.analyses,
            comments_posted: counters.comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_analysis_ceiling_of_two() {
        let budget = RunBudget::new(2, 10);
        assert!(budget.try_reserve_analysis());
        assert!(budget.try_reserve_analysis());
        assert!(!budget.try_reserve_analysis());
    }

    #[test]
    fn test_exhausted_never_resets() {
        let budget = RunBudget::new(1, 1);
        assert!(budget.try_reserve_analysis());
        assert!(!budget.try_reserve_analysis());
        assert!(!budget.try_reserve_analysis());
        assert!(budget.analyses_exhausted());
    }

    #[test]
    fn test_comment_ceiling_independent_of_analyses() {
        let budget = RunBudget::new(10, 1);
        assert!(budget.try_reserve_analysis());
        assert!(budget.try_reserve_comment());
        assert!(!budget.try_reserve_comment());
        assert!(budget.comments_exhausted());
        assert!(!budget.analyses_exhausted());
    }

    #[test]
    fn test_usage_snapshot() {
        let budget = RunBudget::new(5, 5);
        budget.try_reserve_analysis();
        budget.try_reserve_analysis();
        budget.try_reserve_comment();
        assert_eq!(
            budget.usage(),
            BudgetUsage {
                issues_analyzed: 2,
                comments_posted: 1,
            }
        );
    }

    #[test]
    fn test_concurrent_reservations_never_overrun() {
        let budget = Arc::new(RunBudget::new(50, 50));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let budget = Arc::clone(&budget);
            handles.push(thread::spawn(move || {
                let mut granted = 0u32;
                for _ in 0..20 {
                    if budget.try_reserve_analysis() {
                        granted += 1;
                    }
                }
                granted
            }));
        }
        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
        assert_eq!(budget.usage().issues_analyzed, 50);
    }
}
