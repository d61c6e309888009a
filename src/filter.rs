// filter.rs

use crate::task::{Priority, Task};
use chrono::{Local, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Sidebar views. Exactly one is active at a time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    All,
    Today,
    Upcoming,
    Completed,
    High,
    Medium,
    Low,
}

impl Filter {
    pub const ALL: [Filter; 7] = [
        Filter::All,
        Filter::Today,
        Filter::Upcoming,
        Filter::Completed,
        Filter::High,
        Filter::Medium,
        Filter::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Today => "today",
            Filter::Upcoming => "upcoming",
            Filter::Completed => "completed",
            Filter::High => "high",
            Filter::Medium => "medium",
            Filter::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All Tasks",
            Filter::Today => "Today",
            Filter::Upcoming => "Upcoming",
            Filter::Completed => "Completed",
            Filter::High => "High Priority",
            Filter::Medium => "Medium Priority",
            Filter::Low => "Low Priority",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn matches(self, task: &Task, reference: NaiveDate) -> bool {
        match self {
            Filter::All => task.is_pending(),
            Filter::Today => task.is_pending() && task.due_date == Some(reference),
            Filter::Upcoming => task.is_pending() && task.due_date.is_some_and(|d| d > reference),
            Filter::Completed => task.is_completed(),
            Filter::High => task.is_pending() && task.priority == Priority::High,
            Filter::Medium => task.is_pending() && task.priority == Priority::Medium,
            Filter::Low => task.is_pending() && task.priority == Priority::Low,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown filter '{}'", s))
    }
}

/// Today's date on the local wall clock (not UTC).
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Case-insensitive substring match on title or description. A blank query matches everything.
pub fn matches_query(task: &Task, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&q)
        || task
            .description
            .as_ref()
            .map(|d| d.to_lowercase().contains(&q))
            .unwrap_or(false)
}

/// The visible subset of `tasks`, in store order.
pub fn project<'a>(tasks: &'a [Task], filter: Filter, query: &str, reference: NaiveDate) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| filter.matches(t, reference))
        .filter(|t| matches_query(t, query))
        .collect()
}

/// Per-filter totals for the sidebar. Search does not narrow them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCounts([usize; 7]);

impl FilterCounts {
    pub fn get(&self, filter: Filter) -> usize {
        let i = Filter::ALL.iter().position(|f| *f == filter).unwrap_or(0);
        self.0[i]
    }
}

pub fn counts(tasks: &[Task], reference: NaiveDate) -> FilterCounts {
    let mut out = [0usize; 7];
    for (slot, filter) in out.iter_mut().zip(Filter::ALL) {
        *slot = tasks.iter().filter(|t| filter.matches(t, reference)).count();
    }
    FilterCounts(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_names() {
        for f in Filter::ALL {
            assert_eq!(f.to_string().parse::<Filter>(), Ok(f));
        }
        assert_eq!(" Today ".parse::<Filter>(), Ok(Filter::Today));
        assert!("pastdue".parse::<Filter>().is_err());
    }

    #[test]
    fn next_and_prev_cycle() {
        assert_eq!(Filter::Low.next(), Filter::All);
        assert_eq!(Filter::All.prev(), Filter::Low);
        assert_eq!(Filter::Today.next().prev(), Filter::Today);
    }
}
