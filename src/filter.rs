//! Multi-criterion task filtering with tree-aware closure.
//!
//! Criteria are ANDed per task; the surviving id set is then expanded so the
//! caller can still render a coherent tree: descendants of tag matches are
//! pulled in, and ancestors of every match are pulled in unconditionally.

use crate::types::Task;
use chrono::{DateTime, Datelike, Duration, Local};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Due/completion window, evaluated against local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    All,
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "tomorrow" => Ok(Period::Tomorrow),
            "this_week" | "this-week" | "week" => Ok(Period::ThisWeek),
            "next_week" | "next-week" => Ok(Period::NextWeek),
            "all" => Ok(Period::All),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// The filter criteria. Absent fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring over title, tag names and importance.
    pub search: Option<String>,
    /// Exact tag name match. Also suppresses the period criterion and pulls
    /// the whole subtree of each match into the result.
    pub tag: Option<String>,
    /// Exact importance match, after absent/empty normalizes to "Normal".
    pub importance: Option<String>,
    pub period: Option<Period>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.tag.is_none()
            && self.importance.is_none()
            && self.period.is_none()
    }
}

struct Windows {
    now: i64,
    today_start: i64,
    tomorrow_start: i64,
    day_after_tomorrow: i64,
    next_week_start: i64,
    next_week_end: i64,
    seven_days_later: i64,
}

impl Windows {
    fn at(now: DateTime<Local>) -> Self {
        let now_ms = now.timestamp_millis();
        let today_start = local_day_start(now);
        let day = Duration::days(1).num_milliseconds();
        let days_to_next_monday = 7 - i64::from(now.weekday().num_days_from_monday());
        let next_week_start = today_start + days_to_next_monday * day;
        Windows {
            now: now_ms,
            today_start,
            tomorrow_start: today_start + day,
            day_after_tomorrow: today_start + 2 * day,
            next_week_start,
            next_week_end: next_week_start + 7 * day,
            seven_days_later: now_ms + 7 * day,
        }
    }
}

fn local_day_start(now: DateTime<Local>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|dt| dt.and_local_timezone(Local).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

/// Apply the filter to an ordered task list and return the surviving tasks
/// in their original order. An empty match set yields an empty result even
/// though the closure steps never ran.
pub fn apply(tasks: &[Task], filter: &TaskFilter, now: DateTime<Local>) -> Vec<Task> {
    if filter.is_empty() {
        return tasks.to_vec();
    }

    // A tag filter renders the period criterion moot, and "all" is a UI
    // value meaning no constraint.
    let effective_period = match (&filter.tag, filter.period) {
        (Some(_), _) | (_, Some(Period::All)) | (_, None) => None,
        (None, Some(p)) => Some(p),
    };
    let search = filter.search.as_ref().map(|s| s.to_lowercase());
    let windows = Windows::at(now);

    let mut matched: HashSet<i64> = HashSet::new();
    for task in tasks {
        if matches(task, search.as_deref(), filter, effective_period, &windows) {
            matched.insert(task.id);
        }
    }

    if matched.is_empty() {
        return Vec::new();
    }

    if filter.tag.is_some() {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for task in tasks {
            if let Some(pid) = task.parent_id {
                children.entry(pid).or_default().push(task.id);
            }
        }
        let mut queue: Vec<i64> = matched.iter().copied().collect();
        while let Some(id) = queue.pop() {
            for &cid in children.get(&id).into_iter().flatten() {
                if matched.insert(cid) {
                    queue.push(cid);
                }
            }
        }
    }

    let by_id: HashMap<i64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut closed = matched.clone();
    for id in matched {
        let mut curr = by_id.get(&id).copied();
        while let Some(task) = curr {
            let Some(pid) = task.parent_id else { break };
            if !closed.insert(pid) {
                break;
            }
            curr = by_id.get(&pid).copied();
        }
    }

    tasks.iter().filter(|t| closed.contains(&t.id)).cloned().collect()
}

fn matches(
    task: &Task,
    search: Option<&str>,
    filter: &TaskFilter,
    period: Option<Period>,
    windows: &Windows,
) -> bool {
    if let Some(query) = search {
        let title_match = task.title.to_lowercase().contains(query);
        let tags_match = task.tags.iter().any(|t| t.name.to_lowercase().contains(query));
        let imp_match = task.importance_label().to_lowercase().contains(query);
        if !(title_match || tags_match || imp_match) {
            return false;
        }
    }

    if let Some(tag) = &filter.tag {
        if !task.tags.iter().any(|t| &t.name == tag) {
            return false;
        }
    }

    if let Some(importance) = &filter.importance {
        if task.importance_label() != importance {
            return false;
        }
    }

    if let Some(period) = period {
        let completed = task.status == crate::types::TaskStatus::Completed;
        let target = if completed { task.completed_at } else { task.due_at };
        let Some(target) = target else {
            return false;
        };
        let ok = match period {
            Period::Today if completed => {
                windows.today_start <= target && target < windows.tomorrow_start
            }
            // Pending "today" means overdue or due today.
            Period::Today => target < windows.tomorrow_start,
            Period::Tomorrow => {
                windows.tomorrow_start <= target && target < windows.day_after_tomorrow
            }
            // A rolling seven-day window from the present moment.
            Period::ThisWeek => windows.now <= target && target < windows.seven_days_later,
            Period::NextWeek => {
                windows.next_week_start <= target && target < windows.next_week_end
            }
            Period::All => true,
        };
        if !ok {
            return false;
        }
    }

    true
}
