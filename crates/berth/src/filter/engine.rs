use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::model::{ContainerInfo, ListFilter};

#[derive(Debug, Default)]
pub struct FilterStats {
    pub scanned: AtomicU64,
    pub matched: AtomicU64,
}

/// Applies a [`ListFilter`] to listed containers. Every present field must
/// hold; an empty filter keeps everything.
pub struct FilterEngine<'f> {
    filter: &'f ListFilter,
    stats: FilterStats,
}

impl<'f> FilterEngine<'f> {
    pub fn new(filter: &'f ListFilter) -> Self {
        Self {
            filter,
            stats: FilterStats::default(),
        }
    }

    pub fn matches(&self, info: &ContainerInfo) -> bool {
        self.stats.scanned.fetch_add(1, Ordering::Relaxed);
        let f = self.filter;

        let keep = contains(&info.id, f.id.as_deref())
            && contains(&info.name, f.name.as_deref())
            && contains(&info.image, f.image.as_deref())
            && f.status.as_ref().is_none_or(|s| *s == info.status)
            && f.ports.as_ref().is_none_or(|wanted| {
                wanted.iter().all(|p| info.ports.contains(p))
            })
            && in_range(&info.created_at, f.created_from, f.created_to)
            && all_pairs(info.labels.as_ref(), f.labels.as_deref())
            && all_pairs(info.env.as_ref(), f.env.as_deref());

        if keep {
            self.stats.matched.fetch_add(1, Ordering::Relaxed);
        }
        keep
    }

    pub fn apply(&self, containers: Vec<ContainerInfo>) -> Vec<ContainerInfo> {
        containers.into_iter().filter(|c| self.matches(c)).collect()
    }

    /// (scanned, matched)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.scanned.load(Ordering::Relaxed),
            self.stats.matched.load(Ordering::Relaxed),
        )
    }
}

/// Case-sensitive substring match.
fn contains(value: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| value.contains(n))
}

/// Inclusive range check. A bound against an unparseable timestamp fails.
fn in_range(created_at: &str, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Ok(created) = DateTime::parse_from_rfc3339(created_at) else {
        return false;
    };
    let created = created.with_timezone(&Utc);
    from.is_none_or(|f| created >= f) && to.is_none_or(|t| created <= t)
}

/// Every pair of every matcher must be present with an equal value.
/// A missing map satisfies only matchers that carry no pairs.
fn all_pairs(actual: Option<&HashMap<String, String>>, matchers: Option<&[HashMap<String, String>]>) -> bool {
    let Some(matchers) = matchers else { return true };
    if matchers.iter().all(HashMap::is_empty) {
        return true;
    }
    let Some(actual) = actual else { return false };
    matchers
        .iter()
        .flat_map(|m| m.iter())
        .all(|(k, v)| actual.get(k) == Some(v))
}
