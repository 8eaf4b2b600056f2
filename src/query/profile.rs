use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A snapshot of operator timing counters.
///
/// Profiling is enabled by setting the `RELJOIN_PROFILE` environment variable
/// before the first query runs. Counters are process-wide and shared by every
/// concurrently running query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryProfileSnapshot {
    /// Total nanoseconds spent pulling tuples out of base relations.
    pub scan_ns: u64,
    /// Number of scan pulls.
    pub scan_count: u64,
    /// Total nanoseconds spent materializing and indexing join inner sides.
    pub hash_build_ns: u64,
    /// Number of inner-side builds.
    pub hash_build_count: u64,
    /// Total nanoseconds spent matching one outer tuple against the inner side.
    pub join_probe_ns: u64,
    /// Number of outer tuples probed.
    pub join_probe_count: u64,
    /// Total nanoseconds spent in WHERE filtering.
    pub filter_ns: u64,
    /// Number of filter pulls.
    pub filter_count: u64,
    /// Total nanoseconds spent sorting for ORDER BY.
    pub sort_ns: u64,
    /// Number of sorts.
    pub sort_count: u64,
    /// Total nanoseconds spent projecting output rows.
    pub project_ns: u64,
    /// Number of projected rows.
    pub project_count: u64,
    /// Total nanoseconds spent draining result streams in `execute`.
    pub stream_iter_ns: u64,
    /// Number of drained streams.
    pub stream_iter_count: u64,
}

#[derive(Default)]
struct QueryProfileCounters {
    scan_ns: AtomicU64,
    scan_count: AtomicU64,
    hash_build_ns: AtomicU64,
    hash_build_count: AtomicU64,
    join_probe_ns: AtomicU64,
    join_probe_count: AtomicU64,
    filter_ns: AtomicU64,
    filter_count: AtomicU64,
    sort_ns: AtomicU64,
    sort_count: AtomicU64,
    project_ns: AtomicU64,
    project_count: AtomicU64,
    stream_iter_ns: AtomicU64,
    stream_iter_count: AtomicU64,
}

static PROFILE_ENABLED: OnceLock<bool> = OnceLock::new();
static PROFILE_COUNTERS: OnceLock<QueryProfileCounters> = OnceLock::new();

fn profiling_enabled() -> bool {
    *PROFILE_ENABLED.get_or_init(|| std::env::var_os("RELJOIN_PROFILE").is_some())
}

fn counters() -> Option<&'static QueryProfileCounters> {
    profiling_enabled().then(|| PROFILE_COUNTERS.get_or_init(QueryProfileCounters::default))
}

pub(crate) fn profile_timer() -> Option<Instant> {
    profiling_enabled().then(Instant::now)
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum QueryProfileKind {
    Scan,
    HashBuild,
    JoinProbe,
    Filter,
    Sort,
    Project,
    StreamIter,
}

pub(crate) fn record_profile_timer(kind: QueryProfileKind, start: Option<Instant>) {
    let Some(start) = start else {
        return;
    };
    let Some(counters) = counters() else {
        return;
    };
    let nanos = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    let (ns, count) = match kind {
        QueryProfileKind::Scan => (&counters.scan_ns, &counters.scan_count),
        QueryProfileKind::HashBuild => (&counters.hash_build_ns, &counters.hash_build_count),
        QueryProfileKind::JoinProbe => (&counters.join_probe_ns, &counters.join_probe_count),
        QueryProfileKind::Filter => (&counters.filter_ns, &counters.filter_count),
        QueryProfileKind::Sort => (&counters.sort_ns, &counters.sort_count),
        QueryProfileKind::Project => (&counters.project_ns, &counters.project_count),
        QueryProfileKind::StreamIter => (&counters.stream_iter_ns, &counters.stream_iter_count),
    };
    ns.fetch_add(nanos, Ordering::Relaxed);
    count.fetch_add(1, Ordering::Relaxed);
}

/// Retrieves a snapshot of the operator counters.
///
/// Returns `None` when profiling is disabled. With `reset` set, every counter
/// is zeroed as it is read.
///
/// ```no_run
/// use reljoin::query::profile::profile_snapshot;
///
/// if let Some(snapshot) = profile_snapshot(false) {
///     println!("probe time: {}ns", snapshot.join_probe_ns);
/// }
/// ```
pub fn profile_snapshot(reset: bool) -> Option<QueryProfileSnapshot> {
    let counters = counters()?;
    let load = |counter: &AtomicU64| {
        if reset {
            counter.swap(0, Ordering::Relaxed)
        } else {
            counter.load(Ordering::Relaxed)
        }
    };
    Some(QueryProfileSnapshot {
        scan_ns: load(&counters.scan_ns),
        scan_count: load(&counters.scan_count),
        hash_build_ns: load(&counters.hash_build_ns),
        hash_build_count: load(&counters.hash_build_count),
        join_probe_ns: load(&counters.join_probe_ns),
        join_probe_count: load(&counters.join_probe_count),
        filter_ns: load(&counters.filter_ns),
        filter_count: load(&counters.filter_count),
        sort_ns: load(&counters.sort_ns),
        sort_count: load(&counters.sort_count),
        project_ns: load(&counters.project_ns),
        project_count: load(&counters.project_count),
        stream_iter_ns: load(&counters.stream_iter_ns),
        stream_iter_count: load(&counters.stream_iter_count),
    })
}
