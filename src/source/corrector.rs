const HOUR_MS: i64 = 3_600_000;

/// Raw-timestamp jump magnitude treated as a timezone jump rather than drift.
const JUMP_THRESHOLD_MS: i64 = 3 * HOUR_MS;

/// Fast-path offset for the common KST↔UTC misconfiguration.
const KST_OFFSET_MS: i64 = -9 * HOUR_MS;

/// Offset deltas searched when the fast path does not restore monotonicity.
const CANDIDATE_DELTAS: [i64; 9] = [
    0,
    HOUR_MS,
    -HOUR_MS,
    9 * HOUR_MS,
    -9 * HOUR_MS,
    10 * HOUR_MS,
    -10 * HOUR_MS,
    12 * HOUR_MS,
    -12 * HOUR_MS,
];

/// Per-source monotonic timestamp correction.
///
/// Sources are read newest-to-oldest, so the corrected sequence must be
/// non-increasing. Devices in the field toggle between local time and UTC
/// mid-file; rather than general timezone inference, the corrector treats
/// monotonicity as the hard invariant and offset correctness as best-effort.
/// When an abrupt forward jump is detected it applies a fixed offset from a
/// small known set; when nothing fits, the value is clamped to one
/// millisecond below the previous output.
///
/// State is owned by exactly one cursor and mutated sequentially.
#[derive(Debug, Default)]
pub struct TzCorrector {
    offset_ms: i64,
    last_corrected: Option<i64>,
    /// Rolling window of the most recent raw timestamps, newest last.
    history: Vec<i64>,
}

impl TzCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently applied offset in milliseconds.
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Correct one raw epoch-millisecond timestamp.
    ///
    /// The returned sequence is guaranteed non-increasing across calls on the
    /// same instance, unconditionally.
    pub fn correct(&mut self, raw_ts: i64) -> i64 {
        self.history.push(raw_ts);
        if self.history.len() > 3 {
            self.history.remove(0);
        }

        let corrected = raw_ts + self.offset_ms;
        let last = match self.last_corrected {
            None => {
                self.last_corrected = Some(corrected);
                return corrected;
            }
            Some(last) => last,
        };

        if corrected <= last {
            self.last_corrected = Some(corrected);
            return corrected;
        }

        // Monotonicity violated: time moved forward while reading newest-first.
        // Fast path: if the last two raw timestamps are at least a timezone
        // apart, try the KST↔UTC offset before the generic search.
        if let [.., prev, cur] = self.history[..] {
            if (cur - prev).abs() >= JUMP_THRESHOLD_MS {
                let offset = self.offset_ms + KST_OFFSET_MS;
                let candidate = raw_ts + offset;
                if candidate <= last {
                    self.offset_ms = offset;
                    self.last_corrected = Some(candidate);
                    return candidate;
                }
            }
        }

        // Generic search, only for timezone-sized violations. Among deltas
        // that restore monotonicity, pick the one landing closest to the
        // previous output to minimize the artificial jump.
        if corrected - last >= JUMP_THRESHOLD_MS {
            let mut best: Option<(i64, i64)> = None;
            for delta in CANDIDATE_DELTAS {
                let offset = self.offset_ms + delta;
                let candidate = raw_ts + offset;
                if candidate <= last && best.map_or(true, |(_, c)| candidate > c) {
                    best = Some((offset, candidate));
                }
            }
            if let Some((offset, candidate)) = best {
                self.offset_ms = offset;
                self.last_corrected = Some(candidate);
                return candidate;
            }
        }

        // Nothing fits: clamp. Loses fidelity for this entry but keeps the
        // invariant total. The offset is left unchanged.
        let clamped = last - 1;
        self.last_corrected = Some(clamped);
        clamped
    }
}
