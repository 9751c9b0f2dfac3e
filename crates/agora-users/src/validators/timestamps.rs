/// Registration / last-visit / last-active times: non-positive means "now".
pub fn normalize_timestamp(value: i64, now: i64) -> i64 {
    if value <= 0 { now } else { value }
}
