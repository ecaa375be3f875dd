//! Quantity normalization for cluster-native resource strings.
//!
//! The API server expresses CPU and memory in several incompatible textual
//! formats; records carry them in fixed units (milli-CPU, MiB). Unparseable
//! input maps to `None` so one bad quantity never sinks a whole record.

/// Memory suffix table. Two-letter suffixes come first so `ki` is never
/// consumed as a bare `k`.
const MEMORY_SUFFIXES: [(&str, f64); 8] = [
    ("ki", 1.0 / 1024.0),
    ("mi", 1.0),
    ("gi", 1024.0),
    ("ti", 1024.0 * 1024.0),
    ("k", 1.0 / 1024.0),
    ("m", 1.0),
    ("g", 1024.0),
    ("t", 1024.0 * 1024.0),
];

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Convert a CPU quantity to milli-units: `"250m"` is already milli-units,
/// a bare number is whole cores.
pub fn parse_cpu_mcpu(quantity: Option<&str>) -> Option<i64> {
    let normalized = quantity?.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if let Some(millis) = normalized.strip_suffix('m') {
        return millis.parse::<f64>().ok().map(|value| value as i64);
    }
    normalized
        .parse::<f64>()
        .ok()
        .map(|cores| (cores * 1000.0) as i64)
}

/// Convert a memory quantity to mebibytes. Suffixes are matched
/// case-insensitively; a bare number is raw bytes.
pub fn parse_mem_mib(quantity: Option<&str>) -> Option<i64> {
    let normalized = quantity?.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    for (suffix, multiplier) in MEMORY_SUFFIXES {
        if let Some(prefix) = normalized.strip_suffix(suffix) {
            return prefix
                .parse::<f64>()
                .ok()
                .map(|value| (value * multiplier) as i64);
        }
    }
    normalized
        .parse::<f64>()
        .ok()
        .map(|bytes| (bytes / BYTES_PER_MIB) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_milli_form_parses_directly() {
        assert_eq!(parse_cpu_mcpu(Some("250m")), Some(250));
        assert_eq!(parse_cpu_mcpu(Some("1m")), Some(1));
    }

    #[test]
    fn cpu_whole_cores_scale_by_thousand() {
        assert_eq!(parse_cpu_mcpu(Some("2")), Some(2000));
        assert_eq!(parse_cpu_mcpu(Some("0.5")), Some(500));
    }

    #[test]
    fn cpu_absent_or_garbage_is_none() {
        assert_eq!(parse_cpu_mcpu(None), None);
        assert_eq!(parse_cpu_mcpu(Some("")), None);
        assert_eq!(parse_cpu_mcpu(Some("  ")), None);
        assert_eq!(parse_cpu_mcpu(Some("lots")), None);
        assert_eq!(parse_cpu_mcpu(Some("m")), None);
    }

    #[test]
    fn memory_suffix_table() {
        assert_eq!(parse_mem_mib(Some("1Gi")), Some(1024));
        assert_eq!(parse_mem_mib(Some("512Mi")), Some(512));
        assert_eq!(parse_mem_mib(Some("2G")), Some(2048));
        assert_eq!(parse_mem_mib(Some("1024Ki")), Some(1));
        assert_eq!(parse_mem_mib(Some("1Ti")), Some(1024 * 1024));
        assert_eq!(parse_mem_mib(Some("1.5Gi")), Some(1536));
    }

    #[test]
    fn memory_suffixes_are_case_insensitive() {
        assert_eq!(parse_mem_mib(Some("1gi")), Some(1024));
        assert_eq!(parse_mem_mib(Some("512MI")), Some(512));
    }

    #[test]
    fn memory_bare_number_is_raw_bytes() {
        assert_eq!(parse_mem_mib(Some("1048576")), Some(1));
        assert_eq!(parse_mem_mib(Some("1024")), Some(0));
    }

    #[test]
    fn memory_absent_or_garbage_is_none() {
        assert_eq!(parse_mem_mib(None), None);
        assert_eq!(parse_mem_mib(Some("")), None);
        assert_eq!(parse_mem_mib(Some("a lot")), None);
        assert_eq!(parse_mem_mib(Some("Gi")), None);
    }
}
