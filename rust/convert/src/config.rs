// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Converter configuration loaded from environment variables.

/// Converter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base height used when no height field is set.
    pub default_height: f64,
    /// Wall height of every extruded footprint.
    pub wall_height: f64,
    /// Attribute holding each footprint's base height.
    pub height_field: Option<String>,
    /// Number of worker threads for parallel processing.
    pub worker_threads: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            default_height: lookup("FOOTPRINT3D_DEFAULT_HEIGHT")
                .and_then(|v| v.trim().parse().ok())
                .filter(|v: &f64| v.is_finite())
                .unwrap_or(3.0),
            wall_height: lookup("FOOTPRINT3D_WALL_HEIGHT")
                .and_then(|v| v.trim().parse().ok())
                .filter(|v: &f64| v.is_finite())
                .unwrap_or(3.0),
            height_field: lookup("FOOTPRINT3D_HEIGHT_FIELD")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            worker_threads: lookup("FOOTPRINT3D_WORKER_THREADS")
                .unwrap_or_else(|| num_cpus::get().to_string())
                .trim()
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(num_cpus::get),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.default_height, 3.0);
        assert_eq!(config.wall_height, 3.0);
        assert_eq!(config.height_field, None);
        assert_eq!(config.worker_threads, num_cpus::get());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("FOOTPRINT3D_DEFAULT_HEIGHT", "0"),
            ("FOOTPRINT3D_WALL_HEIGHT", " 12.5 "),
            ("FOOTPRINT3D_HEIGHT_FIELD", "elevation"),
            ("FOOTPRINT3D_WORKER_THREADS", "2"),
        ]));
        assert_eq!(config.default_height, 0.0);
        assert_eq!(config.wall_height, 12.5);
        assert_eq!(config.height_field.as_deref(), Some("elevation"));
        assert_eq!(config.worker_threads, 2);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("FOOTPRINT3D_DEFAULT_HEIGHT", "tall"),
            ("FOOTPRINT3D_WALL_HEIGHT", "NaN"),
            ("FOOTPRINT3D_HEIGHT_FIELD", "  "),
            ("FOOTPRINT3D_WORKER_THREADS", "0"),
        ]));
        assert_eq!(config.default_height, 3.0);
        assert_eq!(config.wall_height, 3.0);
        assert_eq!(config.height_field, None);
        assert_eq!(config.worker_threads, num_cpus::get());
    }
}
